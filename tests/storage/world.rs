//! Integration tests for world state
//!
//! Tests entity lifecycle, component mutation, and query results under
//! both index strategies.

use kiln_foundation::{EntityId, ErrorKind, Value};
use kiln_storage::{Entity, IndexKind, World, WorldConfig};

fn worlds() -> impl Iterator<Item = World> {
    IndexKind::ALL
        .into_iter()
        .map(|kind| World::with_config(WorldConfig::new().with_index(kind)).unwrap())
}

// =============================================================================
// Entity Lifecycle
// =============================================================================

#[test]
fn ids_are_never_reused() {
    for mut world in worlds() {
        let a = world.create();
        world.destroy(a).unwrap();
        let b = world.create();
        assert_ne!(a, b);
        assert!(!world.exists(a));
        assert!(world.exists(b));
    }
}

#[test]
fn first_id_is_configurable() {
    let mut world = World::with_config(WorldConfig::new().with_first_id(100)).unwrap();
    assert_eq!(world.create(), EntityId::new(100));
}

#[test]
fn all_query_lists_every_entity() {
    for mut world in worlds() {
        let ids: Vec<EntityId> = (0..5).map(|_| world.create()).collect();
        assert_eq!(world.matching(&[]).unwrap(), ids);
        world.destroy(ids[2]).unwrap();
        assert_eq!(world.matching(&[]).unwrap().len(), 4);
    }
}

// =============================================================================
// Component Mutation
// =============================================================================

#[test]
fn adding_entities_to_index() {
    for mut world in worlds() {
        let e = world.create();
        world.set(e, "a", Value::Nil).unwrap();
        world.set(e, "b", Value::Nil).unwrap();
        assert_eq!(world.matching(&["a", "b"]).unwrap().len(), 1);

        world.destroy(e).unwrap();
        assert!(world.matching(&["a", "b"]).unwrap().is_empty());

        let a = world.create();
        world.set(a, "a", Value::Nil).unwrap();
        let b = world.create();
        world.set(b, "b", Value::Nil).unwrap();
        assert!(world.matching(&["a", "b"]).unwrap().is_empty());

        let both = world.create();
        world.set(both, "b", Value::Nil).unwrap();
        world.set(both, "a", Value::Nil).unwrap();
        assert_eq!(world.matching(&["a", "b"]).unwrap(), vec![both]);
    }
}

#[test]
fn update_merges_records() {
    for mut world in worlds() {
        let e = world.create();
        world.update(e, "position", Value::map([("x", 1), ("y", 1)])).unwrap();
        world.update(e, "position", Value::map([("y", 5)])).unwrap();
        assert_eq!(
            world.value(e, "position"),
            Some(&Value::map([("x", 1), ("y", 5)]))
        );
    }
}

#[test]
fn dead_entity_rejects_set() {
    for mut world in worlds() {
        let e = world.create();
        world.destroy(e).unwrap();
        let err = world.set(e, "position", Value::Nil).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::EntityNotFound(_)));
        assert!(world.remove(e, "position").is_ok());
    }
}

#[test]
fn readme_damage_example() {
    for mut world in worlds() {
        let player = world.create();
        world.set(player, "health", Value::map([("value", 100)])).unwrap();
        for amount in [10, 30] {
            let enemy = world.create();
            world.set(enemy, "damages", Value::from(amount)).unwrap();
        }

        world
            .for_each(&["damages"], |visit| {
                let amount = visit.value(0).and_then(Value::as_int).unwrap_or(0);
                let health = visit.world().value_mut(player, "health").unwrap();
                let value = health.field("value").and_then(Value::as_int).unwrap_or(0);
                health.set_field("value", value - amount);
            })
            .unwrap();

        let health = world.value(player, "health").unwrap();
        assert_eq!(health.field("value"), Some(&Value::Int(60)));
    }
}

// =============================================================================
// Detach and Attach
// =============================================================================

#[test]
fn detached_entity_keeps_id_and_components() {
    for mut world in worlds() {
        let e = world.create();
        world.set(e, "position", Value::map([("x", 3)])).unwrap();

        let detached = world.detach(e).unwrap().unwrap();
        assert!(!world.exists(e));
        assert!(world.matching(&["position"]).unwrap().is_empty());
        assert_eq!(detached.id(), Some(e));
        assert!(detached.has(&["position"]));

        assert_eq!(world.attach(detached).unwrap(), e);
        assert_eq!(world.matching(&["position"]).unwrap(), vec![e]);
    }
}

#[test]
fn attach_into_another_world() {
    let mut source = World::new();
    let mut target = World::with_config(WorldConfig::scanning()).unwrap();
    let e = source.create();
    source.set(e, "tag", Value::Bool(true)).unwrap();

    let moved = source.detach(e).unwrap().unwrap();
    assert_eq!(target.attach(moved).unwrap(), e);
    assert_eq!(target.matching(&["tag"]).unwrap(), vec![e]);
}

#[test]
fn destroyed_id_cannot_be_attached() {
    for mut world in worlds() {
        let e = world.create();
        let copy = Entity::new().with("tag", Value::Nil).unwrap();
        world.destroy(e).unwrap();

        let fresh = world.attach(copy).unwrap();
        assert_ne!(fresh, e);

        let mut other = World::new();
        let stale = other.create();
        let stale = other.detach(stale).unwrap().unwrap();
        let err = world.attach(stale).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::IdConflict(_)));
    }
}

// =============================================================================
// Clear
// =============================================================================

#[test]
fn clear_resets_queries() {
    for mut world in worlds() {
        for _ in 0..3 {
            let e = world.create();
            world.set(e, "position", Value::Nil).unwrap();
        }
        assert_eq!(world.matching(&["position"]).unwrap().len(), 3);

        world.clear().unwrap();
        assert!(world.is_empty());
        assert!(world.matching(&["position"]).unwrap().is_empty());
        assert!(world.matching(&[]).unwrap().is_empty());

        let e = world.create();
        world.set(e, "position", Value::Nil).unwrap();
        assert_eq!(world.matching(&["position"]).unwrap(), vec![e]);
    }
}
