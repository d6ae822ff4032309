//! Integration tests for component teardown hooks
//!
//! Tests hook ordering, cross-entity side effects, and the re-entrancy lock.

use std::cell::Cell;
use std::rc::Rc;

use kiln_foundation::{ErrorKind, Result, Value};
use kiln_storage::{Component, Entity, Teardown, World};

/// Counts live instances; removal decrements.
#[derive(Debug)]
struct Counted(Rc<Cell<i32>>);

impl Counted {
    fn new(count: &Rc<Cell<i32>>) -> Self {
        count.set(count.get() + 1);
        Self(count.clone())
    }
}

impl Component for Counted {
    fn on_remove(&self, _: &mut Teardown<'_>) -> Result<()> {
        self.0.set(self.0.get() - 1);
        Ok(())
    }
}

/// Tries to add a component to its own entity.
#[derive(Debug)]
struct Grows;

impl Component for Grows {
    fn on_remove(&self, teardown: &mut Teardown<'_>) -> Result<()> {
        let entity = teardown.entity();
        if let (Some(world), Some(entity)) = (teardown.world(), entity) {
            world.set(entity, "somethingElse", Value::Nil)?;
        }
        Ok(())
    }
}

// =============================================================================
// Hook Invocation
// =============================================================================

#[test]
fn clear_runs_every_hook() {
    let count = Rc::new(Cell::new(0));
    let mut world = World::new();
    for _ in 0..2 {
        let e = world.create();
        world.set(e, "sprite", Counted::new(&count)).unwrap();
    }
    assert_eq!(count.get(), 2);

    world.clear().unwrap();
    assert_eq!(count.get(), 0);
}

#[test]
fn detach_and_attach_run_no_hooks() {
    let count = Rc::new(Cell::new(0));
    let mut world = World::new();
    let e = world.create();
    world.set(e, "sprite", Counted::new(&count)).unwrap();

    let detached = world.detach(e).unwrap().unwrap();
    assert_eq!(count.get(), 1);
    world.attach(detached).unwrap();
    assert_eq!(count.get(), 1);

    assert!(world.detach(e).unwrap().is_some());
    assert!(world.detach(e).unwrap().is_none());
}

#[test]
fn detached_entity_runs_hooks_on_remove() {
    let count = Rc::new(Cell::new(0));
    let mut entity = Entity::new()
        .with("sprite", Counted::new(&count))
        .unwrap()
        .with("position", Value::Int(7))
        .unwrap();
    assert!(entity.has(&["sprite", "position"]));

    entity.remove_all().unwrap();
    assert_eq!(count.get(), 0);
    assert!(!entity.has(&["sprite"]));
    assert!(!entity.has(&["position"]));
}

#[test]
fn replacing_a_component_skips_its_hook() {
    let count = Rc::new(Cell::new(0));
    let mut world = World::new();
    let e = world.create();
    world.set(e, "sprite", Counted::new(&count)).unwrap();
    world.set(e, "sprite", Value::from("plain")).unwrap();
    assert_eq!(count.get(), 1);
}

// =============================================================================
// Re-entrancy
// =============================================================================

#[test]
fn self_mutation_in_hook_fails_destroy() {
    let mut world = World::new();
    let e = world.create();
    world.set(e, "position", Grows).unwrap();

    let err = world.destroy(e).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ReentrantMutation { .. }));
    assert!(world.exists(e));
    assert!(world.has(e, &["position"]));
    assert!(!world.has(e, &["somethingElse"]));
}

#[test]
fn detached_hook_has_no_world() {
    let mut entity = Entity::new().with("position", Grows).unwrap();
    entity.remove("position").unwrap();
    assert!(!entity.has(&["position"]));
}
