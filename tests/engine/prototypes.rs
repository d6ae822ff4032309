//! Integration tests for prototype registration and spawning

use kiln_engine::Registry;
use kiln_foundation::{Result, Value};
use kiln_storage::{Component, World};

#[derive(Debug, PartialEq)]
struct Position {
    x: f64,
    y: f64,
}

impl Component for Position {
    fn merge(&mut self, patch: &Value) -> Result<()> {
        if let Some(x) = patch.field("x").and_then(Value::as_number) {
            self.x = x;
        }
        if let Some(y) = patch.field("y").and_then(Value::as_number) {
            self.y = y;
        }
        Ok(())
    }
}

#[test]
fn register_and_use_prototypes() {
    let mut registry = Registry::new();
    registry
        .define("position", |_, args: &[Value]| {
            let arg = |i: usize| args.get(i).and_then(Value::as_number).unwrap_or(0.0);
            Ok(Position { x: arg(0), y: arg(1) })
        })
        .unwrap();

    assert_eq!(registry.register_prototypes("{}").unwrap(), 0);

    let both = serde_json::json!({
        "Player": {
            "position": {"x": 5, "y": 10},
            "velocity": {"x": 15, "y": 20},
            "player": {}
        },
        "Enemy": {"position": {}, "velocity": {}}
    });
    assert_eq!(registry.register_prototypes_value(&both).unwrap(), 2);

    let test = r#"{"Test": {"position": {"x": 1.25, "y": 5000}}}"#;
    assert_eq!(registry.register_prototypes(test).unwrap(), 1);

    let mut world = World::new();
    let p = registry.spawn(&mut world, "Player").unwrap();
    let e = registry.spawn(&mut world, "Enemy").unwrap();
    let t = registry.spawn(&mut world, "Test").unwrap();

    assert!(world.has(p, &["position", "velocity", "player"]));
    assert!(world.has(e, &["position", "velocity"]) && !world.has(e, &["player"]));
    assert!(world.has(t, &["position"]) && !world.has(t, &["velocity"]));

    assert_eq!(world.get_as::<Position>(p, "position"), Some(&Position { x: 5.0, y: 10.0 }));
    assert_eq!(
        world.value(p, "velocity"),
        Some(&Value::map([("x", 15), ("y", 20)]))
    );
    assert_eq!(world.value(p, "player"), Some(&Value::empty_map()));
    assert_eq!(world.get_as::<Position>(e, "position"), Some(&Position { x: 0.0, y: 0.0 }));
    assert_eq!(world.value(e, "velocity"), Some(&Value::empty_map()));
    assert_eq!(
        world.get_as::<Position>(t, "position"),
        Some(&Position { x: 1.25, y: 5000.0 })
    );
}

#[test]
fn spawned_entities_are_independent() {
    let mut registry = Registry::new();
    registry
        .register_prototypes(r#"{"Enemy": {"health": {"hp": 10}}}"#)
        .unwrap();

    let mut world = World::new();
    let a = registry.spawn(&mut world, "Enemy").unwrap();
    let b = registry.spawn(&mut world, "Enemy").unwrap();
    world.update(a, "health", Value::map([("hp", 3)])).unwrap();

    assert_ne!(a, b);
    assert_eq!(world.value(b, "health"), Some(&Value::map([("hp", 10)])));
    assert_eq!(world.matching(&["health"]).unwrap(), vec![a, b]);
}
