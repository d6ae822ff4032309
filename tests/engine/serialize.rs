//! Integration tests for JSON encoding and loading

use kiln_engine::serialize::to_json_value;
use kiln_engine::{Registry, from_json, to_json};
use kiln_foundation::{Result, Value};
use kiln_storage::{Component, World};

/// Encodes as the product of its coordinates.
#[derive(Debug, PartialEq)]
struct Area {
    x: i64,
    y: i64,
}

impl Component for Area {
    fn to_value(&self) -> Option<Value> {
        Some(Value::map([("result", self.x * self.y)]))
    }

    fn load(&mut self, data: &Value) -> Result<()> {
        let result = data.field("result").and_then(Value::as_int).unwrap_or(0);
        self.x = result / 2;
        self.y = 2;
        Ok(())
    }
}

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .define("position", |_, args: &[Value]| {
            let arg = |i: usize| args.get(i).and_then(Value::as_int).unwrap_or(0);
            Ok(Area { x: arg(0), y: arg(1) })
        })
        .unwrap();
    registry
}

#[test]
fn serialize_components() {
    let mut world = World::new();
    let e = world.create();
    world.update(e, "position", Value::map([("x", 4), ("y", 6)])).unwrap();

    let data: serde_json::Value = serde_json::from_str(&to_json(&world, e).unwrap()).unwrap();
    assert_eq!(data["position"]["x"], 4);
    assert_eq!(data["position"]["y"], 6);
}

#[test]
fn entity_references_survive_round_trip() {
    let registry = Registry::new();
    let mut world = World::new();
    let target = world.create();
    let hunter = world.create();
    world.set(hunter, "aim", Value::map([("target", Value::from(target))])).unwrap();

    let encoded = to_json(&world, hunter).unwrap();
    let data: serde_json::Value = serde_json::from_str(&encoded).unwrap();
    assert_eq!(data["aim"]["target"]["$entity"], target.raw());

    let copy = world.create();
    from_json(&mut world, &registry, copy, &encoded).unwrap();
    let aim = world.value(copy, "aim").unwrap();
    assert_eq!(aim.field("target").and_then(Value::as_entity), Some(target));
}

#[test]
fn deserialize_components() {
    let registry = Registry::new();
    let mut world = World::new();
    let e = world.create();
    assert!(world.components(e).unwrap().is_empty());

    from_json(&mut world, &registry, e, r#"{"position": {"x": 4, "y": 6}}"#).unwrap();
    assert_eq!(world.components(e).unwrap().len(), 1);
    let position = world.value(e, "position").unwrap();
    assert_eq!(position.field("x"), Some(&Value::Int(4)));
    assert_eq!(position.field("y"), Some(&Value::Int(6)));
}

#[test]
fn custom_components_round_trip_through_their_data_form() {
    let registry = registry();
    let mut world = World::new();

    let source = world.create();
    registry
        .insert(&mut world, source, "position", &[Value::Int(7), Value::Int(4)])
        .unwrap();
    assert_eq!(to_json_value(&world, source).unwrap()["position"]["result"], 28);

    let json = to_json(&world, source).unwrap();
    let copy = world.create();
    from_json(&mut world, &registry, copy, &json).unwrap();
    assert_eq!(world.get_as::<Area>(copy, "position"), Some(&Area { x: 14, y: 2 }));

    from_json(&mut world, &registry, source, &json).unwrap();
    assert_eq!(world.get_as::<Area>(source, "position"), Some(&Area { x: 14, y: 2 }));
}

#[test]
fn loaded_components_are_queryable() {
    let registry = registry();
    let mut world = World::new();
    let e = world.create();
    assert!(world.matching(&["position"]).unwrap().is_empty());

    from_json(&mut world, &registry, e, r#"{"position": {"result": 24}}"#).unwrap();
    assert_eq!(world.matching(&["position"]).unwrap(), vec![e]);
}
