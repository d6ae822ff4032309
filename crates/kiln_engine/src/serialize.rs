//! JSON encoding and loading of entity components.
//!
//! An entity encodes as a JSON object from component name to the
//! component's data form. Components without a data form are left out.

use kiln_foundation::{EntityId, Error, Result, Value};
use kiln_storage::World;
use log::trace;

use crate::registry::Registry;

/// Converts a JSON value into a data value.
///
/// # Errors
/// Returns a serialization error if the JSON cannot be represented.
pub fn value_from_json(json: &serde_json::Value) -> Result<Value> {
    serde_json::from_value(json.clone()).map_err(|e| Error::serialization(e.to_string()))
}

/// Converts a data value into JSON. Non-finite floats become `null`.
///
/// # Errors
/// Returns a serialization error if the value cannot be encoded.
pub fn value_to_json(value: &Value) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| Error::serialization(e.to_string()))
}

/// Encodes the data forms of an entity's components as a JSON object.
///
/// Entity references inside component data encode as
/// `{"$entity": id}` and load back as references.
///
/// # Errors
/// Fails if the entity is not live or a data form cannot be encoded.
pub fn to_json_value(world: &World, entity: EntityId) -> Result<serde_json::Value> {
    let components = world
        .components(entity)
        .ok_or_else(|| Error::entity_not_found(entity))?;

    let mut object = serde_json::Map::new();
    for (name, component) in components.iter() {
        if let Some(data) = component.to_value() {
            let json =
                value_to_json(&data).map_err(|e| e.with_frame(format!("to_json({name})")))?;
            object.insert(name.to_string(), json);
        }
    }
    Ok(serde_json::Value::Object(object))
}

/// Encodes an entity as a JSON string.
///
/// # Errors
/// See [`to_json_value`].
pub fn to_json(world: &World, entity: EntityId) -> Result<String> {
    let json = to_json_value(world, entity)?;
    Ok(json.to_string())
}

/// Loads a JSON object of component data onto an entity.
///
/// Components already attached receive [`Component::load`]; missing ones
/// are built through `registry` with no arguments, loaded, then attached.
///
/// [`Component::load`]: kiln_storage::Component::load
///
/// # Errors
/// Fails if the JSON is not an object, the entity is not live, or a
/// component rejects its data. Every entry is decoded before any is applied.
pub fn from_json_value(
    world: &mut World,
    registry: &Registry,
    entity: EntityId,
    json: &serde_json::Value,
) -> Result<()> {
    let serde_json::Value::Object(object) = json else {
        return Err(Error::serialization(format!(
            "expected a JSON object of components, found {json}"
        )));
    };
    if !world.exists(entity) {
        return Err(Error::entity_not_found(entity));
    }

    let entries = object
        .iter()
        .map(|(name, data)| Ok((name.as_str(), value_from_json(data)?)))
        .collect::<Result<Vec<_>>>()?;

    for (name, data) in entries {
        let frame = || format!("from_json({name})");
        if let Some(component) = world.get_mut(entity, name) {
            component.load(&data).map_err(|e| e.with_frame(frame()))?;
        } else {
            let mut component = registry.construct(entity, name, &[])?;
            component.load(&data).map_err(|e| e.with_frame(frame()))?;
            world.set_boxed(entity, name, component)?;
        }
        trace!("loaded {name} onto {entity:?}");
    }
    Ok(())
}

/// Loads a JSON string of component data onto an entity.
///
/// # Errors
/// Fails if `json` does not parse, or as [`from_json_value`].
pub fn from_json(
    world: &mut World,
    registry: &Registry,
    entity: EntityId,
    json: &str,
) -> Result<()> {
    let parsed: serde_json::Value =
        serde_json::from_str(json).map_err(|e| Error::serialization(e.to_string()))?;
    from_json_value(world, registry, entity, &parsed)
}
