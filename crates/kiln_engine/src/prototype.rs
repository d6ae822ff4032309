//! Prototype templates.
//!
//! A prototype names a set of components with initial data. Spawning one
//! creates an entity, builds each component through the registry with no
//! arguments, and loads the template data onto it.

use std::sync::Arc;

use kiln_foundation::{EntityId, Error, ErrorKind, Result, Value};
use kiln_storage::World;
use kiln_storage::key::validate_name;
use log::{debug, trace, warn};

use crate::registry::Registry;
use crate::serialize::value_from_json;

/// A named component template.
#[derive(Clone, Debug, PartialEq)]
pub struct Prototype {
    name: String,
    components: Vec<(Arc<str>, Value)>,
}

impl Prototype {
    /// Creates a template from component name/data pairs.
    ///
    /// # Errors
    /// Returns an error if a component name is malformed.
    pub fn new<I>(name: impl Into<String>, components: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let components = components
            .into_iter()
            .map(|(component, data)| {
                validate_name(&component)?;
                Ok((Arc::from(component), data))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name: name.into(),
            components,
        })
    }

    /// Returns the prototype name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the component names and their template data.
    #[must_use]
    pub fn components(&self) -> &[(Arc<str>, Value)] {
        &self.components
    }

    fn from_json(name: &str, json: &serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(fields) = json else {
            return Err(Error::serialization(format!(
                "prototype {name} must be an object of components"
            )));
        };
        let components = fields
            .iter()
            .map(|(component, data)| Ok((component.clone(), value_from_json(data)?)))
            .collect::<Result<Vec<_>>>()?;
        Self::new(name, components)
    }
}

// =============================================================================
// Registration and Spawning
// =============================================================================

impl Registry {
    /// Registers a single prototype, replacing one of the same name.
    pub fn register_prototype(&mut self, prototype: Prototype) {
        debug!("registered prototype {}", prototype.name);
        self.prototypes.insert(prototype.name.clone(), prototype);
    }

    /// Registers every prototype in a JSON object of the form
    /// `{"Name": {"component": data, ...}, ...}`.
    ///
    /// Returns how many prototypes were registered.
    ///
    /// # Errors
    /// Returns a serialization error if the input does not parse or does not
    /// have that shape. Nothing is registered in that case.
    pub fn register_prototypes(&mut self, json: &str) -> Result<usize> {
        let parsed: serde_json::Value =
            serde_json::from_str(json).map_err(|e| Error::serialization(e.to_string()))?;
        self.register_prototypes_value(&parsed)
    }

    /// Like [`Registry::register_prototypes`], for already parsed JSON.
    ///
    /// # Errors
    /// See [`Registry::register_prototypes`].
    pub fn register_prototypes_value(&mut self, json: &serde_json::Value) -> Result<usize> {
        let serde_json::Value::Object(entries) = json else {
            return Err(Error::serialization(
                "prototypes must be a JSON object keyed by prototype name",
            ));
        };

        let prototypes = entries
            .iter()
            .map(|(name, components)| Prototype::from_json(name, components))
            .collect::<Result<Vec<_>>>()?;

        let count = prototypes.len();
        for prototype in prototypes {
            self.register_prototype(prototype);
        }
        Ok(count)
    }

    /// Returns the prototype registered under `name`.
    #[must_use]
    pub fn prototype(&self, name: &str) -> Option<&Prototype> {
        self.prototypes.get(name)
    }

    /// Creates an entity from prototype `name`.
    ///
    /// # Errors
    /// Returns [`ErrorKind::UnknownPrototype`] for an unregistered name, or a
    /// component's construction or load failure. A failed spawn leaves no
    /// entity behind.
    pub fn spawn(&self, world: &mut World, name: &str) -> Result<EntityId> {
        let prototype = self
            .prototypes
            .get(name)
            .ok_or_else(|| Error::new(ErrorKind::UnknownPrototype(name.to_string())))?;

        let entity = world.create();
        if let Err(e) = self.apply(world, entity, prototype) {
            if let Err(cleanup) = world.destroy(entity) {
                warn!("rolling back spawn({name}) of {entity:?}: {cleanup}");
                // Drops what was built without running its hooks again.
                let _ = world.detach(entity);
            }
            return Err(e.with_frame(format!("spawn({name})")));
        }
        trace!("spawned {entity:?} from prototype {name}");
        Ok(entity)
    }

    fn apply(&self, world: &mut World, entity: EntityId, prototype: &Prototype) -> Result<()> {
        for (component, data) in &prototype.components {
            let mut built = self.construct(entity, component, &[])?;
            built.load(data)?;
            world.set_boxed(entity, component, built)?;
        }
        Ok(())
    }
}
