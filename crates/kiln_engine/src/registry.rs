//! Component constructor dispatch.
//!
//! A [`Registry`] maps component names to factories. Inserting a component
//! by name goes through its factory when one is defined; otherwise the
//! arguments are stored as a plain data component.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use kiln_foundation::{EntityId, Result, Value};
use kiln_storage::{Component, World, key::validate_name};
use log::debug;

use crate::prototype::Prototype;

type Factory = Box<dyn Fn(EntityId, &[Value]) -> Result<Box<dyn Component>>>;

// =============================================================================
// Registry
// =============================================================================

/// Component factories and prototype templates.
#[derive(Default)]
pub struct Registry {
    factories: HashMap<Arc<str>, Factory>,
    pub(crate) prototypes: HashMap<String, Prototype>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the factory for component `name`, replacing any previous one.
    ///
    /// The factory receives the entity the component is built for and the
    /// caller's arguments.
    ///
    /// # Errors
    /// Returns an error if `name` is malformed.
    pub fn define<C, F>(&mut self, name: &str, factory: F) -> Result<()>
    where
        C: Component,
        F: Fn(EntityId, &[Value]) -> Result<C> + 'static,
    {
        validate_name(name)?;
        let boxed: Factory = Box::new(move |entity: EntityId, args: &[Value]| {
            factory(entity, args).map(|c| Box::new(c) as Box<dyn Component>)
        });
        if self.factories.insert(Arc::from(name), boxed).is_some() {
            debug!("replaced factory for component {name}");
        }
        Ok(())
    }

    /// Returns true if `name` has a factory.
    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Returns the names with factories, in no particular order.
    pub fn defined(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(AsRef::as_ref)
    }

    /// Builds component `name` for `entity` without attaching it.
    ///
    /// Without a factory, no arguments give an empty record and otherwise
    /// the first argument is used as is.
    ///
    /// # Errors
    /// Returns the factory's error.
    pub fn construct(
        &self,
        entity: EntityId,
        name: &str,
        args: &[Value],
    ) -> Result<Box<dyn Component>> {
        match self.factories.get(name) {
            Some(factory) => {
                factory(entity, args).map_err(|e| e.with_frame(format!("construct({name})")))
            }
            None => Ok(Box::new(args.first().cloned().unwrap_or_else(Value::empty_map))),
        }
    }

    /// Builds component `name` and attaches it to `entity`.
    ///
    /// # Errors
    /// Returns the factory's error or the store's rejection.
    pub fn insert(
        &self,
        world: &mut World,
        entity: EntityId,
        name: &str,
        args: &[Value],
    ) -> Result<()> {
        validate_name(name)?;
        let component = self.construct(entity, name, args)?;
        world.set_boxed(entity, name, component)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut factories: Vec<&str> = self.defined().collect();
        factories.sort_unstable();
        let mut prototypes: Vec<&str> = self.prototypes.keys().map(String::as_str).collect();
        prototypes.sort_unstable();
        f.debug_struct("Registry")
            .field("factories", &factories)
            .field("prototypes", &prototypes)
            .finish()
    }
}
