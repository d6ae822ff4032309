//! The entity/component store.
//!
//! `World` owns the live entities and their components and keeps the active
//! [`QueryIndex`] informed of every structural change. Component teardown
//! hooks run synchronously inside `remove` and `destroy`; while a hook runs,
//! its owning entity is locked against structural mutation.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use kiln_foundation::{EntityId, Error, ErrorContext, Result, Value};
use log::{debug, trace, warn};

use crate::component::{Component, ComponentMap, Teardown};
use crate::config::WorldConfig;
use crate::entity::{Entity, EntityTable, IdAllocator, live_mut};
use crate::index::{IndexKind, QueryIndex};
use crate::key::validate_name;

/// An entity/component store with a pluggable query index.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    ids: IdAllocator,
    pub(crate) entities: EntityTable,
    pub(crate) index: Box<dyn QueryIndex>,
    /// Entities whose hooks are running, with the first structural
    /// mutation a hook attempted on them.
    teardown: HashMap<EntityId, Option<&'static str>>,
    /// Ids detached from this store, eligible to be attached again.
    detached: BTreeSet<EntityId>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates an empty store with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        let config = WorldConfig::default();
        let index = config.index.build();
        Self::assemble(config, IdAllocator::default(), index)
    }

    /// Creates an empty store from `config`.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the first id is out of range.
    pub fn with_config(config: WorldConfig) -> Result<Self> {
        let ids = IdAllocator::new(config.first_id)?;
        let index = config.index.build();
        Ok(Self::assemble(config, ids, index))
    }

    /// Creates an empty store driven by a caller-supplied index.
    #[must_use]
    pub fn with_index(index: Box<dyn QueryIndex>) -> Self {
        let config = WorldConfig::default().with_index(index.kind());
        Self::assemble(config, IdAllocator::default(), index)
    }

    fn assemble(config: WorldConfig, ids: IdAllocator, index: Box<dyn QueryIndex>) -> Self {
        debug!(
            "created world with {} index, first id {}",
            index.kind(),
            config.first_id
        );
        Self {
            ids,
            config,
            entities: EntityTable::new(),
            index,
            teardown: HashMap::new(),
            detached: BTreeSet::new(),
        }
    }

    /// Returns the configuration this store was built with.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Returns the active index strategy.
    #[must_use]
    pub fn index_kind(&self) -> IndexKind {
        self.index.kind()
    }

    /// Returns the active index.
    #[must_use]
    pub fn index(&self) -> &dyn QueryIndex {
        self.index.as_ref()
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if no entity is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterates over live ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.ids()
    }

    /// Returns true if `id` is live in this store.
    #[must_use]
    pub fn exists(&self, id: EntityId) -> bool {
        self.entities.contains(id)
    }

    // --- Entity Operations ---

    /// Creates an entity with no components.
    pub fn create(&mut self) -> EntityId {
        let id = self.ids.issue();
        self.entities.insert(id, ComponentMap::new());
        self.index.notify_create(id);
        trace!("created {id:?}");
        id
    }

    /// Destroys an entity.
    ///
    /// Every component's teardown hook runs, in ascending name order, while
    /// all components are still attached. Only then is the entity removed.
    /// Destroying a non-live entity is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the first hook failure or re-entrancy violation, leaving the
    /// entity live with all of its components.
    pub fn destroy(&mut self, id: EntityId) -> Result<()> {
        self.check_mutable(id, "destroy")?;
        let Some(components) = self.entities.get(id) else {
            return Ok(());
        };

        let names: Vec<Arc<str>> = components.names().cloned().collect();
        for name in &names {
            self.run_hook(id, name).map_err(|e| e.with_frame("destroy"))?;
        }

        self.entities.remove(id);
        self.index.notify_destroy(id);
        trace!("destroyed {id:?}");
        Ok(())
    }

    /// Takes a live entity out of the store without running any hook.
    ///
    /// The returned entity keeps its id and components and can be given to
    /// [`World::attach`]. Detaching a non-live entity returns `None`.
    ///
    /// # Errors
    ///
    /// Fails if called from a hook of the same entity.
    pub fn detach(&mut self, id: EntityId) -> Result<Option<Entity>> {
        self.check_mutable(id, "detach")?;
        let Some(components) = self.entities.remove(id) else {
            return Ok(None);
        };

        self.index.notify_destroy(id);
        self.detached.insert(id);
        trace!("detached {id:?}");
        Ok(Some(Entity::from_parts(id, components)))
    }

    /// Registers an entity in this store and indexes its components.
    ///
    /// An entity without an id gets a fresh one. An entity keeping its id
    /// is accepted if this store detached that id, or never issued or
    /// accepted it before.
    ///
    /// # Errors
    ///
    /// Fails with an id conflict if the id is live here, or was issued or
    /// accepted here by an entity that has since been destroyed.
    pub fn attach(&mut self, entity: Entity) -> Result<EntityId> {
        let (id, components) = entity.into_parts();
        let id = match id {
            None => self.ids.issue(),
            Some(id) if self.entities.contains(id) => return Err(Error::id_conflict(id)),
            Some(id) if self.detached.remove(&id) => id,
            Some(id) if !self.ids.is_issued(id) => {
                self.ids.reserve(id);
                id
            }
            Some(id) => return Err(Error::id_conflict(id)),
        };

        self.entities.insert(id, components);
        self.index.notify_create(id);
        if let Some(components) = self.entities.get(id) {
            for name in components.names() {
                self.index.notify_add(id, name, components);
            }
        }
        trace!("attached {id:?}");
        Ok(id)
    }

    /// Destroys every live entity, then resets the store and its index.
    ///
    /// Cleanup always completes: entities whose hooks fail are dropped
    /// without further teardown. Ids keep counting up afterwards.
    ///
    /// # Errors
    ///
    /// Returns the first hook failure encountered. Fails without doing
    /// anything if called from inside a hook.
    pub fn clear(&mut self) -> Result<()> {
        if let Some(id) = self.teardown.keys().next().copied() {
            return Err(Error::reentrant(id, "clear"));
        }

        let ids: Vec<EntityId> = self.entities.ids().collect();
        let mut first_error = None;
        for id in ids {
            if let Err(e) = self.destroy(id) {
                warn!("teardown of {id:?} failed during clear: {e}");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        let leftover = self.entities.len();
        self.entities.clear();
        self.index.clear();
        debug!("cleared world, {leftover} entities dropped without teardown");
        first_error.map_or(Ok(()), Err)
    }

    // --- Component Operations ---

    /// Installs `component` under `name`, replacing any previous one.
    ///
    /// A replaced component is dropped without running its teardown hook.
    ///
    /// # Errors
    ///
    /// Fails if `name` is malformed, the entity is not live, or the entity
    /// is being torn down.
    pub fn set(&mut self, id: EntityId, name: &str, component: impl Component) -> Result<()> {
        self.set_boxed(id, name, Box::new(component))
    }

    /// Like [`World::set`], for an already boxed component.
    ///
    /// # Errors
    ///
    /// See [`World::set`].
    pub fn set_boxed(
        &mut self,
        id: EntityId,
        name: &str,
        component: Box<dyn Component>,
    ) -> Result<()> {
        validate_name(name)?;
        self.check_mutable(id, "set")?;
        let components = live_mut(&mut self.entities, id)?;

        if components.insert(Arc::from(name), component) {
            trace!("{id:?} gained {name}");
            self.index.notify_add(id, name, components);
        }
        Ok(())
    }

    /// Merges `patch` into the component under `name`.
    ///
    /// An absent component is installed as the patch itself, like
    /// [`World::set`].
    ///
    /// # Errors
    ///
    /// Fails like [`World::set`], or if the existing component rejects the
    /// merge, in which case it is left unchanged.
    pub fn update(&mut self, id: EntityId, name: &str, patch: Value) -> Result<()> {
        validate_name(name)?;
        self.check_mutable(id, "update")?;
        let components = live_mut(&mut self.entities, id)?;

        if let Some(existing) = components.get_mut(name) {
            return existing.merge(&patch).map_err(|e| {
                e.with_context(ErrorContext::new().with_entity(id).with_component(name))
            });
        }

        components.insert(Arc::from(name), Box::new(patch));
        trace!("{id:?} gained {name}");
        self.index.notify_add(id, name, components);
        Ok(())
    }

    /// Returns the component under `name`, installing an empty record first
    /// if it is absent.
    ///
    /// # Errors
    ///
    /// Fails like [`World::set`].
    pub fn access(&mut self, id: EntityId, name: &str) -> Result<&mut (dyn Component + 'static)> {
        validate_name(name)?;
        if !self.has(id, &[name]) {
            self.set(id, name, Value::empty_map())?;
        }
        live_mut(&mut self.entities, id)?
            .get_mut(name)
            .ok_or_else(|| Error::reentrant(id, "access"))
    }

    /// Removes the component under `name` after running its teardown hook.
    ///
    /// A non-live entity or an absent name is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the hook's failure or re-entrancy violation, leaving the
    /// component attached.
    pub fn remove(&mut self, id: EntityId, name: &str) -> Result<()> {
        self.check_mutable(id, "remove")?;
        if !self.entities.get(id).is_some_and(|c| c.contains(name)) {
            return Ok(());
        }

        let name: Arc<str> = Arc::from(name);
        self.run_hook(id, &name)?;

        if let Some(components) = self.entities.get_mut(id) {
            components.remove(&name);
        }
        trace!("{id:?} lost {name}");
        self.index.notify_remove(id, &name);
        Ok(())
    }

    /// Removes each named component in turn.
    ///
    /// # Errors
    ///
    /// Stops at the first failing removal.
    pub fn remove_many(&mut self, id: EntityId, names: &[&str]) -> Result<()> {
        for name in names {
            self.remove(id, name)?;
        }
        Ok(())
    }

    /// Removes every component, in ascending name order.
    ///
    /// # Errors
    ///
    /// Stops at the first failing removal.
    pub fn remove_all(&mut self, id: EntityId) -> Result<()> {
        let names: Vec<Arc<str>> = match self.entities.get(id) {
            Some(components) => components.names().cloned().collect(),
            None => return Ok(()),
        };
        for name in &names {
            self.remove(id, name)?;
        }
        Ok(())
    }

    // --- Component Access ---

    /// Returns true if the entity is live and holds every name. The empty
    /// list is true for any live entity.
    #[must_use]
    pub fn has(&self, id: EntityId, names: &[&str]) -> bool {
        self.entities
            .get(id)
            .is_some_and(|components| names.iter().all(|name| components.contains(name)))
    }

    /// Returns the components of a live entity.
    #[must_use]
    pub fn components(&self, id: EntityId) -> Option<&ComponentMap> {
        self.entities.get(id)
    }

    /// Returns the component under `name`.
    #[must_use]
    pub fn get(&self, id: EntityId, name: &str) -> Option<&dyn Component> {
        self.entities.get(id)?.get(name)
    }

    /// Returns the component under `name` as a concrete type.
    #[must_use]
    pub fn get_as<T: Component>(&self, id: EntityId, name: &str) -> Option<&T> {
        self.get(id, name)?.downcast_ref()
    }

    /// Returns the component under `name`, mutably.
    ///
    /// Editing a component in place is not a structural change and is
    /// allowed during teardown.
    pub fn get_mut(&mut self, id: EntityId, name: &str) -> Option<&mut (dyn Component + 'static)> {
        self.entities.get_mut(id)?.get_mut(name)
    }

    /// Returns the component under `name` as a concrete type, mutably.
    pub fn get_mut_as<T: Component>(&mut self, id: EntityId, name: &str) -> Option<&mut T> {
        self.get_mut(id, name)?.downcast_mut()
    }

    /// Returns a data component.
    #[must_use]
    pub fn value(&self, id: EntityId, name: &str) -> Option<&Value> {
        self.get_as(id, name)
    }

    /// Returns a data component, mutably.
    pub fn value_mut(&mut self, id: EntityId, name: &str) -> Option<&mut Value> {
        self.get_mut_as(id, name)
    }

    // --- Teardown ---

    /// Rejects structural mutation of an entity whose hooks are running.
    fn check_mutable(&mut self, id: EntityId, operation: &'static str) -> Result<()> {
        let Some(violation) = self.teardown.get_mut(&id) else {
            return Ok(());
        };
        if violation.is_none() {
            *violation = Some(operation);
        }
        warn!("rejected {operation} on {id:?} while its components are being torn down");
        Err(Error::reentrant(id, operation))
    }

    /// Runs the teardown hook of one component, leaving it attached.
    ///
    /// Fails if the hook fails or attempted a structural mutation of its
    /// own entity, even if the hook swallowed that error.
    fn run_hook(&mut self, id: EntityId, name: &Arc<str>) -> Result<()> {
        let Some(component) = self.entities.get_mut(id).and_then(|c| c.checkout(name)) else {
            return Ok(());
        };

        self.teardown.insert(id, None);
        let result = {
            let mut teardown = Teardown::attached(self, id, name);
            component.on_remove(&mut teardown)
        };
        let violation = self.teardown.remove(&id).flatten();

        if let Some(components) = self.entities.get_mut(id) {
            components.restore(name, component);
        }

        let frame = format!("on_remove({name})");
        match (result, violation) {
            (Err(e), _) => {
                warn!("teardown hook {name} of {id:?} failed: {e}");
                Err(e.with_frame(frame))
            }
            (Ok(()), Some(operation)) => Err(Error::reentrant(id, operation).with_frame(frame)),
            (Ok(()), None) => Ok(()),
        }
    }
}
