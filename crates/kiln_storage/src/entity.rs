//! Entity identity and live-entity bookkeeping.
//!
//! Ids come from an [`IdAllocator`] scoped to one store and are never
//! reissued by it. Live entities sit in an [`EntityTable`]; an entity taken
//! out of its store travels as an owned [`Entity`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use kiln_foundation::{EntityId, Error, ErrorContext, Result, Value};

use crate::component::{Component, ComponentMap, Teardown};
use crate::index::IdSet;
use crate::key::{Query, validate_name};

/// Largest first id an [`IdAllocator`] accepts.
///
/// Keeps at least 2^63 ids available above any store's first id, and keeps
/// every id representable as an `i64`.
pub const MAX_FIRST_ID: u64 = u64::MAX >> 1;

/// Issues monotonically increasing entity ids.
///
/// Ids at or above `first` count as issued once any id past them has been
/// handed out or reserved. Foreign ids below `first` are remembered one by
/// one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdAllocator {
    first: u64,
    next: u64,
    below_first: BTreeSet<u64>,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self {
            first: 1,
            next: 1,
            below_first: BTreeSet::new(),
        }
    }
}

impl IdAllocator {
    /// Creates an allocator whose first id is `first`.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if `first` exceeds [`MAX_FIRST_ID`].
    pub fn new(first: u64) -> Result<Self> {
        if first > MAX_FIRST_ID {
            return Err(Error::invalid_config(format!(
                "first id {first} exceeds {MAX_FIRST_ID}"
            )));
        }
        Ok(Self {
            first,
            next: first,
            below_first: BTreeSet::new(),
        })
    }

    /// Issues the next id.
    pub fn issue(&mut self) -> EntityId {
        let id = EntityId::new(self.next);
        // `first <= MAX_FIRST_ID`: saturating takes 2^63 issues.
        self.next = self.next.saturating_add(1);
        id
    }

    /// Marks `id` as issued.
    ///
    /// Ids at or above the first id also mark every id below them as issued.
    pub fn reserve(&mut self, id: EntityId) {
        let raw = id.raw();
        if raw < self.first {
            self.below_first.insert(raw);
        } else if raw >= self.next {
            self.next = raw.saturating_add(1);
        }
    }

    /// Returns true if this allocator has already handed out or reserved
    /// `id`.
    #[must_use]
    pub fn is_issued(&self, id: EntityId) -> bool {
        let raw = id.raw();
        (self.first..self.next).contains(&raw) || self.below_first.contains(&raw)
    }

    /// Returns the id [`IdAllocator::issue`] would return next.
    #[must_use]
    pub fn peek(&self) -> EntityId {
        EntityId::new(self.next)
    }
}

/// An entity outside any store: an optional id plus its components.
///
/// Detached entities are invisible to every query. Removing components
/// still runs their teardown hooks, with only the entity's own components
/// in view.
#[derive(Debug, Default)]
pub struct Entity {
    id: Option<EntityId>,
    components: ComponentMap,
}

impl Entity {
    /// Creates an entity with no id and no components.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(id: EntityId, components: ComponentMap) -> Self {
        Self {
            id: Some(id),
            components,
        }
    }

    pub(crate) fn into_parts(self) -> (Option<EntityId>, ComponentMap) {
        (self.id, self.components)
    }

    /// Builder form of [`Entity::set`].
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is malformed.
    pub fn with(mut self, name: &str, component: impl Component) -> Result<Self> {
        self.set(name, component)?;
        Ok(self)
    }

    /// Returns the id this entity was issued, if any.
    #[must_use]
    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    /// Forgets the id so the entity can be attached to an unrelated store.
    #[must_use]
    pub fn without_id(mut self) -> Self {
        self.id = None;
        self
    }

    /// Returns true if every name is attached. The empty list is always true.
    #[must_use]
    pub fn has(&self, names: &[&str]) -> bool {
        names.iter().all(|name| self.components.contains(name))
    }

    /// Returns the component under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Component> {
        self.components.get(name)
    }

    /// Returns the component under `name` as a concrete type.
    #[must_use]
    pub fn get_as<T: Component>(&self, name: &str) -> Option<&T> {
        self.get(name)?.downcast_ref()
    }

    /// Returns the component under `name`, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn Component + 'static)> {
        self.components.get_mut(name)
    }

    /// Returns a data component.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get_as(name)
    }

    /// Returns the components.
    #[must_use]
    pub fn components(&self) -> &ComponentMap {
        &self.components
    }

    /// Installs `component` under `name`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is malformed.
    pub fn set(&mut self, name: &str, component: impl Component) -> Result<()> {
        validate_name(name)?;
        self.components.insert(Arc::from(name), Box::new(component));
        Ok(())
    }

    /// Merges `patch` into the component under `name`, or installs it as a
    /// data component if `name` is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is malformed or the component rejects
    /// merging.
    pub fn update(&mut self, name: &str, patch: Value) -> Result<()> {
        validate_name(name)?;
        match self.components.get_mut(name) {
            Some(component) => component
                .merge(&patch)
                .map_err(|e| e.with_context(context(self.id, name))),
            None => {
                self.components.insert(Arc::from(name), Box::new(patch));
                Ok(())
            }
        }
    }

    /// Removes the component under `name` after running its teardown hook.
    ///
    /// An absent name is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the hook's error, in which case the component stays.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let Some(component) = self.components.checkout(name) else {
            return Ok(());
        };

        let mut teardown = Teardown::detached(&self.components, self.id, name);
        match component.on_remove(&mut teardown) {
            Ok(()) => {
                self.components.remove(name);
                Ok(())
            }
            Err(e) => {
                self.components.restore(name, component);
                Err(e.with_frame(format!("on_remove({name})")))
            }
        }
    }

    /// Removes every component in ascending name order.
    ///
    /// # Errors
    ///
    /// Stops at the first failing hook.
    pub fn remove_all(&mut self) -> Result<()> {
        let names: Vec<Arc<str>> = self.components.names().cloned().collect();
        for name in names {
            self.remove(&name)?;
        }
        Ok(())
    }
}

fn context(entity: Option<EntityId>, component: &str) -> ErrorContext {
    let ctx = ErrorContext::new().with_component(component);
    match entity {
        Some(id) => ctx.with_entity(id),
        None => ctx,
    }
}

/// Live entities of one store, in ascending id order.
#[derive(Debug, Default)]
pub struct EntityTable {
    live: BTreeMap<EntityId, ComponentMap>,
}

impl EntityTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Returns true if no entity is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Returns true if `id` is live.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.live.contains_key(&id)
    }

    /// Returns the components of a live entity.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&ComponentMap> {
        self.live.get(&id)
    }

    /// Returns the components of a live entity, mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut ComponentMap> {
        self.live.get_mut(&id)
    }

    /// Iterates over live ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.live.keys().copied()
    }

    /// Returns every live entity matching `query`, by full scan.
    #[must_use]
    pub fn matching(&self, query: &Query) -> IdSet {
        self.live
            .iter()
            .filter(|(_, components)| query.matches(components))
            .map(|(id, _)| *id)
            .collect()
    }

    pub(crate) fn insert(&mut self, id: EntityId, components: ComponentMap) {
        self.live.insert(id, components);
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> Option<ComponentMap> {
        self.live.remove(&id)
    }

    pub(crate) fn clear(&mut self) {
        self.live.clear();
    }
}

/// Looks up a live entity or fails with [`Error::entity_not_found`].
pub(crate) fn live_mut(table: &mut EntityTable, id: EntityId) -> Result<&mut ComponentMap> {
    table.get_mut(id).ok_or_else(|| Error::entity_not_found(id))
}
