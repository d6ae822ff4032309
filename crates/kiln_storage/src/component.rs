//! Component capability interface and per-entity component maps.
//!
//! Components are opaque to the store. Anything implementing [`Component`]
//! can be attached under a name; plain data components are [`Value`]s.
//! The optional hooks cover what the store and its collaborators need:
//! teardown on removal, merging for `update`, and a data form for
//! (de)serialization.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use kiln_foundation::{EntityId, Error, Result, Value};

use crate::world::World;

/// Upcast to [`Any`] for downcasting trait objects.
pub trait AsAny: Any {
    /// Returns `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// Returns `self` as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A value attached to an entity under a component name.
///
/// Every hook has a default, so a marker type only needs
/// `impl Component for Marker {}`.
pub trait Component: AsAny + fmt::Debug {
    /// Called before this component leaves its entity, through `remove`,
    /// `remove_all` or `destroy`.
    ///
    /// The component is still attached while the hook runs. Reading the
    /// owning entity is allowed; structurally mutating it is rejected with
    /// a re-entrancy error. Other entities may be mutated freely.
    ///
    /// # Errors
    ///
    /// Returning an error aborts the removal and leaves the entity intact.
    fn on_remove(&self, teardown: &mut Teardown<'_>) -> Result<()> {
        let _ = teardown;
        Ok(())
    }

    /// Merges `patch` into this component in place. Used by `update`.
    ///
    /// # Errors
    ///
    /// The default rejects merging.
    fn merge(&mut self, patch: &Value) -> Result<()> {
        let _ = patch;
        Err(Error::immutable(std::any::type_name::<Self>(), "merge"))
    }

    /// Returns the data form of this component, or `None` if it has none.
    fn to_value(&self) -> Option<Value> {
        None
    }

    /// Loads a data form produced by [`Component::to_value`].
    ///
    /// # Errors
    ///
    /// The default delegates to [`Component::merge`].
    fn load(&mut self, data: &Value) -> Result<()> {
        self.merge(data)
    }
}

impl Component for Value {
    fn merge(&mut self, patch: &Value) -> Result<()> {
        *self = self.merged(patch);
        Ok(())
    }

    fn to_value(&self) -> Option<Value> {
        Some(self.clone())
    }
}

impl dyn Component {
    /// Downcasts to a concrete component type.
    #[must_use]
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    /// Downcasts to a concrete component type, mutably.
    #[must_use]
    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }

    /// Returns the component as a data value, if it is one.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        self.downcast_ref()
    }
}

/// The components of one entity, keyed by name in ascending order.
///
/// A slot holding `None` is checked out: its component is running a
/// teardown hook. Checked-out slots still count as present for queries.
#[derive(Debug, Default)]
pub struct ComponentMap {
    slots: BTreeMap<Arc<str>, Option<Box<dyn Component>>>,
}

impl ComponentMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of components, checked-out ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the map holds no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns true if a component is attached under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Returns the component under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Component> {
        self.slots.get(name)?.as_deref()
    }

    /// Returns the component under `name`, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn Component + 'static)> {
        self.slots.get_mut(name)?.as_deref_mut()
    }

    /// Installs `component` under `name`, dropping any previous one.
    ///
    /// Returns true if `name` was not present before.
    pub fn insert(&mut self, name: Arc<str>, component: Box<dyn Component>) -> bool {
        self.slots.insert(name, Some(component)).is_none()
    }

    /// Removes and returns the component under `name`.
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Component>> {
        self.slots.remove(name).flatten()
    }

    /// Returns the component names in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &Arc<str>> {
        self.slots.keys()
    }

    /// Iterates over present components in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &dyn Component)> {
        self.slots
            .iter()
            .filter_map(|(name, slot)| slot.as_deref().map(|c| (name, c)))
    }

    /// Takes the component out of its slot, leaving the name registered.
    pub(crate) fn checkout(&mut self, name: &str) -> Option<Box<dyn Component>> {
        self.slots.get_mut(name)?.take()
    }

    /// Puts a checked-out component back.
    pub(crate) fn restore(&mut self, name: &str, component: Box<dyn Component>) {
        if let Some(slot) = self.slots.get_mut(name) {
            *slot = Some(component);
        }
    }

    /// Drops every component without running hooks.
    pub(crate) fn clear(&mut self) {
        self.slots.clear();
    }
}

enum Scope<'a> {
    Attached(&'a mut World),
    Detached(&'a ComponentMap),
}

/// What a teardown hook can see while its component is being removed.
pub struct Teardown<'a> {
    entity: Option<EntityId>,
    component: &'a str,
    scope: Scope<'a>,
}

impl<'a> Teardown<'a> {
    pub(crate) fn attached(world: &'a mut World, entity: EntityId, component: &'a str) -> Self {
        Self {
            entity: Some(entity),
            component,
            scope: Scope::Attached(world),
        }
    }

    pub(crate) fn detached(
        components: &'a ComponentMap,
        entity: Option<EntityId>,
        component: &'a str,
    ) -> Self {
        Self {
            entity,
            component,
            scope: Scope::Detached(components),
        }
    }

    /// Returns the owning entity's id, if it has one.
    #[must_use]
    pub fn entity(&self) -> Option<EntityId> {
        self.entity
    }

    /// Returns the name of the component being removed.
    #[must_use]
    pub fn component_name(&self) -> &str {
        self.component
    }

    /// Returns another component of the owning entity.
    #[must_use]
    pub fn sibling(&self, name: &str) -> Option<&dyn Component> {
        match &self.scope {
            Scope::Attached(world) => world.get(self.entity?, name),
            Scope::Detached(components) => components.get(name),
        }
    }

    /// Returns another component of the owning entity as a concrete type.
    #[must_use]
    pub fn sibling_as<T: Component>(&self, name: &str) -> Option<&T> {
        self.sibling(name)?.downcast_ref()
    }

    /// Returns the store the owning entity lives in, or `None` for a
    /// detached entity.
    pub fn world(&mut self) -> Option<&mut World> {
        match &mut self.scope {
            Scope::Attached(world) => Some(&mut **world),
            Scope::Detached(_) => None,
        }
    }
}

impl fmt::Debug for Teardown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Teardown")
            .field("entity", &self.entity)
            .field("component", &self.component)
            .field("attached", &matches!(self.scope, Scope::Attached(_)))
            .finish()
    }
}
