//! Query execution.
//!
//! [`World::every`] borrows the store and lazily yields the current matches.
//! The visitor forms ([`World::for_each`], [`World::for_each_with`],
//! [`World::visit`]) snapshot the match set first and hand each visitor
//! mutable access to the store, so visitors may create, mutate and destroy
//! entities while iteration continues safely.

use std::borrow::Cow;
use std::collections::btree_set;
use std::ops::ControlFlow;
use std::sync::Arc;

use kiln_foundation::{EntityId, Result, Value};

use crate::component::Component;
use crate::index::IdSet;
use crate::key::Query;
use crate::world::World;

/// Lazy iterator over a query's matches, in ascending id order.
#[derive(Debug)]
pub struct Matches<'a> {
    inner: Inner<'a>,
}

#[derive(Debug)]
enum Inner<'a> {
    Borrowed(btree_set::Iter<'a, EntityId>),
    Owned(btree_set::IntoIter<EntityId>),
}

impl<'a> From<Cow<'a, IdSet>> for Matches<'a> {
    fn from(set: Cow<'a, IdSet>) -> Self {
        let inner = match set {
            Cow::Borrowed(set) => Inner::Borrowed(set.iter()),
            Cow::Owned(set) => Inner::Owned(set.into_iter()),
        };
        Self { inner }
    }
}

impl Iterator for Matches<'_> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        match &mut self.inner {
            Inner::Borrowed(iter) => iter.next().copied(),
            Inner::Owned(iter) => iter.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            Inner::Borrowed(iter) => iter.size_hint(),
            Inner::Owned(iter) => iter.size_hint(),
        }
    }
}

impl ExactSizeIterator for Matches<'_> {}

/// What a visitor returns: keep going, stop, or fail.
///
/// `()` and `true` continue, `false` stops, and an `Err` aborts the
/// iteration and is propagated.
pub trait IntoFlow {
    /// Converts into the iteration decision.
    ///
    /// # Errors
    ///
    /// Returns the visitor's error.
    fn into_flow(self) -> Result<ControlFlow<()>>;
}

impl IntoFlow for () {
    fn into_flow(self) -> Result<ControlFlow<()>> {
        Ok(ControlFlow::Continue(()))
    }
}

impl IntoFlow for bool {
    fn into_flow(self) -> Result<ControlFlow<()>> {
        Ok(if self {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(())
        })
    }
}

impl IntoFlow for ControlFlow<()> {
    fn into_flow(self) -> Result<ControlFlow<()>> {
        Ok(self)
    }
}

impl<T: IntoFlow> IntoFlow for Result<T> {
    fn into_flow(self) -> Result<ControlFlow<()>> {
        self?.into_flow()
    }
}

/// One matched entity, handed to a visitor.
///
/// Component positions follow the order the query's names were declared in.
#[derive(Debug)]
pub struct Visit<'w> {
    world: &'w mut World,
    entity: EntityId,
    query: &'w Query,
}

impl Visit<'_> {
    /// Returns the matched entity.
    #[must_use]
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Returns the store, for reads and mutations of any entity.
    pub fn world(&mut self) -> &mut World {
        &mut *self.world
    }

    /// Returns the query's names in declared order.
    #[must_use]
    pub fn names(&self) -> &[Arc<str>] {
        self.query.declared()
    }

    /// Returns the component at position `i` of the query.
    ///
    /// `None` if the position is out of range or the component was removed
    /// earlier in this visit.
    #[must_use]
    pub fn component(&self, i: usize) -> Option<&dyn Component> {
        let name = self.query.declared().get(i)?;
        self.world.get(self.entity, name)
    }

    /// Returns the component at position `i`, mutably.
    pub fn component_mut(&mut self, i: usize) -> Option<&mut (dyn Component + 'static)> {
        let name = self.query.declared().get(i)?;
        self.world.get_mut(self.entity, name)
    }

    /// Returns the component at position `i` as a concrete type.
    #[must_use]
    pub fn get<T: Component>(&self, i: usize) -> Option<&T> {
        self.component(i)?.downcast_ref()
    }

    /// Returns the component at position `i` as a concrete type, mutably.
    pub fn get_mut<T: Component>(&mut self, i: usize) -> Option<&mut T> {
        self.component_mut(i)?.downcast_mut()
    }

    /// Returns the data component at position `i`.
    #[must_use]
    pub fn value(&self, i: usize) -> Option<&Value> {
        self.get(i)
    }

    /// Returns the data component at position `i`, mutably.
    pub fn value_mut(&mut self, i: usize) -> Option<&mut Value> {
        self.get_mut(i)
    }
}

impl World {
    // --- Queries ---

    /// Returns the current matches for `names` as a lazy iterator.
    ///
    /// The empty list matches every live entity.
    ///
    /// # Errors
    ///
    /// Fails if a name is malformed.
    pub fn every(&mut self, names: &[&str]) -> Result<Matches<'_>> {
        let query = Query::new(names)?;
        Ok(self.query(&query))
    }

    /// Returns the current matches for an already built query.
    pub fn query(&mut self, query: &Query) -> Matches<'_> {
        Matches::from(self.index.query(query, &self.entities))
    }

    /// Collects the current matches for `names`.
    ///
    /// # Errors
    ///
    /// Fails if a name is malformed.
    pub fn matching(&mut self, names: &[&str]) -> Result<Vec<EntityId>> {
        Ok(self.every(names)?.collect())
    }

    /// Visits every entity matching `names`.
    ///
    /// # Errors
    ///
    /// Fails if a name is malformed, or with the first visitor error.
    pub fn for_each<F, R>(&mut self, names: &[&str], mut visitor: F) -> Result<()>
    where
        F: FnMut(&mut Visit<'_>) -> R,
        R: IntoFlow,
    {
        let query = Query::new(names)?;
        self.visit(&query, &(), |visit, _| visitor(visit))
    }

    /// Visits every entity matching `names`, passing `args` along.
    ///
    /// # Errors
    ///
    /// Fails if a name is malformed, or with the first visitor error.
    pub fn for_each_with<A, F, R>(&mut self, names: &[&str], args: &A, visitor: F) -> Result<()>
    where
        A: ?Sized,
        F: FnMut(&mut Visit<'_>, &A) -> R,
        R: IntoFlow,
    {
        let query = Query::new(names)?;
        self.visit(&query, args, visitor)
    }

    /// Visits every entity matching `query`.
    ///
    /// The match set is captured before the first visit. An entity is
    /// visited only if it still matches at its turn, so entities a visitor
    /// destroys or strips are skipped, and entities created during the
    /// iteration are not visited.
    ///
    /// # Errors
    ///
    /// Returns the first visitor error; the remaining matches are not visited.
    pub fn visit<A, F, R>(&mut self, query: &Query, args: &A, mut visitor: F) -> Result<()>
    where
        A: ?Sized,
        F: FnMut(&mut Visit<'_>, &A) -> R,
        R: IntoFlow,
    {
        let snapshot: Vec<EntityId> = self.query(query).collect();
        for entity in snapshot {
            let still_matches = self
                .entities
                .get(entity)
                .is_some_and(|components| query.matches(components));
            if !still_matches {
                continue;
            }

            let mut visit = Visit {
                world: &mut *self,
                entity,
                query,
            };
            if visitor(&mut visit, args).into_flow()?.is_break() {
                break;
            }
        }
        Ok(())
    }
}
