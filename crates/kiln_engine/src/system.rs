//! Systems and the scheduling loop.
//!
//! A [`System`] is bound to a query when registered with a [`Scheduler`].
//! Each run calls, per system in registration order, `pre`, then `every`
//! for each current match, then `post`. `A` is the caller's run arguments,
//! such as a frame delta.

use std::fmt;

use kiln_foundation::Result;
use kiln_storage::{Query, Visit, World};
use log::{debug, trace};

// =============================================================================
// System
// =============================================================================

/// Per-query logic driven by a [`Scheduler`]. Every hook defaults to doing
/// nothing.
pub trait System<A: ?Sized = ()> {
    /// Called once by [`Scheduler::initialize`].
    ///
    /// # Errors
    /// An error aborts initialization.
    fn initialize(&mut self, world: &mut World) -> Result<()> {
        let _ = world;
        Ok(())
    }

    /// Called at the start of each run, before any match is visited.
    ///
    /// # Errors
    /// An error aborts the run.
    fn pre(&mut self, world: &mut World, args: &A) -> Result<()> {
        let _ = (world, args);
        Ok(())
    }

    /// Called for each entity matching the system's query.
    ///
    /// # Errors
    /// An error aborts the run.
    fn every(&mut self, visit: &mut Visit<'_>, args: &A) -> Result<()> {
        let _ = (visit, args);
        Ok(())
    }

    /// Called at the end of each run, after every match was visited.
    ///
    /// # Errors
    /// An error aborts the run.
    fn post(&mut self, world: &mut World, args: &A) -> Result<()> {
        let _ = (world, args);
        Ok(())
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Systems in registration order, each with its query.
pub struct Scheduler<A: ?Sized = ()> {
    systems: Vec<(Query, Box<dyn System<A>>)>,
}

impl<A: ?Sized> Default for Scheduler<A> {
    fn default() -> Self {
        Self {
            systems: Vec::new(),
        }
    }
}

impl<A: ?Sized> Scheduler<A> {
    /// Creates a scheduler with no systems.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `system` for the entities holding every name in `names`.
    ///
    /// The empty list binds the system to every live entity.
    ///
    /// # Errors
    /// Returns an error if a name is malformed.
    pub fn add(&mut self, names: &[&str], system: impl System<A> + 'static) -> Result<()> {
        let query = Query::new(names)?;
        debug!("registered system #{} for {}", self.systems.len(), query.key());
        self.systems.push((query, Box::new(system)));
        Ok(())
    }

    /// Returns the number of registered systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Returns true if no system is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Calls every system's `initialize`, in registration order.
    ///
    /// # Errors
    /// Stops at the first failing system.
    pub fn initialize(&mut self, world: &mut World) -> Result<()> {
        for (i, (_, system)) in self.systems.iter_mut().enumerate() {
            system
                .initialize(world)
                .map_err(|e| e.with_frame(format!("initialize(system #{i})")))?;
        }
        Ok(())
    }

    /// Runs every system once.
    ///
    /// Each system sees the effects of the systems before it. Matches are
    /// visited with the same safe-mutation rules as [`World::visit`].
    ///
    /// # Errors
    /// Stops at the first failing hook.
    pub fn run(&mut self, world: &mut World, args: &A) -> Result<()> {
        for (i, (query, system)) in self.systems.iter_mut().enumerate() {
            let frame = || format!("run(system #{i})");
            system.pre(world, args).map_err(|e| e.with_frame(frame()))?;
            world
                .visit(query, args, |visit, args| system.every(visit, args))
                .map_err(|e| e.with_frame(frame()))?;
            system.post(world, args).map_err(|e| e.with_frame(frame()))?;
        }
        trace!("ran {} systems", self.systems.len());
        Ok(())
    }
}

impl<A: ?Sized> fmt::Debug for Scheduler<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.systems.iter().map(|(query, _)| query.key()))
            .finish()
    }
}
