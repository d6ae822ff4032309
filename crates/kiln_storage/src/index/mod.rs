//! Query index strategies.
//!
//! A [`QueryIndex`] answers "which live entities hold every component of
//! this query". The store notifies the active index after each structural
//! mutation, so an index may keep incremental state. Both strategies give
//! identical answers for every query after every mutation sequence.

mod memo;
mod scan;

pub use memo::MemoizedIndex;
pub use scan::ScanningIndex;

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use kiln_foundation::{EntityId, Error};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::component::ComponentMap;
use crate::entity::EntityTable;
use crate::key::Query;

/// A set of entity ids in ascending order.
pub type IdSet = BTreeSet<EntityId>;

/// The pluggable indexing strategy behind a [`World`](crate::World).
///
/// Notifications arrive after the store has updated its own tables:
/// `components` in [`QueryIndex::notify_add`] already holds `name`.
pub trait QueryIndex: fmt::Debug {
    /// Returns the live entities matching `query`.
    fn query<'a>(&'a mut self, query: &Query, table: &'a EntityTable) -> Cow<'a, IdSet>;

    /// An entity was registered, with no components or with components
    /// about to be replayed through [`QueryIndex::notify_add`].
    fn notify_create(&mut self, entity: EntityId);

    /// Component `name` was added to `entity`.
    fn notify_add(&mut self, entity: EntityId, name: &str, components: &ComponentMap);

    /// Component `name` was removed from `entity`.
    fn notify_remove(&mut self, entity: EntityId, name: &str);

    /// `entity` left the live set.
    fn notify_destroy(&mut self, entity: EntityId);

    /// Forgets every tracked entity.
    fn clear(&mut self);

    /// Returns which strategy this is.
    fn kind(&self) -> IndexKind;
}

/// Selects a [`QueryIndex`] implementation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum IndexKind {
    /// Recompute every query by full scan.
    Scanning,
    /// Cache each query's result and maintain it incrementally.
    #[default]
    Memoized,
}

impl IndexKind {
    /// Both strategies, for running the same checks against each.
    pub const ALL: [Self; 2] = [Self::Scanning, Self::Memoized];

    /// Builds a fresh index of this kind.
    #[must_use]
    pub fn build(self) -> Box<dyn QueryIndex> {
        match self {
            Self::Scanning => Box::new(ScanningIndex::new()),
            Self::Memoized => Box::new(MemoizedIndex::new()),
        }
    }

    /// Returns the lowercase name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scanning => "scanning",
            Self::Memoized => "memoized",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scanning" | "scan" => Ok(Self::Scanning),
            "memoized" | "memo" => Ok(Self::Memoized),
            other => Err(Error::invalid_config(format!(
                "unknown index kind {other:?}, expected \"scanning\" or \"memoized\""
            ))),
        }
    }
}
