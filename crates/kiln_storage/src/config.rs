//! Store configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::index::IndexKind;

/// How a [`World`](crate::World) is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WorldConfig {
    /// Index strategy.
    pub index: IndexKind,
    /// First entity id the store issues.
    pub first_id: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            index: IndexKind::default(),
            first_id: 1,
        }
    }
}

impl WorldConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset using the scanning index.
    #[must_use]
    pub fn scanning() -> Self {
        Self::default().with_index(IndexKind::Scanning)
    }

    /// Preset using the memoized index.
    #[must_use]
    pub fn memoized() -> Self {
        Self::default().with_index(IndexKind::Memoized)
    }

    /// Sets the index strategy.
    #[must_use]
    pub const fn with_index(mut self, index: IndexKind) -> Self {
        self.index = index;
        self
    }

    /// Sets the first entity id.
    #[must_use]
    pub const fn with_first_id(mut self, first_id: u64) -> Self {
        self.first_id = first_id;
        self
    }
}
