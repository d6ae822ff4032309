//! The scanning strategy: no state, every query is a full scan.

use std::borrow::Cow;

use kiln_foundation::EntityId;

use super::{IdSet, IndexKind, QueryIndex};
use crate::component::ComponentMap;
use crate::entity::EntityTable;
use crate::key::Query;

/// Answers every query by testing each live entity.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScanningIndex;

impl ScanningIndex {
    /// Creates a scanning index.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl QueryIndex for ScanningIndex {
    fn query<'a>(&'a mut self, query: &Query, table: &'a EntityTable) -> Cow<'a, IdSet> {
        Cow::Owned(table.matching(query))
    }

    fn notify_create(&mut self, _entity: EntityId) {}

    fn notify_add(&mut self, _entity: EntityId, _name: &str, _components: &ComponentMap) {}

    fn notify_remove(&mut self, _entity: EntityId, _name: &str) {}

    fn notify_destroy(&mut self, _entity: EntityId) {}

    fn clear(&mut self) {}

    fn kind(&self) -> IndexKind {
        IndexKind::Scanning
    }
}
