//! The memoized strategy: cached result sets kept in step with mutations.
//!
//! Each query key seen so far owns a result set. A name-to-keys inverted
//! index routes every add/remove notification to the keys that mention the
//! changed component, so untouched queries cost nothing.

use std::borrow::Cow;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use kiln_foundation::EntityId;
use log::{debug, trace};

use super::{IdSet, IndexKind, QueryIndex};
use crate::component::ComponentMap;
use crate::entity::EntityTable;
use crate::key::{Query, QueryKey};

#[derive(Debug)]
struct Tracked {
    query: Query,
    members: IdSet,
}

/// Caches every query's result and updates it incrementally.
///
/// Invariant: for every tracked key, `members` equals what a full scan of
/// the store would return for that key.
#[derive(Debug, Default)]
pub struct MemoizedIndex {
    tracked: HashMap<QueryKey, Tracked>,
    interest: HashMap<Arc<str>, Vec<QueryKey>>,
    bootstraps: usize,
}

impl MemoizedIndex {
    /// Creates an index with no tracked queries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many queries were bootstrapped by full scan.
    #[must_use]
    pub fn bootstrap_count(&self) -> usize {
        self.bootstraps
    }

    /// Returns true if `key` has a cached result.
    #[must_use]
    pub fn is_tracked(&self, key: &QueryKey) -> bool {
        self.tracked.contains_key(key)
    }

    /// Returns the tracked keys, in no particular order.
    pub fn tracked_keys(&self) -> impl Iterator<Item = &QueryKey> {
        self.tracked.keys()
    }
}

impl QueryIndex for MemoizedIndex {
    fn query<'a>(&'a mut self, query: &Query, table: &'a EntityTable) -> Cow<'a, IdSet> {
        let tracked = match self.tracked.entry(query.key().clone()) {
            Entry::Occupied(hit) => hit.into_mut(),
            Entry::Vacant(miss) => {
                let members = table.matching(query);
                debug!(
                    "bootstrapped query {} with {} entities",
                    query.key(),
                    members.len()
                );
                self.bootstraps += 1;
                for name in query.names() {
                    self.interest
                        .entry(name.clone())
                        .or_default()
                        .push(query.key().clone());
                }
                miss.insert(Tracked {
                    query: query.clone(),
                    members,
                })
            }
        };
        Cow::Borrowed(&tracked.members)
    }

    fn notify_create(&mut self, entity: EntityId) {
        if let Some(all) = self.tracked.get_mut(&QueryKey::all()) {
            all.members.insert(entity);
        }
    }

    fn notify_add(&mut self, entity: EntityId, name: &str, components: &ComponentMap) {
        let Some(keys) = self.interest.get(name) else {
            return;
        };
        for key in keys {
            let Some(tracked) = self.tracked.get_mut(key) else {
                continue;
            };
            if !tracked.members.contains(&entity) && tracked.query.matches(components) {
                trace!("{entity:?} joins {key}");
                tracked.members.insert(entity);
            }
        }
    }

    fn notify_remove(&mut self, entity: EntityId, name: &str) {
        let Some(keys) = self.interest.get(name) else {
            return;
        };
        for key in keys {
            let Some(tracked) = self.tracked.get_mut(key) else {
                continue;
            };
            if tracked.members.remove(&entity) {
                trace!("{entity:?} leaves {key}");
            }
        }
    }

    fn notify_destroy(&mut self, entity: EntityId) {
        for tracked in self.tracked.values_mut() {
            tracked.members.remove(&entity);
        }
    }

    fn clear(&mut self) {
        for tracked in self.tracked.values_mut() {
            tracked.members.clear();
        }
    }

    fn kind(&self) -> IndexKind {
        IndexKind::Memoized
    }
}
