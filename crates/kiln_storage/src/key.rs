//! Canonical query keys.
//!
//! A query is a set of component names. Its key is built by sorting the
//! names, dropping duplicates, escaping the reserved characters inside each
//! name and joining the results with [`SEPARATOR`]. Escaping makes the
//! encoding injective, so `{"a:b"}` and `{"a", "b"}` never share a key.

use std::fmt;
use std::sync::Arc;

use kiln_foundation::{Error, Result};

use crate::component::ComponentMap;

/// Joins escaped names inside a key.
pub const SEPARATOR: char = ':';

/// Marks the next character of a key as literal.
pub const ESCAPE: char = '\\';

/// Collision-free, order-independent identity of a query.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueryKey(String);

impl QueryKey {
    /// Returns the key of the empty query ("all live entities").
    #[must_use]
    pub fn all() -> Self {
        Self(String::new())
    }

    /// Returns the encoded key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the empty query's key.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all() {
            write!(f, "<all>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Builds the canonical key for a set of component names.
///
/// Pure and deterministic: any permutation of the same names, with or
/// without duplicates, yields the same key.
pub fn canonicalize<I, S>(names: I) -> QueryKey
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut sorted: Vec<S> = names.into_iter().collect();
    sorted.sort_by(|a, b| a.as_ref().cmp(b.as_ref()));
    sorted.dedup_by(|a, b| a.as_ref() == b.as_ref());

    let mut key = String::new();
    for (i, name) in sorted.iter().enumerate() {
        if i > 0 {
            key.push(SEPARATOR);
        }
        for c in name.as_ref().chars() {
            if c == SEPARATOR || c == ESCAPE {
                key.push(ESCAPE);
            }
            key.push(c);
        }
    }
    QueryKey(key)
}

/// Rejects component names that cannot be stored or queried.
///
/// # Errors
///
/// Returns an error for the empty name.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_name(name, "component names must not be empty"));
    }
    Ok(())
}

/// A validated query: its names in declared order, as a sorted set, and
/// its canonical key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    /// Names as the caller listed them, duplicates included.
    declared: Vec<Arc<str>>,
    /// Sorted, deduplicated names.
    names: Vec<Arc<str>>,
    key: QueryKey,
}

impl Query {
    /// Builds a query from component names.
    ///
    /// # Errors
    ///
    /// Returns an error if any name is malformed.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let declared = names
            .into_iter()
            .map(|name| {
                let name = name.as_ref();
                validate_name(name)?;
                Ok(Arc::from(name))
            })
            .collect::<Result<Vec<Arc<str>>>>()?;

        let mut names = declared.clone();
        names.sort();
        names.dedup();
        let key = canonicalize(&names);

        Ok(Self {
            declared,
            names,
            key,
        })
    }

    /// Returns the empty query, which matches every live entity.
    #[must_use]
    pub fn all() -> Self {
        Self {
            declared: Vec::new(),
            names: Vec::new(),
            key: QueryKey::all(),
        }
    }

    /// Returns the canonical key.
    #[must_use]
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Returns the sorted, deduplicated component names.
    #[must_use]
    pub fn names(&self) -> &[Arc<str>] {
        &self.names
    }

    /// Returns the component names in the order they were declared.
    #[must_use]
    pub fn declared(&self) -> &[Arc<str>] {
        &self.declared
    }

    /// Returns true for the empty query.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns true if `components` holds every name of this query.
    #[must_use]
    pub fn matches(&self, components: &ComponentMap) -> bool {
        self.names.iter().all(|name| components.contains(name))
    }
}
