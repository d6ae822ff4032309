//! Entity-component storage and query indexing for Kiln.
//!
//! This crate provides:
//! - [`World`] - The entity/component store and its mutation protocol
//! - [`Query`] / [`QueryKey`] - Canonical, collision-free query identities
//! - [`QueryIndex`] - The pluggable index strategy, with [`ScanningIndex`]
//!   and [`MemoizedIndex`] implementations
//! - [`Component`] - The capability interface every component value implements
//! - [`Entity`] - An owned, detached entity
//! - [`Visit`] - Per-match access handed to query visitors

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod component;
pub mod config;
pub mod entity;
pub mod index;
pub mod iter;
pub mod key;
pub mod world;

pub use component::{Component, ComponentMap, Teardown};
pub use config::WorldConfig;
pub use entity::{Entity, EntityTable, IdAllocator, MAX_FIRST_ID};
pub use index::{IdSet, IndexKind, MemoizedIndex, QueryIndex, ScanningIndex};
pub use iter::{IntoFlow, Matches, Visit};
pub use key::{Query, QueryKey, canonicalize};
pub use world::World;
