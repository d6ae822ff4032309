//! Kiln - Entity-component store with pluggable query indexes
//!
//! This crate re-exports all layers of the Kiln system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: kiln_engine     - Registry, prototypes, JSON, systems
//! Layer 1: kiln_storage    - World, query keys, scanning/memoized indexes
//! Layer 0: kiln_foundation - Core types (Value, EntityId, Error)
//! ```

pub use kiln_engine as engine;
pub use kiln_foundation as foundation;
pub use kiln_storage as storage;
