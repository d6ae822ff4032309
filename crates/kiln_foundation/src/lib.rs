//! Core types, values, and persistent collections for Kiln.
//!
//! This crate provides:
//! - [`Value`] - The plain-data value type used for data components
//! - [`EntityId`] - Store-scoped, never-reused entity identifiers
//! - [`Error`] - Rich error types with context
//! - Persistent collections ([`KVec`], [`KMap`])

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod collections;
pub mod entity;
pub mod error;
pub mod value;

pub use collections::{KMap, KVec};
pub use entity::EntityId;
pub use error::{Error, ErrorContext, ErrorKind};
pub use value::{ENTITY_TAG, Value};

/// Result type alias using Kiln's error type.
pub type Result<T> = std::result::Result<T, Error>;
