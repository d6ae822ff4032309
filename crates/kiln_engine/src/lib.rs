//! Collaborators layered on the Kiln store.
//!
//! This crate provides:
//! - [`Registry`] - Component constructor dispatch and prototype templates
//! - [`serialize`] - JSON encoding and loading of an entity's components
//! - [`System`] / [`Scheduler`] - The initialize/pre/every/post loop

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod prototype;
pub mod registry;
pub mod serialize;
pub mod system;

pub use prototype::Prototype;
pub use registry::Registry;
pub use serialize::{from_json, to_json};
pub use system::{Scheduler, System};
