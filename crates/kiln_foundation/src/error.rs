//! Error types for the Kiln system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;

use thiserror::Error;

use crate::entity::EntityId;

/// The main error type for Kiln operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Pushes a frame onto this error's context, creating the context if needed.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        let context = self.context.take().unwrap_or_default();
        self.context = Some(context.with_frame(frame));
        self
    }

    /// Creates an entity not found error.
    #[must_use]
    pub fn entity_not_found(id: EntityId) -> Self {
        Self::new(ErrorKind::EntityNotFound(id))
    }

    /// Creates an id conflict error.
    #[must_use]
    pub fn id_conflict(id: EntityId) -> Self {
        Self::new(ErrorKind::IdConflict(id))
    }

    /// Creates an invalid component name error.
    #[must_use]
    pub fn invalid_name(name: impl Into<String>, reason: &'static str) -> Self {
        Self::new(ErrorKind::InvalidComponentName {
            name: name.into(),
            reason,
        })
    }

    /// Creates a re-entrant mutation error.
    #[must_use]
    pub fn reentrant(entity: EntityId, operation: &'static str) -> Self {
        Self::new(ErrorKind::ReentrantMutation { entity, operation })
    }

    /// Creates an immutable component error.
    #[must_use]
    pub fn immutable(component: impl Into<String>, operation: &'static str) -> Self {
        Self::new(ErrorKind::ImmutableComponent {
            component: component.into(),
            operation,
        })
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidConfig(message.into()))
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization(message.into()))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Entity is not live in the store.
    #[error("entity not found: {0:?}")]
    EntityNotFound(EntityId),

    /// Entity id is already live in the target store.
    #[error("entity id already in use: {0:?}")]
    IdConflict(EntityId),

    /// Component name was rejected before reaching the index.
    #[error("invalid component name {name:?}: {reason}")]
    InvalidComponentName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// An entity was mutated while its own components were being torn down.
    #[error("re-entrant {operation} on entity {entity:?} during teardown")]
    ReentrantMutation {
        /// The entity under teardown.
        entity: EntityId,
        /// The rejected operation.
        operation: &'static str,
    },

    /// The component does not support the requested mutation.
    #[error("component {component} does not support {operation}")]
    ImmutableComponent {
        /// The component name.
        component: String,
        /// The rejected operation.
        operation: &'static str,
    },

    /// Prototype was never registered.
    #[error("unknown prototype: {0}")]
    UnknownPrototype(String),

    /// Component data could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A configuration value could not be understood.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Entity the failing operation targeted.
    pub entity: Option<EntityId>,
    /// Component the failing operation targeted.
    pub component: Option<String>,
    /// Stack of hooks and operations, innermost first.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the entity.
    #[must_use]
    pub fn with_entity(mut self, entity: EntityId) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Sets the component name.
    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(entity) = self.entity {
            write!(f, "on entity {entity}")?;
        }
        if let Some(component) = &self.component {
            write!(f, " component {component}")?;
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in &self.stack {
                writeln!(f, "  in {frame}")?;
            }
        }
        Ok(())
    }
}
