//! Error types for Quarry core.

use crate::index::IndexState;
use std::io;
use thiserror::Error;

/// Result type for index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Argument-level errors, raised before any lock is taken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The index name violates the naming rules.
    #[error("invalid index name '{name}': {reason}")]
    InvalidIndexName {
        /// The rejected name.
        name: String,
        /// Which rule was violated.
        reason: &'static str,
    },

    /// A document has no identifier.
    #[error("document identifier must not be empty")]
    MissingIdentifier,

    /// A field has a null value where one is not allowed.
    #[error("field '{field}' has a null value")]
    NullValue {
        /// Field name.
        field: String,
    },

    /// A field has no type in its configuration.
    #[error("field '{field}' has no type")]
    MissingFieldType {
        /// Field name.
        field: String,
    },

    /// A value cannot be coerced to the field's configured type.
    #[error("field '{field}': cannot convert {value} to {expected}")]
    TypeMismatch {
        /// Field name.
        field: String,
        /// Type the configuration asks for.
        expected: &'static str,
        /// Offending value.
        value: String,
    },

    /// A user field uses a name reserved for internal fields.
    #[error("field '{field}' uses the reserved '_' prefix")]
    ReservedFieldName {
        /// Field name.
        field: String,
    },

    /// Any other malformed argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ValidationError {
    /// Creates an invalid index name error.
    pub fn invalid_index_name(name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidIndexName {
            name: name.into(),
            reason,
        }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(
        field: impl Into<String>,
        expected: &'static str,
        value: impl ToString,
    ) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            expected,
            value: value.to_string(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

/// Errors that can occur managing indices.
#[derive(Debug, Error)]
pub enum IndexError {
    /// No index matches the name, directly or through an alias.
    #[error("index not found: {name}")]
    NotFound {
        /// The requested name or alias.
        name: String,
    },

    /// An index with this name is already registered.
    #[error("index already exists: {name}")]
    AlreadyExists {
        /// The conflicting name.
        name: String,
    },

    /// The index is in a state that does not permit the operation.
    #[error("cannot {operation} index '{index}' in state {state}")]
    InvalidState {
        /// Index name.
        index: String,
        /// State at the time of the call.
        state: IndexState,
        /// Attempted operation.
        operation: &'static str,
    },

    /// Acquiring storage for a new or reopened index failed.
    #[error("failed to create index '{index}': {source}")]
    CreationFailed {
        /// Index name.
        index: String,
        /// Underlying storage error.
        #[source]
        source: quarry_engine::EngineError,
    },

    /// Tearing down an index failed.
    #[error("failed to delete index '{index}': {source}")]
    DeletionFailed {
        /// Index name.
        index: String,
        /// Underlying storage error.
        #[source]
        source: quarry_engine::EngineError,
    },

    /// An alias names several indices where exactly one is required.
    #[error("alias '{alias}' resolves to multiple indices: {indices:?}")]
    AmbiguousAlias {
        /// The alias.
        alias: String,
        /// Every index carrying the alias.
        indices: Vec<String>,
    },

    /// A configured ceiling was reached.
    #[error("limit exceeded: {message}")]
    LimitExceeded {
        /// What was exceeded.
        message: String,
    },

    /// The manager has been closed.
    #[error("index manager is closed")]
    ManagerClosed,

    /// Another manager holds the base directory.
    #[error("base directory locked: another manager has exclusive access")]
    ManagerLocked,

    /// Storage engine error.
    #[error("engine error: {0}")]
    Engine(#[from] quarry_engine::EngineError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Argument validation failed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Several independent operations failed.
    #[error("{message} ({} failures)", .failures.len())]
    Multiple {
        /// Summary of the batch.
        message: String,
        /// Every individual failure.
        failures: Vec<IndexError>,
    },
}

impl IndexError {
    /// Creates a not-found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Creates an already-exists error.
    pub fn already_exists(name: impl Into<String>) -> Self {
        Self::AlreadyExists { name: name.into() }
    }

    /// Creates an invalid-state error.
    pub fn invalid_state(
        index: impl Into<String>,
        state: IndexState,
        operation: &'static str,
    ) -> Self {
        Self::InvalidState {
            index: index.into(),
            state,
            operation,
        }
    }

    /// Creates a creation failure.
    pub fn creation_failed(index: impl Into<String>, source: quarry_engine::EngineError) -> Self {
        Self::CreationFailed {
            index: index.into(),
            source,
        }
    }

    /// Creates a deletion failure.
    pub fn deletion_failed(index: impl Into<String>, source: quarry_engine::EngineError) -> Self {
        Self::DeletionFailed {
            index: index.into(),
            source,
        }
    }

    /// Creates a limit-exceeded error.
    pub fn limit_exceeded(message: impl Into<String>) -> Self {
        Self::LimitExceeded {
            message: message.into(),
        }
    }

    /// Folds a batch of failures into one error. Returns `Ok` when empty.
    pub fn collect(message: impl Into<String>, failures: Vec<IndexError>) -> IndexResult<()> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Self::Multiple {
                message: message.into(),
                failures,
            })
        }
    }

    /// Returns the individual failures of a batch error.
    pub fn failures(&self) -> &[IndexError] {
        match self {
            Self::Multiple { failures, .. } => failures,
            _ => &[],
        }
    }
}
