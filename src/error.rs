//! Errors surfaced by the interaction engines.

use crate::storage::StorageError;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, InteractionError>;

/// Caller-facing error taxonomy.
///
/// Validation and permission failures are detected before any mutation, so
/// returning one of them guarantees nothing was written.
#[derive(Debug, thiserror::Error)]
pub enum InteractionError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// A write lost a race that the store could not absorb. Safe to retry.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(StorageError),
}

impl InteractionError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Only conflicts are worth retrying; everything else is deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(self, InteractionError::Conflict(_))
    }

    /// HTTP status the presentation layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            InteractionError::Unauthorized => 401,
            InteractionError::Forbidden(_) => 403,
            InteractionError::NotFound { .. } => 404,
            InteractionError::Validation(_) => 400,
            InteractionError::Conflict(_) => 409,
            InteractionError::Storage(_) => 500,
        }
    }
}

impl From<StorageError> for InteractionError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict(msg) => InteractionError::Conflict(msg),
            StorageError::NotFound { entity, id } => InteractionError::NotFound { entity, id },
            other => InteractionError::Storage(other),
        }
    }
}
