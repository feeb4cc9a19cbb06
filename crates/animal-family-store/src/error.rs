//! Error types for Animal Family storage.

use animal_family_core::MarketError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of record.
        entity: &'static str,
        /// The record id.
        id: String,
    },

    /// A uniqueness rule was violated.
    #[error("{entity} conflict: {reason}")]
    Conflict {
        /// The kind of record.
        entity: &'static str,
        /// What collided.
        reason: String,
    },

    /// A stored row failed validation when read back.
    #[error("corrupt {entity} row: {reason}")]
    Corrupt {
        /// The kind of record.
        entity: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn corrupt(entity: &'static str, reason: impl ToString) -> Self {
        Self::Corrupt {
            entity,
            reason: reason.to_string(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<StoreError> for MarketError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            StoreError::Conflict { entity, reason } => Self::Conflict(format!("{entity}: {reason}")),
            StoreError::Database(msg) => Self::StoreUnavailable(msg),
            StoreError::Serialization(msg) => Self::Internal(msg),
            StoreError::Corrupt { entity, reason } => {
                Self::Internal(format!("corrupt {entity} row: {reason}"))
            }
        }
    }
}
