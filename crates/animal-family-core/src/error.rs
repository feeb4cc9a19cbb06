//! Error types for Animal Family.
//!
//! Gate denials and moderation conflicts are ordinary outcomes. They are still
//! carried as `Err` values so that callers short-circuit the mutation with `?`,
//! but each variant is specific enough for the presentation layer to pick an
//! upsell, an "already actioned" notice or a retry prompt.

use crate::access::DenyReason;
use crate::ids::IdError;

/// Result type for Animal Family operations.
pub type Result<T> = std::result::Result<T, MarketError>;

/// Errors that can occur in Animal Family operations.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    /// The access gate denied the action.
    #[error("forbidden: {0}")]
    Forbidden(DenyReason),

    /// A moderation decision was already made by someone else.
    #[error("{entity} {id} already decided")]
    AlreadyDecided {
        /// The kind of record ("listing", "business_request").
        entity: &'static str,
        /// The record id.
        id: String,
    },

    /// A record does not exist (or is not visible to the caller).
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of record.
        entity: &'static str,
        /// The record id.
        id: String,
    },

    /// A record conflicts with existing state (e.g. a second pending request).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller-supplied input failed validation.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// The offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// The backing store failed. Retryable by the caller, never by the core.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Unexpected internal failure (corrupt data, serialization).
    #[error("internal error: {0}")]
    Internal(String),
}

impl MarketError {
    /// Shorthand for a validation failure.
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// The denial reason, if this is a gate denial.
    #[must_use]
    pub const fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Self::Forbidden(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl From<DenyReason> for MarketError {
    fn from(reason: DenyReason) -> Self {
        Self::Forbidden(reason)
    }
}
