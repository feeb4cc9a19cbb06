//! API error types and responses.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use animal_family_core::{DenyReason, MarketError};
use animal_family_store::StoreError;

use crate::advice::AdviceError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No verified identity.
    #[error("authentication required")]
    Unauthorized,

    /// The access gate denied the action.
    #[error("forbidden: {reason}")]
    Forbidden {
        /// Denial reason code.
        reason: DenyReason,
        /// Where to pay, attached to premium denials.
        payment_url: Option<String>,
    },

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A moderation decision was already made.
    #[error("{0}")]
    AlreadyDecided(String),

    /// Conflict with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backing store failed; retryable.
    #[error("store unavailable")]
    StoreUnavailable(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

impl ApiError {
    /// Attach the premium payment link to a premium denial.
    #[must_use]
    pub fn with_payment_url(self, url: Option<&str>) -> Self {
        match self {
            Self::Forbidden {
                reason,
                payment_url: None,
            } if reason.is_upsell() => Self::Forbidden {
                reason,
                payment_url: url.map(str::to_string),
            },
            other => other,
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                self.to_string(),
                None,
            ),
            Self::Forbidden {
                reason,
                payment_url,
            } => (
                StatusCode::FORBIDDEN,
                reason.code(),
                self.to_string(),
                payment_url
                    .as_ref()
                    .map(|url| serde_json::json!({ "payment_url": url })),
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::AlreadyDecided(msg) => {
                (StatusCode::CONFLICT, "already_decided", msg.clone(), None)
            }
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::StoreUnavailable(msg) => {
                tracing::warn!(error = %msg, "Store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "store_unavailable",
                    "Storage is temporarily unavailable, please retry".to_string(),
                    None,
                )
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "external_service_error",
                msg.clone(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<MarketError> for ApiError {
    fn from(err: MarketError) -> Self {
        match err {
            MarketError::Forbidden(DenyReason::Unauthenticated) => Self::Unauthorized,
            MarketError::Forbidden(reason) => Self::Forbidden {
                reason,
                payment_url: None,
            },
            err @ MarketError::AlreadyDecided { .. } => Self::AlreadyDecided(err.to_string()),
            err @ MarketError::NotFound { .. } => Self::NotFound(err.to_string()),
            MarketError::Conflict(msg) => Self::Conflict(msg),
            err @ (MarketError::Validation { .. } | MarketError::InvalidId(_)) => {
                Self::BadRequest(err.to_string())
            }
            MarketError::StoreUnavailable(msg) => Self::StoreUnavailable(msg),
            MarketError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        MarketError::from(err).into()
    }
}

impl From<AdviceError> for ApiError {
    fn from(err: AdviceError) -> Self {
        tracing::error!(error = %err, "Advice request failed");
        Self::ExternalService("Could not get an answer from the advice service".into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}
