//! Liveness and store reachability.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the store does not answer.
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    /// Configured storage backend.
    pub store: &'static str,
    pub store_reachable: bool,
    /// Whether init data can be verified at all.
    pub auth_configured: bool,
}

/// Reads the site settings as a round trip to the store. Answers 503 when
/// that fails so orchestrators stop routing traffic here.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let store_reachable = match state.store.get_settings().await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the store");
            false
        }
    };
    let status = if store_reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = HealthResponse {
        status: if store_reachable { "ok" } else { "degraded" },
        service: "animal-family",
        version: env!("CARGO_PKG_VERSION"),
        store: state.config.store_backend.as_str(),
        store_reachable,
        auth_configured: state.config.telegram_bot_token.is_some(),
    };
    (status, Json(body))
}
