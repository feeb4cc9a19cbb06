//! Business-connection request handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use animal_family_core::{BusinessApplication, BusinessRequest};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;
use crate::workflows;

/// File a business request.
pub async fn file_request(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ApiJson(application): ApiJson<BusinessApplication>,
) -> Result<(StatusCode, Json<BusinessRequest>), ApiError> {
    let request = workflows::business::file(state.store.as_ref(), &caller, &application).await?;
    Ok((StatusCode::CREATED, Json(request)))
}
