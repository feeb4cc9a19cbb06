//! Site settings handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use animal_family_core::SiteSettings;

use crate::error::ApiError;
use crate::state::AppState;
use crate::workflows;

/// Current banner and chat link.
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SiteSettings>, ApiError> {
    Ok(Json(workflows::settings::current(state.store.as_ref()).await?))
}
