//! Pet passport handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use animal_family_core::{PassportDraft, PassportId, PetPassport};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;
use crate::workflows;

/// A list of passports.
#[derive(Debug, Serialize)]
pub struct PassportsResponse {
    /// Passports, newest first.
    pub passports: Vec<PetPassport>,
}

/// Create a passport.
pub async fn create_passport(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ApiJson(draft): ApiJson<PassportDraft>,
) -> Result<(StatusCode, Json<PetPassport>), ApiError> {
    let passport = workflows::passports::create(state.store.as_ref(), &caller, &draft).await?;
    Ok((StatusCode::CREATED, Json(passport)))
}

/// List the caller's passports.
pub async fn my_passports(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<PassportsResponse>, ApiError> {
    let passports = workflows::passports::mine(state.store.as_ref(), &caller).await?;
    Ok(Json(PassportsResponse { passports }))
}

/// View a passport.
pub async fn get_passport(
    State(state): State<Arc<AppState>>,
    ApiPath(passport_id): ApiPath<PassportId>,
) -> Result<Json<PetPassport>, ApiError> {
    let passport = workflows::passports::view(state.store.as_ref(), passport_id).await?;
    Ok(Json(passport))
}

/// Edit a passport (owner only).
pub async fn edit_passport(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ApiPath(passport_id): ApiPath<PassportId>,
    ApiJson(draft): ApiJson<PassportDraft>,
) -> Result<Json<PetPassport>, ApiError> {
    let passport =
        workflows::passports::edit(state.store.as_ref(), &caller, passport_id, &draft).await?;
    Ok(Json(passport))
}
