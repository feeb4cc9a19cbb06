//! Veterinary advice chat handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use animal_family_core::Action;

use crate::advice::MAX_QUESTION_CHARS;
use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

/// Advice question.
#[derive(Debug, Deserialize)]
pub struct AdviceRequest {
    /// The question, in free text.
    pub question: String,
}

/// Advice answer.
#[derive(Debug, Serialize)]
pub struct AdviceResponse {
    /// The answer, disclaimer included.
    pub answer: String,
}

/// Ask the assistant a question (premium only).
pub async fn ask(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ApiJson(body): ApiJson<AdviceRequest>,
) -> Result<Json<AdviceResponse>, ApiError> {
    caller
        .authorize(Action::OpenAdviceChat)
        .map_err(|e| {
            ApiError::from(e).with_payment_url(state.config.premium_payment_url.as_deref())
        })?;

    let question = body.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".into()));
    }
    if question.chars().count() > MAX_QUESTION_CHARS {
        return Err(ApiError::BadRequest(format!(
            "question must be at most {MAX_QUESTION_CHARS} characters"
        )));
    }

    let client = state
        .advice
        .as_ref()
        .ok_or_else(|| ApiError::ExternalService("advice provider not configured".into()))?;

    let answer = client.ask(question).await?;
    tracing::debug!(account_id = ?caller.entitlements.account_id, "Advice answered");
    Ok(Json(AdviceResponse { answer }))
}
