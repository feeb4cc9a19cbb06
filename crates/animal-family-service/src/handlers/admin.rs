//! Admin surface: moderation, premium confirmation, passport verification
//! and site settings. Every handler here is gated on the admin role.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use animal_family_core::{
    Account, AdBanner, BusinessOutcome, BusinessRequest, BusinessRequestId, ChatLink,
    ExternalId, Listing, ListingId, ListingStatus, ModerationDecision, PassportId, PetPassport,
    Transition,
};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::handlers::listings::ListingsResponse;
use crate::handlers::passports::PassportsResponse;
use crate::state::AppState;
use crate::workflows;

/// Moderation queue query.
#[derive(Debug, Default, Deserialize)]
pub struct QueueQuery {
    /// Status to list; `pending` when absent.
    pub status: Option<ListingStatus>,
    /// Page size.
    pub limit: Option<usize>,
}

/// A moderation decision.
#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    /// `approve` or `reject`.
    pub decision: ModerationDecision,
}

/// Result of a listing decision.
#[derive(Debug, Serialize)]
pub struct ListingDecisionResponse {
    /// The listing after the decision.
    pub listing: Listing,
    /// `false` when the same decision had already been applied.
    pub changed: bool,
}

/// Pending business requests.
#[derive(Debug, Serialize)]
pub struct BusinessRequestsResponse {
    /// Requests, newest first.
    pub requests: Vec<BusinessRequest>,
}

/// Result of a business request decision.
#[derive(Debug, Serialize)]
pub struct BusinessDecisionResponse {
    /// The decision applied.
    pub decision: ModerationDecision,
    /// The promoted account, on approval.
    pub account: Option<Account>,
}

/// Premium confirmation.
#[derive(Debug, Deserialize)]
pub struct PremiumRequest {
    /// New premium status.
    pub is_premium: bool,
}

/// Verification change.
#[derive(Debug, Deserialize)]
pub struct VerificationRequest {
    /// New verification mark.
    pub verified: bool,
}

/// Banner contents.
#[derive(Debug, Deserialize)]
pub struct BannerRequest {
    /// Banner title.
    pub title: String,
    /// Banner body.
    pub body: String,
}

/// Community chat link.
#[derive(Debug, Deserialize)]
pub struct ChatLinkRequest {
    /// The link.
    pub url: String,
}

/// List listings by moderation status.
pub async fn listing_queue(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ApiQuery(query): ApiQuery<QueueQuery>,
) -> Result<Json<ListingsResponse>, ApiError> {
    let listings =
        workflows::listings::moderation_queue(
            state.store.as_ref(),
            &caller,
            query.status,
            query.limit,
        )
        .await?;
    Ok(Json(ListingsResponse { listings }))
}

/// Approve or reject a listing.
pub async fn decide_listing(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ApiPath(listing_id): ApiPath<ListingId>,
    ApiJson(body): ApiJson<DecisionRequest>,
) -> Result<Json<ListingDecisionResponse>, ApiError> {
    let (listing, transition) =
        workflows::listings::decide(state.store.as_ref(), &caller, listing_id, body.decision)
            .await?;
    Ok(Json(ListingDecisionResponse {
        listing,
        changed: matches!(transition, Transition::Advance { .. }),
    }))
}

/// List pending business requests.
pub async fn business_requests(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<BusinessRequestsResponse>, ApiError> {
    let requests = workflows::business::pending(state.store.as_ref(), &caller).await?;
    Ok(Json(BusinessRequestsResponse { requests }))
}

/// Approve or reject a business request.
pub async fn decide_business_request(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ApiPath(request_id): ApiPath<BusinessRequestId>,
    ApiJson(body): ApiJson<DecisionRequest>,
) -> Result<Json<BusinessDecisionResponse>, ApiError> {
    let outcome =
        workflows::business::decide(state.store.as_ref(), &caller, request_id, body.decision)
            .await?;
    let account = match outcome {
        BusinessOutcome::Approved(account) => Some(*account),
        BusinessOutcome::Rejected => None,
    };
    Ok(Json(BusinessDecisionResponse {
        decision: body.decision,
        account,
    }))
}

/// Confirm (or withdraw) premium for a platform user.
pub async fn set_premium(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ApiPath(external_id): ApiPath<ExternalId>,
    ApiJson(body): ApiJson<PremiumRequest>,
) -> Result<Json<Account>, ApiError> {
    let account = workflows::accounts::confirm_premium(
        state.store.as_ref(),
        &caller,
        external_id,
        body.is_premium,
    )
    .await?;
    Ok(Json(account))
}

/// Every passport, for verification review.
pub async fn passports(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Json<PassportsResponse>, ApiError> {
    let passports = workflows::passports::all(state.store.as_ref(), &caller).await?;
    Ok(Json(PassportsResponse { passports }))
}

/// Set a passport's verification mark.
pub async fn set_verification(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ApiPath(passport_id): ApiPath<PassportId>,
    ApiJson(body): ApiJson<VerificationRequest>,
) -> Result<Json<PetPassport>, ApiError> {
    let passport = workflows::passports::set_verified(
        state.store.as_ref(),
        &caller,
        passport_id,
        body.verified,
    )
    .await?;
    Ok(Json(passport))
}

/// Replace the banner.
pub async fn put_banner(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ApiJson(body): ApiJson<BannerRequest>,
) -> Result<Json<AdBanner>, ApiError> {
    let banner =
        workflows::settings::set_banner(state.store.as_ref(), &caller, &body.title, &body.body)
            .await?;
    Ok(Json(banner))
}

/// Replace the community chat link.
pub async fn put_chat_link(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ApiJson(body): ApiJson<ChatLinkRequest>,
) -> Result<Json<ChatLink>, ApiError> {
    let link = workflows::settings::set_chat_link(state.store.as_ref(), &caller, &body.url).await?;
    Ok(Json(link))
}
