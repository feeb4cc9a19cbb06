//! Session, profile and premium handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use animal_family_core::{Account, AccountId, BusinessProfile, Entitlements, ProfileUpdate};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;
use crate::workflows;

/// Shown next to the payment link; premium is confirmed by an admin.
const PREMIUM_INSTRUCTIONS: &str = "Pay through the link, then send the receipt to the \
     administrator. Premium is switched on once the payment is confirmed.";

/// The caller's session: account (absent for guests) and rights.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// The caller's own account.
    pub account: Option<Account>,
    /// Resolved entitlements.
    pub entitlements: Entitlements,
}

impl From<Caller> for SessionResponse {
    fn from(caller: Caller) -> Self {
        Self {
            account: caller.account,
            entitlements: caller.entitlements,
        }
    }
}

/// What other users see of an account.
#[derive(Debug, Serialize)]
pub struct PublicProfileResponse {
    /// Account ID.
    pub account_id: AccountId,
    /// Display name.
    pub display_name: String,
    /// Platform handle.
    pub handle: Option<String>,
    /// Avatar reference.
    pub avatar_ref: Option<String>,
    /// City.
    pub city: Option<String>,
    /// About text.
    pub about: Option<String>,
    /// Premium badge.
    pub is_premium: bool,
    /// Business badge.
    pub is_business_operator: bool,
    /// Member since.
    pub created_at: String,
}

impl From<&Account> for PublicProfileResponse {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.account_id,
            display_name: account.display_name.clone(),
            handle: account.handle.clone(),
            avatar_ref: account.avatar_ref.clone(),
            city: account.city.clone(),
            about: account.about.clone(),
            is_premium: account.is_premium,
            is_business_operator: account.is_business_operator,
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

/// Business page of an operator.
#[derive(Debug, Serialize)]
pub struct BusinessPageResponse {
    /// Operator's account ID.
    pub account_id: AccountId,
    /// Operator's display name.
    pub display_name: String,
    /// Platform handle.
    pub handle: Option<String>,
    /// City.
    pub city: Option<String>,
    /// Business profile.
    pub business: BusinessProfile,
}

impl From<&Account> for BusinessPageResponse {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.account_id,
            display_name: account.display_name.clone(),
            handle: account.handle.clone(),
            city: account.city.clone(),
            business: account.business.clone(),
        }
    }
}

/// Premium purchase information.
#[derive(Debug, Serialize)]
pub struct PremiumInfoResponse {
    /// External payment page, if configured.
    pub payment_url: Option<String>,
    /// How confirmation works.
    pub instructions: String,
    /// Whether the caller already has premium.
    pub is_premium: bool,
}

/// Open a session. Signed-in callers are upserted on the way in.
pub async fn open_session(caller: Caller) -> Json<SessionResponse> {
    Json(caller.into())
}

/// Get the caller's account and entitlements (guest view without identity).
pub async fn me(caller: Caller) -> Json<SessionResponse> {
    Json(caller.into())
}

/// Update the caller's profile.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ApiJson(body): ApiJson<ProfileUpdate>,
) -> Result<Json<SessionResponse>, ApiError> {
    let account = workflows::accounts::update_profile(state.store.as_ref(), &caller, &body).await?;
    Ok(Json(Caller::from_account(account).into()))
}

/// Get a public profile.
pub async fn public_profile(
    State(state): State<Arc<AppState>>,
    ApiPath(account_id): ApiPath<AccountId>,
) -> Result<Json<PublicProfileResponse>, ApiError> {
    let account = workflows::accounts::public_profile(state.store.as_ref(), account_id).await?;
    Ok(Json(PublicProfileResponse::from(&account)))
}

/// Get an operator's business page.
pub async fn business_page(
    State(state): State<Arc<AppState>>,
    ApiPath(account_id): ApiPath<AccountId>,
) -> Result<Json<BusinessPageResponse>, ApiError> {
    let account = workflows::accounts::business_page(state.store.as_ref(), account_id).await?;
    Ok(Json(BusinessPageResponse::from(&account)))
}

/// Where and how to pay for premium. There is no self-service switch.
pub async fn premium_info(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Json<PremiumInfoResponse> {
    Json(PremiumInfoResponse {
        payment_url: state.config.premium_payment_url.clone(),
        instructions: PREMIUM_INSTRUCTIONS.to_string(),
        is_premium: caller.entitlements.is_premium,
    })
}
