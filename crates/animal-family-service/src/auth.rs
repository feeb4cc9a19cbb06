//! Caller resolution.
//!
//! Every request resolves to a [`Caller`]. A valid `Authorization: tma
//! <initData>` header turns into an upserted account and its entitlements;
//! anything else (no header, bad signature, expired data, no bot token
//! configured) is a guest. The extractor never rejects for identity reasons.
//! Gated operations deny guests later with `unauthenticated`.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;

use animal_family_core::{
    authorize, Account, Action, DenyReason, Entitlements, IdentityAssertion, MarketError,
};

use crate::error::ApiError;
use crate::init_data;
use crate::state::AppState;
use crate::workflows;

/// Authorization scheme used by Telegram mini-apps.
const TMA_SCHEME: &str = "tma ";

/// The resolved caller of a request.
#[derive(Debug, Clone)]
pub struct Caller {
    /// The caller's account, `None` for guests.
    pub account: Option<Account>,
    /// Rights derived from the account.
    pub entitlements: Entitlements,
}

impl Caller {
    /// An unauthenticated caller.
    #[must_use]
    pub const fn guest() -> Self {
        Self {
            account: None,
            entitlements: Entitlements::GUEST,
        }
    }

    /// A caller acting as `account`.
    #[must_use]
    pub fn from_account(account: Account) -> Self {
        let entitlements = Entitlements::resolve(Some(&account));
        Self {
            account: Some(account),
            entitlements,
        }
    }

    /// The caller's account, or `unauthenticated`.
    pub fn require_account(&self) -> Result<&Account, MarketError> {
        self.account
            .as_ref()
            .ok_or(MarketError::Forbidden(DenyReason::Unauthenticated))
    }

    /// Run the access gate for `action`.
    pub fn authorize(&self, action: Action) -> Result<(), MarketError> {
        authorize(&self.entitlements, action)
            .into_result()
            .map_err(MarketError::from)
    }
}

/// Extract the identity assertion from the request headers, if any.
///
/// Returns `None` for every failure; the reason is logged at debug level.
#[must_use]
pub fn identity_from_parts(parts: &Parts, state: &AppState) -> Option<IdentityAssertion> {
    let header = parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())?;
    let raw = header.strip_prefix(TMA_SCHEME)?;

    let Some(bot_token) = state.config.telegram_bot_token.as_deref() else {
        tracing::debug!("Init data received but no bot token configured");
        return None;
    };

    let max_age = Duration::from_secs(state.config.init_data_max_age_seconds);
    let data = match init_data::verify(raw, bot_token, max_age, Utc::now()) {
        Ok(data) => data,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected init data");
            return None;
        }
    };

    match IdentityAssertion::from_platform_user(&data.user) {
        Ok(assertion) => Some(assertion),
        Err(e) => {
            tracing::debug!(error = %e, "Unusable platform user");
            None
        }
    }
}

impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let assertion = identity_from_parts(parts, state);
            let caller =
                workflows::accounts::resolve_caller(state.store.as_ref(), assertion.as_ref())
                    .await?;
            Ok(caller)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use animal_family_core::{Category, Role};

    fn account() -> Account {
        Account::new(&IdentityAssertion::new(42, "Anna", None, None).unwrap())
    }

    #[test]
    fn guest_is_unauthenticated() {
        let caller = Caller::guest();
        assert!(matches!(
            caller.require_account(),
            Err(MarketError::Forbidden(DenyReason::Unauthenticated))
        ));
        assert!(matches!(
            caller.authorize(Action::SubmitListing(Category::Lost)),
            Err(MarketError::Forbidden(DenyReason::Unauthenticated))
        ));
    }

    #[test]
    fn entitlements_follow_the_account() {
        let mut admin = account();
        admin.role = Role::Admin;
        let caller = Caller::from_account(admin);

        assert!(caller.entitlements.is_admin);
        assert!(caller.authorize(Action::AdminSurface).is_ok());
        assert!(matches!(
            caller.authorize(Action::OpenAdviceChat),
            Err(MarketError::Forbidden(DenyReason::PremiumRequired))
        ));
    }
}
