//! Account workflows: session resolution, profiles, premium confirmation.

use animal_family_core::{
    Account, AccountId, Action, ExternalId, IdentityAssertion, MarketError, ProfileUpdate, Result,
};
use animal_family_store::Store;

use crate::auth::Caller;

/// Resolve the caller for an optional verified assertion.
///
/// With an assertion the account is upserted (created with default
/// entitlements on first sight). Without one the caller is a guest.
pub async fn resolve_caller(
    store: &dyn Store,
    assertion: Option<&IdentityAssertion>,
) -> Result<Caller> {
    let Some(assertion) = assertion else {
        return Ok(Caller::guest());
    };
    let account = store.upsert_account(assertion).await?;
    Ok(Caller::from_account(account))
}

/// Update the caller's own profile.
///
/// Business fields additionally need operator status.
pub async fn update_profile(
    store: &dyn Store,
    caller: &Caller,
    update: &ProfileUpdate,
) -> Result<Account> {
    let owner = caller.require_account()?.account_id;
    caller.authorize(Action::EditOwned { owner })?;
    if update.touches_business() {
        caller.authorize(Action::EditBusinessProfile { owner })?;
    }
    let update = update.normalized()?;

    let account = store.update_profile(owner, &update).await?;
    tracing::debug!(account_id = %owner, "Profile updated");
    Ok(account)
}

/// Public profile of any account.
pub async fn public_profile(store: &dyn Store, account_id: AccountId) -> Result<Account> {
    store
        .get_account(account_id)
        .await?
        .ok_or_else(|| not_found("account", account_id))
}

/// Business page of an operator. Non-operators have none.
pub async fn business_page(store: &dyn Store, account_id: AccountId) -> Result<Account> {
    let account = public_profile(store, account_id).await?;
    if !account.is_business_operator {
        return Err(not_found("business", account_id));
    }
    Ok(account)
}

/// Record a manual premium payment confirmation (admin only).
pub async fn confirm_premium(
    store: &dyn Store,
    caller: &Caller,
    external_id: ExternalId,
    is_premium: bool,
) -> Result<Account> {
    caller.authorize(Action::AdminSurface)?;

    let account = store.set_premium(external_id, is_premium).await?;
    tracing::info!(
        external_id = %external_id,
        is_premium,
        admin = ?caller.entitlements.account_id,
        "Premium status changed"
    );
    Ok(account)
}

/// Grant the admin role to every configured id. Run once at start-up.
pub async fn seed_admins(store: &dyn Store, external_ids: &[ExternalId]) -> Result<Vec<Account>> {
    let mut seeded = Vec::with_capacity(external_ids.len());
    for &external_id in external_ids {
        let account = store.seed_admin(external_id).await?;
        tracing::info!(external_id = %external_id, account_id = %account.account_id, "Admin seeded");
        seeded.push(account);
    }
    Ok(seeded)
}

fn not_found(entity: &'static str, id: impl ToString) -> MarketError {
    MarketError::NotFound {
        entity,
        id: id.to_string(),
    }
}
