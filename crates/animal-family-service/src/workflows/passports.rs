//! Pet passport workflows.

use animal_family_core::{Action, MarketError, PassportDraft, PassportId, PetPassport, Result};
use animal_family_store::Store;

use crate::auth::Caller;

/// Create an unverified passport owned by the caller.
pub async fn create(
    store: &dyn Store,
    caller: &Caller,
    draft: &PassportDraft,
) -> Result<PetPassport> {
    let owner = caller.require_account()?;
    let passport = PetPassport::create(owner, draft)?;
    store.insert_passport(&passport).await?;

    tracing::debug!(
        passport_id = %passport.passport_id,
        account_id = %owner.account_id,
        "Passport created"
    );
    Ok(passport)
}

/// The caller's passports, newest first.
pub async fn mine(store: &dyn Store, caller: &Caller) -> Result<Vec<PetPassport>> {
    let owner = caller.require_account()?.account_id;
    Ok(store.list_passports(Some(owner)).await?)
}

/// A passport by id. Passports are shareable, so anyone may view one.
pub async fn view(store: &dyn Store, passport_id: PassportId) -> Result<PetPassport> {
    load(store, passport_id).await
}

/// Replace the owner-editable fields (owner only).
///
/// The verification mark survives the edit.
pub async fn edit(
    store: &dyn Store,
    caller: &Caller,
    passport_id: PassportId,
    draft: &PassportDraft,
) -> Result<PetPassport> {
    let mut passport = load(store, passport_id).await?;
    caller.authorize(Action::EditOwned {
        owner: passport.owner_account_id,
    })?;

    passport.apply_edit(draft)?;
    Ok(store.update_passport(&passport).await?)
}

/// Every passport, for verification review (admin only).
pub async fn all(store: &dyn Store, caller: &Caller) -> Result<Vec<PetPassport>> {
    caller.authorize(Action::AdminSurface)?;
    Ok(store.list_passports(None).await?)
}

/// Grant or withdraw the verification mark (admin only).
pub async fn set_verified(
    store: &dyn Store,
    caller: &Caller,
    passport_id: PassportId,
    verified: bool,
) -> Result<PetPassport> {
    caller.authorize(Action::AdminSurface)?;

    let passport = store.set_passport_verified(passport_id, verified).await?;
    tracing::info!(
        passport_id = %passport_id,
        verified,
        admin = ?caller.entitlements.account_id,
        "Passport verification changed"
    );
    Ok(passport)
}

async fn load(store: &dyn Store, passport_id: PassportId) -> Result<PetPassport> {
    store
        .get_passport(passport_id)
        .await?
        .ok_or_else(|| MarketError::NotFound {
            entity: "pet_passport",
            id: passport_id.to_string(),
        })
}
