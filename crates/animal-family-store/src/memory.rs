//! In-memory storage implementation.
//!
//! Every write operation clones the tables, applies its changes to the copy and
//! swaps the copy in at the end. An injected failure before the swap discards
//! the whole operation, which is how tests observe atomicity.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use animal_family_core::{
    Account, AccountId, AdBanner, BusinessRequest, BusinessRequestId, ChatLink, ExternalId,
    IdentityAssertion, Listing, ListingFilter, ListingId, ListingStatus, PassportId, PetPassport,
    ProfileUpdate, SiteSettings,
};

use crate::error::{Result, StoreError};
use crate::{CasOutcome, Store};

#[derive(Debug, Clone, Default)]
struct Tables {
    accounts: HashMap<AccountId, Account>,
    accounts_by_external_id: HashMap<ExternalId, AccountId>,
    listings: BTreeMap<ListingId, Listing>,
    business_requests: BTreeMap<BusinessRequestId, BusinessRequest>,
    passports: HashMap<PassportId, PetPassport>,
    settings: SiteSettings,
}

impl Tables {
    fn account_mut(&mut self, account_id: AccountId) -> Result<&mut Account> {
        self.accounts
            .get_mut(&account_id)
            .ok_or_else(|| StoreError::not_found("account", account_id))
    }

    fn insert_account(&mut self, account: Account) {
        self.accounts_by_external_id
            .insert(account.external_id, account.account_id);
        self.accounts.insert(account.account_id, account);
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
    fail_after_promotion: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with `StoreError::Database` until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail the next business approval after the account has been promoted
    /// but before the request is deleted.
    pub fn fail_next_approval_after_promotion(&self) {
        self.fail_after_promotion.store(true, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Database("memory store unavailable".into()));
        }
        Ok(())
    }

    /// Run `f` against a staged copy and commit it if `f` succeeds.
    async fn write<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T> + Send) -> Result<T> {
        self.check_available()?;
        let mut tables = self.tables.lock().await;
        let mut staged = tables.clone();
        let out = f(&mut staged)?;
        *tables = staged;
        Ok(out)
    }

    async fn read<T>(&self, f: impl FnOnce(&Tables) -> T + Send) -> Result<T> {
        self.check_available()?;
        let tables = self.tables.lock().await;
        Ok(f(&tables))
    }
}

#[async_trait]
impl Store for MemoryStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    async fn upsert_account(&self, assertion: &IdentityAssertion) -> Result<Account> {
        self.write(|t| {
            if let Some(id) = t.accounts_by_external_id.get(&assertion.external_id).copied() {
                let account = t.account_mut(id)?;
                if !account.display_matches(assertion) {
                    account.apply_assertion(assertion);
                }
                return Ok(account.clone());
            }
            let account = Account::new(assertion);
            t.insert_account(account.clone());
            Ok(account)
        })
        .await
    }

    async fn seed_admin(&self, external_id: ExternalId) -> Result<Account> {
        self.write(|t| {
            if let Some(id) = t.accounts_by_external_id.get(&external_id).copied() {
                let account = t.account_mut(id)?;
                if !account.is_admin() {
                    account.role = animal_family_core::Role::Admin;
                    account.updated_at = Utc::now();
                }
                return Ok(account.clone());
            }
            let account = Account::seeded_admin(external_id);
            t.insert_account(account.clone());
            Ok(account)
        })
        .await
    }

    async fn get_account(&self, account_id: AccountId) -> Result<Option<Account>> {
        self.read(|t| t.accounts.get(&account_id).cloned()).await
    }

    async fn get_account_by_external_id(
        &self,
        external_id: ExternalId,
    ) -> Result<Option<Account>> {
        self.read(|t| {
            t.accounts_by_external_id
                .get(&external_id)
                .and_then(|id| t.accounts.get(id))
                .cloned()
        })
        .await
    }

    async fn update_profile(
        &self,
        account_id: AccountId,
        update: &ProfileUpdate,
    ) -> Result<Account> {
        self.write(|t| {
            let account = t.account_mut(account_id)?;
            account.apply_profile_update(update);
            Ok(account.clone())
        })
        .await
    }

    async fn set_premium(&self, external_id: ExternalId, is_premium: bool) -> Result<Account> {
        self.write(|t| {
            let id = t
                .accounts_by_external_id
                .get(&external_id)
                .copied()
                .ok_or_else(|| StoreError::not_found("account", external_id))?;
            let account = t.account_mut(id)?;
            account.is_premium = is_premium;
            account.updated_at = Utc::now();
            Ok(account.clone())
        })
        .await
    }

    // =========================================================================
    // Listing Operations
    // =========================================================================

    async fn insert_listing(&self, listing: &Listing) -> Result<()> {
        self.write(|t| {
            if !t.accounts.contains_key(&listing.owner_account_id) {
                return Err(StoreError::not_found("account", listing.owner_account_id));
            }
            t.listings.insert(listing.listing_id, listing.clone());
            Ok(())
        })
        .await
    }

    async fn get_listing(&self, listing_id: ListingId) -> Result<Option<Listing>> {
        self.read(|t| t.listings.get(&listing_id).cloned()).await
    }

    async fn list_listings(&self, filter: &ListingFilter) -> Result<Vec<Listing>> {
        self.read(|t| {
            t.listings
                .values()
                .rev()
                .filter(|l| filter.matches(l))
                .take(filter.limit.unwrap_or(usize::MAX))
                .cloned()
                .collect()
        })
        .await
    }

    async fn compare_and_set_listing_status(
        &self,
        listing_id: ListingId,
        expected: ListingStatus,
        next: ListingStatus,
    ) -> Result<CasOutcome> {
        self.write(|t| {
            let listing = t
                .listings
                .get_mut(&listing_id)
                .ok_or_else(|| StoreError::not_found("listing", listing_id))?;
            if listing.status != expected {
                return Ok(CasOutcome::Mismatch(listing.status));
            }
            listing.status = next;
            listing.updated_at = Utc::now();
            Ok(CasOutcome::Swapped(Box::new(listing.clone())))
        })
        .await
    }

    // =========================================================================
    // Business Request Operations
    // =========================================================================

    async fn insert_business_request(&self, request: &BusinessRequest) -> Result<()> {
        self.write(|t| {
            if !t.accounts.contains_key(&request.requesting_account_id) {
                return Err(StoreError::not_found(
                    "account",
                    request.requesting_account_id,
                ));
            }
            if t
                .business_requests
                .values()
                .any(|r| r.requesting_account_id == request.requesting_account_id)
            {
                return Err(StoreError::Conflict {
                    entity: "business_request",
                    reason: "a request is already pending for this account".into(),
                });
            }
            t.business_requests
                .insert(request.request_id, request.clone());
            Ok(())
        })
        .await
    }

    async fn get_business_request(
        &self,
        request_id: BusinessRequestId,
    ) -> Result<Option<BusinessRequest>> {
        self.read(|t| t.business_requests.get(&request_id).cloned())
            .await
    }

    async fn list_business_requests(&self) -> Result<Vec<BusinessRequest>> {
        self.read(|t| t.business_requests.values().rev().cloned().collect())
            .await
    }

    async fn approve_business_request(&self, request_id: BusinessRequestId) -> Result<Account> {
        let fail = self.fail_after_promotion.swap(false, Ordering::SeqCst);
        self.write(|t| {
            let request = t
                .business_requests
                .get(&request_id)
                .cloned()
                .ok_or_else(|| StoreError::not_found("business_request", request_id))?;

            let account = t.account_mut(request.requesting_account_id)?;
            account.promote_to_business(&request);
            let promoted = account.clone();

            if fail {
                return Err(StoreError::Database(
                    "injected failure after promotion".into(),
                ));
            }

            t.business_requests.remove(&request_id);
            Ok(promoted)
        })
        .await
    }

    async fn reject_business_request(&self, request_id: BusinessRequestId) -> Result<()> {
        self.write(|t| {
            t.business_requests
                .remove(&request_id)
                .map(|_| ())
                .ok_or_else(|| StoreError::not_found("business_request", request_id))
        })
        .await
    }

    // =========================================================================
    // Pet Passport Operations
    // =========================================================================

    async fn insert_passport(&self, passport: &PetPassport) -> Result<()> {
        self.write(|t| {
            if !t.accounts.contains_key(&passport.owner_account_id) {
                return Err(StoreError::not_found("account", passport.owner_account_id));
            }
            t.passports.insert(passport.passport_id, passport.clone());
            Ok(())
        })
        .await
    }

    async fn get_passport(&self, passport_id: PassportId) -> Result<Option<PetPassport>> {
        self.read(|t| t.passports.get(&passport_id).cloned()).await
    }

    async fn list_passports(&self, owner: Option<AccountId>) -> Result<Vec<PetPassport>> {
        self.read(|t| {
            let mut passports: Vec<_> = t
                .passports
                .values()
                .filter(|p| owner.map_or(true, |o| p.owner_account_id == o))
                .cloned()
                .collect();
            passports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            passports
        })
        .await
    }

    async fn update_passport(&self, passport: &PetPassport) -> Result<PetPassport> {
        self.write(|t| {
            let stored = t
                .passports
                .get_mut(&passport.passport_id)
                .ok_or_else(|| StoreError::not_found("pet_passport", passport.passport_id))?;
            *stored = PetPassport {
                is_verified: stored.is_verified,
                owner_account_id: stored.owner_account_id,
                created_at: stored.created_at,
                ..passport.clone()
            };
            Ok(stored.clone())
        })
        .await
    }

    async fn set_passport_verified(
        &self,
        passport_id: PassportId,
        verified: bool,
    ) -> Result<PetPassport> {
        self.write(|t| {
            let stored = t
                .passports
                .get_mut(&passport_id)
                .ok_or_else(|| StoreError::not_found("pet_passport", passport_id))?;
            stored.is_verified = verified;
            stored.updated_at = Utc::now();
            Ok(stored.clone())
        })
        .await
    }

    // =========================================================================
    // Site Settings
    // =========================================================================

    async fn get_settings(&self) -> Result<SiteSettings> {
        self.read(|t| t.settings.clone()).await
    }

    async fn put_banner(&self, banner: &AdBanner) -> Result<()> {
        self.write(|t| {
            t.settings.banner = Some(banner.clone());
            Ok(())
        })
        .await
    }

    async fn put_chat_link(&self, link: &ChatLink) -> Result<()> {
        self.write(|t| {
            t.settings.chat_link = Some(link.clone());
            Ok(())
        })
        .await
    }
}
