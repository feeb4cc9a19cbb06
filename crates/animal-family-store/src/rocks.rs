//! `RocksDB` storage implementation.
//!
//! Read-modify-write operations hold a write mutex for their whole duration and
//! commit through one `WriteBatch`, which gives the same single-step semantics
//! as the conditional statements of the PostgreSQL backend.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};
use tokio::sync::Mutex;

use animal_family_core::{
    Account, AccountId, AdBanner, BusinessRequest, BusinessRequestId, ChatLink, ExternalId,
    IdentityAssertion, Listing, ListingFilter, ListingId, ListingStatus, PassportId, PetPassport,
    ProfileUpdate, Role, SiteSettings,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{CasOutcome, Store};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(db_err)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_value<T: serde::de::DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(db_err)?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn put_value<T: serde::Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        self.db
            .put_cf(&cf, key, Self::serialize(value)?)
            .map_err(db_err)
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db.write(batch).map_err(db_err)
    }

    fn account_id_for(&self, external_id: ExternalId) -> Result<Option<AccountId>> {
        let cf = self.cf(cf::ACCOUNTS_BY_EXTERNAL_ID)?;
        let Some(value) = self
            .db
            .get_cf(&cf, keys::external_id_key(external_id))
            .map_err(db_err)?
        else {
            return Ok(None);
        };
        keys::id_bytes(&value)
            .map(|bytes| Some(AccountId::from_bytes(bytes)))
            .ok_or_else(|| StoreError::corrupt("account", "malformed external id index entry"))
    }

    fn load_account(&self, account_id: AccountId) -> Result<Option<Account>> {
        self.get_value(cf::ACCOUNTS, &keys::account_key(&account_id))
    }

    fn load_account_by_external_id(&self, external_id: ExternalId) -> Result<Option<Account>> {
        match self.account_id_for(external_id)? {
            Some(id) => self.load_account(id),
            None => Ok(None),
        }
    }

    fn require_account(&self, account_id: AccountId) -> Result<Account> {
        self.load_account(account_id)?
            .ok_or_else(|| StoreError::not_found("account", account_id))
    }

    /// Insert a fresh account together with its index entry.
    fn insert_account(&self, account: &Account) -> Result<()> {
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_index = self.cf(cf::ACCOUNTS_BY_EXTERNAL_ID)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_accounts,
            keys::account_key(&account.account_id),
            Self::serialize(account)?,
        );
        batch.put_cf(
            &cf_index,
            keys::external_id_key(account.external_id),
            account.account_id.as_bytes(),
        );
        self.write(batch)
    }

    fn load_passport(&self, passport_id: PassportId) -> Result<Option<PetPassport>> {
        self.get_value(cf::PASSPORTS, &keys::passport_key(&passport_id))
    }
}

fn db_err(e: rocksdb::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

#[async_trait]
impl Store for RocksStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    async fn upsert_account(&self, assertion: &IdentityAssertion) -> Result<Account> {
        let _guard = self.write_lock.lock().await;

        if let Some(mut account) = self.load_account_by_external_id(assertion.external_id)? {
            if !account.display_matches(assertion) {
                account.apply_assertion(assertion);
                self.put_value(cf::ACCOUNTS, &keys::account_key(&account.account_id), &account)?;
            }
            return Ok(account);
        }

        let account = Account::new(assertion);
        self.insert_account(&account)?;
        tracing::debug!(account_id = %account.account_id, "Account created");
        Ok(account)
    }

    async fn seed_admin(&self, external_id: ExternalId) -> Result<Account> {
        let _guard = self.write_lock.lock().await;

        if let Some(mut account) = self.load_account_by_external_id(external_id)? {
            if !account.is_admin() {
                account.role = Role::Admin;
                account.updated_at = Utc::now();
                self.put_value(cf::ACCOUNTS, &keys::account_key(&account.account_id), &account)?;
            }
            return Ok(account);
        }

        let account = Account::seeded_admin(external_id);
        self.insert_account(&account)?;
        Ok(account)
    }

    async fn get_account(&self, account_id: AccountId) -> Result<Option<Account>> {
        self.load_account(account_id)
    }

    async fn get_account_by_external_id(
        &self,
        external_id: ExternalId,
    ) -> Result<Option<Account>> {
        self.load_account_by_external_id(external_id)
    }

    async fn update_profile(
        &self,
        account_id: AccountId,
        update: &ProfileUpdate,
    ) -> Result<Account> {
        let _guard = self.write_lock.lock().await;

        let mut account = self.require_account(account_id)?;
        account.apply_profile_update(update);
        self.put_value(cf::ACCOUNTS, &keys::account_key(&account_id), &account)?;
        Ok(account)
    }

    async fn set_premium(&self, external_id: ExternalId, is_premium: bool) -> Result<Account> {
        let _guard = self.write_lock.lock().await;

        let mut account = self
            .load_account_by_external_id(external_id)?
            .ok_or_else(|| StoreError::not_found("account", external_id))?;
        account.is_premium = is_premium;
        account.updated_at = Utc::now();
        self.put_value(cf::ACCOUNTS, &keys::account_key(&account.account_id), &account)?;
        Ok(account)
    }

    // =========================================================================
    // Listing Operations
    // =========================================================================

    async fn insert_listing(&self, listing: &Listing) -> Result<()> {
        self.require_account(listing.owner_account_id)?;
        self.put_value(cf::LISTINGS, &keys::listing_key(&listing.listing_id), listing)
    }

    async fn get_listing(&self, listing_id: ListingId) -> Result<Option<Listing>> {
        self.get_value(cf::LISTINGS, &keys::listing_key(&listing_id))
    }

    async fn list_listings(&self, filter: &ListingFilter) -> Result<Vec<Listing>> {
        let cf = self.cf(cf::LISTINGS)?;
        let limit = filter.limit.unwrap_or(usize::MAX);

        // ULID keys: iterating from the end yields newest first.
        let mut listings = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::End) {
            if listings.len() >= limit {
                break;
            }
            let (_, value) = item.map_err(db_err)?;
            let listing: Listing = Self::deserialize(&value)?;
            if filter.matches(&listing) {
                listings.push(listing);
            }
        }
        Ok(listings)
    }

    async fn compare_and_set_listing_status(
        &self,
        listing_id: ListingId,
        expected: ListingStatus,
        next: ListingStatus,
    ) -> Result<CasOutcome> {
        let _guard = self.write_lock.lock().await;

        let key = keys::listing_key(&listing_id);
        let mut listing: Listing = self
            .get_value(cf::LISTINGS, &key)?
            .ok_or_else(|| StoreError::not_found("listing", listing_id))?;

        if listing.status != expected {
            return Ok(CasOutcome::Mismatch(listing.status));
        }

        listing.status = next;
        listing.updated_at = Utc::now();
        self.put_value(cf::LISTINGS, &key, &listing)?;
        Ok(CasOutcome::Swapped(Box::new(listing)))
    }

    // =========================================================================
    // Business Request Operations
    // =========================================================================

    async fn insert_business_request(&self, request: &BusinessRequest) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        self.require_account(request.requesting_account_id)?;

        let cf_requests = self.cf(cf::BUSINESS_REQUESTS)?;
        let cf_by_account = self.cf(cf::BUSINESS_REQUESTS_BY_ACCOUNT)?;
        let account_key = keys::account_key(&request.requesting_account_id);

        if self
            .db
            .get_cf(&cf_by_account, &account_key)
            .map_err(db_err)?
            .is_some()
        {
            return Err(StoreError::Conflict {
                entity: "business_request",
                reason: "a request is already pending for this account".into(),
            });
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_requests,
            keys::business_request_key(&request.request_id),
            Self::serialize(request)?,
        );
        batch.put_cf(&cf_by_account, &account_key, request.request_id.to_bytes());
        self.write(batch)
    }

    async fn get_business_request(
        &self,
        request_id: BusinessRequestId,
    ) -> Result<Option<BusinessRequest>> {
        self.get_value(
            cf::BUSINESS_REQUESTS,
            &keys::business_request_key(&request_id),
        )
    }

    async fn list_business_requests(&self) -> Result<Vec<BusinessRequest>> {
        let cf = self.cf(cf::BUSINESS_REQUESTS)?;
        self.db
            .iterator_cf(&cf, IteratorMode::End)
            .map(|item| {
                let (_, value) = item.map_err(db_err)?;
                Self::deserialize(&value)
            })
            .collect()
    }

    async fn approve_business_request(&self, request_id: BusinessRequestId) -> Result<Account> {
        let _guard = self.write_lock.lock().await;

        let request_key = keys::business_request_key(&request_id);
        let request: BusinessRequest = self
            .get_value(cf::BUSINESS_REQUESTS, &request_key)?
            .ok_or_else(|| StoreError::not_found("business_request", request_id))?;

        let mut account = self.require_account(request.requesting_account_id)?;
        account.promote_to_business(&request);

        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_requests = self.cf(cf::BUSINESS_REQUESTS)?;
        let cf_by_account = self.cf(cf::BUSINESS_REQUESTS_BY_ACCOUNT)?;
        let account_key = keys::account_key(&account.account_id);

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_accounts, &account_key, Self::serialize(&account)?);
        batch.delete_cf(&cf_requests, &request_key);
        batch.delete_cf(&cf_by_account, &account_key);
        self.write(batch)?;

        Ok(account)
    }

    async fn reject_business_request(&self, request_id: BusinessRequestId) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let request_key = keys::business_request_key(&request_id);
        let request: BusinessRequest = self
            .get_value(cf::BUSINESS_REQUESTS, &request_key)?
            .ok_or_else(|| StoreError::not_found("business_request", request_id))?;

        let cf_requests = self.cf(cf::BUSINESS_REQUESTS)?;
        let cf_by_account = self.cf(cf::BUSINESS_REQUESTS_BY_ACCOUNT)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_requests, &request_key);
        batch.delete_cf(
            &cf_by_account,
            keys::account_key(&request.requesting_account_id),
        );
        self.write(batch)
    }

    // =========================================================================
    // Pet Passport Operations
    // =========================================================================

    async fn insert_passport(&self, passport: &PetPassport) -> Result<()> {
        self.require_account(passport.owner_account_id)?;

        let cf_passports = self.cf(cf::PASSPORTS)?;
        let cf_by_owner = self.cf(cf::PASSPORTS_BY_OWNER)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_passports,
            keys::passport_key(&passport.passport_id),
            Self::serialize(passport)?,
        );
        batch.put_cf(
            &cf_by_owner,
            keys::owner_passport_key(&passport.owner_account_id, &passport.passport_id),
            b"",
        );
        self.write(batch)
    }

    async fn get_passport(&self, passport_id: PassportId) -> Result<Option<PetPassport>> {
        self.load_passport(passport_id)
    }

    async fn list_passports(&self, owner: Option<AccountId>) -> Result<Vec<PetPassport>> {
        let mut passports = Vec::new();

        if let Some(owner) = owner {
            let cf_by_owner = self.cf(cf::PASSPORTS_BY_OWNER)?;
            let prefix = keys::owner_passports_prefix(&owner);
            let iter = self
                .db
                .iterator_cf(&cf_by_owner, IteratorMode::From(&prefix, Direction::Forward));

            for item in iter {
                let (key, _) = item.map_err(db_err)?;
                if !key.starts_with(&prefix) {
                    break;
                }
                let passport_id = keys::passport_id_from_owner_key(&key).ok_or_else(|| {
                    StoreError::corrupt("pet_passport", "malformed owner index key")
                })?;
                if let Some(passport) = self.load_passport(passport_id)? {
                    passports.push(passport);
                }
            }
        } else {
            let cf = self.cf(cf::PASSPORTS)?;
            for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
                let (_, value) = item.map_err(db_err)?;
                passports.push(Self::deserialize(&value)?);
            }
        }

        passports.sort_by(|a: &PetPassport, b: &PetPassport| b.created_at.cmp(&a.created_at));
        Ok(passports)
    }

    async fn update_passport(&self, passport: &PetPassport) -> Result<PetPassport> {
        let _guard = self.write_lock.lock().await;

        let stored = self
            .load_passport(passport.passport_id)?
            .ok_or_else(|| StoreError::not_found("pet_passport", passport.passport_id))?;

        let updated = PetPassport {
            is_verified: stored.is_verified,
            owner_account_id: stored.owner_account_id,
            created_at: stored.created_at,
            ..passport.clone()
        };
        self.put_value(
            cf::PASSPORTS,
            &keys::passport_key(&updated.passport_id),
            &updated,
        )?;
        Ok(updated)
    }

    async fn set_passport_verified(
        &self,
        passport_id: PassportId,
        verified: bool,
    ) -> Result<PetPassport> {
        let _guard = self.write_lock.lock().await;

        let mut passport = self
            .load_passport(passport_id)?
            .ok_or_else(|| StoreError::not_found("pet_passport", passport_id))?;
        passport.is_verified = verified;
        passport.updated_at = Utc::now();
        self.put_value(cf::PASSPORTS, &keys::passport_key(&passport_id), &passport)?;
        Ok(passport)
    }

    // =========================================================================
    // Site Settings
    // =========================================================================

    async fn get_settings(&self) -> Result<SiteSettings> {
        Ok(SiteSettings {
            banner: self.get_value(cf::SETTINGS, keys::BANNER_KEY)?,
            chat_link: self.get_value(cf::SETTINGS, keys::CHAT_LINK_KEY)?,
        })
    }

    async fn put_banner(&self, banner: &AdBanner) -> Result<()> {
        self.put_value(cf::SETTINGS, keys::BANNER_KEY, banner)
    }

    async fn put_chat_link(&self, link: &ChatLink) -> Result<()> {
        self.put_value(cf::SETTINGS, keys::CHAT_LINK_KEY, link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use animal_family_core::{BusinessApplication, Category, ListingDraft, PassportDraft};
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn assertion(id: i64, name: &str) -> IdentityAssertion {
        IdentityAssertion::new(id, name, None, None).unwrap()
    }

    #[tokio::test]
    async fn account_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let id = {
            let store = RocksStore::open(dir.path()).unwrap();
            store.upsert_account(&assertion(42, "Anna")).await.unwrap().account_id
        };

        let store = RocksStore::open(dir.path()).unwrap();
        let account = store
            .get_account_by_external_id(ExternalId::new(42).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.account_id, id);
    }

    #[tokio::test]
    async fn listings_come_back_newest_first() {
        let (store, _dir) = create_test_store();
        let owner = store.upsert_account(&assertion(42, "Anna")).await.unwrap();

        let mut ids = Vec::new();
        for title in ["first", "second", "third"] {
            let listing = Listing::submit(
                &owner,
                &ListingDraft {
                    category: Category::Found,
                    title: title.into(),
                    description: None,
                    city: "Kazan".into(),
                    price: None,
                    location: None,
                    image_ref: None,
                },
            )
            .unwrap();
            store.insert_listing(&listing).await.unwrap();
            ids.push(listing.listing_id);
        }

        let listed = store
            .list_listings(&ListingFilter::owned_by(owner.account_id))
            .await
            .unwrap();
        let titles: Vec<_> = listed.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, ["third", "second", "first"]);

        let limited = store
            .list_listings(&ListingFilter {
                limit: Some(1),
                ..ListingFilter::owned_by(owner.account_id)
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].listing_id, ids[2]);
    }

    #[tokio::test]
    async fn approval_clears_index_so_account_could_file_again() {
        let (store, _dir) = create_test_store();
        let account = store.upsert_account(&assertion(42, "Anna")).await.unwrap();
        let application = BusinessApplication {
            company_name: "Happy Tail".into(),
            city: None,
            description: None,
            contacts: None,
        };

        let request = BusinessRequest::file(&account, &application).unwrap();
        store.insert_business_request(&request).await.unwrap();
        store.reject_business_request(request.request_id).await.unwrap();

        let again = BusinessRequest::file(&account, &application).unwrap();
        store.insert_business_request(&again).await.unwrap();
        let promoted = store
            .approve_business_request(again.request_id)
            .await
            .unwrap();
        assert!(promoted.is_business_operator);
        assert!(store.list_business_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn passports_are_indexed_by_owner() {
        let (store, _dir) = create_test_store();
        let anna = store.upsert_account(&assertion(1, "Anna")).await.unwrap();
        let boris = store.upsert_account(&assertion(2, "Boris")).await.unwrap();

        for (owner, name) in [(&anna, "Barsik"), (&anna, "Murka"), (&boris, "Rex")] {
            let passport = PetPassport::create(
                owner,
                &PassportDraft {
                    name: name.into(),
                    ..PassportDraft::default()
                },
            )
            .unwrap();
            store.insert_passport(&passport).await.unwrap();
        }

        assert_eq!(
            store
                .list_passports(Some(anna.account_id))
                .await
                .unwrap()
                .len(),
            2
        );
        assert_eq!(store.list_passports(None).await.unwrap().len(), 3);
    }
}
