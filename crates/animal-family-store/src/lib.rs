//! Storage layer for Animal Family.
//!
//! Every state change the core performs is a single compound operation on the
//! [`Store`] trait, so a cancelled request never leaves a half-applied
//! transition behind. Three backends implement it:
//!
//! - [`PgStore`]: hosted PostgreSQL via `sqlx`. Uniqueness and conditional
//!   updates are enforced by the database.
//! - `RocksStore` (feature `rocksdb-backend`): embedded `RocksDB` with column
//!   families. Read-modify-write operations run under a write mutex and are
//!   committed as one `WriteBatch`.
//! - [`MemoryStore`]: in-process tables with staged commits and failure
//!   injection, used by tests and local development.
//!
//! # Example
//!
//! ```no_run
//! # async fn demo() -> animal_family_store::Result<()> {
//! use animal_family_core::IdentityAssertion;
//! use animal_family_store::{MemoryStore, Store};
//!
//! let store = MemoryStore::new();
//! let assertion = IdentityAssertion::new(42, "Anna", Some("anna"), None).unwrap();
//!
//! let first = store.upsert_account(&assertion).await?;
//! let again = store.upsert_account(&assertion).await?;
//! assert_eq!(first.account_id, again.account_id);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod postgres;

#[cfg(feature = "rocksdb-backend")]
pub mod keys;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
#[cfg(feature = "rocksdb-backend")]
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PgStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use async_trait::async_trait;

use animal_family_core::{
    Account, AccountId, AdBanner, BusinessRequest, BusinessRequestId, ChatLink, ExternalId,
    IdentityAssertion, Listing, ListingFilter, ListingId, ListingStatus, PassportId, PetPassport,
    ProfileUpdate, SiteSettings,
};

/// Result of a conditional listing status update.
#[derive(Debug, Clone, PartialEq)]
pub enum CasOutcome {
    /// The status matched and was replaced.
    Swapped(Box<Listing>),
    /// The status did not match; nothing was written.
    Mismatch(ListingStatus),
}

/// The storage trait defining all database operations.
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Ensure an account exists for the asserted identity.
    ///
    /// Inserts with default entitlements when absent, otherwise refreshes the
    /// display fields only. Skips the write when nothing changed. Concurrent
    /// calls for one `external_id` produce one row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn upsert_account(&self, assertion: &IdentityAssertion) -> Result<Account>;

    /// Grant the admin role to `external_id`, creating a placeholder account if
    /// the person has never opened the app.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn seed_admin(&self, external_id: ExternalId) -> Result<Account>;

    /// Get an account by local id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_account(&self, account_id: AccountId) -> Result<Option<Account>>;

    /// Get an account by platform id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_account_by_external_id(&self, external_id: ExternalId)
        -> Result<Option<Account>>;

    /// Apply a normalised owner edit.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the account doesn't exist.
    async fn update_profile(&self, account_id: AccountId, update: &ProfileUpdate)
        -> Result<Account>;

    /// Set the premium flag (manual payment confirmation).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no account has this platform id.
    async fn set_premium(&self, external_id: ExternalId, is_premium: bool) -> Result<Account>;

    // =========================================================================
    // Listing Operations
    // =========================================================================

    /// Insert a new listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn insert_listing(&self, listing: &Listing) -> Result<()>;

    /// Get a listing by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_listing(&self, listing_id: ListingId) -> Result<Option<Listing>>;

    /// List listings matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_listings(&self, filter: &ListingFilter) -> Result<Vec<Listing>>;

    /// Replace the status with `next` iff it is currently `expected`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the listing doesn't exist.
    async fn compare_and_set_listing_status(
        &self,
        listing_id: ListingId,
        expected: ListingStatus,
        next: ListingStatus,
    ) -> Result<CasOutcome>;

    // =========================================================================
    // Business Request Operations
    // =========================================================================

    /// File a business request.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the account already has a pending
    /// request.
    async fn insert_business_request(&self, request: &BusinessRequest) -> Result<()>;

    /// Get a pending request by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_business_request(
        &self,
        request_id: BusinessRequestId,
    ) -> Result<Option<BusinessRequest>>;

    /// All pending requests, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_business_requests(&self) -> Result<Vec<BusinessRequest>>;

    /// Delete the request and promote its requester, atomically.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the request no longer exists (it was
    /// already decided).
    async fn approve_business_request(&self, request_id: BusinessRequestId) -> Result<Account>;

    /// Delete the request.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the request no longer exists.
    async fn reject_business_request(&self, request_id: BusinessRequestId) -> Result<()>;

    // =========================================================================
    // Pet Passport Operations
    // =========================================================================

    /// Insert a new passport.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn insert_passport(&self, passport: &PetPassport) -> Result<()>;

    /// Get a passport by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_passport(&self, passport_id: PassportId) -> Result<Option<PetPassport>>;

    /// List passports, optionally of one owner, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn list_passports(&self, owner: Option<AccountId>) -> Result<Vec<PetPassport>>;

    /// Write the owner-editable fields. The stored `is_verified` is kept.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the passport doesn't exist.
    async fn update_passport(&self, passport: &PetPassport) -> Result<PetPassport>;

    /// Set the verification check mark.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the passport doesn't exist.
    async fn set_passport_verified(
        &self,
        passport_id: PassportId,
        verified: bool,
    ) -> Result<PetPassport>;

    // =========================================================================
    // Site Settings
    // =========================================================================

    /// Banner and chat link.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_settings(&self) -> Result<SiteSettings>;

    /// Replace the banner.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn put_banner(&self, banner: &AdBanner) -> Result<()>;

    /// Replace the chat link.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn put_chat_link(&self, link: &ChatLink) -> Result<()>;
}
