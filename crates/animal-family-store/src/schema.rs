//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary account records, keyed by `account_id`.
    pub const ACCOUNTS: &str = "accounts";

    /// Index: platform id (big-endian) to `account_id`. Enforces uniqueness.
    pub const ACCOUNTS_BY_EXTERNAL_ID: &str = "accounts_by_external_id";

    /// Listings, keyed by `listing_id` (ULID, so iteration is submission order).
    pub const LISTINGS: &str = "listings";

    /// Pending business requests, keyed by `request_id` (ULID).
    pub const BUSINESS_REQUESTS: &str = "business_requests";

    /// Index: requesting `account_id` to `request_id`. At most one per account.
    pub const BUSINESS_REQUESTS_BY_ACCOUNT: &str = "business_requests_by_account";

    /// Pet passports, keyed by `passport_id`.
    pub const PASSPORTS: &str = "passports";

    /// Index: passports by owner, keyed by `owner_account_id || passport_id`.
    /// Value is empty (index only).
    pub const PASSPORTS_BY_OWNER: &str = "passports_by_owner";

    /// Singleton site settings, keyed by setting name.
    pub const SETTINGS: &str = "settings";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::ACCOUNTS_BY_EXTERNAL_ID,
        cf::LISTINGS,
        cf::BUSINESS_REQUESTS,
        cf::BUSINESS_REQUESTS_BY_ACCOUNT,
        cf::PASSPORTS,
        cf::PASSPORTS_BY_OWNER,
        cf::SETTINGS,
    ]
}
