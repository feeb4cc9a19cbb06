//! `PostgreSQL` storage implementation.
//!
//! Rows are read into private `FromRow` structs and validated into core types
//! at the boundary; a row that fails is reported as `StoreError::Corrupt`.
//! Conditional writes (`ON CONFLICT`, `WHERE status = ...`, `DELETE ...
//! RETURNING`) keep each operation to one statement or one transaction.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use animal_family_core::{
    Account, AccountId, AdBanner, BusinessProfile, BusinessRequest, BusinessRequestId, ChatLink,
    ExternalId, IdentityAssertion, Listing, ListingFilter, ListingId, ListingStatus, Location,
    PassportId, PetPassport, ProfileUpdate, SiteSettings,
};

use crate::error::{Result, StoreError};
use crate::{CasOutcome, Store};

const SETTING_BANNER: &str = "banner";
const SETTING_CHAT_LINK: &str = "chat_link";

/// PostgreSQL-backed storage implementation.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database at `database_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await?;

        tracing::info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        tracing::info!("Database migrations completed");
        Ok(())
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_account_by_external_id(&self, external_id: ExternalId) -> Result<Option<Account>> {
        sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE external_id = $1")
            .bind(external_id.get())
            .fetch_optional(&self.pool)
            .await?
            .map(Account::try_from)
            .transpose()
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(sqlx::FromRow)]
struct AccountRow {
    account_id: Uuid,
    external_id: i64,
    display_name: String,
    handle: Option<String>,
    avatar_ref: Option<String>,
    role: String,
    is_premium: bool,
    is_business_operator: bool,
    business_name: Option<String>,
    business_description: Option<String>,
    business_services: Option<String>,
    business_contacts: Option<String>,
    city: Option<String>,
    phone: Option<String>,
    about: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self> {
        Ok(Self {
            account_id: AccountId::from_uuid(row.account_id),
            external_id: ExternalId::new(row.external_id)
                .map_err(|e| StoreError::corrupt("account", e))?,
            display_name: row.display_name,
            handle: row.handle,
            avatar_ref: row.avatar_ref,
            role: row
                .role
                .parse()
                .map_err(|e| StoreError::corrupt("account", e))?,
            is_premium: row.is_premium,
            is_business_operator: row.is_business_operator,
            business: BusinessProfile {
                name: row.business_name,
                description: row.business_description,
                services: row.business_services,
                contacts: row.business_contacts,
            },
            city: row.city,
            phone: row.phone,
            about: row.about,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ListingRow {
    listing_id: String,
    owner_account_id: Uuid,
    category: String,
    status: String,
    title: String,
    description: Option<String>,
    city: String,
    price: Option<i64>,
    lat: Option<f64>,
    lng: Option<f64>,
    image_ref: Option<String>,
    contact_handle: Option<String>,
    owner_was_premium: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ListingRow> for Listing {
    type Error = StoreError;

    fn try_from(row: ListingRow) -> Result<Self> {
        let corrupt = |e: &dyn std::fmt::Display| StoreError::corrupt("listing", e);
        Ok(Self {
            listing_id: row.listing_id.parse().map_err(|e| corrupt(&e))?,
            owner_account_id: AccountId::from_uuid(row.owner_account_id),
            category: row.category.parse().map_err(|e| corrupt(&e))?,
            status: row.status.parse().map_err(|e| corrupt(&e))?,
            title: row.title,
            description: row.description,
            city: row.city,
            price: row.price,
            location: row.lat.zip(row.lng).map(|(lat, lng)| Location { lat, lng }),
            image_ref: row.image_ref,
            contact_handle: row.contact_handle,
            owner_was_premium: row.owner_was_premium,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BusinessRequestRow {
    request_id: String,
    requesting_account_id: Uuid,
    company_name: String,
    description: Option<String>,
    contacts: Option<String>,
    city: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<BusinessRequestRow> for BusinessRequest {
    type Error = StoreError;

    fn try_from(row: BusinessRequestRow) -> Result<Self> {
        Ok(Self {
            request_id: row
                .request_id
                .parse()
                .map_err(|e| StoreError::corrupt("business_request", e))?,
            requesting_account_id: AccountId::from_uuid(row.requesting_account_id),
            company_name: row.company_name,
            description: row.description,
            contacts: row.contacts,
            city: row.city,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PassportRow {
    passport_id: Uuid,
    owner_account_id: Uuid,
    name: String,
    species: Option<String>,
    breed: Option<String>,
    age_years: Option<i32>,
    vaccinations: Option<String>,
    allergies: Option<String>,
    is_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PassportRow> for PetPassport {
    type Error = StoreError;

    fn try_from(row: PassportRow) -> Result<Self> {
        Ok(Self {
            passport_id: PassportId::from_uuid(row.passport_id),
            owner_account_id: AccountId::from_uuid(row.owner_account_id),
            name: row.name,
            species: row.species,
            breed: row.breed,
            age_years: row
                .age_years
                .map(u16::try_from)
                .transpose()
                .map_err(|e| StoreError::corrupt("pet_passport", e))?,
            vaccinations: row.vaccinations,
            allergies: row.allergies,
            is_verified: row.is_verified,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl Store for PgStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    async fn upsert_account(&self, assertion: &IdentityAssertion) -> Result<Account> {
        // The conditional DO UPDATE returns no row when the display fields are
        // unchanged; the follow-up read serves that case.
        let row = sqlx::query_as::<_, AccountRow>(
            r"INSERT INTO accounts (account_id, external_id, display_name, handle, avatar_ref)
              VALUES ($1, $2, $3, $4, $5)
              ON CONFLICT (external_id) DO UPDATE
                 SET display_name = EXCLUDED.display_name,
                     handle = EXCLUDED.handle,
                     avatar_ref = EXCLUDED.avatar_ref,
                     updated_at = now()
               WHERE (accounts.display_name, accounts.handle, accounts.avatar_ref)
                     IS DISTINCT FROM (EXCLUDED.display_name, EXCLUDED.handle, EXCLUDED.avatar_ref)
              RETURNING *",
        )
        .bind(*AccountId::generate().as_uuid())
        .bind(assertion.external_id.get())
        .bind(&assertion.display_name)
        .bind(&assertion.handle)
        .bind(&assertion.avatar_ref)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => self
                .fetch_account_by_external_id(assertion.external_id)
                .await?
                .ok_or_else(|| StoreError::not_found("account", assertion.external_id)),
        }
    }

    async fn seed_admin(&self, external_id: ExternalId) -> Result<Account> {
        sqlx::query_as::<_, AccountRow>(
            r"INSERT INTO accounts (account_id, external_id, display_name, role)
              VALUES ($1, $2, $3, 'admin')
              ON CONFLICT (external_id) DO UPDATE
                 SET role = 'admin', updated_at = now()
              RETURNING *",
        )
        .bind(*AccountId::generate().as_uuid())
        .bind(external_id.get())
        .bind(external_id.to_string())
        .fetch_one(&self.pool)
        .await?
        .try_into()
    }

    async fn get_account(&self, account_id: AccountId) -> Result<Option<Account>> {
        sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE account_id = $1")
            .bind(*account_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Account::try_from)
            .transpose()
    }

    async fn get_account_by_external_id(
        &self,
        external_id: ExternalId,
    ) -> Result<Option<Account>> {
        self.fetch_account_by_external_id(external_id).await
    }

    async fn update_profile(
        &self,
        account_id: AccountId,
        update: &ProfileUpdate,
    ) -> Result<Account> {
        let business = update.business.clone().unwrap_or_default();
        sqlx::query_as::<_, AccountRow>(
            r"UPDATE accounts
                 SET phone = $2,
                     city = $3,
                     about = $4,
                     business_name = CASE WHEN $5 THEN $6 ELSE business_name END,
                     business_description = CASE WHEN $5 THEN $7 ELSE business_description END,
                     business_services = CASE WHEN $5 THEN $8 ELSE business_services END,
                     business_contacts = CASE WHEN $5 THEN $9 ELSE business_contacts END,
                     updated_at = now()
               WHERE account_id = $1
              RETURNING *",
        )
        .bind(*account_id.as_uuid())
        .bind(&update.phone)
        .bind(&update.city)
        .bind(&update.about)
        .bind(update.touches_business())
        .bind(business.name)
        .bind(business.description)
        .bind(business.services)
        .bind(business.contacts)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("account", account_id))?
        .try_into()
    }

    async fn set_premium(&self, external_id: ExternalId, is_premium: bool) -> Result<Account> {
        sqlx::query_as::<_, AccountRow>(
            r"UPDATE accounts SET is_premium = $2, updated_at = now()
               WHERE external_id = $1
              RETURNING *",
        )
        .bind(external_id.get())
        .bind(is_premium)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("account", external_id))?
        .try_into()
    }

    // =========================================================================
    // Listing Operations
    // =========================================================================

    async fn insert_listing(&self, listing: &Listing) -> Result<()> {
        sqlx::query(
            r"INSERT INTO listings (
                  listing_id, owner_account_id, category, status, title, description, city,
                  price, lat, lng, image_ref, contact_handle, owner_was_premium,
                  created_at, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(listing.listing_id.to_string())
        .bind(*listing.owner_account_id.as_uuid())
        .bind(listing.category.as_str())
        .bind(listing.status.as_str())
        .bind(&listing.title)
        .bind(&listing.description)
        .bind(&listing.city)
        .bind(listing.price)
        .bind(listing.location.map(|l| l.lat))
        .bind(listing.location.map(|l| l.lng))
        .bind(&listing.image_ref)
        .bind(&listing.contact_handle)
        .bind(listing.owner_was_premium)
        .bind(listing.created_at)
        .bind(listing.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_listing(&self, listing_id: ListingId) -> Result<Option<Listing>> {
        sqlx::query_as::<_, ListingRow>("SELECT * FROM listings WHERE listing_id = $1")
            .bind(listing_id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(Listing::try_from)
            .transpose()
    }

    async fn list_listings(&self, filter: &ListingFilter) -> Result<Vec<Listing>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM listings WHERE TRUE");

        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(owner) = filter.owner {
            builder
                .push(" AND owner_account_id = ")
                .push_bind(*owner.as_uuid());
        }
        if let Some(category) = filter.category {
            builder.push(" AND category = ").push_bind(category.as_str());
        }
        if let Some(city) = &filter.city {
            builder
                .push(" AND lower(city) = lower(")
                .push_bind(city.trim().to_string())
                .push(")");
        }
        builder.push(r#" ORDER BY created_at DESC, listing_id COLLATE "C" DESC"#);
        if let Some(limit) = filter.limit {
            builder
                .push(" LIMIT ")
                .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        builder
            .build_query_as::<ListingRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Listing::try_from)
            .collect()
    }

    async fn compare_and_set_listing_status(
        &self,
        listing_id: ListingId,
        expected: ListingStatus,
        next: ListingStatus,
    ) -> Result<CasOutcome> {
        let swapped = sqlx::query_as::<_, ListingRow>(
            r"UPDATE listings SET status = $3, updated_at = now()
               WHERE listing_id = $1 AND status = $2
              RETURNING *",
        )
        .bind(listing_id.to_string())
        .bind(expected.as_str())
        .bind(next.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = swapped {
            return Ok(CasOutcome::Swapped(Box::new(row.try_into()?)));
        }

        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM listings WHERE listing_id = $1")
                .bind(listing_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        match current {
            Some(status) => Ok(CasOutcome::Mismatch(
                status
                    .parse()
                    .map_err(|e| StoreError::corrupt("listing", e))?,
            )),
            None => Err(StoreError::not_found("listing", listing_id)),
        }
    }

    // =========================================================================
    // Business Request Operations
    // =========================================================================

    async fn insert_business_request(&self, request: &BusinessRequest) -> Result<()> {
        let result = sqlx::query(
            r"INSERT INTO business_requests (
                  request_id, requesting_account_id, company_name, description, contacts,
                  city, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(request.request_id.to_string())
        .bind(*request.requesting_account_id.as_uuid())
        .bind(&request.company_name)
        .bind(&request.description)
        .bind(&request.contacts)
        .bind(&request.city)
        .bind(request.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict {
                entity: "business_request",
                reason: "a request is already pending for this account".into(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_business_request(
        &self,
        request_id: BusinessRequestId,
    ) -> Result<Option<BusinessRequest>> {
        sqlx::query_as::<_, BusinessRequestRow>(
            "SELECT * FROM business_requests WHERE request_id = $1",
        )
        .bind(request_id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .map(BusinessRequest::try_from)
        .transpose()
    }

    async fn list_business_requests(&self) -> Result<Vec<BusinessRequest>> {
        sqlx::query_as::<_, BusinessRequestRow>(
            r#"SELECT * FROM business_requests ORDER BY created_at DESC, request_id COLLATE "C" DESC"#,
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(BusinessRequest::try_from)
        .collect()
    }

    async fn approve_business_request(&self, request_id: BusinessRequestId) -> Result<Account> {
        let mut tx = self.pool.begin().await?;

        // The DELETE takes the row lock: a concurrent decision waits here and
        // then finds nothing to delete.
        let request: BusinessRequest = sqlx::query_as::<_, BusinessRequestRow>(
            "DELETE FROM business_requests WHERE request_id = $1 RETURNING *",
        )
        .bind(request_id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::not_found("business_request", request_id))?
        .try_into()?;

        let account: Account = sqlx::query_as::<_, AccountRow>(
            r"UPDATE accounts
                 SET is_business_operator = TRUE,
                     business_name = $2,
                     business_description = $3,
                     business_contacts = $4,
                     city = $5,
                     updated_at = now()
               WHERE account_id = $1
              RETURNING *",
        )
        .bind(*request.requesting_account_id.as_uuid())
        .bind(&request.company_name)
        .bind(&request.description)
        .bind(&request.contacts)
        .bind(&request.city)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::not_found("account", request.requesting_account_id))?
        .try_into()?;

        tx.commit().await?;
        Ok(account)
    }

    async fn reject_business_request(&self, request_id: BusinessRequestId) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM business_requests WHERE request_id = $1")
            .bind(request_id.to_string())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(StoreError::not_found("business_request", request_id));
        }
        Ok(())
    }

    // =========================================================================
    // Pet Passport Operations
    // =========================================================================

    async fn insert_passport(&self, passport: &PetPassport) -> Result<()> {
        sqlx::query(
            r"INSERT INTO pet_passports (
                  passport_id, owner_account_id, name, species, breed, age_years,
                  vaccinations, allergies, is_verified, created_at, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(*passport.passport_id.as_uuid())
        .bind(*passport.owner_account_id.as_uuid())
        .bind(&passport.name)
        .bind(&passport.species)
        .bind(&passport.breed)
        .bind(passport.age_years.map(i32::from))
        .bind(&passport.vaccinations)
        .bind(&passport.allergies)
        .bind(passport.is_verified)
        .bind(passport.created_at)
        .bind(passport.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_passport(&self, passport_id: PassportId) -> Result<Option<PetPassport>> {
        sqlx::query_as::<_, PassportRow>("SELECT * FROM pet_passports WHERE passport_id = $1")
            .bind(*passport_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(PetPassport::try_from)
            .transpose()
    }

    async fn list_passports(&self, owner: Option<AccountId>) -> Result<Vec<PetPassport>> {
        sqlx::query_as::<_, PassportRow>(
            r"SELECT * FROM pet_passports
               WHERE $1::uuid IS NULL OR owner_account_id = $1
               ORDER BY created_at DESC",
        )
        .bind(owner.map(|o| *o.as_uuid()))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(PetPassport::try_from)
        .collect()
    }

    async fn update_passport(&self, passport: &PetPassport) -> Result<PetPassport> {
        sqlx::query_as::<_, PassportRow>(
            r"UPDATE pet_passports
                 SET name = $2, species = $3, breed = $4, age_years = $5,
                     vaccinations = $6, allergies = $7, updated_at = now()
               WHERE passport_id = $1
              RETURNING *",
        )
        .bind(*passport.passport_id.as_uuid())
        .bind(&passport.name)
        .bind(&passport.species)
        .bind(&passport.breed)
        .bind(passport.age_years.map(i32::from))
        .bind(&passport.vaccinations)
        .bind(&passport.allergies)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("pet_passport", passport.passport_id))?
        .try_into()
    }

    async fn set_passport_verified(
        &self,
        passport_id: PassportId,
        verified: bool,
    ) -> Result<PetPassport> {
        sqlx::query_as::<_, PassportRow>(
            r"UPDATE pet_passports SET is_verified = $2, updated_at = now()
               WHERE passport_id = $1
              RETURNING *",
        )
        .bind(*passport_id.as_uuid())
        .bind(verified)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("pet_passport", passport_id))?
        .try_into()
    }

    // =========================================================================
    // Site Settings
    // =========================================================================

    async fn get_settings(&self) -> Result<SiteSettings> {
        let rows: Vec<(String, serde_json::Value)> =
            sqlx::query_as("SELECT key, value FROM site_settings")
                .fetch_all(&self.pool)
                .await?;

        let mut settings = SiteSettings::default();
        for (key, value) in rows {
            match key.as_str() {
                SETTING_BANNER => {
                    settings.banner = Some(
                        serde_json::from_value(value)
                            .map_err(|e| StoreError::Serialization(e.to_string()))?,
                    );
                }
                SETTING_CHAT_LINK => {
                    settings.chat_link = Some(
                        serde_json::from_value(value)
                            .map_err(|e| StoreError::Serialization(e.to_string()))?,
                    );
                }
                other => tracing::debug!(key = %other, "Ignoring unknown site setting"),
            }
        }
        Ok(settings)
    }

    async fn put_banner(&self, banner: &AdBanner) -> Result<()> {
        put_setting(&self.pool, SETTING_BANNER, banner).await
    }

    async fn put_chat_link(&self, link: &ChatLink) -> Result<()> {
        put_setting(&self.pool, SETTING_CHAT_LINK, link).await
    }
}

async fn put_setting<T: serde::Serialize + Sync>(pool: &PgPool, key: &str, value: &T) -> Result<()> {
    sqlx::query(
        r"INSERT INTO site_settings (key, value, updated_at) VALUES ($1, $2, now())
          ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
    )
    .bind(key)
    .bind(Json(value))
    .execute(pool)
    .await?;
    Ok(())
}
