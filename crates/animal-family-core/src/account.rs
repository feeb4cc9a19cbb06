//! Account records.
//!
//! One account per platform identity. Display fields follow the latest identity
//! assertion; entitlement fields (`role`, `is_premium`, `is_business_operator`)
//! are only ever changed by admin-authorized paths.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::business::BusinessRequest;
use crate::identity::IdentityAssertion;
use crate::ids::{AccountId, ExternalId};
use crate::text::optional;
use crate::MarketError;

/// Maximum length of a phone number, in characters.
pub const MAX_PHONE_CHARS: usize = 32;

/// Maximum length of a city name, in characters.
pub const MAX_CITY_CHARS: usize = 80;

/// Maximum length of the "about" text, in characters.
pub const MAX_ABOUT_CHARS: usize = 1000;

/// Maximum length of a business name, in characters.
pub const MAX_BUSINESS_NAME_CHARS: usize = 120;

/// Maximum length of the longer business fields, in characters.
pub const MAX_BUSINESS_TEXT_CHARS: usize = 2000;

/// Account role. `Admin` is the single source of truth for admin rights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular member.
    #[default]
    None,
    /// Administrator.
    Admin,
}

impl Role {
    /// Stable storage form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "admin" => Ok(Self::Admin),
            other => Err(MarketError::validation("role", format!("unknown role {other:?}"))),
        }
    }
}

/// Public business profile fields of an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessProfile {
    /// Business name.
    pub name: Option<String>,
    /// Business description.
    pub description: Option<String>,
    /// Services offered.
    pub services: Option<String>,
    /// Contact details.
    pub contacts: Option<String>,
}

impl BusinessProfile {
    /// Trim and length-check every field.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a field is too long.
    pub fn normalized(&self) -> Result<Self, MarketError> {
        Ok(Self {
            name: optional("business_name", self.name.as_deref(), MAX_BUSINESS_NAME_CHARS)?,
            description: optional(
                "business_description",
                self.description.as_deref(),
                MAX_BUSINESS_TEXT_CHARS,
            )?,
            services: optional(
                "business_services",
                self.services.as_deref(),
                MAX_BUSINESS_TEXT_CHARS,
            )?,
            contacts: optional(
                "business_contacts",
                self.contacts.as_deref(),
                MAX_BUSINESS_TEXT_CHARS,
            )?,
        })
    }
}

/// A local account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Local id, assigned once.
    pub account_id: AccountId,

    /// Platform user id; unique and immutable.
    pub external_id: ExternalId,

    /// Display name from the latest identity assertion.
    pub display_name: String,

    /// Platform handle from the latest identity assertion.
    pub handle: Option<String>,

    /// Avatar reference from the latest identity assertion.
    pub avatar_ref: Option<String>,

    /// Role (admin rights).
    pub role: Role,

    /// Paying member, confirmed manually by an admin.
    pub is_premium: bool,

    /// Approved business operator.
    pub is_business_operator: bool,

    /// Business profile, meaningful once `is_business_operator` is set.
    pub business: BusinessProfile,

    /// City.
    pub city: Option<String>,

    /// Phone number.
    pub phone: Option<String>,

    /// Free-text description.
    pub about: Option<String>,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account from an identity assertion with default entitlements.
    #[must_use]
    pub fn new(assertion: &IdentityAssertion) -> Self {
        let now = Utc::now();
        Self {
            account_id: AccountId::generate(),
            external_id: assertion.external_id,
            display_name: assertion.display_name.clone(),
            handle: assertion.handle.clone(),
            avatar_ref: assertion.avatar_ref.clone(),
            role: Role::None,
            is_premium: false,
            is_business_operator: false,
            business: BusinessProfile::default(),
            city: None,
            phone: None,
            about: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Placeholder account for an admin seeded before the person ever opened
    /// the app. The next identity assertion replaces the display fields.
    #[must_use]
    pub fn seeded_admin(external_id: ExternalId) -> Self {
        let now = Utc::now();
        Self {
            account_id: AccountId::generate(),
            external_id,
            display_name: external_id.to_string(),
            handle: None,
            avatar_ref: None,
            role: Role::Admin,
            is_premium: false,
            is_business_operator: false,
            business: BusinessProfile::default(),
            city: None,
            phone: None,
            about: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the stored display fields already equal the assertion.
    #[must_use]
    pub fn display_matches(&self, assertion: &IdentityAssertion) -> bool {
        self.external_id == assertion.external_id
            && self.display_name == assertion.display_name
            && self.handle == assertion.handle
            && self.avatar_ref == assertion.avatar_ref
    }

    /// Refresh display fields from an assertion. Entitlements are untouched.
    pub fn apply_assertion(&mut self, assertion: &IdentityAssertion) {
        self.display_name.clone_from(&assertion.display_name);
        self.handle.clone_from(&assertion.handle);
        self.avatar_ref.clone_from(&assertion.avatar_ref);
        self.updated_at = Utc::now();
    }

    /// Apply an owner edit. The update must already be normalised.
    pub fn apply_profile_update(&mut self, update: &ProfileUpdate) {
        self.phone.clone_from(&update.phone);
        self.city.clone_from(&update.city);
        self.about.clone_from(&update.about);
        if let Some(business) = &update.business {
            self.business = business.clone();
        }
        self.updated_at = Utc::now();
    }

    /// Promote to business operator from an approved request.
    ///
    /// Copies `company_name`, `description`, `contacts` and `city`; a request
    /// without a city clears it. The services field is left for the operator
    /// to fill in.
    pub fn promote_to_business(&mut self, request: &BusinessRequest) {
        self.is_business_operator = true;
        self.business.name = Some(request.company_name.clone());
        self.business.description.clone_from(&request.description);
        self.business.contacts.clone_from(&request.contacts);
        self.city.clone_from(&request.city);
        self.updated_at = Utc::now();
    }

    /// Whether the account holds the admin role.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

/// Owner-editable profile fields.
///
/// Personal fields are replaced wholesale (absent clears the field). The
/// business block is optional: when absent the stored business profile is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// Phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// City.
    #[serde(default)]
    pub city: Option<String>,
    /// Free-text description.
    #[serde(default)]
    pub about: Option<String>,
    /// Business profile fields (business operators only).
    #[serde(default)]
    pub business: Option<BusinessProfile>,
}

impl ProfileUpdate {
    /// Trim and length-check every field.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a field is too long.
    pub fn normalized(&self) -> Result<Self, MarketError> {
        Ok(Self {
            phone: optional("phone", self.phone.as_deref(), MAX_PHONE_CHARS)?,
            city: optional("city", self.city.as_deref(), MAX_CITY_CHARS)?,
            about: optional("about", self.about.as_deref(), MAX_ABOUT_CHARS)?,
            business: self
                .business
                .as_ref()
                .map(BusinessProfile::normalized)
                .transpose()?,
        })
    }

    /// Whether the update writes business profile fields.
    #[must_use]
    pub const fn touches_business(&self) -> bool {
        self.business.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::business::BusinessApplication;

    fn assertion(name: &str) -> IdentityAssertion {
        IdentityAssertion::new(42, name, Some("anna"), None).unwrap()
    }

    #[test]
    fn new_account_has_default_entitlements() {
        let account = Account::new(&assertion("Anna"));
        assert_eq!(account.role, Role::None);
        assert!(!account.is_premium);
        assert!(!account.is_business_operator);
        assert_eq!(account.external_id.get(), 42);
    }

    #[test]
    fn apply_assertion_only_touches_display_fields() {
        let mut account = Account::new(&assertion("Anna"));
        account.role = Role::Admin;
        account.is_premium = true;
        let id = account.account_id;

        let next = IdentityAssertion::new(42, "Anna P.", None, Some("https://t.me/a.jpg")).unwrap();
        account.apply_assertion(&next);

        assert_eq!(account.display_name, "Anna P.");
        assert_eq!(account.handle, None);
        assert_eq!(account.avatar_ref.as_deref(), Some("https://t.me/a.jpg"));
        assert_eq!(account.role, Role::Admin);
        assert!(account.is_premium);
        assert_eq!(account.account_id, id);
        assert!(account.display_matches(&next));
    }

    #[test]
    fn profile_update_keeps_business_when_absent() {
        let mut account = Account::new(&assertion("Anna"));
        account.business.name = Some("Happy Tail".into());

        let update = ProfileUpdate {
            city: Some("  Kazan ".into()),
            about: Some("   ".into()),
            ..ProfileUpdate::default()
        }
        .normalized()
        .unwrap();
        account.apply_profile_update(&update);

        assert_eq!(account.city.as_deref(), Some("Kazan"));
        assert_eq!(account.about, None);
        assert_eq!(account.business.name.as_deref(), Some("Happy Tail"));
    }

    #[test]
    fn profile_update_rejects_long_phone() {
        let update = ProfileUpdate {
            phone: Some("9".repeat(MAX_PHONE_CHARS + 1)),
            ..ProfileUpdate::default()
        };
        assert!(matches!(
            update.normalized(),
            Err(MarketError::Validation { field: "phone", .. })
        ));
    }

    #[test]
    fn promotion_copies_request_fields() {
        let mut account = Account::new(&assertion("Anna"));
        account.business.services = Some("grooming".into());
        let request = BusinessRequest::file(
            &account,
            &BusinessApplication {
                company_name: "Happy Tail".into(),
                city: Some("Moscow".into()),
                description: Some("Grooming salon".into()),
                contacts: Some("@happytail".into()),
            },
        )
        .unwrap();

        account.promote_to_business(&request);

        assert!(account.is_business_operator);
        assert_eq!(account.business.name.as_deref(), Some("Happy Tail"));
        assert_eq!(account.business.description.as_deref(), Some("Grooming salon"));
        assert_eq!(account.business.contacts.as_deref(), Some("@happytail"));
        assert_eq!(account.business.services.as_deref(), Some("grooming"));
        assert_eq!(account.city.as_deref(), Some("Moscow"));
    }

    #[test]
    fn promotion_takes_the_request_city_even_when_absent() {
        let mut account = Account::new(&assertion("Anna"));
        account.city = Some("Kazan".into());
        let request = BusinessRequest::file(
            &account,
            &BusinessApplication {
                company_name: "Happy Tail".into(),
                city: None,
                description: None,
                contacts: None,
            },
        )
        .unwrap();

        account.promote_to_business(&request);

        assert_eq!(account.city, None);
    }

    #[test]
    fn role_storage_form_round_trips() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::None.as_str(), "none");
        assert!("owner".parse::<Role>().is_err());
    }
}
