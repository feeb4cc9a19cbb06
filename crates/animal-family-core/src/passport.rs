//! Pet passports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::ids::{AccountId, PassportId};
use crate::text::{optional, required};
use crate::{MarketError, Result};

/// Maximum length of a pet name, in characters.
pub const MAX_PET_NAME_CHARS: usize = 80;

/// Maximum length of the short passport fields, in characters.
pub const MAX_PASSPORT_FIELD_CHARS: usize = 120;

/// Maximum length of the medical notes, in characters.
pub const MAX_PASSPORT_NOTES_CHARS: usize = 2000;

/// Oldest accepted age, in years.
pub const MAX_AGE_YEARS: u16 = 60;

/// A pet record owned by an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetPassport {
    /// Passport id.
    pub passport_id: PassportId,
    /// Owning account.
    pub owner_account_id: AccountId,
    /// Pet name.
    pub name: String,
    /// Species.
    pub species: Option<String>,
    /// Breed.
    pub breed: Option<String>,
    /// Age in years.
    pub age_years: Option<u16>,
    /// Vaccination notes.
    pub vaccinations: Option<String>,
    /// Allergy notes.
    pub allergies: Option<String>,
    /// Check mark granted by an admin. Owner edits never write this.
    pub is_verified: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last edit.
    pub updated_at: DateTime<Utc>,
}

/// Owner-editable passport fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassportDraft {
    /// Pet name (required).
    pub name: String,
    /// Species.
    #[serde(default)]
    pub species: Option<String>,
    /// Breed.
    #[serde(default)]
    pub breed: Option<String>,
    /// Age in years.
    #[serde(default)]
    pub age_years: Option<u16>,
    /// Vaccination notes.
    #[serde(default)]
    pub vaccinations: Option<String>,
    /// Allergy notes.
    #[serde(default)]
    pub allergies: Option<String>,
}

impl PassportDraft {
    /// Trim and validate every field.
    ///
    /// # Errors
    ///
    /// Returns a validation error on a blank name, an implausible age or an
    /// over-long field.
    pub fn normalized(&self) -> Result<Self> {
        if self.age_years.is_some_and(|age| age > MAX_AGE_YEARS) {
            return Err(MarketError::validation(
                "age_years",
                format!("must be at most {MAX_AGE_YEARS}"),
            ));
        }
        Ok(Self {
            name: required("name", &self.name, MAX_PET_NAME_CHARS)?,
            species: optional("species", self.species.as_deref(), MAX_PASSPORT_FIELD_CHARS)?,
            breed: optional("breed", self.breed.as_deref(), MAX_PASSPORT_FIELD_CHARS)?,
            age_years: self.age_years,
            vaccinations: optional(
                "vaccinations",
                self.vaccinations.as_deref(),
                MAX_PASSPORT_NOTES_CHARS,
            )?,
            allergies: optional(
                "allergies",
                self.allergies.as_deref(),
                MAX_PASSPORT_NOTES_CHARS,
            )?,
        })
    }
}

impl PetPassport {
    /// Create an unverified passport for `owner`.
    ///
    /// # Errors
    ///
    /// See [`PassportDraft::normalized`].
    pub fn create(owner: &Account, draft: &PassportDraft) -> Result<Self> {
        let draft = draft.normalized()?;
        let now = Utc::now();
        Ok(Self {
            passport_id: PassportId::generate(),
            owner_account_id: owner.account_id,
            name: draft.name,
            species: draft.species,
            breed: draft.breed,
            age_years: draft.age_years,
            vaccinations: draft.vaccinations,
            allergies: draft.allergies,
            is_verified: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the owner-editable fields. `is_verified` is kept.
    ///
    /// # Errors
    ///
    /// See [`PassportDraft::normalized`].
    pub fn apply_edit(&mut self, draft: &PassportDraft) -> Result<()> {
        let draft = draft.normalized()?;
        self.name = draft.name;
        self.species = draft.species;
        self.breed = draft.breed;
        self.age_years = draft.age_years;
        self.vaccinations = draft.vaccinations;
        self.allergies = draft.allergies;
        self.updated_at = Utc::now();
        Ok(())
    }
}
