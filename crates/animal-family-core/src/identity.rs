//! External identity assertions.
//!
//! The chat platform tells us who the caller is. After the service layer has
//! verified the platform signature, the embedded user object is turned into an
//! [`IdentityAssertion`] here. Anything that does not normalise cleanly is an
//! [`IdentityError`]; callers treat that as a guest, not as a failure.

use serde::{Deserialize, Serialize};

use crate::ids::ExternalId;
use crate::text::{non_blank, truncate_chars};

/// Maximum stored length of a display name, in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 128;

/// Maximum stored length of a handle, in characters.
pub const MAX_HANDLE_CHARS: usize = 64;

/// A normalised identity assertion from the chat platform.
///
/// Only display fields are carried. Entitlements are never read from here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityAssertion {
    /// Platform-issued user id.
    pub external_id: ExternalId,
    /// Human readable name.
    pub display_name: String,
    /// Platform handle without the leading `@`.
    pub handle: Option<String>,
    /// Avatar reference (URL) supplied by the platform.
    pub avatar_ref: Option<String>,
}

/// The user object embedded in the platform launch data.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformUser {
    /// Numeric user id.
    pub id: i64,
    /// First name (always present on the platform, but may be blank).
    #[serde(default)]
    pub first_name: String,
    /// Last name.
    #[serde(default)]
    pub last_name: Option<String>,
    /// Username.
    #[serde(default)]
    pub username: Option<String>,
    /// Profile photo URL.
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Why an identity assertion could not be formed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// The user id is missing or not positive.
    #[error("invalid external id")]
    InvalidExternalId,

    /// Neither a name nor a handle was supplied.
    #[error("missing display name")]
    MissingDisplayName,
}

impl IdentityAssertion {
    /// Build a normalised assertion.
    ///
    /// Strings are trimmed, blanks become `None`, a leading `@` is stripped from
    /// the handle and the display name falls back to the handle. Over-long names
    /// are truncated rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is not positive or no usable name remains.
    pub fn new(
        external_id: i64,
        display_name: &str,
        handle: Option<&str>,
        avatar_ref: Option<&str>,
    ) -> Result<Self, IdentityError> {
        let external_id =
            ExternalId::new(external_id).map_err(|_| IdentityError::InvalidExternalId)?;

        let handle = non_blank(handle.map(|h| h.trim().trim_start_matches('@')))
            .map(|h| truncate_chars(&h, MAX_HANDLE_CHARS));

        let display_name = non_blank(Some(display_name))
            .or_else(|| handle.clone())
            .map(|name| truncate_chars(&name, MAX_DISPLAY_NAME_CHARS))
            .ok_or(IdentityError::MissingDisplayName)?;

        Ok(Self {
            external_id,
            display_name,
            handle,
            avatar_ref: non_blank(avatar_ref),
        })
    }

    /// Build an assertion from the platform user object.
    ///
    /// # Errors
    ///
    /// See [`IdentityAssertion::new`].
    pub fn from_platform_user(user: &PlatformUser) -> Result<Self, IdentityError> {
        let full_name = match user.last_name.as_deref().map(str::trim) {
            Some(last) if !last.is_empty() => format!("{} {last}", user.first_name.trim()),
            _ => user.first_name.clone(),
        };

        Self::new(
            user.id,
            &full_name,
            user.username.as_deref(),
            user.photo_url.as_deref(),
        )
    }
}
