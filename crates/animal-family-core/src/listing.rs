//! Listings and the listing moderation state machine.
//!
//! A listing is created `pending` and moved to `approved` or `rejected` by an
//! admin. Both decided states are terminal. The transition itself is a pure
//! function here; the store applies it as a compare-and-swap on
//! `status = pending`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::account::{Account, MAX_CITY_CHARS};
use crate::entitlement::Entitlements;
use crate::ids::{AccountId, ListingId};
use crate::text::{optional, required};
use crate::{MarketError, Result};

/// Maximum length of a listing title, in characters.
pub const MAX_TITLE_CHARS: usize = 120;

/// Maximum length of a listing description, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 4000;

/// Maximum length of an image reference, in characters.
pub const MAX_IMAGE_REF_CHARS: usize = 2048;

/// Listing category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Lost pet.
    Lost,
    /// Found pet.
    Found,
    /// Pet looking for a home.
    Adoption,
    /// Paid service (premium only).
    Service,
    /// Sale (premium only).
    Sale,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Self; 5] = [
        Self::Lost,
        Self::Found,
        Self::Adoption,
        Self::Service,
        Self::Sale,
    ];

    /// Whether submitting this category requires a premium membership.
    #[must_use]
    pub const fn requires_premium(self) -> bool {
        matches!(self, Self::Service | Self::Sale)
    }

    /// Stable storage form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lost => "lost",
            Self::Found => "found",
            Self::Adoption => "adoption",
            Self::Service => "service",
            Self::Sale => "sale",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| MarketError::validation("category", format!("unknown category {s:?}")))
    }
}

/// Moderation status of a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    /// Awaiting review. Not shown in the public feed.
    #[default]
    Pending,
    /// Published.
    Approved,
    /// Declined by a moderator.
    Rejected,
}

impl ListingStatus {
    /// Stable storage form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Plan the effect of `decision` on a listing in this state.
    ///
    /// # Errors
    ///
    /// Returns the current state if the listing was already decided the other
    /// way.
    pub fn apply(self, decision: ModerationDecision) -> std::result::Result<Transition, Self> {
        let target = decision.target_status();
        match self {
            Self::Pending => Ok(Transition::Advance {
                from: Self::Pending,
                to: target,
            }),
            current if current == target => Ok(Transition::Unchanged),
            current => Err(current),
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingStatus {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(MarketError::validation(
                "status",
                format!("unknown status {other:?}"),
            )),
        }
    }
}

/// An admin's verdict on a listing or a business request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationDecision {
    /// Publish / accept.
    Approve,
    /// Decline.
    Reject,
}

impl ModerationDecision {
    /// The listing status this decision leads to.
    #[must_use]
    pub const fn target_status(self) -> ListingStatus {
        match self {
            Self::Approve => ListingStatus::Approved,
            Self::Reject => ListingStatus::Rejected,
        }
    }

    /// Stable form used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

/// The planned effect of a moderation decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Swap `from` for `to`, conditional on the row still being `from`.
    Advance {
        /// Expected current status.
        from: ListingStatus,
        /// New status.
        to: ListingStatus,
    },
    /// The same decision is already stored.
    Unchanged,
}

/// A map coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude, degrees.
    pub lat: f64,
    /// Longitude, degrees.
    pub lng: f64,
}

impl Location {
    fn validated(self) -> Result<Self> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(MarketError::validation("location", "latitude out of range"));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(MarketError::validation("location", "longitude out of range"));
        }
        Ok(self)
    }
}

/// What an account submits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingDraft {
    /// Category.
    pub category: Category,
    /// Title (required).
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// City (required).
    pub city: String,
    /// Asking price, whole currency units.
    #[serde(default)]
    pub price: Option<i64>,
    /// Map coordinate.
    #[serde(default)]
    pub location: Option<Location>,
    /// Opaque reference to an uploaded image.
    #[serde(default)]
    pub image_ref: Option<String>,
}

/// A listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// Listing id.
    pub listing_id: ListingId,
    /// Submitting account.
    pub owner_account_id: AccountId,
    /// Category.
    pub category: Category,
    /// Moderation status.
    pub status: ListingStatus,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// City.
    pub city: String,
    /// Asking price.
    pub price: Option<i64>,
    /// Map coordinate.
    pub location: Option<Location>,
    /// Opaque image reference.
    pub image_ref: Option<String>,
    /// The owner's platform handle at submission time.
    pub contact_handle: Option<String>,
    /// Whether the owner was premium at submission time.
    pub owner_was_premium: bool,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Build a new `pending` listing for `owner`.
    ///
    /// The category gate is not applied here; callers authorize first.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the draft is malformed.
    pub fn submit(owner: &Account, draft: &ListingDraft) -> Result<Self> {
        if draft.price.is_some_and(|p| p < 0) {
            return Err(MarketError::validation("price", "must not be negative"));
        }

        let now = Utc::now();
        Ok(Self {
            listing_id: ListingId::generate(),
            owner_account_id: owner.account_id,
            category: draft.category,
            status: ListingStatus::Pending,
            title: required("title", &draft.title, MAX_TITLE_CHARS)?,
            description: optional(
                "description",
                draft.description.as_deref(),
                MAX_DESCRIPTION_CHARS,
            )?,
            city: required("city", &draft.city, MAX_CITY_CHARS)?,
            price: draft.price,
            location: draft.location.map(Location::validated).transpose()?,
            image_ref: optional("image_ref", draft.image_ref.as_deref(), MAX_IMAGE_REF_CHARS)?,
            contact_handle: owner.handle.clone(),
            owner_was_premium: owner.is_premium,
            created_at: now,
            updated_at: now,
        })
    }

    /// Plan a moderation decision against this listing.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyDecided` if the listing was decided the other way.
    pub fn plan(&self, decision: ModerationDecision) -> Result<Transition> {
        self.status
            .apply(decision)
            .map_err(|_| MarketError::AlreadyDecided {
                entity: "listing",
                id: self.listing_id.to_string(),
            })
    }

    /// Whether `viewer` may see this listing.
    ///
    /// Approved listings are public; anything else is visible to its owner and
    /// to admins only.
    #[must_use]
    pub fn is_visible_to(&self, viewer: &Entitlements) -> bool {
        self.status == ListingStatus::Approved
            || viewer.is_admin
            || viewer.account_id == Some(self.owner_account_id)
    }
}

/// Filter for listing queries. Results are always newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingFilter {
    /// Only this status.
    pub status: Option<ListingStatus>,
    /// Only listings of this owner.
    pub owner: Option<AccountId>,
    /// Only this category.
    pub category: Option<Category>,
    /// Only this city (case-insensitive).
    pub city: Option<String>,
    /// At most this many results.
    pub limit: Option<usize>,
}

impl ListingFilter {
    /// The public feed: approved listings only.
    #[must_use]
    pub fn feed() -> Self {
        Self {
            status: Some(ListingStatus::Approved),
            ..Self::default()
        }
    }

    /// The moderation queue for one status.
    #[must_use]
    pub fn with_status(status: ListingStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// All listings of one owner, any status.
    #[must_use]
    pub fn owned_by(owner: AccountId) -> Self {
        Self {
            owner: Some(owner),
            ..Self::default()
        }
    }

    /// Whether `listing` passes the filter (the limit is applied by the store).
    #[must_use]
    pub fn matches(&self, listing: &Listing) -> bool {
        self.status.map_or(true, |s| listing.status == s)
            && self.owner.map_or(true, |o| listing.owner_account_id == o)
            && self.category.map_or(true, |c| listing.category == c)
            && self.city.as_deref().map_or(true, |city| {
                listing.city.to_lowercase() == city.trim().to_lowercase()
            })
    }
}
