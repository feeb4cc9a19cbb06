//! Access gate.
//!
//! Pure allow/deny policy over resolved [`Entitlements`]. Nothing here touches
//! storage; callers must short-circuit the underlying mutation on a denial.

use std::fmt;

use serde::Serialize;

use crate::entitlement::Entitlements;
use crate::ids::AccountId;
use crate::listing::Category;

/// Why an action was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// No verified identity.
    Unauthenticated,
    /// Admin role required.
    AdminRequired,
    /// Premium membership required (the caller should show an upsell).
    PremiumRequired,
    /// Caller does not own the record.
    NotOwner,
    /// Business fields require an approved business operator.
    BusinessOperatorRequired,
    /// Business operators cannot file another connection request.
    AlreadyBusinessOperator,
}

impl DenyReason {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::AdminRequired => "admin_required",
            Self::PremiumRequired => "premium_required",
            Self::NotOwner => "not_owner",
            Self::BusinessOperatorRequired => "business_operator_required",
            Self::AlreadyBusinessOperator => "already_business_operator",
        }
    }

    /// Whether the presentation layer should offer the premium upsell path.
    #[must_use]
    pub const fn is_upsell(self) -> bool {
        matches!(self, Self::PremiumRequired)
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A gated action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Listing moderation, business-request review, site settings, premium
    /// confirmation and passport verification.
    AdminSurface,
    /// Submitting a listing of the given category.
    SubmitListing(Category),
    /// Opening the advice chat.
    OpenAdviceChat,
    /// Editing a record (pet passport, profile) owned by `owner`.
    EditOwned {
        /// The owning account.
        owner: AccountId,
    },
    /// Editing the business profile of `owner`.
    EditBusinessProfile {
        /// The owning account.
        owner: AccountId,
    },
    /// Filing a business-connection request.
    SubmitBusinessRequest,
}

/// The gate's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The action may proceed.
    Allow,
    /// The action must not proceed.
    Deny(DenyReason),
}

impl Decision {
    /// Whether the action may proceed.
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Convert into a `Result` so callers can use `?`.
    ///
    /// # Errors
    ///
    /// Returns the deny reason when the action is denied.
    pub const fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(reason) => Err(reason),
        }
    }

    const fn from_flag(allowed: bool, reason: DenyReason) -> Self {
        if allowed {
            Self::Allow
        } else {
            Self::Deny(reason)
        }
    }
}

/// Decide whether `caller` may perform `action`.
///
/// Guests are denied everything with [`DenyReason::Unauthenticated`].
#[must_use]
pub fn authorize(caller: &Entitlements, action: Action) -> Decision {
    if caller.is_guest {
        return Decision::Deny(DenyReason::Unauthenticated);
    }

    match action {
        Action::AdminSurface => admin_surface(caller),
        Action::SubmitListing(category) => submit_listing(caller, category),
        Action::OpenAdviceChat => open_advice_chat(caller),
        Action::EditOwned { owner } => edit_owned(caller, owner),
        Action::EditBusinessProfile { owner } => edit_business_profile(caller, owner),
        Action::SubmitBusinessRequest => submit_business_request(caller),
    }
}

/// Admin surface: allowed iff the caller is an admin.
#[must_use]
pub const fn admin_surface(caller: &Entitlements) -> Decision {
    Decision::from_flag(caller.is_admin, DenyReason::AdminRequired)
}

/// `service` and `sale` listings need premium; other categories are open to
/// any account.
#[must_use]
pub const fn submit_listing(caller: &Entitlements, category: Category) -> Decision {
    if category.requires_premium() {
        Decision::from_flag(caller.is_premium, DenyReason::PremiumRequired)
    } else {
        Decision::Allow
    }
}

/// Advice chat: premium members only.
#[must_use]
pub const fn open_advice_chat(caller: &Entitlements) -> Decision {
    Decision::from_flag(caller.is_premium, DenyReason::PremiumRequired)
}

/// Ownership check, independent of admin and premium.
#[must_use]
pub fn edit_owned(caller: &Entitlements, owner: AccountId) -> Decision {
    Decision::from_flag(caller.account_id == Some(owner), DenyReason::NotOwner)
}

/// Business profile edits: owner, and the owner must be a business operator.
#[must_use]
pub fn edit_business_profile(caller: &Entitlements, owner: AccountId) -> Decision {
    match edit_owned(caller, owner) {
        Decision::Allow => Decision::from_flag(
            caller.is_business_operator,
            DenyReason::BusinessOperatorRequired,
        ),
        deny @ Decision::Deny(_) => deny,
    }
}

/// Operators are routed to their business page instead of filing again.
#[must_use]
pub const fn submit_business_request(caller: &Entitlements) -> Decision {
    Decision::from_flag(
        !caller.is_business_operator,
        DenyReason::AlreadyBusinessOperator,
    )
}
