//! Core types and policy for Animal Family.
//!
//! Animal Family is a marketplace for pet owners that runs inside a chat
//! platform mini-app. This crate holds everything that does not need I/O:
//!
//! - **Identifiers**: `AccountId`, `ExternalId`, `ListingId`, `BusinessRequestId`, `PassportId`
//! - **Identity**: `IdentityAssertion`, normalised from the platform user object
//! - **Accounts**: `Account`, `Role`, `BusinessProfile`, `ProfileUpdate`
//! - **Entitlements**: `Entitlements::resolve`, a pure function of the account
//! - **Access gate**: `authorize(&Entitlements, Action) -> Decision`
//! - **Moderation**: the listing state machine and business requests
//! - **Extras**: pet passports and site settings
//!
//! # Entitlements
//!
//! Admin rights come from the stored `role` only. Premium and business operator
//! status are flags on the account, written by admin paths and never from
//! client input.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod access;
pub mod account;
pub mod business;
pub mod entitlement;
pub mod error;
pub mod identity;
pub mod ids;
pub mod listing;
pub mod passport;
pub mod settings;
mod text;

pub use access::{authorize, Action, Decision, DenyReason};
pub use account::{Account, BusinessProfile, ProfileUpdate, Role};
pub use business::{BusinessApplication, BusinessOutcome, BusinessRequest};
pub use entitlement::Entitlements;
pub use error::{MarketError, Result};
pub use identity::{IdentityAssertion, IdentityError, PlatformUser};
pub use ids::{AccountId, BusinessRequestId, ExternalId, IdError, ListingId, PassportId};
pub use listing::{
    Category, Listing, ListingDraft, ListingFilter, ListingStatus, Location, ModerationDecision,
    Transition,
};
pub use passport::{PassportDraft, PetPassport};
pub use settings::{AdBanner, ChatLink, SiteSettings};
