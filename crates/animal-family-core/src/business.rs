//! Business-connection requests.
//!
//! A request exists only while it is pending. Approval promotes the requester
//! to business operator and deletes the request in one store transaction;
//! rejection only deletes it. Whoever decides first wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::account::{Account, MAX_BUSINESS_NAME_CHARS, MAX_BUSINESS_TEXT_CHARS, MAX_CITY_CHARS};
use crate::ids::{AccountId, BusinessRequestId};
use crate::listing::ModerationDecision;
use crate::text::{optional, required};
use crate::{MarketError, Result};

/// What an account files to become a business operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessApplication {
    /// Proposed business name (required).
    pub company_name: String,
    /// City.
    #[serde(default)]
    pub city: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Contact details.
    #[serde(default)]
    pub contacts: Option<String>,
}

/// A pending business-connection request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessRequest {
    /// Request id.
    pub request_id: BusinessRequestId,
    /// The filing account.
    pub requesting_account_id: AccountId,
    /// Proposed business name.
    pub company_name: String,
    /// Proposed description.
    pub description: Option<String>,
    /// Proposed contact details.
    pub contacts: Option<String>,
    /// Proposed city.
    pub city: Option<String>,
    /// When the request was filed.
    pub created_at: DateTime<Utc>,
}

impl BusinessRequest {
    /// File a request on behalf of `account`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the company name is blank or a field is
    /// too long.
    pub fn file(account: &Account, application: &BusinessApplication) -> Result<Self> {
        Ok(Self {
            request_id: BusinessRequestId::generate(),
            requesting_account_id: account.account_id,
            company_name: required(
                "company_name",
                &application.company_name,
                MAX_BUSINESS_NAME_CHARS,
            )?,
            description: optional(
                "description",
                application.description.as_deref(),
                MAX_BUSINESS_TEXT_CHARS,
            )?,
            contacts: optional(
                "contacts",
                application.contacts.as_deref(),
                MAX_BUSINESS_TEXT_CHARS,
            )?,
            city: optional("city", application.city.as_deref(), MAX_CITY_CHARS)?,
            created_at: Utc::now(),
        })
    }

    /// The error for a decision on a request that no longer exists.
    #[must_use]
    pub fn already_decided(id: BusinessRequestId) -> MarketError {
        MarketError::AlreadyDecided {
            entity: "business_request",
            id: id.to_string(),
        }
    }
}

/// The result of deciding a business request.
#[derive(Debug, Clone, PartialEq)]
pub enum BusinessOutcome {
    /// The requester is now a business operator.
    Approved(Box<Account>),
    /// The request was discarded.
    Rejected,
}

impl BusinessOutcome {
    /// The decision that produced this outcome.
    #[must_use]
    pub const fn decision(&self) -> ModerationDecision {
        match self {
            Self::Approved(_) => ModerationDecision::Approve,
            Self::Rejected => ModerationDecision::Reject,
        }
    }
}
