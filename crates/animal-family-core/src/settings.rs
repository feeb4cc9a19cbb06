//! Site-wide settings configured from the admin surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::text::required;
use crate::{MarketError, Result};

/// Maximum length of the banner title, in characters.
pub const MAX_BANNER_TITLE_CHARS: usize = 120;

/// Maximum length of the banner body, in characters.
pub const MAX_BANNER_BODY_CHARS: usize = 1000;

/// The advertising banner on the home screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdBanner {
    /// Headline.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl AdBanner {
    /// Build a validated banner.
    ///
    /// # Errors
    ///
    /// Returns a validation error on blank or over-long text.
    pub fn new(title: &str, body: &str) -> Result<Self> {
        Ok(Self {
            title: required("title", title, MAX_BANNER_TITLE_CHARS)?,
            body: required("body", body, MAX_BANNER_BODY_CHARS)?,
            updated_at: Utc::now(),
        })
    }
}

/// The community chat link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLink {
    /// Absolute `http(s)` URL.
    pub url: String,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl ChatLink {
    /// Build a validated link.
    ///
    /// # Errors
    ///
    /// Returns a validation error unless `url` is an absolute `http` or
    /// `https` URL.
    pub fn new(url: &str) -> Result<Self> {
        let parsed = Url::parse(url.trim())
            .map_err(|e| MarketError::validation("url", e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(MarketError::validation("url", "must be an http(s) URL"));
        }
        Ok(Self {
            url: parsed.into(),
            updated_at: Utc::now(),
        })
    }
}

/// Everything the settings surface returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSettings {
    /// Banner, if configured.
    pub banner: Option<AdBanner>,
    /// Community chat link, if configured.
    pub chat_link: Option<ChatLink>,
}
