//! Telegram WebApp init data verification.
//!
//! The mini-app receives its launch parameters as a URL-encoded string signed
//! with a key derived from the bot token:
//!
//! ```text
//! secret_key       = HMAC_SHA256(key = "WebAppData", msg = bot_token)
//! data_check_string = "\n".join(sorted("key=value" for every field except hash))
//! hash             = hex(HMAC_SHA256(key = secret_key, msg = data_check_string))
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use url::form_urlencoded;

use animal_family_core::PlatformUser;

use crate::crypto::{constant_time_eq, hmac_sha256, hmac_sha256_hex};

/// Key used to derive the secret from the bot token.
const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";

/// How far ahead of our clock an `auth_date` may be.
const MAX_CLOCK_SKEW: Duration = Duration::from_secs(60);

/// Verified launch parameters.
#[derive(Debug, Clone)]
pub struct InitData {
    /// The user who opened the mini-app.
    pub user: PlatformUser,
    /// When Telegram signed the data.
    pub auth_date: DateTime<Utc>,
}

/// Why init data was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitDataError {
    /// No `hash` field.
    #[error("missing hash")]
    MissingHash,

    /// Signature does not match.
    #[error("signature mismatch")]
    SignatureMismatch,

    /// No usable `auth_date` field.
    #[error("missing or invalid auth_date")]
    InvalidAuthDate,

    /// Signed too long ago.
    #[error("init data expired")]
    Expired,

    /// Signed in the future, beyond the allowed clock skew.
    #[error("auth_date is in the future")]
    FromFuture,

    /// No usable `user` field.
    #[error("invalid user: {0}")]
    InvalidUser(String),
}

/// Verify `raw` against `bot_token` and decode the user.
///
/// # Errors
///
/// Returns an [`InitDataError`] if the signature, the age or the user object
/// is not acceptable.
pub fn verify(
    raw: &str,
    bot_token: &str,
    max_age: Duration,
    now: DateTime<Utc>,
) -> Result<InitData, InitDataError> {
    let mut hash = None;
    let mut pairs: Vec<(String, String)> = Vec::new();
    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        if key == "hash" {
            hash = Some(value.into_owned());
        } else {
            pairs.push((key.into_owned(), value.into_owned()));
        }
    }
    let hash = hash.ok_or(InitDataError::MissingHash)?;

    let expected = signature(&pairs, bot_token);
    if !constant_time_eq(&expected, &hash.to_ascii_lowercase()) {
        return Err(InitDataError::SignatureMismatch);
    }

    let field = |name: &str| {
        pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    };

    let auth_date = field("auth_date")
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or(InitDataError::InvalidAuthDate)?;

    match now.signed_duration_since(auth_date).to_std() {
        Ok(age) if age > max_age => return Err(InitDataError::Expired),
        Ok(_) => {}
        Err(_) => {
            let ahead = auth_date
                .signed_duration_since(now)
                .to_std()
                .unwrap_or(Duration::MAX);
            if ahead > MAX_CLOCK_SKEW {
                return Err(InitDataError::FromFuture);
            }
        }
    }

    let user = field("user").ok_or_else(|| InitDataError::InvalidUser("missing".into()))?;
    let user: PlatformUser =
        serde_json::from_str(user).map_err(|e| InitDataError::InvalidUser(e.to_string()))?;

    Ok(InitData { user, auth_date })
}

/// Produce signed init data for `fields`, as Telegram would.
///
/// Used by tests and local tooling to impersonate a launch.
#[must_use]
pub fn sign(fields: &[(&str, &str)], bot_token: &str) -> String {
    let pairs: Vec<(String, String)> = fields
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    let hash = signature(&pairs, bot_token);

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        serializer.append_pair(key, value);
    }
    serializer.append_pair("hash", &hash);
    serializer.finish()
}

fn signature(pairs: &[(String, String)], bot_token: &str) -> String {
    let mut lines: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
    lines.sort();

    let secret = hmac_sha256(WEB_APP_DATA_KEY, bot_token.as_bytes());
    hmac_sha256_hex(&secret, &lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT_TOKEN: &str = "123456:test-bot-token";
    const DAY: Duration = Duration::from_secs(86_400);
    const USER: &str = r#"{"id":42,"first_name":"Anna","username":"anna"}"#;

    fn signed_at(auth_date: i64) -> String {
        sign(
            &[
                ("query_id", "AAHdF6IQAAAAAN0XohDhrOrc"),
                ("user", USER),
                ("auth_date", &auth_date.to_string()),
            ],
            BOT_TOKEN,
        )
    }

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn accepts_fresh_signed_data() {
        let raw = signed_at(1_700_000_000 - 60);
        let data = verify(&raw, BOT_TOKEN, DAY, now()).unwrap();
        assert_eq!(data.user.id, 42);
        assert_eq!(data.user.username.as_deref(), Some("anna"));
    }

    #[test]
    fn field_order_does_not_matter() {
        let raw = sign(
            &[
                ("auth_date", "1699999990"),
                ("user", USER),
                ("query_id", "AAHdF6IQAAAAAN0XohDhrOrc"),
            ],
            BOT_TOKEN,
        );
        assert!(verify(&raw, BOT_TOKEN, DAY, now()).is_ok());
    }

    #[test]
    fn rejects_tampered_user() {
        let raw = signed_at(1_700_000_000).replace("42", "43");
        assert_eq!(
            verify(&raw, BOT_TOKEN, DAY, now()).unwrap_err(),
            InitDataError::SignatureMismatch
        );
    }

    #[test]
    fn rejects_other_bot_token() {
        let raw = signed_at(1_700_000_000);
        assert_eq!(
            verify(&raw, "654321:other", DAY, now()).unwrap_err(),
            InitDataError::SignatureMismatch
        );
    }

    #[test]
    fn rejects_expired_data() {
        let raw = signed_at(1_700_000_000 - 86_401);
        assert_eq!(
            verify(&raw, BOT_TOKEN, DAY, now()).unwrap_err(),
            InitDataError::Expired
        );
    }

    #[test]
    fn rejects_auth_date_in_the_future() {
        let raw = signed_at(4_102_444_800);
        assert_eq!(
            verify(&raw, BOT_TOKEN, DAY, now()).unwrap_err(),
            InitDataError::FromFuture
        );
    }

    #[test]
    fn tolerates_small_clock_skew() {
        let raw = signed_at(1_700_000_000 + 30);
        assert!(verify(&raw, BOT_TOKEN, DAY, now()).is_ok());
    }

    #[test]
    fn rejects_missing_hash() {
        let raw = "user=%7B%22id%22%3A42%7D&auth_date=1700000000";
        assert_eq!(
            verify(raw, BOT_TOKEN, DAY, now()).unwrap_err(),
            InitDataError::MissingHash
        );
    }

    #[test]
    fn rejects_signed_data_without_user() {
        let raw = sign(&[("auth_date", "1700000000")], BOT_TOKEN);
        assert!(matches!(
            verify(&raw, BOT_TOKEN, DAY, now()),
            Err(InitDataError::InvalidUser(_))
        ));
    }
}
