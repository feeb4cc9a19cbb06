//! Service configuration.

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use animal_family_core::ExternalId;

/// Default chat-completion endpoint base.
pub const DEFAULT_ADVICE_API_URL: &str = "https://api.openai.com/v1";

/// Default chat-completion model.
pub const DEFAULT_ADVICE_MODEL: &str = "gpt-4o-mini";

/// Which storage backend to run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Hosted PostgreSQL (`DATABASE_URL`).
    Postgres,
    /// Embedded `RocksDB` (`DATA_DIR`); needs the `rocksdb-backend` feature.
    Rocksdb,
    /// Process memory; state is lost on restart.
    Memory,
}

impl StoreBackend {
    /// Lowercase name, as accepted by `STORE_BACKEND`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Rocksdb => "rocksdb",
            Self::Memory => "memory",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "rocksdb" | "rocks" => Ok(Self::Rocksdb),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Storage backend (default: postgres).
    pub store_backend: StoreBackend,

    /// PostgreSQL connection string.
    pub database_url: Option<String>,

    /// Path to `RocksDB` data directory (default: "/data/animal-family").
    pub data_dir: String,

    /// Telegram bot token used to verify init data. Without it every caller is
    /// a guest.
    pub telegram_bot_token: Option<String>,

    /// Maximum accepted age of init data, in seconds.
    pub init_data_max_age_seconds: u64,

    /// Platform ids granted the admin role at start-up.
    pub admin_seed_external_ids: Vec<ExternalId>,

    /// External payment page for premium membership.
    pub premium_payment_url: Option<String>,

    /// Chat-completion API base URL.
    pub advice_api_url: String,

    /// Chat-completion API key (optional; advice is unavailable without it).
    pub advice_api_key: Option<String>,

    /// Chat-completion model.
    pub advice_model: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Telegram secrets file structure.
#[derive(Debug, Deserialize)]
struct TelegramSecrets {
    bot_token: String,
}

/// Advice provider secrets file structure.
#[derive(Debug, Deserialize)]
struct AdviceSecrets {
    api_key: String,
    #[serde(default)]
    api_url: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let (advice_api_key, advice_api_url) = load_advice_secrets();

        Self {
            listen_addr: env_or("LISTEN_ADDR", defaults.listen_addr),
            store_backend: std::env::var("STORE_BACKEND")
                .ok()
                .and_then(|s| match s.parse() {
                    Ok(backend) => Some(backend),
                    Err(e) => {
                        tracing::warn!(error = %e, "Ignoring STORE_BACKEND");
                        None
                    }
                })
                .unwrap_or(defaults.store_backend),
            database_url: std::env::var("DATABASE_URL").ok(),
            data_dir: env_or("DATA_DIR", defaults.data_dir),
            telegram_bot_token: load_telegram_bot_token(),
            init_data_max_age_seconds: env_parse(
                "INIT_DATA_MAX_AGE_SECONDS",
                defaults.init_data_max_age_seconds,
            ),
            admin_seed_external_ids: std::env::var("ADMIN_SEED_EXTERNAL_IDS")
                .map(|s| parse_external_ids(&s))
                .unwrap_or_default(),
            premium_payment_url: std::env::var("PREMIUM_PAYMENT_URL").ok(),
            advice_api_url: advice_api_url
                .or_else(|| std::env::var("ADVICE_API_URL").ok())
                .unwrap_or(defaults.advice_api_url),
            advice_api_key,
            advice_model: env_or("ADVICE_MODEL", defaults.advice_model),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_parse("MAX_BODY_BYTES", defaults.max_body_bytes),
            request_timeout_seconds: env_parse(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            ),
        }
    }
}

fn env_or(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Parse a comma separated id list, skipping (and logging) bad entries.
fn parse_external_ids(list: &str) -> Vec<ExternalId> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse() {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(value = %s, error = %e, "Skipping admin seed id");
                None
            }
        })
        .collect()
}

/// Load the Telegram bot token from file or environment.
fn load_telegram_bot_token() -> Option<String> {
    let secret_paths = [
        ".secrets/telegram.json",
        "animal-family/.secrets/telegram.json",
        "../.secrets/telegram.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<TelegramSecrets>(path) {
            tracing::info!(path = %path, "Loaded Telegram secrets from file");
            return Some(secrets.bot_token);
        }
    }

    tracing::debug!("Telegram secrets file not found, using environment variables");
    std::env::var("TELEGRAM_BOT_TOKEN").ok()
}

/// Load advice provider secrets from file or environment.
fn load_advice_secrets() -> (Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/advice.json",
        "animal-family/.secrets/advice.json",
        "../.secrets/advice.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<AdviceSecrets>(path) {
            tracing::info!(path = %path, "Loaded advice provider secrets from file");
            return (Some(secrets.api_key), secrets.api_url);
        }
    }

    tracing::debug!("Advice secrets file not found, using environment variables");
    (std::env::var("ADVICE_API_KEY").ok(), None)
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            store_backend: StoreBackend::Postgres,
            database_url: None,
            data_dir: "/data/animal-family".into(),
            telegram_bot_token: None,
            init_data_max_age_seconds: 86_400,
            admin_seed_external_ids: Vec::new(),
            premium_payment_url: None,
            advice_api_url: DEFAULT_ADVICE_API_URL.into(),
            advice_api_key: None,
            advice_model: DEFAULT_ADVICE_MODEL.into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
