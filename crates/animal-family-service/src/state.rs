//! Application state.

use std::sync::Arc;

use animal_family_store::Store;

use crate::advice::AdviceClient;
use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Advice provider client (optional).
    pub advice: Option<Arc<AdviceClient>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        let advice = config.advice_api_key.as_ref().and_then(|key| {
            match AdviceClient::new(&config.advice_api_url, key, &config.advice_model) {
                Ok(client) => {
                    tracing::info!(
                        url = %config.advice_api_url,
                        model = %config.advice_model,
                        "Advice provider enabled"
                    );
                    Some(Arc::new(client))
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create advice client");
                    None
                }
            }
        });

        if advice.is_none() {
            tracing::warn!("Advice provider not configured - advice chat will be unavailable");
        }

        if config.telegram_bot_token.is_none() {
            tracing::warn!("Telegram bot token not configured - every caller is a guest");
        }

        Self {
            store,
            config,
            advice,
        }
    }

    /// Check if the advice provider is configured.
    #[must_use]
    pub fn has_advice(&self) -> bool {
        self.advice.is_some()
    }
}
