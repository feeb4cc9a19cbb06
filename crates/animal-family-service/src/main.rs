//! Animal Family Service - HTTP API for the pet marketplace mini-app.
//!
//! This is the main entry point for the animal-family service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use animal_family_service::config::StoreBackend;
use animal_family_service::workflows::accounts::seed_admins;
use animal_family_service::{create_router, AppState, ServiceConfig};
use animal_family_store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,animal_family=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Animal Family Service");

    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        store_backend = ?config.store_backend,
        telegram_configured = %config.telegram_bot_token.is_some(),
        advice_configured = %config.advice_api_key.is_some(),
        admin_seeds = config.admin_seed_external_ids.len(),
        "Service configuration loaded"
    );

    let store = open_store(&config).await?;
    seed_admins(store.as_ref(), &config.admin_seed_external_ids).await?;

    let state = AppState::new(store, config.clone());

    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or("DATABASE_URL is required for the postgres backend")?;
            tracing::info!("Connecting to PostgreSQL");
            let store = PgStore::connect(url).await?;
            store.migrate().await?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "rocksdb-backend")]
        StoreBackend::Rocksdb => {
            tracing::info!(path = %config.data_dir, "Opening RocksDB store");
            Ok(Arc::new(animal_family_store::RocksStore::open(
                &config.data_dir,
            )?))
        }
        #[cfg(not(feature = "rocksdb-backend"))]
        StoreBackend::Rocksdb => {
            Err("the rocksdb backend needs the `rocksdb-backend` feature".into())
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store - data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
