//! Common test utilities for animal-family integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use axum_test::TestServer;
use chrono::Utc;
use serde_json::{json, Value};

use animal_family_core::ExternalId;
use animal_family_service::config::{StoreBackend, DEFAULT_ADVICE_MODEL};
use animal_family_service::init_data;
use animal_family_service::workflows::accounts::seed_admins;
use animal_family_service::{create_router, AppState, ServiceConfig};
use animal_family_store::MemoryStore;

/// Bot token the harness signs init data with.
pub const BOT_TOKEN: &str = "123456:test-bot-token";

/// Platform id seeded as admin.
pub const ADMIN_ID: i64 = 1_046_439_138;

/// Payment page returned with premium denials.
pub const PAYMENT_URL: &str = "https://pay.example/premium";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The backing store, for failure injection.
    pub store: Arc<MemoryStore>,
}

impl TestHarness {
    /// Create a new test harness with a fresh store and no advice provider.
    pub async fn new() -> Self {
        Self::with_advice(None).await
    }

    /// Create a harness whose advice provider lives at `advice_url`.
    pub async fn with_advice(advice_url: Option<String>) -> Self {
        let store = Arc::new(MemoryStore::new());

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            store_backend: StoreBackend::Memory,
            database_url: None,
            data_dir: String::new(),
            telegram_bot_token: Some(BOT_TOKEN.into()),
            init_data_max_age_seconds: 86_400,
            admin_seed_external_ids: vec![ExternalId::new(ADMIN_ID).unwrap()],
            premium_payment_url: Some(PAYMENT_URL.into()),
            advice_api_key: advice_url.as_ref().map(|_| "test-key".to_string()),
            advice_api_url: advice_url.unwrap_or_else(|| "http://localhost:9".into()),
            advice_model: DEFAULT_ADVICE_MODEL.into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        };

        seed_admins(store.as_ref(), &config.admin_seed_external_ids)
            .await
            .expect("Failed to seed admins");

        let state = AppState::new(store.clone(), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self { server, store }
    }

    /// Authorization header for the platform user `external_id`.
    pub fn auth(external_id: i64) -> HeaderValue {
        let user = json!({
            "id": external_id,
            "first_name": format!("User {external_id}"),
            "username": format!("user{external_id}"),
        })
        .to_string();
        let auth_date = Utc::now().timestamp().to_string();
        let raw = init_data::sign(
            &[
                ("auth_date", auth_date.as_str()),
                ("query_id", "AAHdF6IQAAAAAN0XohDhrOrc"),
                ("user", user.as_str()),
            ],
            BOT_TOKEN,
        );
        HeaderValue::from_str(&format!("tma {raw}")).unwrap()
    }

    /// Authorization header for the seeded admin.
    pub fn admin() -> HeaderValue {
        Self::auth(ADMIN_ID)
    }

    /// Open a session for `external_id` and return the body.
    pub async fn sign_in(&self, external_id: i64) -> Value {
        let response = self
            .server
            .post("/v1/session")
            .add_header(axum::http::header::AUTHORIZATION, Self::auth(external_id))
            .await;
        response.assert_status_ok();
        response.json()
    }

    /// Confirm premium for `external_id` as the admin.
    pub async fn grant_premium(&self, external_id: i64) {
        self.sign_in(external_id).await;
        self.server
            .post(&format!("/v1/admin/accounts/{external_id}/premium"))
            .add_header(axum::http::header::AUTHORIZATION, Self::admin())
            .json(&json!({ "is_premium": true }))
            .await
            .assert_status_ok();
    }

    /// Submit a listing as `external_id` and return its id.
    pub async fn submit_listing(&self, external_id: i64, category: &str, title: &str) -> String {
        let response = self
            .server
            .post("/v1/listings")
            .add_header(axum::http::header::AUTHORIZATION, Self::auth(external_id))
            .json(&json!({
                "category": category,
                "title": title,
                "city": "Moscow",
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let body: Value = response.json();
        body["listing_id"].as_str().unwrap().to_string()
    }
}
