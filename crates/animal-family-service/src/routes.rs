//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, put};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, admin, advice, business, health, listings, passports, settings};
use crate::state::AppState;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Maximum concurrent advice requests. Each one holds a provider call open.
const ADVICE_MAX_CONCURRENT_REQUESTS: usize = 8;

/// Create the service router with all routes and middleware.
///
/// Every `/v1` route accepts an optional `Authorization: tma <initData>`
/// header; without it the caller is a guest.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /v1/settings` - Banner and chat link
/// - `GET /v1/premium` - Payment link and instructions
/// - `GET /v1/accounts/:account_id` - Public profile
/// - `GET /v1/business/:account_id` - Business page
/// - `GET /v1/listings` - Approved feed
/// - `GET /v1/listings/:id` - Listing (if visible to the caller)
/// - `GET /v1/passports/:id` - Pet passport
///
/// ## Session
/// - `POST /v1/session` - Upsert the caller and return entitlements
/// - `GET /v1/me` - Caller account and entitlements
/// - `PUT /v1/me/profile` - Update own profile
///
/// ## Members
/// - `POST /v1/listings`, `GET /v1/listings/mine`
/// - `POST /v1/business-requests`
/// - `POST /v1/passports`, `GET /v1/passports`, `PUT /v1/passports/:id`
/// - `POST /v1/advice` - Premium only
///
/// ## Admin
/// - `GET /v1/admin/listings`, `POST /v1/admin/listings/:id/decision`
/// - `GET /v1/admin/business-requests`, `POST /v1/admin/business-requests/:id/decision`
/// - `POST /v1/admin/accounts/:external_id/premium`
/// - `GET /v1/admin/passports`, `POST /v1/admin/passports/:id/verification`
/// - `PUT /v1/admin/settings/banner`, `PUT /v1/admin/settings/chat-link`
pub fn create_router(state: AppState) -> Router {
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let advice_routes = Router::new()
        .route("/", post(advice::ask))
        .layer(ConcurrencyLimitLayer::new(ADVICE_MAX_CONCURRENT_REQUESTS));

    let admin_routes = Router::new()
        .route("/listings", get(admin::listing_queue))
        .route("/listings/:id/decision", post(admin::decide_listing))
        .route("/business-requests", get(admin::business_requests))
        .route(
            "/business-requests/:id/decision",
            post(admin::decide_business_request),
        )
        .route("/accounts/:external_id/premium", post(admin::set_premium))
        .route("/passports", get(admin::passports))
        .route("/passports/:id/verification", post(admin::set_verification))
        .route("/settings/banner", put(admin::put_banner))
        .route("/settings/chat-link", put(admin::put_chat_link));

    let api_routes = Router::new()
        // Session and profiles
        .route("/session", post(accounts::open_session))
        .route("/me", get(accounts::me))
        .route("/me/profile", put(accounts::update_profile))
        .route("/accounts/:account_id", get(accounts::public_profile))
        .route("/business/:account_id", get(accounts::business_page))
        .route("/premium", get(accounts::premium_info))
        // Listings
        .route("/listings", post(listings::submit).get(listings::feed))
        .route("/listings/mine", get(listings::mine))
        .route("/listings/:id", get(listings::get_listing))
        // Business
        .route("/business-requests", post(business::file_request))
        // Passports
        .route(
            "/passports",
            post(passports::create_passport).get(passports::my_passports),
        )
        .route(
            "/passports/:id",
            get(passports::get_passport).put(passports::edit_passport),
        )
        // Settings
        .route("/settings", get(settings::get_settings))
        .nest("/advice", advice_routes)
        .nest("/admin", admin_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let cors = if origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };
    cors.allow_methods(Any).allow_headers(Any)
}
