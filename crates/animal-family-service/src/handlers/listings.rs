//! Listing handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use animal_family_core::{Category, Listing, ListingDraft, ListingFilter, ListingId};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;
use crate::workflows;

/// Feed query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    /// Only listings in this city.
    pub city: Option<String>,
    /// Only listings in this category.
    pub category: Option<Category>,
    /// Page size.
    pub limit: Option<usize>,
}

/// Page-size query of the caller's own listings.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<usize>,
}

/// A page of listings.
#[derive(Debug, Serialize)]
pub struct ListingsResponse {
    /// Listings, newest first.
    pub listings: Vec<Listing>,
}

/// Submit a listing for moderation.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ApiJson(draft): ApiJson<ListingDraft>,
) -> Result<(StatusCode, Json<Listing>), ApiError> {
    let listing = workflows::listings::submit(state.store.as_ref(), &caller, &draft)
        .await
        .map_err(|e| {
            ApiError::from(e).with_payment_url(state.config.premium_payment_url.as_deref())
        })?;
    Ok((StatusCode::CREATED, Json(listing)))
}

/// The approved feed.
pub async fn feed(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<FeedQuery>,
) -> Result<Json<ListingsResponse>, ApiError> {
    let filter = ListingFilter {
        category: query.category,
        city: query.city,
        limit: query.limit,
        ..ListingFilter::feed()
    };
    let listings = workflows::listings::feed(state.store.as_ref(), filter).await?;
    Ok(Json(ListingsResponse { listings }))
}

/// The caller's own listings.
pub async fn mine(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<ListingsResponse>, ApiError> {
    let listings = workflows::listings::mine(state.store.as_ref(), &caller, query.limit).await?;
    Ok(Json(ListingsResponse { listings }))
}

/// A single listing.
pub async fn get_listing(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    ApiPath(listing_id): ApiPath<ListingId>,
) -> Result<Json<Listing>, ApiError> {
    let listing = workflows::listings::view(state.store.as_ref(), &caller, listing_id).await?;
    Ok(Json(listing))
}
