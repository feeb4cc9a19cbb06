//! Listing submission, feed and moderation integration tests.

mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use common::TestHarness;
use serde_json::{json, Value};

// ============================================================================
// Submission and moderation
// ============================================================================

#[tokio::test]
async fn sale_listing_needs_premium_then_moderates_once() {
    let harness = TestHarness::new().await;
    let sale = json!({ "category": "sale", "title": "Puppies", "city": "Moscow", "price": 5000 });

    // Not premium yet: denied with the upsell link, nothing stored.
    let response = harness
        .server
        .post("/v1/listings")
        .add_header(AUTHORIZATION, TestHarness::auth(42))
        .json(&sale)
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "premium_required");
    assert_eq!(body["error"]["details"]["payment_url"], common::PAYMENT_URL);

    let mine: Value = harness
        .server
        .get("/v1/listings/mine")
        .add_header(AUTHORIZATION, TestHarness::auth(42))
        .await
        .json();
    assert_eq!(mine["listings"].as_array().unwrap().len(), 0);

    // Admin confirms the payment; the same submission now goes through.
    harness.grant_premium(42).await;
    let response = harness
        .server
        .post("/v1/listings")
        .add_header(AUTHORIZATION, TestHarness::auth(42))
        .json(&sale)
        .await;
    response.assert_status(StatusCode::CREATED);
    let listing: Value = response.json();
    assert_eq!(listing["status"], "pending");
    let listing_id = listing["listing_id"].as_str().unwrap();

    // Approve, then approve again.
    let decision = format!("/v1/admin/listings/{listing_id}/decision");
    let response = harness
        .server
        .post(&decision)
        .add_header(AUTHORIZATION, TestHarness::admin())
        .json(&json!({ "decision": "approve" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["listing"]["status"], "approved");
    assert_eq!(body["changed"], true);

    let response = harness
        .server
        .post(&decision)
        .add_header(AUTHORIZATION, TestHarness::admin())
        .json(&json!({ "decision": "approve" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["listing"]["status"], "approved");
    assert_eq!(body["changed"], false);
}

#[tokio::test]
async fn free_categories_need_no_premium() {
    let harness = TestHarness::new().await;

    for category in ["lost", "found", "adoption"] {
        harness.submit_listing(42, category, "Grey cat").await;
    }
}

#[tokio::test]
async fn guest_cannot_submit() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .post("/v1/listings")
        .json(&json!({ "category": "lost", "title": "Cat", "city": "Moscow" }))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn blank_title_is_rejected() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .post("/v1/listings")
        .add_header(AUTHORIZATION, TestHarness::auth(42))
        .json(&json!({ "category": "lost", "title": "   ", "city": "Moscow" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn opposite_decision_on_decided_listing_conflicts() {
    let harness = TestHarness::new().await;
    let listing_id = harness.submit_listing(42, "lost", "Grey cat").await;
    let decision = format!("/v1/admin/listings/{listing_id}/decision");

    harness
        .server
        .post(&decision)
        .add_header(AUTHORIZATION, TestHarness::admin())
        .json(&json!({ "decision": "reject" }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post(&decision)
        .add_header(AUTHORIZATION, TestHarness::admin())
        .json(&json!({ "decision": "approve" }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "already_decided");
}

#[tokio::test]
async fn members_cannot_moderate() {
    let harness = TestHarness::new().await;
    let listing_id = harness.submit_listing(42, "lost", "Grey cat").await;

    let response = harness
        .server
        .post(&format!("/v1/admin/listings/{listing_id}/decision"))
        .add_header(AUTHORIZATION, TestHarness::auth(42))
        .json(&json!({ "decision": "approve" }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "admin_required");
}

// ============================================================================
// Visibility
// ============================================================================

#[tokio::test]
async fn feed_shows_only_approved_listings() {
    let harness = TestHarness::new().await;
    let approved = harness.submit_listing(42, "lost", "Grey cat").await;
    harness.submit_listing(42, "found", "Black dog").await;

    harness
        .server
        .post(&format!("/v1/admin/listings/{approved}/decision"))
        .add_header(AUTHORIZATION, TestHarness::admin())
        .json(&json!({ "decision": "approve" }))
        .await
        .assert_status_ok();

    let feed: Value = harness.server.get("/v1/listings").await.json();
    let listings = feed["listings"].as_array().unwrap();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0]["listing_id"], approved.as_str());

    let queue: Value = harness
        .server
        .get("/v1/admin/listings")
        .add_header(AUTHORIZATION, TestHarness::admin())
        .await
        .json();
    assert_eq!(queue["listings"].as_array().unwrap().len(), 1);
    assert_eq!(queue["listings"][0]["title"], "Black dog");
}

#[tokio::test]
async fn feed_filters_by_category() {
    let harness = TestHarness::new().await;
    for (category, title) in [("lost", "Grey cat"), ("found", "Black dog")] {
        let id = harness.submit_listing(42, category, title).await;
        harness
            .server
            .post(&format!("/v1/admin/listings/{id}/decision"))
            .add_header(AUTHORIZATION, TestHarness::admin())
            .json(&json!({ "decision": "approve" }))
            .await
            .assert_status_ok();
    }

    let feed: Value = harness
        .server
        .get("/v1/listings")
        .add_query_param("category", "found")
        .await
        .json();

    let listings = feed["listings"].as_array().unwrap();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0]["title"], "Black dog");
}

#[tokio::test]
async fn pending_listing_is_hidden_from_others() {
    let harness = TestHarness::new().await;
    let listing_id = harness.submit_listing(42, "lost", "Grey cat").await;
    let path = format!("/v1/listings/{listing_id}");

    harness.server.get(&path).await.assert_status(StatusCode::NOT_FOUND);
    harness
        .server
        .get(&path)
        .add_header(AUTHORIZATION, TestHarness::auth(7))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    harness
        .server
        .get(&path)
        .add_header(AUTHORIZATION, TestHarness::auth(42))
        .await
        .assert_status_ok();
    harness
        .server
        .get(&path)
        .add_header(AUTHORIZATION, TestHarness::admin())
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn malformed_listing_id_is_bad_request() {
    let harness = TestHarness::new().await;

    let response = harness.server.get("/v1/listings/not-an-id").await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn own_listings_and_queue_honor_limit() {
    let harness = TestHarness::new().await;
    harness.sign_in(42).await;
    let mut ids = Vec::new();
    for title in ["First", "Second", "Third"] {
        ids.push(harness.submit_listing(42, "lost", title).await);
    }

    let mine: Value = harness
        .server
        .get("/v1/listings/mine?limit=2")
        .add_header(AUTHORIZATION, TestHarness::auth(42))
        .await
        .json();
    let mine = mine["listings"].as_array().unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0]["listing_id"], ids[2].as_str());

    let queue: Value = harness
        .server
        .get("/v1/admin/listings?status=pending&limit=1")
        .add_header(AUTHORIZATION, TestHarness::admin())
        .await
        .json();
    let queue = queue["listings"].as_array().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0]["title"], "Third");
}
