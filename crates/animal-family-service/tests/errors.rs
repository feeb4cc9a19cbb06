//! Error body shape and status mapping over HTTP.

mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use common::TestHarness;
use serde_json::{json, Value};

#[tokio::test]
async fn unauthenticated_is_401_with_code() {
    let harness = TestHarness::new().await;

    let response = harness.server.get("/v1/listings/mine").await;

    response.assert_status_unauthorized();
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "unauthenticated");
    assert!(body["error"]["message"].is_string());
}

#[tokio::test]
async fn malformed_json_is_400() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .post("/v1/passports")
        .add_header(AUTHORIZATION, TestHarness::auth(42))
        .text("{ not json")
        .content_type("application/json")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn unknown_decision_is_400() {
    let harness = TestHarness::new().await;
    let listing_id = harness.submit_listing(42, "lost", "Grey cat").await;

    let response = harness
        .server
        .post(&format!("/v1/admin/listings/{listing_id}/decision"))
        .add_header(AUTHORIZATION, TestHarness::admin())
        .json(&json!({ "decision": "maybe" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_business_request_is_already_decided() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .post("/v1/admin/business-requests/01ARZ3NDEKTSV4RRFFQ69G5FAV/decision")
        .add_header(AUTHORIZATION, TestHarness::admin())
        .json(&json!({ "decision": "approve" }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "already_decided");
}

#[tokio::test]
async fn store_outage_is_503_for_reads() {
    let harness = TestHarness::new().await;
    harness.store.set_unavailable(true);

    let response = harness.server.get("/v1/listings").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "store_unavailable");
}
