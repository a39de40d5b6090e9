use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use claimflow::engine::{claims_router, DecisionService, InMemoryProductRepository};

fn app() -> Router {
    let repository = Arc::new(InMemoryProductRepository::with_demo_catalog());
    claims_router(Arc::new(DecisionService::new(repository, "claims-operator")))
}

fn post_json(uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request builds")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json payload")
}

fn claim_payload(flight_no: &str, flight_date: &str) -> Value {
    json!({
        "bookingRef": "BK-2024-001",
        "flightNo": flight_no,
        "flightDate": flight_date,
        "passengerToken": "pax-e2e",
        "productId": "prod-eu-delay",
        "productVersion": "v1.2",
        "claimDate": flight_date,
    })
}

#[tokio::test]
async fn delayed_flight_claim_is_approved_with_a_full_trace() {
    let response = app()
        .oneshot(post_json(
            "/api/v1/claims/decision",
            claim_payload("BA123", "2024-12-20"),
        ))
        .await
        .expect("handler responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["success"], json!(true));
    assert_eq!(body["decision"]["outcome"], json!("approved"));
    assert_eq!(body["decision"]["payoutAmountUSD"], json!(175));
    assert_eq!(
        body["decision"]["reasonCodes"],
        json!(["APPROVED_TIER_2"])
    );

    let trace = body["trace"].as_array().expect("trace array");
    assert_eq!(trace.len(), 6);
    assert_eq!(trace[0]["rule"], json!("PRODUCT_VALIDATION"));
    assert_eq!(trace[5]["rule"], json!("FINAL_DECISION"));
    assert!(trace.iter().all(|step| step["result"] == json!("pass")));
}

#[tokio::test]
async fn excluded_delay_reason_is_denied_with_a_short_trace() {
    let response = app()
        .oneshot(post_json(
            "/api/v1/claims/decision",
            claim_payload("DL300", "2024-12-19"),
        ))
        .await
        .expect("handler responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["decision"]["outcome"], json!("denied"));
    assert_eq!(body["decision"]["payoutAmountUSD"], json!(0));
    assert_eq!(body["decision"]["reasonCodes"], json!(["DENIED_EXCLUSION"]));

    let trace = body["trace"].as_array().expect("trace array");
    assert_eq!(trace.len(), 4);
    assert_eq!(trace[3]["rule"], json!("EXCLUSION_CHECK"));
    assert_eq!(trace[3]["result"], json!("fail"));
}

#[tokio::test]
async fn audit_export_carries_the_complete_claim_context() {
    let response = app()
        .oneshot(post_json(
            "/api/v1/claims/decision/audit",
            claim_payload("LH456", "2024-12-20"),
        ))
        .await
        .expect("handler responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["exportedBy"], json!("claims-operator"));
    assert_eq!(body["decision"]["outcome"], json!("approved"));
    assert_eq!(body["decision"]["payoutAmountUSD"], json!(350));
    assert_eq!(body["decision"]["claimInput"]["flightNo"], json!("LH456"));
    assert_eq!(body["decision"]["flightData"]["delayMinutes"], json!(390));
    assert_eq!(
        body["decision"]["productHash"].as_str().map(str::len),
        Some(16)
    );
}

#[tokio::test]
async fn impact_endpoint_quantifies_a_catalog_version_bump() {
    let response = app()
        .oneshot(post_json(
            "/api/v1/products/prod-eu-delay/impact",
            json!({ "fromVersion": "v1.1", "toVersion": "v1.2" }),
        ))
        .await
        .expect("handler responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["totalCases"], json!(9));
    assert_eq!(body["affected"], json!(4));
    assert_eq!(body["unaffected"], json!(5));
    assert_eq!(body["payoutDeltaUsd"], json!(450));
}
