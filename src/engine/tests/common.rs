use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;

use crate::engine::catalog::{templates, Product, ProductConfig, ProductStatus, ProductVersion};
use crate::engine::domain::ClaimInput;
use crate::engine::pipeline::DecisionEngine;
use crate::engine::repository::{InMemoryProductRepository, ProductRepository};
use crate::engine::service::DecisionService;

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn demo_repository() -> Arc<InMemoryProductRepository> {
    Arc::new(InMemoryProductRepository::with_demo_catalog())
}

pub(super) fn demo_engine() -> DecisionEngine<InMemoryProductRepository> {
    DecisionEngine::new(demo_repository())
}

pub(super) fn demo_service() -> DecisionService<InMemoryProductRepository> {
    DecisionService::new(demo_repository(), "test-auditor")
}

/// Claim against the demo catalog with a same-day claim date so the
/// eligibility window never depends on the test run's wall clock.
pub(super) fn claim(flight_no: &str, flight_date: NaiveDate, version: &str) -> ClaimInput {
    ClaimInput {
        booking_ref: "BK-12345".to_string(),
        flight_no: flight_no.to_string(),
        flight_date,
        passenger_token: "pax-test".to_string(),
        product_id: "prod-eu-delay".to_string(),
        product_version: version.to_string(),
        claim_date: Some(flight_date),
    }
}

pub(super) fn scenario_a() -> ClaimInput {
    claim("BA123", date(2024, 12, 20), "v1.2")
}

/// Single-version product built from one of the catalog templates, for
/// scenarios the demo catalog does not cover.
pub(super) fn product_from(id: &str, config: ProductConfig) -> Product {
    let created = chrono::Utc::now();
    Product {
        id: id.to_string(),
        name: format!("Test product {id}"),
        description: "Product minted for tests".to_string(),
        status: ProductStatus::Active,
        active_version: "v1.0".to_string(),
        versions: vec![ProductVersion::new("v1.0", config, created, Some(created))],
        created_at: created,
        updated_at: created,
    }
}

pub(super) fn repository_with(product: Product) -> Arc<InMemoryProductRepository> {
    let repository = demo_repository();
    repository.upsert_product(product).expect("upsert succeeds");
    repository
}

pub(super) fn budget_product(id: &str) -> Product {
    product_from(id, templates::budget_config())
}

pub(super) async fn read_json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
