use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::catalog::templates;
use super::domain::{ClaimInput, Decision, DecisionOutcome, RuleStage, TraceResult};
use super::repository::ProductRepository;
use super::service::DecisionService;

/// Router builder exposing the decisioning and catalog endpoints.
pub fn claims_router<R>(service: Arc<DecisionService<R>>) -> Router
where
    R: ProductRepository + 'static,
{
    Router::new()
        .route("/api/v1/claims/decision", post(decision_handler::<R>))
        .route(
            "/api/v1/claims/decision/audit",
            post(audit_handler::<R>),
        )
        .route("/api/v1/products", get(products_handler::<R>))
        .route("/api/v1/products/templates", get(templates_handler))
        .route("/api/v1/products/:product_id", get(product_handler::<R>))
        .route(
            "/api/v1/products/:product_id/impact",
            post(impact_handler::<R>),
        )
        .route(
            "/api/v1/products/:product_id/regression",
            post(regression_handler::<R>),
        )
        .with_state(service)
}

/// Loosely-typed request body; every field is checked here so the engine
/// only ever receives a pre-validated, strongly-typed [`ClaimInput`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    #[serde(default)]
    pub booking_ref: Option<String>,
    #[serde(default)]
    pub flight_no: Option<String>,
    #[serde(default)]
    pub flight_date: Option<String>,
    #[serde(default)]
    pub passenger_token: Option<String>,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub product_version: Option<String>,
    #[serde(default)]
    pub claim_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<DecisionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_data: Option<FlightView>,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionView {
    pub id: String,
    pub outcome: DecisionOutcome,
    #[serde(rename = "payoutAmountUSD")]
    pub payout_amount_usd: u32,
    pub reason_codes: Vec<String>,
    pub product_version: String,
    pub product_hash: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceView {
    pub id: String,
    pub rule: RuleStage,
    pub description: String,
    pub result: TraceResult,
    pub explanation: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightView {
    pub flight_no: String,
    pub status: String,
    pub delay_minutes: u32,
    pub delay_reason: String,
}

impl DecisionResponse {
    fn from_decision(decision: &Decision, started: Instant) -> Self {
        Self {
            success: true,
            decision: Some(DecisionView {
                id: decision.id.clone(),
                outcome: decision.outcome,
                payout_amount_usd: decision.payout_amount_usd,
                reason_codes: decision.reason_codes.clone(),
                product_version: decision.product_version.clone(),
                product_hash: decision.product_hash.clone(),
                timestamp: decision.timestamp.to_rfc3339(),
            }),
            trace: Some(
                decision
                    .trace
                    .iter()
                    .map(|step| TraceView {
                        id: step.id.clone(),
                        rule: step.rule,
                        description: step.description.clone(),
                        result: step.result,
                        explanation: step.explanation.clone(),
                    })
                    .collect(),
            ),
            flight_data: Some(FlightView {
                flight_no: decision.flight_data.flight_no.clone(),
                status: decision.flight_data.status.label().to_string(),
                delay_minutes: decision.flight_data.delay_minutes,
                delay_reason: decision.flight_data.delay_reason.label().to_string(),
            }),
            processing_time_ms: elapsed_ms(started),
            error: None,
            error_code: None,
        }
    }

    fn rejected(rejection: RequestRejection, started: Instant) -> Self {
        Self {
            success: false,
            decision: None,
            trace: None,
            flight_data: None,
            processing_time_ms: elapsed_ms(started),
            error: Some(rejection.error),
            error_code: Some(rejection.code.to_string()),
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[derive(Debug)]
pub(crate) struct RequestRejection {
    pub error: String,
    pub code: &'static str,
}

impl RequestRejection {
    fn new(error: impl Into<String>, code: &'static str) -> Self {
        Self {
            error: error.into(),
            code,
        }
    }
}

fn required<'a>(
    value: &'a Option<String>,
    field: &str,
) -> Result<&'a str, RequestRejection> {
    match value.as_deref() {
        Some(raw) if !raw.is_empty() => Ok(raw),
        _ => Err(RequestRejection::new(
            format!("Missing or invalid required field: {field}"),
            "MISSING_FIELD",
        )),
    }
}

/// 2-3 letter carrier code followed by 1-4 digits, e.g. BA123.
fn valid_flight_no(value: &str) -> bool {
    let letters = value
        .chars()
        .take_while(|c| c.is_ascii_uppercase())
        .count();
    if !(2..=3).contains(&letters) {
        return false;
    }
    let digits = &value[letters..];
    (1..=4).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

/// `vMAJOR[.MINOR[...]]`, e.g. v1.0 or v1.2.3.
fn valid_version(value: &str) -> bool {
    match value.strip_prefix('v') {
        Some(rest) => {
            !rest.is_empty()
                && rest
                    .split('.')
                    .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
        }
        None => false,
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

pub(crate) fn validate_request(
    request: &DecisionRequest,
) -> Result<ClaimInput, RequestRejection> {
    let booking_ref = required(&request.booking_ref, "bookingRef")?;
    let flight_no = required(&request.flight_no, "flightNo")?;
    let flight_date_raw = required(&request.flight_date, "flightDate")?;
    let passenger_token = required(&request.passenger_token, "passengerToken")?;
    let product_id = required(&request.product_id, "productId")?;
    let product_version = required(&request.product_version, "productVersion")?;

    if !(2..=20).contains(&booking_ref.len()) {
        return Err(RequestRejection::new(
            "bookingRef must be 2-20 characters",
            "INVALID_BOOKING_REF",
        ));
    }

    if !valid_flight_no(flight_no) {
        return Err(RequestRejection::new(
            "flightNo must be 2-3 letter carrier code + 1-4 digit number (e.g., BA123)",
            "INVALID_FLIGHT_NO",
        ));
    }

    let flight_date = parse_date(flight_date_raw).ok_or_else(|| {
        RequestRejection::new(
            "flightDate must be a valid date in YYYY-MM-DD format",
            "INVALID_DATE_FORMAT",
        )
    })?;

    // Historical dates are fine; reject only far-future flights.
    let today = Utc::now().date_naive();
    if flight_date > today + Duration::days(366) {
        return Err(RequestRejection::new(
            "flightDate cannot be more than 1 year in the future",
            "FUTURE_DATE",
        ));
    }

    if !valid_version(product_version) {
        return Err(RequestRejection::new(
            "productVersion must be in format vX.Y (e.g., v1.0, v1.2)",
            "INVALID_VERSION_FORMAT",
        ));
    }

    let claim_date = match request.claim_date.as_deref() {
        Some(raw) => Some(parse_date(raw).ok_or_else(|| {
            RequestRejection::new(
                "claimDate must be a valid date in YYYY-MM-DD format",
                "INVALID_CLAIM_DATE_FORMAT",
            )
        })?),
        None => None,
    };

    Ok(ClaimInput {
        booking_ref: booking_ref.to_string(),
        flight_no: flight_no.to_string(),
        flight_date,
        passenger_token: passenger_token.to_string(),
        product_id: product_id.to_string(),
        product_version: product_version.to_string(),
        claim_date,
    })
}

pub(crate) async fn decision_handler<R>(
    State(service): State<Arc<DecisionService<R>>>,
    axum::Json(request): axum::Json<DecisionRequest>,
) -> Response
where
    R: ProductRepository + 'static,
{
    let started = Instant::now();

    let claim = match validate_request(&request) {
        Ok(claim) => claim,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                axum::Json(DecisionResponse::rejected(rejection, started)),
            )
                .into_response();
        }
    };

    match service.decide(&claim) {
        Ok(decision) => (
            StatusCode::OK,
            axum::Json(DecisionResponse::from_decision(&decision, started)),
        )
            .into_response(),
        Err(err) => engine_fault(err),
    }
}

pub(crate) async fn audit_handler<R>(
    State(service): State<Arc<DecisionService<R>>>,
    axum::Json(request): axum::Json<DecisionRequest>,
) -> Response
where
    R: ProductRepository + 'static,
{
    let started = Instant::now();

    let claim = match validate_request(&request) {
        Ok(claim) => claim,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                axum::Json(DecisionResponse::rejected(rejection, started)),
            )
                .into_response();
        }
    };

    match service.decide_with_audit(&claim) {
        Ok(artifact) => (StatusCode::OK, axum::Json(artifact)).into_response(),
        Err(err) => engine_fault(err),
    }
}

pub(crate) async fn products_handler<R>(
    State(service): State<Arc<DecisionService<R>>>,
) -> Response
where
    R: ProductRepository + 'static,
{
    match service.products() {
        Ok(products) => (StatusCode::OK, axum::Json(products)).into_response(),
        Err(err) => engine_fault(err.into()),
    }
}

pub(crate) async fn templates_handler() -> Response {
    (StatusCode::OK, axum::Json(templates::all())).into_response()
}

pub(crate) async fn product_handler<R>(
    State(service): State<Arc<DecisionService<R>>>,
    Path(product_id): Path<String>,
) -> Response
where
    R: ProductRepository + 'static,
{
    match service.product(&product_id) {
        Ok(Some(product)) => (StatusCode::OK, axum::Json(product)).into_response(),
        Ok(None) => {
            let payload = json!({ "error": format!("product {product_id} not found") });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(err) => engine_fault(err.into()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactRequest {
    pub from_version: String,
    pub to_version: String,
}

pub(crate) async fn impact_handler<R>(
    State(service): State<Arc<DecisionService<R>>>,
    Path(product_id): Path<String>,
    axum::Json(request): axum::Json<ImpactRequest>,
) -> Response
where
    R: ProductRepository + 'static,
{
    match service.impact(&product_id, &request.from_version, &request.to_version) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => engine_fault(err),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionRequest {
    pub version: String,
}

pub(crate) async fn regression_handler<R>(
    State(service): State<Arc<DecisionService<R>>>,
    Path(product_id): Path<String>,
    axum::Json(request): axum::Json<RegressionRequest>,
) -> Response
where
    R: ProductRepository + 'static,
{
    match service.regression_run(&product_id, &request.version) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(err) => engine_fault(err),
    }
}

fn engine_fault(err: super::pipeline::EngineError) -> Response {
    let payload = json!({ "error": err.to_string() });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
