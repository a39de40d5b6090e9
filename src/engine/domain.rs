use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Pre-validated claim submission consumed by the decision engine.
///
/// Field-shape validation (flight number format, date format, version
/// format) happens at the API boundary; the engine never sees a malformed
/// claim and never mutates one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimInput {
    pub booking_ref: String,
    pub flight_no: String,
    pub flight_date: NaiveDate,
    pub passenger_token: String,
    pub product_id: String,
    pub product_version: String,
    /// Claim submission date; eligibility falls back to "now" when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_date: Option<NaiveDate>,
}

impl ClaimInput {
    /// Timestamp used for the eligibility-window check. An explicit claim
    /// date anchors to midnight UTC so replays stay deterministic.
    pub fn claim_timestamp(&self) -> DateTime<Utc> {
        match self.claim_date {
            Some(date) => DateTime::from_naive_utc_and_offset(
                date.and_hms_opt(0, 0, 0).unwrap_or_default(),
                Utc,
            ),
            None => Utc::now(),
        }
    }
}

/// Categorized cause of a flight delay or cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayReason {
    Weather,
    Carrier,
    CrewStrike,
    ForceMajeure,
    Operational,
    None,
}

impl DelayReason {
    pub const fn label(self) -> &'static str {
        match self {
            DelayReason::Weather => "weather",
            DelayReason::Carrier => "carrier",
            DelayReason::CrewStrike => "crew_strike",
            DelayReason::ForceMajeure => "force_majeure",
            DelayReason::Operational => "operational",
            DelayReason::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightStatus {
    OnTime,
    Delayed,
    Cancelled,
}

impl FlightStatus {
    pub const fn label(self) -> &'static str {
        match self {
            FlightStatus::OnTime => "on_time",
            FlightStatus::Delayed => "delayed",
            FlightStatus::Cancelled => "cancelled",
        }
    }
}

/// Derived flight-delay state for one `(flight_no, flight_date)` pair.
///
/// Pure value, never persisted by the core: identical inputs always yield
/// an identical state regardless of wall-clock time or process restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightState {
    pub flight_no: String,
    pub flight_date: NaiveDate,
    pub scheduled_arrival: DateTime<Utc>,
    pub actual_arrival: Option<DateTime<Utc>>,
    pub delay_minutes: u32,
    pub delay_reason: DelayReason,
    pub status: FlightStatus,
}

impl FlightState {
    /// Zeroed substitute attached to decisions that short-circuited before
    /// any flight data was fetched.
    pub fn neutral(flight_no: &str, flight_date: NaiveDate) -> Self {
        let midnight = DateTime::from_naive_utc_and_offset(
            flight_date.and_hms_opt(0, 0, 0).unwrap_or_default(),
            Utc,
        );
        Self {
            flight_no: flight_no.to_string(),
            flight_date,
            scheduled_arrival: midnight,
            actual_arrival: None,
            delay_minutes: 0,
            delay_reason: DelayReason::None,
            status: FlightStatus::OnTime,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    Approved,
    Denied,
}

impl DecisionOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            DecisionOutcome::Approved => "approved",
            DecisionOutcome::Denied => "denied",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceResult {
    Pass,
    Fail,
    Skip,
}

/// One recorded stage of rule evaluation. Append-only: steps are never
/// reordered or removed once recorded, and order is evaluation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceStep {
    pub id: String,
    pub rule: RuleStage,
    pub description: String,
    pub input: BTreeMap<String, serde_json::Value>,
    pub result: TraceResult,
    pub explanation: String,
}

/// The six pipeline stages, in fixed evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleStage {
    ProductValidation,
    FlightDataFetch,
    EligibilityWindow,
    ExclusionCheck,
    PayoutTierMatch,
    FinalDecision,
}

impl RuleStage {
    pub const fn description(self) -> &'static str {
        match self {
            RuleStage::ProductValidation => "Verify product exists and is active",
            RuleStage::FlightDataFetch => "Retrieve flight status from data source",
            RuleStage::EligibilityWindow => "Check if claim is within eligible time window",
            RuleStage::ExclusionCheck => "Check if delay reason triggers an exclusion",
            RuleStage::PayoutTierMatch => "Match delay duration to payout tier",
            RuleStage::FinalDecision => "Generate final claim decision",
        }
    }
}

/// Fully assembled claim decision. Immutable once built; the product hash
/// binds it to the exact configuration content used, independent of any
/// later edits to that product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub id: String,
    pub outcome: DecisionOutcome,
    #[serde(rename = "payoutAmountUSD")]
    pub payout_amount_usd: u32,
    pub reason_codes: Vec<String>,
    pub trace: Vec<TraceStep>,
    pub product_version: String,
    pub product_hash: String,
    pub timestamp: DateTime<Utc>,
    pub claim_input: ClaimInput,
    pub flight_data: FlightState,
}

/// Self-contained export of a decision for dispute resolution. Re-running
/// the same claim against the same product hash reproduces every field
/// except `id` and `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditArtifact {
    pub decision: Decision,
    pub exported_at: DateTime<Utc>,
    pub exported_by: String,
}
