use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ClaimInput, DecisionOutcome};
use super::pipeline::{DecisionEngine, EngineError};
use super::repository::ProductRepository;

/// Named claim scenario with the outcome and payout it is expected to
/// produce under the pack's target configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionTestCase {
    pub id: String,
    pub name: String,
    pub claim_input: ClaimInput,
    pub expected_outcome: DecisionOutcome,
    pub expected_payout: u32,
}

/// Fixed corpus of claim scenarios used to detect behavioral drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionTestPack {
    pub id: String,
    pub name: String,
    pub description: String,
    pub test_cases: Vec<RegressionTestCase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionResult {
    pub test_case: RegressionTestCase,
    pub actual_outcome: DecisionOutcome,
    pub actual_payout: u32,
    pub passed: bool,
    pub diff: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionRunSummary {
    pub pack_id: String,
    pub pack_name: String,
    pub product_id: String,
    pub product_version: String,
    pub run_at: DateTime<Utc>,
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<RegressionResult>,
}

/// Per-case outcome of comparing two configuration versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseImpact {
    pub case_id: String,
    pub name: String,
    pub from_outcome: DecisionOutcome,
    pub from_payout: u32,
    pub to_outcome: DecisionOutcome,
    pub to_payout: u32,
    pub affected: bool,
}

/// Aggregate drift between two configuration versions over a fixed corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactReport {
    pub product_id: String,
    pub from_version: String,
    pub to_version: String,
    pub total_cases: usize,
    pub unaffected: usize,
    pub affected: usize,
    pub flipped_to_approved: usize,
    pub flipped_to_denied: usize,
    pub payout_delta_usd: i64,
    pub cases: Vec<CaseImpact>,
}

fn case(
    id: &str,
    name: &str,
    booking_ref: &str,
    flight_no: &str,
    date: NaiveDate,
    passenger: &str,
    expected_outcome: DecisionOutcome,
    expected_payout: u32,
) -> RegressionTestCase {
    RegressionTestCase {
        id: id.to_string(),
        name: name.to_string(),
        claim_input: ClaimInput {
            booking_ref: booking_ref.to_string(),
            flight_no: flight_no.to_string(),
            flight_date: date,
            // Same-day claims keep the eligibility check deterministic.
            claim_date: Some(date),
            passenger_token: passenger.to_string(),
            product_id: "prod-eu-delay".to_string(),
            product_version: "v1.2".to_string(),
        },
        expected_outcome,
        expected_payout,
    }
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid regression pack date")
}

/// The standard flight-delay pack: every payout tier, the exclusion
/// scenarios, and the no-payout paths. Expectations target the demo
/// catalog's `prod-eu-delay` v1.2.
pub fn standard_pack() -> RegressionTestPack {
    use DecisionOutcome::{Approved, Denied};
    RegressionTestPack {
        id: "test-pack-flight-delay".to_string(),
        name: "Flight Delay Standard".to_string(),
        description: "Covers all payout tiers and exclusion scenarios".to_string(),
        test_cases: vec![
            case("test-tier1-approve", "Tier 1 approval - 105 min delay", "TEST-T1-001", "AF101", day(2024, 12, 21), "pax-test-1", Approved, 75),
            case("test-tier2-approve", "Tier 2 approval - 150 min delay", "TEST-T2-001", "BA123", day(2024, 12, 20), "pax-test-2", Approved, 175),
            case("test-tier3-approve", "Tier 3 approval - 390 min delay", "TEST-T3-001", "LH456", day(2024, 12, 20), "pax-test-3", Approved, 350),
            case("test-tier4-approve", "Tier 4 approval - 600 min delay", "TEST-T4-001", "UA100", day(2024, 12, 18), "pax-test-4", Approved, 600),
            case("test-deny-no-delay", "Denial - on-time flight", "TEST-DENY-001", "KL500", day(2024, 12, 20), "pax-test-5", Denied, 0),
            case("test-deny-below-threshold", "Denial - 45 min delay below threshold", "TEST-DENY-002", "SK600", day(2024, 12, 20), "pax-test-6", Denied, 0),
            case("test-deny-force-majeure", "Denial - force majeure exclusion", "TEST-DENY-003", "DL300", day(2024, 12, 19), "pax-test-7", Denied, 0),
            case("test-weather-approve", "Weather delay approved - not excluded", "TEST-WEATHER-001", "AA200", day(2024, 12, 20), "pax-test-8", Approved, 175),
            case("test-crew-strike", "Crew strike approved after exclusion disabled", "TEST-CREW-001", "IB400", day(2024, 12, 18), "pax-test-9", Approved, 350),
        ],
    }
}

fn with_target(case: &RegressionTestCase, product_id: &str, version: &str) -> ClaimInput {
    let mut claim = case.claim_input.clone();
    claim.product_id = product_id.to_string();
    claim.product_version = version.to_string();
    claim
}

/// Run every case in the pack against one product version and compare
/// observed outcome and payout with the case's expectations.
pub fn run_pack<R: ProductRepository>(
    engine: &DecisionEngine<R>,
    pack: &RegressionTestPack,
    product_id: &str,
    product_version: &str,
) -> Result<RegressionRunSummary, EngineError> {
    let mut results = Vec::with_capacity(pack.test_cases.len());

    for test_case in &pack.test_cases {
        let claim = with_target(test_case, product_id, product_version);
        let decision = engine.evaluate(&claim)?;

        let mut diffs = Vec::new();
        if decision.outcome != test_case.expected_outcome {
            diffs.push(format!(
                "outcome: expected {}, got {}",
                test_case.expected_outcome.label(),
                decision.outcome.label()
            ));
        }
        if decision.payout_amount_usd != test_case.expected_payout {
            diffs.push(format!(
                "payout: expected ${}, got ${}",
                test_case.expected_payout, decision.payout_amount_usd
            ));
        }

        results.push(RegressionResult {
            test_case: test_case.clone(),
            actual_outcome: decision.outcome,
            actual_payout: decision.payout_amount_usd,
            passed: diffs.is_empty(),
            diff: if diffs.is_empty() {
                None
            } else {
                Some(diffs.join("; "))
            },
        });
    }

    let passed = results.iter().filter(|r| r.passed).count();
    Ok(RegressionRunSummary {
        pack_id: pack.id.clone(),
        pack_name: pack.name.clone(),
        product_id: product_id.to_string(),
        product_version: product_version.to_string(),
        run_at: Utc::now(),
        total_tests: results.len(),
        passed,
        failed: results.len() - passed,
        results,
    })
}

/// Quantify how moving one product from `from_version` to `to_version`
/// would alter outcomes across the pack. Each case runs through the full
/// pipeline once per version; the comparison is read-only analysis over
/// the two already-resolved configuration snapshots. Comparing a version
/// with itself always reports zero flips and zero payout delta.
pub fn compare_versions<R: ProductRepository>(
    engine: &DecisionEngine<R>,
    pack: &RegressionTestPack,
    product_id: &str,
    from_version: &str,
    to_version: &str,
) -> Result<ImpactReport, EngineError> {
    let mut cases = Vec::with_capacity(pack.test_cases.len());
    let mut flipped_to_approved = 0;
    let mut flipped_to_denied = 0;
    let mut payout_delta_usd: i64 = 0;

    for test_case in &pack.test_cases {
        let before = engine.evaluate(&with_target(test_case, product_id, from_version))?;
        let after = engine.evaluate(&with_target(test_case, product_id, to_version))?;

        let affected = before.outcome != after.outcome
            || before.payout_amount_usd != after.payout_amount_usd;
        payout_delta_usd +=
            i64::from(after.payout_amount_usd) - i64::from(before.payout_amount_usd);

        match (before.outcome, after.outcome) {
            (DecisionOutcome::Denied, DecisionOutcome::Approved) => flipped_to_approved += 1,
            (DecisionOutcome::Approved, DecisionOutcome::Denied) => flipped_to_denied += 1,
            _ => {}
        }

        cases.push(CaseImpact {
            case_id: test_case.id.clone(),
            name: test_case.name.clone(),
            from_outcome: before.outcome,
            from_payout: before.payout_amount_usd,
            to_outcome: after.outcome,
            to_payout: after.payout_amount_usd,
            affected,
        });
    }

    let affected = cases.iter().filter(|c| c.affected).count();
    Ok(ImpactReport {
        product_id: product_id.to_string(),
        from_version: from_version.to_string(),
        to_version: to_version.to_string(),
        total_cases: cases.len(),
        unaffected: cases.len() - affected,
        affected,
        flipped_to_approved,
        flipped_to_denied,
        payout_delta_usd,
        cases,
    })
}
