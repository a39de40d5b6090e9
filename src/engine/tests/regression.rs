use crate::engine::domain::DecisionOutcome;
use crate::engine::regression::{compare_versions, run_pack, standard_pack};

use super::common;

#[test]
fn standard_pack_covers_tiers_exclusions_and_denials() {
    let pack = standard_pack();
    assert_eq!(pack.test_cases.len(), 9);
    assert!(pack
        .test_cases
        .iter()
        .any(|case| case.expected_outcome == DecisionOutcome::Denied));
    assert!(pack
        .test_cases
        .iter()
        .all(|case| case.claim_input.claim_date.is_some()));
}

#[test]
fn pack_passes_cleanly_against_its_target_version() {
    let engine = common::demo_engine();
    let summary =
        run_pack(&engine, &standard_pack(), "prod-eu-delay", "v1.2").expect("pack runs");

    assert_eq!(summary.product_id, "prod-eu-delay");
    assert_eq!(summary.product_version, "v1.2");
    assert_eq!(summary.total_tests, 9);
    assert_eq!(summary.passed, 9);
    assert_eq!(summary.failed, 0);
    assert!(summary.results.iter().all(|r| r.diff.is_none()));
}

#[test]
fn pack_detects_drift_against_an_older_version() {
    let engine = common::demo_engine();
    let summary =
        run_pack(&engine, &standard_pack(), "prod-eu-delay", "v1.0").expect("pack runs");

    // v1.0 pays the standard-template amounts and still excludes crew
    // strikes, so every approval expectation drifts.
    assert_eq!(summary.passed, 3);
    assert_eq!(summary.failed, 6);

    let tier2 = summary
        .results
        .iter()
        .find(|r| r.test_case.id == "test-tier2-approve")
        .expect("tier 2 case present");
    assert!(!tier2.passed);
    assert_eq!(tier2.actual_payout, 100);
    assert_eq!(
        tier2.diff.as_deref(),
        Some("payout: expected $175, got $100")
    );

    let crew = summary
        .results
        .iter()
        .find(|r| r.test_case.id == "test-crew-strike")
        .expect("crew strike case present");
    assert_eq!(crew.actual_outcome, DecisionOutcome::Denied);
    assert_eq!(crew.actual_payout, 0);
}

#[test]
fn impact_report_quantifies_a_version_bump() {
    let engine = common::demo_engine();
    let report = compare_versions(&engine, &standard_pack(), "prod-eu-delay", "v1.1", "v1.2")
        .expect("comparison runs");

    assert_eq!(report.total_cases, 9);
    assert_eq!(report.affected, 4);
    assert_eq!(report.unaffected, 5);
    assert_eq!(report.flipped_to_approved, 1);
    assert_eq!(report.flipped_to_denied, 0);
    assert_eq!(report.payout_delta_usd, 450);

    let crew = report
        .cases
        .iter()
        .find(|case| case.case_id == "test-crew-strike")
        .expect("crew strike case present");
    assert!(crew.affected);
    assert_eq!(crew.from_outcome, DecisionOutcome::Denied);
    assert_eq!(crew.from_payout, 0);
    assert_eq!(crew.to_outcome, DecisionOutcome::Approved);
    assert_eq!(crew.to_payout, 350);
}

#[test]
fn comparing_a_version_with_itself_reports_no_impact() {
    let engine = common::demo_engine();
    let report = compare_versions(&engine, &standard_pack(), "prod-eu-delay", "v1.2", "v1.2")
        .expect("comparison runs");

    assert_eq!(report.affected, 0);
    assert_eq!(report.unaffected, 9);
    assert_eq!(report.flipped_to_approved, 0);
    assert_eq!(report.flipped_to_denied, 0);
    assert_eq!(report.payout_delta_usd, 0);
    assert!(report.cases.iter().all(|case| !case.affected));
}
