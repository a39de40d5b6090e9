use std::sync::Arc;

use crate::engine::decision::{export_audit_artifact, DecisionIdSource, UNKNOWN_HASH};
use crate::engine::domain::{
    ClaimInput, DecisionOutcome, DelayReason, FlightStatus, RuleStage, TraceResult,
};
use crate::engine::pipeline::{
    match_tier, DecisionEngine, EngineError, DENIED_EXCLUSION, DENIED_INVALID_PRODUCT,
    DENIED_INVALID_VERSION, DENIED_NO_DELAY, DENIED_OUTSIDE_WINDOW,
};
use crate::engine::resolver::resolve;

use super::common::{self, claim, date, scenario_a};

#[test]
fn approved_claim_walks_all_six_stages() {
    let engine = common::demo_engine();
    let decision = engine.evaluate(&scenario_a()).expect("evaluates");

    assert_eq!(decision.outcome, DecisionOutcome::Approved);
    assert_eq!(decision.payout_amount_usd, 175);
    assert_eq!(decision.reason_codes, vec!["APPROVED_TIER_2".to_string()]);
    assert_eq!(decision.product_version, "v1.2");
    assert_eq!(decision.product_hash.len(), 16);
    assert_eq!(decision.flight_data.delay_minutes, 150);

    let stages: Vec<_> = decision.trace.iter().map(|step| step.rule).collect();
    assert_eq!(
        stages,
        vec![
            RuleStage::ProductValidation,
            RuleStage::FlightDataFetch,
            RuleStage::EligibilityWindow,
            RuleStage::ExclusionCheck,
            RuleStage::PayoutTierMatch,
            RuleStage::FinalDecision,
        ]
    );
    assert!(decision
        .trace
        .iter()
        .all(|step| step.result == TraceResult::Pass));
    let ids: Vec<_> = decision.trace.iter().map(|step| step.id.as_str()).collect();
    assert_eq!(ids, vec!["step-1", "step-2", "step-3", "step-4", "step-5", "step-6"]);
}

#[test]
fn decision_hash_matches_the_resolved_configuration() {
    let repository = common::demo_repository();
    let engine = DecisionEngine::new(repository.clone());

    let decision = engine.evaluate(&scenario_a()).expect("evaluates");
    let resolved = resolve(repository.as_ref(), "prod-eu-delay", "v1.2").expect("resolves");
    assert_eq!(decision.product_hash, resolved.hash);
}

#[test]
fn tier_matching_is_inclusive_on_both_bounds() {
    let repository = common::demo_repository();
    let config = resolve(repository.as_ref(), "prod-eu-delay", "v1.2")
        .expect("resolves")
        .config;

    assert!(match_tier(&config, 59).is_none());
    assert_eq!(match_tier(&config, 60).map(|(i, _)| i), Some(0));
    assert_eq!(match_tier(&config, 120).map(|(i, _)| i), Some(0));
    assert_eq!(match_tier(&config, 121).map(|(i, _)| i), Some(1));
    assert_eq!(match_tier(&config, 240).map(|(i, _)| i), Some(1));
    assert_eq!(match_tier(&config, 241).map(|(i, _)| i), Some(2));
    assert_eq!(match_tier(&config, 481).map(|(i, _)| i), Some(3));
    assert_eq!(match_tier(&config, 9999).map(|(i, _)| i), Some(3));
    assert!(match_tier(&config, 10000).is_none());
}

#[test]
fn on_time_flight_is_denied_for_no_delay() {
    let engine = common::demo_engine();
    let decision = engine
        .evaluate(&claim("KL500", date(2024, 12, 20), "v1.2"))
        .expect("evaluates");

    assert_eq!(decision.outcome, DecisionOutcome::Denied);
    assert_eq!(decision.payout_amount_usd, 0);
    assert_eq!(decision.reason_codes, vec![DENIED_NO_DELAY.to_string()]);
    assert_eq!(decision.trace.len(), 5);
    assert_eq!(decision.trace[4].result, TraceResult::Fail);
}

#[test]
fn sub_threshold_delay_is_denied_for_no_delay() {
    let engine = common::demo_engine();
    let decision = engine
        .evaluate(&claim("SK600", date(2024, 12, 20), "v1.2"))
        .expect("evaluates");

    assert_eq!(decision.outcome, DecisionOutcome::Denied);
    assert_eq!(decision.reason_codes, vec![DENIED_NO_DELAY.to_string()]);
    assert_eq!(decision.flight_data.delay_minutes, 45);
}

#[test]
fn enabled_exclusion_denies_before_tier_matching() {
    let engine = common::demo_engine();
    let decision = engine
        .evaluate(&claim("DL300", date(2024, 12, 19), "v1.2"))
        .expect("evaluates");

    assert_eq!(decision.outcome, DecisionOutcome::Denied);
    assert_eq!(decision.reason_codes, vec![DENIED_EXCLUSION.to_string()]);
    assert_eq!(decision.trace.len(), 4);
    assert_eq!(decision.trace[3].rule, RuleStage::ExclusionCheck);
    assert_eq!(decision.trace[3].result, TraceResult::Fail);
    assert!(!decision
        .trace
        .iter()
        .any(|step| step.rule == RuleStage::PayoutTierMatch));
}

#[test]
fn disabling_an_exclusion_between_versions_flips_the_outcome() {
    let engine = common::demo_engine();

    let under_v11 = engine
        .evaluate(&claim("IB400", date(2024, 12, 18), "v1.1"))
        .expect("evaluates");
    assert_eq!(under_v11.outcome, DecisionOutcome::Denied);
    assert_eq!(under_v11.reason_codes, vec![DENIED_EXCLUSION.to_string()]);

    let under_v12 = engine
        .evaluate(&claim("IB400", date(2024, 12, 18), "v1.2"))
        .expect("evaluates");
    assert_eq!(under_v12.outcome, DecisionOutcome::Approved);
    assert_eq!(under_v12.payout_amount_usd, 350);
}

#[test]
fn exclusions_take_precedence_over_a_matching_tier() {
    // Budget template excludes weather; AA200's 240 minutes would otherwise
    // land in its first tier.
    let repository = common::repository_with(common::budget_product("prod-budget"));
    let engine = DecisionEngine::new(repository);

    let claim = ClaimInput {
        booking_ref: "BK-98765".to_string(),
        flight_no: "AA200".to_string(),
        flight_date: date(2024, 12, 20),
        passenger_token: "pax-test".to_string(),
        product_id: "prod-budget".to_string(),
        product_version: "v1.0".to_string(),
        claim_date: Some(date(2024, 12, 20)),
    };
    let decision = engine.evaluate(&claim).expect("evaluates");

    assert_eq!(decision.outcome, DecisionOutcome::Denied);
    assert_eq!(decision.reason_codes, vec![DENIED_EXCLUSION.to_string()]);
}

#[test]
fn cancellation_pays_the_top_tier_when_carrier_exclusion_is_off() {
    let engine = common::demo_engine();
    let decision = engine
        .evaluate(&claim("EK700", date(2024, 12, 19), "v1.2"))
        .expect("evaluates");

    assert_eq!(decision.flight_data.status, FlightStatus::Cancelled);
    assert_eq!(decision.flight_data.delay_reason, DelayReason::Carrier);
    assert_eq!(decision.outcome, DecisionOutcome::Approved);
    assert_eq!(decision.payout_amount_usd, 600);
    assert_eq!(decision.reason_codes, vec!["APPROVED_TIER_4".to_string()]);
}

#[test]
fn late_claims_are_denied_outside_the_window() {
    let engine = common::demo_engine();
    let mut late = claim("BA123", date(2024, 12, 20), "v1.2");
    late.claim_date = Some(date(2025, 1, 15));

    let decision = engine.evaluate(&late).expect("evaluates");
    assert_eq!(decision.outcome, DecisionOutcome::Denied);
    assert_eq!(decision.reason_codes, vec![DENIED_OUTSIDE_WINDOW.to_string()]);
    assert_eq!(decision.trace.len(), 3);
    assert_eq!(decision.trace[2].result, TraceResult::Fail);
}

#[test]
fn unknown_product_denies_after_a_single_stage() {
    let engine = common::demo_engine();
    let mut unknown = scenario_a();
    unknown.product_id = "prod-nope".to_string();

    let decision = engine.evaluate(&unknown).expect("evaluates");
    assert_eq!(decision.outcome, DecisionOutcome::Denied);
    assert_eq!(decision.reason_codes, vec![DENIED_INVALID_PRODUCT.to_string()]);
    assert_eq!(decision.trace.len(), 1);
    assert_eq!(decision.product_hash, UNKNOWN_HASH);
    // Neutral flight substitute: nothing was fetched.
    assert_eq!(decision.flight_data.delay_minutes, 0);
    assert_eq!(decision.flight_data.status, FlightStatus::OnTime);
}

#[test]
fn unknown_version_denies_without_fallback() {
    let engine = common::demo_engine();
    let decision = engine
        .evaluate(&claim("BA123", date(2024, 12, 20), "v9.9"))
        .expect("evaluates");

    assert_eq!(decision.outcome, DecisionOutcome::Denied);
    assert_eq!(decision.reason_codes, vec![DENIED_INVALID_VERSION.to_string()]);
    assert_eq!(decision.trace.len(), 1);
    assert_eq!(decision.product_hash, UNKNOWN_HASH);
}

#[test]
fn corrupt_configuration_surfaces_as_an_engine_fault() {
    let mut config = crate::engine::catalog::templates::standard_config();
    config.payout_tiers.clear();
    let repository = common::repository_with(common::product_from("prod-corrupt", config));
    let engine = DecisionEngine::new(repository);

    let mut claim = scenario_a();
    claim.product_id = "prod-corrupt".to_string();
    claim.product_version = "v1.0".to_string();

    let err = engine.evaluate(&claim).unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
}

#[test]
fn repeated_evaluation_is_deterministic_apart_from_identity() {
    let engine = common::demo_engine();
    let first = engine.evaluate(&scenario_a()).expect("evaluates");
    let second = engine.evaluate(&scenario_a()).expect("evaluates");

    assert_ne!(first.id, second.id);
    assert_eq!(first.outcome, second.outcome);
    assert_eq!(first.payout_amount_usd, second.payout_amount_usd);
    assert_eq!(first.reason_codes, second.reason_codes);
    assert_eq!(first.product_hash, second.product_hash);
    assert_eq!(first.flight_data, second.flight_data);
}

struct FixedIds;

impl DecisionIdSource for FixedIds {
    fn next_decision_id(&self) -> String {
        "DEC-FIXED".to_string()
    }
}

#[test]
fn decision_ids_come_from_the_injected_source() {
    let engine = DecisionEngine::with_id_source(common::demo_repository(), Arc::new(FixedIds));
    let decision = engine.evaluate(&scenario_a()).expect("evaluates");
    assert_eq!(decision.id, "DEC-FIXED");
}

#[test]
fn decision_wire_format_uses_the_uppercase_usd_field() {
    let engine = common::demo_engine();
    let decision = engine.evaluate(&scenario_a()).expect("evaluates");

    let value = serde_json::to_value(&decision).expect("decision serializes");
    assert_eq!(value["payoutAmountUSD"], serde_json::json!(175));
    assert!(value.get("payoutAmountUsd").is_none());
}

#[test]
fn audit_artifact_reproduces_under_replay() {
    let engine = common::demo_engine();
    let decision = engine.evaluate(&scenario_a()).expect("evaluates");
    let artifact = export_audit_artifact(&decision, "dispute-desk");

    assert_eq!(artifact.exported_by, "dispute-desk");
    assert_eq!(artifact.decision, decision);

    let replayed = engine
        .evaluate(&artifact.decision.claim_input)
        .expect("replays");
    assert_eq!(replayed.outcome, artifact.decision.outcome);
    assert_eq!(replayed.payout_amount_usd, artifact.decision.payout_amount_usd);
    assert_eq!(replayed.product_hash, artifact.decision.product_hash);
    assert_eq!(replayed.trace.len(), artifact.decision.trace.len());
}
