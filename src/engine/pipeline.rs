use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use super::catalog::{ConfigIntegrityError, PayoutTier, ProductConfig};
use super::decision::{build_decision, DecisionIdSource, SequentialIds};
use super::domain::{
    ClaimInput, Decision, DecisionOutcome, RuleStage, TraceResult, TraceStep,
};
use super::flights::FlightStateProvider;
use super::repository::{ProductRepository, RepositoryError};
use super::resolver::{resolve, ResolveFailure};

pub const DENIED_INVALID_PRODUCT: &str = "DENIED_INVALID_PRODUCT";
pub const DENIED_INVALID_VERSION: &str = "DENIED_INVALID_VERSION";
pub const DENIED_OUTSIDE_WINDOW: &str = "DENIED_OUTSIDE_WINDOW";
pub const DENIED_EXCLUSION: &str = "DENIED_EXCLUSION";
pub const DENIED_NO_DELAY: &str = "DENIED_NO_DELAY";

/// Faults of the engine itself, as opposed to business denials. A corrupt
/// configuration or an unavailable repository is surfaced loudly instead
/// of being folded into a denial reason.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("configuration integrity fault: {0}")]
    Config(#[from] ConfigIntegrityError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Accumulates one immutable trace step per attempted stage.
struct TraceRecorder {
    steps: Vec<TraceStep>,
}

impl TraceRecorder {
    fn new() -> Self {
        Self { steps: Vec::new() }
    }

    fn record(
        &mut self,
        rule: RuleStage,
        input: BTreeMap<String, serde_json::Value>,
        result: TraceResult,
        explanation: String,
    ) {
        let id = format!("step-{}", self.steps.len() + 1);
        self.steps.push(TraceStep {
            id,
            rule,
            description: rule.description().to_string(),
            input,
            result,
            explanation,
        });
    }

    fn into_steps(self) -> Vec<TraceStep> {
        self.steps
    }
}

/// First tier whose inclusive range contains the delay, in stored order.
pub(crate) fn match_tier(config: &ProductConfig, delay_minutes: u32) -> Option<(usize, &PayoutTier)> {
    config
        .payout_tiers
        .iter()
        .enumerate()
        .find(|(_, tier)| {
            delay_minutes >= tier.min_delay_minutes && delay_minutes <= tier.max_delay_minutes
        })
}

/// The ordered six-stage rule pipeline. Evaluation of a single claim is a
/// synchronous, side-effect-free computation once the configuration and
/// flight state are in hand; concurrent invocations need no locking.
pub struct DecisionEngine<R> {
    repository: Arc<R>,
    flights: FlightStateProvider,
    ids: Arc<dyn DecisionIdSource>,
}

impl<R: ProductRepository> DecisionEngine<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self::with_id_source(repository, Arc::new(SequentialIds::default()))
    }

    pub fn with_id_source(repository: Arc<R>, ids: Arc<dyn DecisionIdSource>) -> Self {
        Self {
            repository,
            flights: FlightStateProvider::with_reference_data(),
            ids,
        }
    }

    pub fn flights(&self) -> &FlightStateProvider {
        &self.flights
    }

    /// Evaluate one claim through all six stages, short-circuiting to a
    /// denial at the first failing stage. Every attempted stage leaves
    /// exactly one trace step regardless of outcome.
    pub fn evaluate(&self, claim: &ClaimInput) -> Result<Decision, EngineError> {
        let mut trace = TraceRecorder::new();

        // Stage 1: PRODUCT_VALIDATION.
        let resolved = match resolve(
            self.repository.as_ref(),
            &claim.product_id,
            &claim.product_version,
        ) {
            Ok(resolved) => {
                trace.record(
                    RuleStage::ProductValidation,
                    BTreeMap::from([
                        ("productId".to_string(), json!(claim.product_id)),
                        ("version".to_string(), json!(claim.product_version)),
                    ]),
                    TraceResult::Pass,
                    format!(
                        "Product \"{}\" found with version {}",
                        resolved.product_name, resolved.version
                    ),
                );
                resolved
            }
            Err(failure @ ResolveFailure::InvalidProduct { .. }) => {
                trace.record(
                    RuleStage::ProductValidation,
                    BTreeMap::from([("productId".to_string(), json!(claim.product_id))]),
                    TraceResult::Fail,
                    failure.to_string(),
                );
                return Ok(self.denied(claim, DENIED_INVALID_PRODUCT, trace, None, None));
            }
            Err(failure @ ResolveFailure::InvalidVersion { .. }) => {
                trace.record(
                    RuleStage::ProductValidation,
                    BTreeMap::from([
                        ("productId".to_string(), json!(claim.product_id)),
                        ("version".to_string(), json!(claim.product_version)),
                    ]),
                    TraceResult::Fail,
                    failure.to_string(),
                );
                return Ok(self.denied(claim, DENIED_INVALID_VERSION, trace, None, None));
            }
            Err(ResolveFailure::CorruptConfig { source, .. }) => {
                return Err(EngineError::Config(source));
            }
            Err(ResolveFailure::Repository(err)) => return Err(EngineError::Repository(err)),
        };
        let config = &resolved.config;
        let hash = resolved.hash.clone();

        // Stage 2: FLIGHT_DATA_FETCH. The provider synthesizes a state for
        // unknown flights, so this stage always passes.
        let flight = self.flights.state_for(&claim.flight_no, claim.flight_date);
        trace.record(
            RuleStage::FlightDataFetch,
            BTreeMap::from([
                ("flightNo".to_string(), json!(claim.flight_no)),
                ("flightDate".to_string(), json!(claim.flight_date)),
                ("dataSource".to_string(), json!(config.data_source.provider)),
                ("status".to_string(), json!(flight.status)),
                ("delayMinutes".to_string(), json!(flight.delay_minutes)),
            ]),
            TraceResult::Pass,
            format!(
                "Flight data retrieved: {}, delay of {} minutes",
                flight.status.label(),
                flight.delay_minutes
            ),
        );

        // Stage 3: ELIGIBILITY_WINDOW (hours since scheduled arrival,
        // inclusive bound).
        let claim_timestamp = claim.claim_timestamp();
        let hours_since_flight =
            (claim_timestamp - flight.scheduled_arrival).num_seconds() as f64 / 3600.0;
        let window_hours = config.eligibility.claim_window_hours;
        let within_window = hours_since_flight <= f64::from(window_hours);
        trace.record(
            RuleStage::EligibilityWindow,
            BTreeMap::from([
                ("claimWindowHours".to_string(), json!(window_hours)),
                (
                    "hoursSinceFlight".to_string(),
                    json!(hours_since_flight.round() as i64),
                ),
                ("flightDate".to_string(), json!(claim.flight_date)),
            ]),
            if within_window {
                TraceResult::Pass
            } else {
                TraceResult::Fail
            },
            format!(
                "Claim submitted {} {window_hours}h window ({:.0}h since flight)",
                if within_window { "within" } else { "outside" },
                hours_since_flight
            ),
        );
        if !within_window {
            return Ok(self.denied(claim, DENIED_OUTSIDE_WINDOW, trace, Some(flight), Some(hash)));
        }

        // Stage 4: EXCLUSION_CHECK. First matching enabled exclusion wins.
        let enabled_reasons: Vec<_> = config
            .exclusions
            .iter()
            .filter(|exclusion| exclusion.enabled)
            .map(|exclusion| exclusion.reason.label())
            .collect();
        let applicable = config
            .exclusions
            .iter()
            .find(|exclusion| exclusion.enabled && exclusion.reason == flight.delay_reason);
        let exclusion_input = BTreeMap::from([
            ("delayReason".to_string(), json!(flight.delay_reason)),
            ("exclusions".to_string(), json!(enabled_reasons)),
        ]);
        match applicable {
            Some(exclusion) => {
                trace.record(
                    RuleStage::ExclusionCheck,
                    exclusion_input,
                    TraceResult::Fail,
                    format!(
                        "Exclusion applies: \"{}\" covers delay reason \"{}\"",
                        exclusion.label,
                        flight.delay_reason.label()
                    ),
                );
                return Ok(self.denied(claim, DENIED_EXCLUSION, trace, Some(flight), Some(hash)));
            }
            None => trace.record(
                RuleStage::ExclusionCheck,
                exclusion_input,
                TraceResult::Pass,
                format!(
                    "No exclusion applies for delay reason \"{}\"",
                    flight.delay_reason.label()
                ),
            ),
        }

        // Stage 5: PAYOUT_TIER_MATCH.
        let delay_minutes = flight.delay_minutes;
        let matched = match match_tier(config, delay_minutes) {
            Some((index, tier)) => {
                trace.record(
                    RuleStage::PayoutTierMatch,
                    BTreeMap::from([
                        ("delayMinutes".to_string(), json!(delay_minutes)),
                        (
                            "matchedTier".to_string(),
                            json!(format!(
                                "{}-{}min",
                                tier.min_delay_minutes, tier.max_delay_minutes
                            )),
                        ),
                        ("payoutUSD".to_string(), json!(tier.payout_amount_usd)),
                    ]),
                    TraceResult::Pass,
                    format!(
                        "Delay of {delay_minutes} minutes matches tier {}-{}min (${})",
                        tier.min_delay_minutes, tier.max_delay_minutes, tier.payout_amount_usd
                    ),
                );
                (index, tier.clone())
            }
            None => {
                let floors: Vec<_> = config
                    .payout_tiers
                    .iter()
                    .map(|tier| {
                        format!("{}-{}min", tier.min_delay_minutes, tier.max_delay_minutes)
                    })
                    .collect();
                let floor = config
                    .payout_tiers
                    .first()
                    .map(|tier| tier.min_delay_minutes)
                    .unwrap_or(60);
                trace.record(
                    RuleStage::PayoutTierMatch,
                    BTreeMap::from([
                        ("delayMinutes".to_string(), json!(delay_minutes)),
                        ("tiers".to_string(), json!(floors)),
                    ]),
                    TraceResult::Fail,
                    format!(
                        "Delay of {delay_minutes} minutes does not meet minimum threshold of {floor} minutes"
                    ),
                );
                return Ok(self.denied(claim, DENIED_NO_DELAY, trace, Some(flight), Some(hash)));
            }
        };

        // Stage 6: FINAL_DECISION.
        let (tier_index, tier) = matched;
        let reason_code = format!("APPROVED_TIER_{}", tier_index + 1);
        let payout = tier.payout_amount_usd;
        trace.record(
            RuleStage::FinalDecision,
            BTreeMap::from([
                ("outcome".to_string(), json!(DecisionOutcome::Approved)),
                ("payoutUSD".to_string(), json!(payout)),
                ("reasonCodes".to_string(), json!([reason_code.clone()])),
            ]),
            TraceResult::Pass,
            format!("Claim approved for ${payout} payout"),
        );

        debug!(
            booking_ref = %claim.booking_ref,
            payout,
            reason = %reason_code,
            "claim approved"
        );

        Ok(build_decision(
            self.ids.as_ref(),
            claim,
            DecisionOutcome::Approved,
            payout,
            vec![reason_code],
            trace.into_steps(),
            Some(flight),
            Some(hash),
        ))
    }

    fn denied(
        &self,
        claim: &ClaimInput,
        reason_code: &str,
        trace: TraceRecorder,
        flight: Option<super::domain::FlightState>,
        hash: Option<String>,
    ) -> Decision {
        debug!(booking_ref = %claim.booking_ref, reason = reason_code, "claim denied");
        build_decision(
            self.ids.as_ref(),
            claim,
            DecisionOutcome::Denied,
            0,
            vec![reason_code.to_string()],
            trace.into_steps(),
            flight,
            hash,
        )
    }
}
