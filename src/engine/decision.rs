use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use super::domain::{
    AuditArtifact, ClaimInput, Decision, DecisionOutcome, FlightState, TraceStep,
};

/// Sentinel hash attached when resolution failed before a hash was known.
pub const UNKNOWN_HASH: &str = "unknown";

/// Injectable decision-id source so the engine core stays deterministic
/// and trivially testable independent of any randomness source.
pub trait DecisionIdSource: Send + Sync {
    fn next_decision_id(&self) -> String;
}

/// Process-wide monotonic ids of the form `DEC-000001`.
#[derive(Debug, Default)]
pub struct SequentialIds {
    counter: AtomicU64,
}

impl DecisionIdSource for SequentialIds {
    fn next_decision_id(&self) -> String {
        let id = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("DEC-{id:06}")
    }
}

/// Assemble the final immutable decision record. Substitutes a neutral
/// flight state when none was ever fetched and the unknown-hash sentinel
/// when resolution failed early. Never mutates the claim input.
#[allow(clippy::too_many_arguments)]
pub(crate) fn build_decision(
    ids: &dyn DecisionIdSource,
    claim: &ClaimInput,
    outcome: DecisionOutcome,
    payout_amount_usd: u32,
    reason_codes: Vec<String>,
    trace: Vec<TraceStep>,
    flight_data: Option<FlightState>,
    product_hash: Option<String>,
) -> Decision {
    Decision {
        id: ids.next_decision_id(),
        outcome,
        payout_amount_usd,
        reason_codes,
        trace,
        product_version: claim.product_version.clone(),
        product_hash: product_hash.unwrap_or_else(|| UNKNOWN_HASH.to_string()),
        timestamp: Utc::now(),
        claim_input: claim.clone(),
        flight_data: flight_data
            .unwrap_or_else(|| FlightState::neutral(&claim.flight_no, claim.flight_date)),
    }
}

/// Wrap a decision into a self-contained, independently re-verifiable
/// audit record.
pub fn export_audit_artifact(decision: &Decision, exported_by: &str) -> AuditArtifact {
    AuditArtifact {
        decision: decision.clone(),
        exported_at: Utc::now(),
        exported_by: exported_by.to_string(),
    }
}
