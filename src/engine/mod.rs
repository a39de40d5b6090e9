//! Claim decisioning core: configuration resolution, deterministic flight
//! state, the ordered rule pipeline with trace recording, and the
//! regression/impact evaluator.

pub mod catalog;
pub mod decision;
pub mod domain;
pub mod flights;
pub mod pipeline;
pub mod regression;
pub mod repository;
pub mod resolver;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use catalog::{
    ConfigIntegrityError, DataSourceConfig, DataSourceKind, EligibilityConfig, Exclusion,
    PayoutTier, Product, ProductConfig, ProductStatus, ProductVersion, ReasonCode, VersionStatus,
};
pub use decision::{export_audit_artifact, DecisionIdSource, SequentialIds, UNKNOWN_HASH};
pub use domain::{
    AuditArtifact, ClaimInput, Decision, DecisionOutcome, DelayReason, FlightState, FlightStatus,
    RuleStage, TraceResult, TraceStep,
};
pub use flights::FlightStateProvider;
pub use pipeline::{
    DecisionEngine, EngineError, DENIED_EXCLUSION, DENIED_INVALID_PRODUCT,
    DENIED_INVALID_VERSION, DENIED_NO_DELAY, DENIED_OUTSIDE_WINDOW,
};
pub use regression::{
    compare_versions, run_pack, standard_pack, CaseImpact, ImpactReport, RegressionResult,
    RegressionRunSummary, RegressionTestCase, RegressionTestPack,
};
pub use repository::{InMemoryProductRepository, ProductRepository, RepositoryError};
pub use resolver::{resolve, ResolveFailure, ResolvedProduct};
pub use router::{claims_router, DecisionRequest, DecisionResponse};
pub use service::DecisionService;
