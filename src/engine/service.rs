use std::sync::Arc;

use super::catalog::Product;
use super::decision::export_audit_artifact;
use super::domain::{AuditArtifact, ClaimInput, Decision};
use super::pipeline::{DecisionEngine, EngineError};
use super::regression::{
    compare_versions, run_pack, standard_pack, ImpactReport, RegressionRunSummary,
};
use super::repository::{ProductRepository, RepositoryError};

/// Service composing the decision engine, the product repository, and the
/// regression evaluator behind one handle the routes and CLI share.
pub struct DecisionService<R> {
    engine: DecisionEngine<R>,
    repository: Arc<R>,
    exported_by: String,
}

impl<R: ProductRepository> DecisionService<R> {
    pub fn new(repository: Arc<R>, exported_by: impl Into<String>) -> Self {
        Self {
            engine: DecisionEngine::new(repository.clone()),
            repository,
            exported_by: exported_by.into(),
        }
    }

    pub fn engine(&self) -> &DecisionEngine<R> {
        &self.engine
    }

    pub fn decide(&self, claim: &ClaimInput) -> Result<Decision, EngineError> {
        self.engine.evaluate(claim)
    }

    /// Evaluate and immediately export the decision as an audit artifact.
    pub fn decide_with_audit(&self, claim: &ClaimInput) -> Result<AuditArtifact, EngineError> {
        let decision = self.engine.evaluate(claim)?;
        Ok(export_audit_artifact(&decision, &self.exported_by))
    }

    pub fn products(&self) -> Result<Vec<Product>, RepositoryError> {
        self.repository.list_products()
    }

    pub fn product(&self, id: &str) -> Result<Option<Product>, RepositoryError> {
        self.repository.get_product(id)
    }

    /// Run the standard pack against one version of a product.
    pub fn regression_run(
        &self,
        product_id: &str,
        version: &str,
    ) -> Result<RegressionRunSummary, EngineError> {
        run_pack(&self.engine, &standard_pack(), product_id, version)
    }

    /// Quantify the behavioral drift of moving a product between versions.
    pub fn impact(
        &self,
        product_id: &str,
        from_version: &str,
        to_version: &str,
    ) -> Result<ImpactReport, EngineError> {
        compare_versions(
            &self.engine,
            &standard_pack(),
            product_id,
            from_version,
            to_version,
        )
    }
}
