//! Facade binding one variability model to one solver backend.

use std::sync::Arc;

use crate::adapters::solvers::SolverRegistry;
use crate::domain::errors::DomainResult;
use crate::domain::models::{FeatureWeights, OptionSet, SolverType, VariabilityModel};
use crate::domain::ports::SolverBackend;

/// Both solver capabilities for a single model. Cheap to clone.
#[derive(Clone)]
pub struct SolverFacade {
    model: Arc<VariabilityModel>,
    backend: Arc<dyn SolverBackend>,
}

impl SolverFacade {
    /// Bind `model` to `backend`.
    pub fn new(model: Arc<VariabilityModel>, backend: Arc<dyn SolverBackend>) -> Self {
        Self { model, backend }
    }

    /// Bind `model` to the registry's backend of `solver_type`.
    pub fn from_registry(
        model: Arc<VariabilityModel>,
        registry: &SolverRegistry,
        solver_type: SolverType,
    ) -> DomainResult<Self> {
        Ok(Self::new(model, registry.create_by_type(solver_type)?))
    }

    /// The bound model.
    pub fn model(&self) -> &VariabilityModel {
        &self.model
    }

    pub fn shared_model(&self) -> Arc<VariabilityModel> {
        Arc::clone(&self.model)
    }

    /// Name of the backend, for logs and reports.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Whether `selected` (or some completion of it, when `partial`) satisfies
    /// the Boolean constraints.
    pub async fn is_satisfiable(&self, selected: &OptionSet, partial: bool) -> DomainResult<bool> {
        self.backend
            .is_satisfiable(&self.model, selected, partial)
            .await
    }

    /// Smallest valid selection containing `required`, leaving out `avoid`
    /// where possible. `None` when `required` cannot be completed.
    pub async fn find_minimal_completion(
        &self,
        required: &OptionSet,
        avoid: &OptionSet,
    ) -> DomainResult<Option<OptionSet>> {
        self.backend
            .find_minimal_completion(&self.model, required, avoid)
            .await
    }

    /// Up to `n` distinct valid selections; negative `n` means all.
    pub async fn enumerate_up_to(&self, n: i64) -> DomainResult<Vec<OptionSet>> {
        self.backend.enumerate_up_to(&self.model, n).await
    }

    /// A not yet returned valid selection with exactly `selected_count`
    /// options, steered away from heavily weighted combinations.
    pub async fn generate_bucket(
        &self,
        selected_count: usize,
        weights: &FeatureWeights,
    ) -> DomainResult<Option<OptionSet>> {
        self.backend
            .generate_bucket(&self.model, selected_count, weights)
            .await
    }

    /// Forget every bucket encoding and the selections already returned.
    pub async fn reset_cache(&self) -> DomainResult<()> {
        self.backend.reset_cache().await
    }
}
