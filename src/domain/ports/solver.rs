//! Solver boundary ports.
//!
//! Backends see the variability model on every call and bind to the first
//! model they are handed; a request for a different model fails with
//! [`DomainError::ModelBinding`](crate::domain::errors::DomainError::ModelBinding).
//! Option-name to solver-term mapping stays inside the adapter.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{FeatureWeights, OptionSet, VariabilityModel};

/// Satisfiability of (partial) selections against the Boolean constraints of a
/// model. Non-Boolean and mixed constraints are not evaluated here.
#[async_trait]
pub trait SatisfiabilityChecker: Send + Sync {
    /// With `partial`, true iff some completion of `selected` is valid.
    /// Without it, true iff exactly `selected` is valid.
    async fn is_satisfiable(
        &self,
        model: &VariabilityModel,
        selected: &OptionSet,
        partial: bool,
    ) -> DomainResult<bool>;
}

/// Generation of valid Boolean assignments.
#[async_trait]
pub trait VariantGenerator: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// A valid selection containing `required`, minimal with respect to the
    /// options it adds, preferring to leave out `avoid`. `None` if
    /// `required` cannot be completed.
    async fn find_minimal_completion(
        &self,
        model: &VariabilityModel,
        required: &OptionSet,
        avoid: &OptionSet,
    ) -> DomainResult<Option<OptionSet>>;

    /// Up to `n` distinct valid selections; `n < 0` means all of them.
    /// Every call enumerates from scratch.
    async fn enumerate_up_to(&self, model: &VariabilityModel, n: i64)
        -> DomainResult<Vec<OptionSet>>;

    /// A valid selection with exactly `selected_count` options, different
    /// from every selection previously returned for that count and steering
    /// away from heavily weighted combinations. `None` once exhausted.
    async fn generate_bucket(
        &self,
        model: &VariabilityModel,
        selected_count: usize,
        weights: &FeatureWeights,
    ) -> DomainResult<Option<OptionSet>>;

    /// Forget all per-bucket state.
    async fn reset_cache(&self) -> DomainResult<()>;
}

/// A backend offering both solver capabilities.
pub trait SolverBackend: SatisfiabilityChecker + VariantGenerator {}

impl<T> SolverBackend for T where T: SatisfiabilityChecker + VariantGenerator {}
