//! Learner port: the external regression/feature-selection engine.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Configuration, FeatureSet, FittedModel};

/// Fits performance-influence models.
///
/// Implementations must return exactly one model per call. The active
/// learning loop treats any other count as a contract violation.
#[async_trait]
pub trait Learner: Send + Sync {
    /// Fit on `learning`, report the error on `validation`. `hint` carries
    /// the feature set of the previous round.
    async fn fit(
        &self,
        learning: &[Configuration],
        validation: &[Configuration],
        hint: Option<&FeatureSet>,
    ) -> DomainResult<Vec<FittedModel>>;
}
