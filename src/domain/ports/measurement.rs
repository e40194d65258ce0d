use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::Configuration;

/// Attaches measured NFP values to freshly sampled configurations.
#[async_trait]
pub trait MeasurementSource: Send + Sync {
    /// Return the measured configurations. Configurations that cannot be
    /// measured are left out of the result.
    async fn measure(&self, configurations: Vec<Configuration>) -> DomainResult<Vec<Configuration>>;
}
