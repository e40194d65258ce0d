use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::LearningRound;

/// Receives one record per completed learning round.
#[async_trait]
pub trait RoundSink: Send + Sync {
    async fn record(&self, round: &LearningRound) -> DomainResult<()>;
}
