//! Port for experimental designs over numeric options.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::domain::errors::DomainResult;
use crate::domain::models::{NumericOption, SamplingTask};

/// One numeric assignment: option name to value.
pub type NumericAssignment = BTreeMap<String, f64>;

/// A design-of-experiments generator (Box-Behnken, Plackett-Burman, ...).
#[async_trait]
pub trait NumericDesign: Send + Sync {
    /// Lower-case name used in task lines.
    fn name(&self) -> &str;

    /// Generate assignments over `options`, which the builder has already
    /// restricted to the task's option list.
    async fn generate(
        &self,
        options: &[NumericOption],
        task: &SamplingTask,
    ) -> DomainResult<Vec<NumericAssignment>>;
}
