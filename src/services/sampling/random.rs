//! Seeded random sampling over the enumerated configuration space.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::domain::errors::DomainResult;
use crate::domain::models::{OptionSet, SamplingTask};
use crate::services::solver_facade::SolverFacade;

/// Enumeration bound used when a task sets no `threshold`.
pub const DEFAULT_THRESHOLD: i64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomParams {
    pub seed: u64,
    pub modulus: usize,
    /// Upper bound on enumerated assignments; negative means all.
    pub threshold: i64,
    pub num_configs: Option<usize>,
}

impl Default for RandomParams {
    fn default() -> Self {
        Self {
            seed: 0,
            modulus: 1,
            threshold: DEFAULT_THRESHOLD,
            num_configs: None,
        }
    }
}

impl RandomParams {
    pub fn from_task(task: &SamplingTask) -> DomainResult<Self> {
        let modulus = task.param_or::<usize>("modulus", 1)?;
        if modulus == 0 {
            return Err(task.invalid("modulus", "0", "modulus must be positive"));
        }
        let num_configs = match task.param("numconfigs") {
            Some(_) => Some(task.param_or::<usize>("numconfigs", 0)?),
            None => None,
        };
        Ok(Self {
            seed: task.seed()?,
            modulus,
            threshold: task.param_or("threshold", DEFAULT_THRESHOLD)?,
            num_configs,
        })
    }
}

/// Enumerate up to `threshold` assignments in canonical order and keep every
/// one whose index falls into the residue class drawn from the seed.
pub async fn sample(solver: &SolverFacade, params: &RandomParams) -> DomainResult<Vec<OptionSet>> {
    let mut space = solver.enumerate_up_to(params.threshold).await?;
    // Enumeration order is backend-specific; sort so the seed alone decides.
    space.sort();

    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let offset = rng.gen_range(0..params.modulus);

    let mut selected: Vec<OptionSet> = space
        .into_iter()
        .enumerate()
        .filter(|(index, _)| index % params.modulus == offset)
        .map(|(_, selection)| selection)
        .collect();
    if let Some(limit) = params.num_configs {
        selected.truncate(limit);
    }

    info!(
        strategy = "random",
        seed = params.seed,
        modulus = params.modulus,
        offset,
        configurations = selected.len(),
        "sampling finished"
    );
    Ok(selected)
}
