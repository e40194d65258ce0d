//! T-wise sampling; pairwise is `t = 2`.

use tracing::{debug, info};

use crate::domain::errors::DomainResult;
use crate::domain::models::OptionSet;
use crate::services::solver_facade::SolverFacade;

use super::{candidate_names, combinations, SampleSet};

/// For every combination of `t` mutually non-excluded candidate options, one
/// minimal valid selection containing all of them. Greedy: a combination
/// already covered by an earlier selection is not requested again.
pub async fn sample(solver: &SolverFacade, t: usize) -> DomainResult<Vec<OptionSet>> {
    let model = solver.model();
    let candidates = candidate_names(solver);
    let avoid = OptionSet::new();
    let mut samples = SampleSet::new();
    let mut skipped = 0usize;

    for combination in combinations(&candidates, t) {
        if !model.mutually_compatible(combination.iter().map(String::as_str)) {
            skipped += 1;
            continue;
        }
        let required: OptionSet = combination.into_iter().collect();
        if samples.iter().any(|selection| required.is_subset(selection)) {
            continue;
        }
        match solver.find_minimal_completion(&required, &avoid).await? {
            Some(selection) => {
                samples.insert(selection);
            }
            None => debug!(?required, "combination has no valid completion"),
        }
    }

    info!(
        strategy = "twise",
        t,
        configurations = samples.len(),
        skipped_excluded = skipped,
        "sampling finished"
    );
    Ok(samples.into_vec())
}
