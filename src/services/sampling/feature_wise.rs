//! Feature-wise (1-wise) sampling.

use tracing::{debug, info};

use crate::domain::errors::DomainResult;
use crate::domain::models::OptionSet;
use crate::services::solver_facade::SolverFacade;

use super::{candidate_names, SampleSet};

/// One minimal valid selection per candidate option, containing it.
pub async fn sample(solver: &SolverFacade) -> DomainResult<Vec<OptionSet>> {
    let mut samples = SampleSet::new();
    let avoid = OptionSet::new();

    for option in candidate_names(solver) {
        let required = OptionSet::from([option.clone()]);
        match solver.find_minimal_completion(&required, &avoid).await? {
            Some(selection) => {
                samples.insert(selection);
            }
            None => debug!(%option, "option cannot be selected in any valid configuration"),
        }
    }

    info!(strategy = "featurewise", configurations = samples.len(), "sampling finished");
    Ok(samples.into_vec())
}
