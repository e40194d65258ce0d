//! Negative feature-wise sampling: deselection coverage.

use tracing::{debug, info};

use crate::domain::errors::DomainResult;
use crate::domain::models::OptionSet;
use crate::services::solver_facade::SolverFacade;

use super::{candidate_names, SampleSet};

/// One minimal valid selection per candidate option, leaving it out.
/// Options that every valid configuration selects contribute nothing.
pub async fn sample(solver: &SolverFacade) -> DomainResult<Vec<OptionSet>> {
    let mut samples = SampleSet::new();
    let required = OptionSet::new();

    for option in candidate_names(solver) {
        let avoid = OptionSet::from([option.clone()]);
        match solver.find_minimal_completion(&required, &avoid).await? {
            Some(selection) if !selection.contains(&option) => {
                samples.insert(selection);
            }
            _ => debug!(%option, "option cannot be deselected in any valid configuration"),
        }
    }

    info!(strategy = "negfw", configurations = samples.len(), "sampling finished");
    Ok(samples.into_vec())
}
