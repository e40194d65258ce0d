//! Exhaustive enumeration of valid Boolean assignments.

use tracing::info;

use crate::domain::errors::DomainResult;
use crate::domain::models::OptionSet;
use crate::services::solver_facade::SolverFacade;

pub async fn sample(solver: &SolverFacade) -> DomainResult<Vec<OptionSet>> {
    let mut selections = solver.enumerate_up_to(-1).await?;
    selections.sort();
    info!(strategy = "allbinary", configurations = selections.len(), "sampling finished");
    Ok(selections)
}
