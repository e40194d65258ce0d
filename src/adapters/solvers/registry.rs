//! Solver backend registry.

use std::sync::Arc;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{SolverConfig, SolverType};
use crate::domain::ports::SolverBackend;

use super::process::{ProcessSolver, ProcessSolverConfig};
use super::varisat::VarisatSolver;

/// Creates solver backends by [`SolverType`].
#[derive(Debug, Clone, Default)]
pub struct SolverRegistry {
    process_config: Option<ProcessSolverConfig>,
}

impl SolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry configured from settings.
    pub fn from_config(config: &SolverConfig) -> Self {
        let registry = Self::new();
        if config.command.is_empty() {
            registry
        } else {
            registry.with_process_config(
                ProcessSolverConfig::new(&config.command).with_args(config.args.iter().cloned()),
            )
        }
    }

    #[must_use]
    pub fn with_process_config(mut self, config: ProcessSolverConfig) -> Self {
        self.process_config = Some(config);
        self
    }

    /// Create a backend by type.
    pub fn create_by_type(&self, solver_type: SolverType) -> DomainResult<Arc<dyn SolverBackend>> {
        match solver_type {
            SolverType::Varisat => Ok(Arc::new(VarisatSolver::new())),
            SolverType::Process => {
                let config = self.process_config.clone().ok_or_else(|| {
                    DomainError::SolverFailure(
                        "process backend selected but no solver command configured".to_string(),
                    )
                })?;
                Ok(Arc::new(ProcessSolver::new(config)))
            }
        }
    }

    /// List available backend types.
    pub fn available_types(&self) -> Vec<SolverType> {
        let mut types = vec![SolverType::Varisat];
        if self.process_config.is_some() {
            types.push(SolverType::Process);
        }
        types
    }
}
