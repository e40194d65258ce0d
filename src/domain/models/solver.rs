//! Solver backend selection and solver-facing value types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::option::OptionSet;

/// Weight of an option combination in bucket sampling. Higher weights push
/// the solver away from selecting the combination again.
pub type FeatureWeights = BTreeMap<OptionSet, i64>;

/// Backend behind the solver facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SolverType {
    /// In-process CDCL SAT solver.
    #[default]
    Varisat,
    /// External solver reached over a line-oriented stdin/stdout protocol.
    Process,
}

impl SolverType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Varisat => "varisat",
            Self::Process => "process",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "varisat" | "sat" => Some(Self::Varisat),
            "process" | "external" => Some(Self::Process),
            _ => None,
        }
    }
}

impl std::fmt::Display for SolverType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
