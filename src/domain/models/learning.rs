//! Active-learning state, round records, and strategy selection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::configuration::Configuration;
use super::fitted_model::{FeatureSet, FittedModel};

/// States of the active-learning loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningState {
    Init,
    Fit,
    Evaluate,
    Decide,
    Expand,
    Aborted,
    Done,
}

impl LearningState {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Aborted | Self::Done)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Fit => "fit",
            Self::Evaluate => "evaluate",
            Self::Decide => "decide",
            Self::Expand => "expand",
            Self::Aborted => "aborted",
            Self::Done => "done",
        }
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum StopReason {
    MaxRounds,
    /// The last error fell below `min_improvement_per_round`.
    InsufficientImprovement,
    ErrorBelowAbort,
    NoNewConfigurations,
    /// The learner broke its one-model-per-round contract.
    ModelContract(String),
    /// An addition strategy found no candidate option to force.
    ValidationSetTooSmall(String),
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MaxRounds => f.write_str("maximum number of rounds reached"),
            Self::InsufficientImprovement => f.write_str("insufficient improvement"),
            Self::ErrorBelowAbort => f.write_str("error below abort threshold"),
            Self::NoNewConfigurations => f.write_str("no new configurations"),
            Self::ModelContract(msg) => write!(f, "model contract violated: {msg}"),
            Self::ValidationSetTooSmall(msg) => write!(f, "{msg}"),
        }
    }
}

/// Serializable record of one learning round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningRound {
    pub run_id: Uuid,
    pub round: usize,
    pub feature_set: FeatureSet,
    pub final_error: f64,
    pub learning_size: usize,
    pub validation_size: usize,
    /// Configurations added since the previous round.
    #[serde(default)]
    pub new_configurations: usize,
    pub timestamp: DateTime<Utc>,
}

/// Everything a finished run hands back.
#[derive(Debug, Clone)]
pub struct LearningOutcome {
    pub run_id: Uuid,
    pub state: LearningState,
    pub stop_reason: StopReason,
    pub rounds: Vec<LearningRound>,
    pub learning_set: Vec<Configuration>,
    pub validation_set: Vec<Configuration>,
    pub model: Option<FittedModel>,
}

impl LearningOutcome {
    pub fn last_error(&self) -> Option<f64> {
        self.rounds.last().map(|round| round.final_error)
    }

    pub fn rounds_completed(&self) -> usize {
        self.rounds.len()
    }
}

/// Policy that grows the learning set between rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdditionStrategyKind {
    #[serde(rename = "noop")]
    NoOp,
    #[default]
    Simple,
    Matrix,
    Matrix2,
    MatrixMax,
    MatrixVic,
}

impl AdditionStrategyKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoOp => "noop",
            Self::Simple => "simple",
            Self::Matrix => "matrix",
            Self::Matrix2 => "matrix2",
            Self::MatrixMax => "matrix_max",
            Self::MatrixVic => "matrix_vic",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "noop" | "none" => Some(Self::NoOp),
            "simple" => Some(Self::Simple),
            "matrix" => Some(Self::Matrix),
            "matrix2" => Some(Self::Matrix2),
            "matrix_max" | "matrixmax" => Some(Self::MatrixMax),
            "matrix_vic" | "matrixvic" => Some(Self::MatrixVic),
            _ => None,
        }
    }
}

/// Policy that rebalances learning and validation sets between rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeStrategyKind {
    #[default]
    #[serde(rename = "noop")]
    NoOp,
    MinDistance,
    PerformanceHistogram,
}

impl ExchangeStrategyKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoOp => "noop",
            Self::MinDistance => "min_distance",
            Self::PerformanceHistogram => "performance_histogram",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "noop" | "none" => Some(Self::NoOp),
            "min_distance" | "mindistance" => Some(Self::MinDistance),
            "performance_histogram" | "histogram" => Some(Self::PerformanceHistogram),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(LearningState::Aborted.is_terminal());
        assert!(LearningState::Done.is_terminal());
        assert!(!LearningState::Decide.is_terminal());
    }

    #[test]
    fn test_strategy_kind_names() {
        for kind in [
            AdditionStrategyKind::NoOp,
            AdditionStrategyKind::Simple,
            AdditionStrategyKind::Matrix,
            AdditionStrategyKind::Matrix2,
            AdditionStrategyKind::MatrixMax,
            AdditionStrategyKind::MatrixVic,
        ] {
            assert_eq!(AdditionStrategyKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(
            ExchangeStrategyKind::from_str("min-distance"),
            Some(ExchangeStrategyKind::MinDistance)
        );
    }

    #[test]
    fn test_round_serializes() {
        let round = LearningRound {
            run_id: Uuid::nil(),
            round: 1,
            feature_set: vec![],
            final_error: 0.25,
            learning_size: 4,
            validation_size: 2,
            new_configurations: 0,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&round).unwrap();
        let back: LearningRound = serde_json::from_str(&json).unwrap();
        assert_eq!(back, round);
    }

    #[test]
    fn test_stop_reason_display() {
        assert_eq!(
            StopReason::ModelContract("2 models".into()).to_string(),
            "model contract violated: 2 models"
        );
    }
}
