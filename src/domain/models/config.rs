use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::learning::{AdditionStrategyKind, ExchangeStrategyKind};
use super::loss::LossFunction;
use super::solver::SolverType;

/// Main configuration structure for spl-sampler
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Solver backend selection
    #[serde(default)]
    pub solver: SolverConfig,

    /// Default sampling tasks for the `sample` command
    #[serde(default)]
    pub sampling: SamplingConfig,

    /// Active-learning parameters
    #[serde(default)]
    pub learning: LearningConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation of the log file: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Solver backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct SolverConfig {
    #[serde(default)]
    pub backend: SolverType,

    /// Executable of the external solver (process backend only)
    #[serde(default)]
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,
}

/// Sampling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SamplingConfig {
    /// Task lines run when none are given on the command line
    #[serde(default = "default_sampling_tasks")]
    pub tasks: Vec<String>,
}

fn default_sampling_tasks() -> Vec<String> {
    vec!["featurewise".to_string()]
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            tasks: default_sampling_tasks(),
        }
    }
}

/// Active-learning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LearningConfig {
    /// Upper bound on the number of rounds
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Stop once the last error drops below this value. Compared against
    /// the error itself, not the change since the previous round.
    #[serde(default = "default_min_improvement")]
    pub min_improvement_per_round: f64,

    /// Stop once the last error drops below this value
    #[serde(default = "default_abort_error")]
    pub abort_error: f64,

    #[serde(default)]
    pub loss_function: LossFunction,

    /// Name of the non-functional property being learned
    #[serde(default = "default_nfp")]
    pub nfp: String,

    /// Task lines that build the initial learning set
    #[serde(default = "default_learning_tasks")]
    pub learning_tasks: Vec<String>,

    /// Task lines that build the initial validation set
    #[serde(default)]
    pub validation_tasks: Vec<String>,

    /// Task line the builder switches to after the first round
    #[serde(default = "default_resample_task")]
    pub resample_task: String,

    #[serde(default)]
    pub addition_strategy: AdditionStrategyKind,

    #[serde(default)]
    pub exchange_strategy: ExchangeStrategyKind,

    /// Share of the validation set swapped per exchange, in [0, 1]
    #[serde(default = "default_exchange_percentage")]
    pub exchange_percentage: f64,

    /// JSON-lines file receiving one record per round
    #[serde(default)]
    pub round_log: Option<PathBuf>,
}

const fn default_max_rounds() -> usize {
    10
}

const fn default_min_improvement() -> f64 {
    0.0
}

const fn default_abort_error() -> f64 {
    0.01
}

fn default_nfp() -> String {
    "performance".to_string()
}

fn default_learning_tasks() -> Vec<String> {
    vec!["featurewise".to_string()]
}

fn default_resample_task() -> String {
    "pairwise".to_string()
}

const fn default_exchange_percentage() -> f64 {
    0.1
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            min_improvement_per_round: default_min_improvement(),
            abort_error: default_abort_error(),
            loss_function: LossFunction::default(),
            nfp: default_nfp(),
            learning_tasks: default_learning_tasks(),
            validation_tasks: Vec::new(),
            resample_task: default_resample_task(),
            addition_strategy: AdditionStrategyKind::default(),
            exchange_strategy: ExchangeStrategyKind::default(),
            exchange_percentage: default_exchange_percentage(),
            round_log: None,
        }
    }
}
