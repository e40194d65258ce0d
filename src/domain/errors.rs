//! Domain errors for the sampling and active-learning core.

use thiserror::Error;

/// Domain-level errors that can occur while sampling or learning.
///
/// Unsatisfiable solver requests are not errors: they surface as `None` or an
/// empty result at the call site.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Learner must return exactly one fitted model, got {0}")]
    ModelContract(usize),

    #[error("Validation set too small: no candidate option qualifies for {strategy}")]
    ValidationSetTooSmall { strategy: String },

    #[error("Empty learning set: neither learning nor validation configurations were sampled")]
    EmptyLearningSet,

    #[error("Solver is bound to model '{bound}' and cannot switch to '{requested}'")]
    ModelBinding { bound: String, requested: String },

    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Unknown sampling strategy: {0}")]
    UnknownStrategy(String),

    #[error("Invalid parameter {key}={value} for {strategy}: {reason}")]
    InvalidParameter {
        strategy: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("Invalid variability model: {0}")]
    InvalidModel(String),

    #[error("Invalid constraint '{constraint}': {reason}")]
    InvalidConstraint { constraint: String, reason: String },

    #[error("Solver transport failed: {message}")]
    Transport { message: String, diagnostics: String },

    #[error("Solver failure: {0}")]
    SolverFailure(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Shorthand for a transport error without backend diagnostics.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            diagnostics: String::new(),
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for DomainError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
