pub mod config;
pub mod configuration;
pub mod constraint;
pub mod expression;
pub mod fitted_model;
pub mod learning;
pub mod loss;
pub mod option;
pub mod sampling_task;
pub mod solver;
pub mod variability_model;

pub use config::{Config, LearningConfig, LoggingConfig, SamplingConfig, SolverConfig};
pub use configuration::Configuration;
pub use constraint::{
    BooleanConstraint, Comparator, Constraint, Literal, MixedConstraint, NonBooleanConstraint,
    Polarity, Requirement,
};
pub use expression::{ArithOp, Expr};
pub use fitted_model::{FeatureSet, FittedModel, InfluenceTerm};
pub use learning::{
    AdditionStrategyKind, ExchangeStrategyKind, LearningOutcome, LearningRound, LearningState,
    StopReason,
};
pub use loss::LossFunction;
pub use option::{BinaryOption, BinarySetting, ConfigurationOption, NumericOption, OptionSet};
pub use sampling_task::{BinaryStrategy, ParsedTask, SamplingTask, StrategyKind};
pub use solver::{FeatureWeights, SolverType};
pub use variability_model::VariabilityModel;
