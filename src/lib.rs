//! spl-sampler: constraint-aware sampling and active learning over software
//! product line variability models.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): options, constraints, variability models,
//!   configurations, sampling tasks, and the port traits
//! - **Adapters** (`adapters`): SAT backends, measurement tables, round logs
//! - **Service Layer** (`services`): sampling heuristics, the configuration
//!   builder, addition and exchange strategies
//! - **Application Layer** (`application`): the active-learning loop
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use spl_sampler::{ConfigurationBuilder, SolverFacade, VariabilityModel, VarisatSolver};
//!
//! let model = Arc::new(VariabilityModel::load("model.yaml").await?);
//! let facade = SolverFacade::new(model, Arc::new(VarisatSolver::new()));
//! let mut builder = ConfigurationBuilder::new(facade);
//! builder.add_task_line("pairwise")?;
//! let configurations = builder.build(&[]).await?;
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use adapters::solvers::{ProcessSolver, ProcessSolverConfig, SolverRegistry, VarisatSolver};
pub use application::ActiveLearning;
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Config, Configuration, FittedModel, LearningOutcome, LearningState, SamplingTask,
    StopReason, VariabilityModel,
};
pub use domain::ports::{Learner, MeasurementSource, RoundSink, SolverBackend};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ConfigurationBuilder, SolverFacade};
