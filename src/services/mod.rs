//! Domain services: sampling, configuration assembly and the learning
//! strategies that pick new configurations between rounds.

pub mod addition;
pub mod configuration_builder;
pub mod error_metrics;
pub mod exchange;
pub mod sampling;
pub mod solver_facade;

pub use addition::AdditionStrategy;
pub use configuration_builder::ConfigurationBuilder;
pub use error_metrics::{ScoredConfig, SortedConfigsByError};
pub use exchange::ExchangeStrategy;
pub use sampling::{sample_binary, SampleSet};
pub use solver_facade::SolverFacade;
