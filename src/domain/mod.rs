//! Domain layer for spl-sampler
//!
//! Variability models, configurations, sampling tasks and learning records,
//! plus the ports through which solvers, learners and measurements are reached.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
