//! Adapters implementing the domain ports.

pub mod learner;
pub mod measurement;
pub mod rounds;
pub mod solvers;
