//! Learner adapters.

pub mod mock;

pub use mock::{MockFitCall, MockLearner};
