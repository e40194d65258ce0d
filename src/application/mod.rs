pub mod active_learning;

pub use active_learning::ActiveLearning;
