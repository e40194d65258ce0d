//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces that adapters implement:
//! - SatisfiabilityChecker / VariantGenerator: the solver boundary
//! - Learner: influence-model fitting
//! - NumericDesign: numeric experimental designs
//! - MeasurementSource: NFP measurements for new configurations
//! - RoundSink: persistence of learning rounds

pub mod learner;
pub mod measurement;
pub mod numeric_design;
pub mod round_sink;
pub mod solver;

pub use learner::Learner;
pub use measurement::MeasurementSource;
pub use numeric_design::{NumericAssignment, NumericDesign};
pub use round_sink::RoundSink;
pub use solver::{SatisfiabilityChecker, SolverBackend, VariantGenerator};
