//! Solver backends.

pub mod process;
pub mod registry;
pub mod varisat;

pub use process::{ProcessSolver, ProcessSolverConfig};
pub use registry::SolverRegistry;
pub use self::varisat::VarisatSolver;
