//! Measurement sources.

pub mod table;

pub use table::MeasurementTable;
