//! Common test utilities for integration tests
//!
//! Shared variability models, solver wiring, and synthetic measurement and
//! design collaborators used across the integration test files.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use spl_sampler::adapters::solvers::VarisatSolver;
use spl_sampler::domain::errors::DomainResult;
use spl_sampler::domain::models::{
    BinaryOption, Configuration, NumericOption, OptionSet, SamplingTask, VariabilityModel,
};
use spl_sampler::domain::ports::{MeasurementSource, NumericAssignment, NumericDesign};
use spl_sampler::services::{ConfigurationBuilder, SolverFacade};

pub const NFP: &str = "performance";

/// Root with optional `cache`, `log` and an optional `compression` feature
/// whose two codecs form an alternative group.
pub fn compressor_model() -> VariabilityModel {
    VariabilityModel::builder("compressor")
        .binary(BinaryOption::mandatory("root"))
        .binary(BinaryOption::new("cache").with_parent("root"))
        .binary(BinaryOption::new("log").with_parent("root"))
        .binary(BinaryOption::new("compression").with_parent("root"))
        .binary(
            BinaryOption::mandatory("gzip")
                .with_parent("compression")
                .excluding(["bzip2"]),
        )
        .binary(
            BinaryOption::mandatory("bzip2")
                .with_parent("compression")
                .excluding(["gzip"]),
        )
        .build()
        .expect("compressor model is valid")
}

/// Root plus `count` independent optional children `o0`, `o1`, ...
pub fn independent_model(count: usize) -> VariabilityModel {
    let mut builder = VariabilityModel::builder(format!("independent-{count}"))
        .binary(BinaryOption::mandatory("root"));
    for i in 0..count {
        builder = builder.binary(BinaryOption::new(format!("o{i}")).with_parent("root"));
    }
    builder.build().expect("independent model is valid")
}

/// Optional `turbo` plus a numeric `threads` option and a constraint tying
/// them together.
pub fn numeric_model() -> VariabilityModel {
    VariabilityModel::builder("server")
        .binary(BinaryOption::mandatory("root"))
        .binary(BinaryOption::new("turbo").with_parent("root"))
        .numeric(NumericOption::new("threads", 1.0, 4.0).with_step("n + 1"))
        .non_boolean_constraint("threads + turbo <= 4")
        .build()
        .expect("numeric model is valid")
}

pub const COMPRESSOR_YAML: &str = r"
name: compressor
binary_options:
  - name: root
    optional: false
  - name: cache
    parent: root
  - name: compression
    parent: root
  - name: gzip
    parent: compression
    optional: false
    excluded: [[bzip2]]
  - name: bzip2
    parent: compression
    optional: false
    excluded: [[gzip]]
";

/// Write [`COMPRESSOR_YAML`] into a fresh temporary directory.
pub fn write_model_file() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("compressor.yaml");
    std::fs::write(&path, COMPRESSOR_YAML).expect("Failed to write model file");
    (dir, path)
}

pub fn facade(model: VariabilityModel) -> SolverFacade {
    SolverFacade::new(Arc::new(model), Arc::new(VarisatSolver::new()))
}

pub fn builder(model: VariabilityModel) -> ConfigurationBuilder {
    ConfigurationBuilder::new(facade(model))
}

pub fn set(names: &[&str]) -> OptionSet {
    names.iter().map(|name| (*name).to_string()).collect()
}

/// Measures every configuration: one unit per selected option, plus the
/// numeric values, plus a bonus when `cache` and `gzip` are selected together.
pub struct SyntheticMeasurements;

impl SyntheticMeasurements {
    pub fn value_of(config: &Configuration) -> f64 {
        let selected = config.selected_options();
        let mut value = 10.0 + selected.len() as f64;
        value += config.numeric_options().values().sum::<f64>();
        if selected.contains("cache") && selected.contains("gzip") {
            value += 25.0;
        }
        value
    }
}

#[async_trait]
impl MeasurementSource for SyntheticMeasurements {
    async fn measure(&self, configurations: Vec<Configuration>) -> DomainResult<Vec<Configuration>> {
        Ok(configurations
            .into_iter()
            .map(|config| {
                let value = Self::value_of(&config);
                config.with_nfp(NFP, value)
            })
            .collect())
    }
}

/// Full-factorial design over the numeric options it is given.
pub struct FullFactorial;

#[async_trait]
impl NumericDesign for FullFactorial {
    fn name(&self) -> &str {
        "fullfactorial"
    }

    async fn generate(
        &self,
        options: &[NumericOption],
        _task: &SamplingTask,
    ) -> DomainResult<Vec<NumericAssignment>> {
        let mut assignments = vec![BTreeMap::new()];
        for option in options {
            let domain = option.value_domain().unwrap_or_default();
            let mut next = Vec::new();
            for assignment in &assignments {
                for value in &domain {
                    let mut extended = assignment.clone();
                    extended.insert(option.name.clone(), *value);
                    next.push(extended);
                }
            }
            assignments = next;
        }
        Ok(assignments)
    }
}
