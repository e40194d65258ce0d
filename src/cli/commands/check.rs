//! `check`: load a model and report its structure.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::solvers::SolverRegistry;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, ConfigurationOption, OptionSet, VariabilityModel};
use crate::services::SolverFacade;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Variability model (YAML)
    #[arg(short, long)]
    pub model: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct CheckOutput {
    pub model: String,
    pub binary_options: usize,
    pub numeric_options: usize,
    pub constraints: usize,
    pub alternative_groups: Vec<Vec<String>>,
    pub sampling_candidates: Vec<String>,
    pub satisfiable: bool,
    pub minimal_configuration: Option<Vec<String>>,
}

impl CommandOutput for CheckOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Model: {}", self.model),
            format!(
                "Options: {} binary, {} numeric; {} constraint(s)",
                self.binary_options, self.numeric_options, self.constraints
            ),
        ];
        if self.alternative_groups.is_empty() {
            lines.push("Alternative groups: none".to_string());
        } else {
            lines.push("Alternative groups:".to_string());
            for group in &self.alternative_groups {
                lines.push(format!("  {}", group.join(" | ")));
            }
        }
        lines.push(format!(
            "Sampling candidates: {}",
            self.sampling_candidates.join(", ")
        ));
        match &self.minimal_configuration {
            Some(minimal) if self.satisfiable => {
                lines.push(format!("Satisfiable: yes (minimal: {})", minimal.join(",")));
            }
            _ => lines.push("Satisfiable: no".to_string()),
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: CheckArgs, config: &Config, json_mode: bool) -> Result<()> {
    let result = run(args, config).await?;
    output(&result, json_mode);
    Ok(())
}

pub async fn run(args: CheckArgs, config: &Config) -> Result<CheckOutput> {
    let model = VariabilityModel::load(&args.model)
        .await
        .with_context(|| format!("Failed to load model from {}", args.model.display()))?;

    let registry = SolverRegistry::from_config(&config.solver);
    let facade = SolverFacade::from_registry(Arc::new(model), &registry, config.solver.backend)
        .context("Failed to create solver backend")?;

    let empty = OptionSet::new();
    let satisfiable = facade.is_satisfiable(&empty, true).await?;
    let minimal = facade.find_minimal_completion(&empty, &empty).await?;
    let model = facade.model();

    Ok(CheckOutput {
        model: model.name().to_string(),
        binary_options: model.binary_options().len(),
        numeric_options: model.numeric_options().len(),
        constraints: model.constraints().len(),
        alternative_groups: model
            .alternative_groups()
            .into_iter()
            .map(|group| group.into_iter().collect())
            .collect(),
        sampling_candidates: model
            .sampling_candidates()
            .into_iter()
            .map(|option| option.name().to_string())
            .collect(),
        satisfiable,
        minimal_configuration: minimal.map(|set| set.into_iter().collect()),
    })
}
