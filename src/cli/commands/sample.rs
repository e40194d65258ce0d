//! `sample`: run sampling tasks and print the resulting configurations.

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::adapters::solvers::SolverRegistry;
use crate::cli::output::{list_table, output, render_list, CommandOutput};
use crate::domain::models::{Config, Configuration, ParsedTask, SolverType, VariabilityModel};
use crate::services::{ConfigurationBuilder, SolverFacade};

#[derive(Args, Debug)]
pub struct SampleArgs {
    /// Variability model (YAML)
    #[arg(short, long)]
    pub model: PathBuf,

    /// Sampling task, e.g. "pairwise" or "random seed:3 modulus:5"; repeatable
    #[arg(short, long = "task")]
    pub tasks: Vec<String>,

    /// Solver backend (varisat, process); overrides solver.backend
    #[arg(short, long)]
    pub backend: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConfigurationOutput {
    pub selected: Vec<String>,
    pub numeric: BTreeMap<String, f64>,
}

impl From<&Configuration> for ConfigurationOutput {
    fn from(config: &Configuration) -> Self {
        Self {
            selected: config.selected_options().into_iter().collect(),
            numeric: config.numeric_options().clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SampleOutput {
    pub model: String,
    pub backend: String,
    pub tasks: Vec<String>,
    pub configurations: Vec<ConfigurationOutput>,
    pub total: usize,
}

impl CommandOutput for SampleOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["#", "selected", "numeric"]);
        for (index, config) in self.configurations.iter().enumerate() {
            let numeric: Vec<String> = config
                .numeric
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            table.add_row(vec![
                (index + 1).to_string(),
                config.selected.join(","),
                numeric.join(","),
            ]);
        }
        let header = format!(
            "Model: {}  Backend: {}  Tasks: {}\n",
            self.model,
            self.backend,
            self.tasks.join(" | ")
        );
        format!("{header}{}", render_list("configuration", &table, self.total))
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn resolve_backend(requested: Option<&str>, config: &Config) -> Result<SolverType> {
    match requested {
        Some(name) => SolverType::from_str(name)
            .with_context(|| format!("Unknown solver backend: {name}. Must be one of: varisat, process")),
        None => Ok(config.solver.backend),
    }
}

pub async fn execute(args: SampleArgs, config: &Config, json_mode: bool) -> Result<()> {
    let result = run(args, config).await?;
    output(&result, json_mode);
    Ok(())
}

/// Build configurations without printing them.
pub async fn run(args: SampleArgs, config: &Config) -> Result<SampleOutput> {
    let backend = resolve_backend(args.backend.as_deref(), config)?;
    let model = VariabilityModel::load(&args.model)
        .await
        .with_context(|| format!("Failed to load model from {}", args.model.display()))?;

    let registry = SolverRegistry::from_config(&config.solver);
    let facade = SolverFacade::from_registry(Arc::new(model), &registry, backend)
        .context("Failed to create solver backend")?;
    let mut builder = ConfigurationBuilder::new(facade);

    let tasks = if args.tasks.is_empty() {
        config.sampling.tasks.clone()
    } else {
        args.tasks
    };
    for line in &tasks {
        if let ParsedTask::Unhandled(line) = builder.add_task_line(line)? {
            bail!("Unknown sampling strategy: {line}");
        }
    }

    let configurations = builder.build(&[]).await?;
    info!(
        model = builder.solver().model().name(),
        configurations = configurations.len(),
        "sampling finished"
    );

    Ok(SampleOutput {
        model: builder.solver().model().name().to_string(),
        backend: backend.to_string(),
        tasks,
        total: configurations.len(),
        configurations: configurations.iter().map(ConfigurationOutput::from).collect(),
    })
}
