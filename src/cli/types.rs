//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::check::CheckArgs;
use super::commands::sample::SampleArgs;

#[derive(Parser, Debug)]
#[command(name = "spl-sampler")]
#[command(about = "Constraint-aware sampling over software product line variability models", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file; defaults to .spl-sampler/config.yaml and local.yaml
    #[arg(short, long, global = true, env = "SPL_SAMPLER_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run sampling tasks over a model and print the configurations
    Sample(SampleArgs),

    /// Load a model and report its structure and satisfiability
    Check(CheckArgs),
}
