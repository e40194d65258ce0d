//! spl-sampler CLI entry point.

use clap::Parser;

use spl_sampler::cli::commands::{check, load_config, sample};
use spl_sampler::cli::{handle_error, Cli, Commands};
use spl_sampler::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => handle_error(&err, cli.json),
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => logger,
        Err(err) => handle_error(&err, cli.json),
    };

    let result = match cli.command {
        Commands::Sample(args) => sample::execute(args, &config, cli.json).await,
        Commands::Check(args) => check::execute(args, &config, cli.json).await,
    };

    if let Err(err) = result {
        handle_error(&err, cli.json);
    }
}
