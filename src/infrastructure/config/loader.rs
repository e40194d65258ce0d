use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::SolverType;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Process solver backend requires a non-empty solver.command")]
    EmptySolverCommand,

    #[error("Invalid max_rounds: {0}. Must be at least 1")]
    InvalidMaxRounds(usize),

    #[error("Invalid {name}: {value}. Must be a finite, non-negative number")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("Invalid exchange_percentage: {0}. Must be between 0 and 1")]
    InvalidExchangePercentage(f64),

    #[error("learning.resample_task cannot be empty")]
    EmptyResampleTask,

    #[error("learning.nfp cannot be empty")]
    EmptyNfp,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .spl-sampler/config.yaml (project config)
    /// 3. .spl-sampler/local.yaml (local overrides, optional)
    /// 4. Environment variables (SPL_SAMPLER_* prefix, `__` separates sections)
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment()
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file; environment variables still
    /// take precedence.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("SPL_SAMPLER_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".spl-sampler/config.yaml"))
            .merge(Yaml::file(".spl-sampler/local.yaml"))
            .merge(Env::prefixed("SPL_SAMPLER_").split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        if config.solver.backend == SolverType::Process && config.solver.command.trim().is_empty() {
            return Err(ConfigError::EmptySolverCommand);
        }

        let learning = &config.learning;
        if learning.max_rounds == 0 {
            return Err(ConfigError::InvalidMaxRounds(learning.max_rounds));
        }

        for (name, value) in [
            ("min_improvement_per_round", learning.min_improvement_per_round),
            ("abort_error", learning.abort_error),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }

        if !(0.0..=1.0).contains(&learning.exchange_percentage) {
            return Err(ConfigError::InvalidExchangePercentage(
                learning.exchange_percentage,
            ));
        }

        if learning.resample_task.trim().is_empty() {
            return Err(ConfigError::EmptyResampleTask);
        }

        if learning.nfp.trim().is_empty() {
            return Err(ConfigError::EmptyNfp);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AdditionStrategyKind, LossFunction};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.learning.max_rounds, 10);
        assert_eq!(config.learning.resample_task, "pairwise");
        assert_eq!(config.solver.backend, SolverType::Varisat);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
logging:
  level: debug
  format: json
solver:
  backend: varisat
learning:
  max_rounds: 4
  loss_function: least_squares
  addition_strategy: matrix_max
  exchange_percentage: 0.25
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.learning.max_rounds, 4);
        assert_eq!(config.learning.loss_function, LossFunction::LeastSquares);
        assert_eq!(
            config.learning.addition_strategy,
            AdditionStrategyKind::MatrixMax
        );
        assert!((config.learning.exchange_percentage - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.sampling.tasks, vec!["featurewise".to_string()]);

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidLogFormat(_)
        ));
    }

    #[test]
    fn test_validate_invalid_rotation() {
        let mut config = Config::default();
        config.logging.rotation = "weekly".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidRotation(_)
        ));
    }

    #[test]
    fn test_validate_process_backend_needs_command() {
        let mut config = Config::default();
        config.solver.backend = SolverType::Process;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::EmptySolverCommand
        ));

        config.solver.command = "/usr/bin/choco-bridge".to_string();
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_rounds() {
        let mut config = Config::default();
        config.learning.max_rounds = 0;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidMaxRounds(0)
        ));
    }

    #[test]
    fn test_validate_negative_threshold() {
        let mut config = Config::default();
        config.learning.abort_error = -1.0;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidThreshold {
                name: "abort_error",
                ..
            }
        ));
    }

    #[test]
    fn test_validate_exchange_percentage() {
        let mut config = Config::default();
        config.learning.exchange_percentage = 1.5;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidExchangePercentage(_)
        ));
    }

    #[test]
    fn test_validate_empty_resample_task() {
        let mut config = Config::default();
        config.learning.resample_task = "  ".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::EmptyResampleTask
        ));
    }

    #[test]
    fn test_hierarchical_merging() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "logging:\n  level: info\n  format: json\nlearning:\n  max_rounds: 3"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "logging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.logging.level, "debug", "Override should win");
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
        assert_eq!(config.learning.max_rounds, 3);
    }
}
