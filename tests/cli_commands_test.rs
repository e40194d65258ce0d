//! Integration tests for the `sample` and `check` commands.

mod common;

use common::write_model_file;
use spl_sampler::cli::commands::{check, sample};
use spl_sampler::cli::output::CommandOutput;
use spl_sampler::domain::models::Config;

#[tokio::test]
async fn test_sample_command_builds_configurations() {
    let (_dir, path) = write_model_file();
    let args = sample::SampleArgs {
        model: path,
        tasks: vec!["pairwise".to_string()],
        backend: None,
    };

    let result = sample::run(args, &Config::default()).await.unwrap();

    assert_eq!(result.model, "compressor");
    assert_eq!(result.backend, "varisat");
    assert_eq!(result.total, result.configurations.len());
    assert!(result.total > 0);
    assert!(result
        .configurations
        .iter()
        .all(|c| c.selected.contains(&"root".to_string())));
    assert_eq!(result.to_json()["tasks"][0], "pairwise");
}

#[tokio::test]
async fn test_sample_command_falls_back_to_configured_tasks() {
    let (_dir, path) = write_model_file();
    let args = sample::SampleArgs {
        model: path,
        tasks: Vec::new(),
        backend: Some("varisat".to_string()),
    };

    let result = sample::run(args, &Config::default()).await.unwrap();
    assert_eq!(result.tasks, vec!["featurewise".to_string()]);
}

#[tokio::test]
async fn test_sample_command_rejects_unknown_strategy() {
    let (_dir, path) = write_model_file();
    let args = sample::SampleArgs {
        model: path,
        tasks: vec!["plackettburman".to_string()],
        backend: None,
    };

    let err = sample::run(args, &Config::default()).await.unwrap_err();
    assert!(err.to_string().contains("Unknown sampling strategy"));
}

#[tokio::test]
async fn test_sample_command_reports_missing_model() {
    let dir = tempfile::tempdir().unwrap();
    let args = sample::SampleArgs {
        model: dir.path().join("missing.yaml"),
        tasks: Vec::new(),
        backend: None,
    };

    let err = sample::run(args, &Config::default()).await.unwrap_err();
    assert!(err.to_string().contains("Failed to load model"));
}

#[tokio::test]
async fn test_check_command_reports_structure() {
    let (_dir, path) = write_model_file();
    let result = check::run(check::CheckArgs { model: path }, &Config::default())
        .await
        .unwrap();

    assert_eq!(result.binary_options, 5);
    assert_eq!(result.numeric_options, 0);
    assert_eq!(
        result.alternative_groups,
        vec![vec!["bzip2".to_string(), "gzip".to_string()]]
    );
    assert_eq!(
        result.sampling_candidates,
        vec!["cache", "compression", "gzip", "bzip2"]
    );
    assert!(result.satisfiable);
    assert_eq!(result.minimal_configuration, Some(vec!["root".to_string()]));
    assert!(result.to_human().contains("gzip | bzip2") || result.to_human().contains("bzip2 | gzip"));
}
