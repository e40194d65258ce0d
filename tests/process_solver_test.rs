//! Integration tests for the out-of-process solver backend, driven by a
//! scripted stand-in solver.

#![cfg(unix)]

mod common;

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use common::{compressor_model, independent_model, set};
use spl_sampler::adapters::solvers::{ProcessSolver, ProcessSolverConfig};
use spl_sampler::domain::errors::DomainError;
use spl_sampler::domain::models::FeatureWeights;
use spl_sampler::domain::ports::{SatisfiabilityChecker, VariantGenerator};
use spl_sampler::services::{ConfigurationBuilder, SolverFacade};

const SCRIPT: &str = r#"#!/bin/sh
while IFS= read -r line; do
  case "$line" in
    "model "*) echo ok ;;
    "sat full "*) echo true ;;
    "sat partial "*) echo false ;;
    "complete "*) echo "root,cache" ;;
    "enumerate "*) echo "root;root,cache" ;;
    "reset") echo ok ;;
    *) echo "unsupported: $line" >&2; echo "error: unsupported request" ;;
  esac
done
"#;

fn scripted_solver() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("solver.sh");
    std::fs::write(&path, SCRIPT).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    (dir, path)
}

fn process_solver(path: &PathBuf) -> ProcessSolver {
    ProcessSolver::new(ProcessSolverConfig::new(path.display().to_string()))
}

#[tokio::test]
async fn test_queries_round_trip_over_the_line_protocol() {
    let (_dir, path) = scripted_solver();
    let solver = process_solver(&path);
    let model = compressor_model();

    assert!(solver
        .is_satisfiable(&model, &set(&["root"]), false)
        .await
        .unwrap());
    assert!(!solver
        .is_satisfiable(&model, &set(&["root"]), true)
        .await
        .unwrap());
    assert_eq!(
        solver
            .find_minimal_completion(&model, &set(&["cache"]), &set(&[]))
            .await
            .unwrap(),
        Some(set(&["root", "cache"]))
    );
    assert_eq!(
        solver.enumerate_up_to(&model, -1).await.unwrap(),
        vec![set(&["root"]), set(&["root", "cache"])]
    );
    solver.reset_cache().await.unwrap();
}

#[tokio::test]
async fn test_error_line_becomes_transport_error_with_diagnostics() {
    let (_dir, path) = scripted_solver();
    let solver = process_solver(&path);
    let model = compressor_model();

    let err = solver
        .generate_bucket(&model, 2, &FeatureWeights::new())
        .await
        .unwrap_err();

    match err {
        DomainError::Transport {
            message,
            diagnostics,
        } => {
            assert_eq!(message, "unsupported request");
            assert!(diagnostics.contains("unsupported: bucket 2 -"));
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_second_model_cannot_be_bound() {
    let (_dir, path) = scripted_solver();
    let solver = process_solver(&path);

    solver
        .is_satisfiable(&compressor_model(), &set(&[]), true)
        .await
        .unwrap();
    let err = solver
        .is_satisfiable(&independent_model(2), &set(&[]), true)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DomainError::ModelBinding { ref bound, ref requested }
            if bound == "compressor" && requested == "independent-2"
    ));
}

#[tokio::test]
async fn test_missing_executable_is_a_transport_error() {
    let solver = ProcessSolver::new(ProcessSolverConfig::new("/nonexistent/spl-solver"));
    let err = solver
        .is_satisfiable(&compressor_model(), &set(&[]), true)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Transport { .. }));
}

#[tokio::test]
async fn test_builder_runs_over_process_backend() {
    let (_dir, path) = scripted_solver();
    let facade = SolverFacade::new(Arc::new(compressor_model()), Arc::new(process_solver(&path)));
    let mut builder = ConfigurationBuilder::new(facade);
    builder.add_task_line("featurewise").unwrap();

    let configurations = builder.build(&[]).await.unwrap();

    // The stand-in answers every completion with the same selection.
    assert_eq!(configurations.len(), 1);
    assert_eq!(configurations[0].selected_options(), set(&["root", "cache"]));
    assert_eq!(builder.solver().backend_name(), "process");
}
