//! Integration tests for the active-learning loop.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{builder, compressor_model, independent_model, SyntheticMeasurements, NFP};
use spl_sampler::adapters::learner::MockLearner;
use spl_sampler::adapters::rounds::JsonLinesRoundLog;
use spl_sampler::application::ActiveLearning;
use spl_sampler::domain::errors::DomainError;
use spl_sampler::domain::ports::Learner;
use spl_sampler::domain::models::{
    AdditionStrategyKind, BinaryOption, Configuration, ExchangeStrategyKind, LearningConfig,
    LearningState, LossFunction, StopReason, VariabilityModel,
};

fn settings() -> LearningConfig {
    LearningConfig {
        max_rounds: 10,
        min_improvement_per_round: 0.0,
        abort_error: 0.0,
        learning_tasks: vec!["featurewise".to_string()],
        resample_task: "allbinary".to_string(),
        ..LearningConfig::default()
    }
}

fn learning_loop(
    model: VariabilityModel,
    settings: LearningConfig,
    learner: &Arc<MockLearner>,
) -> ActiveLearning {
    ActiveLearning::new(
        settings,
        builder(model),
        Arc::clone(learner) as Arc<dyn Learner>,
        Arc::new(SyntheticMeasurements),
    )
    .unwrap()
}

#[tokio::test]
async fn test_loop_halts_at_max_rounds() {
    let learner = Arc::new(MockLearner::new(NFP).with_errors([0.9]));
    let mut active = learning_loop(
        compressor_model(),
        LearningConfig {
            max_rounds: 2,
            ..settings()
        },
        &learner,
    );

    let outcome = active.run().await.unwrap();

    assert_eq!(outcome.state, LearningState::Aborted);
    assert_eq!(outcome.stop_reason, StopReason::MaxRounds);
    assert_eq!(outcome.rounds.len(), 2);
    assert_eq!(learner.calls().await.len(), 2);
    // Feature-wise start plus every remaining configuration from the resample.
    assert_eq!(outcome.learning_set.len(), 12);
}

#[tokio::test]
async fn test_loop_never_exceeds_max_rounds() {
    let learner = Arc::new(MockLearner::new(NFP).with_errors([5.0, 4.0, 3.0, 2.0]));
    let mut active = learning_loop(
        independent_model(6),
        LearningConfig {
            max_rounds: 3,
            resample_task: "random seed:0 modulus:2".to_string(),
            ..settings()
        },
        &learner,
    );

    let outcome = active.run().await.unwrap();

    assert!(outcome.rounds.len() <= 3);
    match outcome.state {
        LearningState::Aborted => {
            assert_eq!(outcome.stop_reason, StopReason::MaxRounds);
            assert_eq!(outcome.rounds.len(), 3);
        }
        LearningState::Done => {
            assert_eq!(outcome.stop_reason, StopReason::NoNewConfigurations);
        }
        other => panic!("unexpected final state {other:?}"),
    }
}

#[tokio::test]
async fn test_loop_halts_after_first_round_below_abort_error() {
    let learner = Arc::new(MockLearner::new(NFP).with_errors([0.5]));
    let mut active = learning_loop(
        compressor_model(),
        LearningConfig {
            abort_error: 1.0,
            ..settings()
        },
        &learner,
    );

    let outcome = active.run().await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::ErrorBelowAbort);
    assert_eq!(outcome.rounds.len(), 1);
    assert_eq!(outcome.last_error(), Some(0.5));
    assert_eq!(active.state(), LearningState::Aborted);
}

/// The improvement threshold is compared with the last error itself, not
/// with the change since the previous round.
#[tokio::test]
async fn test_min_improvement_compares_absolute_error() {
    let learner = Arc::new(MockLearner::new(NFP).with_errors([0.9, 0.5]));
    let mut active = learning_loop(
        compressor_model(),
        LearningConfig {
            min_improvement_per_round: 0.6,
            ..settings()
        },
        &learner,
    );

    let outcome = active.run().await.unwrap();

    // Round 2 improved by 0.4 yet stops because 0.5 < 0.6.
    assert_eq!(outcome.stop_reason, StopReason::InsufficientImprovement);
    assert_eq!(outcome.rounds.len(), 2);
}

#[tokio::test]
async fn test_model_contract_violation_aborts_with_sets_intact() {
    let learner = Arc::new(MockLearner::new(NFP).with_models_per_fit(2));
    let mut active = learning_loop(compressor_model(), settings(), &learner);

    let outcome = active.run().await.unwrap();

    assert_eq!(outcome.state, LearningState::Aborted);
    match &outcome.stop_reason {
        StopReason::ModelContract(message) => assert!(message.contains("got 2")),
        other => panic!("expected a model contract stop, got {other:?}"),
    }
    assert!(outcome.rounds.is_empty());
    assert_eq!(outcome.learning_set.len(), 4);
    assert_eq!(outcome.validation_set.len(), 4);
    assert!(outcome.model.is_none());
}

#[tokio::test]
async fn test_empty_task_lists_fail_with_empty_learning_set() {
    let learner = Arc::new(MockLearner::new(NFP));
    let mut active = learning_loop(
        compressor_model(),
        LearningConfig {
            learning_tasks: Vec::new(),
            validation_tasks: Vec::new(),
            ..settings()
        },
        &learner,
    );

    let err = active.run().await.unwrap_err();
    assert!(matches!(err, DomainError::EmptyLearningSet));
    assert!(learner.calls().await.is_empty());
}

#[tokio::test]
async fn test_missing_set_mirrors_the_other() {
    let learner = Arc::new(MockLearner::new(NFP));
    let mut active = learning_loop(
        compressor_model(),
        LearningConfig {
            max_rounds: 1,
            learning_tasks: Vec::new(),
            validation_tasks: vec!["pairwise".to_string()],
            ..settings()
        },
        &learner,
    );

    let outcome = active.run().await.unwrap();

    assert!(!outcome.learning_set.is_empty());
    assert_eq!(outcome.learning_set, outcome.validation_set);
    assert!(outcome
        .learning_set
        .iter()
        .all(|c: &Configuration| c.nfp(NFP).is_some()));
}

#[tokio::test]
async fn test_exhausted_expansion_ends_in_done() {
    let learner = Arc::new(MockLearner::new(NFP).with_errors([0.9]));
    let mut active = learning_loop(
        compressor_model(),
        LearningConfig {
            resample_task: "featurewise".to_string(),
            ..settings()
        },
        &learner,
    );

    let outcome = active.run().await.unwrap();

    assert_eq!(outcome.state, LearningState::Done);
    assert_eq!(outcome.stop_reason, StopReason::NoNewConfigurations);
    assert_eq!(outcome.rounds.len(), 1);
    assert!(outcome.model.is_some());
}

#[tokio::test]
async fn test_feature_set_is_carried_forward_as_hint() {
    let learner = Arc::new(MockLearner::new(NFP).with_errors([0.9]));
    let mut active = learning_loop(
        compressor_model(),
        LearningConfig {
            max_rounds: 2,
            ..settings()
        },
        &learner,
    );

    let outcome = active.run().await.unwrap();
    let calls = learner.calls().await;

    assert_eq!(calls.len(), 2);
    assert!(calls[0].hint.is_none());
    assert_eq!(calls[1].hint.as_ref(), Some(&outcome.rounds[0].feature_set));
    assert_eq!(calls[1].learning_size, 12);
}

#[tokio::test]
async fn test_rounds_are_logged_as_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rounds").join("run.jsonl");
    let learner = Arc::new(MockLearner::new(NFP).with_errors([0.9, 0.7]));
    let mut active = learning_loop(
        compressor_model(),
        LearningConfig {
            max_rounds: 2,
            ..settings()
        },
        &learner,
    )
    .with_round_sink(Arc::new(JsonLinesRoundLog::new(&path)));

    let outcome = active.run().await.unwrap();
    let logged = JsonLinesRoundLog::read_all(&path).await.unwrap();

    assert_eq!(logged.len(), 2);
    assert_eq!(logged[0].round, 1);
    assert_eq!(logged[1].round, 2);
    assert!(logged.iter().all(|r| r.run_id == outcome.run_id));
    assert_eq!(logged[0].new_configurations, 0);
    assert_eq!(logged[1].new_configurations, 8);
    assert!((logged[1].final_error - 0.7).abs() < f64::EPSILON);
    assert_eq!(logged[1].learning_size, 12);
}

#[tokio::test]
async fn test_exchange_keeps_set_sizes_balanced() {
    let validation_task = "random seed:3 modulus:3";
    let fw: HashSet<Configuration> = {
        let mut b = builder(compressor_model());
        b.add_task_line("featurewise").unwrap();
        b.build(&[]).await.unwrap().into_iter().collect()
    };
    let validation: HashSet<Configuration> = {
        let mut b = builder(compressor_model());
        b.add_task_line(validation_task).unwrap();
        b.build(&[]).await.unwrap().into_iter().collect()
    };
    let new = 12 - fw.union(&validation).count();

    let learner = Arc::new(MockLearner::new(NFP).with_errors([0.9]));
    let mut active = learning_loop(
        compressor_model(),
        LearningConfig {
            max_rounds: 2,
            validation_tasks: vec![validation_task.to_string()],
            exchange_strategy: ExchangeStrategyKind::PerformanceHistogram,
            exchange_percentage: 0.5,
            loss_function: LossFunction::Absolute,
            ..settings()
        },
        &learner,
    );

    let outcome = active.run().await.unwrap();

    assert_eq!(outcome.rounds.len(), 2);
    assert_eq!(outcome.validation_set.len(), validation.len());
    assert_eq!(outcome.learning_set.len(), fw.len() + new);
}

#[tokio::test]
async fn test_mirrored_sets_stay_duplicate_free_under_exchange() {
    let learner = Arc::new(MockLearner::new(NFP).with_errors([0.9]));
    let mut active = learning_loop(
        compressor_model(),
        LearningConfig {
            max_rounds: 2,
            validation_tasks: Vec::new(),
            exchange_strategy: ExchangeStrategyKind::MinDistance,
            exchange_percentage: 0.5,
            ..settings()
        },
        &learner,
    );

    let outcome = active.run().await.unwrap();

    assert_eq!(outcome.rounds.len(), 2);
    for set in [&outcome.learning_set, &outcome.validation_set] {
        let unique: HashSet<&Configuration> = set.iter().collect();
        assert_eq!(unique.len(), set.len());
    }
    assert_eq!(outcome.learning_set.len(), 12);
}

#[tokio::test]
async fn test_matrix_without_candidates_aborts_with_sets_intact() {
    // Every option is mandatory, so no option can be forced.
    let model = VariabilityModel::builder("fixed")
        .binary(BinaryOption::mandatory("root"))
        .binary(BinaryOption::mandatory("core").with_parent("root"))
        .build()
        .unwrap();
    let learner = Arc::new(MockLearner::new(NFP).with_errors([0.9]));
    let mut active = learning_loop(
        model,
        LearningConfig {
            learning_tasks: vec!["allbinary".to_string()],
            addition_strategy: AdditionStrategyKind::Matrix,
            ..settings()
        },
        &learner,
    );

    let outcome = active.run().await.unwrap();

    assert_eq!(outcome.state, LearningState::Aborted);
    assert!(matches!(
        outcome.stop_reason,
        StopReason::ValidationSetTooSmall(ref message) if message.contains("matrix")
    ));
    assert_eq!(outcome.rounds.len(), 1);
    assert_eq!(outcome.learning_set.len(), 1);
    assert_eq!(outcome.validation_set.len(), 1);
    assert!(outcome.model.is_some());
}

#[test]
fn test_unknown_resample_task_is_rejected() {
    let learner = Arc::new(MockLearner::new(NFP));
    let result = ActiveLearning::new(
        LearningConfig {
            resample_task: "plackettburman".to_string(),
            ..settings()
        },
        builder(compressor_model()),
        learner,
        Arc::new(SyntheticMeasurements),
    );
    assert!(matches!(result, Err(DomainError::UnknownStrategy(_))));
}

#[test]
fn test_loss_metrics_for_predicted_nine_real_ten() {
    assert!((LossFunction::Relative.error(9.0, 10.0) - 0.1).abs() < 1e-12);
    assert!((LossFunction::Absolute.error(9.0, 10.0) - 1.0).abs() < 1e-12);
    assert!((LossFunction::LeastSquares.error(9.0, 10.0) - 1.0).abs() < 1e-12);
}
