//! Active learning: alternate model fitting with targeted resampling.
//!
//! ```text
//! Init -> Fit -> Evaluate -> Decide -> Expand -> Fit -> ...
//!                              |          |
//!                           Aborted      Done
//! ```
//!
//! Rounds run strictly one after another; nothing is spawned.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Configuration, FeatureSet, FittedModel, LearningConfig, LearningOutcome, LearningRound,
    LearningState, ParsedTask, SamplingTask, StopReason,
};
use crate::domain::ports::{Learner, MeasurementSource, RoundSink};
use crate::services::addition::AdditionStrategy;
use crate::services::configuration_builder::ConfigurationBuilder;
use crate::services::exchange::ExchangeStrategy;

/// Outcome of the Decide step.
fn decide(settings: &LearningConfig, round: usize, last_error: f64) -> Option<StopReason> {
    if round >= settings.max_rounds {
        Some(StopReason::MaxRounds)
    } else if last_error < settings.min_improvement_per_round {
        Some(StopReason::InsufficientImprovement)
    } else if last_error < settings.abort_error {
        Some(StopReason::ErrorBelowAbort)
    } else {
        None
    }
}

/// Drives the learning loop over one configuration builder.
pub struct ActiveLearning {
    settings: LearningConfig,
    builder: ConfigurationBuilder,
    learner: Arc<dyn Learner>,
    measurements: Arc<dyn MeasurementSource>,
    sink: Option<Arc<dyn RoundSink>>,
    addition: AdditionStrategy,
    exchange: ExchangeStrategy,
    state: LearningState,
    run_id: Uuid,
}

impl ActiveLearning {
    pub fn new(
        settings: LearningConfig,
        builder: ConfigurationBuilder,
        learner: Arc<dyn Learner>,
        measurements: Arc<dyn MeasurementSource>,
    ) -> DomainResult<Self> {
        let resample_task = parse_known(&builder, &settings.resample_task)?;
        let addition = AdditionStrategy::new(
            settings.addition_strategy,
            resample_task,
            settings.nfp.clone(),
            settings.loss_function,
        );
        let exchange = ExchangeStrategy::new(
            settings.exchange_strategy,
            settings.exchange_percentage,
            settings.nfp.clone(),
            settings.loss_function,
        );

        Ok(Self {
            settings,
            builder,
            learner,
            measurements,
            sink: None,
            addition,
            exchange,
            state: LearningState::Init,
            run_id: Uuid::new_v4(),
        })
    }

    #[must_use]
    pub fn with_round_sink(mut self, sink: Arc<dyn RoundSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn state(&self) -> LearningState {
        self.state
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn builder(&self) -> &ConfigurationBuilder {
        &self.builder
    }

    /// Build and measure the configurations of `lines`.
    async fn sample(&mut self, lines: &[String]) -> DomainResult<Vec<Configuration>> {
        if lines.is_empty() {
            return Ok(Vec::new());
        }
        self.builder.clear();
        for line in lines {
            let task = parse_known(&self.builder, line)?;
            self.builder.add_task(task);
        }
        let configurations = self.builder.build(&[]).await?;
        self.measurements.measure(configurations).await
    }

    /// Run until a stop condition, exhaustion, or a model error. Model
    /// errors end the run in `Aborted` with the sets built so far.
    #[instrument(skip(self), fields(run_id = %self.run_id))]
    pub async fn run(&mut self) -> DomainResult<LearningOutcome> {
        self.state = LearningState::Init;
        let learning_tasks = self.settings.learning_tasks.clone();
        let validation_tasks = self.settings.validation_tasks.clone();

        let mut learning = self.sample(&learning_tasks).await?;
        let mut validation = self.sample(&validation_tasks).await?;
        match (learning.is_empty(), validation.is_empty()) {
            (true, true) => {
                error!("neither learning nor validation configurations could be sampled");
                self.state = LearningState::Aborted;
                return Err(DomainError::EmptyLearningSet);
            }
            (true, false) => learning = validation.clone(),
            (false, true) => validation = learning.clone(),
            (false, false) => {}
        }
        info!(
            learning = learning.len(),
            validation = validation.len(),
            "initial sets sampled"
        );

        let mut rounds: Vec<LearningRound> = Vec::new();
        let mut hint: Option<FeatureSet> = None;
        let mut model: Option<FittedModel> = None;
        let mut added_since_last = 0usize;
        let mut round = 1usize;

        let stop_reason = loop {
            self.state = LearningState::Fit;
            let mut models = self
                .learner
                .fit(&learning, &validation, hint.as_ref())
                .await?;
            if models.len() != 1 {
                let violation = DomainError::ModelContract(models.len());
                error!(round, models = models.len(), "{violation}");
                self.state = LearningState::Aborted;
                break StopReason::ModelContract(violation.to_string());
            }
            let Some(fitted) = models.pop() else {
                break StopReason::ModelContract(DomainError::ModelContract(0).to_string());
            };

            self.state = LearningState::Evaluate;
            let last_error = fitted.final_error;
            let record = LearningRound {
                run_id: self.run_id,
                round,
                feature_set: fitted.terms.clone(),
                final_error: last_error,
                learning_size: learning.len(),
                validation_size: validation.len(),
                new_configurations: added_since_last,
                timestamp: Utc::now(),
            };
            if let Some(sink) = &self.sink {
                sink.record(&record).await?;
            }
            rounds.push(record);
            info!(round, error = last_error, learning = learning.len(), "round evaluated");

            self.state = LearningState::Decide;
            if let Some(reason) = decide(&self.settings, round, last_error) {
                info!(round, %reason, "stopping");
                self.state = LearningState::Aborted;
                model = Some(fitted);
                break reason;
            }

            self.state = LearningState::Expand;
            let added = self
                .addition
                .find_new_configurations(&mut self.builder, &learning, &validation, &fitted)
                .await;
            let candidates = match added {
                Ok(candidates) => candidates,
                Err(err @ DomainError::ValidationSetTooSmall { .. }) => {
                    error!(round, "{err}");
                    self.state = LearningState::Aborted;
                    model = Some(fitted);
                    break StopReason::ValidationSetTooSmall(err.to_string());
                }
                Err(err) => return Err(err),
            };
            let measured = self.measurements.measure(candidates).await?;
            if measured.is_empty() {
                warn!(round, "expansion produced no new measurable configuration");
                self.state = LearningState::Done;
                model = Some(fitted);
                break StopReason::NoNewConfigurations;
            }

            added_since_last = measured.len();
            learning.extend(measured);
            let swapped =
                self.exchange
                    .exchange_configurations(&mut learning, &mut validation, &fitted);
            debug!(round, added = added_since_last, swapped, "sets expanded");

            hint = Some(fitted.terms.clone());
            model = Some(fitted);
            round += 1;
        };

        Ok(LearningOutcome {
            run_id: self.run_id,
            state: self.state,
            stop_reason,
            rounds,
            learning_set: learning,
            validation_set: validation,
            model,
        })
    }
}

/// Parse a task line, rejecting unhandled commands.
fn parse_known(builder: &ConfigurationBuilder, line: &str) -> DomainResult<SamplingTask> {
    match builder.parse_task(line)? {
        ParsedTask::Task(task) => Ok(task),
        ParsedTask::Unhandled(line) => Err(DomainError::UnknownStrategy(line)),
    }
}
