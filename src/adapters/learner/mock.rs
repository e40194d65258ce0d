//! Scripted learner for tests and dry runs.

use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Configuration, FeatureSet, FittedModel, InfluenceTerm};
use crate::domain::ports::Learner;

/// Learner that fits a constant model (the mean NFP of the learning set)
/// and reports scripted errors, one per call.
pub struct MockLearner {
    nfp: String,
    errors: Mutex<VecDeque<f64>>,
    fallback_error: f64,
    models_per_fit: usize,
    calls: Mutex<Vec<MockFitCall>>,
}

/// What one `fit` call saw.
#[derive(Debug, Clone)]
pub struct MockFitCall {
    pub learning_size: usize,
    pub validation_size: usize,
    pub hint: Option<FeatureSet>,
}

impl MockLearner {
    pub fn new(nfp: impl Into<String>) -> Self {
        Self {
            nfp: nfp.into(),
            errors: Mutex::new(VecDeque::new()),
            fallback_error: 0.5,
            models_per_fit: 1,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Errors reported by successive rounds; the last one repeats.
    #[must_use]
    pub fn with_errors<I>(mut self, errors: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let errors: VecDeque<f64> = errors.into_iter().collect();
        if let Some(last) = errors.back() {
            self.fallback_error = *last;
        }
        self.errors = Mutex::new(errors);
        self
    }

    /// Return this many models per call instead of exactly one.
    #[must_use]
    pub fn with_models_per_fit(mut self, count: usize) -> Self {
        self.models_per_fit = count;
        self
    }

    pub async fn calls(&self) -> Vec<MockFitCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Learner for MockLearner {
    async fn fit(
        &self,
        learning: &[Configuration],
        validation: &[Configuration],
        hint: Option<&FeatureSet>,
    ) -> DomainResult<Vec<FittedModel>> {
        self.calls.lock().await.push(MockFitCall {
            learning_size: learning.len(),
            validation_size: validation.len(),
            hint: hint.cloned(),
        });

        let error = self
            .errors
            .lock()
            .await
            .pop_front()
            .unwrap_or(self.fallback_error);

        let values: Vec<f64> = learning.iter().filter_map(|c| c.nfp(&self.nfp)).collect();
        let mean = if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        };

        let model = FittedModel::new(vec![InfluenceTerm::constant(mean)], error);
        Ok(vec![model; self.models_per_fit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_errors_then_repeat_last() {
        let learner = MockLearner::new("performance").with_errors([0.8, 0.4]);
        let learning = vec![
            Configuration::from_selected(["a"]).with_nfp("performance", 2.0),
            Configuration::from_selected(["b"]).with_nfp("performance", 4.0),
        ];

        let first = learner.fit(&learning, &[], None).await.unwrap();
        let second = learner.fit(&learning, &[], None).await.unwrap();
        let third = learner.fit(&learning, &[], None).await.unwrap();

        assert_eq!(first[0].final_error, 0.8);
        assert_eq!(second[0].final_error, 0.4);
        assert_eq!(third[0].final_error, 0.4);
        assert!((first[0].predict(&learning[0]) - 3.0).abs() < 1e-12);
        assert_eq!(learner.calls().await.len(), 3);
    }
}
