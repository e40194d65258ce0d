//! Prediction errors of a fitted model over measured configurations.

use crate::domain::models::{Configuration, FittedModel, LossFunction};

/// Prediction error of one configuration, by its index in the scored set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredConfig {
    pub index: usize,
    pub predicted: f64,
    pub measured: f64,
    pub error: f64,
}

/// Configurations sorted by prediction error, worst first. Configurations
/// without a measurement for the NFP are left out.
#[derive(Debug, Clone)]
pub struct SortedConfigsByError {
    scored: Vec<ScoredConfig>,
}

impl SortedConfigsByError {
    /// Score every measured configuration of `configurations` against `model`.
    pub fn new(
        model: &FittedModel,
        configurations: &[Configuration],
        nfp: &str,
        loss: LossFunction,
    ) -> Self {
        let mut scored: Vec<ScoredConfig> = configurations
            .iter()
            .enumerate()
            .filter_map(|(index, config)| {
                let measured = config.nfp(nfp)?;
                let predicted = model.predict(config);
                Some(ScoredConfig {
                    index,
                    predicted,
                    measured,
                    error: loss.error(predicted, measured),
                })
            })
            .collect();
        // Stable on index for equal errors.
        scored.sort_by(|a, b| b.error.total_cmp(&a.error).then(a.index.cmp(&b.index)));
        Self { scored }
    }

    pub fn len(&self) -> usize {
        self.scored.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scored.is_empty()
    }

    /// Every scored configuration, worst first.
    pub fn all(&self) -> &[ScoredConfig] {
        &self.scored
    }

    /// The `n` worst-predicted configurations.
    pub fn worst(&self, n: usize) -> &[ScoredConfig] {
        &self.scored[..n.min(self.scored.len())]
    }

    /// The `n` best-predicted configurations, best first.
    pub fn best(&self, n: usize) -> Vec<ScoredConfig> {
        self.scored.iter().rev().take(n).copied().collect()
    }

    pub fn mean_error(&self) -> Option<f64> {
        if self.scored.is_empty() {
            return None;
        }
        Some(self.scored.iter().map(|s| s.error).sum::<f64>() / self.scored.len() as f64)
    }
}

/// Number of configurations making up `share` of `total`, at least one when
/// `total` is positive.
pub fn share_of(total: usize, share: f64) -> usize {
    if total == 0 {
        return 0;
    }
    ((total as f64 * share).ceil() as usize).clamp(1, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::InfluenceTerm;

    fn measured(options: &[&str], value: f64) -> Configuration {
        Configuration::from_selected(options.iter().copied()).with_nfp("time", value)
    }

    #[test]
    fn test_sorted_worst_first() {
        // Predicts 10 everywhere.
        let model = FittedModel::new(vec![InfluenceTerm::constant(10.0)], 0.0);
        let configs = vec![
            measured(&["a"], 10.0),
            measured(&["b"], 20.0),
            Configuration::from_selected(["c"]),
            measured(&["d"], 12.5),
        ];

        let sorted = SortedConfigsByError::new(&model, &configs, "time", LossFunction::Absolute);
        let order: Vec<usize> = sorted.all().iter().map(|s| s.index).collect();
        assert_eq!(order, vec![1, 3, 0]);
        assert_eq!(sorted.worst(1)[0].index, 1);
        assert_eq!(sorted.best(1)[0].index, 0);
        assert!((sorted.mean_error().unwrap() - 12.5 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_share_of() {
        assert_eq!(share_of(0, 0.1), 0);
        assert_eq!(share_of(5, 0.1), 1);
        assert_eq!(share_of(20, 0.1), 2);
        assert_eq!(share_of(3, 1.0), 3);
    }
}
