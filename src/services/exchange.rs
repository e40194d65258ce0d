//! Exchange strategies: rebalance learning and validation sets.

use tracing::info;

use crate::domain::models::{Configuration, ExchangeStrategyKind, FittedModel, LossFunction};

use super::error_metrics::SortedConfigsByError;

/// Bins of the performance histogram.
pub const HISTOGRAM_BINS: usize = 10;

/// Exchange policy.
#[derive(Debug, Clone)]
pub struct ExchangeStrategy {
    kind: ExchangeStrategyKind,
    percentage: f64,
    nfp: String,
    loss: LossFunction,
}

impl ExchangeStrategy {
    /// Strategy swapping `percentage` of the validation set per round.
    pub fn new(
        kind: ExchangeStrategyKind,
        percentage: f64,
        nfp: impl Into<String>,
        loss: LossFunction,
    ) -> Self {
        Self {
            kind,
            percentage,
            nfp: nfp.into(),
            loss,
        }
    }

    /// Policy this strategy applies.
    pub fn kind(&self) -> ExchangeStrategyKind {
        self.kind
    }

    /// Number of configurations swapped in each direction.
    pub fn exchange_count(&self, learning: usize, validation: usize) -> usize {
        let m = (self.percentage * validation as f64).round() as usize;
        m.min(learning).min(validation)
    }

    /// Swap up to `m` learning configurations chosen by the policy with as
    /// many worst-predicted validation configurations. A configuration that
    /// both sets hold never moves. Returns the number swapped.
    pub fn exchange_configurations(
        &self,
        learning: &mut Vec<Configuration>,
        validation: &mut Vec<Configuration>,
        model: &FittedModel,
    ) -> usize {
        if self.kind == ExchangeStrategyKind::NoOp {
            return 0;
        }
        let m = self.exchange_count(learning.len(), validation.len());
        if m == 0 {
            return 0;
        }

        // Only configurations unique to their set can change sides.
        let movable: Vec<usize> = (0..learning.len())
            .filter(|&i| !validation.contains(&learning[i]))
            .collect();
        let candidates: Vec<Configuration> =
            movable.iter().map(|&i| learning[i].clone()).collect();
        let mut from_learning: Vec<usize> = match self.kind {
            ExchangeStrategyKind::MinDistance => min_distance_picks(&candidates, m),
            _ => histogram_picks(&candidates, &self.nfp, m),
        }
        .into_iter()
        .map(|i| movable[i])
        .collect();

        let sorted = SortedConfigsByError::new(model, validation, &self.nfp, self.loss);
        let from_validation: Vec<usize> = sorted
            .all()
            .iter()
            .map(|s| s.index)
            .filter(|&i| !learning.contains(&validation[i]))
            .take(from_learning.len())
            .collect();
        // Either side may run short of candidates; swap equal counts.
        from_learning.truncate(from_validation.len());

        let moved_out = take_indices(learning, &from_learning);
        let moved_in = take_indices(validation, &from_validation);
        let swapped = moved_out.len();
        learning.extend(moved_in);
        validation.extend(moved_out);

        info!(strategy = self.kind.as_str(), swapped, "sets exchanged");
        swapped
    }
}

/// Remove the configurations at `indices` (any order) and return them.
fn take_indices(configs: &mut Vec<Configuration>, indices: &[usize]) -> Vec<Configuration> {
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let len = configs.len();
    sorted
        .into_iter()
        .rev()
        .filter(|&i| i < len)
        .map(|i| configs.remove(i))
        .collect()
}

/// Repeatedly pick the closer member of the globally closest pair, so the
/// learning set loses its most redundant configurations.
fn min_distance_picks(learning: &[Configuration], m: usize) -> Vec<usize> {
    let mut remaining: Vec<usize> = (0..learning.len()).collect();
    let mut picks = Vec::with_capacity(m);

    while picks.len() < m && remaining.len() > 1 {
        let mut best: Option<(usize, usize)> = None;
        for a in 0..remaining.len() {
            for b in a + 1..remaining.len() {
                let d = learning[remaining[a]].hamming_distance(&learning[remaining[b]]);
                if best.is_none_or(|(best_d, _)| d < best_d) {
                    best = Some((d, b));
                }
            }
        }
        let Some((_, position)) = best else { break };
        picks.push(remaining.remove(position));
    }
    picks
}

/// Take configurations from the most populated NFP histogram bins.
fn histogram_picks(learning: &[Configuration], nfp: &str, m: usize) -> Vec<usize> {
    let measured: Vec<(usize, f64)> = learning
        .iter()
        .enumerate()
        .filter_map(|(i, c)| c.nfp(nfp).map(|v| (i, v)))
        .collect();
    let Some(min) = measured.iter().map(|(_, v)| *v).min_by(f64::total_cmp) else {
        return Vec::new();
    };
    let max = measured
        .iter()
        .map(|(_, v)| *v)
        .max_by(f64::total_cmp)
        .unwrap_or(min);
    let width = (max - min) / HISTOGRAM_BINS as f64;

    let mut bins: Vec<Vec<usize>> = vec![Vec::new(); HISTOGRAM_BINS];
    for (index, value) in measured {
        let bin = if width > 0.0 {
            (((value - min) / width) as usize).min(HISTOGRAM_BINS - 1)
        } else {
            0
        };
        bins[bin].push(index);
    }

    let mut picks = Vec::with_capacity(m);
    while picks.len() < m {
        let Some(fullest) = bins
            .iter_mut()
            .filter(|bin| bin.len() > 1)
            .max_by_key(|bin| bin.len())
        else {
            break;
        };
        if let Some(index) = fullest.pop() {
            picks.push(index);
        }
    }
    picks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::InfluenceTerm;

    fn measured(options: &[&str], value: f64) -> Configuration {
        Configuration::from_selected(options.iter().copied()).with_nfp("time", value)
    }

    fn constant_model(value: f64) -> FittedModel {
        FittedModel::new(vec![InfluenceTerm::constant(value)], 0.0)
    }

    #[test]
    fn test_exchange_count_rounds_share_of_validation() {
        let strategy = ExchangeStrategy::new(
            ExchangeStrategyKind::MinDistance,
            0.1,
            "time",
            LossFunction::Relative,
        );
        assert_eq!(strategy.exchange_count(100, 20), 2);
        assert_eq!(strategy.exchange_count(100, 4), 0);
        assert_eq!(strategy.exchange_count(1, 50), 1);
    }

    #[test]
    fn test_noop_keeps_sets() {
        let strategy =
            ExchangeStrategy::new(ExchangeStrategyKind::NoOp, 0.5, "time", LossFunction::Relative);
        let mut learning = vec![measured(&["a"], 1.0)];
        let mut validation = vec![measured(&["b"], 1.0)];
        assert_eq!(
            strategy.exchange_configurations(&mut learning, &mut validation, &constant_model(1.0)),
            0
        );
        assert_eq!(learning.len(), 1);
        assert_eq!(validation.len(), 1);
    }

    #[test]
    fn test_min_distance_swaps_redundant_for_worst() {
        let strategy = ExchangeStrategy::new(
            ExchangeStrategyKind::MinDistance,
            0.5,
            "time",
            LossFunction::Absolute,
        );
        let mut learning = vec![
            measured(&["a"], 10.0),
            measured(&["a", "b"], 10.0),
            measured(&["c", "d", "e"], 10.0),
        ];
        let mut validation = vec![measured(&["x"], 10.0), measured(&["y"], 50.0)];

        let swapped =
            strategy.exchange_configurations(&mut learning, &mut validation, &constant_model(10.0));

        assert_eq!(swapped, 1);
        assert!(learning.contains(&Configuration::from_selected(["y"])));
        assert!(validation.contains(&Configuration::from_selected(["a", "b"])));
        assert_eq!(learning.len(), 3);
        assert_eq!(validation.len(), 2);
    }

    #[test]
    fn test_mirrored_sets_are_left_alone() {
        let strategy = ExchangeStrategy::new(
            ExchangeStrategyKind::MinDistance,
            0.5,
            "time",
            LossFunction::Absolute,
        );
        let shared = vec![
            measured(&["a"], 10.0),
            measured(&["a", "b"], 30.0),
            measured(&["c"], 50.0),
            measured(&["d"], 70.0),
        ];
        let mut learning = shared.clone();
        let mut validation = shared;

        let swapped =
            strategy.exchange_configurations(&mut learning, &mut validation, &constant_model(10.0));

        assert_eq!(swapped, 0);
        assert_eq!(learning.len(), 4);
        assert_eq!(validation.len(), 4);
    }

    #[test]
    fn test_shared_configurations_never_duplicate() {
        let strategy = ExchangeStrategy::new(
            ExchangeStrategyKind::MinDistance,
            0.5,
            "time",
            LossFunction::Absolute,
        );
        // [a] is in both sets and is the worst-predicted validation entry.
        let mut learning = vec![
            measured(&["a"], 90.0),
            measured(&["b"], 10.0),
            measured(&["b", "c"], 10.0),
            measured(&["e", "f", "g"], 10.0),
        ];
        let mut validation = vec![
            measured(&["a"], 90.0),
            measured(&["x"], 40.0),
            measured(&["y"], 20.0),
            measured(&["z"], 10.0),
        ];

        let swapped =
            strategy.exchange_configurations(&mut learning, &mut validation, &constant_model(10.0));

        assert_eq!(swapped, 2);
        assert!(learning.contains(&Configuration::from_selected(["x"])));
        assert!(learning.contains(&Configuration::from_selected(["y"])));
        for set in [&learning, &validation] {
            let unique: std::collections::HashSet<&Configuration> = set.iter().collect();
            assert_eq!(unique.len(), set.len());
        }
        assert!(validation.contains(&Configuration::from_selected(["b", "c"])));
        assert_eq!(learning.len(), 4);
        assert_eq!(validation.len(), 4);
    }

    #[test]
    fn test_histogram_picks_from_crowded_bin() {
        let learning = vec![
            measured(&["a"], 1.0),
            measured(&["b"], 1.1),
            measured(&["c"], 1.2),
            measured(&["d"], 100.0),
        ];
        let picks = histogram_picks(&learning, "time", 2);
        assert_eq!(picks.len(), 2);
        assert!(!picks.contains(&3));
    }
}
