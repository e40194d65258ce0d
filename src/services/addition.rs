//! Addition strategies: grow the learning set between rounds.

use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AdditionStrategyKind, Configuration, FittedModel, LossFunction, OptionSet, SamplingTask,
};

use super::configuration_builder::ConfigurationBuilder;
use super::error_metrics::{share_of, SortedConfigsByError};
use super::sampling::{combinations, SampleSet};

/// Share of scored configurations counted as badly (or well) predicted.
pub const MATRIX_SHARE: f64 = 0.1;

/// Largest option combination MatrixVIC scores.
pub const MAX_COMBINATION_DEGREE: usize = 4;

/// Addition policy with its one-shot resampling switch.
pub struct AdditionStrategy {
    kind: AdditionStrategyKind,
    resample_task: SamplingTask,
    nfp: String,
    loss: LossFunction,
    resample_triggered: bool,
}

impl AdditionStrategy {
    /// Strategy that switches the builder to `resample_task` on first use.
    pub fn new(
        kind: AdditionStrategyKind,
        resample_task: SamplingTask,
        nfp: impl Into<String>,
        loss: LossFunction,
    ) -> Self {
        Self {
            kind,
            resample_task,
            nfp: nfp.into(),
            loss,
            resample_triggered: false,
        }
    }

    /// Policy this strategy applies.
    pub fn kind(&self) -> AdditionStrategyKind {
        self.kind
    }

    /// Switch the builder to the resample task the first time only.
    async fn trigger_resample(&mut self, builder: &mut ConfigurationBuilder) -> DomainResult<bool> {
        if self.resample_triggered {
            return Ok(false);
        }
        builder.switch_task(self.resample_task.clone()).await?;
        self.resample_triggered = true;
        Ok(true)
    }

    /// New configurations for the next round, none of which is already in
    /// `learning` or `validation`.
    pub async fn find_new_configurations(
        &mut self,
        builder: &mut ConfigurationBuilder,
        learning: &[Configuration],
        validation: &[Configuration],
        model: &FittedModel,
    ) -> DomainResult<Vec<Configuration>> {
        let switched = self.trigger_resample(builder).await?;

        let found = match self.kind {
            AdditionStrategyKind::NoOp => Vec::new(),
            AdditionStrategyKind::Simple => {
                if !switched {
                    builder.update_seeds()?;
                }
                let existing: Vec<Configuration> =
                    learning.iter().chain(validation).cloned().collect();
                builder.build(&existing).await?
            }
            AdditionStrategyKind::Matrix
            | AdditionStrategyKind::Matrix2
            | AdditionStrategyKind::MatrixMax
            | AdditionStrategyKind::MatrixVic => {
                self.matrix(builder, learning, validation, model).await?
            }
        };

        info!(
            strategy = self.kind.as_str(),
            configurations = found.len(),
            "addition finished"
        );
        Ok(found)
    }

    async fn matrix(
        &self,
        builder: &ConfigurationBuilder,
        learning: &[Configuration],
        validation: &[Configuration],
        model: &FittedModel,
    ) -> DomainResult<Vec<Configuration>> {
        let scored_set = if validation.is_empty() { learning } else { validation };
        let sorted = SortedConfigsByError::new(model, scored_set, &self.nfp, self.loss);
        let share = share_of(sorted.len(), MATRIX_SHARE);
        let bad: Vec<&Configuration> = sorted
            .worst(share)
            .iter()
            .map(|s| &scored_set[s.index])
            .collect();
        let good: Vec<&Configuration> = sorted
            .best(share)
            .iter()
            .map(|s| &scored_set[s.index])
            .collect();

        let solver = builder.solver();
        let candidates: Vec<String> = solver
            .model()
            .sampling_candidates()
            .into_iter()
            .map(|o| o.name.clone())
            .collect();

        let targets = match self.kind {
            AdditionStrategyKind::Matrix => {
                let scores = option_scores(&candidates, &bad, Some(good.as_slice()));
                top(&scores, false)
            }
            AdditionStrategyKind::Matrix2 => {
                let covered = model.covered_options();
                let uncovered: Vec<String> = candidates
                    .iter()
                    .filter(|name| !covered.contains(*name))
                    .cloned()
                    .collect();
                let scores = option_scores(&uncovered, &bad, None);
                top(&scores, true)
            }
            AdditionStrategyKind::MatrixMax => {
                let scores = option_scores(&candidates, &bad, None);
                top(&scores, true)
            }
            _ => {
                let scores = combination_scores(&candidates, &bad, &good);
                top(&scores, true)
            }
        };

        if targets.is_empty() {
            warn!(strategy = self.kind.as_str(), bad = bad.len(), "no candidate option qualifies");
            return Err(DomainError::ValidationSetTooSmall {
                strategy: self.kind.as_str().to_string(),
            });
        }

        // New configurations keep the numeric part of the worst prediction.
        let numeric = bad
            .first()
            .map(|config| config.numeric_options().clone())
            .unwrap_or_default();

        let existing: HashSet<&Configuration> = learning.iter().chain(validation).collect();
        let mut selections = SampleSet::new();
        let mut found = Vec::new();
        for target in targets {
            debug!(?target, "forcing option combination");
            let Some(selection) = solver
                .find_minimal_completion(&target, &OptionSet::new())
                .await?
            else {
                continue;
            };
            if !selections.insert(selection.clone()) {
                continue;
            }
            let config = Configuration::from_selection(solver.model(), &selection, numeric.clone());
            if solver.model().satisfies_numeric_constraints(&config) && !existing.contains(&config) {
                found.push(config);
            }
        }
        Ok(found)
    }
}

/// Occurrences of each option across `bad`, minus those across `good`.
/// Options absent from every bad configuration are not scored.
fn option_scores(
    options: &[String],
    bad: &[&Configuration],
    good: Option<&[&Configuration]>,
) -> BTreeMap<OptionSet, i64> {
    let mut scores = BTreeMap::new();
    for option in options {
        let in_bad = count(bad, |c| c.is_selected(option));
        if in_bad == 0 {
            continue;
        }
        let in_good = good.map_or(0, |good| count(good, |c| c.is_selected(option)));
        scores.insert(OptionSet::from([option.clone()]), in_bad - in_good);
    }
    scores
}

/// Like [`option_scores`] over co-selected combinations of up to
/// [`MAX_COMBINATION_DEGREE`] candidate options.
fn combination_scores(
    candidates: &[String],
    bad: &[&Configuration],
    good: &[&Configuration],
) -> BTreeMap<OptionSet, i64> {
    let mut scores: BTreeMap<OptionSet, i64> = BTreeMap::new();
    for config in bad {
        let selected: Vec<&String> = candidates.iter().filter(|o| config.is_selected(o)).collect();
        for degree in 1..=MAX_COMBINATION_DEGREE.min(selected.len()) {
            for combination in combinations(&selected, degree) {
                let key: OptionSet = combination.into_iter().cloned().collect();
                *scores.entry(key).or_insert(0) += 1;
            }
        }
    }
    for (combination, score) in &mut scores {
        *score -= count(good, |c| combination.iter().all(|o| c.is_selected(o)));
    }
    scores
}

fn count<F>(configs: &[&Configuration], predicate: F) -> i64
where
    F: Fn(&Configuration) -> bool,
{
    configs.iter().filter(|c| predicate(c)).count() as i64
}

/// Keys with the maximal score: all ties, or just the first one.
fn top(scores: &BTreeMap<OptionSet, i64>, all_ties: bool) -> Vec<OptionSet> {
    let Some(max) = scores.values().copied().max() else {
        return Vec::new();
    };
    let best = scores
        .iter()
        .filter(|(_, score)| **score == max)
        .map(|(key, _)| key.clone());
    if all_ties {
        best.collect()
    } else {
        best.take(1).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(options: &[&str]) -> Configuration {
        Configuration::from_selected(options.iter().copied())
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_option_scores_subtract_good() {
        let bad = [config(&["a", "b"]), config(&["a"])];
        let good = [config(&["b"])];
        let bad: Vec<&Configuration> = bad.iter().collect();
        let good: Vec<&Configuration> = good.iter().collect();

        let scores = option_scores(&names(&["a", "b", "c"]), &bad, Some(good.as_slice()));
        assert_eq!(scores.get(&OptionSet::from(["a".to_string()])), Some(&2));
        assert_eq!(scores.get(&OptionSet::from(["b".to_string()])), Some(&0));
        assert!(!scores.contains_key(&OptionSet::from(["c".to_string()])));
        assert_eq!(top(&scores, false), vec![OptionSet::from(["a".to_string()])]);
    }

    #[test]
    fn test_combination_scores_are_order_independent() {
        let bad = [config(&["b", "a"]), config(&["a", "b", "c"])];
        let bad: Vec<&Configuration> = bad.iter().collect();

        let scores = combination_scores(&names(&["a", "b", "c"]), &bad, &[]);
        let ab: OptionSet = names(&["a", "b"]).into_iter().collect();
        assert_eq!(scores.get(&ab), Some(&2));
        // a, b and {a, b} all occur twice.
        assert_eq!(top(&scores, true).len(), 3);
    }

    #[test]
    fn test_top_of_empty_scores() {
        assert!(top(&BTreeMap::new(), true).is_empty());
    }
}
