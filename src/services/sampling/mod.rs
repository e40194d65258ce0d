//! Sampling heuristics over binary options.
//!
//! Each heuristic is a function of the model (reached through the
//! [`SolverFacade`]) and its task parameters, returning selected-option sets.
//! None of them mutate the model.

pub mod all_binary;
pub mod bucket;
pub mod feature_wise;
pub mod negative_feature_wise;
pub mod random;
pub mod t_wise;

use std::collections::HashSet;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{BinaryStrategy, OptionSet, SamplingTask, StrategyKind};

use super::solver_facade::SolverFacade;

/// Insertion-ordered, duplicate-free list of selections.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    items: Vec<OptionSet>,
    seen: HashSet<OptionSet>,
}

impl SampleSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `selection`; false if it was already present.
    pub fn insert(&mut self, selection: OptionSet) -> bool {
        if self.seen.contains(&selection) {
            return false;
        }
        self.seen.insert(selection.clone());
        self.items.push(selection);
        true
    }

    /// Whether `selection` was already inserted.
    pub fn contains(&self, selection: &OptionSet) -> bool {
        self.seen.contains(selection)
    }

    /// Number of selections.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Selections in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &OptionSet> {
        self.items.iter()
    }

    /// Selections in insertion order.
    pub fn into_vec(self) -> Vec<OptionSet> {
        self.items
    }
}

/// All `k`-element combinations of `items`, in lexicographic index order.
pub fn combinations<T: Clone>(items: &[T], k: usize) -> Vec<Vec<T>> {
    let n = items.len();
    if k > n {
        return Vec::new();
    }
    let mut result = Vec::new();
    let mut indices: Vec<usize> = (0..k).collect();
    loop {
        result.push(indices.iter().map(|&i| items[i].clone()).collect());

        // Rightmost index that can still move.
        let Some(pos) = (0..k).rev().find(|&i| indices[i] != i + n - k) else {
            return result;
        };
        indices[pos] += 1;
        for i in pos + 1..k {
            indices[i] = indices[i - 1] + 1;
        }
    }
}

/// Names of the options the combinatorial heuristics vary.
pub(crate) fn candidate_names(solver: &SolverFacade) -> Vec<String> {
    solver
        .model()
        .sampling_candidates()
        .into_iter()
        .map(|option| option.name.clone())
        .collect()
}

/// Run one binary task.
pub async fn sample_binary(solver: &SolverFacade, task: &SamplingTask) -> DomainResult<Vec<OptionSet>> {
    let StrategyKind::Binary(strategy) = &task.kind else {
        return Err(DomainError::UnknownStrategy(task.name().to_string()));
    };

    match strategy {
        BinaryStrategy::FeatureWise => feature_wise::sample(solver).await,
        BinaryStrategy::NegativeFeatureWise => negative_feature_wise::sample(solver).await,
        BinaryStrategy::PairWise => t_wise::sample(solver, 2).await,
        BinaryStrategy::TWise => {
            let t = task.param_or::<usize>("t", 2)?;
            if t == 0 {
                return Err(task.invalid("t", "0", "strength must be at least 1"));
            }
            t_wise::sample(solver, t).await
        }
        BinaryStrategy::Random => {
            let params = random::RandomParams::from_task(task)?;
            random::sample(solver, &params).await
        }
        BinaryStrategy::Bucket => {
            let params = bucket::BucketParams::from_task(task)?;
            bucket::sample(solver, &params).await
        }
        BinaryStrategy::AllBinary => all_binary::sample(solver).await,
    }
}
