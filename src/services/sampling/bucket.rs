//! Diversity (bucket / distance-based) sampling.
//!
//! Configurations are drawn bucket by bucket, where a bucket is the number of
//! selected options. Option combinations already sampled are weighted so the
//! solver steers towards unseen ones.

use tracing::{debug, info};

use crate::domain::errors::DomainResult;
use crate::domain::models::{BinaryStrategy, FeatureWeights, OptionSet, SamplingTask};
use crate::services::solver_facade::SolverFacade;

use super::{candidate_names, combinations, feature_wise, negative_feature_wise, t_wise, SampleSet};

/// Largest combination degree tracked in feature weights.
pub const MAX_OPTION_WEIGHT: usize = 4;

/// How many configurations a bucket task should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleCount {
    Fixed(usize),
    /// As many as the named heuristic produces (`t` only matters for t-wise).
    AsHeuristic { strategy: BinaryStrategy, t: usize },
}

impl SampleCount {
    fn parse(task: &SamplingTask, raw: &str) -> DomainResult<Self> {
        let lower = raw.to_lowercase();
        let count = match lower.as_str() {
            "asfw" => Self::AsHeuristic {
                strategy: BinaryStrategy::FeatureWise,
                t: 1,
            },
            "aspw" => Self::AsHeuristic {
                strategy: BinaryStrategy::PairWise,
                t: 2,
            },
            "asnegfw" => Self::AsHeuristic {
                strategy: BinaryStrategy::NegativeFeatureWise,
                t: 1,
            },
            other => {
                if let Some(t) = other.strip_prefix("astw") {
                    let t = t
                        .parse::<usize>()
                        .ok()
                        .filter(|t| *t > 0)
                        .ok_or_else(|| task.invalid("numconfigs", raw, "expected asTW<t>"))?;
                    Self::AsHeuristic {
                        strategy: BinaryStrategy::TWise,
                        t,
                    }
                } else {
                    let n = other.parse::<usize>().map_err(|_| {
                        task.invalid("numconfigs", raw, "expected a count or asFW/asPW/asNegFW/asTW<t>")
                    })?;
                    Self::Fixed(n)
                }
            }
        };
        Ok(count)
    }

    async fn resolve(self, solver: &SolverFacade) -> DomainResult<usize> {
        let count = match self {
            Self::Fixed(n) => n,
            Self::AsHeuristic { strategy, t } => match strategy {
                BinaryStrategy::NegativeFeatureWise => {
                    negative_feature_wise::sample(solver).await?.len()
                }
                BinaryStrategy::PairWise | BinaryStrategy::TWise => {
                    t_wise::sample(solver, t).await?.len()
                }
                _ => feature_wise::sample(solver).await?.len(),
            },
        };
        Ok(count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketParams {
    pub num_configs: SampleCount,
    /// Degree of option combinations weighted after each pick (1..=4).
    pub option_weight: usize,
    /// Fixed bucket; otherwise buckets are visited round-robin.
    pub selected_count: Option<usize>,
}

impl Default for BucketParams {
    fn default() -> Self {
        Self {
            num_configs: SampleCount::AsHeuristic {
                strategy: BinaryStrategy::FeatureWise,
                t: 1,
            },
            option_weight: 1,
            selected_count: None,
        }
    }
}

impl BucketParams {
    pub fn from_task(task: &SamplingTask) -> DomainResult<Self> {
        let defaults = Self::default();
        let num_configs = match task.param("numconfigs") {
            Some(raw) => SampleCount::parse(task, raw)?,
            None => defaults.num_configs,
        };
        let option_weight = task.param_or::<usize>("optionweight", defaults.option_weight)?;
        if option_weight == 0 || option_weight > MAX_OPTION_WEIGHT {
            return Err(task.invalid(
                "optionweight",
                &option_weight.to_string(),
                "must be between 1 and 4",
            ));
        }
        let selected_count = match task.param("selectedcount") {
            Some(_) => Some(task.param_or::<usize>("selectedcount", 0)?),
            None => None,
        };
        Ok(Self {
            num_configs,
            option_weight,
            selected_count,
        })
    }
}

fn add_weights(
    weights: &mut FeatureWeights,
    selection: &OptionSet,
    candidates: &[String],
    degree: usize,
) {
    let selected: Vec<&String> = candidates
        .iter()
        .filter(|name| selection.contains(*name))
        .collect();
    for d in 1..=degree {
        for combination in combinations(&selected, d) {
            let key: OptionSet = combination.into_iter().cloned().collect();
            *weights.entry(key).or_insert(0) += 1;
        }
    }
}

/// Collect up to the target count of distinct selections, one bucket at a
/// time. Each call starts from a cleared bucket cache.
pub async fn sample(solver: &SolverFacade, params: &BucketParams) -> DomainResult<Vec<OptionSet>> {
    solver.reset_cache().await?;
    let target = params.num_configs.resolve(solver).await?;
    if target == 0 {
        return Ok(Vec::new());
    }

    let Some(baseline) = solver
        .find_minimal_completion(&OptionSet::new(), &OptionSet::new())
        .await?
    else {
        info!(strategy = "bucket", "model has no valid configuration");
        return Ok(Vec::new());
    };

    let buckets: Vec<usize> = match params.selected_count {
        Some(count) => vec![count],
        None => (baseline.len()..=solver.model().binary_options().len()).collect(),
    };
    let candidates = candidate_names(solver);

    let mut exhausted = vec![false; buckets.len()];
    let mut weights = FeatureWeights::new();
    let mut samples = SampleSet::new();
    let mut cursor = 0usize;

    while samples.len() < target && exhausted.iter().any(|done| !done) {
        let slot = cursor % buckets.len();
        cursor += 1;
        if exhausted[slot] {
            continue;
        }

        match solver.generate_bucket(buckets[slot], &weights).await? {
            Some(selection) => {
                if samples.insert(selection.clone()) {
                    add_weights(&mut weights, &selection, &candidates, params.option_weight);
                } else {
                    exhausted[slot] = true;
                }
            }
            None => {
                debug!(bucket = buckets[slot], "bucket exhausted");
                exhausted[slot] = true;
            }
        }
    }

    info!(
        strategy = "bucket",
        target,
        configurations = samples.len(),
        buckets = buckets.len(),
        "sampling finished"
    );
    Ok(samples.into_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ParsedTask;

    fn task(line: &str) -> SamplingTask {
        match SamplingTask::parse(line).unwrap() {
            ParsedTask::Task(task) => task,
            ParsedTask::Unhandled(line) => panic!("unhandled {line}"),
        }
    }

    #[test]
    fn test_params_relative_counts() {
        let params = BucketParams::from_task(&task("bucket numConfigs:asTW3 optionWeight:2")).unwrap();
        assert_eq!(
            params.num_configs,
            SampleCount::AsHeuristic {
                strategy: BinaryStrategy::TWise,
                t: 3
            }
        );
        assert_eq!(params.option_weight, 2);

        let params = BucketParams::from_task(&task("distance-based numConfigs:12 selectedCount:3")).unwrap();
        assert_eq!(params.num_configs, SampleCount::Fixed(12));
        assert_eq!(params.selected_count, Some(3));
    }

    #[test]
    fn test_params_rejects_bad_values() {
        assert!(BucketParams::from_task(&task("bucket optionWeight:5")).is_err());
        assert!(BucketParams::from_task(&task("bucket numConfigs:lots")).is_err());
        assert!(BucketParams::from_task(&task("bucket numConfigs:asTW0")).is_err());
    }

    #[test]
    fn test_add_weights_counts_combinations() {
        let candidates: Vec<String> = ["a", "b", "c"].iter().map(|s| (*s).to_string()).collect();
        let selection: OptionSet = ["root", "a", "b"].iter().map(|s| (*s).to_string()).collect();
        let mut weights = FeatureWeights::new();

        add_weights(&mut weights, &selection, &candidates, 2);
        add_weights(&mut weights, &selection, &candidates, 2);

        assert_eq!(weights.len(), 3);
        let ab: OptionSet = ["a", "b"].iter().map(|s| (*s).to_string()).collect();
        assert_eq!(weights.get(&ab), Some(&2));
    }
}
