//! Fitted performance-influence models as handed back by a learner.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::configuration::Configuration;
use super::option::OptionSet;

/// One term of an influence model: a coefficient times the product of the
/// values of its options. An empty option list is the constant term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluenceTerm {
    pub options: Vec<String>,
    pub coefficient: f64,
}

impl InfluenceTerm {
    pub fn new<I, S>(options: I, coefficient: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            options: options.into_iter().map(Into::into).collect(),
            coefficient,
        }
    }

    pub fn constant(coefficient: f64) -> Self {
        Self {
            options: Vec::new(),
            coefficient,
        }
    }

    /// Contribution of this term to the prediction for `config`. Unassigned
    /// options count as zero.
    pub fn evaluate(&self, config: &Configuration) -> f64 {
        self.options
            .iter()
            .map(|name| config.value_of(name).unwrap_or(0.0))
            .product::<f64>()
            * self.coefficient
    }
}

impl fmt::Display for InfluenceTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.options.is_empty() {
            write!(f, "{}", self.coefficient)
        } else {
            write!(f, "{} * {}", self.coefficient, self.options.join(" * "))
        }
    }
}

/// The terms/interactions a model currently uses.
pub type FeatureSet = Vec<InfluenceTerm>;

/// A fitted model together with the error the learner reported for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    pub terms: FeatureSet,
    pub final_error: f64,
}

impl FittedModel {
    pub fn new(terms: FeatureSet, final_error: f64) -> Self {
        Self { terms, final_error }
    }

    pub fn predict(&self, config: &Configuration) -> f64 {
        self.terms.iter().map(|term| term.evaluate(config)).sum()
    }

    pub fn feature_set(&self) -> &FeatureSet {
        &self.terms
    }

    /// Every option that occurs in at least one term.
    pub fn covered_options(&self) -> OptionSet {
        self.terms
            .iter()
            .flat_map(|term| term.options.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_sums_terms() {
        let model = FittedModel::new(
            vec![
                InfluenceTerm::constant(10.0),
                InfluenceTerm::new(["cache"], -2.0),
                InfluenceTerm::new(["cache", "threads"], 0.5),
            ],
            0.0,
        );
        let config = Configuration::from_selected(["cache"]).with_numeric("threads", 4.0);
        assert!((model.predict(&config) - 10.0).abs() < 1e-12);

        let without_cache = Configuration::default().with_numeric("threads", 4.0);
        assert!((model.predict(&without_cache) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_covered_options() {
        let model = FittedModel::new(
            vec![InfluenceTerm::new(["a", "b"], 1.0), InfluenceTerm::new(["b"], 1.0)],
            0.0,
        );
        let covered: Vec<String> = model.covered_options().into_iter().collect();
        assert_eq!(covered, vec!["a", "b"]);
    }

    #[test]
    fn test_term_display() {
        assert_eq!(InfluenceTerm::new(["a", "b"], 2.0).to_string(), "2 * a * b");
        assert_eq!(InfluenceTerm::constant(3.5).to_string(), "3.5");
    }
}
