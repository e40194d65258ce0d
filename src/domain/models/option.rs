//! Configuration options of a variability model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::expression::Expr;

/// A set of binary options, identified by name. Sorted, so it doubles as a
/// canonical key for order-independent option combinations.
pub type OptionSet = BTreeSet<String>;

/// Upper bound on the size of a numeric value domain.
pub const MAX_NUMERIC_VALUES: usize = 10_000;

const EPSILON: f64 = 1e-9;

/// Capability shared by binary and numeric options.
pub trait ConfigurationOption {
    /// Unique name within the variability model.
    fn name(&self) -> &str;

    /// Name of the parent option, if any.
    fn parent(&self) -> Option<&str>;

    /// Whether the option may be left out of a valid configuration.
    fn is_optional(&self) -> bool;
}

/// Value domain of a binary option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinarySetting {
    Selected,
    Deselected,
}

impl BinarySetting {
    pub const fn is_selected(self) -> bool {
        matches!(self, Self::Selected)
    }

    pub const fn as_f64(self) -> f64 {
        match self {
            Self::Selected => 1.0,
            Self::Deselected => 0.0,
        }
    }
}

/// A Boolean configuration knob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryOption {
    pub name: String,

    #[serde(default)]
    pub parent: Option<String>,

    #[serde(default = "default_optional")]
    pub optional: bool,

    /// Each group is a disjunction: selecting this option forces at least one
    /// member of every group.
    #[serde(default)]
    pub implied: Vec<Vec<String>>,

    /// Each group lists options that cannot be selected together with this one.
    #[serde(default)]
    pub excluded: Vec<Vec<String>>,
}

const fn default_optional() -> bool {
    true
}

impl BinaryOption {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            optional: true,
            implied: Vec::new(),
            excluded: Vec::new(),
        }
    }

    pub fn mandatory(name: impl Into<String>) -> Self {
        Self {
            optional: false,
            ..Self::new(name)
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    #[must_use]
    pub fn excluding<I, S>(mut self, group: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.push(group.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn implying<I, S>(mut self, group: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.implied.push(group.into_iter().map(Into::into).collect());
        self
    }

    /// All options this one excludes, flattened over its groups.
    pub fn excluded_options(&self) -> impl Iterator<Item = &str> {
        self.excluded.iter().flatten().map(String::as_str)
    }
}

impl ConfigurationOption for BinaryOption {
    fn name(&self) -> &str {
        &self.name
    }

    fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    fn is_optional(&self) -> bool {
        self.optional
    }
}

/// A real-valued configuration knob with a finite, ordered value domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericOption {
    pub name: String,

    #[serde(default)]
    pub parent: Option<String>,

    pub min: f64,

    pub max: f64,

    /// Step function in the variable `n`, e.g. `n + 1` or `n * 2`.
    #[serde(default)]
    pub step: Option<String>,

    /// Explicit value list; takes precedence over `step`.
    #[serde(default)]
    pub values: Option<Vec<f64>>,

    #[serde(default)]
    pub prefix: String,

    #[serde(default)]
    pub suffix: String,
}

impl NumericOption {
    pub fn new(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            parent: None,
            min,
            max,
            step: None,
            values: None,
            prefix: String::new(),
            suffix: String::new(),
        }
    }

    #[must_use]
    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }

    /// Admissible values in ascending order.
    pub fn value_domain(&self) -> Result<Vec<f64>, String> {
        if self.min > self.max {
            return Err(format!(
                "min {} is greater than max {} for '{}'",
                self.min, self.max, self.name
            ));
        }

        if let Some(values) = &self.values {
            let mut domain: Vec<f64> = values
                .iter()
                .copied()
                .filter(|v| *v >= self.min - EPSILON && *v <= self.max + EPSILON)
                .collect();
            domain.sort_by(f64::total_cmp);
            domain.dedup();
            return Ok(domain);
        }

        let step = Expr::parse(self.step.as_deref().unwrap_or("n + 1"))
            .map_err(|e| format!("invalid step function for '{}': {e}", self.name))?;

        let mut domain = Vec::new();
        let mut current = self.min;
        while current <= self.max + EPSILON {
            domain.push(current);
            if domain.len() >= MAX_NUMERIC_VALUES {
                return Err(format!(
                    "value domain of '{}' exceeds {MAX_NUMERIC_VALUES} values",
                    self.name
                ));
            }
            let next = step
                .evaluate(&|name: &str| (name == "n").then_some(current))
                .ok_or_else(|| format!("step function of '{}' may only use 'n'", self.name))?;
            if next <= current {
                return Err(format!(
                    "step function of '{}' does not increase at {current}",
                    self.name
                ));
            }
            current = next;
        }
        Ok(domain)
    }

    /// Render a value with the option's output affixes.
    pub fn format_value(&self, value: f64) -> String {
        format!("{}{value}{}", self.prefix, self.suffix)
    }
}

impl ConfigurationOption for NumericOption {
    fn name(&self) -> &str {
        &self.name
    }

    fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    fn is_optional(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_step_domain() {
        let option = NumericOption::new("threads", 1.0, 4.0);
        assert_eq!(option.value_domain().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_multiplicative_step_domain() {
        let option = NumericOption::new("cache", 1.0, 16.0).with_step("n * 2");
        assert_eq!(
            option.value_domain().unwrap(),
            vec![1.0, 2.0, 4.0, 8.0, 16.0]
        );
    }

    #[test]
    fn test_explicit_values_are_sorted_and_clamped() {
        let mut option = NumericOption::new("level", 0.0, 5.0);
        option.values = Some(vec![3.0, 1.0, 9.0, 1.0]);
        assert_eq!(option.value_domain().unwrap(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_non_increasing_step_is_rejected() {
        let option = NumericOption::new("bad", 0.0, 5.0).with_step("n * 2");
        assert!(option.value_domain().is_err());
    }

    #[test]
    fn test_binary_builders() {
        let option = BinaryOption::mandatory("gzip")
            .with_parent("compression")
            .excluding(["bzip2"]);
        assert!(!option.is_optional());
        assert_eq!(option.parent(), Some("compression"));
        assert_eq!(option.excluded_options().collect::<Vec<_>>(), vec!["bzip2"]);
    }

    #[test]
    fn test_format_value() {
        let mut option = NumericOption::new("heap", 1.0, 2.0);
        option.prefix = "-Xmx".to_string();
        option.suffix = "g".to_string();
        assert_eq!(option.format_value(2.0), "-Xmx2g");
    }
}
