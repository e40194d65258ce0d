//! Configurations: assignments of values to options.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::option::{BinarySetting, OptionSet};
use super::variability_model::VariabilityModel;

/// One complete or partial assignment of values to options, plus measured or
/// predicted non-functional property (NFP) values.
///
/// Equality and hashing only look at the selected binary options and the
/// numeric assignment; NFP values never take part in deduplication.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Configuration {
    binary: BTreeMap<String, BinarySetting>,

    numeric: BTreeMap<String, f64>,

    #[serde(default)]
    nfp_values: BTreeMap<String, f64>,
}

impl Configuration {
    pub fn new(binary: BTreeMap<String, BinarySetting>, numeric: BTreeMap<String, f64>) -> Self {
        Self {
            binary,
            numeric,
            nfp_values: BTreeMap::new(),
        }
    }

    /// Build a configuration from a selected-option set, marking every other
    /// binary option of the model as deselected.
    pub fn from_selection(
        model: &VariabilityModel,
        selected: &OptionSet,
        numeric: BTreeMap<String, f64>,
    ) -> Self {
        let binary = model
            .binary_options()
            .iter()
            .map(|option| {
                let setting = if selected.contains(&option.name) {
                    BinarySetting::Selected
                } else {
                    BinarySetting::Deselected
                };
                (option.name.clone(), setting)
            })
            .collect();
        Self::new(binary, numeric)
    }

    /// Partial configuration that only records the selected options.
    pub fn from_selected<I, S>(selected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let binary = selected
            .into_iter()
            .map(|name| (name.into(), BinarySetting::Selected))
            .collect();
        Self::new(binary, BTreeMap::new())
    }

    #[must_use]
    pub fn with_numeric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.numeric.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn with_nfp(mut self, nfp: impl Into<String>, value: f64) -> Self {
        self.nfp_values.insert(nfp.into(), value);
        self
    }

    pub fn binary_options(&self) -> &BTreeMap<String, BinarySetting> {
        &self.binary
    }

    pub fn numeric_options(&self) -> &BTreeMap<String, f64> {
        &self.numeric
    }

    pub fn nfp_values(&self) -> &BTreeMap<String, f64> {
        &self.nfp_values
    }

    /// Names of all selected binary options.
    pub fn selected_options(&self) -> OptionSet {
        self.binary
            .iter()
            .filter(|(_, setting)| setting.is_selected())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn is_selected(&self, option: &str) -> bool {
        self.binary
            .get(option)
            .is_some_and(|setting| setting.is_selected())
    }

    pub fn binary_setting(&self, option: &str) -> Option<BinarySetting> {
        self.binary.get(option).copied()
    }

    pub fn numeric_value(&self, option: &str) -> Option<f64> {
        self.numeric.get(option).copied()
    }

    /// Value of an option as a number: binary options coerce to 1/0, unassigned
    /// options yield `None`.
    pub fn value_of(&self, option: &str) -> Option<f64> {
        self.binary
            .get(option)
            .map(|setting| setting.as_f64())
            .or_else(|| self.numeric.get(option).copied())
    }

    pub fn nfp(&self, nfp: &str) -> Option<f64> {
        self.nfp_values.get(nfp).copied()
    }

    pub fn set_nfp(&mut self, nfp: impl Into<String>, value: f64) {
        self.nfp_values.insert(nfp.into(), value);
    }

    /// Copy all NFP values from another configuration.
    pub fn merge_nfp_values(&mut self, other: &Self) {
        for (nfp, value) in &other.nfp_values {
            self.nfp_values.insert(nfp.clone(), *value);
        }
    }

    /// Number of binary options whose selection differs plus the number of
    /// numeric options whose value differs.
    pub fn hamming_distance(&self, other: &Self) -> usize {
        let selected = self.selected_options();
        let other_selected = other.selected_options();
        let binary = selected.symmetric_difference(&other_selected).count();

        let mut numeric = 0;
        for (name, value) in &self.numeric {
            if other.numeric.get(name) != Some(value) {
                numeric += 1;
            }
        }
        numeric += other
            .numeric
            .keys()
            .filter(|name| !self.numeric.contains_key(*name))
            .count();

        binary + numeric
    }
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        self.selected_options() == other.selected_options()
            && self.numeric.len() == other.numeric.len()
            && self
                .numeric
                .iter()
                .zip(&other.numeric)
                .all(|((a, x), (b, y))| a == b && x.to_bits() == y.to_bits())
    }
}

// Numeric values come from finite value domains, never NaN.
impl Eq for Configuration {}

impl Hash for Configuration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for (name, setting) in &self.binary {
            if setting.is_selected() {
                name.hash(state);
            }
        }
        for (name, value) in &self.numeric {
            name.hash(state);
            value.to_bits().hash(state);
        }
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let selected: Vec<String> = self.selected_options().into_iter().collect();
        write!(f, "{}", selected.join(","))?;
        if !self.numeric.is_empty() {
            let numeric: Vec<String> = self
                .numeric
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            write!(f, "; {}", numeric.join(","))?;
        }
        Ok(())
    }
}
