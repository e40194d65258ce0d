//! Variability model: the options and constraints of a configurable system.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use super::configuration::Configuration;
use super::constraint::{
    BooleanConstraint, Constraint, Literal, MixedConstraint, NonBooleanConstraint, Polarity,
    Requirement,
};
use super::option::{BinaryOption, ConfigurationOption, NumericOption, OptionSet};
use crate::domain::errors::{DomainError, DomainResult};

/// Options and constraints of a configurable system.
///
/// Immutable once built. The `name` and `path` identify the model towards
/// solver adapters, which cache their encoding under that key.
#[derive(Debug, Clone)]
pub struct VariabilityModel {
    name: String,
    path: Option<PathBuf>,
    binary_options: Vec<BinaryOption>,
    numeric_options: Vec<NumericOption>,
    constraints: Vec<Constraint>,
    binary_index: HashMap<String, usize>,
    numeric_index: HashMap<String, usize>,
}

/// On-disk (YAML) form of a variability model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelFile {
    pub name: String,

    #[serde(default)]
    pub binary_options: Vec<BinaryOption>,

    #[serde(default)]
    pub numeric_options: Vec<NumericOption>,

    #[serde(default)]
    pub constraints: ConstraintsFile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstraintsFile {
    #[serde(default)]
    pub boolean: Vec<String>,

    #[serde(default)]
    pub non_boolean: Vec<String>,

    #[serde(default)]
    pub mixed: Vec<MixedConstraintFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixedConstraintFile {
    pub expression: String,
    pub requirement: Requirement,
    #[serde(default = "default_polarity")]
    pub polarity: Polarity,
}

const fn default_polarity() -> Polarity {
    Polarity::Positive
}

/// Incremental construction of a [`VariabilityModel`].
#[derive(Debug, Clone, Default)]
pub struct VariabilityModelBuilder {
    file: ModelFile,
    path: Option<PathBuf>,
}

impl VariabilityModelBuilder {
    #[must_use]
    pub fn binary(mut self, option: BinaryOption) -> Self {
        self.file.binary_options.push(option);
        self
    }

    #[must_use]
    pub fn numeric(mut self, option: NumericOption) -> Self {
        self.file.numeric_options.push(option);
        self
    }

    #[must_use]
    pub fn boolean_constraint(mut self, src: impl Into<String>) -> Self {
        self.file.constraints.boolean.push(src.into());
        self
    }

    #[must_use]
    pub fn non_boolean_constraint(mut self, src: impl Into<String>) -> Self {
        self.file.constraints.non_boolean.push(src.into());
        self
    }

    #[must_use]
    pub fn mixed_constraint(
        mut self,
        src: impl Into<String>,
        requirement: Requirement,
        polarity: Polarity,
    ) -> Self {
        self.file.constraints.mixed.push(MixedConstraintFile {
            expression: src.into(),
            requirement,
            polarity,
        });
        self
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn build(self) -> DomainResult<VariabilityModel> {
        VariabilityModel::from_file(self.file, self.path)
    }
}

impl VariabilityModel {
    pub fn builder(name: impl Into<String>) -> VariabilityModelBuilder {
        VariabilityModelBuilder {
            file: ModelFile {
                name: name.into(),
                ..ModelFile::default()
            },
            path: None,
        }
    }

    /// Parse a model from YAML text.
    pub fn from_yaml_str(yaml: &str) -> DomainResult<Self> {
        let file: ModelFile = serde_yaml::from_str(yaml)?;
        Self::from_file(file, None)
    }

    /// Load a model from a YAML file; the file path becomes the model path.
    pub async fn load(path: impl AsRef<Path>) -> DomainResult<Self> {
        let path = path.as_ref();
        let yaml = tokio::fs::read_to_string(path).await?;
        let file: ModelFile = serde_yaml::from_str(&yaml)?;
        Self::from_file(file, Some(path.to_path_buf()))
    }

    /// Validate a model file and parse its constraints.
    pub fn from_file(file: ModelFile, path: Option<PathBuf>) -> DomainResult<Self> {
        let mut constraints = Vec::new();
        for src in &file.constraints.boolean {
            constraints.push(Constraint::Boolean(BooleanConstraint::parse(src)?));
        }
        for src in &file.constraints.non_boolean {
            constraints.push(Constraint::NonBoolean(NonBooleanConstraint::parse(src)?));
        }
        for mixed in &file.constraints.mixed {
            constraints.push(Constraint::Mixed(MixedConstraint::parse(
                &mixed.expression,
                mixed.requirement,
                mixed.polarity,
            )?));
        }

        let binary_index = file
            .binary_options
            .iter()
            .enumerate()
            .map(|(i, o)| (o.name.clone(), i))
            .collect();
        let numeric_index = file
            .numeric_options
            .iter()
            .enumerate()
            .map(|(i, o)| (o.name.clone(), i))
            .collect();

        let model = Self {
            name: file.name,
            path,
            binary_options: file.binary_options,
            numeric_options: file.numeric_options,
            constraints,
            binary_index,
            numeric_index,
        };
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> DomainResult<()> {
        let mut seen = HashSet::new();
        let all_names = self
            .binary_options
            .iter()
            .map(|o| o.name.as_str())
            .chain(self.numeric_options.iter().map(|o| o.name.as_str()));
        for name in all_names {
            if name.is_empty() {
                return Err(DomainError::InvalidModel("option with empty name".to_string()));
            }
            if !seen.insert(name) {
                return Err(DomainError::InvalidModel(format!(
                    "duplicate option name '{name}'"
                )));
            }
        }

        for option in &self.binary_options {
            self.validate_parent(option)?;
            for group in option.implied.iter().chain(&option.excluded) {
                if group.is_empty() {
                    return Err(DomainError::InvalidModel(format!(
                        "empty implied/excluded group on '{}'",
                        option.name
                    )));
                }
                for referenced in group {
                    if referenced == &option.name {
                        return Err(DomainError::InvalidModel(format!(
                            "'{}' references itself",
                            option.name
                        )));
                    }
                    if !self.is_binary_option(referenced) {
                        return Err(DomainError::UnknownOption(referenced.clone()));
                    }
                }
            }
        }

        for option in &self.numeric_options {
            self.validate_parent(option)?;
            let domain = option.value_domain().map_err(DomainError::InvalidModel)?;
            if domain.is_empty() {
                return Err(DomainError::InvalidModel(format!(
                    "numeric option '{}' has an empty value domain",
                    option.name
                )));
            }
        }

        for constraint in &self.constraints {
            for name in constraint.options() {
                let known = match constraint {
                    Constraint::Boolean(_) => self.is_binary_option(&name),
                    _ => self.is_binary_option(&name) || self.is_numeric_option(&name),
                };
                if !known {
                    return Err(DomainError::InvalidConstraint {
                        constraint: constraint.source().to_string(),
                        reason: format!("unknown option '{name}'"),
                    });
                }
            }
        }

        Ok(())
    }

    fn validate_parent(&self, option: &dyn ConfigurationOption) -> DomainResult<()> {
        let Some(parent) = option.parent() else {
            return Ok(());
        };
        if !self.is_binary_option(parent) {
            return Err(DomainError::InvalidModel(format!(
                "parent '{parent}' of '{}' is not a binary option",
                option.name()
            )));
        }

        // Walk up the hierarchy; a chain longer than the option count is a cycle.
        let mut current = Some(parent);
        let mut steps = 0;
        while let Some(name) = current {
            if name == option.name() || steps > self.binary_options.len() {
                return Err(DomainError::InvalidModel(format!(
                    "parent cycle through '{}'",
                    option.name()
                )));
            }
            current = self.binary_option(name).and_then(|o| o.parent.as_deref());
            steps += 1;
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Key under which solver adapters cache this model.
    pub fn cache_key(&self) -> String {
        match &self.path {
            Some(path) => format!("{}@{}", self.name, path.display()),
            None => self.name.clone(),
        }
    }

    pub fn binary_options(&self) -> &[BinaryOption] {
        &self.binary_options
    }

    pub fn numeric_options(&self) -> &[NumericOption] {
        &self.numeric_options
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn binary_option(&self, name: &str) -> Option<&BinaryOption> {
        self.binary_index.get(name).map(|&i| &self.binary_options[i])
    }

    pub fn numeric_option(&self, name: &str) -> Option<&NumericOption> {
        self.numeric_index.get(name).map(|&i| &self.numeric_options[i])
    }

    pub fn is_binary_option(&self, name: &str) -> bool {
        self.binary_index.contains_key(name)
    }

    pub fn is_numeric_option(&self, name: &str) -> bool {
        self.numeric_index.contains_key(name)
    }

    /// Whether either option excludes the other.
    pub fn excludes(&self, a: &str, b: &str) -> bool {
        let direct = |from: &str, to: &str| {
            self.binary_option(from)
                .is_some_and(|o| o.excluded_options().any(|e| e == to))
        };
        direct(a, b) || direct(b, a)
    }

    /// Whether no two options of `options` exclude each other.
    pub fn mutually_compatible<'a, I>(&self, options: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let options: Vec<&str> = options.into_iter().collect();
        options.iter().enumerate().all(|(i, a)| {
            options[i + 1..].iter().all(|b| !self.excludes(a, b))
        })
    }

    /// The alternative group containing `name`: siblings that pairwise
    /// exclude each other. `None` when the option is not part of one.
    pub fn alternative_group(&self, name: &str) -> Option<OptionSet> {
        let option = self.binary_option(name)?;
        let mut group: OptionSet = self
            .binary_options
            .iter()
            .filter(|sibling| sibling.name != option.name && sibling.parent == option.parent)
            .filter(|sibling| self.excludes(&option.name, &sibling.name))
            .map(|sibling| sibling.name.clone())
            .collect();
        if group.is_empty() {
            return None;
        }
        group.insert(option.name.clone());
        self.pairwise_excluded(&group).then_some(group)
    }

    fn pairwise_excluded(&self, group: &OptionSet) -> bool {
        let members: Vec<&String> = group.iter().collect();
        members.iter().enumerate().all(|(i, a)| {
            members[i + 1..].iter().all(|b| self.excludes(a, b))
        })
    }

    /// All distinct alternative groups, in model order of their first member.
    pub fn alternative_groups(&self) -> Vec<OptionSet> {
        let mut groups: Vec<OptionSet> = Vec::new();
        for option in &self.binary_options {
            if let Some(group) = self.alternative_group(&option.name) {
                if !groups.contains(&group) {
                    groups.push(group);
                }
            }
        }
        groups
    }

    /// Binary options the combinatorial heuristics vary: optional options
    /// and members of alternative groups.
    pub fn sampling_candidates(&self) -> Vec<&BinaryOption> {
        self.binary_options
            .iter()
            .filter(|o| o.optional || self.alternative_group(&o.name).is_some())
            .collect()
    }

    /// The Boolean part of the model as CNF: hierarchy, mandatory options,
    /// alternative groups, implied/excluded groups and Boolean constraints.
    pub fn boolean_clauses(&self) -> Vec<Vec<Literal>> {
        let mut clauses: Vec<Vec<Literal>> = Vec::new();

        for option in &self.binary_options {
            if let Some(parent) = &option.parent {
                clauses.push(vec![Literal::negative(&option.name), Literal::positive(parent)]);
            }

            if !option.optional && option.excluded.is_empty() {
                match &option.parent {
                    Some(parent) => clauses.push(vec![
                        Literal::negative(parent),
                        Literal::positive(&option.name),
                    ]),
                    None => clauses.push(vec![Literal::positive(&option.name)]),
                }
            }

            for group in &option.implied {
                let mut clause = vec![Literal::negative(&option.name)];
                clause.extend(group.iter().map(Literal::positive));
                clauses.push(clause);
            }

            for excluded in option.excluded_options() {
                clauses.push(vec![
                    Literal::negative(&option.name),
                    Literal::negative(excluded),
                ]);
            }
        }

        for group in self.alternative_groups() {
            let has_mandatory_member = group
                .iter()
                .filter_map(|name| self.binary_option(name))
                .any(|o| !o.optional);
            if !has_mandatory_member {
                continue;
            }
            let parent = group
                .iter()
                .next()
                .and_then(|name| self.binary_option(name))
                .and_then(|o| o.parent.clone());
            let mut clause: Vec<Literal> = parent.into_iter().map(Literal::negative).collect();
            clause.extend(group.iter().map(Literal::positive));
            clauses.push(clause);
        }

        for constraint in &self.constraints {
            if let Constraint::Boolean(boolean) = constraint {
                clauses.extend(boolean.clauses().iter().cloned());
            }
        }

        let mut seen = HashSet::new();
        clauses.retain(|clause| {
            let key: BTreeSet<(String, bool)> = clause
                .iter()
                .map(|l| (l.option.clone(), l.negated))
                .collect();
            seen.insert(key)
        });
        clauses
    }

    /// Check a full Boolean assignment against [`Self::boolean_clauses`].
    pub fn is_valid_selection(&self, selected: &OptionSet) -> bool {
        selected.iter().all(|name| self.is_binary_option(name))
            && self
                .boolean_clauses()
                .iter()
                .all(|clause| clause.iter().any(|l| l.is_satisfied_by(selected)))
    }

    /// Whether every applicable non-Boolean and mixed constraint holds.
    pub fn satisfies_numeric_constraints(&self, config: &Configuration) -> bool {
        self.constraints.iter().all(|constraint| match constraint {
            Constraint::Boolean(_) => true,
            Constraint::NonBoolean(c) => c.is_satisfied_by(config),
            Constraint::Mixed(c) => c.is_satisfied_by(config, self),
        })
    }

    /// Full validity check: Boolean assignment plus numeric constraints.
    pub fn is_valid_configuration(&self, config: &Configuration) -> bool {
        self.is_valid_selection(&config.selected_options())
            && self.satisfies_numeric_constraints(config)
    }
}
