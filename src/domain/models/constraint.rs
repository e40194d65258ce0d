//! Cross-tree constraints of a variability model.
//!
//! Boolean constraints are CNF over binary options and are enforced by the
//! solver. Non-Boolean and mixed constraints compare arithmetic expressions
//! and are checked against concrete configurations.

use std::fmt;

use super::configuration::Configuration;
use super::expression::Expr;
use super::option::OptionSet;
use super::variability_model::VariabilityModel;
use crate::domain::errors::{DomainError, DomainResult};

fn invalid(constraint: &str, reason: impl Into<String>) -> DomainError {
    DomainError::InvalidConstraint {
        constraint: constraint.to_string(),
        reason: reason.into(),
    }
}

/// A possibly negated binary option.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    pub option: String,
    pub negated: bool,
}

impl Literal {
    pub fn positive(option: impl Into<String>) -> Self {
        Self {
            option: option.into(),
            negated: false,
        }
    }

    pub fn negative(option: impl Into<String>) -> Self {
        Self {
            option: option.into(),
            negated: true,
        }
    }

    pub fn is_satisfied_by(&self, selected: &OptionSet) -> bool {
        selected.contains(&self.option) != self.negated
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "!{}", self.option)
        } else {
            write!(f, "{}", self.option)
        }
    }
}

/// Conjunction of clauses, each a disjunction of literals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BooleanConstraint {
    source: String,
    clauses: Vec<Vec<Literal>>,
}

impl BooleanConstraint {
    /// Parse CNF text: `(a | !b) & c`.
    pub fn parse(src: &str) -> DomainResult<Self> {
        let mut clauses = Vec::new();
        for raw_clause in src.split('&') {
            let clause_text = raw_clause.trim();
            let clause_text = clause_text
                .strip_prefix('(')
                .and_then(|c| c.strip_suffix(')'))
                .unwrap_or(clause_text);
            if clause_text.contains(['(', ')']) {
                return Err(invalid(src, "nested parentheses are not supported"));
            }

            let mut clause = Vec::new();
            for raw_literal in clause_text.split('|') {
                let literal = raw_literal.trim();
                let (negated, name) = match literal.strip_prefix('!') {
                    Some(rest) => (true, rest.trim()),
                    None => (false, literal),
                };
                if name.is_empty() || name.contains(char::is_whitespace) {
                    return Err(invalid(src, format!("malformed literal '{literal}'")));
                }
                clause.push(Literal {
                    option: name.to_string(),
                    negated,
                });
            }
            clauses.push(clause);
        }

        Ok(Self {
            source: src.trim().to_string(),
            clauses,
        })
    }

    pub fn from_clauses(clauses: Vec<Vec<Literal>>) -> Self {
        let source = clauses
            .iter()
            .map(|clause| {
                let literals: Vec<String> = clause.iter().map(ToString::to_string).collect();
                format!("({})", literals.join(" | "))
            })
            .collect::<Vec<_>>()
            .join(" & ");
        Self { source, clauses }
    }

    pub fn clauses(&self) -> &[Vec<Literal>] {
        &self.clauses
    }

    pub fn options(&self) -> OptionSet {
        self.clauses
            .iter()
            .flatten()
            .map(|literal| literal.option.clone())
            .collect()
    }

    /// Evaluate against a full assignment given as its selected set.
    pub fn is_satisfied_by(&self, selected: &OptionSet) -> bool {
        self.clauses
            .iter()
            .all(|clause| clause.iter().any(|literal| literal.is_satisfied_by(selected)))
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Comparison operator of a non-Boolean constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Less,
    LessEq,
    Equal,
    NotEqual,
    Greater,
    GreaterEq,
}

impl Comparator {
    const EPSILON: f64 = 1e-9;

    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Less => lhs < rhs - Self::EPSILON,
            Self::LessEq => lhs <= rhs + Self::EPSILON,
            Self::Equal => (lhs - rhs).abs() <= Self::EPSILON,
            Self::NotEqual => (lhs - rhs).abs() > Self::EPSILON,
            Self::Greater => lhs > rhs + Self::EPSILON,
            Self::GreaterEq => lhs >= rhs - Self::EPSILON,
        }
    }

    /// Locate the comparator in `src`, returning it with its byte span.
    fn find(src: &str) -> Option<(Self, usize, usize)> {
        const OPERATORS: [(&str, Comparator); 7] = [
            ("<=", Comparator::LessEq),
            (">=", Comparator::GreaterEq),
            ("==", Comparator::Equal),
            ("!=", Comparator::NotEqual),
            ("<", Comparator::Less),
            (">", Comparator::Greater),
            ("=", Comparator::Equal),
        ];
        OPERATORS
            .iter()
            .find_map(|(symbol, op)| src.find(symbol).map(|at| (*op, at, at + symbol.len())))
    }
}

/// Arithmetic comparison over numeric and binary options.
#[derive(Debug, Clone, PartialEq)]
pub struct NonBooleanConstraint {
    source: String,
    lhs: Expr,
    comparator: Comparator,
    rhs: Expr,
}

impl NonBooleanConstraint {
    pub fn parse(src: &str) -> DomainResult<Self> {
        let (comparator, start, end) =
            Comparator::find(src).ok_or_else(|| invalid(src, "missing comparison operator"))?;
        let lhs = Expr::parse(&src[..start]).map_err(|e| invalid(src, e))?;
        let rhs = Expr::parse(&src[end..]).map_err(|e| invalid(src, e))?;
        Ok(Self {
            source: src.trim().to_string(),
            lhs,
            comparator,
            rhs,
        })
    }

    /// Names of all participating options.
    pub fn options(&self) -> OptionSet {
        let mut names = self.lhs.identifiers();
        names.extend(self.rhs.identifiers());
        names
    }

    /// Evaluate with a custom lookup; `None` when an option is unassigned.
    pub fn evaluate_with<F>(&self, lookup: &F) -> Option<bool>
    where
        F: Fn(&str) -> Option<f64>,
    {
        let lhs = self.lhs.evaluate(lookup)?;
        let rhs = self.rhs.evaluate(lookup)?;
        Some(self.comparator.holds(lhs, rhs))
    }

    /// Whether every participating option is assigned in `config`.
    pub fn applies_to(&self, config: &Configuration) -> bool {
        self.options()
            .iter()
            .all(|name| config.value_of(name).is_some())
    }

    /// Vacuously true unless every participating option is assigned.
    pub fn is_satisfied_by(&self, config: &Configuration) -> bool {
        self.evaluate_with(&|name: &str| config.value_of(name))
            .unwrap_or(true)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// When a mixed constraint's comparison is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    /// Only when every participating binary option is selected and every
    /// participating numeric option is assigned.
    All,
    /// Always, treating unassigned binary options as deselected.
    None,
}

/// Whether the comparison must hold or must fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Negative,
}

/// Non-Boolean constraint with an evaluation policy.
#[derive(Debug, Clone, PartialEq)]
pub struct MixedConstraint {
    inner: NonBooleanConstraint,
    requirement: Requirement,
    polarity: Polarity,
}

impl MixedConstraint {
    pub fn parse(src: &str, requirement: Requirement, polarity: Polarity) -> DomainResult<Self> {
        Ok(Self {
            inner: NonBooleanConstraint::parse(src)?,
            requirement,
            polarity,
        })
    }

    pub fn options(&self) -> OptionSet {
        self.inner.options()
    }

    pub const fn requirement(&self) -> Requirement {
        self.requirement
    }

    pub const fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn source(&self) -> &str {
        self.inner.source()
    }

    pub fn is_satisfied_by(&self, config: &Configuration, model: &VariabilityModel) -> bool {
        let outcome = match self.requirement {
            Requirement::All => {
                let present = self.options().iter().all(|name| {
                    if model.is_binary_option(name) {
                        config.is_selected(name)
                    } else {
                        config.numeric_value(name).is_some()
                    }
                });
                if !present {
                    return true;
                }
                self.inner.evaluate_with(&|name: &str| config.value_of(name))
            }
            Requirement::None => self.inner.evaluate_with(&|name: &str| {
                config.value_of(name).or_else(|| {
                    model.is_binary_option(name).then_some(0.0)
                })
            }),
        };

        match outcome {
            Some(holds) => holds == matches!(self.polarity, Polarity::Positive),
            None => true,
        }
    }
}

/// Any constraint of a variability model.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Boolean(BooleanConstraint),
    NonBoolean(NonBooleanConstraint),
    Mixed(MixedConstraint),
}

impl Constraint {
    pub fn options(&self) -> OptionSet {
        match self {
            Self::Boolean(c) => c.options(),
            Self::NonBoolean(c) => c.options(),
            Self::Mixed(c) => c.options(),
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Self::Boolean(c) => c.source(),
            Self::NonBoolean(c) => c.source(),
            Self::Mixed(c) => c.source(),
        }
    }
}
