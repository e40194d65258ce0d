//! Sampling-task specifications.
//!
//! A task line is a strategy name followed by space-separated tokens, each
//! either `key:value` or a bracketed option list `[opt1,opt2]`:
//!
//! ```text
//! random seed:3 modulus:5 threshold:200
//! twise t:3
//! boxbehnken [threads,cache]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::{DomainError, DomainResult};

/// Built-in heuristics over binary options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryStrategy {
    FeatureWise,
    NegativeFeatureWise,
    PairWise,
    TWise,
    Random,
    Bucket,
    AllBinary,
}

impl BinaryStrategy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FeatureWise => "featurewise",
            Self::NegativeFeatureWise => "negfw",
            Self::PairWise => "pairwise",
            Self::TWise => "twise",
            Self::Random => "random",
            Self::Bucket => "bucket",
            Self::AllBinary => "allbinary",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "featurewise" | "fw" | "feature-wise" => Some(Self::FeatureWise),
            "negfw" | "negfeaturewise" | "negative-featurewise" => {
                Some(Self::NegativeFeatureWise)
            }
            "pairwise" | "pw" => Some(Self::PairWise),
            "twise" | "tw" | "t-wise" => Some(Self::TWise),
            "random" | "randombinary" => Some(Self::Random),
            "bucket" | "diversity" | "distance-based" | "distancebased" => Some(Self::Bucket),
            "allbinary" | "all" => Some(Self::AllBinary),
            _ => None,
        }
    }
}

/// What a task runs: a binary heuristic or a named numeric design.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Binary(BinaryStrategy),
    Numeric(String),
}

impl StrategyKind {
    pub fn name(&self) -> &str {
        match self {
            Self::Binary(strategy) => strategy.as_str(),
            Self::Numeric(name) => name,
        }
    }
}

/// One strategy plus its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplingTask {
    pub kind: StrategyKind,
    /// Parameters with lower-cased keys.
    pub params: BTreeMap<String, String>,
    /// Options a numeric design is restricted to; empty means all.
    pub options: Vec<String>,
}

/// Result of parsing a task line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedTask {
    Task(SamplingTask),
    /// The leading token names no known strategy; the line is handed back.
    Unhandled(String),
}

impl SamplingTask {
    pub fn binary(strategy: BinaryStrategy) -> Self {
        Self {
            kind: StrategyKind::Binary(strategy),
            params: BTreeMap::new(),
            options: Vec::new(),
        }
    }

    pub fn numeric(design: impl Into<String>) -> Self {
        Self {
            kind: StrategyKind::Numeric(design.into()),
            params: BTreeMap::new(),
            options: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.insert(key.to_lowercase(), value.to_string());
        self
    }

    /// Parse a line that may only name a binary heuristic.
    pub fn parse(line: &str) -> DomainResult<ParsedTask> {
        Self::parse_with(line, |_| false)
    }

    /// Parse a line; `is_numeric_design` decides which other names are known.
    pub fn parse_with<F>(line: &str, is_numeric_design: F) -> DomainResult<ParsedTask>
    where
        F: Fn(&str) -> bool,
    {
        let tokens = split_tokens(line);
        let mut tokens = tokens.iter().map(String::as_str);
        let Some(head) = tokens.next() else {
            return Ok(ParsedTask::Unhandled(line.to_string()));
        };

        let kind = if let Some(strategy) = BinaryStrategy::from_str(head) {
            StrategyKind::Binary(strategy)
        } else if is_numeric_design(&head.to_lowercase()) {
            StrategyKind::Numeric(head.to_lowercase())
        } else {
            return Ok(ParsedTask::Unhandled(line.to_string()));
        };

        let mut task = Self {
            kind,
            params: BTreeMap::new(),
            options: Vec::new(),
        };

        for token in tokens {
            if let Some(list) = token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
                task.options.extend(
                    list.split(',')
                        .map(str::trim)
                        .filter(|name| !name.is_empty())
                        .map(ToString::to_string),
                );
            } else if let Some((key, value)) = token.split_once(':') {
                if key.is_empty() || value.is_empty() {
                    return Err(task.invalid(key, value, "expected key:value"));
                }
                task.params.insert(key.to_lowercase(), value.to_string());
            } else {
                // A bare token is a flag.
                task.params.insert(token.to_lowercase(), "true".to_string());
            }
        }

        Ok(ParsedTask::Task(task))
    }

    pub fn name(&self) -> &str {
        self.kind.name()
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Typed parameter lookup with a default for missing keys.
    pub fn param_or<T>(&self, key: &str, default: T) -> DomainResult<T>
    where
        T: FromStr,
    {
        match self.param(key) {
            Some(raw) => raw
                .parse::<T>()
                .map_err(|_| self.invalid(key, raw, "cannot parse value")),
            None => Ok(default),
        }
    }

    pub fn invalid(&self, key: &str, value: &str, reason: &str) -> DomainError {
        DomainError::InvalidParameter {
            strategy: self.name().to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the task consumes a pseudo-random seed.
    pub fn is_seeded(&self) -> bool {
        matches!(self.kind, StrategyKind::Binary(BinaryStrategy::Random))
            || self.params.contains_key("seed")
    }

    pub fn seed(&self) -> DomainResult<u64> {
        self.param_or("seed", 0)
    }

    /// Move a seeded task to its next seed.
    pub fn advance_seed(&mut self) -> DomainResult<()> {
        if self.is_seeded() {
            let next = self.seed()?.wrapping_add(1);
            self.params.insert("seed".to_string(), next.to_string());
        }
        Ok(())
    }
}

/// Split on whitespace, keeping a bracketed option list in one token.
fn split_tokens(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_brackets = false;

    for c in line.chars() {
        match c {
            '[' => {
                in_brackets = true;
                current.push(c);
            }
            ']' => {
                in_brackets = false;
                current.push(c);
            }
            c if c.is_whitespace() && !in_brackets => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c if c.is_whitespace() => {}
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

impl fmt::Display for SamplingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        for (key, value) in &self.params {
            write!(f, " {key}:{value}")?;
        }
        if !self.options.is_empty() {
            write!(f, " [{}]", self.options.join(","))?;
        }
        Ok(())
    }
}
