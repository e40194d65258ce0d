//! Configuration builder: runs sampling tasks and assembles configurations.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Configuration, NumericOption, OptionSet, ParsedTask, SamplingTask, StrategyKind,
};
use crate::domain::ports::{NumericAssignment, NumericDesign};

use super::sampling::{self, SampleSet};
use super::solver_facade::SolverFacade;

/// Ordered list of sampling tasks over one model.
///
/// `build` takes the cross product of every binary selection with every
/// numeric assignment, drops configurations violating non-Boolean or mixed
/// constraints, and deduplicates by configuration equality.
pub struct ConfigurationBuilder {
    solver: SolverFacade,
    designs: HashMap<String, Arc<dyn NumericDesign>>,
    tasks: Vec<SamplingTask>,
}

impl ConfigurationBuilder {
    /// Builder over `solver` with no tasks and no numeric designs.
    pub fn new(solver: SolverFacade) -> Self {
        Self {
            solver,
            designs: HashMap::new(),
            tasks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_design(mut self, design: Arc<dyn NumericDesign>) -> Self {
        self.register_design(design);
        self
    }

    /// Make a numeric design available to task lines under its name.
    pub fn register_design(&mut self, design: Arc<dyn NumericDesign>) {
        self.designs.insert(design.name().to_lowercase(), design);
    }

    pub fn is_numeric_design(&self, name: &str) -> bool {
        self.designs.contains_key(&name.to_lowercase())
    }

    pub fn solver(&self) -> &SolverFacade {
        &self.solver
    }

    /// Parse a task line against the built-in heuristics and registered
    /// designs. Unknown strategies come back as [`ParsedTask::Unhandled`].
    pub fn parse_task(&self, line: &str) -> DomainResult<ParsedTask> {
        SamplingTask::parse_with(line, |name| self.is_numeric_design(name))
    }

    /// Append a parsed task.
    pub fn add_task(&mut self, task: SamplingTask) {
        debug!(task = %task, "task added");
        self.tasks.push(task);
    }

    /// Parse and add a task line. An unhandled line is returned and not added.
    pub fn add_task_line(&mut self, line: &str) -> DomainResult<ParsedTask> {
        let parsed = self.parse_task(line)?;
        if let ParsedTask::Task(task) = &parsed {
            self.add_task(task.clone());
        }
        Ok(parsed)
    }

    pub fn tasks(&self) -> &[SamplingTask] {
        &self.tasks
    }

    /// Drop every task.
    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// Replace every task by `task` and drop cached solver state.
    pub async fn switch_task(&mut self, task: SamplingTask) -> DomainResult<()> {
        info!(task = %task, "switching sampling task");
        self.clear();
        self.solver.reset_cache().await?;
        self.add_task(task);
        Ok(())
    }

    /// Advance the seed of every seeded task.
    pub fn update_seeds(&mut self) -> DomainResult<()> {
        for task in &mut self.tasks {
            task.advance_seed()?;
        }
        Ok(())
    }

    /// Run all tasks and return configurations not already in `existing`.
    pub async fn build(&self, existing: &[Configuration]) -> DomainResult<Vec<Configuration>> {
        let model = self.solver.model();

        let mut binary = SampleSet::new();
        let mut has_binary_task = false;
        let mut numeric: Vec<NumericAssignment> = Vec::new();
        let mut seen_numeric: HashSet<Vec<(String, u64)>> = HashSet::new();

        for task in &self.tasks {
            match &task.kind {
                StrategyKind::Binary(_) => {
                    has_binary_task = true;
                    for selection in sampling::sample_binary(&self.solver, task).await? {
                        binary.insert(selection);
                    }
                }
                StrategyKind::Numeric(name) => {
                    for assignment in self.run_design(name, task).await? {
                        let key = assignment
                            .iter()
                            .map(|(option, value)| (option.clone(), value.to_bits()))
                            .collect();
                        if seen_numeric.insert(key) {
                            numeric.push(assignment);
                        }
                    }
                }
            }
        }

        // Numeric-only runs still need a valid Boolean part.
        if !has_binary_task {
            if let Some(selection) = self
                .solver
                .find_minimal_completion(&OptionSet::new(), &OptionSet::new())
                .await?
            {
                binary.insert(selection);
            }
        }

        let existing: HashSet<&Configuration> = existing.iter().collect();
        let mut seen: HashSet<Configuration> = HashSet::new();
        let mut result = Vec::new();
        let mut violating = 0usize;

        let numeric_parts: Vec<NumericAssignment> = if numeric.is_empty() {
            vec![BTreeMap::new()]
        } else {
            numeric
        };

        for selection in binary.iter() {
            for assignment in &numeric_parts {
                let config = Configuration::from_selection(model, selection, assignment.clone());
                if !model.satisfies_numeric_constraints(&config) {
                    violating += 1;
                    continue;
                }
                if existing.contains(&config) || seen.contains(&config) {
                    continue;
                }
                seen.insert(config.clone());
                result.push(config);
            }
        }

        info!(
            tasks = self.tasks.len(),
            binary = binary.len(),
            numeric = numeric_parts.len(),
            dropped_by_constraints = violating,
            configurations = result.len(),
            "configurations built"
        );
        Ok(result)
    }

    async fn run_design(&self, name: &str, task: &SamplingTask) -> DomainResult<Vec<NumericAssignment>> {
        let design = self
            .designs
            .get(&name.to_lowercase())
            .ok_or_else(|| DomainError::UnknownStrategy(name.to_string()))?;
        let model = self.solver.model();

        let options: Vec<NumericOption> = if task.options.is_empty() {
            model.numeric_options().to_vec()
        } else {
            task.options
                .iter()
                .map(|option| {
                    model
                        .numeric_option(option)
                        .cloned()
                        .ok_or_else(|| DomainError::UnknownOption(option.clone()))
                })
                .collect::<DomainResult<_>>()?
        };

        // Options outside the design keep their smallest admissible value.
        let mut defaults = NumericAssignment::new();
        for option in model.numeric_options() {
            if options.iter().any(|o| o.name == option.name) {
                continue;
            }
            let domain = option.value_domain().map_err(DomainError::InvalidModel)?;
            if let Some(first) = domain.first() {
                defaults.insert(option.name.clone(), *first);
            }
        }

        let assignments = design.generate(&options, task).await?;
        Ok(assignments
            .into_iter()
            .map(|mut assignment| {
                for (option, value) in &defaults {
                    assignment.entry(option.clone()).or_insert(*value);
                }
                assignment
            })
            .collect())
    }
}
