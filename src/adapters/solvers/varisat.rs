//! In-process SAT backend built on varisat.
//!
//! The Boolean part of the variability model is encoded once per binding.
//! Every query runs on a fresh solver so nothing solver-owned outlives a call;
//! the only state kept between calls is the encoded base formula and, per
//! bucket size, the cardinality encoding plus blocking clauses for every
//! selection already handed out.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use ::varisat::{ExtendFormula, Lit, Solver};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{FeatureWeights, OptionSet, VariabilityModel};
use crate::domain::ports::{SatisfiabilityChecker, VariantGenerator};

/// Clause set over option variables `0..options.len()` and auxiliary
/// variables above them.
#[derive(Debug)]
struct Cnf {
    options: Vec<String>,
    index: HashMap<String, usize>,
    clauses: Vec<Vec<Lit>>,
}

impl Cnf {
    fn encode(model: &VariabilityModel) -> DomainResult<Self> {
        let options: Vec<String> = model
            .binary_options()
            .iter()
            .map(|option| option.name.clone())
            .collect();
        let index: HashMap<String, usize> = options
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        let mut cnf = Self {
            options,
            index,
            clauses: Vec::new(),
        };
        for clause in model.boolean_clauses() {
            let lits = clause
                .iter()
                .map(|literal| cnf.lit(&literal.option, !literal.negated))
                .collect::<DomainResult<Vec<_>>>()?;
            cnf.clauses.push(lits);
        }
        Ok(cnf)
    }

    fn num_options(&self) -> usize {
        self.options.len()
    }

    fn lit(&self, option: &str, positive: bool) -> DomainResult<Lit> {
        self.index
            .get(option)
            .map(|&var| Lit::from_index(var, positive))
            .ok_or_else(|| DomainError::UnknownOption(option.to_string()))
    }

    fn lits<'a, I>(&self, options: I, positive: bool) -> DomainResult<Vec<Lit>>
    where
        I: IntoIterator<Item = &'a String>,
    {
        options
            .into_iter()
            .map(|name| self.lit(name, positive))
            .collect()
    }

    fn option_lits(&self, positive: bool) -> Vec<Lit> {
        (0..self.num_options())
            .map(|var| Lit::from_index(var, positive))
            .collect()
    }

    /// Fresh solver holding the base clauses, `extra` clauses, and at least
    /// `num_vars` variables.
    fn solver(&self, num_vars: usize, extra: &[Vec<Lit>]) -> Solver<'static> {
        let mut solver = Solver::new();
        for _ in 0..num_vars.max(self.num_options()) {
            solver.new_var();
        }
        for clause in self.clauses.iter().chain(extra) {
            solver.add_clause(clause);
        }
        solver
    }

    /// Selected options of a model; variables missing from it count as false.
    fn decode(&self, model: &[Lit]) -> OptionSet {
        model
            .iter()
            .filter(|lit| lit.is_positive() && lit.var().index() < self.num_options())
            .map(|lit| self.options[lit.var().index()].clone())
            .collect()
    }

    /// Clause excluding exactly this selection.
    fn blocking_clause(&self, selection: &OptionSet) -> Vec<Lit> {
        self.options
            .iter()
            .enumerate()
            .map(|(var, name)| Lit::from_index(var, !selection.contains(name)))
            .collect()
    }

    fn complement(&self, selection: &OptionSet) -> Vec<Lit> {
        self.options
            .iter()
            .enumerate()
            .filter(|(_, name)| !selection.contains(*name))
            .map(|(var, _)| Lit::from_index(var, false))
            .collect()
    }
}

fn solve(solver: &mut Solver<'_>, assumptions: &[Lit]) -> DomainResult<Option<Vec<Lit>>> {
    solver.assume(assumptions);
    let satisfiable = solver
        .solve()
        .map_err(|e| DomainError::SolverFailure(e.to_string()))?;
    Ok(if satisfiable { solver.model() } else { None })
}

/// Sequential-counter encoding of "at most `k` of `lits` are true".
fn at_most(lits: &[Lit], k: usize, next_var: &mut usize, out: &mut Vec<Vec<Lit>>) {
    let n = lits.len();
    if k >= n {
        return;
    }
    if k == 0 {
        out.extend(lits.iter().map(|&lit| vec![!lit]));
        return;
    }

    // s[i][j]: at least j + 1 of lits[..=i] are true.
    let mut s = Vec::with_capacity(n - 1);
    for _ in 0..n - 1 {
        let row: Vec<Lit> = (0..k)
            .map(|_| {
                let lit = Lit::from_index(*next_var, true);
                *next_var += 1;
                lit
            })
            .collect();
        s.push(row);
    }

    out.push(vec![!lits[0], s[0][0]]);
    for j in 1..k {
        out.push(vec![!s[0][j]]);
    }
    for i in 1..n - 1 {
        out.push(vec![!lits[i], s[i][0]]);
        out.push(vec![!s[i - 1][0], s[i][0]]);
        for j in 1..k {
            out.push(vec![!lits[i], !s[i - 1][j - 1], s[i][j]]);
            out.push(vec![!s[i - 1][j], s[i][j]]);
        }
        out.push(vec![!lits[i], !s[i - 1][k - 1]]);
    }
    out.push(vec![!lits[n - 1], !s[n - 2][k - 1]]);
}

/// Cached encoding for one bucket size.
#[derive(Debug)]
struct Bucket {
    clauses: Vec<Vec<Lit>>,
    num_vars: usize,
    exhausted: bool,
}

impl Bucket {
    fn new(cnf: &Cnf, selected_count: usize) -> Self {
        let n = cnf.num_options();
        let mut clauses = Vec::new();
        let mut num_vars = n;

        if selected_count > n {
            return Self {
                clauses,
                num_vars,
                exhausted: true,
            };
        }
        at_most(
            &cnf.option_lits(true),
            selected_count,
            &mut num_vars,
            &mut clauses,
        );
        // At least k selected == at most n - k deselected.
        at_most(
            &cnf.option_lits(false),
            n - selected_count,
            &mut num_vars,
            &mut clauses,
        );
        Self {
            clauses,
            num_vars,
            exhausted: false,
        }
    }
}

#[derive(Default)]
struct State {
    bound: Option<(String, String)>,
    cnf: Option<Cnf>,
    buckets: HashMap<usize, Bucket>,
}

impl State {
    /// Encode `model` on first use; refuse any other model afterwards.
    fn bind(&mut self, model: &VariabilityModel) -> DomainResult<&Cnf> {
        let key = model.cache_key();
        match &self.bound {
            Some((bound_name, bound_key)) if *bound_key != key => {
                return Err(DomainError::ModelBinding {
                    bound: bound_name.clone(),
                    requested: model.name().to_string(),
                });
            }
            Some(_) => {}
            None => {
                debug!(model = %key, "encoding variability model");
                self.cnf = Some(Cnf::encode(model)?);
                self.bound = Some((model.name().to_string(), key));
            }
        }
        self.cnf
            .as_ref()
            .ok_or_else(|| DomainError::SolverFailure("model encoding missing".to_string()))
    }
}

/// Solver backend running varisat in-process.
#[derive(Default)]
pub struct VarisatSolver {
    state: Mutex<State>,
}

impl VarisatSolver {
    pub fn new() -> Self {
        Self::default()
    }
}

fn minimal_completion(
    cnf: &Cnf,
    required: &OptionSet,
    avoid: &OptionSet,
) -> DomainResult<Option<OptionSet>> {
    let mut solver = cnf.solver(0, &[]);
    let required_lits = cnf.lits(required, true)?;

    let mut preferred = required_lits.clone();
    preferred.extend(cnf.lits(avoid.difference(required), false)?);
    let (mut model, size_assumptions) = match solve(&mut solver, &preferred)? {
        Some(model) => (model, preferred),
        None => match solve(&mut solver, &required_lits)? {
            Some(model) => (model, required_lits.clone()),
            None => return Ok(None),
        },
    };

    // Shrink until no option outside `required` can be dropped.
    let mut best = loop {
        let current = cnf.decode(&model);
        let extra: BTreeSet<&String> = current.difference(required).collect();
        if extra.is_empty() {
            return Ok(Some(current));
        }

        let act = solver.new_lit();
        let mut clause = vec![!act];
        clause.extend(cnf.lits(extra.iter().copied(), false)?);
        solver.add_clause(&clause);

        let mut assumptions = vec![act];
        assumptions.extend_from_slice(&required_lits);
        assumptions.extend(cnf.complement(&current));
        let smaller = solve(&mut solver, &assumptions)?;
        solver.add_clause(&[!act]);

        match smaller {
            Some(next) => model = next,
            None => break current,
        }
    };

    // A subset-minimal completion can still be larger than another branch
    // of the model; tighten a cardinality bound until none is smaller.
    while best.len() > required.len() {
        let mut clauses = Vec::new();
        let mut num_vars = cnf.num_options();
        at_most(&cnf.option_lits(true), best.len() - 1, &mut num_vars, &mut clauses);
        let mut bounded = cnf.solver(num_vars, &clauses);
        match solve(&mut bounded, &size_assumptions)? {
            Some(model) => best = cnf.decode(&model),
            None => break,
        }
    }
    Ok(Some(best))
}

fn enumerate(cnf: &Cnf, n: i64) -> DomainResult<Vec<OptionSet>> {
    let mut solver = cnf.solver(0, &[]);
    let limit = usize::try_from(n).ok();
    let mut results = Vec::new();

    while limit.is_none_or(|limit| results.len() < limit) {
        let Some(model) = solve(&mut solver, &[])? else {
            break;
        };
        let selection = cnf.decode(&model);
        solver.add_clause(&cnf.blocking_clause(&selection));
        results.push(selection);
    }
    Ok(results)
}

fn next_in_bucket(
    cnf: &Cnf,
    bucket: &mut Bucket,
    weights: &FeatureWeights,
) -> DomainResult<Option<OptionSet>> {
    if bucket.exhausted {
        return Ok(None);
    }
    let mut solver = cnf.solver(bucket.num_vars, &bucket.clauses);

    let mut weighted: Vec<(&OptionSet, i64)> = weights
        .iter()
        .filter(|(combination, weight)| **weight > 0 && !combination.is_empty())
        .map(|(combination, weight)| (combination, *weight))
        .collect();
    weighted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let mut forbidders = Vec::with_capacity(weighted.len());
    for (combination, _) in &weighted {
        let act = solver.new_lit();
        let mut clause = vec![!act];
        clause.extend(cnf.lits(combination.iter(), false)?);
        solver.add_clause(&clause);
        forbidders.push(act);
    }

    // Forbid all weighted combinations first, then the heavier half,
    // quarter, and so on down to none.
    let mut active = forbidders.len();
    loop {
        if let Some(model) = solve(&mut solver, &forbidders[..active])? {
            let selection = cnf.decode(&model);
            bucket.clauses.push(cnf.blocking_clause(&selection));
            return Ok(Some(selection));
        }
        if active == 0 {
            bucket.exhausted = true;
            return Ok(None);
        }
        active /= 2;
    }
}

#[async_trait]
impl SatisfiabilityChecker for VarisatSolver {
    #[instrument(skip(self, model), fields(model = %model.name()))]
    async fn is_satisfiable(
        &self,
        model: &VariabilityModel,
        selected: &OptionSet,
        partial: bool,
    ) -> DomainResult<bool> {
        let mut state = self.state.lock().await;
        let cnf = state.bind(model)?;

        let mut assumptions = cnf.lits(selected, true)?;
        if !partial {
            assumptions.extend(cnf.complement(selected));
        }
        let mut solver = cnf.solver(0, &[]);
        Ok(solve(&mut solver, &assumptions)?.is_some())
    }
}

#[async_trait]
impl VariantGenerator for VarisatSolver {
    fn name(&self) -> &'static str {
        "varisat"
    }

    async fn find_minimal_completion(
        &self,
        model: &VariabilityModel,
        required: &OptionSet,
        avoid: &OptionSet,
    ) -> DomainResult<Option<OptionSet>> {
        let mut state = self.state.lock().await;
        let cnf = state.bind(model)?;
        minimal_completion(cnf, required, avoid)
    }

    async fn enumerate_up_to(
        &self,
        model: &VariabilityModel,
        n: i64,
    ) -> DomainResult<Vec<OptionSet>> {
        let mut state = self.state.lock().await;
        let cnf = state.bind(model)?;
        enumerate(cnf, n)
    }

    async fn generate_bucket(
        &self,
        model: &VariabilityModel,
        selected_count: usize,
        weights: &FeatureWeights,
    ) -> DomainResult<Option<OptionSet>> {
        let mut guard = self.state.lock().await;
        guard.bind(model)?;
        let state = &mut *guard;
        let cnf = state
            .cnf
            .as_ref()
            .ok_or_else(|| DomainError::SolverFailure("model encoding missing".to_string()))?;
        let bucket = state
            .buckets
            .entry(selected_count)
            .or_insert_with(|| Bucket::new(cnf, selected_count));
        next_in_bucket(cnf, bucket, weights)
    }

    async fn reset_cache(&self) -> DomainResult<()> {
        let mut state = self.state.lock().await;
        state.buckets.clear();
        debug!("bucket cache cleared");
        Ok(())
    }
}
