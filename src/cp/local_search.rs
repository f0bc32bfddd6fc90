//! Built-in local search engine.
//!
//! Solves a [`CpModel`] by stochastic local search over the boolean
//! variables, in two alternating modes:
//!
//! - **Repair**: while some constraint is violated, pick one at random and
//!   flip the variable that best reduces weighted violation (objective as
//!   tie-breaker). At a local minimum the weights of all violated
//!   constraints are raised (breakout), so the search leaves it.
//! - **Improve**: once feasible, record the assignment if it beats the best
//!   so far, then flip the sampled variable with the best combined
//!   objective/violation delta, even if it breaks a constraint. Repair
//!   then completes the compound move.
//!
//! Recently flipped variables are tabu for a short tenure.
//!
//! Before searching, bounds propagation fixes forced variables and detects
//! constraints that can never hold, so contradictory inputs are reported
//! INFEASIBLE immediately instead of exhausting the budget.
//!
//! # Reference
//! - Morris (1993), "The Breakout Method for Escaping from Local Minima"
//! - Glover & Laguna (1997), "Tabu Search"

use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace};

use super::model::{CmpOp, CpConstraint, CpEngine, CpModel, CpSolution, LinearExpr, Literal, SolveStatus, VarRef};

/// Checks the clock every this many steps.
const CLOCK_CHECK_INTERVAL: u64 = 256;

/// Search parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// RNG seed.
    pub seed: u64,
    /// Stop after this many steps without a new best feasible assignment.
    pub max_unimproved_steps: Option<u64>,
    /// Base tabu tenure (steps).
    pub tabu_tenure: u64,
    /// Probability of a random helpful flip at a local minimum.
    pub noise: f64,
    /// Variables sampled per improvement step.
    pub improve_sample: usize,
    /// Weight of one unit of violation against objective units in improvement steps.
    pub violation_cost: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_unimproved_steps: None,
            tabu_tenure: 10,
            noise: 0.05,
            improve_sample: 24,
            violation_cost: 1_000,
        }
    }
}

impl SearchConfig {
    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the unimproved-step early stop.
    pub fn with_max_unimproved_steps(mut self, steps: Option<u64>) -> Self {
        self.max_unimproved_steps = steps;
        self
    }
}

/// A [`CpEngine`] backed by local search.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use u_roster::cp::{CmpOp, CpEngine, LinearExpr, LocalSearchEngine, SearchConfig};
///
/// let mut engine = LocalSearchEngine::new()
///     .with_config(SearchConfig::default().with_max_unimproved_steps(Some(1_000)));
/// let a = engine.new_bool_var("a");
/// let b = engine.new_bool_var("b");
/// engine.add_linear_constraint(LinearExpr::sum([a, b]), CmpOp::Eq, 1);
/// engine.minimize(LinearExpr::new().term(a, 3).term(b, 1));
///
/// let solution = engine.solve(Duration::from_secs(1));
/// assert!(solution.status.is_success());
/// assert!(!solution.value(a) && solution.value(b));
/// ```
#[derive(Debug, Clone, Default)]
pub struct LocalSearchEngine {
    model: CpModel,
    config: SearchConfig,
}

impl LocalSearchEngine {
    /// Creates an engine with an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets search parameters.
    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// The recorded model.
    pub fn model(&self) -> &CpModel {
        &self.model
    }
}

impl CpEngine for LocalSearchEngine {
    fn new_bool_var(&mut self, name: &str) -> VarRef {
        self.model.new_bool_var(name)
    }

    fn add_linear_constraint(&mut self, expr: LinearExpr, op: CmpOp, bound: i64) {
        self.model.add_linear_constraint(expr, op, bound);
    }

    fn add_bool_or(&mut self, literals: Vec<Literal>) {
        self.model.add_bool_or(literals);
    }

    fn minimize(&mut self, objective: LinearExpr) {
        self.model.minimize(objective);
    }

    fn solve(&mut self, time_limit: Duration) -> CpSolution {
        let start = Instant::now();
        info!(
            event = "solve_start",
            vars = self.model.var_count(),
            constraints = self.model.constraint_count(),
            time_limit_ms = time_limit.as_millis() as u64,
        );

        let solution = match Search::new(&self.model, &self.config) {
            Some(search) => search.run(start, time_limit),
            None => CpSolution::not_found(SolveStatus::Infeasible).with_stats(0, start.elapsed()),
        };

        info!(
            event = "solve_end",
            status = %solution.status,
            objective = solution.objective,
            steps = solution.steps,
            duration_ms = solution.elapsed.as_millis() as u64,
        );
        solution
    }
}

/// `Σ coef·x ≤ bound` over variable indices.
#[derive(Debug, Clone)]
struct Row {
    terms: Vec<(usize, i64)>,
    bound: i64,
}

impl Row {
    fn new(terms: impl IntoIterator<Item = (usize, i64)>, bound: i64) -> Self {
        let mut terms: Vec<(usize, i64)> = terms.into_iter().collect();
        terms.sort_unstable_by_key(|&(v, _)| v);
        let mut merged: Vec<(usize, i64)> = Vec::with_capacity(terms.len());
        for (v, c) in terms {
            match merged.last_mut() {
                Some((last, coef)) if *last == v => *coef += c,
                _ => merged.push((v, c)),
            }
        }
        merged.retain(|&(_, c)| c != 0);
        Self {
            terms: merged,
            bound,
        }
    }
}

/// Rewrites every constraint as one or two `≤` rows.
fn normalize(model: &CpModel) -> Vec<Row> {
    let mut rows = Vec::with_capacity(model.constraint_count());
    for constraint in model.constraints() {
        match constraint {
            CpConstraint::Linear { expr, op, bound } => {
                let rhs = bound - expr.constant_value();
                let terms = || expr.terms().iter().map(|&(v, c)| (v.index(), c));
                let negated = || expr.terms().iter().map(|&(v, c)| (v.index(), -c));
                match op {
                    CmpOp::Le => rows.push(Row::new(terms(), rhs)),
                    CmpOp::Ge => rows.push(Row::new(negated(), -rhs)),
                    CmpOp::Eq => {
                        rows.push(Row::new(terms(), rhs));
                        rows.push(Row::new(negated(), -rhs));
                    }
                }
            }
            CpConstraint::BoolOr(literals) => {
                // Σ lit ≥ 1, with ¬x = 1 - x
                let negated = literals.iter().filter(|l| l.negated).count() as i64;
                let terms = literals
                    .iter()
                    .map(|l| (l.var.index(), if l.negated { 1 } else { -1 }));
                rows.push(Row::new(terms, negated - 1));
            }
        }
    }
    rows
}

/// Bounds propagation to a fixpoint.
///
/// Returns `None` if some row cannot be satisfied.
fn propagate(rows: &[Row], fixed: &mut [Option<bool>]) -> Option<()> {
    loop {
        let mut changed = false;
        for row in rows {
            let min_lhs: i64 = row
                .terms
                .iter()
                .map(|&(v, c)| match fixed[v] {
                    Some(true) => c,
                    Some(false) => 0,
                    None => c.min(0),
                })
                .sum();
            if min_lhs > row.bound {
                return None;
            }
            for &(v, c) in &row.terms {
                if fixed[v].is_some() {
                    continue;
                }
                if c > 0 && min_lhs + c > row.bound {
                    fixed[v] = Some(false);
                    changed = true;
                } else if c < 0 && min_lhs - c > row.bound {
                    fixed[v] = Some(true);
                    changed = true;
                }
            }
        }
        if !changed {
            return Some(());
        }
    }
}

/// Mutable search state over a normalized model.
struct Search<'a> {
    model: &'a CpModel,
    config: &'a SearchConfig,
    rows: Vec<Row>,
    /// Per variable: `(row, coef)` occurrences.
    occurs: Vec<Vec<(usize, i64)>>,
    /// Per variable objective coefficient.
    cost: Vec<i64>,
    free: Vec<usize>,
    fixed: Vec<Option<bool>>,
    values: Vec<bool>,
    lhs: Vec<i64>,
    weights: Vec<i64>,
    violated: Vec<usize>,
    violated_pos: Vec<usize>,
    tabu_until: Vec<u64>,
    objective: i64,
    lower_bound: i64,
    rng: ChaCha8Rng,
}

/// Candidate flip evaluation: `(weighted violation delta, objective delta)`.
type Delta = (i64, i64);

impl<'a> Search<'a> {
    fn new(model: &'a CpModel, config: &'a SearchConfig) -> Option<Self> {
        let n = model.var_count();
        let rows = normalize(model);

        let mut fixed = vec![None; n];
        if propagate(&rows, &mut fixed).is_none() {
            debug!(event = "propagation_infeasible", rows = rows.len());
            return None;
        }

        let mut occurs = vec![Vec::new(); n];
        for (r, row) in rows.iter().enumerate() {
            for &(v, c) in &row.terms {
                occurs[v].push((r, c));
            }
        }

        let mut cost = vec![0i64; n];
        for &(v, c) in model.objective().terms() {
            cost[v.index()] += c;
        }

        let values: Vec<bool> = fixed.iter().map(|f| f.unwrap_or(false)).collect();
        let free: Vec<usize> = (0..n).filter(|&v| fixed[v].is_none()).collect();
        let lower_bound = model.objective().constant_value()
            + (0..n)
                .map(|v| match fixed[v] {
                    Some(true) => cost[v],
                    Some(false) => 0,
                    None => cost[v].min(0),
                })
                .sum::<i64>();

        let lhs: Vec<i64> = rows
            .iter()
            .map(|row| {
                row.terms
                    .iter()
                    .filter(|&&(v, _)| values[v])
                    .map(|&(_, c)| c)
                    .sum()
            })
            .collect();

        let mut search = Self {
            model,
            config,
            weights: vec![1; rows.len()],
            violated: Vec::new(),
            violated_pos: vec![usize::MAX; rows.len()],
            tabu_until: vec![0; n],
            objective: model.objective_value(&values),
            rows,
            occurs,
            cost,
            free,
            fixed,
            values,
            lhs,
            lower_bound,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
        };
        for r in 0..search.rows.len() {
            if search.lhs[r] > search.rows[r].bound {
                search.mark_violated(r);
            }
        }
        debug!(
            event = "search_ready",
            free_vars = search.free.len(),
            rows = search.rows.len(),
            initially_violated = search.violated.len(),
            lower_bound = search.lower_bound,
        );
        Some(search)
    }

    fn run(mut self, start: Instant, time_limit: Duration) -> CpSolution {
        let mut best: Option<(Vec<bool>, i64)> = None;
        let mut step: u64 = 0;
        let mut last_improvement: u64 = 0;
        let mut proven_optimal = false;

        loop {
            if step % CLOCK_CHECK_INTERVAL == 0 && start.elapsed() >= time_limit {
                break;
            }
            if let (Some(limit), Some(_)) = (self.config.max_unimproved_steps, &best) {
                if step - last_improvement > limit {
                    debug!(event = "unimproved_limit", step = step);
                    break;
                }
            }

            if self.violated.is_empty() {
                self.tighten(step);
                if best.as_ref().map_or(true, |(_, obj)| self.objective < *obj) {
                    trace!(event = "new_best", step = step, objective = self.objective);
                    best = Some((self.values.clone(), self.objective));
                    last_improvement = step;
                    if self.objective <= self.lower_bound {
                        proven_optimal = true;
                        break;
                    }
                }
                if self.free.is_empty() {
                    break;
                }
                self.improve_step(step);
            } else {
                self.repair_step(step);
            }
            step += 1;
        }

        match best {
            Some((values, _)) => {
                let status = if proven_optimal {
                    SolveStatus::Optimal
                } else {
                    SolveStatus::Feasible
                };
                let objective = self.model.objective_value(&values);
                CpSolution::found(status, values, objective).with_stats(step, start.elapsed())
            }
            None => CpSolution::not_found(SolveStatus::Timeout).with_stats(step, start.elapsed()),
        }
    }

    fn repair_step(&mut self, step: u64) {
        let r = self.violated[self.rng.random_range(0..self.violated.len())];

        // Variables whose flip lowers this row's left-hand side.
        let candidates: Vec<usize> = self.rows[r]
            .terms
            .iter()
            .filter(|&&(v, c)| self.fixed[v].is_none() && ((c > 0) == self.values[v]))
            .map(|&(v, _)| v)
            .collect();
        if candidates.is_empty() {
            self.weights[r] += 1;
            return;
        }

        let mut best: Option<(usize, Delta)> = None;
        let mut ties = 0u32;
        for &v in &candidates {
            if self.tabu_until[v] > step {
                continue;
            }
            let delta = self.delta(v);
            match best {
                Some((_, current)) if delta > current => {}
                Some((_, current)) if delta == current => {
                    ties += 1;
                    if self.rng.random_range(0..=ties) == 0 {
                        best = Some((v, delta));
                    }
                }
                _ => {
                    best = Some((v, delta));
                    ties = 0;
                }
            }
        }

        let chosen = match best {
            Some((v, (weighted, _))) if weighted < 0 => v,
            other => {
                // Local minimum: raise the cost of what is still broken.
                for &row in &self.violated {
                    self.weights[row] += 1;
                }
                match other {
                    Some((v, _)) if !self.rng.random_bool(self.config.noise) => v,
                    _ => candidates[self.rng.random_range(0..candidates.len())],
                }
            }
        };
        self.flip(chosen, step);
    }

    /// Clears every true positive-cost variable that no row still needs.
    ///
    /// Runs on feasible states only, so the incumbent's objective is the
    /// cost of its decision values rather than of stale indicators.
    fn tighten(&mut self, step: u64) {
        loop {
            let mut changed = false;
            // Reverse declaration order clears ordered counters top-down.
            for i in (0..self.free.len()).rev() {
                let v = self.free[i];
                if self.values[v] && self.cost[v] > 0 && self.raw_violation_delta(v) == 0 {
                    self.flip(v, step);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    fn improve_step(&mut self, step: u64) {
        let mut best: Option<(usize, i64)> = None;
        for _ in 0..self.config.improve_sample {
            let v = self.free[self.rng.random_range(0..self.free.len())];
            if self.tabu_until[v] > step {
                continue;
            }
            let (_, objective) = self.delta(v);
            let violation = self.raw_violation_delta(v);
            let score = violation * self.config.violation_cost + objective;
            if best.map_or(true, |(_, s)| score < s) {
                best = Some((v, score));
            }
        }
        if let Some((v, _)) = best {
            self.flip(v, step);
        }
    }

    /// Weighted violation and objective deltas of flipping `v`.
    fn delta(&self, v: usize) -> Delta {
        let direction = if self.values[v] { -1 } else { 1 };
        let weighted = self.occurs[v]
            .iter()
            .map(|&(r, c)| {
                let bound = self.rows[r].bound;
                let before = (self.lhs[r] - bound).max(0);
                let after = (self.lhs[r] + c * direction - bound).max(0);
                self.weights[r] * (after - before)
            })
            .sum();
        (weighted, self.cost[v] * direction)
    }

    fn raw_violation_delta(&self, v: usize) -> i64 {
        let direction = if self.values[v] { -1 } else { 1 };
        self.occurs[v]
            .iter()
            .map(|&(r, c)| {
                let bound = self.rows[r].bound;
                (self.lhs[r] + c * direction - bound).max(0) - (self.lhs[r] - bound).max(0)
            })
            .sum()
    }

    fn flip(&mut self, v: usize, step: u64) {
        let direction = if self.values[v] { -1 } else { 1 };
        self.values[v] = !self.values[v];
        self.objective += self.cost[v] * direction;
        for i in 0..self.occurs[v].len() {
            let (r, c) = self.occurs[v][i];
            self.lhs[r] += c * direction;
            if self.lhs[r] > self.rows[r].bound {
                self.mark_violated(r);
            } else {
                self.mark_satisfied(r);
            }
        }
        self.tabu_until[v] = step + self.config.tabu_tenure + self.rng.random_range(0..3);
    }

    fn mark_violated(&mut self, r: usize) {
        if self.violated_pos[r] == usize::MAX {
            self.violated_pos[r] = self.violated.len();
            self.violated.push(r);
        }
    }

    fn mark_satisfied(&mut self, r: usize) {
        let pos = self.violated_pos[r];
        if pos != usize::MAX {
            self.violated.swap_remove(pos);
            if let Some(&moved) = self.violated.get(pos) {
                self.violated_pos[moved] = pos;
            }
            self.violated_pos[r] = usize::MAX;
        }
    }
}
