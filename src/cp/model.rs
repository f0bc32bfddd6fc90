//! Boolean linear model and the engine interface.
//!
//! The rostering core never depends on a particular solver. It talks to an
//! engine through [`CpEngine`]: declare boolean variables, post linear and
//! clause constraints, set a linear objective, solve under a time budget and
//! read values back. [`CpModel`] is the recorded form of those calls and
//! doubles as a checker for any assignment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Handle to a boolean variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarRef(usize);

impl VarRef {
    /// Position of the variable in its model.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::ops::Not for VarRef {
    type Output = Literal;

    /// The negated literal `¬self`.
    fn not(self) -> Literal {
        Literal {
            var: self,
            negated: true,
        }
    }
}

/// A variable or its negation, used in clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    pub var: VarRef,
    pub negated: bool,
}

impl Literal {
    /// Truth value under an assignment.
    #[inline]
    pub fn eval(&self, value: bool) -> bool {
        value != self.negated
    }
}

impl From<VarRef> for Literal {
    fn from(var: VarRef) -> Self {
        Literal {
            var,
            negated: false,
        }
    }
}

/// `Σ coef·var + constant` over boolean variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearExpr {
    terms: Vec<(VarRef, i64)>,
    constant: i64,
}

impl LinearExpr {
    /// The empty expression (`0`).
    pub fn new() -> Self {
        Self::default()
    }

    /// A constant expression.
    pub fn constant(value: i64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// Sum of variables with unit coefficients.
    pub fn sum(vars: impl IntoIterator<Item = VarRef>) -> Self {
        Self {
            terms: vars.into_iter().map(|v| (v, 1)).collect(),
            constant: 0,
        }
    }

    /// Adds `coef·var`.
    pub fn term(mut self, var: VarRef, coef: i64) -> Self {
        self.add_term(var, coef);
        self
    }

    /// Adds `coef·var` in place.
    pub fn add_term(&mut self, var: VarRef, coef: i64) {
        if coef != 0 {
            self.terms.push((var, coef));
        }
    }

    /// Adds a constant in place.
    pub fn add_constant(&mut self, value: i64) {
        self.constant += value;
    }

    /// Adds `scale·other` in place.
    pub fn add_scaled(&mut self, other: &LinearExpr, scale: i64) {
        for &(var, coef) in &other.terms {
            self.add_term(var, coef * scale);
        }
        self.constant += other.constant * scale;
    }

    /// Terms as `(var, coef)`; a variable may appear more than once.
    pub fn terms(&self) -> &[(VarRef, i64)] {
        &self.terms
    }

    /// Constant part.
    pub fn constant_value(&self) -> i64 {
        self.constant
    }

    /// Value under an assignment.
    pub fn eval(&self, values: &[bool]) -> i64 {
        self.terms
            .iter()
            .filter(|(v, _)| values[v.index()])
            .map(|(_, c)| c)
            .sum::<i64>()
            + self.constant
    }
}

/// Comparison of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    /// `expr ≤ bound`
    Le,
    /// `expr ≥ bound`
    Ge,
    /// `expr = bound`
    Eq,
}

/// A posted constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpConstraint {
    /// `expr op bound`.
    Linear {
        expr: LinearExpr,
        op: CmpOp,
        bound: i64,
    },
    /// At least one literal holds.
    BoolOr(Vec<Literal>),
}

impl CpConstraint {
    /// Whether an assignment satisfies this constraint.
    pub fn is_satisfied(&self, values: &[bool]) -> bool {
        match self {
            CpConstraint::Linear { expr, op, bound } => {
                let lhs = expr.eval(values);
                match op {
                    CmpOp::Le => lhs <= *bound,
                    CmpOp::Ge => lhs >= *bound,
                    CmpOp::Eq => lhs == *bound,
                }
            }
            CpConstraint::BoolOr(literals) => literals
                .iter()
                .any(|l| l.eval(values[l.var.index()])),
        }
    }
}

/// Outcome class of a solve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    /// Feasible and proven optimal.
    Optimal,
    /// Feasible, optimality not proven.
    Feasible,
    /// Proven to have no feasible assignment.
    Infeasible,
    /// Budget exhausted without a feasible assignment.
    Timeout,
}

impl SolveStatus {
    /// Whether the solution carries usable values.
    #[inline]
    pub fn is_success(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SolveStatus::Optimal => "OPTIMAL",
            SolveStatus::Feasible => "FEASIBLE",
            SolveStatus::Infeasible => "INFEASIBLE",
            SolveStatus::Timeout => "TIMEOUT",
        };
        f.write_str(s)
    }
}

/// Result of a solve call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpSolution {
    /// Outcome class.
    pub status: SolveStatus,
    /// Objective value of the returned assignment.
    pub objective: Option<i64>,
    /// Engine steps performed.
    pub steps: u64,
    /// Wall-clock time spent.
    pub elapsed: Duration,
    values: Vec<bool>,
}

impl CpSolution {
    /// A solution with values. `status` must be a success status.
    pub fn found(status: SolveStatus, values: Vec<bool>, objective: i64) -> Self {
        debug_assert!(status.is_success());
        Self {
            status,
            objective: Some(objective),
            steps: 0,
            elapsed: Duration::ZERO,
            values,
        }
    }

    /// A solution without values (INFEASIBLE or TIMEOUT).
    pub fn not_found(status: SolveStatus) -> Self {
        Self {
            status,
            objective: None,
            steps: 0,
            elapsed: Duration::ZERO,
            values: Vec::new(),
        }
    }

    /// Records engine statistics.
    pub fn with_stats(mut self, steps: u64, elapsed: Duration) -> Self {
        self.steps = steps;
        self.elapsed = elapsed;
        self
    }

    /// Whether values can be read.
    #[inline]
    pub fn has_values(&self) -> bool {
        self.status.is_success() && !self.values.is_empty()
    }

    /// Value of a variable; `false` when no values are present.
    #[inline]
    pub fn value(&self, var: VarRef) -> bool {
        self.values.get(var.index()).copied().unwrap_or(false)
    }

    /// All values, indexed by [`VarRef::index`].
    pub fn values(&self) -> &[bool] {
        &self.values
    }
}

/// The capability set the rostering core needs from a solving engine.
pub trait CpEngine {
    /// Declares a boolean variable.
    fn new_bool_var(&mut self, name: &str) -> VarRef;

    /// Posts `expr op bound`.
    fn add_linear_constraint(&mut self, expr: LinearExpr, op: CmpOp, bound: i64);

    /// Posts a clause: at least one literal holds.
    fn add_bool_or(&mut self, literals: Vec<Literal>);

    /// Sets the objective to minimize (replaces any previous objective).
    fn minimize(&mut self, objective: LinearExpr);

    /// Solves within the wall-clock budget.
    fn solve(&mut self, time_limit: Duration) -> CpSolution;
}

/// A recorded boolean linear model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CpModel {
    names: Vec<String>,
    constraints: Vec<CpConstraint>,
    objective: LinearExpr,
}

impl CpModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a boolean variable.
    pub fn new_bool_var(&mut self, name: &str) -> VarRef {
        self.names.push(name.to_string());
        VarRef(self.names.len() - 1)
    }

    /// Posts `expr op bound`.
    pub fn add_linear_constraint(&mut self, expr: LinearExpr, op: CmpOp, bound: i64) {
        self.constraints
            .push(CpConstraint::Linear { expr, op, bound });
    }

    /// Posts a clause.
    pub fn add_bool_or(&mut self, literals: Vec<Literal>) {
        self.constraints.push(CpConstraint::BoolOr(literals));
    }

    /// Sets the objective.
    pub fn minimize(&mut self, objective: LinearExpr) {
        self.objective = objective;
    }

    /// Number of variables.
    pub fn var_count(&self) -> usize {
        self.names.len()
    }

    /// Number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// All declared variables in declaration order.
    pub fn vars(&self) -> impl Iterator<Item = VarRef> {
        (0..self.names.len()).map(VarRef)
    }

    /// Name given at declaration.
    pub fn var_name(&self, var: VarRef) -> &str {
        &self.names[var.index()]
    }

    /// Posted constraints in order.
    pub fn constraints(&self) -> &[CpConstraint] {
        &self.constraints
    }

    /// Current objective.
    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    /// Indices of constraints an assignment violates.
    pub fn violated_constraints(&self, values: &[bool]) -> Vec<usize> {
        self.constraints
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_satisfied(values))
            .map(|(i, _)| i)
            .collect()
    }

    /// Objective value of an assignment.
    pub fn objective_value(&self, values: &[bool]) -> i64 {
        self.objective.eval(values)
    }
}
