//! Roster constraint model builder.
//!
//! Translates staffing policy for one month into boolean variables, hard
//! constraints and a weighted objective, posted through any [`CpEngine`].
//!
//! # Variables
//! One `work[s][d]` per (staff, day), true = WORK. Auxiliary indicators
//! linearize the soft terms:
//!
//! | Indicator | Meaning | Cost |
//! |-----------|---------|------|
//! | `over[d]` | day `d` staffed above its requirement | `coverage` |
//! | `rest3[s][d]` | staff `s` OFF on `d..d+2` | `long_rest` |
//! | `weekend[s][k]` | staff `s` works at least `k` weekend days | `(2k-1)·weekend_load` |
//!
//! The weekend counters are ordered (`k+1` implies `k`), so their cheapest
//! cover of `n` worked weekend days costs `weekend_load·n²`.
//!
//! # Hard constraints
//! 1. Holidays and approved leave force OFF.
//! 2. The universal attendance day (unless a holiday) forces WORK.
//! 3. `required ≤ worked ≤ required + slack` on every regular day.
//! 4. At least one worker per skill category on every regular day.
//! 5. At most `max_consecutive_work` WORK days in any window, tail included.
//! 6. No isolated WORK day on interior days.
//! 7. Monthly rest budget: `[target, target+1]` OFF days, or in the
//!    settlement month a floor of the annual target minus rest already used.

use tracing::debug;

use super::model::{CmpOp, CpEngine, LinearExpr, Literal, VarRef};
use crate::config::RosterPolicy;
use crate::error::RosterError;
use crate::models::{RosterContext, Skill};
use crate::validation::validate_context;

/// Variables of a built roster model.
#[derive(Debug, Clone)]
pub struct RosterVars {
    /// `work[staff][day]`: true = WORK.
    pub work: Vec<Vec<VarRef>>,
    /// The objective handed to the engine.
    pub objective: LinearExpr,
    /// Number of variables declared (decision and auxiliary).
    pub var_count: usize,
    /// Number of constraints posted.
    pub constraint_count: usize,
}

/// Builds the roster model for one month.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use u_roster::config::RosterPolicy;
/// use u_roster::cp::{LocalSearchEngine, RosterModelBuilder};
/// use u_roster::models::{RosterContext, Skill, Staff};
///
/// let staff = (0..6)
///     .map(|i| Staff::new(format!("S{i}"))
///         .with_skill(Skill::LanguageA)
///         .with_skill(Skill::LanguageB)
///         .with_skill(Skill::Veteran))
///     .collect();
/// let policy = RosterPolicy::default();
/// let ctx = RosterContext::for_month(2025, 6, staff, &policy)
///     .unwrap()
///     .with_holiday(NaiveDate::from_ymd_opt(2025, 6, 10).unwrap());
///
/// let mut engine = LocalSearchEngine::new();
/// let vars = RosterModelBuilder::new(&ctx, &policy).build(&mut engine).unwrap();
/// assert_eq!(vars.work.len(), 6);
/// assert_eq!(vars.work[0].len(), 30);
/// ```
pub struct RosterModelBuilder<'a> {
    ctx: &'a RosterContext,
    policy: &'a RosterPolicy,
}

/// Counts what is posted through an engine.
struct Poster<'e, E: CpEngine> {
    engine: &'e mut E,
    vars: usize,
    constraints: usize,
}

impl<E: CpEngine> Poster<'_, E> {
    fn var(&mut self, name: String) -> VarRef {
        self.vars += 1;
        self.engine.new_bool_var(&name)
    }

    fn linear(&mut self, expr: LinearExpr, op: CmpOp, bound: i64) {
        self.constraints += 1;
        self.engine.add_linear_constraint(expr, op, bound);
    }

    fn clause(&mut self, literals: Vec<Literal>) {
        self.constraints += 1;
        self.engine.add_bool_or(literals);
    }

    fn fix(&mut self, var: VarRef, value: bool) {
        self.linear(LinearExpr::sum([var]), CmpOp::Eq, i64::from(value));
    }
}

impl<'a> RosterModelBuilder<'a> {
    /// Creates a builder over validated inputs.
    pub fn new(ctx: &'a RosterContext, policy: &'a RosterPolicy) -> Self {
        Self { ctx, policy }
    }

    /// Whether the target month is the settlement month.
    pub fn is_settlement_month(&self) -> bool {
        self.ctx.calendar.month == self.policy.settlement_month
    }

    /// Index of the universal attendance day, if it applies this month.
    ///
    /// A holiday on that date cancels the attendance rule.
    pub fn special_day(&self) -> Option<usize> {
        let special = self.policy.special_attendance?;
        if special.month != self.ctx.calendar.month || special.day == 0 {
            return None;
        }
        let index = special.day as usize - 1;
        (index < self.ctx.num_days() && !self.ctx.is_fixed_off(index)).then_some(index)
    }

    /// Whether runs of three OFF days are penalized this month.
    pub fn penalizes_long_rest(&self) -> bool {
        self.policy.suppress_long_rest_in_month != Some(self.ctx.calendar.month)
    }

    /// OFF-day floor for a staff row in the settlement month.
    pub fn settlement_floor(&self, staff: usize) -> u32 {
        let member = &self.ctx.staff[staff];
        member
            .annual_rest_target
            .saturating_sub(self.ctx.prior_rest_for(&member.name))
    }

    /// Posts the full model and sets the objective.
    ///
    /// # Errors
    /// `InputInconsistency` if the context fails validation.
    pub fn build<E: CpEngine>(&self, engine: &mut E) -> Result<RosterVars, RosterError> {
        validate_context(self.ctx, self.policy).map_err(RosterError::InputInconsistency)?;

        let mut poster = Poster {
            engine,
            vars: 0,
            constraints: 0,
        };
        let mut objective = LinearExpr::new();

        let days = self.ctx.num_days();
        let work: Vec<Vec<VarRef>> = (0..self.ctx.staff.len())
            .map(|s| {
                (0..days)
                    .map(|d| poster.var(format!("work[{s}][{d}]")))
                    .collect()
            })
            .collect();

        self.post_forced_days(&mut poster, &work);
        self.post_daily_coverage(&mut poster, &work, &mut objective);
        self.post_rest_budget(&mut poster, &work, &mut objective);
        self.post_rolling_windows(&mut poster, &work);
        self.post_isolation(&mut poster, &work);
        if self.penalizes_long_rest() {
            self.post_long_rest(&mut poster, &work, &mut objective);
        }
        self.post_weekend_load(&mut poster, &work, &mut objective);

        poster.engine.minimize(objective.clone());

        debug!(
            event = "model_built",
            year = self.ctx.calendar.year,
            month = self.ctx.calendar.month,
            staff = self.ctx.staff.len(),
            days = days,
            vars = poster.vars,
            constraints = poster.constraints,
            settlement = self.is_settlement_month(),
        );

        Ok(RosterVars {
            work,
            objective,
            var_count: poster.vars,
            constraint_count: poster.constraints,
        })
    }

    /// Holidays, approved leave and the universal attendance day.
    fn post_forced_days<E: CpEngine>(&self, poster: &mut Poster<'_, E>, work: &[Vec<VarRef>]) {
        for d in self.ctx.calendar.fixed_off_indices() {
            for row in work {
                poster.fix(row[d], false);
            }
        }
        for (s, d) in self.ctx.leave_cells() {
            poster.fix(work[s][d], false);
        }
        if let Some(d) = self.special_day() {
            for row in work {
                poster.fix(row[d], true);
            }
        }
    }

    /// Headcount bounds, exact-count indicator and skill coverage per day.
    fn post_daily_coverage<E: CpEngine>(
        &self,
        poster: &mut Poster<'_, E>,
        work: &[Vec<VarRef>],
        objective: &mut LinearExpr,
    ) {
        let special = self.special_day();
        let slack = i64::from(self.policy.overstaff_slack);

        for day in self.ctx.calendar.days() {
            let d = day.index;
            if day.fixed_off || Some(d) == special {
                continue;
            }
            let required = i64::from(day.required);
            let worked = LinearExpr::sum(work.iter().map(|row| row[d]));

            poster.linear(worked.clone(), CmpOp::Ge, required);
            poster.linear(worked.clone(), CmpOp::Le, required + slack);

            if slack > 0 {
                let over = poster.var(format!("over[{d}]"));
                poster.linear(worked.term(over, -slack), CmpOp::Le, required);
                objective.add_term(over, self.policy.weights.coverage);
            }

            for skill in Skill::ALL {
                let covered = LinearExpr::sum(
                    self.ctx
                        .staff
                        .iter()
                        .zip(work)
                        .filter(|(member, _)| member.has_skill(skill))
                        .map(|(_, row)| row[d]),
                );
                poster.linear(covered, CmpOp::Ge, 1);
            }
        }
    }

    /// Monthly OFF-day budget per staff member.
    fn post_rest_budget<E: CpEngine>(
        &self,
        poster: &mut Poster<'_, E>,
        work: &[Vec<VarRef>],
        objective: &mut LinearExpr,
    ) {
        let days = self.ctx.num_days() as i64;
        let weight = self.policy.weights.rest_budget;

        for (s, row) in work.iter().enumerate() {
            let worked = LinearExpr::sum(row.iter().copied());
            // OFF = days - worked
            let target = if self.is_settlement_month() {
                i64::from(self.settlement_floor(s))
            } else {
                let target = i64::from(self.ctx.target_rest_days);
                poster.linear(worked.clone(), CmpOp::Ge, days - target - 1);
                target
            };
            poster.linear(worked.clone(), CmpOp::Le, days - target);

            // weight · (OFF - target)
            objective.add_constant(weight * (days - target));
            objective.add_scaled(&worked, -weight);
        }
    }

    /// No more than `max_consecutive_work` WORK days in any window,
    /// counting the prior-month tail.
    fn post_rolling_windows<E: CpEngine>(&self, poster: &mut Poster<'_, E>, work: &[Vec<VarRef>]) {
        let days = self.ctx.num_days() as isize;
        let window = self.policy.window_len() as isize;
        let limit = i64::from(self.policy.max_consecutive_work);
        let tail_days = self.policy.tail_days as isize;

        for (s, row) in work.iter().enumerate() {
            let name = &self.ctx.staff[s].name;
            for start in (1 - window)..=(days - window) {
                let mut in_month = Vec::new();
                let mut tail_worked = 0i64;
                for d in start..start + window {
                    if d >= 0 {
                        if d < days {
                            in_month.push(row[d as usize]);
                        }
                    } else if -d <= tail_days
                        && self.ctx.tail.value(name, (-d) as usize).is_work()
                    {
                        tail_worked += 1;
                    }
                }
                if !in_month.is_empty() {
                    poster.linear(LinearExpr::sum(in_month), CmpOp::Le, limit - tail_worked);
                }
            }
        }
    }

    /// `work[d] ⇒ work[d-1] ∨ work[d+1]` on interior days.
    fn post_isolation<E: CpEngine>(&self, poster: &mut Poster<'_, E>, work: &[Vec<VarRef>]) {
        let days = self.ctx.num_days();
        let special = self.special_day();
        for row in work {
            for d in 1..days.saturating_sub(1) {
                if Some(d) == special {
                    continue;
                }
                poster.clause(vec![!row[d], row[d - 1].into(), row[d + 1].into()]);
            }
        }
    }

    /// Penalty indicator per run of three OFF days.
    fn post_long_rest<E: CpEngine>(
        &self,
        poster: &mut Poster<'_, E>,
        work: &[Vec<VarRef>],
        objective: &mut LinearExpr,
    ) {
        let days = self.ctx.num_days();
        for (s, row) in work.iter().enumerate() {
            for d in 0..days.saturating_sub(2) {
                let rest3 = poster.var(format!("rest3[{s}][{d}]"));
                poster.clause(vec![
                    row[d].into(),
                    row[d + 1].into(),
                    row[d + 2].into(),
                    rest3.into(),
                ]);
                objective.add_term(rest3, self.policy.weights.long_rest);
            }
        }
    }

    /// Squared weekend work count per staff member via ordered counters.
    fn post_weekend_load<E: CpEngine>(
        &self,
        poster: &mut Poster<'_, E>,
        work: &[Vec<VarRef>],
        objective: &mut LinearExpr,
    ) {
        let weekend = self.ctx.calendar.weekend_indices();
        if weekend.is_empty() {
            return;
        }
        let weight = self.policy.weights.weekend_load;

        for (s, row) in work.iter().enumerate() {
            let counters: Vec<VarRef> = (1..=weekend.len())
                .map(|k| poster.var(format!("weekend[{s}][{k}]")))
                .collect();

            // Σ weekend work ≤ Σ counters
            let mut cover = LinearExpr::sum(weekend.iter().map(|&d| row[d]));
            for &c in &counters {
                cover.add_term(c, -1);
            }
            poster.linear(cover, CmpOp::Le, 0);

            for pair in counters.windows(2) {
                poster.clause(vec![pair[0].into(), !pair[1]]);
            }
            for (k, &c) in counters.iter().enumerate() {
                // k is 0-based: marginal cost of the (k+1)-th day is 2k+1
                objective.add_term(c, weight * (2 * k as i64 + 1));
            }
        }
    }
}
