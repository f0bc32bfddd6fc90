//! Roster solve pipeline.
//!
//! # Algorithm
//!
//! 1. Validate inputs ([`validate_context`](crate::validation::validate_context)).
//! 2. Build the model through a [`CpEngine`].
//! 3. Solve under the policy's wall-clock budget.
//! 4. Materialize the decision values into an [`AssignmentGrid`].
//!
//! A timeout without a solution is reported exactly like infeasibility:
//! no partial grid is ever returned.

use std::time::Duration;

use tracing::{info, warn};

use crate::config::RosterPolicy;
use crate::cp::{CpEngine, LocalSearchEngine, RosterModelBuilder, SearchConfig, SolveStatus};
use crate::error::RosterError;
use crate::models::{AssignmentGrid, RosterContext};

/// A solved month.
#[derive(Debug, Clone)]
pub struct SolvedRoster {
    pub grid: AssignmentGrid,
    /// `Optimal` or `Feasible`.
    pub status: SolveStatus,
    /// Objective value of the grid.
    pub objective: Option<i64>,
    /// Engine wall-clock time.
    pub elapsed: Duration,
}

/// Builds, solves and materializes one month.
///
/// # Example
///
/// ```
/// use u_roster::config::RosterPolicy;
/// use u_roster::models::{RosterContext, Skill, Staff};
/// use u_roster::scheduler::RosterSolver;
///
/// let staff = (0..6)
///     .map(|i| Staff::new(format!("S{i}"))
///         .with_skill(Skill::LanguageA)
///         .with_skill(Skill::LanguageB)
///         .with_skill(Skill::Veteran))
///     .collect();
/// let policy = RosterPolicy {
///     default_required: 2,
///     max_unimproved_steps: Some(2_000),
///     ..RosterPolicy::default()
/// };
/// // February 2026: 28 days, 14 OFF days each leaves 14-15 WORK days.
/// let ctx = RosterContext::for_month(2026, 2, staff, &policy)
///     .unwrap()
///     .with_target_rest_days(14);
///
/// let solved = RosterSolver::new(policy).solve(&ctx).unwrap();
/// assert_eq!(solved.grid.num_days(), 28);
/// assert!(solved.status.is_success());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RosterSolver {
    policy: RosterPolicy,
}

impl RosterSolver {
    /// Creates a solver with a policy.
    pub fn new(policy: RosterPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RosterPolicy {
        &self.policy
    }

    /// Built-in engine configuration derived from the policy.
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig::default()
            .with_seed(self.policy.random_seed)
            .with_max_unimproved_steps(self.policy.max_unimproved_steps)
    }

    /// Solves with the built-in [`LocalSearchEngine`].
    ///
    /// # Errors
    /// - `InputInconsistency` if the context fails validation.
    /// - `ModelInfeasible` if no roster satisfies the hard constraints
    ///   within the time budget.
    pub fn solve(&self, ctx: &RosterContext) -> Result<SolvedRoster, RosterError> {
        let mut engine = LocalSearchEngine::new().with_config(self.search_config());
        self.solve_with(ctx, &mut engine)
    }

    /// Solves with any engine. The engine must be empty.
    pub fn solve_with<E: CpEngine>(
        &self,
        ctx: &RosterContext,
        engine: &mut E,
    ) -> Result<SolvedRoster, RosterError> {
        let vars = RosterModelBuilder::new(ctx, &self.policy).build(engine)?;
        let solution = engine.solve(self.policy.time_limit());

        if !solution.status.is_success() {
            warn!(
                event = "roster_infeasible",
                year = ctx.calendar.year,
                month = ctx.calendar.month,
                status = %solution.status,
            );
            return Err(RosterError::ModelInfeasible {
                status: solution.status,
            });
        }

        let grid = AssignmentGrid::from_solution(ctx, &vars, &solution).ok_or(
            RosterError::ModelInfeasible {
                status: solution.status,
            },
        )?;

        info!(
            event = "roster_solved",
            year = ctx.calendar.year,
            month = ctx.calendar.month,
            status = %solution.status,
            objective = solution.objective,
        );

        Ok(SolvedRoster {
            grid,
            status: solution.status,
            objective: solution.objective,
            elapsed: solution.elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::{CmpOp, CpModel, CpSolution, LinearExpr, Literal, VarRef};
    use crate::models::{LeaveRequest, ShiftState, Skill, Staff, TailHistory};
    use crate::validation::ValidationErrorKind;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn all_round(n: usize) -> Vec<Staff> {
        (0..n)
            .map(|i| {
                Staff::new(format!("S{i}"))
                    .with_skill(Skill::LanguageA)
                    .with_skill(Skill::LanguageB)
                    .with_skill(Skill::Veteran)
                    .with_annual_rest_target(120)
            })
            .collect()
    }

    fn test_policy() -> RosterPolicy {
        RosterPolicy::default()
            .with_time_limit(Duration::from_secs(30))
            .with_max_unimproved_steps(2_000)
            .with_seed(42)
    }

    /// Checks every hard constraint directly on the grid.
    fn assert_hard_constraints(ctx: &RosterContext, policy: &RosterPolicy, grid: &AssignmentGrid) {
        let days = ctx.num_days();
        let builder = RosterModelBuilder::new(ctx, policy);
        let special = builder.special_day();

        for day in ctx.calendar.days() {
            let d = day.index;
            if day.fixed_off {
                assert_eq!(grid.worked_count(d), 0, "holiday {d} has workers");
                continue;
            }
            if Some(d) == special {
                assert_eq!(grid.worked_count(d), grid.num_staff());
                continue;
            }
            let worked = grid.worked_count(d) as u32;
            assert!(worked >= day.required, "day {d} understaffed");
            assert!(worked <= day.required + policy.overstaff_slack, "day {d} overstaffed");
            for skill in Skill::ALL {
                assert!(grid.skill_count(ctx, d, skill) >= 1, "day {d} lacks {skill}");
            }
        }

        for (s, d) in ctx.leave_cells() {
            assert_eq!(grid.get(s, d), ShiftState::Off);
        }

        let window = policy.window_len() as isize;
        for s in 0..grid.num_staff() {
            let name = &grid.staff[s];
            let state = |d: isize| {
                if d < 0 {
                    ctx.tail.value(name, (-d) as usize)
                } else {
                    grid.get(s, d as usize)
                }
            };
            for start in (1 - window)..=(days as isize - window) {
                let worked = (start..start + window)
                    .filter(|&d| d < days as isize && state(d).is_work())
                    .count() as u32;
                assert!(worked <= policy.max_consecutive_work, "{name} window at {start}");
            }
            for d in 1..days - 1 {
                if Some(d) == special {
                    continue;
                }
                if grid.get(s, d).is_work() {
                    assert!(
                        grid.get(s, d - 1).is_work() || grid.get(s, d + 1).is_work(),
                        "{name} isolated on {d}"
                    );
                }
            }

            let off = grid.off_count(s) as u32;
            if builder.is_settlement_month() {
                assert!(off >= builder.settlement_floor(s), "{name} below rest floor");
            } else {
                assert!(off >= ctx.target_rest_days && off <= ctx.target_rest_days + 1);
            }
        }
    }

    /// Weighted policy cost recomputed from the grid's cells alone.
    fn policy_cost(ctx: &RosterContext, policy: &RosterPolicy, grid: &AssignmentGrid) -> i64 {
        let builder = RosterModelBuilder::new(ctx, policy);
        let special = builder.special_day();
        let weights = policy.weights;
        let days = ctx.num_days();

        let inexact = ctx
            .calendar
            .days()
            .iter()
            .filter(|day| !day.fixed_off && Some(day.index) != special)
            .filter(|day| grid.worked_count(day.index) as u32 != day.required)
            .count() as i64;

        let weekend = ctx.calendar.weekend_indices();
        let mut cost = weights.coverage * inexact;
        for s in 0..grid.num_staff() {
            let off = grid.off_count(s) as i64;
            let target = if builder.is_settlement_month() {
                i64::from(builder.settlement_floor(s))
            } else {
                i64::from(ctx.target_rest_days)
            };
            cost += weights.rest_budget * (off - target);

            if builder.penalizes_long_rest() {
                let runs = (0..days.saturating_sub(2))
                    .filter(|&d| (d..d + 3).all(|i| !grid.get(s, i).is_work()))
                    .count() as i64;
                cost += weights.long_rest * runs;
            }

            let load = weekend.iter().filter(|&&d| grid.get(s, d).is_work()).count() as i64;
            cost += weights.weekend_load * load * load;
        }
        cost
    }

    #[test]
    fn test_reported_objective_is_policy_cost() {
        let skills = [
            vec![Skill::LanguageA, Skill::Veteran],
            vec![Skill::LanguageB],
            vec![Skill::LanguageA, Skill::LanguageB],
            vec![Skill::Veteran],
        ];
        let staff: Vec<Staff> = (0..8)
            .map(|i| {
                skills[i % skills.len()]
                    .iter()
                    .fold(Staff::new(format!("S{i}")), |member, &skill| member.with_skill(skill))
            })
            .collect();

        for seed in 0..2 {
            let policy = test_policy().with_seed(seed);
            let ctx = RosterContext::for_month(2025, 6, staff.clone(), &policy).unwrap();
            let solved = RosterSolver::new(policy.clone()).solve(&ctx).unwrap();
            assert_hard_constraints(&ctx, &policy, &solved.grid);
            assert_eq!(
                solved.objective,
                Some(policy_cost(&ctx, &policy, &solved.grid)),
                "seed {seed}"
            );
        }
    }

    #[test]
    fn test_thirty_day_month_with_holiday() {
        let policy = test_policy();
        let ctx = RosterContext::for_month(2025, 6, all_round(10), &policy)
            .unwrap()
            .with_holiday(date(2025, 6, 10))
            .with_target_rest_days(14);

        let solved = RosterSolver::new(policy.clone()).solve(&ctx).unwrap();
        assert!(solved.status.is_success());
        assert_eq!(solved.grid.num_days(), 30);
        for s in 0..10 {
            assert_eq!(solved.grid.get(s, 9), ShiftState::Off);
        }
        assert_hard_constraints(&ctx, &policy, &solved.grid);
        assert_eq!(solved.objective, Some(policy_cost(&ctx, &policy, &solved.grid)));
    }

    #[test]
    fn test_leave_tail_and_skills_respected() {
        use ShiftState::{Off, Work};
        let policy = RosterPolicy {
            default_required: 2,
            ..test_policy()
        };
        let mut staff = all_round(6);
        staff[0] = Staff::new("S0").with_skill(Skill::LanguageA);
        staff[1] = Staff::new("S1").with_skill(Skill::LanguageB);
        let ctx = RosterContext::for_month(2026, 2, staff, &policy)
            .unwrap()
            .with_target_rest_days(14)
            .with_leave(LeaveRequest::new("S2", date(2026, 2, 5)))
            .with_leave(LeaveRequest::new("S3", date(2026, 3, 1)))
            .with_tail(
                TailHistory::new()
                    .with_staff("S4", [Work, Work, Work, Work])
                    .with_staff("S5", [Off, Work, Work, Off]),
            );

        let solved = RosterSolver::new(policy.clone()).solve(&ctx).unwrap();
        assert_eq!(solved.grid.get(2, 4), Off);
        assert_eq!(solved.grid.get(4, 0), Off);
        assert_hard_constraints(&ctx, &policy, &solved.grid);
    }

    #[test]
    fn test_settlement_month_with_exhausted_budget() {
        let policy = RosterPolicy {
            default_required: 2,
            ..test_policy()
        };
        let ctx = RosterContext::for_month(2025, 12, all_round(6), &policy)
            .unwrap()
            .with_prior_rest("S0", 120)
            .with_prior_rest("S1", 150)
            .with_prior_rest("S2", 115)
            .with_prior_rest("S3", 110)
            .with_prior_rest("S4", 110)
            .with_prior_rest("S5", 110);
        let builder = RosterModelBuilder::new(&ctx, &policy);
        assert_eq!(builder.settlement_floor(0), 0);
        assert_eq!(builder.settlement_floor(1), 0);
        assert_eq!(builder.settlement_floor(2), 5);

        let solved = RosterSolver::new(policy.clone()).solve(&ctx).unwrap();
        assert_hard_constraints(&ctx, &policy, &solved.grid);
        assert_eq!(solved.objective, Some(policy_cost(&ctx, &policy, &solved.grid)));
    }

    #[test]
    fn test_overcommitted_day_is_infeasible() {
        let policy = test_policy();
        let ctx = RosterContext::for_month(2025, 6, all_round(3), &policy).unwrap();
        let err = RosterSolver::new(policy).solve(&ctx).unwrap_err();
        assert!(matches!(
            err,
            RosterError::ModelInfeasible {
                status: SolveStatus::Infeasible
            }
        ));
    }

    #[test]
    fn test_leave_on_attendance_day_is_infeasible() {
        let policy = test_policy();
        let ctx = RosterContext::for_month(2026, 1, all_round(8), &policy)
            .unwrap()
            .with_leave(LeaveRequest::new("S3", date(2026, 1, 4)));
        let err = RosterSolver::new(policy).solve(&ctx).unwrap_err();
        assert!(matches!(err, RosterError::ModelInfeasible { .. }));
    }

    #[test]
    fn test_invalid_input_is_rejected() {
        let policy = test_policy();
        let ctx = RosterContext::for_month(2025, 6, all_round(5), &policy)
            .unwrap()
            .with_leave(LeaveRequest::new("Nobody", date(2025, 6, 2)));
        match RosterSolver::new(policy).solve(&ctx) {
            Err(RosterError::InputInconsistency(errors)) => {
                assert_eq!(errors[0].kind, ValidationErrorKind::UnknownStaff);
            }
            other => panic!("expected InputInconsistency, got {other:?}"),
        }
    }

    /// Records the model and never finds a solution.
    struct GiveUpEngine {
        model: CpModel,
    }

    impl CpEngine for GiveUpEngine {
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
        fn solve(&mut self, _time_limit: Duration) -> CpSolution {
            CpSolution::not_found(SolveStatus::Timeout)
        }
    }

    #[test]
    fn test_timeout_is_reported_as_infeasible() {
        let policy = test_policy();
        let ctx = RosterContext::for_month(2025, 6, all_round(5), &policy).unwrap();
        let mut engine = GiveUpEngine {
            model: CpModel::new(),
        };
        let err = RosterSolver::new(policy)
            .solve_with(&ctx, &mut engine)
            .unwrap_err();
        assert!(matches!(
            err,
            RosterError::ModelInfeasible {
                status: SolveStatus::Timeout
            }
        ));
        assert!(engine.model.var_count() > 5 * 30);
    }

    #[test]
    fn test_search_config_follows_policy() {
        let solver = RosterSolver::new(test_policy());
        let config = solver.search_config();
        assert_eq!(config.seed, 42);
        assert_eq!(config.max_unimproved_steps, Some(2_000));
    }
}
