//! Incremental change validation.
//!
//! Applies one (staff, day, desired state) request at a time to a solved
//! grid. Only the per-day rules are re-checked for the affected day: the
//! headcount floor and skill coverage. Rolling windows, isolation and the
//! monthly rest budget are not re-checked here; they hold by construction
//! of the solved grid and are only re-established by a full re-solve.
//!
//! Checks run in a fixed order and the first failure is reported:
//!
//! | Order | Check | Reason code |
//! |-------|-------|-------------|
//! | 0 | WORK on a fixed-off day | `FIXED_OFF_DAY` |
//! | 1 | worked < required | `UNDERSTAFFED` |
//! | 2 | no language-A worker | `MISSING_SKILL_A` |
//! | 3 | no language-B worker | `MISSING_SKILL_B` |
//! | 4 | no veteran worker | `MISSING_SKILL_VETERAN` |
//!
//! A rejected flip is reverted before returning, so the grid is unchanged.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::RosterError;
use crate::models::{AssignmentGrid, RosterContext, ShiftState, Skill};

/// A planner's request to set one cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub staff: String,
    pub date: NaiveDate,
    pub desired: ShiftState,
    /// Withdrawn by the requester; skipped by [`replay`].
    #[serde(default)]
    pub cancelled: bool,
}

impl ChangeRequest {
    pub fn new(staff: impl Into<String>, date: NaiveDate, desired: ShiftState) -> Self {
        Self {
            staff: staff.into(),
            date,
            desired,
            cancelled: false,
        }
    }

    /// Request to work on `date`.
    pub fn work(staff: impl Into<String>, date: NaiveDate) -> Self {
        Self::new(staff, date, ShiftState::Work)
    }

    /// Request to be off on `date`.
    pub fn off(staff: impl Into<String>, date: NaiveDate) -> Self {
        Self::new(staff, date, ShiftState::Off)
    }

    /// Marks the request as withdrawn.
    pub fn cancelled(mut self) -> Self {
        self.cancelled = true;
        self
    }
}

/// Why a flip was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Fewer workers than required after the flip.
    Understaffed { required: u32, actual: usize },
    /// Nobody with this skill would be working.
    MissingSkill(Skill),
    /// WORK requested on a public holiday.
    FixedOffDay,
}

impl RejectReason {
    /// Machine-readable code.
    pub fn code(&self) -> String {
        match self {
            RejectReason::Understaffed { .. } => "UNDERSTAFFED".to_string(),
            RejectReason::MissingSkill(skill) => format!("MISSING_SKILL_{}", skill.code()),
            RejectReason::FixedOffDay => "FIXED_OFF_DAY".to_string(),
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Understaffed { required, actual } => {
                write!(f, "understaffed: {actual} working, {required} required")
            }
            RejectReason::MissingSkill(skill) => write!(f, "no {skill} staff working"),
            RejectReason::FixedOffDay => write!(f, "public holiday"),
        }
    }
}

/// Result of validating one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintOutcome {
    /// The flip was kept.
    Accepted,
    /// The cell already had the desired state; nothing was touched.
    NoChange,
    /// The flip was reverted.
    Rejected(RejectReason),
}

impl ConstraintOutcome {
    /// `ACCEPTED`, `NO_CHANGE` or the rejection's code.
    pub fn reason_code(&self) -> String {
        match self {
            ConstraintOutcome::Accepted => "ACCEPTED".to_string(),
            ConstraintOutcome::NoChange => "NO_CHANGE".to_string(),
            ConstraintOutcome::Rejected(reason) => reason.code(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, ConstraintOutcome::Accepted)
    }
}

/// Checks the per-day rules on one day of a grid.
pub fn check_day(grid: &AssignmentGrid, ctx: &RosterContext, day: usize) -> Result<(), RejectReason> {
    let required = ctx.required(day);
    let actual = grid.worked_count(day);
    if actual < required as usize {
        return Err(RejectReason::Understaffed { required, actual });
    }
    for skill in Skill::ALL {
        if grid.skill_count(ctx, day, skill) == 0 {
            return Err(RejectReason::MissingSkill(skill));
        }
    }
    Ok(())
}

/// Validates and applies one request.
///
/// # Errors
/// `UnknownStaff` if the staff member has no grid row, `DateOutsideMonth`
/// if the date is not in the planned month. The grid is untouched in both
/// cases.
pub fn apply_change(
    grid: &mut AssignmentGrid,
    ctx: &RosterContext,
    request: &ChangeRequest,
) -> Result<ConstraintOutcome, RosterError> {
    let staff = grid
        .staff_index(&request.staff)
        .ok_or_else(|| RosterError::UnknownStaff(request.staff.clone()))?;
    let day = ctx
        .calendar
        .day_index(request.date)
        .filter(|&d| d < grid.num_days())
        .ok_or(RosterError::DateOutsideMonth(request.date))?;

    let current = grid.get(staff, day);
    if current == request.desired {
        debug!(event = "change_noop", staff = %request.staff, day = day);
        return Ok(ConstraintOutcome::NoChange);
    }

    if request.desired.is_work() && ctx.is_fixed_off(day) {
        return Ok(reject(request, day, RejectReason::FixedOffDay));
    }

    grid.set(staff, day, request.desired);
    if let Err(reason) = check_day(grid, ctx, day) {
        grid.set(staff, day, current);
        return Ok(reject(request, day, reason));
    }

    info!(
        event = "change_applied",
        staff = %request.staff,
        day = day,
        state = ?request.desired,
    );
    Ok(ConstraintOutcome::Accepted)
}

fn reject(request: &ChangeRequest, day: usize, reason: RejectReason) -> ConstraintOutcome {
    info!(
        event = "change_rejected",
        staff = %request.staff,
        day = day,
        state = ?request.desired,
        reason = %reason.code(),
    );
    ConstraintOutcome::Rejected(reason)
}

/// One processed request and what happened to it.
#[derive(Debug)]
pub struct ReplayEntry {
    pub request: ChangeRequest,
    /// The outcome, or why the request could not be evaluated.
    pub result: Result<ConstraintOutcome, RosterError>,
}

impl ReplayEntry {
    /// Reason code, or `SKIPPED` for requests that could not be evaluated.
    pub fn reason_code(&self) -> String {
        match &self.result {
            Ok(outcome) => outcome.reason_code(),
            Err(_) => "SKIPPED".to_string(),
        }
    }
}

/// Applies requests strictly in the given order.
///
/// Each accepted flip is visible to the next request. Cancelled requests
/// are skipped without an entry; requests for unknown staff or dates
/// outside the month are logged and recorded, and replay continues.
pub fn replay(
    grid: &mut AssignmentGrid,
    ctx: &RosterContext,
    requests: &[ChangeRequest],
) -> Vec<ReplayEntry> {
    let mut entries = Vec::with_capacity(requests.len());
    for request in requests.iter().filter(|r| !r.cancelled) {
        let result = apply_change(grid, ctx, request);
        if let Err(err) = &result {
            warn!(event = "change_skipped", staff = %request.staff, error = %err);
        }
        entries.push(ReplayEntry {
            request: request.clone(),
            result,
        });
    }
    let accepted = entries
        .iter()
        .filter(|e| matches!(e.result, Ok(ConstraintOutcome::Accepted)))
        .count();
    debug!(event = "replay_done", processed = entries.len(), accepted = accepted);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RosterPolicy;
    use crate::models::Staff;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    /// Day 0 needs 2, day 1 needs 3, day 2 needs 1; A, V and X work days 0..3.
    fn sample() -> (RosterContext, AssignmentGrid) {
        let staff = vec![
            Staff::new("A")
                .with_skill(Skill::LanguageA)
                .with_skill(Skill::LanguageB),
            Staff::new("B")
                .with_skill(Skill::LanguageA)
                .with_skill(Skill::LanguageB),
            Staff::new("V").with_skill(Skill::Veteran),
            Staff::new("X").with_skill(Skill::LanguageA),
        ];
        let ctx = RosterContext::for_month(2025, 6, staff, &RosterPolicy::default())
            .unwrap()
            .with_required(0, 2)
            .with_required(1, 3)
            .with_required(2, 1)
            .with_holiday(date(10));
        let mut grid = AssignmentGrid::for_context(&ctx);
        for d in 0..3 {
            for s in [0, 2, 3] {
                grid.set(s, d, ShiftState::Work);
            }
        }
        (ctx, grid)
    }

    #[test]
    fn test_no_change_is_idempotent() {
        let (ctx, mut grid) = sample();
        let before = grid.clone();
        for _ in 0..3 {
            let outcome = apply_change(&mut grid, &ctx, &ChangeRequest::work("A", date(1))).unwrap();
            assert_eq!(outcome, ConstraintOutcome::NoChange);
            assert_eq!(outcome.reason_code(), "NO_CHANGE");
        }
        let outcome = apply_change(&mut grid, &ctx, &ChangeRequest::off("B", date(1))).unwrap();
        assert_eq!(outcome, ConstraintOutcome::NoChange);
        assert_eq!(grid, before);
    }

    #[test]
    fn test_overstaffing_flip_is_accepted() {
        let (ctx, mut grid) = sample();
        // Day 2 already has required + 2 workers.
        assert_eq!(grid.worked_count(2), 3);
        let outcome = apply_change(&mut grid, &ctx, &ChangeRequest::work("B", date(3))).unwrap();
        assert_eq!(outcome, ConstraintOutcome::Accepted);
        assert_eq!(outcome.reason_code(), "ACCEPTED");
        assert_eq!(grid.worked_count(2), 4);
    }

    #[test]
    fn test_sole_veteran_cannot_leave() {
        let (ctx, mut grid) = sample();
        let before = grid.clone();
        let outcome = apply_change(&mut grid, &ctx, &ChangeRequest::off("V", date(1))).unwrap();
        assert_eq!(
            outcome,
            ConstraintOutcome::Rejected(RejectReason::MissingSkill(Skill::Veteran))
        );
        assert_eq!(outcome.reason_code(), "MISSING_SKILL_VETERAN");
        assert_eq!(grid, before);
    }

    #[test]
    fn test_reordered_grid_uses_named_skills() {
        let (ctx, _) = sample();
        let rows = ["X", "V", "B", "A"].map(String::from).to_vec();
        let mut grid = AssignmentGrid::new(rows, ctx.num_days());
        for d in 0..3 {
            for s in [0, 1, 3] {
                grid.set(s, d, ShiftState::Work);
            }
        }

        // A and V still cover every category without X.
        let outcome = apply_change(&mut grid, &ctx, &ChangeRequest::off("X", date(1))).unwrap();
        assert_eq!(outcome, ConstraintOutcome::Accepted);

        let before = grid.clone();
        let outcome = apply_change(&mut grid, &ctx, &ChangeRequest::off("V", date(3))).unwrap();
        assert_eq!(outcome.reason_code(), "MISSING_SKILL_VETERAN");
        assert_eq!(grid, before);
    }

    #[test]
    fn test_understaffed_checked_before_skills() {
        let (ctx, mut grid) = sample();
        let before = grid.clone();
        // Removing V on day 1 breaks both the headcount and the veteran rule.
        let outcome = apply_change(&mut grid, &ctx, &ChangeRequest::off("V", date(2))).unwrap();
        assert_eq!(
            outcome,
            ConstraintOutcome::Rejected(RejectReason::Understaffed {
                required: 3,
                actual: 2
            })
        );
        assert_eq!(outcome.reason_code(), "UNDERSTAFFED");
        assert_eq!(grid, before);
    }

    #[test]
    fn test_language_checked_before_veteran() {
        let (ctx, mut grid) = sample();
        let outcome = apply_change(&mut grid, &ctx, &ChangeRequest::off("A", date(1))).unwrap();
        assert_eq!(outcome.reason_code(), "MISSING_SKILL_B");
    }

    #[test]
    fn test_holiday_work_rejected() {
        let (ctx, mut grid) = sample();
        let outcome = apply_change(&mut grid, &ctx, &ChangeRequest::work("A", date(10))).unwrap();
        assert_eq!(outcome, ConstraintOutcome::Rejected(RejectReason::FixedOffDay));
        assert_eq!(grid.get(0, 9), ShiftState::Off);
    }

    #[test]
    fn test_unknown_staff_and_foreign_date() {
        let (ctx, mut grid) = sample();
        let err = apply_change(&mut grid, &ctx, &ChangeRequest::off("Nobody", date(1))).unwrap_err();
        assert!(matches!(err, RosterError::UnknownStaff(name) if name == "Nobody"));

        let july = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let err = apply_change(&mut grid, &ctx, &ChangeRequest::off("A", july)).unwrap_err();
        assert!(matches!(err, RosterError::DateOutsideMonth(d) if d == july));
    }

    #[test]
    fn test_replay_is_sequential() {
        let (ctx, mut grid) = sample();
        let requests = vec![
            // Day 0 needs 2; each accepted flip changes what the next request sees.
            ChangeRequest::work("B", date(1)),
            ChangeRequest::off("X", date(1)),
            ChangeRequest::off("A", date(1)).cancelled(),
            ChangeRequest::off("Nobody", date(1)),
            ChangeRequest::off("B", date(1)),
            ChangeRequest::off("A", date(1)),
        ];
        let entries = replay(&mut grid, &ctx, &requests);
        let codes: Vec<String> = entries.iter().map(|e| e.reason_code()).collect();
        assert_eq!(
            codes,
            vec!["ACCEPTED", "ACCEPTED", "SKIPPED", "ACCEPTED", "UNDERSTAFFED"]
        );
        assert_eq!(grid.worked_count(0), 2);
        assert_eq!(grid.get(0, 0), ShiftState::Work);
    }

    #[test]
    fn test_check_day_on_solved_day() {
        let (ctx, grid) = sample();
        assert_eq!(check_day(&grid, &ctx, 0), Ok(()));
        assert_eq!(
            check_day(&grid, &ctx, 5),
            Err(RejectReason::Understaffed {
                required: 4,
                actual: 0
            })
        );
    }
}
