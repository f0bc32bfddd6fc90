//! Assignment grid (solution) model.
//!
//! The grid maps (staff × day) to WORK/OFF. It is produced once per solve
//! and then mutated one cell at a time as change requests are accepted.
//! The grid is exclusively owned by the planning session that produced it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{MonthCalendar, RosterContext, Skill};
use crate::cp::{CpSolution, RosterVars};

/// State of one staff member on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShiftState {
    Work,
    Off,
}

impl ShiftState {
    /// `1` for WORK, `0` for OFF.
    #[inline]
    pub fn as_u8(self) -> u8 {
        match self {
            ShiftState::Work => 1,
            ShiftState::Off => 0,
        }
    }

    #[inline]
    pub fn is_work(self) -> bool {
        self == ShiftState::Work
    }
}

impl From<bool> for ShiftState {
    fn from(work: bool) -> Self {
        if work {
            ShiftState::Work
        } else {
            ShiftState::Off
        }
    }
}

/// Staff × day WORK/OFF matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentGrid {
    /// Staff names, one per row.
    pub staff: Vec<String>,
    days: usize,
    cells: Vec<ShiftState>,
}

/// One finalized day, shaped for a history store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub date: NaiveDate,
    pub weekday: String,
    /// `(staff name, 0/1)` in grid row order.
    pub values: Vec<(String, u8)>,
}

impl AssignmentGrid {
    /// Creates an all-OFF grid.
    pub fn new(staff: Vec<String>, days: usize) -> Self {
        let cells = vec![ShiftState::Off; staff.len() * days];
        Self { staff, days, cells }
    }

    /// Creates an all-OFF grid shaped for a roster context.
    pub fn for_context(ctx: &RosterContext) -> Self {
        Self::new(
            ctx.staff.iter().map(|s| s.name.clone()).collect(),
            ctx.num_days(),
        )
    }

    /// Materializes solved variable values.
    ///
    /// Returns `None` if the solution carries no values.
    pub fn from_solution(ctx: &RosterContext, vars: &RosterVars, solution: &CpSolution) -> Option<Self> {
        if !solution.has_values() {
            return None;
        }
        let mut grid = Self::for_context(ctx);
        for (s, row) in vars.work.iter().enumerate() {
            for (d, var) in row.iter().enumerate() {
                grid.set(s, d, ShiftState::from(solution.value(*var)));
            }
        }
        Some(grid)
    }

    /// Number of staff rows.
    #[inline]
    pub fn num_staff(&self) -> usize {
        self.staff.len()
    }

    /// Number of day columns.
    #[inline]
    pub fn num_days(&self) -> usize {
        self.days
    }

    /// Cell value. Panics if out of range.
    #[inline]
    pub fn get(&self, staff: usize, day: usize) -> ShiftState {
        self.cells[self.offset(staff, day)]
    }

    /// Overwrites a cell. Panics if out of range.
    #[inline]
    pub fn set(&mut self, staff: usize, day: usize, state: ShiftState) {
        let i = self.offset(staff, day);
        self.cells[i] = state;
    }

    /// Row index of a staff member.
    pub fn staff_index(&self, name: &str) -> Option<usize> {
        self.staff.iter().position(|s| s == name)
    }

    /// Rows working on `day`.
    pub fn working_on(&self, day: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.num_staff()).filter(move |&s| self.get(s, day).is_work())
    }

    /// Number of staff working on `day`.
    pub fn worked_count(&self, day: usize) -> usize {
        self.working_on(day).count()
    }

    /// Number of staff with `skill` working on `day`.
    ///
    /// Skills are looked up by row name, so the grid's row order need not
    /// match `ctx.staff`. Rows unknown to the context have no skills.
    pub fn skill_count(&self, ctx: &RosterContext, day: usize, skill: Skill) -> usize {
        self.working_on(day)
            .filter(|&s| {
                ctx.staff_index(&self.staff[s])
                    .is_some_and(|i| ctx.staff[i].has_skill(skill))
            })
            .count()
    }

    /// OFF days for a staff row this month.
    pub fn off_count(&self, staff: usize) -> usize {
        (0..self.days)
            .filter(|&d| !self.get(staff, d).is_work())
            .count()
    }

    /// Per-day rows for persisting a finalized roster.
    pub fn history_rows(&self, calendar: &MonthCalendar) -> Vec<HistoryRow> {
        calendar
            .days()
            .iter()
            .take(self.days)
            .map(|day| HistoryRow {
                date: day.date,
                weekday: day.weekday_label().to_string(),
                values: self
                    .staff
                    .iter()
                    .enumerate()
                    .map(|(s, name)| (name.clone(), self.get(s, day.index).as_u8()))
                    .collect(),
            })
            .collect()
    }

    #[inline]
    fn offset(&self, staff: usize, day: usize) -> usize {
        assert!(day < self.days, "day {day} out of range");
        staff * self.days + day
    }
}
