//! Roster statistics (KPIs).
//!
//! Computes per-day coverage and per-staff rest consumption from any
//! assignment grid, solved or edited.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Worked | Staff on WORK that day |
//! | Skill counts | Workers per skill category that day |
//! | Consumed rest | Prior OFF days this year + OFF days in the month |
//! | Remaining rest | Annual target − consumed (negative when overdrawn) |
//! | Weekend load | WORK days on non-holiday Saturdays and Sundays |
//!
//! # Reference
//! Burke et al. (2004), "The State of the Art of Nurse Rostering", §3 (Coverage and Fairness)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{AssignmentGrid, RosterContext, Skill};

/// Coverage of one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayStats {
    /// Day index in the month.
    pub day: usize,
    pub date: NaiveDate,
    /// Weekday label ("Mon".."Sun").
    pub weekday: String,
    pub fixed_off: bool,
    pub required: u32,
    pub worked: usize,
    pub language_a: usize,
    pub language_b: usize,
    pub veterans: usize,
}

impl DayStats {
    /// Workers with `skill`.
    pub fn skill_count(&self, skill: Skill) -> usize {
        match skill {
            Skill::LanguageA => self.language_a,
            Skill::LanguageB => self.language_b,
            Skill::Veteran => self.veterans,
        }
    }

    /// Fewer workers than required on a regular day.
    pub fn is_understaffed(&self) -> bool {
        !self.fixed_off && self.worked < self.required as usize
    }

    /// Skill categories with nobody working on a regular day.
    pub fn missing_skills(&self) -> Vec<Skill> {
        if self.fixed_off {
            return Vec::new();
        }
        Skill::ALL
            .into_iter()
            .filter(|&s| self.skill_count(s) == 0)
            .collect()
    }
}

/// Rest-day consumption of one staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRestStats {
    pub name: String,
    pub annual_target: u32,
    /// OFF days before the month.
    pub prior: u32,
    /// OFF days in the month.
    pub month_off: u32,
    /// `prior + month_off`, saturating.
    pub consumed: u32,
    /// `annual_target − consumed`.
    pub remaining: i64,
    /// WORK days on weekend days.
    pub weekend_worked: u32,
}

/// Per-day coverage over the grid's days.
pub fn daily_stats(grid: &AssignmentGrid, ctx: &RosterContext) -> Vec<DayStats> {
    ctx.calendar
        .days()
        .iter()
        .take(grid.num_days())
        .map(|day| DayStats {
            day: day.index,
            date: day.date,
            weekday: day.weekday_label().to_string(),
            fixed_off: day.fixed_off,
            required: day.required,
            worked: grid.worked_count(day.index),
            language_a: grid.skill_count(ctx, day.index, Skill::LanguageA),
            language_b: grid.skill_count(ctx, day.index, Skill::LanguageB),
            veterans: grid.skill_count(ctx, day.index, Skill::Veteran),
        })
        .collect()
}

/// Per-staff rest consumption, in grid row order.
///
/// Rows whose name is not in the context count against a target of zero.
pub fn staff_rest_stats(grid: &AssignmentGrid, ctx: &RosterContext) -> Vec<StaffRestStats> {
    let weekend = ctx.calendar.weekend_indices();
    grid.staff
        .iter()
        .enumerate()
        .map(|(s, name)| {
            let annual_target = ctx
                .staff_index(name)
                .map_or(0, |i| ctx.staff[i].annual_rest_target);
            let prior = ctx.prior_rest_for(name);
            let month_off = grid.off_count(s) as u32;
            let consumed = prior.saturating_add(month_off);
            StaffRestStats {
                name: name.clone(),
                annual_target,
                prior,
                month_off,
                consumed,
                remaining: i64::from(annual_target) - i64::from(consumed),
                weekend_worked: weekend
                    .iter()
                    .filter(|&&d| grid.get(s, d).is_work())
                    .count() as u32,
            }
        })
        .collect()
}

/// Roster performance indicators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterKpi {
    pub days: Vec<DayStats>,
    pub staff: Vec<StaffRestStats>,
    /// Regular days below their requirement.
    pub understaffed_days: usize,
    /// Regular days missing at least one skill category.
    pub skill_gap_days: usize,
    /// Largest minus smallest weekend load across staff.
    pub weekend_spread: u32,
    /// Σ weekend_worked², the quantity the solver penalizes.
    pub weekend_load_squares: u64,
}

impl RosterKpi {
    /// Computes KPIs for a grid.
    pub fn calculate(grid: &AssignmentGrid, ctx: &RosterContext) -> Self {
        let days = daily_stats(grid, ctx);
        let staff = staff_rest_stats(grid, ctx);

        let understaffed_days = days.iter().filter(|d| d.is_understaffed()).count();
        let skill_gap_days = days.iter().filter(|d| !d.missing_skills().is_empty()).count();

        let loads = staff.iter().map(|s| s.weekend_worked);
        let weekend_spread = match (loads.clone().max(), loads.clone().min()) {
            (Some(max), Some(min)) => max - min,
            _ => 0,
        };
        let weekend_load_squares = loads.map(|w| u64::from(w) * u64::from(w)).sum();

        Self {
            days,
            staff,
            understaffed_days,
            skill_gap_days,
            weekend_spread,
            weekend_load_squares,
        }
    }

    /// Whether every regular day meets its headcount and skill mix.
    pub fn is_fully_covered(&self) -> bool {
        self.understaffed_days == 0 && self.skill_gap_days == 0
    }
}
