//! Roster context.
//!
//! Bundles everything one planning cycle reads: the month calendar with
//! holidays and per-day requirements, the staff list, approved leave, the
//! prior-month tail and the rest days already consumed this year.
//!
//! Constructed fresh per cycle and read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use super::{MonthCalendar, ShiftState, Staff};
use crate::config::RosterPolicy;
use crate::error::RosterError;

/// An approved individual leave day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRequest {
    /// Staff name.
    pub staff: String,
    /// Requested OFF date.
    pub date: NaiveDate,
    /// Withdrawn by the requester; ignored by the builder.
    pub cancelled: bool,
}

impl LeaveRequest {
    /// Creates an active leave request.
    pub fn new(staff: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            staff: staff.into(),
            date,
            cancelled: false,
        }
    }

    /// Marks the request as cancelled.
    pub fn cancelled(mut self) -> Self {
        self.cancelled = true;
        self
    }
}

/// WORK/OFF values for the last days of the previous month.
///
/// Values are stored oldest first. Days not supplied read as OFF.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailHistory {
    entries: HashMap<String, Vec<ShiftState>>,
}

impl TailHistory {
    /// Creates an empty tail (everyone OFF before the month starts).
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a staff member's tail, oldest day first.
    ///
    /// The last element is the final day of the previous month.
    pub fn with_staff(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = ShiftState>,
    ) -> Self {
        self.entries.insert(name.into(), values.into_iter().collect());
        self
    }

    /// State `offset` days before the month starts (`1` = last day of prior month).
    pub fn value(&self, name: &str, offset: usize) -> ShiftState {
        self.entries
            .get(name)
            .and_then(|values| {
                values
                    .len()
                    .checked_sub(offset)
                    .and_then(|i| values.get(i))
            })
            .copied()
            .unwrap_or(ShiftState::Off)
    }

    /// Staff names with a recorded tail.
    pub fn staff_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// All read-only inputs of one planning cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterContext {
    /// Target month with holidays and requirements applied.
    pub calendar: MonthCalendar,
    /// Rostered staff, in grid row order.
    pub staff: Vec<Staff>,
    /// Approved leave (may include other months and cancelled entries).
    pub leave: Vec<LeaveRequest>,
    /// Prior-month tail for rolling windows.
    pub tail: TailHistory,
    /// OFF days already consumed this year before the target month.
    pub prior_rest: HashMap<String, u32>,
    /// Monthly OFF-day target (ignored in the settlement month).
    pub target_rest_days: u32,
    requirements: BTreeMap<usize, u32>,
}

impl RosterContext {
    /// Creates a context with reference defaults for `calendar`.
    pub fn new(calendar: MonthCalendar, staff: Vec<Staff>) -> Self {
        Self {
            calendar,
            staff,
            leave: Vec::new(),
            tail: TailHistory::new(),
            prior_rest: HashMap::new(),
            target_rest_days: RosterPolicy::default().default_target_rest_days,
            requirements: BTreeMap::new(),
        }
    }

    /// Creates a context for `year`/`month` using a policy's defaults.
    pub fn for_month(
        year: i32,
        month: u32,
        staff: Vec<Staff>,
        policy: &RosterPolicy,
    ) -> Result<Self, RosterError> {
        let mut calendar = MonthCalendar::new(year, month)?;
        for index in 0..calendar.len() {
            if let Some(day) = calendar.day_mut(index) {
                day.required = policy.default_required;
            }
        }
        let mut ctx = Self::new(calendar, staff);
        ctx.target_rest_days = policy.default_target_rest_days;
        Ok(ctx)
    }

    /// Marks a public holiday. Dates outside the month are ignored.
    pub fn with_holiday(mut self, date: NaiveDate) -> Self {
        if let Some(index) = self.calendar.day_index(date) {
            if let Some(day) = self.calendar.day_mut(index) {
                day.fixed_off = true;
            }
        }
        self
    }

    /// Marks several holidays.
    pub fn with_holidays(self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        dates.into_iter().fold(self, Self::with_holiday)
    }

    /// Sets the required staff count for a day index.
    ///
    /// Out-of-range indices and counts are kept and reported by validation.
    pub fn with_required(mut self, index: usize, count: u32) -> Self {
        self.requirements.insert(index, count);
        if let Some(day) = self.calendar.day_mut(index) {
            day.required = count;
        }
        self
    }

    /// Adds an approved leave request.
    pub fn with_leave(mut self, leave: LeaveRequest) -> Self {
        self.leave.push(leave);
        self
    }

    /// Sets the prior-month tail.
    pub fn with_tail(mut self, tail: TailHistory) -> Self {
        self.tail = tail;
        self
    }

    /// Records OFF days consumed earlier this year.
    pub fn with_prior_rest(mut self, name: impl Into<String>, days: u32) -> Self {
        self.prior_rest.insert(name.into(), days);
        self
    }

    /// Sets the monthly OFF-day target.
    pub fn with_target_rest_days(mut self, days: u32) -> Self {
        self.target_rest_days = days;
        self
    }

    /// Explicit per-day requirements, including invalid ones.
    pub fn requirements(&self) -> &BTreeMap<usize, u32> {
        &self.requirements
    }

    /// Number of days in the month.
    #[inline]
    pub fn num_days(&self) -> usize {
        self.calendar.len()
    }

    /// Row index of a staff member.
    pub fn staff_index(&self, name: &str) -> Option<usize> {
        self.staff.iter().position(|s| s.name == name)
    }

    /// Required staff count for a day (the calendar default if unset).
    pub fn required(&self, day: usize) -> u32 {
        self.calendar
            .day(day)
            .map_or(crate::models::DEFAULT_REQUIRED, |d| d.required)
    }

    /// Whether a day is a public holiday.
    pub fn is_fixed_off(&self, day: usize) -> bool {
        self.calendar.day(day).is_some_and(|d| d.fixed_off)
    }

    /// OFF days consumed before the target month.
    pub fn prior_rest_for(&self, name: &str) -> u32 {
        self.prior_rest.get(name).copied().unwrap_or(0)
    }

    /// Active leave in the target month as `(staff_index, day)` pairs.
    ///
    /// Leave for unknown staff is skipped here; validation reports it.
    pub fn leave_cells(&self) -> Vec<(usize, usize)> {
        self.leave
            .iter()
            .filter(|l| !l.cancelled)
            .filter_map(|l| {
                let day = self.calendar.day_index(l.date)?;
                let staff = self.staff_index(&l.staff)?;
                Some((staff, day))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Skill;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn staff() -> Vec<Staff> {
        vec![
            Staff::new("A").with_skill(Skill::LanguageA),
            Staff::new("B").with_skill(Skill::Veteran),
        ]
    }

    #[test]
    fn test_tail_offsets() {
        use ShiftState::{Off, Work};
        let tail = TailHistory::new().with_staff("A", [Work, Work, Off, Work]);
        assert_eq!(tail.value("A", 1), Work); // last day of prior month
        assert_eq!(tail.value("A", 2), Off);
        assert_eq!(tail.value("A", 4), Work);
        assert_eq!(tail.value("A", 5), Off); // beyond recorded tail
        assert_eq!(tail.value("Z", 1), Off); // unknown staff
    }

    #[test]
    fn test_holidays_filtered_to_month() {
        let cal = MonthCalendar::new(2025, 6).unwrap();
        let ctx = RosterContext::new(cal, staff())
            .with_holidays([date(2025, 6, 10), date(2025, 7, 1)]);
        assert!(ctx.is_fixed_off(9));
        assert_eq!(ctx.calendar.fixed_off_indices(), vec![9]);
    }

    #[test]
    fn test_required_overrides() {
        let cal = MonthCalendar::new(2025, 6).unwrap();
        let ctx = RosterContext::new(cal, staff())
            .with_required(3, 6)
            .with_required(40, 2);
        assert_eq!(ctx.required(3), 6);
        assert_eq!(ctx.required(4), 4);
        assert_eq!(ctx.requirements().get(&40), Some(&2));
    }

    #[test]
    fn test_for_month_applies_policy() {
        let policy = RosterPolicy {
            default_required: 3,
            default_target_rest_days: 9,
            ..RosterPolicy::default()
        };
        let ctx = RosterContext::for_month(2025, 6, staff(), &policy).unwrap();
        assert_eq!(ctx.required(0), 3);
        assert_eq!(ctx.target_rest_days, 9);
    }

    #[test]
    fn test_leave_cells_skip_cancelled_and_foreign() {
        let cal = MonthCalendar::new(2025, 6).unwrap();
        let ctx = RosterContext::new(cal, staff())
            .with_leave(LeaveRequest::new("A", date(2025, 6, 2)))
            .with_leave(LeaveRequest::new("B", date(2025, 6, 3)).cancelled())
            .with_leave(LeaveRequest::new("B", date(2025, 8, 3)))
            .with_leave(LeaveRequest::new("Z", date(2025, 6, 4)));
        assert_eq!(ctx.leave_cells(), vec![(0, 1)]);
    }

    #[test]
    fn test_prior_rest_default_zero() {
        let cal = MonthCalendar::new(2025, 6).unwrap();
        let ctx = RosterContext::new(cal, staff()).with_prior_rest("A", 50);
        assert_eq!(ctx.prior_rest_for("A"), 50);
        assert_eq!(ctx.prior_rest_for("B"), 0);
    }
}
