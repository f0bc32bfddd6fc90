//! Calendar model.
//!
//! Derives the day sequence of one target month: dates, weekday labels,
//! per-day fixed-off flags and per-day required staff counts.
//!
//! # Indexing
//! Days are indexed `0..N-1` within the month. Dates outside the month have
//! no index; callers holding master lists spanning several months filter
//! through [`MonthCalendar::day_index`].

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::RosterError;

/// Required staff count used when a day has no explicit requirement.
pub const DEFAULT_REQUIRED: u32 = 4;

/// One day of the target month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    /// Index within the month (0-based).
    pub index: usize,
    /// Calendar date.
    pub date: NaiveDate,
    /// Day of week.
    pub weekday: Weekday,
    /// Public holiday: everyone is OFF.
    pub fixed_off: bool,
    /// Minimum number of working staff.
    pub required: u32,
}

impl CalendarDay {
    /// Short weekday label (`Mon` .. `Sun`).
    pub fn weekday_label(&self) -> &'static str {
        weekday_label(self.weekday)
    }

    /// Saturday or Sunday.
    #[inline]
    pub fn is_weekend(&self) -> bool {
        matches!(self.weekday, Weekday::Sat | Weekday::Sun)
    }
}

/// Short English label for a weekday.
pub fn weekday_label(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

/// The day sequence of one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthCalendar {
    /// Calendar year.
    pub year: i32,
    /// Month (1-12).
    pub month: u32,
    days: Vec<CalendarDay>,
}

impl MonthCalendar {
    /// Builds the calendar for `year`/`month`.
    ///
    /// Every day starts as a regular working day requiring
    /// [`DEFAULT_REQUIRED`] staff.
    pub fn new(year: i32, month: u32) -> Result<Self, RosterError> {
        let invalid = || RosterError::InvalidCalendar { year, month };
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };
        let next_first = NaiveDate::from_ymd_opt(next_year, next_month, 1).ok_or_else(invalid)?;
        let len = next_first.signed_duration_since(first).num_days() as usize;

        let days = first
            .iter_days()
            .take(len)
            .enumerate()
            .map(|(index, date)| CalendarDay {
                index,
                date,
                weekday: date.weekday(),
                fixed_off: false,
                required: DEFAULT_REQUIRED,
            })
            .collect();

        Ok(Self { year, month, days })
    }

    /// Picks the month to plan given today's date.
    ///
    /// Up to the 10th of the month, planning targets two months ahead;
    /// after that, three months ahead.
    pub fn default_target(today: NaiveDate) -> (i32, u32) {
        let ahead = if today.day() <= 10 { 2 } else { 3 };
        let zero_based = today.month0() + ahead;
        (today.year() + (zero_based / 12) as i32, zero_based % 12 + 1)
    }

    /// Number of days in the month.
    #[inline]
    pub fn len(&self) -> usize {
        self.days.len()
    }

    /// Always false for a valid month.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// All days in order.
    pub fn days(&self) -> &[CalendarDay] {
        &self.days
    }

    /// The day at `index`.
    pub fn day(&self, index: usize) -> Option<&CalendarDay> {
        self.days.get(index)
    }

    pub(crate) fn day_mut(&mut self, index: usize) -> Option<&mut CalendarDay> {
        self.days.get_mut(index)
    }

    /// First date of the month.
    pub fn first_date(&self) -> NaiveDate {
        self.days[0].date
    }

    /// Index of `date` within this month, if it belongs to it.
    pub fn day_index(&self, date: NaiveDate) -> Option<usize> {
        if date.year() == self.year && date.month() == self.month {
            Some(date.day0() as usize)
        } else {
            None
        }
    }

    /// Date `offset` days before the first of the month (`offset >= 1`).
    pub fn date_before_start(&self, offset: u32) -> NaiveDate {
        self.first_date() - Duration::days(i64::from(offset))
    }

    /// Indices of Saturdays and Sundays that are not fixed-off days.
    pub fn weekend_indices(&self) -> Vec<usize> {
        self.days
            .iter()
            .filter(|d| d.is_weekend() && !d.fixed_off)
            .map(|d| d.index)
            .collect()
    }

    /// Indices of fixed-off days.
    pub fn fixed_off_indices(&self) -> Vec<usize> {
        self.days
            .iter()
            .filter(|d| d.fixed_off)
            .map(|d| d.index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_lengths() {
        assert_eq!(MonthCalendar::new(2025, 4).unwrap().len(), 30);
        assert_eq!(MonthCalendar::new(2025, 12).unwrap().len(), 31);
        assert_eq!(MonthCalendar::new(2024, 2).unwrap().len(), 29); // leap year
        assert_eq!(MonthCalendar::new(2025, 2).unwrap().len(), 28);
    }

    #[test]
    fn test_invalid_month() {
        assert!(matches!(
            MonthCalendar::new(2025, 13),
            Err(RosterError::InvalidCalendar { month: 13, .. })
        ));
        assert!(MonthCalendar::new(2025, 0).is_err());
    }

    #[test]
    fn test_weekday_labels() {
        // 2025-06-01 is a Sunday
        let cal = MonthCalendar::new(2025, 6).unwrap();
        assert_eq!(cal.day(0).unwrap().weekday_label(), "Sun");
        assert_eq!(cal.day(1).unwrap().weekday_label(), "Mon");
        assert!(cal.day(0).unwrap().is_weekend());
        assert!(!cal.day(1).unwrap().is_weekend());
    }

    #[test]
    fn test_defaults() {
        let cal = MonthCalendar::new(2025, 6).unwrap();
        assert!(cal.days().iter().all(|d| d.required == DEFAULT_REQUIRED));
        assert!(cal.days().iter().all(|d| !d.fixed_off));
        assert_eq!(cal.days()[29].index, 29);
    }

    #[test]
    fn test_day_index() {
        let cal = MonthCalendar::new(2025, 6).unwrap();
        assert_eq!(cal.day_index(date(2025, 6, 1)), Some(0));
        assert_eq!(cal.day_index(date(2025, 6, 30)), Some(29));
        assert_eq!(cal.day_index(date(2025, 7, 1)), None);
        assert_eq!(cal.day_index(date(2024, 6, 1)), None);
    }

    #[test]
    fn test_date_before_start() {
        let cal = MonthCalendar::new(2025, 3).unwrap();
        assert_eq!(cal.date_before_start(1), date(2025, 2, 28));
        assert_eq!(cal.date_before_start(4), date(2025, 2, 25));
    }

    #[test]
    fn test_weekend_excludes_fixed_off() {
        let mut cal = MonthCalendar::new(2025, 6).unwrap();
        // June 2025 weekends: 1, 7, 8, 14, 15, 21, 22, 28, 29
        assert_eq!(cal.weekend_indices().len(), 9);
        cal.day_mut(0).unwrap().fixed_off = true;
        assert_eq!(cal.weekend_indices().len(), 8);
        assert_eq!(cal.fixed_off_indices(), vec![0]);
    }

    #[test]
    fn test_default_target() {
        assert_eq!(MonthCalendar::default_target(date(2025, 3, 10)), (2025, 5));
        assert_eq!(MonthCalendar::default_target(date(2025, 3, 11)), (2025, 6));
        assert_eq!(MonthCalendar::default_target(date(2025, 11, 5)), (2026, 1));
        assert_eq!(MonthCalendar::default_target(date(2025, 10, 20)), (2026, 1));
        assert_eq!(MonthCalendar::default_target(date(2025, 12, 31)), (2026, 3));
    }
}
