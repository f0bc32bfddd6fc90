//! Rostering domain models.
//!
//! Provides the data types for one monthly planning cycle and its result.
//!
//! # Domain Mappings
//!
//! | u-roster | Hospital | Retail | Call Center |
//! |----------|----------|--------|-------------|
//! | Staff | Nurse | Clerk | Agent |
//! | Skill | Language / Seniority | Key holder | Language |
//! | CalendarDay | Ward day | Store day | Service day |
//! | AssignmentGrid | Duty roster | Shift plan | Rota |

mod calendar;
mod grid;
mod roster;
mod staff;

pub use calendar::{weekday_label, CalendarDay, MonthCalendar, DEFAULT_REQUIRED};
pub use grid::{AssignmentGrid, HistoryRow, ShiftState};
pub use roster::{LeaveRequest, RosterContext, TailHistory};
pub use staff::{Skill, Staff};
