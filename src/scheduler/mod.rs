//! Roster solve pipeline and KPI evaluation.
//!
//! # Algorithm
//!
//! `RosterSolver` validates a month's inputs, posts the constraint model
//! through a [`CpEngine`](crate::cp::CpEngine), solves it under a fixed
//! wall-clock budget and materializes the result as an
//! [`AssignmentGrid`](crate::models::AssignmentGrid).
//!
//! # KPI
//!
//! `RosterKpi` computes per-day coverage and skill mix, per-staff rest
//! consumption and weekend load for any grid.
//!
//! # References
//!
//! - Burke et al. (2004), "The State of the Art of Nurse Rostering"
//! - Ernst et al. (2004), "Staff scheduling and rostering: A review of applications, methods and models"

mod kpi;
mod solver;

pub use kpi::{daily_stats, staff_rest_stats, DayStats, RosterKpi, StaffRestStats};
pub use solver::{RosterSolver, SolvedRoster};
