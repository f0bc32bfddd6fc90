//! Error taxonomy.
//!
//! Terminal failures only. A rejected change request is not an error: it is
//! reported as [`ConstraintOutcome::Rejected`](crate::changes::ConstraintOutcome)
//! and the grid is left unchanged.

use chrono::NaiveDate;
use thiserror::Error;

use crate::cp::SolveStatus;
use crate::validation::ValidationError;

/// Errors raised by the rostering core.
#[derive(Debug, Error)]
pub enum RosterError {
    /// The hard constraints could not be satisfied within the time budget.
    ///
    /// No partial grid is produced; relax the inputs and retry.
    #[error("no feasible roster ({status})")]
    ModelInfeasible { status: SolveStatus },

    /// Malformed or out-of-range inputs, rejected before model construction.
    #[error("inconsistent roster input: {}", join_messages(.0))]
    InputInconsistency(Vec<ValidationError>),

    /// A request names a staff member who is not on the roster.
    #[error("unknown staff member '{0}'")]
    UnknownStaff(String),

    /// A request targets a date outside the planned month.
    #[error("date {0} is outside the planned month")]
    DateOutsideMonth(NaiveDate),

    /// The year/month pair does not name a calendar month.
    #[error("invalid calendar month {year}-{month}")]
    InvalidCalendar { year: i32, month: u32 },
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
