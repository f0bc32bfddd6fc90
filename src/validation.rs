//! Input validation for roster planning.
//!
//! Checks structural integrity of a [`RosterContext`] before any model is
//! built. Detects:
//! - Empty rosters and duplicate staff names
//! - References to staff who are not on the roster (leave, tail, prior rest)
//! - Per-day requirements outside the policy bounds or outside the month
//! - Monthly rest targets outside the policy bounds
//! - Policies whose own bounds are inconsistent
//!
//! All problems are collected and reported together; nothing is coerced.

use std::collections::HashSet;

use crate::config::RosterPolicy;
use crate::models::RosterContext;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The roster has no staff.
    EmptyRoster,
    /// Two staff members share a name.
    DuplicateStaff,
    /// An input references a staff member not on the roster.
    UnknownStaff,
    /// A per-day requirement is outside the configured bounds.
    RequiredOutOfRange,
    /// A per-day requirement names a day outside the month.
    DayOutOfRange,
    /// The monthly rest target is outside the configured bounds.
    TargetRestOutOfRange,
    /// The policy fails its own bound checks.
    InvalidPolicy,
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the inputs of one planning cycle.
///
/// Checks:
/// 1. At least one staff member
/// 2. No duplicate staff names
/// 3. Active leave, tail history and prior rest name rostered staff
/// 4. Explicit requirements fall inside the month
/// 5. Every day's requirement is within `min_required..=max_required`
/// 6. Outside the settlement month, the rest target is within
///    `min_target_rest_days..=max_target_rest_days`
/// 7. The policy passes [`RosterPolicy::validate`]
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_context(ctx: &RosterContext, policy: &RosterPolicy) -> ValidationResult {
    let mut errors = Vec::new();

    if ctx.staff.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyRoster,
            "Roster has no staff",
        ));
    }

    let mut names = HashSet::new();
    for member in &ctx.staff {
        if !names.insert(member.name.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateStaff,
                format!("Duplicate staff name: {}", member.name),
            ));
        }
    }

    // Staff references
    for leave in ctx.leave.iter().filter(|l| !l.cancelled) {
        if !names.contains(leave.staff.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownStaff,
                format!("Leave on {} for unknown staff '{}'", leave.date, leave.staff),
            ));
        }
    }
    let mut tail_names: Vec<&str> = ctx.tail.staff_names().collect();
    tail_names.sort_unstable();
    for name in tail_names {
        if !names.contains(name) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownStaff,
                format!("Tail history for unknown staff '{name}'"),
            ));
        }
    }
    let mut prior_names: Vec<&str> = ctx.prior_rest.keys().map(String::as_str).collect();
    prior_names.sort_unstable();
    for name in prior_names {
        if !names.contains(name) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownStaff,
                format!("Prior rest usage for unknown staff '{name}'"),
            ));
        }
    }

    // Requirements
    let days = ctx.num_days();
    for &index in ctx.requirements().keys() {
        if index >= days {
            errors.push(ValidationError::new(
                ValidationErrorKind::DayOutOfRange,
                format!("Requirement for day index {index} outside a {days}-day month"),
            ));
        }
    }
    let bounds = policy.min_required..=policy.max_required;
    for day in ctx.calendar.days() {
        if !bounds.contains(&day.required) {
            errors.push(ValidationError::new(
                ValidationErrorKind::RequiredOutOfRange,
                format!(
                    "Required count {} on {} outside {}..={}",
                    day.required, day.date, policy.min_required, policy.max_required
                ),
            ));
        }
    }
    for (&index, &count) in ctx.requirements().range(days..) {
        if !bounds.contains(&count) {
            errors.push(ValidationError::new(
                ValidationErrorKind::RequiredOutOfRange,
                format!(
                    "Required count {count} for day index {index} outside {}..={}",
                    policy.min_required, policy.max_required
                ),
            ));
        }
    }

    // Rest target (the settlement month uses the annual floor instead)
    if ctx.calendar.month != policy.settlement_month
        && !(policy.min_target_rest_days..=policy.max_target_rest_days)
            .contains(&ctx.target_rest_days)
    {
        errors.push(ValidationError::new(
            ValidationErrorKind::TargetRestOutOfRange,
            format!(
                "Monthly rest target {} outside {}..={}",
                ctx.target_rest_days, policy.min_target_rest_days, policy.max_target_rest_days
            ),
        ));
    }

    // Policies built in code never went through `from_toml_str`
    if let Err(e) = policy.validate() {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidPolicy,
            e.to_string(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
