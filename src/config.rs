//! Rostering policy configuration.
//!
//! Every policy constant the model builder, engine and validator use lives
//! here with the reference values as defaults. Policies can be loaded from
//! TOML so a deployment can tune bounds without code changes.
//!
//! # Example
//! ```
//! use u_roster::config::RosterPolicy;
//!
//! let policy = RosterPolicy::from_toml_str(r#"
//!     default_target_rest_days = 10
//!     time_limit_secs = 5
//!
//!     [weights]
//!     weekend_load = 300
//! "#).unwrap();
//!
//! assert_eq!(policy.default_target_rest_days, 10);
//! assert_eq!(policy.weights.weekend_load, 300);
//! assert_eq!(policy.weights.coverage, 50); // untouched fields keep defaults
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on `max_consecutive_work`: the longest month.
pub const MAX_CONSECUTIVE_WORK_LIMIT: u32 = 31;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Objective weights.
///
/// Relative order encodes policy priority. Changing the ratios changes the
/// fairness of solved rosters even when all hard constraints still hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyWeights {
    /// Per day whose worked count is not exactly the requirement.
    pub coverage: i64,
    /// Per unit of deviation from a staff member's rest target.
    pub rest_budget: i64,
    /// Per run of three consecutive OFF days.
    pub long_rest: i64,
    /// Multiplier on the square of each staff member's weekend work count.
    pub weekend_load: i64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            coverage: 50,
            rest_budget: 100,
            long_rest: 50,
            weekend_load: 200,
        }
    }
}

/// A (month, day-of-month) pair on which every staff member must work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceDay {
    /// Month (1-12).
    pub month: u32,
    /// Day of month (1-based).
    pub day: u32,
}

/// Policy parameters for model construction, solving and validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterPolicy {
    /// Required staff when a day has no explicit requirement.
    pub default_required: u32,
    /// Smallest accepted per-day requirement.
    pub min_required: u32,
    /// Largest accepted per-day requirement.
    pub max_required: u32,
    /// Workers allowed above the requirement.
    pub overstaff_slack: u32,
    /// Longest permitted run of consecutive WORK days.
    pub max_consecutive_work: u32,
    /// Prior-month days carried in tail history.
    pub tail_days: u32,
    /// Monthly OFF-day target used when the caller supplies none.
    pub default_target_rest_days: u32,
    /// Smallest accepted monthly OFF-day target.
    pub min_target_rest_days: u32,
    /// Largest accepted monthly OFF-day target.
    pub max_target_rest_days: u32,
    /// Month in which the annual rest floor becomes a hard constraint.
    pub settlement_month: u32,
    /// Universal attendance day, if any.
    pub special_attendance: Option<AttendanceDay>,
    /// Month in which the three-OFF-days penalty is not posted.
    pub suppress_long_rest_in_month: Option<u32>,
    /// Objective weights.
    pub weights: PenaltyWeights,
    /// Engine wall-clock budget (seconds).
    pub time_limit_secs: u64,
    /// Seed for the built-in engine.
    pub random_seed: u64,
    /// Stop the built-in engine after this many steps without a new best.
    pub max_unimproved_steps: Option<u64>,
}

impl Default for RosterPolicy {
    fn default() -> Self {
        Self {
            default_required: 4,
            min_required: 0,
            max_required: 20,
            overstaff_slack: 2,
            max_consecutive_work: 4,
            tail_days: 4,
            default_target_rest_days: 11,
            min_target_rest_days: 8,
            max_target_rest_days: 20,
            settlement_month: 12,
            special_attendance: Some(AttendanceDay { month: 1, day: 4 }),
            suppress_long_rest_in_month: Some(1),
            weights: PenaltyWeights::default(),
            time_limit_secs: 15,
            random_seed: 0,
            max_unimproved_steps: None,
        }
    }
}

impl RosterPolicy {
    /// Creates the reference policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a policy from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing, is not valid TOML, or fails
    /// [`RosterPolicy::validate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses a policy from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let policy: Self = toml::from_str(s)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Sets the engine time budget.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit_secs = limit.as_secs().max(1);
        self
    }

    /// Sets the engine seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    /// Sets the unimproved-step early stop.
    pub fn with_max_unimproved_steps(mut self, steps: u64) -> Self {
        self.max_unimproved_steps = Some(steps);
        self
    }

    /// Engine wall-clock budget.
    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_secs)
    }

    /// Rolling window length (`max_consecutive_work + 1` days).
    #[inline]
    pub fn window_len(&self) -> usize {
        self.max_consecutive_work as usize + 1
    }

    /// Checks internal consistency of the bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_required > self.max_required {
            return Err(ConfigError::Invalid(format!(
                "min_required {} exceeds max_required {}",
                self.min_required, self.max_required
            )));
        }
        if !(self.min_required..=self.max_required).contains(&self.default_required) {
            return Err(ConfigError::Invalid(format!(
                "default_required {} outside {}..={}",
                self.default_required, self.min_required, self.max_required
            )));
        }
        if self.min_target_rest_days > self.max_target_rest_days {
            return Err(ConfigError::Invalid(format!(
                "min_target_rest_days {} exceeds max_target_rest_days {}",
                self.min_target_rest_days, self.max_target_rest_days
            )));
        }
        if !(1..=12).contains(&self.settlement_month) {
            return Err(ConfigError::Invalid(format!(
                "settlement_month {} is not a month",
                self.settlement_month
            )));
        }
        if self.max_consecutive_work == 0 {
            return Err(ConfigError::Invalid(
                "max_consecutive_work must be positive".into(),
            ));
        }
        if self.max_consecutive_work > MAX_CONSECUTIVE_WORK_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_consecutive_work {} exceeds {MAX_CONSECUTIVE_WORK_LIMIT}",
                self.max_consecutive_work
            )));
        }
        // Tail days beyond the window can never reach an in-month window.
        if self.tail_days > self.max_consecutive_work {
            return Err(ConfigError::Invalid(format!(
                "tail_days {} exceeds max_consecutive_work {}",
                self.tail_days, self.max_consecutive_work
            )));
        }
        if self.time_limit_secs == 0 {
            return Err(ConfigError::Invalid("time_limit_secs must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_defaults() {
        let p = RosterPolicy::default();
        assert_eq!(p.default_required, 4);
        assert_eq!(p.overstaff_slack, 2);
        assert_eq!(p.window_len(), 5);
        assert_eq!(p.settlement_month, 12);
        assert_eq!(p.time_limit(), Duration::from_secs(15));
        assert_eq!(
            p.weights,
            PenaltyWeights {
                coverage: 50,
                rest_budget: 100,
                long_rest: 50,
                weekend_load: 200,
            }
        );
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let p = RosterPolicy::from_toml_str(
            r#"
            settlement_month = 3
            special_attendance = { month = 5, day = 1 }
            "#,
        )
        .unwrap();
        assert_eq!(p.settlement_month, 3);
        assert_eq!(p.special_attendance, Some(AttendanceDay { month: 5, day: 1 }));
        assert_eq!(p.default_required, 4);
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let err = RosterPolicy::from_toml_str("min_required = 5\nmax_required = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = RosterPolicy::from_toml_str("settlement_month = 13").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_window_bounds_rejected() {
        let err = RosterPolicy::from_toml_str("max_consecutive_work = 1000").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = RosterPolicy::from_toml_str("tail_days = 6").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let p = RosterPolicy::from_toml_str("max_consecutive_work = 6\ntail_days = 6").unwrap();
        assert_eq!(p.window_len(), 7);
        assert!(RosterPolicy::from_toml_str("max_consecutive_work = 31\ntail_days = 0").is_ok());
    }

    #[test]
    fn test_malformed_toml() {
        let err = RosterPolicy::from_toml_str("default_required = \"four\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = RosterPolicy::load("/nonexistent/roster-policy.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
