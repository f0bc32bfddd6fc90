//! Staff model.
//!
//! Staff are the people being rostered. Each carries three boolean skill
//! flags used for per-day coverage and an annual rest-day target used for
//! the monthly rest budget.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A tracked skill category.
///
/// Every worked day needs at least one staff member from each category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Skill {
    /// Speaks the first service language.
    LanguageA,
    /// Speaks the second service language.
    LanguageB,
    /// Experienced staff member.
    Veteran,
}

impl Skill {
    /// All tracked categories, in the order coverage is checked.
    pub const ALL: [Skill; 3] = [Skill::LanguageA, Skill::LanguageB, Skill::Veteran];

    /// Short code used in reason codes (`A`, `B`, `VETERAN`).
    pub fn code(&self) -> &'static str {
        match self {
            Skill::LanguageA => "A",
            Skill::LanguageB => "B",
            Skill::Veteran => "VETERAN",
        }
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Skill::LanguageA => write!(f, "language A"),
            Skill::LanguageB => write!(f, "language B"),
            Skill::Veteran => write!(f, "veteran"),
        }
    }
}

/// A rosterable staff member.
///
/// Immutable for the duration of one solve/validation cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Staff {
    /// Unique name within the roster.
    pub name: String,
    /// Speaks language A.
    pub language_a: bool,
    /// Speaks language B.
    pub language_b: bool,
    /// Veteran flag.
    pub veteran: bool,
    /// Annual rest-day target (OFF days per calendar year).
    pub annual_rest_target: u32,
}

impl Staff {
    /// Creates a staff member with no skills and a zero rest target.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language_a: false,
            language_b: false,
            veteran: false,
            annual_rest_target: 0,
        }
    }

    /// Sets a skill flag.
    pub fn with_skill(mut self, skill: Skill) -> Self {
        match skill {
            Skill::LanguageA => self.language_a = true,
            Skill::LanguageB => self.language_b = true,
            Skill::Veteran => self.veteran = true,
        }
        self
    }

    /// Sets the annual rest-day target.
    pub fn with_annual_rest_target(mut self, days: u32) -> Self {
        self.annual_rest_target = days;
        self
    }

    /// Whether this staff member covers the given skill category.
    #[inline]
    pub fn has_skill(&self, skill: Skill) -> bool {
        match skill {
            Skill::LanguageA => self.language_a,
            Skill::LanguageB => self.language_b,
            Skill::Veteran => self.veteran,
        }
    }
}
