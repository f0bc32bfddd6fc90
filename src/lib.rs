//! Monthly staff rostering for the U-Engine ecosystem.
//!
//! Provides a constraint model that turns staffing policy for one calendar
//! month into a WORK/OFF grid, and an incremental validator that accepts or
//! rejects single-cell edits against the per-day rules.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Staff`, `Skill`, `MonthCalendar`,
//!   `RosterContext`, `TailHistory`, `AssignmentGrid`
//! - **`validation`**: Input integrity checks (duplicate staff, unknown
//!   references, out-of-range requirements and rest targets)
//! - **`cp`**: Boolean constraint model, the `CpEngine` interface, the
//!   roster model builder and the built-in local search engine
//! - **`scheduler`**: Solve pipeline (`RosterSolver`) and roster KPIs
//! - **`changes`**: One-request-at-a-time change validation and replay
//! - **`config`**: `RosterPolicy`, loadable from TOML
//! - **`error`**: `RosterError`
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use u_roster::changes::{apply_change, ChangeRequest};
//! use u_roster::config::RosterPolicy;
//! use u_roster::models::{RosterContext, Skill, Staff};
//! use u_roster::scheduler::RosterSolver;
//!
//! let staff = (0..6)
//!     .map(|i| Staff::new(format!("S{i}"))
//!         .with_skill(Skill::LanguageA)
//!         .with_skill(Skill::LanguageB)
//!         .with_skill(Skill::Veteran))
//!     .collect();
//! let policy = RosterPolicy {
//!     default_required: 2,
//!     max_unimproved_steps: Some(2_000),
//!     ..RosterPolicy::default()
//! };
//! let ctx = RosterContext::for_month(2026, 2, staff, &policy)
//!     .unwrap()
//!     .with_target_rest_days(14);
//!
//! let mut grid = RosterSolver::new(policy).solve(&ctx).unwrap().grid;
//!
//! // A holiday request on a day nobody is short of: re-checked locally.
//! let request = ChangeRequest::off("S0", NaiveDate::from_ymd_opt(2026, 2, 3).unwrap());
//! let outcome = apply_change(&mut grid, &ctx, &request).unwrap();
//! println!("{}", outcome.reason_code());
//! ```
//!
//! # Architecture
//!
//! The crate sits at Layer 3 (Frameworks) in the U-Engine ecosystem. It
//! carries its own boolean search engine behind the `CpEngine` trait so
//! that any external solver can replace it without touching the model.
//!
//! # References
//!
//! - Burke et al. (2004), "The State of the Art of Nurse Rostering"
//! - Ernst et al. (2004), "Staff scheduling and rostering: A review of applications, methods and models"

pub mod changes;
pub mod config;
pub mod cp;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod validation;

pub use error::RosterError;
