//! CP-based roster formulation.
//!
//! Bridges roster domain models to a boolean constraint engine.
//! [`RosterModelBuilder`] posts variables, hard constraints and the weighted
//! objective through the [`CpEngine`] trait; [`LocalSearchEngine`] is the
//! built-in engine. Any other engine (an external CP-SAT binding, a MIP
//! backend) plugs in by implementing [`CpEngine`].
//!
//! # Reference
//! - Burke et al. (2004), "The State of the Art of Nurse Rostering"
//! - Selman, Kautz & Cohen (1994), "Noise Strategies for Improving Local Search"
//! - Morris (1993), "The Breakout Method for Escaping from Local Minima"

mod builder;
mod local_search;
mod model;

pub use builder::{RosterModelBuilder, RosterVars};
pub use local_search::{LocalSearchEngine, SearchConfig};
pub use model::{
    CmpOp, CpConstraint, CpEngine, CpModel, CpSolution, LinearExpr, Literal, SolveStatus, VarRef,
};
