//! Constraint model and solver for timetable construction.
//!
//! Each (course, activity group) is a variable whose values are the group's
//! sessions. No two chosen clashable sessions may overlap, and paired
//! sessions of a course must be chosen together.
//!
//! # Key Components
//!
//! - **Building**: [`ModelBuilder`], [`BuildConfig`], [`PairingRule`]
//! - **Model**: [`ConstraintModel`], [`Variable`], [`Session`], [`Domain`]
//! - **Constraints**: [`BinaryConstraint`] (no overlap), [`GroupConstraint`]
//!   (pairing)
//! - **Propagation**: [`enforce`] (AC-3), producing a [`PrunedModel`]
//! - **Search**: [`search`], [`Search`], [`SearchConfig`], [`Solution`]
//!
//! # Pipeline
//!
//! ```text
//! &[Course] --build--> ConstraintModel --enforce--> PrunedModel --search--> Solution*
//! ```
//!
//! Every stage takes its input by reference and returns a new value, so a
//! model can be pruned or searched several times with different settings.
//!
//! # References
//!
//! Russell & Norvig (2020), "Artificial Intelligence: A Modern Approach",
//! ch. 6 (Constraint Satisfaction Problems)

mod arc;
mod builder;
mod model;
#[cfg(feature = "parallel")]
mod parallel;
mod search;
mod variables;

pub use arc::{enforce, enforce_with_observer, is_arc_consistent, AcStats, PrunedModel};
pub use builder::{build, BuildConfig, ModelBuilder, PairingRule};
pub use model::{BinaryConstraint, BinaryRule, ConstraintModel, GroupConstraint};
#[cfg(feature = "parallel")]
pub use parallel::search_parallel;
pub use search::{
    search, Search, SearchConfig, SearchOutcome, SelectedSession, Solution, StopReason,
    ValueOrder,
};
pub use variables::{Domain, Session, Variable, VariableId};
