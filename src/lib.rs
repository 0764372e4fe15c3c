//! Clash-free university timetables by constraint satisfaction.
//!
//! Given the courses a student is taking, each with several activity groups
//! (lectures, tutorials, practicals) offered at several times, finds every
//! way to pick one session per group so that nothing overlaps, then orders
//! the results by preference:
//!
//! - **Models**: typed course and session records ([`models`]).
//! - **CSP**: model builder, AC-3 arc consistency and a lazy backtracking
//!   search with forward checking ([`csp`]).
//! - **Ranking**: weighted reward functions over complete timetables
//!   ([`ranking`]).
//! - **Planner**: the whole pipeline behind one call ([`planner`]).
//!
//! # Architecture
//!
//! ```text
//! Course records → build → ConstraintModel → enforce → PrunedModel
//!                → search → Solution* → rank → RankedSolution*
//! ```
//!
//! Fetching timetable data is out of scope: callers supply [`models::Course`]
//! values. Progress is reported through [`observer::SolverObserver`]; the
//! default forwards to the `log` facade.
//!
//! # Features
//!
//! - `serde`: `Serialize`/`Deserialize` on input records
//! - `parallel`: [`csp::search_parallel`] on rayon

pub mod csp;
pub mod error;
pub mod models;
pub mod observer;
pub mod planner;
pub mod ranking;

pub use error::{Error, Result};
