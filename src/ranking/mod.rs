//! Preference-based ranking of feasible timetables.
//!
//! Feasibility is decided by the solver; this module orders what it found.
//! Each reward maps a [`Solution`](crate::csp::Solution) to a value (higher
//! is better) and the final score is the weighted sum:
//!
//! ```text
//! score = Σ weight[k] · value_k(solution)
//! ```
//!
//! Results come back best first. The sort is stable, so equal scores keep
//! the order in which the search produced them.
//!
//! # Key Components
//!
//! - **Rewards**: [`Reward`] trait, built-in [`RewardKind`]s with a textual
//!   form (`"early_class@09:00"`, `"long_day@6"`, `"gap@10-90"`,
//!   `"exclusion@Fri 12:00-18:00"`)
//! - **Engine**: [`Ranker`], [`rank`], [`rank_by_keys`]
//!
//! # References
//!
//! Weighted-sum scalarisation: Ehrgott (2005), "Multicriteria Optimization"

mod engine;
mod types;

pub use engine::{rank, rank_by_keys, RankedSolution, Ranker};
pub use types::{Reward, RewardKind};
