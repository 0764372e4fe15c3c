//! Error types.
//!
//! Each failure kind is its own type so callers can match on exactly the
//! stage that failed. [`Error`] unifies them for the [`Planner`](crate::planner::Planner)
//! pipeline.

use crate::csp::VariableId;
use crate::models::ClockTime;
use thiserror::Error;

/// Malformed or empty course/activity input, or an invalid configuration.
///
/// Never retried: the input itself must change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("no courses were supplied")]
    NoCourses,

    #[error("course `{course}` was supplied more than once")]
    DuplicateCourse { course: String },

    #[error("course `{course}` yields no variables (it has no usable activities)")]
    EmptyCourse { course: String },

    #[error("variable {variable} has an empty initial domain")]
    EmptyInitialDomain { variable: VariableId },

    #[error("session `{session}` of course `{course}` ends at {end}, not after its start {start}")]
    InvalidInterval {
        course: String,
        session: String,
        start: ClockTime,
        end: ClockTime,
    },

    #[error("invalid time of day `{input}` (expected HH:MM)")]
    InvalidTime { input: String },

    #[error("invalid weekday `{input}`")]
    InvalidWeekday { input: String },

    #[error("week index {week} is out of range (weeks 0..{max} are supported)")]
    WeekOutOfRange { week: u32, max: u32 },

    #[error("invalid week pattern `{input}` (expected only '0' and '1')")]
    InvalidWeekPattern { input: String },

    #[error("invalid {kind} `{input}`")]
    InvalidSelector { kind: &'static str, input: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Arc consistency proved that no timetable can exist.
///
/// `variable` is the first variable whose domain was wiped out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no feasible timetable: the domain of {variable} became empty")]
pub struct EmptyDomainError {
    pub variable: VariableId,
}

/// A reward specification that cannot be scored.
///
/// Raised before any scoring work is done.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidRewardSpec {
    #[error("unknown reward kind `{kind}`")]
    UnknownKind { kind: String },

    #[error("reward `{kind}`: {reason}")]
    InvalidParameter { kind: String, reason: String },

    #[error("reward `{kind}` has non-finite weight {weight}")]
    NonFiniteWeight { kind: String, weight: f64 },

    #[error("reward `{kind}` scored solution {index} as {value}")]
    NonFiniteScore { kind: String, index: usize, value: f64 },
}

impl InvalidRewardSpec {
    /// The offending reward key.
    pub fn kind(&self) -> &str {
        match self {
            Self::UnknownKind { kind }
            | Self::InvalidParameter { kind, .. }
            | Self::NonFiniteWeight { kind, .. }
            | Self::NonFiniteScore { kind, .. } => kind,
        }
    }
}

/// Any failure of the full build → enforce → search → rank pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Infeasible(#[from] EmptyDomainError),

    #[error(transparent)]
    InvalidReward(#[from] InvalidRewardSpec),
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;
