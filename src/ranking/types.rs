//! Reward functions.

use crate::csp::{Session, Solution};
use crate::error::InvalidRewardSpec;
use crate::models::{ClockTime, Weekday};
use std::fmt;
use std::str::FromStr;

/// A scoring function over complete timetables.
///
/// Rewards return `f64` values where **higher is better**; the built-in
/// kinds are penalties and never return more than zero. The [`Ranker`]
/// multiplies each value by its weight and sums.
///
/// # Examples
///
/// ```
/// use u_timetable::csp::Solution;
/// use u_timetable::ranking::Reward;
///
/// // Prefer timetables with fewer Friday sessions.
/// struct FreeFriday;
///
/// impl Reward for FreeFriday {
///     fn name(&self) -> &str { "free_friday" }
///     fn value(&self, solution: &Solution) -> f64 {
///         -(solution.sessions_on(u_timetable::models::Weekday::Fri).len() as f64)
///     }
/// }
/// ```
///
/// [`Ranker`]: super::Ranker
pub trait Reward: Send + Sync {
    /// Returns the name of this reward.
    fn name(&self) -> &str;

    /// Scores a timetable.
    fn value(&self, solution: &Solution) -> f64;

    /// Checks the reward's parameters before any scoring happens.
    fn validate(&self) -> Result<(), InvalidRewardSpec> {
        Ok(())
    }
}

/// Built-in rewards.
///
/// Only clashable sessions occupy time; non-clashable ones are ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum RewardKind {
    /// Minus the minutes each session starts before `threshold`.
    EarlyClassPenalty { threshold: ClockTime },

    /// Minus, for each day, the minutes of class beyond `max_hours`.
    LongDayPenalty { max_hours: f64 },

    /// Minus the minutes by which each idle gap between consecutive
    /// same-day sessions exceeds `max_idle_minutes`. Gaps shorter than
    /// `min_gap_minutes` are not idle time and never count.
    GapPenalty {
        min_gap_minutes: u16,
        max_idle_minutes: u16,
    },

    /// Minus the number of sessions intersecting `[start, end)` on `day`.
    ExclusionWindowPenalty {
        day: Weekday,
        start: ClockTime,
        end: ClockTime,
    },
}

impl RewardKind {
    /// Key used in the textual form, e.g. `"gap"`.
    pub fn key(&self) -> &'static str {
        match self {
            RewardKind::EarlyClassPenalty { .. } => "early_class",
            RewardKind::LongDayPenalty { .. } => "long_day",
            RewardKind::GapPenalty { .. } => "gap",
            RewardKind::ExclusionWindowPenalty { .. } => "exclusion",
        }
    }

    /// Checks the parameters.
    pub fn check(&self) -> Result<(), InvalidRewardSpec> {
        let invalid = |reason: &str| {
            Err(InvalidRewardSpec::InvalidParameter {
                kind: self.key().to_string(),
                reason: reason.to_string(),
            })
        };
        match *self {
            RewardKind::LongDayPenalty { max_hours } if !max_hours.is_finite() => {
                invalid("max_hours must be finite")
            }
            RewardKind::LongDayPenalty { max_hours } if max_hours < 0.0 => {
                invalid("max_hours must be non-negative")
            }
            RewardKind::ExclusionWindowPenalty { start, end, .. } if end <= start => {
                invalid("window must end after it starts")
            }
            _ => Ok(()),
        }
    }

    /// Scores a timetable.
    pub fn evaluate(&self, solution: &Solution) -> f64 {
        match *self {
            RewardKind::EarlyClassPenalty { threshold } => -solution
                .sessions()
                .filter(|s| s.clashable && s.start < threshold)
                .map(|s| f64::from(threshold.minutes() - s.start.minutes()))
                .sum::<f64>(),

            RewardKind::LongDayPenalty { max_hours } => {
                let allowed = max_hours * 60.0;
                -Weekday::ALL
                    .iter()
                    .map(|&day| {
                        let scheduled: f64 = solution
                            .sessions_on(day)
                            .iter()
                            .map(|s| f64::from(s.duration_minutes()))
                            .sum();
                        (scheduled - allowed).max(0.0)
                    })
                    .sum::<f64>()
            }

            RewardKind::GapPenalty {
                min_gap_minutes,
                max_idle_minutes,
            } => -Weekday::ALL
                .iter()
                .flat_map(|&day| idle_gaps(&solution.sessions_on(day)))
                .filter(|&gap| gap >= min_gap_minutes && gap > max_idle_minutes)
                .map(|gap| f64::from(gap - max_idle_minutes))
                .sum::<f64>(),

            RewardKind::ExclusionWindowPenalty { day, start, end } => -(solution
                .sessions_on(day)
                .iter()
                .filter(|s| s.start < end && start < s.end)
                .count() as f64),
        }
    }
}

/// Idle minutes between consecutive sessions of one day, sorted by start.
/// Overlapping or back-to-back sessions leave no gap.
fn idle_gaps(day: &[&Session]) -> Vec<u16> {
    let mut gaps = Vec::new();
    let mut busy_until: Option<ClockTime> = None;
    for session in day {
        if let Some(until) = busy_until {
            if session.start > until {
                gaps.push(session.start.minutes() - until.minutes());
            }
        }
        busy_until = Some(busy_until.map_or(session.end, |until| until.max(session.end)));
    }
    gaps
}

impl Reward for RewardKind {
    fn name(&self) -> &str {
        self.key()
    }

    fn value(&self, solution: &Solution) -> f64 {
        self.evaluate(solution)
    }

    fn validate(&self) -> Result<(), InvalidRewardSpec> {
        self.check()
    }
}

impl fmt::Display for RewardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewardKind::EarlyClassPenalty { threshold } => write!(f, "early_class@{threshold}"),
            RewardKind::LongDayPenalty { max_hours } => write!(f, "long_day@{max_hours}"),
            RewardKind::GapPenalty {
                min_gap_minutes,
                max_idle_minutes,
            } => write!(f, "gap@{min_gap_minutes}-{max_idle_minutes}"),
            RewardKind::ExclusionWindowPenalty { day, start, end } => {
                write!(f, "exclusion@{day} {start}-{end}")
            }
        }
    }
}

/// Parses `early_class@HH:MM`, `long_day@<hours>`, `gap@<min>-<max>` and
/// `exclusion@<Day> HH:MM-HH:MM`. Parameters are validated.
impl FromStr for RewardKind {
    type Err = InvalidRewardSpec;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (key, params) = match s.split_once('@') {
            Some((key, params)) => (key.trim(), params.trim()),
            None => (s, ""),
        };
        let invalid = |reason: String| InvalidRewardSpec::InvalidParameter {
            kind: key.to_string(),
            reason,
        };
        let time = |text: &str| {
            text.trim()
                .parse::<ClockTime>()
                .map_err(|e| invalid(e.to_string()))
        };
        let minutes = |text: &str| {
            text.trim()
                .parse::<u16>()
                .map_err(|_| invalid(format!("expected minutes, got `{text}`")))
        };

        let kind = match key {
            "early_class" => RewardKind::EarlyClassPenalty {
                threshold: time(params)?,
            },
            "long_day" => RewardKind::LongDayPenalty {
                max_hours: params
                    .parse()
                    .map_err(|_| invalid(format!("expected hours, got `{params}`")))?,
            },
            "gap" => {
                let (min, max) = params
                    .split_once('-')
                    .ok_or_else(|| invalid(format!("expected `<min>-<max>`, got `{params}`")))?;
                RewardKind::GapPenalty {
                    min_gap_minutes: minutes(min)?,
                    max_idle_minutes: minutes(max)?,
                }
            }
            "exclusion" => {
                let (day, window) = params.split_once(' ').ok_or_else(|| {
                    invalid(format!("expected `<Day> HH:MM-HH:MM`, got `{params}`"))
                })?;
                let (start, end) = window
                    .split_once('-')
                    .ok_or_else(|| invalid(format!("expected `HH:MM-HH:MM`, got `{window}`")))?;
                RewardKind::ExclusionWindowPenalty {
                    day: day.parse::<Weekday>().map_err(|e| invalid(e.to_string()))?,
                    start: time(start)?,
                    end: time(end)?,
                }
            }
            other => {
                return Err(InvalidRewardSpec::UnknownKind {
                    kind: other.to_string(),
                })
            }
        };
        kind.check()?;
        Ok(kind)
    }
}
