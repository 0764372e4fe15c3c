//! CSP variables, candidate values and domains.

use crate::models::{ActivityType, ClockTime, WeekSet, Weekday};
use std::fmt;

/// Identifies a variable: one required component of one course.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId {
    /// Course code.
    pub course_id: String,
    /// Activity-group code within the course.
    pub group_code: String,
}

impl VariableId {
    pub fn new(course_id: impl Into<String>, group_code: impl Into<String>) -> Self {
        Self {
            course_id: course_id.into(),
            group_code: group_code.into(),
        }
    }

    /// Id of one part of a split paired group: `PRA1` part `2` is `PRA1#P2`.
    pub fn part(course_id: impl Into<String>, group_code: &str, part: &str) -> Self {
        Self::new(course_id, format!("{group_code}#P{part}"))
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.course_id, self.group_code)
    }
}

/// A candidate value: one concrete session a variable may take.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Session {
    pub session_code: String,
    pub activity_type: ActivityType,
    pub day: Weekday,
    pub start: ClockTime,
    pub end: ClockTime,
    pub weeks: WeekSet,
    pub is_open: bool,
    /// Whether this session can clash with anything at all.
    pub clashable: bool,
    /// For one part of a paired session, the option it belongs to: `"01"`
    /// for `"01-P2"`. Every part of a chosen option must be attended.
    pub pairing_stem: Option<String>,
}

impl Session {
    /// Whether the two sessions occupy the same time.
    ///
    /// True iff both are clashable, fall on the same day, share at least one
    /// week, and their half-open `[start, end)` intervals intersect. A session
    /// ending at 10:00 does not clash with one starting at 10:00.
    pub fn overlaps(&self, other: &Session) -> bool {
        self.clashable
            && other.clashable
            && self.day == other.day
            && self.weeks.intersects(&other.weeks)
            && self.start < other.end
            && other.start < self.end
    }

    /// Length in minutes.
    pub fn duration_minutes(&self) -> u16 {
        self.end.minutes().saturating_sub(self.start.minutes())
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}-{}",
            self.session_code, self.day, self.start, self.end
        )
    }
}

/// A decision variable with its full, immutable list of candidate values.
///
/// Domains refer to values by index into `values`.
#[derive(Debug, Clone)]
pub struct Variable {
    pub id: VariableId,
    pub values: Vec<Session>,
}

impl Variable {
    pub fn new(id: VariableId, values: Vec<Session>) -> Self {
        Self { id, values }
    }

    /// Whether any candidate value participates in overlap constraints.
    pub fn is_clashable(&self) -> bool {
        self.values.iter().any(|v| v.clashable)
    }
}

/// The ordered set of value indices still possible for a variable.
///
/// Order is the builder's insertion order; domains only ever shrink.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Domain {
    values: Vec<usize>,
}

impl Domain {
    /// Domain holding `0..size`.
    pub fn full(size: usize) -> Self {
        Self {
            values: (0..size).collect(),
        }
    }

    /// Domain holding exactly one value.
    pub fn single(value: usize) -> Self {
        Self {
            values: vec![value],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, value: usize) -> bool {
        self.values.contains(&value)
    }

    /// Value indices in domain order.
    pub fn values(&self) -> &[usize] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.values.iter().copied()
    }

    /// Keeps only values satisfying `keep`; returns how many were removed.
    pub fn retain<F: FnMut(usize) -> bool>(&mut self, mut keep: F) -> usize {
        let before = self.values.len();
        self.values.retain(|&v| keep(v));
        before - self.values.len()
    }
}

impl FromIterator<usize> for Domain {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(day: Weekday, start: &str, end: &str, weeks: &[u32]) -> Session {
        Session {
            session_code: "01".into(),
            activity_type: ActivityType::Tutorial,
            day,
            start: start.parse().unwrap(),
            end: end.parse().unwrap(),
            weeks: WeekSet::from_weeks(weeks.iter().copied()).unwrap(),
            is_open: true,
            clashable: true,
            pairing_stem: None,
        }
    }

    #[test]
    fn test_overlap_half_open() {
        let a = session(Weekday::Mon, "09:00", "10:00", &[1]);
        let b = session(Weekday::Mon, "10:00", "11:00", &[1]);
        let c = session(Weekday::Mon, "09:30", "10:30", &[1]);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn test_overlap_needs_shared_week_and_day() {
        let a = session(Weekday::Mon, "09:00", "10:00", &[1, 3]);
        let b = session(Weekday::Mon, "09:00", "10:00", &[2, 4]);
        let c = session(Weekday::Tue, "09:00", "10:00", &[1, 3]);
        assert!(!a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_non_clashable_never_overlaps() {
        let a = session(Weekday::Mon, "09:00", "10:00", &[1]);
        let mut b = a.clone();
        b.clashable = false;
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_domain_retain() {
        let mut d = Domain::full(5);
        let removed = d.retain(|v| v % 2 == 0);
        assert_eq!(removed, 2);
        assert_eq!(d.values(), &[0, 2, 4]);
        assert!(d.contains(4));
        assert!(!d.contains(1));
    }

    #[test]
    fn test_variable_id_display() {
        assert_eq!(VariableId::new("CSSE2010", "PRA1").to_string(), "CSSE2010/PRA1");
    }
}
