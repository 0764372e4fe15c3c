//! Time primitives: time of day, weekday, and recurring week sets.

use crate::error::ConfigurationError;
use std::fmt;
use std::str::FromStr;

/// A time of day with minute resolution.
///
/// Stored as minutes since midnight. `24:00` is accepted so that a session
/// may end at midnight.
///
/// # Examples
///
/// ```
/// use u_timetable::models::ClockTime;
///
/// let t: ClockTime = "09:30".parse().unwrap();
/// assert_eq!(t.minutes(), 570);
/// assert_eq!(t.to_string(), "09:30");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct ClockTime(u16);

impl ClockTime {
    /// Minutes in a day; the largest representable time (`24:00`).
    pub const MINUTES_PER_DAY: u16 = 24 * 60;

    /// Midnight at the start of the day.
    pub const MIDNIGHT: ClockTime = ClockTime(0);

    /// Creates a time from hours and minutes.
    pub fn hm(hours: u16, minutes: u16) -> Result<Self, ConfigurationError> {
        let total = hours
            .checked_mul(60)
            .and_then(|h| h.checked_add(minutes))
            .filter(|&t| minutes < 60 && t <= Self::MINUTES_PER_DAY);
        total.map(ClockTime).ok_or_else(|| ConfigurationError::InvalidTime {
            input: format!("{hours:02}:{minutes:02}"),
        })
    }

    /// Creates a time from minutes since midnight.
    pub fn from_minutes(minutes: u16) -> Result<Self, ConfigurationError> {
        if minutes > Self::MINUTES_PER_DAY {
            return Err(ConfigurationError::InvalidTime {
                input: minutes.to_string(),
            });
        }
        Ok(ClockTime(minutes))
    }

    /// Minutes since midnight.
    pub fn minutes(self) -> u16 {
        self.0
    }

    /// Adds a duration, failing if the result passes midnight.
    pub fn plus_minutes(self, minutes: u16) -> Result<Self, ConfigurationError> {
        Self::from_minutes(self.0.saturating_add(minutes))
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for ClockTime {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigurationError::InvalidTime { input: s.into() };
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if m.len() != 2 {
            return Err(invalid());
        }
        let hours: u16 = h.parse().map_err(|_| invalid())?;
        let minutes: u16 = m.parse().map_err(|_| invalid())?;
        ClockTime::hm(hours, minutes).map_err(|_| invalid())
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

/// Day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    /// All days, Monday first.
    pub const ALL: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    /// Index with Monday = 0.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Three-letter name.
    pub fn short_name(self) -> &'static str {
        match self {
            Weekday::Mon => "Mon",
            Weekday::Tue => "Tue",
            Weekday::Wed => "Wed",
            Weekday::Thu => "Thu",
            Weekday::Fri => "Fri",
            Weekday::Sat => "Sat",
            Weekday::Sun => "Sun",
        }
    }

    fn long_name(self) -> &'static str {
        match self {
            Weekday::Mon => "monday",
            Weekday::Tue => "tuesday",
            Weekday::Wed => "wednesday",
            Weekday::Thu => "thursday",
            Weekday::Fri => "friday",
            Weekday::Sat => "saturday",
            Weekday::Sun => "sunday",
        }
    }

    /// Converts the upstream day number (0 = Sunday … 6 = Saturday).
    pub fn from_day_number(n: u8) -> Option<Self> {
        match n {
            0 => Some(Weekday::Sun),
            1..=6 => Some(Self::ALL[usize::from(n) - 1]),
            _ => None,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for Weekday {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<u8>() {
            return Weekday::from_day_number(n)
                .ok_or_else(|| ConfigurationError::InvalidWeekday { input: s.into() });
        }
        let lower = trimmed.to_ascii_lowercase();
        Weekday::ALL
            .into_iter()
            .find(|d| lower == d.short_name().to_ascii_lowercase() || lower == d.long_name())
            .ok_or_else(|| ConfigurationError::InvalidWeekday { input: s.into() })
    }
}

impl TryFrom<String> for Weekday {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Weekday> for String {
    fn from(value: Weekday) -> Self {
        value.short_name().to_string()
    }
}

/// The set of teaching weeks on which a session recurs.
///
/// Week indices are `0..64`; the set is a bitmask so intersection tests are
/// a single AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "Vec<u32>", into = "Vec<u32>")
)]
pub struct WeekSet {
    bits: u64,
}

impl WeekSet {
    /// Number of representable weeks.
    pub const CAPACITY: u32 = 64;

    /// The empty set.
    pub fn empty() -> Self {
        Self { bits: 0 }
    }

    /// Every representable week.
    pub fn all() -> Self {
        Self { bits: u64::MAX }
    }

    /// Weeks `0..count`.
    pub fn first(count: u32) -> Self {
        let count = count.min(Self::CAPACITY);
        let bits = if count == Self::CAPACITY {
            u64::MAX
        } else {
            (1u64 << count) - 1
        };
        Self { bits }
    }

    /// Builds a set from week indices.
    pub fn from_weeks<I: IntoIterator<Item = u32>>(weeks: I) -> Result<Self, ConfigurationError> {
        let mut set = Self::empty();
        for week in weeks {
            set.insert(week)?;
        }
        Ok(set)
    }

    /// Parses a week pattern such as `"0111110111111"`, one character per
    /// week starting at week 0.
    pub fn from_pattern(pattern: &str) -> Result<Self, ConfigurationError> {
        let mut set = Self::empty();
        for (i, c) in pattern.chars().enumerate() {
            match c {
                '1' => set.insert(i as u32)?,
                '0' => {}
                _ => {
                    return Err(ConfigurationError::InvalidWeekPattern {
                        input: pattern.into(),
                    })
                }
            }
        }
        Ok(set)
    }

    /// Adds a week.
    pub fn insert(&mut self, week: u32) -> Result<(), ConfigurationError> {
        if week >= Self::CAPACITY {
            return Err(ConfigurationError::WeekOutOfRange {
                week,
                max: Self::CAPACITY,
            });
        }
        self.bits |= 1u64 << week;
        Ok(())
    }

    /// Whether the set contains `week`.
    pub fn contains(&self, week: u32) -> bool {
        week < Self::CAPACITY && self.bits & (1u64 << week) != 0
    }

    /// Whether the two sets share at least one week.
    pub fn intersects(&self, other: &WeekSet) -> bool {
        self.bits & other.bits != 0
    }

    /// Number of weeks in the set.
    pub fn len(&self) -> u32 {
        self.bits.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Week indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..Self::CAPACITY).filter(move |&w| self.contains(w))
    }
}

impl TryFrom<Vec<u32>> for WeekSet {
    type Error = ConfigurationError;

    fn try_from(value: Vec<u32>) -> Result<Self, Self::Error> {
        WeekSet::from_weeks(value)
    }
}

impl From<WeekSet> for Vec<u32> {
    fn from(value: WeekSet) -> Self {
        value.iter().collect()
    }
}
