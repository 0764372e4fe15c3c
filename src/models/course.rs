//! Course and activity records.
//!
//! These are the typed form of what the upstream timetable service returns:
//! a course offering (selected by semester, campus and delivery mode) and
//! its list of concrete sessions.

use super::time::{ClockTime, WeekSet, Weekday};
use crate::error::ConfigurationError;
use std::fmt;
use std::str::FromStr;

/// Category of a session (lecture, tutorial, ...).
///
/// Categories the upstream service adds later are kept verbatim in
/// [`ActivityType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActivityType {
    Lecture,
    /// Recorded/asynchronous delivery with no fixed attendance time.
    Delayed,
    Practical,
    Tutorial,
    Contact,
    Workshop,
    Other(String),
}

impl ActivityType {
    /// Upstream display name.
    pub fn name(&self) -> &str {
        match self {
            ActivityType::Lecture => "Lecture",
            ActivityType::Delayed => "Delayed",
            ActivityType::Practical => "Practical",
            ActivityType::Tutorial => "Tutorial",
            ActivityType::Contact => "Contact",
            ActivityType::Workshop => "Workshop",
            ActivityType::Other(name) => name,
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for ActivityType {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "lecture" | "lec" => ActivityType::Lecture,
            "delayed" | "del" => ActivityType::Delayed,
            "practical" | "prac" => ActivityType::Practical,
            "tutorial" | "tut" => ActivityType::Tutorial,
            "contact" | "con" => ActivityType::Contact,
            "workshop" | "wkshp" => ActivityType::Workshop,
            _ => ActivityType::Other(s.trim().to_string()),
        }
    }
}

macro_rules! selector_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal { $($variant:ident => $code:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum $name {
            #[default]
            $($variant),+
        }

        impl $name {
            /// Upstream code.
            pub fn code(self) -> &'static str {
                match self {
                    $($name::$variant => $code),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        }

        impl FromStr for $name {
            type Err = ConfigurationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let upper = s.trim().to_ascii_uppercase();
                match upper.as_str() {
                    $($code => Ok($name::$variant),)+
                    _ => Err(ConfigurationError::InvalidSelector {
                        kind: $kind,
                        input: s.into(),
                    }),
                }
            }
        }
    };
}

selector_enum!(
    /// Teaching period a course offering belongs to.
    Semester, "semester" {
        All => "ALL",
        S1 => "S1",
        S2 => "S2",
        S3 => "S3",
    }
);

selector_enum!(
    /// Campus a course offering is taught at.
    Campus, "campus" {
        All => "ALL",
        StLucia => "STLUC",
        Herston => "HERST",
        Gatton => "GATTN",
    }
);

selector_enum!(
    /// Internal (on campus) or external delivery.
    DeliveryMode, "delivery mode" {
        Internal => "IN",
        External => "EX",
    }
);

/// One concrete, schedulable session of a course.
///
/// Sessions sharing a `group_code` are interchangeable alternatives: a
/// student attends exactly one of them.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Activity {
    /// Requirement this session satisfies, e.g. `"LEC1"`, `"PRA1"`.
    pub group_code: String,
    /// Identifies the session within its group, e.g. `"01"` or `"02-P1"`.
    pub session_code: String,
    pub activity_type: ActivityType,
    pub day: Weekday,
    pub start: ClockTime,
    pub end: ClockTime,
    /// Weeks on which the session runs.
    pub weeks: WeekSet,
    /// Whether the session is open for selection.
    pub is_open: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub location: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub department: Option<String>,
    /// Places still available, when the upstream service reports it.
    #[cfg_attr(feature = "serde", serde(default))]
    pub spots: Option<u32>,
}

impl Activity {
    /// Creates an open session that runs every week.
    pub fn new(
        group_code: impl Into<String>,
        session_code: impl Into<String>,
        activity_type: ActivityType,
        day: Weekday,
        start: ClockTime,
        end: ClockTime,
    ) -> Self {
        Self {
            group_code: group_code.into(),
            session_code: session_code.into(),
            activity_type,
            day,
            start,
            end,
            weeks: WeekSet::all(),
            is_open: true,
            location: None,
            department: None,
            spots: None,
        }
    }

    /// Creates a session from a start time and a duration in minutes.
    pub fn with_duration(
        group_code: impl Into<String>,
        session_code: impl Into<String>,
        activity_type: ActivityType,
        day: Weekday,
        start: ClockTime,
        duration_minutes: u16,
    ) -> Result<Self, ConfigurationError> {
        let end = start.plus_minutes(duration_minutes)?;
        Ok(Self::new(group_code, session_code, activity_type, day, start, end))
    }

    /// Sets the recurring weeks.
    pub fn with_weeks(mut self, weeks: WeekSet) -> Self {
        self.weeks = weeks;
        self
    }

    /// Sets the open/selectable flag.
    pub fn with_open(mut self, is_open: bool) -> Self {
        self.is_open = is_open;
        self
    }

    /// Sets the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the number of available places.
    pub fn with_spots(mut self, spots: u32) -> Self {
        self.spots = Some(spots);
        self
    }

    /// Length in minutes.
    pub fn duration_minutes(&self) -> u16 {
        self.end.minutes().saturating_sub(self.start.minutes())
    }
}

/// A course offering and its sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Course {
    /// Course code, e.g. `"CSSE2010"`.
    pub id: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub semester: Semester,
    #[cfg_attr(feature = "serde", serde(default))]
    pub campus: Campus,
    #[cfg_attr(feature = "serde", serde(default))]
    pub mode: DeliveryMode,
    pub activities: Vec<Activity>,
}

impl Course {
    /// Creates a course with no sessions.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            semester: Semester::default(),
            campus: Campus::default(),
            mode: DeliveryMode::default(),
            activities: Vec::new(),
        }
    }

    /// Sets the offering selectors.
    pub fn with_offering(mut self, semester: Semester, campus: Campus, mode: DeliveryMode) -> Self {
        self.semester = semester;
        self.campus = campus;
        self.mode = mode;
        self
    }

    /// Adds a session.
    pub fn with_activity(mut self, activity: Activity) -> Self {
        self.activities.push(activity);
        self
    }

    /// Upstream offering key, e.g. `"CSSE2010_S2_STLUC_IN"`.
    pub fn qualified_id(&self) -> String {
        format!("{}_{}_{}_{}", self.id, self.semester, self.campus, self.mode)
    }

    /// Sessions of the given category.
    pub fn activities_of_type<'a>(
        &'a self,
        activity_type: &'a ActivityType,
    ) -> impl Iterator<Item = &'a Activity> + 'a {
        self.activities
            .iter()
            .filter(move |a| &a.activity_type == activity_type)
    }

    /// Distinct group codes in first-appearance order.
    pub fn group_codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = Vec::new();
        for activity in &self.activities {
            if !codes.contains(&activity.group_code.as_str()) {
                codes.push(&activity.group_code);
            }
        }
        codes
    }
}
