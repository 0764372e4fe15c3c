//! Input domain types.
//!
//! Typed course and session records consumed by the model builder. Fetching
//! them (and caching upstream responses) is the caller's business; this
//! module only fixes their shape.
//!
//! - **Time**: [`ClockTime`], [`Weekday`], [`WeekSet`]
//! - **Courses**: [`Course`], [`Activity`], [`ActivityType`]
//! - **Offering selectors**: [`Semester`], [`Campus`], [`DeliveryMode`]

mod course;
mod time;

pub use course::{Activity, ActivityType, Campus, Course, DeliveryMode, Semester};
pub use time::{ClockTime, WeekSet, Weekday};
