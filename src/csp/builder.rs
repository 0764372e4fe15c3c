//! Turns course records into a constraint model.
//!
//! One variable per (course, activity group); its initial domain is every
//! session of that group, in input order. A group whose session codes mark
//! parts (`01-P1`, `01-P2`) is split into one variable per part, tied by a
//! group constraint so that every part of the chosen option is attended.
//! Binary no-overlap constraints link clashable variables whose sessions can
//! collide.

use super::model::{BinaryConstraint, ConstraintModel, GroupConstraint};
use super::variables::{Session, Variable, VariableId};
use crate::error::ConfigurationError;
use crate::models::{ActivityType, Course};
use crate::observer::{default_observer, SkipReason, SolverEvent, SolverObserver};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// How paired sessions are recognised from their session codes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PairingRule {
    /// No sessions are paired.
    #[default]
    None,
    /// A code `<stem><delimiter><part>` is one part of a paired option:
    /// with delimiter `"-P"`, `"01-P2"` is part `2` of option `01`. Parts
    /// are matched within one activity group; taking option `01` means
    /// attending every one of its parts.
    Suffix { delimiter: String },
}

impl PairingRule {
    /// Suffix rule with the given delimiter.
    pub fn suffix(delimiter: impl Into<String>) -> Self {
        PairingRule::Suffix {
            delimiter: delimiter.into(),
        }
    }

    /// Splits a session code into its option stem and part, if it is a part.
    pub fn split<'a>(&self, session_code: &'a str) -> Option<(&'a str, &'a str)> {
        match self {
            PairingRule::None => None,
            PairingRule::Suffix { delimiter } if delimiter.is_empty() => None,
            PairingRule::Suffix { delimiter } => {
                let i = session_code.rfind(delimiter.as_str())?;
                let part = &session_code[i + delimiter.len()..];
                (!part.is_empty()).then(|| (&session_code[..i], part))
            }
        }
    }
}

/// Configuration for [`ModelBuilder`].
///
/// # Examples
///
/// ```
/// use u_timetable::csp::{BuildConfig, PairingRule};
/// use u_timetable::models::ActivityType;
///
/// let config = BuildConfig::default()
///     .with_non_clashable([ActivityType::Delayed])
///     .with_pairing(PairingRule::suffix("-P"))
///     .with_skip_closed(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct BuildConfig {
    /// Activity types whose sessions never clash (e.g. recorded lectures).
    pub non_clashable: HashSet<ActivityType>,

    /// Pairing-detection rule.
    pub pairing: PairingRule,

    /// Leave sessions that are not open for selection out of the domains.
    pub skip_closed: bool,

    /// Event sink.
    pub observer: Arc<dyn SolverObserver>,
}

impl fmt::Debug for BuildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildConfig")
            .field("non_clashable", &self.non_clashable)
            .field("pairing", &self.pairing)
            .field("skip_closed", &self.skip_closed)
            .finish_non_exhaustive()
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            non_clashable: HashSet::new(),
            pairing: PairingRule::None,
            skip_closed: false,
            observer: default_observer(),
        }
    }
}

impl BuildConfig {
    /// Preset: delayed (asynchronous) sessions never clash and `-P` session
    /// suffixes mark pairs.
    pub fn conventional() -> Self {
        Self::default()
            .with_non_clashable([ActivityType::Delayed])
            .with_pairing(PairingRule::suffix("-P"))
    }

    /// Sets the non-clashable activity types.
    pub fn with_non_clashable<I: IntoIterator<Item = ActivityType>>(mut self, types: I) -> Self {
        self.non_clashable = types.into_iter().collect();
        self
    }

    /// Sets the pairing rule.
    pub fn with_pairing(mut self, pairing: PairingRule) -> Self {
        self.pairing = pairing;
        self
    }

    /// Sets whether closed sessions are skipped.
    pub fn with_skip_closed(mut self, skip: bool) -> Self {
        self.skip_closed = skip;
        self
    }

    /// Sets the event sink.
    pub fn with_observer(mut self, observer: Arc<dyn SolverObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if let PairingRule::Suffix { delimiter } = &self.pairing {
            if delimiter.is_empty() {
                return Err("pairing delimiter must not be empty".into());
            }
        }
        Ok(())
    }
}

/// Builds a [`ConstraintModel`] from course records.
pub struct ModelBuilder {
    config: BuildConfig,
}

impl ModelBuilder {
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Builds the model.
    ///
    /// Fails when no courses are given, a course repeats or has no
    /// activities, a session does not end after it starts, or a variable is
    /// left with no candidate values.
    pub fn build(&self, courses: &[Course]) -> Result<ConstraintModel, ConfigurationError> {
        self.config
            .validate()
            .map_err(ConfigurationError::InvalidConfig)?;

        if courses.is_empty() {
            return Err(ConfigurationError::NoCourses);
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut variables: Vec<Variable> = Vec::new();
        let mut groups: Vec<GroupConstraint> = Vec::new();

        for course in courses {
            if !seen.insert(course.id.as_str()) {
                return Err(ConfigurationError::DuplicateCourse {
                    course: course.id.clone(),
                });
            }

            let plain = self.course_variables(course)?;
            if plain.is_empty() {
                return Err(ConfigurationError::EmptyCourse {
                    course: course.id.clone(),
                });
            }

            for var in plain {
                let first = variables.len();
                variables.extend(self.split_parts(var));
                if variables.len() - first > 1 {
                    groups.push(GroupConstraint {
                        course_id: course.id.clone(),
                        members: (first..variables.len()).collect(),
                    });
                }
            }
        }

        if let Some(var) = variables.iter().find(|v| v.values.is_empty()) {
            return Err(ConfigurationError::EmptyInitialDomain {
                variable: var.id.clone(),
            });
        }

        let constraints = overlap_constraints(&variables);
        let model = ConstraintModel::new(variables, constraints, groups)
            .map_err(ConfigurationError::InvalidConfig)?;

        self.config.observer.on_event(&SolverEvent::ModelBuilt {
            variables: model.variable_count(),
            constraints: model.constraint_count(),
            groups: model.group_count(),
        });

        Ok(model)
    }

    /// One variable per group code, in first-appearance order.
    fn course_variables(&self, course: &Course) -> Result<Vec<Variable>, ConfigurationError> {
        let mut variables: Vec<Variable> = Vec::new();

        for activity in &course.activities {
            if activity.end <= activity.start {
                return Err(ConfigurationError::InvalidInterval {
                    course: course.id.clone(),
                    session: activity.session_code.clone(),
                    start: activity.start,
                    end: activity.end,
                });
            }

            let pos = match variables
                .iter()
                .position(|v| v.id.group_code == activity.group_code)
            {
                Some(pos) => pos,
                None => {
                    variables.push(Variable::new(
                        VariableId::new(&course.id, &activity.group_code),
                        Vec::new(),
                    ));
                    variables.len() - 1
                }
            };

            if self.config.skip_closed && !activity.is_open {
                self.config.observer.on_event(&SolverEvent::SessionSkipped {
                    variable: variables[pos].id.clone(),
                    session: activity.session_code.clone(),
                    reason: SkipReason::Closed,
                });
                continue;
            }

            variables[pos].values.push(Session {
                session_code: activity.session_code.clone(),
                activity_type: activity.activity_type.clone(),
                day: activity.day,
                start: activity.start,
                end: activity.end,
                weeks: activity.weeks,
                is_open: activity.is_open,
                clashable: !self.config.non_clashable.contains(&activity.activity_type),
                pairing_stem: None,
            });
        }

        Ok(variables)
    }

    /// Splits a group whose session codes mark parts into one variable per
    /// part.
    ///
    /// `PRA1` holding `01-P1, 01-P2, 02-P1, 02-P2` becomes `PRA1#P1` and
    /// `PRA1#P2`, each holding its half of options `01` and `02`. An option
    /// missing one of the group's parts can never be attended in full, and
    /// neither can an unmarked session among marked ones; both are dropped.
    /// A group with fewer than two distinct parts is returned unchanged.
    fn split_parts(&self, var: Variable) -> Vec<Variable> {
        let rule = &self.config.pairing;

        let mut parts: Vec<String> = Vec::new();
        let mut stem_parts: HashMap<String, HashSet<String>> = HashMap::new();
        for session in &var.values {
            if let Some((stem, part)) = rule.split(&session.session_code) {
                if !parts.iter().any(|p| p == part) {
                    parts.push(part.to_string());
                }
                stem_parts
                    .entry(stem.to_string())
                    .or_default()
                    .insert(part.to_string());
            }
        }
        if parts.len() < 2 {
            return vec![var];
        }

        let Variable { id, values } = var;
        let mut split: Vec<Variable> = parts
            .iter()
            .map(|p| Variable::new(VariableId::part(&id.course_id, &id.group_code, p), Vec::new()))
            .collect();

        for mut session in values {
            let placement = rule.split(&session.session_code).and_then(|(stem, part)| {
                let complete = stem_parts.get(stem).map_or(0, HashSet::len) == parts.len();
                let slot = parts.iter().position(|p| p == part)?;
                complete.then(|| (slot, stem.to_string()))
            });
            match placement {
                Some((slot, stem)) => {
                    session.pairing_stem = Some(stem);
                    split[slot].values.push(session);
                }
                None => self.config.observer.on_event(&SolverEvent::SessionSkipped {
                    variable: id.clone(),
                    session: session.session_code.clone(),
                    reason: SkipReason::IncompletePair,
                }),
            }
        }
        split
    }
}

/// A no-overlap constraint for every pair of variables that has at least one
/// pair of colliding sessions; other pairs can never conflict.
fn overlap_constraints(variables: &[Variable]) -> Vec<BinaryConstraint> {
    let mut constraints = Vec::new();
    for i in 0..variables.len() {
        if !variables[i].is_clashable() {
            continue;
        }
        for j in (i + 1)..variables.len() {
            if !variables[j].is_clashable() {
                continue;
            }
            let collide = variables[i]
                .values
                .iter()
                .any(|a| variables[j].values.iter().any(|b| a.overlaps(b)));
            if collide {
                constraints.push(BinaryConstraint::no_overlap(i, j));
            }
        }
    }
    constraints
}

/// Builds a model with the given non-clashable types and pairing rule.
///
/// # Examples
///
/// ```
/// use std::collections::HashSet;
/// use u_timetable::csp::{build, PairingRule};
/// use u_timetable::models::{Activity, ActivityType, Course, Weekday};
///
/// let course = Course::new("CSSE2010").with_activity(Activity::new(
///     "LEC1",
///     "01",
///     ActivityType::Lecture,
///     Weekday::Mon,
///     "09:00".parse().unwrap(),
///     "11:00".parse().unwrap(),
/// ));
/// let model = build(&[course], &HashSet::new(), &PairingRule::None).unwrap();
/// assert_eq!(model.variable_count(), 1);
/// ```
pub fn build(
    courses: &[Course],
    non_clashable: &HashSet<ActivityType>,
    pairing: &PairingRule,
) -> Result<ConstraintModel, ConfigurationError> {
    let config = BuildConfig::default()
        .with_non_clashable(non_clashable.iter().cloned())
        .with_pairing(pairing.clone());
    ModelBuilder::new(config).build(courses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csp::testing::{activity, course};
    use crate::models::Weekday;
    use crate::observer::testing::RecordingObserver;

    #[test]
    fn test_pairing_rule_split() {
        let rule = PairingRule::suffix("-P");
        assert_eq!(rule.split("01-P2"), Some(("01", "2")));
        assert_eq!(rule.split("01-P"), None);
        assert_eq!(rule.split("01"), None);
        assert_eq!(rule.split("01-PX-P3"), Some(("01-PX", "3")));
        assert_eq!(PairingRule::None.split("01-P2"), None);
        assert_eq!(PairingRule::suffix("").split("01-P2"), None);
    }

    #[test]
    fn test_groups_sessions_by_code() {
        let c = course(
            "CSSE2010",
            vec![
                activity("LEC1", "01", Weekday::Mon, "09:00", "11:00"),
                activity("PRA1", "01", Weekday::Tue, "14:00", "16:00"),
                activity("PRA1", "02", Weekday::Wed, "14:00", "16:00"),
                activity("LEC1", "02", Weekday::Thu, "09:00", "11:00"),
            ],
        );
        let model = ModelBuilder::new(BuildConfig::default()).build(&[c]).unwrap();

        assert_eq!(model.variable_count(), 2);
        assert_eq!(model.variable(0).id, VariableId::new("CSSE2010", "LEC1"));
        assert_eq!(model.variable(0).values.len(), 2);
        assert_eq!(model.variable(0).values[1].session_code, "02");
        assert_eq!(model.variable(1).id.group_code, "PRA1");
        // No lecture can collide with a practical.
        assert_eq!(model.constraint_count(), 0);
    }

    #[test]
    fn test_overlap_constraints_across_courses() {
        let a = course("A", vec![activity("LEC1", "01", Weekday::Mon, "09:00", "11:00")]);
        let b = course(
            "B",
            vec![
                activity("LEC1", "01", Weekday::Mon, "10:00", "12:00"),
                activity("LEC1", "02", Weekday::Tue, "10:00", "12:00"),
            ],
        );
        let model = ModelBuilder::new(BuildConfig::default()).build(&[a, b]).unwrap();
        assert_eq!(model.constraint_count(), 1);
        assert_eq!(model.constraint_between(0, 1), Some(0));
    }

    #[test]
    fn test_non_clashable_types_skip_constraints() {
        let mut delayed = activity("DEL1", "01", Weekday::Mon, "09:00", "11:00");
        delayed.activity_type = ActivityType::Delayed;
        let c = course(
            "A",
            vec![delayed, activity("TUT1", "01", Weekday::Mon, "09:00", "10:00")],
        );

        let clashing = ModelBuilder::new(BuildConfig::default())
            .build(std::slice::from_ref(&c))
            .unwrap();
        assert_eq!(clashing.constraint_count(), 1);

        let relaxed = ModelBuilder::new(BuildConfig::conventional()).build(&[c]).unwrap();
        assert_eq!(relaxed.constraint_count(), 0);
        assert!(!relaxed.variable(0).values[0].clashable);
    }

    #[test]
    fn test_empty_input_errors() {
        let builder = ModelBuilder::new(BuildConfig::default());
        assert_eq!(builder.build(&[]).unwrap_err(), ConfigurationError::NoCourses);

        let empty = course("EMPTY", vec![]);
        assert_eq!(
            builder.build(&[empty]).unwrap_err(),
            ConfigurationError::EmptyCourse {
                course: "EMPTY".into()
            }
        );
    }

    #[test]
    fn test_duplicate_course() {
        let a = course("A", vec![activity("LEC1", "01", Weekday::Mon, "09:00", "10:00")]);
        let result = ModelBuilder::new(BuildConfig::default()).build(&[a.clone(), a]);
        assert!(matches!(result, Err(ConfigurationError::DuplicateCourse { .. })));
    }

    #[test]
    fn test_inverted_interval() {
        let a = course("A", vec![activity("LEC1", "01", Weekday::Mon, "10:00", "10:00")]);
        let result = ModelBuilder::new(BuildConfig::default()).build(&[a]);
        assert!(matches!(result, Err(ConfigurationError::InvalidInterval { .. })));
    }

    #[test]
    fn test_skip_closed_can_empty_domain() {
        let c = course(
            "A",
            vec![
                activity("LEC1", "01", Weekday::Mon, "09:00", "10:00"),
                activity("TUT1", "01", Weekday::Tue, "09:00", "10:00").with_open(false),
            ],
        );
        let recorder = Arc::new(RecordingObserver::default());
        let config = BuildConfig::default()
            .with_skip_closed(true)
            .with_observer(recorder.clone());
        let result = ModelBuilder::new(config).build(&[c]);

        assert_eq!(
            result.unwrap_err(),
            ConfigurationError::EmptyInitialDomain {
                variable: VariableId::new("A", "TUT1")
            }
        );
        assert!(recorder.take().iter().any(|e| matches!(
            e,
            SolverEvent::SessionSkipped {
                reason: SkipReason::Closed,
                ..
            }
        )));
    }

    fn paired_practicals() -> Course {
        course(
            "A",
            vec![
                activity("PRA1", "01-P1", Weekday::Mon, "09:00", "10:00"),
                activity("PRA1", "01-P2", Weekday::Wed, "09:00", "10:00"),
                activity("PRA1", "02-P1", Weekday::Tue, "09:00", "10:00"),
                activity("PRA1", "02-P2", Weekday::Thu, "09:00", "10:00"),
                activity("TUT1", "01", Weekday::Fri, "09:00", "10:00"),
            ],
        )
    }

    #[test]
    fn test_paired_group_splits_into_parts() {
        let model = ModelBuilder::new(BuildConfig::conventional())
            .build(&[paired_practicals()])
            .unwrap();

        assert_eq!(model.variable_count(), 3);
        assert_eq!(model.variable(0).id, VariableId::new("A", "PRA1#P1"));
        assert_eq!(model.variable(1).id, VariableId::new("A", "PRA1#P2"));
        assert_eq!(model.variable(2).id, VariableId::new("A", "TUT1"));

        let first: Vec<_> = model.variable(0).values.iter().map(|s| s.session_code.as_str()).collect();
        assert_eq!(first, ["01-P1", "02-P1"]);
        let stems: Vec<_> = model.variable(1).values.iter().map(|s| s.pairing_stem.as_deref()).collect();
        assert_eq!(stems, [Some("01"), Some("02")]);

        assert_eq!(model.group_count(), 1);
        assert_eq!(model.groups()[0].members, vec![0, 1]);
        assert!(model.group_of(2).is_none());
    }

    #[test]
    fn test_three_part_group() {
        let c = course(
            "A",
            vec![
                activity("PRA1", "01-P1", Weekday::Mon, "09:00", "10:00"),
                activity("PRA1", "01-P2", Weekday::Tue, "09:00", "10:00"),
                activity("PRA1", "01-P3", Weekday::Wed, "09:00", "10:00"),
                activity("PRA1", "02-P1", Weekday::Mon, "11:00", "12:00"),
                activity("PRA1", "02-P2", Weekday::Tue, "11:00", "12:00"),
                activity("PRA1", "02-P3", Weekday::Wed, "11:00", "12:00"),
            ],
        );
        let model = ModelBuilder::new(BuildConfig::conventional()).build(&[c]).unwrap();

        assert_eq!(model.variable_count(), 3);
        assert_eq!(model.variable(2).id.group_code, "PRA1#P3");
        assert_eq!(model.groups()[0].members, vec![0, 1, 2]);
        assert!(model.variables().iter().all(|v| v.values.len() == 2));
    }

    #[test]
    fn test_incomplete_pairs_dropped() {
        let c = course(
            "A",
            vec![
                activity("PRA1", "01-P1", Weekday::Mon, "09:00", "10:00"),
                activity("PRA1", "01-P2", Weekday::Wed, "09:00", "10:00"),
                // No second part.
                activity("PRA1", "02-P1", Weekday::Tue, "09:00", "10:00"),
                // No part marker at all.
                activity("PRA1", "03", Weekday::Thu, "09:00", "10:00"),
            ],
        );
        let recorder = Arc::new(RecordingObserver::default());
        let config = BuildConfig::conventional().with_observer(recorder.clone());
        let model = ModelBuilder::new(config).build(&[c]).unwrap();

        assert_eq!(model.variable(0).values.len(), 1);
        assert_eq!(model.variable(1).values.len(), 1);
        let dropped: Vec<String> = recorder
            .take()
            .into_iter()
            .filter_map(|e| match e {
                SolverEvent::SessionSkipped {
                    session,
                    reason: SkipReason::IncompletePair,
                    ..
                } => Some(session),
                _ => None,
            })
            .collect();
        assert_eq!(dropped, ["02-P1", "03"]);
    }

    #[test]
    fn test_single_part_forms_no_group() {
        let c = course(
            "A",
            vec![
                activity("LEC1", "01-P1", Weekday::Mon, "09:00", "10:00"),
                activity("LEC1", "02-P1", Weekday::Tue, "09:00", "10:00"),
                activity("TUT1", "01", Weekday::Tue, "11:00", "12:00"),
            ],
        );
        let model = ModelBuilder::new(BuildConfig::conventional()).build(&[c]).unwrap();
        assert_eq!(model.group_count(), 0);
        assert_eq!(model.variable(0).id.group_code, "LEC1");
        assert_eq!(model.variable(0).values.len(), 2);
    }

    #[test]
    fn test_pairing_off_keeps_group_whole() {
        let model = ModelBuilder::new(BuildConfig::default())
            .build(&[paired_practicals()])
            .unwrap();
        assert_eq!(model.variable_count(), 2);
        assert_eq!(model.variable(0).values.len(), 4);
        assert_eq!(model.group_count(), 0);
    }

    #[test]
    fn test_build_function() {
        let c = course("A", vec![activity("LEC1", "01", Weekday::Mon, "09:00", "10:00")]);
        let model = build(&[c], &HashSet::new(), &PairingRule::None).unwrap();
        assert_eq!(model.variable_count(), 1);
        assert_eq!(model.domain(0).len(), 1);
    }

    #[test]
    fn test_empty_delimiter_invalid() {
        let config = BuildConfig::default().with_pairing(PairingRule::suffix(""));
        assert!(config.validate().is_err());
        let c = course("A", vec![activity("LEC1", "01", Weekday::Mon, "09:00", "10:00")]);
        assert!(matches!(
            ModelBuilder::new(config).build(&[c]),
            Err(ConfigurationError::InvalidConfig(_))
        ));
    }
}
