//! One-call pipeline from course records to ranked timetables.
//!
//! [`Planner`] chains build → enforce → search → rank with a single
//! [`PlanConfig`]. Each stage remains available on its own in
//! [`csp`](crate::csp) and [`ranking`](crate::ranking).

use crate::csp::{
    enforce_with_observer, AcStats, BuildConfig, ModelBuilder, PrunedModel, Search, SearchConfig,
    SearchOutcome, StopReason,
};
use crate::error::{ConfigurationError, Result};
use crate::models::Course;
use crate::observer::SolverObserver;
use crate::ranking::{RankedSolution, Ranker, RewardKind};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Configuration for [`Planner`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use u_timetable::planner::PlanConfig;
/// use u_timetable::ranking::RewardKind;
///
/// let config = PlanConfig::conventional()
///     .with_limit(50)
///     .with_time_limit(Duration::from_secs(3))
///     .with_reward(RewardKind::LongDayPenalty { max_hours: 6.0 }, 1.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct PlanConfig {
    /// How courses become a constraint model.
    pub build: BuildConfig,

    /// Search settings. An absolute deadline here applies as is.
    pub search: SearchConfig,

    /// Weighted rewards used to order the timetables found.
    pub rewards: Vec<(RewardKind, f64)>,

    /// Search budget measured from the start of each [`Planner::plan`] call.
    pub time_limit: Option<Duration>,

    /// Split the search across rayon workers. Needs the `parallel` feature.
    pub parallel: bool,
}

impl PlanConfig {
    /// Conventional build rules (see [`BuildConfig::conventional`]) with
    /// default search settings and no rewards.
    pub fn conventional() -> Self {
        Self {
            build: BuildConfig::conventional(),
            ..Self::default()
        }
    }

    /// Sets the build configuration.
    pub fn with_build(mut self, build: BuildConfig) -> Self {
        self.build = build;
        self
    }

    /// Sets the search configuration.
    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    /// Sets the number of timetables to enumerate.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.search.limit = limit;
        self
    }

    /// Sets the per-call search budget.
    pub fn with_time_limit(mut self, budget: Duration) -> Self {
        self.time_limit = Some(budget);
        self
    }

    /// Adds a weighted reward.
    pub fn with_reward(mut self, kind: RewardKind, weight: f64) -> Self {
        self.rewards.push((kind, weight));
        self
    }

    /// Enables or disables parallel search.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Routes events from every stage to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn SolverObserver>) -> Self {
        self.build.observer = observer.clone();
        self.search.observer = observer;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.build.validate()?;
        self.search.validate()?;
        if self.parallel && !cfg!(feature = "parallel") {
            return Err("parallel search requires the `parallel` feature".into());
        }
        Ok(())
    }
}

/// Ranked timetables and how the search ended.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    /// Best first.
    pub ranked: Vec<RankedSolution>,
    pub stop: StopReason,
    /// Nodes expanded by the search.
    pub nodes: u64,
    /// Work done by arc consistency.
    pub ac_stats: AcStats,
}

impl PlanOutcome {
    /// The highest-scoring timetable.
    pub fn best(&self) -> Option<&RankedSolution> {
        self.ranked.first()
    }

    /// Whether the search stopped before exploring every branch, so better
    /// timetables may exist.
    pub fn is_truncated(&self) -> bool {
        self.stop != StopReason::Exhausted
    }

    /// Whether no clash-free timetable was found.
    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}

/// Runs the full pipeline.
///
/// # Examples
///
/// ```
/// use u_timetable::models::{Activity, ActivityType, Course, Weekday};
/// use u_timetable::planner::{PlanConfig, Planner};
/// use u_timetable::ranking::RewardKind;
///
/// let t = |s: &str| s.parse().unwrap();
/// let course = Course::new("COMP3506")
///     .with_activity(Activity::new("LEC1", "01", ActivityType::Lecture, Weekday::Tue, t("10:00"), t("12:00")))
///     .with_activity(Activity::new("TUT1", "01", ActivityType::Tutorial, Weekday::Wed, t("08:00"), t("09:00")))
///     .with_activity(Activity::new("TUT1", "02", ActivityType::Tutorial, Weekday::Wed, t("14:00"), t("15:00")));
///
/// let config = PlanConfig::default()
///     .with_reward(RewardKind::EarlyClassPenalty { threshold: t("09:00") }, 1.0);
/// let outcome = Planner::new(config).plan(&[course]).unwrap();
///
/// assert_eq!(outcome.ranked.len(), 2);
/// let best = outcome.best().unwrap();
/// assert_eq!(best.score, 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct Planner {
    config: PlanConfig,
}

impl Planner {
    pub fn new(config: PlanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    /// Builds, prunes, searches and ranks.
    ///
    /// Rewards and configuration are validated before any solving starts.
    ///
    /// # Errors
    /// - [`Error::Configuration`](crate::Error::Configuration) for bad input
    ///   or configuration
    /// - [`Error::InvalidReward`](crate::Error::InvalidReward) for a bad
    ///   reward or weight
    /// - [`Error::Infeasible`](crate::Error::Infeasible) when arc consistency
    ///   proves no timetable exists
    ///
    /// Finding no timetable during search is not an error.
    pub fn plan(&self, courses: &[Course]) -> Result<PlanOutcome> {
        self.config
            .validate()
            .map_err(ConfigurationError::InvalidConfig)?;
        let ranker = Ranker::from_kinds(&self.config.rewards);
        ranker.validate()?;

        let model = ModelBuilder::new(self.config.build.clone()).build(courses)?;
        let pruned = enforce_with_observer(&model, self.config.search.observer.as_ref())?;
        let ac_stats = pruned.stats();

        let outcome = self.search(&pruned);
        let ranked = ranker.rank(outcome.solutions)?;

        Ok(PlanOutcome {
            ranked,
            stop: outcome.stop,
            nodes: outcome.nodes,
            ac_stats,
        })
    }

    fn search_config(&self) -> SearchConfig {
        let mut config = self.config.search.clone();
        if let Some(budget) = self.config.time_limit {
            let deadline = Instant::now() + budget;
            config.deadline = Some(config.deadline.map_or(deadline, |d| d.min(deadline)));
        }
        config
    }

    #[cfg(feature = "parallel")]
    fn search(&self, pruned: &PrunedModel) -> SearchOutcome {
        if self.config.parallel {
            crate::csp::search_parallel(pruned, self.search_config())
        } else {
            Search::with_config(pruned, self.search_config()).run_to_end()
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn search(&self, pruned: &PrunedModel) -> SearchOutcome {
        Search::with_config(pruned, self.search_config()).run_to_end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csp::testing::{activity, course};
    use crate::csp::VariableId;
    use crate::error::{EmptyDomainError, Error, InvalidRewardSpec};
    use crate::models::{ClockTime, Weekday};
    use crate::observer::testing::RecordingObserver;
    use crate::observer::SolverEvent;

    fn t(s: &str) -> ClockTime {
        s.parse().unwrap()
    }

    fn courses() -> Vec<Course> {
        vec![
            course(
                "MATH1071",
                vec![
                    activity("LEC1", "01", Weekday::Mon, "10:00", "12:00"),
                    activity("TUT1", "01", Weekday::Tue, "08:00", "09:00"),
                    activity("TUT1", "02", Weekday::Tue, "13:00", "14:00"),
                ],
            ),
            course(
                "CSSE2010",
                vec![
                    activity("LEC1", "01", Weekday::Mon, "11:00", "12:00"),
                    activity("LEC1", "02", Weekday::Wed, "09:00", "10:00"),
                    activity("PRA1", "01", Weekday::Tue, "13:00", "15:00"),
                    activity("PRA1", "02", Weekday::Thu, "08:00", "10:00"),
                ],
            ),
        ]
    }

    #[test]
    fn test_plan_ranks_best_first() {
        let config = PlanConfig::default()
            .with_reward(RewardKind::EarlyClassPenalty { threshold: t("09:00") }, 1.0);
        let outcome = Planner::new(config).plan(&courses()).unwrap();

        // CSSE2010 LEC1/01 clashes with MATH1071 LEC1; TUT1/02 rules out PRA1/01.
        assert_eq!(outcome.ranked.len(), 3);
        assert!(!outcome.is_truncated());
        assert_eq!(outcome.ac_stats.removed, 1);

        let scores: Vec<f64> = outcome.ranked.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![-60.0, -60.0, -120.0]);
        let order: Vec<usize> = outcome.ranked.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![0, 2, 1]);

        let best = outcome.best().unwrap();
        let lecture = best
            .solution
            .session_for(&VariableId::new("CSSE2010", "LEC1"))
            .unwrap();
        assert_eq!(lecture.day, Weekday::Wed);
    }

    #[test]
    fn test_plan_attends_every_part_of_a_pair() {
        let courses = vec![
            course(
                "A",
                vec![
                    activity("PRA1", "01-P1", Weekday::Mon, "09:00", "10:00"),
                    activity("PRA1", "01-P2", Weekday::Wed, "09:00", "10:00"),
                    activity("PRA1", "02-P1", Weekday::Tue, "09:00", "10:00"),
                    activity("PRA1", "02-P2", Weekday::Thu, "09:00", "10:00"),
                ],
            ),
            course("B", vec![activity("LEC1", "01", Weekday::Wed, "09:00", "10:00")]),
        ];
        let outcome = Planner::new(PlanConfig::conventional()).plan(&courses).unwrap();

        assert_eq!(outcome.ranked.len(), 1);
        let best = &outcome.best().unwrap().solution;
        let part = |p: &str| best.session_for(&VariableId::part("A", "PRA1", p)).unwrap();
        assert_eq!(part("1").session_code, "02-P1");
        assert_eq!(part("2").session_code, "02-P2");
        assert_eq!(
            best.session_for(&VariableId::new("B", "LEC1")).unwrap().day,
            Weekday::Wed
        );
    }

    #[test]
    fn test_plan_infeasible() {
        let clash = vec![
            course("A", vec![activity("LEC1", "01", Weekday::Mon, "09:00", "10:00")]),
            course("B", vec![activity("LEC1", "01", Weekday::Mon, "09:30", "10:30")]),
        ];
        let err = Planner::new(PlanConfig::default()).plan(&clash).unwrap_err();
        assert!(matches!(
            err,
            Error::Infeasible(EmptyDomainError { .. })
        ));
    }

    #[test]
    fn test_rewards_checked_before_solving() {
        let config = PlanConfig::default()
            .with_reward(RewardKind::LongDayPenalty { max_hours: 8.0 }, f64::INFINITY);
        let err = Planner::new(config).plan(&[]).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidReward(InvalidRewardSpec::NonFiniteWeight { .. })
        ));
    }

    #[test]
    fn test_configuration_errors() {
        let err = Planner::new(PlanConfig::default()).plan(&[]).unwrap_err();
        assert_eq!(err, Error::Configuration(ConfigurationError::NoCourses));

        let err = Planner::new(PlanConfig::default().with_limit(0))
            .plan(&courses())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_limit_marks_truncation() {
        let outcome = Planner::new(PlanConfig::default().with_limit(1))
            .plan(&courses())
            .unwrap();
        assert_eq!(outcome.ranked.len(), 1);
        assert!(outcome.is_truncated());
    }

    #[test]
    fn test_zero_time_limit() {
        let outcome = Planner::new(PlanConfig::default().with_time_limit(Duration::ZERO))
            .plan(&courses())
            .unwrap();
        assert!(outcome.is_empty());
        assert_eq!(outcome.stop, StopReason::DeadlineExceeded);
    }

    #[test]
    fn test_observer_sees_every_stage() {
        let recorder = Arc::new(RecordingObserver::default());
        let config = PlanConfig::default().with_observer(recorder.clone());
        Planner::new(config).plan(&courses()).unwrap();

        let events = recorder.take();
        assert!(matches!(events.first(), Some(SolverEvent::ModelBuilt { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, SolverEvent::ArcConsistent { .. })));
        assert!(matches!(
            events.last(),
            Some(SolverEvent::SearchStopped {
                reason: StopReason::Exhausted,
                solutions: 3,
                ..
            })
        ));
    }

    #[cfg(not(feature = "parallel"))]
    #[test]
    fn test_parallel_requires_feature() {
        assert!(PlanConfig::default().with_parallel(true).validate().is_err());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_plan_matches_sequential() {
        let sequential = Planner::new(PlanConfig::default()).plan(&courses()).unwrap();
        let parallel = Planner::new(PlanConfig::default().with_parallel(true))
            .plan(&courses())
            .unwrap();
        assert_eq!(parallel.ranked, sequential.ranked);
    }
}
