//! Backtracking search over an arc-consistent model.
//!
//! Depth-first with forward checking. The recursion is unrolled into an
//! explicit stack of [`Frame`]s, one per decision, so that memory is bounded
//! by the number of variables and the limit, deadline and cancellation flag
//! can be checked between any two node expansions.
//!
//! # Reference
//! Haralick & Elliott (1980), "Increasing Tree Search Efficiency for
//! Constraint Satisfaction Problems"

use super::arc::PrunedModel;
use super::model::ConstraintModel;
use super::variables::{Domain, Session, VariableId};
use crate::models::Weekday;
use crate::observer::{default_observer, SolverEvent, SolverObserver};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::cmp::Reverse;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a search stopped producing solutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// Every branch was explored.
    Exhausted,
    /// `limit` solutions were produced and at least one more exists.
    LimitReached,
    /// The deadline passed.
    DeadlineExceeded,
    /// The cancellation flag was raised.
    Cancelled,
}

/// Order in which a variable's candidate values are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueOrder {
    /// The domain's own order (the builder's input order).
    #[default]
    Domain,
    /// Values that eliminate the fewest neighbour values first; ties keep
    /// domain order.
    LeastConstraining,
    /// A seeded shuffle. Spreads the first few solutions across the search
    /// space when only a handful are requested; reproducible per seed.
    Shuffled { seed: u64 },
}

/// Search configuration.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use u_timetable::csp::{SearchConfig, ValueOrder};
///
/// let config = SearchConfig::default()
///     .with_limit(20)
///     .with_time_limit(Duration::from_secs(2))
///     .with_value_order(ValueOrder::LeastConstraining);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct SearchConfig {
    /// Maximum number of solutions to produce.
    pub limit: usize,

    /// Wall-clock deadline. `None` runs until exhaustion or `limit`.
    pub deadline: Option<Instant>,

    /// Value ordering heuristic.
    pub value_order: ValueOrder,

    /// External cancellation flag, checked at every node.
    pub cancel: Option<Arc<AtomicBool>>,

    /// Event sink.
    pub observer: Arc<dyn SolverObserver>,
}

impl fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfig")
            .field("limit", &self.limit)
            .field("deadline", &self.deadline)
            .field("value_order", &self.value_order)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: 100,
            deadline: None,
            value_order: ValueOrder::Domain,
            cancel: None,
            observer: default_observer(),
        }
    }
}

impl SearchConfig {
    /// Sets the solution limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Sets an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the deadline to `budget` from now.
    pub fn with_time_limit(self, budget: Duration) -> Self {
        self.with_deadline(Instant::now() + budget)
    }

    /// Sets the value ordering heuristic.
    pub fn with_value_order(mut self, order: ValueOrder) -> Self {
        self.value_order = order;
        self
    }

    /// Sets the cancellation flag.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Sets the event sink.
    pub fn with_observer(mut self, observer: Arc<dyn SolverObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.limit == 0 {
            return Err("limit must be at least 1".into());
        }
        Ok(())
    }
}

/// One chosen session in a solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedSession {
    pub variable: VariableId,
    pub session: Session,
}

/// A complete, clash-free timetable. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    picks: Vec<SelectedSession>,
}

impl Solution {
    pub(crate) fn new(picks: Vec<SelectedSession>) -> Self {
        Self { picks }
    }

    /// Chosen sessions in variable order.
    pub fn picks(&self) -> &[SelectedSession] {
        &self.picks
    }

    pub fn len(&self) -> usize {
        self.picks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }

    /// The session chosen for `variable`.
    pub fn session_for(&self, variable: &VariableId) -> Option<&Session> {
        self.picks
            .iter()
            .find(|p| &p.variable == variable)
            .map(|p| &p.session)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Session> + '_ {
        self.picks.iter().map(|p| &p.session)
    }

    /// Clashable sessions on `day`, by start time. Non-clashable sessions
    /// occupy no time in the timetable.
    pub fn sessions_on(&self, day: Weekday) -> Vec<&Session> {
        let mut sessions: Vec<&Session> = self
            .sessions()
            .filter(|s| s.clashable && s.day == day)
            .collect();
        sessions.sort_by_key(|s| (s.start, s.end));
        sessions
    }
}

/// Everything a finished search produced.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub solutions: Vec<Solution>,
    pub stop: StopReason,
    /// Nodes expanded.
    pub nodes: u64,
}

impl SearchOutcome {
    /// Whether the search stopped before exploring every branch.
    pub fn is_truncated(&self) -> bool {
        self.stop != StopReason::Exhausted
    }

    /// Whether no timetable was found.
    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }
}

/// One decision point: a block of variables assigned together, the joint
/// options still to try, and the domains as they were before the decision.
struct Frame {
    block: Vec<usize>,
    options: Vec<Vec<usize>>,
    cursor: usize,
    domains: Vec<Domain>,
}

/// A lazy enumeration of solutions.
///
/// Created by [`search`] or [`Search::with_config`]; implements
/// [`Iterator`]. Not resumable after it stops: call [`search`] again on the
/// same model to start over.
pub struct Search {
    model: ConstraintModel,
    config: SearchConfig,
    stack: Vec<Frame>,
    assigned: Vec<Option<usize>>,
    started: bool,
    stop: Option<StopReason>,
    produced: usize,
    nodes: u64,
    rng: Option<StdRng>,
    /// Raised when sibling branches have already met the limit.
    halt: Option<Arc<AtomicBool>>,
}

impl Search {
    /// Starts a search over `model`.
    pub fn with_config(model: &PrunedModel, config: SearchConfig) -> Self {
        Self::over(model.model().clone(), config)
    }

    fn over(model: ConstraintModel, config: SearchConfig) -> Self {
        let rng = match config.value_order {
            ValueOrder::Shuffled { seed } => Some(StdRng::seed_from_u64(seed)),
            _ => None,
        };
        Self {
            assigned: vec![None; model.variable_count()],
            model,
            config,
            stack: Vec::new(),
            started: false,
            stop: None,
            produced: 0,
            nodes: 0,
            rng,
            halt: None,
        }
    }

    /// A search confined to one joint option of the first decision, stopped
    /// early when `halt` is raised.
    #[cfg_attr(not(feature = "parallel"), allow(dead_code))]
    pub(crate) fn restricted(
        model: ConstraintModel,
        config: SearchConfig,
        block: Vec<usize>,
        option: Vec<usize>,
        halt: Arc<AtomicBool>,
    ) -> Self {
        let domains = model.domains().to_vec();
        let mut search = Self::over(model, config);
        search.started = true;
        search.halt = Some(halt);
        search.stack.push(Frame {
            block,
            options: vec![option],
            cursor: 0,
            domains,
        });
        search
    }

    /// The first decision's block and its ordered joint options.
    #[cfg_attr(not(feature = "parallel"), allow(dead_code))]
    pub(crate) fn root_branches(&mut self) -> Option<(Vec<usize>, Vec<Vec<usize>>)> {
        let frame = self.next_frame(self.model.domains().to_vec())?;
        Some((frame.block, frame.options))
    }

    /// Why the search stopped, once it has.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop
    }

    /// Nodes expanded so far.
    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    /// Solutions produced so far.
    pub fn solutions_found(&self) -> usize {
        self.produced
    }

    /// Drains the search.
    pub fn run_to_end(mut self) -> SearchOutcome {
        let solutions: Vec<Solution> = self.by_ref().collect();
        SearchOutcome {
            solutions,
            stop: self.stop.unwrap_or(StopReason::Exhausted),
            nodes: self.nodes,
        }
    }

    fn should_stop(&self) -> Option<StopReason> {
        if let Some(halt) = &self.halt {
            if halt.load(Ordering::Relaxed) {
                return Some(StopReason::LimitReached);
            }
        }
        if let Some(flag) = &self.config.cancel {
            if flag.load(Ordering::Relaxed) {
                return Some(StopReason::Cancelled);
            }
        }
        match self.config.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(StopReason::DeadlineExceeded),
            _ => None,
        }
    }

    fn finish(&mut self, reason: StopReason) -> Option<Solution> {
        self.stop = Some(reason);
        self.stack.clear();
        self.config.observer.on_event(&SolverEvent::SearchStopped {
            reason,
            solutions: self.produced,
            nodes: self.nodes,
        });
        None
    }

    /// Assigns `choice` to `block` and forward-checks every unassigned
    /// neighbour. Returns false on a domain wipe-out.
    fn assign(&mut self, block: &[usize], choice: &[usize], domains: &mut [Domain]) -> bool {
        for (&var, &value) in block.iter().zip(choice) {
            domains[var] = Domain::single(value);
            self.assigned[var] = Some(value);
        }

        let model = &self.model;
        for (&var, &value) in block.iter().zip(choice) {
            for &(neighbor, c) in model.neighbors(var) {
                if self.assigned[neighbor].is_some() {
                    continue;
                }
                domains[neighbor].retain(|y| model.allows(c, var, value, neighbor, y));
                if domains[neighbor].is_empty() {
                    return false;
                }
            }
        }
        true
    }

    /// MRV, then degree, then insertion order.
    fn select_variable(&self, domains: &[Domain]) -> Option<usize> {
        (0..self.model.variable_count())
            .filter(|&v| self.assigned[v].is_none())
            .min_by_key(|&v| (domains[v].len(), Reverse(self.model.degree(v)), v))
    }

    fn next_frame(&mut self, domains: Vec<Domain>) -> Option<Frame> {
        let var = self.select_variable(&domains)?;
        let mut block = vec![var];
        if let Some(group) = self.model.group_of(var) {
            block.extend(
                group
                    .members
                    .iter()
                    .copied()
                    .filter(|&m| m != var && self.assigned[m].is_none()),
            );
        }
        let options = self.joint_options(&block, &domains);
        Some(Frame {
            block,
            options,
            cursor: 0,
            domains,
        })
    }

    /// Every consistent joint choice for `block`, in value order.
    ///
    /// A single variable's options are its domain values. For a group the
    /// head's value fixes the option stem; partners must hold parts of the
    /// same option and be pairwise consistent, otherwise the joint choice is
    /// rejected.
    fn joint_options(&mut self, block: &[usize], domains: &[Domain]) -> Vec<Vec<usize>> {
        let model = &self.model;
        let head = block[0];
        let partners = &block[1..];
        let mut options: Vec<Vec<usize>> = Vec::new();

        for x in domains[head].iter() {
            let stem = &model.session(head, x).pairing_stem;
            let candidates: Vec<Vec<usize>> = partners
                .iter()
                .map(|&p| {
                    domains[p]
                        .iter()
                        .filter(|&y| &model.session(p, y).pairing_stem == stem)
                        .filter(|&y| compatible(model, head, x, p, y))
                        .collect()
                })
                .collect();

            for rest in cartesian(&candidates) {
                let consistent = partners.iter().zip(&rest).enumerate().all(|(i, (&p, &y))| {
                    partners[i + 1..]
                        .iter()
                        .zip(&rest[i + 1..])
                        .all(|(&q, &z)| compatible(model, p, y, q, z))
                });
                if consistent {
                    let mut option = Vec::with_capacity(block.len());
                    option.push(x);
                    option.extend(rest);
                    options.push(option);
                }
            }
        }

        match self.config.value_order {
            ValueOrder::Domain => {}
            ValueOrder::LeastConstraining => {
                let assigned = &self.assigned;
                options.sort_by_cached_key(|option| {
                    eliminated(model, assigned, block, option, domains)
                });
            }
            ValueOrder::Shuffled { .. } => {
                if let Some(rng) = self.rng.as_mut() {
                    options.shuffle(rng);
                }
            }
        }
        options
    }

    fn solution(&self) -> Solution {
        let picks = self
            .assigned
            .iter()
            .enumerate()
            .filter_map(|(var, value)| {
                value.map(|x| SelectedSession {
                    variable: self.model.variable(var).id.clone(),
                    session: self.model.session(var, x).clone(),
                })
            })
            .collect();
        Solution::new(picks)
    }
}

impl Iterator for Search {
    type Item = Solution;

    fn next(&mut self) -> Option<Solution> {
        if self.stop.is_some() {
            return None;
        }
        if !self.started {
            self.started = true;
            let root = self.next_frame(self.model.domains().to_vec());
            match root {
                Some(frame) => self.stack.push(frame),
                None => return self.finish(StopReason::Exhausted),
            }
        }

        loop {
            if let Some(reason) = self.should_stop() {
                return self.finish(reason);
            }

            let Some(frame) = self.stack.last_mut() else {
                return self.finish(StopReason::Exhausted);
            };
            // Undo this frame's previous choice before trying the next one.
            for &var in &frame.block {
                self.assigned[var] = None;
            }
            if frame.cursor >= frame.options.len() {
                self.stack.pop();
                continue;
            }
            let block = frame.block.clone();
            let choice = frame.options[frame.cursor].clone();
            let mut domains = frame.domains.clone();
            frame.cursor += 1;
            self.nodes += 1;

            if !self.assign(&block, &choice, &mut domains) {
                continue;
            }

            if self.assigned.iter().all(Option::is_some) {
                // Once the limit is met the search only looks for one more
                // solution, to tell a cut-short search from an exhausted one.
                if self.produced >= self.config.limit {
                    return self.finish(StopReason::LimitReached);
                }
                self.produced += 1;
                self.config.observer.on_event(&SolverEvent::SolutionFound {
                    index: self.produced,
                    nodes: self.nodes,
                });
                return Some(self.solution());
            }

            if let Some(next) = self.next_frame(domains) {
                self.stack.push(next);
            }
        }
    }
}

fn compatible(model: &ConstraintModel, a: usize, x: usize, b: usize, y: usize) -> bool {
    model
        .constraint_between(a, b)
        .map_or(true, |c| model.allows(c, a, x, b, y))
}

/// Neighbour values a joint option would remove.
fn eliminated(
    model: &ConstraintModel,
    assigned: &[Option<usize>],
    block: &[usize],
    option: &[usize],
    domains: &[Domain],
) -> usize {
    block
        .iter()
        .zip(option)
        .map(|(&var, &value)| {
            model
                .neighbors(var)
                .iter()
                .filter(|(n, _)| assigned[*n].is_none() && !block.contains(n))
                .map(|&(n, c)| {
                    domains[n]
                        .iter()
                        .filter(|&y| !model.allows(c, var, value, n, y))
                        .count()
                })
                .sum::<usize>()
        })
        .sum()
}

/// All combinations picking one element from each list.
fn cartesian(lists: &[Vec<usize>]) -> Vec<Vec<usize>> {
    if lists.iter().any(Vec::is_empty) {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut idx = vec![0usize; lists.len()];
    loop {
        out.push(idx.iter().zip(lists).map(|(&i, l)| l[i]).collect());
        let mut k = lists.len();
        loop {
            if k == 0 {
                return out;
            }
            k -= 1;
            idx[k] += 1;
            if idx[k] < lists[k].len() {
                break;
            }
            idx[k] = 0;
        }
    }
}

/// Lazily enumerates up to `limit` solutions of `model` before `deadline`.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, Instant};
/// use u_timetable::csp::{build, enforce, search, PairingRule};
/// use u_timetable::models::{Activity, ActivityType, Course, Weekday};
///
/// let t = |s: &str| s.parse().unwrap();
/// let course = Course::new("MATH1071")
///     .with_activity(Activity::new("LEC1", "01", ActivityType::Lecture, Weekday::Mon, t("09:00"), t("10:00")))
///     .with_activity(Activity::new("TUT1", "01", ActivityType::Tutorial, Weekday::Mon, t("09:00"), t("10:00")))
///     .with_activity(Activity::new("TUT1", "02", ActivityType::Tutorial, Weekday::Mon, t("10:00"), t("11:00")));
///
/// let model = build(&[course], &Default::default(), &PairingRule::None).unwrap();
/// let pruned = enforce(&model).unwrap();
/// let timetables: Vec<_> = search(&pruned, 10, Instant::now() + Duration::from_secs(5)).collect();
/// assert_eq!(timetables.len(), 1);
/// ```
pub fn search(model: &PrunedModel, limit: usize, deadline: Instant) -> Search {
    Search::with_config(
        model,
        SearchConfig::default().with_limit(limit).with_deadline(deadline),
    )
}
