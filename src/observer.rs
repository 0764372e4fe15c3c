//! Solver progress events and the sinks that receive them.
//!
//! The solver never logs directly. Every stage takes an
//! `Arc<dyn SolverObserver>` and reports [`SolverEvent`]s to it; the default
//! [`LogObserver`] forwards them to the `log` facade, so output only appears
//! when the host application installs a logger.

use crate::csp::{StopReason, VariableId};
use log::{debug, info, trace, warn};
use std::sync::Arc;

/// Why the builder left a session out of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The session is not open for selection.
    Closed,
    /// It belongs to a paired option that is missing a part, or carries no
    /// part marker in a group whose other sessions do.
    IncompletePair,
}

/// Something worth knowing happened inside the solver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverEvent {
    ModelBuilt {
        variables: usize,
        constraints: usize,
        groups: usize,
    },
    SessionSkipped {
        variable: VariableId,
        session: String,
        reason: SkipReason,
    },
    DomainRevised {
        variable: VariableId,
        removed: usize,
        remaining: usize,
    },
    ArcConsistent {
        revisions: usize,
        removed: usize,
    },
    DomainWipeout {
        variable: VariableId,
    },
    SolutionFound {
        index: usize,
        nodes: u64,
    },
    SearchStopped {
        reason: StopReason,
        solutions: usize,
        nodes: u64,
    },
}

/// Receives solver events.
///
/// Implementations must be cheap: events are emitted from inside the AC-3
/// and search loops.
pub trait SolverObserver: Send + Sync {
    fn on_event(&self, event: &SolverEvent);
}

/// Forwards events to the `log` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl SolverObserver for LogObserver {
    fn on_event(&self, event: &SolverEvent) {
        match event {
            SolverEvent::ModelBuilt {
                variables,
                constraints,
                groups,
            } => info!(
                "Built timetable model with {variables} variables, {constraints} binary constraints and {groups} groups"
            ),
            SolverEvent::SessionSkipped {
                variable,
                session,
                reason,
            } => match reason {
                SkipReason::Closed => debug!("Skipping closed session {session} of {variable}"),
                SkipReason::IncompletePair => {
                    warn!("Session {session} of {variable} is not part of a complete pair; dropping it")
                }
            },
            SolverEvent::DomainRevised {
                variable,
                removed,
                remaining,
            } => trace!("Revised {variable}: removed {removed}, {remaining} left"),
            SolverEvent::ArcConsistent { revisions, removed } => {
                debug!("Arc consistency reached after {revisions} revisions ({removed} values pruned)")
            }
            SolverEvent::DomainWipeout { variable } => {
                info!("Domain of {variable} wiped out; no feasible timetable")
            }
            SolverEvent::SolutionFound { index, nodes } => {
                trace!("Solution #{index} found after {nodes} nodes")
            }
            SolverEvent::SearchStopped {
                reason,
                solutions,
                nodes,
            } => info!("Search stopped ({reason:?}) with {solutions} solutions after {nodes} nodes"),
        }
    }
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SolverObserver for NoopObserver {
    fn on_event(&self, _event: &SolverEvent) {}
}

/// The observer used when none is configured.
pub fn default_observer() -> Arc<dyn SolverObserver> {
    Arc::new(LogObserver)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Collects every event for assertions.
    #[derive(Default)]
    pub(crate) struct RecordingObserver {
        pub(crate) events: Mutex<Vec<SolverEvent>>,
    }

    impl RecordingObserver {
        pub(crate) fn take(&self) -> Vec<SolverEvent> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }
    }

    impl SolverObserver for RecordingObserver {
        fn on_event(&self, event: &SolverEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }
}
