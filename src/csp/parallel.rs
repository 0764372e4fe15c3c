//! Branch-parallel search.
//!
//! The first decision's joint options become independent subtrees, one per
//! rayon task. Workers stream their solutions over an mpsc channel to a
//! single collector, which orders them by (branch, sequence) so the result
//! does not depend on thread scheduling unless the limit cuts it short.

use super::arc::PrunedModel;
use super::search::{Search, SearchConfig, SearchOutcome, Solution, StopReason};
use crate::observer::{NoopObserver, SolverEvent};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

enum Message {
    Found {
        branch: usize,
        seq: usize,
        solution: Solution,
    },
    Finished {
        stop: StopReason,
        nodes: u64,
    },
}

/// Searches the first decision's branches in parallel.
///
/// With `limit` at least the total number of solutions, the result equals
/// [`Search::run_to_end`] with [`ValueOrder::Domain`](super::ValueOrder).
/// Under a smaller limit the kept solutions are the first `limit` in branch
/// order among those the workers found before stopping; the outcome reports
/// [`StopReason::LimitReached`] only once a solution past the limit is found.
pub fn search_parallel(model: &PrunedModel, config: SearchConfig) -> SearchOutcome {
    let mut root = Search::with_config(model, config.clone());
    let Some((block, options)) = root.root_branches() else {
        return root.run_to_end();
    };

    let worker_config = SearchConfig {
        observer: Arc::new(NoopObserver),
        ..config.clone()
    };
    let halt = Arc::new(AtomicBool::new(false));
    let found = Arc::new(AtomicUsize::new(0));
    let limit = config.limit;

    let (tx, rx) = mpsc::channel::<Message>();

    let (mut solutions, stops, nodes) = std::thread::scope(|scope| {
        scope.spawn(move || {
            options
                .into_par_iter()
                .enumerate()
                .for_each_with(tx, |tx, (branch, option)| {
                    let mut search = Search::restricted(
                        model.model().clone(),
                        worker_config.clone(),
                        block.clone(),
                        option,
                        halt.clone(),
                    );
                    let mut seq = 0;
                    for solution in search.by_ref() {
                        // One solution past the limit proves the result is cut short.
                        if found.fetch_add(1, Ordering::SeqCst) + 1 > limit {
                            halt.store(true, Ordering::SeqCst);
                        }
                        // The receiver outlives every worker.
                        let _ = tx.send(Message::Found {
                            branch,
                            seq,
                            solution,
                        });
                        seq += 1;
                    }
                    let _ = tx.send(Message::Finished {
                        stop: search.stop_reason().unwrap_or(StopReason::Exhausted),
                        nodes: search.nodes(),
                    });
                });
        });

        let mut solutions = Vec::new();
        let mut stops = Vec::new();
        let mut nodes = 0u64;
        for message in rx {
            match message {
                Message::Found {
                    branch,
                    seq,
                    solution,
                } => solutions.push((branch, seq, solution)),
                Message::Finished { stop, nodes: n } => {
                    stops.push(stop);
                    nodes += n;
                }
            }
        }
        (solutions, stops, nodes)
    });

    solutions.sort_by_key(|&(branch, seq, _)| (branch, seq));
    let overflow = solutions.len() > limit;
    solutions.truncate(limit);
    let solutions: Vec<Solution> = solutions.into_iter().map(|(_, _, s)| s).collect();

    let stop = combine(&stops, overflow);
    for index in 1..=solutions.len() {
        config
            .observer
            .on_event(&SolverEvent::SolutionFound { index, nodes });
    }
    config.observer.on_event(&SolverEvent::SearchStopped {
        reason: stop,
        solutions: solutions.len(),
        nodes,
    });

    SearchOutcome {
        solutions,
        stop,
        nodes,
    }
}

/// Cancelled over deadline over limit over exhausted.
fn combine(stops: &[StopReason], overflow: bool) -> StopReason {
    let any = |reason: StopReason| stops.contains(&reason);
    if any(StopReason::Cancelled) {
        StopReason::Cancelled
    } else if any(StopReason::DeadlineExceeded) {
        StopReason::DeadlineExceeded
    } else if overflow || any(StopReason::LimitReached) {
        StopReason::LimitReached
    } else {
        StopReason::Exhausted
    }
}
