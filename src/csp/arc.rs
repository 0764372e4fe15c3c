//! AC-3 arc consistency.
//!
//! Prunes every domain until each remaining value has a supporting value in
//! every constrained neighbour. Group constraints are left to the search:
//! pruning them pairwise would discard valid joint choices.
//!
//! # Reference
//! Mackworth (1977), "Consistency in Networks of Relations"

use super::model::ConstraintModel;
use super::variables::Domain;
use crate::error::EmptyDomainError;
use crate::observer::{LogObserver, SolverEvent, SolverObserver};
use std::collections::VecDeque;
use std::ops::Deref;

/// Work done by one arc-consistency pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcStats {
    /// Arcs revised.
    pub revisions: usize,
    /// Values removed across all domains.
    pub removed: usize,
}

/// An arc-consistent model, ready for search.
///
/// Dereferences to the underlying [`ConstraintModel`].
#[derive(Debug, Clone)]
pub struct PrunedModel {
    model: ConstraintModel,
    stats: AcStats,
}

impl PrunedModel {
    pub fn model(&self) -> &ConstraintModel {
        &self.model
    }

    pub fn into_model(self) -> ConstraintModel {
        self.model
    }

    /// Statistics of the pass that produced this model.
    pub fn stats(&self) -> AcStats {
        self.stats
    }
}

impl Deref for PrunedModel {
    type Target = ConstraintModel;

    fn deref(&self) -> &ConstraintModel {
        &self.model
    }
}

/// Enforces arc consistency, reporting to the `log` facade.
///
/// The input model is not modified; the pruned domains live in the
/// returned model, so the pass can be re-applied or tried speculatively.
///
/// # Errors
/// [`EmptyDomainError`] naming the first variable whose domain is wiped out.
pub fn enforce(model: &ConstraintModel) -> Result<PrunedModel, EmptyDomainError> {
    enforce_with_observer(model, &LogObserver)
}

/// Enforces arc consistency, reporting to `observer`.
pub fn enforce_with_observer(
    model: &ConstraintModel,
    observer: &dyn SolverObserver,
) -> Result<PrunedModel, EmptyDomainError> {
    let mut domains: Vec<Domain> = model.domains().to_vec();

    if let Some(var) = domains.iter().position(Domain::is_empty) {
        return Err(wipeout(model, var, observer));
    }

    // Arc 2c runs first -> second of constraint c, arc 2c + 1 the reverse.
    let arc_count = model.constraint_count() * 2;
    let mut queue: VecDeque<usize> = (0..arc_count).collect();
    let mut queued = vec![true; arc_count];
    let mut stats = AcStats::default();

    while let Some(arc) = queue.pop_front() {
        queued[arc] = false;
        let (var, other, c) = endpoints(model, arc);
        stats.revisions += 1;

        let removed = revise(model, &mut domains, var, other, c);
        if removed == 0 {
            continue;
        }
        stats.removed += removed;
        observer.on_event(&SolverEvent::DomainRevised {
            variable: model.variable(var).id.clone(),
            removed,
            remaining: domains[var].len(),
        });

        if domains[var].is_empty() {
            return Err(wipeout(model, var, observer));
        }

        for &(neighbor, nc) in model.neighbors(var) {
            if neighbor == other {
                continue;
            }
            let incoming = arc_toward(model, nc, var);
            if !queued[incoming] {
                queued[incoming] = true;
                queue.push_back(incoming);
            }
        }
    }

    observer.on_event(&SolverEvent::ArcConsistent {
        revisions: stats.revisions,
        removed: stats.removed,
    });

    Ok(PrunedModel {
        model: model.with_domains(domains),
        stats,
    })
}

/// Whether every value of every domain has support across every constraint.
pub fn is_arc_consistent(model: &ConstraintModel) -> bool {
    (0..model.constraint_count() * 2).all(|arc| {
        let (var, other, c) = endpoints(model, arc);
        model.domain(var).iter().all(|x| has_support(model, model.domain(other), var, x, other, c))
    })
}

fn endpoints(model: &ConstraintModel, arc: usize) -> (usize, usize, usize) {
    let c = arc / 2;
    let constraint = model.constraint(c);
    if arc % 2 == 0 {
        (constraint.first, constraint.second, c)
    } else {
        (constraint.second, constraint.first, c)
    }
}

/// The arc of constraint `c` whose head is `head`.
fn arc_toward(model: &ConstraintModel, c: usize, head: usize) -> usize {
    if model.constraint(c).second == head {
        2 * c
    } else {
        2 * c + 1
    }
}

fn has_support(
    model: &ConstraintModel,
    other_domain: &Domain,
    var: usize,
    x: usize,
    other: usize,
    c: usize,
) -> bool {
    other_domain.iter().any(|y| model.allows(c, var, x, other, y))
}

/// Drops values of `var` without support in `other`; returns how many.
fn revise(
    model: &ConstraintModel,
    domains: &mut [Domain],
    var: usize,
    other: usize,
    c: usize,
) -> usize {
    let supported: Domain = domains[var]
        .iter()
        .filter(|&x| has_support(model, &domains[other], var, x, other, c))
        .collect();
    let removed = domains[var].len() - supported.len();
    if removed > 0 {
        domains[var] = supported;
    }
    removed
}

fn wipeout(model: &ConstraintModel, var: usize, observer: &dyn SolverObserver) -> EmptyDomainError {
    let variable = model.variable(var).id.clone();
    observer.on_event(&SolverEvent::DomainWipeout {
        variable: variable.clone(),
    });
    EmptyDomainError { variable }
}
