//! Constraint model definition.

use super::variables::{Domain, Session, Variable, VariableId};
use std::collections::HashMap;
use std::sync::Arc;

/// The relation a binary constraint enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryRule {
    /// The two chosen sessions must not overlap in time.
    NoOverlap,
}

/// A constraint over exactly two variables.
///
/// Undirected; the arc-consistency engine processes it as two arcs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryConstraint {
    pub first: usize,
    pub second: usize,
    pub rule: BinaryRule,
}

impl BinaryConstraint {
    /// Creates a no-overlap constraint between two variables.
    pub fn no_overlap(first: usize, second: usize) -> Self {
        Self {
            first,
            second,
            rule: BinaryRule::NoOverlap,
        }
    }

    /// Whether `a` (for `first`) and `b` (for `second`) are jointly acceptable.
    pub fn allows(&self, a: &Session, b: &Session) -> bool {
        match self.rule {
            BinaryRule::NoOverlap => !a.overlaps(b),
        }
    }

    /// The variable on the other end of the constraint.
    pub fn other(&self, var: usize) -> usize {
        if var == self.first {
            self.second
        } else {
            self.first
        }
    }
}

/// The part variables of one paired activity group, chosen jointly.
///
/// A joint choice is acceptable when every member's session belongs to the
/// same option (equal pairing stems).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupConstraint {
    pub course_id: String,
    pub members: Vec<usize>,
}

impl GroupConstraint {
    /// Whether the members' sessions form an acceptable joint choice.
    pub fn allows<'a, I>(&self, sessions: I) -> bool
    where
        I: IntoIterator<Item = &'a Session>,
    {
        let mut iter = sessions.into_iter();
        match iter.next() {
            Some(first) => iter.all(|s| s.pairing_stem == first.pairing_stem),
            None => true,
        }
    }

    pub fn contains(&self, var: usize) -> bool {
        self.members.contains(&var)
    }
}

/// Structure shared by every copy of a model; only domains differ between
/// the builder's model, the pruned model and search branches.
#[derive(Debug)]
struct Structure {
    variables: Vec<Variable>,
    constraints: Vec<BinaryConstraint>,
    groups: Vec<GroupConstraint>,
    /// Per variable: `(neighbour, constraint index)`.
    neighbors: Vec<Vec<(usize, usize)>>,
    group_of: Vec<Option<usize>>,
    index: HashMap<VariableId, usize>,
}

/// A timetable CSP: variables, their current domains, binary and group
/// constraints.
///
/// Cloning is cheap: the variables and constraints are shared, only the
/// domains are copied.
///
/// # Examples
///
/// ```
/// use u_timetable::csp::{BinaryConstraint, ConstraintModel, Variable, VariableId};
///
/// let a = Variable::new(VariableId::new("C1", "LEC1"), vec![]);
/// let b = Variable::new(VariableId::new("C1", "TUT1"), vec![]);
/// let model = ConstraintModel::new(vec![a, b], vec![BinaryConstraint::no_overlap(0, 1)], vec![])
///     .unwrap();
/// assert_eq!(model.constraint_count(), 1);
/// assert_eq!(model.degree(0), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ConstraintModel {
    structure: Arc<Structure>,
    domains: Vec<Domain>,
}

impl ConstraintModel {
    /// Creates a model whose domains hold every candidate value.
    ///
    /// Fails with a description when a constraint references an unknown
    /// variable, links a variable to itself, or a variable belongs to more
    /// than one group.
    pub fn new(
        variables: Vec<Variable>,
        constraints: Vec<BinaryConstraint>,
        groups: Vec<GroupConstraint>,
    ) -> Result<Self, String> {
        let n = variables.len();
        let mut index = HashMap::with_capacity(n);
        for (i, var) in variables.iter().enumerate() {
            if index.insert(var.id.clone(), i).is_some() {
                return Err(format!("duplicate variable: {}", var.id));
            }
        }

        let mut neighbors = vec![Vec::new(); n];
        for (c, constraint) in constraints.iter().enumerate() {
            if constraint.first >= n || constraint.second >= n {
                return Err(format!("constraint {c} references an undefined variable"));
            }
            if constraint.first == constraint.second {
                return Err(format!("constraint {c} links a variable to itself"));
            }
            neighbors[constraint.first].push((constraint.second, c));
            neighbors[constraint.second].push((constraint.first, c));
        }

        let mut group_of = vec![None; n];
        for (g, group) in groups.iter().enumerate() {
            if group.members.is_empty() {
                return Err(format!("group {g} has no members"));
            }
            for &m in &group.members {
                if m >= n {
                    return Err(format!("group {g} references an undefined variable"));
                }
                if group_of[m].replace(g).is_some() {
                    return Err(format!("variable {} belongs to two groups", variables[m].id));
                }
            }
        }

        let domains = variables.iter().map(|v| Domain::full(v.values.len())).collect();

        Ok(Self {
            structure: Arc::new(Structure {
                variables,
                constraints,
                groups,
                neighbors,
                group_of,
                index,
            }),
            domains,
        })
    }

    /// Same structure, different domains.
    pub(crate) fn with_domains(&self, domains: Vec<Domain>) -> Self {
        debug_assert_eq!(domains.len(), self.domains.len());
        Self {
            structure: Arc::clone(&self.structure),
            domains,
        }
    }

    pub fn variable_count(&self) -> usize {
        self.structure.variables.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.structure.constraints.len()
    }

    pub fn group_count(&self) -> usize {
        self.structure.groups.len()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.structure.variables
    }

    pub fn variable(&self, var: usize) -> &Variable {
        &self.structure.variables[var]
    }

    /// Index of the variable with the given id.
    pub fn index_of(&self, id: &VariableId) -> Option<usize> {
        self.structure.index.get(id).copied()
    }

    pub fn constraints(&self) -> &[BinaryConstraint] {
        &self.structure.constraints
    }

    pub fn constraint(&self, c: usize) -> &BinaryConstraint {
        &self.structure.constraints[c]
    }

    pub fn groups(&self) -> &[GroupConstraint] {
        &self.structure.groups
    }

    /// The group `var` belongs to, if any.
    pub fn group_of(&self, var: usize) -> Option<&GroupConstraint> {
        self.structure.group_of[var].map(|g| &self.structure.groups[g])
    }

    /// `(neighbour, constraint index)` pairs touching `var`.
    pub fn neighbors(&self, var: usize) -> &[(usize, usize)] {
        &self.structure.neighbors[var]
    }

    /// Number of binary constraints touching `var`.
    pub fn degree(&self, var: usize) -> usize {
        self.structure.neighbors[var].len()
    }

    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }

    pub fn domain(&self, var: usize) -> &Domain {
        &self.domains[var]
    }

    /// The session behind value index `value` of `var`.
    pub fn session(&self, var: usize, value: usize) -> &Session {
        &self.structure.variables[var].values[value]
    }

    /// Sessions currently in the domain of `var`.
    pub fn domain_sessions(&self, var: usize) -> impl Iterator<Item = &Session> + '_ {
        self.domains[var].iter().map(move |v| self.session(var, v))
    }

    /// Whether value `x` of `var` and value `y` of `other` satisfy
    /// constraint `c`, which must link the two.
    pub fn allows(&self, c: usize, var: usize, x: usize, other: usize, y: usize) -> bool {
        let constraint = &self.structure.constraints[c];
        let (a, b) = (self.session(var, x), self.session(other, y));
        if constraint.first == var {
            constraint.allows(a, b)
        } else {
            constraint.allows(b, a)
        }
    }

    /// Constraint index linking two variables, if any.
    pub fn constraint_between(&self, a: usize, b: usize) -> Option<usize> {
        self.structure.neighbors[a]
            .iter()
            .find(|&&(n, _)| n == b)
            .map(|&(_, c)| c)
    }

    /// Whether any domain is empty.
    pub fn has_empty_domain(&self) -> bool {
        self.domains.iter().any(Domain::is_empty)
    }

    /// Product of domain sizes, saturating; an upper bound on the number of
    /// complete assignments.
    pub fn search_space(&self) -> u128 {
        self.domains
            .iter()
            .fold(1u128, |acc, d| acc.saturating_mul(d.len() as u128))
    }
}
