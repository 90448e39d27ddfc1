//! Compiled filters.
//!
//! A rule compiles into one [`Filter`] tree. Leaves are either per-node
//! [`Predicate`]s, decided from the node itself, or id sets computed once
//! from the store (tag membership, descendants, parents). Evaluation then
//! makes a single pass over the owner's nodes.

use std::collections::HashSet;

use tasktree_model::{Node, NodeId, NodeType, TaskPriority, TaskStatus};

use crate::dates::{DateField, DateTest};

/// A test decided from a single node.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Node type is (or, negated, is not) one of the listed types.
    NodeType { types: Vec<NodeType>, negate: bool },
    /// Parent id is one of the listed ids.
    ParentIn(HashSet<NodeId>),
    /// Title contains this lowercased needle, ignoring case.
    TitleContains(String),
    /// Title is exactly this string.
    TitleEquals(String),
    /// A task whose status is (or, negated, is not) in the set.
    Status {
        statuses: Vec<TaskStatus>,
        negate: bool,
    },
    /// A task whose priority is (or, negated, is not) in the set.
    Priority {
        priorities: Vec<TaskPriority>,
        negate: bool,
    },
    /// A task whose date passes the test.
    Date { field: DateField, test: DateTest },
}

impl Predicate {
    pub fn matches(&self, node: &Node) -> bool {
        match self {
            Predicate::NodeType { types, negate } => types.contains(&node.node_type()) != *negate,
            Predicate::ParentIn(parents) => node.parent_id.is_some_and(|p| parents.contains(&p)),
            Predicate::TitleContains(needle) => node.title.to_lowercase().contains(needle.as_str()),
            Predicate::TitleEquals(title) => node.title == *title,
            Predicate::Status { statuses, negate } => node
                .task()
                .is_some_and(|task| statuses.contains(&task.status) != *negate),
            Predicate::Priority { priorities, negate } => node
                .task()
                .is_some_and(|task| priorities.contains(&task.priority) != *negate),
            Predicate::Date { field, test } => node
                .task()
                .is_some_and(|task| test.matches(field.read(task))),
        }
    }
}

/// A compiled rule or rule fragment.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Matches no node.
    Nothing,
    /// Matches nodes whose id is in the set.
    Ids(HashSet<NodeId>),
    /// Matches nodes whose id is not in the set.
    NotIds(HashSet<NodeId>),
    Predicate(Predicate),
    /// Every part must match. An empty list matches everything.
    All(Vec<Filter>),
    /// At least one part must match. An empty list matches nothing.
    Any(Vec<Filter>),
}

impl Filter {
    pub fn matches(&self, node: &Node) -> bool {
        match self {
            Filter::Nothing => false,
            Filter::Ids(ids) => ids.contains(&node.id),
            Filter::NotIds(ids) => !ids.contains(&node.id),
            Filter::Predicate(predicate) => predicate.matches(node),
            Filter::All(parts) => parts.iter().all(|part| part.matches(node)),
            Filter::Any(parts) => parts.iter().any(|part| part.matches(node)),
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Filter::Nothing)
    }
}

impl From<Predicate> for Filter {
    fn from(predicate: Predicate) -> Self {
        Filter::Predicate(predicate)
    }
}
