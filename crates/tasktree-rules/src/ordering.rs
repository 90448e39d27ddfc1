//! Ordering of evaluation results.
//!
//! Provides [`Dir`] for sort direction, [`SortField`] for the node fields
//! results can be sorted on and [`OrderBy`] to pair them. Orderings are
//! applied as a list: the first is the primary key, later ones break ties.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tasktree_model::{Node, TaskPriority};

use crate::error::InvalidOrder;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dir {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

impl Dir {
    /// Applies this direction to an ordering.
    ///
    /// For `Asc`, returns the ordering unchanged.
    /// For `Desc`, reverses the ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Dir::Asc => ordering,
            Dir::Desc => ordering.reverse(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dir::Asc => "asc",
            Dir::Desc => "desc",
        }
    }
}

impl fmt::Display for Dir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node field results can be sorted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    SortOrder,
    Title,
    CreatedAt,
    UpdatedAt,
    /// Task due date; nodes without one sort last.
    DueAt,
    /// Task priority, low to urgent; non-tasks sort last.
    Priority,
}

impl SortField {
    pub const ALL: [SortField; 6] = [
        SortField::SortOrder,
        SortField::Title,
        SortField::CreatedAt,
        SortField::UpdatedAt,
        SortField::DueAt,
        SortField::Priority,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortField::SortOrder => "sort_order",
            SortField::Title => "title",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::DueAt => "due_at",
            SortField::Priority => "priority",
        }
    }

    /// Compares two nodes on this field, ascending.
    pub fn compare(self, a: &Node, b: &Node) -> Ordering {
        match self {
            SortField::SortOrder => a.sort_order.cmp(&b.sort_order),
            SortField::Title => a.title.cmp(&b.title),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::DueAt => none_last(
                a.task().and_then(|t| t.due_at),
                b.task().and_then(|t| t.due_at),
            ),
            SortField::Priority => none_last(
                a.task().map(|t| priority_rank(t.priority)),
                b.task().map(|t| priority_rank(t.priority)),
            ),
        }
    }
}

fn priority_rank(priority: TaskPriority) -> usize {
    TaskPriority::ALL
        .iter()
        .position(|p| *p == priority)
        .unwrap_or(TaskPriority::ALL.len())
}

fn none_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
    }
}

/// A single ordering clause specifying a field and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: SortField,
    #[serde(default)]
    pub dir: Dir,
}

impl OrderBy {
    pub fn asc(field: SortField) -> Self {
        OrderBy {
            field,
            dir: Dir::Asc,
        }
    }

    pub fn desc(field: SortField) -> Self {
        OrderBy {
            field,
            dir: Dir::Desc,
        }
    }

    pub fn compare(&self, a: &Node, b: &Node) -> Ordering {
        self.dir.apply(self.field.compare(a, b))
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field.as_str(), self.dir)
    }
}

/// Parses `field` or `field:asc|desc`.
impl FromStr for OrderBy {
    type Err = InvalidOrder;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidOrder(s.to_string());
        let (field, dir) = match s.split_once(':') {
            Some((field, dir)) => (field, dir),
            None => (s, "asc"),
        };
        let field = SortField::ALL
            .into_iter()
            .find(|f| f.as_str() == field.trim())
            .ok_or_else(invalid)?;
        let dir = match dir.trim() {
            "asc" => Dir::Asc,
            "desc" => Dir::Desc,
            _ => return Err(invalid()),
        };
        Ok(OrderBy { field, dir })
    }
}

/// The default result order: manual order, then title, then age.
pub fn default_order() -> Vec<OrderBy> {
    vec![
        OrderBy::asc(SortField::SortOrder),
        OrderBy::asc(SortField::Title),
        OrderBy::asc(SortField::CreatedAt),
    ]
}

/// Compares two nodes using a list of ordering clauses.
///
/// Ties left after every clause are broken by id so results are stable
/// across runs.
pub fn compare_by_orderings(a: &Node, b: &Node, orderings: &[OrderBy]) -> Ordering {
    orderings
        .iter()
        .map(|order_by| order_by.compare(a, b))
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or_else(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tasktree_model::{NodeFacet, TaskFacet};
    use uuid::Uuid;

    fn node(title: &str, sort_order: i32) -> Node {
        Node::new(Uuid::new_v4(), Uuid::nil(), title, NodeFacet::Folder).with_sort_order(sort_order)
    }

    fn task(title: &str, priority: TaskPriority, due_day: Option<u32>) -> Node {
        let mut facet = TaskFacet::default().with_priority(priority);
        facet.due_at = due_day.map(|d| Utc.with_ymd_and_hms(2024, 6, d, 0, 0, 0).unwrap());
        Node::new(Uuid::new_v4(), Uuid::nil(), title, NodeFacet::Task(facet))
    }

    #[test]
    fn dir_apply() {
        assert_eq!(Dir::Asc.apply(Ordering::Less), Ordering::Less);
        assert_eq!(Dir::Desc.apply(Ordering::Less), Ordering::Greater);
        assert_eq!(Dir::Desc.apply(Ordering::Equal), Ordering::Equal);
    }

    #[test]
    fn default_order_is_sort_order_then_title() {
        let mut nodes = vec![node("b", 1), node("a", 1), node("z", 0)];
        nodes.sort_by(|a, b| compare_by_orderings(a, b, &default_order()));
        let titles: Vec<_> = nodes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["z", "a", "b"]);
    }

    #[test]
    fn missing_due_dates_sort_last() {
        let mut nodes = vec![
            task("none", TaskPriority::Low, None),
            task("late", TaskPriority::Low, Some(20)),
            task("early", TaskPriority::Low, Some(3)),
            node("folder", 0),
        ];
        nodes.sort_by(|a, b| compare_by_orderings(a, b, &[OrderBy::asc(SortField::DueAt)]));
        assert_eq!(nodes[0].title, "early");
        assert_eq!(nodes[1].title, "late");
    }

    #[test]
    fn priority_desc_puts_urgent_first() {
        let mut nodes = vec![
            task("low", TaskPriority::Low, None),
            task("urgent", TaskPriority::Urgent, None),
            task("medium", TaskPriority::Medium, None),
        ];
        nodes.sort_by(|a, b| compare_by_orderings(a, b, &[OrderBy::desc(SortField::Priority)]));
        let titles: Vec<_> = nodes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["urgent", "medium", "low"]);
    }

    #[test]
    fn full_ties_fall_back_to_id() {
        let a = node("same", 0);
        let b = node("same", 0);
        let expected = a.id.cmp(&b.id);
        let mut b = b;
        b.created_at = a.created_at;
        assert_eq!(compare_by_orderings(&a, &b, &default_order()), expected);
    }

    #[test]
    fn parse_order_by() {
        assert_eq!("title".parse::<OrderBy>().unwrap(), OrderBy::asc(SortField::Title));
        assert_eq!(
            "due_at:desc".parse::<OrderBy>().unwrap(),
            OrderBy::desc(SortField::DueAt)
        );
        assert!("colour".parse::<OrderBy>().is_err());
        assert!("title:sideways".parse::<OrderBy>().is_err());
        assert_eq!(OrderBy::desc(SortField::Priority).to_string(), "priority:desc");
    }

    #[test]
    fn order_by_deserializes_with_default_dir() {
        let order: OrderBy = serde_json::from_str(r#"{"field": "updated_at"}"#).unwrap();
        assert_eq!(order, OrderBy::asc(SortField::UpdatedAt));
    }
}
