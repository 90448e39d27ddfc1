//! One evaluator per condition type.
//!
//! Each evaluator turns `(operator, values)` into a [`Filter`] fragment, or
//! `None` when the condition contributes nothing: an operator the type does
//! not understand, a missing value, or a value that does not parse. Only
//! store failures are errors. `saved_filter` recurses into other rules and
//! lives with the compiler.

use std::collections::HashSet;
use std::str::FromStr;

use tasktree_model::{NodeId, NodeStore, NodeType, Result, TaskPriority, TaskStatus, UserId};
use uuid::Uuid;

use crate::dates::{Calendar, DateField};
use crate::filter::{Filter, Predicate};
use crate::op::Operator;

/// Contribution of one condition; `None` means "no contribution".
pub type Fragment = Option<Filter>;

pub fn node_type(op: Operator, values: &[String]) -> Fragment {
    // Unknown type names match no node, so `equals` on one matches nothing
    // and `not_equals` matches everything.
    let known = |raw: &[String]| -> Vec<NodeType> {
        raw.iter().filter_map(|v| v.parse().ok()).collect()
    };
    let first = values.first()?;
    let predicate = match op {
        Operator::Equals => Predicate::NodeType {
            types: known(std::slice::from_ref(first)),
            negate: false,
        },
        Operator::NotEquals => Predicate::NodeType {
            types: known(std::slice::from_ref(first)),
            negate: true,
        },
        Operator::In => Predicate::NodeType {
            types: known(values),
            negate: false,
        },
        _ => return None,
    };
    Some(predicate.into())
}

pub fn tag_contains<S>(store: &S, op: Operator, values: &[String]) -> Result<Fragment>
where
    S: NodeStore + ?Sized,
{
    let Some(tags) = parse_ids(values) else {
        return Ok(None);
    };
    let filter = match op {
        Operator::Any => {
            let mut ids = HashSet::new();
            for tag in tags {
                ids.extend(store.list_node_ids_by_tag(tag)?);
            }
            Filter::Ids(ids)
        }
        Operator::All => {
            let mut ids: Option<HashSet<NodeId>> = None;
            for tag in tags {
                let tagged: HashSet<NodeId> = store.list_node_ids_by_tag(tag)?.into_iter().collect();
                ids = Some(match ids {
                    None => tagged,
                    Some(acc) => acc.intersection(&tagged).copied().collect(),
                });
            }
            Filter::Ids(ids.unwrap_or_default())
        }
        _ => return Ok(None),
    };
    Ok(Some(filter))
}

pub fn parent_node(op: Operator, values: &[String]) -> Fragment {
    let parents = match op {
        Operator::Equals => parse_ids(values.get(..1)?)?,
        Operator::In => parse_ids(values)?,
        _ => return None,
    };
    Some(Predicate::ParentIn(parents.into_iter().collect()).into())
}

pub fn parent_ancestor<S>(store: &S, op: Operator, values: &[String]) -> Result<Fragment>
where
    S: NodeStore + ?Sized,
{
    let ancestors = match op {
        Operator::Equals => values.get(..1).and_then(parse_ids),
        Operator::In => parse_ids(values),
        _ => None,
    };
    let Some(ancestors) = ancestors else {
        return Ok(None);
    };
    let mut ids = HashSet::new();
    for ancestor in ancestors {
        ids.extend(store.list_descendants(ancestor)?);
    }
    Ok(Some(Filter::Ids(ids)))
}

pub fn task_status(op: Operator, values: &[String]) -> Fragment {
    let (statuses, negate) = enum_set::<TaskStatus>(op, values)?;
    Some(Predicate::Status { statuses, negate }.into())
}

pub fn task_priority(op: Operator, values: &[String]) -> Fragment {
    let (priorities, negate) = enum_set::<TaskPriority>(op, values)?;
    Some(Predicate::Priority { priorities, negate }.into())
}

pub fn title_contains(op: Operator, values: &[String]) -> Fragment {
    let needle = values.first()?;
    match op {
        Operator::Contains => Some(Predicate::TitleContains(needle.to_lowercase()).into()),
        Operator::Equals => Some(Predicate::TitleEquals(needle.clone()).into()),
        _ => None,
    }
}

pub fn has_children<S>(
    store: &S,
    owner: UserId,
    op: Operator,
    values: &[String],
) -> Result<Fragment>
where
    S: NodeStore + ?Sized,
{
    let (Operator::Equals, Some(flag)) = (op, values.first()) else {
        return Ok(None);
    };
    let parents = store.list_parent_ids(owner)?;
    Ok(Some(if is_truthy(flag) {
        Filter::Ids(parents)
    } else {
        Filter::NotIds(parents)
    }))
}

pub fn date(field: DateField, calendar: &Calendar, op: Operator, values: &[String]) -> Fragment {
    if op.is_overdue_op() && field != DateField::Due {
        return None;
    }
    let test = calendar.test(op, values)?;
    Some(Predicate::Date { field, test }.into())
}

fn is_truthy(flag: &str) -> bool {
    ["true", "1", "yes"]
        .iter()
        .any(|t| flag.trim().eq_ignore_ascii_case(t))
}

/// Parses every value as a uuid; a single bad value voids the lot.
fn parse_ids(values: &[String]) -> Option<Vec<Uuid>> {
    values.iter().map(|v| Uuid::parse_str(v.trim()).ok()).collect()
}

fn enum_set<T: FromStr>(op: Operator, values: &[String]) -> Option<(Vec<T>, bool)> {
    let parse = |raw: &[String]| -> Option<Vec<T>> {
        raw.iter().map(|v| v.parse().ok()).collect()
    };
    match op {
        Operator::Equals => Some((parse(values.get(..1)?)?, false)),
        Operator::In => Some((parse(values)?, false)),
        Operator::NotIn => Some((parse(values)?, true)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tasktree_model::{MemoryStore, Node, NodeFacet, NoteFacet, TaskFacet};

    fn values(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn note(owner: UserId, title: &str) -> Node {
        Node::new(Uuid::new_v4(), owner, title, NodeFacet::Note(NoteFacet::default()))
    }

    fn task(owner: UserId, status: TaskStatus) -> Node {
        Node::new(
            Uuid::new_v4(),
            owner,
            "task",
            NodeFacet::Task(TaskFacet::default().with_status(status)),
        )
    }

    // ========================================================================
    // Node-local evaluators
    // ========================================================================

    #[test]
    fn node_type_operators() {
        let owner = Uuid::new_v4();
        let n = note(owner, "n");
        let t = task(owner, TaskStatus::Todo);

        let eq = node_type(Operator::Equals, &values(&["note"])).unwrap();
        assert!(eq.matches(&n) && !eq.matches(&t));

        let ne = node_type(Operator::NotEquals, &values(&["note"])).unwrap();
        assert!(!ne.matches(&n) && ne.matches(&t));

        let any = node_type(Operator::In, &values(&["note", "task", "bogus"])).unwrap();
        assert!(any.matches(&n) && any.matches(&t));

        let unknown = node_type(Operator::Equals, &values(&["bogus"])).unwrap();
        assert!(!unknown.matches(&n));

        assert!(node_type(Operator::Contains, &values(&["note"])).is_none());
        assert!(node_type(Operator::Equals, &[]).is_none());
    }

    #[test]
    fn status_rejects_unknown_values() {
        assert!(task_status(Operator::In, &values(&["todo", "blocked"])).is_none());
        assert!(task_status(Operator::Any, &values(&["todo"])).is_none());

        let owner = Uuid::new_v4();
        let open = task_status(Operator::NotIn, &values(&["done", "dropped"])).unwrap();
        assert!(open.matches(&task(owner, TaskStatus::InProgress)));
        assert!(!open.matches(&task(owner, TaskStatus::Done)));
        assert!(!open.matches(&note(owner, "n")));
    }

    #[test]
    fn priority_equals_uses_first_value() {
        let owner = Uuid::new_v4();
        let urgent = Node::new(
            Uuid::new_v4(),
            owner,
            "u",
            NodeFacet::Task(TaskFacet::default().with_priority(TaskPriority::Urgent)),
        );
        let f = task_priority(Operator::Equals, &values(&["urgent", "low"])).unwrap();
        assert!(f.matches(&urgent));
        assert!(task_priority(Operator::Equals, &values(&["whenever"])).is_none());
    }

    #[test]
    fn title_contains_is_literal_and_case_insensitive() {
        let owner = Uuid::new_v4();
        let f = title_contains(Operator::Contains, &values(&["a.b"])).unwrap();
        assert!(f.matches(&note(owner, "see A.B here")));
        assert!(!f.matches(&note(owner, "axb")));

        let pct = title_contains(Operator::Contains, &values(&["100%"])).unwrap();
        assert!(pct.matches(&note(owner, "100% done")));
        assert!(!pct.matches(&note(owner, "1000 done")));

        let exact = title_contains(Operator::Equals, &values(&["Plan"])).unwrap();
        assert!(exact.matches(&note(owner, "Plan")));
        assert!(!exact.matches(&note(owner, "plan")));
    }

    #[test]
    fn title_contains_handles_very_long_needles() {
        let owner = Uuid::new_v4();
        let long = "ÿ".repeat(60_000);
        let f = title_contains(Operator::Contains, &[long.clone()]).unwrap();
        assert!(!f.matches(&note(owner, "unrelated")));
        assert!(f.matches(&note(owner, &format!("x{}x", long.to_uppercase()))));
    }

    #[test]
    fn parent_node_requires_valid_ids() {
        let owner = Uuid::new_v4();
        let parent = note(owner, "p");
        let child = note(owner, "c").with_parent(parent.id);

        let f = parent_node(Operator::Equals, &[parent.id.to_string()]).unwrap();
        assert!(f.matches(&child) && !f.matches(&parent));
        assert!(parent_node(Operator::In, &values(&["not-a-uuid"])).is_none());
        assert!(parent_node(Operator::NotEquals, &[parent.id.to_string()]).is_none());
    }

    #[test]
    fn overdue_only_applies_to_due_dates() {
        let cal = Calendar::new(Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap());
        assert!(date(DateField::Due, &cal, Operator::IsOverdue, &[]).is_some());
        assert!(date(DateField::EarliestStart, &cal, Operator::IsOverdue, &[]).is_none());
        assert!(date(DateField::EarliestStart, &cal, Operator::OverdueByDays, &values(&["2"])).is_none());
        assert!(date(DateField::EarliestStart, &cal, Operator::StartsWithinDays, &values(&["2"])).is_some());
    }

    #[test]
    fn truthy_flags() {
        for flag in ["true", "TRUE", "1", "Yes", " yes "] {
            assert!(is_truthy(flag), "{flag}");
        }
        for flag in ["false", "0", "no", "y", ""] {
            assert!(!is_truthy(flag), "{flag}");
        }
    }

    // ========================================================================
    // Store-backed evaluators
    // ========================================================================

    #[test]
    fn tag_any_and_all() {
        let owner = Uuid::new_v4();
        let store = MemoryStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let both = note(owner, "both");
        let only_a = note(owner, "a");
        for n in [&both, &only_a] {
            store.insert_node(n.clone()).unwrap();
        }
        store.tag_node(both.id, a).unwrap();
        store.tag_node(both.id, b).unwrap();
        store.tag_node(only_a.id, a).unwrap();

        let tags = [a.to_string(), b.to_string()];
        let any = tag_contains(&store, Operator::Any, &tags).unwrap().unwrap();
        assert!(any.matches(&both) && any.matches(&only_a));

        let all = tag_contains(&store, Operator::All, &tags).unwrap().unwrap();
        assert!(all.matches(&both) && !all.matches(&only_a));

        let bad = [a.to_string(), "nope".to_string()];
        assert!(tag_contains(&store, Operator::Any, &bad).unwrap().is_none());
        assert!(tag_contains(&store, Operator::Equals, &tags).unwrap().is_none());
    }

    #[test]
    fn ancestor_without_descendants_matches_nothing() {
        let owner = Uuid::new_v4();
        let store = MemoryStore::new();
        let leaf = note(owner, "leaf");
        store.insert_node(leaf.clone()).unwrap();

        let f = parent_ancestor(&store, Operator::Equals, &[leaf.id.to_string()])
            .unwrap()
            .unwrap();
        assert!(!f.matches(&leaf));
    }

    #[test]
    fn has_children_both_ways() {
        let owner = Uuid::new_v4();
        let store = MemoryStore::new();
        let parent = note(owner, "p");
        let child = note(owner, "c").with_parent(parent.id);
        store.insert_node(parent.clone()).unwrap();
        store.insert_node(child.clone()).unwrap();

        let yes = has_children(&store, owner, Operator::Equals, &values(&["yes"]))
            .unwrap()
            .unwrap();
        assert!(yes.matches(&parent) && !yes.matches(&child));

        let no = has_children(&store, owner, Operator::Equals, &values(&["false"]))
            .unwrap()
            .unwrap();
        assert!(!no.matches(&parent) && no.matches(&child));

        assert!(has_children(&store, owner, Operator::In, &values(&["true"]))
            .unwrap()
            .is_none());
    }
}
