//! Rule compilation.
//!
//! [`Compiler`] turns a [`RuleData`] into a [`Filter`]. Each condition is
//! parsed into a [`ConditionType`] and dispatched to its evaluator; the
//! fragments that come back are joined with the rule's logic. Conditions
//! that contribute nothing are dropped with a warning.
//!
//! # Fail-closed
//!
//! A rule with no contributing condition compiles to [`Filter::Nothing`],
//! never to "match everything". The same holds for a `saved_filter` that
//! cannot be resolved: missing, invisible, malformed, cyclic or nested past
//! the depth limit.

use chrono::{DateTime, Utc};
use tasktree_model::{Condition, Logic, NodeStore, Result, RuleData, RuleId, RuleStore, UserId};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::condition::ConditionType;
use crate::dates::Calendar;
use crate::evaluators::{self, Fragment};
use crate::filter::Filter;
use crate::op::{is_no_value_operator, Operator};

/// Compiles rules for one owner at one instant.
pub struct Compiler<'a, S: ?Sized> {
    store: &'a S,
    owner: UserId,
    calendar: Calendar,
    max_depth: usize,
    depth: usize,
    resolving: Vec<RuleId>,
}

impl<'a, S> Compiler<'a, S>
where
    S: NodeStore + RuleStore + ?Sized,
{
    pub fn new(store: &'a S, owner: UserId, now: DateTime<Utc>, max_depth: usize) -> Self {
        Compiler {
            store,
            owner,
            calendar: Calendar::new(now),
            max_depth,
            depth: 0,
            resolving: Vec::new(),
        }
    }

    /// Marks a stored rule as being compiled, so references back to it are
    /// caught as cycles.
    pub fn enter(&mut self, rule_id: RuleId) {
        self.resolving.push(rule_id);
    }

    /// Compiles a rule body.
    pub fn compile_rule(&mut self, data: &RuleData) -> Result<Filter> {
        let mut fragments = Vec::with_capacity(data.conditions.len());
        for condition in &data.conditions {
            if let Some(fragment) = self.compile_condition(condition)? {
                fragments.push(fragment);
            }
        }

        if fragments.is_empty() {
            debug!(conditions = data.conditions.len(), "no condition contributed");
            return Ok(Filter::Nothing);
        }
        Ok(match data.logic {
            Logic::And => Filter::All(fragments),
            Logic::Or => Filter::Any(fragments),
        })
    }

    fn compile_condition(&mut self, condition: &Condition) -> Result<Fragment> {
        let Ok(kind) = condition.kind.parse::<ConditionType>() else {
            warn!(kind = %condition.kind, "dropping condition of unknown type");
            return Ok(None);
        };
        if condition.operator.is_empty() {
            warn!(%kind, "dropping condition without operator");
            return Ok(None);
        }
        if condition.values.is_empty() && !is_no_value_operator(&condition.operator) {
            warn!(%kind, operator = %condition.operator, "dropping condition without values");
            return Ok(None);
        }

        let values = condition.values.as_slice();
        let fragment = match (kind, condition.operator.parse::<Operator>().ok()) {
            // saved_filter only reads its value; any operator will do.
            (ConditionType::SavedFilter, _) => Some(self.saved_filter(values)?),
            (_, None) => {
                warn!(%kind, operator = %condition.operator, "dropping condition with unknown operator");
                return Ok(None);
            }
            (ConditionType::NodeType, Some(op)) => evaluators::node_type(op, values),
            (ConditionType::TagContains, Some(op)) => {
                evaluators::tag_contains(self.store, op, values)?
            }
            (ConditionType::ParentNode, Some(op)) => evaluators::parent_node(op, values),
            (ConditionType::ParentAncestor, Some(op)) => {
                evaluators::parent_ancestor(self.store, op, values)?
            }
            (ConditionType::TaskStatus, Some(op)) => evaluators::task_status(op, values),
            (ConditionType::TaskPriority, Some(op)) => evaluators::task_priority(op, values),
            (ConditionType::TitleContains, Some(op)) => evaluators::title_contains(op, values),
            (ConditionType::HasChildren, Some(op)) => {
                evaluators::has_children(self.store, self.owner, op, values)?
            }
            (ConditionType::DueDate | ConditionType::EarliestStart, Some(op)) => {
                match kind.date_field() {
                    Some(field) => evaluators::date(field, &self.calendar, op, values),
                    None => None,
                }
            }
        };

        if fragment.is_none() {
            warn!(%kind, operator = %condition.operator, ?values, "dropping condition that did not apply");
        }
        Ok(fragment)
    }

    fn saved_filter(&mut self, values: &[String]) -> Result<Filter> {
        let Some(raw) = values.first().map(|v| v.trim()).filter(|v| !v.is_empty()) else {
            return Ok(Filter::Nothing);
        };
        let Ok(rule_id) = Uuid::parse_str(raw) else {
            warn!(value = raw, "saved filter is not a rule id");
            return Ok(Filter::Nothing);
        };
        if self.resolving.contains(&rule_id) {
            warn!(%rule_id, "saved filter cycle");
            return Ok(Filter::Nothing);
        }
        if self.depth >= self.max_depth {
            warn!(%rule_id, max_depth = self.max_depth, "saved filters nested too deep");
            return Ok(Filter::Nothing);
        }
        let Some(rule) = self.store.get_rule(rule_id, self.owner)? else {
            warn!(%rule_id, "saved filter rule missing or not visible");
            return Ok(Filter::Nothing);
        };
        if rule.rule_data.is_empty() {
            return Ok(Filter::Nothing);
        }

        debug!(%rule_id, depth = self.depth + 1, "resolving saved filter");
        self.resolving.push(rule_id);
        self.depth += 1;
        let filter = self.compile_rule(&rule.rule_data);
        self.depth -= 1;
        self.resolving.pop();
        filter
    }
}
