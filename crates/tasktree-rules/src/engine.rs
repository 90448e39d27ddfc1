//! The rules engine.
//!
//! [`RulesEngine`] evaluates rules against a store: it resolves the rule,
//! compiles it with the clock read once, scans the owner's nodes in a single
//! pass, then orders and paginates the matches.
//!
//! Candidates are always the owner's nodes minus templates and minus the
//! smart folder being evaluated. `total` counts every match before
//! pagination.

use std::sync::Arc;

use serde::Serialize;
use tasktree_model::{Node, NodeId, NodeStore, NodeType, RuleData, RuleId, RuleStore, UserId};
use tracing::debug;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::compile::Compiler;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::filter::Filter;
use crate::ordering::compare_by_orderings;

/// Where the rule to evaluate comes from.
#[derive(Debug, Clone, Copy)]
pub enum RuleSource<'r> {
    /// An unsaved rule body.
    Inline(&'r RuleData),
    /// A stored rule, fetched under the owner's visibility.
    Stored(RuleId),
}

/// Offset and limit applied after ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Page {
    /// Every result.
    pub fn all() -> Self {
        Page::default()
    }

    /// The first `limit` results.
    pub fn first(limit: usize) -> Self {
        Page {
            offset: 0,
            limit: Some(limit),
        }
    }

    pub fn new(offset: usize, limit: Option<usize>) -> Self {
        Page { offset, limit }
    }

    fn apply(self, nodes: Vec<Node>) -> Vec<Node> {
        let iter = nodes.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

/// Result of an evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Evaluation {
    /// Number of matching nodes before pagination.
    pub total: usize,
    /// The requested page of matches, in order.
    pub nodes: Vec<Node>,
}

impl Evaluation {
    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Evaluates rules against a node and rule store.
///
/// The engine only reads. It is `Send + Sync` whenever the store is, and
/// cheap to construct per request.
pub struct RulesEngine<'s, S: ?Sized> {
    store: &'s S,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
}

impl<'s, S> RulesEngine<'s, S>
where
    S: NodeStore + RuleStore + ?Sized,
{
    /// Creates an engine with default configuration and the system clock.
    pub fn new(store: &'s S) -> Self {
        RulesEngine {
            store,
            config: EngineConfig::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluates a rule for `owner`.
    ///
    /// A stored rule that is missing or not visible to the owner yields an
    /// empty result, as does a rule with no conditions.
    pub fn evaluate(&self, source: RuleSource<'_>, owner: UserId, page: Page) -> Result<Evaluation> {
        match source {
            RuleSource::Inline(data) => self.run(data, None, owner, None, page),
            RuleSource::Stored(rule_id) => match self.store.get_rule(rule_id, owner)? {
                Some(rule) => self.run(&rule.rule_data, Some(rule_id), owner, None, page),
                None => {
                    debug!(%rule_id, "rule missing or not visible");
                    Ok(Evaluation::default())
                }
            },
        }
    }

    /// Evaluates the rule a smart folder is bound to.
    ///
    /// The folder must exist, be a smart folder and belong to `owner`. An
    /// attached `rule_id` takes precedence; if that rule cannot be fetched
    /// the folder is empty. Without one, the legacy inline rules are used.
    pub fn evaluate_smart_folder(
        &self,
        folder_id: NodeId,
        owner: UserId,
        page: Page,
    ) -> Result<Evaluation> {
        let node = self
            .store
            .get_node(folder_id)?
            .filter(|node| node.owner_id == owner)
            .ok_or(EngineError::FolderNotFound(folder_id))?;
        let folder = node
            .smart_folder()
            .ok_or(EngineError::FolderNotFound(folder_id))?;

        match (folder.rule_id, &folder.rules) {
            (Some(rule_id), _) => match self.store.get_rule(rule_id, owner)? {
                Some(rule) => self.run(&rule.rule_data, Some(rule_id), owner, Some(folder_id), page),
                None => {
                    debug!(%folder_id, %rule_id, "smart folder rule missing or not visible");
                    Ok(Evaluation::default())
                }
            },
            (None, Some(rules)) => self.run(rules, None, owner, Some(folder_id), page),
            (None, None) => Ok(Evaluation::default()),
        }
    }

    /// Evaluates an unsaved rule body, keeping at most `limit` results.
    ///
    /// Without a limit the configured preview limit applies.
    pub fn preview(&self, data: &RuleData, owner: UserId, limit: Option<usize>) -> Result<Evaluation> {
        let limit = limit.unwrap_or(self.config.preview_limit);
        self.run(data, None, owner, Some(Uuid::nil()), Page::first(limit))
    }

    /// Compiles a rule body without running it.
    pub fn compile(&self, data: &RuleData, owner: UserId) -> Result<Filter> {
        let mut compiler = Compiler::new(self.store, owner, self.clock.now(), self.config.max_rule_depth);
        Ok(compiler.compile_rule(data)?)
    }

    fn run(
        &self,
        data: &RuleData,
        root: Option<RuleId>,
        owner: UserId,
        exclude: Option<NodeId>,
        page: Page,
    ) -> Result<Evaluation> {
        if data.is_empty() {
            return Ok(Evaluation::default());
        }

        let now = self.clock.now();
        let mut compiler = Compiler::new(self.store, owner, now, self.config.max_rule_depth);
        if let Some(rule_id) = root {
            compiler.enter(rule_id);
        }
        let filter = compiler.compile_rule(data)?;
        if filter.is_nothing() {
            return Ok(Evaluation::default());
        }

        let mut matches: Vec<Node> = self
            .store
            .list_owned_nodes(owner)?
            .into_iter()
            .filter(|node| Some(node.id) != exclude)
            .filter(|node| node.node_type() != NodeType::Template)
            .filter(|node| filter.matches(node))
            .collect();
        matches.sort_by(|a, b| compare_by_orderings(a, b, &self.config.default_order));

        let total = matches.len();
        let nodes = page.apply(matches);
        debug!(%owner, %now, total, returned = nodes.len(), "rule evaluated");
        Ok(Evaluation { total, nodes })
    }
}
