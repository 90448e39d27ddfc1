//! Store contracts consumed by the rules engine.
//!
//! The engine only reads. [`NodeStore`] and [`RuleStore`] describe the read
//! side; [`RuleWriter`] and [`SmartFolderWriter`] are the narrow write
//! surfaces used by rule management. All traits are sync-only. An async
//! backend should block internally or expose a sync snapshot.
//!
//! # Example
//!
//! ```rust,ignore
//! use tasktree_model::{NodeStore, Node, NodeId, UserId, Result};
//!
//! struct PgNodes { pool: Pool }
//!
//! impl NodeStore for PgNodes {
//!     fn get_node(&self, id: NodeId) -> Result<Option<Node>> {
//!         self.pool.fetch_node(id)
//!     }
//!     // ...
//! }
//! ```

use std::collections::HashSet;

use crate::error::Result;
use crate::node::{Node, TaskFacet};
use crate::rule::Rule;
use crate::tree::collect_descendants;
use crate::{NodeId, RuleId, TagId, UserId};

/// Read access to nodes, the hierarchy and tag membership.
///
/// # Design Notes
///
/// - **Bulk descendants**: `list_descendants` answers a whole subtree in one
///   call. The provided implementation walks `list_children` with the
///   set-builder in [`crate::tree`]; stores with an index should override it.
///
/// - **Owner scoping**: `list_owned_nodes` and `list_parent_ids` are the only
///   owner-scoped reads. Ownership of a subtree is uniform, so id-based reads
///   are not re-checked per node.
pub trait NodeStore: Send + Sync {
    /// Retrieves a node by id, returning `None` if not found.
    fn get_node(&self, id: NodeId) -> Result<Option<Node>>;

    /// Direct children of a node.
    fn list_children(&self, parent_id: NodeId) -> Result<Vec<Node>>;

    /// Every strict descendant of a node, at any depth.
    fn list_descendants(&self, ancestor_id: NodeId) -> Result<Vec<NodeId>> {
        collect_descendants(ancestor_id, |id| {
            Ok(self.list_children(id)?.into_iter().map(|n| n.id).collect())
        })
    }

    /// The task facet of a node, or `None` for missing or non-task nodes.
    fn get_task_facet(&self, node_id: NodeId) -> Result<Option<TaskFacet>> {
        Ok(self
            .get_node(node_id)?
            .and_then(|node| node.task().cloned()))
    }

    /// Tag ids attached to a node.
    fn list_node_tag_ids(&self, node_id: NodeId) -> Result<Vec<TagId>>;

    /// Node ids carrying a tag.
    fn list_node_ids_by_tag(&self, tag_id: TagId) -> Result<Vec<NodeId>>;

    /// Every node owned by a user; the candidate set for evaluation.
    fn list_owned_nodes(&self, owner_id: UserId) -> Result<Vec<Node>>;

    /// Ids of the user's nodes that are the parent of at least one node.
    fn list_parent_ids(&self, owner_id: UserId) -> Result<HashSet<NodeId>>;
}

/// Read access to rules.
pub trait RuleStore: Send + Sync {
    /// Fetches a rule visible to `requesting_user`.
    ///
    /// Implementations must enforce visibility themselves: a rule is returned
    /// only when the user owns it or it is public or system. Anything else is
    /// indistinguishable from a missing rule.
    fn get_rule(&self, id: RuleId, requesting_user: UserId) -> Result<Option<Rule>>;
}

/// Write access to rules.
pub trait RuleWriter: RuleStore {
    /// Rules owned by `user`, optionally including public and system rules.
    fn list_rules(
        &self,
        user: UserId,
        include_public: bool,
        include_system: bool,
    ) -> Result<Vec<Rule>>;

    /// Stores a new rule.
    fn insert_rule(&self, rule: Rule) -> Result<Rule>;

    /// Replaces an existing rule with the same id.
    fn replace_rule(&self, rule: Rule) -> Result<Rule>;

    /// Removes a rule, returning whether it existed.
    fn remove_rule(&self, id: RuleId) -> Result<bool>;
}

/// Rebinding smart folders to rule entities.
pub trait SmartFolderWriter: NodeStore {
    /// Points a smart folder at a rule, keeping any legacy inline rules.
    fn attach_rule(&self, folder_id: NodeId, rule_id: RuleId) -> Result<()>;
}
