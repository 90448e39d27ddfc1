//! Tasktree model - nodes, tags, rules and the stores that hold them.
//!
//! A user's workspace is a forest of [`Node`]s. Each node carries a
//! type-specific [`NodeFacet`] (task fields, note body, smart folder binding,
//! template metadata). Tags attach to nodes many-to-many, and [`Rule`]s are
//! named, ownable `{conditions, logic}` documents that smart folders point at.
//!
//! This crate defines the data and the store contracts only:
//!
//! - [`NodeStore`] reads nodes, the hierarchy and tag membership
//! - [`RuleStore`] reads rules under owner/public/system visibility
//! - [`RuleWriter`] and [`SmartFolderWriter`] are the narrow write surfaces
//!
//! [`MemoryStore`] implements all of them over a JSON [`Snapshot`].
//!
//! # Quick Start
//!
//! ```rust
//! use tasktree_model::{MemoryStore, Node, NodeFacet, NodeStore, TaskFacet};
//! use uuid::Uuid;
//!
//! let owner = Uuid::new_v4();
//! let store = MemoryStore::new();
//! let project = Node::new(Uuid::new_v4(), owner, "Project", NodeFacet::Folder);
//! let task = Node::new(Uuid::new_v4(), owner, "Ship it", NodeFacet::Task(TaskFacet::default()))
//!     .with_parent(project.id);
//! store.insert_node(project.clone()).unwrap();
//! store.insert_node(task.clone()).unwrap();
//!
//! assert_eq!(store.list_descendants(project.id).unwrap(), vec![task.id]);
//! ```

mod error;
mod memory;
mod node;
mod rule;
mod store;
mod tag;
pub mod tree;

/// Identifier of a node.
pub type NodeId = uuid::Uuid;
/// Identifier of a tag.
pub type TagId = uuid::Uuid;
/// Identifier of a rule.
pub type RuleId = uuid::Uuid;
/// Identifier of a user.
pub type UserId = uuid::Uuid;

// Re-export public API
pub use error::{Result, StoreError, UnknownVariant};
pub use memory::{MemoryStore, Snapshot};
pub use node::{
    Node, NodeFacet, NodeType, NoteFacet, SmartFolderFacet, TaskFacet, TaskPriority, TaskStatus,
    TemplateFacet,
};
pub use rule::{Condition, Logic, NewRule, Rule, RuleData, RulePatch};
pub use store::{NodeStore, RuleStore, RuleWriter, SmartFolderWriter};
pub use tag::{NodeTag, Tag};
pub use tree::ChildIndex;
