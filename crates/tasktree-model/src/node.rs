//! Nodes and their type-specific facets.
//!
//! Every item in the hierarchy is a [`Node`]. What kind of node it is lives
//! in its [`NodeFacet`], a sum type keyed by the `node_type` discriminant, so
//! code that needs task fields matches on the facet instead of downcasting.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::UnknownVariant;
use crate::rule::RuleData;
use crate::{NodeId, RuleId, UserId};

/// Discriminant naming the kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Task,
    Note,
    Folder,
    SmartFolder,
    Template,
}

impl NodeType {
    /// All node types, in declaration order.
    pub const ALL: [NodeType; 5] = [
        NodeType::Task,
        NodeType::Note,
        NodeType::Folder,
        NodeType::SmartFolder,
        NodeType::Template,
    ];

    /// Returns the wire name of this type.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Task => "task",
            NodeType::Note => "note",
            NodeType::Folder => "folder",
            NodeType::SmartFolder => "smart_folder",
            NodeType::Template => "template",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("node type", s))
    }
}

/// Workflow state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
    Dropped,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Done,
        TaskStatus::Dropped,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
            TaskStatus::Dropped => "dropped",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("task status", s))
    }
}

/// Urgency of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 4] = [
        TaskPriority::Low,
        TaskPriority::Medium,
        TaskPriority::High,
        TaskPriority::Urgent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }
}

impl FromStr for TaskPriority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskPriority::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("task priority", s))
    }
}

/// Fields carried only by task nodes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskFacet {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub earliest_start_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub archived: bool,
}

impl TaskFacet {
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_at(mut self, due_at: DateTime<Utc>) -> Self {
        self.due_at = Some(due_at);
        self
    }

    pub fn with_earliest_start_at(mut self, start: DateTime<Utc>) -> Self {
        self.earliest_start_at = Some(start);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NoteFacet {
    #[serde(default)]
    pub body: String,
}

/// A smart folder's rule binding.
///
/// `rule_id` is authoritative when set; `rules` is the legacy inline body
/// kept for folders created before rules became standalone entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartFolderFacet {
    #[serde(default)]
    pub rule_id: Option<RuleId>,
    #[serde(default)]
    pub rules: Option<RuleData>,
    #[serde(default = "default_auto_refresh")]
    pub auto_refresh: bool,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_auto_refresh() -> bool {
    true
}

impl Default for SmartFolderFacet {
    fn default() -> Self {
        SmartFolderFacet {
            rule_id: None,
            rules: None,
            auto_refresh: true,
            description: None,
        }
    }
}

impl SmartFolderFacet {
    pub fn with_rule(rule_id: RuleId) -> Self {
        SmartFolderFacet {
            rule_id: Some(rule_id),
            ..Default::default()
        }
    }

    pub fn with_legacy_rules(rules: RuleData) -> Self {
        SmartFolderFacet {
            rules: Some(rules),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateFacet {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub usage_count: u32,
    #[serde(default)]
    pub target_node_id: Option<NodeId>,
    #[serde(default = "default_create_container")]
    pub create_container: bool,
}

fn default_create_container() -> bool {
    true
}

impl Default for TemplateFacet {
    fn default() -> Self {
        TemplateFacet {
            description: None,
            category: None,
            usage_count: 0,
            target_node_id: None,
            create_container: true,
        }
    }
}

/// Type-specific part of a node, tagged by `node_type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node_type", rename_all = "snake_case")]
pub enum NodeFacet {
    Task(TaskFacet),
    Note(NoteFacet),
    Folder,
    SmartFolder(SmartFolderFacet),
    Template(TemplateFacet),
}

impl NodeFacet {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeFacet::Task(_) => NodeType::Task,
            NodeFacet::Note(_) => NodeType::Note,
            NodeFacet::Folder => NodeType::Folder,
            NodeFacet::SmartFolder(_) => NodeType::SmartFolder,
            NodeFacet::Template(_) => NodeType::Template,
        }
    }
}

/// A single item in a user's hierarchy.
///
/// Nodes reference their parent by id; a node with no parent is a root.
/// Whether a node acts as a list is derived from having children and is
/// never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub owner_id: UserId,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    pub title: String,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub facet: NodeFacet,
}

impl Node {
    /// Creates a root node stamped with the current time.
    pub fn new(id: NodeId, owner_id: UserId, title: impl Into<String>, facet: NodeFacet) -> Self {
        let now = Utc::now();
        Node {
            id,
            owner_id,
            parent_id: None,
            title: title.into(),
            sort_order: 0,
            created_at: now,
            updated_at: now,
            facet,
        }
    }

    pub fn with_parent(mut self, parent_id: NodeId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn node_type(&self) -> NodeType {
        self.facet.node_type()
    }

    /// Returns the task facet when this node is a task.
    pub fn task(&self) -> Option<&TaskFacet> {
        match &self.facet {
            NodeFacet::Task(task) => Some(task),
            _ => None,
        }
    }

    /// Returns the smart folder facet when this node is a smart folder.
    pub fn smart_folder(&self) -> Option<&SmartFolderFacet> {
        match &self.facet {
            NodeFacet::SmartFolder(folder) => Some(folder),
            _ => None,
        }
    }
}
