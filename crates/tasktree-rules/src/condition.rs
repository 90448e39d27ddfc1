//! Condition types.

use std::fmt;
use std::str::FromStr;

use crate::dates::DateField;
use crate::error::UnknownConditionType;

/// Kind of a rule condition.
///
/// Stored conditions keep their type as a raw string; this enum is what the
/// compiler and the validator parse it into. A string that parses to nothing
/// is an unknown type: skipped at evaluation, rejected at validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionType {
    TagContains,
    NodeType,
    ParentNode,
    ParentAncestor,
    TaskStatus,
    TaskPriority,
    TitleContains,
    HasChildren,
    DueDate,
    EarliestStart,
    SavedFilter,
}

impl ConditionType {
    pub const ALL: [ConditionType; 11] = [
        ConditionType::TagContains,
        ConditionType::NodeType,
        ConditionType::ParentNode,
        ConditionType::ParentAncestor,
        ConditionType::TaskStatus,
        ConditionType::TaskPriority,
        ConditionType::TitleContains,
        ConditionType::HasChildren,
        ConditionType::DueDate,
        ConditionType::EarliestStart,
        ConditionType::SavedFilter,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConditionType::TagContains => "tag_contains",
            ConditionType::NodeType => "node_type",
            ConditionType::ParentNode => "parent_node",
            ConditionType::ParentAncestor => "parent_ancestor",
            ConditionType::TaskStatus => "task_status",
            ConditionType::TaskPriority => "task_priority",
            ConditionType::TitleContains => "title_contains",
            ConditionType::HasChildren => "has_children",
            ConditionType::DueDate => "due_date",
            ConditionType::EarliestStart => "earliest_start",
            ConditionType::SavedFilter => "saved_filter",
        }
    }

    /// The task date this condition reads, for date conditions.
    pub fn date_field(self) -> Option<DateField> {
        match self {
            ConditionType::DueDate => Some(DateField::Due),
            ConditionType::EarliestStart => Some(DateField::EarliestStart),
            _ => None,
        }
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConditionType {
    type Err = UnknownConditionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConditionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownConditionType(s.to_string()))
    }
}
