//! Tags and node-tag membership.

use serde::{Deserialize, Serialize};

use crate::{NodeId, TagId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub owner_id: UserId,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl Tag {
    pub fn new(id: TagId, owner_id: UserId, name: impl Into<String>) -> Self {
        Tag {
            id,
            owner_id,
            name: name.into(),
            color: None,
        }
    }
}

/// One row of the node/tag association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeTag {
    pub node_id: NodeId,
    pub tag_id: TagId,
}
