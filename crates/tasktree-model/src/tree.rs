//! Descendant queries over the parent/child hierarchy.
//!
//! Descendants are found with a recursive set-builder: seed with the direct
//! children of the ancestor, then keep unioning in the children of newly
//! found nodes until nothing new appears. Each node is expanded at most once,
//! so cost is bounded by the size of the subtree and a corrupt parent cycle
//! still terminates.

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;

use crate::node::Node;
use crate::NodeId;

/// Collects every strict descendant of `ancestor`, breadth first.
///
/// `children_of` returns the direct children of a node. The ancestor itself
/// is never part of the result.
pub fn collect_descendants<F, E>(ancestor: NodeId, mut children_of: F) -> Result<Vec<NodeId>, E>
where
    F: FnMut(NodeId) -> Result<Vec<NodeId>, E>,
{
    let mut seen: HashSet<NodeId> = HashSet::from([ancestor]);
    let mut found = Vec::new();
    let mut frontier = children_of(ancestor)?;

    while !frontier.is_empty() {
        let mut next = Vec::new();
        for id in frontier {
            if seen.insert(id) {
                found.push(id);
                next.extend(children_of(id)?);
            }
        }
        frontier = next;
    }

    Ok(found)
}

/// Parent to children index over a set of nodes.
#[derive(Debug, Clone, Default)]
pub struct ChildIndex {
    children: HashMap<NodeId, Vec<NodeId>>,
}

impl ChildIndex {
    pub fn new() -> Self {
        ChildIndex::default()
    }

    pub fn from_nodes<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Self {
        let mut index = ChildIndex::new();
        for node in nodes {
            if let Some(parent) = node.parent_id {
                index.insert(parent, node.id);
            }
        }
        index
    }

    pub fn insert(&mut self, parent: NodeId, child: NodeId) {
        let siblings = self.children.entry(parent).or_default();
        if !siblings.contains(&child) {
            siblings.push(child);
        }
    }

    pub fn remove(&mut self, parent: NodeId, child: NodeId) {
        if let Some(siblings) = self.children.get_mut(&parent) {
            siblings.retain(|id| *id != child);
            if siblings.is_empty() {
                self.children.remove(&parent);
            }
        }
    }

    /// Direct children of `parent`.
    pub fn children(&self, parent: NodeId) -> &[NodeId] {
        self.children.get(&parent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_children(&self, parent: NodeId) -> bool {
        !self.children(parent).is_empty()
    }

    /// Every node that has at least one child.
    pub fn parents(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.keys().copied()
    }

    /// Every strict descendant of `ancestor`.
    pub fn descendants(&self, ancestor: NodeId) -> Vec<NodeId> {
        let result: Result<_, Infallible> =
            collect_descendants(ancestor, |id| Ok(self.children(id).to_vec()));
        match result {
            Ok(ids) => ids,
            Err(never) => match never {},
        }
    }
}
