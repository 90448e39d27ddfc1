//! In-memory store backed by a JSON snapshot.
//!
//! [`MemoryStore`] implements every store contract over plain maps guarded by
//! a single `RwLock`, so each read sees a consistent state. It is the store
//! used by the `tt` binary and by tests.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::Read;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::node::{Node, NodeFacet};
use crate::rule::Rule;
use crate::store::{NodeStore, RuleStore, RuleWriter, SmartFolderWriter};
use crate::tag::{NodeTag, Tag};
use crate::tree::ChildIndex;
use crate::{NodeId, RuleId, TagId, UserId};

/// Serializable image of a whole store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub node_tags: Vec<NodeTag>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[derive(Debug, Default)]
struct State {
    nodes: HashMap<NodeId, Node>,
    children: ChildIndex,
    tags: HashMap<TagId, Tag>,
    tags_by_node: HashMap<NodeId, BTreeSet<TagId>>,
    nodes_by_tag: HashMap<TagId, BTreeSet<NodeId>>,
    rules: HashMap<RuleId, Rule>,
}

impl State {
    fn insert_node(&mut self, node: Node) {
        if let Some(previous) = self.nodes.get(&node.id) {
            if let Some(old_parent) = previous.parent_id {
                self.children.remove(old_parent, node.id);
            }
        }
        if let Some(parent) = node.parent_id {
            self.children.insert(parent, node.id);
        }
        self.nodes.insert(node.id, node);
    }

    fn tag(&mut self, node_id: NodeId, tag_id: TagId) {
        self.tags_by_node.entry(node_id).or_default().insert(tag_id);
        self.nodes_by_tag.entry(tag_id).or_default().insert(node_id);
    }

    fn untag_all(&mut self, node_id: NodeId) {
        if let Some(tags) = self.tags_by_node.remove(&node_id) {
            for tag_id in tags {
                if let Some(nodes) = self.nodes_by_tag.get_mut(&tag_id) {
                    nodes.remove(&node_id);
                }
            }
        }
    }
}

/// Store holding everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Builds a store from a snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut state = State::default();
        for node in snapshot.nodes {
            state.insert_node(node);
        }
        for tag in snapshot.tags {
            state.tags.insert(tag.id, tag);
        }
        for link in snapshot.node_tags {
            state.tag(link.node_id, link.tag_id);
        }
        for rule in snapshot.rules {
            state.rules.insert(rule.id, rule);
        }
        MemoryStore {
            state: RwLock::new(state),
        }
    }

    /// Reads a JSON snapshot.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_reader(reader)?;
        Ok(MemoryStore::from_snapshot(snapshot))
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        Ok(MemoryStore::from_snapshot(snapshot))
    }

    /// Captures the current contents, ordered for stable output.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let state = self.read()?;
        let mut nodes: Vec<Node> = state.nodes.values().cloned().collect();
        nodes.sort_by_key(|n| (n.created_at, n.id));
        let mut tags: Vec<Tag> = state.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        let mut node_tags: Vec<NodeTag> = state
            .tags_by_node
            .iter()
            .flat_map(|(node_id, tags)| {
                tags.iter().map(move |tag_id| NodeTag {
                    node_id: *node_id,
                    tag_id: *tag_id,
                })
            })
            .collect();
        node_tags.sort_by_key(|link| (link.node_id, link.tag_id));
        let mut rules: Vec<Rule> = state.rules.values().cloned().collect();
        rules.sort_by_key(|r| (r.created_at, r.id));
        Ok(Snapshot {
            nodes,
            tags,
            node_tags,
            rules,
        })
    }

    /// Inserts or replaces a node.
    pub fn insert_node(&self, node: Node) -> Result<()> {
        self.write()?.insert_node(node);
        Ok(())
    }

    /// Deletes a node and, with it, its whole subtree and tag links.
    ///
    /// Returns the number of nodes removed.
    pub fn remove_node(&self, id: NodeId) -> Result<usize> {
        let mut state = self.write()?;
        let Some(node) = state.nodes.get(&id).cloned() else {
            return Ok(0);
        };
        let mut doomed = state.children.descendants(id);
        doomed.push(id);
        for victim in &doomed {
            if let Some(removed) = state.nodes.remove(victim) {
                if let Some(parent) = removed.parent_id {
                    state.children.remove(parent, removed.id);
                }
            }
            state.untag_all(*victim);
        }
        if let Some(parent) = node.parent_id {
            state.children.remove(parent, id);
        }
        Ok(doomed.len())
    }

    pub fn insert_tag(&self, tag: Tag) -> Result<()> {
        self.write()?.tags.insert(tag.id, tag);
        Ok(())
    }

    /// Attaches a tag to a node. Attaching twice is a no-op.
    pub fn tag_node(&self, node_id: NodeId, tag_id: TagId) -> Result<()> {
        let mut state = self.write()?;
        if !state.nodes.contains_key(&node_id) {
            return Err(StoreError::NodeNotFound(node_id));
        }
        state.tag(node_id, tag_id);
        Ok(())
    }

    /// Fetches a rule regardless of visibility.
    pub fn rule(&self, id: RuleId) -> Result<Option<Rule>> {
        Ok(self.read()?.rules.get(&id).cloned())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| StoreError::Poisoned)
    }
}

impl NodeStore for MemoryStore {
    fn get_node(&self, id: NodeId) -> Result<Option<Node>> {
        Ok(self.read()?.nodes.get(&id).cloned())
    }

    fn list_children(&self, parent_id: NodeId) -> Result<Vec<Node>> {
        let state = self.read()?;
        let mut children: Vec<Node> = state
            .children
            .children(parent_id)
            .iter()
            .filter_map(|id| state.nodes.get(id).cloned())
            .collect();
        children.sort_by_key(|n| (n.sort_order, n.created_at));
        Ok(children)
    }

    fn list_descendants(&self, ancestor_id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.read()?.children.descendants(ancestor_id))
    }

    fn list_node_tag_ids(&self, node_id: NodeId) -> Result<Vec<TagId>> {
        Ok(self
            .read()?
            .tags_by_node
            .get(&node_id)
            .map(|tags| tags.iter().copied().collect())
            .unwrap_or_default())
    }

    fn list_node_ids_by_tag(&self, tag_id: TagId) -> Result<Vec<NodeId>> {
        Ok(self
            .read()?
            .nodes_by_tag
            .get(&tag_id)
            .map(|nodes| nodes.iter().copied().collect())
            .unwrap_or_default())
    }

    fn list_owned_nodes(&self, owner_id: UserId) -> Result<Vec<Node>> {
        Ok(self
            .read()?
            .nodes
            .values()
            .filter(|n| n.owner_id == owner_id)
            .cloned()
            .collect())
    }

    fn list_parent_ids(&self, owner_id: UserId) -> Result<HashSet<NodeId>> {
        let state = self.read()?;
        Ok(state
            .children
            .parents()
            .filter(|id| {
                state
                    .nodes
                    .get(id)
                    .is_some_and(|parent| parent.owner_id == owner_id)
            })
            .collect())
    }
}

impl RuleStore for MemoryStore {
    fn get_rule(&self, id: RuleId, requesting_user: UserId) -> Result<Option<Rule>> {
        Ok(self
            .read()?
            .rules
            .get(&id)
            .filter(|rule| rule.is_visible_to(requesting_user))
            .cloned())
    }
}

impl RuleWriter for MemoryStore {
    fn list_rules(
        &self,
        user: UserId,
        include_public: bool,
        include_system: bool,
    ) -> Result<Vec<Rule>> {
        let state = self.read()?;
        let mut rules: Vec<Rule> = state
            .rules
            .values()
            .filter(|r| {
                r.owner_id == user || (include_public && r.is_public) || (include_system && r.is_system)
            })
            .cloned()
            .collect();
        rules.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(rules)
    }

    fn insert_rule(&self, rule: Rule) -> Result<Rule> {
        self.write()?.rules.insert(rule.id, rule.clone());
        Ok(rule)
    }

    fn replace_rule(&self, rule: Rule) -> Result<Rule> {
        let mut state = self.write()?;
        match state.rules.get_mut(&rule.id) {
            Some(slot) => {
                *slot = rule.clone();
                Ok(rule)
            }
            None => Err(StoreError::RuleNotFound(rule.id)),
        }
    }

    fn remove_rule(&self, id: RuleId) -> Result<bool> {
        Ok(self.write()?.rules.remove(&id).is_some())
    }
}

impl SmartFolderWriter for MemoryStore {
    fn attach_rule(&self, folder_id: NodeId, rule_id: RuleId) -> Result<()> {
        let mut state = self.write()?;
        let node = state
            .nodes
            .get_mut(&folder_id)
            .ok_or(StoreError::NodeNotFound(folder_id))?;
        match &mut node.facet {
            NodeFacet::SmartFolder(folder) => {
                folder.rule_id = Some(rule_id);
                Ok(())
            }
            _ => Err(StoreError::NotASmartFolder(folder_id)),
        }
    }
}
