//! Rule management.
//!
//! [`RuleLibrary`] is the write side of rules: create, update, delete and
//! duplicate under the ownership rules, plus moving smart folders off their
//! legacy inline rules onto rule entities.
//!
//! Visibility and editability:
//!
//! | Operation | Allowed for |
//! |-----------|-------------|
//! | `get`, `duplicate` | owner, or anyone for public and system rules |
//! | `update`, `delete` | owner, never for system rules |
//!
//! A rule the user may not act on is reported exactly like a missing one.

use std::sync::Arc;

use tasktree_model::{
    Logic, NewRule, Node, NodeId, Rule, RuleData, RuleId, RulePatch, RuleWriter, SmartFolderFacet,
    SmartFolderWriter, UserId,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::{EngineError, Result};
use crate::validate::{validate, validate_name, ValidationError};

pub struct RuleLibrary<'s, S: ?Sized> {
    store: &'s S,
    clock: Arc<dyn Clock>,
}

impl<'s, S> RuleLibrary<'s, S>
where
    S: RuleWriter + ?Sized,
{
    pub fn new(store: &'s S) -> Self {
        RuleLibrary {
            store,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Creates a private or public rule owned by `owner`.
    ///
    /// The body is validated first; nothing is stored if it fails. Rules
    /// created here are never system rules.
    pub fn create(&self, owner: UserId, new: NewRule) -> Result<Rule> {
        check(Some(&new.name), Some(&new.rule_data))?;
        let now = self.clock.now();
        let rule = Rule {
            id: Uuid::new_v4(),
            owner_id: owner,
            name: new.name,
            description: new.description,
            rule_data: new.rule_data,
            is_public: new.is_public,
            is_system: false,
            created_at: now,
            updated_at: now,
        };
        let rule = self.store.insert_rule(rule)?;
        info!(rule_id = %rule.id, %owner, "rule created");
        Ok(rule)
    }

    /// Fetches a rule visible to `user`.
    pub fn get(&self, id: RuleId, user: UserId) -> Result<Rule> {
        self.store
            .get_rule(id, user)?
            .ok_or(EngineError::RuleNotFound(id))
    }

    /// Rules owned by `user`, newest first, optionally with public and
    /// system rules mixed in.
    pub fn list(&self, user: UserId, include_public: bool, include_system: bool) -> Result<Vec<Rule>> {
        Ok(self.store.list_rules(user, include_public, include_system)?)
    }

    /// Applies a partial update. Only the owner of a non-system rule may.
    pub fn update(&self, id: RuleId, user: UserId, patch: RulePatch) -> Result<Rule> {
        let mut rule = self.editable(id, user)?;
        check(patch.name.as_ref(), patch.rule_data.as_ref())?;

        if let Some(name) = patch.name {
            rule.name = name;
        }
        if let Some(description) = patch.description {
            rule.description = Some(description);
        }
        if let Some(rule_data) = patch.rule_data {
            rule.rule_data = rule_data;
        }
        if let Some(is_public) = patch.is_public {
            rule.is_public = is_public;
        }
        rule.updated_at = self.clock.now();
        Ok(self.store.replace_rule(rule)?)
    }

    /// Deletes a rule. Only the owner of a non-system rule may.
    pub fn delete(&self, id: RuleId, user: UserId) -> Result<()> {
        self.editable(id, user)?;
        if !self.store.remove_rule(id)? {
            return Err(EngineError::RuleNotFound(id));
        }
        info!(rule_id = %id, %user, "rule deleted");
        Ok(())
    }

    /// Copies any rule visible to `user` into a new private rule they own.
    ///
    /// The copy is named `"<name> (Copy)"` unless a name is given.
    pub fn duplicate(&self, id: RuleId, user: UserId, new_name: Option<String>) -> Result<Rule> {
        let source = self.get(id, user)?;
        let name = new_name.unwrap_or_else(|| format!("{} (Copy)", source.name));
        self.create(
            user,
            NewRule {
                name,
                description: source.description,
                rule_data: source.rule_data,
                is_public: false,
            },
        )
    }

    fn editable(&self, id: RuleId, user: UserId) -> Result<Rule> {
        self.store
            .get_rule(id, user)?
            .filter(|rule| rule.is_editable_by(user))
            .ok_or(EngineError::RuleNotEditable(id))
    }

    /// The body a smart folder evaluates with.
    ///
    /// An attached rule wins when it can be fetched; otherwise the legacy
    /// inline rules, otherwise an empty AND rule.
    pub fn effective_rule_data(&self, owner: UserId, folder: &SmartFolderFacet) -> Result<RuleData> {
        if let Some(rule_id) = folder.rule_id {
            if let Some(rule) = self.store.get_rule(rule_id, owner)? {
                return Ok(rule.rule_data);
            }
        }
        Ok(folder
            .rules
            .clone()
            .unwrap_or_else(|| RuleData::new(Logic::And)))
    }
}

impl<'s, S> RuleLibrary<'s, S>
where
    S: RuleWriter + SmartFolderWriter + ?Sized,
{
    /// Moves a smart folder's legacy inline rules into a rule entity.
    ///
    /// The new rule is private, owned by the folder's owner and named
    /// `"<title> Rule"` unless a name is given. The legacy rules stay on the
    /// folder; the new `rule_id` takes precedence over them from now on.
    pub fn migrate_smart_folder(
        &self,
        folder_id: NodeId,
        owner: UserId,
        rule_name: Option<String>,
    ) -> Result<Rule> {
        let node = self
            .store
            .get_node(folder_id)?
            .filter(|node| node.owner_id == owner)
            .ok_or(EngineError::FolderNotFound(folder_id))?;
        self.migrate(&node, rule_name)
    }

    /// Migrates every smart folder of `owner` that still relies on legacy
    /// rules. Folders that fail are logged and skipped.
    pub fn migrate_all(&self, owner: UserId) -> Result<Vec<Rule>> {
        let mut migrated = Vec::new();
        for node in self.store.list_owned_nodes(owner)? {
            let legacy = node
                .smart_folder()
                .is_some_and(|f| f.rule_id.is_none() && f.rules.is_some());
            if !legacy {
                continue;
            }
            match self.migrate(&node, None) {
                Ok(rule) => migrated.push(rule),
                Err(EngineError::Store(e)) => return Err(e.into()),
                Err(e) => warn!(folder_id = %node.id, error = %e, "smart folder not migrated"),
            }
        }
        Ok(migrated)
    }

    fn migrate(&self, node: &Node, rule_name: Option<String>) -> Result<Rule> {
        let folder = node
            .smart_folder()
            .ok_or(EngineError::FolderNotFound(node.id))?;
        let (None, Some(rules)) = (folder.rule_id, &folder.rules) else {
            return Err(EngineError::Migration(node.id));
        };

        // Legacy bodies predate validation and are carried over as they are.
        let now = self.clock.now();
        let rule = Rule {
            id: Uuid::new_v4(),
            owner_id: node.owner_id,
            name: rule_name.unwrap_or_else(|| format!("{} Rule", node.title)),
            description: Some(format!("Migrated from smart folder '{}'", node.title)),
            rule_data: rules.clone(),
            is_public: false,
            is_system: false,
            created_at: now,
            updated_at: now,
        };
        let rule = self.store.insert_rule(rule)?;
        self.store.attach_rule(node.id, rule.id)?;
        info!(folder_id = %node.id, rule_id = %rule.id, "smart folder migrated");
        Ok(rule)
    }
}

fn check(name: Option<&String>, data: Option<&RuleData>) -> Result<()> {
    let mut errors: Vec<ValidationError> = name.and_then(|n| validate_name(n)).into_iter().collect();
    if let Some(data) = data {
        errors.extend(validate(data));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Invalid(errors))
    }
}
