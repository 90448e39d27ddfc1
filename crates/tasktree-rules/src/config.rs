//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ordering::{default_order, OrderBy};

/// Tunables for [`crate::RulesEngine`].
///
/// Every field has a default, so a YAML document only needs the keys it
/// changes:
///
/// ```yaml
/// max_rule_depth: 4
/// default_order:
///   - field: due_at
///   - field: priority
///     dir: desc
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How many `saved_filter` references may nest before the innermost
    /// one matches nothing.
    pub max_rule_depth: usize,
    /// Result cap for previews when the caller gives none.
    pub preview_limit: usize,
    /// Result order when the caller gives none.
    pub default_order: Vec<OrderBy>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_rule_depth: 8,
            preview_limit: 10,
            default_order: default_order(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(EngineConfig::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }
}
