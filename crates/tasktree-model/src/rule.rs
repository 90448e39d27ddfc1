//! Rules, rule bodies and conditions.
//!
//! A [`Rule`] is a named, ownable document wrapping a [`RuleData`] body. The
//! body is a flat list of [`Condition`]s joined by a single [`Logic`].
//! Condition `type` and `operator` stay raw strings here: a rule persisted
//! before a condition type was retired must still load, so interpreting them
//! is left to the rules engine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};

use crate::{RuleId, UserId};

/// How the conditions of a rule combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Logic {
    /// Every condition must hold.
    #[default]
    #[serde(rename = "AND")]
    And,
    /// At least one condition must hold.
    #[serde(rename = "OR")]
    Or,
}

impl Logic {
    pub fn as_str(self) -> &'static str {
        match self {
            Logic::And => "AND",
            Logic::Or => "OR",
        }
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed, parameterized predicate inside a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Condition type, e.g. `task_status` or `saved_filter`.
    #[serde(rename = "type", default, deserialize_with = "deserialize_text")]
    pub kind: String,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub operator: String,
    #[serde(default, deserialize_with = "deserialize_values")]
    pub values: Vec<String>,
}

impl Condition {
    pub fn new<I, V>(kind: impl Into<String>, operator: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Condition {
            kind: kind.into(),
            operator: operator.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a condition whose operator takes no values.
    pub fn bare(kind: impl Into<String>, operator: impl Into<String>) -> Self {
        Condition::new(kind, operator, Vec::<String>::new())
    }
}

/// The `{conditions, logic}` body of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuleData {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub logic: Logic,
}

impl RuleData {
    pub fn new(logic: Logic) -> Self {
        RuleData {
            conditions: Vec::new(),
            logic,
        }
    }

    pub fn all(conditions: Vec<Condition>) -> Self {
        RuleData {
            conditions,
            logic: Logic::And,
        }
    }

    pub fn any(conditions: Vec<Condition>) -> Self {
        RuleData {
            conditions,
            logic: Logic::Or,
        }
    }

    pub fn with(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// A stored, named rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub owner_id: UserId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rule_data: RuleData,
    #[serde(default)]
    pub is_public: bool,
    /// System rules are readable by everyone and editable by nobody.
    #[serde(default)]
    pub is_system: bool,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl Rule {
    pub fn new(id: RuleId, owner_id: UserId, name: impl Into<String>, rule_data: RuleData) -> Self {
        let now = Utc::now();
        Rule {
            id,
            owner_id,
            name: name.into(),
            description: None,
            rule_data,
            is_public: false,
            is_system: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Owner, public and system rules are visible to a user.
    pub fn is_visible_to(&self, user: UserId) -> bool {
        self.owner_id == user || self.is_public || self.is_system
    }

    /// Only the owner may edit, and never a system rule.
    pub fn is_editable_by(&self, user: UserId) -> bool {
        self.owner_id == user && !self.is_system
    }
}

/// Input for creating a rule.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NewRule {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rule_data: RuleData,
    #[serde(default)]
    pub is_public: bool,
}

/// Partial update of a rule; `None` leaves a field untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RulePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub rule_data: Option<RuleData>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

// Clients send day counts as numbers as often as strings; keep them all as
// strings so operators parse them uniformly.
fn deserialize_values<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ValuesVisitor;

    impl<'de> Visitor<'de> for ValuesVisitor {
        type Value = Vec<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list of strings, numbers or booleans")
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut values = Vec::new();
            while let Some(item) = seq.next_element::<serde_json::Value>()? {
                match item {
                    serde_json::Value::String(s) => values.push(s),
                    serde_json::Value::Number(n) => values.push(n.to_string()),
                    serde_json::Value::Bool(b) => values.push(b.to_string()),
                    serde_json::Value::Null => values.push(String::new()),
                    other => {
                        return Err(de::Error::invalid_type(
                            de::Unexpected::Other(json_kind(&other)),
                            &self,
                        ))
                    }
                }
            }
            Ok(values)
        }
    }

    deserializer.deserialize_any(ValuesVisitor)
}

// A missing, null or non-string type or operator reads as empty so the
// engine drops that one condition instead of rejecting the whole body.
fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        _ => Ok(String::new()),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Array(_) => "nested list",
        serde_json::Value::Object(_) => "object",
        _ => "scalar",
    }
}
