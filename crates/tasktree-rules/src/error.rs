//! Error types for the rules crate.

use thiserror::Error;

use tasktree_model::{NodeId, RuleId, StoreError};

use crate::validate::ValidationError;

/// Errors raised by the engine and the rule library.
///
/// Malformed conditions never surface here: evaluation degrades them to "no
/// contribution". Only store failures, lookups the caller asked for by id,
/// and rejected saves are errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A rule body failed validation; nothing was persisted.
    #[error("invalid rule: {}", join(.0))]
    Invalid(Vec<ValidationError>),

    /// The rule does not exist or the user may not see it.
    #[error("rule '{0}' not found or access denied")]
    RuleNotFound(RuleId),

    /// The rule does not exist or the user may not change it.
    #[error("rule '{0}' not found or cannot be edited")]
    RuleNotEditable(RuleId),

    /// The node is missing, not a smart folder, or not owned by the user.
    #[error("smart folder '{0}' not found")]
    FolderNotFound(NodeId),

    /// A smart folder cannot be migrated to a rule entity.
    #[error("smart folder '{0}' either has no legacy rules or already has a rule_id")]
    Migration(NodeId),

    /// A configuration document could not be read.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_yaml::Error),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A string did not name a known operator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown operator '{0}'")]
pub struct UnknownOperator(pub String);

/// A string did not name a known condition type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown condition type '{0}'")]
pub struct UnknownConditionType(pub String);

/// A string was not a valid `field[:dir]` ordering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid order '{0}', expected <field>[:asc|desc]")]
pub struct InvalidOrder(pub String);

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
