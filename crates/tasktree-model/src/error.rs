//! Error types for the model crate.

use thiserror::Error;

use crate::{NodeId, RuleId};

/// Errors raised by node and rule stores.
///
/// Store errors are fatal for an evaluation: the engine propagates them to
/// its caller and never retries.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A lock guarding store state was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,

    /// The requested node does not exist.
    #[error("node '{0}' not found")]
    NodeNotFound(NodeId),

    /// The requested rule does not exist.
    #[error("rule '{0}' not found")]
    RuleNotFound(RuleId),

    /// The node exists but is not a smart folder.
    #[error("node '{0}' is not a smart folder")]
    NotASmartFolder(NodeId),

    /// A snapshot document could not be read.
    #[error("invalid snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// A string did not name a known variant of a model enum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        UnknownVariant {
            kind,
            value: value.to_string(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
