//! Error types for soft-body operations.

use crate::types::{BodyId, NodeId};

/// Errors returned by structural soft-body operations.
///
/// Per-frame degradations (degenerate springs, misses, non-finite nodes) are
/// not errors; they are logged and skipped.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum JellyError {
    #[error("Body {0} does not exist")]
    BodyNotFound(BodyId),

    #[error("Node {node:?} does not exist in {body}")]
    NodeNotFound { body: BodyId, node: NodeId },

    #[error("{body} has {count} nodes, at least 2 are needed to split")]
    TooFewNodes { body: BodyId, count: usize },

    #[error("Cannot connect {0} to itself")]
    SameBody(BodyId),

    #[error("Invalid body template: {0}")]
    InvalidTemplate(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
