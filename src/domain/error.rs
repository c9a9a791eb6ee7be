//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::NodeId;

/// Domain errors represent rejected tree mutations.
/// A rejected mutation never changes the snapshot it was applied to.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("node not found: {0}")]
    NotFound(NodeId),

    #[error("root node cannot be deleted or moved: {0}")]
    RootProtected(NodeId),

    #[error("cannot move {active} into its own subtree at {target}")]
    CycleDetected { active: NodeId, target: NodeId },

    #[error("duplicate node id: {0}")]
    DuplicateId(NodeId),

    #[error("root node has no siblings to insert beside: {0}")]
    RootHasNoSiblings(NodeId),

    #[error("name must not be empty")]
    EmptyName,
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
