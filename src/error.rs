//! Crate-wide error and result types.

use crate::node::NodeHandle;
use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, TreeError>;

/// Failures surfaced by tree operations.
///
/// Absence of a key is never an error; read-path operations report it through
/// `Option`/`bool` returns. `TreeError` covers backend failures and positions
/// that no longer name a live slot.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// The storage backend could not check out the node's contents.
    #[error("node {0} could not be read")]
    ReadFailed(NodeHandle),
    /// The storage backend could not persist the node's contents.
    #[error("node {0} could not be written")]
    WriteFailed(NodeHandle),
    /// The storage backend could not allocate a new node.
    #[error("node allocation failed")]
    AllocFailed,
    /// A `NodePosition` refers to a node or item that no longer exists.
    #[error("position is no longer valid")]
    InvalidPosition,
    /// The tree structure violates an invariant it relies on.
    #[error("corruption detected: {0}")]
    Corruption(&'static str),
}
