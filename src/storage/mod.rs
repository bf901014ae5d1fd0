//! The pluggable node storage seam.
//!
//! The tree engine speaks to its backend exclusively through [`NodeStorage`].
//! The default [`HeapStorage`] keeps decoded nodes in a slab; a persisted
//! backend would implement the same capability set over a paged file, keyed
//! by offset. The engine never assumes a handle stays valid after
//! `delete_node`, and never holds two overlapping checkouts of the same
//! handle, so a backend may back each node with a single-owner buffer.

mod heap;

pub use heap::HeapStorage;

use crate::node::{NodeContent, NodeHandle};

/// Capability set a storage backend provides to the tree engine.
pub trait NodeStorage<K, V> {
    /// Allocates a new node, optionally seeded with `content` (a split moves
    /// existing data into the new sibling this way). Returns
    /// [`NodeHandle::NULL`] on allocation failure.
    fn create_node(&mut self, content: Option<NodeContent<K, V>>) -> NodeHandle;

    /// Releases storage for a node. Fails on the null handle or a handle
    /// that is not live.
    fn delete_node(&mut self, node: NodeHandle) -> bool;

    /// Checks out an owned working copy of the node's contents. Every
    /// successful checkout is paired with a [`NodeStorage::release_node`]
    /// call by the engine, including on early-error paths. Returns `None` if
    /// the node does not exist or cannot be read.
    fn read_node(&self, node: NodeHandle) -> Option<NodeContent<K, V>>;

    /// Persists contents back to the node. A change is durable only once
    /// this has returned `true`.
    fn write_node(&mut self, node: NodeHandle, content: &NodeContent<K, V>) -> bool;

    /// Returns the checkout taken by [`NodeStorage::read_node`]. A paging
    /// backend unpins its buffer here; the in-memory backend has nothing to
    /// do, which is the default.
    fn release_node(&self, node: NodeHandle) {
        let _ = node;
    }

    /// The current root handle, null only if the backend holds no tree yet.
    fn root(&self) -> NodeHandle;

    /// Repoints the root handle. Fails on the null handle.
    fn set_root(&mut self, node: NodeHandle) -> bool;
}
