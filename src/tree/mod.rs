//! The balanced-tree algorithm.
//!
//! [`BTree`] operates purely in terms of [`NodeHandle`]/[`NodePosition`] and
//! the [`NodeStorage`] capability set, so the same search, split, and removal
//! code runs against any backend. It is a "sparse" B-tree: child links of a
//! node may independently be null, and nodes are allowed to shrink below
//! half-occupancy without sibling merges: removal stays purely local at the
//! cost of looser space bounds.

mod cursor;
mod insert;
mod remove;
mod search;


pub use cursor::Iter;
pub use search::EqualRange;

use std::marker::PhantomData;

use crate::compare::{KeyComparator, NaturalOrder};
use crate::error::{Result, TreeError};
use crate::node::{NodeHandle, NodePosition};
use crate::storage::{HeapStorage, NodeStorage};

/// Fan-out used by [`BTree::default`].
pub const DEFAULT_ORDER: u32 = 16;

/// Order-configurable B-tree over a pluggable storage backend.
///
/// Equal keys are permitted and kept adjacent, so the tree doubles as a
/// multimap: [`BTree::put`] overwrites, [`BTree::add`] appends a duplicate.
pub struct BTree<K, V, C = NaturalOrder, S = HeapStorage<K, V>> {
    pub(crate) store: S,
    pub(crate) compare: C,
    order: u32,
    height: u32,
    marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> BTree<K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    /// A tree of the given fan-out over fresh in-memory storage. An `order`
    /// of zero is clamped to one.
    pub fn new(order: u32) -> Self {
        Self::with_parts(HeapStorage::new(), NaturalOrder, order)
    }
}

impl<K, V> Default for BTree<K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_ORDER)
    }
}

impl<K, V, C, S> BTree<K, V, C, S>
where
    K: Clone,
    V: Clone,
    C: KeyComparator<K>,
    S: NodeStorage<K, V>,
{
    /// A tree with a caller-supplied comparator over default storage.
    pub fn with_comparator(compare: C, order: u32) -> Self
    where
        S: Default,
    {
        Self::with_parts(S::default(), compare, order)
    }

    /// A tree over caller-supplied storage. If the backend already holds a
    /// root (a reopened tree), it is adopted as-is and [`BTree::height`]
    /// restarts from the adopted tree's measured depth; otherwise an empty
    /// root node is created. The root node exists for the whole lifetime of
    /// the tree, even when the tree is logically empty.
    pub fn with_parts(mut store: S, compare: C, order: u32) -> Self {
        let order = order.max(1);
        let mut height = 1;
        let root = store.root();
        if root.is_null() {
            let root = store.create_node(None);
            if !root.is_null() {
                store.set_root(root);
            }
        } else {
            height = Self::measure_depth(&store, root);
        }
        BTree {
            store,
            compare,
            order,
            height,
            marker: PhantomData,
        }
    }

    /// Whether the tree has a usable root. Only ever false when root
    /// allocation failed at construction.
    pub fn is_valid(&self) -> bool {
        !self.store.root().is_null()
    }

    /// The configured fan-out.
    pub fn order(&self) -> u32 {
        self.order
    }

    /// Levels the tree has grown to. Removal never shrinks this; it reports
    /// the historical maximum depth.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of items in the tree, read from the root's cached subtree
    /// count.
    pub fn len(&self) -> u64 {
        self.count_in(self.store.root())
    }

    /// Whether the tree holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrows the storage backend.
    pub fn storage(&self) -> &S {
        &self.store
    }

    /// Mutably borrows the storage backend. Structural edits through this
    /// reference are the caller's responsibility.
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Consumes the tree and hands back its backend, e.g. to persist or
    /// reopen it later via [`BTree::with_parts`].
    pub fn into_storage(self) -> S {
        self.store
    }

    /// The key/value pair at `pos`, or `None` if the position is null or no
    /// longer names a live slot.
    pub fn entry_at(&self, pos: NodePosition) -> Option<(K, V)> {
        if pos.is_null() {
            return None;
        }
        let data = self.store.read_node(pos.node)?;
        let item = pos.item as usize;
        let entry = (item < data.len()).then(|| (data.keys[item].clone(), data.values[item].clone()));
        self.store.release_node(pos.node);
        entry
    }

    pub(crate) fn count_in(&self, node: NodeHandle) -> u64 {
        if node.is_null() {
            return 0;
        }
        let Some(data) = self.store.read_node(node) else {
            return 0;
        };
        let total = data.total_count;
        self.store.release_node(node);
        total
    }

    /// Deepest level reachable from `node`. Best-effort: an unreadable node
    /// counts as a leaf.
    fn measure_depth(store: &S, node: NodeHandle) -> u32 {
        if node.is_null() {
            return 0;
        }
        let Some(data) = store.read_node(node) else {
            return 1;
        };
        let mut children = Vec::with_capacity(data.links.len() + 1);
        children.push(data.link_first);
        children.extend(data.links.iter().copied());
        store.release_node(node);
        let below = children
            .into_iter()
            .map(|child| Self::measure_depth(store, child))
            .max()
            .unwrap_or(0);
        1 + below
    }

    pub(crate) fn root_or_invalid(&self) -> Result<NodeHandle> {
        let root = self.store.root();
        if root.is_null() {
            Err(TreeError::Corruption("tree has no root node"))
        } else {
            Ok(root)
        }
    }
}
