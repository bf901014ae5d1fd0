//! Node identity, cursor, and content types shared between the tree engine
//! and its storage backends.

use std::fmt;

use smallvec::SmallVec;

/// Inline capacity for per-node child-link arrays. Links are small `Copy`
/// values, so nodes up to this order avoid a separate heap allocation.
const INLINE_LINKS: usize = 8;

/// Child-link array of a node, one entry per key plus the leading
/// [`NodeContent::link_first`].
pub type LinkArray = SmallVec<[NodeHandle; INLINE_LINKS]>;

/// Opaque identity token for one node.
///
/// A handle is whatever the storage backend says it is: the in-memory slab
/// backend hands out slot indexes, a paged backend would hand out file
/// offsets. The raw value `0` is reserved as the distinguished null handle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodeHandle(u64);

impl NodeHandle {
    /// The "no such node" sentinel.
    pub const NULL: NodeHandle = NodeHandle(0);

    /// Wraps a raw backend value. `0` yields [`NodeHandle::NULL`].
    pub const fn from_raw(raw: u64) -> Self {
        NodeHandle(raw)
    }

    /// Returns the raw backend value.
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whether this is the null sentinel.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("null")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// One key/value slot inside a node, used as the external cursor type.
///
/// A position is a plain value, not a reference-counted handle: it stays
/// valid only while the node it names keeps that item. Operations consuming a
/// stale position fail softly instead of reading unrelated data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodePosition {
    /// Node the slot lives in.
    pub node: NodeHandle,
    /// Item index inside the node.
    pub item: u32,
}

impl NodePosition {
    /// The before-first/after-last sentinel. Advancing it forward lands on
    /// the first entry, advancing it backward lands on the last.
    pub const NULL: NodePosition = NodePosition {
        node: NodeHandle::NULL,
        item: 0,
    };

    /// Builds a position from its parts.
    pub const fn new(node: NodeHandle, item: u32) -> Self {
        NodePosition { node, item }
    }

    /// Whether this is the sentinel position.
    pub const fn is_null(self) -> bool {
        self.node.is_null()
    }
}

impl fmt::Display for NodePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("null")
        } else {
            write!(f, "{}#{}", self.node, self.item)
        }
    }
}

/// Decoded, mutable view of one node's contents.
///
/// `keys` and `values` are parallel and ordered; `links[i]` roots the subtree
/// holding keys between `keys[i]` and `keys[i + 1]`, while `link_first` roots
/// the subtree below `keys[0]`. Any link may independently be null; a slot is
/// a leaf slot when its bracketing link is null, not when the whole node is
/// childless. `parent` is a non-owning back-link (the owning relationship is
/// the parent's link array). `total_count` caches the number of items in the
/// whole subtree, this node's own items included.
#[derive(Clone, Debug)]
pub struct NodeContent<K, V> {
    /// Ordered keys, duplicates adjacent.
    pub keys: Vec<K>,
    /// Values parallel to `keys`.
    pub values: Vec<V>,
    /// Subtree holding all keys below `keys[0]`.
    pub link_first: NodeHandle,
    /// One child link per key.
    pub links: LinkArray,
    /// Back-link to the owning node, null for the root.
    pub parent: NodeHandle,
    /// Cached item count of the subtree rooted here.
    pub total_count: u64,
}

impl<K, V> NodeContent<K, V> {
    /// An empty node.
    pub fn new() -> Self {
        NodeContent {
            keys: Vec::new(),
            values: Vec::new(),
            link_first: NodeHandle::NULL,
            links: LinkArray::new(),
            parent: NodeHandle::NULL,
            total_count: 0,
        }
    }

    /// An empty node with room for `order` items.
    pub fn with_capacity(order: u32) -> Self {
        let order = order as usize;
        NodeContent {
            keys: Vec::with_capacity(order),
            values: Vec::with_capacity(order),
            link_first: NodeHandle::NULL,
            links: LinkArray::with_capacity(order),
            parent: NodeHandle::NULL,
            total_count: 0,
        }
    }

    /// Number of items held directly in this node.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the node holds no items of its own.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The child link bracketing `item` on the left: `link_first` for item 0,
    /// `links[item - 1]` otherwise. `item == len()` yields the trailing link.
    pub fn link_before(&self, item: usize) -> NodeHandle {
        if item == 0 {
            self.link_first
        } else {
            self.links[item - 1]
        }
    }
}

impl<K, V> Default for NodeContent<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
