//! Positional iteration over the tree.
//!
//! A [`NodePosition`] works as an external cursor: [`BTree::move_to_next`]
//! and [`BTree::move_to_previous`] step it through the tree in key order,
//! descending into child links when present and otherwise walking parent
//! back-links until an ancestor still has items to the side. The null
//! position is the shared before-first/after-last sentinel: advancing it
//! forward yields the first entry, backward the last, so range scans can
//! start from "nowhere".

use crate::compare::KeyComparator;
use crate::node::{NodeHandle, NodePosition};
use crate::storage::NodeStorage;
use crate::tree::BTree;

impl<K, V, C, S> BTree<K, V, C, S>
where
    K: Clone,
    V: Clone,
    C: KeyComparator<K>,
    S: NodeStorage<K, V>,
{
    /// Position of the smallest entry, `None` on an empty tree.
    pub fn first(&self) -> Option<NodePosition> {
        let root = self.store.root();
        if root.is_null() {
            return None;
        }
        self.first_in(root)
    }

    /// Position of the largest entry, `None` on an empty tree.
    pub fn last(&self) -> Option<NodePosition> {
        let root = self.store.root();
        if root.is_null() {
            return None;
        }
        self.last_in(root)
    }

    /// In-order successor of `pos`; the null position yields
    /// [`BTree::first`]. Returns `None` at the end of the tree or when `pos`
    /// has gone stale.
    pub fn move_to_next(&self, pos: NodePosition) -> Option<NodePosition> {
        if pos.is_null() {
            return self.first();
        }
        let data = self.store.read_node(pos.node)?;
        let count = data.len() as u32;
        if pos.item >= count {
            self.store.release_node(pos.node);
            return None;
        }
        let down = data.links[pos.item as usize];
        let parent = data.parent;
        self.store.release_node(pos.node);
        if !down.is_null() {
            return self.first_in(down);
        }
        if pos.item + 1 < count {
            return Some(NodePosition::new(pos.node, pos.item + 1));
        }
        self.climb_forward(pos.node, parent)
    }

    /// In-order predecessor of `pos`; the null position yields
    /// [`BTree::last`]. Returns `None` at the start of the tree or when
    /// `pos` has gone stale.
    pub fn move_to_previous(&self, pos: NodePosition) -> Option<NodePosition> {
        if pos.is_null() {
            return self.last();
        }
        let data = self.store.read_node(pos.node)?;
        let count = data.len() as u32;
        if pos.item >= count {
            self.store.release_node(pos.node);
            return None;
        }
        let down = data.link_before(pos.item as usize);
        let parent = data.parent;
        self.store.release_node(pos.node);
        if !down.is_null() {
            return self.last_in(down);
        }
        if pos.item > 0 {
            return Some(NodePosition::new(pos.node, pos.item - 1));
        }
        self.climb_backward(pos.node, parent)
    }

    /// Iterator over all entries in key order.
    pub fn iter(&self) -> Iter<'_, K, V, C, S> {
        Iter {
            tree: self,
            pos: NodePosition::NULL,
        }
    }

    /// Leftmost item position in the subtree under `from`.
    pub(crate) fn first_in(&self, from: NodeHandle) -> Option<NodePosition> {
        let mut node = from;
        loop {
            let data = self.store.read_node(node)?;
            let first = data.link_first;
            let count = data.len();
            let parent = data.parent;
            self.store.release_node(node);
            if !first.is_null() {
                node = first;
                continue;
            }
            if count == 0 {
                // Splits and removals can leave an empty childless node on
                // the descent path; the next item in order lives in an
                // ancestor slot.
                return self.climb_forward(node, parent);
            }
            return Some(NodePosition::new(node, 0));
        }
    }

    /// Rightmost item position in the subtree under `from`.
    pub(crate) fn last_in(&self, from: NodeHandle) -> Option<NodePosition> {
        let mut node = from;
        loop {
            let data = self.store.read_node(node)?;
            let count = data.len();
            let parent = data.parent;
            let next = if count == 0 {
                data.link_first
            } else {
                data.links[count - 1]
            };
            self.store.release_node(node);
            if !next.is_null() {
                node = next;
                continue;
            }
            if count == 0 {
                return self.climb_backward(node, parent);
            }
            return Some(NodePosition::new(node, count as u32 - 1));
        }
    }

    /// Walks parent links upward after exhausting a node rightward, looking
    /// for the ancestor slot just past the link we emerged from.
    fn climb_forward(&self, start: NodeHandle, start_parent: NodeHandle) -> Option<NodePosition> {
        let mut node = start;
        let mut parent = start_parent;
        loop {
            if parent.is_null() {
                return None;
            }
            let data = self.store.read_node(parent)?;
            let grand = data.parent;
            let count = data.len();
            let outcome = if data.link_first == node {
                // A childless-slot node emptied by removal may sit between
                // levels with no items of its own; skip past it.
                (count > 0).then(|| NodePosition::new(parent, 0))
            } else {
                match data.links.iter().position(|&link| link == node) {
                    Some(slot) if slot + 1 < count => {
                        Some(NodePosition::new(parent, slot as u32 + 1))
                    }
                    Some(_) => None,
                    None => {
                        self.store.release_node(parent);
                        return None;
                    }
                }
            };
            self.store.release_node(parent);
            match outcome {
                Some(next) => return Some(next),
                None => {
                    node = parent;
                    parent = grand;
                }
            }
        }
    }

    /// Mirror of [`BTree::climb_forward`] for leftward exhaustion: land on
    /// the ancestor slot whose right link we emerged from.
    fn climb_backward(&self, start: NodeHandle, start_parent: NodeHandle) -> Option<NodePosition> {
        let mut node = start;
        let mut parent = start_parent;
        loop {
            if parent.is_null() {
                return None;
            }
            let data = self.store.read_node(parent)?;
            let grand = data.parent;
            if data.link_first == node {
                self.store.release_node(parent);
                node = parent;
                parent = grand;
                continue;
            }
            let hit = data.links.iter().position(|&link| link == node);
            self.store.release_node(parent);
            return hit.map(|slot| NodePosition::new(parent, slot as u32));
        }
    }
}

/// Ordered iterator over a tree's entries, driven by the cursor walk.
pub struct Iter<'a, K, V, C, S> {
    tree: &'a BTree<K, V, C, S>,
    pos: NodePosition,
}

impl<K, V, C, S> Iterator for Iter<'_, K, V, C, S>
where
    K: Clone,
    V: Clone,
    C: KeyComparator<K>,
    S: NodeStorage<K, V>,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        let next = self.tree.move_to_next(self.pos)?;
        self.pos = next;
        self.tree.entry_at(next)
    }
}
