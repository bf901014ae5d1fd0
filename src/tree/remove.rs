//! Removal: local slot deletion, successor pull-up, and node reclamation.
//!
//! There is deliberately no merge-on-underflow rebalancing between siblings:
//! nodes shrink in place and are only reclaimed once empty. Deletion stays
//! purely local at the cost of looser occupancy bounds.

use tracing::trace;

use crate::compare::KeyComparator;
use crate::error::{Result, TreeError};
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
    /// Removes the item at `pos`.
    ///
    /// The removal shape is decided by which bracketing subtrees actually
    /// hold items, not by raw link nullness: splits at small orders can
    /// leave zero-item nodes linked under a slot, and those count as absent
    /// here. A slot with no occupied subtree on either side is shifted out
    /// directly, and its dead brackets are deleted. A slot with an occupied
    /// right subtree swaps in its in-order successor and removes the
    /// successor's slot instead (which bottoms out at the no-subtree case).
    /// A slot with only an occupied left subtree keeps it in place. A node
    /// emptied of items and links is unlinked from its parent and deleted,
    /// unless it is the root.
    pub fn remove_at(&mut self, pos: NodePosition) -> Result<()> {
        if pos.is_null() {
            return Err(TreeError::InvalidPosition);
        }
        let item = pos.item as usize;
        let Some(probe) = self.store.read_node(pos.node) else {
            return Err(TreeError::ReadFailed(pos.node));
        };
        let count = probe.len();
        if item >= count {
            self.store.release_node(pos.node);
            return Err(TreeError::InvalidPosition);
        }
        let left = probe.link_before(item);
        let right = probe.links[item];
        self.store.release_node(pos.node);
        let root = self.store.root();
        let left_occupied = self.link_occupied(left)?;
        let right_occupied = self.link_occupied(right)?;

        if left_occupied && right_occupied {
            // Both bracketing subtrees hold items: pull the in-order
            // successor up into this slot, then remove the successor where
            // it came from. The right subtree is occupied, so the successor
            // exists and the recursion terminates at a subtree-less slot.
            let next = self
                .move_to_next(pos)
                .ok_or(TreeError::Corruption("interior item has no successor"))?;
            if next.node == pos.node {
                return Err(TreeError::Corruption("successor resolved to the same node"));
            }
            let (succ_key, succ_value) = self
                .entry_at(next)
                .ok_or(TreeError::Corruption("successor slot unreadable"))?;
            let Some(mut data) = self.store.read_node(pos.node) else {
                return Err(TreeError::ReadFailed(pos.node));
            };
            if item >= data.len() {
                self.store.release_node(pos.node);
                return Err(TreeError::InvalidPosition);
            }
            data.keys[item] = succ_key;
            data.values[item] = succ_value;
            let ok = self.store.write_node(pos.node, &data);
            self.store.release_node(pos.node);
            if !ok {
                return Err(TreeError::WriteFailed(pos.node));
            }
            return self.remove_at(next);
        }

        // Brackets over drained subtrees are dead weight; reclaim them along
        // with the slot.
        if !left.is_null() && !left_occupied {
            self.delete_subtree(left);
        }
        if !right.is_null() && !right_occupied {
            self.delete_subtree(right);
        }

        let Some(mut data) = self.store.read_node(pos.node) else {
            return Err(TreeError::ReadFailed(pos.node));
        };
        if item >= data.len() {
            self.store.release_node(pos.node);
            return Err(TreeError::InvalidPosition);
        }
        if !left_occupied {
            // Splice the right subtree (or null) into the left bracket of
            // the vacated slot.
            let spliced = if right_occupied {
                right
            } else {
                NodeHandle::NULL
            };
            if item == 0 {
                data.link_first = spliced;
            } else {
                data.links[item - 1] = spliced;
            }
        }
        data.keys.remove(item);
        data.values.remove(item);
        data.links.remove(item);
        data.total_count -= 1;

        if data.is_empty() && data.link_first.is_null() && pos.node != root {
            // Node is spent; unlink it instead of writing back an empty
            // shell. Storage still holds the pre-removal content, so the
            // unlink accounts for the removed item via the node's own total.
            self.store.release_node(pos.node);
            return self.reclaim_node(pos.node);
        }
        let parent = data.parent;
        let ok = self.store.write_node(pos.node, &data);
        self.store.release_node(pos.node);
        if !ok {
            return Err(TreeError::WriteFailed(pos.node));
        }
        self.bump_ancestor_counts(parent, -1);
        Ok(())
    }

    /// Removes one occurrence of `key`, returning its value. `Ok(None)` if
    /// the key is absent; the tree is left untouched.
    pub fn remove(&mut self, key: &K) -> Result<Option<V>> {
        let Some(pos) = self.find(key) else {
            return Ok(None);
        };
        let (_, value) = self.entry_at(pos).ok_or(TreeError::InvalidPosition)?;
        self.remove_at(pos)?;
        Ok(Some(value))
    }

    /// Removes every occurrence of `key`, returning how many were removed.
    pub fn remove_items(&mut self, key: &K) -> Result<u64> {
        let mut removed = 0;
        while let Some(pos) = self.find(key) {
            self.remove_at(pos)?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Removes every occurrence of `key`, returning the removed values.
    pub fn remove_items_with_values(&mut self, key: &K) -> Result<Vec<V>> {
        let mut values = Vec::new();
        while let Some(pos) = self.find(key) {
            let (_, value) = self.entry_at(pos).ok_or(TreeError::InvalidPosition)?;
            self.remove_at(pos)?;
            values.push(value);
        }
        Ok(values)
    }

    /// Removes the first entry under `key` whose value satisfies `matches`.
    /// Returns whether anything was removed.
    pub fn remove_with(&mut self, key: &K, matches: impl Fn(&V) -> bool) -> Result<bool> {
        match self.find_with(key, matches) {
            Some(pos) => {
                self.remove_at(pos)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes every entry under `key` whose value satisfies `matches`,
    /// returning how many were removed.
    pub fn remove_items_with(&mut self, key: &K, matches: impl Fn(&V) -> bool) -> Result<u64> {
        let mut removed = 0;
        while let Some(pos) = self.find_with(key, &matches) {
            self.remove_at(pos)?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Deletes every node except the root, resets the root to empty, and
    /// returns how many items were dropped.
    pub fn clear(&mut self) -> Result<u64> {
        let root = self.root_or_invalid()?;
        let Some(mut data) = self.store.read_node(root) else {
            return Err(TreeError::ReadFailed(root));
        };
        let total = data.total_count;
        let mut children = Vec::with_capacity(data.links.len() + 1);
        children.push(data.link_first);
        children.extend(data.links.iter().copied());
        data.keys.clear();
        data.values.clear();
        data.links.clear();
        data.link_first = NodeHandle::NULL;
        data.total_count = 0;
        let ok = self.store.write_node(root, &data);
        self.store.release_node(root);
        if !ok {
            return Err(TreeError::WriteFailed(root));
        }
        for child in children {
            self.delete_subtree(child);
        }
        trace!(target: "bough::reclaim", dropped = total, "cleared tree");
        Ok(total)
    }

    /// Whether `link` roots a subtree holding at least one item. Null links
    /// are unoccupied; a read failure surfaces as an error, since emptiness
    /// decides whether a subtree gets deleted.
    fn link_occupied(&self, link: NodeHandle) -> Result<bool> {
        if link.is_null() {
            return Ok(false);
        }
        let Some(data) = self.store.read_node(link) else {
            return Err(TreeError::ReadFailed(link));
        };
        let total = data.total_count;
        self.store.release_node(link);
        Ok(total > 0)
    }

    /// Unlinks an empty node from its parent, subtracts its (pre-removal)
    /// subtree count from every ancestor, and deletes it. A parent left with
    /// no items and no children by the unlink is reclaimed in turn.
    fn reclaim_node(&mut self, node: NodeHandle) -> Result<()> {
        let Some(data) = self.store.read_node(node) else {
            return Err(TreeError::ReadFailed(node));
        };
        let parent = data.parent;
        let total = data.total_count;
        self.store.release_node(node);
        if parent.is_null() {
            return Err(TreeError::Corruption("cannot reclaim the root node"));
        }

        let Some(mut content) = self.store.read_node(parent) else {
            return Err(TreeError::ReadFailed(parent));
        };
        if content.link_first == node {
            content.link_first = NodeHandle::NULL;
        } else {
            match content.links.iter().position(|&link| link == node) {
                Some(slot) => content.links[slot] = NodeHandle::NULL,
                None => {
                    self.store.release_node(parent);
                    return Err(TreeError::Corruption("node missing from its parent"));
                }
            }
        }
        content.total_count = content.total_count.saturating_sub(total);
        let parent_spent = content.is_empty() && content.link_first.is_null();
        let grand = content.parent;
        let ok = self.store.write_node(parent, &content);
        self.store.release_node(parent);
        if !ok {
            return Err(TreeError::WriteFailed(parent));
        }
        self.bump_ancestor_counts(grand, -(total as i64));
        self.delete_subtree(node);

        if parent_spent && parent != self.store.root() {
            return self.reclaim_node(parent);
        }
        Ok(())
    }

    /// Deletes `node` and everything below it. Best-effort: unreadable
    /// children are skipped, the handles themselves are still released.
    pub(crate) fn delete_subtree(&mut self, node: NodeHandle) {
        if node.is_null() {
            return;
        }
        if let Some(data) = self.store.read_node(node) {
            let mut children = Vec::with_capacity(data.links.len() + 1);
            children.push(data.link_first);
            children.extend(data.links.iter().copied());
            self.store.release_node(node);
            for child in children {
                self.delete_subtree(child);
            }
        }
        self.store.delete_node(node);
        trace!(target: "bough::reclaim", node = %node, "deleted node");
    }
}
