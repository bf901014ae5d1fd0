//! Insertion: in-place slot inserts and the node-split cascade.

use tracing::{trace, warn};

use crate::compare::KeyComparator;
use crate::error::{Result, TreeError};
use crate::node::{NodeContent, NodeHandle, NodePosition};
use crate::storage::NodeStorage;
use crate::tree::search::Descent;
use crate::tree::BTree;

/// Where the engine expects to insert within a node: a concrete slot on the
/// first level, or "just after this child link" while a split cascades into a
/// parent whose slots may have shifted.
pub(crate) enum InsertAnchor {
    Slot(u32),
    AfterChild(NodeHandle),
}

/// Which node the inserted pair ended up in after a split.
enum Landing {
    Left(usize),
    Right(usize),
    Promoted,
}

impl<K, V, C, S> BTree<K, V, C, S>
where
    K: Clone,
    V: Clone,
    C: KeyComparator<K>,
    S: NodeStorage<K, V>,
{
    /// Inserts `key`/`value`, overwriting the value of an existing equal key
    /// in place. Returns the entry's position and whether a structural
    /// insertion happened (`false` on overwrite).
    pub fn put(&mut self, key: K, value: V) -> Result<(NodePosition, bool)> {
        let root = self.root_or_invalid()?;
        match self.locate(root, &key)? {
            Descent::Found(pos) => {
                self.store_value_at(pos, value)?;
                Ok((pos, false))
            }
            Descent::Miss(pos) => {
                let at = self.insert_item_in_node(
                    pos.node,
                    InsertAnchor::Slot(pos.item),
                    key,
                    value,
                    NodeHandle::NULL,
                )?;
                Ok((at, true))
            }
        }
    }

    /// Inserts `key`/`value` unconditionally, after any existing duplicates
    /// of the key. This is the multimap entry point.
    pub fn add(&mut self, key: K, value: V) -> Result<NodePosition> {
        let root = self.root_or_invalid()?;
        let pos = self.insert_slot(root, &key)?;
        self.insert_item_in_node(
            pos.node,
            InsertAnchor::Slot(pos.item),
            key,
            value,
            NodeHandle::NULL,
        )
    }

    /// Inserts only if the key is absent. Returns `Ok(None)` when the key is
    /// already present; the stored value is left untouched.
    pub fn emplace(&mut self, key: K, value: V) -> Result<Option<NodePosition>> {
        let root = self.root_or_invalid()?;
        match self.locate(root, &key)? {
            Descent::Found(_) => Ok(None),
            Descent::Miss(pos) => self
                .insert_item_in_node(
                    pos.node,
                    InsertAnchor::Slot(pos.item),
                    key,
                    value,
                    NodeHandle::NULL,
                )
                .map(Some),
        }
    }

    /// Overwrites the value of an existing key. Returns `Ok(None)` when the
    /// key is absent; nothing is inserted.
    pub fn replace(&mut self, key: &K, value: V) -> Result<Option<NodePosition>> {
        let root = self.root_or_invalid()?;
        match self.locate(root, key)? {
            Descent::Found(pos) => {
                self.store_value_at(pos, value)?;
                Ok(Some(pos))
            }
            Descent::Miss(_) => Ok(None),
        }
    }

    fn store_value_at(&mut self, pos: NodePosition, value: V) -> Result<()> {
        let Some(mut data) = self.store.read_node(pos.node) else {
            return Err(TreeError::ReadFailed(pos.node));
        };
        let item = pos.item as usize;
        if item >= data.len() {
            self.store.release_node(pos.node);
            return Err(TreeError::InvalidPosition);
        }
        data.values[item] = value;
        let ok = self.store.write_node(pos.node, &data);
        self.store.release_node(pos.node);
        if ok {
            Ok(())
        } else {
            Err(TreeError::WriteFailed(pos.node))
        }
    }

    /// Structural insert of `(key, value, link)` into `node`.
    ///
    /// A node below capacity takes the triple in place. A full node splits
    /// around `half = count / 2`: depending on whether the insertion slot
    /// falls above, below, or exactly at the midpoint, the new item lands in
    /// the new right sibling, stays in the left node, or becomes the
    /// promoted pair itself. The promoted pair is then inserted into the
    /// parent by the same routine, so splits cascade; splitting the root
    /// grows a fresh root holding exactly the promoted pair.
    ///
    /// The new sibling is fully constructed and written before the parent
    /// insert is attempted, so no half-applied split is ever visible. If the
    /// parent insert itself fails, the committed sibling is not rolled back;
    /// the promoted pair is lost to the tree until the caller intervenes.
    pub(crate) fn insert_item_in_node(
        &mut self,
        node: NodeHandle,
        anchor: InsertAnchor,
        key: K,
        value: V,
        link: NodeHandle,
    ) -> Result<NodePosition> {
        let order = self.order() as usize;
        let Some(mut data) = self.store.read_node(node) else {
            return Err(TreeError::ReadFailed(node));
        };
        let count = data.len();
        let at = match anchor {
            InsertAnchor::Slot(at) => at as usize,
            InsertAnchor::AfterChild(child) => {
                if child == data.link_first {
                    0
                } else {
                    match data.links.iter().rposition(|&l| l == child) {
                        Some(slot) => slot + 1,
                        None => {
                            self.store.release_node(node);
                            return Err(TreeError::Corruption(
                                "promoted item lost its child anchor",
                            ));
                        }
                    }
                }
            }
        };
        if at > count {
            self.store.release_node(node);
            return Err(TreeError::Corruption("insert slot out of range"));
        }

        if count < order {
            data.keys.insert(at, key);
            data.values.insert(at, value);
            data.links.insert(at, link);
            data.total_count += 1;
            let parent = data.parent;
            if !self.store.write_node(node, &data) {
                self.store.release_node(node);
                return Err(TreeError::WriteFailed(node));
            }
            self.store.release_node(node);
            self.bump_ancestor_counts(parent, 1);
            return Ok(NodePosition::new(node, at as u32));
        }

        // Full node: carve off the upper half into a new right sibling and
        // promote one pair toward the parent.
        let half = count / 2;
        let mut right = NodeContent::with_capacity(self.order());
        let key_top;
        let value_top;
        let landing;
        if at > half {
            // New item belongs in the right sibling.
            let slot = at - half - 1;
            right.link_first = data.links[half];
            right.keys = data.keys.split_off(half + 1);
            right.values = data.values.split_off(half + 1);
            right.links = data.links.drain(half + 1..).collect();
            right.keys.insert(slot, key);
            right.values.insert(slot, value);
            right.links.insert(slot, link);
            let (Some(top_key), Some(top_value)) = (data.keys.pop(), data.values.pop()) else {
                self.store.release_node(node);
                return Err(TreeError::Corruption("split of an underfilled node"));
            };
            key_top = top_key;
            value_top = top_value;
            data.links.pop();
            landing = Landing::Right(slot);
        } else if at < half {
            // New item stays in the left node; the former median moves up.
            right.link_first = data.links[half - 1];
            right.keys = data.keys.split_off(half);
            right.values = data.values.split_off(half);
            right.links = data.links.drain(half..).collect();
            let (Some(top_key), Some(top_value)) = (data.keys.pop(), data.values.pop()) else {
                self.store.release_node(node);
                return Err(TreeError::Corruption("split of an underfilled node"));
            };
            key_top = top_key;
            value_top = top_value;
            data.links.pop();
            data.keys.insert(at, key);
            data.values.insert(at, value);
            data.links.insert(at, link);
            landing = Landing::Left(at);
        } else {
            // Insertion slot is exactly the midpoint: the new pair itself is
            // promoted, saving a shift in either half.
            right.link_first = link;
            right.keys = data.keys.split_off(half);
            right.values = data.values.split_off(half);
            right.links = data.links.drain(half..).collect();
            key_top = key;
            value_top = value;
            landing = Landing::Promoted;
        }

        let mut parent = data.parent;
        let mut created_root = false;
        if parent.is_null() {
            parent = self.store.create_node(None);
            if parent.is_null() {
                self.store.release_node(node);
                return Err(TreeError::AllocFailed);
            }
            if !self.store.set_root(parent) {
                self.store.release_node(node);
                return Err(TreeError::Corruption("root handle could not be repointed"));
            }
            created_root = true;
            self.height += 1;
        }
        data.parent = parent;
        right.parent = parent;
        data.total_count = self.subtree_total(&data);
        right.total_count = self.subtree_total(&right);
        let left_total = data.total_count;
        let right_total = right.total_count;

        let right_node = self.store.create_node(Some(right));
        if right_node.is_null() {
            self.store.release_node(node);
            return Err(TreeError::AllocFailed);
        }
        if !self.store.write_node(node, &data) {
            self.store.release_node(node);
            return Err(TreeError::WriteFailed(node));
        }
        self.store.release_node(node);
        self.reparent_children(right_node);
        trace!(
            target: "bough::split",
            left = %node,
            right = %right_node,
            parent = %parent,
            "split full node"
        );

        if created_root {
            let Some(mut top) = self.store.read_node(parent) else {
                return Err(TreeError::ReadFailed(parent));
            };
            top.total_count = left_total + right_total + 1;
            top.link_first = node;
            top.keys.push(key_top);
            top.values.push(value_top);
            top.links.push(right_node);
            let ok = self.store.write_node(parent, &top);
            self.store.release_node(parent);
            if !ok {
                return Err(TreeError::WriteFailed(parent));
            }
            trace!(
                target: "bough::split",
                root = %parent,
                height = self.height(),
                "tree grew a new root"
            );
            return Ok(match landing {
                Landing::Left(slot) => NodePosition::new(node, slot as u32),
                Landing::Right(slot) => NodePosition::new(right_node, slot as u32),
                Landing::Promoted => NodePosition::new(parent, 0),
            });
        }

        let promoted =
            self.insert_item_in_node(parent, InsertAnchor::AfterChild(node), key_top, value_top, right_node)?;
        Ok(match landing {
            Landing::Left(slot) => NodePosition::new(node, slot as u32),
            Landing::Right(slot) => NodePosition::new(right_node, slot as u32),
            Landing::Promoted => promoted,
        })
    }

    /// Adds `delta` to the cached subtree counts of `node` and every
    /// ancestor. Count propagation is best-effort after the triggering write
    /// has already been committed; failures are logged, not surfaced.
    pub(crate) fn bump_ancestor_counts(&mut self, start: NodeHandle, delta: i64) {
        let mut node = start;
        while !node.is_null() {
            let Some(mut data) = self.store.read_node(node) else {
                warn!(
                    target: "bough::count",
                    node = %node,
                    "ancestor unreadable while propagating count change"
                );
                return;
            };
            data.total_count = data.total_count.saturating_add_signed(delta);
            if !self.store.write_node(node, &data) {
                warn!(
                    target: "bough::count",
                    node = %node,
                    "ancestor write failed while propagating count change"
                );
                self.store.release_node(node);
                return;
            }
            let parent = data.parent;
            self.store.release_node(node);
            node = parent;
        }
    }

    /// Recomputes a node's cached subtree count from its children.
    fn subtree_total(&self, data: &NodeContent<K, V>) -> u64 {
        let mut total = data.len() as u64 + self.count_in(data.link_first);
        for &link in &data.links {
            total += self.count_in(link);
        }
        total
    }

    /// Repoints the parent back-link of every child moved into `node` by a
    /// split.
    fn reparent_children(&mut self, node: NodeHandle) {
        let Some(data) = self.store.read_node(node) else {
            return;
        };
        let mut children = Vec::with_capacity(data.links.len() + 1);
        children.push(data.link_first);
        children.extend(data.links.iter().copied());
        self.store.release_node(node);
        for child in children {
            if child.is_null() {
                continue;
            }
            let Some(mut content) = self.store.read_node(child) else {
                continue;
            };
            content.parent = node;
            if !self.store.write_node(child, &content) {
                warn!(
                    target: "bough::split",
                    child = %child,
                    "child write failed while reparenting"
                );
            }
            self.store.release_node(child);
        }
    }
}
