//! Key search: point lookups, nearest-bound queries, and duplicate ranges.

use std::cmp::Ordering;

use crate::compare::KeyComparator;
use crate::error::{Result, TreeError};
use crate::node::{NodeHandle, NodePosition};
use crate::storage::NodeStorage;
use crate::tree::BTree;

/// Bounds of a run of equal keys: `lower` is the first matching slot,
/// `upper` the first slot past the run ([`NodePosition::NULL`] when the run
/// ends the tree).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EqualRange {
    /// First position holding the key.
    pub lower: NodePosition,
    /// First position after the last duplicate, exclusive.
    pub upper: NodePosition,
}

/// Outcome of binary-searching a single node.
pub(crate) struct SlotProbe {
    pub found: bool,
    pub item: u32,
    /// Child link to descend into: the matched slot's right link on a hit,
    /// the bracketing link on a miss.
    pub link: NodeHandle,
    pub count: u32,
}

/// Where a root-to-leaf descent ended.
pub(crate) enum Descent {
    Found(NodePosition),
    /// Key absent; the position is the leaf-level slot an insert would use.
    Miss(NodePosition),
}

impl<K, V, C, S> BTree<K, V, C, S>
where
    K: Clone,
    V: Clone,
    C: KeyComparator<K>,
    S: NodeStorage<K, V>,
{
    /// Position of one occurrence of `key`, or `None` if absent.
    pub fn find(&self, key: &K) -> Option<NodePosition> {
        let root = self.store.root();
        if root.is_null() {
            return None;
        }
        match self.locate(root, key).ok()? {
            Descent::Found(pos) => Some(pos),
            Descent::Miss(_) => None,
        }
    }

    /// Value stored under `key`, or `None` if absent. With duplicates, an
    /// arbitrary occurrence is returned.
    pub fn get(&self, key: &K) -> Option<V> {
        let pos = self.find(key)?;
        self.entry_at(pos).map(|(_, value)| value)
    }

    /// Whether the tree holds `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// The positions bracketing `key`: the largest entry `<= key` and the
    /// smallest entry `>= key`. On a hit both bounds name the matched slot;
    /// on a miss each side may independently be `None` at the tree edge.
    pub fn nearest(&self, key: &K) -> (Option<NodePosition>, Option<NodePosition>) {
        let mut node = self.store.root();
        if node.is_null() {
            return (None, None);
        }
        loop {
            let Ok(probe) = self.probe_node(node, key) else {
                return (None, None);
            };
            if probe.found {
                let pos = NodePosition::new(node, probe.item);
                return (Some(pos), Some(pos));
            }
            if !probe.link.is_null() {
                node = probe.link;
                continue;
            }
            if probe.count == 0 {
                // Empty node on the descent path: both bounds live in
                // ancestors, reached by climbing out of the empty subtree.
                return (self.last_in(node), self.first_in(node));
            }
            // The miss slot sits between two in-order neighbors; derive each
            // bound with a single cursor step instead of a fresh descent.
            let below = if probe.item == 0 {
                self.move_to_previous(NodePosition::new(node, 0))
            } else {
                Some(NodePosition::new(node, probe.item - 1))
            };
            let above = if probe.item == probe.count {
                self.move_to_next(NodePosition::new(node, probe.count - 1))
            } else {
                Some(NodePosition::new(node, probe.item))
            };
            return (below, above);
        }
    }

    /// Bounds of the run of entries equal to `key`, or `None` if absent.
    pub fn equal_range(&self, key: &K) -> Option<EqualRange> {
        let root = self.store.root();
        if root.is_null() {
            return None;
        }
        let lower = self.first_duplicate_in(root, key)?;
        let last = self.last_duplicate_in(root, key)?;
        let upper = self.move_to_next(last).unwrap_or(NodePosition::NULL);
        Some(EqualRange { lower, upper })
    }

    /// All values stored under `key`, in tree order.
    pub fn values_of(&self, key: &K) -> Vec<V> {
        let Some(range) = self.equal_range(key) else {
            return Vec::new();
        };
        let mut values = Vec::new();
        let mut pos = range.lower;
        while !pos.is_null() && pos != range.upper {
            let Some((_, value)) = self.entry_at(pos) else {
                break;
            };
            values.push(value);
            pos = self.move_to_next(pos).unwrap_or(NodePosition::NULL);
        }
        values
    }

    /// Values stored under `key` whose value satisfies `matches`, in tree
    /// order.
    pub fn values_of_with(&self, key: &K, matches: impl Fn(&V) -> bool) -> Vec<V> {
        let Some(range) = self.equal_range(key) else {
            return Vec::new();
        };
        let mut values = Vec::new();
        let mut pos = range.lower;
        while !pos.is_null() && pos != range.upper {
            let Some((_, value)) = self.entry_at(pos) else {
                break;
            };
            if matches(&value) {
                values.push(value);
            }
            pos = self.move_to_next(pos).unwrap_or(NodePosition::NULL);
        }
        values
    }

    /// Position of the first entry under `key` whose value satisfies
    /// `matches`, scanning the duplicate run in tree order.
    pub fn find_with(&self, key: &K, matches: impl Fn(&V) -> bool) -> Option<NodePosition> {
        let range = self.equal_range(key)?;
        let mut pos = range.lower;
        while !pos.is_null() && pos != range.upper {
            let (_, value) = self.entry_at(pos)?;
            if matches(&value) {
                return Some(pos);
            }
            pos = self.move_to_next(pos).unwrap_or(NodePosition::NULL);
        }
        None
    }

    /// Binary-searches one node for `key`.
    pub(crate) fn probe_node(&self, node: NodeHandle, key: &K) -> Result<SlotProbe> {
        let Some(data) = self.store.read_node(node) else {
            return Err(TreeError::ReadFailed(node));
        };
        let count = data.len() as u32;
        let probe = match data.keys.binary_search_by(|probe| self.compare.cmp(probe, key)) {
            Ok(item) => SlotProbe {
                found: true,
                item: item as u32,
                link: data.links[item],
                count,
            },
            Err(item) => SlotProbe {
                found: false,
                item: item as u32,
                link: data.link_before(item),
                count,
            },
        };
        self.store.release_node(node);
        Ok(probe)
    }

    /// Descends from `from` until `key` is found or a null link is reached.
    pub(crate) fn locate(&self, from: NodeHandle, key: &K) -> Result<Descent> {
        let mut node = from;
        loop {
            let probe = self.probe_node(node, key)?;
            if probe.found {
                return Ok(Descent::Found(NodePosition::new(node, probe.item)));
            }
            if probe.link.is_null() {
                return Ok(Descent::Miss(NodePosition::new(node, probe.item)));
            }
            node = probe.link;
        }
    }

    /// Leaf-level insertion slot for `key` that never stops at an equal
    /// match. Equal keys descend right, so a later duplicate lands after
    /// the existing run.
    pub(crate) fn insert_slot(&self, from: NodeHandle, key: &K) -> Result<NodePosition> {
        let mut node = from;
        loop {
            let probe = self.probe_node(node, key)?;
            if probe.link.is_null() {
                return Ok(NodePosition::new(node, probe.item));
            }
            node = probe.link;
        }
    }

    /// First occurrence of `key` in the subtree under `node`. Splits can
    /// promote a middle duplicate upward, leaving earlier duplicates in the
    /// left bracket subtree, so the scan recurses even past the leftmost
    /// in-node match.
    fn first_duplicate_in(&self, node: NodeHandle, key: &K) -> Option<NodePosition> {
        let data = self.store.read_node(node)?;
        match data.keys.binary_search_by(|probe| self.compare.cmp(probe, key)) {
            Err(item) => {
                let link = data.link_before(item);
                self.store.release_node(node);
                if link.is_null() {
                    None
                } else {
                    self.first_duplicate_in(link, key)
                }
            }
            Ok(mut item) => {
                while item > 0 && self.compare.cmp(&data.keys[item - 1], key) == Ordering::Equal {
                    item -= 1;
                }
                let link = data.link_before(item);
                self.store.release_node(node);
                let deeper = if link.is_null() {
                    None
                } else {
                    self.first_duplicate_in(link, key)
                };
                deeper.or(Some(NodePosition::new(node, item as u32)))
            }
        }
    }

    /// Last occurrence of `key` in the subtree under `node`; mirror of
    /// [`BTree::first_duplicate_in`].
    fn last_duplicate_in(&self, node: NodeHandle, key: &K) -> Option<NodePosition> {
        let data = self.store.read_node(node)?;
        let count = data.len();
        match data.keys.binary_search_by(|probe| self.compare.cmp(probe, key)) {
            Err(item) => {
                let link = data.link_before(item);
                self.store.release_node(node);
                if link.is_null() {
                    None
                } else {
                    self.last_duplicate_in(link, key)
                }
            }
            Ok(mut item) => {
                while item + 1 < count
                    && self.compare.cmp(&data.keys[item + 1], key) == Ordering::Equal
                {
                    item += 1;
                }
                let link = data.links[item];
                self.store.release_node(node);
                let deeper = if link.is_null() {
                    None
                } else {
                    self.last_duplicate_in(link, key)
                };
                deeper.or(Some(NodePosition::new(node, item as u32)))
            }
        }
    }
}
