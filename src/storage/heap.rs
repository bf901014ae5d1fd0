//! Default in-memory storage backend.

use crate::node::{NodeContent, NodeHandle};
use crate::storage::NodeStorage;

/// Slab-backed node storage.
///
/// Handles are slot indexes shifted by one, so the raw value `0` stays the
/// null sentinel. Deleted slots go onto a free list and are reused by later
/// allocations, which means a handle can dangle into a recycled slot. The
/// engine treats positions as plain values that may go stale, so this is
/// acceptable for the default backend.
#[derive(Debug, Clone)]
pub struct HeapStorage<K, V> {
    slots: Vec<Option<Box<NodeContent<K, V>>>>,
    free: Vec<u32>,
    root: NodeHandle,
}

impl<K, V> HeapStorage<K, V> {
    /// An empty slab with no root.
    pub fn new() -> Self {
        HeapStorage {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeHandle::NULL,
        }
    }

    /// Number of live nodes currently held.
    pub fn live_nodes(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn index(node: NodeHandle) -> Option<usize> {
        if node.is_null() {
            None
        } else {
            Some(node.raw() as usize - 1)
        }
    }
}

impl<K, V> Default for HeapStorage<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone> NodeStorage<K, V> for HeapStorage<K, V> {
    fn create_node(&mut self, content: Option<NodeContent<K, V>>) -> NodeHandle {
        let content = Box::new(content.unwrap_or_default());
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize] = Some(content);
                index as usize
            }
            None => {
                self.slots.push(Some(content));
                self.slots.len() - 1
            }
        };
        NodeHandle::from_raw(index as u64 + 1)
    }

    fn delete_node(&mut self, node: NodeHandle) -> bool {
        let Some(index) = Self::index(node) else {
            return false;
        };
        match self.slots.get_mut(index) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                self.free.push(index as u32);
                true
            }
            _ => false,
        }
    }

    fn read_node(&self, node: NodeHandle) -> Option<NodeContent<K, V>> {
        let index = Self::index(node)?;
        self.slots.get(index)?.as_ref().map(|boxed| (**boxed).clone())
    }

    fn write_node(&mut self, node: NodeHandle, content: &NodeContent<K, V>) -> bool {
        let Some(index) = Self::index(node) else {
            return false;
        };
        match self.slots.get_mut(index) {
            Some(Some(slot)) => {
                **slot = content.clone();
                true
            }
            _ => false,
        }
    }

    fn root(&self) -> NodeHandle {
        self.root
    }

    fn set_root(&mut self, node: NodeHandle) -> bool {
        let live = Self::index(node)
            .and_then(|index| self.slots.get(index))
            .is_some_and(|slot| slot.is_some());
        if live {
            self.root = node;
        }
        live
    }
}
