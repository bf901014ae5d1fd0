//! End-to-end workloads over the public API, cross-checked against
//! `std::collections::BTreeMap`.

use std::cell::Cell;
use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use bough::{BTree, HeapStorage, NaturalOrder, NodeContent, NodeHandle, NodePosition, NodeStorage};

#[test]
fn mixed_workload_matches_reference_map() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5EED);
    for order in [2u32, 5, 16, 64] {
        let mut tree = BTree::new(order);
        let mut reference: BTreeMap<u32, u64> = BTreeMap::new();

        for round in 0..5_000u64 {
            let key = rng.gen_range(0..800);
            match rng.gen_range(0..10) {
                0..=4 => {
                    tree.put(key, round).unwrap();
                    reference.insert(key, round);
                }
                5..=7 => {
                    assert_eq!(tree.remove(&key).unwrap(), reference.remove(&key));
                }
                8 => {
                    assert_eq!(tree.get(&key), reference.get(&key).copied());
                }
                _ => {
                    assert_eq!(tree.contains(&key), reference.contains_key(&key));
                }
            }
        }

        assert_eq!(tree.len(), reference.len() as u64);
        let entries: Vec<(u32, u64)> = tree.iter().collect();
        let expected: Vec<(u32, u64)> = reference.into_iter().collect();
        assert_eq!(entries, expected, "order {order}");
    }
}

#[test]
fn multimap_workload_keeps_duplicate_runs() {
    let mut rng = ChaCha8Rng::seed_from_u64(0xD0C5);
    let mut tree = BTree::new(4);
    let mut reference: BTreeMap<u16, Vec<u32>> = BTreeMap::new();

    for i in 0..2_000u32 {
        let key = rng.gen_range(0..50);
        tree.add(key, i).unwrap();
        reference.entry(key).or_default().push(i);
    }
    for _ in 0..500 {
        let key = rng.gen_range(0..50);
        let removed = tree.remove(&key).unwrap();
        let bucket = reference.get_mut(&key);
        match (removed, bucket) {
            (Some(value), Some(values)) => {
                let at = values.iter().position(|&v| v == value).expect("value tracked");
                values.remove(at);
                if values.is_empty() {
                    reference.remove(&key);
                }
            }
            (None, None) => {}
            (got, _) => panic!("removal diverged from the reference: {got:?}"),
        }
    }

    for key in 0u16..50 {
        let mut got = tree.values_of(&key);
        got.sort_unstable();
        let mut want = reference.get(&key).cloned().unwrap_or_default();
        want.sort_unstable();
        assert_eq!(got, want, "key {key}");
    }
    let total: usize = reference.values().map(Vec::len).sum();
    assert_eq!(tree.len(), total as u64);
}

#[test]
fn range_queries_over_sparse_keys() {
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let mut keys: Vec<u32> = (0..200).map(|i| i * 7).collect();
    keys.shuffle(&mut rng);
    let mut tree = BTree::new(8);
    for &key in &keys {
        tree.put(key, key).unwrap();
    }

    let key_at = |pos: Option<NodePosition>| pos.and_then(|p| tree.entry_at(p)).map(|(k, _)| k);
    for probe in 0u32..1_400 {
        let (below, above) = tree.nearest(&probe);
        let want_below = (probe / 7) * 7;
        let want_above = probe.div_ceil(7) * 7;
        assert_eq!(key_at(below), (want_below <= 1_393).then_some(want_below));
        assert_eq!(key_at(above), (want_above <= 1_393).then_some(want_above));
    }
}

#[test]
fn tree_survives_a_storage_round_trip() {
    let mut tree = BTree::new(6);
    for key in 0u32..500 {
        tree.put(key, key.wrapping_mul(31)).unwrap();
    }
    for key in (0u32..500).step_by(3) {
        tree.remove(&key).unwrap();
    }
    let expected: Vec<(u32, u32)> = tree.iter().collect();

    let store = tree.into_storage();
    let reopened: BTree<u32, u32> = BTree::with_parts(store, NaturalOrder, 6);
    assert_eq!(reopened.iter().collect::<Vec<_>>(), expected);
    assert_eq!(reopened.get(&1), Some(31));
    assert_eq!(reopened.get(&3), None);
}

/// Backend wrapper counting calls, to show the engine runs unchanged over a
/// caller-supplied [`NodeStorage`] implementation.
#[derive(Default)]
struct CountingStore {
    inner: HeapStorage<u32, u32>,
    reads: Cell<u64>,
    releases: Cell<u64>,
    writes: u64,
    creates: u64,
    deletes: u64,
}

impl NodeStorage<u32, u32> for CountingStore {
    fn create_node(&mut self, content: Option<NodeContent<u32, u32>>) -> NodeHandle {
        self.creates += 1;
        self.inner.create_node(content)
    }

    fn delete_node(&mut self, node: NodeHandle) -> bool {
        self.deletes += 1;
        self.inner.delete_node(node)
    }

    fn read_node(&self, node: NodeHandle) -> Option<NodeContent<u32, u32>> {
        self.reads.set(self.reads.get() + 1);
        self.inner.read_node(node)
    }

    fn write_node(&mut self, node: NodeHandle, content: &NodeContent<u32, u32>) -> bool {
        self.writes += 1;
        self.inner.write_node(node, content)
    }

    fn release_node(&self, _node: NodeHandle) {
        self.releases.set(self.releases.get() + 1);
    }

    fn root(&self) -> NodeHandle {
        self.inner.root()
    }

    fn set_root(&mut self, node: NodeHandle) -> bool {
        self.inner.set_root(node)
    }
}

#[test]
fn custom_backend_sees_balanced_checkouts() {
    let mut tree: BTree<u32, u32, NaturalOrder, CountingStore> =
        BTree::with_comparator(NaturalOrder, 4);
    let mut rng = ChaCha8Rng::seed_from_u64(0xACC);
    let mut keys: Vec<u32> = (0..300).collect();
    keys.shuffle(&mut rng);
    for &key in &keys {
        tree.put(key, key).unwrap();
    }
    keys.shuffle(&mut rng);
    for &key in &keys[..150] {
        tree.remove(&key).unwrap();
    }

    let store = tree.storage();
    assert!(store.creates > 1, "splits must allocate nodes");
    assert!(store.writes > 0);
    // Every successful read_node is paired with exactly one release_node.
    assert_eq!(store.reads.get(), store.releases.get());
    assert_eq!(tree.len(), 150);
}
