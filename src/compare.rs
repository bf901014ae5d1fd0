//! Key ordering capability supplied by callers.

use std::cmp::Ordering;

/// Total order over keys, applied consistently to every binary search and
/// duplicate-run boundary scan in the tree.
pub trait KeyComparator<K> {
    /// Compares `a` against `b`.
    fn cmp(&self, a: &K, b: &K) -> Ordering;
}

/// Comparator delegating to the key's own [`Ord`] implementation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NaturalOrder;

impl<K: Ord> KeyComparator<K> for NaturalOrder {
    fn cmp(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

/// Adapter turning a comparison closure into a [`KeyComparator`].
#[derive(Clone, Copy, Debug)]
pub struct OrderBy<F>(pub F);

impl<K, F> KeyComparator<K> for OrderBy<F>
where
    F: Fn(&K, &K) -> Ordering,
{
    fn cmp(&self, a: &K, b: &K) -> Ordering {
        (self.0)(a, b)
    }
}
