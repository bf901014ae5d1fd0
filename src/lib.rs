//! Generic, order-configurable B-Tree engine with a pluggable node storage
//! backend.
//!
//! The balanced-tree algorithm ([`BTree`]) is written entirely against
//! opaque node identities ([`NodeHandle`]) and the [`NodeStorage`] capability
//! set, so the same search, split, and rebalancing code runs whether nodes
//! live in process memory (the default [`HeapStorage`]) or behind a paged
//! file. Positions ([`NodePosition`]) double as external cursors for ordered
//! iteration and range queries.
//!
//! ```
//! use bough::BTree;
//!
//! let mut tree = BTree::new(4);
//! for key in [10u32, 20, 5, 15, 25, 1, 30] {
//!     tree.put(key, key * 100).unwrap();
//! }
//! assert_eq!(tree.get(&15), Some(1500));
//! assert_eq!(tree.len(), 7);
//! let keys: Vec<u32> = tree.iter().map(|(k, _)| k).collect();
//! assert_eq!(keys, [1, 5, 10, 15, 20, 25, 30]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod compare;
pub mod error;
pub mod node;
pub mod storage;
pub mod tree;

pub use compare::{KeyComparator, NaturalOrder, OrderBy};
pub use error::{Result, TreeError};
pub use node::{LinkArray, NodeContent, NodeHandle, NodePosition};
pub use storage::{HeapStorage, NodeStorage};
pub use tree::{BTree, EqualRange, Iter, DEFAULT_ORDER};
