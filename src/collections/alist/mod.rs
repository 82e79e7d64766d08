//! AList: persistent indexed B-trees.
//!
//! Both list types keep their items in the leaves of a balanced tree whose inner
//! nodes store, for each child, the number of items that precede it. Lookups walk
//! one path; edits copy one path and share everything else.
//!
//! - [`AList`] stores every item.
//! - [`SparseAList`] stores only assigned slots over an arbitrarily large span.
//!
//! Layout:
//! - `node`, `leaf`, `sparse_leaf`, `inner`: the tree itself
//! - `base`: root management shared by both containers
//! - `observer`: structural notifications for auxiliary indexes
//! - `change`: callbacks fired before each modification
//! - `iter`: iterators and version-checked cursors

mod base;
mod change;
mod config;
mod dense;
mod error;
mod inner;
mod iter;
mod leaf;
mod node;
mod observer;
mod search;
mod sparse;
mod sparse_leaf;
#[cfg(feature = "proptest")]
pub mod strategy;

pub use base::FreezeMode;
pub use change::{ListChangeAction, ListChangeInfo, ListChangingHandler};
pub use config::{AListConfig, DEFAULT_MAX_INNER_SIZE, DEFAULT_MAX_LEAF_SIZE};
pub use dense::AList;
pub use error::{AListError, Result, MAX_LEN};
pub use iter::{AListCursor, Iter, Leaves, SetEntries, SparseCursor, SparseIter};
pub use observer::{AListObserver, NodeId, SharedObserver};
pub use sparse::SparseAList;
