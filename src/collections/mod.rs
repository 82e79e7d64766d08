//! Collections.
//!
//! - `alist`: indexed B-trees with copy-on-write structural sharing, dense and sparse

pub mod alist;

pub use alist::{AList, AListConfig, AListCursor, AListObserver, FreezeMode, NodeId, SparseAList, SparseCursor};
