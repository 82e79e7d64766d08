//! # `alist` - Persistent Indexed B-Trees
//!
//! Order-preserving sequences stored as balanced trees of reference-counted nodes.
//! Every node records how many items precede each of its children, so positions,
//! not keys, drive every lookup.
//!
//! ## Key Features
//!
//! - **O(log n) everywhere**: indexing, insertion and removal at any position
//! - **O(1) clones**: lists share nodes and copy only the path they write to
//! - **Structural sharing**: `copy_section`, `remove_section`, `append` and `prepend`
//!   move whole subtrees instead of items
//! - **Sparse lists**: [`SparseAList`] stores only assigned slots, so opening a
//!   million empty slots costs the same as opening one
//! - **Observers**: an [`AListObserver`] hears about every item and node movement and
//!   can maintain a secondary index without rescanning
//!
//! ## Structure
//!
//! Leaves hold up to `max_leaf_size` items (or `(offset, item)` entries for sparse
//! lists); inner nodes hold up to `max_inner_size` children. A non-root node is
//! undersized at a third (leaves) or below half (inner nodes) of its capacity and is
//! repaired before the operation returns, by merging into a neighbour or borrowing
//! from one. All leaves sit at the same depth.
//!
//! ### Sharing
//!
//! Nodes live behind `Arc`. A node reachable from two lists is never written in
//! place; the writer clones it (sharing its children) and links the clone into its
//! own tree. Frozen lists can therefore be read from other threads while their
//! clones are being edited.
//!
//! ## Example
//!
//! ```rust
//! use alist::{AList, SparseAList};
//!
//! let mut list: AList<u32> = (0..1000).collect();
//! let tail = list.remove_section(500, 500)?;
//! list.prepend(tail)?;
//! assert_eq!(list[0], 500);
//! assert_eq!(list[500], 0);
//!
//! let mut sparse = SparseAList::new();
//! sparse.insert_space(0, 10)?;
//! sparse.set(7, "seven")?;
//! assert_eq!(sparse.next_higher_set_index(0), Some(7));
//! # Ok::<(), alist::AListError>(())
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod collections;

pub use collections::alist::{
    AList,
    AListConfig,
    AListCursor,
    AListError,
    AListObserver,
    FreezeMode,
    ListChangeAction,
    ListChangeInfo,
    MAX_LEN,
    NodeId,
    Result,
    SharedObserver,
    SparseAList,
    SparseCursor,
};

// Node handles stay pointer-sized so inner nodes remain compact.
const _: () = {
    use core::mem;
    assert!(mem::size_of::<NodeId>() == mem::size_of::<usize>());
};
