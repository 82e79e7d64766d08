//! Structural change notifications.
//!
//! An [`AListObserver`] is attached to one container and hears about every item and
//! node movement inside that container's tree, in traversal order. It cannot veto or
//! alter anything; it exists so an auxiliary index (item -> leaf, leaf -> parent, ...)
//! can be maintained incrementally instead of being rebuilt by rescanning.
//!
//! Nodes are identified by [`NodeId`], which is stable for as long as the node is
//! part of the tree. When a shared node is cloned before a write the clone has a new
//! id, and the swap is announced with [`AListObserver::child_replaced`].

use std::sync::Arc;

/// Opaque identity of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Placeholder for nodes that are not attached to an observed tree yet.
    pub(crate) const DETACHED: NodeId = NodeId(0);

    #[inline]
    pub(crate) fn of<N>(node: &N) -> Self {
        NodeId(node as *const N as usize)
    }
}

/// Receives structural notifications from a list. Every method defaults to a no-op.
///
/// Notifications about leaves that are *detached* as a whole (for example when a
/// removal covers an entire subtree) are delivered leaf by leaf through
/// [`removing_items`](Self::removing_items) / [`item_removed`](Self::item_removed),
/// followed by a single [`node_removed`](Self::node_removed) for the subtree root.
/// Subtrees spliced in by `append`/`prepend`/`insert_list` are announced the same way
/// with [`adding_items`](Self::adding_items) / [`item_added`](Self::item_added).
#[allow(unused_variables)]
pub trait AListObserver<T> {
    /// `old` was replaced by `new_left` (and `new_right`, for a split) under `parent`.
    /// `parent` is `None` at the root. `old == new_left` for an in-place split.
    fn child_replaced(&self, old: NodeId, new_left: NodeId, new_right: Option<NodeId>, parent: Option<NodeId>) {}
    /// A child node was unlinked from `parent`.
    fn node_removed(&self, node: NodeId, parent: NodeId) {}
    /// A child node was moved between two inner nodes.
    fn node_moved(&self, node: NodeId, from_parent: NodeId, to_parent: NodeId) {}
    /// One item was stored in `leaf`.
    fn item_added(&self, item: &T, leaf: NodeId) {}
    /// One item was deleted from `leaf`.
    fn item_removed(&self, item: &T, leaf: NodeId) {}
    /// One item moved from `from_leaf` to `to_leaf`.
    fn item_moved(&self, item: &T, from_leaf: NodeId, to_leaf: NodeId) {}
    /// A contiguous run of items now lives in `leaf`. `is_move` is set when the items
    /// were taken from another leaf of the same tree.
    fn adding_items(&self, items: &[T], leaf: NodeId, is_move: bool) {}
    /// A contiguous run of items left `leaf`. `is_move` is set when they are being
    /// relocated inside the tree rather than deleted.
    fn removing_items(&self, items: &[T], leaf: NodeId, is_move: bool) {}
    /// The whole list was emptied.
    fn cleared(&self) {}
}

/// Observer handle as stored by a container.
pub type SharedObserver<T> = Arc<dyn AListObserver<T> + Send + Sync>;

/// Observer reference threaded through node operations.
pub(crate) type Obs<'a, T> = Option<&'a (dyn AListObserver<T> + Send + Sync)>;
