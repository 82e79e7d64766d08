//! The node enum shared by every tree and the copy-on-write entry point.
//!
//! Nodes are held behind `Arc`. A node referenced from more than one tree is
//! effectively frozen: writers go through [`make_unique`], which clones the node
//! (sharing its children) when the reference count is above one and mutates in
//! place otherwise.

use super::error::{AListError, Result};
use super::inner::Inner;
use super::leaf::Leaf;
use super::observer::{NodeId, Obs};
use super::sparse_leaf::{SparseLeaf, SparseOp};
use std::sync::Arc;

pub(crate) type NodeRef<T> = Arc<Node<T>>;

#[derive(Debug, Clone)]
pub(crate) enum Node<T> {
    Leaf(Leaf<T>),
    Sparse(SparseLeaf<T>),
    Inner(Inner<T>),
}

/// What a mutation reports to the caller one level up.
#[derive(Debug)]
pub(crate) enum Outcome<T> {
    Done,
    /// The leaf has no room for a new item; split it and retry.
    Full,
    /// The node overflowed and split; the right half must be linked after it.
    Split(Node<T>),
    /// The node dropped below its minimum fill.
    Undersized,
}

/// Which edge of a tree an operation works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

#[inline]
pub(crate) fn is_undersized(is_leaf: bool, count: usize, max: usize) -> bool {
    if is_leaf {
        count * 3 <= max
    } else {
        count * 2 < max
    }
}

/// Returns a mutable reference to the node in `slot`, cloning it first if it is shared.
pub(crate) fn make_unique<'a, T: Clone>(slot: &'a mut NodeRef<T>, parent: Option<NodeId>, obs: Obs<'_, T>) -> &'a mut Node<T> {
    if let Some(o) = obs {
        if Arc::strong_count(slot) > 1 {
            let old = NodeId::of(slot.as_ref());
            *slot = Arc::new(Node::clone(slot));
            o.child_replaced(old, NodeId::of(slot.as_ref()), None, parent);
        }
    }
    Arc::make_mut(slot)
}

impl<T> Node<T> {
    #[inline]
    pub(crate) fn id(&self) -> NodeId {
        NodeId::of(self)
    }

    #[inline]
    pub(crate) fn total(&self) -> usize {
        match self {
            Node::Leaf(l) => l.len(),
            Node::Sparse(s) => s.total(),
            Node::Inner(n) => n.total(),
        }
    }

    /// Items (dense), stored entries (sparse), or children (inner).
    #[inline]
    pub(crate) fn local_count(&self) -> usize {
        match self {
            Node::Leaf(l) => l.len(),
            Node::Sparse(s) => s.len(),
            Node::Inner(n) => n.len(),
        }
    }

    #[inline]
    pub(crate) fn max_size(&self) -> usize {
        match self {
            Node::Leaf(l) => l.max_size(),
            Node::Sparse(s) => s.max_size(),
            Node::Inner(n) => n.max_size(),
        }
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        !matches!(self, Node::Inner(_))
    }

    #[inline]
    pub(crate) fn capacity_left(&self) -> usize {
        self.max_size().saturating_sub(self.local_count())
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.local_count() >= self.max_size()
    }

    #[inline]
    pub(crate) fn is_undersized(&self) -> bool {
        is_undersized(self.is_leaf(), self.local_count(), self.max_size())
    }

    /// Whether giving away one element would leave this node undersized.
    #[inline]
    pub(crate) fn can_lend(&self) -> bool {
        let n = self.local_count();
        n > 0 && !is_undersized(self.is_leaf(), n - 1, self.max_size())
    }

    pub(crate) fn height(&self) -> usize {
        let mut height = 0;
        let mut node = self;
        while let Node::Inner(n) = node {
            height += 1;
            node = n.child(0);
        }
        height
    }

    /// Item at `index`, or `None` for an unset sparse slot.
    pub(crate) fn get(&self, index: usize) -> Option<&T> {
        match self {
            Node::Leaf(l) => l.get(index),
            Node::Sparse(s) => s.get(index),
            Node::Inner(n) => n.get(index),
        }
    }

    pub(crate) fn next_set_at_or_after(&self, index: usize) -> Option<usize> {
        match self {
            Node::Leaf(l) => (index < l.len()).then_some(index),
            Node::Sparse(s) => s.next_set_at_or_after(index),
            Node::Inner(n) => n.next_set_at_or_after(index),
        }
    }

    pub(crate) fn last_set_at_or_before(&self, index: usize) -> Option<usize> {
        match self {
            Node::Leaf(l) => (l.len() > 0).then(|| index.min(l.len() - 1)),
            Node::Sparse(s) => s.last_set_at_or_before(index),
            Node::Inner(n) => n.last_set_at_or_before(index),
        }
    }

    /// Splits an overfull node, returning the right half.
    pub(crate) fn split(&mut self) -> Node<T> {
        #[cfg(feature = "tracing")]
        tracing::trace!(leaf = self.is_leaf(), count = self.local_count(), "splitting node");
        match self {
            Node::Leaf(l) => Node::Leaf(l.split()),
            Node::Sparse(s) => Node::Sparse(s.split()),
            Node::Inner(n) => Node::Inner(n.split()),
        }
    }

    /// Moves one element (item, sparse span, or child) from the front of `right` to
    /// the end of `self`. Returns the number of indices that changed sides.
    pub(crate) fn take_from_right(&mut self, right: &mut Node<T>, obs: Obs<'_, T>) -> usize {
        let (id, right_id) = (self.id(), right.id());
        match (self, right) {
            (Node::Leaf(a), Node::Leaf(b)) => a.take_from_right(b, id, right_id, obs),
            (Node::Sparse(a), Node::Sparse(b)) => a.take_from_right(b, id, right_id, obs),
            (Node::Inner(a), Node::Inner(b)) => a.take_from_right(b, id, right_id, obs),
            _ => unreachable!("siblings always have the same variant"),
        }
    }

    /// Moves one element from the end of `left` to the front of `self`.
    pub(crate) fn take_from_left(&mut self, left: &mut Node<T>, obs: Obs<'_, T>) -> usize {
        let (id, left_id) = (self.id(), left.id());
        match (self, left) {
            (Node::Leaf(a), Node::Leaf(b)) => a.take_from_left(b, id, left_id, obs),
            (Node::Sparse(a), Node::Sparse(b)) => a.take_from_left(b, id, left_id, obs),
            (Node::Inner(a), Node::Inner(b)) => a.take_from_left(b, id, left_id, obs),
            _ => unreachable!("siblings always have the same variant"),
        }
    }

    /// Merges a former right sibling (identified by `right_id`) into `self`.
    pub(crate) fn append_node(&mut self, right: Node<T>, right_id: NodeId, obs: Obs<'_, T>) {
        let id = self.id();
        match (self, right) {
            (Node::Leaf(a), Node::Leaf(b)) => a.append(b, id, right_id, obs),
            (Node::Sparse(a), Node::Sparse(b)) => a.append(b, id, right_id, obs),
            (Node::Inner(a), Node::Inner(b)) => a.append(b, id, right_id, obs),
            _ => unreachable!("siblings always have the same variant"),
        }
    }

    /// Merges a former left sibling into `self`.
    pub(crate) fn prepend_node(&mut self, left: Node<T>, left_id: NodeId, obs: Obs<'_, T>) {
        let id = self.id();
        match (self, left) {
            (Node::Leaf(a), Node::Leaf(b)) => a.prepend(b, id, left_id, obs),
            (Node::Sparse(a), Node::Sparse(b)) => a.prepend(b, id, left_id, obs),
            (Node::Inner(a), Node::Inner(b)) => a.prepend(b, id, left_id, obs),
            _ => unreachable!("siblings always have the same variant"),
        }
    }

    /// Reports every item under this node as added (`adding == true`) or removed.
    pub(crate) fn announce_items(&self, adding: bool, obs: Obs<'_, T>) {
        let Some(o) = obs else { return };
        let id = self.id();
        match self {
            Node::Leaf(l) if adding => o.adding_items(l.items(), id, false),
            Node::Leaf(l) => o.removing_items(l.items(), id, false),
            Node::Sparse(s) => {
                for e in s.entries() {
                    if adding {
                        o.item_added(&e.item, id);
                    } else {
                        o.item_removed(&e.item, id);
                    }
                }
            }
            Node::Inner(n) => {
                for child in n.children() {
                    child.announce_items(adding, obs);
                }
            }
        }
    }

    /// Reports a fresh right sibling produced by splitting the node `left_id`.
    pub(crate) fn announce_split_from(&self, left_id: NodeId, parent: Option<NodeId>, obs: Obs<'_, T>) {
        let Some(o) = obs else { return };
        let id = self.id();
        o.child_replaced(left_id, left_id, Some(id), parent);
        match self {
            Node::Leaf(l) => {
                o.removing_items(l.items(), left_id, true);
                o.adding_items(l.items(), id, true);
            }
            Node::Sparse(s) => {
                for e in s.entries() {
                    o.item_moved(&e.item, left_id, id);
                }
            }
            Node::Inner(n) => {
                for child in n.children() {
                    o.node_moved(child.id(), left_id, id);
                }
            }
        }
    }
}

impl<T: Clone> Node<T> {
    pub(crate) fn set(&mut self, index: usize, value: T, obs: Obs<'_, T>) -> Result<T> {
        let id = self.id();
        match self {
            Node::Leaf(l) => Ok(l.set(index, value, id, obs)),
            Node::Inner(n) => n.set(index, value, id, obs),
            Node::Sparse(_) => Err(AListError::Unsupported("sparse leaves are written through sparse operations")),
        }
    }

    /// Inserts one item. Leaves must have spare capacity; inner nodes make room themselves.
    pub(crate) fn insert(&mut self, index: usize, item: T, obs: Obs<'_, T>) -> Result<Outcome<T>> {
        let id = self.id();
        match self {
            Node::Leaf(l) => {
                l.insert(index, item, id, obs);
                Ok(Outcome::Done)
            }
            Node::Inner(n) => n.insert(index, item, id, obs),
            Node::Sparse(_) => Err(AListError::Unsupported("sparse leaves are written through sparse operations")),
        }
    }

    pub(crate) fn apply_sparse(&mut self, index: usize, op: &mut SparseOp<T>, obs: Obs<'_, T>) -> Result<Outcome<T>> {
        let id = self.id();
        match self {
            Node::Sparse(s) => Ok(s.apply(index, op, id, obs)),
            Node::Inner(n) => n.apply_sparse(index, op, id, obs),
            Node::Leaf(_) => Err(AListError::Unsupported("dense leaves have no unset slots")),
        }
    }

    /// Removes `count` indices at `index`; returns whether this node is now undersized.
    pub(crate) fn remove_range(&mut self, index: usize, count: usize, obs: Obs<'_, T>) -> bool {
        let id = self.id();
        match self {
            Node::Leaf(l) => l.remove_range(index, count, id, obs),
            Node::Sparse(s) => s.remove_range(index, count, id, obs),
            Node::Inner(n) => n.remove_range(index, count, id, obs),
        }
    }

    /// Copies `[index, index + count)` into a new subtree of the same height, sharing
    /// every child that lies entirely inside the range.
    pub(crate) fn copy_section(&self, index: usize, count: usize) -> Node<T> {
        match self {
            Node::Leaf(l) => Node::Leaf(l.copy_section(index, count)),
            Node::Sparse(s) => Node::Sparse(s.copy_section(index, count)),
            Node::Inner(n) => Node::Inner(n.copy_section(index, count)),
        }
    }

    /// After `self` absorbed children at an edge, fixes the pair around `seam`.
    pub(crate) fn repair_seam(&mut self, seam: usize, obs: Obs<'_, T>) {
        let id = self.id();
        if let Node::Inner(n) = self {
            if n.len() > 1 {
                n.fix_undersized(seam.saturating_sub(1), seam.min(n.len() - 1), id, obs);
            }
        }
    }

    /// Splices `nodes` (of height `target - 1`) onto the `side` edge of the node at
    /// height `target` below this one. `height` is this node's own height.
    pub(crate) fn splice_edge(&mut self, height: usize, target: usize, nodes: Vec<NodeRef<T>>, side: Side, obs: Obs<'_, T>) -> Outcome<T> {
        let id = self.id();
        match self {
            Node::Inner(n) => n.splice_edge(height, target, nodes, side, id, obs),
            _ => unreachable!("splicing always happens at an inner node"),
        }
    }
}
