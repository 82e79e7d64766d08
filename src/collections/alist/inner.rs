//! Inner node: routes absolute indices to children through a cumulative base table.
//!
//! Each entry stores the number of indices covered by all earlier siblings (`base`),
//! so locating the child for an index is a binary search over `base`. Every mutation
//! that changes a child's size finishes with [`Inner::rebase_from`].
//!
//! Children that fall below their minimum fill are repaired before control returns
//! to the parent: merged into a neighbour when the neighbours have room for all of
//! their contents, otherwise topped up one element at a time from the fuller
//! neighbour. Merging two inner children can leave an undersized grandchild at the
//! seam, so merges and transfers repair the seam one level down as well.

use super::error::Result;
use super::node::{make_unique, Node, NodeRef, Outcome, Side};
use super::observer::{NodeId, Obs};
use super::search::find_base;
use super::sparse_leaf::SparseOp;
use std::sync::Arc;

#[derive(Debug)]
pub(crate) struct InnerEntry<T> {
    pub(crate) base: usize,
    pub(crate) node: NodeRef<T>,
}

impl<T> Clone for InnerEntry<T> {
    fn clone(&self) -> Self {
        Self { base: self.base, node: Arc::clone(&self.node) }
    }
}

#[derive(Debug)]
pub(crate) struct Inner<T> {
    children: Vec<InnerEntry<T>>,
    max: u16,
}

impl<T> Clone for Inner<T> {
    fn clone(&self) -> Self {
        Self { children: self.children.clone(), max: self.max }
    }
}

impl<T> Inner<T> {
    pub(crate) fn from_children(children: Vec<NodeRef<T>>, max: u16) -> Self {
        let mut inner = Self {
            children: children.into_iter().map(|node| InnerEntry { base: 0, node }).collect(),
            max,
        };
        inner.rebase_from(0);
        inner
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub(crate) fn max_size(&self) -> usize {
        self.max as usize
    }

    #[inline]
    pub(crate) fn total(&self) -> usize {
        self.children.last().map_or(0, |e| e.base + e.node.total())
    }

    #[inline]
    pub(crate) fn child(&self, i: usize) -> &Node<T> {
        &self.children[i].node
    }

    #[inline]
    pub(crate) fn entries(&self) -> &[InnerEntry<T>] {
        &self.children
    }

    pub(crate) fn children(&self) -> impl Iterator<Item = &Node<T>> + '_ {
        self.children.iter().map(|e| e.node.as_ref())
    }

    pub(crate) fn into_children(self) -> Vec<NodeRef<T>> {
        self.children.into_iter().map(|e| e.node).collect()
    }

    /// Index of the child covering `index`. An index equal to `total()` maps to the last child.
    #[inline]
    pub(crate) fn find_child(&self, index: usize) -> usize {
        find_base(self.children.len(), index, |i| self.children[i].base)
    }

    pub(crate) fn get(&self, index: usize) -> Option<&T> {
        if self.children.is_empty() {
            return None;
        }
        let e = &self.children[self.find_child(index)];
        e.node.get(index - e.base)
    }

    pub(crate) fn next_set_at_or_after(&self, index: usize) -> Option<usize> {
        if self.children.is_empty() || index >= self.total() {
            return None;
        }
        let start = self.find_child(index);
        self.children[start..].iter().find_map(|e| {
            let local = index.saturating_sub(e.base);
            e.node.next_set_at_or_after(local).map(|i| i + e.base)
        })
    }

    pub(crate) fn last_set_at_or_before(&self, index: usize) -> Option<usize> {
        if self.children.is_empty() {
            return None;
        }
        let index = index.min(self.total().saturating_sub(1));
        let end = self.find_child(index);
        self.children[..=end].iter().rev().find_map(|e| {
            let local = (index - e.base).min(e.node.total().saturating_sub(1));
            e.node.last_set_at_or_before(local).map(|i| i + e.base)
        })
    }

    /// Recomputes `base` for every entry from `start` on.
    pub(crate) fn rebase_from(&mut self, start: usize) {
        let mut base = match start.checked_sub(1).and_then(|p| self.children.get(p)) {
            Some(prev) => prev.base + prev.node.total(),
            None => 0,
        };
        for e in self.children.iter_mut().skip(start) {
            e.base = base;
            base += e.node.total();
        }
    }

    pub(crate) fn split(&mut self) -> Inner<T> {
        let right = self.children.split_off(self.children.len() / 2);
        let mut right = Inner { children: right, max: self.max };
        right.rebase_from(0);
        right
    }

    fn split_if_overflowing(&mut self) -> Outcome<T> {
        if self.children.len() > self.max_size() {
            #[cfg(feature = "tracing")]
            tracing::trace!(children = self.children.len(), "inner node overflow");
            Outcome::Split(Node::Inner(self.split()))
        } else {
            Outcome::Done
        }
    }

    pub(crate) fn take_from_right(&mut self, right: &mut Inner<T>, id: NodeId, right_id: NodeId, obs: Obs<'_, T>) -> usize {
        if right.children.is_empty() {
            return 0;
        }
        let entry = right.children.remove(0);
        let moved = entry.node.total();
        if let Some(o) = obs {
            o.node_moved(entry.node.id(), right_id, id);
        }
        self.children.push(entry);
        self.rebase_from(self.children.len() - 1);
        right.rebase_from(0);
        moved
    }

    pub(crate) fn take_from_left(&mut self, left: &mut Inner<T>, id: NodeId, left_id: NodeId, obs: Obs<'_, T>) -> usize {
        let Some(entry) = left.children.pop() else {
            return 0;
        };
        let moved = entry.node.total();
        if let Some(o) = obs {
            o.node_moved(entry.node.id(), left_id, id);
        }
        self.children.insert(0, entry);
        self.rebase_from(0);
        moved
    }

    pub(crate) fn append(&mut self, right: Inner<T>, id: NodeId, right_id: NodeId, obs: Obs<'_, T>) {
        let start = self.children.len();
        if let Some(o) = obs {
            for e in &right.children {
                o.node_moved(e.node.id(), right_id, id);
            }
        }
        self.children.extend(right.children);
        self.rebase_from(start);
    }

    pub(crate) fn prepend(&mut self, mut left: Inner<T>, id: NodeId, left_id: NodeId, obs: Obs<'_, T>) {
        if let Some(o) = obs {
            for e in &left.children {
                o.node_moved(e.node.id(), left_id, id);
            }
        }
        left.children.append(&mut self.children);
        self.children = left.children;
        self.rebase_from(0);
    }
}

impl<T: Clone> Inner<T> {
    #[inline]
    fn child_mut(&mut self, i: usize, id: NodeId, obs: Obs<'_, T>) -> &mut Node<T> {
        make_unique(&mut self.children[i].node, Some(id), obs)
    }

    /// Children `i` and `i + 1`, both made unique.
    fn pair_mut(&mut self, i: usize, id: NodeId, obs: Obs<'_, T>) -> (&mut Node<T>, &mut Node<T>) {
        let (a, b) = self.children.split_at_mut(i + 1);
        (
            make_unique(&mut a[i].node, Some(id), obs),
            make_unique(&mut b[0].node, Some(id), obs),
        )
    }

    /// Links `right`, the product of splitting child `i`, as child `i + 1`.
    fn link_split(&mut self, i: usize, right: Node<T>, id: NodeId, obs: Obs<'_, T>) {
        let left_id = self.children[i].node.id();
        let right = Arc::new(right);
        right.announce_split_from(left_id, Some(id), obs);
        let base = self.children[i].base + self.children[i].node.total();
        self.children.insert(i + 1, InnerEntry { base, node: right });
    }

    fn split_child(&mut self, i: usize, id: NodeId, obs: Obs<'_, T>) {
        let right = self.child_mut(i, id, obs).split();
        self.link_split(i, right, id, obs);
    }

    /// Makes room in the full leaf child `i` for an insert at absolute `index`, by
    /// shifting one item to a neighbour with spare room or by splitting. Returns the
    /// child that should now receive the insert.
    fn make_room(&mut self, i: usize, index: usize, id: NodeId, obs: Obs<'_, T>) -> usize {
        let local = index - self.children[i].base;
        if i > 0 && self.children[i - 1].node.capacity_left() > 0 {
            if local == 0 {
                return i - 1;
            }
            let (left, child) = self.pair_mut(i - 1, id, obs);
            let moved = left.take_from_right(child, obs);
            self.children[i].base += moved;
            return if index < self.children[i].base { i - 1 } else { i };
        }
        if i + 1 < self.children.len()
            && local < self.children[i].node.total()
            && self.children[i + 1].node.capacity_left() > 0
        {
            let (child, right) = self.pair_mut(i, id, obs);
            let moved = right.take_from_left(child, obs);
            self.children[i + 1].base -= moved;
            return i;
        }
        self.split_child(i, id, obs);
        if index > self.children[i + 1].base {
            i + 1
        } else {
            i
        }
    }

    pub(crate) fn set(&mut self, index: usize, value: T, id: NodeId, obs: Obs<'_, T>) -> Result<T> {
        let i = self.find_child(index);
        let base = self.children[i].base;
        self.child_mut(i, id, obs).set(index - base, value, obs)
    }

    pub(crate) fn insert(&mut self, index: usize, item: T, id: NodeId, obs: Obs<'_, T>) -> Result<Outcome<T>> {
        let mut i = self.find_child(index);
        if self.children[i].node.is_leaf() && self.children[i].node.is_full() {
            i = self.make_room(i, index, id, obs);
        }
        let base = self.children[i].base;
        if let Outcome::Split(right) = self.child_mut(i, id, obs).insert(index - base, item, obs)? {
            self.link_split(i, right, id, obs);
        }
        self.rebase_from(i + 1);
        Ok(self.split_if_overflowing())
    }

    pub(crate) fn apply_sparse(&mut self, index: usize, op: &mut SparseOp<T>, id: NodeId, obs: Obs<'_, T>) -> Result<Outcome<T>> {
        if op.write_empty && !op.is_insert {
            return self.clear_sparse(index, op, id, obs);
        }
        loop {
            let i = self.find_child(index);
            let base = self.children[i].base;
            match self.child_mut(i, id, obs).apply_sparse(index - base, op, obs)? {
                Outcome::Full => {
                    self.split_child(i, id, obs);
                    continue;
                }
                Outcome::Split(right) => self.link_split(i, right, id, obs),
                Outcome::Done | Outcome::Undersized => {}
            }
            self.rebase_from(i + 1);
            return Ok(self.split_if_overflowing());
        }
    }

    fn clear_sparse(&mut self, index: usize, op: &SparseOp<T>, id: NodeId, obs: Obs<'_, T>) -> Result<Outcome<T>> {
        let end = index + op.count;
        let first = self.find_child(index);
        let mut last = first;
        for i in first..self.children.len() {
            let (base, total) = (self.children[i].base, self.children[i].node.total());
            if base >= end {
                break;
            }
            let lo = index.max(base) - base;
            let hi = end.min(base + total) - base;
            if hi > lo {
                let mut child_op = op.narrowed(hi - lo);
                let outcome = self.child_mut(i, id, obs).apply_sparse(lo, &mut child_op, obs)?;
                debug_assert!(matches!(outcome, Outcome::Done | Outcome::Undersized), "clearing never overflows");
            }
            last = i;
        }
        self.fix_undersized(first, last, id, obs);
        Ok(if self.is_undersized() { Outcome::Undersized } else { Outcome::Done })
    }

    #[inline]
    fn is_undersized(&self) -> bool {
        super::node::is_undersized(false, self.children.len(), self.max_size())
    }

    pub(crate) fn remove_range(&mut self, index: usize, count: usize, id: NodeId, obs: Obs<'_, T>) -> bool {
        let end = index + count;
        let first = self.find_child(index);
        let mut i = first;
        // Bases stay in pre-removal coordinates until the final rebase.
        while i < self.children.len() && self.children[i].base < end {
            let (base, total) = (self.children[i].base, self.children[i].node.total());
            let lo = index.max(base) - base;
            let hi = end.min(base + total) - base;
            if lo == 0 && hi == total {
                let entry = self.children.remove(i);
                entry.node.announce_items(false, obs);
                if let Some(o) = obs {
                    o.node_removed(entry.node.id(), id);
                }
            } else {
                if hi > lo {
                    self.child_mut(i, id, obs).remove_range(lo, hi - lo, obs);
                }
                i += 1;
            }
        }
        self.rebase_from(first);
        if !self.children.is_empty() {
            let last = (first + 1).min(self.children.len() - 1);
            self.fix_undersized(first.min(last), last, id, obs);
        }
        self.is_undersized()
    }

    /// Repairs undersized children among `from..=to`, right to left.
    ///
    /// A merge can leave the sibling to the left of `from` short after its seam is
    /// repaired, so that sibling is checked as well.
    pub(crate) fn fix_undersized(&mut self, from: usize, to: usize, id: NodeId, obs: Obs<'_, T>) {
        let floor = from.saturating_sub(1);
        let mut k = to;
        loop {
            if self.children.len() < 2 {
                return;
            }
            k = k.min(self.children.len() - 1);
            if self.children[k].node.is_undersized() && self.handle_undersized(k, id, obs) {
                continue;
            }
            if k <= floor {
                return;
            }
            k -= 1;
        }
    }

    /// Merges or refills child `k`. Returns false if nothing could be done.
    fn handle_undersized(&mut self, k: usize, id: NodeId, obs: Obs<'_, T>) -> bool {
        let len = self.children.len();
        let n = self.children[k].node.local_count();
        let left_cap = if k > 0 { self.children[k - 1].node.capacity_left() } else { 0 };
        let right_cap = if k + 1 < len { self.children[k + 1].node.capacity_left() } else { 0 };

        let changed = if k > 0 && left_cap >= n {
            self.merge_into_left(k, id, obs);
            true
        } else if k + 1 < len && right_cap >= n {
            self.merge_into_right(k, id, obs);
            true
        } else if k > 0 && k + 1 < len && left_cap + right_cap >= n {
            {
                let (left, child) = self.pair_mut(k - 1, id, obs);
                let seam = left.local_count();
                while left.capacity_left() > 0 && child.local_count() > 0 {
                    left.take_from_right(child, obs);
                }
                left.repair_seam(seam, obs);
            }
            self.rebase_from(k);
            self.merge_into_right(k, id, obs);
            true
        } else {
            self.top_up(k, id, obs)
        };
        self.rebase_from(k.saturating_sub(1));
        changed
    }

    /// Unlinks child `k`, returning its contents and former id.
    fn detach(&mut self, k: usize) -> (Node<T>, NodeId) {
        let entry = self.children.remove(k);
        let from = entry.node.id();
        (Arc::unwrap_or_clone(entry.node), from)
    }

    fn merge_into_left(&mut self, k: usize, id: NodeId, obs: Obs<'_, T>) {
        #[cfg(feature = "tracing")]
        tracing::trace!(child = k, "merging child into left sibling");
        let (node, from) = self.detach(k);
        let left = self.child_mut(k - 1, id, obs);
        let seam = left.local_count();
        left.append_node(node, from, obs);
        left.repair_seam(seam, obs);
        if let Some(o) = obs {
            o.node_removed(from, id);
        }
        self.rebase_from(k - 1);
    }

    fn merge_into_right(&mut self, k: usize, id: NodeId, obs: Obs<'_, T>) {
        #[cfg(feature = "tracing")]
        tracing::trace!(child = k, "merging child into right sibling");
        let (node, from) = self.detach(k);
        let seam = node.local_count();
        let right = self.child_mut(k, id, obs);
        right.prepend_node(node, from, obs);
        right.repair_seam(seam, obs);
        if let Some(o) = obs {
            o.node_removed(from, id);
        }
        self.rebase_from(k);
    }

    /// Pulls single elements into child `k` from whichever neighbour holds more,
    /// until `k` is no longer undersized or no neighbour can spare one. Returns
    /// whether anything moved.
    fn top_up(&mut self, k: usize, id: NodeId, obs: Obs<'_, T>) -> bool {
        #[cfg(feature = "tracing")]
        tracing::trace!(child = k, "topping up undersized child");
        let (mut from_left, mut from_right) = (0, 0);
        while self.children[k].node.is_undersized() {
            let left = (k > 0).then(|| &self.children[k - 1].node).filter(|n| n.can_lend());
            let right = self.children.get(k + 1).map(|e| &e.node).filter(|n| n.can_lend());
            let take_left = match (left, right) {
                (Some(l), Some(r)) => l.local_count() >= r.local_count(),
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            if take_left {
                let (left, child) = self.pair_mut(k - 1, id, obs);
                let moved = child.take_from_left(left, obs);
                self.children[k].base -= moved;
                from_left += 1;
            } else {
                let (child, right) = self.pair_mut(k, id, obs);
                let moved = child.take_from_right(right, obs);
                self.children[k + 1].base += moved;
                from_right += 1;
            }
        }
        if from_left + from_right == 0 {
            return false;
        }
        let child = self.child_mut(k, id, obs);
        if from_right > 0 {
            child.repair_seam(child.local_count() - from_right, obs);
        }
        if from_left > 0 {
            child.repair_seam(from_left, obs);
        }
        true
    }

    pub(crate) fn copy_section(&self, index: usize, count: usize) -> Inner<T> {
        let end = index + count;
        let first = self.find_child(index);
        let last = self.find_child(end - 1);
        let mut out = Vec::with_capacity(last - first + 1);
        for e in &self.children[first..=last] {
            let total = e.node.total();
            let lo = index.max(e.base) - e.base;
            let hi = end.min(e.base + total) - e.base;
            if lo == 0 && hi == total {
                out.push(Arc::clone(&e.node));
            } else {
                out.push(Arc::new(e.node.copy_section(lo, hi - lo)));
            }
        }
        let mut inner = Inner::from_children(out, self.max);
        let len = inner.len();
        if len > 1 {
            inner.fix_undersized(len - 2, len - 1, NodeId::DETACHED, None);
            inner.fix_undersized(0, 1, NodeId::DETACHED, None);
        }
        inner
    }

    pub(crate) fn splice_edge(
        &mut self,
        height: usize,
        target: usize,
        nodes: Vec<NodeRef<T>>,
        side: Side,
        id: NodeId,
        obs: Obs<'_, T>,
    ) -> Outcome<T> {
        if height == target {
            let added = nodes.len();
            let entries = nodes.into_iter().map(|node| InnerEntry { base: 0, node });
            let seam = match side {
                Side::Right => {
                    let seam = self.children.len();
                    self.children.extend(entries);
                    seam
                }
                Side::Left => {
                    self.children.splice(0..0, entries);
                    added
                }
            };
            self.rebase_from(0);
            if self.children.len() > 1 {
                self.fix_undersized(seam.saturating_sub(1), seam.min(self.children.len() - 1), id, obs);
            }
            return self.split_if_overflowing();
        }

        let i = match side {
            Side::Right => self.children.len() - 1,
            Side::Left => 0,
        };
        if let Outcome::Split(right) = self.child_mut(i, id, obs).splice_edge(height - 1, target, nodes, side, obs) {
            self.link_split(i, right, id, obs);
        }
        self.rebase_from(i);
        self.split_if_overflowing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::alist::error::AListError;
    use crate::collections::alist::leaf::Leaf;
    use crate::collections::alist::sparse_leaf::SparseLeaf;

    fn leaf(range: std::ops::Range<i32>) -> NodeRef<i32> {
        Arc::new(Node::Leaf(Leaf::from_vec(range.collect(), 6)))
    }

    fn items(inner: &Inner<i32>) -> Vec<i32> {
        (0..inner.total()).map(|i| *inner.get(i).unwrap()).collect()
    }

    #[test]
    fn test_routing_and_bases() {
        let inner = Inner::from_children(vec![leaf(0..3), leaf(3..8), leaf(8..10)], 4);
        assert_eq!(inner.total(), 10);
        let bases: Vec<_> = inner.entries().iter().map(|e| e.base).collect();
        assert_eq!(bases, vec![0, 3, 8]);
        assert_eq!(inner.find_child(10), 2);
        assert_eq!(items(&inner), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_insert_into_full_leaf_shifts_to_neighbour() {
        let mut inner = Inner::from_children(vec![leaf(0..3), leaf(3..9)], 4);
        let right_before = Arc::as_ptr(&inner.entries()[1].node);
        inner.insert(5, 100, NodeId::DETACHED, None).unwrap();
        assert_eq!(inner.len(), 2, "a neighbour had room, so no split");
        assert_eq!(inner.total(), 10);
        assert_eq!(items(&inner), vec![0, 1, 2, 3, 4, 100, 5, 6, 7, 8]);
        assert_eq!(Arc::as_ptr(&inner.entries()[1].node), right_before);
    }

    #[test]
    fn test_remove_merges_undersized_child() {
        let mut inner = Inner::from_children(vec![leaf(0..3), leaf(3..6), leaf(6..9)], 4);
        let undersized = inner.remove_range(3, 2, NodeId::DETACHED, None);
        assert_eq!(items(&inner), vec![0, 1, 2, 5, 6, 7, 8]);
        assert!(inner.children().all(|c| !c.is_undersized()));
        assert!(inner.len() < 3);
        assert_eq!(undersized, inner.len() * 2 < 4);
    }

    #[test]
    fn test_copy_section_shares_interior_children() {
        let leaves = (0..6).map(|i| leaf(i * 4..i * 4 + 4)).collect();
        let inner = Inner::from_children(leaves, 8);
        let copy = inner.copy_section(2, 20);
        assert_eq!(items(&copy), (2..22).collect::<Vec<_>>());
        assert!(copy.children().all(|c| !c.is_undersized()));
        let shared = copy
            .entries()
            .iter()
            .filter(|e| inner.entries().iter().any(|o| Arc::ptr_eq(&o.node, &e.node)))
            .count();
        assert_eq!(shared, 2);
    }

    fn sparse_leaf(slots: usize, set: &[usize]) -> NodeRef<u32> {
        let mut l = SparseLeaf::new(6);
        l.apply(0, &mut SparseOp::insert_empty(slots), NodeId::DETACHED, None);
        for &i in set {
            l.apply(i, &mut SparseOp::replace_value(i as u32), NodeId::DETACHED, None);
        }
        Arc::new(Node::Sparse(l))
    }

    #[test]
    fn test_clear_across_sparse_children() {
        let mut inner = Inner::from_children(
            vec![sparse_leaf(10, &[1, 4, 8]), sparse_leaf(10, &[0, 3, 9]), sparse_leaf(10, &[2, 5, 7])],
            4,
        );
        let outcome = inner.apply_sparse(5, &mut SparseOp::clear(17), NodeId::DETACHED, None).unwrap();
        assert!(matches!(outcome, Outcome::Done | Outcome::Undersized));
        assert_eq!(inner.total(), 30);
        let set: Vec<usize> = (0..30).filter(|&i| inner.get(i).is_some()).collect();
        assert_eq!(set, vec![1, 4, 22, 25, 27]);
        assert!(inner.children().all(|c| !c.is_undersized()));
    }

    #[test]
    fn test_clear_on_dense_children_reports_unsupported() {
        let mut inner = Inner::from_children(vec![leaf(0..3), leaf(3..6)], 4);
        let result = inner.apply_sparse(1, &mut SparseOp::clear(4), NodeId::DETACHED, None);
        assert!(matches!(result, Err(AListError::Unsupported(_))));
    }
}
