//! Iterators and version-checked cursors.

use super::dense::AList;
use super::error::{AListError, Result};
use super::inner::InnerEntry;
use super::node::Node;
use super::observer::NodeId;
use super::sparse::SparseAList;
use super::sparse_leaf::SparseEntry;
use std::iter::Peekable;
use std::slice;

/// Depth-first walk over the leaves of a tree, yielding each leaf with the absolute
/// index of its first slot.
pub(crate) struct LeafWalk<'a, T> {
    stack: Vec<(slice::Iter<'a, InnerEntry<T>>, usize)>,
    pending: Option<(&'a Node<T>, usize)>,
}

impl<'a, T> LeafWalk<'a, T> {
    pub(crate) fn new(root: Option<&'a Node<T>>) -> Self {
        Self { stack: Vec::new(), pending: root.map(|r| (r, 0)) }
    }
}

impl<'a, T> Iterator for LeafWalk<'a, T> {
    type Item = (&'a Node<T>, usize);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (node, base) = match self.pending.take() {
                Some(next) => next,
                None => {
                    let (children, parent_base) = self.stack.last_mut()?;
                    let parent_base = *parent_base;
                    match children.next() {
                        Some(e) => (&*e.node, parent_base + e.base),
                        None => {
                            self.stack.pop();
                            continue;
                        }
                    }
                }
            };
            match node {
                Node::Inner(n) => self.stack.push((n.entries().iter(), base)),
                leaf => return Some((leaf, base)),
            }
        }
    }
}

/// Items of an [`AList`] in order.
pub struct Iter<'a, T> {
    leaves: LeafWalk<'a, T>,
    current: slice::Iter<'a, T>,
    remaining: usize,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(root: Option<&'a Node<T>>, len: usize) -> Self {
        Self { leaves: LeafWalk::new(root), current: [].iter(), remaining: len }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        loop {
            if let Some(item) = self.current.next() {
                self.remaining -= 1;
                return Some(item);
            }
            match self.leaves.next()? {
                (Node::Leaf(l), _) => self.current = l.items().iter(),
                _ => return None,
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

/// Leaves of an [`AList`] with their identities, as reported to observers.
pub struct Leaves<'a, T> {
    walk: LeafWalk<'a, T>,
}

impl<'a, T> Leaves<'a, T> {
    pub(crate) fn new(root: Option<&'a Node<T>>) -> Self {
        Self { walk: LeafWalk::new(root) }
    }
}

impl<'a, T> Iterator for Leaves<'a, T> {
    type Item = (NodeId, &'a [T]);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (node, _) = self.walk.next()?;
            if let Node::Leaf(l) = node {
                return Some((node.id(), l.items()));
            }
        }
    }
}

/// `(index, item)` for every stored slot of a [`SparseAList`], in index order.
pub struct SetEntries<'a, T> {
    leaves: LeafWalk<'a, T>,
    current: slice::Iter<'a, SparseEntry<T>>,
    base: usize,
}

impl<'a, T> SetEntries<'a, T> {
    pub(crate) fn new(root: Option<&'a Node<T>>) -> Self {
        Self { leaves: LeafWalk::new(root), current: [].iter(), base: 0 }
    }
}

impl<'a, T> Iterator for SetEntries<'a, T> {
    type Item = (usize, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(e) = self.current.next() {
                return Some((self.base + e.offset, &e.item));
            }
            match self.leaves.next()? {
                (Node::Sparse(s), base) => {
                    self.current = s.entries().iter();
                    self.base = base;
                }
                _ => return None,
            }
        }
    }
}

/// Every slot of a [`SparseAList`], `None` where unset.
pub struct SparseIter<'a, T> {
    set: Peekable<SetEntries<'a, T>>,
    pos: usize,
    len: usize,
}

impl<'a, T> SparseIter<'a, T> {
    pub(crate) fn new(root: Option<&'a Node<T>>, len: usize) -> Self {
        Self { set: SetEntries::new(root).peekable(), pos: 0, len }
    }
}

impl<'a, T> Iterator for SparseIter<'a, T> {
    type Item = Option<&'a T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.len {
            return None;
        }
        let slot = match self.set.peek() {
            Some(&(index, item)) if index == self.pos => {
                self.set.next();
                Some(item)
            }
            _ => None,
        };
        self.pos += 1;
        Some(slot)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.len - self.pos;
        (n, Some(n))
    }
}

impl<T> ExactSizeIterator for SparseIter<'_, T> {}

fn check_version(expected: u64, actual: u64) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(AListError::Stale { expected, actual })
    }
}

/// A position in an [`AList`] that does not borrow the list.
///
/// The cursor remembers the list's version when it was created. Once the list is
/// structurally modified (insertions, removals, splices) every call fails with
/// [`AListError::Stale`]. Overwriting items with `set` keeps the cursor valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AListCursor {
    index: usize,
    version: u64,
}

impl AListCursor {
    pub(crate) fn new(index: usize, version: u64) -> Self {
        Self { index, version }
    }

    /// Index of the item the next call to [`next`](Self::next) returns.
    pub fn position(&self) -> usize {
        self.index
    }

    pub fn next<'a, T>(&mut self, list: &'a AList<T>) -> Result<Option<&'a T>> {
        check_version(self.version, list.version())?;
        let item = list.get(self.index);
        if item.is_some() {
            self.index += 1;
        }
        Ok(item)
    }
}

/// Walks the stored slots of a [`SparseAList`] without borrowing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SparseCursor {
    from: usize,
    version: u64,
}

impl SparseCursor {
    pub(crate) fn new(version: u64) -> Self {
        Self { from: 0, version }
    }

    /// Returns the next stored `(index, item)` pair.
    pub fn next<'a, T>(&mut self, list: &'a SparseAList<T>) -> Result<Option<(usize, &'a T)>> {
        check_version(self.version, list.version())?;
        let Some(index) = list.set_at_or_after(self.from) else {
            self.from = list.len();
            return Ok(None);
        };
        self.from = index + 1;
        Ok(list.get(index)?.map(|item| (index, item)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::config::AListConfig;
    use super::*;

    #[test]
    fn test_iter_crosses_leaves() {
        let list: AList<u32> = AList::from_vec_with_config((0..100).collect(), AListConfig::new(4, 4).unwrap()).unwrap();
        assert!(list.height() > 1);
        let it = list.iter();
        assert_eq!(it.len(), 100);
        assert!(it.copied().eq(0..100));
        let sizes: usize = list.leaves().map(|(_, items)| items.len()).sum();
        assert_eq!(sizes, 100);
    }

    #[test]
    fn test_sparse_iter_and_set_entries() {
        let mut list = SparseAList::new();
        list.insert_space(0, 6).unwrap();
        list.set(1, 'a').unwrap();
        list.set(4, 'b').unwrap();
        assert_eq!(list.iter_set().collect::<Vec<_>>(), vec![(1, &'a'), (4, &'b')]);
        assert_eq!(
            list.iter().collect::<Vec<_>>(),
            vec![None, Some(&'a'), None, None, Some(&'b'), None]
        );
    }

    #[test]
    fn test_cursor_goes_stale_after_insert() {
        let mut list: AList<i32> = (0..5).collect();
        let mut cursor = list.cursor();
        assert_eq!(cursor.next(&list), Ok(Some(&0)));
        list.set(3, 30).unwrap();
        assert_eq!(cursor.next(&list), Ok(Some(&1)));
        list.push(5).unwrap();
        assert!(matches!(cursor.next(&list), Err(AListError::Stale { .. })));
    }

    #[test]
    fn test_sparse_cursor_visits_set_slots() {
        let mut list = SparseAList::new();
        list.insert_space(0, 1000).unwrap();
        list.set(10, 1).unwrap();
        list.set(900, 2).unwrap();
        let mut cursor = list.cursor();
        assert_eq!(cursor.next(&list), Ok(Some((10, &1))));
        assert_eq!(cursor.next(&list), Ok(Some((900, &2))));
        assert_eq!(cursor.next(&list), Ok(None));
    }
}
