//! Dense leaf: a contiguous run of up to `max` items.

use super::observer::{NodeId, Obs};

#[derive(Debug, Clone)]
pub(crate) struct Leaf<T> {
    items: Vec<T>,
    max: u16,
}

impl<T> Leaf<T> {
    pub(crate) fn new(max: u16) -> Self {
        Self { items: Vec::new(), max }
    }

    pub(crate) fn from_vec(items: Vec<T>, max: u16) -> Self {
        debug_assert!(items.len() <= max as usize);
        Self { items, max }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub(crate) fn max_size(&self) -> usize {
        self.max as usize
    }

    #[inline]
    pub(crate) fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    #[inline]
    pub(crate) fn items(&self) -> &[T] {
        &self.items
    }

    /// Inserts `item` at `index`. The caller guarantees spare capacity.
    pub(crate) fn insert(&mut self, index: usize, item: T, id: NodeId, obs: Obs<'_, T>) {
        debug_assert!(self.items.len() < self.max_size());
        self.items.insert(index, item);
        if let Some(o) = obs {
            o.item_added(&self.items[index], id);
        }
    }

    pub(crate) fn set(&mut self, index: usize, value: T, id: NodeId, obs: Obs<'_, T>) -> T {
        let old = std::mem::replace(&mut self.items[index], value);
        if let Some(o) = obs {
            o.item_removed(&old, id);
            o.item_added(&self.items[index], id);
        }
        old
    }

    /// Removes `count` items starting at `index`; returns whether the leaf is now undersized.
    pub(crate) fn remove_range(&mut self, index: usize, count: usize, id: NodeId, obs: Obs<'_, T>) -> bool {
        if let Some(o) = obs {
            o.removing_items(&self.items[index..index + count], id, false);
        }
        self.items.drain(index..index + count);
        self.items.len() * 3 <= self.max_size()
    }

    /// Moves the upper half into a new leaf. The lower `len >> 1` items stay here.
    pub(crate) fn split(&mut self) -> Leaf<T> {
        let at = self.items.len() >> 1;
        Leaf {
            items: self.items.split_off(at),
            max: self.max,
        }
    }

    /// Appends the first item of `right`. Returns the number of indices moved.
    pub(crate) fn take_from_right(&mut self, right: &mut Leaf<T>, id: NodeId, right_id: NodeId, obs: Obs<'_, T>) -> usize {
        if right.items.is_empty() {
            return 0;
        }
        let item = right.items.remove(0);
        if let Some(o) = obs {
            o.item_moved(&item, right_id, id);
        }
        self.items.push(item);
        1
    }

    /// Prepends the last item of `left`. Returns the number of indices moved.
    pub(crate) fn take_from_left(&mut self, left: &mut Leaf<T>, id: NodeId, left_id: NodeId, obs: Obs<'_, T>) -> usize {
        let Some(item) = left.items.pop() else {
            return 0;
        };
        if let Some(o) = obs {
            o.item_moved(&item, left_id, id);
        }
        self.items.insert(0, item);
        1
    }

    /// Absorbs every item of `right` (a former right sibling).
    pub(crate) fn append(&mut self, right: Leaf<T>, id: NodeId, right_id: NodeId, obs: Obs<'_, T>) {
        if let Some(o) = obs {
            o.removing_items(&right.items, right_id, true);
            o.adding_items(&right.items, id, true);
        }
        self.items.extend(right.items);
    }

    /// Absorbs every item of `left` (a former left sibling).
    pub(crate) fn prepend(&mut self, mut left: Leaf<T>, id: NodeId, left_id: NodeId, obs: Obs<'_, T>) {
        if let Some(o) = obs {
            o.removing_items(&left.items, left_id, true);
            o.adding_items(&left.items, id, true);
        }
        left.items.append(&mut self.items);
        self.items = left.items;
    }
}

impl<T: Clone> Leaf<T> {
    pub(crate) fn copy_section(&self, index: usize, count: usize) -> Leaf<T> {
        Leaf {
            items: self.items[index..index + count].to_vec(),
            max: self.max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(items: &[i32]) -> Leaf<i32> {
        Leaf::from_vec(items.to_vec(), 8)
    }

    #[test]
    fn test_leaf_insert_and_remove() {
        let mut l = leaf(&[1, 2, 4]);
        l.insert(2, 3, NodeId::DETACHED, None);
        assert_eq!(l.items(), &[1, 2, 3, 4]);
        let undersized = l.remove_range(1, 2, NodeId::DETACHED, None);
        assert_eq!(l.items(), &[1, 4]);
        assert!(undersized);
    }

    #[test]
    fn test_leaf_split_keeps_lower_half() {
        let mut l = leaf(&[0, 1, 2, 3, 4]);
        let right = l.split();
        assert_eq!(l.items(), &[0, 1]);
        assert_eq!(right.items(), &[2, 3, 4]);
    }

    #[test]
    fn test_leaf_transfers() {
        let mut a = leaf(&[1, 2]);
        let mut b = leaf(&[3, 4]);
        let d = NodeId::DETACHED;
        assert_eq!(a.take_from_right(&mut b, d, d, None), 1);
        assert_eq!(a.items(), &[1, 2, 3]);
        assert_eq!(b.take_from_left(&mut a, d, d, None), 1);
        assert_eq!(b.items(), &[3, 4]);
        b.prepend(a, d, d, None);
        assert_eq!(b.items(), &[1, 2, 3, 4]);
    }
}
