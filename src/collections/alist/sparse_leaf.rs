//! Sparse leaf: `(offset, item)` pairs spread over a larger virtual span.
//!
//! Only explicitly assigned slots are stored. `total` is the number of virtual slots
//! the leaf covers and is independent of `entries.len()`, so inserting or clearing a
//! gap costs O(entries after the gap) regardless of the gap's size.
//!
//! Every mutation goes through [`SparseLeaf::apply`] with a [`SparseOp`]; the leaf has
//! no separate per-item insert or set.

use super::node::Outcome;
use super::observer::{NodeId, Obs};

#[derive(Debug, Clone)]
pub(crate) struct SparseEntry<T> {
    pub(crate) offset: usize,
    pub(crate) item: T,
}

/// One sparse mutation.
///
/// | `is_insert` | `write_empty` | effect                                   |
/// |-------------|---------------|------------------------------------------|
/// | true        | true          | open `count` unset slots                 |
/// | false       | true          | unset `count` slots, positions unchanged |
/// | true        | false         | open one slot holding `value`            |
/// | false       | false         | store `value` in an existing slot        |
#[derive(Debug)]
pub(crate) struct SparseOp<T> {
    pub(crate) is_insert: bool,
    pub(crate) write_empty: bool,
    pub(crate) count: usize,
    pub(crate) value: Option<T>,
    /// Filled in by a replacing write that overwrote a stored item.
    pub(crate) replaced: Option<T>,
}

impl<T> SparseOp<T> {
    pub(crate) fn insert_empty(count: usize) -> Self {
        Self { is_insert: true, write_empty: true, count, value: None, replaced: None }
    }

    pub(crate) fn clear(count: usize) -> Self {
        Self { is_insert: false, write_empty: true, count, value: None, replaced: None }
    }

    pub(crate) fn insert_value(value: T) -> Self {
        Self { is_insert: true, write_empty: false, count: 1, value: Some(value), replaced: None }
    }

    pub(crate) fn replace_value(value: T) -> Self {
        Self { is_insert: false, write_empty: false, count: 1, value: Some(value), replaced: None }
    }

    /// The same operation restricted to `count` slots of a child.
    pub(crate) fn narrowed(&self, count: usize) -> Self {
        debug_assert!(self.write_empty);
        Self { is_insert: self.is_insert, write_empty: true, count, value: None, replaced: None }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SparseLeaf<T> {
    entries: Vec<SparseEntry<T>>,
    total: usize,
    max: u16,
}

impl<T> SparseLeaf<T> {
    pub(crate) fn new(max: u16) -> Self {
        Self { entries: Vec::new(), total: 0, max }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub(crate) fn total(&self) -> usize {
        self.total
    }

    #[inline]
    pub(crate) fn max_size(&self) -> usize {
        self.max as usize
    }

    #[inline]
    pub(crate) fn entries(&self) -> &[SparseEntry<T>] {
        &self.entries
    }

    #[inline]
    fn search(&self, offset: usize) -> Result<usize, usize> {
        self.entries.binary_search_by_key(&offset, |e| e.offset)
    }

    #[inline]
    fn first_at_or_after(&self, offset: usize) -> usize {
        self.entries.partition_point(|e| e.offset < offset)
    }

    pub(crate) fn get(&self, index: usize) -> Option<&T> {
        self.search(index).ok().map(|p| &self.entries[p].item)
    }

    pub(crate) fn next_set_at_or_after(&self, index: usize) -> Option<usize> {
        self.entries.get(self.first_at_or_after(index)).map(|e| e.offset)
    }

    pub(crate) fn last_set_at_or_before(&self, index: usize) -> Option<usize> {
        let p = self.entries.partition_point(|e| e.offset <= index);
        p.checked_sub(1).map(|p| self.entries[p].offset)
    }

    pub(crate) fn apply(&mut self, index: usize, op: &mut SparseOp<T>, id: NodeId, obs: Obs<'_, T>) -> Outcome<T> {
        if op.write_empty {
            if op.is_insert {
                self.insert_space(index, op.count);
                return Outcome::Done;
            }
            self.clear(index, op.count, id, obs);
            return if self.is_undersized() { Outcome::Undersized } else { Outcome::Done };
        }

        let found = self.search(index);
        if let (Ok(p), false) = (found, op.is_insert) {
            if let Some(value) = op.value.take() {
                let old = std::mem::replace(&mut self.entries[p].item, value);
                if let Some(o) = obs {
                    o.item_removed(&old, id);
                    o.item_added(&self.entries[p].item, id);
                }
                op.replaced = Some(old);
            }
            return Outcome::Done;
        }
        if self.entries.len() >= self.max_size() {
            return Outcome::Full;
        }
        let Some(value) = op.value.take() else {
            return Outcome::Done;
        };
        let p = match found {
            Ok(p) | Err(p) => p,
        };
        if op.is_insert {
            for e in &mut self.entries[p..] {
                e.offset += 1;
            }
            self.total += 1;
        }
        self.entries.insert(p, SparseEntry { offset: index, item: value });
        if let Some(o) = obs {
            o.item_added(&self.entries[p].item, id);
        }
        Outcome::Done
    }

    fn insert_space(&mut self, index: usize, count: usize) {
        let p = self.first_at_or_after(index);
        for e in &mut self.entries[p..] {
            e.offset += count;
        }
        self.total += count;
    }

    fn clear(&mut self, index: usize, count: usize, id: NodeId, obs: Obs<'_, T>) -> usize {
        let lo = self.first_at_or_after(index);
        let hi = self.first_at_or_after(index + count);
        if let Some(o) = obs {
            for e in &self.entries[lo..hi] {
                o.item_removed(&e.item, id);
            }
        }
        self.entries.drain(lo..hi);
        lo
    }

    /// Deletes `count` virtual slots; later entries shift down.
    pub(crate) fn remove_range(&mut self, index: usize, count: usize, id: NodeId, obs: Obs<'_, T>) -> bool {
        let lo = self.clear(index, count, id, obs);
        for e in &mut self.entries[lo..] {
            e.offset -= count;
        }
        self.total -= count;
        self.is_undersized()
    }

    #[inline]
    fn is_undersized(&self) -> bool {
        self.entries.len() * 3 <= self.max_size()
    }

    /// Splits at the offset of the middle entry; the right half is rebased to it.
    pub(crate) fn split(&mut self) -> SparseLeaf<T> {
        let mid = self.entries.len() / 2;
        let at = self.entries.get(mid).map_or(self.total, |e| e.offset);
        let mut right = self.entries.split_off(mid);
        for e in &mut right {
            e.offset -= at;
        }
        let right = SparseLeaf { entries: right, total: self.total - at, max: self.max };
        self.total = at;
        right
    }

    /// Moves the span up to and including `right`'s first entry to the end of `self`.
    /// With no entries in `right`, its whole span moves. Returns the slots moved.
    pub(crate) fn take_from_right(&mut self, right: &mut SparseLeaf<T>, id: NodeId, right_id: NodeId, obs: Obs<'_, T>) -> usize {
        if right.entries.is_empty() {
            let moved = right.total;
            self.total += moved;
            right.total = 0;
            return moved;
        }
        let first = right.entries.remove(0);
        let moved = first.offset + 1;
        if let Some(o) = obs {
            o.item_moved(&first.item, right_id, id);
        }
        self.entries.push(SparseEntry { offset: self.total + first.offset, item: first.item });
        self.total += moved;
        for e in &mut right.entries {
            e.offset -= moved;
        }
        right.total -= moved;
        moved
    }

    /// Moves the span from `left`'s last entry to its end onto the front of `self`.
    pub(crate) fn take_from_left(&mut self, left: &mut SparseLeaf<T>, id: NodeId, left_id: NodeId, obs: Obs<'_, T>) -> usize {
        let Some(last) = left.entries.pop() else {
            let moved = left.total;
            for e in &mut self.entries {
                e.offset += moved;
            }
            self.total += moved;
            left.total = 0;
            return moved;
        };
        let moved = left.total - last.offset;
        if let Some(o) = obs {
            o.item_moved(&last.item, left_id, id);
        }
        for e in &mut self.entries {
            e.offset += moved;
        }
        self.entries.insert(0, SparseEntry { offset: 0, item: last.item });
        self.total += moved;
        left.total = last.offset;
        moved
    }

    pub(crate) fn append(&mut self, right: SparseLeaf<T>, id: NodeId, right_id: NodeId, obs: Obs<'_, T>) {
        let shift = self.total;
        self.entries.reserve(right.entries.len());
        for e in right.entries {
            if let Some(o) = obs {
                o.item_moved(&e.item, right_id, id);
            }
            self.entries.push(SparseEntry { offset: e.offset + shift, item: e.item });
        }
        self.total += right.total;
    }

    pub(crate) fn prepend(&mut self, mut left: SparseLeaf<T>, id: NodeId, left_id: NodeId, obs: Obs<'_, T>) {
        if let Some(o) = obs {
            for e in &left.entries {
                o.item_moved(&e.item, left_id, id);
            }
        }
        for e in &mut self.entries {
            e.offset += left.total;
        }
        left.entries.append(&mut self.entries);
        self.entries = left.entries;
        self.total += left.total;
    }
}

impl<T: Clone> SparseLeaf<T> {
    pub(crate) fn copy_section(&self, index: usize, count: usize) -> SparseLeaf<T> {
        let lo = self.first_at_or_after(index);
        let hi = self.first_at_or_after(index + count);
        let entries = self.entries[lo..hi]
            .iter()
            .map(|e| SparseEntry { offset: e.offset - index, item: e.item.clone() })
            .collect();
        SparseLeaf { entries, total: count, max: self.max }
    }
}
