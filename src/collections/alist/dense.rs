//! [`AList`]: an indexed sequence with O(log n) insert, remove, and structural sharing.

use super::base::{bulk_load, AListBase, FreezeMode};
use super::change::{delta, ListChangeAction, ListChangeInfo, ListChangingHandler};
use super::config::AListConfig;
use super::error::{AListError, Result};
use super::iter::{AListCursor, Iter, Leaves};
use super::node::Side;
use super::observer::SharedObserver;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Index;
use std::slice;

/// A list stored as a balanced tree of shared, copy-on-write nodes.
///
/// Indexing, insertion and removal anywhere cost O(log n). Cloning is O(1): both
/// lists share every node until one of them writes, and only the path to the write
/// is copied. `copy_section`, `remove_section`, `append` and `prepend` also share
/// whole subtrees instead of copying items.
///
/// # Examples
///
/// ```
/// use alist::AList;
///
/// let mut list: AList<i32> = (0..5).collect();
/// list.insert(2, 10)?;
/// let copy = list.clone();
/// list.remove(0)?;
/// assert_eq!(list.to_vec(), vec![1, 10, 2, 3, 4]);
/// assert_eq!(copy.to_vec(), vec![0, 1, 10, 2, 3, 4]);
/// # Ok::<(), alist::AListError>(())
/// ```
pub struct AList<T> {
    base: AListBase<T>,
    handlers: Vec<ListChangingHandler<AList<T>, T>>,
}

impl<T> AList<T> {
    pub fn new() -> Self {
        Self::from_base(AListBase::new(AListConfig::default(), false))
    }

    pub fn with_config(config: AListConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_base(AListBase::new(config, false)))
    }

    /// Builds a balanced tree directly from `items`.
    pub fn from_vec(items: Vec<T>) -> Self {
        Self::build(items, AListConfig::default())
    }

    pub fn from_vec_with_config(items: Vec<T>, config: AListConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(items, config))
    }

    fn build(items: Vec<T>, config: AListConfig) -> Self {
        let mut base = AListBase::new(config, false);
        base.count = items.len();
        base.root = bulk_load(items, config);
        Self::from_base(base)
    }

    fn from_base(base: AListBase<T>) -> Self {
        Self { base, handlers: Vec::new() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.base.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.base.count == 0
    }

    pub fn config(&self) -> AListConfig {
        self.base.config
    }

    /// Structural version. Bumped by every operation that inserts, removes, or splices.
    pub fn version(&self) -> u64 {
        self.base.version
    }

    pub fn mode(&self) -> FreezeMode {
        self.base.mode
    }

    /// Number of levels of inner nodes; `0` for a list that fits in one leaf.
    pub fn height(&self) -> usize {
        self.base.height()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.base.get(index)
    }

    pub fn first(&self) -> Option<&T> {
        self.get(0)
    }

    pub fn last(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.base.root(), self.len())
    }

    /// Every leaf in order, with the id observers know it by.
    pub fn leaves(&self) -> Leaves<'_, T> {
        Leaves::new(self.base.root())
    }

    /// A cursor at index 0 tied to the current version.
    pub fn cursor(&self) -> AListCursor {
        AListCursor::new(0, self.base.version)
    }

    pub fn index_of(&self, item: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.iter().position(|x| x == item)
    }

    pub fn contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.index_of(item).is_some()
    }

    /// Verifies the tree's structural invariants.
    pub fn check_invariants(&self) -> Result<()> {
        self.base.check_invariants()
    }

    pub fn observer(&self) -> Option<&SharedObserver<T>> {
        self.base.observer.as_ref()
    }

    /// Attaches (or detaches, with `None`) an observer and returns the previous one.
    /// A new observer is told about every item already in the list.
    pub fn set_observer(&mut self, observer: Option<SharedObserver<T>>) -> Option<SharedObserver<T>> {
        self.base.set_observer(observer)
    }

    /// Registers a callback that runs before every modification.
    pub fn add_change_handler(&mut self, handler: impl Fn(&AList<T>, &ListChangeInfo<'_, T>) + Send + Sync + 'static) {
        self.handlers.push(std::sync::Arc::new(handler));
    }

    /// Makes the list permanently read-only.
    pub fn freeze(&mut self) {
        self.base.mode = FreezeMode::Frozen;
    }

    pub fn freeze_for_concurrency(&mut self) {
        self.base.mode = FreezeMode::FrozenForConcurrency;
    }

    /// An O(1) read-only copy that can be handed to other threads.
    pub fn snapshot(&self) -> Self {
        let mut snapshot = self.clone();
        snapshot.base.mode = FreezeMode::FrozenForConcurrency;
        snapshot
    }

    /// Like `clone`, but the copy keeps this list's change handlers.
    pub fn clone_keeping_change_handlers(&self) -> Self {
        Self { base: self.base.share(), handlers: self.handlers.clone() }
    }

    /// Removes every item.
    pub fn clear(&mut self) -> Result<()> {
        self.notify(&ListChangeInfo::new(ListChangeAction::Remove, 0, -delta(self.len()), &[]))?;
        self.base.clear_all();
        Ok(())
    }

    /// Exchanges contents (and observers) with `other` in O(1).
    pub fn swap(&mut self, other: &mut AList<T>) -> Result<()> {
        self.base.check_writable()?;
        other.base.check_writable()?;
        self.base.swap(&mut other.base);
        Ok(())
    }

    fn notify(&mut self, info: &ListChangeInfo<'_, T>) -> Result<()> {
        self.base.check_writable()?;
        if self.handlers.is_empty() {
            return Ok(());
        }
        self.base.mode = FreezeMode::FrozenForListChanging;
        let this: &Self = self;
        for handler in &this.handlers {
            handler(this, info);
        }
        self.base.mode = FreezeMode::Unfrozen;
        Ok(())
    }
}

impl<T: Clone> AList<T> {
    /// Replaces the item at `index`, returning the old one.
    pub fn set(&mut self, index: usize, value: T) -> Result<T> {
        self.base.check_index(index)?;
        self.notify(&ListChangeInfo::new(ListChangeAction::Replace, index, 0, slice::from_ref(&value)))?;
        self.base.set(index, value)
    }

    pub fn insert(&mut self, index: usize, item: T) -> Result<()> {
        self.base.check_position(index)?;
        self.base.check_capacity(1)?;
        self.notify(&ListChangeInfo::new(ListChangeAction::Add, index, 1, slice::from_ref(&item)))?;
        self.base.insert(index, item)
    }

    pub fn push(&mut self, item: T) -> Result<()> {
        self.insert(self.len(), item)
    }

    pub fn pop(&mut self) -> Result<Option<T>> {
        match self.len().checked_sub(1) {
            Some(last) => self.remove(last).map(Some),
            None => self.base.check_writable().map(|()| None),
        }
    }

    pub fn remove(&mut self, index: usize) -> Result<T> {
        let item = self
            .get(index)
            .cloned()
            .ok_or(AListError::IndexOutOfRange { index, len: self.len() })?;
        self.remove_range(index, 1)?;
        Ok(item)
    }

    pub fn remove_range(&mut self, index: usize, count: usize) -> Result<()> {
        self.base.check_range(index, count)?;
        self.notify(&ListChangeInfo::new(ListChangeAction::Remove, index, -delta(count), &[]))?;
        self.base.remove_range(index, count);
        Ok(())
    }

    /// Inserts `items` at `index`.
    ///
    /// Up to one leaf's worth of items is inserted item by item. Larger batches are
    /// bulk-loaded into a separate tree and spliced in.
    pub fn insert_range<I: IntoIterator<Item = T>>(&mut self, index: usize, items: I) -> Result<()> {
        let items: Vec<T> = items.into_iter().collect();
        let n = items.len();
        self.base.check_position(index)?;
        self.base.check_capacity(n)?;
        self.notify(&ListChangeInfo::new(ListChangeAction::Add, index, delta(n), &items))?;
        if n <= self.base.config.max_leaf_size as usize {
            for (i, item) in items.into_iter().enumerate() {
                self.base.insert(index + i, item)?;
            }
            return Ok(());
        }
        let config = self.base.config;
        let mut middle = AListBase::new(config, false);
        middle.count = n;
        middle.root = bulk_load(items, config);
        self.splice_at(index, middle)
    }

    /// Inserts the contents of `other` at `index`, sharing its nodes.
    pub fn insert_list(&mut self, index: usize, other: &AList<T>) -> Result<()> {
        self.base.check_position(index)?;
        self.base.check_capacity(other.len())?;
        self.notify(&ListChangeInfo::new(ListChangeAction::Add, index, delta(other.len()), &[]))?;
        let middle = other.base.share().conform(self.base.config)?;
        self.splice_at(index, middle)
    }

    fn splice_at(&mut self, index: usize, middle: AListBase<T>) -> Result<()> {
        let tail = self.base.remove_section(index, self.len() - index);
        self.base.combine(middle, Side::Right)?;
        self.base.combine(tail, Side::Right)
    }

    /// Moves every item of `other` to the end of this list.
    ///
    /// Only the nodes along the right edge of the taller tree are modified.
    pub fn append(&mut self, other: AList<T>) -> Result<()> {
        self.base.check_capacity(other.len())?;
        self.notify(&ListChangeInfo::new(ListChangeAction::Add, self.len(), delta(other.len()), &[]))?;
        let other = other.base.conform(self.base.config)?;
        self.base.combine(other, Side::Right)
    }

    /// Moves every item of `other` to the front of this list.
    pub fn prepend(&mut self, other: AList<T>) -> Result<()> {
        self.base.check_capacity(other.len())?;
        self.notify(&ListChangeInfo::new(ListChangeAction::Add, 0, delta(other.len()), &[]))?;
        let other = other.base.conform(self.base.config)?;
        self.base.combine(other, Side::Left)
    }

    /// A new list holding `[index, index + count)`. Interior subtrees are shared.
    pub fn copy_section(&self, index: usize, count: usize) -> Result<AList<T>> {
        self.base.check_range(index, count)?;
        Ok(Self::from_base(self.base.copy_section(index, count)))
    }

    /// Removes `[index, index + count)` and returns it as a new list.
    pub fn remove_section(&mut self, index: usize, count: usize) -> Result<AList<T>> {
        self.base.check_range(index, count)?;
        self.notify(&ListChangeInfo::new(ListChangeAction::Remove, index, -delta(count), &[]))?;
        Ok(Self::from_base(self.base.remove_section(index, count)))
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T> Clone for AList<T> {
    /// O(1). The copy shares every node, and has no observer or change handlers.
    fn clone(&self) -> Self {
        Self::from_base(self.base.share())
    }
}

impl<T> Default for AList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for AList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for AList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for AList<T> {}

impl<T> Index<usize> for AList<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(item) => item,
            None => panic!("index out of bounds: the len is {} but the index is {index}", self.len()),
        }
    }
}

impl<T> FromIterator<T> for AList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T: Clone> Extend<T> for AList<T> {
    /// # Panics
    ///
    /// Panics if the list is read-only or would exceed the maximum length.
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        if let Err(err) = self.insert_range(self.len(), iter) {
            panic!("cannot extend list: {err}");
        }
    }
}

impl<'a, T> IntoIterator for &'a AList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<T: Serialize> Serialize for AList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for AList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(Self::from_vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn small(n: i32) -> AList<i32> {
        AList::from_vec_with_config((0..n).collect(), AListConfig::new(4, 4).unwrap()).unwrap()
    }

    #[test]
    fn test_basic_operations() {
        let mut list = AList::new();
        list.push(1).unwrap();
        list.push(3).unwrap();
        list.insert(1, 2).unwrap();
        assert_eq!(list.to_vec(), vec![1, 2, 3]);
        assert_eq!(list.set(0, 10).unwrap(), 1);
        assert_eq!(list[0], 10);
        assert_eq!(list.first(), Some(&10));
        assert_eq!(list.last(), Some(&3));
        assert_eq!(list.index_of(&2), Some(1));
        assert!(!list.contains(&7));
        assert_eq!(list.pop().unwrap(), Some(3));
        assert_eq!(list.remove(0).unwrap(), 10);
        assert_eq!(list.to_vec(), vec![2]);
        list.clear().unwrap();
        assert!(list.is_empty());
        assert_eq!(list.pop().unwrap(), None);
    }

    #[test]
    fn test_index_errors() {
        let mut list = small(3);
        assert_eq!(list.get(3), None);
        assert_eq!(list.insert(4, 0), Err(AListError::IndexOutOfRange { index: 4, len: 3 }));
        assert_eq!(
            list.remove_range(2, 2),
            Err(AListError::RangeOutOfBounds { index: 2, count: 2, len: 3 })
        );
        assert!(list.set(3, 0).is_err());
        assert!(list.copy_section(1, 5).is_err());
    }

    #[test]
    fn test_insert_range_large_batch() {
        let mut list = small(10);
        list.insert_range(5, 100..130).unwrap();
        list.check_invariants().unwrap();
        let mut expected: Vec<i32> = (0..5).collect();
        expected.extend(100..130);
        expected.extend(5..10);
        assert_eq!(list.to_vec(), expected);
    }

    #[test]
    fn test_insert_list_with_other_config() {
        let mut list = small(6);
        let other: AList<i32> = (100..200).collect();
        list.insert_list(3, &other).unwrap();
        list.check_invariants().unwrap();
        assert_eq!(list.len(), 106);
        assert_eq!(list[3], 100);
        assert_eq!(list[103], 3);
        assert_eq!(other.len(), 100);
    }

    #[test]
    fn test_frozen_list_rejects_writes() {
        let mut list = small(5);
        list.freeze();
        assert_eq!(list.push(1), Err(AListError::ReadOnly { mode: FreezeMode::Frozen }));
        assert!(list.set(0, 1).is_err());
        let mut copy = list.clone();
        copy.push(5).unwrap();
        assert_eq!(list.len(), 5);
        assert_eq!(copy.len(), 6);
    }

    #[test]
    fn test_change_handlers_run_before_mutation() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut list = small(3);
        list.add_change_handler(move |l, info| {
            sink.lock().unwrap().push((info.action, info.index, info.size_change, l.len(), l.mode()));
        });
        list.push(3).unwrap();
        list.set(0, 9).unwrap();
        list.remove_range(0, 2).unwrap();
        assert_eq!(list.mode(), FreezeMode::Unfrozen);
        let seen = seen.lock().unwrap();
        let listening = FreezeMode::FrozenForListChanging;
        assert_eq!(
            *seen,
            vec![
                (ListChangeAction::Add, 3, 1, 3, listening),
                (ListChangeAction::Replace, 0, 0, 4, listening),
                (ListChangeAction::Remove, 0, -2, 4, listening),
            ]
        );
    }

    #[test]
    fn test_clone_drops_handlers_unless_asked() {
        let mut list = small(2);
        list.add_change_handler(|_, _| {});
        assert!(list.clone().handlers.is_empty());
        assert_eq!(list.clone_keeping_change_handlers().handlers.len(), 1);
    }

    #[test]
    fn test_swap_exchanges_contents() {
        let mut a = small(3);
        let mut b: AList<i32> = vec![7].into_iter().collect();
        let (va, vb) = (a.version(), b.version());
        a.swap(&mut b).unwrap();
        assert_eq!(a.to_vec(), vec![7]);
        assert_eq!(b.to_vec(), vec![0, 1, 2]);
        assert!(a.version() != va && b.version() != vb);
    }

    #[test]
    fn test_serde_round_trip() {
        let list = small(20);
        let json = serde_json::to_string(&list).unwrap();
        assert_eq!(json, serde_json::to_string(&(0..20).collect::<Vec<_>>()).unwrap());
        let back: AList<i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, list);
    }
}
