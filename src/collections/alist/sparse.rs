//! [`SparseAList`]: a list in which only explicitly assigned slots are stored.

use super::base::{AListBase, FreezeMode};
use super::change::{delta, ListChangeAction, ListChangeInfo, ListChangingHandler};
use super::config::AListConfig;
use super::error::Result;
use super::iter::{SetEntries, SparseCursor, SparseIter};
use super::node::Side;
use super::observer::SharedObserver;
use super::sparse_leaf::SparseOp;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::slice;

/// A sparse indexed list.
///
/// Every index in `0..len()` exists, but only slots that were assigned a value take
/// memory. Unset slots read as `None` (or `T::default()` through
/// [`get_or_default`](Self::get_or_default)). Opening or clearing a range of any size
/// costs time proportional to the stored entries it touches, not to its length.
///
/// ```
/// use alist::SparseAList;
///
/// let mut list = SparseAList::new();
/// list.insert_space(0, 1_000_000)?;
/// list.set(500_000, "x")?;
/// assert_eq!(list.get(0)?, None);
/// assert_eq!(list.get(500_000)?, Some(&"x"));
/// assert_eq!(list.len(), 1_000_000);
/// # Ok::<(), alist::AListError>(())
/// ```
pub struct SparseAList<T> {
    base: AListBase<T>,
    handlers: Vec<ListChangingHandler<SparseAList<T>, T>>,
}

impl<T> SparseAList<T> {
    pub fn new() -> Self {
        Self::from_base(AListBase::new(AListConfig::default(), true))
    }

    pub fn with_config(config: AListConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_base(AListBase::new(config, true)))
    }

    fn from_base(base: AListBase<T>) -> Self {
        Self { base, handlers: Vec::new() }
    }

    /// Number of slots, set or not.
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

    pub fn version(&self) -> u64 {
        self.base.version
    }

    pub fn mode(&self) -> FreezeMode {
        self.base.mode
    }

    pub fn height(&self) -> usize {
        self.base.height()
    }

    /// The value stored at `index`, or `None` if the slot is unset.
    pub fn get(&self, index: usize) -> Result<Option<&T>> {
        self.base.check_index(index)?;
        Ok(self.base.get(index))
    }

    pub fn get_or_default(&self, index: usize) -> Result<T>
    where
        T: Clone + Default,
    {
        Ok(self.get(index)?.cloned().unwrap_or_default())
    }

    /// Whether a value is stored at `index`. Out-of-range indices are unset.
    pub fn is_set(&self, index: usize) -> bool {
        self.base.get(index).is_some()
    }

    pub(crate) fn set_at_or_after(&self, index: usize) -> Option<usize> {
        self.base.root().and_then(|r| r.next_set_at_or_after(index))
    }

    /// Smallest set index strictly greater than `index`.
    pub fn next_higher_set_index(&self, index: usize) -> Option<usize> {
        self.set_at_or_after(index.checked_add(1)?)
    }

    /// Largest set index strictly less than `index`. `index` is clamped to `len()`.
    pub fn next_lower_set_index(&self, index: usize) -> Option<usize> {
        let below = index.min(self.len()).checked_sub(1)?;
        self.base.root().and_then(|r| r.last_set_at_or_before(below))
    }

    pub fn first_set_index(&self) -> Option<usize> {
        self.set_at_or_after(0)
    }

    pub fn last_set_index(&self) -> Option<usize> {
        self.next_lower_set_index(self.len())
    }

    /// Stored `(index, value)` pairs in index order.
    pub fn iter_set(&self) -> SetEntries<'_, T> {
        SetEntries::new(self.base.root())
    }

    /// Every slot in order; `None` where unset.
    pub fn iter(&self) -> SparseIter<'_, T> {
        SparseIter::new(self.base.root(), self.len())
    }

    pub fn cursor(&self) -> SparseCursor {
        SparseCursor::new(self.base.version)
    }

    pub fn check_invariants(&self) -> Result<()> {
        self.base.check_invariants()
    }

    pub fn observer(&self) -> Option<&SharedObserver<T>> {
        self.base.observer.as_ref()
    }

    pub fn set_observer(&mut self, observer: Option<SharedObserver<T>>) -> Option<SharedObserver<T>> {
        self.base.set_observer(observer)
    }

    pub fn add_change_handler(&mut self, handler: impl Fn(&SparseAList<T>, &ListChangeInfo<'_, T>) + Send + Sync + 'static) {
        self.handlers.push(std::sync::Arc::new(handler));
    }

    pub fn freeze(&mut self) {
        self.base.mode = FreezeMode::Frozen;
    }

    pub fn freeze_for_concurrency(&mut self) {
        self.base.mode = FreezeMode::FrozenForConcurrency;
    }

    pub fn snapshot(&self) -> Self {
        let mut snapshot = self.clone();
        snapshot.base.mode = FreezeMode::FrozenForConcurrency;
        snapshot
    }

    pub fn clone_keeping_change_handlers(&self) -> Self {
        Self { base: self.base.share(), handlers: self.handlers.clone() }
    }

    /// Removes every slot.
    pub fn clear_all(&mut self) -> Result<()> {
        self.notify(&ListChangeInfo::new(ListChangeAction::Remove, 0, -delta(self.len()), &[]))?;
        self.base.clear_all();
        Ok(())
    }

    pub fn swap(&mut self, other: &mut SparseAList<T>) -> Result<()> {
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

impl<T: Clone> SparseAList<T> {
    /// Builds a list of `len` slots with the given `(index, value)` pairs set.
    pub fn from_entries<I>(len: usize, entries: I, config: AListConfig) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, T)>,
    {
        let mut list = Self::with_config(config)?;
        list.insert_space(0, len)?;
        for (index, value) in entries {
            list.set(index, value)?;
        }
        Ok(list)
    }

    /// Stores `value` at `index`, returning the value previously stored there.
    pub fn set(&mut self, index: usize, value: T) -> Result<Option<T>> {
        self.base.check_index(index)?;
        self.notify(&ListChangeInfo::new(ListChangeAction::Replace, index, 0, slice::from_ref(&value)))?;
        let mut op = SparseOp::replace_value(value);
        self.base.apply_sparse(index, &mut op)?;
        Ok(op.replaced)
    }

    /// Inserts a new slot holding `value`; later slots shift up by one.
    pub fn insert(&mut self, index: usize, value: T) -> Result<()> {
        self.base.check_position(index)?;
        self.base.check_capacity(1)?;
        self.notify(&ListChangeInfo::new(ListChangeAction::Add, index, 1, slice::from_ref(&value)))?;
        self.base.apply_sparse(index, &mut SparseOp::insert_value(value))?;
        self.base.count += 1;
        self.base.bump();
        Ok(())
    }

    pub fn push(&mut self, value: T) -> Result<()> {
        self.insert(self.len(), value)
    }

    /// Inserts `values` as consecutive set slots starting at `index`.
    pub fn insert_range<I: IntoIterator<Item = T>>(&mut self, index: usize, values: I) -> Result<()> {
        let values: Vec<T> = values.into_iter().collect();
        self.base.check_position(index)?;
        self.base.check_capacity(values.len())?;
        self.notify(&ListChangeInfo::new(ListChangeAction::Add, index, delta(values.len()), &values))?;
        for (i, value) in values.into_iter().enumerate() {
            self.base.apply_sparse(index + i, &mut SparseOp::insert_value(value))?;
            self.base.count += 1;
        }
        self.base.bump();
        Ok(())
    }

    /// Opens `count` unset slots at `index`.
    pub fn insert_space(&mut self, index: usize, count: usize) -> Result<()> {
        self.base.check_position(index)?;
        self.base.check_capacity(count)?;
        self.notify(&ListChangeInfo::new(ListChangeAction::Add, index, delta(count), &[]))?;
        if count == 0 {
            return Ok(());
        }
        self.base.apply_sparse(index, &mut SparseOp::insert_empty(count))?;
        self.base.count += count;
        self.base.bump();
        Ok(())
    }

    /// Unsets `count` slots from `index`. The count is clamped at the end of the list
    /// and no slot changes position.
    pub fn clear(&mut self, index: usize, count: usize) -> Result<()> {
        self.base.check_position(index)?;
        let count = count.min(self.len() - index);
        self.notify(&ListChangeInfo::new(ListChangeAction::Clear, index, 0, &[]))?;
        if count == 0 {
            return Ok(());
        }
        self.base.apply_sparse(index, &mut SparseOp::clear(count))
    }

    /// Removes one slot, returning its value if it was set.
    pub fn remove(&mut self, index: usize) -> Result<Option<T>> {
        self.base.check_index(index)?;
        let value = self.base.get(index).cloned();
        self.remove_range(index, 1)?;
        Ok(value)
    }

    pub fn remove_range(&mut self, index: usize, count: usize) -> Result<()> {
        self.base.check_range(index, count)?;
        self.notify(&ListChangeInfo::new(ListChangeAction::Remove, index, -delta(count), &[]))?;
        self.base.remove_range(index, count);
        Ok(())
    }

    pub fn append(&mut self, other: SparseAList<T>) -> Result<()> {
        self.base.check_capacity(other.len())?;
        self.notify(&ListChangeInfo::new(ListChangeAction::Add, self.len(), delta(other.len()), &[]))?;
        let other = other.base.conform(self.base.config)?;
        self.base.combine(other, Side::Right)
    }

    pub fn prepend(&mut self, other: SparseAList<T>) -> Result<()> {
        self.base.check_capacity(other.len())?;
        self.notify(&ListChangeInfo::new(ListChangeAction::Add, 0, delta(other.len()), &[]))?;
        let other = other.base.conform(self.base.config)?;
        self.base.combine(other, Side::Left)
    }

    pub fn copy_section(&self, index: usize, count: usize) -> Result<SparseAList<T>> {
        self.base.check_range(index, count)?;
        Ok(Self::from_base(self.base.copy_section(index, count)))
    }

    pub fn remove_section(&mut self, index: usize, count: usize) -> Result<SparseAList<T>> {
        self.base.check_range(index, count)?;
        self.notify(&ListChangeInfo::new(ListChangeAction::Remove, index, -delta(count), &[]))?;
        Ok(Self::from_base(self.base.remove_section(index, count)))
    }
}

impl<T> Clone for SparseAList<T> {
    fn clone(&self) -> Self {
        Self::from_base(self.base.share())
    }
}

impl<T> Default for SparseAList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for SparseAList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparseAList")
            .field("len", &self.len())
            .field("entries", &self.iter_set().collect::<Vec<_>>())
            .finish()
    }
}

impl<T: PartialEq> PartialEq for SparseAList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter_set().eq(other.iter_set())
    }
}

impl<T: Eq> Eq for SparseAList<T> {}

#[derive(Serialize)]
struct SparseRef<'a, T> {
    len: usize,
    entries: Vec<(usize, &'a T)>,
}

#[derive(Deserialize)]
struct SparseOwned<T> {
    len: usize,
    entries: Vec<(usize, T)>,
}

impl<T: Serialize> Serialize for SparseAList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        SparseRef { len: self.len(), entries: self.iter_set().collect() }.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de> + Clone> Deserialize<'de> for SparseAList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = SparseOwned::<T>::deserialize(deserializer)?;
        let ordered = raw.entries.windows(2).all(|w| w[0].0 < w[1].0);
        let bounded = raw.entries.last().map_or(true, |(i, _)| *i < raw.len);
        if !ordered || !bounded {
            return Err(D::Error::custom("sparse entries must be strictly increasing and below len"));
        }
        SparseAList::from_entries(raw.len, raw.entries, AListConfig::default()).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> SparseAList<u32> {
        SparseAList::with_config(AListConfig::new(4, 4).unwrap()).unwrap()
    }

    #[test]
    fn test_set_returns_previous_value() {
        let mut list = small();
        list.insert_space(0, 10).unwrap();
        assert_eq!(list.set(3, 1).unwrap(), None);
        assert_eq!(list.set(3, 2).unwrap(), Some(1));
        assert_eq!(list.get(3).unwrap(), Some(&2));
        assert_eq!(list.get_or_default(4).unwrap(), 0);
        assert!(list.get(10).is_err());
    }

    #[test]
    fn test_set_index_queries() {
        let mut list = small();
        list.insert_space(0, 100).unwrap();
        for i in [5, 17, 40, 41, 99] {
            list.set(i, i as u32).unwrap();
        }
        list.check_invariants().unwrap();
        assert!(list.is_set(17));
        assert!(!list.is_set(18));
        assert!(!list.is_set(1000));
        assert_eq!(list.next_higher_set_index(5), Some(17));
        assert_eq!(list.next_higher_set_index(99), None);
        assert_eq!(list.next_lower_set_index(41), Some(40));
        assert_eq!(list.next_lower_set_index(5), None);
        assert_eq!(list.next_lower_set_index(usize::MAX), Some(99));
        assert_eq!(list.first_set_index(), Some(5));
        assert_eq!(list.last_set_index(), Some(99));
    }

    #[test]
    fn test_clear_keeps_positions_and_length() {
        let mut list = small();
        list.insert_space(0, 50).unwrap();
        for i in 0..50 {
            if i % 3 == 0 {
                list.set(i, i as u32).unwrap();
            }
        }
        list.clear(10, 20).unwrap();
        list.check_invariants().unwrap();
        assert_eq!(list.len(), 50);
        assert!((10..30).all(|i| !list.is_set(i)));
        assert_eq!(list.get(30).unwrap(), Some(&30));
        assert_eq!(list.get(9).unwrap(), Some(&9));
        // Past the end is clamped.
        list.clear(45, 100).unwrap();
        assert_eq!(list.last_set_index(), Some(42));
        assert!(list.clear(51, 1).is_err());
    }

    #[test]
    fn test_insert_shifts_later_slots() {
        let mut list = small();
        list.insert_space(0, 4).unwrap();
        list.set(2, 7).unwrap();
        list.insert(1, 9).unwrap();
        list.insert_space(0, 3).unwrap();
        assert_eq!(list.len(), 8);
        assert_eq!(list.iter_set().collect::<Vec<_>>(), vec![(4, &9), (6, &7)]);
        assert_eq!(list.remove(4).unwrap(), Some(9));
        assert_eq!(list.iter_set().collect::<Vec<_>>(), vec![(5, &7)]);
    }

    #[test]
    fn test_serde_validates_entries() {
        let mut list = small();
        list.insert_space(0, 5).unwrap();
        list.set(1, 10).unwrap();
        list.set(4, 40).unwrap();
        let json = serde_json::to_string(&list).unwrap();
        assert_eq!(json, r#"{"len":5,"entries":[[1,10],[4,40]]}"#);
        let back: SparseAList<u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, list);
        assert!(serde_json::from_str::<SparseAList<u32>>(r#"{"len":3,"entries":[[3,1]]}"#).is_err());
        assert!(serde_json::from_str::<SparseAList<u32>>(r#"{"len":9,"entries":[[2,1],[2,2]]}"#).is_err());
    }
}
