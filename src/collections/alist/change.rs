//! Change handlers: callbacks fired before a list is modified.

use std::sync::Arc;

/// Kind of modification about to happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListChangeAction {
    /// Items or empty slots are being inserted.
    Add,
    /// Items are being removed and later indices shift down.
    Remove,
    /// Existing slots are being overwritten.
    Replace,
    /// Sparse slots are being reset to unset; positions do not move.
    Clear,
}

/// Describes a pending modification.
///
/// Handlers run with the list in [`FreezeMode::FrozenForListChanging`](super::FreezeMode),
/// so the list they observe is still in its old state.
#[derive(Debug, Clone, Copy)]
pub struct ListChangeInfo<'a, T> {
    pub action: ListChangeAction,
    /// First index affected.
    pub index: usize,
    /// Net change in `len()`.
    pub size_change: isize,
    /// The new values, when they are at hand as a slice. Empty for empty-slot
    /// insertions and for whole-list splices.
    pub new_items: &'a [T],
}

impl<'a, T> ListChangeInfo<'a, T> {
    pub(crate) fn new(action: ListChangeAction, index: usize, size_change: isize, new_items: &'a [T]) -> Self {
        Self { action, index, size_change, new_items }
    }
}

/// Boxed handler as stored by a list of type `L`.
pub type ListChangingHandler<L, T> = Arc<dyn Fn(&L, &ListChangeInfo<'_, T>) + Send + Sync>;

/// Signed size delta for a count of slots. Counts never exceed `u32::MAX`.
#[inline]
pub(crate) fn delta(count: usize) -> isize {
    count as isize
}
