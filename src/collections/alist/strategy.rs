//! `proptest` strategies for lists, enabled by the `proptest` feature.

use super::config::AListConfig;
use super::dense::AList;
use super::sparse::SparseAList;
use proptest::collection::{vec, SizeRange};
use proptest::prelude::*;
use proptest::sample::Index;
use std::fmt::Debug;

/// Valid configurations, biased towards small nodes so trees get several levels deep.
pub fn configs() -> impl Strategy<Value = AListConfig> {
    prop_oneof![
        3 => (4u16..=8, 4u16..=6),
        1 => (4u16..=64, 4u16..=32),
    ]
    .prop_map(|(max_leaf_size, max_inner_size)| AListConfig { max_leaf_size, max_inner_size })
}

/// Dense lists with elements drawn from `element`.
pub fn alists<S>(element: S, size: impl Into<SizeRange>) -> impl Strategy<Value = AList<S::Value>>
where
    S: Strategy,
    S::Value: Clone + Debug,
{
    (configs(), vec(element, size))
        .prop_filter_map("valid config", |(config, items)| AList::from_vec_with_config(items, config).ok())
}

/// Sparse lists of up to `max_len` slots with up to `max_set` of them assigned.
pub fn sparse_alists<S>(element: S, max_len: usize, max_set: usize) -> impl Strategy<Value = SparseAList<S::Value>>
where
    S: Strategy,
    S::Value: Clone + Debug,
{
    (configs(), 1..=max_len.max(1), vec((any::<Index>(), element), 0..=max_set)).prop_filter_map(
        "valid config",
        |(config, len, picks)| {
            let entries = picks.into_iter().map(|(at, value)| (at.index(len), value));
            SparseAList::from_entries(len, entries, config).ok()
        },
    )
}
