use alist::{AListConfig, AListError, AListObserver, FreezeMode, NodeId, SharedObserver, SparseAList, MAX_LEN};
use proptest::prelude::*;
use proptest::sample::Index;
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_million_slot_gap() {
    let mut list = SparseAList::new();
    list.insert_space(0, 1_000_000).unwrap();
    list.set(500_000, "x").unwrap();
    assert_eq!(list.get(0).unwrap(), None);
    assert_eq!(list.get_or_default(0).unwrap(), "");
    assert_eq!(list.get(500_000).unwrap(), Some(&"x"));
    assert_eq!(list.len(), 1_000_000);
    assert_eq!(list.height(), 0, "a single leaf spans the whole gap");
    assert_eq!(list.iter_set().count(), 1);
    list.check_invariants().unwrap();
}

#[test]
fn test_gap_reads_unset_and_clear_keeps_length() {
    let config = AListConfig::new(4, 4).unwrap();
    let mut list = SparseAList::with_config(config).unwrap();
    list.insert_space(0, 200).unwrap();
    for i in (0..200).step_by(2) {
        list.set(i, i).unwrap();
    }
    assert!(list.height() > 1);
    list.insert_space(50, 1000).unwrap();
    assert!((50..1050).all(|i| !list.is_set(i) && list.get(i).unwrap().is_none()));
    assert_eq!(list.get(1050).unwrap(), Some(&50));

    list.clear(0, 1100).unwrap();
    list.check_invariants().unwrap();
    assert_eq!(list.len(), 1200);
    assert_eq!(list.first_set_index(), Some(1100));
    assert_eq!(list.get(1100).unwrap(), Some(&100));
}

#[test]
fn test_sections_and_append() {
    let config = AListConfig::new(4, 4).unwrap();
    let entries = (0..300).filter(|i| i % 7 == 0).map(|i| (i, i));
    let mut list = SparseAList::from_entries(300, entries, config).unwrap();
    let section = list.remove_section(100, 100).unwrap();
    section.check_invariants().unwrap();
    list.check_invariants().unwrap();
    assert_eq!(section.len(), 100);
    assert_eq!(section.first_set_index(), Some(5));
    assert_eq!(list.next_higher_set_index(98), Some(103));
    assert_eq!(list.get(103).unwrap(), Some(&203));

    list.append(section.clone()).unwrap();
    list.prepend(section).unwrap();
    list.check_invariants().unwrap();
    assert_eq!(list.len(), 400);
    assert_eq!(list.get(5).unwrap(), Some(&105));
    assert_eq!(list.get(305).unwrap(), Some(&105));
}

#[test]
fn test_full_list_rejects_growth_without_changing() {
    let mut list = SparseAList::new();
    list.insert_space(0, MAX_LEN).unwrap();
    list.set(7, 1u8).unwrap();
    list.set(MAX_LEN - 1, 2).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    list.add_change_handler(move |_, _| {
        seen.fetch_add(1, Ordering::Relaxed);
    });
    let version = list.version();
    let overflow = |result: Result<(), AListError>| matches!(result, Err(AListError::CapacityOverflow { .. }));

    assert!(overflow(list.insert_space(0, 1)));
    assert!(overflow(list.insert(0, 3)));
    assert!(overflow(list.insert_range(MAX_LEN, [4, 5])));
    assert!(overflow(list.push(6)));
    let mut one = SparseAList::new();
    one.insert(0, 9).unwrap();
    assert!(overflow(list.append(one.clone())));
    assert!(overflow(list.prepend(one)));

    assert_eq!(calls.load(Ordering::Relaxed), 0, "no handler runs for a rejected call");
    assert_eq!(list.version(), version);
    assert_eq!(list.len(), MAX_LEN);
    assert_eq!(list.iter_set().collect::<Vec<_>>(), vec![(7, &1), (MAX_LEN - 1, &2)]);
    list.check_invariants().unwrap();

    // Clearing past the end clamps instead of overflowing.
    list.clear(0, usize::MAX).unwrap();
    assert_eq!(list.len(), MAX_LEN);
    assert_eq!(list.first_set_index(), None);
}

#[test]
fn test_read_only_sparse_lists_reject_writes() {
    let mut list = SparseAList::new();
    list.insert_space(0, 10).unwrap();
    list.set(2, 'a').unwrap();

    let mut snapshot = list.snapshot();
    let concurrent = Err(AListError::ReadOnly { mode: FreezeMode::FrozenForConcurrency });
    assert_eq!(snapshot.set(3, 'b'), concurrent.clone().map(|()| None));
    assert_eq!(snapshot.clear(0, 5), concurrent);
    assert_eq!(snapshot.insert_space(0, 5), concurrent);
    assert_eq!(snapshot.remove_range(0, 1), concurrent);
    assert_eq!(snapshot.len(), 10);
    assert_eq!(snapshot.get(2).unwrap(), Some(&'a'));

    list.freeze();
    let frozen = Err(AListError::ReadOnly { mode: FreezeMode::Frozen });
    assert_eq!(list.clear(2, 1), frozen);
    assert_eq!(list.insert_space(10, 1), frozen);
    assert_eq!(list.set(2, 'z'), frozen.map(|()| None));
    assert_eq!(list.iter_set().collect::<Vec<_>>(), vec![(2, &'a')]);

    // A clone of a frozen list is writable again.
    let mut copy = list.clone();
    copy.set(3, 'b').unwrap();
    assert_eq!(copy.mode(), FreezeMode::Unfrozen);
}

#[derive(Default)]
struct Counter(AtomicIsize);

impl AListObserver<u32> for Counter {
    fn item_added(&self, _: &u32, _: NodeId) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    fn item_removed(&self, _: &u32, _: NodeId) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }

    fn cleared(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

#[test]
fn test_observer_counts_stored_entries() {
    let counter = Arc::new(Counter::default());
    let mut list = SparseAList::with_config(AListConfig::new(4, 4).unwrap()).unwrap();
    list.insert_space(0, 100).unwrap();
    list.set(3, 3).unwrap();
    list.set_observer(Some(Arc::clone(&counter) as SharedObserver<u32>));
    for i in 10..60 {
        list.set(i, i as u32).unwrap();
    }
    list.set(10, 99).unwrap();
    list.clear(20, 10).unwrap();
    list.remove_range(40, 5).unwrap();
    let stored = list.iter_set().count() as isize;
    assert_eq!(counter.0.load(Ordering::Relaxed), stored);
    list.clear_all().unwrap();
    assert_eq!(counter.0.load(Ordering::Relaxed), 0);
}

#[derive(Debug, Clone)]
enum Operation {
    InsertSpace(Index, usize),
    Set(Index, u16),
    Insert(Index, u16),
    Clear(Index, usize),
    RemoveRange(Index, usize),
}

fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        1 => (any::<Index>(), 0usize..50).prop_map(|(i, n)| Operation::InsertSpace(i, n)),
        3 => (any::<Index>(), any::<u16>()).prop_map(|(i, v)| Operation::Set(i, v)),
        1 => (any::<Index>(), any::<u16>()).prop_map(|(i, v)| Operation::Insert(i, v)),
        1 => (any::<Index>(), 0usize..30).prop_map(|(i, n)| Operation::Clear(i, n)),
        1 => (any::<Index>(), 0usize..30).prop_map(|(i, n)| Operation::RemoveRange(i, n)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn test_sparse_matches_option_vec(ops in proptest::collection::vec(operation(), 1..120)) {
        let mut list = SparseAList::with_config(AListConfig::new(4, 4).unwrap()).unwrap();
        let mut model: Vec<Option<u16>> = Vec::new();
        for op in ops {
            match op {
                Operation::InsertSpace(i, n) => {
                    let at = i.index(model.len() + 1);
                    list.insert_space(at, n).unwrap();
                    model.splice(at..at, std::iter::repeat(None).take(n));
                }
                Operation::Set(i, v) => {
                    if !model.is_empty() {
                        let at = i.index(model.len());
                        prop_assert_eq!(list.set(at, v).unwrap(), model[at].replace(v));
                    }
                }
                Operation::Insert(i, v) => {
                    let at = i.index(model.len() + 1);
                    list.insert(at, v).unwrap();
                    model.insert(at, Some(v));
                }
                Operation::Clear(i, n) => {
                    let at = i.index(model.len() + 1);
                    list.clear(at, n).unwrap();
                    let end = (at + n).min(model.len());
                    model[at..end].iter_mut().for_each(|slot| *slot = None);
                }
                Operation::RemoveRange(i, n) => {
                    let at = i.index(model.len() + 1);
                    let n = n.min(model.len() - at);
                    list.remove_range(at, n).unwrap();
                    model.drain(at..at + n);
                }
            }
            list.check_invariants().unwrap();
            prop_assert_eq!(list.len(), model.len());
        }
        let slots: Vec<Option<u16>> = list.iter().map(|slot| slot.copied()).collect();
        prop_assert_eq!(&slots, &model);
        for i in 0..model.len() {
            let higher = (i + 1..model.len()).find(|&j| model[j].is_some());
            prop_assert_eq!(list.next_higher_set_index(i), higher);
            let lower = (0..i).rev().find(|&j| model[j].is_some());
            prop_assert_eq!(list.next_lower_set_index(i), lower);
        }
    }
}
