use alist::{AList, AListConfig, SparseAList};
use crossbeam_utils::thread;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_lists_are_send_and_sync() {
    assert_send_sync::<AList<String>>();
    assert_send_sync::<SparseAList<String>>();
}

#[test]
fn test_snapshot_readers_while_original_changes() {
    let config = AListConfig::new(8, 4).unwrap();
    let mut list = AList::from_vec_with_config((0..5_000u64).collect(), config).unwrap();
    let snapshot = list.snapshot();
    let expected: u64 = (0..5_000).sum();

    let shared = &snapshot;
    thread::scope(|s| {
        let readers: Vec<_> = (0..4)
            .map(|_| s.spawn(move |_| (0..20).map(|_| shared.iter().sum::<u64>()).collect::<Vec<_>>()))
            .collect();

        for i in 0..2_000u64 {
            list.insert((i as usize * 31) % list.len(), i).unwrap();
            if i % 3 == 0 {
                list.remove(0).unwrap();
            }
        }

        for reader in readers {
            let sums = reader.join().unwrap();
            assert!(sums.iter().all(|&sum| sum == expected));
        }
    })
    .unwrap();

    assert_eq!(snapshot.len(), 5_000);
    assert!(snapshot.iter().copied().eq(0..5_000));
    list.check_invariants().unwrap();
    snapshot.check_invariants().unwrap();
}

#[test]
fn test_clones_edited_on_separate_threads() {
    let base: AList<u32> = (0..2_000).collect();
    let results: Vec<AList<u32>> = thread::scope(|s| {
        let handles: Vec<_> = (0..4u32)
            .map(|t| {
                let mut mine = base.clone();
                s.spawn(move |_| {
                    for i in 0..100 {
                        mine.insert((i * 17 + t as usize) % mine.len(), 10_000 * (t + 1) + i as u32).unwrap();
                    }
                    mine.remove_range(0, 10).unwrap();
                    mine
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert!(base.iter().copied().eq(0..2_000));
    for (t, list) in results.iter().enumerate() {
        list.check_invariants().unwrap();
        assert_eq!(list.len(), 2_090);
        let own = 10_000 * (t as u32 + 1);
        assert!(list.iter().all(|&x| x < 2_000 || (own..own + 100).contains(&x)));
    }
}
