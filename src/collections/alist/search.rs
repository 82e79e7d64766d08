//! Child routing for inner nodes.

/// Returns the largest `i < len` with `base_of(i) <= index`.
///
/// `base_of` must be non-decreasing with `base_of(0) == 0`. Capacities are small
/// (at most 255 children), so the search steps through descending powers of two
/// instead of maintaining a `lo..hi` window.
#[inline]
pub(crate) fn find_base(len: usize, index: usize, base_of: impl Fn(usize) -> usize) -> usize {
    debug_assert!(len > 0);
    let mut at = 0;
    let mut step = len.next_power_of_two() >> 1;
    while step > 0 {
        let probe = at + step;
        if probe < len && base_of(probe) <= index {
            at = probe;
        }
        step >>= 1;
    }
    at
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reference(bases: &[usize], index: usize) -> usize {
        bases.partition_point(|&b| b <= index) - 1
    }

    #[test]
    fn test_find_base_simple() {
        let bases = [0, 4, 9, 9, 20];
        assert_eq!(find_base(bases.len(), 0, |i| bases[i]), 0);
        assert_eq!(find_base(bases.len(), 3, |i| bases[i]), 0);
        assert_eq!(find_base(bases.len(), 4, |i| bases[i]), 1);
        assert_eq!(find_base(bases.len(), 19, |i| bases[i]), 3);
        assert_eq!(find_base(bases.len(), 500, |i| bases[i]), 4);
        assert_eq!(find_base(1, 42, |_| 0), 0);
    }

    proptest! {
        #[test]
        fn test_find_base_matches_partition_point(
            sizes in proptest::collection::vec(1usize..50, 1..255),
            probe in 0usize..20_000,
        ) {
            let mut bases = Vec::with_capacity(sizes.len());
            let mut acc = 0;
            for s in &sizes {
                bases.push(acc);
                acc += s;
            }
            let index = probe % (acc + 1);
            prop_assert_eq!(find_base(bases.len(), index, |i| bases[i]), reference(&bases, index));
        }
    }
}
