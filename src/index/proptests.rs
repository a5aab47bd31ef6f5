use super::*;

use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::BTreeMap;

/// Walks the whole tree and checks ordering, balance, stored heights, and that
/// every arena node is reachable from the root.
pub(super) fn validate_index(index: &StationIndex) {
    let mut reachable = 0usize;
    if let Some(root) = index.root {
        let h = check_subtree(index, root, None, None, &mut reachable);
        assert_eq!(h, index.height());
    } else {
        assert_eq!(index.height(), 0, "empty index must have height 0");
    }
    assert_eq!(
        reachable,
        index.len(),
        "reachable node count must match StationIndex::len"
    );
}

/// Returns the checked height of the subtree rooted at `n`. Every id must lie
/// strictly between `lo` and `hi` when those are set.
fn check_subtree(
    index: &StationIndex,
    n: NodeId,
    lo: Option<u32>,
    hi: Option<u32>,
    reachable: &mut usize,
) -> u8 {
    *reachable += 1;
    let node = index.node(n);
    let id = node.station.id;
    if let Some(lo) = lo {
        assert!(id > lo, "id {id} sits right of {lo} but is not greater");
    }
    if let Some(hi) = hi {
        assert!(id < hi, "id {id} sits left of {hi} but is not smaller");
    }

    let lh = node
        .left
        .map_or(0, |l| check_subtree(index, l, lo, Some(id), reachable));
    let rh = node
        .right
        .map_or(0, |r| check_subtree(index, r, Some(id), hi, reachable));

    assert!(
        (i16::from(lh) - i16::from(rh)).abs() <= 1,
        "node {id} out of balance: left {lh}, right {rh}"
    );
    assert_eq!(
        node.height,
        lh.max(rh) + 1,
        "stored height of node {id} must match children"
    );
    node.height
}

#[derive(Arbitrary, Clone, Debug)]
enum Op {
    #[proptest(weight = 3)]
    Insert(
        #[proptest(strategy = "0u32..512")] u32,
        #[proptest(strategy = "1u64..1_000_000")] u64,
    ),
    #[proptest(weight = 3)]
    Accumulate(
        #[proptest(strategy = "0u32..512")] u32,
        #[proptest(strategy = "0u64..10_000")] u64,
    ),
    Find(#[proptest(strategy = "0u32..512")] u32),
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(any::<Op>(), 0..=2000)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence(ops in ops_strategy()) {
        let mut index = StationIndex::new();
        // id -> (capacity, consumption)
        let mut m: BTreeMap<u32, (u64, u64)> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(id, capacity) => {
                    let got = index.insert(id, capacity).unwrap().clone();
                    let &mut (c, l) = m.entry(id).or_insert((capacity, 0));
                    prop_assert_eq!((got.capacity(), got.consumption()), (c, l));
                }
                Op::Accumulate(id, load) => {
                    let hit = index.accumulate(id, load);
                    prop_assert_eq!(hit, m.contains_key(&id));
                    if let Some(entry) = m.get_mut(&id) {
                        entry.1 += load;
                    }
                }
                Op::Find(id) => {
                    let got = index.find(id).map(|s| (s.capacity(), s.consumption()));
                    prop_assert_eq!(got, m.get(&id).copied());
                }
            }

            prop_assert_eq!(index.len(), m.len());
        }

        validate_index(&index);
        let got: Vec<(u32, u64, u64)> = index
            .iter()
            .map(|s| (s.id(), s.capacity(), s.consumption()))
            .collect();
        let expected: Vec<(u32, u64, u64)> = m.iter().map(|(&id, &(c, l))| (id, c, l)).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_traversal_is_strictly_ascending(ids in prop::collection::vec(any::<u32>(), 0..=1000)) {
        let mut index = StationIndex::new();
        for &id in &ids {
            index.insert(id, 1).unwrap();
        }

        validate_index(&index);
        let got: Vec<u32> = index.iter().map(Station::id).collect();
        prop_assert!(got.windows(2).all(|w| w[0] < w[1]));

        let mut expected = ids.clone();
        expected.sort_unstable();
        expected.dedup();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_accumulation_sums_loads(loads in prop::collection::vec(0u64..1_000_000, 0..=200)) {
        let mut index = StationIndex::new();
        let station = index.insert(1, 1).unwrap();
        for &load in &loads {
            station.accumulate(load);
        }
        prop_assert_eq!(index.find(1).unwrap().consumption(), loads.iter().sum::<u64>());
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_insert_order_small_set() {
    let ids: Vec<u32> = vec![1, 2, 3, 4, 5, 6, 7];

    for_each_permutation(&ids, |perm| {
        let mut index = StationIndex::new();
        for &id in &perm {
            index.insert(id, u64::from(id) * 10).unwrap();
        }

        validate_index(&index);
        // Seven keys always fit in a tree of height 3 or 4 under AVL rules.
        assert!(index.height() <= 4, "order {perm:?} gave height {}", index.height());
        let got: Vec<(u32, u64)> = index.iter().map(|s| (s.id(), s.capacity())).collect();
        let expected: Vec<(u32, u64)> = ids.iter().map(|&id| (id, u64::from(id) * 10)).collect();
        assert_eq!(got, expected);
    });
}

#[test]
fn exhaustive_duplicate_inserts_do_not_restructure() {
    let ids: Vec<u32> = vec![10, 20, 30, 40, 50];

    for_each_permutation(&ids, |perm| {
        let mut index = StationIndex::new();
        for &id in &perm {
            index.insert(id, 1).unwrap();
        }
        let before = index.height();
        let root = index.root;

        for &id in &perm {
            index.insert(id, 2).unwrap();
        }

        validate_index(&index);
        assert_eq!(index.height(), before);
        assert_eq!(index.root, root);
        assert!(index.iter().all(|s| s.capacity() == 1));
    });
}
