use crate::iter::SeekOp;
use crate::tree::{InsertOutcome, RadixTree};

use proptest::prelude::*;
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
enum Op {
    Insert(Vec<u8>, u64),
    TryInsert(Vec<u8>, u64),
    Remove(Vec<u8>),
    Get(Vec<u8>),
}

fn key_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // A tiny alphabet and short keys force prefix sharing, run splits and
    // re-compression far more often than uniform bytes would.
    prop::collection::vec(
        prop_oneof![Just(b'a'), Just(b'b'), Just(b'c'), Just(0u8), Just(0xff)],
        0..=12,
    )
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let key = key_strategy();
    let op = prop_oneof![
        45 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::Insert(k, v)),
        10 => (key.clone(), any::<u64>()).prop_map(|(k, v)| Op::TryInsert(k, v)),
        25 => key.clone().prop_map(Op::Remove),
        20 => key.prop_map(Op::Get),
    ];
    prop::collection::vec(op, 0..=500)
}

fn collect(tree: &RadixTree<u64>) -> Vec<(Vec<u8>, u64)> {
    let mut out = Vec::new();
    let mut it = tree.iter();
    it.seek(SeekOp::First, b"").unwrap();
    while it.next().unwrap() {
        out.push((it.key().to_vec(), *it.value().unwrap()));
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_with_btreemap(ops in ops_strategy()) {
        let mut tree: RadixTree<u64> = RadixTree::new();
        let mut map: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) => {
                    let outcome = tree.insert(&key, Some(value)).unwrap();
                    let old = map.insert(key, value);
                    match old {
                        None => prop_assert_eq!(outcome, InsertOutcome::Added),
                        Some(v) => {
                            prop_assert_eq!(outcome, InsertOutcome::Replaced(Some(v)))
                        }
                    }
                }
                Op::TryInsert(key, value) => {
                    let outcome = tree.try_insert(&key, Some(value)).unwrap();
                    if map.contains_key(&key) {
                        prop_assert_eq!(outcome, InsertOutcome::Rejected(Some(value)));
                    } else {
                        prop_assert_eq!(outcome, InsertOutcome::Added);
                        map.insert(key, value);
                    }
                }
                Op::Remove(key) => {
                    let got = tree.remove(&key).map(|v| v.unwrap());
                    prop_assert_eq!(got, map.remove(key.as_slice()));
                }
                Op::Get(key) => {
                    let got = tree.get(&key).map(|v| v.copied().unwrap());
                    prop_assert_eq!(got, map.get(key.as_slice()).copied());
                }
            }
            prop_assert_eq!(tree.len(), map.len() as u64);
        }

        tree.assert_invariants();
        let expected: Vec<(Vec<u8>, u64)> =
            map.iter().map(|(k, v)| (k.clone(), *v)).collect();
        prop_assert_eq!(collect(&tree), expected);
    }

    #[test]
    fn prop_small_run_limit_equivalence(ops in ops_strategy()) {
        // A tiny run limit exercises suffix chunking and the merge bound.
        let mut tree: RadixTree<u64> = RadixTree::with_run_limit(3);
        let mut map: BTreeMap<Vec<u8>, u64> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, value) | Op::TryInsert(key, value) => {
                    if !map.contains_key(&key) {
                        tree.insert(&key, Some(value)).unwrap();
                        map.insert(key, value);
                    }
                }
                Op::Remove(key) => {
                    let got = tree.remove(&key).map(|v| v.unwrap());
                    prop_assert_eq!(got, map.remove(key.as_slice()));
                }
                Op::Get(key) => {
                    let got = tree.get(&key).map(|v| v.copied().unwrap());
                    prop_assert_eq!(got, map.get(key.as_slice()).copied());
                }
            }
        }

        tree.assert_invariants();
        let expected: Vec<(Vec<u8>, u64)> =
            map.iter().map(|(k, v)| (k.clone(), *v)).collect();
        prop_assert_eq!(collect(&tree), expected);
    }

    #[test]
    fn prop_seek_matches_btreemap_bounds(
        keys in prop::collection::vec(key_strategy(), 1..=64),
        probe in key_strategy(),
    ) {
        use std::ops::Bound;

        let mut tree: RadixTree<u64> = RadixTree::new();
        let mut map: BTreeMap<Vec<u8>, u64> = BTreeMap::new();
        for (i, key) in keys.iter().enumerate() {
            tree.insert(key, Some(i as u64)).unwrap();
            map.insert(key.clone(), i as u64);
        }

        let mut it = tree.iter();

        it.seek(SeekOp::Ge, &probe).unwrap();
        let expected = map.range(probe.clone()..).next();
        match expected {
            Some((k, _)) => prop_assert_eq!(it.key(), k.as_slice()),
            None => prop_assert!(it.eof()),
        }

        it.seek(SeekOp::Gt, &probe).unwrap();
        let expected = map
            .range((Bound::Excluded(probe.clone()), Bound::Unbounded))
            .next();
        match expected {
            Some((k, _)) => prop_assert_eq!(it.key(), k.as_slice()),
            None => prop_assert!(it.eof()),
        }

        it.seek(SeekOp::Le, &probe).unwrap();
        let expected = map.range(..=probe.clone()).next_back();
        match expected {
            Some((k, _)) => prop_assert_eq!(it.key(), k.as_slice()),
            None => prop_assert!(it.eof()),
        }

        it.seek(SeekOp::Lt, &probe).unwrap();
        let expected = map.range(..probe.clone()).next_back();
        match expected {
            Some((k, _)) => prop_assert_eq!(it.key(), k.as_slice()),
            None => prop_assert!(it.eof()),
        }

        it.seek(SeekOp::Eq, &probe).unwrap();
        if map.contains_key(&probe) {
            prop_assert_eq!(it.key(), probe.as_slice());
        } else {
            prop_assert!(it.eof());
        }
    }

    #[test]
    fn prop_backward_iteration_reverses_forward(
        keys in prop::collection::vec(key_strategy(), 0..=64),
    ) {
        let mut tree: RadixTree<u64> = RadixTree::new();
        for (i, key) in keys.iter().enumerate() {
            tree.insert(key, Some(i as u64)).unwrap();
        }

        let forward: Vec<Vec<u8>> =
            collect(&tree).into_iter().map(|(k, _)| k).collect();

        let mut it = tree.iter();
        it.seek(SeekOp::Last, b"").unwrap();
        let mut backward = Vec::new();
        while it.prev().unwrap() {
            backward.push(it.key().to_vec());
        }
        backward.reverse();
        prop_assert_eq!(backward, forward);
    }
}
