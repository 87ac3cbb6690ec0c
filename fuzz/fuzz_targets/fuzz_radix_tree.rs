#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use radix_index::{InsertOutcome, RadixTree, SeekOp};
use std::collections::BTreeMap;

#[derive(Arbitrary, Debug)]
struct RadixTreeInput {
    run_limit: Option<u8>,
    operations: Vec<TreeOp>,
}

#[derive(Arbitrary, Debug)]
enum TreeOp {
    Insert { key: Vec<u8>, value: u32 },
    TryInsert { key: Vec<u8>, value: u32 },
    Remove { key: Vec<u8> },
    Get { key: Vec<u8> },
    SeekScan { key: Vec<u8>, forward: bool },
    Clear,
    Len,
}

fuzz_target!(|input: RadixTreeInput| {
    // Limit operations
    if input.operations.len() > 300 {
        return;
    }

    let mut tree: RadixTree<u32> = match input.run_limit {
        Some(limit) => RadixTree::with_run_limit(limit as usize),
        None => RadixTree::new(),
    };
    let mut expected: BTreeMap<Vec<u8>, u32> = BTreeMap::new();

    for op in input.operations {
        match op {
            TreeOp::Insert { key, value } => {
                if key.len() > 64 {
                    continue;
                }
                let outcome = tree.insert(&key, Some(value)).unwrap();
                match expected.insert(key, value) {
                    None => assert_eq!(outcome, InsertOutcome::Added),
                    Some(old) => {
                        assert_eq!(outcome, InsertOutcome::Replaced(Some(old)))
                    }
                }
            }
            TreeOp::TryInsert { key, value } => {
                if key.len() > 64 {
                    continue;
                }
                let outcome = tree.try_insert(&key, Some(value)).unwrap();
                if expected.contains_key(&key) {
                    assert_eq!(outcome, InsertOutcome::Rejected(Some(value)));
                } else {
                    assert_eq!(outcome, InsertOutcome::Added);
                    expected.insert(key, value);
                }
            }
            TreeOp::Remove { key } => {
                let got = tree.remove(&key).map(|v| v.unwrap());
                assert_eq!(got, expected.remove(&key));
                assert!(tree.get(&key).is_none());
            }
            TreeOp::Get { key } => {
                let got = tree.get(&key).map(|v| v.copied().unwrap());
                assert_eq!(got, expected.get(&key).copied());
            }
            TreeOp::SeekScan { key, forward } => {
                // Walk a few elements from the seek point and check them
                // against the model's ordered view.
                let mut it = tree.iter();
                if forward {
                    it.seek(SeekOp::Ge, &key).unwrap();
                    let mut model = expected.range(key..);
                    for _ in 0..8 {
                        if !it.next().unwrap() {
                            assert!(model.next().is_none());
                            break;
                        }
                        let (k, v) = model.next().unwrap();
                        assert_eq!(it.key(), k.as_slice());
                        assert_eq!(it.value(), Some(v));
                    }
                } else {
                    it.seek(SeekOp::Le, &key).unwrap();
                    let mut model = expected.range(..=key).rev();
                    for _ in 0..8 {
                        if !it.prev().unwrap() {
                            assert!(model.next().is_none());
                            break;
                        }
                        let (k, v) = model.next().unwrap();
                        assert_eq!(it.key(), k.as_slice());
                        assert_eq!(it.value(), Some(v));
                    }
                }
            }
            TreeOp::Clear => {
                let mut released = 0u64;
                tree.clear_with(|_| released += 1);
                assert_eq!(released, expected.len() as u64);
                expected.clear();
                assert_eq!(tree.node_count(), 1);
            }
            TreeOp::Len => {
                assert_eq!(tree.len(), expected.len() as u64);
            }
        }
        tree.assert_invariants();
    }

    // Final consistency check: contents and order match the model.
    assert_eq!(tree.len(), expected.len() as u64);
    let mut it = tree.iter();
    it.seek(SeekOp::First, b"").unwrap();
    let mut model = expected.iter();
    while it.next().unwrap() {
        let (k, v) = model.next().unwrap();
        assert_eq!(it.key(), k.as_slice());
        assert_eq!(it.value(), Some(v));
    }
    assert!(model.next().is_none());
});
