// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Randomized operation sequences cross-checked against a flat list.
//!
//! After every mutation the tree must pass `validate`, and every search must
//! return exactly the entries a linear scan returns.

use proptest::prelude::*;
use understory_rtree::{Aabb2D, Fanout, RTree, RTreeI64};

#[derive(Clone, Debug)]
enum Op {
    Insert(Aabb2D<i64>),
    /// Delete the model entry at this position (modulo its length).
    Delete(usize),
    /// Delete something that was never inserted.
    DeleteMissing(Aabb2D<i64>),
    /// Move the model entry at this position to a new rectangle.
    Update(usize, Aabb2D<i64>),
    Search(Aabb2D<i64>),
}

fn rect_strategy() -> impl Strategy<Value = Aabb2D<i64>> {
    (0_i64..=1000, 0_i64..=1000, 0_i64..=80, 0_i64..=80)
        .prop_map(|(x, y, w, h)| Aabb2D::<i64>::from_xywh(x, y, w, h))
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => rect_strategy().prop_map(Op::Insert),
        2 => any::<usize>().prop_map(Op::Delete),
        1 => rect_strategy().prop_map(Op::DeleteMissing),
        1 => (any::<usize>(), rect_strategy()).prop_map(|(i, r)| Op::Update(i, r)),
        2 => rect_strategy().prop_map(Op::Search),
    ]
}

fn linear_search(model: &[(Aabb2D<i64>, u32)], query: &Aabb2D<i64>) -> Vec<u32> {
    let mut v: Vec<u32> = model
        .iter()
        .filter(|(r, _)| r.intersects(query))
        .map(|(_, p)| *p)
        .collect();
    v.sort_unstable();
    v
}

fn run(fanout: Fanout, ops: &[Op]) -> Result<(), TestCaseError> {
    let mut tree: RTreeI64<u32> = RTree::with_fanout(fanout);
    let mut model: Vec<(Aabb2D<i64>, u32)> = Vec::new();
    let mut next_id = 0_u32;

    for op in ops {
        match op {
            Op::Insert(r) => {
                tree.insert(*r, next_id);
                model.push((*r, next_id));
                next_id += 1;
            }
            Op::Delete(i) => {
                if model.is_empty() {
                    continue;
                }
                let (r, p) = model.swap_remove(i % model.len());
                prop_assert!(tree.delete(r, p), "entry {p} at {r:?} not found");
            }
            Op::DeleteMissing(r) => {
                prop_assert!(!tree.delete(*r, u32::MAX));
            }
            Op::Update(i, new) => {
                if model.is_empty() {
                    continue;
                }
                let i = i % model.len();
                let (old, p) = model[i];
                prop_assert!(tree.update(old, p, *new, p));
                model[i].0 = *new;
            }
            Op::Search(q) => {
                let mut hits = tree.search(*q);
                hits.sort_unstable();
                prop_assert_eq!(hits, linear_search(&model, q));
            }
        }
        prop_assert_eq!(tree.validate(), Ok(model.len()));
    }

    let everything = Aabb2D::new(i64::MIN, i64::MIN, i64::MAX, i64::MAX);
    let mut all = tree.search(everything);
    all.sort_unstable();
    prop_assert_eq!(all, linear_search(&model, &everything));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn random_ops_match_linear_scan(ops in prop::collection::vec(op_strategy(), 1..400)) {
        run(Fanout::default(), &ops)?;
    }

    #[test]
    fn random_ops_match_linear_scan_wide(ops in prop::collection::vec(op_strategy(), 1..400)) {
        run(Fanout::new(5, 10).unwrap(), &ops)?;
    }

    #[test]
    fn odd_fanout_stays_valid(ops in prop::collection::vec(op_strategy(), 1..200)) {
        run(Fanout::new(3, 7).unwrap(), &ops)?;
    }
}

/// A long fixed-seed run: thousands of operations through one tree.
#[test]
fn long_deterministic_sequence() {
    // xorshift64*
    let mut state = 0x9E37_79B9_7F4A_7C15_u64;
    let mut next = move || {
        state ^= state >> 12;
        state ^= state << 25;
        state ^= state >> 27;
        state.wrapping_mul(0x2545_F491_4F6C_DD1D)
    };
    let mut ops = Vec::with_capacity(3000);
    for _ in 0..3000 {
        let v = next();
        let r = Aabb2D::<i64>::from_xywh(
            (v % 2000) as i64,
            ((v >> 16) % 2000) as i64,
            ((v >> 32) % 50) as i64,
            ((v >> 40) % 50) as i64,
        );
        ops.push(match v % 10 {
            0..=4 => Op::Insert(r),
            5..=7 => Op::Delete((v >> 8) as usize),
            8 => Op::Update((v >> 8) as usize, r),
            _ => Op::Search(r),
        });
    }
    run(Fanout::default(), &ops).unwrap();
}
