// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! R-tree basics.
//!
//! Insert a handful of boxes, query them, move one, delete another, and check
//! the tree's invariants along the way.
//!
//! Run:
//! - `cargo run -p understory_demos --example rtree_basics`

use understory_rtree::{Aabb2D, Fanout, RTreeI64};

fn main() {
    let fanout = Fanout::new(2, 4).unwrap();
    let mut tree = RTreeI64::with_fanout(fanout);
    for i in 0..12_i64 {
        let x = (i % 4) * 30;
        let y = (i / 4) * 30;
        tree.insert(Aabb2D::<i64>::from_xywh(x, y, 20, 20), i);
    }
    println!("{} entries, height {}", tree.len(), tree.height());

    let mut hits = tree.search(Aabb2D::new(10, 10, 40, 40));
    hits.sort_unstable();
    println!("window (10,10)-(40,40): {hits:?}");
    assert_eq!(hits, [0, 1, 4, 5]);

    // Move entry 5 far away; the old location no longer reports it.
    assert!(tree.update(
        Aabb2D::<i64>::from_xywh(30, 30, 20, 20),
        5,
        Aabb2D::<i64>::from_xywh(500, 500, 20, 20),
        5,
    ));
    assert_eq!(tree.search_point(510, 510), [5]);
    assert!(!tree.search_point(35, 35).contains(&5));

    // Deleting needs a rectangle that touches the stored one.
    assert!(!tree.delete(Aabb2D::<i64>::from_xywh(300, 300, 1, 1), 0));
    assert!(tree.delete(Aabb2D::<i64>::from_xywh(0, 0, 20, 20), 0));

    match tree.validate() {
        Ok(count) => println!("valid tree with {count} entries"),
        Err(violation) => panic!("broken tree: {violation}"),
    }
}
