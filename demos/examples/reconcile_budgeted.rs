// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Budgeted reconciliation.
//!
//! Build a large scene and reconcile it in small time slices, the way a host
//! would between frames. A simulated clock makes each slice a fixed number of
//! units so the output is deterministic.
//!
//! Run:
//! - `cargo run -p understory_demos --example reconcile_budgeted`

use std::cell::Cell;

use kurbo::Rect;
use understory_fiber::{EffectLog, PassState, Reconciler};
use understory_scene::{NodeDesc, NodeKind, SceneGraph};

fn main() {
    let mut scene = SceneGraph::new();
    let page = scene.insert(None, NodeDesc::new(NodeKind::Page));
    for f in 0..20 {
        let frame = scene.insert(Some(page), NodeDesc::new(NodeKind::Frame));
        for i in 0..25 {
            let x = f64::from(f) * 100.0;
            let y = f64::from(i) * 10.0;
            scene.insert(
                Some(frame),
                NodeDesc::new(NodeKind::Polygon).with_bounds(Rect::new(x, y, x + 90.0, y + 8.0)),
            );
        }
    }

    // Every clock read advances one millisecond.
    let now = Cell::new(0.0);
    let mut r = Reconciler::new(|| {
        now.set(now.get() + 1.0);
        now.get()
    });

    let mut log = EffectLog::default();
    r.schedule_update(&scene, page);
    let mut slices = 1;
    while r.work_loop(&scene, &mut log, 16.0) {
        assert_eq!(r.state(), PassState::Suspended);
        assert!(log.is_empty());
        slices += 1;
    }
    scene.clear_dirty();

    let stats = r.stats();
    println!(
        "{} nodes reconciled in {slices} slices ({} units of work)",
        scene.len(),
        stats.units_of_work
    );
    println!("commit: {:?}", r.last_commit());
    assert_eq!(log.effects.len(), scene.len());
    assert_eq!(r.spatial().len(), scene.len());
}
