// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reconciler basics.
//!
//! Mirror a small scene, edit it, and print the effects each pass commits.
//!
//! Run:
//! - `cargo run -p understory_demos --example reconcile_basics`

use kurbo::{Affine, Point, Rect};
use understory_fiber::{EffectLog, Reconciler, StdClock};
use understory_scene::{ElementKind, NodeDesc, NodeId, NodeKind, SceneGraph};

fn pass(r: &mut Reconciler<StdClock>, scene: &mut SceneGraph, root: NodeId, label: &str) {
    let mut log = EffectLog::default();
    r.schedule_update(&*scene, root);
    while r.work_loop(&*scene, &mut log, 0.0) {}
    scene.clear_dirty();
    println!("{label}:");
    for (node, effect) in &log.effects {
        println!("  {effect:?} {node:?}");
    }
    for node in &log.released_overlays {
        println!("  released overlay of {node:?}");
    }
}

fn main() {
    let mut scene = SceneGraph::new();
    let page = scene.insert(None, NodeDesc::new(NodeKind::Page));
    let form = scene.insert(
        Some(page),
        NodeDesc::new(NodeKind::Frame).with_bounds(Rect::new(0.0, 0.0, 300.0, 200.0)),
    );
    let name = scene.insert(
        Some(form),
        NodeDesc::new(NodeKind::Text)
            .with_element(ElementKind::Input)
            .with_bounds(Rect::new(10.0, 10.0, 290.0, 40.0)),
    );
    let submit = scene.insert(
        Some(form),
        NodeDesc::new(NodeKind::Frame)
            .with_element(ElementKind::Button)
            .with_bounds(Rect::new(10.0, 150.0, 100.0, 190.0)),
    );

    let mut r = Reconciler::new(StdClock::new());
    pass(&mut r, &mut scene, page, "initial");
    let hits = r.query_point(Point::new(20.0, 160.0));
    assert!(hits.contains(&submit) && hits.contains(&form));

    pass(&mut r, &mut scene, page, "no edits");
    println!("  bailouts so far: {}", r.stats().bailouts);

    scene.set_local_transform(form, Affine::translate((400.0, 0.0)));
    pass(&mut r, &mut scene, page, "form moved");
    let mut hits = r.query_point(Point::new(420.0, 160.0));
    hits.sort();
    println!("  hits at (420, 160): {hits:?}");

    scene.remove(name);
    pass(&mut r, &mut scene, page, "input removed");
    println!("  indexed nodes: {}", r.spatial().len());
}
