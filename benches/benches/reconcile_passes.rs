// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::{Affine, Rect};
use understory_fiber::{Reconciler, StdClock};
use understory_scene::{NodeDesc, NodeId, NodeKind, SceneGraph};

/// Page with `frames` frames of `per_frame` leaves each, laid out on a grid.
fn gen_scene(frames: usize, per_frame: usize) -> (SceneGraph, NodeId, Vec<NodeId>) {
    let mut scene = SceneGraph::new();
    let page = scene.insert(None, NodeDesc::new(NodeKind::Page));
    let mut leaves = Vec::with_capacity(frames * per_frame);
    for f in 0..frames {
        let frame = scene.insert(
            Some(page),
            NodeDesc::new(NodeKind::Frame)
                .with_transform(Affine::translate((f as f64 * 300.0, 0.0)))
                .with_bounds(Rect::new(0.0, 0.0, 280.0, 800.0)),
        );
        for i in 0..per_frame {
            let y = i as f64 * 12.0;
            leaves.push(scene.insert(
                Some(frame),
                NodeDesc::new(NodeKind::Polygon).with_bounds(Rect::new(4.0, y, 276.0, y + 10.0)),
            ));
        }
    }
    (scene, page, leaves)
}

fn committed(scene: &SceneGraph, page: NodeId) -> Reconciler<StdClock> {
    let mut r = Reconciler::new(StdClock::new());
    r.schedule_update(scene, page);
    r.work_loop(scene, &mut (), 0.0);
    r
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");
    for &(frames, per_frame) in &[(8usize, 32usize), (32, 64)] {
        let nodes = 1 + frames + frames * per_frame;
        let (scene, page, _) = gen_scene(frames, per_frame);
        group.throughput(Throughput::Elements(nodes as u64));

        group.bench_function(format!("initial_n{nodes}"), |b| {
            b.iter(|| black_box(committed(&scene, page).spatial().len()));
        });

        let (mut clean, page_clean, _) = gen_scene(frames, per_frame);
        clean.clear_dirty();
        group.bench_function(format!("clean_n{nodes}"), |b| {
            b.iter_batched(
                || committed(&clean, page_clean),
                |mut r| {
                    r.schedule_update(&clean, page_clean);
                    r.work_loop(&clean, &mut (), 0.0);
                    black_box(r.stats().bailouts);
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_function(format!("one_leaf_edit_n{nodes}"), |b| {
            b.iter_batched(
                || {
                    let (mut s, page, leaves) = gen_scene(frames, per_frame);
                    let r = committed(&s, page);
                    s.clear_dirty();
                    s.set_local_bounds(leaves[leaves.len() / 2], Rect::new(0.0, 0.0, 50.0, 50.0));
                    (s, page, r)
                },
                |(s, page, mut r)| {
                    r.schedule_update(&s, page);
                    r.work_loop(&s, &mut (), 0.0);
                    black_box(r.last_commit().updates);
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_function(format!("sliced_initial_n{nodes}"), |b| {
            b.iter(|| {
                let mut r = Reconciler::new(StdClock::new());
                r.schedule_update(&scene, page);
                let mut slices = 0_u32;
                while r.work_loop(&scene, &mut (), 0.05) {
                    slices += 1;
                }
                black_box(slices)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_reconcile);
criterion_main!(benches);
