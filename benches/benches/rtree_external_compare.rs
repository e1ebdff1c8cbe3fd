// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![cfg(feature = "compare_rstar")]

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_rtree::{Aabb2D, Fanout, RTreeF64};

use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{AABB, RTree};

type RstarEntry = GeomWithData<Rectangle<[f64; 2]>, u32>;

fn gen_grid_rects(n: usize, cell: f64) -> Vec<Aabb2D<f64>> {
    let mut out = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            let x0 = x as f64 * cell;
            let y0 = y as f64 * cell;
            out.push(Aabb2D::<f64>::from_xywh(x0, y0, cell, cell));
        }
    }
    out
}

fn to_rstar(r: Aabb2D<f64>, i: u32) -> RstarEntry {
    GeomWithData::new(
        Rectangle::from_corners([r.min_x, r.min_y], [r.max_x, r.max_y]),
        i,
    )
}

fn bench_rtree_external_compare_f64(c: &mut Criterion) {
    let mut group = c.benchmark_group("rtree_external_compare_f64");
    for &n in &[64usize, 128] {
        let rects = gen_grid_rects(n, 10.0);
        let query = Aabb2D::<f64>::from_xywh(100.0, 100.0, 400.0, 400.0);
        group.throughput(Throughput::Elements((n * n) as u64));

        group.bench_function(format!("understory_insert_query_n{n}"), |b| {
            b.iter(|| {
                let mut tree = RTreeF64::with_fanout(Fanout::new(5, 10).unwrap());
                for (i, r) in rects.iter().copied().enumerate() {
                    tree.insert(r, i as u32);
                }
                black_box(tree.search(query).len());
            });
        });

        group.bench_function(format!("rstar_insert_query_n{n}"), |b| {
            b.iter(|| {
                let mut tree = RTree::new();
                for (i, r) in rects.iter().copied().enumerate() {
                    tree.insert(to_rstar(r, i as u32));
                }
                let aabb = AABB::from_corners([query.min_x, query.min_y], [query.max_x, query.max_y]);
                black_box(tree.locate_in_envelope_intersecting(&aabb).count());
            });
        });

        group.bench_function(format!("understory_delete_all_n{n}"), |b| {
            b.iter_batched(
                || {
                    let mut tree = RTreeF64::with_fanout(Fanout::new(5, 10).unwrap());
                    for (i, r) in rects.iter().copied().enumerate() {
                        tree.insert(r, i as u32);
                    }
                    tree
                },
                |mut tree| {
                    for (i, r) in rects.iter().copied().enumerate() {
                        tree.delete(r, i as u32);
                    }
                    black_box(tree.len());
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_function(format!("rstar_delete_all_n{n}"), |b| {
            b.iter_batched(
                || {
                    let entries: Vec<_> = rects
                        .iter()
                        .copied()
                        .enumerate()
                        .map(|(i, r)| to_rstar(r, i as u32))
                        .collect();
                    RTree::bulk_load(entries)
                },
                |mut tree| {
                    for (i, r) in rects.iter().copied().enumerate() {
                        tree.remove(&to_rstar(r, i as u32));
                    }
                    black_box(tree.size());
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rtree_external_compare_f64);
criterion_main!(benches);
