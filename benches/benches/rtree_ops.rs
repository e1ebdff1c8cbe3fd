// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_rtree::{Aabb2D, Fanout, RTree, RTreeF64};

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

fn gen_grid_rects_i64(n: usize, cell: i64) -> Vec<Aabb2D<i64>> {
    let mut out = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            let x0 = x as i64 * cell;
            let y0 = y as i64 * cell;
            out.push(Aabb2D::<i64>::from_xywh(x0, y0, cell, cell));
        }
    }
    out
}

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

fn gen_random_rects(count: usize, extent: f64, size: f64) -> Vec<Aabb2D<f64>> {
    let mut rng = Rng::new(0xCAFE_F00D_DEAD_BEEF);
    (0..count)
        .map(|_| {
            let x0 = rng.next_f64() * (extent - size);
            let y0 = rng.next_f64() * (extent - size);
            Aabb2D::<f64>::from_xywh(x0, y0, size, size)
        })
        .collect()
}

fn build(rects: &[Aabb2D<f64>], fanout: Fanout) -> RTreeF64<u32> {
    let mut tree = RTreeF64::with_fanout(fanout);
    for (i, r) in rects.iter().copied().enumerate() {
        tree.insert(r, i as u32);
    }
    tree
}

fn fanouts() -> [(&'static str, Fanout); 2] {
    [
        ("2_4", Fanout::default()),
        ("5_10", Fanout::new(5, 10).unwrap()),
    ]
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("rtree_insert_f64");
    for &n in &[32usize, 64] {
        let rects = gen_grid_rects(n, 10.0);
        group.throughput(Throughput::Elements((n * n) as u64));
        for (name, fanout) in fanouts() {
            group.bench_function(format!("grid_n{n}_fanout{name}"), |b| {
                b.iter(|| black_box(build(&rects, fanout).len()));
            });
        }
    }
    let rects = gen_random_rects(4096, 4000.0, 12.0);
    group.throughput(Throughput::Elements(rects.len() as u64));
    group.bench_function("random_4096", |b| {
        b.iter(|| black_box(build(&rects, Fanout::default()).len()));
    });
    group.finish();

    let mut group = c.benchmark_group("rtree_insert_i64");
    let rects = gen_grid_rects_i64(64, 10);
    group.throughput(Throughput::Elements(rects.len() as u64));
    group.bench_function("grid_n64", |b| {
        b.iter(|| {
            let mut tree = RTree::<i64, u32>::new();
            for (i, r) in rects.iter().copied().enumerate() {
                tree.insert(r, i as u32);
            }
            black_box(tree.len())
        });
    });
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("rtree_search_f64");
    let rects = gen_grid_rects(128, 10.0);
    for (name, fanout) in fanouts() {
        let tree = build(&rects, fanout);
        group.bench_function(format!("window_400_fanout{name}"), |b| {
            let q = Aabb2D::<f64>::from_xywh(100.0, 100.0, 400.0, 400.0);
            b.iter(|| black_box(tree.search(q).len()));
        });
        group.bench_function(format!("point_fanout{name}"), |b| {
            b.iter(|| black_box(tree.search_point(555.0, 333.0).len()));
        });
    }
    group.finish();
}

fn bench_delete(c: &mut Criterion) {
    let mut group = c.benchmark_group("rtree_delete_f64");
    let rects = gen_random_rects(2048, 4000.0, 12.0);
    group.throughput(Throughput::Elements(rects.len() as u64));
    for (name, fanout) in fanouts() {
        group.bench_function(format!("drain_2048_fanout{name}"), |b| {
            b.iter_batched(
                || build(&rects, fanout),
                |mut tree| {
                    for (i, r) in rects.iter().copied().enumerate() {
                        tree.delete(r, i as u32);
                    }
                    black_box(tree.len());
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.bench_function("update_half_2048", |b| {
        b.iter_batched(
            || build(&rects, Fanout::default()),
            |mut tree| {
                for (i, r) in rects.iter().copied().enumerate().step_by(2) {
                    let moved = Aabb2D::<f64>::from_xywh(r.min_x + 7.0, r.min_y - 3.0, 12.0, 12.0);
                    tree.update(r, i as u32, moved, i as u32);
                }
                black_box(tree.len());
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(benches, bench_insert, bench_search, bench_delete);
criterion_main!(benches);
