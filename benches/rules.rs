//! Rule engine benchmarks.
//!
//! Run with:
//! ```bash
//! cargo bench --bench rules
//! ```

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use csg_rule::geometry::{Plane, PlaneSet};
use csg_rule::{parse, SimplifyConfig, Tree};
use nalgebra::{Point3, Vector3};

// ============================================================================
// Helper: a cell bounded by many planes
// ============================================================================

/// A convex prism around the z axis with `n` side planes, capped at z = ±1.
fn prism(n: u32) -> (PlaneSet, String) {
    let mut planes = PlaneSet::new().with(1, Plane::pz(-1.0)).with(2, Plane::pz(1.0));
    let mut rule = vec!["1".to_string(), "-2".to_string()];
    for i in 0..n {
        let angle = 2.0 * std::f64::consts::PI * f64::from(i) / f64::from(n);
        planes.insert(i + 3, Plane::new(Vector3::new(angle.cos(), angle.sin(), 0.0), 1.0));
        rule.push(format!("-{}", i + 3));
    }
    (planes, rule.join(" "))
}

/// `(1 : 2) (3 : 4) ...` with `n` two-term unions.
fn product_of_sums(n: u32) -> String {
    (0..n)
        .map(|i| format!("({} : {})", 2 * i + 1, 2 * i + 2))
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_parse_display(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_display");
    for n in [8u32, 64, 512] {
        let (_, text) = prism(n);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("parse", n), &text, |b, text| {
            b.iter(|| parse(black_box(text)).unwrap());
        });
        let tree = parse(&text).unwrap();
        group.bench_with_input(BenchmarkId::new("display", n), &tree, |b, tree| {
            b.iter(|| black_box(tree).display());
        });
    }
    group.finish();
}

fn bench_is_valid(c: &mut Criterion) {
    let mut group = c.benchmark_group("is_valid");
    for n in [8u32, 64, 512] {
        let (planes, text) = prism(n);
        let tree = parse(&text).unwrap();
        let point = Point3::new(0.1, 0.2, 0.3);
        group.bench_with_input(BenchmarkId::new("prism", n), &tree, |b, tree| {
            b.iter(|| tree.is_valid(&planes, black_box(&point)).unwrap());
        });
    }
    group.finish();
}

fn bench_track_surf(c: &mut Criterion) {
    let mut group = c.benchmark_group("track_surf");
    group.sample_size(20);
    for n in [8u32, 64] {
        let (planes, text) = prism(n);
        let tree = parse(&text).unwrap();
        let origin = Point3::origin();
        let direction = Vector3::new(0.6, 0.8, 0.0);
        group.bench_with_input(BenchmarkId::new("prism", n), &tree, |b, tree| {
            b.iter(|| tree.track_surf(&planes, black_box(&origin), &direction).unwrap());
        });
    }
    group.finish();
}

fn bench_make_cnf(c: &mut Criterion) {
    let mut group = c.benchmark_group("make_cnf");
    group.sample_size(10); // Output grows as 2^n
    let config = SimplifyConfig::default();
    for n in [4u32, 6, 8] {
        let tree = parse(&product_of_sums(n)).unwrap();
        group.bench_with_input(BenchmarkId::new("in_place", n), &tree, |b, tree| {
            b.iter(|| {
                let mut t: Tree = tree.clone();
                t.make_cnf(&config).unwrap()
            });
        });
        group.bench_with_input(BenchmarkId::new("copy", n), &tree, |b, tree| {
            b.iter(|| tree.to_cnf(&config).unwrap());
        });
    }
    group.finish();
}

fn bench_model_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("model_count");
    for n in [8u32, 32, 128] {
        let tree = parse(&product_of_sums(n)).unwrap();
        group.bench_with_input(BenchmarkId::new("product_of_sums", n), &tree, |b, tree| {
            b.iter(|| black_box(tree).model_count());
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_parse_display,
    bench_is_valid,
    bench_track_surf,
    bench_make_cnf,
    bench_model_count
);
criterion_main!(benches);
