//! Nearest-neighbour query benchmarks.
//!
//! Run with:
//! ```
//! cargo bench --bench knearest
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::time::Duration;
use stayfinder_rs::index::{ProximityIndex, QueryParams};
use stayfinder_rs::model::Location;
use stayfinder_rs::test_support::{clustered_points, sample_points};

// =============================================================================
// BUILD BENCHMARKS
// =============================================================================

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("knearest/build");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(3));

    for count in [10_000usize, 100_000] {
        let points = sample_points(count, 42);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &points, |b, points| {
            b.iter(|| black_box(ProximityIndex::build(points.clone()).unwrap()))
        });
    }

    group.finish();
}

// =============================================================================
// QUERY BENCHMARKS
// =============================================================================

/// Dense city: many points inside the default radius.
fn bench_query_dense(c: &mut Criterion) {
    let mut group = c.benchmark_group("knearest/dense");
    group.measurement_time(Duration::from_secs(3));

    let index = ProximityIndex::build(clustered_points(50_000, 37.7879, -122.4075, 0.5, 7)).unwrap();
    let center = Location::new(37.7879, -122.4075);
    for k in [5usize, 50] {
        let params = QueryParams::new(k, 10.0).unwrap();
        group.bench_with_input(BenchmarkId::new("k", k), &params, |b, params| {
            b.iter(|| black_box(index.k_nearest(center, params, |_| true).len()))
        });
    }

    group.finish();
}

/// Sparse globe: most queries find nothing within the radius.
fn bench_query_sparse(c: &mut Criterion) {
    let mut group = c.benchmark_group("knearest/sparse");
    group.measurement_time(Duration::from_secs(3));

    let index = ProximityIndex::build(sample_points(100_000, 42)).unwrap();
    let centers: Vec<Location> = sample_points(256, 9)
        .iter()
        .map(|point| point.location())
        .collect();
    for radius_km in [10.0f64, 500.0] {
        let params = QueryParams::new(5, radius_km).unwrap();
        group.throughput(Throughput::Elements(centers.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("radius_km", radius_km),
            &params,
            |b, params| {
                b.iter(|| {
                    for center in &centers {
                        black_box(index.k_nearest(*center, params, |_| true).len());
                    }
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_query_dense, bench_query_sparse);
criterion_main!(benches);
