//! Graph construction benchmarks comparing the four search backends.
//!
//! Every backend builds a k-nearest-neighbour graph over the same seeded
//! Gaussian blobs so timings are directly comparable. The exact backends are
//! also measured on radius graphs.
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use nngraph_benches::{
    error::BenchSetupError,
    params::GraphBenchParams,
    source::{GaussianBlobConfig, gaussian_blobs},
};
use nngraph_core::{BackendKind, FeatureMatrix, NeighbourKind, NnGraph, NnGraphBuilder};

/// Seed used for all synthetic data generation in this benchmark.
const SEED: u64 = 42;

/// Vector dimensionality for all benchmark datasets.
const DIMENSIONS: usize = 8;

/// Dataset sizes to benchmark.
const POINT_COUNTS: &[usize] = &[500, 2_000, 5_000];

/// Neighbours per vertex.
const K: usize = 10;

/// Radius used for the radius-graph group, in rescaled units.
const RADIUS: f64 = 0.3;

/// Fixed width for radius graphs, where sparse neighbourhoods can leave
/// nothing to estimate from.
const RADIUS_KERNEL_WIDTH: f64 = 0.1;

fn make_features(point_count: usize) -> Result<FeatureMatrix, BenchSetupError> {
    Ok(gaussian_blobs(&GaussianBlobConfig {
        point_count,
        dimensions: DIMENSIONS,
        cluster_count: 8,
        separation: 6.0,
        spread: 0.5,
        seed: SEED,
    })?)
}

fn make_graph(backend: BackendKind, kind: NeighbourKind) -> Result<NnGraph, BenchSetupError> {
    let builder = NnGraphBuilder::new()
        .with_backend(backend)
        .with_kind(kind)
        .with_k(K)
        .with_radius(RADIUS);
    let builder = match kind {
        NeighbourKind::Knn => builder,
        NeighbourKind::Radius => builder.with_kernel_width(RADIUS_KERNEL_WIDTH),
    };
    Ok(builder.build()?)
}

fn bench_group(
    c: &mut Criterion,
    group_name: &str,
    kind: NeighbourKind,
    backends: &[BackendKind],
) -> Result<(), BenchSetupError> {
    let mut group = c.benchmark_group(group_name);
    group.sample_size(10);

    for &point_count in POINT_COUNTS {
        let features = make_features(point_count)?;
        for &backend in backends {
            let graph = make_graph(backend, kind)?;
            let params = GraphBenchParams {
                point_count,
                backend,
                k: K,
            };
            group.bench_with_input(
                BenchmarkId::from_parameter(params),
                &features,
                |b, input| {
                    b.iter(|| {
                        if let Err(err) = graph.construct(input) {
                            panic!("{group_name} failed for {params}: {err}");
                        }
                    });
                },
            );
        }
    }

    group.finish();
    Ok(())
}

fn knn_construction(c: &mut Criterion) {
    if let Err(err) = bench_group(c, "knn_construction", NeighbourKind::Knn, &BackendKind::ALL) {
        panic!("knn benchmark setup failed: {err}");
    }
}

fn radius_construction(c: &mut Criterion) {
    let exact = [BackendKind::BruteForce, BackendKind::ExactTree];
    if let Err(err) = bench_group(c, "radius_construction", NeighbourKind::Radius, &exact) {
        panic!("radius benchmark setup failed: {err}");
    }
}

criterion_group!(benches, knn_construction, radius_construction);
criterion_main!(benches);
