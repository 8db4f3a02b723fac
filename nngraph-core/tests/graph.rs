//! End-to-end graph construction scenarios.

mod common;

use common::{matrix, unit_square};
use nngraph_core::{
    AffinityGraph, BackendKind, ErrorCategory, MetricKind, NeighbourKind, NnGraphBuilder,
    NnGraphError,
};
use rstest::rstest;

fn raw_builder(backend: BackendKind) -> NnGraphBuilder {
    NnGraphBuilder::new()
        .with_center(false)
        .with_rescale(false)
        .with_backend(backend)
}

fn ids(graph: &AffinityGraph, vertex: usize) -> Vec<(usize, f64)> {
    graph.neighbourhoods()[vertex]
        .neighbours()
        .iter()
        .map(|n| (n.id, n.distance))
        .collect()
}

#[rstest]
#[case(BackendKind::BruteForce)]
#[case(BackendKind::ExactTree)]
fn unit_square_connects_adjacent_corners(#[case] backend: BackendKind) {
    let graph = raw_builder(backend)
        .with_k(2)
        .build()
        .expect("configuration is valid")
        .construct(&unit_square())
        .expect("construction succeeds");

    assert_eq!(ids(&graph, 0), vec![(0, 0.0), (1, 1.0), (2, 1.0)]);
    assert_eq!(graph.kernel_width(), 1.0);

    let expected = (-1.0_f64).exp();
    assert_eq!(graph.weight(0, 1), Some(expected));
    assert_eq!(graph.weight(0, 2), Some(expected));
    assert_eq!(graph.weight(0, 3), None);
    assert_eq!(graph.weight(0, 0), None);
    assert_eq!(graph.degree(0), 2);
    assert_eq!(graph.edge_count(), 4);

    let affinity = graph.affinity();
    for (&weight, (i, j)) in affinity.iter() {
        assert_eq!(affinity.get(j, i), Some(&weight));
    }
}

#[rstest]
#[case(BackendKind::BruteForce)]
#[case(BackendKind::ExactTree)]
fn k_of_n_minus_one_connects_every_pair(#[case] backend: BackendKind) {
    let graph = NnGraphBuilder::new()
        .with_k(3)
        .with_backend(backend)
        .build()
        .expect("configuration is valid")
        .construct(&unit_square())
        .expect("k = N - 1 is legal");
    assert_eq!(graph.edge_count(), 6);
    assert!(graph.neighbourhoods().iter().all(|hood| hood.len() == 4));
}

#[rstest]
fn k_of_n_is_rejected() {
    let err = NnGraphBuilder::new()
        .with_k(4)
        .build()
        .expect("size-independent options are valid")
        .construct(&unit_square())
        .expect_err("k = N must fail");
    assert_eq!(err, NnGraphError::TooManyNeighbours { k: 4, vertices: 4 });
    assert_eq!(err.category(), ErrorCategory::InvalidConfiguration);
}

#[rstest]
fn identical_points_need_an_explicit_kernel_width() {
    let features = matrix(vec![vec![2.0, -1.0]; 5]);
    let err = NnGraphBuilder::new()
        .with_k(2)
        .build()
        .expect("configuration is valid")
        .construct(&features)
        .expect_err("zero distances cannot be estimated");
    assert_eq!(err, NnGraphError::DegenerateKernelWidth);
    assert_eq!(err.category(), ErrorCategory::InvalidConfiguration);

    let graph = NnGraphBuilder::new()
        .with_k(2)
        .with_kernel_width(0.5)
        .build()
        .expect("configuration is valid")
        .construct(&features)
        .expect("explicit width succeeds");
    assert_eq!(graph.kernel_width(), 0.5);
    // Ties break by id, so vertices 3 and 4 pick {0, 1} without being picked
    // back; those one-way edges average to 0.5.
    let hoods = graph.neighbourhoods();
    let picks = |from: usize, to: usize| hoods[from].others().iter().any(|n| n.id == to);
    assert_eq!(graph.edge_count(), 7);
    for (i, j, weight) in graph.edges() {
        let expected = if picks(i, j) && picks(j, i) { 1.0 } else { 0.5 };
        assert_eq!(weight, expected, "edge ({i}, {j})");
    }
    assert_eq!(graph.weight(0, 1), Some(1.0));
    assert_eq!(graph.weight(3, 0), Some(0.5));
    for (vertex, hood) in hoods.iter().enumerate() {
        assert_eq!(hood.neighbours()[0].id, vertex);
    }
}

#[rstest]
#[case(BackendKind::BruteForce)]
#[case(BackendKind::ExactTree)]
#[case(BackendKind::ApproximateIndex)]
fn radius_width_averages_per_vertex_means(#[case] backend: BackendKind) {
    // Per-vertex means are 1, 0.75, 0.625 and 0.75; the flat mean would be 0.75.
    let features = matrix(vec![vec![0.0], vec![1.0], vec![1.5], vec![2.25]]);
    let graph = raw_builder(backend)
        .with_kind(NeighbourKind::Radius)
        .with_radius(1.0)
        .build()
        .expect("configuration is valid")
        .construct(&features)
        .expect("construction succeeds");
    let counts: Vec<usize> = graph.neighbourhoods().iter().map(|h| h.len()).collect();
    assert_eq!(counts, vec![2, 3, 3, 2]);
    assert!((graph.kernel_width() - 0.781_25).abs() < 1e-12);
}

#[rstest]
fn isolated_radius_graph_reports_unavailable_width() {
    let features = matrix(vec![vec![0.0], vec![10.0], vec![20.0]]);
    let err = raw_builder(BackendKind::BruteForce)
        .with_kind(NeighbourKind::Radius)
        .with_radius(1.0)
        .build()
        .expect("configuration is valid")
        .construct(&features)
        .expect_err("no neighbours to estimate from");
    assert_eq!(err, NnGraphError::KernelWidthUnavailable);
}

#[rstest]
fn construction_leaves_caller_features_untouched() {
    let features = matrix(vec![vec![3.0, 9.0], vec![-1.0, 4.0], vec![7.5, 0.5]]);
    let snapshot = features.clone();
    let graph = NnGraphBuilder::new()
        .with_k(1)
        .with_backend(BackendKind::BruteForce)
        .build()
        .expect("configuration is valid")
        .construct(&features)
        .expect("construction succeeds");
    assert_eq!(features, snapshot);
    assert_ne!(graph.features(), &snapshot);
}

#[rstest]
#[case(MetricKind::Manhattan, 7.0)]
#[case(MetricKind::MaxDist, 4.0)]
fn metric_changes_neighbour_distances(#[case] metric: MetricKind, #[case] expected: f64) {
    let features = matrix(vec![vec![0.0, 0.0], vec![3.0, 4.0], vec![30.0, 40.0]]);
    let graph = raw_builder(BackendKind::ExactTree)
        .with_metric(metric)
        .with_k(1)
        .build()
        .expect("configuration is valid")
        .construct(&features)
        .expect("construction succeeds");
    assert_eq!(ids(&graph, 0), vec![(0, 0.0), (1, expected)]);
}

#[rstest]
fn approximate_graph_builds_knn_graph() {
    let rows = (0..30)
        .map(|i| vec![f64::from(i).sin(), f64::from(i).cos(), f64::from(i) * 0.05])
        .collect();
    let graph = NnGraphBuilder::new()
        .with_k(4)
        .with_backend(BackendKind::ApproximateGraph)
        .build()
        .expect("configuration is valid")
        .construct(&matrix(rows))
        .expect("construction succeeds");
    assert!(graph.neighbourhoods().iter().all(|hood| hood.len() == 5));
    assert!(graph.edges().all(|(_, _, w)| w > 0.0 && w <= 1.0));
}

#[rstest]
fn into_parts_returns_every_component() {
    let graph = raw_builder(BackendKind::BruteForce)
        .with_k(1)
        .with_kernel_width(2.0)
        .build()
        .expect("configuration is valid")
        .construct(&unit_square())
        .expect("construction succeeds");
    let vertices = graph.vertex_count();
    let (affinity, features, width, hoods) = graph.into_parts();
    assert_eq!(affinity.rows(), vertices);
    assert_eq!(features, unit_square());
    assert_eq!(width, 2.0);
    assert_eq!(hoods.len(), vertices);
}

#[rstest]
fn extreme_but_finite_features_build_a_graph() {
    let features = matrix(vec![vec![1.0e308], vec![1.5e308], vec![-1.0e308]]);
    let graph = NnGraphBuilder::new()
        .with_k(1)
        .with_backend(BackendKind::BruteForce)
        .build()
        .expect("configuration is valid")
        .construct(&features)
        .expect("preprocessing keeps values finite");
    assert!(graph.features().as_slice().iter().all(|v| v.is_finite()));
    assert!(graph.kernel_width() > 0.0);
    assert_eq!(graph.edge_count(), 2);
}

#[rstest]
fn centring_past_f64_range_is_reported() {
    let features = matrix(vec![vec![f64::MAX], vec![-f64::MAX], vec![-f64::MAX]]);
    let err = NnGraphBuilder::new()
        .with_k(1)
        .with_backend(BackendKind::BruteForce)
        .build()
        .expect("configuration is valid")
        .construct(&features)
        .expect_err("centred value exceeds f64::MAX");
    assert_eq!(err, NnGraphError::PreprocessingOverflow { row: 0, column: 0 });
    assert_eq!(err.category(), ErrorCategory::InvalidConfiguration);
}

#[rstest]
#[case(None)]
#[case(Some(0.25))]
fn built_graph_reports_its_configuration(#[case] width: Option<f64>) {
    let builder = NnGraphBuilder::new()
        .with_metric(MetricKind::Manhattan)
        .with_kind(NeighbourKind::Radius)
        .with_radius(0.5)
        .with_center(false)
        .with_backend(BackendKind::ExactTree);
    let builder = match width {
        Some(width) => builder.with_kernel_width(width),
        None => builder,
    };
    let graph = builder.build().expect("configuration is valid");
    assert_eq!(graph.kernel_width(), width);
    assert_eq!(graph.backend(), BackendKind::ExactTree);
    assert_eq!(graph.metric().kind(), MetricKind::Manhattan);
    assert_eq!(graph.search_kind().kind(), NeighbourKind::Radius);
    assert!(!graph.preprocessing().centers());
    assert!(graph.preprocessing().rescales());
}
