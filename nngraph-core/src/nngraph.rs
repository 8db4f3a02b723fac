//! Graph construction entry point.
//!
//! [`NnGraph`] runs validation, preprocessing, neighbour search and affinity
//! assembly in that order, failing on the first error.

use std::time::{Duration, Instant};

use tracing::{info, instrument};

use crate::{
    Result,
    affinity::assemble,
    features::FeatureMatrix,
    graph::AffinityGraph,
    metric::Metric,
    preprocess::Preprocessing,
    registry::{BackendKind, validate},
    search::{NeighbourSearch, SearchKind},
};

/// Validated construction settings bound to a search backend.
///
/// # Examples
/// ```
/// use nngraph_core::{BackendKind, FeatureMatrix, NnGraphBuilder};
///
/// let square = FeatureMatrix::try_from_rows(vec![
///     vec![0.0, 0.0],
///     vec![0.0, 1.0],
///     vec![1.0, 0.0],
///     vec![1.0, 1.0],
/// ])
/// .expect("valid features");
/// let graph = NnGraphBuilder::new()
///     .with_k(2)
///     .with_center(false)
///     .with_rescale(false)
///     .with_backend(BackendKind::BruteForce)
///     .build()
///     .expect("configuration is valid")
///     .construct(&square)
///     .expect("construction succeeds");
/// assert_eq!(graph.vertex_count(), 4);
/// assert_eq!(graph.edge_count(), 4);
/// assert_eq!(graph.weight(0, 3), None);
/// ```
#[derive(Debug)]
pub struct NnGraph {
    preprocessing: Preprocessing,
    metric: Metric,
    kind: SearchKind,
    kernel_width: Option<f64>,
    search: Box<dyn NeighbourSearch>,
}

impl NnGraph {
    pub(crate) fn new(
        preprocessing: Preprocessing,
        metric: Metric,
        kind: SearchKind,
        kernel_width: Option<f64>,
        search: Box<dyn NeighbourSearch>,
    ) -> Self {
        Self {
            preprocessing,
            metric,
            kind,
            kernel_width,
            search,
        }
    }

    /// Returns the backend searches run on.
    #[must_use]
    pub fn backend(&self) -> BackendKind {
        self.search.backend()
    }

    /// Returns the resolved metric.
    #[must_use]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Returns the neighbourhood request.
    #[must_use]
    pub fn search_kind(&self) -> SearchKind {
        self.kind
    }

    /// Returns the explicit kernel width, or `None` when it is estimated from
    /// the neighbour distances of each construction.
    #[must_use]
    pub fn kernel_width(&self) -> Option<f64> {
        self.kernel_width
    }

    /// Returns the preprocessing stages applied before searching.
    #[must_use]
    pub fn preprocessing(&self) -> Preprocessing {
        self.preprocessing
    }

    /// Builds the weighted graph of `features`.
    ///
    /// The caller's matrix is never modified; the returned graph carries the
    /// preprocessed copy.
    ///
    /// # Errors
    /// Returns [`crate::NnGraphError::TooManyNeighbours`] when `k` is not
    /// smaller than the number of rows,
    /// [`crate::NnGraphError::PreprocessingOverflow`] when centring leaves the
    /// `f64` range, any error raised by the backend, and the kernel width
    /// errors of [`crate::assemble`].
    #[instrument(
        name = "core.construct",
        err,
        skip(self, features),
        fields(
            vertices = features.len(),
            dimension = features.dimension(),
            backend = %self.backend(),
            metric = %self.metric.kind(),
            kind = %self.kind.kind(),
        ),
    )]
    pub fn construct(&self, features: &FeatureMatrix) -> Result<AffinityGraph> {
        validate(self.backend(), self.kind, self.metric, features.len())?;
        let processed = self.preprocessing.apply(features)?;
        let started = Instant::now();
        let neighbourhoods = self.search.search(&processed, self.kind, self.metric)?;
        let elapsed = started.elapsed();
        let (affinity, kernel_width) =
            assemble(&neighbourhoods, self.kind.kind(), self.kernel_width)?;
        let graph = AffinityGraph::new(affinity, processed, kernel_width, neighbourhoods);
        let edges = graph.edge_count();
        info!(
            edges,
            kernel_width,
            search_ms = elapsed.as_secs_f64() * 1.0e3,
            "graph constructed"
        );
        self.record_construction(elapsed, edges);
        Ok(graph)
    }

    #[cfg(feature = "metrics")]
    fn record_construction(&self, elapsed: Duration, edges: usize) {
        let backend = self.backend().as_str();
        metrics::counter!("nngraph_constructions_total", "backend" => backend).increment(1);
        metrics::histogram!("nngraph_search_seconds", "backend" => backend)
            .record(elapsed.as_secs_f64());
        metrics::counter!("nngraph_edges_total").increment(edges as u64);
    }

    #[cfg(not(feature = "metrics"))]
    fn record_construction(&self, _elapsed: Duration, _edges: usize) {}
}
