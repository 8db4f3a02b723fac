//! Builder for configuring nearest-neighbour graph construction.
//!
//! Collects every construction option with its default and validates the
//! options that do not depend on the dataset before producing an [`NnGraph`].

use crate::{
    Result,
    error::NnGraphError,
    metric::{Metric, MetricKind},
    nngraph::NnGraph,
    preprocess::Preprocessing,
    registry::BackendKind,
    search::{BackendParams, ForestParams, GraphIndexParams, NeighbourKind, SearchKind},
};

/// Configures and constructs [`NnGraph`] instances.
///
/// # Examples
/// ```
/// use nngraph_core::{BackendKind, MetricKind, NnGraphBuilder};
///
/// let graph = NnGraphBuilder::new()
///     .with_metric(MetricKind::Manhattan)
///     .with_k(4)
///     .with_backend(BackendKind::BruteForce)
///     .build()
///     .expect("configuration is valid");
/// assert_eq!(graph.backend(), BackendKind::BruteForce);
/// ```
#[derive(Clone, Debug)]
pub struct NnGraphBuilder {
    center: bool,
    rescale: bool,
    metric: MetricKind,
    order: f64,
    kind: NeighbourKind,
    k: usize,
    radius: f64,
    kernel_width: Option<f64>,
    backend: BackendKind,
    params: BackendParams,
}

impl Default for NnGraphBuilder {
    fn default() -> Self {
        Self {
            center: true,
            rescale: true,
            metric: MetricKind::Euclidean,
            order: 0.0,
            kind: NeighbourKind::Knn,
            k: 10,
            radius: 0.01,
            kernel_width: None,
            backend: BackendKind::ExactTree,
            params: BackendParams::default(),
        }
    }
}

impl NnGraphBuilder {
    /// Creates a builder populated with default parameters.
    ///
    /// # Examples
    /// ```
    /// use nngraph_core::{BackendKind, NeighbourKind, NnGraphBuilder};
    ///
    /// let builder = NnGraphBuilder::new();
    /// assert_eq!(builder.k(), 10);
    /// assert_eq!(builder.kind(), NeighbourKind::Knn);
    /// assert_eq!(builder.backend(), BackendKind::ExactTree);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables mean-centring of the features.
    #[must_use]
    pub fn with_center(mut self, center: bool) -> Self {
        self.center = center;
        self
    }

    /// Enables or disables bounding-ball rescaling of the features.
    #[must_use]
    pub fn with_rescale(mut self, rescale: bool) -> Self {
        self.rescale = rescale;
        self
    }

    /// Selects the distance metric.
    #[must_use]
    pub fn with_metric(mut self, metric: MetricKind) -> Self {
        self.metric = metric;
        self
    }

    /// Sets the Minkowski order; ignored by the other metrics.
    #[must_use]
    pub fn with_order(mut self, order: f64) -> Self {
        self.order = order;
        self
    }

    /// Selects k-NN or radius neighbourhoods.
    #[must_use]
    pub fn with_kind(mut self, kind: NeighbourKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the neighbour count used by k-NN neighbourhoods.
    #[must_use]
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Sets the inclusive radius used by radius neighbourhoods.
    #[must_use]
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    /// Fixes the Gaussian kernel width instead of estimating it.
    ///
    /// # Examples
    /// ```
    /// use nngraph_core::NnGraphBuilder;
    ///
    /// let builder = NnGraphBuilder::new().with_kernel_width(0.5);
    /// assert_eq!(builder.kernel_width(), Some(0.5));
    /// ```
    #[must_use]
    pub fn with_kernel_width(mut self, width: f64) -> Self {
        self.kernel_width = Some(width);
        self
    }

    /// Selects the neighbour search backend.
    #[must_use]
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Overrides the approximate-index tuning.
    #[must_use]
    pub fn with_forest_params(mut self, params: ForestParams) -> Self {
        self.params.forest = params;
        self
    }

    /// Overrides the approximate-graph tuning.
    #[must_use]
    pub fn with_graph_index_params(mut self, params: GraphIndexParams) -> Self {
        self.params.graph_index = params;
        self
    }

    /// Returns the configured neighbour count.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Returns the configured neighbourhood kind.
    #[must_use]
    pub fn kind(&self) -> NeighbourKind {
        self.kind
    }

    /// Returns the configured backend.
    #[must_use]
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Returns the explicit kernel width, if any.
    #[must_use]
    pub fn kernel_width(&self) -> Option<f64> {
        self.kernel_width
    }

    /// Validates the configuration and constructs an [`NnGraph`].
    ///
    /// Only the parameter of the selected kind is checked, so an unused
    /// radius or `k` never causes a failure.
    ///
    /// # Errors
    /// Returns [`NnGraphError::ZeroNeighbours`], [`NnGraphError::InvalidRadius`],
    /// [`NnGraphError::InvalidOrder`] or [`NnGraphError::InvalidKernelWidth`]
    /// for out-of-range options, [`NnGraphError::KindNotSupported`] or
    /// [`NnGraphError::MetricNotSupported`] when the backend cannot service
    /// the request, and [`NnGraphError::BackendUnavailable`] when the backend
    /// is not compiled into this build.
    ///
    /// # Examples
    /// ```
    /// use nngraph_core::{BackendKind, NeighbourKind, NnGraphBuilder, NnGraphError};
    ///
    /// let err = NnGraphBuilder::new()
    ///     .with_backend(BackendKind::ApproximateGraph)
    ///     .with_kind(NeighbourKind::Radius)
    ///     .build()
    ///     .expect_err("radius is not supported by the graph index");
    /// assert!(matches!(err, NnGraphError::KindNotSupported { .. }));
    /// ```
    pub fn build(self) -> Result<NnGraph> {
        let metric = Metric::resolve(self.metric, self.order)?;
        let search_kind = match self.kind {
            NeighbourKind::Knn => SearchKind::knn(self.k)?,
            NeighbourKind::Radius => SearchKind::radius(self.radius)?,
        };
        if let Some(width) = self.kernel_width {
            if !(width.is_finite() && width > 0.0) {
                return Err(NnGraphError::InvalidKernelWidth { width });
            }
        }
        self.backend
            .validate_combination(search_kind.kind(), metric.kind())?;
        let search = self.backend.instantiate(&self.params)?;
        Ok(NnGraph::new(
            Preprocessing::new(self.center, self.rescale),
            metric,
            search_kind,
            self.kernel_width,
            search,
        ))
    }
}
