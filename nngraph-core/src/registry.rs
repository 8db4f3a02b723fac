//! Metric and strategy registry.
//!
//! Declares which neighbourhood kinds and metrics each backend can service and
//! instantiates backends. Validation is pure and runs before any search work.

use core::{fmt, str::FromStr};

use crate::{
    error::{NnGraphError, Result},
    metric::{Metric, MetricKind},
    search::{BackendParams, BruteForceSearch, NeighbourKind, NeighbourSearch, SearchKind},
};

/// The four neighbour search strategies.
///
/// # Examples
/// ```
/// use nngraph_core::{BackendKind, MetricKind, NeighbourKind};
///
/// let backend: BackendKind = "approximate-graph".parse().expect("known backend");
/// assert!(!backend.capabilities().supports_kind(NeighbourKind::Radius));
/// assert!(!backend.capabilities().supports_metric(MetricKind::Minkowski));
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum BackendKind {
    /// Exhaustive pairwise distances.
    BruteForce,
    /// Exact k-d tree.
    #[default]
    ExactTree,
    /// Randomised k-d forest with bounded best-bin-first queries.
    ApproximateIndex,
    /// Hierarchical navigable small-world graph.
    ApproximateGraph,
}

/// Kinds and metrics a backend accepts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Capabilities {
    kinds: &'static [NeighbourKind],
    metrics: &'static [MetricKind],
}

impl Capabilities {
    /// Neighbourhood kinds the backend implements.
    #[must_use]
    pub const fn kinds(&self) -> &'static [NeighbourKind] {
        self.kinds
    }

    /// Metrics the backend can evaluate.
    #[must_use]
    pub const fn metrics(&self) -> &'static [MetricKind] {
        self.metrics
    }

    /// Returns whether `kind` is implemented.
    #[must_use]
    pub fn supports_kind(&self, kind: NeighbourKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Returns whether `metric` can be evaluated.
    #[must_use]
    pub fn supports_metric(&self, metric: MetricKind) -> bool {
        self.metrics.contains(&metric)
    }
}

const BOTH_KINDS: &[NeighbourKind] = &[NeighbourKind::Knn, NeighbourKind::Radius];

const BRUTE_FORCE: Capabilities = Capabilities {
    kinds: BOTH_KINDS,
    metrics: &MetricKind::ALL,
};

const EXACT_TREE: Capabilities = Capabilities {
    kinds: BOTH_KINDS,
    metrics: &MetricKind::ALL,
};

const APPROXIMATE_INDEX: Capabilities = Capabilities {
    kinds: BOTH_KINDS,
    metrics: &[
        MetricKind::Euclidean,
        MetricKind::Manhattan,
        MetricKind::Minkowski,
    ],
};

const APPROXIMATE_GRAPH: Capabilities = Capabilities {
    kinds: &[NeighbourKind::Knn],
    metrics: &[
        MetricKind::Euclidean,
        MetricKind::Manhattan,
        MetricKind::MaxDist,
    ],
};

impl BackendKind {
    /// Every backend, compiled or not.
    pub const ALL: [Self; 4] = [
        Self::BruteForce,
        Self::ExactTree,
        Self::ApproximateIndex,
        Self::ApproximateGraph,
    ];

    /// Returns the configuration spelling of the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BruteForce => "brute-force",
            Self::ExactTree => "exact-tree",
            Self::ApproximateIndex => "approximate-index",
            Self::ApproximateGraph => "approximate-graph",
        }
    }

    /// Returns the static capability table of the backend.
    #[must_use]
    pub const fn capabilities(self) -> &'static Capabilities {
        match self {
            Self::BruteForce => &BRUTE_FORCE,
            Self::ExactTree => &EXACT_TREE,
            Self::ApproximateIndex => &APPROXIMATE_INDEX,
            Self::ApproximateGraph => &APPROXIMATE_GRAPH,
        }
    }

    /// Returns whether the backend is part of this build.
    #[must_use]
    pub const fn is_available(self) -> bool {
        match self {
            Self::BruteForce => true,
            Self::ExactTree => cfg!(feature = "exact-tree"),
            Self::ApproximateIndex => cfg!(feature = "approximate-index"),
            Self::ApproximateGraph => cfg!(feature = "approximate-graph"),
        }
    }

    /// Checks that the backend implements `kind` and supports `metric`.
    ///
    /// # Errors
    /// Returns [`NnGraphError::KindNotSupported`] or
    /// [`NnGraphError::MetricNotSupported`].
    pub fn validate_combination(self, kind: NeighbourKind, metric: MetricKind) -> Result<()> {
        let capabilities = self.capabilities();
        if !capabilities.supports_kind(kind) {
            return Err(NnGraphError::KindNotSupported {
                backend: self,
                kind,
            });
        }
        if !capabilities.supports_metric(metric) {
            return Err(NnGraphError::MetricNotSupported {
                backend: self,
                metric,
            });
        }
        Ok(())
    }

    /// Creates the search strategy for this backend.
    ///
    /// # Errors
    /// Returns [`NnGraphError::BackendUnavailable`] when the backend's cargo
    /// feature is disabled in this build.
    pub fn instantiate(self, params: &BackendParams) -> Result<Box<dyn NeighbourSearch>> {
        #[cfg(not(any(feature = "approximate-index", feature = "approximate-graph")))]
        let _ = params;
        match self {
            Self::BruteForce => Ok(Box::new(BruteForceSearch)),
            #[cfg(feature = "exact-tree")]
            Self::ExactTree => Ok(Box::new(crate::search::KdTreeSearch::default())),
            #[cfg(not(feature = "exact-tree"))]
            Self::ExactTree => Err(self.compiled_out()),
            #[cfg(feature = "approximate-index")]
            Self::ApproximateIndex => Ok(Box::new(crate::search::ForestSearch::new(
                params.forest,
            ))),
            #[cfg(not(feature = "approximate-index"))]
            Self::ApproximateIndex => Err(self.compiled_out()),
            #[cfg(feature = "approximate-graph")]
            Self::ApproximateGraph => Ok(Box::new(crate::search::GraphIndexSearch::new(
                params.graph_index.clone(),
            ))),
            #[cfg(not(feature = "approximate-graph"))]
            Self::ApproximateGraph => Err(self.compiled_out()),
        }
    }

    #[cfg(not(all(
        feature = "exact-tree",
        feature = "approximate-index",
        feature = "approximate-graph"
    )))]
    fn compiled_out(self) -> NnGraphError {
        NnGraphError::BackendUnavailable {
            backend: self,
            reason: format!("the `{}` cargo feature is disabled", self.as_str()),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = NnGraphError;

    fn from_str(raw: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|backend| backend.as_str() == raw)
            .ok_or_else(|| NnGraphError::UnknownBackend {
                name: raw.to_owned(),
            })
    }
}

/// Validates a complete request against the registry.
///
/// Checks run in order: kind support, metric support, then the k-NN size
/// rule `k < vertices`.
///
/// # Errors
/// Returns [`NnGraphError::KindNotSupported`],
/// [`NnGraphError::MetricNotSupported`] or
/// [`NnGraphError::TooManyNeighbours`].
///
/// # Examples
/// ```
/// use nngraph_core::{BackendKind, Metric, NnGraphError, SearchKind, validate};
///
/// let knn = SearchKind::knn(3).expect("k is positive");
/// assert!(validate(BackendKind::BruteForce, knn, Metric::Euclidean, 4).is_ok());
/// assert_eq!(
///     validate(BackendKind::BruteForce, knn, Metric::Euclidean, 3),
///     Err(NnGraphError::TooManyNeighbours { k: 3, vertices: 3 })
/// );
/// ```
pub fn validate(
    backend: BackendKind,
    kind: SearchKind,
    metric: Metric,
    vertices: usize,
) -> Result<()> {
    backend.validate_combination(kind.kind(), metric.kind())?;
    match kind {
        SearchKind::Knn(k) if k.get() >= vertices => Err(NnGraphError::TooManyNeighbours {
            k: k.get(),
            vertices,
        }),
        _ => Ok(()),
    }
}
