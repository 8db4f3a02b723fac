//! Neighbour search contract shared by every backend.
//!
//! A backend receives the (already preprocessed) feature matrix, the kind of
//! neighbourhood to compute, and the resolved metric. It returns one
//! [`Neighbourhood`] per vertex, sorted by `(distance, id)` with the vertex
//! itself as the first entry at distance zero.

use std::{
    cmp::Ordering,
    collections::BinaryHeap,
    fmt::{self, Debug},
    num::NonZeroUsize,
    str::FromStr,
};

use crate::{
    error::{NnGraphError, Result},
    features::FeatureMatrix,
    metric::Metric,
    registry::BackendKind,
};

mod brute_force;
#[cfg(feature = "approximate-index")]
mod forest;
#[cfg(feature = "approximate-graph")]
mod graph_index;
#[cfg(feature = "exact-tree")]
mod kd_tree;
mod params;

pub use self::{
    brute_force::BruteForceSearch,
    params::{BackendParams, ForestParams, GraphIndexParams},
};

#[cfg(feature = "approximate-index")]
#[cfg_attr(docsrs, doc(cfg(feature = "approximate-index")))]
pub use self::forest::ForestSearch;
#[cfg(feature = "approximate-graph")]
#[cfg_attr(docsrs, doc(cfg(feature = "approximate-graph")))]
pub use self::graph_index::GraphIndexSearch;
#[cfg(feature = "exact-tree")]
#[cfg_attr(docsrs, doc(cfg(feature = "exact-tree")))]
pub use self::kd_tree::KdTreeSearch;

/// Names of the two neighbourhood kinds.
///
/// # Examples
/// ```
/// use nngraph_core::NeighbourKind;
///
/// assert_eq!("radius".parse::<NeighbourKind>(), Ok(NeighbourKind::Radius));
/// assert_eq!(NeighbourKind::Knn.to_string(), "knn");
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum NeighbourKind {
    /// A fixed number of nearest neighbours per vertex.
    Knn,
    /// Every vertex within a distance threshold.
    Radius,
}

impl NeighbourKind {
    /// Both neighbourhood kinds.
    pub const ALL: [Self; 2] = [Self::Knn, Self::Radius];

    /// Returns the configuration spelling of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Knn => "knn",
            Self::Radius => "radius",
        }
    }
}

impl fmt::Display for NeighbourKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NeighbourKind {
    type Err = NnGraphError;

    fn from_str(raw: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == raw)
            .ok_or_else(|| NnGraphError::UnknownKind {
                name: raw.to_owned(),
            })
    }
}

/// A validated neighbourhood request.
///
/// # Examples
/// ```
/// use nngraph_core::{NeighbourKind, NnGraphError, SearchKind};
///
/// let knn = SearchKind::knn(5).expect("k is positive");
/// assert_eq!(knn.kind(), NeighbourKind::Knn);
/// assert_eq!(SearchKind::knn(0), Err(NnGraphError::ZeroNeighbours));
/// assert!(SearchKind::radius(-1.0).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SearchKind {
    /// The `k` nearest other vertices.
    Knn(NonZeroUsize),
    /// Every other vertex at distance `<= radius`.
    Radius(f64),
}

impl SearchKind {
    /// Requests the `k` nearest neighbours of every vertex.
    ///
    /// # Errors
    /// Returns [`NnGraphError::ZeroNeighbours`] when `k` is zero.
    pub fn knn(k: usize) -> Result<Self> {
        NonZeroUsize::new(k)
            .map(Self::Knn)
            .ok_or(NnGraphError::ZeroNeighbours)
    }

    /// Requests every neighbour within `radius` (inclusive).
    ///
    /// # Errors
    /// Returns [`NnGraphError::InvalidRadius`] unless `radius` is finite and
    /// strictly positive.
    pub fn radius(radius: f64) -> Result<Self> {
        if radius.is_finite() && radius > 0.0 {
            Ok(Self::Radius(radius))
        } else {
            Err(NnGraphError::InvalidRadius { radius })
        }
    }

    /// Returns the name of this request's kind.
    #[must_use]
    pub const fn kind(self) -> NeighbourKind {
        match self {
            Self::Knn(_) => NeighbourKind::Knn,
            Self::Radius(_) => NeighbourKind::Radius,
        }
    }
}

/// Neighbour discovered during a search, with its distance from the query.
///
/// Ordering compares distances with [`f64::total_cmp`] and breaks ties by
/// ascending id, which is the order every [`Neighbourhood`] is stored in.
///
/// # Examples
/// ```
/// use nngraph_core::Neighbour;
///
/// let near = Neighbour { id: 7, distance: 0.5 };
/// let tied = Neighbour { id: 2, distance: 0.5 };
/// assert!(tied < near);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbour {
    /// Row index of the neighbour.
    pub id: usize,
    /// Distance between the query vertex and [`Neighbour::id`].
    pub distance: f64,
}

impl Eq for Neighbour {}

impl Ord for Neighbour {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for Neighbour {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Ordered neighbour list of one vertex, self first.
#[derive(Clone, Debug, PartialEq)]
pub struct Neighbourhood {
    vertex: usize,
    neighbours: Vec<Neighbour>,
}

impl Neighbourhood {
    /// Builds the neighbourhood of `vertex` from candidate neighbours.
    ///
    /// Entries naming `vertex` itself are discarded, the rest are sorted by
    /// `(distance, id)` and cut to the request: the first `k` for
    /// [`SearchKind::Knn`], those at distance `<= radius` for
    /// [`SearchKind::Radius`]. The vertex is then prepended at distance zero.
    ///
    /// # Examples
    /// ```
    /// use nngraph_core::{Neighbour, Neighbourhood, SearchKind};
    ///
    /// let hood = Neighbourhood::from_candidates(
    ///     1,
    ///     vec![
    ///         Neighbour { id: 2, distance: 3.0 },
    ///         Neighbour { id: 0, distance: 1.0 },
    ///         Neighbour { id: 1, distance: 0.0 },
    ///     ],
    ///     SearchKind::knn(1).expect("k is positive"),
    /// );
    /// let ids: Vec<usize> = hood.neighbours().iter().map(|n| n.id).collect();
    /// assert_eq!(ids, vec![1, 0]);
    /// ```
    #[must_use]
    pub fn from_candidates(vertex: usize, mut candidates: Vec<Neighbour>, kind: SearchKind) -> Self {
        candidates.retain(|candidate| candidate.id != vertex);
        candidates.sort_unstable();
        match kind {
            SearchKind::Knn(k) => candidates.truncate(k.get()),
            SearchKind::Radius(radius) => candidates.retain(|candidate| candidate.distance <= radius),
        }
        let mut neighbours = Vec::with_capacity(candidates.len() + 1);
        neighbours.push(Neighbour {
            id: vertex,
            distance: 0.0,
        });
        neighbours.extend(candidates);
        Self { vertex, neighbours }
    }

    /// Returns the vertex this neighbourhood belongs to.
    #[must_use]
    #[rustfmt::skip]
    pub fn vertex(&self) -> usize { self.vertex }

    /// Returns every entry, self first.
    #[must_use]
    #[rustfmt::skip]
    pub fn neighbours(&self) -> &[Neighbour] { &self.neighbours }

    /// Returns the entries other than the vertex itself.
    #[must_use]
    pub fn others(&self) -> &[Neighbour] {
        &self.neighbours[1..]
    }

    /// Number of entries including self.
    #[must_use]
    #[rustfmt::skip]
    pub fn len(&self) -> usize { self.neighbours.len() }

    /// Always `false`: the vertex itself is always present.
    #[must_use]
    #[rustfmt::skip]
    pub fn is_empty(&self) -> bool { self.neighbours.is_empty() }
}

/// A nearest-neighbour search strategy.
///
/// Implementations must return exactly one [`Neighbourhood`] per row, in row
/// order, built through [`Neighbourhood::from_candidates`] so the ordering
/// contract holds regardless of how many worker threads took part.
pub trait NeighbourSearch: Send + Sync + Debug {
    /// Returns the backend this strategy implements.
    fn backend(&self) -> BackendKind;

    /// Computes the neighbourhood of every row in `features`.
    ///
    /// # Errors
    /// Returns [`NnGraphError::KindNotSupported`] or
    /// [`NnGraphError::MetricNotSupported`] when the backend cannot service
    /// the request, and [`NnGraphError::BackendUnavailable`] when its index
    /// cannot be constructed.
    fn search(
        &self,
        features: &FeatureMatrix,
        kind: SearchKind,
        metric: Metric,
    ) -> Result<Vec<Neighbourhood>>;
}

/// Collects the best candidates seen while walking an index.
///
/// The pruning bound is the worst retained distance once `k` candidates are
/// held (infinite before that) for k-NN requests and the fixed radius for
/// radius requests. Distances may be in any monotone unit the caller uses
/// consistently.
#[derive(Debug)]
#[cfg_attr(
    not(any(feature = "exact-tree", feature = "approximate-index")),
    allow(dead_code)
)]
pub(crate) enum Collector {
    Knn {
        k: usize,
        best: BinaryHeap<Neighbour>,
    },
    Within {
        radius: f64,
        found: Vec<Neighbour>,
    },
}

#[cfg_attr(
    not(any(feature = "exact-tree", feature = "approximate-index")),
    allow(dead_code)
)]
impl Collector {
    pub(crate) fn knn(k: usize) -> Self {
        Self::Knn {
            k,
            best: BinaryHeap::with_capacity(k + 1),
        }
    }

    pub(crate) fn within(radius: f64) -> Self {
        Self::Within {
            radius,
            found: Vec::new(),
        }
    }

    #[cfg_attr(not(feature = "exact-tree"), allow(dead_code))]
    pub(crate) fn bound(&self) -> f64 {
        match self {
            Self::Knn { k, best } if best.len() >= *k => best
                .peek()
                .map_or(f64::INFINITY, |furthest| furthest.distance),
            Self::Knn { .. } => f64::INFINITY,
            Self::Within { radius, .. } => *radius,
        }
    }

    /// Returns `true` once a k-NN collector holds `k` candidates; radius
    /// collectors are always satisfied.
    pub(crate) fn is_satisfied(&self) -> bool {
        match self {
            Self::Knn { k, best } => best.len() >= *k,
            Self::Within { .. } => true,
        }
    }

    pub(crate) fn offer(&mut self, candidate: Neighbour) {
        match self {
            Self::Knn { k, best } => {
                if best.len() < *k {
                    best.push(candidate);
                } else if best.peek().is_some_and(|furthest| candidate < *furthest) {
                    best.pop();
                    best.push(candidate);
                }
            }
            Self::Within { radius, found } => {
                if candidate.distance <= *radius {
                    found.push(candidate);
                }
            }
        }
    }

    pub(crate) fn into_vec(self) -> Vec<Neighbour> {
        match self {
            Self::Knn { best, .. } => best.into_vec(),
            Self::Within { found, .. } => found,
        }
    }
}

pub(crate) fn unsupported_kind(backend: BackendKind, kind: SearchKind) -> NnGraphError {
    NnGraphError::KindNotSupported {
        backend,
        kind: kind.kind(),
    }
}

pub(crate) fn unsupported_metric(backend: BackendKind, metric: Metric) -> NnGraphError {
    NnGraphError::MetricNotSupported {
        backend,
        metric: metric.kind(),
    }
}
