//! Approximate search over a hierarchical navigable small-world graph.
//!
//! The graph is built sequentially from a seeded RNG, then every vertex is
//! queried in parallel with a breadth of `max(ef_search, k + 1)`. Queries
//! that surface fewer than `k` other vertices are completed by an exhaustive
//! scan so each list still holds exactly `k + 1` entries.

mod graph;

use std::collections::HashSet;

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::{
    error::Result,
    features::FeatureMatrix,
    metric::{Metric, MetricKind, chebyshev, euclidean, manhattan},
    registry::BackendKind,
};

use self::graph::LayeredGraph;
use super::{GraphIndexParams, Neighbour, NeighbourSearch, Neighbourhood, SearchKind};

/// Space name each metric maps to inside the graph index.
pub(crate) const NATIVE_METRICS: [(MetricKind, Space); 3] = [
    (MetricKind::Euclidean, Space::L2),
    (MetricKind::Manhattan, Space::L1),
    (MetricKind::MaxDist, Space::LInf),
];

/// Vector space the graph is built in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Space {
    L2,
    L1,
    LInf,
}

impl Space {
    fn for_metric(metric: Metric) -> Option<Self> {
        NATIVE_METRICS
            .iter()
            .find(|(kind, _)| *kind == metric.kind())
            .map(|(_, space)| *space)
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::L2 => "l2",
            Self::L1 => "l1",
            Self::LInf => "linf",
        }
    }

    fn distance(self, left: &[f64], right: &[f64]) -> f64 {
        match self {
            Self::L2 => euclidean(left, right),
            Self::L1 => manhattan(left, right),
            Self::LInf => chebyshev(left, right),
        }
    }
}

/// Approximate-graph backend.
#[derive(Clone, Debug, Default)]
pub struct GraphIndexSearch {
    params: GraphIndexParams,
}

impl GraphIndexSearch {
    /// Creates the backend with the given graph parameters.
    #[must_use]
    pub fn new(params: GraphIndexParams) -> Self {
        Self { params }
    }
}

impl NeighbourSearch for GraphIndexSearch {
    fn backend(&self) -> BackendKind {
        BackendKind::ApproximateGraph
    }

    #[instrument(
        name = "core.search.graph_index",
        err,
        skip(self, features),
        fields(
            vertices = features.len(),
            max_connections = self.params.max_connections(),
            ef_search = self.params.ef_search(),
        ),
    )]
    fn search(
        &self,
        features: &FeatureMatrix,
        kind: SearchKind,
        metric: Metric,
    ) -> Result<Vec<Neighbourhood>> {
        let SearchKind::Knn(k) = kind else {
            return Err(super::unsupported_kind(self.backend(), kind));
        };
        let space = Space::for_metric(metric)
            .ok_or_else(|| super::unsupported_metric(self.backend(), metric))?;
        let graph = LayeredGraph::build(features, space, &self.params);
        debug!(space = space.as_str(), vertices = graph.len(), "graph index built");
        let ef = self.params.ef_search().max(k.get() + 1);
        let hoods: Vec<(Neighbourhood, bool)> = (0..features.len())
            .into_par_iter()
            .map(|vertex| {
                let mut candidates = query(&graph, features.row(vertex), ef);
                let found = candidates.iter().filter(|n| n.id != vertex).count();
                let topped_up = found < k.get();
                if topped_up {
                    complete_exhaustively(&graph, features, vertex, &mut candidates);
                }
                (Neighbourhood::from_candidates(vertex, candidates, kind), topped_up)
            })
            .collect();
        let topped_up = hoods.iter().filter(|(_, topped)| *topped).count();
        if topped_up > 0 {
            debug!(topped_up, "completed short neighbour lists by exhaustive scan");
        }
        Ok(hoods.into_iter().map(|(hood, _)| hood).collect())
    }
}

fn query(graph: &LayeredGraph<'_>, point: &[f64], ef: usize) -> Vec<Neighbour> {
    let Some(entry) = graph.entry() else {
        return Vec::new();
    };
    let mut current = entry.node;
    for layer in (1..=entry.level).rev() {
        current = graph.greedy_search_layer(point, current, layer);
    }
    graph.search_layer(point, current, 0, ef)
}

fn complete_exhaustively(
    graph: &LayeredGraph<'_>,
    features: &FeatureMatrix,
    vertex: usize,
    candidates: &mut Vec<Neighbour>,
) {
    let present: HashSet<usize> = candidates.iter().map(|n| n.id).collect();
    let point = features.row(vertex);
    candidates.extend(
        (0..features.len())
            .filter(|id| !present.contains(id))
            .map(|id| Neighbour {
                id,
                distance: graph.distance(point, id),
            }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NnGraphError, search::BruteForceSearch};
    use rstest::rstest;

    fn clusters() -> FeatureMatrix {
        let rows = (0..90)
            .map(|i| {
                let centre = f64::from(i % 3) * 10.0;
                let jitter = f64::from(i) * 0.013;
                vec![centre + jitter.sin(), centre - jitter.cos()]
            })
            .collect();
        FeatureMatrix::try_from_rows(rows).expect("valid rows")
    }

    #[rstest]
    fn native_table_matches_capabilities() {
        let supported = BackendKind::ApproximateGraph.capabilities().metrics();
        assert_eq!(supported.len(), NATIVE_METRICS.len());
        for metric in supported {
            assert!(NATIVE_METRICS.iter().any(|(kind, _)| kind == metric));
        }
        assert_eq!(Space::LInf.as_str(), "linf");
    }

    #[rstest]
    fn radius_is_rejected() {
        let err = GraphIndexSearch::default()
            .search(
                &clusters(),
                SearchKind::radius(1.0).expect("radius is valid"),
                Metric::Euclidean,
            )
            .expect_err("radius is unsupported");
        assert!(matches!(err, NnGraphError::KindNotSupported { .. }));
    }

    #[rstest]
    #[case(Metric::Euclidean)]
    #[case(Metric::Manhattan)]
    #[case(Metric::MaxDist)]
    fn lists_hold_k_plus_one_sorted_entries(#[case] metric: Metric) {
        let features = clusters();
        let kind = SearchKind::knn(6).expect("k is positive");
        let params = GraphIndexParams::new(2, 2, 1).expect("valid params");
        let hoods = GraphIndexSearch::new(params)
            .search(&features, kind, metric)
            .expect("graph search");
        for (vertex, hood) in hoods.iter().enumerate() {
            assert_eq!(hood.len(), 7);
            assert_eq!(hood.neighbours()[0], Neighbour { id: vertex, distance: 0.0 });
            assert!(hood.others().windows(2).all(|pair| pair[0] <= pair[1]));
        }
    }

    #[rstest]
    fn recall_is_high_on_separated_clusters() {
        let features = clusters();
        let kind = SearchKind::knn(5).expect("k is positive");
        let approximate = GraphIndexSearch::default()
            .search(&features, kind, Metric::Euclidean)
            .expect("graph search");
        let exact = BruteForceSearch
            .search(&features, kind, Metric::Euclidean)
            .expect("brute force search");
        let mut hits = 0_usize;
        for (found, truth) in approximate.iter().zip(&exact) {
            let truth: HashSet<usize> = truth.others().iter().map(|n| n.id).collect();
            hits += found.others().iter().filter(|n| truth.contains(&n.id)).count();
        }
        let recall = hits as f64 / (features.len() * 5) as f64;
        assert!(recall >= 0.9, "recall {recall} too low");
    }
}
