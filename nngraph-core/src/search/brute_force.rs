//! Exhaustive pairwise search.
//!
//! Computes every unordered pair once as a condensed upper triangle, then
//! mirrors it into per-row candidate lists. Exact for every metric.

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::{
    error::Result,
    features::FeatureMatrix,
    metric::{Metric, MetricKind},
    registry::BackendKind,
};

use super::{Neighbour, NeighbourSearch, Neighbourhood, SearchKind};

/// Pairwise-distance names for each metric, as used by condensed distance
/// routines.
pub(crate) const NATIVE_METRICS: [(MetricKind, &str); 4] = [
    (MetricKind::Euclidean, "euclidean"),
    (MetricKind::Manhattan, "cityblock"),
    (MetricKind::MaxDist, "chebyshev"),
    (MetricKind::Minkowski, "minkowski"),
];

fn native_name(metric: MetricKind) -> Option<&'static str> {
    NATIVE_METRICS
        .iter()
        .find(|(kind, _)| *kind == metric)
        .map(|(_, name)| *name)
}

/// Brute-force backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct BruteForceSearch;

impl NeighbourSearch for BruteForceSearch {
    fn backend(&self) -> BackendKind {
        BackendKind::BruteForce
    }

    #[instrument(
        name = "core.search.brute_force",
        err,
        skip(self, features),
        fields(vertices = features.len(), dimension = features.dimension()),
    )]
    fn search(
        &self,
        features: &FeatureMatrix,
        kind: SearchKind,
        metric: Metric,
    ) -> Result<Vec<Neighbourhood>> {
        let native = native_name(metric.kind())
            .ok_or_else(|| super::unsupported_metric(self.backend(), metric))?;
        debug!(native, "computing condensed distances");
        let condensed = condensed_distances(features, metric);
        let n = features.len();
        Ok((0..n)
            .into_par_iter()
            .map(|vertex| {
                let candidates = (0..n)
                    .filter(|&other| other != vertex)
                    .map(|other| Neighbour {
                        id: other,
                        distance: condensed.get(vertex, other),
                    })
                    .collect();
                Neighbourhood::from_candidates(vertex, candidates, kind)
            })
            .collect())
    }
}

/// Strict upper triangle of the distance matrix, one row per vertex.
struct Condensed {
    rows: Vec<Vec<f64>>,
}

impl Condensed {
    fn get(&self, i: usize, j: usize) -> f64 {
        let (low, high) = if i < j { (i, j) } else { (j, i) };
        self.rows[low][high - low - 1]
    }
}

fn condensed_distances(features: &FeatureMatrix, metric: Metric) -> Condensed {
    let n = features.len();
    let rows = (0..n)
        .into_par_iter()
        .map(|i| {
            let left = features.row(i);
            ((i + 1)..n)
                .map(|j| metric.distance(left, features.row(j)))
                .collect()
        })
        .collect();
    Condensed { rows }
}
