//! Approximate search over a randomised k-d forest.
//!
//! Each tree splits at the mean of a dimension drawn at random among the
//! highest-variance dimensions of the node. Queries descend every tree, queue
//! the branches they skip on a shared priority queue ordered by the summed
//! offsets to the planes crossed so far, and keep exploring until `checks`
//! distinct points have been examined and the request is satisfied. With
//! `checks >= N` every point is examined and the result is exact.
//!
//! The forest works in accumulated units: squared distances for Euclidean,
//! `sum |x|^p` for Minkowski. Radii are converted into these units on the
//! way in and distances back to true values on the way out.

use std::{
    cmp::{Ordering, Reverse},
    collections::{BinaryHeap, HashSet},
};

use rand::{Rng, SeedableRng, rngs::SmallRng};
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::{
    error::Result,
    features::FeatureMatrix,
    metric::{Metric, MetricKind, manhattan, minkowski_power, squared_euclidean},
    registry::BackendKind,
};

use super::{Collector, ForestParams, Neighbour, NeighbourSearch, Neighbourhood, SearchKind};

const LEAF_SIZE: usize = 4;
/// Split dimensions are drawn among this many highest-variance dimensions.
const RANDOM_DIMENSIONS: usize = 5;
/// Rows sampled from a node when estimating per-dimension mean and variance.
const SAMPLE_ROWS: usize = 100;

/// Distance each metric maps to inside the forest.
pub(crate) const NATIVE_METRICS: [(MetricKind, NativeDistance); 3] = [
    (MetricKind::Euclidean, NativeDistance::SquaredL2),
    (MetricKind::Manhattan, NativeDistance::L1),
    (MetricKind::Minkowski, NativeDistance::LpPower),
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum NativeDistance {
    SquaredL2,
    L1,
    LpPower,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum ForestDistance {
    SquaredEuclidean,
    Manhattan,
    MinkowskiPower(f64),
}

impl ForestDistance {
    fn for_metric(metric: Metric) -> Option<Self> {
        let (_, native) = NATIVE_METRICS
            .iter()
            .find(|(kind, _)| *kind == metric.kind())?;
        Some(match native {
            NativeDistance::SquaredL2 => Self::SquaredEuclidean,
            NativeDistance::L1 => Self::Manhattan,
            NativeDistance::LpPower => Self::MinkowskiPower(metric.exponent()),
        })
    }

    fn accumulate(self, left: &[f64], right: &[f64]) -> f64 {
        match self {
            Self::SquaredEuclidean => squared_euclidean(left, right),
            Self::Manhattan => manhattan(left, right),
            Self::MinkowskiPower(p) => minkowski_power(left, right, p),
        }
    }

    /// Contribution of a single-axis offset, in accumulated units.
    fn axis(self, offset: f64) -> f64 {
        match self {
            Self::SquaredEuclidean => offset * offset,
            Self::Manhattan => offset.abs(),
            Self::MinkowskiPower(p) => offset.abs().powf(p),
        }
    }

    fn from_true(self, distance: f64) -> f64 {
        self.axis(distance)
    }

    fn to_true(self, accumulated: f64) -> f64 {
        match self {
            Self::SquaredEuclidean => accumulated.sqrt(),
            Self::Manhattan => accumulated,
            Self::MinkowskiPower(p) => accumulated.powf(p.recip()),
        }
    }
}

/// Approximate-index backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct ForestSearch {
    params: ForestParams,
}

impl ForestSearch {
    /// Creates the backend with the given forest parameters.
    #[must_use]
    pub fn new(params: ForestParams) -> Self {
        Self { params }
    }
}

impl NeighbourSearch for ForestSearch {
    fn backend(&self) -> BackendKind {
        BackendKind::ApproximateIndex
    }

    #[instrument(
        name = "core.search.forest",
        err,
        skip(self, features),
        fields(
            vertices = features.len(),
            trees = self.params.trees(),
            checks = self.params.checks(),
        ),
    )]
    fn search(
        &self,
        features: &FeatureMatrix,
        kind: SearchKind,
        metric: Metric,
    ) -> Result<Vec<Neighbourhood>> {
        let distance = ForestDistance::for_metric(metric)
            .ok_or_else(|| super::unsupported_metric(self.backend(), metric))?;
        let forest = Forest::build(features, self.params);
        debug!(?distance, "randomised forest built");
        Ok((0..features.len())
            .into_par_iter()
            .map(|vertex| {
                let collector = match kind {
                    SearchKind::Knn(k) => Collector::knn(k.get()),
                    SearchKind::Radius(radius) => Collector::within(distance.from_true(radius)),
                };
                let candidates = forest
                    .query(vertex, distance, self.params.checks(), collector)
                    .into_iter()
                    .map(|found| Neighbour {
                        id: found.id,
                        distance: distance.to_true(found.distance),
                    })
                    .collect();
                Neighbourhood::from_candidates(vertex, candidates, kind)
            })
            .collect())
    }
}

#[derive(Clone, Copy, Debug)]
enum Node {
    Leaf {
        start: usize,
        end: usize,
    },
    Split {
        axis: usize,
        value: f64,
        below: usize,
        above: usize,
    },
}

#[derive(Debug)]
struct Tree {
    order: Vec<usize>,
    nodes: Vec<Node>,
}

/// Branch skipped during descent, ordered by its lower-bound estimate.
#[derive(Clone, Copy, Debug)]
struct Branch {
    bound: f64,
    tree: usize,
    node: usize,
}

impl PartialEq for Branch {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Branch {}

impl Ord for Branch {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bound
            .total_cmp(&other.bound)
            .then(self.tree.cmp(&other.tree))
            .then(self.node.cmp(&other.node))
    }
}

impl PartialOrd for Branch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Per-query traversal state shared across every tree.
struct Walk<'f> {
    forest: &'f Forest<'f>,
    point: &'f [f64],
    vertex: usize,
    distance: ForestDistance,
    branches: BinaryHeap<Reverse<Branch>>,
    visited: HashSet<usize>,
    checks: usize,
    collector: Collector,
}

impl Walk<'_> {
    fn descend(&mut self, tree: usize, mut node: usize, bound: f64) {
        let forest = self.forest;
        loop {
            match forest.trees[tree].nodes[node] {
                Node::Split {
                    axis,
                    value,
                    below,
                    above,
                } => {
                    let offset = self.point[axis] - value;
                    let (near, far) = if offset < 0.0 {
                        (below, above)
                    } else {
                        (above, below)
                    };
                    self.branches.push(Reverse(Branch {
                        bound: bound + self.distance.axis(offset),
                        tree,
                        node: far,
                    }));
                    node = near;
                }
                Node::Leaf { start, end } => {
                    for &index in &forest.trees[tree].order[start..end] {
                        if !self.visited.insert(index) {
                            continue;
                        }
                        self.checks += 1;
                        if index == self.vertex {
                            continue;
                        }
                        let accumulated = self
                            .distance
                            .accumulate(self.point, forest.features.row(index));
                        self.collector.offer(Neighbour {
                            id: index,
                            distance: accumulated,
                        });
                    }
                    return;
                }
            }
        }
    }

    fn finished(&self, max_checks: usize) -> bool {
        self.checks >= max_checks && self.collector.is_satisfied()
    }
}

#[derive(Debug)]
struct Forest<'a> {
    features: &'a FeatureMatrix,
    trees: Vec<Tree>,
}

impl<'a> Forest<'a> {
    fn build(features: &'a FeatureMatrix, params: ForestParams) -> Self {
        let trees = (0..params.trees())
            .into_par_iter()
            .map(|tree| {
                let seed = params.seed().wrapping_add(tree as u64);
                let mut builder = TreeBuilder {
                    features,
                    rng: SmallRng::seed_from_u64(seed),
                    order: (0..features.len()).collect(),
                    nodes: Vec::new(),
                };
                builder.build_node(0, features.len());
                Tree {
                    order: builder.order,
                    nodes: builder.nodes,
                }
            })
            .collect();
        Self { features, trees }
    }

    fn query(
        &self,
        vertex: usize,
        distance: ForestDistance,
        max_checks: usize,
        collector: Collector,
    ) -> Vec<Neighbour> {
        let mut walk = Walk {
            forest: self,
            point: self.features.row(vertex),
            vertex,
            distance,
            branches: BinaryHeap::new(),
            visited: HashSet::new(),
            checks: 0,
            collector,
        };
        for tree in 0..self.trees.len() {
            walk.descend(tree, 0, 0.0);
        }
        while !walk.finished(max_checks) {
            let Some(Reverse(branch)) = walk.branches.pop() else {
                break;
            };
            walk.descend(branch.tree, branch.node, branch.bound);
        }
        walk.collector.into_vec()
    }
}

struct TreeBuilder<'a> {
    features: &'a FeatureMatrix,
    rng: SmallRng,
    order: Vec<usize>,
    nodes: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn build_node(&mut self, start: usize, end: usize) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { start, end });
        if end - start <= LEAF_SIZE {
            return id;
        }
        let Some((axis, value)) = self.choose_split(start, end) else {
            return id;
        };
        let features = self.features;
        let slice = &mut self.order[start..end];
        let mut boundary = 0;
        for position in 0..slice.len() {
            if features.row(slice[position])[axis] < value {
                slice.swap(boundary, position);
                boundary += 1;
            }
        }
        if boundary == 0 || boundary == slice.len() {
            return id;
        }
        let mid = start + boundary;
        let below = self.build_node(start, mid);
        let above = self.build_node(mid, end);
        self.nodes[id] = Node::Split {
            axis,
            value,
            below,
            above,
        };
        id
    }

    /// Picks a random high-variance axis and its sample mean, or `None` when
    /// the sampled rows do not vary.
    fn choose_split(&mut self, start: usize, end: usize) -> Option<(usize, f64)> {
        let dimension = self.features.dimension();
        let sample = &self.order[start..end.min(start + SAMPLE_ROWS)];
        let count = sample.len() as f64;
        let mut mean = vec![0.0_f64; dimension];
        for &index in sample {
            for (total, value) in mean.iter_mut().zip(self.features.row(index)) {
                *total += value;
            }
        }
        mean.iter_mut().for_each(|total| *total /= count);
        let mut variance = vec![0.0_f64; dimension];
        for &index in sample {
            for ((total, value), centre) in variance
                .iter_mut()
                .zip(self.features.row(index))
                .zip(&mean)
            {
                let offset = value - centre;
                *total += offset * offset;
            }
        }
        let mut ranked: Vec<usize> = (0..dimension).filter(|&axis| variance[axis] > 0.0).collect();
        if ranked.is_empty() {
            return None;
        }
        ranked.sort_unstable_by(|&a, &b| variance[b].total_cmp(&variance[a]).then(a.cmp(&b)));
        ranked.truncate(RANDOM_DIMENSIONS);
        let axis = ranked[self.rng.gen_range(0..ranked.len())];
        Some((axis, mean[axis]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::BruteForceSearch;
    use rstest::rstest;

    fn spiral(points: usize) -> FeatureMatrix {
        let rows = (0..points)
            .map(|i| {
                let t = i as f64 * 0.37;
                vec![t.cos() * t, t.sin() * t, (i % 7) as f64 * 0.1]
            })
            .collect();
        FeatureMatrix::try_from_rows(rows).expect("valid spiral")
    }

    #[rstest]
    fn native_table_matches_capabilities() {
        let supported = BackendKind::ApproximateIndex.capabilities().metrics();
        assert_eq!(supported.len(), NATIVE_METRICS.len());
        for metric in supported {
            assert!(NATIVE_METRICS.iter().any(|(kind, _)| kind == metric));
        }
    }

    #[rstest]
    #[case(ForestDistance::SquaredEuclidean, 5.0)]
    #[case(ForestDistance::Manhattan, 7.0)]
    #[case(ForestDistance::MinkowskiPower(2.0), 5.0)]
    fn converts_accumulated_units_back(#[case] distance: ForestDistance, #[case] expected: f64) {
        let accumulated = distance.accumulate(&[0.0, 0.0], &[3.0, 4.0]);
        assert!((distance.to_true(accumulated) - expected).abs() < 1e-12);
    }

    #[rstest]
    fn radius_is_compared_in_accumulated_units() {
        assert_eq!(ForestDistance::SquaredEuclidean.from_true(0.5), 0.25);
        assert_eq!(ForestDistance::Manhattan.from_true(0.5), 0.5);
        assert!((ForestDistance::MinkowskiPower(3.0).from_true(0.5) - 0.125).abs() < 1e-15);
    }

    #[rstest]
    fn rejects_max_dist() {
        let features = spiral(8);
        let err = ForestSearch::default()
            .search(
                &features,
                SearchKind::knn(2).expect("k is positive"),
                Metric::MaxDist,
            )
            .expect_err("max_dist is unsupported");
        assert!(matches!(
            err,
            crate::NnGraphError::MetricNotSupported { .. }
        ));
    }

    #[rstest]
    fn exhaustive_checks_recover_exact_neighbours() {
        let features = spiral(60);
        let params = ForestParams::new(2, features.len()).expect("valid params");
        let kind = SearchKind::knn(4).expect("k is positive");
        let approximate = ForestSearch::new(params)
            .search(&features, kind, Metric::Euclidean)
            .expect("forest search");
        let exact = BruteForceSearch
            .search(&features, kind, Metric::Euclidean)
            .expect("brute force search");
        for (found, truth) in approximate.iter().zip(&exact) {
            let found_ids: Vec<_> = found.neighbours().iter().map(|n| n.id).collect();
            let true_ids: Vec<_> = truth.neighbours().iter().map(|n| n.id).collect();
            assert_eq!(found_ids, true_ids);
        }
    }

    #[rstest]
    fn same_seed_gives_same_lists() {
        let features = spiral(50);
        let kind = SearchKind::knn(3).expect("k is positive");
        let search = ForestSearch::new(ForestParams::new(3, 8).expect("valid").with_seed(11));
        let first = search.search(&features, kind, Metric::Manhattan).expect("search");
        let second = search.search(&features, kind, Metric::Manhattan).expect("search");
        assert_eq!(first, second);
    }
}
