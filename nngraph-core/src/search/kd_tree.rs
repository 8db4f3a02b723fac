//! Exact k-d tree search.
//!
//! The tree is built once per search over row indices, splitting at the
//! median of the widest dimension until a node holds at most
//! [`LEAF_SIZE`] rows or its rows coincide. Queries run in parallel and prune
//! a subtree when the offset to its splitting plane already exceeds the
//! current bound, which is a valid lower bound for every Minkowski order
//! `p >= 1`.

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::{
    error::Result,
    features::FeatureMatrix,
    metric::{Metric, MetricKind, minkowski_distance},
    registry::BackendKind,
};

use super::{Collector, Neighbour, NeighbourSearch, Neighbourhood, SearchKind};

const LEAF_SIZE: usize = 16;

/// Minkowski exponent used by the tree for each metric.
pub(crate) const NATIVE_METRICS: [(MetricKind, NativeExponent); 4] = [
    (MetricKind::Euclidean, NativeExponent::Fixed(2.0)),
    (MetricKind::Manhattan, NativeExponent::Fixed(1.0)),
    (MetricKind::MaxDist, NativeExponent::Fixed(f64::INFINITY)),
    (MetricKind::Minkowski, NativeExponent::Order),
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum NativeExponent {
    Fixed(f64),
    Order,
}

fn native_exponent(metric: Metric) -> Option<f64> {
    let (_, exponent) = NATIVE_METRICS
        .iter()
        .find(|(kind, _)| *kind == metric.kind())?;
    Some(match *exponent {
        NativeExponent::Fixed(p) => p,
        NativeExponent::Order => metric.exponent(),
    })
}

/// Exact-tree backend.
#[derive(Clone, Copy, Debug)]
pub struct KdTreeSearch {
    leaf_size: usize,
}

impl Default for KdTreeSearch {
    fn default() -> Self {
        Self {
            leaf_size: LEAF_SIZE,
        }
    }
}

impl NeighbourSearch for KdTreeSearch {
    fn backend(&self) -> BackendKind {
        BackendKind::ExactTree
    }

    #[instrument(
        name = "core.search.kd_tree",
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
        let p = native_exponent(metric)
            .ok_or_else(|| super::unsupported_metric(self.backend(), metric))?;
        let tree = KdTree::build(features, self.leaf_size);
        debug!(nodes = tree.nodes.len(), p, "k-d tree built");
        Ok((0..features.len())
            .into_par_iter()
            .map(|vertex| {
                let mut collector = match kind {
                    SearchKind::Knn(k) => Collector::knn(k.get()),
                    SearchKind::Radius(radius) => Collector::within(radius),
                };
                tree.query(vertex, p, &mut collector);
                Neighbourhood::from_candidates(vertex, collector.into_vec(), kind)
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

/// Arena-allocated tree over a permutation of row indices.
#[derive(Debug)]
struct KdTree<'a> {
    features: &'a FeatureMatrix,
    order: Vec<usize>,
    nodes: Vec<Node>,
}

impl<'a> KdTree<'a> {
    fn build(features: &'a FeatureMatrix, leaf_size: usize) -> Self {
        let mut tree = Self {
            features,
            order: (0..features.len()).collect(),
            nodes: Vec::new(),
        };
        tree.build_node(0, features.len(), leaf_size.max(1));
        tree
    }

    fn build_node(&mut self, start: usize, end: usize, leaf_size: usize) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { start, end });
        if end - start <= leaf_size {
            return id;
        }
        let (axis, spread) = self.widest_axis(start, end);
        if spread <= 0.0 {
            return id;
        }
        let features = self.features;
        let half = (end - start) / 2;
        self.order[start..end].select_nth_unstable_by(half, |&a, &b| {
            features.row(a)[axis].total_cmp(&features.row(b)[axis])
        });
        let mid = start + half;
        let value = features.row(self.order[mid])[axis];
        let below = self.build_node(start, mid, leaf_size);
        let above = self.build_node(mid, end, leaf_size);
        self.nodes[id] = Node::Split {
            axis,
            value,
            below,
            above,
        };
        id
    }

    fn widest_axis(&self, start: usize, end: usize) -> (usize, f64) {
        let dimension = self.features.dimension();
        let first = self.features.row(self.order[start]);
        let mut low = first.to_vec();
        let mut high = first.to_vec();
        for &index in &self.order[start + 1..end] {
            for (axis, &value) in self.features.row(index).iter().enumerate() {
                low[axis] = low[axis].min(value);
                high[axis] = high[axis].max(value);
            }
        }
        (0..dimension)
            .map(|axis| (axis, high[axis] - low[axis]))
            .fold((0, f64::NEG_INFINITY), |best, candidate| {
                if candidate.1 > best.1 { candidate } else { best }
            })
    }

    fn query(&self, vertex: usize, p: f64, collector: &mut Collector) {
        self.visit(0, self.features.row(vertex), vertex, p, collector);
    }

    fn visit(&self, node: usize, point: &[f64], vertex: usize, p: f64, collector: &mut Collector) {
        match self.nodes[node] {
            Node::Leaf { start, end } => {
                for &index in &self.order[start..end] {
                    if index == vertex {
                        continue;
                    }
                    let distance = minkowski_distance(point, self.features.row(index), p);
                    collector.offer(Neighbour {
                        id: index,
                        distance,
                    });
                }
            }
            Node::Split {
                axis,
                value,
                below,
                above,
            } => {
                let offset = point[axis] - value;
                let (near, far) = if offset < 0.0 {
                    (below, above)
                } else {
                    (above, below)
                };
                self.visit(near, point, vertex, p, collector);
                if !exceeds(offset.abs(), collector.bound()) {
                    self.visit(far, point, vertex, p, collector);
                }
            }
        }
    }
}

/// Plane offsets equal to the bound are still visited so ties resolve by id;
/// a few ulps of slack absorb rounding in the distance kernels.
fn exceeds(offset: f64, bound: f64) -> bool {
    offset > bound + bound * 4.0 * f64::EPSILON
}
