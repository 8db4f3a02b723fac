//! Result of a graph construction.

use sprs::CsMat;

use crate::{features::FeatureMatrix, search::Neighbourhood};

/// Weighted nearest-neighbour graph produced by [`crate::NnGraph::construct`].
///
/// Holds the symmetric affinity matrix, the coordinates after preprocessing,
/// the kernel width that weighted the edges and the neighbour lists the
/// matrix was assembled from.
#[derive(Clone, Debug)]
pub struct AffinityGraph {
    affinity: CsMat<f64>,
    features: FeatureMatrix,
    kernel_width: f64,
    neighbourhoods: Vec<Neighbourhood>,
}

impl AffinityGraph {
    pub(crate) fn new(
        affinity: CsMat<f64>,
        features: FeatureMatrix,
        kernel_width: f64,
        neighbourhoods: Vec<Neighbourhood>,
    ) -> Self {
        Self {
            affinity,
            features,
            kernel_width,
            neighbourhoods,
        }
    }

    /// Returns the sparse symmetric affinity matrix in CSR form.
    #[must_use]
    pub fn affinity(&self) -> &CsMat<f64> {
        &self.affinity
    }

    /// Returns the coordinates after centring and rescaling.
    #[must_use]
    pub fn features(&self) -> &FeatureMatrix {
        &self.features
    }

    /// Returns the Gaussian kernel width, supplied or estimated.
    #[must_use]
    pub fn kernel_width(&self) -> f64 {
        self.kernel_width
    }

    /// Returns the per-vertex neighbour lists, self first.
    #[must_use]
    pub fn neighbourhoods(&self) -> &[Neighbourhood] {
        &self.neighbourhoods
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.affinity.rows()
    }

    /// Number of undirected edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }

    /// Weight of the edge between `i` and `j`, if present.
    #[must_use]
    pub fn weight(&self, i: usize, j: usize) -> Option<f64> {
        self.affinity.get(i, j).copied()
    }

    /// Number of edges incident to `vertex`, zero for out-of-range vertices.
    #[must_use]
    pub fn degree(&self, vertex: usize) -> usize {
        self.affinity
            .outer_view(vertex)
            .map_or(0, |row| row.nnz())
    }

    /// Iterates over undirected edges as `(i, j, weight)` with `i < j`, in
    /// row-major order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.affinity
            .outer_iterator()
            .enumerate()
            .flat_map(|(i, row)| {
                row.iter()
                    .filter(move |&(j, _)| j > i)
                    .map(move |(j, &weight)| (i, j, weight))
                    .collect::<Vec<_>>()
            })
    }

    /// Consumes the graph, returning the matrix, features, kernel width and
    /// neighbour lists.
    #[must_use]
    pub fn into_parts(self) -> (CsMat<f64>, FeatureMatrix, f64, Vec<Neighbourhood>) {
        (
            self.affinity,
            self.features,
            self.kernel_width,
            self.neighbourhoods,
        )
    }
}
