//! Benchmark parameter labels.

use std::fmt;

use nngraph_core::BackendKind;

/// Parameters for one graph construction benchmark.
#[derive(Clone, Copy, Debug)]
pub struct GraphBenchParams {
    /// Number of points in the dataset.
    pub point_count: usize,
    /// Backend under test.
    pub backend: BackendKind,
    /// Neighbours per vertex.
    pub k: usize,
}

impl fmt::Display for GraphBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},n={},k={}", self.backend, self.point_count, self.k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn labels_name_backend_size_and_k() {
        let params = GraphBenchParams {
            point_count: 500,
            backend: BackendKind::ApproximateGraph,
            k: 10,
        };
        assert_eq!(params.to_string(), "approximate-graph,n=500,k=10");
    }
}
