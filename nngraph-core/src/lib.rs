//! nngraph core library.
//!
//! Builds weighted nearest-neighbour graphs from dense feature matrices:
//! features are optionally centred and rescaled, neighbours are found by one
//! of four search backends, and the neighbour lists are turned into a sparse
//! symmetric Gaussian affinity matrix.
#![cfg_attr(docsrs, feature(doc_cfg))]

mod affinity;
mod builder;
mod error;
mod features;
mod graph;
mod metric;
mod nngraph;
mod preprocess;
mod registry;
mod search;

pub use crate::{
    affinity::{assemble, estimate_kernel_width, gaussian_weight},
    builder::NnGraphBuilder,
    error::{ErrorCategory, NnGraphError, NnGraphErrorCode, Result},
    features::FeatureMatrix,
    graph::AffinityGraph,
    metric::{Metric, MetricKind},
    nngraph::NnGraph,
    preprocess::{Preprocessing, center, rescale},
    registry::{BackendKind, Capabilities, validate},
    search::{
        BackendParams, BruteForceSearch, ForestParams, GraphIndexParams, Neighbour, NeighbourKind,
        NeighbourSearch, Neighbourhood, SearchKind,
    },
};

#[cfg(feature = "approximate-index")]
pub use crate::search::ForestSearch;
#[cfg(feature = "approximate-graph")]
pub use crate::search::GraphIndexSearch;
#[cfg(feature = "exact-tree")]
pub use crate::search::KdTreeSearch;

/// Re-exported so callers can name the affinity matrix type.
pub use sprs::CsMat;
