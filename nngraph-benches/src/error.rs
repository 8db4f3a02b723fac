//! Benchmark setup error type.
//!
//! Lets setup helpers propagate failures with `?` instead of panicking.

use crate::source::SyntheticError;
use nngraph_core::NnGraphError;

/// Errors that may occur during benchmark setup.
#[derive(Debug, thiserror::Error)]
pub enum BenchSetupError {
    /// Synthetic data generation failed.
    #[error("synthetic source generation failed: {0}")]
    Synthetic(#[from] SyntheticError),
    /// Graph configuration or construction failed.
    #[error("graph construction failed: {0}")]
    Graph(#[from] NnGraphError),
}
