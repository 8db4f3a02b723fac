//! Dense feature matrix providers.
//!
//! Loads `N × d` feature matrices for graph construction from Arrow
//! `FixedSizeList` arrays, Parquet columns and delimited text files.

mod delimited;
mod errors;
mod ingest;
mod provider;

pub use errors::DenseMatrixProviderError;
pub use provider::DenseMatrixProvider;

#[cfg(test)]
mod tests;
