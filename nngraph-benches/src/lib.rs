//! Benchmark support crate for nngraph.
//!
//! Provides seeded synthetic feature matrices and parameter labels used by
//! the Criterion benchmarks comparing the search backends and affinity
//! assembly.

pub mod error;
pub mod params;
pub mod source;
