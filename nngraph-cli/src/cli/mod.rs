//! Command-line interface for building nearest-neighbour graphs.
//!
//! The `build` command loads a dense feature matrix from Parquet or delimited
//! text, constructs the weighted graph and reports a summary, optionally
//! followed by the edge list.

mod commands;

pub use commands::{
    BuildCommand, BuildSource, Cli, CliError, Command, ExecutionSummary, GraphArgs, ParquetArgs,
    TextArgs, render_summary, run_cli,
};
