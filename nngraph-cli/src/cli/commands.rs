//! Command implementations and argument parsing for the `nngraph` CLI.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use nngraph_core::{
    AffinityGraph, BackendKind, FeatureMatrix, ForestParams, GraphIndexParams, MetricKind,
    NeighbourKind, NnGraphBuilder, NnGraphError,
};
use nngraph_providers_dense::{DenseMatrixProvider, DenseMatrixProviderError};
use thiserror::Error;
use tracing::{Span, field, info, instrument};

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(name = "nngraph", about = "Build weighted nearest-neighbour graphs.")]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Build a graph from a feature matrix.
    Build(BuildCommand),
}

/// Options accepted by the `build` command.
#[derive(Debug, Args, Clone)]
pub struct BuildCommand {
    /// Graph construction settings.
    #[command(flatten)]
    pub graph: GraphArgs,

    /// Print every undirected edge as `i<TAB>j<TAB>weight` after the summary.
    #[arg(long)]
    pub edges: bool,

    /// Feature source.
    #[command(subcommand)]
    pub source: BuildSource,
}

/// Construction settings mirroring [`NnGraphBuilder`].
#[derive(Debug, Args, Clone)]
pub struct GraphArgs {
    /// Distance metric: euclidean, manhattan, minkowski or max_dist.
    #[arg(long, default_value_t = MetricKind::Euclidean)]
    pub metric: MetricKind,

    /// Minkowski order; only read when the metric is minkowski.
    #[arg(long, default_value_t = 0.0)]
    pub order: f64,

    /// Neighbourhood kind: knn or radius.
    #[arg(long, default_value_t = NeighbourKind::Knn)]
    pub kind: NeighbourKind,

    /// Neighbours per vertex for knn graphs.
    #[arg(short = 'k', default_value_t = 10)]
    pub k: usize,

    /// Neighbourhood radius for radius graphs.
    #[arg(long, default_value_t = 0.01)]
    pub radius: f64,

    /// Gaussian kernel width; estimated from the neighbour distances when absent.
    #[arg(long = "kernel-width")]
    pub kernel_width: Option<f64>,

    /// Search backend: brute-force, exact-tree, approximate-index or approximate-graph.
    #[arg(long, default_value_t = BackendKind::ExactTree)]
    pub backend: BackendKind,

    /// Skip centring the features on the column means.
    #[arg(long = "no-center")]
    pub no_center: bool,

    /// Skip rescaling the features.
    #[arg(long = "no-rescale")]
    pub no_rescale: bool,

    /// Trees built by the approximate-index backend.
    #[arg(long)]
    pub trees: Option<usize>,

    /// Points examined per query for the approximate-index backend.
    #[arg(long)]
    pub checks: Option<usize>,

    /// Maximum links per node for the approximate-graph backend.
    #[arg(long = "max-connections")]
    pub max_connections: Option<usize>,

    /// Candidate list size while building the approximate-graph index.
    #[arg(long = "ef-construction")]
    pub ef_construction: Option<usize>,

    /// Candidate list size while querying the approximate-graph index.
    #[arg(long = "ef-search")]
    pub ef_search: Option<usize>,

    /// Seed for the approximate backends.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Input sources accepted by `build`.
#[derive(Debug, Subcommand, Clone)]
pub enum BuildSource {
    /// Read a Parquet column of `FixedSizeList<Float32 | Float64, D>` rows.
    Parquet(ParquetArgs),
    /// Read delimited text, one row per line.
    Text(TextArgs),
}

/// Parquet ingestion arguments.
#[derive(Debug, Args, Clone)]
pub struct ParquetArgs {
    /// Path to the Parquet file containing feature vectors.
    pub path: PathBuf,

    /// Column containing the feature rows.
    #[arg(long)]
    pub column: String,

    /// Override name for the data source (defaults to the file name).
    #[arg(long)]
    pub name: Option<String>,
}

/// Delimited text ingestion arguments.
#[derive(Debug, Args, Clone)]
pub struct TextArgs {
    /// Path to a text file with one row of numbers per line.
    pub path: PathBuf,

    /// Field separator; a space splits on any run of whitespace.
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,

    /// Override name for the data source (defaults to the file name).
    #[arg(long)]
    pub name: Option<String>,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Loading the feature matrix failed.
    #[error(transparent)]
    Dense(#[from] DenseMatrixProviderError),
    /// Graph configuration or construction failed.
    #[error(transparent)]
    Core(#[from] NnGraphError),
}

impl CliError {
    /// Returns the core error behind this failure, if any.
    #[must_use]
    pub fn core(&self) -> Option<&NnGraphError> {
        match self {
            Self::Core(core) | Self::Dense(DenseMatrixProviderError::Features(core)) => Some(core),
            Self::Dense(_) => None,
        }
    }
}

/// Outcome of a `build` command.
#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    /// Name of the loaded data source.
    pub data_source: String,
    /// Backend that produced the neighbour lists.
    pub backend: BackendKind,
    /// The constructed graph.
    pub graph: AffinityGraph,
    /// Whether the rendered output lists every edge.
    pub list_edges: bool,
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when loading or construction fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use clap::Parser;
/// # use nngraph_cli::cli::{Cli, run_cli};
/// # use tempfile::NamedTempFile;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let file = NamedTempFile::new()?;
/// std::fs::write(file.path(), "0,0\n0,1\n1,0\n1,1\n")?;
/// let path = file.path().to_str().ok_or("path is not UTF-8")?;
/// let cli = Cli::try_parse_from(["nngraph", "build", "-k", "2", "text", path])?;
/// let summary = run_cli(cli)?;
/// assert_eq!(summary.graph.vertex_count(), 4);
/// # Ok(())
/// # }
/// ```
#[instrument(
    name = "cli.run",
    err,
    skip(cli),
    fields(command = field::Empty),
)]
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    match cli.command {
        Command::Build(build) => {
            Span::current().record("command", field::display("build"));
            run_build(build)
        }
    }
}

#[instrument(
    name = "cli.build",
    err,
    skip(command),
    fields(backend = %command.graph.backend, source = field::Empty),
)]
pub(super) fn run_build(command: BuildCommand) -> Result<ExecutionSummary, CliError> {
    let BuildCommand {
        graph: args,
        edges,
        source,
    } = command;
    let builder = configure(&args)?;
    let nngraph = builder.build()?;

    let span = Span::current();
    let provider = match source {
        BuildSource::Parquet(parquet) => {
            span.record("source", field::display("parquet"));
            load_parquet(parquet)?
        }
        BuildSource::Text(text) => {
            span.record("source", field::display("text"));
            load_text(text)?
        }
    };

    let graph = nngraph.construct(provider.features())?;
    info!(
        data_source = provider.name(),
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "command completed"
    );
    Ok(ExecutionSummary {
        data_source: provider.name().to_owned(),
        backend: nngraph.backend(),
        graph,
        list_edges: edges,
    })
}

pub(super) fn configure(args: &GraphArgs) -> Result<NnGraphBuilder, CliError> {
    let mut builder = NnGraphBuilder::new()
        .with_center(!args.no_center)
        .with_rescale(!args.no_rescale)
        .with_metric(args.metric)
        .with_order(args.order)
        .with_kind(args.kind)
        .with_k(args.k)
        .with_radius(args.radius)
        .with_backend(args.backend)
        .with_forest_params(forest_params(args)?)
        .with_graph_index_params(graph_index_params(args)?);
    if let Some(width) = args.kernel_width {
        builder = builder.with_kernel_width(width);
    }
    Ok(builder)
}

fn forest_params(args: &GraphArgs) -> Result<ForestParams, NnGraphError> {
    let defaults = ForestParams::default();
    let params = ForestParams::new(
        args.trees.unwrap_or(defaults.trees()),
        args.checks.unwrap_or(defaults.checks()),
    )?;
    Ok(params.with_seed(args.seed.unwrap_or(defaults.seed())))
}

fn graph_index_params(args: &GraphArgs) -> Result<GraphIndexParams, NnGraphError> {
    let defaults = GraphIndexParams::default();
    let params = GraphIndexParams::new(
        args.max_connections.unwrap_or(defaults.max_connections()),
        args.ef_construction.unwrap_or(defaults.ef_construction()),
        args.ef_search.unwrap_or(defaults.ef_search()),
    )?;
    Ok(params.with_seed(args.seed.unwrap_or(defaults.seed())))
}

#[instrument(
    name = "cli.load_parquet",
    err,
    skip(args),
    fields(path = %args.path.display(), column = %args.column),
)]
pub(super) fn load_parquet(args: ParquetArgs) -> Result<DenseMatrixProvider, CliError> {
    let ParquetArgs { path, column, name } = args;
    let chosen_name = derive_data_source_name(&path, name.as_deref());
    Ok(DenseMatrixProvider::try_from_parquet_path(
        chosen_name,
        &path,
        &column,
    )?)
}

#[instrument(
    name = "cli.load_text",
    err,
    skip(args),
    fields(path = %args.path.display(), delimiter = ?args.delimiter),
)]
pub(super) fn load_text(args: TextArgs) -> Result<DenseMatrixProvider, CliError> {
    let TextArgs {
        path,
        delimiter,
        name,
    } = args;
    let chosen_name = derive_data_source_name(&path, name.as_deref());
    Ok(DenseMatrixProvider::try_from_delimited_path(
        chosen_name,
        &path,
        delimiter,
    )?)
}

pub(super) fn derive_data_source_name(path: &Path, override_name: Option<&str>) -> String {
    if let Some(name) = override_name {
        return name.to_owned();
    }

    path.file_stem()
        .and_then(|value| value.to_str())
        .map_or_else(|| "data_source".to_owned(), ToOwned::to_owned)
}

/// Renders `summary` to `writer` as `key: value` lines, followed by the edge
/// list when requested.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use nngraph_cli::cli::{ExecutionSummary, render_summary};
/// # use nngraph_core::{BackendKind, FeatureMatrix, NnGraphBuilder};
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let features = FeatureMatrix::try_from_rows(vec![vec![0.0], vec![1.0], vec![3.0]])?;
/// let graph = NnGraphBuilder::new()
///     .with_k(1)
///     .with_backend(BackendKind::BruteForce)
///     .build()?
///     .construct(&features)?;
/// let summary = ExecutionSummary {
///     data_source: "demo".into(),
///     backend: BackendKind::BruteForce,
///     graph,
///     list_edges: true,
/// };
/// let mut buffer = Vec::new();
/// render_summary(&summary, &mut buffer)?;
/// let text = String::from_utf8(buffer)?;
/// assert!(text.contains("vertices: 3"));
/// assert!(text.contains("0\t1\t"));
/// # Ok(())
/// # }
/// ```
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    let graph = &summary.graph;
    let features: &FeatureMatrix = graph.features();
    writeln!(writer, "data source: {}", summary.data_source)?;
    writeln!(writer, "backend: {}", summary.backend)?;
    writeln!(writer, "vertices: {}", graph.vertex_count())?;
    writeln!(writer, "dimension: {}", features.dimension())?;
    writeln!(writer, "edges: {}", graph.edge_count())?;
    writeln!(writer, "kernel width: {}", graph.kernel_width())?;
    if summary.list_edges {
        for (i, j, weight) in graph.edges() {
            writeln!(writer, "{i}\t{j}\t{weight}")?;
        }
    }
    Ok(())
}
