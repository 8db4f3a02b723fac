use arrow_schema::{ArrowError, DataType};
use nngraph_core::NnGraphError;
use thiserror::Error;

/// Errors raised while loading a dense feature matrix.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DenseMatrixProviderError {
    /// The requested column is absent from the Parquet schema.
    #[error("column `{column}` not found in Parquet schema")]
    ColumnNotFound {
        /// Requested column name.
        column: String,
    },
    /// The column is not a fixed-size list.
    #[error("column `{column}` must be a FixedSizeList<Float32 | Float64, _> but found {actual:?}")]
    InvalidColumnType {
        /// Requested column name.
        column: String,
        /// Type found in the schema.
        actual: DataType,
    },
    /// The list values are neither `Float32` nor `Float64`.
    #[error("FixedSizeList child type must be Float32 or Float64 but found {actual:?}")]
    InvalidListValueType {
        /// Child type found in the array.
        actual: DataType,
    },
    /// The list width is not a positive dimension.
    #[error("invalid FixedSizeList dimension {actual}")]
    InvalidDimension {
        /// Width declared by the list type.
        actual: i32,
    },
    /// A whole row is null.
    #[error("row {row} is null")]
    NullRow {
        /// Offending row.
        row: usize,
    },
    /// A row contains a null value.
    #[error("row {row} contains null value at position {value_index}")]
    NullValue {
        /// Offending row.
        row: usize,
        /// Position of the first null inside the row.
        value_index: usize,
    },
    /// A list row does not match the declared width.
    #[error("row {row} has length {actual} but expected {expected}")]
    InvalidRowLength {
        /// Offending row.
        row: usize,
        /// Declared width.
        expected: usize,
        /// Observed length.
        actual: usize,
    },
    /// The matrix size does not fit in memory addressing.
    #[error("matrix with {rows} rows and dimension {dimension} exceeds capacity limits")]
    CapacityOverflow {
        /// Rows in the offending batch.
        rows: usize,
        /// Row width.
        dimension: usize,
    },
    /// Record batches disagree on the list width.
    #[error("inconsistent dimensions across batches: expected {expected}, got {actual}")]
    InconsistentBatchDimension {
        /// Width of the first batch.
        expected: usize,
        /// Width of the offending batch.
        actual: usize,
    },
    /// A delimited field is not a number.
    #[error("line {line}, field {field}: `{value}` is not a number")]
    InvalidNumber {
        /// One-based line number.
        line: usize,
        /// Zero-based field index.
        field: usize,
        /// Offending text.
        value: String,
    },
    /// A delimited line has a different field count from the first data line.
    #[error("line {line} has {actual} fields but expected {expected}")]
    RaggedLine {
        /// One-based line number.
        line: usize,
        /// Field count of the first data line.
        expected: usize,
        /// Field count of the offending line.
        actual: usize,
    },
    /// The loaded values do not form a valid feature matrix.
    #[error(transparent)]
    Features(#[from] NnGraphError),
    /// Arrow reported an error.
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),
    /// Parquet decoding failed.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    /// Reading the source failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
