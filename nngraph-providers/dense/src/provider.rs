//! Dense matrix provider and its Arrow and Parquet loaders.
use std::{fs::File, path::Path};

use arrow_array::{Array, FixedSizeListArray, RecordBatch, RecordBatchReader};
use nngraph_core::{FeatureMatrix, NnGraphError};
use parquet::arrow::{ProjectionMask, arrow_reader::ParquetRecordBatchReaderBuilder};
use parquet::file::reader::ChunkReader;
use tracing::{debug, instrument};

use crate::errors::DenseMatrixProviderError;
use crate::ingest::{append_fixed_size_list_values, validate_fixed_size_list_field};

/// Named feature matrix loaded from an external source.
#[derive(Clone, Debug)]
pub struct DenseMatrixProvider {
    name: String,
    features: FeatureMatrix,
}

impl DenseMatrixProvider {
    /// Wraps an already validated matrix.
    #[must_use]
    pub fn new(name: impl Into<String>, features: FeatureMatrix) -> Self {
        Self {
            name: name.into(),
            features,
        }
    }

    pub(crate) fn from_row_major(
        name: impl Into<String>,
        dimension: usize,
        values: Vec<f64>,
    ) -> Result<Self, DenseMatrixProviderError> {
        let features = FeatureMatrix::try_from_row_major(dimension, values)?;
        Ok(Self::new(name, features))
    }

    /// Returns the source name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns `true` when the provider holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Returns the dimensionality of each row.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.features.dimension()
    }

    /// Returns the loaded matrix.
    #[must_use]
    pub fn features(&self) -> &FeatureMatrix {
        &self.features
    }

    /// Consumes the provider, returning the matrix.
    #[must_use]
    pub fn into_features(self) -> FeatureMatrix {
        self.features
    }

    /// Loads data from an Arrow [`FixedSizeListArray`] of `Float32` or
    /// `Float64` values.
    ///
    /// # Errors
    /// Returns an error for null rows or values, unsupported child types and
    /// non-finite values.
    pub fn try_from_fixed_size_list(
        name: impl Into<String>,
        array: &FixedSizeListArray,
    ) -> Result<Self, DenseMatrixProviderError> {
        let mut values = Vec::new();
        let dimension = append_fixed_size_list_values(array, None, 0, &mut values)?;
        Self::from_row_major(name, dimension, values)
    }

    /// Loads `column` from a sequence of record batches.
    ///
    /// # Errors
    /// Returns [`DenseMatrixProviderError::ColumnNotFound`] when a batch lacks
    /// the column, [`DenseMatrixProviderError::InconsistentBatchDimension`]
    /// when batches disagree on the width, and the errors of
    /// [`Self::try_from_fixed_size_list`].
    pub fn try_from_record_batches(
        name: impl Into<String>,
        column: &str,
        batches: impl IntoIterator<Item = RecordBatch>,
    ) -> Result<Self, DenseMatrixProviderError> {
        let mut values = Vec::new();
        let mut rows = 0_usize;
        let mut dimension: Option<usize> = None;
        for batch in batches {
            let schema = batch.schema();
            let index = schema
                .index_of(column)
                .map_err(|_| DenseMatrixProviderError::ColumnNotFound {
                    column: column.to_owned(),
                })?;
            validate_fixed_size_list_field(schema.field(index), column)?;
            let list = downcast_list(batch.column(index).as_ref(), column)?;
            dimension = Some(append_fixed_size_list_values(
                list,
                dimension,
                rows,
                &mut values,
            )?);
            rows += list.len();
        }
        let dimension = dimension.ok_or(NnGraphError::EmptyFeatures)?;
        Self::from_row_major(name, dimension, values)
    }

    /// Loads a Parquet column containing `FixedSizeList<Float32 | Float64, D>`
    /// rows.
    ///
    /// # Errors
    /// Returns [`DenseMatrixProviderError::Io`] when the file cannot be
    /// opened, and the errors of [`Self::try_from_parquet_reader`].
    #[instrument(name = "providers.dense.parquet", err, skip(name, path), fields(path = %path.as_ref().display()))]
    pub fn try_from_parquet_path(
        name: impl Into<String>,
        path: impl AsRef<Path>,
        column: &str,
    ) -> Result<Self, DenseMatrixProviderError> {
        let file = File::open(path)?;
        Self::try_from_parquet_reader(name, file, column)
    }

    /// Loads a Parquet column from any chunked reader.
    ///
    /// # Errors
    /// Returns [`DenseMatrixProviderError::ColumnNotFound`] when the column is
    /// missing, [`DenseMatrixProviderError::InvalidColumnType`] when it is not
    /// a fixed-size float list, and Parquet decoding errors.
    pub fn try_from_parquet_reader<R>(
        name: impl Into<String>,
        reader: R,
        column: &str,
    ) -> Result<Self, DenseMatrixProviderError>
    where
        R: ChunkReader + 'static,
    {
        let builder = ParquetRecordBatchReaderBuilder::try_new(reader)?;
        let mask = ProjectionMask::columns(builder.parquet_schema(), [column]);
        let reader = builder.with_projection(mask).build()?;
        let schema = reader.schema();
        let column_index =
            schema
                .index_of(column)
                .map_err(|_| DenseMatrixProviderError::ColumnNotFound {
                    column: column.to_owned(),
                })?;
        let dimension = validate_fixed_size_list_field(schema.field(column_index), column)?;
        let mut values = Vec::new();
        let mut rows = 0_usize;
        for batch in reader {
            let batch = batch?;
            let list = downcast_list(batch.column(column_index).as_ref(), column)?;
            append_fixed_size_list_values(list, Some(dimension), rows, &mut values)?;
            rows += list.len();
        }
        debug!(rows, dimension, "parquet features loaded");
        Self::from_row_major(name, dimension, values)
    }
}

fn downcast_list<'a>(
    array: &'a dyn Array,
    column: &str,
) -> Result<&'a FixedSizeListArray, DenseMatrixProviderError> {
    array
        .as_any()
        .downcast_ref::<FixedSizeListArray>()
        .ok_or_else(|| DenseMatrixProviderError::InvalidColumnType {
            column: column.to_owned(),
            actual: array.data_type().clone(),
        })
}
