use super::{DenseMatrixProvider, DenseMatrixProviderError};
use arrow_array::{Array, ArrayRef, FixedSizeListArray, Float32Array, Float64Array, RecordBatch};
use arrow_schema::{DataType, Field, Schema};
use bytes::Bytes;
use parquet::arrow::arrow_writer::ArrowWriter;
use std::sync::Arc;

pub(crate) fn f32_list(rows: &[Vec<f32>], dimension: usize) -> FixedSizeListArray {
    assert!(rows.iter().all(|row| row.len() == dimension));
    let values = Float32Array::from_iter_values(rows.iter().flatten().copied());
    list_of(Arc::new(values), DataType::Float32, dimension)
}

pub(crate) fn f64_list(rows: &[Vec<f64>], dimension: usize) -> FixedSizeListArray {
    assert!(rows.iter().all(|row| row.len() == dimension));
    let values = Float64Array::from_iter_values(rows.iter().flatten().copied());
    list_of(Arc::new(values), DataType::Float64, dimension)
}

fn list_of(values: ArrayRef, value_type: DataType, dimension: usize) -> FixedSizeListArray {
    FixedSizeListArray::new(
        Arc::new(Field::new("item", value_type, false)),
        i32::try_from(dimension).expect("dimension fits in i32"),
        values,
        None,
    )
}

pub(crate) fn batch_of(array: FixedSizeListArray) -> RecordBatch {
    let field = Field::new("features", array.data_type().clone(), false);
    let schema = Arc::new(Schema::new(vec![field]));
    RecordBatch::try_new(schema, vec![Arc::new(array) as ArrayRef]).expect("batch")
}

pub(crate) fn write_parquet(batches: &[RecordBatch]) -> Bytes {
    let schema = batches.first().expect("at least one batch").schema();
    let mut buffer = Vec::new();
    {
        let mut writer = ArrowWriter::try_new(&mut buffer, schema, None).expect("writer");
        for batch in batches {
            writer.write(batch).expect("write");
        }
        writer.close().expect("close");
    }
    Bytes::from(buffer)
}

pub(crate) fn load(bytes: Bytes, column: &str) -> Result<DenseMatrixProvider, DenseMatrixProviderError> {
    DenseMatrixProvider::try_from_parquet_reader("demo", bytes, column)
}
