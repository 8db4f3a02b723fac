//! Helpers for copying fixed-size list arrays into row-major `f64` buffers.
use arrow_array::{Array, FixedSizeListArray, Float32Array, Float64Array};
use arrow_schema::{DataType, Field};

use crate::errors::DenseMatrixProviderError;

pub(crate) fn validate_fixed_size_list_field(
    field: &Field,
    column: &str,
) -> Result<usize, DenseMatrixProviderError> {
    match field.data_type() {
        DataType::FixedSizeList(child, width) => {
            validate_value_type(child.data_type())?;
            dimension_from_width(*width)
        }
        other => Err(DenseMatrixProviderError::InvalidColumnType {
            column: column.to_owned(),
            actual: other.clone(),
        }),
    }
}

pub(crate) fn append_fixed_size_list_values(
    array: &FixedSizeListArray,
    expected_dimension: Option<usize>,
    start_row: usize,
    out: &mut Vec<f64>,
) -> Result<usize, DenseMatrixProviderError> {
    validate_value_type(&array.value_type())?;
    let dimension = dimension_from_width(array.value_length())?;
    if let Some(expected) = expected_dimension.filter(|&expected| expected != dimension) {
        return Err(DenseMatrixProviderError::InconsistentBatchDimension {
            expected,
            actual: dimension,
        });
    }
    copy_list_values(array, dimension, start_row, out)?;
    Ok(dimension)
}

fn validate_value_type(value_type: &DataType) -> Result<(), DenseMatrixProviderError> {
    match value_type {
        DataType::Float32 | DataType::Float64 => Ok(()),
        other => Err(DenseMatrixProviderError::InvalidListValueType {
            actual: other.clone(),
        }),
    }
}

fn dimension_from_width(width: i32) -> Result<usize, DenseMatrixProviderError> {
    usize::try_from(width)
        .ok()
        .filter(|&dimension| dimension > 0)
        .ok_or(DenseMatrixProviderError::InvalidDimension { actual: width })
}

fn copy_list_values(
    array: &FixedSizeListArray,
    dimension: usize,
    start_row: usize,
    out: &mut Vec<f64>,
) -> Result<(), DenseMatrixProviderError> {
    let rows = array.len();
    let additional = rows
        .checked_mul(dimension)
        .ok_or(DenseMatrixProviderError::CapacityOverflow { rows, dimension })?;
    out.reserve(additional);
    for row_index in 0..rows {
        let absolute_row = start_row + row_index;
        if array.is_null(row_index) {
            return Err(DenseMatrixProviderError::NullRow { row: absolute_row });
        }
        let row = array.value(row_index);
        if row.len() != dimension {
            return Err(DenseMatrixProviderError::InvalidRowLength {
                row: absolute_row,
                expected: dimension,
                actual: row.len(),
            });
        }
        if let Some(value_index) = (0..dimension).find(|&idx| row.is_null(idx)) {
            return Err(DenseMatrixProviderError::NullValue {
                row: absolute_row,
                value_index,
            });
        }
        // Sliced child arrays expose only the row's values.
        if let Some(floats) = row.as_any().downcast_ref::<Float32Array>() {
            out.extend(floats.values().iter().map(|&value| f64::from(value)));
        } else if let Some(floats) = row.as_any().downcast_ref::<Float64Array>() {
            out.extend_from_slice(floats.values());
        } else {
            return Err(DenseMatrixProviderError::InvalidListValueType {
                actual: row.data_type().clone(),
            });
        }
    }
    Ok(())
}
