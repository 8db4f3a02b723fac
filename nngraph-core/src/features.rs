//! Dense feature matrices handed to graph construction.

use crate::error::{NnGraphError, Result};

/// Row-major `N × d` matrix of finite feature values.
///
/// Construction validates the shape and rejects NaN or infinite values, so
/// every matrix seen by the preprocessing and search stages has at least one
/// row and one column.
///
/// # Examples
/// ```
/// use nngraph_core::FeatureMatrix;
///
/// let features = FeatureMatrix::try_from_rows(vec![vec![0.0, 1.0], vec![2.0, 3.0]])
///     .expect("rows are consistent");
/// assert_eq!(features.len(), 2);
/// assert_eq!(features.dimension(), 2);
/// assert_eq!(features.row(1), &[2.0, 3.0]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureMatrix {
    rows: usize,
    dimension: usize,
    values: Vec<f64>,
}

impl FeatureMatrix {
    /// Builds a matrix from a contiguous row-major buffer.
    ///
    /// # Errors
    /// Returns [`NnGraphError::ZeroDimension`] when `dimension` is zero,
    /// [`NnGraphError::EmptyFeatures`] when the buffer is empty,
    /// [`NnGraphError::RaggedRows`] when the buffer length is not a multiple of
    /// `dimension`, and [`NnGraphError::NonFiniteFeature`] for NaN or infinite
    /// values.
    pub fn try_from_row_major(dimension: usize, values: Vec<f64>) -> Result<Self> {
        if dimension == 0 {
            return Err(NnGraphError::ZeroDimension);
        }
        if values.is_empty() {
            return Err(NnGraphError::EmptyFeatures);
        }
        let remainder = values.len() % dimension;
        if remainder != 0 {
            return Err(NnGraphError::RaggedRows {
                row: values.len() / dimension,
                expected: dimension,
                actual: remainder,
            });
        }
        if let Some(position) = values.iter().position(|value| !value.is_finite()) {
            return Err(NnGraphError::NonFiniteFeature {
                row: position / dimension,
                column: position % dimension,
                value: values[position],
            });
        }
        Ok(Self {
            rows: values.len() / dimension,
            dimension,
            values,
        })
    }

    /// Builds a matrix from one vector per row.
    ///
    /// # Errors
    /// Returns [`NnGraphError::EmptyFeatures`] for an empty input,
    /// [`NnGraphError::ZeroDimension`] when the first row is empty,
    /// [`NnGraphError::RaggedRows`] when a row length differs from the first,
    /// and [`NnGraphError::NonFiniteFeature`] for NaN or infinite values.
    pub fn try_from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Err(NnGraphError::EmptyFeatures);
        };
        let dimension = first.len();
        if dimension == 0 {
            return Err(NnGraphError::ZeroDimension);
        }
        let mut values = Vec::with_capacity(rows.len() * dimension);
        for (row, data) in rows.into_iter().enumerate() {
            if data.len() != dimension {
                return Err(NnGraphError::RaggedRows {
                    row,
                    expected: dimension,
                    actual: data.len(),
                });
            }
            values.extend(data);
        }
        Self::try_from_row_major(dimension, values)
    }

    pub(crate) fn from_validated(rows: usize, dimension: usize, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), rows * dimension);
        Self {
            rows,
            dimension,
            values,
        }
    }

    /// Returns the number of rows (graph vertices).
    #[must_use]
    #[rustfmt::skip]
    pub fn len(&self) -> usize { self.rows }

    /// Always `false`: matrices are validated to be non-empty.
    #[must_use]
    #[rustfmt::skip]
    pub fn is_empty(&self) -> bool { self.rows == 0 }

    /// Returns the number of columns per row.
    #[must_use]
    #[rustfmt::skip]
    pub fn dimension(&self) -> usize { self.dimension }

    /// Returns row `index`.
    ///
    /// # Panics
    /// Panics when `index >= self.len()`.
    #[must_use]
    pub fn row(&self, index: usize) -> &[f64] {
        let start = index * self.dimension;
        &self.values[start..start + self.dimension]
    }

    /// Iterates over the rows in order.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.values.chunks_exact(self.dimension)
    }

    /// Returns the underlying row-major buffer.
    #[must_use]
    #[rustfmt::skip]
    pub fn as_slice(&self) -> &[f64] { &self.values }

    /// Consumes the matrix and returns the row-major buffer.
    #[must_use]
    #[rustfmt::skip]
    pub fn into_vec(self) -> Vec<f64> { self.values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn rejects_empty_input() {
        assert_eq!(
            FeatureMatrix::try_from_rows(Vec::new()),
            Err(NnGraphError::EmptyFeatures)
        );
        assert_eq!(
            FeatureMatrix::try_from_row_major(2, Vec::new()),
            Err(NnGraphError::EmptyFeatures)
        );
    }

    #[rstest]
    fn rejects_zero_dimension() {
        assert_eq!(
            FeatureMatrix::try_from_rows(vec![Vec::new(), Vec::new()]),
            Err(NnGraphError::ZeroDimension)
        );
    }

    #[rstest]
    fn reports_ragged_row() {
        let err = FeatureMatrix::try_from_rows(vec![vec![0.0, 1.0], vec![2.0]])
            .expect_err("ragged rows must fail");
        assert_eq!(
            err,
            NnGraphError::RaggedRows {
                row: 1,
                expected: 2,
                actual: 1
            }
        );
    }

    #[rstest]
    fn reports_trailing_partial_row() {
        let err = FeatureMatrix::try_from_row_major(3, vec![0.0; 7])
            .expect_err("partial row must fail");
        assert!(matches!(err, NnGraphError::RaggedRows { row: 2, .. }));
    }

    #[rstest]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    #[case(f64::NEG_INFINITY)]
    fn reports_non_finite_position(#[case] bad: f64) {
        let err = FeatureMatrix::try_from_row_major(2, vec![0.0, 1.0, 2.0, bad])
            .expect_err("non-finite values must fail");
        assert!(matches!(
            err,
            NnGraphError::NonFiniteFeature {
                row: 1,
                column: 1,
                ..
            }
        ));
    }

    #[rstest]
    fn iterates_rows_in_order() {
        let matrix = FeatureMatrix::try_from_row_major(2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .expect("valid matrix");
        let rows: Vec<&[f64]> = matrix.rows().collect();
        assert_eq!(rows, vec![&[1.0, 2.0][..], &[3.0, 4.0][..], &[5.0, 6.0][..]]);
        assert!(!matrix.is_empty());
    }
}
