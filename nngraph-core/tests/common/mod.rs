//! Shared fixtures and strategies for the integration tests.

use nngraph_core::FeatureMatrix;
use proptest::prelude::*;
use test_strategy::Arbitrary;

/// Builds a matrix from literal rows.
#[must_use]
pub fn matrix(rows: Vec<Vec<f64>>) -> FeatureMatrix {
    FeatureMatrix::try_from_rows(rows).expect("fixture rows must be valid")
}

/// Corners of the unit square in the order (0,0), (0,1), (1,0), (1,1).
#[must_use]
pub fn unit_square() -> FeatureMatrix {
    matrix(vec![
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![1.0, 0.0],
        vec![1.0, 1.0],
    ])
}

/// Shape of a generated dataset.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Arbitrary)]
pub enum Layout {
    /// Points drawn uniformly from a box.
    #[weight(3)]
    Uniform,
    /// Points snapped to a coarse integer grid, producing many distance ties.
    #[weight(2)]
    Lattice,
    /// Uniform points where every other row repeats its predecessor.
    #[weight(1)]
    Duplicates,
}

/// Generates a dataset with `rows` in `min_rows..=max_rows` and dimension in
/// `1..=4`.
pub fn dataset(min_rows: usize, max_rows: usize) -> impl Strategy<Value = FeatureMatrix> {
    (any::<Layout>(), min_rows..=max_rows, 1_usize..=4).prop_flat_map(|(layout, rows, dim)| {
        prop::collection::vec(prop::collection::vec(-10.0_f64..10.0, dim), rows).prop_map(
            move |mut data| {
                match layout {
                    Layout::Uniform => {}
                    Layout::Lattice => data
                        .iter_mut()
                        .flatten()
                        .for_each(|value| *value = value.round()),
                    Layout::Duplicates => {
                        for index in (1..data.len()).step_by(2) {
                            data[index] = data[index - 1].clone();
                        }
                    }
                }
                matrix(data)
            },
        )
    })
}
