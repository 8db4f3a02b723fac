//! Feature centring and rescaling applied before neighbour search.
//!
//! Rescaling maps every point cloud onto a bounding ball whose radius grows
//! with `N^(1/min(d, 3)) / 10`, which keeps automatically estimated kernel
//! widths comparable across datasets of different scale and dimension.

use crate::{
    error::{NnGraphError, Result},
    features::FeatureMatrix,
};

/// Toggles for the preprocessing stages, applied centre-then-rescale.
///
/// # Examples
/// ```
/// use nngraph_core::{FeatureMatrix, Preprocessing};
///
/// let raw = FeatureMatrix::try_from_rows(vec![vec![1.0], vec![3.0]]).expect("valid");
/// let centred = Preprocessing::new(true, false).apply(&raw).expect("values stay finite");
/// assert_eq!(centred.as_slice(), &[-1.0, 1.0]);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Preprocessing {
    center: bool,
    rescale: bool,
}

impl Default for Preprocessing {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl Preprocessing {
    /// Creates a preprocessing configuration.
    #[must_use]
    pub const fn new(center: bool, rescale: bool) -> Self {
        Self { center, rescale }
    }

    /// Returns whether mean-centring is enabled.
    #[must_use]
    pub const fn centers(self) -> bool {
        self.center
    }

    /// Returns whether bounding-ball rescaling is enabled.
    #[must_use]
    pub const fn rescales(self) -> bool {
        self.rescale
    }

    /// Applies the enabled stages, returning a new matrix.
    ///
    /// # Errors
    /// Returns [`NnGraphError::PreprocessingOverflow`] when centring pushes a
    /// value past the `f64` range, which only happens for inputs spanning
    /// more than `f64::MAX`.
    pub fn apply(self, features: &FeatureMatrix) -> Result<FeatureMatrix> {
        let processed = match (self.center, self.rescale) {
            (true, true) => rescale(&center(features)),
            (true, false) => center(features),
            (false, true) => rescale(features),
            (false, false) => return Ok(features.clone()),
        };
        ensure_finite(&processed)?;
        Ok(processed)
    }
}

fn ensure_finite(features: &FeatureMatrix) -> Result<()> {
    let dimension = features.dimension();
    match features.as_slice().iter().position(|value| !value.is_finite()) {
        Some(position) => Err(NnGraphError::PreprocessingOverflow {
            row: position / dimension,
            column: position % dimension,
        }),
        None => Ok(()),
    }
}

/// Subtracts the per-dimension mean from every row.
///
/// # Examples
/// ```
/// use nngraph_core::{FeatureMatrix, center};
///
/// let raw = FeatureMatrix::try_from_rows(vec![vec![0.0, 10.0], vec![2.0, 20.0]])
///     .expect("valid");
/// let centred = center(&raw);
/// assert_eq!(centred.as_slice(), &[-1.0, -5.0, 1.0, 5.0]);
/// ```
#[must_use]
pub fn center(features: &FeatureMatrix) -> FeatureMatrix {
    let means = column_means(features);
    let values = features
        .rows()
        .flat_map(|row| row.iter().zip(&means).map(|(value, mean)| value - mean))
        .collect();
    FeatureMatrix::from_validated(features.len(), features.dimension(), values)
}

/// Scales every row so the point cloud fits the reference bounding ball.
///
/// The scale factor is `N^(1/min(d, 3)) / 10` divided by half the Euclidean
/// norm of the per-dimension range. A cloud with zero extent (all points
/// identical) cannot be scaled and is returned unchanged.
///
/// # Examples
/// ```
/// use nngraph_core::{FeatureMatrix, rescale};
///
/// // Four points spanning [0, 2] on one axis: radius 1, scale 4^(1/1)/10.
/// let raw = FeatureMatrix::try_from_rows(vec![vec![0.0], vec![1.0], vec![1.5], vec![2.0]])
///     .expect("valid");
/// let scaled = rescale(&raw);
/// assert!((scaled.row(3)[0] - 0.8).abs() < 1e-12);
/// ```
#[must_use]
pub fn rescale(features: &FeatureMatrix) -> FeatureMatrix {
    let bounding_radius = half_range_norm(features);
    if bounding_radius == 0.0 {
        return features.clone();
    }
    let effective_dimension = features.dimension().min(3) as f64;
    let scale = (features.len() as f64).powf(effective_dimension.recip()) / 10.0;
    let values = features
        .as_slice()
        .iter()
        .map(|value| value / bounding_radius * scale)
        .collect();
    FeatureMatrix::from_validated(features.len(), features.dimension(), values)
}

fn column_means(features: &FeatureMatrix) -> Vec<f64> {
    // Running mean; summing a column first overflows near `f64::MAX`.
    let mut means = vec![0.0_f64; features.dimension()];
    for (seen, row) in features.rows().enumerate() {
        let count = (seen + 1) as f64;
        for (mean, value) in means.iter_mut().zip(row) {
            *mean += value / count - *mean / count;
        }
    }
    means
}

/// Euclidean norm of half the per-dimension `max - min` span.
fn half_range_norm(features: &FeatureMatrix) -> f64 {
    let mut minima = features.row(0).to_vec();
    let mut maxima = minima.clone();
    for row in features.rows().skip(1) {
        for ((low, high), value) in minima.iter_mut().zip(maxima.iter_mut()).zip(row) {
            *low = low.min(*value);
            *high = high.max(*value);
        }
    }
    minima
        .iter()
        .zip(&maxima)
        .map(|(low, high)| 0.5 * high - 0.5 * low)
        .fold(0.0, f64::hypot)
}
