//! Seeded synthetic feature matrices.

use std::f64::consts::PI;

use nngraph_core::{FeatureMatrix, NnGraphError};
use rand::{Rng, SeedableRng, rngs::SmallRng};

/// Errors raised by the synthetic generators.
#[derive(Debug, thiserror::Error)]
pub enum SyntheticError {
    /// The requested point count was zero.
    #[error("point count must be greater than zero")]
    ZeroPoints,
    /// The requested dimension count was zero.
    #[error("dimension count must be greater than zero")]
    ZeroDimensions,
    /// The requested cluster count was zero.
    #[error("cluster count must be greater than zero")]
    ZeroClusters,
    /// A floating-point parameter was not finite and positive.
    #[error("parameter `{parameter}` must be finite and greater than zero")]
    InvalidFloatParameter {
        /// Name of the offending parameter.
        parameter: &'static str,
    },
    /// The generated values did not form a valid matrix.
    #[error(transparent)]
    Features(#[from] NnGraphError),
}

/// Uniform random vectors in `[-1, 1)^d`.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    /// Number of points to generate.
    pub point_count: usize,
    /// Dimensionality of each vector.
    pub dimensions: usize,
    /// RNG seed for reproducibility.
    pub seed: u64,
}

/// Isotropic Gaussian clusters with centroids spread on a circle.
#[derive(Clone, Debug)]
pub struct GaussianBlobConfig {
    /// Number of points to generate.
    pub point_count: usize,
    /// Dimensionality of each vector.
    pub dimensions: usize,
    /// Number of clusters.
    pub cluster_count: usize,
    /// Radius of the circle the centroids sit on.
    pub separation: f64,
    /// Standard deviation around each centroid.
    pub spread: f64,
    /// RNG seed for reproducibility.
    pub seed: u64,
}

fn validate_shape(point_count: usize, dimensions: usize) -> Result<(), SyntheticError> {
    if point_count == 0 {
        return Err(SyntheticError::ZeroPoints);
    }
    if dimensions == 0 {
        return Err(SyntheticError::ZeroDimensions);
    }
    Ok(())
}

fn validate_positive(value: f64, parameter: &'static str) -> Result<(), SyntheticError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SyntheticError::InvalidFloatParameter { parameter })
    }
}

/// Generates uniform random vectors.
///
/// # Errors
/// Returns [`SyntheticError`] when the point or dimension count is zero.
pub fn uniform(config: &SyntheticConfig) -> Result<FeatureMatrix, SyntheticError> {
    validate_shape(config.point_count, config.dimensions)?;
    let mut rng = SmallRng::seed_from_u64(config.seed);
    let values = (0..config.point_count * config.dimensions)
        .map(|_| rng.gen_range(-1.0..1.0))
        .collect();
    Ok(FeatureMatrix::try_from_row_major(config.dimensions, values)?)
}

/// Generates Gaussian blobs; point `i` belongs to cluster `i % cluster_count`.
///
/// # Errors
/// Returns [`SyntheticError`] for zero counts or a non-positive separation
/// or spread.
pub fn gaussian_blobs(config: &GaussianBlobConfig) -> Result<FeatureMatrix, SyntheticError> {
    validate_shape(config.point_count, config.dimensions)?;
    if config.cluster_count == 0 {
        return Err(SyntheticError::ZeroClusters);
    }
    validate_positive(config.separation, "separation")?;
    validate_positive(config.spread, "spread")?;

    let mut rng = SmallRng::seed_from_u64(config.seed);
    let centroids: Vec<Vec<f64>> = (0..config.cluster_count)
        .map(|cluster| {
            let angle = 2.0 * PI * cluster as f64 / config.cluster_count as f64;
            let mut centroid = vec![0.0; config.dimensions];
            if let Some(value) = centroid.get_mut(0) {
                *value = config.separation * angle.cos();
            }
            if let Some(value) = centroid.get_mut(1) {
                *value = config.separation * angle.sin();
            }
            centroid
        })
        .collect();

    let mut values = Vec::with_capacity(config.point_count * config.dimensions);
    for point in 0..config.point_count {
        let centroid = &centroids[point % config.cluster_count];
        for &centre in centroid {
            values.push(centre + config.spread * standard_normal(&mut rng));
        }
    }
    Ok(FeatureMatrix::try_from_row_major(config.dimensions, values)?)
}

// Box-Muller; `u1` is kept away from zero so the logarithm stays finite.
fn standard_normal(rng: &mut SmallRng) -> f64 {
    let u1 = rng.gen_range(f64::EPSILON..1.0);
    let u2 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn blobs(seed: u64) -> FeatureMatrix {
        gaussian_blobs(&GaussianBlobConfig {
            point_count: 60,
            dimensions: 3,
            cluster_count: 3,
            separation: 10.0,
            spread: 0.1,
            seed,
        })
        .expect("valid config")
    }

    #[rstest]
    fn uniform_respects_shape_and_range() {
        let features = uniform(&SyntheticConfig {
            point_count: 50,
            dimensions: 4,
            seed: 7,
        })
        .expect("valid config");
        assert_eq!(features.len(), 50);
        assert_eq!(features.dimension(), 4);
        assert!(features.as_slice().iter().all(|v| (-1.0..1.0).contains(v)));
    }

    #[rstest]
    fn generators_are_deterministic_per_seed() {
        assert_eq!(blobs(3), blobs(3));
        assert_ne!(blobs(3), blobs(4));
    }

    #[rstest]
    fn blob_points_stay_near_their_centroid() {
        let features = blobs(11);
        let first = features.row(0);
        assert!((first[0] - 10.0).abs() < 1.0);
        assert!(first[1].abs() < 1.0);
    }

    #[rstest]
    #[case::points(0, 2, SyntheticError::ZeroPoints)]
    #[case::dimensions(5, 0, SyntheticError::ZeroDimensions)]
    fn empty_shapes_are_rejected(
        #[case] point_count: usize,
        #[case] dimensions: usize,
        #[case] expected: SyntheticError,
    ) {
        let err = uniform(&SyntheticConfig {
            point_count,
            dimensions,
            seed: 0,
        })
        .expect_err("shape is empty");
        assert_eq!(err.to_string(), expected.to_string());
    }

    #[rstest]
    fn non_positive_spread_is_rejected() {
        let err = gaussian_blobs(&GaussianBlobConfig {
            point_count: 10,
            dimensions: 2,
            cluster_count: 2,
            separation: 1.0,
            spread: 0.0,
            seed: 0,
        })
        .expect_err("spread must be positive");
        assert!(matches!(
            err,
            SyntheticError::InvalidFloatParameter {
                parameter: "spread"
            }
        ));
    }
}
