//! Distance metrics over dense feature rows.
//!
//! [`MetricKind`] names a metric the way callers spell it in configuration,
//! while [`Metric`] is the resolved form carrying the Minkowski order. All
//! backends evaluate distances through the kernels in this module so exact
//! strategies agree bit for bit.

use core::{fmt, str::FromStr};

use crate::error::{NnGraphError, Result};

/// Metric names recognised by the registry.
///
/// # Examples
/// ```
/// use nngraph_core::MetricKind;
///
/// let metric: MetricKind = "max_dist".parse().expect("known metric");
/// assert_eq!(metric, MetricKind::MaxDist);
/// assert_eq!(metric.to_string(), "max_dist");
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MetricKind {
    /// Straight-line (L2) distance.
    Euclidean,
    /// Sum of absolute differences (L1).
    Manhattan,
    /// Minkowski distance of a configurable order.
    Minkowski,
    /// Largest absolute difference (L∞).
    MaxDist,
}

impl MetricKind {
    /// Every metric known to the registry.
    pub const ALL: [Self; 4] = [
        Self::Euclidean,
        Self::Manhattan,
        Self::Minkowski,
        Self::MaxDist,
    ];

    /// Returns the configuration spelling of the metric.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Euclidean => "euclidean",
            Self::Manhattan => "manhattan",
            Self::Minkowski => "minkowski",
            Self::MaxDist => "max_dist",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = NnGraphError;

    fn from_str(raw: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|metric| metric.as_str() == raw)
            .ok_or_else(|| NnGraphError::UnknownMetric {
                name: raw.to_owned(),
            })
    }
}

/// A metric resolved with its parameters.
///
/// # Examples
/// ```
/// use nngraph_core::{Metric, MetricKind};
///
/// let metric = Metric::resolve(MetricKind::Minkowski, 3.0).expect("order is valid");
/// let d = metric.distance(&[0.0, 0.0], &[1.0, 1.0]);
/// assert!((d - 2.0_f64.powf(1.0 / 3.0)).abs() < 1e-12);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Metric {
    /// Straight-line (L2) distance.
    Euclidean,
    /// Sum of absolute differences (L1).
    Manhattan,
    /// Minkowski distance with the given order (`>= 1`).
    Minkowski {
        /// Exponent of the distance.
        order: f64,
    },
    /// Largest absolute difference (L∞).
    MaxDist,
}

impl Metric {
    /// Resolves a metric name and order into a [`Metric`].
    ///
    /// The order is ignored for every metric other than
    /// [`MetricKind::Minkowski`].
    ///
    /// # Errors
    /// Returns [`NnGraphError::InvalidOrder`] when the Minkowski order is not a
    /// finite number of at least one.
    pub fn resolve(kind: MetricKind, order: f64) -> Result<Self> {
        match kind {
            MetricKind::Euclidean => Ok(Self::Euclidean),
            MetricKind::Manhattan => Ok(Self::Manhattan),
            MetricKind::MaxDist => Ok(Self::MaxDist),
            MetricKind::Minkowski => {
                if order.is_finite() && order >= 1.0 {
                    Ok(Self::Minkowski { order })
                } else {
                    Err(NnGraphError::InvalidOrder { order })
                }
            }
        }
    }

    /// Returns the name of the metric.
    #[must_use]
    pub const fn kind(self) -> MetricKind {
        match self {
            Self::Euclidean => MetricKind::Euclidean,
            Self::Manhattan => MetricKind::Manhattan,
            Self::Minkowski { .. } => MetricKind::Minkowski,
            Self::MaxDist => MetricKind::MaxDist,
        }
    }

    /// Returns the Minkowski exponent equivalent to this metric, with
    /// [`f64::INFINITY`] standing for [`Metric::MaxDist`].
    #[must_use]
    pub const fn exponent(self) -> f64 {
        match self {
            Self::Euclidean => 2.0,
            Self::Manhattan => 1.0,
            Self::Minkowski { order } => order,
            Self::MaxDist => f64::INFINITY,
        }
    }

    /// Computes the distance between two rows of equal length.
    #[must_use]
    pub fn distance(self, left: &[f64], right: &[f64]) -> f64 {
        minkowski_distance(left, right, self.exponent())
    }
}

/// Minkowski distance of order `p`, dispatching to the dedicated kernels for
/// `p = 1`, `p = 2` and `p = ∞` so every caller computes identical values.
pub(crate) fn minkowski_distance(left: &[f64], right: &[f64], p: f64) -> f64 {
    if p == 1.0 {
        manhattan(left, right)
    } else if p == 2.0 {
        euclidean(left, right)
    } else if p.is_infinite() {
        chebyshev(left, right)
    } else {
        minkowski_power(left, right, p).powf(p.recip())
    }
}

pub(crate) fn squared_euclidean(left: &[f64], right: &[f64]) -> f64 {
    left.iter()
        .zip(right)
        .map(|(l, r)| {
            let diff = l - r;
            diff * diff
        })
        .sum()
}

pub(crate) fn euclidean(left: &[f64], right: &[f64]) -> f64 {
    squared_euclidean(left, right).sqrt()
}

pub(crate) fn manhattan(left: &[f64], right: &[f64]) -> f64 {
    left.iter().zip(right).map(|(l, r)| (l - r).abs()).sum()
}

pub(crate) fn chebyshev(left: &[f64], right: &[f64]) -> f64 {
    left.iter()
        .zip(right)
        .map(|(l, r)| (l - r).abs())
        .fold(0.0, f64::max)
}

/// Sum of `|l - r|^p` without the final root.
pub(crate) fn minkowski_power(left: &[f64], right: &[f64], p: f64) -> f64 {
    left.iter().zip(right).map(|(l, r)| (l - r).abs().powf(p)).sum()
}
