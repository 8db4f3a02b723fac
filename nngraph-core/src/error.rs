//! Error types for the nngraph core library.
//!
//! Every failure aborts graph construction. Variants carry a stable
//! machine-readable code and belong to one of three categories so callers can
//! tell configuration mistakes from backend availability problems.

use std::fmt;

use thiserror::Error;

use crate::{metric::MetricKind, registry::BackendKind, search::NeighbourKind};

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// Broad classification of [`NnGraphError`] variants.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorCategory {
    /// Malformed or out-of-range parameters.
    InvalidConfiguration,
    /// Valid parameters the selected backend cannot service.
    UnsupportedCombination,
    /// The selected backend could not be initialised.
    BackendUnavailable,
}

/// Error type produced when configuring or constructing a nearest-neighbour
/// graph.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum NnGraphError {
    /// A metric name did not match any known metric.
    #[error("unknown metric `{name}`")]
    UnknownMetric {
        /// Name supplied by the caller.
        name: String,
    },
    /// A neighbourhood kind name did not match `knn` or `radius`.
    #[error("unknown neighbourhood kind `{name}`")]
    UnknownKind {
        /// Name supplied by the caller.
        name: String,
    },
    /// A backend name did not match any known backend.
    #[error("unknown backend `{name}`")]
    UnknownBackend {
        /// Name supplied by the caller.
        name: String,
    },
    /// A k-nearest-neighbour graph needs at least one neighbour per vertex.
    #[error("the number of neighbours must be at least 1 (got k=0)")]
    ZeroNeighbours,
    /// There are not enough other vertices to satisfy `k`.
    #[error("the number of neighbours (k={k}) must be smaller than the number of vertices ({vertices})")]
    TooManyNeighbours {
        /// Requested neighbour count.
        k: usize,
        /// Number of vertices in the feature matrix.
        vertices: usize,
    },
    /// The neighbourhood radius must be finite and strictly positive.
    #[error("radius must be finite and greater than zero (got {radius})")]
    InvalidRadius {
        /// Radius supplied by the caller.
        radius: f64,
    },
    /// The Minkowski order must be finite and at least one.
    #[error("minkowski order must be finite and at least 1 (got {order})")]
    InvalidOrder {
        /// Order supplied by the caller.
        order: f64,
    },
    /// An explicit kernel width must be finite and strictly positive.
    #[error("kernel width must be finite and greater than zero (got {width})")]
    InvalidKernelWidth {
        /// Width supplied by the caller.
        width: f64,
    },
    /// Every neighbour distance was zero, so no bandwidth can be estimated.
    #[error("kernel width estimate is zero because every neighbour distance is zero; supply an explicit kernel width")]
    DegenerateKernelWidth,
    /// No vertex had a neighbour other than itself.
    #[error("kernel width cannot be estimated because no vertex has a neighbour; supply an explicit kernel width")]
    KernelWidthUnavailable,
    /// The feature matrix contained no rows.
    #[error("feature matrix contains no rows")]
    EmptyFeatures,
    /// Feature rows must have at least one column.
    #[error("feature rows must have positive dimension")]
    ZeroDimension,
    /// A row's length differed from the first row's.
    #[error("row {row} has length {actual} but expected {expected}")]
    RaggedRows {
        /// Offending row.
        row: usize,
        /// Dimension established by the first row.
        expected: usize,
        /// Length of the offending row.
        actual: usize,
    },
    /// A feature value was NaN or infinite.
    #[error("row {row} contains a non-finite value at column {column}: {value}")]
    NonFiniteFeature {
        /// Offending row.
        row: usize,
        /// Offending column.
        column: usize,
        /// The non-finite value.
        value: f64,
    },
    /// Centring or rescaling pushed a finite feature out of the `f64` range.
    #[error("preprocessing overflowed at row {row}, column {column}; disable centring or rescale the input")]
    PreprocessingOverflow {
        /// Offending row.
        row: usize,
        /// Offending column.
        column: usize,
    },
    /// A backend tuning parameter was out of range.
    #[error("invalid {backend} parameter: {reason}")]
    InvalidBackendParameter {
        /// Backend the parameter belongs to.
        backend: BackendKind,
        /// Human-readable explanation.
        reason: String,
    },
    /// The backend does not implement the requested neighbourhood kind.
    #[error("{backend} does not support kind \"{kind}\"")]
    KindNotSupported {
        /// Selected backend.
        backend: BackendKind,
        /// Requested neighbourhood kind.
        kind: NeighbourKind,
    },
    /// The backend cannot evaluate the requested metric.
    #[error("{backend} does not support the {metric} metric")]
    MetricNotSupported {
        /// Selected backend.
        backend: BackendKind,
        /// Requested metric.
        metric: MetricKind,
    },
    /// The backend is absent from this build or failed to initialise.
    #[error("backend {backend} is unavailable: {reason}; choose another backend")]
    BackendUnavailable {
        /// Backend that could not be used.
        backend: BackendKind,
        /// Why the backend could not be used.
        reason: String,
    },
}

define_error_codes! {
    /// Stable codes describing [`NnGraphError`] variants.
    enum NnGraphErrorCode for NnGraphError {
        /// A metric name did not match any known metric.
        UnknownMetric => UnknownMetric { .. } => "NNGRAPH_UNKNOWN_METRIC",
        /// A neighbourhood kind name was not recognised.
        UnknownKind => UnknownKind { .. } => "NNGRAPH_UNKNOWN_KIND",
        /// A backend name was not recognised.
        UnknownBackend => UnknownBackend { .. } => "NNGRAPH_UNKNOWN_BACKEND",
        /// `k` was zero.
        ZeroNeighbours => ZeroNeighbours => "NNGRAPH_ZERO_NEIGHBOURS",
        /// `k` was not smaller than the vertex count.
        TooManyNeighbours => TooManyNeighbours { .. } => "NNGRAPH_TOO_MANY_NEIGHBOURS",
        /// The radius was not a positive finite number.
        InvalidRadius => InvalidRadius { .. } => "NNGRAPH_INVALID_RADIUS",
        /// The Minkowski order was out of range.
        InvalidOrder => InvalidOrder { .. } => "NNGRAPH_INVALID_ORDER",
        /// The explicit kernel width was out of range.
        InvalidKernelWidth => InvalidKernelWidth { .. } => "NNGRAPH_INVALID_KERNEL_WIDTH",
        /// The estimated kernel width was zero.
        DegenerateKernelWidth => DegenerateKernelWidth => "NNGRAPH_DEGENERATE_KERNEL_WIDTH",
        /// No neighbours were available to estimate a kernel width.
        KernelWidthUnavailable => KernelWidthUnavailable => "NNGRAPH_KERNEL_WIDTH_UNAVAILABLE",
        /// The feature matrix was empty.
        EmptyFeatures => EmptyFeatures => "NNGRAPH_EMPTY_FEATURES",
        /// Feature rows had zero dimension.
        ZeroDimension => ZeroDimension => "NNGRAPH_ZERO_DIMENSION",
        /// Feature rows had differing lengths.
        RaggedRows => RaggedRows { .. } => "NNGRAPH_RAGGED_ROWS",
        /// A feature value was not finite.
        NonFiniteFeature => NonFiniteFeature { .. } => "NNGRAPH_NON_FINITE_FEATURE",
        /// Preprocessing produced a non-finite value.
        PreprocessingOverflow => PreprocessingOverflow { .. } => "NNGRAPH_PREPROCESSING_OVERFLOW",
        /// A backend tuning parameter was invalid.
        InvalidBackendParameter => InvalidBackendParameter { .. } => "NNGRAPH_INVALID_BACKEND_PARAMETER",
        /// The backend does not implement the neighbourhood kind.
        KindNotSupported => KindNotSupported { .. } => "NNGRAPH_KIND_NOT_SUPPORTED",
        /// The backend does not support the metric.
        MetricNotSupported => MetricNotSupported { .. } => "NNGRAPH_METRIC_NOT_SUPPORTED",
        /// The backend is unavailable.
        BackendUnavailable => BackendUnavailable { .. } => "NNGRAPH_BACKEND_UNAVAILABLE",
    }
}

impl NnGraphError {
    /// Returns the broad category this error belongs to.
    ///
    /// # Examples
    /// ```
    /// use nngraph_core::{ErrorCategory, NnGraphError};
    ///
    /// let err = NnGraphError::TooManyNeighbours { k: 4, vertices: 4 };
    /// assert_eq!(err.category(), ErrorCategory::InvalidConfiguration);
    /// ```
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::KindNotSupported { .. } | Self::MetricNotSupported { .. } => {
                ErrorCategory::UnsupportedCombination
            }
            Self::BackendUnavailable { .. } => ErrorCategory::BackendUnavailable,
            _ => ErrorCategory::InvalidConfiguration,
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, NnGraphError>;
