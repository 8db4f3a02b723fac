//! Tuning parameters for the approximate backends.
//!
//! The parameter types are always compiled so a builder can carry them even
//! when the backend they tune is absent from the build.

use crate::{
    error::{NnGraphError, Result},
    registry::BackendKind,
};

const DEFAULT_SEED: u64 = 0x5EED_CAFE;

/// Parameters of the randomised k-d forest used by the approximate-index
/// backend.
///
/// # Examples
/// ```
/// use nngraph_core::ForestParams;
///
/// let params = ForestParams::new(8, 128).expect("parameters must be valid");
/// assert_eq!(params.trees(), 8);
/// assert_eq!(params.checks(), 128);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ForestParams {
    trees: usize,
    checks: usize,
    seed: u64,
}

impl ForestParams {
    /// Creates a forest configuration.
    ///
    /// # Errors
    /// Returns [`NnGraphError::InvalidBackendParameter`] when `trees` or
    /// `checks` is zero.
    pub fn new(trees: usize, checks: usize) -> Result<Self> {
        if trees == 0 {
            return Err(invalid(
                BackendKind::ApproximateIndex,
                "trees must be greater than zero".into(),
            ));
        }
        if checks == 0 {
            return Err(invalid(
                BackendKind::ApproximateIndex,
                "checks must be greater than zero".into(),
            ));
        }
        Ok(Self {
            trees,
            checks,
            seed: DEFAULT_SEED,
        })
    }

    /// Seeds the split-dimension sampling to make the forest reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of randomised trees in the forest.
    #[must_use]
    pub fn trees(&self) -> usize {
        self.trees
    }

    /// Points examined per query before the search may stop.
    #[must_use]
    pub fn checks(&self) -> usize {
        self.checks
    }

    /// Seed for the split-dimension sampling.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            trees: 4,
            checks: 32,
            seed: DEFAULT_SEED,
        }
    }
}

/// Parameters of the hierarchical navigable small-world graph used by the
/// approximate-graph backend.
///
/// # Examples
/// ```
/// use nngraph_core::GraphIndexParams;
///
/// let params = GraphIndexParams::new(8, 32, 48).expect("parameters must be valid");
/// assert_eq!(params.max_connections(), 8);
/// assert!(GraphIndexParams::new(16, 8, 64).is_err());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct GraphIndexParams {
    max_connections: usize,
    ef_construction: usize,
    ef_search: usize,
    level_multiplier: f64,
    max_level: usize,
    seed: u64,
}

impl GraphIndexParams {
    /// Creates a graph index configuration.
    ///
    /// # Errors
    /// Returns [`NnGraphError::InvalidBackendParameter`] when
    /// `max_connections` or `ef_search` is zero, or when `ef_construction` is
    /// smaller than `max_connections`.
    pub fn new(max_connections: usize, ef_construction: usize, ef_search: usize) -> Result<Self> {
        if max_connections == 0 {
            return Err(invalid(
                BackendKind::ApproximateGraph,
                "max_connections must be greater than zero".into(),
            ));
        }
        if ef_construction < max_connections {
            return Err(invalid(
                BackendKind::ApproximateGraph,
                format!(
                    "ef_construction ({ef_construction}) must be >= max_connections ({max_connections})"
                ),
            ));
        }
        if ef_search == 0 {
            return Err(invalid(
                BackendKind::ApproximateGraph,
                "ef_search must be greater than zero".into(),
            ));
        }
        Ok(Self {
            max_connections,
            ef_construction,
            ef_search,
            level_multiplier: level_multiplier_for(max_connections),
            max_level: 12,
            seed: DEFAULT_SEED,
        })
    }

    /// Seeds level sampling to make insertion deterministic.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Caps the highest layer a vertex can be assigned to.
    #[must_use]
    pub fn with_max_level(mut self, max_level: usize) -> Self {
        self.max_level = max_level;
        self
    }

    /// Returns the neighbour fan-out enforced on upper layers.
    #[must_use]
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Returns the candidate breadth used while inserting.
    #[must_use]
    pub fn ef_construction(&self) -> usize {
        self.ef_construction
    }

    /// Returns the candidate breadth used while querying.
    #[must_use]
    pub fn ef_search(&self) -> usize {
        self.ef_search
    }

    /// Returns the level sampling seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub(crate) fn max_level(&self) -> usize {
        self.max_level
    }

    /// Returns `true` when a uniform `draw` should stop level promotion.
    pub(crate) fn should_stop(&self, draw: f64) -> bool {
        let clamped = draw.clamp(1.0e-12, 1.0 - f64::EPSILON);
        (-clamped.ln()) * self.level_multiplier < 1.0
    }
}

impl Default for GraphIndexParams {
    fn default() -> Self {
        Self {
            max_connections: 16,
            ef_construction: 64,
            ef_search: 64,
            level_multiplier: level_multiplier_for(16),
            max_level: 12,
            seed: DEFAULT_SEED,
        }
    }
}

/// Tuning for every backend, handed to [`BackendKind::instantiate`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BackendParams {
    /// Approximate-index tuning.
    pub forest: ForestParams,
    /// Approximate-graph tuning.
    pub graph_index: GraphIndexParams,
}

/// `1 / ln(M)`, so a vertex is promoted one layer with probability `1 / M`.
/// A fan-out of one is treated as two to keep the multiplier finite.
fn level_multiplier_for(max_connections: usize) -> f64 {
    (max_connections.max(2) as f64).ln().recip()
}

fn invalid(backend: BackendKind, reason: String) -> NnGraphError {
    NnGraphError::InvalidBackendParameter { backend, reason }
}
