//! Gaussian affinity assembly.
//!
//! Converts per-vertex neighbour lists into a sparse symmetric weight matrix.
//! Each directed edge `(i, j, d)` becomes `exp(-d² / w)`; the matrix is then
//! symmetrised by averaging the two directions, counting a missing direction
//! as zero.

use sprs::{CsMat, TriMat};
use tracing::{debug, instrument};

use crate::{
    error::{NnGraphError, Result},
    search::{NeighbourKind, Neighbourhood},
};

/// Estimates the Gaussian kernel width from neighbour distances.
///
/// For k-NN lists this is the mean of every non-self distance. For radius
/// lists it is the mean of the per-vertex means, so densely connected
/// vertices do not dominate; vertices without neighbours are skipped.
///
/// # Errors
/// Returns [`NnGraphError::KernelWidthUnavailable`] when no vertex has a
/// neighbour other than itself and [`NnGraphError::DegenerateKernelWidth`]
/// when the estimate is zero.
///
/// # Examples
/// ```
/// use nngraph_core::{Neighbour, NeighbourKind, Neighbourhood, SearchKind, estimate_kernel_width};
///
/// let kind = SearchKind::radius(5.0).expect("radius is valid");
/// let hoods = vec![
///     Neighbourhood::from_candidates(0, vec![Neighbour { id: 1, distance: 1.0 }], kind),
///     Neighbourhood::from_candidates(
///         1,
///         vec![Neighbour { id: 0, distance: 1.0 }, Neighbour { id: 2, distance: 3.0 }],
///         kind,
///     ),
///     Neighbourhood::from_candidates(2, vec![Neighbour { id: 1, distance: 3.0 }], kind),
/// ];
/// // Per-vertex means are 1, 2 and 3.
/// let width = estimate_kernel_width(&hoods, NeighbourKind::Radius).expect("estimable");
/// assert!((width - 2.0).abs() < 1e-12);
/// ```
pub fn estimate_kernel_width(neighbourhoods: &[Neighbourhood], kind: NeighbourKind) -> Result<f64> {
    let estimate = match kind {
        NeighbourKind::Knn => {
            let (sum, count) = neighbourhoods
                .iter()
                .flat_map(Neighbourhood::others)
                .fold((0.0_f64, 0_usize), |(sum, count), n| (sum + n.distance, count + 1));
            (count > 0).then(|| sum / count as f64)
        }
        NeighbourKind::Radius => {
            let (sum, count) = neighbourhoods
                .iter()
                .filter(|hood| !hood.others().is_empty())
                .map(|hood| {
                    let others = hood.others();
                    others.iter().map(|n| n.distance).sum::<f64>() / others.len() as f64
                })
                .fold((0.0_f64, 0_usize), |(sum, count), mean| (sum + mean, count + 1));
            (count > 0).then(|| sum / count as f64)
        }
    };
    match estimate {
        None => Err(NnGraphError::KernelWidthUnavailable),
        Some(width) if width > 0.0 => Ok(width),
        Some(_) => Err(NnGraphError::DegenerateKernelWidth),
    }
}

/// Gaussian weight of an edge, clamped away from zero so the edge survives
/// underflow.
#[must_use]
pub fn gaussian_weight(distance: f64, kernel_width: f64) -> f64 {
    (-(distance * distance) / kernel_width)
        .exp()
        .max(f64::MIN_POSITIVE)
}

/// Builds the symmetric affinity matrix, estimating the kernel width when
/// `kernel_width` is `None`.
///
/// Returns the CSR matrix together with the kernel width that was used. The
/// matrix has an empty diagonal, equals its transpose exactly and holds
/// weights in `(0, 1]`.
///
/// # Errors
/// Returns [`NnGraphError::InvalidKernelWidth`] for an explicit width that is
/// not finite and positive, and the errors of [`estimate_kernel_width`]
/// otherwise.
#[instrument(
    name = "core.assemble",
    err,
    skip(neighbourhoods),
    fields(vertices = neighbourhoods.len()),
)]
pub fn assemble(
    neighbourhoods: &[Neighbourhood],
    kind: NeighbourKind,
    kernel_width: Option<f64>,
) -> Result<(CsMat<f64>, f64)> {
    let width = match kernel_width {
        Some(width) if width.is_finite() && width > 0.0 => width,
        Some(width) => return Err(NnGraphError::InvalidKernelWidth { width }),
        None => {
            let width = estimate_kernel_width(neighbourhoods, kind)?;
            debug!(kernel_width = width, "estimated kernel width");
            width
        }
    };
    let n = neighbourhoods.len();
    let mut directed = TriMat::new((n, n));
    for hood in neighbourhoods {
        let i = hood.vertex();
        for neighbour in hood.others() {
            if neighbour.id != i {
                directed.add_triplet(i, neighbour.id, gaussian_weight(neighbour.distance, width));
            }
        }
    }
    let directed: CsMat<f64> = directed.to_csr();
    let affinity = symmetrise(&directed);
    debug!(stored = affinity.nnz(), "affinity matrix assembled");
    Ok((affinity, width))
}

/// Averages a square matrix with its transpose.
///
/// Each stored entry contributes `(a_ij + a_ji) / 2` to `(i, j)`; when the
/// reverse entry is absent the same value is mirrored onto `(j, i)`.
fn symmetrise(directed: &CsMat<f64>) -> CsMat<f64> {
    let mut symmetric = TriMat::new(directed.shape());
    for (i, row) in directed.outer_iterator().enumerate() {
        for (j, &forward) in row.iter() {
            let backward = directed.get(j, i).copied();
            let weight = (forward + backward.unwrap_or(0.0)) / 2.0;
            symmetric.add_triplet(i, j, weight);
            if backward.is_none() {
                symmetric.add_triplet(j, i, weight);
            }
        }
    }
    symmetric.to_csr()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{Neighbour, SearchKind};
    use rstest::rstest;

    fn knn_hood(vertex: usize, others: &[(usize, f64)]) -> Neighbourhood {
        let k = SearchKind::knn(others.len()).expect("at least one neighbour");
        let candidates = others
            .iter()
            .map(|&(id, distance)| Neighbour { id, distance })
            .collect();
        Neighbourhood::from_candidates(vertex, candidates, k)
    }

    #[rstest]
    fn knn_width_is_mean_of_all_distances() {
        let hoods = vec![
            knn_hood(0, &[(1, 1.0), (2, 2.0)]),
            knn_hood(1, &[(0, 1.0), (2, 3.0)]),
            knn_hood(2, &[(0, 2.0), (1, 3.0)]),
        ];
        let width = estimate_kernel_width(&hoods, NeighbourKind::Knn).expect("estimable");
        assert!((width - 2.0).abs() < 1e-12);
    }

    #[rstest]
    fn radius_width_skips_isolated_vertices() {
        let radius = SearchKind::radius(1.0).expect("radius is valid");
        let hoods = vec![
            knn_hood(0, &[(1, 0.5)]),
            knn_hood(1, &[(0, 0.5)]),
            Neighbourhood::from_candidates(2, Vec::new(), radius),
        ];
        let width = estimate_kernel_width(&hoods, NeighbourKind::Radius).expect("estimable");
        assert!((width - 0.5).abs() < 1e-12);
    }

    #[rstest]
    fn isolated_vertices_leave_width_unavailable() {
        let radius = SearchKind::radius(1.0).expect("radius is valid");
        let hoods: Vec<_> = (0..3)
            .map(|v| Neighbourhood::from_candidates(v, Vec::new(), radius))
            .collect();
        assert_eq!(
            estimate_kernel_width(&hoods, NeighbourKind::Radius),
            Err(NnGraphError::KernelWidthUnavailable)
        );
    }

    #[rstest]
    fn zero_distances_are_degenerate() {
        let hoods = vec![knn_hood(0, &[(1, 0.0)]), knn_hood(1, &[(0, 0.0)])];
        assert_eq!(
            estimate_kernel_width(&hoods, NeighbourKind::Knn),
            Err(NnGraphError::DegenerateKernelWidth)
        );
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn rejects_invalid_explicit_width(#[case] width: f64) {
        let hoods = vec![knn_hood(0, &[(1, 1.0)]), knn_hood(1, &[(0, 1.0)])];
        let err = assemble(&hoods, NeighbourKind::Knn, Some(width)).expect_err("width is invalid");
        assert!(matches!(err, NnGraphError::InvalidKernelWidth { .. }));
    }

    #[rstest]
    fn one_directional_edges_are_halved_and_mirrored() {
        // 0 -> 1 and 1 -> 0 both exist; 2 -> 0 exists only one way.
        let hoods = vec![
            knn_hood(0, &[(1, 1.0)]),
            knn_hood(1, &[(0, 1.0)]),
            knn_hood(2, &[(0, 2.0)]),
        ];
        let (matrix, width) = assemble(&hoods, NeighbourKind::Knn, Some(1.0)).expect("assembles");
        assert_eq!(width, 1.0);
        let mutual = (-1.0_f64).exp();
        let one_way = (-4.0_f64).exp() / 2.0;
        assert_eq!(matrix.get(0, 1).copied(), Some(mutual));
        assert_eq!(matrix.get(1, 0).copied(), Some(mutual));
        assert_eq!(matrix.get(2, 0).copied(), Some(one_way));
        assert_eq!(matrix.get(0, 2).copied(), Some(one_way));
        assert_eq!(matrix.get(1, 2), None);
        assert_eq!(matrix.nnz(), 4);
    }

    #[rstest]
    fn far_edges_survive_underflow() {
        let hoods = vec![knn_hood(0, &[(1, 1.0e6)]), knn_hood(1, &[(0, 1.0e6)])];
        let (matrix, _) = assemble(&hoods, NeighbourKind::Knn, Some(1.0e-3)).expect("assembles");
        assert_eq!(matrix.get(0, 1).copied(), Some(f64::MIN_POSITIVE));
    }

    #[rstest]
    fn estimated_width_is_returned() {
        let hoods = vec![knn_hood(0, &[(1, 3.0)]), knn_hood(1, &[(0, 3.0)])];
        let (matrix, width) = assemble(&hoods, NeighbourKind::Knn, None).expect("assembles");
        assert_eq!(width, 3.0);
        assert_eq!(matrix.get(0, 1).copied(), Some((-3.0_f64).exp()));
    }
}
