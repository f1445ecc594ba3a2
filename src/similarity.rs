//! Pairwise similarity and the shared preference.
//!
//! Similarity between two fingerprints is the negated squared Euclidean
//! distance of their RSS vectors, so closer readings score higher and a
//! perfect match scores `0.0`.
//!
//! The diagonal of the similarity matrix holds the *preference*: one value,
//! shared by every point, that sets how willing any point is to become an
//! exemplar. It is drawn from the sorted off-diagonal similarities at the
//! `quantile` position and scaled by `gamma`:
//!
//! ```text
//! sorted = sort_ascending(s[i][j] for i != j)        // n² − n values
//! idx    = min(floor(quantile · len), len − 1)
//! pref   = gamma · sorted[idx]
//! ```
//!
//! With fewer than two points there are no off-diagonal entries and no
//! preference; the caller handles that case without message passing.

use alloc::vec::Vec;

use crate::error::{ApError, Result};
use crate::matrix::SquareMatrix;
use crate::point::ReferencePoint;

/// Negated squared Euclidean distance between two RSS vectors.
///
/// Both slices must have the same length; dimensionality is validated once
/// per run by [`check_dimensionality`] before any pair is compared.
pub fn neg_squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    -a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>()
}

/// Confirm every point has as many features as the first one.
///
/// Returns the shared dimensionality (`0` for an empty slice).
pub fn check_dimensionality(points: &[ReferencePoint]) -> Result<usize> {
    let Some(first) = points.first() else { return Ok(0) };
    let expected = first.dimension();
    for (index, p) in points.iter().enumerate().skip(1) {
        if p.dimension() != expected {
            return Err(ApError::InconsistentDimensionality {
                index,
                expected,
                found: p.dimension(),
            });
        }
    }
    Ok(expected)
}

/// Confirm every coordinate and RSS reading is finite.
///
/// A single NaN would poison every similarity it touches and make
/// structural equality fail even between a point and itself.
pub fn check_finite(points: &[ReferencePoint]) -> Result<()> {
    for (index, p) in points.iter().enumerate() {
        let field = if !p.x.is_finite() {
            "x"
        } else if !p.y.is_finite() {
            "y"
        } else if !p.features.iter().all(|v| v.is_finite()) {
            "RSS reading"
        } else {
            continue;
        };
        return Err(ApError::NonFiniteValue { index, field });
    }
    Ok(())
}

/// Preference drawn from the off-diagonal entries of `similarity`.
///
/// Returns `None` when the matrix has no off-diagonal entries (`n < 2`).
/// The diagonal is never read, so this can be called before or after the
/// preference has been written.
pub fn compute_preference(similarity: &SquareMatrix, gamma: f64, quantile: f64) -> Option<f64> {
    let mut all: Vec<f64> = similarity.off_diagonal().collect();
    if all.is_empty() {
        return None;
    }
    all.sort_unstable_by(|a, b| a.total_cmp(b));
    Some(all[quantile_index(quantile, all.len())] * gamma)
}

/// Position `floor(quantile · count)` clamped into `0..count`.
///
/// `count` must be non-zero.
fn quantile_index(quantile: f64, count: usize) -> usize {
    let raw = quantile * count as f64;
    // `as` saturates: negatives and NaN become 0.
    (raw as usize).min(count - 1)
}

/// Similarity matrix for `points`, preference written on the diagonal.
///
/// Returns the matrix together with the preference, which is `None` for
/// fewer than two points (the diagonal is then left at `0.0`).
pub fn compute_similarities(
    points: &[ReferencePoint],
    gamma: f64,
    quantile: f64,
) -> Result<(SquareMatrix, Option<f64>)> {
    check_dimensionality(points)?;
    check_finite(points)?;

    let n = points.len();
    let mut s = SquareMatrix::zeros(n);
    for i in 0..n {
        for j in 0..n {
            if i != j {
                s[(i, j)] = neg_squared_euclidean(&points[i].features, &points[j].features);
            }
        }
    }

    let preference = compute_preference(&s, gamma, quantile);
    if let Some(pref) = preference {
        for i in 0..n {
            s[(i, i)] = pref;
        }
    }
    Ok((s, preference))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn pt(features: Vec<f64>) -> ReferencePoint {
        ReferencePoint::with_features(0.0, 0.0, 'N', features)
    }

    #[test]
    fn test_similarity_is_negated_squared_distance() {
        assert_eq!(neg_squared_euclidean(&[0.0, 0.0], &[3.0, 4.0]), -25.0);
        assert_eq!(neg_squared_euclidean(&[-60.0, -70.0], &[-60.0, -70.0]), 0.0);
    }

    #[test]
    fn test_preference_is_scaled_median_of_off_diagonals() {
        // Off-diagonals: -1, -4, -9, -2, -5, -3 → sorted [-9, -5, -4, -3, -2, -1].
        // floor(0.5 · 6) = 3 → -3.
        let s = SquareMatrix::from_rows(&[
            vec![0.0, -1.0, -4.0],
            vec![-9.0, 0.0, -2.0],
            vec![-5.0, -3.0, 0.0],
        ])
        .unwrap();
        assert_eq!(compute_preference(&s, 1.0, 0.5), Some(-3.0));
        assert_eq!(compute_preference(&s, 0.5, 0.5), Some(-1.5));
    }

    #[test]
    fn test_preference_quantile_is_clamped_at_both_ends() {
        let s = SquareMatrix::from_rows(&[vec![0.0, -2.0], vec![-8.0, 0.0]]).unwrap();
        assert_eq!(compute_preference(&s, 1.0, 0.0), Some(-8.0));
        // floor(1.0 · 2) = 2 is out of range and clamps to the last element.
        assert_eq!(compute_preference(&s, 1.0, 1.0), Some(-2.0));
    }

    #[test]
    fn test_preference_ignores_diagonal() {
        let s = SquareMatrix::from_rows(&[vec![100.0, -2.0], vec![-8.0, -100.0]]).unwrap();
        assert_eq!(compute_preference(&s, 1.0, 0.0), Some(-8.0));
    }

    #[test]
    fn test_single_point_has_no_preference() {
        let (s, pref) = compute_similarities(&[pt(vec![-50.0])], 0.36, 0.5).unwrap();
        assert_eq!(pref, None);
        assert_eq!(s.size(), 1);
        assert_eq!(s[(0, 0)], 0.0);

        let (empty, pref) = compute_similarities(&[], 0.36, 0.5).unwrap();
        assert_eq!(pref, None);
        assert_eq!(empty.size(), 0);
    }

    #[test]
    fn test_diagonal_is_uniform_preference() {
        let points = [pt(vec![0.0]), pt(vec![1.0]), pt(vec![3.0])];
        let (s, pref) = compute_similarities(&points, 0.5, 0.5).unwrap();
        // Off-diagonals: -1, -9, -1, -4, -9, -4 → sorted [-9,-9,-4,-4,-1,-1], idx 3 → -4.
        assert_eq!(pref, Some(-2.0));
        assert!(s.diagonal().all(|d| d == -2.0));
        assert_eq!(s[(0, 2)], -9.0);
        assert_eq!(s[(2, 1)], -4.0);
    }

    #[test]
    fn test_mismatched_dimensionality_fails_fast() {
        let points = [pt(vec![0.0, 1.0]), pt(vec![1.0, 1.0]), pt(vec![2.0])];
        let err = compute_similarities(&points, 0.36, 0.5).unwrap_err();
        assert_eq!(
            err,
            ApError::InconsistentDimensionality { index: 2, expected: 2, found: 1 }
        );
    }

    #[test]
    fn test_non_finite_values_rejected_before_similarity() {
        let nan_reading = [pt(vec![-40.0, -70.0]), pt(vec![f64::NAN, -71.0])];
        assert_eq!(
            compute_similarities(&nan_reading, 0.36, 0.5).unwrap_err(),
            ApError::NonFiniteValue { index: 1, field: "RSS reading" }
        );

        let mut far = pt(vec![-40.0]);
        far.y = f64::INFINITY;
        assert_eq!(
            check_finite(&[pt(vec![-41.0]), far]),
            Err(ApError::NonFiniteValue { index: 1, field: "y" })
        );
        assert_eq!(check_finite(&[pt(vec![-41.0]), pt(vec![-42.0])]), Ok(()));
    }
}
