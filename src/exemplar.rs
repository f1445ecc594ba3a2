//! Exemplar resolution from the combined message matrix.
//!
//! Point `i`'s exemplar is `argmax_k combined[i][k]`. Ties go to the lowest
//! index: the scan only replaces the current best on a strictly greater
//! value, so equal scores never displace an earlier candidate. Runs are
//! therefore reproducible bit for bit given the same input order.
//!
//! Once a run converges, [`settle_exemplars`] resolves pointer chains
//! (`i → e → f`) so that every exemplar points at itself and the clusters
//! form a partition.

use alloc::vec::Vec;

use crate::matrix::SquareMatrix;
use crate::point::ReferencePoint;

/// How the `is_exemplar` flags are maintained across resolutions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ExemplarFlagPolicy {
    /// Patch two flags per resolution: set the new exemplar's flag and clear
    /// the previous exemplar's flag whenever the point moves away from it.
    ///
    /// The clear is unconditional, so a point can lose its flag while another
    /// point still designates it. Mid-run flags may under-report exemplars;
    /// once every point holds its exemplar for a round they are consistent.
    #[default]
    Incremental,
    /// After each full pass, rebuild every flag from the exemplar pointers:
    /// `is_exemplar[k] = ∃ i: exemplar[i] == k`.
    Recompute,
}

/// Index of the largest entry of `row`, lowest index on ties.
///
/// Returns `None` for an empty row. NaN entries are never selected unless the
/// row holds nothing else, in which case index 0 is returned.
pub fn argmax_first(row: &[f64]) -> Option<usize> {
    if row.is_empty() {
        return None;
    }
    let mut best_idx = 0;
    let mut best = row[0];
    for (k, &v) in row.iter().enumerate().skip(1) {
        if v > best || (best.is_nan() && !v.is_nan()) {
            best = v;
            best_idx = k;
        }
    }
    Some(best_idx)
}

/// Assigns exemplars to points from a combined matrix.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExemplarResolver {
    policy: ExemplarFlagPolicy,
}

impl ExemplarResolver {
    /// A resolver maintaining flags with `policy`.
    pub fn new(policy: ExemplarFlagPolicy) -> Self {
        Self { policy }
    }

    /// The flag policy in use.
    pub fn policy(&self) -> ExemplarFlagPolicy {
        self.policy
    }

    /// Resolve a single point in place.
    ///
    /// Sets `exemplar` to the row argmax and `exemplar_changed` to whether it
    /// differs from the previous exemplar (the first resolution always counts
    /// as a change). Under [`ExemplarFlagPolicy::Incremental`] it also flags
    /// the new exemplar and unflags the previous one if the point moved.
    ///
    /// `combined` must be `points.len()` square.
    pub fn resolve(&self, points: &mut [ReferencePoint], combined: &SquareMatrix, index: usize) {
        let Some(best) = argmax_first(combined.row(index)) else { return };
        let prev = points[index].exemplar;

        points[index].exemplar = Some(best);
        points[index].exemplar_changed = prev != Some(best);

        if self.policy == ExemplarFlagPolicy::Incremental {
            points[best].is_exemplar = true;
            if let Some(old) = prev {
                if old != best {
                    points[old].is_exemplar = false;
                }
            }
        }
    }

    /// Resolve every point in index order and return how many changed exemplar.
    pub fn resolve_all(&self, points: &mut [ReferencePoint], combined: &SquareMatrix) -> usize {
        for i in 0..points.len() {
            self.resolve(points, combined, i);
        }
        if self.policy == ExemplarFlagPolicy::Recompute {
            recompute_flags(points);
        }
        points.iter().filter(|p| p.exemplar_changed).count()
    }
}

/// Rebuild every `is_exemplar` flag from the exemplar pointers.
pub fn recompute_flags(points: &mut [ReferencePoint]) {
    for p in points.iter_mut() {
        p.is_exemplar = false;
    }
    for i in 0..points.len() {
        if let Some(e) = points[i].exemplar {
            points[e].is_exemplar = true;
        }
    }
}

/// Turn converged exemplar pointers into a partition.
///
/// Message passing can settle with point `i` choosing `e` while `e` itself
/// chooses `f`. This keeps only self-referential points as exemplars and
/// moves every other point to the exemplar `k` in that set with the highest
/// `combined[i][k]`, lowest index on ties. If no point chose itself, the
/// point with the largest combined self-score becomes the only exemplar.
///
/// Flags are rebuilt from the result. `exemplar_changed` is left as the last
/// resolution set it. Returns how many points were reassigned.
pub fn settle_exemplars(points: &mut [ReferencePoint], combined: &SquareMatrix) -> usize {
    let mut heads: Vec<usize> = (0..points.len()).filter(|&k| points[k].is_cluster_head(k)).collect();
    if heads.is_empty() {
        let diagonal: Vec<f64> = combined.diagonal().collect();
        let Some(k) = argmax_first(&diagonal) else { return 0 };
        heads.push(k);
    }

    let mut moved = 0;
    for i in 0..points.len() {
        let target = if heads.binary_search(&i).is_ok() {
            i
        } else {
            let row = combined.row(i);
            // `heads` is ascending, so strict `>` keeps the lowest index on ties.
            heads.iter().copied().fold(heads[0], |best, k| if row[k] > row[best] { k } else { best })
        };
        if points[i].exemplar != Some(target) {
            points[i].exemplar = Some(target);
            moved += 1;
        }
    }
    recompute_flags(points);
    moved
}
