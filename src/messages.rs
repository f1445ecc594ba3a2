//! Responsibility / availability message passing.
//!
//! Two kinds of message flow between every ordered pair of points:
//!
//! ```text
//! r(i,k) = s(i,k) − max_{j≠k} ( a(i,j) + s(i,j) )
//!
//! a(k,k) = Σ_{j≠k}   max(0, r(j,k))
//! a(i,k) = min(0, r(k,k) + Σ_{j∉{i,k}} max(0, r(j,k)))      i ≠ k
//! ```
//!
//! and every freshly computed value is blended with the previous one:
//! `new = λ·old + (1 − λ)·raw`, where λ is the damping factor.
//!
//! # Sweep discipline
//!
//! A responsibility sweep reads availabilities only, and an availability sweep
//! reads responsibilities only, so each matrix can be overwritten in place:
//! no cell's update depends on another cell of the matrix being written.
//! Between the two sweeps (and before the combined/resolve step) the previous
//! sweep must be complete.
//!
//! Both sweeps are O(n²). The responsibility row maximum "excluding column k"
//! is taken from the row's top two values; the availability column sums are
//! accumulated once per column and the excluded terms subtracted per cell.

use crate::matrix::SquareMatrix;

/// Owns the four `n × n` matrices of a run and updates them in place.
#[derive(Clone, Debug)]
pub struct MessagePassingEngine {
    similarity: SquareMatrix,
    responsibility: SquareMatrix,
    availability: SquareMatrix,
    combined: SquareMatrix,
    damping: f64,
}

impl MessagePassingEngine {
    /// Start from a finished similarity matrix (preference on the diagonal).
    ///
    /// Responsibilities, availabilities and the combined matrix start at zero.
    /// `damping` must lie in `(0, 1)`; [`crate::propagation::ApConfig::validate`]
    /// enforces this before an engine is built.
    pub fn new(similarity: SquareMatrix, damping: f64) -> Self {
        debug_assert!(damping > 0.0 && damping < 1.0, "damping {damping} outside (0, 1)");
        let n = similarity.size();
        Self {
            similarity,
            responsibility: SquareMatrix::zeros(n),
            availability: SquareMatrix::zeros(n),
            combined: SquareMatrix::zeros(n),
            damping,
        }
    }

    /// Number of points.
    pub fn size(&self) -> usize {
        self.similarity.size()
    }

    /// Damping factor λ.
    pub fn damping(&self) -> f64 {
        self.damping
    }

    /// Similarity matrix, fixed for the run.
    pub fn similarity(&self) -> &SquareMatrix {
        &self.similarity
    }

    /// Responsibility matrix after the last sweep.
    pub fn responsibility(&self) -> &SquareMatrix {
        &self.responsibility
    }

    /// Availability matrix after the last sweep.
    pub fn availability(&self) -> &SquareMatrix {
        &self.availability
    }

    /// `responsibility + availability` as of the last [`Self::update_combined`].
    pub fn combined(&self) -> &SquareMatrix {
        &self.combined
    }

    #[inline]
    fn blend(&self, prev: f64, raw: f64) -> f64 {
        self.damping * prev + (1.0 - self.damping) * raw
    }

    /// One full responsibility sweep over every ordered pair `(i, k)`.
    pub fn update_responsibilities(&mut self) {
        let n = self.size();
        for i in 0..n {
            // Top two of a(i,·) + s(i,·); ties keep the first index as the maximum.
            let mut best = f64::NEG_INFINITY;
            let mut best_idx = usize::MAX;
            let mut second = f64::NEG_INFINITY;
            for j in 0..n {
                let v = self.availability[(i, j)] + self.similarity[(i, j)];
                if v > best {
                    second = best;
                    best = v;
                    best_idx = j;
                } else if v > second {
                    second = v;
                }
            }

            for k in 0..n {
                let competing = if k == best_idx { second } else { best };
                let raw = self.similarity[(i, k)] - competing;
                let prev = self.responsibility[(i, k)];
                self.responsibility[(i, k)] = self.blend(prev, raw);
            }
        }
    }

    /// One full availability sweep over every ordered pair `(i, k)`.
    pub fn update_availabilities(&mut self) {
        let n = self.size();
        for k in 0..n {
            let positive_total: f64 = (0..n).map(|j| self.responsibility[(j, k)].max(0.0)).sum();
            let self_resp = self.responsibility[(k, k)];
            let others = positive_total - self_resp.max(0.0);

            for i in 0..n {
                let raw = if i == k {
                    others
                } else {
                    let support = others - self.responsibility[(i, k)].max(0.0);
                    (self_resp + support).min(0.0)
                };
                let prev = self.availability[(i, k)];
                self.availability[(i, k)] = self.blend(prev, raw);
            }
        }
    }

    /// Elementwise `combined = responsibility + availability`.
    pub fn update_combined(&mut self) {
        let n = self.size();
        for i in 0..n {
            for k in 0..n {
                self.combined[(i, k)] = self.responsibility[(i, k)] + self.availability[(i, k)];
            }
        }
    }

    /// All three sweeps, in order.
    pub fn sweep(&mut self) {
        self.update_responsibilities();
        self.update_availabilities();
        self.update_combined();
    }

    /// Zero every message matrix, keeping the similarities.
    pub fn reset(&mut self) {
        self.responsibility.fill(0.0);
        self.availability.fill(0.0);
        self.combined.fill(0.0);
    }
}
