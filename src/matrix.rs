//! Dense square matrix storage shared by the similarity and message matrices.

use alloc::vec;
use alloc::vec::Vec;
use core::ops::{Index, IndexMut};

/// Dense `n × n` matrix of `f64`, row-major.
///
/// The size is fixed at construction; every matrix in a run is allocated once
/// after the point count is known and then mutated in place.
#[derive(Clone, Debug, PartialEq)]
pub struct SquareMatrix {
    n: usize,
    data: Vec<f64>,
}

impl SquareMatrix {
    /// An `n × n` matrix of zeros.
    pub fn zeros(n: usize) -> Self {
        Self { n, data: vec![0.0; n * n] }
    }

    /// Build from nested rows. Returns `None` unless every row has `rows.len()` entries.
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let n = rows.len();
        if rows.iter().any(|r| r.len() != n) {
            return None;
        }
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Some(Self { n, data })
    }

    /// Row/column count.
    pub fn size(&self) -> usize {
        self.n
    }

    /// Row `i` as a slice.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    /// Row `i` as a mutable slice.
    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        let n = self.n;
        &mut self.data[i * n..(i + 1) * n]
    }

    /// Set every entry to `value`.
    pub fn fill(&mut self, value: f64) {
        self.data.iter_mut().for_each(|x| *x = value);
    }

    /// Iterate the diagonal entries in index order.
    pub fn diagonal(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.n).map(move |i| self.data[i * self.n + i])
    }

    /// Every off-diagonal entry, row by row, skipping `(i, i)`.
    pub fn off_diagonal(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.n).flat_map(move |i| {
            (0..self.n).filter(move |&j| j != i).map(move |j| self.data[i * self.n + j])
        })
    }
}

impl Index<(usize, usize)> for SquareMatrix {
    type Output = f64;

    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.data[i * self.n + j]
    }
}

impl IndexMut<(usize, usize)> for SquareMatrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        &mut self.data[i * self.n + j]
    }
}
