// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — CSR
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Compressed sparse row matrices.
//!
//! `row_ptr[i]..row_ptr[i + 1]` indexes the non-zeros of row `i`; column
//! indices are sorted within each row. Matrices are assembled through
//! [`CsrBuilder`], which sums repeated contributions to the same entry.

use rayon::prelude::*;
use std::collections::BTreeMap;

/// Row count above which mat-vec runs on the rayon pool.
const PAR_ROWS_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_square(&self) -> bool {
        self.n_rows == self.n_cols
    }

    #[inline]
    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    #[inline]
    pub fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// `(column, value)` pairs of one row.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        self.col_idx[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// Entry `(r, c)`, zero if not stored.
    pub fn get(&self, r: usize, c: usize) -> f64 {
        let start = self.row_ptr[r];
        let end = self.row_ptr[r + 1];
        match self.col_idx[start..end].binary_search(&c) {
            Ok(k) => self.values[start + k],
            Err(_) => 0.0,
        }
    }

    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.n_rows.min(self.n_cols))
            .map(|i| self.get(i, i))
            .collect()
    }

    #[inline]
    fn row_dot(&self, i: usize, x: &[f64]) -> f64 {
        let mut acc = 0.0;
        for k in self.row_ptr[i]..self.row_ptr[i + 1] {
            acc += self.values[k] * x[self.col_idx[k]];
        }
        acc
    }

    /// `y = A x`.
    pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.n_cols, "mul_vec: x length");
        assert_eq!(y.len(), self.n_rows, "mul_vec: y length");
        if self.n_rows >= PAR_ROWS_THRESHOLD {
            y.par_iter_mut()
                .enumerate()
                .for_each(|(i, yi)| *yi = self.row_dot(i, x));
        } else {
            for (i, yi) in y.iter_mut().enumerate() {
                *yi = self.row_dot(i, x);
            }
        }
    }

    /// `r = b - A x`.
    pub fn residual_into(&self, x: &[f64], b: &[f64], r: &mut [f64]) {
        self.mul_vec(x, r);
        for (ri, &bi) in r.iter_mut().zip(b.iter()) {
            *ri = bi - *ri;
        }
    }

    /// Lower and upper bandwidth `(kl, ku)`.
    pub fn bandwidth(&self) -> (usize, usize) {
        let mut kl = 0;
        let mut ku = 0;
        for i in 0..self.n_rows {
            for (c, v) in self.row(i) {
                if v == 0.0 {
                    continue;
                }
                if c < i {
                    kl = kl.max(i - c);
                } else {
                    ku = ku.max(c - i);
                }
            }
        }
        (kl, ku)
    }

    /// Column sums; zero columns identify conservative flux assembly.
    pub fn column_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.n_cols];
        for (&c, &v) in self.col_idx.iter().zip(self.values.iter()) {
            sums[c] += v;
        }
        sums
    }

    pub fn is_symmetric(&self, tol: f64) -> bool {
        if !self.is_square() {
            return false;
        }
        (0..self.n_rows).all(|i| self.row(i).all(|(c, v)| (v - self.get(c, i)).abs() <= tol))
    }
}

/// Accumulating builder for [`CsrMatrix`].
#[derive(Debug, Clone)]
pub struct CsrBuilder {
    n_cols: usize,
    rows: Vec<BTreeMap<usize, f64>>,
}

impl CsrBuilder {
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        CsrBuilder {
            n_cols,
            rows: vec![BTreeMap::new(); n_rows],
        }
    }

    /// Square builder with every diagonal entry present (zero-valued).
    pub fn new_square(n: usize) -> Self {
        let mut builder = Self::new(n, n);
        for i in 0..n {
            builder.rows[i].insert(i, 0.0);
        }
        builder
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// `A[r, c] += value`.
    #[inline]
    pub fn add(&mut self, r: usize, c: usize, value: f64) {
        assert!(c < self.n_cols, "column {c} out of range {}", self.n_cols);
        *self.rows[r].entry(c).or_insert(0.0) += value;
    }

    /// `A[r, c] = value`.
    #[inline]
    pub fn set(&mut self, r: usize, c: usize, value: f64) {
        assert!(c < self.n_cols, "column {c} out of range {}", self.n_cols);
        self.rows[r].insert(c, value);
    }

    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.rows[r].get(&c).copied().unwrap_or(0.0)
    }

    pub fn build(&self) -> CsrMatrix {
        let nnz: usize = self.rows.iter().map(|r| r.len()).sum();
        let mut row_ptr = Vec::with_capacity(self.rows.len() + 1);
        let mut col_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);
        row_ptr.push(0);
        for row in &self.rows {
            for (&c, &v) in row {
                col_idx.push(c);
                values.push(v);
            }
            row_ptr.push(col_idx.len());
        }
        CsrMatrix {
            n_rows: self.rows.len(),
            n_cols: self.n_cols,
            row_ptr,
            col_idx,
            values,
        }
    }
}

#[cfg(test)]
pub(crate) fn laplacian_1d(n: usize, shift: f64) -> CsrMatrix {
    let mut builder = CsrBuilder::new_square(n);
    for i in 0..n {
        builder.add(i, i, 2.0 + shift);
        if i > 0 {
            builder.add(i, i - 1, -1.0);
        }
        if i + 1 < n {
            builder.add(i, i + 1, -1.0);
        }
    }
    builder.build()
}
