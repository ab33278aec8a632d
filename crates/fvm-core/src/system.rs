// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — Linear System
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Global accumulator `A φ = b` shared by all terms of an equation.

use fvm_math::csr::{CsrBuilder, CsrMatrix};

#[derive(Debug, Clone)]
pub struct LinearSystem {
    matrix: CsrBuilder,
    rhs: Vec<f64>,
}

impl LinearSystem {
    /// One unknown per cell, every diagonal entry present.
    pub fn new(n: usize) -> Self {
        LinearSystem {
            matrix: CsrBuilder::new_square(n),
            rhs: vec![0.0; n],
        }
    }

    #[inline]
    pub fn n(&self) -> usize {
        self.rhs.len()
    }

    #[inline]
    pub fn add_diagonal(&mut self, row: usize, value: f64) {
        self.matrix.add(row, row, value);
    }

    #[inline]
    pub fn add_coefficient(&mut self, row: usize, col: usize, value: f64) {
        self.matrix.add(row, col, value);
    }

    #[inline]
    pub fn add_rhs(&mut self, row: usize, value: f64) {
        self.rhs[row] += value;
    }

    pub fn coefficient(&self, row: usize, col: usize) -> f64 {
        self.matrix.get(row, col)
    }

    pub fn rhs(&self) -> &[f64] {
        &self.rhs
    }

    pub fn finish(self) -> (CsrMatrix, Vec<f64>) {
        (self.matrix.build(), self.rhs)
    }
}
