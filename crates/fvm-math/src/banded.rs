// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — Banded LU
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Band LU factorisation without pivoting.
//!
//! Structured 2D meshes numbered row by row give bandwidth `nx`, so the
//! factorisation costs `O(n · kl · ku)`. Finite-volume matrices are
//! diagonally dominant (M-matrices for upwind convection) and do not need
//! pivoting; a vanishing pivot is reported as [`FvmError::Unsolvable`].

use fvm_types::error::{FvmError, FvmResult};

use crate::csr::CsrMatrix;
use crate::solver::{check_finite, check_system, residual_norm, LinearSolve, SolveStats};

const NAME: &str = "banded_lu";

/// Dense band storage: row `i` holds columns `i - kl ..= i + ku`.
#[derive(Debug, Clone)]
pub struct BandedMatrix {
    n: usize,
    kl: usize,
    ku: usize,
    data: Vec<f64>,
}

impl BandedMatrix {
    pub fn from_csr(matrix: &CsrMatrix) -> Self {
        let n = matrix.n_rows();
        let (kl, ku) = matrix.bandwidth();
        let width = kl + ku + 1;
        let mut data = vec![0.0; n * width];
        for i in 0..n {
            for (c, v) in matrix.row(i) {
                if c + kl >= i && c <= i + ku {
                    data[i * width + (c + kl - i)] = v;
                }
            }
        }
        BandedMatrix { n, kl, ku, data }
    }

    #[inline]
    fn idx(&self, r: usize, c: usize) -> usize {
        r * (self.kl + self.ku + 1) + (c + self.kl - r)
    }

    /// In-place Doolittle factorisation; `L` (unit diagonal) below, `U` on and above.
    pub fn factorize(&mut self) -> FvmResult<()> {
        let n = self.n;
        for k in 0..n {
            let pivot = self.data[self.idx(k, k)];
            if pivot == 0.0 || !pivot.is_finite() {
                return Err(FvmError::Unsolvable {
                    solver: NAME,
                    reason: format!("pivot {pivot} at row {k}"),
                });
            }
            let last_row = (k + self.kl).min(n - 1);
            let last_col = (k + self.ku).min(n - 1);
            for i in (k + 1)..=last_row {
                let li = self.idx(i, k);
                let factor = self.data[li] / pivot;
                self.data[li] = factor;
                if factor == 0.0 {
                    continue;
                }
                for j in (k + 1)..=last_col {
                    let u = self.data[self.idx(k, j)];
                    let target = self.idx(i, j);
                    self.data[target] -= factor * u;
                }
            }
        }
        Ok(())
    }

    /// Forward and back substitution against a factorised band.
    pub fn substitute(&self, rhs: &[f64]) -> Vec<f64> {
        let n = self.n;
        let mut y = rhs.to_vec();
        for i in 0..n {
            let first = i.saturating_sub(self.kl);
            let mut acc = y[i];
            for j in first..i {
                acc -= self.data[self.idx(i, j)] * y[j];
            }
            y[i] = acc;
        }
        for i in (0..n).rev() {
            let last = (i + self.ku).min(n - 1);
            let mut acc = y[i];
            for j in (i + 1)..=last {
                acc -= self.data[self.idx(i, j)] * y[j];
            }
            y[i] = acc / self.data[self.idx(i, i)];
        }
        y
    }
}

/// Direct backend for any banded square matrix.
#[derive(Debug, Clone, Copy, Default)]
pub struct BandedLuSolver;

impl LinearSolve for BandedLuSolver {
    fn name(&self) -> &'static str {
        NAME
    }

    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64], x: &mut [f64]) -> FvmResult<SolveStats> {
        check_system(NAME, matrix, rhs, x)?;
        if matrix.n_rows() == 0 {
            return Ok(SolveStats {
                iterations: 0,
                residual: 0.0,
            });
        }
        let mut band = BandedMatrix::from_csr(matrix);
        log::trace!(
            "banded LU: n={} kl={} ku={}",
            band.n,
            band.kl,
            band.ku
        );
        band.factorize()?;
        let solution = band.substitute(rhs);
        check_finite(NAME, &solution)?;
        x.copy_from_slice(&solution);
        Ok(SolveStats {
            iterations: 1,
            residual: residual_norm(matrix, rhs, x),
        })
    }
}
