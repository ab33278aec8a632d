// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — SOR
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Successive Over-Relaxation on CSR matrices.
//!
//! Rows are relaxed in natural order (lexicographic Gauss-Seidel);
//! `omega = 1.0` is plain Gauss-Seidel.

use fvm_types::error::{FvmError, FvmResult};

use crate::csr::CsrMatrix;
use crate::solver::{
    check_finite, check_system, inverse_diagonal, residual_norm, target_residual, LinearSolve,
    SolveStats,
};

const NAME: &str = "sor";

/// Perform one SOR sweep over every row of `a x = b`.
///
/// `inv_diag` holds `1 / a[i, i]`.
pub fn sor_step(a: &CsrMatrix, b: &[f64], x: &mut [f64], inv_diag: &[f64], omega: f64) {
    for i in 0..a.n_rows() {
        let mut off = 0.0;
        for (c, v) in a.row(i) {
            if c != i {
                off += v * x[c];
            }
        }
        // Gauss-Seidel prediction
        let x_star = (b[i] - off) * inv_diag[i];
        x[i] = (1.0 - omega) * x[i] + omega * x_star;
    }
}

/// Run N SOR sweeps.
pub fn sor_sweeps(
    a: &CsrMatrix,
    b: &[f64],
    x: &mut [f64],
    inv_diag: &[f64],
    omega: f64,
    sweeps: usize,
) {
    for _ in 0..sweeps {
        sor_step(a, b, x, inv_diag, omega);
    }
}

/// L-infinity residual `max |b - A x|`.
pub fn sor_residual(a: &CsrMatrix, b: &[f64], x: &[f64]) -> f64 {
    let mut r = vec![0.0; b.len()];
    a.residual_into(x, b, &mut r);
    r.iter().fold(0.0_f64, |m, v| m.max(v.abs()))
}

#[derive(Debug, Clone, Copy)]
pub struct SorSolver {
    pub omega: f64,
    pub tolerance: f64,
    pub abs_tolerance: f64,
    pub max_iterations: usize,
}

impl LinearSolve for SorSolver {
    fn name(&self) -> &'static str {
        NAME
    }

    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64], x: &mut [f64]) -> FvmResult<SolveStats> {
        check_system(NAME, matrix, rhs, x)?;
        let inv_diag = inverse_diagonal(NAME, matrix)?;
        let target = target_residual(self.tolerance, self.abs_tolerance, rhs);

        let mut residual = residual_norm(matrix, rhs, x);
        let mut iterations = 0;
        while residual > target {
            if iterations == self.max_iterations {
                return Err(FvmError::Unsolvable {
                    solver: NAME,
                    reason: format!(
                        "no convergence after {iterations} iterations (residual {residual:.3e}, target {target:.3e})"
                    ),
                });
            }
            sor_step(matrix, rhs, x, &inv_diag, self.omega);
            iterations += 1;
            residual = residual_norm(matrix, rhs, x);
            if !residual.is_finite() {
                break;
            }
        }
        check_finite(NAME, x)?;
        log::trace!("sor: {iterations} iterations, residual {residual:.3e}");
        Ok(SolveStats {
            iterations,
            residual,
        })
    }
}
