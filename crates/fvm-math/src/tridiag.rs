// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — Tridiag
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Thomas algorithm for tridiagonal systems.
//!
//! Used directly on 1D meshes, where every cell couples only to its two
//! neighbours and the assembled matrix has bandwidth (1, 1).

use fvm_types::error::{FvmError, FvmResult};

use crate::csr::CsrMatrix;
use crate::solver::{check_finite, check_system, residual_norm, LinearSolve, SolveStats};

const NAME: &str = "tridiagonal";

/// Solve tridiagonal system Ax = d using the Thomas algorithm.
///
/// - `a`: sub-diagonal \[n\] (a\[0\] unused)
/// - `b`: main diagonal \[n\]
/// - `c`: super-diagonal \[n\] (c\[n-1\] unused)
/// - `d`: right-hand side \[n\]
///
/// Fails if any band has the wrong length or if a pivot vanishes.
pub fn thomas_solve(a: &[f64], b: &[f64], c: &[f64], d: &[f64]) -> FvmResult<Vec<f64>> {
    let n = d.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    for (band, len) in [("sub-diagonal", a.len()), ("diagonal", b.len()), ("super-diagonal", c.len())] {
        if len != n {
            return Err(FvmError::shape(band, n, len));
        }
    }

    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![0.0; n];

    // Forward sweep
    let pivot = checked_pivot(b[0], 0)?;
    c_prime[0] = c[0] / pivot;
    d_prime[0] = d[0] / pivot;

    for i in 1..n {
        let den = checked_pivot(b[i] - a[i] * c_prime[i - 1], i)?;
        if i < n - 1 {
            c_prime[i] = c[i] / den;
        }
        d_prime[i] = (d[i] - a[i] * d_prime[i - 1]) / den;
    }

    // Back substitution
    let mut x = vec![0.0; n];
    x[n - 1] = d_prime[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = d_prime[i] - c_prime[i] * x[i + 1];
    }

    Ok(x)
}

#[inline]
fn checked_pivot(p: f64, row: usize) -> FvmResult<f64> {
    if p == 0.0 || !p.is_finite() {
        return Err(FvmError::Unsolvable {
            solver: NAME,
            reason: format!("pivot {p} at row {row}"),
        });
    }
    Ok(p)
}

/// Direct backend for matrices with bandwidth at most (1, 1).
#[derive(Debug, Clone, Copy, Default)]
pub struct TridiagonalSolver;

impl LinearSolve for TridiagonalSolver {
    fn name(&self) -> &'static str {
        NAME
    }

    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64], x: &mut [f64]) -> FvmResult<SolveStats> {
        check_system(NAME, matrix, rhs, x)?;
        let (kl, ku) = matrix.bandwidth();
        if kl > 1 || ku > 1 {
            return Err(FvmError::Unsolvable {
                solver: NAME,
                reason: format!("matrix bandwidth ({kl}, {ku}) exceeds (1, 1)"),
            });
        }
        let n = matrix.n_rows();
        let mut sub = vec![0.0; n];
        let mut diag = vec![0.0; n];
        let mut sup = vec![0.0; n];
        for i in 0..n {
            for (col, v) in matrix.row(i) {
                if col + 1 == i {
                    sub[i] = v;
                } else if col == i {
                    diag[i] = v;
                } else if col == i + 1 {
                    sup[i] = v;
                }
            }
        }
        let solution = thomas_solve(&sub, &diag, &sup, rhs)?;
        check_finite(NAME, &solution)?;
        x.copy_from_slice(&solution);
        Ok(SolveStats {
            iterations: 1,
            residual: residual_norm(matrix, rhs, x),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csr::laplacian_1d;

    #[test]
    fn test_thomas_identity() {
        // Solve I * x = [1,2,3,4,5]
        let n = 5;
        let a = vec![0.0; n];
        let b = vec![1.0; n];
        let c = vec![0.0; n];
        let d = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let x = thomas_solve(&a, &b, &c, &d).unwrap();
        for i in 0..n {
            assert!((x[i] - d[i]).abs() < 1e-12, "x[{i}] should equal d[{i}]");
        }
    }

    #[test]
    fn test_thomas_simple_tridiag() {
        // [ 2 -1  0  0]   [x0]   [1]
        // [-1  2 -1  0] * [x1] = [0]
        // [ 0 -1  2 -1]   [x2]   [0]
        // [ 0  0 -1  2]   [x3]   [1]
        let a = vec![0.0, -1.0, -1.0, -1.0];
        let b = vec![2.0, 2.0, 2.0, 2.0];
        let c = vec![-1.0, -1.0, -1.0, 0.0];
        let d = vec![1.0, 0.0, 0.0, 1.0];
        let x = thomas_solve(&a, &b, &c, &d).unwrap();
        for xi in &x {
            assert!((xi - 1.0).abs() < 1e-12, "expected all-ones, got {xi}");
        }
    }

    #[test]
    fn test_thomas_implicit_diffusion_pattern() {
        // Backward-Euler diffusion row: main = 1 + 2*alpha, sub/super = -alpha
        let n = 10;
        let alpha = 0.4;
        let a: Vec<f64> = (0..n).map(|i| if i > 0 { -alpha } else { 0.0 }).collect();
        let b = vec![1.0 + 2.0 * alpha; n];
        let c: Vec<f64> = (0..n)
            .map(|i| if i < n - 1 { -alpha } else { 0.0 })
            .collect();
        let d = vec![1.0; n];

        let x = thomas_solve(&a, &b, &c, &d).unwrap();
        for (i, &xi) in x.iter().enumerate() {
            assert!(
                xi > 0.0 && xi.is_finite(),
                "x[{i}] = {xi} should be positive finite"
            );
        }
    }

    #[test]
    fn test_thomas_zero_pivot_is_error() {
        let err = thomas_solve(&[0.0, 1.0], &[0.0, 1.0], &[1.0, 0.0], &[1.0, 1.0]).unwrap_err();
        assert!(matches!(err, FvmError::Unsolvable { .. }));
    }

    #[test]
    fn test_thomas_band_length_mismatch() {
        let err = thomas_solve(&[0.0], &[1.0, 1.0], &[0.0, 0.0], &[1.0, 1.0]).unwrap_err();
        assert!(matches!(err, FvmError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_solver_rejects_wide_band() {
        use crate::csr::CsrBuilder;
        let mut b = CsrBuilder::new_square(4);
        for i in 0..4 {
            b.add(i, i, 4.0);
        }
        b.add(0, 3, 1.0);
        let mut x = vec![0.0; 4];
        let err = TridiagonalSolver
            .solve(&b.build(), &[1.0; 4], &mut x)
            .unwrap_err();
        assert!(matches!(err, FvmError::Unsolvable { .. }));
    }

    #[test]
    fn test_solver_on_csr_laplacian() {
        let a = laplacian_1d(8, 0.0);
        let mut rhs = vec![0.0; 8];
        rhs[0] = 1.0;
        rhs[7] = 1.0;
        let mut x = vec![0.0; 8];
        let stats = TridiagonalSolver.solve(&a, &rhs, &mut x).unwrap();
        assert_eq!(stats.iterations, 1);
        assert!(stats.residual < 1e-12);
        assert!(x.iter().all(|v| (v - 1.0).abs() < 1e-12));
    }
}
