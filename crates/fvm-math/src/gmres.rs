// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — GMRES
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Restarted GMRES(m) Krylov subspace solver for general sparse matrices.
//!
//! GMRES (Generalised Minimal RESidual) builds an orthonormal Krylov
//! basis via Arnoldi iteration with modified Gram-Schmidt, then solves
//! the projected least-squares problem using Givens rotations on the
//! upper Hessenberg matrix.  When the basis reaches size `m` without
//! convergence the solver restarts from the current approximate
//! solution.
//!
//! A Jacobi left-preconditioner is applied: instead of solving `A x = b`,
//! we solve `D⁻¹ A x = D⁻¹ b` with `D = diag(A)`. Convergence is always
//! confirmed on the unpreconditioned residual.

use fvm_types::error::{FvmError, FvmResult};

use crate::csr::CsrMatrix;
use crate::solver::{
    check_finite, check_system, inverse_diagonal, target_residual, LinearSolve, SolveStats,
};
use crate::vector_ops::{axpy, dot, norm2, scale_into};

// ───────────────────── Givens rotation helpers ──────────────────────

/// A single Givens rotation storing (c, s) such that
/// ```text
/// | c  -s | | a |   | r |
/// | s   c | | b | = | 0 |
/// ```
#[derive(Clone, Copy)]
struct GivensRotation {
    c: f64,
    s: f64,
}

impl GivensRotation {
    /// Compute the rotation that zeroes `b` in (a, b).
    fn compute(a: f64, b: f64) -> Self {
        if b.abs() < 1e-300 {
            GivensRotation { c: 1.0, s: 0.0 }
        } else if b.abs() > a.abs() {
            let tau = -a / b;
            let s = 1.0 / (1.0 + tau * tau).sqrt();
            let c = s * tau;
            GivensRotation { c, s }
        } else {
            let tau = -b / a;
            let c = 1.0 / (1.0 + tau * tau).sqrt();
            let s = c * tau;
            GivensRotation { c, s }
        }
    }

    /// Apply this rotation to (a, b) in place.
    #[inline]
    fn apply(&self, a: &mut f64, b: &mut f64) {
        let ta = *a;
        let tb = *b;
        *a = self.c * ta - self.s * tb;
        *b = self.s * ta + self.c * tb;
    }
}

/// Upper Hessenberg matrix `H[(m+1) x m]` stored column-major.
struct Hessenberg {
    rows: usize,
    data: Vec<f64>,
}

impl Hessenberg {
    fn new(m: usize) -> Self {
        Hessenberg {
            rows: m + 1,
            data: vec![0.0; (m + 1) * m],
        }
    }

    #[inline]
    fn at(&self, i: usize, j: usize) -> f64 {
        self.data[j * self.rows + i]
    }

    #[inline]
    fn set(&mut self, i: usize, j: usize, v: f64) {
        self.data[j * self.rows + i] = v;
    }

    /// Rotate entries `(i, j)` and `(i + 1, j)`.
    fn rotate(&mut self, rot: &GivensRotation, i: usize, j: usize) {
        let mut ha = self.at(i, j);
        let mut hb = self.at(i + 1, j);
        rot.apply(&mut ha, &mut hb);
        self.set(i, j, ha);
        self.set(i + 1, j, hb);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GmresSolver {
    /// Krylov subspace dimension before restart.
    pub restart: usize,
    pub tolerance: f64,
    pub abs_tolerance: f64,
    /// Budget on inner (Arnoldi) iterations summed over all restarts.
    pub max_iterations: usize,
}

impl GmresSolver {
    /// `out = D⁻¹ A v`.
    fn apply_operator(matrix: &CsrMatrix, inv_diag: &[f64], v: &[f64], out: &mut [f64]) {
        matrix.mul_vec(v, out);
        for (o, &d) in out.iter_mut().zip(inv_diag.iter()) {
            *o *= d;
        }
    }
}

impl LinearSolve for GmresSolver {
    fn name(&self) -> &'static str {
        "gmres"
    }

    /// Solve `A x = b` using restarted GMRES(m).
    ///
    /// # Algorithm
    ///
    /// ```text
    /// for each restart cycle:
    ///   z = D⁻¹ (b - A·x)             (preconditioned residual)
    ///   beta = ||z||₂
    ///   V[0] = z / beta
    ///   for j = 0 .. m-1:             (Arnoldi)
    ///     w = D⁻¹ A V[j]
    ///     for i = 0 .. j:             (modified Gram-Schmidt)
    ///       H[i,j] = <w, V[i]>
    ///       w -= H[i,j] V[i]
    ///     H[j+1,j] = ||w||₂
    ///     V[j+1]   = w / H[j+1,j]
    ///     apply previous Givens to H[:,j]
    ///     compute new Givens to zero H[j+1,j]
    ///     if |g[j+1]| small: break
    ///   solve upper triangular system for y
    ///   x += V · y
    /// ```
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64], x: &mut [f64]) -> FvmResult<SolveStats> {
        let name = self.name();
        check_system(name, matrix, rhs, x)?;
        let inv_diag = inverse_diagonal(name, matrix)?;
        let n = rhs.len();
        let m = self.restart.min(n.max(1));
        let target = target_residual(self.tolerance, self.abs_tolerance, rhs);

        let mut precond_rhs = vec![0.0; n];
        for ((p, &b), &d) in precond_rhs.iter_mut().zip(rhs.iter()).zip(inv_diag.iter()) {
            *p = b * d;
        }
        let inner_target = target_residual(self.tolerance, self.abs_tolerance, &precond_rhs);

        let mut r = vec![0.0; n];
        let mut w = vec![0.0; n];
        let mut total_iters = 0;

        // ───── outer restart loop ─────
        loop {
            matrix.residual_into(x, rhs, &mut r);
            let true_residual = norm2(&r);
            if true_residual <= target {
                check_finite(name, x)?;
                log::trace!("gmres: {total_iters} iterations, residual {true_residual:.3e}");
                return Ok(SolveStats {
                    iterations: total_iters,
                    residual: true_residual,
                });
            }
            if total_iters >= self.max_iterations || !true_residual.is_finite() {
                return Err(FvmError::Unsolvable {
                    solver: name,
                    reason: format!(
                        "no convergence after {total_iters} iterations (residual {true_residual:.3e}, target {target:.3e})"
                    ),
                });
            }

            for (ri, &d) in r.iter_mut().zip(inv_diag.iter()) {
                *ri *= d;
            }
            let beta = norm2(&r);

            let mut v_basis: Vec<Vec<f64>> = Vec::with_capacity(m + 1);
            let mut v0 = vec![0.0; n];
            scale_into(1.0 / beta, &r, &mut v0);
            v_basis.push(v0);

            let mut h = Hessenberg::new(m);
            let mut givens: Vec<GivensRotation> = Vec::with_capacity(m);
            // Right-hand side of the Hessenberg least-squares: g = beta * e_1
            let mut g = vec![0.0; m + 1];
            g[0] = beta;
            let mut inner_iters = 0;

            // ───── Arnoldi iteration ─────
            for j in 0..m {
                if total_iters >= self.max_iterations {
                    break;
                }
                inner_iters = j + 1;
                total_iters += 1;

                Self::apply_operator(matrix, &inv_diag, &v_basis[j], &mut w);

                // Modified Gram-Schmidt orthogonalisation
                for (i, vi) in v_basis.iter().enumerate().take(j + 1) {
                    let h_ij = dot(&w, vi);
                    h.set(i, j, h_ij);
                    axpy(-h_ij, vi, &mut w);
                }

                let h_jp1_j = norm2(&w);
                h.set(j + 1, j, h_jp1_j);

                if h_jp1_j > 1e-300 {
                    let mut vj1 = vec![0.0; n];
                    scale_into(1.0 / h_jp1_j, &w, &mut vj1);
                    v_basis.push(vj1);
                } else {
                    // Happy breakdown: residual is zero in the Krylov subspace
                    v_basis.push(vec![0.0; n]);
                }

                for (i, rot) in givens.iter().enumerate() {
                    h.rotate(rot, i, j);
                }
                let rot = GivensRotation::compute(h.at(j, j), h.at(j + 1, j));
                h.rotate(&rot, j, j);
                {
                    let (head, tail) = g.split_at_mut(j + 1);
                    rot.apply(&mut head[j], &mut tail[0]);
                }
                givens.push(rot);

                if g[j + 1].abs() < inner_target || h_jp1_j < 1e-300 {
                    break;
                }
            }

            // ───── solve the upper triangular system H y = g ─────
            let k = inner_iters;
            let mut y = vec![0.0; k];
            for i in (0..k).rev() {
                let mut sum = g[i];
                for (jj, yj) in y.iter().enumerate().skip(i + 1) {
                    sum -= h.at(i, jj) * yj;
                }
                let diag = h.at(i, i);
                y[i] = if diag.abs() > 1e-300 { sum / diag } else { 0.0 };
            }

            // ───── update solution: x = x + V * y ─────
            for (yi, vi) in y.iter().zip(v_basis.iter()) {
                axpy(*yi, vi, x);
            }
        }
    }
}
