// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — Krylov Solvers
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Jacobi-preconditioned conjugate gradients and BiCGStab.
//!
//! PCG requires a symmetric positive-definite matrix (pure diffusion plus
//! transient); BiCGStab handles the non-symmetric matrices produced by
//! convection. Both recompute the true residual whenever the recursive
//! estimate reaches the target and restart if the two disagree.

use fvm_types::error::{FvmError, FvmResult};

use crate::csr::CsrMatrix;
use crate::solver::{
    check_finite, check_system, inverse_diagonal, target_residual, LinearSolve, SolveStats,
};
use crate::vector_ops::{axpy, dot, norm2};

/// Threshold below which a Krylov scalar counts as breakdown.
const BREAKDOWN: f64 = 1e-300;

fn breakdown(solver: &'static str, iterations: usize) -> FvmError {
    FvmError::Unsolvable {
        solver,
        reason: format!("Krylov breakdown without progress after {iterations} iterations"),
    }
}

fn exhausted(solver: &'static str, iterations: usize, residual: f64, target: f64) -> FvmError {
    FvmError::Unsolvable {
        solver,
        reason: format!(
            "no convergence after {iterations} iterations (residual {residual:.3e}, target {target:.3e})"
        ),
    }
}

#[inline]
fn precondition(inv_diag: &[f64], r: &[f64], z: &mut [f64]) {
    for ((zi, &ri), &di) in z.iter_mut().zip(r.iter()).zip(inv_diag.iter()) {
        *zi = ri * di;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PcgSolver {
    pub tolerance: f64,
    pub abs_tolerance: f64,
    pub max_iterations: usize,
}

impl LinearSolve for PcgSolver {
    fn name(&self) -> &'static str {
        "pcg"
    }

    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64], x: &mut [f64]) -> FvmResult<SolveStats> {
        let name = self.name();
        check_system(name, matrix, rhs, x)?;
        let inv_diag = inverse_diagonal(name, matrix)?;
        let n = rhs.len();
        let target = target_residual(self.tolerance, self.abs_tolerance, rhs);

        let mut r = vec![0.0; n];
        let mut z = vec![0.0; n];
        let mut p = vec![0.0; n];
        let mut ap = vec![0.0; n];
        let mut iterations = 0;

        loop {
            matrix.residual_into(x, rhs, &mut r);
            let true_residual = norm2(&r);
            if true_residual <= target {
                check_finite(name, x)?;
                log::trace!("pcg: {iterations} iterations, residual {true_residual:.3e}");
                return Ok(SolveStats {
                    iterations,
                    residual: true_residual,
                });
            }
            if iterations >= self.max_iterations || !true_residual.is_finite() {
                return Err(exhausted(name, iterations, true_residual, target));
            }

            precondition(&inv_diag, &r, &mut z);
            p.copy_from_slice(&z);
            let mut rz = dot(&r, &z);
            let cycle_start = iterations;

            while iterations < self.max_iterations {
                matrix.mul_vec(&p, &mut ap);
                let pap = dot(&p, &ap);
                if pap.abs() < BREAKDOWN {
                    break;
                }
                if pap < 0.0 {
                    return Err(FvmError::Unsolvable {
                        solver: name,
                        reason: "matrix is not positive definite".to_string(),
                    });
                }
                let alpha = rz / pap;
                axpy(alpha, &p, x);
                axpy(-alpha, &ap, &mut r);
                iterations += 1;

                if norm2(&r) <= target {
                    break;
                }
                precondition(&inv_diag, &r, &mut z);
                let rz_new = dot(&r, &z);
                let beta = rz_new / rz;
                rz = rz_new;
                for (pi, &zi) in p.iter_mut().zip(z.iter()) {
                    *pi = zi + beta * *pi;
                }
            }
            if iterations == cycle_start {
                return Err(breakdown(name, iterations));
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BiCgStabSolver {
    pub tolerance: f64,
    pub abs_tolerance: f64,
    pub max_iterations: usize,
}

impl LinearSolve for BiCgStabSolver {
    fn name(&self) -> &'static str {
        "bicgstab"
    }

    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64], x: &mut [f64]) -> FvmResult<SolveStats> {
        let name = self.name();
        check_system(name, matrix, rhs, x)?;
        let inv_diag = inverse_diagonal(name, matrix)?;
        let n = rhs.len();
        let target = target_residual(self.tolerance, self.abs_tolerance, rhs);

        let mut r = vec![0.0; n];
        let mut p = vec![0.0; n];
        let mut v = vec![0.0; n];
        let mut s = vec![0.0; n];
        let mut t = vec![0.0; n];
        let mut p_hat = vec![0.0; n];
        let mut s_hat = vec![0.0; n];
        let mut iterations = 0;

        loop {
            matrix.residual_into(x, rhs, &mut r);
            let true_residual = norm2(&r);
            if true_residual <= target {
                check_finite(name, x)?;
                log::trace!("bicgstab: {iterations} iterations, residual {true_residual:.3e}");
                return Ok(SolveStats {
                    iterations,
                    residual: true_residual,
                });
            }
            if iterations >= self.max_iterations || !true_residual.is_finite() {
                return Err(exhausted(name, iterations, true_residual, target));
            }

            let r0 = r.clone();
            let mut rho_old = 1.0;
            let mut alpha = 1.0;
            let mut omega = 1.0;
            v.iter_mut().for_each(|vi| *vi = 0.0);
            p.iter_mut().for_each(|pi| *pi = 0.0);
            let cycle_start = iterations;

            while iterations < self.max_iterations {
                let rho = dot(&r0, &r);
                if rho.abs() < BREAKDOWN {
                    break;
                }
                let beta = (rho / rho_old) * (alpha / omega);
                for ((pi, &ri), &vi) in p.iter_mut().zip(r.iter()).zip(v.iter()) {
                    *pi = ri + beta * (*pi - omega * vi);
                }
                precondition(&inv_diag, &p, &mut p_hat);
                matrix.mul_vec(&p_hat, &mut v);
                let r0v = dot(&r0, &v);
                if r0v.abs() < BREAKDOWN {
                    break;
                }
                alpha = rho / r0v;
                for ((si, &ri), &vi) in s.iter_mut().zip(r.iter()).zip(v.iter()) {
                    *si = ri - alpha * vi;
                }
                iterations += 1;
                if norm2(&s) <= target {
                    axpy(alpha, &p_hat, x);
                    break;
                }

                precondition(&inv_diag, &s, &mut s_hat);
                matrix.mul_vec(&s_hat, &mut t);
                let tt = dot(&t, &t);
                if tt < BREAKDOWN {
                    axpy(alpha, &p_hat, x);
                    break;
                }
                omega = dot(&t, &s) / tt;
                axpy(alpha, &p_hat, x);
                axpy(omega, &s_hat, x);
                for ((ri, &si), &ti) in r.iter_mut().zip(s.iter()).zip(t.iter()) {
                    *ri = si - omega * ti;
                }
                if norm2(&r) <= target || omega.abs() < BREAKDOWN {
                    break;
                }
                rho_old = rho;
            }
            if iterations == cycle_start {
                return Err(breakdown(name, iterations));
            }
        }
    }
}
