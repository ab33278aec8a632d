// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — Linear Solver Adapter
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Uniform interface over the direct and iterative backends.
//!
//! Every backend takes a square [`CsrMatrix`], a right-hand side and an
//! initial guess (updated in place). Iterative backends stop once
//! `‖b - A x‖₂ <= max(tol · ‖b‖₂, abs_tol)`; exhausting the iteration
//! budget is an [`FvmError::Unsolvable`].

use fvm_types::config::{LinearSolverConfig, LinearSolverKind};
use fvm_types::error::{FvmError, FvmResult};

use crate::banded::BandedLuSolver;
use crate::csr::CsrMatrix;
use crate::gmres::GmresSolver;
use crate::krylov::{BiCgStabSolver, PcgSolver};
use crate::sor::SorSolver;
use crate::tridiag::TridiagonalSolver;
use crate::vector_ops::norm2;

/// Outcome of one linear solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveStats {
    /// Iterations performed (1 for direct solvers).
    pub iterations: usize,
    /// Final true residual `‖b - A x‖₂`.
    pub residual: f64,
}

pub trait LinearSolve: Send + Sync {
    fn name(&self) -> &'static str;

    /// Solve `A x = rhs`, using `x` as the initial guess.
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64], x: &mut [f64]) -> FvmResult<SolveStats>;
}

/// Instantiate the backend named by the configuration.
pub fn build_solver(config: &LinearSolverConfig) -> FvmResult<Box<dyn LinearSolve>> {
    config.validate()?;
    let solver: Box<dyn LinearSolve> = match config.kind {
        LinearSolverKind::Tridiagonal => Box::new(TridiagonalSolver),
        LinearSolverKind::BandedLu => Box::new(BandedLuSolver),
        LinearSolverKind::Sor => Box::new(SorSolver {
            omega: config.omega,
            tolerance: config.tolerance,
            abs_tolerance: config.abs_tolerance,
            max_iterations: config.max_iterations,
        }),
        LinearSolverKind::Pcg => Box::new(PcgSolver {
            tolerance: config.tolerance,
            abs_tolerance: config.abs_tolerance,
            max_iterations: config.max_iterations,
        }),
        LinearSolverKind::BiCgStab => Box::new(BiCgStabSolver {
            tolerance: config.tolerance,
            abs_tolerance: config.abs_tolerance,
            max_iterations: config.max_iterations,
        }),
        LinearSolverKind::Gmres => Box::new(GmresSolver {
            restart: config.restart,
            tolerance: config.tolerance,
            abs_tolerance: config.abs_tolerance,
            max_iterations: config.max_iterations,
        }),
    };
    log::debug!("linear solver backend: {}", solver.name());
    Ok(solver)
}

/// Shape checks shared by every backend.
pub(crate) fn check_system(
    solver: &'static str,
    matrix: &CsrMatrix,
    rhs: &[f64],
    x: &[f64],
) -> FvmResult<()> {
    if !matrix.is_square() {
        return Err(FvmError::Unsolvable {
            solver,
            reason: format!(
                "matrix is {}x{}, expected square",
                matrix.n_rows(),
                matrix.n_cols()
            ),
        });
    }
    if rhs.len() != matrix.n_rows() {
        return Err(FvmError::shape("right-hand side", matrix.n_rows(), rhs.len()));
    }
    if x.len() != matrix.n_rows() {
        return Err(FvmError::shape("solution vector", matrix.n_rows(), x.len()));
    }
    Ok(())
}

/// Stopping threshold for iterative backends: relative to `‖b‖₂`, never
/// below `abs_tolerance`.
pub(crate) fn target_residual(tolerance: f64, abs_tolerance: f64, rhs: &[f64]) -> f64 {
    (tolerance * norm2(rhs)).max(abs_tolerance)
}

/// True residual norm `‖b - A x‖₂`.
pub fn residual_norm(matrix: &CsrMatrix, rhs: &[f64], x: &[f64]) -> f64 {
    let mut r = vec![0.0; rhs.len()];
    matrix.residual_into(x, rhs, &mut r);
    norm2(&r)
}

/// Guard against NaN/inf escaping from a backend.
pub(crate) fn check_finite(solver: &'static str, x: &[f64]) -> FvmResult<()> {
    if let Some(i) = x.iter().position(|v| !v.is_finite()) {
        return Err(FvmError::Unsolvable {
            solver,
            reason: format!("non-finite solution entry at row {i}"),
        });
    }
    Ok(())
}

/// Jacobi preconditioner `M⁻¹ = diag(A)⁻¹`.
pub(crate) fn inverse_diagonal(solver: &'static str, matrix: &CsrMatrix) -> FvmResult<Vec<f64>> {
    matrix
        .diagonal()
        .iter()
        .enumerate()
        .map(|(i, &d)| {
            if d == 0.0 || !d.is_finite() {
                Err(FvmError::Unsolvable {
                    solver,
                    reason: format!("zero or non-finite diagonal at row {i}"),
                })
            } else {
                Ok(1.0 / d)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csr::{laplacian_1d, CsrBuilder};

    fn nonsymmetric(n: usize) -> CsrMatrix {
        // Upwind convection-diffusion: diagonally dominant, non-symmetric.
        let mut b = CsrBuilder::new_square(n);
        for i in 0..n {
            b.add(i, i, 3.5);
            if i > 0 {
                b.add(i, i - 1, -2.0);
            }
            if i + 1 < n {
                b.add(i, i + 1, -1.0);
            }
        }
        b.build()
    }

    const ALL: [LinearSolverKind; 6] = [
        LinearSolverKind::Tridiagonal,
        LinearSolverKind::BandedLu,
        LinearSolverKind::Sor,
        LinearSolverKind::Pcg,
        LinearSolverKind::BiCgStab,
        LinearSolverKind::Gmres,
    ];

    #[test]
    fn test_every_backend_solves_spd_system() {
        let a = laplacian_1d(25, 0.1);
        let rhs: Vec<f64> = (0..25).map(|i| 1.0 + 0.1 * i as f64).collect();
        for kind in ALL {
            let solver = build_solver(&LinearSolverConfig::with_kind(kind)).unwrap();
            let mut x = vec![0.0; 25];
            let stats = solver.solve(&a, &rhs, &mut x).unwrap();
            let res = residual_norm(&a, &rhs, &x);
            assert!(
                res < 1e-8,
                "{} residual {res} too large ({} iterations)",
                solver.name(),
                stats.iterations
            );
        }
    }

    #[test]
    fn test_nonsymmetric_backends_agree() {
        let a = nonsymmetric(30);
        let rhs = vec![1.0; 30];
        let mut reference = vec![0.0; 30];
        build_solver(&LinearSolverConfig::with_kind(LinearSolverKind::BandedLu))
            .unwrap()
            .solve(&a, &rhs, &mut reference)
            .unwrap();
        for kind in [
            LinearSolverKind::Tridiagonal,
            LinearSolverKind::Sor,
            LinearSolverKind::BiCgStab,
            LinearSolverKind::Gmres,
        ] {
            let solver = build_solver(&LinearSolverConfig::with_kind(kind)).unwrap();
            let mut x = vec![0.0; 30];
            solver.solve(&a, &rhs, &mut x).unwrap();
            for (xi, ri) in x.iter().zip(reference.iter()) {
                assert!((xi - ri).abs() < 1e-7, "{}: {xi} vs {ri}", solver.name());
            }
        }
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let a = laplacian_1d(4, 0.0);
        let solver = build_solver(&LinearSolverConfig::default()).unwrap();
        let mut x = vec![0.0; 4];
        let err = solver.solve(&a, &[1.0; 3], &mut x).unwrap_err();
        assert!(matches!(err, FvmError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_zero_rhs_gives_zero_solution() {
        let a = laplacian_1d(10, 0.5);
        for kind in ALL {
            let solver = build_solver(&LinearSolverConfig::with_kind(kind)).unwrap();
            let mut x = vec![0.0; 10];
            let stats = solver.solve(&a, &[0.0; 10], &mut x).unwrap();
            assert!(x.iter().all(|v| v.abs() < 1e-14), "{}", solver.name());
            assert!(stats.residual < 1e-14);
        }
    }

    #[test]
    fn test_singular_matrix_reports_unsolvable() {
        let a = CsrBuilder::new_square(3).build();
        let mut x = vec![0.0; 3];
        for kind in ALL {
            let solver = build_solver(&LinearSolverConfig::with_kind(kind)).unwrap();
            let err = solver.solve(&a, &[1.0; 3], &mut x).unwrap_err();
            assert!(err.is_recoverable(), "{}: {err}", solver.name());
        }
    }

    /// Closed-wall diffusion with a tiny transient diagonal, as produced by
    /// very large time steps: `‖b‖₂` is far below the entries of `A`.
    fn stiff_closed_diffusion(n: usize, transient: f64) -> CsrMatrix {
        let mut b = CsrBuilder::new_square(n);
        for i in 0..n {
            b.add(i, i, transient);
            for j in [i.checked_sub(1), (i + 1 < n).then_some(i + 1)].into_iter().flatten() {
                b.add(i, i, 1.0);
                b.add(i, j, -1.0);
            }
        }
        b.build()
    }

    #[test]
    fn test_target_has_absolute_floor() {
        let small = vec![1e-6; 4];
        assert_eq!(target_residual(1e-12, 1e-12, &small), 1e-12);
        assert_eq!(target_residual(1e-6, 1e-12, &[3.0, 4.0]), 5e-6);
        assert_eq!(target_residual(1e-12, 1e-10, &[0.0; 3]), 1e-10);
    }

    #[test]
    fn test_krylov_backends_solve_small_rhs_stiff_system() {
        let n = 40;
        let a = stiff_closed_diffusion(n, 1e-4);
        let rhs: Vec<f64> = (0..n)
            .map(|i| 1e-4 * if i < n / 2 { 0.3 } else { 0.6 })
            .collect();
        assert!(norm2(&rhs) < 1e-3);
        for kind in [
            LinearSolverKind::Pcg,
            LinearSolverKind::BiCgStab,
            LinearSolverKind::Gmres,
        ] {
            let mut cfg = LinearSolverConfig::with_kind(kind);
            cfg.restart = n;
            let solver = build_solver(&cfg).unwrap();
            let mut x = vec![0.45; n];
            let stats = solver
                .solve(&a, &rhs, &mut x)
                .unwrap_or_else(|e| panic!("{}: {e}", solver.name()));
            assert!(stats.residual <= cfg.abs_tolerance, "{}", solver.name());
            let mass: f64 = x.iter().sum::<f64>() * 1e-4;
            let expected: f64 = rhs.iter().sum();
            assert!((mass - expected).abs() < 1e-9, "{}", solver.name());
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut cfg = LinearSolverConfig::with_kind(LinearSolverKind::Sor);
        cfg.omega = 2.5;
        assert!(build_solver(&cfg).is_err());
    }
}
