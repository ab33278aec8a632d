// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — Property-Based Tests (proptest) for fvm-core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for fvm-core using proptest.
//!
//! Covers: conservation, relaxation to the mean, upwind boundedness,
//! idempotence of converged sweeps.

use std::sync::Arc;

use approx::assert_abs_diff_eq;
use fvm_core::boundary::BoundaryCondition;
use fvm_core::coefficient::Coefficient;
use fvm_core::equation::Equation;
use fvm_core::field::{FieldId, FieldStore};
use fvm_core::iterator::{CoupledIterator, SweepControl};
use fvm_core::terms::{Term, Velocity};
use fvm_types::config::{ConvectionScheme, LinearSolverConfig, LinearSolverKind};
use fvm_types::mesh::Mesh;
use proptest::prelude::*;

fn store_1d(values: &[f64], dx: f64) -> (FieldStore, FieldId) {
    let mut store = FieldStore::new(Arc::new(Mesh::grid_1d(values.len(), dx).unwrap()));
    let phi = store.cell_scalar("phi", values.to_vec()).unwrap();
    (store, phi)
}

fn direct() -> LinearSolverConfig {
    LinearSolverConfig::with_kind(LinearSolverKind::BandedLu)
}

// ── Conservation ─────────────────────────────────────────────────────

proptest! {
    /// Closed diffusion keeps Σ φ V on a 2D grid, for any conductivity field.
    #[test]
    fn diffusion_conserves_2d(
        values in prop::collection::vec(0.0f64..1.0, 12),
        gamma in prop::collection::vec(0.1f64..10.0, 12),
        dt in 0.01f64..10.0,
    ) {
        let mesh = Arc::new(Mesh::grid_2d(4, 3, 0.5, 2.0).unwrap());
        let mut store = FieldStore::new(mesh);
        let phi = store.cell_scalar("phi", values).unwrap();
        let k = store.cell_scalar("k", gamma).unwrap();
        let eq = Equation::builder("phi", phi)
            .term(Term::transient())
            .term(Term::diffusion(Coefficient::CellHarmonic(k)))
            .solver(direct())
            .build(&store)
            .unwrap();
        let before = store.integral(phi).unwrap();
        eq.sweep(&mut store, dt, 1.0).unwrap();
        let after = store.integral(phi).unwrap();
        prop_assert!((before - after).abs() < 1e-11, "{} vs {}", before, after);
    }

    /// Upwind convection with closed walls conserves mass too.
    #[test]
    fn convection_conserves(
        values in prop::collection::vec(0.0f64..1.0, 3..30),
        u in -5.0f64..5.0,
    ) {
        let (mut store, phi) = store_1d(&values, 1.0);
        let eq = Equation::builder("phi", phi)
            .term(Term::transient())
            .term(Term::convection(Velocity::Constant([u, 0.0]), ConvectionScheme::Upwind))
            .term(Term::diffusion(0.1))
            .solver(direct())
            .build(&store)
            .unwrap();
        let before = store.integral(phi).unwrap();
        eq.sweep(&mut store, 1.0, 1.0).unwrap();
        prop_assert!((before - store.integral(phi).unwrap()).abs() < 1e-11);
    }
}

// ── Boundedness ──────────────────────────────────────────────────────

proptest! {
    /// Implicit upwind convection-diffusion creates no new extrema when the
    /// boundary values lie inside the initial range.
    #[test]
    fn upwind_is_bounded(
        values in prop::collection::vec(-1.0f64..1.0, 3..40),
        u in -20.0f64..20.0,
        d in 0.0f64..2.0,
        dt in 0.01f64..10.0,
    ) {
        let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let (mut store, phi) = store_1d(&values, 1.0);
        let eq = Equation::builder("phi", phi)
            .term(Term::transient())
            .term(Term::convection(Velocity::Constant([u, 0.0]), ConvectionScheme::Upwind))
            .term(Term::diffusion(d))
            .boundary(BoundaryCondition::fixed_value(store.mesh().left_faces(), values[0]))
            .boundary(BoundaryCondition::fixed_value(
                store.mesh().right_faces(),
                values[values.len() - 1],
            ))
            .solver(LinearSolverConfig::with_kind(LinearSolverKind::Tridiagonal))
            .build(&store)
            .unwrap();
        eq.sweep(&mut store, dt, 1.0).unwrap();
        for &v in store.scalar(phi).unwrap() {
            prop_assert!(v >= lo - 1e-12 && v <= hi + 1e-12, "{} outside [{}, {}]", v, lo, hi);
        }
    }
}

// ── Idempotence ──────────────────────────────────────────────────────

proptest! {
    /// Re-sweeping a converged (linear) equation changes nothing.
    #[test]
    fn converged_sweep_is_idempotent(
        values in prop::collection::vec(0.0f64..1.0, 2..25),
        d in 0.1f64..3.0,
    ) {
        let (mut store, phi) = store_1d(&values, 1.0);
        let eq = Equation::builder("phi", phi)
            .term(Term::transient())
            .term(Term::diffusion(d))
            .solver(LinearSolverConfig::with_kind(LinearSolverKind::Tridiagonal))
            .build(&store)
            .unwrap();
        eq.sweep(&mut store, 1.0, 1.0).unwrap();
        let converged = store.scalar(phi).unwrap().to_vec();
        let report = eq.sweep(&mut store, 1.0, 1.0).unwrap();
        prop_assert!(report.max_change < 1e-12);
        prop_assert!(report.residual < 1e-12);
        for (a, b) in converged.iter().zip(store.scalar(phi).unwrap()) {
            prop_assert!((a - b).abs() < 1e-12);
        }
    }
}

// ── Steady state ─────────────────────────────────────────────────────

proptest! {
    /// Closed diffusion ends at the volume-weighted mean of the initial
    /// field, with the total held fixed along the way.
    #[test]
    fn closed_diffusion_relaxes_to_volume_weighted_mean(
        values in prop::collection::vec(0.0f64..1.0, 2..30),
        dx in 0.1f64..3.0,
        d in 0.2f64..5.0,
    ) {
        let length = values.len() as f64 * dx;
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let (mut store, phi) = store_1d(&values, dx);
        let eq = Equation::builder("phi", phi)
            .term(Term::transient())
            .term(Term::diffusion(d))
            .solver(LinearSolverConfig::with_kind(LinearSolverKind::Tridiagonal))
            .build(&store)
            .unwrap();
        let mut it = CoupledIterator::new(5).unwrap();
        it.add(eq, SweepControl::new(1e-10, 1.0).unwrap()).unwrap();
        // Slowest mode decays by ~1/(1 + π²) per step.
        let dt = length * length / d;
        it.run(&mut store, dt, 16).unwrap();

        prop_assert!(
            store.allclose(phi, mean, 1e-7, 1e-7).unwrap(),
            "{:?} not at mean {}",
            store.scalar(phi).unwrap(),
            mean
        );
        let integral = store.integral(phi).unwrap();
        prop_assert!((integral - mean * length).abs() < 1e-9 * length);
    }
}

#[test]
fn sequential_coupling_converges_for_two_unknowns() {
    // a and b exchange through linear sources: da/dt = b - a, db/dt = a - b.
    let mut store = FieldStore::new(Arc::new(Mesh::grid_1d(4, 1.0).unwrap()));
    let a = store.cell_scalar("a", 1.0).unwrap();
    let b = store.cell_scalar("b", 0.0).unwrap();
    let eq_a = Equation::builder("a", a)
        .term(Term::transient())
        .term(Term::linear_source(Coefficient::Cell(b), -1.0))
        .build(&store)
        .unwrap();
    let eq_b = Equation::builder("b", b)
        .term(Term::transient())
        .term(Term::linear_source(Coefficient::Cell(a), -1.0))
        .build(&store)
        .unwrap();
    let control = SweepControl::new(1e-10, 1.0).unwrap();
    let mut it = CoupledIterator::new(100).unwrap();
    it.add(eq_a, control).unwrap();
    it.add(eq_b, control).unwrap();
    let sweeps = it.timestep(&mut store, 0.5).unwrap();
    assert!(sweeps > 2);
    // Backward Euler at dt = 0.5: 1.5 a - 0.5 b = 1, 1.5 b - 0.5 a = 0.
    assert!(store.allclose(a, 0.75, 1e-8, 1e-8).unwrap());
    assert!(store.allclose(b, 0.25, 1e-8, 1e-8).unwrap());
    let total = store.integral(a).unwrap() + store.integral(b).unwrap();
    assert_abs_diff_eq!(total, 4.0, epsilon = 1e-8);
}
