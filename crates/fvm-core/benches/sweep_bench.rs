// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — Equation Sweep Benchmark
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use fvm_core::equation::Equation;
use fvm_core::field::{FieldId, FieldStore, InitialValue, Location};
use fvm_core::terms::convection::Velocity;
use fvm_core::terms::Term;
use fvm_types::config::{ConvectionScheme, LinearSolverConfig, LinearSolverKind};
use fvm_types::mesh::Mesh;
use std::hint::black_box;
use std::sync::Arc;

/// Gaussian bump on an `n × n` unit-spaced grid.
fn bump_store(n: usize) -> (FieldStore, FieldId) {
    let mesh = Arc::new(Mesh::grid_2d(n, n, 1.0, 1.0).expect("grid"));
    let centre = n as f64 / 2.0;
    let mut store = FieldStore::new(mesh);
    let phi = store
        .create(
            "phi",
            Location::Cell,
            0,
            InitialValue::Function(Box::new(move |[x, y]| {
                let r2 = (x - centre).powi(2) + (y - centre).powi(2);
                (-r2 / (n as f64)).exp()
            })),
        )
        .expect("phi");
    (store, phi)
}

fn convection_diffusion(store: &FieldStore, phi: FieldId, kind: LinearSolverKind) -> Equation {
    let mut cfg = LinearSolverConfig::with_kind(kind);
    cfg.tolerance = 1e-10;
    cfg.max_iterations = 20_000;
    Equation::builder("phi", phi)
        .term(Term::transient())
        .term(Term::diffusion(1.0))
        .term(Term::convection(
            Velocity::Constant([0.5, 0.25]),
            ConvectionScheme::Upwind,
        ))
        .solver(cfg)
        .build(store)
        .expect("equation")
}

fn bench_assemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble");
    for n in [32usize, 64] {
        let (store, phi) = bump_store(n);
        let eq = convection_diffusion(&store, phi, LinearSolverKind::BandedLu);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let (a, rhs) = eq.assemble(&store, 0.1).expect("assemble");
                black_box((a.nnz(), rhs.len()));
            })
        });
    }
    group.finish();
}

fn bench_sweep_32(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep_32x32");
    group.sample_size(10);
    for kind in [
        LinearSolverKind::BandedLu,
        LinearSolverKind::BiCgStab,
        LinearSolverKind::Gmres,
    ] {
        let (mut store, phi) = bump_store(32);
        let eq = convection_diffusion(&store, phi, kind);
        group.bench_function(eq.solver_name(), |b| {
            b.iter(|| {
                let report = eq.sweep(&mut store, 0.1, 1.0);
                black_box(report.map(|r| r.residual).unwrap_or(f64::NAN));
                let _ = store.restore_old(phi);
            })
        });
    }
    group.finish();
}

fn bench_face_interpolation(c: &mut Criterion) {
    let (mut store, phi) = bump_store(128);
    c.bench_function("face_values_128x128", |b| {
        b.iter(|| {
            // Rewriting the field drops the cached face values.
            let _ = store.set_value(phi, 1.0, Some(&[0]));
            black_box(store.face_values(phi).map(|f| f.len()).unwrap_or(0));
        })
    });
}

criterion_group!(benches, bench_assemble, bench_sweep_32, bench_face_interpolation);
criterion_main!(benches);
