// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — Property-Based Tests (proptest) for fvm-types
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for fvm-types using proptest.
//!
//! Covers: structured mesh construction invariants, face orientation,
//! volume/area closure.

use fvm_types::mesh::Mesh;
use proptest::prelude::*;

// ── Structured Grid Invariants ───────────────────────────────────────

proptest! {
    /// Cell and face counts match the grid dimensions.
    #[test]
    fn grid_2d_counts(nx in 1usize..30, ny in 1usize..30) {
        let mesh = Mesh::grid_2d(nx, ny, 1.0, 1.0).unwrap();
        prop_assert_eq!(mesh.n_cells(), nx * ny);
        prop_assert_eq!(mesh.n_faces(), (nx + 1) * ny + nx * (ny + 1));
        prop_assert_eq!(mesh.boundary_faces().count(), 2 * (nx + ny));
    }

    /// Total volume equals the domain area.
    #[test]
    fn grid_2d_volume_closure(
        nx in 1usize..20,
        ny in 1usize..20,
        dx in 0.01f64..5.0,
        dy in 0.01f64..5.0,
    ) {
        let mesh = Mesh::grid_2d(nx, ny, dx, dy).unwrap();
        let expected = nx as f64 * dx * ny as f64 * dy;
        prop_assert!((mesh.total_volume() - expected).abs() < 1e-9 * expected.max(1.0));
    }

    /// For every cell the outward-oriented face area vectors sum to zero
    /// (closed control volume).
    #[test]
    fn grid_2d_cells_are_closed(nx in 1usize..15, ny in 1usize..15) {
        let mesh = Mesh::grid_2d(nx, ny, 0.7, 1.3).unwrap();
        for (i, cell) in mesh.cells().iter().enumerate() {
            let mut sum = [0.0f64; 2];
            for &k in &cell.faces {
                let f = mesh.face(k);
                let sign = if f.owner == i { 1.0 } else { -1.0 };
                sum[0] += sign * f.normal[0] * f.area;
                sum[1] += sign * f.normal[1] * f.area;
            }
            prop_assert!(sum[0].abs() < 1e-12 && sum[1].abs() < 1e-12,
                "cell {} not closed: {:?}", i, sum);
        }
    }

    /// Interior normals point from owner to neighbour.
    #[test]
    fn grid_1d_orientation(nx in 2usize..100, dx in 0.01f64..10.0) {
        let mesh = Mesh::grid_1d(nx, dx).unwrap();
        for (_, f) in mesh.interior_faces() {
            let p = mesh.cell(f.owner).center[0];
            let n = mesh.cell(f.neighbor.unwrap()).center[0];
            prop_assert!((n - p) * f.normal[0] > 0.0);
            prop_assert!(((n - p).abs() - f.distance).abs() < 1e-9 * dx);
        }
    }
}
