// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — Boundary Conditions
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Boundary conditions on lists of boundary faces.
//!
//! Faces without a condition are no-flux for diffusion and impermeable
//! for convection.

use fvm_types::error::{FvmError, FvmResult};
use fvm_types::mesh::Mesh;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryKind {
    /// Essential: the face value is prescribed.
    FixedValue(f64),
    /// Natural: flux per unit area, positive into the domain.
    FixedFlux(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryCondition {
    pub faces: Vec<usize>,
    pub kind: BoundaryKind,
}

impl BoundaryCondition {
    pub fn fixed_value(faces: Vec<usize>, value: f64) -> Self {
        BoundaryCondition {
            faces,
            kind: BoundaryKind::FixedValue(value),
        }
    }

    pub fn fixed_flux(faces: Vec<usize>, flux: f64) -> Self {
        BoundaryCondition {
            faces,
            kind: BoundaryKind::FixedFlux(flux),
        }
    }
}

/// Per-face lookup of the conditions of one equation.
#[derive(Debug, Clone, Default)]
pub struct BoundaryConditions {
    by_face: Vec<Option<BoundaryKind>>,
}

impl BoundaryConditions {
    /// No conditions: every boundary face is closed.
    pub fn none(mesh: &Mesh) -> Self {
        BoundaryConditions {
            by_face: vec![None; mesh.n_faces()],
        }
    }

    pub fn new(mesh: &Mesh, equation: &str, conditions: &[BoundaryCondition]) -> FvmResult<Self> {
        let mut by_face = vec![None; mesh.n_faces()];
        for condition in conditions {
            match condition.kind {
                BoundaryKind::FixedValue(v) | BoundaryKind::FixedFlux(v) if !v.is_finite() => {
                    return Err(FvmError::InvalidParameter(format!(
                        "boundary value of equation '{equation}' must be finite, got {v}"
                    )));
                }
                _ => {}
            }
            for &face in &condition.faces {
                if face >= mesh.n_faces() {
                    return Err(FvmError::shape(
                        format!("boundary face of equation '{equation}'"),
                        mesh.n_faces(),
                        face,
                    ));
                }
                if !mesh.face(face).is_boundary() {
                    return Err(FvmError::ShapeMismatch {
                        what: format!(
                            "face {face} in equation '{equation}' is interior, not a boundary face"
                        ),
                        expected: 1,
                        found: 2,
                    });
                }
                if by_face[face].is_some() {
                    return Err(FvmError::BoundaryConflict {
                        face,
                        equation: equation.to_string(),
                    });
                }
                by_face[face] = Some(condition.kind);
            }
        }
        Ok(BoundaryConditions { by_face })
    }

    #[inline]
    pub fn get(&self, face: usize) -> Option<BoundaryKind> {
        self.by_face.get(face).copied().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.by_face.iter().all(Option::is_none)
    }

    /// Faces carrying a fixed value.
    pub fn fixed_value_faces(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.by_face.iter().enumerate().filter_map(|(k, c)| match c {
            Some(BoundaryKind::FixedValue(v)) => Some((k, *v)),
            _ => None,
        })
    }
}
