// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — Convection Term
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Convection `∇·(u φ)` from face volume fluxes `F = (u_f · n_f) A_f`.
//!
//! Upwind takes the face value from the cell the flux leaves; central
//! interpolates with the face weight. Each interior face adds equal and
//! opposite flux to its two cells, so column sums vanish. Boundary faces
//! with a fixed value convect that value in and the cell value out; all
//! other boundary faces are impermeable.

use fvm_types::config::ConvectionScheme;
use fvm_types::error::{FvmError, FvmResult};
use fvm_types::mesh::Mesh;

use super::AssemblyContext;
use crate::boundary::BoundaryKind;
use crate::coefficient::Coefficient;
use crate::field::{FieldId, FieldStore, Location};
use crate::system::LinearSystem;

#[derive(Debug, Clone, PartialEq)]
pub enum Velocity {
    Constant([f64; 2]),
    /// Rank-1 face field.
    FaceField(FieldId),
    /// Rank-1 cell field, interpolated to faces.
    CellField(FieldId),
    /// `u_f = scale_f · (∇field · n_f) n_f`, using the two-point normal
    /// gradient across the face. Expresses cross-diffusion
    /// `∇·(scale φ ∇field)` as convection of φ.
    ScaledGradient { field: FieldId, scale: Coefficient },
}

impl Velocity {
    pub fn dependencies(&self) -> Vec<FieldId> {
        match self {
            Velocity::Constant(_) => Vec::new(),
            Velocity::FaceField(id) | Velocity::CellField(id) => vec![*id],
            Velocity::ScaledGradient { field, scale } => {
                std::iter::once(*field).chain(scale.field()).collect()
            }
        }
    }

    pub fn validate(&self, store: &FieldStore) -> FvmResult<()> {
        let expect = |id: FieldId, location: Location, rank: usize| -> FvmResult<()> {
            if store.location(id)? != location || store.rank(id)? != rank {
                return Err(FvmError::InvalidParameter(format!(
                    "velocity field '{}' must be a rank-{rank} {location:?} field",
                    store.name(id)?
                )));
            }
            Ok(())
        };
        match self {
            Velocity::Constant(u) if !(u[0].is_finite() && u[1].is_finite()) => Err(
                FvmError::InvalidParameter(format!("velocity must be finite, got {u:?}")),
            ),
            Velocity::Constant(_) => Ok(()),
            Velocity::FaceField(id) => expect(*id, Location::Face, 1),
            Velocity::CellField(id) => expect(*id, Location::Cell, 1),
            Velocity::ScaledGradient { field, scale } => {
                expect(*field, Location::Cell, 0)?;
                scale.validate(store)
            }
        }
    }

    /// Volume flux through every face, positive along the face normal.
    pub fn face_fluxes(&self, store: &FieldStore, mesh: &Mesh) -> FvmResult<Vec<f64>> {
        let dim = mesh.dim();
        match self {
            Velocity::Constant(u) => Ok(mesh
                .faces()
                .iter()
                .map(|f| (0..dim).map(|c| u[c] * f.normal[c]).sum::<f64>() * f.area)
                .collect()),
            Velocity::FaceField(id) | Velocity::CellField(id) => {
                let u = store.face_values(*id)?;
                Ok(mesh
                    .faces()
                    .iter()
                    .enumerate()
                    .map(|(k, f)| {
                        let row = u.row(k);
                        (0..dim).map(|c| row[c] * f.normal[c]).sum::<f64>() * f.area
                    })
                    .collect())
            }
            Velocity::ScaledGradient { field, scale } => {
                let values = store.scalar(*field)?;
                let scale = scale.face_values(store)?;
                Ok(mesh
                    .faces()
                    .iter()
                    .enumerate()
                    .map(|(k, f)| match f.neighbor {
                        Some(n) => {
                            let normal_grad = (values[n] - values[f.owner]) / f.distance;
                            scale[k] * normal_grad * f.area
                        }
                        None => 0.0,
                    })
                    .collect())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvectionTerm {
    pub velocity: Velocity,
    pub scheme: ConvectionScheme,
}

impl ConvectionTerm {
    pub fn assemble(&self, ctx: &AssemblyContext<'_>, system: &mut LinearSystem) -> FvmResult<()> {
        let fluxes = self.velocity.face_fluxes(ctx.store, ctx.mesh)?;
        for (k, face) in ctx.mesh.faces().iter().enumerate() {
            let flux = fluxes[k];
            if flux == 0.0 {
                continue;
            }
            if !flux.is_finite() {
                return Err(FvmError::InvalidParameter(format!(
                    "non-finite convective flux {flux} on face {k}"
                )));
            }
            let p = face.owner;
            match face.neighbor {
                Some(n) => {
                    // Outflow of P through the face: F φ_f, inflow of N: -F φ_f.
                    let (wp, wn) = match self.scheme {
                        ConvectionScheme::Upwind => {
                            if flux > 0.0 {
                                (1.0, 0.0)
                            } else {
                                (0.0, 1.0)
                            }
                        }
                        ConvectionScheme::Central => (face.weight, 1.0 - face.weight),
                    };
                    system.add_diagonal(p, flux * wp);
                    system.add_coefficient(p, n, flux * wn);
                    system.add_diagonal(n, -flux * wn);
                    system.add_coefficient(n, p, -flux * wp);
                }
                None => {
                    if let Some(BoundaryKind::FixedValue(v)) = ctx.boundary.get(k) {
                        if flux > 0.0 {
                            system.add_diagonal(p, flux);
                        } else {
                            system.add_rhs(p, -flux * v);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
