// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — Diffusion Term
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Two-point flux approximation of `-∇·(Γ∇φ)`.

use fvm_types::error::FvmResult;

use super::AssemblyContext;
use crate::boundary::BoundaryKind;
use crate::coefficient::Coefficient;
use crate::system::LinearSystem;

#[derive(Debug, Clone, PartialEq)]
pub struct DiffusionTerm {
    pub coefficient: Coefficient,
}

impl DiffusionTerm {
    pub fn assemble(&self, ctx: &AssemblyContext<'_>, system: &mut LinearSystem) -> FvmResult<()> {
        let gamma = self.coefficient.face_values(ctx.store)?;
        for (k, face) in ctx.mesh.faces().iter().enumerate() {
            // Face conductance Γ_f A_f / d_f
            let c = gamma[k] * face.area / face.distance;
            let p = face.owner;
            match face.neighbor {
                Some(n) => {
                    system.add_diagonal(p, c);
                    system.add_coefficient(p, n, -c);
                    system.add_diagonal(n, c);
                    system.add_coefficient(n, p, -c);
                }
                None => match ctx.boundary.get(k) {
                    Some(BoundaryKind::FixedValue(v)) => {
                        system.add_diagonal(p, c);
                        system.add_rhs(p, c * v);
                    }
                    Some(BoundaryKind::FixedFlux(q)) => system.add_rhs(p, q * face.area),
                    None => {}
                },
            }
        }
        Ok(())
    }
}
