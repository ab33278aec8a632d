// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — Transient Term
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Backward-Euler time derivative `ρV/dt · (φ - φ_old)`.

use fvm_types::error::{FvmError, FvmResult};

use super::AssemblyContext;
use crate::coefficient::Coefficient;
use crate::system::LinearSystem;

#[derive(Debug, Clone, PartialEq)]
pub struct TransientTerm {
    pub density: Coefficient,
}

impl TransientTerm {
    pub fn assemble(&self, ctx: &AssemblyContext<'_>, system: &mut LinearSystem) -> FvmResult<()> {
        if !ctx.dt.is_finite() || ctx.dt <= 0.0 {
            return Err(FvmError::InvalidParameter(format!(
                "time step must be finite and > 0, got {}",
                ctx.dt
            )));
        }
        let rho = self.density.cell_values(ctx.store)?;
        let old = ctx.store.old_scalar(ctx.var)?;
        for (i, cell) in ctx.mesh.cells().iter().enumerate() {
            let coeff = rho[i] * cell.volume / ctx.dt;
            system.add_diagonal(i, coeff);
            system.add_rhs(i, coeff * old[i]);
        }
        Ok(())
    }
}
