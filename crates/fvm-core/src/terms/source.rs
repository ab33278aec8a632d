// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — Source Term
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Linearised volumetric source `S = S_c + S_p φ`.
//!
//! `S_c V` goes to the right-hand side and `-S_p V` to the diagonal, so a
//! negative `S_p` (sink proportional to φ) strengthens the diagonal.

use fvm_types::error::FvmResult;

use super::AssemblyContext;
use crate::coefficient::Coefficient;
use crate::system::LinearSystem;

#[derive(Debug, Clone, PartialEq)]
pub struct SourceTerm {
    pub explicit: Option<Coefficient>,
    pub implicit: Option<Coefficient>,
}

impl SourceTerm {
    pub fn assemble(&self, ctx: &AssemblyContext<'_>, system: &mut LinearSystem) -> FvmResult<()> {
        if let Some(explicit) = &self.explicit {
            let s_c = explicit.cell_values(ctx.store)?;
            for (i, cell) in ctx.mesh.cells().iter().enumerate() {
                system.add_rhs(i, s_c[i] * cell.volume);
            }
        }
        if let Some(implicit) = &self.implicit {
            let s_p = implicit.cell_values(ctx.store)?;
            for (i, cell) in ctx.mesh.cells().iter().enumerate() {
                system.add_diagonal(i, -s_p[i] * cell.volume);
            }
        }
        Ok(())
    }
}
