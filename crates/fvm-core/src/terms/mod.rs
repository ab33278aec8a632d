// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — Terms
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Discretisation terms.
//!
//! An equation reads `transient + convection + diffusion = source`, where
//! the diffusion term is `-∇·(Γ∇φ)`. Every term adds its contribution to
//! the same [`LinearSystem`]; the order of the terms only affects rounding.

pub mod convection;
pub mod diffusion;
pub mod source;
pub mod transient;

use fvm_types::config::ConvectionScheme;
use fvm_types::error::{FvmError, FvmResult};
use fvm_types::mesh::Mesh;

use crate::boundary::BoundaryConditions;
use crate::coefficient::Coefficient;
use crate::field::{FieldId, FieldStore};
use crate::system::LinearSystem;

pub use convection::{ConvectionTerm, Velocity};
pub use diffusion::DiffusionTerm;
pub use source::SourceTerm;
pub use transient::TransientTerm;

/// Everything a term may read while assembling.
pub struct AssemblyContext<'a> {
    pub store: &'a FieldStore,
    pub mesh: &'a Mesh,
    /// The unknown of the equation being assembled.
    pub var: FieldId,
    pub dt: f64,
    pub boundary: &'a BoundaryConditions,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Diffusion(DiffusionTerm),
    Convection(ConvectionTerm),
    Transient(TransientTerm),
    Source(SourceTerm),
}

impl Term {
    /// `-∇·(Γ∇φ)`.
    pub fn diffusion(coefficient: impl Into<Coefficient>) -> Self {
        Term::Diffusion(DiffusionTerm {
            coefficient: coefficient.into(),
        })
    }

    /// `∇·(u φ)`.
    pub fn convection(velocity: Velocity, scheme: ConvectionScheme) -> Self {
        Term::Convection(ConvectionTerm { velocity, scheme })
    }

    /// `V/dt · (φ - φ_old)`.
    pub fn transient() -> Self {
        Term::Transient(TransientTerm {
            density: Coefficient::Constant(1.0),
        })
    }

    /// `ρV/dt · (φ - φ_old)`.
    pub fn transient_with(density: impl Into<Coefficient>) -> Self {
        Term::Transient(TransientTerm {
            density: density.into(),
        })
    }

    /// Explicit source `S_c`.
    pub fn source(explicit: impl Into<Coefficient>) -> Self {
        Term::Source(SourceTerm {
            explicit: Some(explicit.into()),
            implicit: None,
        })
    }

    /// Implicit source `S_p · φ`.
    pub fn implicit_source(implicit: impl Into<Coefficient>) -> Self {
        Term::Source(SourceTerm {
            explicit: None,
            implicit: Some(implicit.into()),
        })
    }

    /// Linearised source `S_c + S_p · φ`.
    pub fn linear_source(explicit: impl Into<Coefficient>, implicit: impl Into<Coefficient>) -> Self {
        Term::Source(SourceTerm {
            explicit: Some(explicit.into()),
            implicit: Some(implicit.into()),
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Term::Diffusion(_) => "diffusion",
            Term::Convection(_) => "convection",
            Term::Transient(_) => "transient",
            Term::Source(_) => "source",
        }
    }

    pub fn assemble(&self, ctx: &AssemblyContext<'_>, system: &mut LinearSystem) -> FvmResult<()> {
        match self {
            Term::Diffusion(t) => t.assemble(ctx, system),
            Term::Convection(t) => t.assemble(ctx, system),
            Term::Transient(t) => t.assemble(ctx, system),
            Term::Source(t) => t.assemble(ctx, system),
        }
    }

    /// Every field this term reads besides the unknown.
    pub fn dependencies(&self) -> Vec<FieldId> {
        match self {
            Term::Diffusion(t) => t.coefficient.field().into_iter().collect(),
            Term::Convection(t) => t.velocity.dependencies(),
            Term::Transient(t) => t.density.field().into_iter().collect(),
            Term::Source(t) => t
                .explicit
                .iter()
                .chain(t.implicit.iter())
                .filter_map(Coefficient::field)
                .collect(),
        }
    }

    /// Location and rank checks of the fields this term reads.
    pub fn validate(&self, store: &FieldStore) -> FvmResult<()> {
        match self {
            Term::Diffusion(t) => t.coefficient.validate(store),
            Term::Convection(t) => t.velocity.validate(store),
            Term::Transient(t) => {
                t.density.validate(store)?;
                if matches!(t.density, Coefficient::Face(_)) {
                    return Err(FvmError::InvalidParameter(
                        "transient density must be a cell coefficient".to_string(),
                    ));
                }
                Ok(())
            }
            Term::Source(t) => {
                for c in t.explicit.iter().chain(t.implicit.iter()) {
                    c.validate(store)?;
                    if matches!(c, Coefficient::Face(_)) {
                        return Err(FvmError::InvalidParameter(
                            "source strength must be a cell coefficient".to_string(),
                        ));
                    }
                }
                Ok(())
            }
        }
    }
}
