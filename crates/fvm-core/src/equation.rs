// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — Equation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! An ordered sum of terms bound to one unknown.
//!
//! A sweep assembles `A φ = b` from the current field values (the unknowns
//! of other equations are frozen inputs), records `‖A φ - b‖₂` for the
//! values on entry, solves, under-relaxes and writes the unknown back.

use std::fmt;

use fvm_math::csr::CsrMatrix;
use fvm_math::solver::{build_solver, LinearSolve};
use fvm_math::vector_ops::norm2;
use fvm_types::config::LinearSolverConfig;
use fvm_types::error::{FvmError, FvmResult};
use serde::Serialize;

use crate::boundary::{BoundaryCondition, BoundaryConditions};
use crate::field::{FieldId, FieldStore, Location};
use crate::system::LinearSystem;
use crate::terms::{AssemblyContext, Term};

/// Result of one [`Equation::sweep`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepReport {
    /// `‖A φ - b‖₂` evaluated before the update.
    pub residual: f64,
    /// Largest absolute change written to the unknown.
    pub max_change: f64,
    /// Iterations reported by the linear backend.
    pub iterations: usize,
}

pub struct Equation {
    name: String,
    var: FieldId,
    terms: Vec<Term>,
    boundary: BoundaryConditions,
    solver: Box<dyn LinearSolve>,
}

impl fmt::Debug for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Equation")
            .field("name", &self.name)
            .field("var", &self.var)
            .field(
                "terms",
                &self.terms.iter().map(Term::label).collect::<Vec<_>>(),
            )
            .field("solver", &self.solver.name())
            .finish()
    }
}

pub struct EquationBuilder {
    name: String,
    var: FieldId,
    terms: Vec<Term>,
    conditions: Vec<BoundaryCondition>,
    solver: LinearSolverConfig,
}

impl EquationBuilder {
    pub fn term(mut self, term: Term) -> Self {
        self.terms.push(term);
        self
    }

    pub fn boundary(mut self, condition: BoundaryCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn solver(mut self, config: LinearSolverConfig) -> Self {
        self.solver = config;
        self
    }

    /// Validate against the store and freeze the equation.
    pub fn build(self, store: &FieldStore) -> FvmResult<Equation> {
        if self.terms.is_empty() {
            return Err(FvmError::InvalidParameter(format!(
                "equation '{}' has no terms",
                self.name
            )));
        }
        if !store.contains(self.var) {
            return Err(FvmError::UnknownField(format!(
                "unknown {} of equation '{}'",
                self.var, self.name
            )));
        }
        if store.is_derived(self.var)? {
            return Err(FvmError::ReadOnlyField(store.name(self.var)?.to_string()));
        }
        if store.location(self.var)? != Location::Cell || store.rank(self.var)? != 0 {
            return Err(FvmError::InvalidParameter(format!(
                "unknown '{}' of equation '{}' must be a scalar cell field",
                store.name(self.var)?,
                self.name
            )));
        }
        for term in &self.terms {
            for dep in term.dependencies() {
                if !store.contains(dep) {
                    return Err(FvmError::UnknownField(format!(
                        "{dep} read by the {} term of equation '{}'",
                        term.label(),
                        self.name
                    )));
                }
            }
            term.validate(store)?;
        }
        let boundary = BoundaryConditions::new(store.mesh(), &self.name, &self.conditions)?;
        let solver = build_solver(&self.solver)?;
        Ok(Equation {
            name: self.name,
            var: self.var,
            terms: self.terms,
            boundary,
            solver,
        })
    }
}

fn check_dt(dt: f64) -> FvmResult<()> {
    if !dt.is_finite() || dt <= 0.0 {
        return Err(FvmError::InvalidParameter(format!(
            "time step must be finite and > 0, got {dt}"
        )));
    }
    Ok(())
}

impl Equation {
    pub fn builder(name: &str, var: FieldId) -> EquationBuilder {
        EquationBuilder {
            name: name.to_string(),
            var,
            terms: Vec::new(),
            conditions: Vec::new(),
            solver: LinearSolverConfig::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn var(&self) -> FieldId {
        self.var
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn boundary(&self) -> &BoundaryConditions {
        &self.boundary
    }

    pub fn solver_name(&self) -> &'static str {
        self.solver.name()
    }

    /// Assemble `A φ = b` from the current store contents.
    pub fn assemble(&self, store: &FieldStore, dt: f64) -> FvmResult<(CsrMatrix, Vec<f64>)> {
        check_dt(dt)?;
        let mesh = store.mesh();
        let ctx = AssemblyContext {
            store,
            mesh,
            var: self.var,
            dt,
            boundary: &self.boundary,
        };
        let mut system = LinearSystem::new(mesh.n_cells());
        for term in &self.terms {
            term.assemble(&ctx, &mut system)?;
        }
        Ok(system.finish())
    }

    fn residual_of(matrix: &CsrMatrix, rhs: &[f64], phi: &[f64]) -> f64 {
        let mut r = vec![0.0; rhs.len()];
        matrix.residual_into(phi, rhs, &mut r);
        norm2(&r)
    }

    /// `‖A φ - b‖₂` for the current values, without solving.
    pub fn residual(&self, store: &FieldStore, dt: f64) -> FvmResult<f64> {
        let (matrix, rhs) = self.assemble(store, dt)?;
        Ok(Self::residual_of(&matrix, &rhs, store.scalar(self.var)?))
    }

    /// Assemble, solve and write back `old + ω (solved - old)`.
    pub fn sweep(
        &self,
        store: &mut FieldStore,
        dt: f64,
        underrelaxation: f64,
    ) -> FvmResult<SweepReport> {
        if !(underrelaxation > 0.0 && underrelaxation <= 1.0) {
            return Err(FvmError::InvalidParameter(format!(
                "under-relaxation of '{}' must lie in (0, 1], got {underrelaxation}",
                self.name
            )));
        }
        let (matrix, rhs) = self.assemble(store, dt)?;
        let current = store.scalar(self.var)?.to_vec();
        let residual = Self::residual_of(&matrix, &rhs, &current);

        let mut solved = current.clone();
        let stats = self.solver.solve(&matrix, &rhs, &mut solved)?;

        let mut max_change: f64 = 0.0;
        let updated: Vec<f64> = current
            .iter()
            .zip(solved.iter())
            .map(|(&old, &new)| {
                let value = old + underrelaxation * (new - old);
                max_change = max_change.max((value - old).abs());
                value
            })
            .collect();
        store.set_scalars(self.var, &updated, None)?;

        log::trace!(
            "equation '{}': residual {residual:.3e}, max change {max_change:.3e}, {} linear iterations",
            self.name,
            stats.iterations
        );
        Ok(SweepReport {
            residual,
            max_change,
            iterations: stats.iterations,
        })
    }
}
