// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — ElPhF Multi-Species Diffusion
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Substitutional diffusion on a lattice shared with a solvent.
//!
//! Each substitutional species `C_j` obeys
//!
//! ```text
//! ∂C_j/∂t = D_j ∇²C_j + D_j ∇·( C_j / (1 - S_j) ∇S_j ),   S_j = Σ_{i≠j} C_i
//! ```
//!
//! and the solvent fills the remaining sites, `1 - Σ C_i`. The cross term is
//! convection of `C_j` with face velocity `-D_j / (1 - S_j) ∇S_j`, so every
//! equation is linear in its own unknown once the other species are frozen.

use std::sync::Arc;

use fvm_core::coefficient::Coefficient;
use fvm_core::equation::Equation;
use fvm_core::field::{FieldId, FieldStore};
use fvm_core::iterator::{CoupledIterator, SweepControl};
use fvm_core::terms::{Term, Velocity};
use fvm_types::config::{
    ConvectionScheme, InitialProfile, LinearSolverConfig, ModelConfig, SolventParams,
    SpeciesParams,
};
use fvm_types::error::{FvmError, FvmResult};
use fvm_types::mesh::Mesh;

/// Physical inputs of the model.
///
/// Standard potential and barrier height are carried for every component
/// but only enter the electrochemical and phase terms, which this model
/// does not assemble.
#[derive(Debug, Clone)]
pub struct ElphfParameters {
    pub time_step_duration: f64,
    pub solvent: SolventParams,
    pub substitutionals: Vec<SpeciesParams>,
    pub convection_scheme: ConvectionScheme,
    pub linear_solver: LinearSolverConfig,
}

impl ElphfParameters {
    pub fn from_config(config: &ModelConfig) -> Self {
        ElphfParameters {
            time_step_duration: config.time_step_duration,
            solvent: config.solvent.clone(),
            substitutionals: config.substitutionals.clone(),
            convection_scheme: config.convection_scheme,
            linear_solver: config.linear_solver.clone(),
        }
    }

    pub fn validate(&self) -> FvmResult<()> {
        if !self.time_step_duration.is_finite() || self.time_step_duration <= 0.0 {
            return Err(FvmError::InvalidParameter(format!(
                "time step duration must be finite and > 0, got {}",
                self.time_step_duration
            )));
        }
        if self.substitutionals.is_empty() {
            return Err(FvmError::InvalidParameter(
                "at least one substitutional species is required".to_string(),
            ));
        }
        for species in &self.substitutionals {
            if !species.diffusivity.is_finite() || species.diffusivity < 0.0 {
                return Err(FvmError::InvalidParameter(format!(
                    "species '{}' diffusivity must be finite and >= 0, got {}",
                    species.name, species.diffusivity
                )));
            }
        }
        self.linear_solver.validate()
    }
}

/// Field handles of one substitutional species.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesFields {
    pub name: String,
    pub concentration: FieldId,
    /// `S_j`, the sum of every other substitutional.
    pub others: FieldId,
    /// `-D_j / (1 - S_j)`.
    pub cross_scale: FieldId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElphfFields {
    pub solvent: FieldId,
    pub substitutionals: Vec<SpeciesFields>,
}

impl ElphfFields {
    pub fn species(&self, name: &str) -> Option<&SpeciesFields> {
        self.substitutionals.iter().find(|s| s.name == name)
    }

    pub fn concentrations(&self) -> Vec<FieldId> {
        self.substitutionals.iter().map(|s| s.concentration).collect()
    }
}

/// Create the concentration fields (all zero) and their derived helpers.
pub fn make_fields(store: &mut FieldStore, params: &ElphfParameters) -> FvmResult<ElphfFields> {
    params.validate()?;
    let mut concentrations = Vec::with_capacity(params.substitutionals.len());
    for species in &params.substitutionals {
        concentrations.push(store.cell_scalar(&species.name, 0.0)?);
    }

    let solvent = store.derive("solvent", &concentrations, |c| {
        1.0 - c.iter().sum::<f64>()
    })?;

    let mut substitutionals = Vec::with_capacity(concentrations.len());
    for (j, species) in params.substitutionals.iter().enumerate() {
        let parents: Vec<FieldId> = concentrations
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != j)
            .map(|(_, &id)| id)
            .collect();
        let others = store.derive(&format!("{}_others", species.name), &parents, |c| {
            c.iter().sum::<f64>()
        })?;
        let d = species.diffusivity;
        let cross_scale = store.derive(
            &format!("{}_cross_scale", species.name),
            &[others],
            move |s| -d / (1.0 - s[0]),
        )?;
        substitutionals.push(SpeciesFields {
            name: species.name.clone(),
            concentration: concentrations[j],
            others,
            cross_scale,
        });
    }
    log::debug!(
        "ElPhF fields: {} substitutionals plus solvent",
        substitutionals.len()
    );
    Ok(ElphfFields {
        solvent,
        substitutionals,
    })
}

/// One equation per substitutional, in declaration order.
pub fn make_equations(
    store: &FieldStore,
    fields: &ElphfFields,
    params: &ElphfParameters,
    control: SweepControl,
) -> FvmResult<Vec<(Equation, SweepControl)>> {
    if fields.substitutionals.len() != params.substitutionals.len() {
        return Err(FvmError::shape(
            "ElPhF species",
            params.substitutionals.len(),
            fields.substitutionals.len(),
        ));
    }
    fields
        .substitutionals
        .iter()
        .zip(&params.substitutionals)
        .map(|(f, p)| {
            let equation = Equation::builder(&f.name, f.concentration)
                .term(Term::transient())
                .term(Term::diffusion(p.diffusivity))
                .term(Term::convection(
                    Velocity::ScaledGradient {
                        field: f.others,
                        scale: Coefficient::Cell(f.cross_scale),
                    },
                    params.convection_scheme,
                ))
                .solver(params.linear_solver.clone())
                .build(store)?;
            Ok::<_, FvmError>((equation, control))
        })
        .collect()
}

/// `left` for cells whose centre has `x <= split`, `right` elsewhere.
pub fn set_step_profile(
    store: &mut FieldStore,
    field: FieldId,
    split: f64,
    left: f64,
    right: f64,
) -> FvmResult<()> {
    let (lower, upper) = {
        let mesh = store.mesh();
        (
            mesh.cells_where(|c| c[0] <= split),
            mesh.cells_where(|c| c[0] > split),
        )
    };
    store.set_value(field, left, Some(&lower))?;
    store.set_value(field, right, Some(&upper))
}

/// Write a configured initial profile into `field`.
pub fn apply_profile(store: &mut FieldStore, field: FieldId, profile: &InitialProfile) -> FvmResult<()> {
    match *profile {
        InitialProfile::Uniform { value } => store.set_value(field, value, None),
        InitialProfile::Step { split, left, right } => {
            set_step_profile(store, field, split, left, right)
        }
    }
}

/// Range and volume-weighted mean of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSummary {
    pub name: String,
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

/// Mesh, fields and coupled iterator for one configuration.
pub struct ElphfModel {
    store: FieldStore,
    fields: ElphfFields,
    iterator: CoupledIterator,
    params: ElphfParameters,
}

impl ElphfModel {
    /// Build the grid, fields, initial profiles and equations.
    pub fn from_config(config: &ModelConfig) -> FvmResult<Self> {
        config.validate()?;
        let mesh = if config.mesh.ny == 1 {
            Mesh::grid_1d(config.mesh.nx, config.mesh.dx)?
        } else {
            Mesh::grid_2d(config.mesh.nx, config.mesh.ny, config.mesh.dx, config.mesh.dy)?
        };
        let params = ElphfParameters::from_config(config);
        let control = SweepControl::from_config(&config.iteration)?;
        Self::new(Arc::new(mesh), params, control, config.iteration.max_sweeps)
    }

    pub fn new(
        mesh: Arc<Mesh>,
        params: ElphfParameters,
        control: SweepControl,
        max_sweeps: usize,
    ) -> FvmResult<Self> {
        let mut store = FieldStore::new(mesh);
        let fields = make_fields(&mut store, &params)?;
        for (species, f) in params.substitutionals.iter().zip(&fields.substitutionals) {
            if let Some(profile) = &species.initial {
                apply_profile(&mut store, f.concentration, profile)?;
            }
            store.update_old(f.concentration)?;
        }

        let mut iterator = CoupledIterator::new(max_sweeps)?;
        for (equation, control) in make_equations(&store, &fields, &params, control)? {
            iterator.add(equation, control)?;
        }
        log::info!(
            "ElPhF model: {} cells, {} species, dt = {:.3e}",
            store.mesh().n_cells(),
            fields.substitutionals.len(),
            params.time_step_duration
        );
        Ok(ElphfModel {
            store,
            fields,
            iterator,
            params,
        })
    }

    pub fn store(&self) -> &FieldStore {
        &self.store
    }

    /// Mutable access for re-initialising concentrations between steps.
    pub fn store_mut(&mut self) -> &mut FieldStore {
        &mut self.store
    }

    pub fn fields(&self) -> &ElphfFields {
        &self.fields
    }

    pub fn iterator(&self) -> &CoupledIterator {
        &self.iterator
    }

    pub fn params(&self) -> &ElphfParameters {
        &self.params
    }

    /// One time step of the configured duration; returns the sweeps used.
    pub fn step(&mut self) -> FvmResult<usize> {
        self.iterator
            .timestep(&mut self.store, self.params.time_step_duration)
    }

    pub fn run(&mut self, steps: usize) -> FvmResult<()> {
        self.iterator
            .run(&mut self.store, self.params.time_step_duration, steps)
    }

    /// Keep the values of a step that stopped short of convergence.
    pub fn accept_step(&mut self) -> FvmResult<()> {
        self.iterator.accept_step(&mut self.store)
    }

    /// Discard the unfinished step and restore the previous concentrations.
    pub fn rollback(&mut self) -> FvmResult<()> {
        self.iterator.rollback(&mut self.store)
    }

    /// Summaries of every substitutional followed by the solvent.
    pub fn summaries(&self) -> FvmResult<Vec<FieldSummary>> {
        let total = self.store.mesh().total_volume();
        let mut ids: Vec<FieldId> = self.fields.concentrations();
        ids.push(self.fields.solvent);
        ids.into_iter()
            .map(|id| {
                let values = self.store.scalar(id)?;
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                Ok::<_, FvmError>(FieldSummary {
                    name: self.store.name(id)?.to_string(),
                    min,
                    mean: self.store.integral(id)? / total,
                    max,
                })
            })
            .collect()
    }
}
