// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — Coupled Iterator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Sequential sweeps over coupled equations within one time step.
//!
//! A sweep calls every equation once, in declaration order, each seeing
//! the latest values written by the equations before it. A step ends when
//! every residual is below its equation's tolerance (`Converged`: old
//! snapshots and time advance) or after `max_sweeps` sweeps
//! (`MaxSweepsReached`: nothing advances until the caller either accepts
//! the step or rolls it back).

use fvm_types::config::IterationConfig;
use fvm_types::error::{FvmError, FvmResult};
use serde::Serialize;

use crate::equation::{Equation, SweepReport};
use crate::field::FieldStore;

/// Per-equation convergence controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepControl {
    pub tolerance: f64,
    pub underrelaxation: f64,
}

impl SweepControl {
    pub fn new(tolerance: f64, underrelaxation: f64) -> FvmResult<Self> {
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(FvmError::InvalidParameter(format!(
                "sweep tolerance must be finite and > 0, got {tolerance}"
            )));
        }
        if !(underrelaxation > 0.0 && underrelaxation <= 1.0) {
            return Err(FvmError::InvalidParameter(format!(
                "under-relaxation must lie in (0, 1], got {underrelaxation}"
            )));
        }
        Ok(SweepControl {
            tolerance,
            underrelaxation,
        })
    }

    pub fn from_config(config: &IterationConfig) -> FvmResult<Self> {
        Self::new(config.tolerance, config.relaxation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepPhase {
    NotStarted,
    Sweeping,
    Converged,
    MaxSweepsReached,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolverState {
    pub time: f64,
    /// Step size of the current or last attempted step.
    pub dt: f64,
    /// Completed (advanced) steps.
    pub step: usize,
    /// Sweeps performed in the current step.
    pub sweep_count: usize,
    /// One row per sweep, one residual per equation.
    pub residual_history: Vec<Vec<f64>>,
    pub phase: StepPhase,
    /// Equation whose linear solve failed, while `phase` is `Failed`.
    pub failed_equation: Option<String>,
    /// 1-based sweep in which `failed_equation` failed.
    pub failed_sweep: Option<usize>,
}

impl Default for SolverState {
    fn default() -> Self {
        SolverState {
            time: 0.0,
            dt: 0.0,
            step: 0,
            sweep_count: 0,
            residual_history: Vec::new(),
            phase: StepPhase::NotStarted,
            failed_equation: None,
            failed_sweep: None,
        }
    }
}

#[derive(Debug)]
pub struct CoupledIterator {
    equations: Vec<(Equation, SweepControl)>,
    max_sweeps: usize,
    state: SolverState,
}

impl CoupledIterator {
    pub fn new(max_sweeps: usize) -> FvmResult<Self> {
        if max_sweeps == 0 {
            return Err(FvmError::InvalidParameter(
                "max_sweeps must be >= 1".to_string(),
            ));
        }
        Ok(CoupledIterator {
            equations: Vec::new(),
            max_sweeps,
            state: SolverState::default(),
        })
    }

    /// Append an equation; its unknown must not be owned by another one.
    pub fn add(&mut self, equation: Equation, control: SweepControl) -> FvmResult<()> {
        if let Some((owner, _)) = self
            .equations
            .iter()
            .find(|(eq, _)| eq.var() == equation.var())
        {
            return Err(FvmError::InvalidParameter(format!(
                "unknown {} of equation '{}' is already solved by '{}'",
                equation.var(),
                equation.name(),
                owner.name()
            )));
        }
        self.equations.push((equation, control));
        Ok(())
    }

    pub fn equations(&self) -> impl Iterator<Item = &Equation> {
        self.equations.iter().map(|(eq, _)| eq)
    }

    pub fn state(&self) -> &SolverState {
        &self.state
    }

    pub fn max_sweeps(&self) -> usize {
        self.max_sweeps
    }

    /// Restart the clock, e.g. after re-initialising the fields.
    pub fn set_time(&mut self, time: f64) {
        self.state.time = time;
    }

    /// Residuals of the last sweep, labelled by equation.
    pub fn last_residuals(&self) -> Vec<(String, f64)> {
        let last = self.state.residual_history.last();
        self.equations
            .iter()
            .enumerate()
            .map(|(i, (eq, _))| {
                let r = last.and_then(|row| row.get(i)).copied().unwrap_or(f64::NAN);
                (eq.name().to_string(), r)
            })
            .collect()
    }

    fn begin_step(&mut self, dt: f64) -> FvmResult<()> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(FvmError::InvalidParameter(format!(
                "time step must be finite and > 0, got {dt}"
            )));
        }
        if self.equations.is_empty() {
            return Err(FvmError::InvalidParameter(
                "iterator has no equations".to_string(),
            ));
        }
        self.state.dt = dt;
        self.state.sweep_count = 0;
        self.state.residual_history.clear();
        self.state.failed_equation = None;
        self.state.failed_sweep = None;
        self.state.phase = StepPhase::Sweeping;
        Ok(())
    }

    /// One pass over every equation.
    pub fn sweep(&mut self, store: &mut FieldStore, dt: f64) -> FvmResult<Vec<SweepReport>> {
        if self.state.phase != StepPhase::Sweeping {
            self.begin_step(dt)?;
        }
        let mut reports = Vec::with_capacity(self.equations.len());
        for (eq, control) in &self.equations {
            match eq.sweep(store, dt, control.underrelaxation) {
                Ok(report) => reports.push(report),
                Err(e) => {
                    self.state.phase = StepPhase::Failed;
                    self.state.failed_equation = Some(eq.name().to_string());
                    self.state.failed_sweep = Some(self.state.sweep_count + 1);
                    log::warn!(
                        "step {} sweep {}: equation '{}' failed: {e}",
                        self.state.step + 1,
                        self.state.sweep_count + 1,
                        eq.name()
                    );
                    return Err(e);
                }
            }
        }
        self.state.sweep_count += 1;
        self.state
            .residual_history
            .push(reports.iter().map(|r| r.residual).collect());
        log::debug!(
            "step {} sweep {}: residuals {:?}",
            self.state.step + 1,
            self.state.sweep_count,
            reports.iter().map(|r| r.residual).collect::<Vec<_>>()
        );
        Ok(reports)
    }

    fn converged(&self, reports: &[SweepReport]) -> bool {
        reports
            .iter()
            .zip(self.equations.iter())
            .all(|(r, (_, control))| r.residual < control.tolerance)
    }

    fn advance(&mut self, store: &mut FieldStore) -> FvmResult<()> {
        for (eq, _) in &self.equations {
            store.update_old(eq.var())?;
        }
        self.state.time += self.state.dt;
        self.state.step += 1;
        Ok(())
    }

    /// Sweep until converged or `max_sweeps`; returns the sweeps used.
    pub fn timestep(&mut self, store: &mut FieldStore, dt: f64) -> FvmResult<usize> {
        self.begin_step(dt)?;
        while self.state.sweep_count < self.max_sweeps {
            let reports = self.sweep(store, dt)?;
            if self.converged(&reports) {
                self.state.phase = StepPhase::Converged;
                let sweeps = self.state.sweep_count;
                self.advance(store)?;
                log::info!(
                    "step {} converged in {sweeps} sweeps, t = {:.6e}",
                    self.state.step,
                    self.state.time
                );
                return Ok(sweeps);
            }
        }
        self.state.phase = StepPhase::MaxSweepsReached;
        let residuals = self.last_residuals();
        log::warn!(
            "step {} not converged after {} sweeps: {residuals:?}",
            self.state.step + 1,
            self.max_sweeps
        );
        Err(FvmError::NonConvergence {
            sweeps: self.max_sweeps,
            residuals,
        })
    }

    /// `steps` consecutive time steps of size `dt`.
    pub fn run(&mut self, store: &mut FieldStore, dt: f64, steps: usize) -> FvmResult<()> {
        for _ in 0..steps {
            self.timestep(store, dt)?;
        }
        Ok(())
    }

    /// Advance a step that ended without convergence, keeping its values.
    pub fn accept_step(&mut self, store: &mut FieldStore) -> FvmResult<()> {
        match self.state.phase {
            StepPhase::MaxSweepsReached | StepPhase::Failed => {
                self.advance(store)?;
                self.state.phase = StepPhase::Converged;
                log::warn!(
                    "step {} accepted without convergence, t = {:.6e}",
                    self.state.step,
                    self.state.time
                );
                Ok(())
            }
            phase => Err(FvmError::InvalidParameter(format!(
                "no unfinished step to accept (phase {phase:?})"
            ))),
        }
    }

    /// Restore every unknown to its old snapshot; time does not advance.
    pub fn rollback(&mut self, store: &mut FieldStore) -> FvmResult<()> {
        for (eq, _) in &self.equations {
            store.restore_old(eq.var())?;
        }
        self.state.sweep_count = 0;
        self.state.residual_history.clear();
        self.state.failed_equation = None;
        self.state.failed_sweep = None;
        self.state.phase = StepPhase::NotStarted;
        log::debug!("step {} rolled back", self.state.step + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundaryCondition;
    use crate::coefficient::Coefficient;
    use crate::field::FieldId;
    use crate::terms::Term;
    use fvm_types::config::{LinearSolverConfig, LinearSolverKind};
    use fvm_types::mesh::Mesh;
    use std::sync::Arc;

    fn diffusion(store: &FieldStore, name: &str, var: FieldId) -> Equation {
        Equation::builder(name, var)
            .term(Term::transient())
            .term(Term::diffusion(1.0))
            .solver(LinearSolverConfig::with_kind(LinearSolverKind::Tridiagonal))
            .build(store)
            .unwrap()
    }

    fn control() -> SweepControl {
        SweepControl::new(1e-10, 1.0).unwrap()
    }

    #[test]
    fn test_linear_step_converges_in_two_sweeps() {
        let mut store = FieldStore::new(Arc::new(Mesh::grid_1d(6, 1.0).unwrap()));
        let phi = store.cell_scalar("phi", vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        let mut it = CoupledIterator::new(10).unwrap();
        it.add(diffusion(&store, "phi", phi), control()).unwrap();

        let sweeps = it.timestep(&mut store, 1.0).unwrap();
        // First sweep solves exactly; the second sees a zero entry residual.
        assert_eq!(sweeps, 2);
        assert_eq!(it.state().phase, StepPhase::Converged);
        assert_eq!(it.state().step, 1);
        assert!((it.state().time - 1.0).abs() < 1e-15);
        assert_eq!(it.state().residual_history.len(), 2);
        assert_eq!(store.old_scalar(phi).unwrap(), store.scalar(phi).unwrap());
    }

    #[test]
    fn test_duplicate_unknown_rejected() {
        let mut store = FieldStore::new(Arc::new(Mesh::grid_1d(3, 1.0).unwrap()));
        let phi = store.cell_scalar("phi", 0.0).unwrap();
        let mut it = CoupledIterator::new(5).unwrap();
        it.add(diffusion(&store, "a", phi), control()).unwrap();
        assert!(it.add(diffusion(&store, "b", phi), control()).is_err());
    }

    #[test]
    fn test_max_sweeps_then_rollback() {
        let mut store = FieldStore::new(Arc::new(Mesh::grid_1d(4, 1.0).unwrap()));
        let phi = store.cell_scalar("phi", vec![4.0, 0.0, 0.0, 0.0]).unwrap();
        let mut it = CoupledIterator::new(1).unwrap();
        it.add(diffusion(&store, "phi", phi), control()).unwrap();

        let err = it.timestep(&mut store, 1.0).unwrap_err();
        match err {
            FvmError::NonConvergence { sweeps, residuals } => {
                assert_eq!(sweeps, 1);
                assert_eq!(residuals[0].0, "phi");
                assert!(residuals[0].1 > 1e-10);
            }
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(it.state().phase, StepPhase::MaxSweepsReached);
        assert_eq!(it.state().time, 0.0);
        assert_ne!(store.scalar(phi).unwrap()[0], 4.0);

        it.rollback(&mut store).unwrap();
        assert_eq!(store.scalar(phi).unwrap(), &[4.0, 0.0, 0.0, 0.0]);
        assert_eq!(it.state().phase, StepPhase::NotStarted);
        assert_eq!(it.state().time, 0.0);
    }

    #[test]
    fn test_accept_step_advances() {
        let mut store = FieldStore::new(Arc::new(Mesh::grid_1d(4, 1.0).unwrap()));
        let phi = store.cell_scalar("phi", vec![4.0, 0.0, 0.0, 0.0]).unwrap();
        let mut it = CoupledIterator::new(1).unwrap();
        it.add(diffusion(&store, "phi", phi), control()).unwrap();
        assert!(it.accept_step(&mut store).is_err());

        assert!(it.timestep(&mut store, 0.5).is_err());
        it.accept_step(&mut store).unwrap();
        assert_eq!(it.state().step, 1);
        assert!((it.state().time - 0.5).abs() < 1e-15);
        assert_eq!(store.old_scalar(phi).unwrap(), store.scalar(phi).unwrap());
    }

    #[test]
    fn test_failed_sweep_does_not_advance() {
        let mut store = FieldStore::new(Arc::new(Mesh::grid_1d(3, 1.0).unwrap()));
        let phi = store.cell_scalar("phi", vec![1.0, 0.0, 0.0]).unwrap();
        // Closed pure diffusion is singular.
        let eq = Equation::builder("phi", phi)
            .term(Term::diffusion(1.0))
            .build(&store)
            .unwrap();
        let mut it = CoupledIterator::new(3).unwrap();
        it.add(eq, control()).unwrap();
        let err = it.timestep(&mut store, 1.0).unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(it.state().phase, StepPhase::Failed);
        assert_eq!(it.state().step, 0);
    }

    #[test]
    fn test_failed_equation_is_recorded_until_rollback() {
        let mut store = FieldStore::new(Arc::new(Mesh::grid_1d(3, 1.0).unwrap()));
        let a = store.cell_scalar("a", vec![1.0, 0.0, 0.0]).unwrap();
        let b = store.cell_scalar("b", vec![0.0, 0.0, 1.0]).unwrap();
        let healthy = Equation::builder("a", a)
            .term(Term::transient())
            .term(Term::diffusion(1.0))
            .build(&store)
            .unwrap();
        let singular = Equation::builder("b", b)
            .term(Term::diffusion(1.0))
            .build(&store)
            .unwrap();
        let mut it = CoupledIterator::new(3).unwrap();
        it.add(healthy, control()).unwrap();
        it.add(singular, control()).unwrap();

        assert!(it.timestep(&mut store, 1.0).is_err());
        let state = it.state();
        assert_eq!(state.phase, StepPhase::Failed);
        assert_eq!(state.failed_equation.as_deref(), Some("b"));
        assert_eq!(state.failed_sweep, Some(1));
        assert!(state.residual_history.is_empty());

        it.rollback(&mut store).unwrap();
        assert_eq!(it.state().failed_equation, None);
        assert_eq!(it.state().failed_sweep, None);
    }

    #[test]
    fn test_essential_boundary_dominates_large_conductance() {
        // As Γ grows, the cell next to a fixed-value face approaches that value.
        let mut store = FieldStore::new(Arc::new(Mesh::grid_1d(5, 1.0).unwrap()));
        let phi = store.cell_scalar("phi", 0.0).unwrap();
        let gamma = store.cell_scalar("gamma", 1.0).unwrap();
        let eq = Equation::builder("phi", phi)
            .term(Term::transient())
            .term(Term::diffusion(Coefficient::Cell(gamma)))
            .boundary(BoundaryCondition::fixed_value(store.mesh().left_faces(), 2.5))
            .solver(LinearSolverConfig::with_kind(LinearSolverKind::Tridiagonal))
            .build(&store)
            .unwrap();
        let mut previous_gap = f64::INFINITY;
        for g in [1.0, 1e2, 1e4, 1e6] {
            store.set_value(gamma, g, None).unwrap();
            store.set_value(phi, 0.0, None).unwrap();
            store.update_old(phi).unwrap();
            eq.sweep(&mut store, 1.0, 1.0).unwrap();
            let gap = (store.scalar(phi).unwrap()[0] - 2.5).abs();
            assert!(gap < previous_gap);
            previous_gap = gap;
        }
        assert!(previous_gap < 1e-4);
    }

    #[test]
    fn test_invalid_controls() {
        assert!(SweepControl::new(0.0, 1.0).is_err());
        assert!(SweepControl::new(1e-8, 0.0).is_err());
        assert!(SweepControl::new(1e-8, 1.01).is_err());
        assert!(CoupledIterator::new(0).is_err());
    }
}
