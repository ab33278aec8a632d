// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};

use crate::error::{FvmError, FvmResult};

/// Top-level model configuration.
/// Keys mirror the ElPhF parameter dictionary ("time step duration",
/// "standard potential", "barrier height").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model_name: String,
    pub mesh: MeshConfig,
    #[serde(rename = "time step duration")]
    pub time_step_duration: f64,
    pub steps: usize,
    pub solvent: SolventParams,
    pub substitutionals: Vec<SpeciesParams>,
    /// Sweep control. No defaults: tolerance and relaxation are problem specific.
    pub iteration: IterationConfig,
    #[serde(default)]
    pub linear_solver: LinearSolverConfig,
    #[serde(default)]
    pub convection_scheme: ConvectionScheme,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    pub nx: usize,
    /// 1 selects a 1D grid.
    #[serde(default = "default_one_cell")]
    pub ny: usize,
    pub dx: f64,
    #[serde(default = "default_unit_spacing")]
    pub dy: f64,
}

fn default_one_cell() -> usize {
    1
}
fn default_unit_spacing() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolventParams {
    #[serde(rename = "standard potential")]
    pub standard_potential: f64,
    #[serde(rename = "barrier height")]
    pub barrier_height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesParams {
    pub name: String,
    pub diffusivity: f64,
    #[serde(rename = "standard potential")]
    pub standard_potential: f64,
    #[serde(rename = "barrier height")]
    pub barrier_height: f64,
    /// Optional initial distribution; species start at zero when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<InitialProfile>,
}

/// Initial concentration profile along x.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InitialProfile {
    Uniform { value: f64 },
    /// `left` for cell centres with x <= split, `right` beyond.
    Step { split: f64, left: f64, right: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationConfig {
    pub max_sweeps: usize,
    pub tolerance: f64,
    pub relaxation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearSolverKind {
    Tridiagonal,
    #[default]
    BandedLu,
    Sor,
    Pcg,
    BiCgStab,
    Gmres,
}

/// Backend selection and its tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSolverConfig {
    #[serde(default)]
    pub kind: LinearSolverKind,
    /// Relative residual tolerance for iterative backends (default: 1e-12).
    #[serde(default = "default_linear_tol")]
    pub tolerance: f64,
    /// Absolute residual floor for iterative backends (default: 1e-12).
    /// The stopping target is `max(tolerance · ‖b‖₂, abs_tolerance)`.
    #[serde(default = "default_linear_abs_tol")]
    pub abs_tolerance: f64,
    /// Iteration budget for iterative backends (default: 2000).
    #[serde(default = "default_linear_max_iter")]
    pub max_iterations: usize,
    /// SOR relaxation factor (default: 1.5).
    #[serde(default = "default_omega")]
    pub omega: f64,
    /// GMRES restart length (default: 30).
    #[serde(default = "default_restart")]
    pub restart: usize,
}

fn default_linear_tol() -> f64 {
    1e-12
}
fn default_linear_abs_tol() -> f64 {
    1e-12
}
fn default_linear_max_iter() -> usize {
    2000
}
fn default_omega() -> f64 {
    1.5
}
fn default_restart() -> usize {
    30
}

impl Default for LinearSolverConfig {
    fn default() -> Self {
        LinearSolverConfig {
            kind: LinearSolverKind::default(),
            tolerance: default_linear_tol(),
            abs_tolerance: default_linear_abs_tol(),
            max_iterations: default_linear_max_iter(),
            omega: default_omega(),
            restart: default_restart(),
        }
    }
}

impl LinearSolverConfig {
    pub fn with_kind(kind: LinearSolverKind) -> Self {
        LinearSolverConfig {
            kind,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> FvmResult<()> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(FvmError::ConfigError(format!(
                "linear solver tolerance must be finite and > 0, got {}",
                self.tolerance
            )));
        }
        if !self.abs_tolerance.is_finite() || self.abs_tolerance <= 0.0 {
            return Err(FvmError::ConfigError(format!(
                "linear solver abs_tolerance must be finite and > 0, got {}",
                self.abs_tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(FvmError::ConfigError(
                "linear solver max_iterations must be >= 1".to_string(),
            ));
        }
        if !self.omega.is_finite() || self.omega <= 0.0 || self.omega >= 2.0 {
            return Err(FvmError::ConfigError(format!(
                "SOR omega must lie in (0, 2), got {}",
                self.omega
            )));
        }
        if self.restart == 0 {
            return Err(FvmError::ConfigError(
                "GMRES restart must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Face-value scheme for convection terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvectionScheme {
    #[default]
    Upwind,
    Central,
}

impl ModelConfig {
    /// Load from a JSON file and validate.
    pub fn from_file(path: &str) -> FvmResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> FvmResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> FvmResult<()> {
        if self.mesh.nx == 0 || self.mesh.ny == 0 {
            return Err(FvmError::ConfigError(format!(
                "mesh requires nx, ny >= 1, got nx={}, ny={}",
                self.mesh.nx, self.mesh.ny
            )));
        }
        for (name, value) in [("dx", self.mesh.dx), ("dy", self.mesh.dy)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(FvmError::ConfigError(format!(
                    "mesh {name} must be finite and > 0, got {value}"
                )));
            }
        }
        if !self.time_step_duration.is_finite() || self.time_step_duration <= 0.0 {
            return Err(FvmError::ConfigError(format!(
                "time step duration must be finite and > 0, got {}",
                self.time_step_duration
            )));
        }
        if self.steps == 0 {
            return Err(FvmError::ConfigError("steps must be >= 1".to_string()));
        }
        if self.substitutionals.is_empty() {
            return Err(FvmError::ConfigError(
                "at least one substitutional species is required".to_string(),
            ));
        }
        for (i, species) in self.substitutionals.iter().enumerate() {
            if species.name.trim().is_empty() {
                return Err(FvmError::ConfigError(format!(
                    "substitutional {i} has an empty name"
                )));
            }
            if self.substitutionals[..i]
                .iter()
                .any(|other| other.name == species.name)
            {
                return Err(FvmError::ConfigError(format!(
                    "duplicate species name '{}'",
                    species.name
                )));
            }
            if !species.diffusivity.is_finite() || species.diffusivity < 0.0 {
                return Err(FvmError::ConfigError(format!(
                    "species '{}' diffusivity must be finite and >= 0, got {}",
                    species.name, species.diffusivity
                )));
            }
        }
        self.iteration.validate()?;
        self.linear_solver.validate()
    }
}

impl IterationConfig {
    pub fn validate(&self) -> FvmResult<()> {
        if self.max_sweeps == 0 {
            return Err(FvmError::ConfigError(
                "iteration max_sweeps must be >= 1".to_string(),
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(FvmError::ConfigError(format!(
                "iteration tolerance must be finite and > 0, got {}",
                self.tolerance
            )));
        }
        if !self.relaxation.is_finite() || self.relaxation <= 0.0 || self.relaxation > 1.0 {
            return Err(FvmError::ConfigError(format!(
                "iteration relaxation must lie in (0, 1], got {}",
                self.relaxation
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Build path relative to the workspace root.
    /// CARGO_MANIFEST_DIR points to crates/fvm-types/ at compile time.
    fn project_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
    }

    fn config_path(relative: &str) -> String {
        project_root().join(relative).to_string_lossy().to_string()
    }

    const MINIMAL: &str = r#"{
        "model_name": "minimal",
        "mesh": { "nx": 10, "dx": 0.5 },
        "time step duration": 1.0,
        "steps": 3,
        "solvent": { "standard potential": 0.0, "barrier height": 0.0 },
        "substitutionals": [
            { "name": "c1", "diffusivity": 2.0,
              "standard potential": 1.0, "barrier height": 1.0 }
        ],
        "iteration": { "max_sweeps": 20, "tolerance": 1e-9, "relaxation": 1.0 }
    }"#;

    #[test]
    fn test_load_elphf_diffusion_config() {
        let cfg = ModelConfig::from_file(&config_path("configs/elphf_diffusion_1d.json")).unwrap();
        assert_eq!(cfg.mesh.nx, 40);
        assert_eq!(cfg.mesh.ny, 1);
        assert_eq!(cfg.substitutionals.len(), 2);
        assert_eq!(cfg.substitutionals[0].name, "c1");
        assert!((cfg.time_step_duration - 10000.0).abs() < 1e-12);
        assert_eq!(cfg.steps, 40);
        assert!(matches!(
            cfg.substitutionals[0].initial,
            Some(InitialProfile::Step { .. })
        ));
    }

    #[test]
    fn test_defaults_applied() {
        let cfg = ModelConfig::from_json(MINIMAL).unwrap();
        assert_eq!(cfg.mesh.ny, 1);
        assert!((cfg.mesh.dy - 1.0).abs() < 1e-15);
        assert_eq!(cfg.linear_solver.kind, LinearSolverKind::BandedLu);
        assert_eq!(cfg.linear_solver.restart, 30);
        assert!((cfg.linear_solver.abs_tolerance - 1e-12).abs() < 1e-24);
        assert_eq!(cfg.convection_scheme, ConvectionScheme::Upwind);
        assert!(cfg.substitutionals[0].initial.is_none());
    }

    #[test]
    fn test_missing_tolerance_is_rejected() {
        let json = MINIMAL.replace(r#""tolerance": 1e-9, "#, "");
        let err = ModelConfig::from_json(&json).unwrap_err();
        assert!(matches!(err, FvmError::Json(_)));
    }

    #[test]
    fn test_invalid_relaxation_is_rejected() {
        let json = MINIMAL.replace(r#""relaxation": 1.0"#, r#""relaxation": 1.5"#);
        let err = ModelConfig::from_json(&json).unwrap_err();
        match err {
            FvmError::ConfigError(msg) => assert!(msg.contains("relaxation")),
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_positive_abs_tolerance_rejected() {
        let mut cfg = ModelConfig::from_json(MINIMAL).unwrap();
        cfg.linear_solver.abs_tolerance = 0.0;
        match cfg.validate().unwrap_err() {
            FvmError::ConfigError(msg) => assert!(msg.contains("abs_tolerance")),
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_species_rejected() {
        let mut cfg = ModelConfig::from_json(MINIMAL).unwrap();
        let dup = cfg.substitutionals[0].clone();
        cfg.substitutionals.push(dup);
        let err = cfg.validate().unwrap_err();
        match err {
            FvmError::ConfigError(msg) => assert!(msg.contains("duplicate")),
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_roundtrip_serialization() {
        let cfg = ModelConfig::from_file(&config_path("configs/elphf_diffusion_1d.json")).unwrap();
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        assert!(json.contains("time step duration"));
        let cfg2 = ModelConfig::from_json(&json).unwrap();
        assert_eq!(cfg.model_name, cfg2.model_name);
        assert_eq!(cfg.substitutionals.len(), cfg2.substitutionals.len());
        assert_eq!(
            cfg.substitutionals[1].initial,
            cfg2.substitutionals[1].initial
        );
    }
}
