// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — Error
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FvmError {
    #[error("Shape mismatch in {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    #[error("Boundary face {face} claimed by more than one condition in equation '{equation}'")]
    BoundaryConflict { face: usize, equation: String },

    #[error("Linear system unsolvable by {solver}: {reason}")]
    Unsolvable { solver: &'static str, reason: String },

    #[error("No convergence after {sweeps} sweeps, final residuals: {residuals:?}")]
    NonConvergence {
        sweeps: usize,
        residuals: Vec<(String, f64)>,
    },

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Field '{0}' is derived and cannot be written")]
    ReadOnlyField(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FvmError {
    /// Shorthand for the common length check.
    pub fn shape(what: impl Into<String>, expected: usize, found: usize) -> Self {
        FvmError::ShapeMismatch {
            what: what.into(),
            expected,
            found,
        }
    }

    /// True for failures a caller may react to by changing `dt` and retrying.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FvmError::Unsolvable { .. } | FvmError::NonConvergence { .. }
        )
    }
}

pub type FvmResult<T> = Result<T, FvmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_message_names_context() {
        let err = FvmError::shape("initial value of 'c1'", 40, 39);
        let msg = err.to_string();
        assert!(msg.contains("c1"));
        assert!(msg.contains("40"));
        assert!(msg.contains("39"));
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(FvmError::Unsolvable {
            solver: "Thomas",
            reason: "zero pivot".into()
        }
        .is_recoverable());
        assert!(FvmError::NonConvergence {
            sweeps: 3,
            residuals: vec![("c1".into(), 1.0)]
        }
        .is_recoverable());
        assert!(!FvmError::UnknownField("x".into()).is_recoverable());
        assert!(!FvmError::BoundaryConflict {
            face: 0,
            equation: "c1".into()
        }
        .is_recoverable());
    }
}
