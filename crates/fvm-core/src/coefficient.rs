// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — Coefficients
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Material coefficients (diffusivity, density, source strength).

use fvm_types::error::{FvmError, FvmResult};

use crate::field::{FieldId, FieldStore, Location};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coefficient {
    Constant(f64),
    /// Scalar cell field, arithmetic face average.
    Cell(FieldId),
    /// Scalar cell field, harmonic face average (series conductances).
    CellHarmonic(FieldId),
    /// Scalar face field.
    Face(FieldId),
}

impl From<f64> for Coefficient {
    fn from(v: f64) -> Self {
        Coefficient::Constant(v)
    }
}

impl Coefficient {
    pub fn field(&self) -> Option<FieldId> {
        match *self {
            Coefficient::Constant(_) => None,
            Coefficient::Cell(id) | Coefficient::CellHarmonic(id) | Coefficient::Face(id) => {
                Some(id)
            }
        }
    }

    fn expect_scalar(store: &FieldStore, id: FieldId, location: Location) -> FvmResult<()> {
        if store.rank(id)? != 0 || store.location(id)? != location {
            return Err(FvmError::InvalidParameter(format!(
                "coefficient field '{}' must be a scalar {location:?} field",
                store.name(id)?
            )));
        }
        Ok(())
    }

    /// Reject fields of the wrong location or rank.
    pub fn validate(&self, store: &FieldStore) -> FvmResult<()> {
        match *self {
            Coefficient::Constant(v) if !v.is_finite() => Err(FvmError::InvalidParameter(
                format!("coefficient must be finite, got {v}"),
            )),
            Coefficient::Constant(_) => Ok(()),
            Coefficient::Cell(id) | Coefficient::CellHarmonic(id) => {
                Self::expect_scalar(store, id, Location::Cell)
            }
            Coefficient::Face(id) => Self::expect_scalar(store, id, Location::Face),
        }
    }

    /// One value per face.
    pub fn face_values(&self, store: &FieldStore) -> FvmResult<Vec<f64>> {
        let mesh = store.mesh();
        match *self {
            Coefficient::Constant(v) => Ok(vec![v; mesh.n_faces()]),
            Coefficient::Cell(id) => Ok(store.face_values(id)?.column(0).to_vec()),
            Coefficient::CellHarmonic(id) => {
                let cells = store.scalar(id)?;
                Ok(mesh
                    .faces()
                    .iter()
                    .map(|face| match face.neighbor {
                        Some(n) => {
                            let (a, b) = (cells[face.owner], cells[n]);
                            let w = face.weight;
                            let denom = w * b + (1.0 - w) * a;
                            if denom == 0.0 {
                                0.0
                            } else {
                                a * b / denom
                            }
                        }
                        None => cells[face.owner],
                    })
                    .collect())
            }
            Coefficient::Face(id) => Ok(store.scalar(id)?.to_vec()),
        }
    }

    /// One value per cell; face coefficients have no cell values.
    pub fn cell_values(&self, store: &FieldStore) -> FvmResult<Vec<f64>> {
        match *self {
            Coefficient::Constant(v) => Ok(vec![v; store.mesh().n_cells()]),
            Coefficient::Cell(id) | Coefficient::CellHarmonic(id) => Ok(store.scalar(id)?.to_vec()),
            Coefficient::Face(id) => Err(FvmError::InvalidParameter(format!(
                "face coefficient '{}' used where cell values are needed",
                store.name(id)?
            ))),
        }
    }
}
