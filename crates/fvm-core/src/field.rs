// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — Field Store
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Named cell and face fields bound to one mesh.
//!
//! Values are stored as `(len, components)` arrays: one row per cell or
//! face, one column for scalars and `mesh.dim()` columns for vectors.
//!
//! Base fields are written by the model or by an equation sweep. Derived
//! fields are pure functions of their parents and are evaluated lazily.
//! Every write drops the caches of the written field and, along explicit
//! child links, of every field derived from it. Face interpolations and
//! Green–Gauss gradients are cached the same way.

use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;

use fvm_types::error::{FvmError, FvmResult};
use fvm_types::mesh::Mesh;
use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;

/// Handle to a field inside one [`FieldStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(usize);

impl FieldId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Cell,
    Face,
}

/// Initial content of a new base field.
pub enum InitialValue {
    /// Same value in every entry and component.
    Constant(f64),
    /// One value per entry (scalar fields only).
    Scalars(Vec<f64>),
    /// Full `(len, components)` array.
    Array(Array2<f64>),
    /// Function of the cell or face centre, applied to every component.
    Function(Box<dyn Fn([f64; 2]) -> f64 + Send + Sync>),
}

impl fmt::Debug for InitialValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitialValue::Constant(v) => write!(f, "Constant({v})"),
            InitialValue::Scalars(v) => write!(f, "Scalars(len={})", v.len()),
            InitialValue::Array(a) => write!(f, "Array({:?})", a.dim()),
            InitialValue::Function(_) => write!(f, "Function(..)"),
        }
    }
}

impl From<f64> for InitialValue {
    fn from(v: f64) -> Self {
        InitialValue::Constant(v)
    }
}

impl From<Vec<f64>> for InitialValue {
    fn from(v: Vec<f64>) -> Self {
        InitialValue::Scalars(v)
    }
}

/// Per-cell function of the parent values at that cell.
pub type DeriveFn = Box<dyn Fn(&[f64]) -> f64 + Send + Sync>;

enum FieldKind {
    Base {
        values: Array2<f64>,
        old: Array2<f64>,
    },
    Derived {
        parents: Vec<FieldId>,
        func: DeriveFn,
        values: OnceCell<Array2<f64>>,
        old: OnceCell<Array2<f64>>,
    },
}

struct FieldSlot {
    name: String,
    location: Location,
    rank: usize,
    kind: FieldKind,
    children: Vec<FieldId>,
    face_cache: OnceCell<Array2<f64>>,
    gradient_cache: OnceCell<Array2<f64>>,
}

impl FieldSlot {
    fn drop_current_caches(&mut self) {
        self.face_cache.take();
        self.gradient_cache.take();
        if let FieldKind::Derived { values, .. } = &mut self.kind {
            values.take();
        }
    }

    fn drop_old_cache(&mut self) {
        if let FieldKind::Derived { old, .. } = &mut self.kind {
            old.take();
        }
    }
}

/// Snapshot of which lazy quantities of a field are currently cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheState {
    /// Derived values (always `true` for base fields).
    pub values: bool,
    pub face_values: bool,
    pub gradient: bool,
}

/// Owns every field of one simulation together with their caches.
pub struct FieldStore {
    mesh: Arc<Mesh>,
    slots: Vec<FieldSlot>,
}

impl fmt::Debug for FieldStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldStore")
            .field("n_cells", &self.mesh.n_cells())
            .field(
                "fields",
                &self.slots.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl FieldStore {
    pub fn new(mesh: Arc<Mesh>) -> Self {
        FieldStore {
            mesh,
            slots: Vec::new(),
        }
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn mesh_arc(&self) -> Arc<Mesh> {
        Arc::clone(&self.mesh)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = FieldId> {
        (0..self.slots.len()).map(FieldId)
    }

    fn slot(&self, id: FieldId) -> FvmResult<&FieldSlot> {
        self.slots
            .get(id.0)
            .ok_or_else(|| FvmError::UnknownField(id.to_string()))
    }

    fn slot_mut(&mut self, id: FieldId) -> FvmResult<&mut FieldSlot> {
        self.slots
            .get_mut(id.0)
            .ok_or_else(|| FvmError::UnknownField(id.to_string()))
    }

    pub fn contains(&self, id: FieldId) -> bool {
        id.0 < self.slots.len()
    }

    fn entity_len(&self, location: Location) -> usize {
        match location {
            Location::Cell => self.mesh.n_cells(),
            Location::Face => self.mesh.n_faces(),
        }
    }

    fn components(&self, rank: usize) -> usize {
        if rank == 0 {
            1
        } else {
            self.mesh.dim()
        }
    }

    fn check_new_name(&self, name: &str) -> FvmResult<()> {
        if name.is_empty() {
            return Err(FvmError::InvalidParameter(
                "field name must not be empty".to_string(),
            ));
        }
        if self.find(name).is_some() {
            return Err(FvmError::InvalidParameter(format!(
                "field '{name}' already exists"
            )));
        }
        Ok(())
    }

    /// Create a base field.
    pub fn create(
        &mut self,
        name: &str,
        location: Location,
        rank: usize,
        initial: InitialValue,
    ) -> FvmResult<FieldId> {
        self.check_new_name(name)?;
        if rank > 1 {
            return Err(FvmError::InvalidParameter(format!(
                "field '{name}': rank must be 0 or 1, got {rank}"
            )));
        }
        let len = self.entity_len(location);
        let comps = self.components(rank);
        let values = match initial {
            InitialValue::Constant(v) => Array2::from_elem((len, comps), v),
            InitialValue::Scalars(v) => {
                if rank != 0 {
                    return Err(FvmError::InvalidParameter(format!(
                        "field '{name}': per-entry scalars need rank 0"
                    )));
                }
                if v.len() != len {
                    return Err(FvmError::shape(
                        format!("initial value of '{name}'"),
                        len,
                        v.len(),
                    ));
                }
                Array2::from_shape_vec((len, 1), v).map_err(|e| {
                    FvmError::InvalidParameter(format!("field '{name}': {e}"))
                })?
            }
            InitialValue::Array(a) => {
                if a.nrows() != len {
                    return Err(FvmError::shape(
                        format!("initial rows of '{name}'"),
                        len,
                        a.nrows(),
                    ));
                }
                if a.ncols() != comps {
                    return Err(FvmError::shape(
                        format!("initial components of '{name}'"),
                        comps,
                        a.ncols(),
                    ));
                }
                a
            }
            InitialValue::Function(f) => {
                let centers: Vec<[f64; 2]> = match location {
                    Location::Cell => self.mesh.cells().iter().map(|c| c.center).collect(),
                    Location::Face => self.mesh.faces().iter().map(|face| face.center).collect(),
                };
                let mut a = Array2::zeros((len, comps));
                for (mut row, x) in a.rows_mut().into_iter().zip(centers) {
                    row.fill(f(x));
                }
                a
            }
        };
        if let Some(bad) = values.iter().position(|v| !v.is_finite()) {
            return Err(FvmError::InvalidParameter(format!(
                "field '{name}': non-finite initial value at flat index {bad}"
            )));
        }
        let id = FieldId(self.slots.len());
        self.slots.push(FieldSlot {
            name: name.to_string(),
            location,
            rank,
            kind: FieldKind::Base {
                old: values.clone(),
                values,
            },
            children: Vec::new(),
            face_cache: OnceCell::new(),
            gradient_cache: OnceCell::new(),
        });
        log::trace!("created field '{name}' ({id}, {location:?}, rank {rank})");
        Ok(id)
    }

    /// Scalar cell field.
    pub fn cell_scalar(&mut self, name: &str, initial: impl Into<InitialValue>) -> FvmResult<FieldId> {
        self.create(name, Location::Cell, 0, initial.into())
    }

    /// Scalar cell field computed cell by cell from scalar cell parents.
    pub fn derive<F>(&mut self, name: &str, parents: &[FieldId], func: F) -> FvmResult<FieldId>
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
    {
        self.check_new_name(name)?;
        for &p in parents {
            let slot = self.slot(p)?;
            if slot.location != Location::Cell || slot.rank != 0 {
                return Err(FvmError::InvalidParameter(format!(
                    "field '{name}': parent '{}' is not a scalar cell field",
                    slot.name
                )));
            }
        }
        let id = FieldId(self.slots.len());
        for &p in parents {
            self.slots[p.0].children.push(id);
        }
        self.slots.push(FieldSlot {
            name: name.to_string(),
            location: Location::Cell,
            rank: 0,
            kind: FieldKind::Derived {
                parents: parents.to_vec(),
                func: Box::new(func),
                values: OnceCell::new(),
                old: OnceCell::new(),
            },
            children: Vec::new(),
            face_cache: OnceCell::new(),
            gradient_cache: OnceCell::new(),
        });
        log::trace!("derived field '{name}' ({id}) from {} parents", parents.len());
        Ok(id)
    }

    pub fn find(&self, name: &str) -> Option<FieldId> {
        self.slots.iter().position(|s| s.name == name).map(FieldId)
    }

    pub fn name(&self, id: FieldId) -> FvmResult<&str> {
        Ok(self.slot(id)?.name.as_str())
    }

    pub fn location(&self, id: FieldId) -> FvmResult<Location> {
        Ok(self.slot(id)?.location)
    }

    pub fn rank(&self, id: FieldId) -> FvmResult<usize> {
        Ok(self.slot(id)?.rank)
    }

    pub fn is_derived(&self, id: FieldId) -> FvmResult<bool> {
        Ok(matches!(self.slot(id)?.kind, FieldKind::Derived { .. }))
    }

    /// Parents of a derived field (empty for base fields).
    pub fn parents(&self, id: FieldId) -> FvmResult<&[FieldId]> {
        Ok(match &self.slot(id)?.kind {
            FieldKind::Base { .. } => &[],
            FieldKind::Derived { parents, .. } => parents.as_slice(),
        })
    }

    pub fn children(&self, id: FieldId) -> FvmResult<&[FieldId]> {
        Ok(self.slot(id)?.children.as_slice())
    }

    /// Evaluate a derived field from one snapshot of its parents.
    fn evaluate(&self, parents: &[FieldId], func: &DeriveFn, old: bool) -> FvmResult<Array2<f64>> {
        let mut columns: Vec<ArrayView1<f64>> = Vec::with_capacity(parents.len());
        for &p in parents {
            let array = if old { self.old_value(p)? } else { self.values(p)? };
            columns.push(array.column(0));
        }
        let n = self.mesh.n_cells();
        let evaluated: Vec<f64> = (0..n)
            .into_par_iter()
            .map_init(
                || vec![0.0; parents.len()],
                |args, i| {
                    for (a, col) in args.iter_mut().zip(columns.iter()) {
                        *a = col[i];
                    }
                    func(args)
                },
            )
            .collect();
        Array2::from_shape_vec((n, 1), evaluated)
            .map_err(|e| FvmError::InvalidParameter(e.to_string()))
    }

    /// Current values; derived fields are evaluated on first read.
    pub fn values(&self, id: FieldId) -> FvmResult<&Array2<f64>> {
        let slot = self.slot(id)?;
        match &slot.kind {
            FieldKind::Base { values, .. } => Ok(values),
            FieldKind::Derived {
                parents,
                func,
                values,
                ..
            } => {
                if let Some(v) = values.get() {
                    return Ok(v);
                }
                let computed = self.evaluate(parents, func, false)?;
                Ok(values.get_or_init(|| computed))
            }
        }
    }

    /// Values of a scalar field as one slice.
    pub fn scalar(&self, id: FieldId) -> FvmResult<&[f64]> {
        let slot = self.slot(id)?;
        if slot.rank != 0 {
            return Err(FvmError::InvalidParameter(format!(
                "field '{}' is not scalar",
                slot.name
            )));
        }
        self.values(id)?.as_slice().ok_or_else(|| {
            FvmError::InvalidParameter(format!("field '{}' is not contiguous", slot.name))
        })
    }

    /// Snapshot taken by the last [`FieldStore::update_old`].
    pub fn old_value(&self, id: FieldId) -> FvmResult<&Array2<f64>> {
        let slot = self.slot(id)?;
        match &slot.kind {
            FieldKind::Base { old, .. } => Ok(old),
            FieldKind::Derived {
                parents, func, old, ..
            } => {
                if let Some(v) = old.get() {
                    return Ok(v);
                }
                let computed = self.evaluate(parents, func, true)?;
                Ok(old.get_or_init(|| computed))
            }
        }
    }

    pub fn old_scalar(&self, id: FieldId) -> FvmResult<&[f64]> {
        let slot = self.slot(id)?;
        if slot.rank != 0 {
            return Err(FvmError::InvalidParameter(format!(
                "field '{}' is not scalar",
                slot.name
            )));
        }
        self.old_value(id)?.as_slice().ok_or_else(|| {
            FvmError::InvalidParameter(format!("field '{}' is not contiguous", slot.name))
        })
    }

    /// Drop cached quantities of `id` and, transitively, of its children.
    fn invalidate(&mut self, id: FieldId, old_too: bool) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let slot = &mut self.slots[current.0];
            slot.drop_current_caches();
            if old_too {
                slot.drop_old_cache();
            }
            pending.extend(slot.children.iter().copied());
        }
    }

    fn base_values_mut(&mut self, id: FieldId) -> FvmResult<&mut Array2<f64>> {
        let slot = self.slot_mut(id)?;
        match &mut slot.kind {
            FieldKind::Base { values, .. } => Ok(values),
            FieldKind::Derived { .. } => Err(FvmError::ReadOnlyField(slot.name.clone())),
        }
    }

    fn check_subset(&self, id: FieldId, subset: &[usize]) -> FvmResult<()> {
        let slot = self.slot(id)?;
        let len = self.entity_len(slot.location);
        if let Some(&bad) = subset.iter().find(|&&i| i >= len) {
            return Err(FvmError::shape(
                format!("subset index of '{}'", slot.name),
                len,
                bad,
            ));
        }
        Ok(())
    }

    /// Set every component to `value`, on all entries or only on `subset`.
    pub fn set_value(&mut self, id: FieldId, value: f64, subset: Option<&[usize]>) -> FvmResult<()> {
        if let Some(s) = subset {
            self.check_subset(id, s)?;
        }
        let values = self.base_values_mut(id)?;
        match subset {
            None => values.fill(value),
            Some(s) => {
                for &i in s {
                    values.row_mut(i).fill(value);
                }
            }
        }
        self.invalidate(id, false);
        Ok(())
    }

    /// Write per-entry scalars; with `subset`, `values[k]` goes to `subset[k]`.
    pub fn set_scalars(
        &mut self,
        id: FieldId,
        new_values: &[f64],
        subset: Option<&[usize]>,
    ) -> FvmResult<()> {
        let (name, rank, len) = {
            let slot = self.slot(id)?;
            (slot.name.clone(), slot.rank, self.entity_len(slot.location))
        };
        if rank != 0 {
            return Err(FvmError::InvalidParameter(format!(
                "field '{name}' is not scalar"
            )));
        }
        let expected = subset.map_or(len, |s| s.len());
        if new_values.len() != expected {
            return Err(FvmError::shape(
                format!("values written to '{name}'"),
                expected,
                new_values.len(),
            ));
        }
        if let Some(s) = subset {
            self.check_subset(id, s)?;
        }
        let values = self.base_values_mut(id)?;
        match subset {
            None => {
                for (dst, &src) in values.iter_mut().zip(new_values) {
                    *dst = src;
                }
            }
            Some(s) => {
                for (&i, &src) in s.iter().zip(new_values) {
                    values[[i, 0]] = src;
                }
            }
        }
        self.invalidate(id, false);
        Ok(())
    }

    /// Replace the whole array of a base field.
    pub fn set_array(&mut self, id: FieldId, array: Array2<f64>) -> FvmResult<()> {
        let name = self.slot(id)?.name.clone();
        let values = self.base_values_mut(id)?;
        if values.dim() != array.dim() {
            return Err(FvmError::shape(
                format!("array written to '{name}'"),
                values.len(),
                array.len(),
            ));
        }
        *values = array;
        self.invalidate(id, false);
        Ok(())
    }

    /// Snapshot current values as "old" (base fields only).
    pub fn update_old(&mut self, id: FieldId) -> FvmResult<()> {
        let slot = self.slot_mut(id)?;
        match &mut slot.kind {
            FieldKind::Base { values, old } => old.assign(values),
            FieldKind::Derived { .. } => return Err(FvmError::ReadOnlyField(slot.name.clone())),
        }
        self.invalidate(id, true);
        Ok(())
    }

    /// Restore current values from the old snapshot.
    pub fn restore_old(&mut self, id: FieldId) -> FvmResult<()> {
        let slot = self.slot_mut(id)?;
        match &mut slot.kind {
            FieldKind::Base { values, old } => values.assign(old),
            FieldKind::Derived { .. } => return Err(FvmError::ReadOnlyField(slot.name.clone())),
        }
        self.invalidate(id, false);
        Ok(())
    }

    /// Face values: identity for face fields, linear interpolation for cell
    /// fields (owner value on boundary faces).
    pub fn face_values(&self, id: FieldId) -> FvmResult<&Array2<f64>> {
        let slot = self.slot(id)?;
        if slot.location == Location::Face {
            return self.values(id);
        }
        if let Some(v) = slot.face_cache.get() {
            return Ok(v);
        }
        let cells = self.values(id)?;
        let comps = cells.ncols();
        let faces = self.mesh.faces();
        let rows: Vec<f64> = faces
            .par_iter()
            .flat_map_iter(|face| {
                let p = face.owner;
                (0..comps).map(move |c| match face.neighbor {
                    Some(n) => face.weight * cells[[p, c]] + (1.0 - face.weight) * cells[[n, c]],
                    None => cells[[p, c]],
                })
            })
            .collect();
        let computed = Array2::from_shape_vec((faces.len(), comps), rows)
            .map_err(|e| FvmError::InvalidParameter(e.to_string()))?;
        Ok(slot.face_cache.get_or_init(|| computed))
    }

    /// Green–Gauss cell gradient of a scalar cell field, `(n_cells, dim)`.
    pub fn gradient(&self, id: FieldId) -> FvmResult<&Array2<f64>> {
        let slot = self.slot(id)?;
        if slot.location != Location::Cell || slot.rank != 0 {
            return Err(FvmError::InvalidParameter(format!(
                "gradient of '{}' needs a scalar cell field",
                slot.name
            )));
        }
        if let Some(g) = slot.gradient_cache.get() {
            return Ok(g);
        }
        let face_vals = self.face_values(id)?;
        let mesh = &*self.mesh;
        let dim = mesh.dim();
        let rows: Vec<f64> = mesh
            .cells()
            .par_iter()
            .enumerate()
            .flat_map_iter(|(i, cell)| {
                let mut g = [0.0; 2];
                for &k in &cell.faces {
                    let face = mesh.face(k);
                    let sign = if face.owner == i { 1.0 } else { -1.0 };
                    let flux = sign * face_vals[[k, 0]] * face.area;
                    g[0] += flux * face.normal[0];
                    g[1] += flux * face.normal[1];
                }
                let inv_v = 1.0 / cell.volume;
                g.into_iter().take(dim).map(move |c| c * inv_v)
            })
            .collect();
        let computed = Array2::from_shape_vec((mesh.n_cells(), dim), rows)
            .map_err(|e| FvmError::InvalidParameter(e.to_string()))?;
        Ok(slot.gradient_cache.get_or_init(|| computed))
    }

    pub fn cache_state(&self, id: FieldId) -> FvmResult<CacheState> {
        let slot = self.slot(id)?;
        let values = match &slot.kind {
            FieldKind::Base { .. } => true,
            FieldKind::Derived { values, .. } => values.get().is_some(),
        };
        Ok(CacheState {
            values,
            face_values: slot.face_cache.get().is_some(),
            gradient: slot.gradient_cache.get().is_some(),
        })
    }

    /// `|value - target| <= atol + rtol·|target|` on every entry.
    pub fn allclose(&self, id: FieldId, target: f64, rtol: f64, atol: f64) -> FvmResult<bool> {
        Ok(self
            .values(id)?
            .iter()
            .all(|&v| (v - target).abs() <= atol + rtol * target.abs()))
    }

    /// Volume-weighted integral of a scalar cell field.
    pub fn integral(&self, id: FieldId) -> FvmResult<f64> {
        let values = self.scalar(id)?;
        if self.slot(id)?.location != Location::Cell {
            return Err(FvmError::InvalidParameter(
                "integral needs a cell field".to_string(),
            ));
        }
        Ok(values
            .iter()
            .zip(self.mesh.cells())
            .map(|(v, c)| v * c.volume)
            .sum())
    }
}
