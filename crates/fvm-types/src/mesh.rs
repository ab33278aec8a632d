// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — Mesh
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Cell/face topology consumed by the assembler.
//!
//! Faces store a unit normal pointing out of their owner cell and into the
//! neighbour (if any). Structured grids are built by [`Mesh::grid_1d`] and
//! [`Mesh::grid_2d`]; arbitrary topologies go through [`Mesh::from_parts`],
//! which validates orientation and indices.

use crate::error::{FvmError, FvmResult};

/// Relative tolerance used when checking unit normals.
const NORMAL_TOL: f64 = 1e-9;

/// A control volume.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// Cell volume (area in 2D, length in 1D, unit depth implied).
    pub volume: f64,
    /// Cell centroid.
    pub center: [f64; 2],
    /// Incident face indices.
    pub faces: Vec<usize>,
}

/// A face between an owner cell and an optional neighbour.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub area: f64,
    /// Unit normal, out of `owner`.
    pub normal: [f64; 2],
    pub center: [f64; 2],
    pub owner: usize,
    /// `None` on the domain boundary.
    pub neighbor: Option<usize>,
    /// Owner-to-neighbour centre distance; owner-centre to face-centre on
    /// the boundary.
    pub distance: f64,
    /// Owner weight for linear interpolation to the face (1 on the boundary).
    pub weight: f64,
}

impl Face {
    #[inline]
    pub fn is_boundary(&self) -> bool {
        self.neighbor.is_none()
    }
}

/// Finite-volume mesh.
#[derive(Debug, Clone)]
pub struct Mesh {
    dim: usize,
    cells: Vec<Cell>,
    faces: Vec<Face>,
    lower: [f64; 2],
    upper: [f64; 2],
}

impl Mesh {
    /// Uniform 1D grid of `nx` cells of width `dx` starting at x = 0.
    ///
    /// Faces have unit area so cell volume equals `dx`.
    pub fn grid_1d(nx: usize, dx: f64) -> FvmResult<Self> {
        check_spacing("dx", dx)?;
        if nx == 0 {
            return Err(FvmError::InvalidParameter(
                "grid_1d requires nx >= 1".to_string(),
            ));
        }

        let cells: Vec<Cell> = (0..nx)
            .map(|i| Cell {
                volume: dx,
                center: [(i as f64 + 0.5) * dx, 0.0],
                faces: Vec::new(),
            })
            .collect();

        let mut faces = Vec::with_capacity(nx + 1);
        // Left boundary
        faces.push(Face {
            area: 1.0,
            normal: [-1.0, 0.0],
            center: [0.0, 0.0],
            owner: 0,
            neighbor: None,
            distance: 0.5 * dx,
            weight: 1.0,
        });
        for i in 1..nx {
            faces.push(Face {
                area: 1.0,
                normal: [1.0, 0.0],
                center: [i as f64 * dx, 0.0],
                owner: i - 1,
                neighbor: Some(i),
                distance: dx,
                weight: 0.5,
            });
        }
        // Right boundary
        faces.push(Face {
            area: 1.0,
            normal: [1.0, 0.0],
            center: [nx as f64 * dx, 0.0],
            owner: nx - 1,
            neighbor: None,
            distance: 0.5 * dx,
            weight: 1.0,
        });

        let mut mesh = Mesh {
            dim: 1,
            cells,
            faces,
            lower: [0.0, 0.0],
            upper: [nx as f64 * dx, 0.0],
        };
        mesh.link_faces();
        Ok(mesh)
    }

    /// Uniform 2D grid of `nx × ny` cells, cell `(i, j)` at index `i + j·nx`.
    ///
    /// Face order: all x-normal faces row by row, then all y-normal faces.
    pub fn grid_2d(nx: usize, ny: usize, dx: f64, dy: f64) -> FvmResult<Self> {
        check_spacing("dx", dx)?;
        check_spacing("dy", dy)?;
        if nx == 0 || ny == 0 {
            return Err(FvmError::InvalidParameter(format!(
                "grid_2d requires nx, ny >= 1, got nx={nx}, ny={ny}"
            )));
        }

        let idx = |i: usize, j: usize| i + j * nx;
        let mut cells = Vec::with_capacity(nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                cells.push(Cell {
                    volume: dx * dy,
                    center: [(i as f64 + 0.5) * dx, (j as f64 + 0.5) * dy],
                    faces: Vec::new(),
                });
            }
        }

        let mut faces = Vec::with_capacity((nx + 1) * ny + nx * (ny + 1));
        for j in 0..ny {
            let yc = (j as f64 + 0.5) * dy;
            for i in 0..=nx {
                let center = [i as f64 * dx, yc];
                let face = if i == 0 {
                    Face {
                        area: dy,
                        normal: [-1.0, 0.0],
                        center,
                        owner: idx(0, j),
                        neighbor: None,
                        distance: 0.5 * dx,
                        weight: 1.0,
                    }
                } else if i == nx {
                    Face {
                        area: dy,
                        normal: [1.0, 0.0],
                        center,
                        owner: idx(nx - 1, j),
                        neighbor: None,
                        distance: 0.5 * dx,
                        weight: 1.0,
                    }
                } else {
                    Face {
                        area: dy,
                        normal: [1.0, 0.0],
                        center,
                        owner: idx(i - 1, j),
                        neighbor: Some(idx(i, j)),
                        distance: dx,
                        weight: 0.5,
                    }
                };
                faces.push(face);
            }
        }
        for j in 0..=ny {
            for i in 0..nx {
                let center = [(i as f64 + 0.5) * dx, j as f64 * dy];
                let face = if j == 0 {
                    Face {
                        area: dx,
                        normal: [0.0, -1.0],
                        center,
                        owner: idx(i, 0),
                        neighbor: None,
                        distance: 0.5 * dy,
                        weight: 1.0,
                    }
                } else if j == ny {
                    Face {
                        area: dx,
                        normal: [0.0, 1.0],
                        center,
                        owner: idx(i, ny - 1),
                        neighbor: None,
                        distance: 0.5 * dy,
                        weight: 1.0,
                    }
                } else {
                    Face {
                        area: dx,
                        normal: [0.0, 1.0],
                        center,
                        owner: idx(i, j - 1),
                        neighbor: Some(idx(i, j)),
                        distance: dy,
                        weight: 0.5,
                    }
                };
                faces.push(face);
            }
        }

        let mut mesh = Mesh {
            dim: 2,
            cells,
            faces,
            lower: [0.0, 0.0],
            upper: [nx as f64 * dx, ny as f64 * dy],
        };
        mesh.link_faces();
        Ok(mesh)
    }

    /// Build a mesh from explicit geometry.
    ///
    /// The incident-face lists of `cells` are rebuilt from `faces`.
    pub fn from_parts(dim: usize, cells: Vec<Cell>, faces: Vec<Face>) -> FvmResult<Self> {
        if dim == 0 || dim > 2 {
            return Err(FvmError::InvalidParameter(format!(
                "mesh dimension must be 1 or 2, got {dim}"
            )));
        }
        let n = cells.len();
        if n == 0 {
            return Err(FvmError::InvalidParameter(
                "mesh must contain at least one cell".to_string(),
            ));
        }
        for (i, cell) in cells.iter().enumerate() {
            if !cell.volume.is_finite() || cell.volume <= 0.0 {
                return Err(FvmError::InvalidParameter(format!(
                    "cell {i} volume must be finite and > 0, got {}",
                    cell.volume
                )));
            }
        }
        for (k, face) in faces.iter().enumerate() {
            if face.owner >= n {
                return Err(FvmError::shape(format!("owner of face {k}"), n, face.owner));
            }
            if let Some(nb) = face.neighbor {
                if nb >= n {
                    return Err(FvmError::shape(format!("neighbour of face {k}"), n, nb));
                }
                if nb == face.owner {
                    return Err(FvmError::ConfigError(format!(
                        "face {k} has identical owner and neighbour {nb}"
                    )));
                }
                let c_p = cells[face.owner].center;
                let c_n = cells[nb].center;
                let along = (c_n[0] - c_p[0]) * face.normal[0] + (c_n[1] - c_p[1]) * face.normal[1];
                if along <= 0.0 {
                    return Err(FvmError::ConfigError(format!(
                        "face {k} normal does not point from owner {} to neighbour {nb}",
                        face.owner
                    )));
                }
            }
            if !face.area.is_finite() || face.area <= 0.0 {
                return Err(FvmError::InvalidParameter(format!(
                    "face {k} area must be finite and > 0, got {}",
                    face.area
                )));
            }
            if !face.distance.is_finite() || face.distance <= 0.0 {
                return Err(FvmError::InvalidParameter(format!(
                    "face {k} distance must be finite and > 0, got {}",
                    face.distance
                )));
            }
            if !(0.0..=1.0).contains(&face.weight) {
                return Err(FvmError::InvalidParameter(format!(
                    "face {k} interpolation weight must lie in [0, 1], got {}",
                    face.weight
                )));
            }
            let norm = (face.normal[0].powi(2) + face.normal[1].powi(2)).sqrt();
            if (norm - 1.0).abs() > NORMAL_TOL {
                return Err(FvmError::InvalidParameter(format!(
                    "face {k} normal must be a unit vector, |n|={norm}"
                )));
            }
        }

        let mut lower = [f64::INFINITY; 2];
        let mut upper = [f64::NEG_INFINITY; 2];
        for p in cells
            .iter()
            .map(|c| c.center)
            .chain(faces.iter().map(|f| f.center))
        {
            for d in 0..2 {
                lower[d] = lower[d].min(p[d]);
                upper[d] = upper[d].max(p[d]);
            }
        }

        let mut mesh = Mesh {
            dim,
            cells,
            faces,
            lower,
            upper,
        };
        mesh.link_faces();
        Ok(mesh)
    }

    fn link_faces(&mut self) {
        for cell in &mut self.cells {
            cell.faces.clear();
        }
        for (k, face) in self.faces.iter().enumerate() {
            self.cells[face.owner].faces.push(k);
            if let Some(nb) = face.neighbor {
                self.cells[nb].faces.push(k);
            }
        }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[inline]
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    #[inline]
    pub fn cell(&self, i: usize) -> &Cell {
        &self.cells[i]
    }

    #[inline]
    pub fn face(&self, k: usize) -> &Face {
        &self.faces[k]
    }

    /// Bounding box `(lower, upper)` of all cell and face centres.
    pub fn extent(&self) -> ([f64; 2], [f64; 2]) {
        (self.lower, self.upper)
    }

    pub fn total_volume(&self) -> f64 {
        self.cells.iter().map(|c| c.volume).sum()
    }

    pub fn interior_faces(&self) -> impl Iterator<Item = (usize, &Face)> + '_ {
        self.faces.iter().enumerate().filter(|(_, f)| !f.is_boundary())
    }

    pub fn boundary_faces(&self) -> impl Iterator<Item = (usize, &Face)> + '_ {
        self.faces.iter().enumerate().filter(|(_, f)| f.is_boundary())
    }

    /// Indices of cells whose centre satisfies `filter`.
    pub fn cells_where<F: Fn([f64; 2]) -> bool>(&self, filter: F) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| filter(c.center))
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices of boundary faces whose centre satisfies `filter`.
    pub fn boundary_faces_where<F: Fn([f64; 2]) -> bool>(&self, filter: F) -> Vec<usize> {
        self.boundary_faces()
            .filter(|(_, f)| filter(f.center))
            .map(|(k, _)| k)
            .collect()
    }

    /// Boundary faces with outward normal `-x`.
    pub fn left_faces(&self) -> Vec<usize> {
        self.boundary_faces_by_normal([-1.0, 0.0])
    }

    /// Boundary faces with outward normal `+x`.
    pub fn right_faces(&self) -> Vec<usize> {
        self.boundary_faces_by_normal([1.0, 0.0])
    }

    /// Boundary faces with outward normal `-y`.
    pub fn bottom_faces(&self) -> Vec<usize> {
        self.boundary_faces_by_normal([0.0, -1.0])
    }

    /// Boundary faces with outward normal `+y`.
    pub fn top_faces(&self) -> Vec<usize> {
        self.boundary_faces_by_normal([0.0, 1.0])
    }

    fn boundary_faces_by_normal(&self, direction: [f64; 2]) -> Vec<usize> {
        self.boundary_faces()
            .filter(|(_, f)| f.normal[0] * direction[0] + f.normal[1] * direction[1] > 1.0 - NORMAL_TOL)
            .map(|(k, _)| k)
            .collect()
    }
}

fn check_spacing(name: &str, value: f64) -> FvmResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(FvmError::InvalidParameter(format!(
            "grid spacing {name} must be finite and > 0, got {value}"
        )));
    }
    Ok(())
}
