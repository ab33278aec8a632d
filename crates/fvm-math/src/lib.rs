// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — FVM Math
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Sparse linear algebra for the finite-volume engine.
//!
//! All backends implement [`solver::LinearSolve`] and are selected through
//! [`solver::build_solver`].

pub mod banded;
pub mod csr;
pub mod gmres;
pub mod krylov;
pub mod solver;
pub mod sor;
pub mod tridiag;
pub mod vector_ops;
