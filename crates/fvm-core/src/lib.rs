// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — FVM Core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Field store, term assembly and coupled sweep iteration.
//!
//! Data flows mesh → fields → terms → linear backend → fields, and the
//! [`iterator::CoupledIterator`] repeats sweeps until every equation's
//! residual drops below its tolerance.

pub mod boundary;
pub mod coefficient;
pub mod equation;
pub mod field;
pub mod iterator;
pub mod system;
pub mod terms;
