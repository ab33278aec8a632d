// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — FVM Types
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Shared types for the finite-volume engine: errors, model configuration
//! and the mesh topology provider consumed by the assembler.

pub mod config;
pub mod error;
pub mod mesh;
