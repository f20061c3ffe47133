// ─────────────────────────────────────────────────────────────────────
// SCPN Fission Core — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Linear extrapolation length in units of the transport mean free path
/// (Milne problem value) used at vacuum boundaries.
pub const EXTRAPOLATION_LENGTH: f64 = 0.71;

/// Relative tolerance for both inner flux sweeps and outer k updates.
pub const DEFAULT_RTOL: f64 = 1e-6;

/// Absolute tolerance for both inner flux sweeps and outer k updates.
pub const DEFAULT_ATOL: f64 = 1e-6;

/// Inner sweep cap per outer iteration.
pub const DEFAULT_MAX_INNER: usize = 10;

/// Outer (power) iteration cap.
pub const DEFAULT_MAX_OUTER: usize = 1000;

/// Number of triangular sectors in a subdivided hexagon.
pub const HEX_SECTORS: usize = 6;

/// External material-map value for a vacuum boundary cell.
pub const EXTERNAL_VACUUM: i32 = -1;

/// External material-map value for a reflective boundary cell.
pub const EXTERNAL_REFLECTIVE: i32 = -2;
