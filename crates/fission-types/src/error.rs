// ─────────────────────────────────────────────────────────────────────
// SCPN Fission Core — Errors
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FissionError {
    #[error("Unknown mesh topology flag: {0:?} (expected one of \"cart\", \"hex01\", \"hex06\")")]
    UnknownTopology(String),

    #[error("Solver diverged at outer iteration {iteration}: {message}")]
    SolverDiverged { iteration: usize, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Invalid material map value {value} at (z={iz}, y={iy}, x={ix}): {reason}")]
    InvalidMaterial {
        iz: usize,
        iy: usize,
        ix: usize,
        value: i32,
        reason: String,
    },

    #[error("Invalid transfer entry for material {material}: {reason}")]
    InvalidTransfer { material: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FissionResult<T> = Result<T, FissionError>;
