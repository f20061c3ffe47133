// ─────────────────────────────────────────────────────────────────────
// SCPN Fission Core — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::{DEFAULT_ATOL, DEFAULT_MAX_INNER, DEFAULT_MAX_OUTER, DEFAULT_RTOL};
use crate::error::{FissionError, FissionResult};
use serde::{Deserialize, Serialize};

/// Power-iteration controls.
///
/// Every field is optional in JSON; missing fields take the defaults
/// (1e-6 tolerances, 10 inner sweeps, 1000 outer iterations, k = 1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Relative tolerance of the per-value inner convergence test.
    pub inner_rtol: f64,
    /// Absolute tolerance of the per-value inner convergence test.
    pub inner_atol: f64,
    /// Inner sweep cap (soft: the last sweep is kept).
    pub max_inner: usize,
    /// Relative tolerance on successive k-effective estimates.
    pub outer_rtol: f64,
    /// Absolute tolerance on successive k-effective estimates.
    pub outer_atol: f64,
    /// Outer iteration cap (soft).
    pub max_outer: usize,
    /// Starting k-effective estimate.
    pub initial_keff: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            inner_rtol: DEFAULT_RTOL,
            inner_atol: DEFAULT_ATOL,
            max_inner: DEFAULT_MAX_INNER,
            outer_rtol: DEFAULT_RTOL,
            outer_atol: DEFAULT_ATOL,
            max_outer: DEFAULT_MAX_OUTER,
            initial_keff: 1.0,
        }
    }
}

impl SolverConfig {
    /// Load from a JSON file.
    pub fn from_file(path: &str) -> FissionResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse from a JSON string and validate.
    pub fn from_json(json: &str) -> FissionResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> FissionResult<()> {
        if self.max_inner == 0 || self.max_outer == 0 {
            return Err(FissionError::ConfigError(format!(
                "iteration caps must be >= 1: max_inner={}, max_outer={}",
                self.max_inner, self.max_outer
            )));
        }
        let tols = [
            ("inner_rtol", self.inner_rtol),
            ("inner_atol", self.inner_atol),
            ("outer_rtol", self.outer_rtol),
            ("outer_atol", self.outer_atol),
        ];
        for (name, tol) in tols {
            if !tol.is_finite() || tol < 0.0 {
                return Err(FissionError::ConfigError(format!(
                    "{name} must be finite and >= 0, got {tol}"
                )));
            }
        }
        if !self.initial_keff.is_finite() || self.initial_keff == 0.0 {
            return Err(FissionError::ConfigError(format!(
                "initial_keff must be finite and non-zero, got {}",
                self.initial_keff
            )));
        }
        Ok(())
    }
}

/// `|new - old| < rtol * |new| + atol`
#[inline]
pub fn within_tolerance(new: f64, old: f64, rtol: f64, atol: f64) -> bool {
    (new - old).abs() < rtol * new.abs() + atol
}
