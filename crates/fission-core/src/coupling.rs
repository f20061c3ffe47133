// ─────────────────────────────────────────────────────────────────────
// SCPN Fission Core — Coupling
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Two-node finite-difference diffusion coupling.
//!
//! Each face contributes `D·(A/V)/d` to the node's diagonal (`mlt`) and
//! `D·φ_n·(A/V)/d` to its source (`dif`), where `d` is the centre-to-centre
//! (or centre-to-extrapolated-boundary) distance and `D` the effective
//! diffusion coefficient of the face:
//!
//!   vacuum:     d = Δ/2 + 0.71/Σtr,   D = 1/(3Σtr),   φ_n = 0
//!   reflective: no contribution
//!   interior:   d = (Δ + Δ_n)/2,      D = 2 / (3Σtr·Δ/d + 3Σtr_n·Δ_n/d)

use fission_types::constants::EXTRAPOLATION_LENGTH;
use std::ops::AddAssign;

/// What lies across a face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Neighbor {
    Vacuum,
    Reflective,
    Interior {
        /// Neighbour transport cross section, same group.
        sigtra: f64,
        /// Neighbour node size normal to the face.
        spacing: f64,
        /// Neighbour flux, same sub-region and group.
        flux: f64,
    },
}

/// Accumulated leakage terms of one node balance.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Coupling {
    /// Diagonal (loss) coefficient.
    pub mlt: f64,
    /// Inflow from neighbour fluxes.
    pub dif: f64,
}

impl AddAssign for Coupling {
    fn add_assign(&mut self, rhs: Self) {
        self.mlt += rhs.mlt;
        self.dif += rhs.dif;
    }
}

/// Coupling of a node (transport xs `sigtra`, size `spacing` normal to the
/// face) to `neighbor` through a face with area-to-volume ratio
/// `area_over_volume`.
#[inline]
pub fn couple(sigtra: f64, spacing: f64, neighbor: Neighbor, area_over_volume: f64) -> Coupling {
    let (distance, d, flux) = match neighbor {
        Neighbor::Vacuum => (
            0.5 * spacing + EXTRAPOLATION_LENGTH / sigtra,
            1.0 / (3.0 * sigtra),
            0.0,
        ),
        Neighbor::Reflective => (1.0, 0.0, 0.0),
        Neighbor::Interior {
            sigtra: sigtra_n,
            spacing: spacing_n,
            flux,
        } => {
            let distance = 0.5 * (spacing + spacing_n);
            let d = 2.0 / (3.0 * sigtra * spacing / distance + 3.0 * sigtra_n * spacing_n / distance);
            (distance, d, flux)
        }
    };
    let mlt = d * area_over_volume / distance;
    Coupling {
        mlt,
        dif: mlt * flux,
    }
}
