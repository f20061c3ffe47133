// ─────────────────────────────────────────────────────────────────────
// SCPN Fission Core — Flux Relaxation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Inner (flux) iteration: point relaxation of the multigroup balance
//!
//!   φ_new = (dif + S_scat + S_n2n + χ·F/k) / (mlt + Σ_r)
//!
//! for a frozen fission source `F` and eigenvalue `k`.
//!
//! Sweeps are double-buffered Jacobi: every value of sweep `n + 1` is
//! computed from the sweep-`n` field only, so the result does not depend on
//! the order (or the thread) in which nodes are visited. Rows `(z, y)` are
//! computed in parallel with Rayon and copied into the fresh buffer.

use crate::adjacency::{lateral_geometry, lateral_neighbors, LateralGeometry, AXIAL};
use crate::coupling::{couple, Coupling, Neighbor};
use fission_types::config::{within_tolerance, SolverConfig};
use fission_types::state::{Cell, CoreProblem, RelaxationStatus, TransferTable};
use ndarray::{s, Array3, Array4, Array5};
use rayon::prelude::*;

/// Group removal cross section: total minus within-group transfers.
///
/// A within-group (n,2n) event returns two neutrons to the group, so it
/// counts twice.
pub fn removal(problem: &CoreProblem, material: usize, group: usize) -> f64 {
    problem.xs.sigt[[material, group]]
        - problem.scattering.diagonal(material, group)
        - 2.0 * problem.n2n.diagonal(material, group)
}

/// In-scatter and (n,2n) source into `group` from other groups, with
/// `flux_of(g)` the node's current flux in group `g`.
pub fn transfer_source(
    scattering: &TransferTable,
    n2n: &TransferTable,
    material: usize,
    group: usize,
    flux_of: impl Fn(usize) -> f64,
) -> f64 {
    let scat: f64 = scattering
        .inbound(material, group)
        .map(|t| t.magnitude * flux_of(t.from))
        .sum();
    let mult: f64 = n2n
        .inbound(material, group)
        .map(|t| 2.0 * t.magnitude * flux_of(t.from))
        .sum();
    scat + mult
}

/// Leakage terms of node `(iz, iy, ix, it)` in `group`.
pub fn leakage(
    problem: &CoreProblem,
    flux: &Array5<f64>,
    lateral: LateralGeometry,
    node: [usize; 4],
    material: usize,
    group: usize,
) -> Coupling {
    let [iz, iy, ix, it] = node;
    let sigtra = problem.xs.sigtra[[material, group]];
    let mut acc = Coupling::default();

    for l in lateral_neighbors(problem.topology, iy, it) {
        let (jy, jx) = (iy as isize + l.dy, ix as isize + l.dx);
        let neighbor = match problem.map.cell_at(iz as isize, jy, jx) {
            Cell::Vacuum => Neighbor::Vacuum,
            Cell::Reflective => Neighbor::Reflective,
            Cell::Material(n) => Neighbor::Interior {
                sigtra: problem.xs.sigtra[[n, group]],
                spacing: lateral.spacing,
                flux: flux[[iz, jy as usize, jx as usize, l.sector, group]],
            },
        };
        acc += couple(sigtra, lateral.spacing, neighbor, lateral.area_over_volume);
    }

    let dz = &problem.mesh.dz;
    for offset in AXIAL {
        let jz = iz as isize + offset;
        let neighbor = match problem.map.cell_at(jz, iy as isize, ix as isize) {
            Cell::Vacuum => Neighbor::Vacuum,
            Cell::Reflective => Neighbor::Reflective,
            Cell::Material(n) => Neighbor::Interior {
                sigtra: problem.xs.sigtra[[n, group]],
                spacing: dz[jz as usize],
                flux: flux[[jz as usize, iy, ix, it, group]],
            },
        };
        acc += couple(sigtra, dz[iz], neighbor, 1.0 / dz[iz]);
    }
    acc
}

/// New flux of one node/sub-region/group from the snapshot `flux`.
#[allow(clippy::too_many_arguments)]
pub fn update_value(
    problem: &CoreProblem,
    flux: &Array5<f64>,
    source: &Array4<f64>,
    keff: f64,
    lateral: LateralGeometry,
    node: [usize; 4],
    material: usize,
    group: usize,
) -> f64 {
    let [iz, iy, ix, it] = node;
    let c = leakage(problem, flux, lateral, node, material, group);
    let transfer = transfer_source(&problem.scattering, &problem.n2n, material, group, |g| {
        flux[[iz, iy, ix, it, g]]
    });
    let fission = problem.xs.chi[[material, group]] * source[[iz, iy, ix, it]] / keff;
    (c.dif + transfer + fission) / (c.mlt + removal(problem, material, group))
}

/// One Jacobi sweep over row `(iz, iy)`. Returns the row `[nx, nt, ng]`
/// and whether every updated value passed the tolerance test.
#[allow(clippy::too_many_arguments)]
fn sweep_row(
    problem: &CoreProblem,
    flux: &Array5<f64>,
    source: &Array4<f64>,
    keff: f64,
    config: &SolverConfig,
    lateral: LateralGeometry,
    iz: usize,
    iy: usize,
) -> (Array3<f64>, bool) {
    let (_, _, nx, nt, ng) = flux.dim();
    let mut row = flux.slice(s![iz, iy, .., .., ..]).to_owned();
    let mut converged = true;

    for ix in 0..nx {
        let Some(m) = problem.map.get(iz, iy, ix).material() else {
            continue;
        };
        for it in 0..nt {
            for ig in 0..ng {
                let old = flux[[iz, iy, ix, it, ig]];
                let new = update_value(problem, flux, source, keff, lateral, [iz, iy, ix, it], m, ig);
                if !within_tolerance(new, old, config.inner_rtol, config.inner_atol) {
                    converged = false;
                }
                row[[ix, it, ig]] = new;
            }
        }
    }
    (row, converged)
}

/// One full Jacobi sweep. Non-interior cells keep their values.
///
/// # Panics
///
/// If `flux` is not `problem.flux_shape()` or `source` is not its first four
/// axes. [`crate::eigenvalue::solve`] checks both before sweeping.
pub fn sweep(
    problem: &CoreProblem,
    flux: &Array5<f64>,
    source: &Array4<f64>,
    keff: f64,
    config: &SolverConfig,
) -> (Array5<f64>, bool) {
    let (nz, ny, _, _, _) = flux.dim();
    let lateral = lateral_geometry(problem.topology, problem.mesh.pitch);
    let rows: Vec<(Array3<f64>, bool)> = (0..nz * ny)
        .into_par_iter()
        .map(|r| sweep_row(problem, flux, source, keff, config, lateral, r / ny, r % ny))
        .collect();

    let mut next = flux.clone();
    let mut converged = true;
    for (r, (row, ok)) in rows.into_iter().enumerate() {
        next.slice_mut(s![r / ny, r % ny, .., .., ..]).assign(&row);
        converged &= ok;
    }
    (next, converged)
}

/// Relax `flux` in place until every value converges or `max_inner` sweeps
/// have run. Hitting the cap is not an error: the last sweep is kept.
pub fn relax(
    problem: &CoreProblem,
    flux: &mut Array5<f64>,
    source: &Array4<f64>,
    keff: f64,
    config: &SolverConfig,
) -> RelaxationStatus {
    let mut status = RelaxationStatus {
        converged: false,
        sweeps: 0,
    };
    while status.sweeps < config.max_inner {
        let (next, converged) = sweep(problem, flux, source, keff, config);
        *flux = next;
        status.sweeps += 1;
        if converged {
            status.converged = true;
            break;
        }
    }
    tracing::debug!(
        sweeps = status.sweeps,
        converged = status.converged,
        "inner relaxation finished"
    );
    status
}
