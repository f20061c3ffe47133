// ─────────────────────────────────────────────────────────────────────
// SCPN Fission Core — Power Iteration
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Outer (eigenvalue) iteration.
//!
//! The fission source starts at 1.0 in every node. Each outer step relaxes
//! the flux against `F/k`, rebuilds `F = Σ_g νΣf·φ` and takes its total as
//! the new `k`. The flux is never renormalised, so the previous source
//! total is 1.0 by construction and the ratio reduces to the new total.

use crate::relaxation::relax;
use fission_types::config::{within_tolerance, SolverConfig};
use fission_types::error::{FissionError, FissionResult};
use fission_types::state::{CoreProblem, EigenvalueSolution};
use ndarray::{s, Array2, Array4, Array5};
use rayon::prelude::*;

/// Fission source of row `(iz, iy)` `[nx, nt]` and its sum.
fn row_source(problem: &CoreProblem, flux: &Array5<f64>, iz: usize, iy: usize) -> (Array2<f64>, f64) {
    let (_, _, nx, nt, ng) = flux.dim();
    let mut row = Array2::zeros((nx, nt));
    let mut total = 0.0;
    for ix in 0..nx {
        let Some(m) = problem.map.get(iz, iy, ix).material() else {
            continue;
        };
        for it in 0..nt {
            let f: f64 = (0..ng)
                .map(|ig| problem.xs.sigp[[m, ig]] * flux[[iz, iy, ix, it, ig]])
                .sum();
            row[[ix, it]] = f;
            total += f;
        }
    }
    (row, total)
}

/// Fission source field `[nz, ny, nx, nt]` of `flux` and its total.
/// Non-interior nodes carry zero.
///
/// # Panics
///
/// If `flux` is not `problem.flux_shape()`.
pub fn fission_source(problem: &CoreProblem, flux: &Array5<f64>) -> (Array4<f64>, f64) {
    let (nz, ny, nx, nt, _) = flux.dim();
    let rows: Vec<(Array2<f64>, f64)> = (0..nz * ny)
        .into_par_iter()
        .map(|r| row_source(problem, flux, r / ny, r % ny))
        .collect();

    let mut source = Array4::zeros((nz, ny, nx, nt));
    let mut total = 0.0;
    for (r, (row, sum)) in rows.into_iter().enumerate() {
        source.slice_mut(s![r / ny, r % ny, .., ..]).assign(&row);
        total += sum;
    }
    (source, total)
}

/// Solve for k-effective and the fundamental-mode flux.
///
/// `flux` is the initial guess and receives the result. Returns
/// [`FissionError::SolverDiverged`] if k becomes NaN; reaching either
/// iteration cap is reported through `converged = false` only.
pub fn solve(
    problem: &CoreProblem,
    flux: &mut Array5<f64>,
    config: &SolverConfig,
) -> FissionResult<EigenvalueSolution> {
    config.validate()?;
    problem.check_flux(flux)?;

    let (nz, ny, nx, nt, _) = problem.flux_shape();
    tracing::debug!(
        topology = %problem.topology,
        interior = problem.map.interior_count(),
        "starting power iteration"
    );
    let mut source = Array4::from_elem((nz, ny, nx, nt), 1.0);
    let mut solution = EigenvalueSolution {
        keff: config.initial_keff,
        converged: false,
        outer_iterations: 0,
        inner_sweeps: 0,
        inner_capped: 0,
        keff_history: Vec::new(),
    };

    while solution.outer_iterations < config.max_outer {
        solution.outer_iterations += 1;
        let outer = solution.outer_iterations;

        let status = relax(problem, flux, &source, solution.keff, config);
        solution.inner_sweeps += status.sweeps;
        if !status.converged {
            solution.inner_capped += 1;
        }

        let (next_source, total) = fission_source(problem, flux);
        source = next_source;
        let keff = total;
        if keff.is_nan() {
            return Err(FissionError::SolverDiverged {
                iteration: outer,
                message: "k-effective is NaN (disconnected mesh, inconsistent cross sections \
                          or no fissile material?)"
                    .to_string(),
            });
        }

        let done = within_tolerance(keff, solution.keff, config.outer_rtol, config.outer_atol);
        solution.keff = keff;
        solution.keff_history.push(keff);
        tracing::info!(outer, keff, sweeps = status.sweeps, "power iteration");

        if done {
            solution.converged = true;
            break;
        }
    }

    if !solution.converged {
        tracing::warn!(
            outer = solution.outer_iterations,
            keff = solution.keff,
            "outer iteration cap reached without convergence"
        );
    }
    if solution.inner_capped > 0 {
        tracing::warn!(
            capped = solution.inner_capped,
            max_inner = config.max_inner,
            "inner relaxation hit the sweep cap"
        );
    }
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fission_types::state::{MaterialMap, MaterialProperties, Mesh, Topology, TransferTable};
    use ndarray::{arr2, Array3};

    fn single_node(sigt: f64, sigp: f64) -> CoreProblem {
        let mut map = Array3::from_elem((3, 3, 3), -2);
        map[[1, 1, 1]] = 0;
        CoreProblem::new(
            Topology::Cartesian,
            Mesh::new(3, 3, 5.0, vec![5.0; 3]).unwrap(),
            MaterialMap::from_external(&map, 1).unwrap(),
            MaterialProperties::new(
                arr2(&[[sigt]]),
                arr2(&[[0.3]]),
                arr2(&[[sigp]]),
                arr2(&[[1.0]]),
            )
            .unwrap(),
            TransferTable::empty(1),
            TransferTable::empty(1),
        )
        .unwrap()
    }

    #[test]
    fn test_infinite_medium_eigenvalue() {
        let p = single_node(0.5, 0.6);
        let mut flux = p.initial_flux();
        let sol = solve(&p, &mut flux, &SolverConfig::default()).unwrap();
        assert!(sol.converged);
        assert!((sol.keff - 1.2).abs() < 1e-12, "k = {}", sol.keff);
        assert_eq!(sol.outer_iterations, 2);
        assert_eq!(sol.keff_history.len(), 2);
    }

    #[test]
    fn test_fission_source_total() {
        let p = single_node(0.5, 0.6);
        let flux = p.initial_flux() * 2.0;
        let (source, total) = fission_source(&p, &flux);
        assert!((total - 1.2).abs() < 1e-15);
        assert!((source[[1, 1, 1, 0]] - 1.2).abs() < 1e-15);
        assert_eq!(source[[0, 0, 0, 0]], 0.0);
    }

    #[test]
    fn test_zero_production_diverges() {
        let p = single_node(0.5, 0.0);
        let mut flux = p.initial_flux();
        let err = solve(&p, &mut flux, &SolverConfig::default()).unwrap_err();
        match err {
            FissionError::SolverDiverged { iteration, .. } => assert_eq!(iteration, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_outer_cap_is_soft() {
        let p = single_node(0.5, 0.6);
        let mut flux = p.initial_flux();
        let config = SolverConfig {
            max_outer: 1,
            ..SolverConfig::default()
        };
        let sol = solve(&p, &mut flux, &config).unwrap();
        assert!(!sol.converged);
        assert_eq!(sol.outer_iterations, 1);
        assert!((sol.keff - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_wrong_flux_shape() {
        let p = single_node(0.5, 0.6);
        let mut flux = Array5::zeros((1, 1, 1, 1, 1));
        assert!(matches!(
            solve(&p, &mut flux, &SolverConfig::default()),
            Err(FissionError::ShapeMismatch { what: "flux", .. })
        ));
    }

    /// Homogeneous one-group z-slab, `n` nodes of thickness `h`. The lateral
    /// pitch is large enough that lateral vacuum leakage is negligible.
    fn z_slab(n: usize, h: f64, bottom: i32) -> CoreProblem {
        let mut map = Array3::from_elem((n + 1, 1, 1), 0);
        map[[0, 0, 0]] = bottom;
        CoreProblem::from_external(
            "cart",
            Mesh::new(1, 1, 1.0e6, vec![h; n + 1]).unwrap(),
            &map,
            MaterialProperties::new(
                arr2(&[[0.05]]),
                arr2(&[[0.3]]),
                arr2(&[[0.06]]),
                arr2(&[[1.0]]),
            )
            .unwrap(),
            TransferTable::empty(1),
            TransferTable::empty(1),
        )
        .unwrap()
    }

    #[test]
    fn test_bare_slab_matches_one_group_buckling() {
        let (n, h) = (25, 4.0);
        let (sigt, sigtr, sigp) = (0.02, 0.3, 0.025);
        let map = Array3::from_elem((n, 1, 1), 0);
        let p = CoreProblem::from_external(
            "cart",
            Mesh::new(1, 1, 1.0e6, vec![h; n]).unwrap(),
            &map,
            MaterialProperties::new(
                arr2(&[[sigt]]),
                arr2(&[[sigtr]]),
                arr2(&[[sigp]]),
                arr2(&[[1.0]]),
            )
            .unwrap(),
            TransferTable::empty(1),
            TransferTable::empty(1),
        )
        .unwrap();
        let mut flux = p.initial_flux();
        let sol = solve(&p, &mut flux, &SolverConfig::default()).unwrap();
        assert!(sol.converged);

        let height = n as f64 * h + 2.0 * 0.71 / sigtr;
        let b = std::f64::consts::PI / height;
        let k_exact = sigp / (sigt + b * b / (3.0 * sigtr));
        let rel = (sol.keff - k_exact).abs() / k_exact;
        assert!(rel < 5e-4, "k = {}, exact = {k_exact}, rel = {rel}", sol.keff);

        // Cosine-like shape: symmetric, peaked in the middle.
        let mid = flux[[n / 2, 0, 0, 0, 0]];
        assert!(mid > flux[[0, 0, 0, 0, 0]]);
        assert!((flux[[0, 0, 0, 0, 0]] - flux[[n - 1, 0, 0, 0, 0]]).abs() < 1e-3 * mid);
    }

    #[test]
    fn test_reflective_boundary_raises_edge_flux() {
        let vac = z_slab(5, 10.0, -1);
        let refl = z_slab(5, 10.0, -2);
        let mut flux_vac = vac.initial_flux();
        let mut flux_refl = refl.initial_flux();
        let sol_vac = solve(&vac, &mut flux_vac, &SolverConfig::default()).unwrap();
        let sol_refl = solve(&refl, &mut flux_refl, &SolverConfig::default()).unwrap();
        assert!(sol_refl.keff > sol_vac.keff);
        assert!(
            flux_refl[[1, 0, 0, 0, 0]] >= flux_vac[[1, 0, 0, 0, 0]],
            "reflective {} < vacuum {}",
            flux_refl[[1, 0, 0, 0, 0]],
            flux_vac[[1, 0, 0, 0, 0]]
        );
    }

    #[test]
    fn test_hex_topologies_reflective_core_is_infinite_medium() {
        for flag in ["hex01", "hex06"] {
            let mut map = Array3::from_elem((4, 5, 5), -2);
            for iz in 1..3 {
                for iy in 1..4 {
                    for ix in 1..4 {
                        map[[iz, iy, ix]] = 0;
                    }
                }
            }
            let p = CoreProblem::from_external(
                flag,
                Mesh::new(5, 5, 15.0, vec![20.0; 4]).unwrap(),
                &map,
                MaterialProperties::new(
                    arr2(&[[0.4]]),
                    arr2(&[[0.25]]),
                    arr2(&[[0.44]]),
                    arr2(&[[1.0]]),
                )
                .unwrap(),
                TransferTable::empty(1),
                TransferTable::empty(1),
            )
            .unwrap();
            let mut flux = p.initial_flux();
            let sol = solve(&p, &mut flux, &SolverConfig::default()).unwrap();
            assert!(sol.converged, "{flag}");
            assert!((sol.keff - 1.1).abs() < 1e-5, "{flag}: k = {}", sol.keff);
        }
    }

    /// Single 9x9 layer between reflective layers, vacuum rim.
    fn bare_layer(flag: &str) -> CoreProblem {
        let n = 9;
        let map = Array3::from_shape_fn((3, n, n), |(z, y, x)| {
            if z != 1 {
                -2
            } else if y == 0 || x == 0 || y == n - 1 || x == n - 1 {
                -1
            } else {
                0
            }
        });
        CoreProblem::from_external(
            flag,
            Mesh::new(n, n, 10.0, vec![20.0; 3]).unwrap(),
            &map,
            MaterialProperties::new(
                arr2(&[[0.1]]),
                arr2(&[[0.25]]),
                arr2(&[[0.115]]),
                arr2(&[[1.0]]),
            )
            .unwrap(),
            TransferTable::empty(1),
            TransferTable::empty(1),
        )
        .unwrap()
    }

    #[test]
    fn test_hex_triangles_match_hexagons_in_bare_layer() {
        let config = SolverConfig {
            outer_rtol: 1e-9,
            outer_atol: 1e-9,
            max_outer: 5000,
            ..SolverConfig::default()
        };
        let mut keff = Vec::new();
        for flag in ["hex01", "hex06"] {
            let p = bare_layer(flag);
            let mut flux = p.initial_flux();
            let sol = solve(&p, &mut flux, &config).unwrap();
            assert!(sol.converged, "{flag}");
            // Leakage makes the centre hotter than the rim.
            let nt = p.topology.sub_regions();
            assert!(flux[[1, 4, 4, 0, 0]] > 1.5 * flux[[1, 1, 4, 0, 0]], "{flag}");
            assert!(flux[[1, 4, 4, nt - 1, 0]] > 1.5 * flux[[1, 4, 1, nt - 1, 0]], "{flag}");
            keff.push(sol.keff);
        }
        // Both well below the infinite-medium 1.15.
        assert!(keff.iter().all(|&k| k < 1.12), "{keff:?}");
        let rel = (keff[1] - keff[0]).abs() / keff[0];
        assert!(rel < 5e-3, "hex01 k = {}, hex06 k = {}", keff[0], keff[1]);
    }

    #[test]
    fn test_fission_source_single_layer_rows() {
        let p = bare_layer("hex06");
        let flux = Array5::from_shape_fn(p.flux_shape(), |(_, y, x, t, _)| (1 + y + x + t) as f64);
        let (source, total) = fission_source(&p, &flux);
        let mut expected = 0.0;
        for y in 1..8 {
            for x in 1..8 {
                for t in 0..6 {
                    let f = 0.115 * (1 + y + x + t) as f64;
                    assert!((source[[1, y, x, t]] - f).abs() < 1e-12);
                    expected += f;
                }
            }
        }
        assert!((total - expected).abs() < 1e-9 * expected);
        assert_eq!(source[[1, 0, 4, 0]], 0.0);
        assert_eq!(source[[0, 4, 4, 0]], 0.0);
    }

    #[test]
    fn test_two_group_infinite_medium() {
        // Σr1 = 0.3 - 0.25, Σr2 = 0.8 - 0.7;
        // k = νΣf1/Σr1 + νΣf2·Σs12/(Σr1·Σr2) = 0.1 + 0.6
        let mut map = Array3::from_elem((3, 3, 3), -2);
        map[[1, 1, 1]] = 0;
        let from = arr2(&[[0, 0, 1]]);
        let to = arr2(&[[0, 1, 1]]);
        let magnitude = arr2(&[[0.25, 0.02, 0.7]]);
        let scattering = TransferTable::from_external(&from, &to, &magnitude, &[3], 2).unwrap();
        let p = CoreProblem::from_external(
            "cart",
            Mesh::new(3, 3, 5.0, vec![5.0; 3]).unwrap(),
            &map,
            MaterialProperties::new(
                arr2(&[[0.3, 0.8]]),
                arr2(&[[0.2, 0.9]]),
                arr2(&[[0.005, 0.15]]),
                arr2(&[[1.0, 0.0]]),
            )
            .unwrap(),
            scattering,
            TransferTable::empty(1),
        )
        .unwrap();
        let mut flux = p.initial_flux();
        let sol = solve(&p, &mut flux, &SolverConfig::default()).unwrap();
        assert!(sol.converged);
        assert!((sol.keff - 0.7).abs() < 1e-5, "k = {}", sol.keff);
    }

    #[test]
    fn test_n2n_adds_neutrons() {
        let mut map = Array3::from_elem((3, 3, 3), -2);
        map[[1, 1, 1]] = 0;
        let build = |n2n: TransferTable| {
            CoreProblem::from_external(
                "cart",
                Mesh::new(3, 3, 5.0, vec![5.0; 3]).unwrap(),
                &map,
                MaterialProperties::new(
                    arr2(&[[0.1, 0.2]]),
                    arr2(&[[0.2, 0.3]]),
                    arr2(&[[0.0, 0.2]]),
                    arr2(&[[1.0, 0.0]]),
                )
                .unwrap(),
                TransferTable::from_external(
                    &arr2(&[[0]]),
                    &arr2(&[[1]]),
                    &arr2(&[[0.05]]),
                    &[1],
                    2,
                )
                .unwrap(),
                n2n,
            )
            .unwrap()
        };
        let plain = build(TransferTable::empty(1));
        let with_n2n = build(
            TransferTable::from_external(&arr2(&[[0]]), &arr2(&[[1]]), &arr2(&[[0.01]]), &[1], 2)
                .unwrap(),
        );
        let mut f1 = plain.initial_flux();
        let mut f2 = with_n2n.initial_flux();
        let k1 = solve(&plain, &mut f1, &SolverConfig::default()).unwrap().keff;
        let k2 = solve(&with_n2n, &mut f2, &SolverConfig::default()).unwrap().keff;
        // k = νΣf2·(Σs12 + 2Σn2n)/(Σt1·Σt2)
        assert!((k1 - 0.2 * 0.05 / (0.1 * 0.2)).abs() < 1e-5, "k1 = {k1}");
        assert!((k2 - 0.2 * 0.07 / (0.1 * 0.2)).abs() < 1e-5, "k2 = {k2}");
    }

    #[test]
    fn test_external_map_untouched_by_solve() {
        let map = Array3::from_shape_fn((3, 4, 4), |(z, y, x)| {
            if z == 0 {
                -2
            } else if y == 0 || x == 3 {
                -1
            } else {
                ((y + x) % 2) as i32
            }
        });
        let before = map.clone();
        let p = CoreProblem::from_external(
            "hex01",
            Mesh::new(4, 4, 10.0, vec![10.0; 3]).unwrap(),
            &map,
            MaterialProperties::new(
                arr2(&[[0.1], [0.12]]),
                arr2(&[[0.3], [0.35]]),
                arr2(&[[0.11], [0.0]]),
                arr2(&[[1.0], [1.0]]),
            )
            .unwrap(),
            TransferTable::empty(2),
            TransferTable::empty(2),
        )
        .unwrap();
        let mut flux = p.initial_flux();
        solve(&p, &mut flux, &SolverConfig::default()).unwrap();
        assert_eq!(map, before);
        assert_eq!(p.map.to_external(), before);
    }

    #[test]
    fn test_unknown_topology_stops_before_solving() {
        let map = Array3::from_elem((1, 1, 1), 0);
        let err = CoreProblem::from_external(
            "hex12",
            Mesh::new(1, 1, 10.0, vec![10.0]).unwrap(),
            &map,
            MaterialProperties::new(
                arr2(&[[0.1]]),
                arr2(&[[0.3]]),
                arr2(&[[0.1]]),
                arr2(&[[1.0]]),
            )
            .unwrap(),
            TransferTable::empty(1),
            TransferTable::empty(1),
        )
        .unwrap_err();
        assert!(err.to_string().contains("hex12"));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let p = single_node(0.5, 0.6);
        let mut flux = p.initial_flux();
        let config = SolverConfig {
            max_outer: 0,
            ..SolverConfig::default()
        };
        assert!(matches!(
            solve(&p, &mut flux, &config),
            Err(FissionError::ConfigError(_))
        ));
    }
}
