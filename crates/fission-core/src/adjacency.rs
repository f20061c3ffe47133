// ─────────────────────────────────────────────────────────────────────
// SCPN Fission Core — Adjacency
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Neighbour stencils for the three lateral topologies.
//!
//! Hexagons sit on a rectangular `[ny, nx]` index array in "odd-r" layout:
//! odd rows are shifted half a pitch towards +x, and row `y - 1` lies to the
//! north. Hexagon faces are numbered clockwise from north-east:
//!
//! ```text
//!        5 NW   0 NE
//!   4 W      *      1 E
//!        3 SW   2 SE
//! ```
//!
//! In the six-triangle topology sector `s` is the triangle under face `s`.
//! It touches sectors `s-1` and `s+1` of its own hexagon and sector
//! `s+3 (mod 6)` of the hexagon across face `s`.

use fission_types::state::Topology;

/// One lateral neighbour relative to the current node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LateralLink {
    pub dy: isize,
    pub dx: isize,
    /// Sub-region of the neighbour cell that is coupled.
    pub sector: usize,
}

const fn link(dy: isize, dx: isize, sector: usize) -> LateralLink {
    LateralLink { dy, dx, sector }
}

/// Lateral node size and face area-to-volume ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LateralGeometry {
    /// Centre-to-centre distance between lateral neighbours.
    pub spacing: f64,
    pub area_over_volume: f64,
}

const CARTESIAN: [LateralLink; 4] = [link(0, -1, 0), link(0, 1, 0), link(-1, 0, 0), link(1, 0, 0)];

/// `[row parity][face]`, faces NE, E, SE, SW, W, NW.
const HEX: [[LateralLink; 6]; 2] = [
    [
        link(-1, 0, 0),
        link(0, 1, 0),
        link(1, 0, 0),
        link(1, -1, 0),
        link(0, -1, 0),
        link(-1, -1, 0),
    ],
    [
        link(-1, 1, 0),
        link(0, 1, 0),
        link(1, 1, 0),
        link(1, 0, 0),
        link(0, -1, 0),
        link(-1, 0, 0),
    ],
];

/// `[row parity][sector]` -> two sibling sectors, then the cross-hexagon
/// partner.
const HEX_TRIANGLES: [[[LateralLink; 3]; 6]; 2] = [
    // even rows
    [
        [link(0, 0, 5), link(0, 0, 1), link(-1, 0, 3)],
        [link(0, 0, 0), link(0, 0, 2), link(0, 1, 4)],
        [link(0, 0, 1), link(0, 0, 3), link(1, 0, 5)],
        [link(0, 0, 2), link(0, 0, 4), link(1, -1, 0)],
        [link(0, 0, 3), link(0, 0, 5), link(0, -1, 1)],
        [link(0, 0, 4), link(0, 0, 0), link(-1, -1, 2)],
    ],
    // odd rows
    [
        [link(0, 0, 5), link(0, 0, 1), link(-1, 1, 3)],
        [link(0, 0, 0), link(0, 0, 2), link(0, 1, 4)],
        [link(0, 0, 1), link(0, 0, 3), link(1, 1, 5)],
        [link(0, 0, 2), link(0, 0, 4), link(1, 0, 0)],
        [link(0, 0, 3), link(0, 0, 5), link(0, -1, 1)],
        [link(0, 0, 4), link(0, 0, 0), link(-1, 0, 2)],
    ],
];

/// Lateral neighbours of sub-region `sector` of a cell in row `iy`.
pub fn lateral_neighbors(topology: Topology, iy: usize, sector: usize) -> &'static [LateralLink] {
    let parity = iy % 2;
    match topology {
        Topology::Cartesian => &CARTESIAN,
        Topology::Hex => &HEX[parity],
        Topology::HexTriangles => &HEX_TRIANGLES[parity][sector],
    }
}

/// Lateral spacing and area-to-volume ratio for a given pitch.
pub fn lateral_geometry(topology: Topology, pitch: f64) -> LateralGeometry {
    match topology {
        Topology::Cartesian => LateralGeometry {
            spacing: pitch,
            area_over_volume: 1.0 / pitch,
        },
        // side / hexagon area = (p/√3) / (√3/2 p²)
        Topology::Hex => LateralGeometry {
            spacing: pitch,
            area_over_volume: 2.0 / (3.0 * pitch),
        },
        // Triangle centroids sit p/3 from the hexagon centre and p/3 apart.
        Topology::HexTriangles => LateralGeometry {
            spacing: pitch / 3.0,
            area_over_volume: 6.0 * 2.0 / (3.0 * pitch),
        },
    }
}

/// Axial neighbour offsets.
pub const AXIAL: [isize; 2] = [-1, 1];
