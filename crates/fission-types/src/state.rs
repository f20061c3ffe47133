// ─────────────────────────────────────────────────────────────────────
// SCPN Fission Core — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::{EXTERNAL_REFLECTIVE, EXTERNAL_VACUUM, HEX_SECTORS};
use crate::error::{FissionError, FissionResult};
use ndarray::{Array2, Array3, Array5};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lateral mesh topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Topology {
    /// Square lateral cells, four lateral neighbours.
    Cartesian,
    /// One node per hexagon, six lateral neighbours (odd rows shifted +x).
    Hex,
    /// Hexagon split into six triangular sectors, numbered clockwise from
    /// the north-east face.
    HexTriangles,
}

impl Topology {
    /// Sub-regions per (z, y, x) cell.
    pub fn sub_regions(self) -> usize {
        match self {
            Topology::Cartesian | Topology::Hex => 1,
            Topology::HexTriangles => HEX_SECTORS,
        }
    }

    /// External geometry identifier.
    pub fn as_flag(self) -> &'static str {
        match self {
            Topology::Cartesian => "cart",
            Topology::Hex => "hex01",
            Topology::HexTriangles => "hex06",
        }
    }
}

impl FromStr for Topology {
    type Err = FissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cart" | "cartesian" => Ok(Topology::Cartesian),
            "hex01" => Ok(Topology::Hex),
            "hex06" => Ok(Topology::HexTriangles),
            other => Err(FissionError::UnknownTopology(other.to_string())),
        }
    }
}

impl TryFrom<String> for Topology {
    type Error = FissionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Topology> for String {
    fn from(t: Topology) -> Self {
        t.as_flag().to_string()
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_flag())
    }
}

/// Structured (nz, ny, nx) mesh: one lateral pitch, one thickness per layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub nz: usize,
    pub ny: usize,
    pub nx: usize,
    /// Lateral node spacing (flat-to-flat for hexagons).
    pub pitch: f64,
    /// Axial node thickness per z-layer [nz].
    pub dz: Vec<f64>,
}

impl Mesh {
    pub fn new(ny: usize, nx: usize, pitch: f64, dz: Vec<f64>) -> FissionResult<Self> {
        if ny == 0 || nx == 0 || dz.is_empty() {
            return Err(FissionError::ConfigError(format!(
                "mesh must be non-empty: nz={}, ny={ny}, nx={nx}",
                dz.len()
            )));
        }
        if !pitch.is_finite() || pitch <= 0.0 {
            return Err(FissionError::ConfigError(format!(
                "pitch must be finite > 0, got {pitch}"
            )));
        }
        if let Some((iz, h)) = dz
            .iter()
            .enumerate()
            .find(|(_, h)| !h.is_finite() || **h <= 0.0)
        {
            return Err(FissionError::ConfigError(format!(
                "dz[{iz}] must be finite > 0, got {h}"
            )));
        }
        Ok(Mesh {
            nz: dz.len(),
            ny,
            nx,
            pitch,
            dz,
        })
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.nz, self.ny, self.nx)
    }
}

/// Classification of one (z, y, x) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    /// Zero-based index into the material tables.
    Material(usize),
    Vacuum,
    Reflective,
}

impl Cell {
    /// Decode the caller's convention: `>= 0` material, `-1` vacuum,
    /// `-2` reflective.
    pub fn from_external(value: i32) -> Option<Cell> {
        match value {
            v if v >= 0 => Some(Cell::Material(v as usize)),
            EXTERNAL_VACUUM => Some(Cell::Vacuum),
            EXTERNAL_REFLECTIVE => Some(Cell::Reflective),
            _ => None,
        }
    }

    pub fn to_external(self) -> i32 {
        match self {
            Cell::Material(m) => m as i32,
            Cell::Vacuum => EXTERNAL_VACUUM,
            Cell::Reflective => EXTERNAL_REFLECTIVE,
        }
    }

    pub fn material(self) -> Option<usize> {
        match self {
            Cell::Material(m) => Some(m),
            _ => None,
        }
    }
}

/// Decoded material map. Built from, never written back into, the caller's
/// integer map.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialMap {
    cells: Array3<Cell>,
}

impl MaterialMap {
    /// Translate the external `[nz, ny, nx]` integer map, checking every
    /// material index against `nmix`.
    pub fn from_external(map: &Array3<i32>, nmix: usize) -> FissionResult<Self> {
        for ((iz, iy, ix), &value) in map.indexed_iter() {
            match Cell::from_external(value) {
                Some(Cell::Material(m)) if m >= nmix => {
                    return Err(FissionError::InvalidMaterial {
                        iz,
                        iy,
                        ix,
                        value,
                        reason: format!("only {nmix} materials defined"),
                    });
                }
                Some(_) => {}
                None => {
                    return Err(FissionError::InvalidMaterial {
                        iz,
                        iy,
                        ix,
                        value,
                        reason: "expected >= 0, -1 (vacuum) or -2 (reflective)".to_string(),
                    });
                }
            }
        }
        let cells = map.mapv(|v| Cell::from_external(v).unwrap_or(Cell::Vacuum));
        Ok(MaterialMap { cells })
    }

    pub fn to_external(&self) -> Array3<i32> {
        self.cells.mapv(Cell::to_external)
    }

    pub fn dim(&self) -> (usize, usize, usize) {
        self.cells.dim()
    }

    pub fn get(&self, iz: usize, iy: usize, ix: usize) -> Cell {
        self.cells[[iz, iy, ix]]
    }

    /// Cell at signed indices; anything outside the array reads as vacuum.
    pub fn cell_at(&self, iz: isize, iy: isize, ix: isize) -> Cell {
        if iz < 0 || iy < 0 || ix < 0 {
            return Cell::Vacuum;
        }
        self.cells
            .get([iz as usize, iy as usize, ix as usize])
            .copied()
            .unwrap_or(Cell::Vacuum)
    }

    pub fn cells(&self) -> &Array3<Cell> {
        &self.cells
    }

    /// Number of cells that carry flux.
    pub fn interior_count(&self) -> usize {
        self.cells.iter().filter(|c| c.material().is_some()).count()
    }
}

/// Per-material, per-group cross sections `[nmix, ng]`.
#[derive(Debug, Clone)]
pub struct MaterialProperties {
    /// Total cross section.
    pub sigt: Array2<f64>,
    /// Transport cross section.
    pub sigtra: Array2<f64>,
    /// Production (nu-fission) cross section.
    pub sigp: Array2<f64>,
    /// Fission spectrum.
    pub chi: Array2<f64>,
}

impl MaterialProperties {
    pub fn new(
        sigt: Array2<f64>,
        sigtra: Array2<f64>,
        sigp: Array2<f64>,
        chi: Array2<f64>,
    ) -> FissionResult<Self> {
        let expected = sigt.shape().to_vec();
        for (what, arr) in [("sigtra", &sigtra), ("sigp", &sigp), ("chi", &chi)] {
            if arr.shape() != expected.as_slice() {
                return Err(FissionError::ShapeMismatch {
                    what,
                    expected,
                    actual: arr.shape().to_vec(),
                });
            }
        }
        if let Some(((m, g), s)) = sigtra
            .indexed_iter()
            .find(|(_, s)| !s.is_finite() || **s <= 0.0)
        {
            return Err(FissionError::ConfigError(format!(
                "transport cross section must be finite > 0: material {m}, group {g}, got {s}"
            )));
        }
        Ok(MaterialProperties {
            sigt,
            sigtra,
            sigp,
            chi,
        })
    }

    pub fn nmix(&self) -> usize {
        self.sigt.nrows()
    }

    pub fn ngroups(&self) -> usize {
        self.sigt.ncols()
    }
}

/// One group-to-group transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transfer {
    pub from: usize,
    pub to: usize,
    pub magnitude: f64,
}

/// Per-material transfer lists (scattering or (n,2n)).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferTable {
    entries: Vec<Vec<Transfer>>,
}

impl TransferTable {
    /// Table with no transfers for `nmix` materials.
    pub fn empty(nmix: usize) -> Self {
        TransferTable {
            entries: vec![Vec::new(); nmix],
        }
    }

    pub fn from_entries(entries: Vec<Vec<Transfer>>, ngroups: usize) -> FissionResult<Self> {
        for (material, list) in entries.iter().enumerate() {
            for t in list {
                if t.from >= ngroups || t.to >= ngroups {
                    return Err(FissionError::InvalidTransfer {
                        material,
                        reason: format!(
                            "group pair ({}, {}) outside 0..{ngroups}",
                            t.from, t.to
                        ),
                    });
                }
            }
        }
        Ok(TransferTable { entries })
    }

    /// Build from the external parallel arrays `[nmix, max_entries]` of
    /// zero-based from/to groups and magnitudes, using the first `count[m]`
    /// columns of row `m`.
    pub fn from_external(
        from: &Array2<i32>,
        to: &Array2<i32>,
        magnitude: &Array2<f64>,
        count: &[usize],
        ngroups: usize,
    ) -> FissionResult<Self> {
        let expected = from.shape().to_vec();
        for (what, shape) in [("transfer to", to.shape()), ("transfer magnitude", magnitude.shape())] {
            if shape != expected.as_slice() {
                return Err(FissionError::ShapeMismatch {
                    what,
                    expected,
                    actual: shape.to_vec(),
                });
            }
        }
        if count.len() != from.nrows() {
            return Err(FissionError::ShapeMismatch {
                what: "transfer count",
                expected: vec![from.nrows()],
                actual: vec![count.len()],
            });
        }

        let mut entries = Vec::with_capacity(count.len());
        for (material, &n) in count.iter().enumerate() {
            if n > from.ncols() {
                return Err(FissionError::InvalidTransfer {
                    material,
                    reason: format!("count {n} exceeds list length {}", from.ncols()),
                });
            }
            let mut list = Vec::with_capacity(n);
            for k in 0..n {
                let (f, t) = (from[[material, k]], to[[material, k]]);
                if f < 0 || t < 0 {
                    return Err(FissionError::InvalidTransfer {
                        material,
                        reason: format!("negative group index in entry {k}: ({f}, {t})"),
                    });
                }
                list.push(Transfer {
                    from: f as usize,
                    to: t as usize,
                    magnitude: magnitude[[material, k]],
                });
            }
            entries.push(list);
        }
        Self::from_entries(entries, ngroups)
    }

    pub fn nmix(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self, material: usize) -> &[Transfer] {
        &self.entries[material]
    }

    /// Sum of within-group (`from == to == group`) magnitudes.
    pub fn diagonal(&self, material: usize, group: usize) -> f64 {
        self.entries[material]
            .iter()
            .filter(|t| t.from == group && t.to == group)
            .map(|t| t.magnitude)
            .sum()
    }

    /// Entries feeding `group` from a different group.
    pub fn inbound(&self, material: usize, group: usize) -> impl Iterator<Item = &Transfer> {
        self.entries[material]
            .iter()
            .filter(move |t| t.to == group && t.from != group)
    }
}

/// Everything a solve reads. Immutable for the duration of a solve.
#[derive(Debug, Clone)]
pub struct CoreProblem {
    pub topology: Topology,
    pub mesh: Mesh,
    pub map: MaterialMap,
    pub xs: MaterialProperties,
    pub scattering: TransferTable,
    pub n2n: TransferTable,
}

impl CoreProblem {
    pub fn new(
        topology: Topology,
        mesh: Mesh,
        map: MaterialMap,
        xs: MaterialProperties,
        scattering: TransferTable,
        n2n: TransferTable,
    ) -> FissionResult<Self> {
        let (nz, ny, nx) = map.dim();
        if (nz, ny, nx) != mesh.shape() {
            return Err(FissionError::ShapeMismatch {
                what: "material map",
                expected: vec![mesh.nz, mesh.ny, mesh.nx],
                actual: vec![nz, ny, nx],
            });
        }
        for (what, table) in [("scattering table", &scattering), ("(n,2n) table", &n2n)] {
            if table.nmix() != xs.nmix() {
                return Err(FissionError::ShapeMismatch {
                    what,
                    expected: vec![xs.nmix()],
                    actual: vec![table.nmix()],
                });
            }
        }
        for ((iz, iy, ix), cell) in map.cells().indexed_iter() {
            if let Cell::Material(m) = *cell {
                if m >= xs.nmix() {
                    return Err(FissionError::InvalidMaterial {
                        iz,
                        iy,
                        ix,
                        value: m as i32,
                        reason: format!("only {} materials defined", xs.nmix()),
                    });
                }
            }
        }
        Ok(CoreProblem {
            topology,
            mesh,
            map,
            xs,
            scattering,
            n2n,
        })
    }

    /// Boundary adapter for the caller's conventions: topology flag string
    /// and zero-based integer material map. The flag is checked first.
    pub fn from_external(
        topology_flag: &str,
        mesh: Mesh,
        map: &Array3<i32>,
        xs: MaterialProperties,
        scattering: TransferTable,
        n2n: TransferTable,
    ) -> FissionResult<Self> {
        let topology: Topology = topology_flag.parse()?;
        let map = MaterialMap::from_external(map, xs.nmix())?;
        Self::new(topology, mesh, map, xs, scattering, n2n)
    }

    /// `(nz, ny, nx, nt, ng)`
    pub fn flux_shape(&self) -> (usize, usize, usize, usize, usize) {
        (
            self.mesh.nz,
            self.mesh.ny,
            self.mesh.nx,
            self.topology.sub_regions(),
            self.xs.ngroups(),
        )
    }

    /// Uniform unit flux guess.
    pub fn initial_flux(&self) -> Array5<f64> {
        Array5::from_elem(self.flux_shape(), 1.0)
    }

    pub fn check_flux(&self, flux: &Array5<f64>) -> FissionResult<()> {
        let (nz, ny, nx, nt, ng) = self.flux_shape();
        if flux.dim() != (nz, ny, nx, nt, ng) {
            return Err(FissionError::ShapeMismatch {
                what: "flux",
                expected: vec![nz, ny, nx, nt, ng],
                actual: flux.shape().to_vec(),
            });
        }
        Ok(())
    }
}

/// Exit status of one inner relaxation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaxationStatus {
    pub converged: bool,
    pub sweeps: usize,
}

/// Result of a full power-iteration solve.
#[derive(Debug, Clone)]
pub struct EigenvalueSolution {
    pub keff: f64,
    pub converged: bool,
    pub outer_iterations: usize,
    /// Inner sweeps summed over all outer iterations.
    pub inner_sweeps: usize,
    /// Outer iterations whose inner relaxation hit the sweep cap unconverged.
    pub inner_capped: usize,
    /// k estimate after each outer iteration.
    pub keff_history: Vec<f64>,
}
