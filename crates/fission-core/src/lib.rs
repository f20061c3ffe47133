//! Multigroup finite-difference diffusion eigenvalue solver.
//!
//! Power iteration on a structured (z, y, x) mesh with Cartesian, hexagonal
//! or six-triangle-hexagonal lateral topology:
//! - `coupling`: two-node diffusion coupling with vacuum/reflective/interior faces
//! - `adjacency`: static neighbour tables per topology
//! - `relaxation`: inner Jacobi flux sweeps
//! - `eigenvalue`: outer fission-source / k-effective iteration

pub mod adjacency;
pub mod coupling;
pub mod eigenvalue;
pub mod relaxation;
