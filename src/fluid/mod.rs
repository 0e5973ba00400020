//! D2Q9 lattice Boltzmann flow past a fixed obstacle.
//!
//! Velocity set ordering shared by the WGSL kernel and the CPU mirror:
//! ```text
//!   6   2   5
//!    \  |  /
//!   3 - 0 - 1
//!    /  |  \
//!   7   4   8
//! ```

use crate::error::FlowError;
use zerocopy::{AsBytes, FromBytes};

mod lattice;
pub use lattice::*;

mod generation;
pub use generation::GenerationPair;

pub mod kernel;

mod reference;
pub use reference::ReferenceSolver;

mod d2q9_node;
pub use d2q9_node::D2Q9Node;

mod force;
pub use force::*;

mod fluid_player;
pub use fluid_player::*;

/// Discrete velocities e_k.
pub const E: [[i32; 2]; 9] =
    [[0, 0], [1, 0], [0, 1], [-1, 0], [0, -1], [1, 1], [-1, 1], [-1, -1], [1, -1]];

/// Lattice weights w_k, same ordering as [`E`].
pub const W: [f32; 9] = [
    4.0 / 9.0,
    1.0 / 9.0,
    1.0 / 9.0,
    1.0 / 9.0,
    1.0 / 9.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
];

#[repr(C)]
#[derive(Copy, Clone, Debug, AsBytes, FromBytes)]
pub struct LbmUniform {
    pub nx: i32,
    pub ny: i32,
    pub omega: f32,
    pub inlet_u: f32,
    // xy: lattice direction, z: direction's weight
    pub e_w: [[f32; 4]; 9],
}

impl LbmUniform {
    pub fn new(nx: u32, ny: u32, params: &StepParams) -> Self {
        let mut e_w = [[0.0; 4]; 9];
        for k in 0..9 {
            e_w[k] = [E[k][0] as f32, E[k][1] as f32, W[k], 0.0];
        }
        LbmUniform { nx: nx as i32, ny: ny as i32, omega: params.omega, inlet_u: params.inlet_u, e_w }
    }
}

/// Per-tick kernel inputs, read once at the start of a tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StepParams {
    /// BGK relaxation rate
    pub omega: f32,
    pub inlet_u: f32,
}

impl StepParams {
    /// ν = U·D/Re, ω = 1/(3ν + 0.5)
    pub fn from_flow(reynolds: f32, inlet_u: f32, reference_length: f32) -> Self {
        let viscosity = inlet_u * reference_length / reynolds;
        StepParams { omega: 1.0 / (3.0 * viscosity + 0.5), inlet_u }
    }
}

/// Macroscopic moments of one cell, laid out as the kernel's `vec4<f32>`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, AsBytes, FromBytes)]
pub struct MacroCell {
    pub rho: f32,
    pub ux: f32,
    pub uy: f32,
    pub _padding: f32,
}

impl MacroCell {
    pub fn new(rho: f32, ux: f32, uy: f32) -> Self {
        MacroCell { rho, ux, uy, _padding: 0.0 }
    }

    pub fn speed(&self) -> f32 {
        (self.ux * self.ux + self.uy * self.uy).sqrt()
    }
}

/// A rectangular read-back of macroscopic moments from the current generation.
#[derive(Clone, Debug)]
pub struct MacroField {
    pub region: CellRect,
    pub cells: Vec<MacroCell>,
}

impl MacroField {
    pub fn new(region: CellRect, cells: Vec<MacroCell>) -> Self {
        debug_assert_eq!(cells.len(), region.cell_count());
        MacroField { region, cells }
    }

    /// Lookup by lattice coordinates; `None` outside the region.
    pub fn get(&self, x: u32, y: u32) -> Option<&MacroCell> {
        if !self.region.contains(x, y) {
            return None;
        }
        let local = (x - self.region.x) + (y - self.region.y) * self.region.width;
        self.cells.get(local as usize)
    }

    /// Lookup with toroidal wrap inside the region, for neighbour stencils.
    pub fn get_wrapped(&self, x: i64, y: i64) -> &MacroCell {
        let w = self.region.width as i64;
        let h = self.region.height as i64;
        let lx = (x - self.region.x as i64).rem_euclid(w);
        let ly = (y - self.region.y as i64).rem_euclid(h);
        &self.cells[(lx + ly * w) as usize]
    }
}

/// Backend seam: the GPU pipeline and the single-threaded reference realize the same scheme.
pub trait FlowSolver {
    fn lattice_size(&self) -> (u32, u32);

    /// Sets both generations to equilibrium: ρ=1, u=(U,0) on fluid, rest on solid.
    fn initialize(&mut self, geometry: &ObstacleGeometry, inlet_u: f32) -> Result<(), FlowError>;

    /// Runs `substeps` collide-stream passes, swapping generations after each.
    fn step(&mut self, params: &StepParams, substeps: u32);

    /// Blocking read-back of one rectangle of the current generation.
    fn read_region(&self, region: CellRect) -> Result<MacroField, FlowError>;

    /// Overwrites one cell's populations in the current generation.
    fn write_cell(&mut self, x: u32, y: u32, populations: [f32; 9]) -> Result<(), FlowError>;
}
