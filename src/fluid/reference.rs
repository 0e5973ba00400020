use super::{
    kernel, CellRect, FlowSolver, GenerationPair, LatticeType, MacroCell, MacroField,
    ObstacleGeometry, StepParams,
};
use crate::error::FlowError;

/// One full snapshot of the lattice on the host.
#[derive(Clone, Debug)]
pub struct HostGeneration {
    /// populations, `k * n + cell`
    pub dist: Vec<f32>,
    pub macro_cells: Vec<MacroCell>,
}

impl HostGeneration {
    fn zeroed(cell_count: usize) -> Self {
        HostGeneration {
            dist: vec![0.0; 9 * cell_count],
            macro_cells: vec![MacroCell::default(); cell_count],
        }
    }
}

/// Whole-grid, single-threaded realization of the collide-stream scheme.
///
/// Mirrors [`D2Q9Node`](super::D2Q9Node) cell for cell; used where no adapter is available and
/// as the oracle in GPU parity tests.
pub struct ReferenceSolver {
    nx: u32,
    ny: u32,
    materials: Vec<LatticeType>,
    generations: GenerationPair<HostGeneration>,
}

impl ReferenceSolver {
    pub fn new(geometry: &ObstacleGeometry, inlet_u: f32) -> Self {
        let cell_count = (geometry.nx * geometry.ny) as usize;
        let mut solver = ReferenceSolver {
            nx: geometry.nx,
            ny: geometry.ny,
            materials: vec![],
            generations: GenerationPair::new(
                HostGeneration::zeroed(cell_count),
                HostGeneration::zeroed(cell_count),
            ),
        };
        solver.fill_equilibrium(geometry, inlet_u);
        solver
    }

    pub fn current(&self) -> &HostGeneration {
        self.generations.current()
    }

    pub fn cell(&self, x: u32, y: u32) -> MacroCell {
        self.current().macro_cells[(x + y * self.nx) as usize]
    }

    pub fn populations(&self, x: u32, y: u32) -> [f32; 9] {
        let n = (self.nx * self.ny) as usize;
        let i = (x + y * self.nx) as usize;
        let dist = &self.current().dist;
        std::array::from_fn(|k| dist[k * n + i])
    }

    pub fn total_mass(&self) -> f64 {
        self.current().dist.iter().map(|f| *f as f64).sum()
    }

    fn fill_equilibrium(&mut self, geometry: &ObstacleGeometry, inlet_u: f32) {
        let (nx, ny) = (geometry.nx, geometry.ny);
        let n = (nx * ny) as usize;
        if self.nx != nx || self.ny != ny || self.generations.current().macro_cells.len() != n {
            self.generations =
                GenerationPair::new(HostGeneration::zeroed(n), HostGeneration::zeroed(n));
        }
        self.nx = nx;
        self.ny = ny;
        self.materials = (0..ny)
            .flat_map(|y| (0..nx).map(move |x| (x, y)))
            .map(|(x, y)| geometry.material(x, y))
            .collect();

        let (dist, macro_cells) = kernel::equilibrium_state(geometry, inlet_u);
        for generation in self.generations.both_mut() {
            generation.dist.copy_from_slice(&dist);
            generation.macro_cells.copy_from_slice(&macro_cells);
        }
        self.generations.rewind();
    }

    fn substep(&mut self, params: &StepParams) {
        let (nx, ny) = (self.nx, self.ny);
        let n = (nx * ny) as usize;
        let (src, dst) = self.generations.split_mut();
        for y in 0..ny {
            for x in 0..nx {
                let i = (x + y * nx) as usize;
                let (out, cell) =
                    kernel::collide_stream_cell(&src.dist, nx, ny, x, y, self.materials[i], params);
                for k in 0..9 {
                    dst.dist[k * n + i] = out[k];
                }
                dst.macro_cells[i] = cell;
            }
        }
        self.generations.advance();
    }
}

impl FlowSolver for ReferenceSolver {
    fn lattice_size(&self) -> (u32, u32) {
        (self.nx, self.ny)
    }

    fn initialize(&mut self, geometry: &ObstacleGeometry, inlet_u: f32) -> Result<(), FlowError> {
        self.fill_equilibrium(geometry, inlet_u);
        Ok(())
    }

    fn step(&mut self, params: &StepParams, substeps: u32) {
        for _ in 0..substeps {
            self.substep(params);
        }
    }

    fn read_region(&self, region: CellRect) -> Result<MacroField, FlowError> {
        if !region.fits_in(self.nx, self.ny) {
            return Err(FlowError::RegionOutOfBounds {
                x: region.x,
                y: region.y,
                x_end: region.x + region.width,
                y_end: region.y + region.height,
            });
        }
        let cells = self.current();
        let mut out = Vec::with_capacity(region.cell_count());
        for y in region.y..region.y + region.height {
            let start = (region.x + y * self.nx) as usize;
            out.extend_from_slice(&cells.macro_cells[start..start + region.width as usize]);
        }
        Ok(MacroField::new(region, out))
    }

    fn write_cell(&mut self, x: u32, y: u32, populations: [f32; 9]) -> Result<(), FlowError> {
        if !CellRect::single(x, y).fits_in(self.nx, self.ny) {
            return Err(FlowError::RegionOutOfBounds { x, y, x_end: x + 1, y_end: y + 1 });
        }
        let n = (self.nx * self.ny) as usize;
        let i = (x + y * self.nx) as usize;
        let generation = self.generations.current_mut();
        for k in 0..9 {
            generation.dist[k * n + i] = populations[k];
        }
        generation.macro_cells[i] = kernel::moments(&populations);
        Ok(())
    }
}
