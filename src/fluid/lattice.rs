/// Boundary class of a lattice cell, stored per cell in the kernel's material buffer.
#[repr(i32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LatticeType {
    Bulk = 1,
    // fluid in the two left-most columns, pinned to the inlet velocity
    Inlet = 3,
    Obstacle = 4,
}

/// Axis-aligned block of cells, `[x, x + width) x [y, y + height)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CellRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CellRect {
    pub fn full(nx: u32, ny: u32) -> Self {
        CellRect { x: 0, y: 0, width: nx, height: ny }
    }

    pub fn single(x: u32, y: u32) -> Self {
        CellRect { x, y, width: 1, height: 1 }
    }

    pub fn cell_count(&self) -> usize {
        (self.width * self.height) as usize
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    pub fn fits_in(&self, nx: u32, ny: u32) -> bool {
        self.width > 0 && self.height > 0 && self.x + self.width <= nx && self.y + self.height <= ny
    }
}

/// A fluid cell touching the obstacle, with the unit normal pointing into the solid.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundarySample {
    pub x: u32,
    pub y: u32,
    pub nx: f32,
    pub ny: f32,
}

/// Static geometry for one lattice size: obstacle mask, boundary samples and probes.
#[derive(Clone, Debug)]
pub struct ObstacleGeometry {
    pub nx: u32,
    pub ny: u32,
    materials: Vec<LatticeType>,
    pub boundary: Vec<BoundarySample>,
    /// Sparse stride of fluid cells for velocity glyphs.
    pub glyph_probes: Vec<(u32, u32)>,
    /// Interior cell watched by the stability monitor.
    pub monitor_probe: (u32, u32),
    /// Obstacle bounding box plus margin; the force read-back window.
    pub force_region: CellRect,
    /// Characteristic length D (obstacle thickness).
    pub reference_length: f32,
}

const FORCE_REGION_MARGIN: u32 = 3;

// 4-neighbour unit directions, in normal fallback order
const NEIGHBOURS: [(i64, i64); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

impl ObstacleGeometry {
    /// Double-wedge airfoil-like body scaled with the grid height, plus an inlet at the left.
    pub fn airfoil(nx: u32, ny: u32) -> Self {
        let half_thickness = (ny as f32 / 16.0).floor().max(1.0);
        let front_len = 2.0 * half_thickness;
        let rear_len = 4.0 * half_thickness;
        let (cx, cy) = (ny as f32 / 2.0, ny as f32 / 2.0);

        let is_solid = |x: u32, y: u32| {
            let dx = x as f32 - cx;
            let dy = (y as f32 - cy).abs();
            if (-front_len..=0.0).contains(&dx) {
                dy <= half_thickness * (1.0 + dx / front_len)
            } else if (0.0..=rear_len).contains(&dx) {
                dy <= half_thickness * (1.0 - dx / rear_len)
            } else {
                false
            }
        };

        let mut materials = Vec::with_capacity((nx * ny) as usize);
        for y in 0..ny {
            for x in 0..nx {
                let ty = if is_solid(x, y) {
                    LatticeType::Obstacle
                } else if x < 2 {
                    LatticeType::Inlet
                } else {
                    LatticeType::Bulk
                };
                materials.push(ty);
            }
        }

        let probe_x = ((cx + rear_len) as u32 + ny / 8).min(nx - 1);
        let monitor_probe = (probe_x, cy as u32);
        Self::from_materials(nx, ny, materials, monitor_probe, 2.0 * half_thickness)
    }

    /// No obstacle and no inlet: a fully periodic box.
    pub fn open_channel(nx: u32, ny: u32) -> Self {
        let materials = vec![LatticeType::Bulk; (nx * ny) as usize];
        Self::from_materials(nx, ny, materials, (nx / 2, ny / 2), ny as f32 / 8.0)
    }

    fn from_materials(
        nx: u32, ny: u32, materials: Vec<LatticeType>, monitor_probe: (u32, u32),
        reference_length: f32,
    ) -> Self {
        let mut geometry = ObstacleGeometry {
            nx,
            ny,
            materials,
            boundary: vec![],
            glyph_probes: vec![],
            monitor_probe,
            force_region: CellRect::full(nx, ny),
            reference_length,
        };
        geometry.boundary = geometry.collect_boundary();
        geometry.glyph_probes = geometry.collect_glyph_probes();
        geometry.force_region = geometry.obstacle_bounds();
        geometry
    }

    pub fn material(&self, x: u32, y: u32) -> LatticeType {
        self.materials[(x + y * self.nx) as usize]
    }

    pub fn is_solid(&self, x: u32, y: u32) -> bool {
        self.material(x, y) == LatticeType::Obstacle
    }

    /// Material codes in kernel layout (`x + y * nx`).
    pub fn material_codes(&self) -> Vec<i32> {
        self.materials.iter().map(|ty| *ty as i32).collect()
    }

    pub fn solid_count(&self) -> usize {
        self.materials.iter().filter(|ty| **ty == LatticeType::Obstacle).count()
    }

    fn wrapped_solid(&self, x: i64, y: i64) -> bool {
        let wx = x.rem_euclid(self.nx as i64) as u32;
        let wy = y.rem_euclid(self.ny as i64) as u32;
        self.is_solid(wx, wy)
    }

    fn collect_boundary(&self) -> Vec<BoundarySample> {
        let mut samples = vec![];
        for y in 0..self.ny {
            for x in 0..self.nx {
                if self.is_solid(x, y) {
                    continue;
                }
                let solid_dirs: Vec<(i64, i64)> = NEIGHBOURS
                    .iter()
                    .copied()
                    .filter(|(dx, dy)| self.wrapped_solid(x as i64 + dx, y as i64 + dy))
                    .collect();
                let Some(first) = solid_dirs.first() else {
                    continue;
                };
                let (sx, sy) = solid_dirs
                    .iter()
                    .fold((0.0_f32, 0.0_f32), |acc, (dx, dy)| (acc.0 + *dx as f32, acc.1 + *dy as f32));
                let len = (sx * sx + sy * sy).sqrt();
                // opposite solid neighbours cancel out
                let (nx, ny) =
                    if len > 0.0 { (sx / len, sy / len) } else { (first.0 as f32, first.1 as f32) };
                samples.push(BoundarySample { x, y, nx, ny });
            }
        }
        samples
    }

    fn collect_glyph_probes(&self) -> Vec<(u32, u32)> {
        let stride = (self.ny / 20).max(1);
        let mut probes = vec![];
        for y in (stride / 2..self.ny).step_by(stride as usize) {
            for x in (stride / 2..self.nx).step_by(stride as usize) {
                if !self.is_solid(x, y) {
                    probes.push((x, y));
                }
            }
        }
        probes
    }

    fn obstacle_bounds(&self) -> CellRect {
        let mut min = (u32::MAX, u32::MAX);
        let mut max = (0, 0);
        for y in 0..self.ny {
            for x in 0..self.nx {
                if self.is_solid(x, y) {
                    min = (min.0.min(x), min.1.min(y));
                    max = (max.0.max(x), max.1.max(y));
                }
            }
        }
        if min.0 == u32::MAX {
            return CellRect::full(self.nx, self.ny);
        }
        let x0 = min.0.saturating_sub(FORCE_REGION_MARGIN);
        let y0 = min.1.saturating_sub(FORCE_REGION_MARGIN);
        let x1 = (max.0 + FORCE_REGION_MARGIN + 1).min(self.nx);
        let y1 = (max.1 + FORCE_REGION_MARGIN + 1).min(self.ny);
        CellRect { x: x0, y: y0, width: x1 - x0, height: y1 - y0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    // Fluid cells with at least one solid 4-neighbour, recomputed by brute force
    fn boundary_cells(g: &ObstacleGeometry) -> HashSet<(u32, u32)> {
        let mut cells = HashSet::new();
        for y in 0..g.ny {
            for x in 0..g.nx {
                if !g.is_solid(x, y)
                    && NEIGHBOURS
                        .iter()
                        .any(|(dx, dy)| g.wrapped_solid(x as i64 + dx, y as i64 + dy))
                {
                    cells.insert((x, y));
                }
            }
        }
        cells
    }

    #[test]
    fn airfoil_is_deterministic() {
        let a = ObstacleGeometry::airfoil(400, 200);
        let b = ObstacleGeometry::airfoil(400, 200);
        assert_eq!(a.materials, b.materials);
        assert_eq!(a.boundary, b.boundary);
        assert_eq!(a.monitor_probe, b.monitor_probe);
    }

    #[test]
    fn airfoil_shape() {
        let g = ObstacleGeometry::airfoil(400, 200);
        // R = 12, centre (100, 100)
        assert_eq!(g.reference_length, 24.0);
        assert!(g.is_solid(100, 100));
        assert!(g.is_solid(100, 112));
        assert!(!g.is_solid(100, 113));
        // front tip at x = 76, rear tip at x = 148
        assert!(g.is_solid(76, 100));
        assert!(!g.is_solid(75, 100));
        assert!(g.is_solid(148, 100));
        assert!(!g.is_solid(149, 100));
        // symmetric about the centre row
        for dy in 0..20 {
            assert_eq!(g.is_solid(90, 100 + dy), g.is_solid(90, 100 - dy));
        }
    }

    #[test]
    fn inlet_columns_and_probe() {
        let g = ObstacleGeometry::airfoil(400, 200);
        assert_eq!(g.material(0, 10), LatticeType::Inlet);
        assert_eq!(g.material(1, 150), LatticeType::Inlet);
        assert_eq!(g.material(2, 150), LatticeType::Bulk);
        let (px, py) = g.monitor_probe;
        assert_eq!(g.material(px, py), LatticeType::Bulk);
        assert!(px > 148);
    }

    #[test]
    fn boundary_samples_complete_and_unit() {
        let g = ObstacleGeometry::airfoil(400, 200);
        let expected = boundary_cells(&g);
        assert!(!expected.is_empty());
        assert_eq!(g.boundary.len(), expected.len());

        let mut seen = HashSet::new();
        for s in &g.boundary {
            assert!(seen.insert((s.x, s.y)), "duplicate sample at {:?}", (s.x, s.y));
            assert!(expected.contains(&(s.x, s.y)));
            let len = (s.nx * s.nx + s.ny * s.ny).sqrt();
            assert!((len - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn normals_point_into_solid() {
        let g = ObstacleGeometry::airfoil(400, 200);
        // left of the front tip
        let tip = g.boundary.iter().find(|s| s.x == 75 && s.y == 100).unwrap();
        assert_eq!((tip.nx, tip.ny), (1.0, 0.0));
        // directly above the thickest point
        let top = g.boundary.iter().find(|s| s.x == 100 && s.y == 113).unwrap();
        assert_eq!((top.nx, top.ny), (0.0, -1.0));
    }

    #[test]
    fn force_region_encloses_boundary() {
        let g = ObstacleGeometry::airfoil(800, 400);
        for s in &g.boundary {
            assert!(g.force_region.contains(s.x, s.y));
        }
        assert!(g.force_region.fits_in(800, 400));
    }

    #[test]
    fn tiny_grid_terminates_with_fluid() {
        let g = ObstacleGeometry::airfoil(8, 4);
        assert!(g.solid_count() < 32);
        let g = ObstacleGeometry::airfoil(3, 2);
        assert!(g.solid_count() < 6);
    }

    #[test]
    fn open_channel_has_no_obstacle() {
        let g = ObstacleGeometry::open_channel(16, 8);
        assert_eq!(g.solid_count(), 0);
        assert!(g.boundary.is_empty());
        assert_eq!(g.material(0, 0), LatticeType::Bulk);
        assert_eq!(g.force_region, CellRect::full(16, 8));
    }

    #[test]
    fn glyph_probes_skip_solid() {
        let g = ObstacleGeometry::airfoil(400, 200);
        assert!(!g.glyph_probes.is_empty());
        assert!(g.glyph_probes.iter().all(|(x, y)| !g.is_solid(*x, *y)));
    }
}
