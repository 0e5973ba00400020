//! CPU mirror of `shader-wgsl/lbm/collide_stream.wgsl`.
//!
//! Populations are stored structure-of-arrays: direction `k` of cell `i` lives at `k * n + i`.
//! Nothing here clamps: negative or non-finite populations propagate so that divergence stays
//! observable to the stability monitor.

use super::{LatticeType, MacroCell, ObstacleGeometry, StepParams, E, W};

/// f_k^eq = w_k ρ (1 + 3 e·u + 4.5 (e·u)² − 1.5 |u|²)
pub fn equilibrium(rho: f32, ux: f32, uy: f32) -> [f32; 9] {
    let usqr = ux * ux + uy * uy;
    let mut eq = [0.0; 9];
    for (k, e) in E.iter().enumerate() {
        let eu = e[0] as f32 * ux + e[1] as f32 * uy;
        eq[k] = W[k] * rho * (1.0 + 3.0 * eu + 4.5 * eu * eu - 1.5 * usqr);
    }
    eq
}

/// ρ = Σ f_k, u = Σ f_k e_k / ρ
pub fn moments(f: &[f32; 9]) -> MacroCell {
    let mut rho = 0.0;
    let (mut jx, mut jy) = (0.0, 0.0);
    for (k, e) in E.iter().enumerate() {
        rho += f[k];
        jx += e[0] as f32 * f[k];
        jy += e[1] as f32 * f[k];
    }
    MacroCell::new(rho, jx / rho, jy / rho)
}

/// Pull streaming with toroidal wrap: population k arrives from `p - e_k`.
pub fn gather(src: &[f32], nx: u32, ny: u32, x: u32, y: u32) -> [f32; 9] {
    let n = (nx * ny) as usize;
    let mut f = [0.0; 9];
    for (k, e) in E.iter().enumerate() {
        let sx = (x as i64 - e[0] as i64).rem_euclid(nx as i64) as usize;
        let sy = (y as i64 - e[1] as i64).rem_euclid(ny as i64) as usize;
        f[k] = src[k * n + sx + sy * nx as usize];
    }
    f
}

/// One output cell: gather, moment recovery, boundary override, equilibrium and BGK relaxation.
pub fn collide_stream_cell(
    src: &[f32], nx: u32, ny: u32, x: u32, y: u32, ty: LatticeType, params: &StepParams,
) -> ([f32; 9], MacroCell) {
    let incoming = gather(src, nx, ny, x, y);
    let cell = match ty {
        // no-slip: snap to rest equilibrium instead of reversing populations
        LatticeType::Obstacle => MacroCell::new(1.0, 0.0, 0.0),
        LatticeType::Inlet => MacroCell::new(1.0, params.inlet_u, 0.0),
        LatticeType::Bulk => moments(&incoming),
    };

    let eq = equilibrium(cell.rho, cell.ux, cell.uy);
    let out = match ty {
        LatticeType::Bulk => {
            let mut out = [0.0; 9];
            for k in 0..9 {
                out[k] = incoming[k] + params.omega * (eq[k] - incoming[k]);
            }
            out
        }
        // inlet and solid cells are reset straight to equilibrium, bypassing relaxation
        LatticeType::Inlet | LatticeType::Obstacle => eq,
    };
    (out, cell)
}

/// Initial generation: ρ=1 with u=(U,0) on fluid cells, rest equilibrium on solid cells.
pub fn equilibrium_state(geometry: &ObstacleGeometry, inlet_u: f32) -> (Vec<f32>, Vec<MacroCell>) {
    let n = (geometry.nx * geometry.ny) as usize;
    let moving = equilibrium(1.0, inlet_u, 0.0);
    let rest = equilibrium(1.0, 0.0, 0.0);
    let mut dist = vec![0.0; 9 * n];
    let mut macro_cells = Vec::with_capacity(n);
    for y in 0..geometry.ny {
        for x in 0..geometry.nx {
            let i = (x + y * geometry.nx) as usize;
            let (eq, cell) = if geometry.is_solid(x, y) {
                (&rest, MacroCell::new(1.0, 0.0, 0.0))
            } else {
                (&moving, MacroCell::new(1.0, inlet_u, 0.0))
            };
            for k in 0..9 {
                dist[k * n + i] = eq[k];
            }
            macro_cells.push(cell);
        }
    }
    (dist, macro_cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn equilibrium_rest() {
        let eq = equilibrium(1.0, 0.0, 0.0);
        for k in 0..9 {
            assert_relative_eq!(eq[k], W[k], epsilon = 1e-7);
        }
    }

    #[test]
    fn equilibrium_moments_round_trip() {
        let eq = equilibrium(1.2, 0.08, -0.03);
        let m = moments(&eq);
        assert_relative_eq!(m.rho, 1.2, epsilon = 1e-6);
        assert_relative_eq!(m.ux, 0.08, epsilon = 1e-6);
        assert_relative_eq!(m.uy, -0.03, epsilon = 1e-6);
    }

    #[test]
    fn gather_wraps_both_axes() {
        let (nx, ny) = (4, 3);
        let n = 12;
        let mut src = vec![0.0; 9 * n];
        // direction 7 = (-1,-1) leaving cell (0,0) lands on (3,2)
        src[7 * n] = 5.0;
        let f = gather(&src, nx, ny, 3, 2);
        assert_eq!(f[7], 5.0);
        assert_eq!(f.iter().sum::<f32>(), 5.0);
    }

    #[test]
    fn obstacle_cell_ignores_incoming() {
        let n = 9;
        let src: Vec<f32> = (0..9 * n).map(|i| 0.05 + i as f32 * 0.01).collect();
        let params = StepParams { omega: 1.7, inlet_u: 0.1 };
        let (out, cell) = collide_stream_cell(&src, 3, 3, 1, 1, LatticeType::Obstacle, &params);
        assert_eq!(cell, MacroCell::new(1.0, 0.0, 0.0));
        assert_eq!(out, equilibrium(1.0, 0.0, 0.0));
    }

    #[test]
    fn inlet_cell_is_exact() {
        let n = 9;
        let src = vec![0.3; 9 * n];
        let params = StepParams { omega: 1.2, inlet_u: 0.07 };
        let (out, cell) = collide_stream_cell(&src, 3, 3, 0, 2, LatticeType::Inlet, &params);
        assert_eq!(cell, MacroCell::new(1.0, 0.07, 0.0));
        let m = moments(&out);
        assert_relative_eq!(m.rho, 1.0, epsilon = 1e-6);
        assert_relative_eq!(m.ux, 0.07, epsilon = 1e-6);
    }

    #[test]
    fn initial_state_by_material() {
        let geometry = ObstacleGeometry::airfoil(64, 32);
        let (dist, cells) = equilibrium_state(&geometry, 0.1);
        let n = 64 * 32;
        assert_eq!(dist.len(), 9 * n);
        // (16, 16) is the obstacle centre, (40, 5) open fluid
        assert_eq!(cells[16 + 16 * 64], MacroCell::new(1.0, 0.0, 0.0));
        assert_eq!(cells[40 + 5 * 64], MacroCell::new(1.0, 0.1, 0.0));
        let f: [f32; 9] = std::array::from_fn(|k| dist[k * n + 40 + 5 * 64]);
        assert_relative_eq!(moments(&f).ux, 0.1, epsilon = 1e-6);
    }

    #[test]
    fn non_finite_state_propagates() {
        let n = 1;
        let mut src = vec![0.1; 9 * n];
        src[0] = f32::NAN;
        let params = StepParams { omega: 1.0, inlet_u: 0.1 };
        let (out, cell) = collide_stream_cell(&src, 1, 1, 0, 0, LatticeType::Bulk, &params);
        assert!(cell.rho.is_nan());
        assert!(out.iter().all(|v| v.is_nan()));
    }
}
