use super::{BoundarySample, CellRect, MacroField, ObstacleGeometry};

/// Run state surfaced to the host. `Crashed` is terminal until an explicit reset.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RunStatus {
    #[default]
    Stable,
    Crashed,
}

/// Dimensionless surface-force coefficients.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Coefficients {
    /// Cd = |Fx| / q, always a magnitude
    pub drag: f32,
    /// Cl = Fy / q, signed
    pub lift: f32,
}

/// Reduces the pressure on the obstacle's boundary samples to drag and lift.
#[derive(Clone, Debug)]
pub struct ForceIntegrator {
    samples: Vec<BoundarySample>,
    reference_length: f32,
    region: CellRect,
}

impl ForceIntegrator {
    pub fn new(geometry: &ObstacleGeometry) -> Self {
        ForceIntegrator {
            samples: geometry.boundary.clone(),
            reference_length: geometry.reference_length,
            region: geometry.force_region,
        }
    }

    /// The rectangle that has to be read back for [`measure`](Self::measure).
    pub fn region(&self) -> CellRect {
        self.region
    }

    /// Net force (Fx, Fy) with p = 3(ρ − 1) accumulated along the inward normals.
    pub fn net_force(&self, field: &MacroField) -> (f32, f32) {
        let mut force = (0.0_f32, 0.0_f32);
        for s in &self.samples {
            let Some(cell) = field.get(s.x, s.y) else {
                continue;
            };
            let p = 3.0 * (cell.rho - 1.0);
            force.0 += p * s.nx;
            force.1 += p * s.ny;
        }
        force
    }

    pub fn measure(&self, field: &MacroField, inlet_u: f32) -> Coefficients {
        let q = 0.5 * inlet_u * inlet_u * self.reference_length;
        if q <= 0.0 {
            return Coefficients::default();
        }
        let (fx, fy) = self.net_force(field);
        Coefficients { drag: fx.abs() / q, lift: fy / q }
    }
}

/// Watches ρ at a single interior cell for divergence.
#[derive(Copy, Clone, Debug)]
pub struct StabilityMonitor {
    pub probe: (u32, u32),
    pub min_rho: f32,
    pub max_rho: f32,
}

impl StabilityMonitor {
    pub fn new(geometry: &ObstacleGeometry) -> Self {
        StabilityMonitor { probe: geometry.monitor_probe, min_rho: 0.0, max_rho: 5.0 }
    }

    pub fn region(&self) -> CellRect {
        CellRect::single(self.probe.0, self.probe.1)
    }

    pub fn check(&self, rho: f32) -> RunStatus {
        if rho.is_finite() && (self.min_rho..=self.max_rho).contains(&rho) {
            RunStatus::Stable
        } else {
            RunStatus::Crashed
        }
    }
}
