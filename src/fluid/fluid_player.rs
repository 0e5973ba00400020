use super::{
    CellRect, Coefficients, D2Q9Node, FlowSolver, ForceIntegrator, ObstacleGeometry, RunStatus,
    StabilityMonitor,
};
use crate::{
    error::FlowError,
    field_view::{self, VelocityGlyph},
    setting_obj::SettingObj,
    util::GpuContext,
    Player,
};
use image::RgbaImage;
use std::{collections::VecDeque, time::Instant};

/// Ticks between two force/stability measurements.
pub const MEASURE_INTERVAL: u64 = 5;
/// Drag/lift samples kept for an external plotter.
pub const HISTORY_LEN: usize = 600;

/// Latest measurement, refreshed every [`MEASURE_INTERVAL`] ticks.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FlowReport {
    pub drag: f32,
    pub lift: f32,
    /// ρ − 1 at the stability probe
    pub probe: f32,
    pub status: RunStatus,
    /// Million lattice updates per second over the last measurement window
    pub mlups: f32,
    pub tick: u64,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HistorySample {
    pub tick: u64,
    pub drag: f32,
    pub lift: f32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum PendingInit {
    Reset,
    // resolution changed: new geometry as well as fresh state
    Rebuild,
}

struct Throughput {
    since: Instant,
    cell_updates: u64,
}

impl Throughput {
    fn new() -> Self {
        Throughput { since: Instant::now(), cell_updates: 0 }
    }

    // MLUPS since the previous call
    fn take_mlups(&mut self) -> f32 {
        let secs = self.since.elapsed().as_secs_f64();
        let mlups = if secs > 0.0 { self.cell_updates as f64 / secs / 1e6 } else { 0.0 };
        *self = Throughput::new();
        mlups as f32
    }
}

/// Drives one solver tick per host frame: deferred reinitialization, S substeps, periodic
/// measurement, and the Crashed latch.
pub struct FluidPlayer<S: FlowSolver> {
    solver: S,
    setting: SettingObj,
    geometry: ObstacleGeometry,
    force_integrator: ForceIntegrator,
    monitor: StabilityMonitor,
    status: RunStatus,
    pending: Option<PendingInit>,
    frame_num: u64,
    report: FlowReport,
    history: VecDeque<HistorySample>,
    throughput: Throughput,
}

impl FluidPlayer<D2Q9Node> {
    /// GPU-backed player; setup failures are fatal here, nothing falls back to the CPU.
    pub fn new_gpu(context: &GpuContext, setting: SettingObj) -> Result<Self, FlowError> {
        setting.validate()?;
        let (nx, ny) = setting.lattice_size();
        let geometry = ObstacleGeometry::airfoil(nx, ny);
        let solver = D2Q9Node::new(context, &geometry, setting.inlet_speed).map_err(|e| {
            log::error!("failed to set up the GPU solver: {}", e);
            e
        })?;
        Ok(Self::with_geometry(solver, setting, geometry))
    }
}

impl<S: FlowSolver> FluidPlayer<S> {
    /// Takes any solver and (re)initializes it for `setting`'s resolution.
    pub fn new(mut solver: S, setting: SettingObj) -> Result<Self, FlowError> {
        setting.validate()?;
        let (nx, ny) = setting.lattice_size();
        let geometry = ObstacleGeometry::airfoil(nx, ny);
        solver.initialize(&geometry, setting.inlet_speed)?;
        Ok(Self::with_geometry(solver, setting, geometry))
    }

    fn with_geometry(solver: S, setting: SettingObj, geometry: ObstacleGeometry) -> Self {
        log::info!(
            "wind tunnel {}x{}: Re = {}, U = {}, {} substeps, {} boundary samples",
            geometry.nx,
            geometry.ny,
            setting.reynolds,
            setting.inlet_speed,
            setting.substeps,
            geometry.boundary.len()
        );
        FluidPlayer {
            solver,
            setting,
            force_integrator: ForceIntegrator::new(&geometry),
            monitor: StabilityMonitor::new(&geometry),
            geometry,
            status: RunStatus::Stable,
            pending: None,
            frame_num: 0,
            report: FlowReport::default(),
            history: VecDeque::with_capacity(HISTORY_LEN),
            throughput: Throughput::new(),
        }
    }

    pub fn setting(&self) -> &SettingObj {
        &self.setting
    }

    pub fn geometry(&self) -> &ObstacleGeometry {
        &self.geometry
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Direct access for host-side perturbations such as [`FlowSolver::write_cell`].
    pub fn solver_mut(&mut self) -> &mut S {
        &mut self.solver
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn report(&self) -> FlowReport {
        self.report
    }

    pub fn frame_num(&self) -> u64 {
        self.frame_num
    }

    /// Oldest first.
    pub fn history(&self) -> impl Iterator<Item = &HistorySample> {
        self.history.iter()
    }

    /// Applied at the next tick boundary; the only way out of [`RunStatus::Crashed`].
    pub fn request_reset(&mut self) {
        if self.pending.is_none() {
            self.pending = Some(PendingInit::Reset);
        }
    }

    fn reinitialize(&mut self, pending: PendingInit) -> Result<(), FlowError> {
        if pending == PendingInit::Rebuild {
            let (nx, ny) = self.setting.lattice_size();
            let geometry = ObstacleGeometry::airfoil(nx, ny);
            self.solver.initialize(&geometry, self.setting.inlet_speed)?;
            self.force_integrator = ForceIntegrator::new(&geometry);
            self.monitor = StabilityMonitor::new(&geometry);
            self.geometry = geometry;
        } else {
            self.solver.initialize(&self.geometry, self.setting.inlet_speed)?;
        }
        self.status = RunStatus::Stable;
        self.frame_num = 0;
        self.report = FlowReport::default();
        self.history.clear();
        self.throughput = Throughput::new();
        log::info!("reinitialized {}x{} ({:?})", self.geometry.nx, self.geometry.ny, pending);
        Ok(())
    }

    fn measure(&mut self) -> Result<(), FlowError> {
        let field = self.solver.read_region(self.force_integrator.region())?;
        let Coefficients { drag, lift } =
            self.force_integrator.measure(&field, self.setting.inlet_speed);

        let (px, py) = self.monitor.probe;
        let probe_rho = self
            .solver
            .read_region(self.monitor.region())?
            .get(px, py)
            .map(|cell| cell.rho)
            .unwrap_or(f32::NAN);
        let status = self.monitor.check(probe_rho);
        if status == RunStatus::Crashed && self.status != RunStatus::Crashed {
            log::warn!(
                "simulation diverged at tick {}: rho = {} at probe ({}, {})",
                self.frame_num,
                probe_rho,
                px,
                py
            );
        }
        self.status = status;

        self.report = FlowReport {
            drag,
            lift,
            probe: probe_rho - 1.0,
            status,
            mlups: self.throughput.take_mlups(),
            tick: self.frame_num,
        };
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(HistorySample { tick: self.frame_num, drag, lift });
        log::debug!("{:?}", self.report);
        Ok(())
    }

    /// Full-lattice read-back mapped through the current view, colormap and contrast.
    pub fn render_frame(&self, width: u32, height: u32) -> Result<RgbaImage, FlowError> {
        let field = self.solver.read_region(CellRect::full(self.geometry.nx, self.geometry.ny))?;
        Ok(field_view::render_frame(
            &field,
            &self.geometry,
            self.setting.view,
            self.setting.colormap,
            self.setting.contrast,
            width,
            height,
        ))
    }

    pub fn velocity_glyphs(&self) -> Result<Vec<VelocityGlyph>, FlowError> {
        let field = self.solver.read_region(CellRect::full(self.geometry.nx, self.geometry.ny))?;
        Ok(field_view::velocity_glyphs(&field, &self.geometry))
    }
}

impl<S: FlowSolver> Player for FluidPlayer<S> {
    fn update_setting(&mut self, setting: SettingObj) -> Result<(), FlowError> {
        setting.validate()?;
        if setting.resolution != self.setting.resolution {
            self.pending = Some(PendingInit::Rebuild);
        }
        self.setting = setting;
        Ok(())
    }

    fn reset(&mut self) {
        self.request_reset();
    }

    fn enter_frame(&mut self) -> Result<RunStatus, FlowError> {
        if let Some(pending) = self.pending.take() {
            if let Err(e) = self.reinitialize(pending) {
                // stays queued for the next tick boundary
                self.pending = Some(pending);
                return Err(e);
            }
        }
        if !self.setting.running || self.status == RunStatus::Crashed {
            return Ok(self.status);
        }

        let params = self.setting.step_params(&self.geometry);
        self.solver.step(&params, self.setting.substeps);
        self.throughput.cell_updates +=
            (self.geometry.nx * self.geometry.ny) as u64 * self.setting.substeps as u64;

        if self.frame_num % MEASURE_INTERVAL == 0 {
            self.measure()?;
        }
        self.frame_num += 1;
        Ok(self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fluid::{MacroField, ReferenceSolver, StepParams},
        setting_obj::Resolution,
    };

    fn small_setting() -> SettingObj {
        SettingObj::new(200.0, 0.1, 1, Resolution::Small)
    }

    fn reference_player(setting: SettingObj) -> FluidPlayer<ReferenceSolver> {
        let geometry = ObstacleGeometry::open_channel(4, 4);
        FluidPlayer::new(ReferenceSolver::new(&geometry, 0.1), setting).unwrap()
    }

    // Reference solver whose reinitialization can be made to fail
    struct FlakySolver {
        inner: ReferenceSolver,
        fail_initialize: bool,
    }

    impl FlowSolver for FlakySolver {
        fn lattice_size(&self) -> (u32, u32) {
            self.inner.lattice_size()
        }

        fn initialize(
            &mut self, geometry: &ObstacleGeometry, inlet_u: f32,
        ) -> Result<(), FlowError> {
            if self.fail_initialize {
                return Err(FlowError::BufferMap("initialize refused".to_string()));
            }
            self.inner.initialize(geometry, inlet_u)
        }

        fn step(&mut self, params: &StepParams, substeps: u32) {
            self.inner.step(params, substeps)
        }

        fn read_region(&self, region: CellRect) -> Result<MacroField, FlowError> {
            self.inner.read_region(region)
        }

        fn write_cell(&mut self, x: u32, y: u32, populations: [f32; 9]) -> Result<(), FlowError> {
            self.inner.write_cell(x, y, populations)
        }
    }

    fn flaky_player(setting: SettingObj) -> FluidPlayer<FlakySolver> {
        let geometry = ObstacleGeometry::open_channel(4, 4);
        let solver =
            FlakySolver { inner: ReferenceSolver::new(&geometry, 0.1), fail_initialize: false };
        FluidPlayer::new(solver, setting).unwrap()
    }

    #[test]
    fn first_tick_measures() {
        let mut player = reference_player(small_setting());
        assert_eq!(player.solver().lattice_size(), (400, 200));
        assert_eq!(player.enter_frame().unwrap(), RunStatus::Stable);
        let report = player.report();
        assert_eq!(report.tick, 0);
        assert!(report.drag.is_finite() && report.lift.is_finite());
        assert!(report.probe.abs() < 0.1);
        assert!(report.mlups >= 0.0);
        assert_eq!(player.history().count(), 1);
        assert_eq!(player.frame_num(), 1);
    }

    #[test]
    fn divergence_latches_until_reset() {
        let mut player = reference_player(small_setting());
        player.enter_frame().unwrap();

        let (px, py) = player.geometry().monitor_probe;
        player.solver_mut().write_cell(px, py, [f32::NAN; 9]).unwrap();
        let mut status = RunStatus::Stable;
        for _ in 0..MEASURE_INTERVAL {
            status = player.enter_frame().unwrap();
        }
        assert_eq!(status, RunStatus::Crashed);
        assert_eq!(player.report().status, RunStatus::Crashed);
        assert!(player.report().probe.is_nan());

        // ticking halts while crashed
        let frames = player.frame_num();
        player.enter_frame().unwrap();
        assert_eq!(player.frame_num(), frames);

        player.reset();
        assert_eq!(player.enter_frame().unwrap(), RunStatus::Stable);
        assert_eq!(player.report().status, RunStatus::Stable);
        assert!(player.report().probe.is_finite());
        assert_eq!(player.history().count(), 1);
    }

    #[test]
    fn invalid_setting_keeps_prior_state() {
        let mut player = reference_player(small_setting());
        player.enter_frame().unwrap();
        let before = *player.setting();
        let bad = SettingObj { inlet_speed: 0.5, resolution: Resolution::Large, ..before };
        assert!(matches!(player.update_setting(bad), Err(FlowError::InvalidSetting(_))));
        assert_eq!(*player.setting(), before);
        player.enter_frame().unwrap();
        assert_eq!(player.solver().lattice_size(), (400, 200));
        assert_eq!(player.frame_num(), 2);
    }

    #[test]
    fn resolution_change_rebuilds_at_tick_boundary() {
        let mut player = reference_player(small_setting());
        let next =
            SettingObj { resolution: Resolution::Medium, running: false, ..*player.setting() };
        player.update_setting(next).unwrap();
        // nothing changes until the next tick
        assert_eq!(player.geometry().nx, 400);
        assert_eq!(player.enter_frame().unwrap(), RunStatus::Stable);
        assert_eq!(player.solver().lattice_size(), (800, 400));
        assert_eq!(player.geometry().reference_length, 50.0);
        assert_eq!(player.frame_num(), 0);
    }

    #[test]
    fn pause_stops_ticking() {
        let mut player = reference_player(SettingObj { running: false, ..small_setting() });
        player.enter_frame().unwrap();
        player.enter_frame().unwrap();
        assert_eq!(player.frame_num(), 0);
        assert_eq!(player.history().count(), 0);
    }

    #[test]
    fn renders_current_generation() {
        let player = reference_player(small_setting());
        let image = player.render_frame(200, 100).unwrap();
        assert_eq!(image.dimensions(), (200, 100));
        let glyphs = player.velocity_glyphs().unwrap();
        assert_eq!(glyphs.len(), player.geometry().glyph_probes.len());
    }

    #[test]
    fn failed_reset_is_retried() {
        let mut player = flaky_player(small_setting());
        player.enter_frame().unwrap();
        player.enter_frame().unwrap();
        assert_eq!(player.frame_num(), 2);

        player.reset();
        player.solver_mut().fail_initialize = true;
        assert!(player.enter_frame().is_err());
        assert_eq!(player.frame_num(), 2);

        player.solver_mut().fail_initialize = false;
        player.enter_frame().unwrap();
        assert_eq!(player.frame_num(), 1);
        assert_eq!(player.history().count(), 1);
    }

    #[test]
    fn failed_rebuild_keeps_geometry_and_is_retried() {
        let mut player = flaky_player(small_setting());
        let next =
            SettingObj { resolution: Resolution::Medium, running: false, ..*player.setting() };
        player.update_setting(next).unwrap();

        player.solver_mut().fail_initialize = true;
        assert!(player.enter_frame().is_err());
        assert_eq!(player.geometry().nx, 400);
        assert_eq!(player.solver().lattice_size(), (400, 200));
        assert!(player.render_frame(40, 20).is_ok());

        player.solver_mut().fail_initialize = false;
        player.enter_frame().unwrap();
        assert_eq!(player.geometry().nx, 800);
        assert_eq!(player.solver().lattice_size(), (800, 400));
    }
}
