//! Flow past the double wedge at Re = 1000, driven through the `Player` tick contract.
//!
//! The body and the inlet are mirror-symmetric about the centre row, so the wake stays symmetric
//! and the lift stays at rounding level until something breaks the symmetry. Both runs kick the
//! near wake sideways once and then require the lift to swing through both signs.

use windtunnel::{
    fluid::kernel, FlowSolver, FluidPlayer, GpuContext, ObstacleGeometry, Player, ReferenceSolver,
    Resolution, RunStatus, SettingObj,
};

const SYMMETRIC_TICKS: u64 = 50;
const TOTAL_TICKS: u64 = 500;

// Sideways velocity imposed on a block of wake cells above the centre row
fn kick_wake<S: FlowSolver>(player: &mut FluidPlayer<S>, inlet_u: f32) {
    let (px, py) = player.geometry().monitor_probe;
    let f = kernel::equilibrium(1.0, inlet_u, 0.05);
    for y in py + 2..py + 10 {
        for x in px - 4..px + 4 {
            player.solver_mut().write_cell(x, y, f).unwrap();
        }
    }
}

fn assert_wake_oscillates<S: FlowSolver>(mut player: FluidPlayer<S>) {
    let inlet_u = player.setting().inlet_speed;
    for _ in 0..SYMMETRIC_TICKS {
        assert_eq!(player.enter_frame().unwrap(), RunStatus::Stable);
    }
    let symmetric_max = player.history().map(|s| s.lift.abs()).fold(0.0f32, f32::max);
    assert!(symmetric_max < 1e-2, "symmetric body carries lift {}", symmetric_max);

    kick_wake(&mut player, inlet_u);
    for _ in SYMMETRIC_TICKS..TOTAL_TICKS {
        assert_eq!(player.enter_frame().unwrap(), RunStatus::Stable);
    }

    let report = player.report();
    assert_eq!(report.status, RunStatus::Stable);
    assert!(report.drag > 0.0 && report.drag < 10.0, "Cd = {}", report.drag);

    let lift: Vec<f32> =
        player.history().filter(|s| s.tick >= SYMMETRIC_TICKS).map(|s| s.lift).collect();
    assert!(lift.iter().all(|cl| cl.is_finite() && cl.abs() < 10.0), "{:?}", lift);
    let max = lift.iter().cloned().fold(f32::MIN, f32::max);
    let min = lift.iter().cloned().fold(f32::MAX, f32::min);
    assert!(max > 1e-3 && min < -1e-3, "lift should swing both ways: {:?}", lift);
    assert!(max - min > 10.0 * symmetric_max, "amplitude {} vs {}", max - min, symmetric_max);
}

#[test]
#[ignore = "long-running: 4000 kernel passes on an 800x400 lattice"]
fn gpu_wake_oscillates_after_kick() {
    let context = match GpuContext::new() {
        Ok(context) => context,
        Err(e) => {
            eprintln!("skipping GPU test: {}", e);
            return;
        }
    };
    assert_wake_oscillates(FluidPlayer::new_gpu(&context, SettingObj::default()).unwrap());
}

#[test]
#[ignore = "long-running: 4000 reference passes on a 400x200 lattice"]
fn reference_wake_oscillates_after_kick() {
    let setting = SettingObj { resolution: Resolution::Small, ..SettingObj::default() };
    let geometry = ObstacleGeometry::open_channel(4, 4);
    let solver = ReferenceSolver::new(&geometry, setting.inlet_speed);
    assert_wake_oscillates(FluidPlayer::new(solver, setting).unwrap());
}
