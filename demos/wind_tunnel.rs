use std::path::{Path, PathBuf};
use windtunnel::{
    field_view::draw_glyphs, D2Q9Node, FlowError, FluidPlayer, GpuContext, Player, RunStatus,
    SettingObj,
};

const DEFAULT_TICKS: u64 = 500;
const SNAPSHOT_INTERVAL: u64 = 100;

fn main() {
    env_logger::init();

    let ticks = std::env::var("WINDTUNNEL_TICKS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_TICKS);
    let out_dir = PathBuf::from(std::env::var("WINDTUNNEL_OUT").unwrap_or_else(|_| ".".into()));

    let context = match GpuContext::new() {
        Ok(context) => context,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    let setting = SettingObj::default();
    let mut player = match FluidPlayer::new_gpu(&context, setting) {
        Ok(player) => player,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    let (nx, ny) = setting.lattice_size();

    for tick in 0..ticks {
        match player.enter_frame() {
            Ok(RunStatus::Stable) => {}
            Ok(RunStatus::Crashed) => {
                log::warn!("stopped at tick {}", tick);
                break;
            }
            Err(e) => {
                log::error!("{}", e);
                std::process::exit(1);
            }
        }
        if tick % SNAPSHOT_INTERVAL == 0 || tick + 1 == ticks {
            let report = player.report();
            log::info!(
                "tick {:>5}  Cd {:>8.4}  Cl {:>8.4}  probe {:>9.5}  {:>7.1} MLUPS",
                tick,
                report.drag,
                report.lift,
                report.probe,
                report.mlups
            );
            let path = out_dir.join(format!("wind_tunnel_{:05}.png", tick));
            match save_snapshot(&player, &path, (nx, ny)) {
                Ok(()) => log::info!("saved {}", path.display()),
                Err(e) => log::error!("{}: {}", path.display(), e),
            }
        }
    }

    let history: Vec<_> = player.history().collect();
    if let (Some(first), Some(last)) = (history.first(), history.last()) {
        log::info!(
            "{} samples over ticks {}..={}, final Cd {:.4}, Cl {:.4}",
            history.len(),
            first.tick,
            last.tick,
            last.drag,
            last.lift
        );
    }
}

fn save_snapshot(
    player: &FluidPlayer<D2Q9Node>, path: &Path, lattice: (u32, u32),
) -> Result<(), FlowError> {
    let mut frame = player.render_frame(lattice.0, lattice.1)?;
    draw_glyphs(&mut frame, &player.velocity_glyphs()?, lattice, 60.0);
    frame.save(path)?;
    Ok(())
}
