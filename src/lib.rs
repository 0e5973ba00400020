//! GPU lattice Boltzmann wind tunnel: D2Q9 flow past a fixed obstacle, with drag/lift
//! coefficients, a divergence latch and a colour-mapped view of the field.

mod error;
pub use error::FlowError;

pub mod field_view;
pub use field_view::{Colormap, FieldView};

pub mod fluid;
pub use fluid::{
    D2Q9Node, FlowReport, FlowSolver, FluidPlayer, ObstacleGeometry, ReferenceSolver, RunStatus,
};

mod setting_obj;
pub use setting_obj::{Resolution, SettingObj};

pub mod util;
pub use util::GpuContext;

/// Host-facing tick contract: one `enter_frame` per display refresh.
pub trait Player {
    /// Validates first; a rejected setting leaves the player untouched.
    fn update_setting(&mut self, setting: SettingObj) -> Result<(), FlowError>;

    /// Reinitializes the lattice at the next tick boundary.
    fn reset(&mut self);

    fn enter_frame(&mut self) -> Result<RunStatus, FlowError>;
}
