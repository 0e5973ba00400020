use thiserror::Error;

/// Failures surfaced by the wind tunnel at its call boundary.
///
/// Numerical divergence is not an error: it is reported as
/// [`RunStatus::Crashed`](crate::RunStatus::Crashed).
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("No GPU adapter found")]
    NoAdapter,

    #[error("Failed to create GPU device: {0}")]
    DeviceCreation(String),

    #[error("GPU buffer mapping failed: {0}")]
    BufferMap(String),

    #[error("Shader not found in preprocessed map: {0}")]
    ShaderNotFound(String),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("Unsupported resolution {width}x{height}")]
    UnsupportedResolution { width: u32, height: u32 },

    #[error("Region {x}..{x_end} x {y}..{y_end} lies outside the lattice")]
    RegionOutOfBounds { x: u32, y: u32, x_end: u32, y_end: u32 },

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}
