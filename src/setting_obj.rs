use crate::{
    error::FlowError,
    field_view::{Colormap, FieldView},
    fluid::{ObstacleGeometry, StepParams},
};

/// Supported lattice sizes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Small,
    Medium,
    Large,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [Resolution::Small, Resolution::Medium, Resolution::Large];

    pub fn size(&self) -> (u32, u32) {
        match self {
            Resolution::Small => (400, 200),
            Resolution::Medium => (800, 400),
            Resolution::Large => (1200, 600),
        }
    }

    pub fn from_size(width: u32, height: u32) -> Result<Self, FlowError> {
        Self::ALL
            .into_iter()
            .find(|r| r.size() == (width, height))
            .ok_or(FlowError::UnsupportedResolution { width, height })
    }
}

/// Run parameters fed in by the control layer; read fresh at every tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SettingObj {
    pub reynolds: f32,
    pub inlet_speed: f32,
    /// Kernel passes per display tick
    pub substeps: u32,
    pub resolution: Resolution,
    pub contrast: f32,
    pub view: FieldView,
    pub colormap: Colormap,
    pub running: bool,
}

impl Default for SettingObj {
    fn default() -> Self {
        SettingObj {
            reynolds: 1000.0,
            inlet_speed: 0.1,
            substeps: 8,
            resolution: Resolution::Medium,
            contrast: 1.0,
            view: FieldView::Vorticity,
            colormap: Colormap::Coolwarm,
            running: true,
        }
    }
}

impl SettingObj {
    pub fn new(reynolds: f32, inlet_speed: f32, substeps: u32, resolution: Resolution) -> Self {
        SettingObj { reynolds, inlet_speed, substeps, resolution, ..Default::default() }
    }

    pub fn validate(&self) -> Result<(), FlowError> {
        if !self.reynolds.is_finite() || self.reynolds <= 0.0 {
            return Err(FlowError::InvalidSetting(format!(
                "Reynolds number must be positive, got {}",
                self.reynolds
            )));
        }
        if !(0.01..=0.3).contains(&self.inlet_speed) {
            return Err(FlowError::InvalidSetting(format!(
                "inlet speed must lie in [0.01, 0.3], got {}",
                self.inlet_speed
            )));
        }
        if !(1..=64).contains(&self.substeps) {
            return Err(FlowError::InvalidSetting(format!(
                "substeps must lie in [1, 64], got {}",
                self.substeps
            )));
        }
        if !self.contrast.is_finite() || self.contrast <= 0.0 {
            return Err(FlowError::InvalidSetting(format!(
                "contrast must be positive, got {}",
                self.contrast
            )));
        }
        Ok(())
    }

    pub fn lattice_size(&self) -> (u32, u32) {
        self.resolution.size()
    }

    pub fn step_params(&self, geometry: &ObstacleGeometry) -> StepParams {
        StepParams::from_flow(self.reynolds, self.inlet_speed, geometry.reference_length)
    }

    pub fn update_reynolds(&mut self, reynolds: f32) -> Result<(), FlowError> {
        self.update_with(|s| s.reynolds = reynolds)
    }

    pub fn update_inlet_speed(&mut self, inlet_speed: f32) -> Result<(), FlowError> {
        self.update_with(|s| s.inlet_speed = inlet_speed)
    }

    pub fn update_substeps(&mut self, substeps: u32) -> Result<(), FlowError> {
        self.update_with(|s| s.substeps = substeps)
    }

    pub fn update_contrast(&mut self, contrast: f32) -> Result<(), FlowError> {
        self.update_with(|s| s.contrast = contrast)
    }

    // applies the change to a copy and only commits a valid result
    fn update_with(&mut self, f: impl FnOnce(&mut SettingObj)) -> Result<(), FlowError> {
        let mut next = *self;
        f(&mut next);
        next.validate()?;
        *self = next;
        Ok(())
    }
}
