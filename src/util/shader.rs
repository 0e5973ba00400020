use crate::error::FlowError;
use std::borrow::Cow;
use wgpu::{ShaderModule, ShaderModuleDescriptor, ShaderSource};

// `SHADER_MAP`, generated by build.rs from shader-wgsl/ with #include expanded
include!(concat!(env!("OUT_DIR"), "/shader_map.rs"));

/// Looks up a preprocessed shader by its path under `shader-wgsl/` (without extension).
pub fn shader_source(shader_name: &str) -> Result<&'static str, FlowError> {
    let key = shader_name.replace('/', "_");
    SHADER_MAP.get(key.as_str()).copied().ok_or(FlowError::ShaderNotFound(key))
}

pub fn create_shader_module(
    device: &wgpu::Device, shader_name: &str, label: Option<&str>,
) -> Result<ShaderModule, FlowError> {
    let source = shader_source(shader_name)?;
    Ok(device.create_shader_module(ShaderModuleDescriptor {
        label,
        source: ShaderSource::Wgsl(Cow::Borrowed(source)),
    }))
}
