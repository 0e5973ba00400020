use crate::error::FlowError;
use std::sync::Arc;

/// Headless wgpu device and queue shared by the compute nodes.
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    pub fn new() -> Result<Self, FlowError> {
        pollster::block_on(Self::request())
    }

    pub async fn request() -> Result<Self, FlowError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(FlowError::NoAdapter)?;
        let adapter_info = adapter.get_info();
        log::info!("adapter: {} ({:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("windtunnel device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| FlowError::DeviceCreation(e.to_string()))?;

        Ok(GpuContext { device: Arc::new(device), queue: Arc::new(queue), adapter_info })
    }
}
