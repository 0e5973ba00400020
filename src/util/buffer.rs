use wgpu::util::DeviceExt;
use zerocopy::AsBytes;

pub struct BufferObj {
    pub buffer: wgpu::Buffer,
    pub size: wgpu::BufferAddress,
}

impl BufferObj {
    pub fn create_empty_storage_buffer(
        device: &wgpu::Device, size: u64, can_read_back: bool, label: Option<&'static str>,
    ) -> Self {
        let mut usage = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST;
        if can_read_back {
            usage |= wgpu::BufferUsages::COPY_SRC;
        }
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label,
            size,
            usage,
            mapped_at_creation: false,
        });
        BufferObj { buffer, size }
    }

    pub fn create_storage_buffer<T: AsBytes + ?Sized>(
        device: &wgpu::Device, data: &T, can_read_back: bool, label: Option<&'static str>,
    ) -> Self {
        let mut usage = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST;
        if can_read_back {
            usage |= wgpu::BufferUsages::COPY_SRC;
        }
        Self::create_buffer(device, data, usage, label)
    }

    pub fn create_uniform_buffer<T: AsBytes + ?Sized>(
        device: &wgpu::Device, uniform: &T, label: Option<&'static str>,
    ) -> Self {
        Self::create_buffer(
            device,
            uniform,
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            label,
        )
    }

    pub fn create_buffer<T: AsBytes + ?Sized>(
        device: &wgpu::Device, data: &T, usage: wgpu::BufferUsages, label: Option<&'static str>,
    ) -> Self {
        let contents = data.as_bytes();
        let buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor { label, contents, usage });
        BufferObj { buffer, size: contents.len() as wgpu::BufferAddress }
    }

    /// Staging buffer the host can map after a `copy_buffer_to_buffer`.
    pub fn create_read_back_buffer(
        device: &wgpu::Device, size: u64, label: Option<&'static str>,
    ) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label,
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        BufferObj { buffer, size }
    }
}
