use super::{
    kernel, CellRect, FlowSolver, GenerationPair, LbmUniform, MacroCell, MacroField,
    ObstacleGeometry, StepParams,
};
use crate::{
    error::FlowError,
    util::{create_shader_module, BufferObj, ComputeNode, GpuContext},
};
use std::sync::Arc;
use zerocopy::AsBytes;

const MACRO_CELL_BYTES: u64 = std::mem::size_of::<MacroCell>() as u64;
const F32_BYTES: u64 = std::mem::size_of::<f32>() as u64;

// One lattice snapshot resident on the GPU
struct GpuGeneration {
    dist_buf: BufferObj,
    macro_buf: BufferObj,
}

impl GpuGeneration {
    fn new(device: &wgpu::Device, cell_count: u64, label: &'static str) -> Self {
        GpuGeneration {
            dist_buf: BufferObj::create_empty_storage_buffer(
                device,
                cell_count * 9 * F32_BYTES,
                true,
                Some(label),
            ),
            macro_buf: BufferObj::create_empty_storage_buffer(
                device,
                cell_count * MACRO_CELL_BYTES,
                true,
                Some(label),
            ),
        }
    }
}

/// GPU-resident D2Q9 solver: two generations of buffers and one collide-stream pipeline with a
/// bind group per read direction (A→B, B→A).
pub struct D2Q9Node {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    pub lattice: wgpu::Extent3d,
    pub dispatch_group_count: (u32, u32, u32),
    pub lbm_uniform_buf: BufferObj,
    material_buf: BufferObj,
    generations: GenerationPair<GpuGeneration>,
    collide_stream_node: ComputeNode,
    shader: wgpu::ShaderModule,
}

impl D2Q9Node {
    pub fn new(
        context: &GpuContext, geometry: &ObstacleGeometry, inlet_u: f32,
    ) -> Result<Self, FlowError> {
        let device = &context.device;
        let shader =
            create_shader_module(device, "lbm/collide_stream", Some("collide_stream_shader"))?;
        let lbm_uniform_buf = BufferObj::create_uniform_buffer(
            device,
            &LbmUniform::new(geometry.nx, geometry.ny, &StepParams { omega: 1.0, inlet_u }),
            Some("lbm_uniform"),
        );
        let (lattice, dispatch_group_count, material_buf, generations, collide_stream_node) =
            Self::allocate(device, geometry, &lbm_uniform_buf, &shader);

        let mut node = D2Q9Node {
            device: context.device.clone(),
            queue: context.queue.clone(),
            lattice,
            dispatch_group_count,
            lbm_uniform_buf,
            material_buf,
            generations,
            collide_stream_node,
            shader,
        };
        node.upload_initial_state(geometry, inlet_u);
        Ok(node)
    }

    #[allow(clippy::type_complexity)]
    fn allocate(
        device: &wgpu::Device, geometry: &ObstacleGeometry, lbm_uniform_buf: &BufferObj,
        shader: &wgpu::ShaderModule,
    ) -> (
        wgpu::Extent3d,
        (u32, u32, u32),
        BufferObj,
        GenerationPair<GpuGeneration>,
        ComputeNode,
    ) {
        let lattice =
            wgpu::Extent3d { width: geometry.nx, height: geometry.ny, depth_or_array_layers: 1 };
        let dispatch_group_count = ((lattice.width + 15) / 16, (lattice.height + 15) / 16, 1);
        let cell_count = (lattice.width * lattice.height) as u64;

        let material_buf = BufferObj::create_storage_buffer(
            device,
            geometry.material_codes().as_slice(),
            false,
            Some("material_buf"),
        );
        let generations = GenerationPair::new(
            GpuGeneration::new(device, cell_count, "generation_a"),
            GpuGeneration::new(device, cell_count, "generation_b"),
        );
        let (a, b) = (generations.slot(0), generations.slot(1));
        let collide_stream_node = ComputeNode::new(
            device,
            dispatch_group_count,
            vec![lbm_uniform_buf],
            vec![
                vec![&material_buf, &a.dist_buf, &b.dist_buf, &b.macro_buf],
                vec![&material_buf, &b.dist_buf, &a.dist_buf, &a.macro_buf],
            ],
            shader,
        );
        (lattice, dispatch_group_count, material_buf, generations, collide_stream_node)
    }

    fn cell_count(&self) -> u64 {
        (self.lattice.width * self.lattice.height) as u64
    }

    fn upload_initial_state(&mut self, geometry: &ObstacleGeometry, inlet_u: f32) {
        let (dist, macro_cells) = kernel::equilibrium_state(geometry, inlet_u);
        self.queue.write_buffer(&self.material_buf.buffer, 0, geometry.material_codes().as_bytes());
        for i in 0..2 {
            let generation = self.generations.slot(i);
            self.queue.write_buffer(&generation.dist_buf.buffer, 0, dist.as_bytes());
            self.queue.write_buffer(&generation.macro_buf.buffer, 0, macro_cells.as_bytes());
        }
        self.generations.rewind();
        self.queue.submit(None);
        log::info!("lattice {}x{} initialized, inlet u = {}", geometry.nx, geometry.ny, inlet_u);
    }

    fn out_of_bounds(region: CellRect) -> FlowError {
        FlowError::RegionOutOfBounds {
            x: region.x,
            y: region.y,
            x_end: region.x + region.width,
            y_end: region.y + region.height,
        }
    }
}

impl FlowSolver for D2Q9Node {
    fn lattice_size(&self) -> (u32, u32) {
        (self.lattice.width, self.lattice.height)
    }

    fn initialize(&mut self, geometry: &ObstacleGeometry, inlet_u: f32) -> Result<(), FlowError> {
        if (geometry.nx, geometry.ny) != self.lattice_size() {
            let (lattice, dispatch_group_count, material_buf, generations, collide_stream_node) =
                Self::allocate(&self.device, geometry, &self.lbm_uniform_buf, &self.shader);
            self.lattice = lattice;
            self.dispatch_group_count = dispatch_group_count;
            self.material_buf = material_buf;
            self.generations = generations;
            self.collide_stream_node = collide_stream_node;
        }
        self.upload_initial_state(geometry, inlet_u);
        Ok(())
    }

    fn step(&mut self, params: &StepParams, substeps: u32) {
        let uniform = LbmUniform::new(self.lattice.width, self.lattice.height, params);
        self.queue.write_buffer(&self.lbm_uniform_buf.buffer, 0, uniform.as_bytes());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("d2q9 encoder") });
        {
            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("fluid solver"),
                timestamp_writes: None,
            });
            // consecutive dispatches are ordered: every write lands before the next pass reads
            for _ in 0..substeps {
                self.collide_stream_node
                    .dispatch_by_set(&mut cpass, self.generations.current_index());
                self.generations.advance();
            }
        }
        self.queue.submit(Some(encoder.finish()));
    }

    fn read_region(&self, region: CellRect) -> Result<MacroField, FlowError> {
        if !region.fits_in(self.lattice.width, self.lattice.height) {
            return Err(Self::out_of_bounds(region));
        }
        let row_bytes = region.width as u64 * MACRO_CELL_BYTES;
        let staging = BufferObj::create_read_back_buffer(
            &self.device,
            row_bytes * region.height as u64,
            Some("macro_read_back"),
        );

        let source = &self.generations.current().macro_buf.buffer;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("read back") });
        for row in 0..region.height {
            let src_offset =
                (region.x as u64 + (region.y + row) as u64 * self.lattice.width as u64)
                    * MACRO_CELL_BYTES;
            encoder.copy_buffer_to_buffer(
                source,
                src_offset,
                &staging.buffer,
                row as u64 * row_bytes,
                row_bytes,
            );
        }
        self.queue.submit(Some(encoder.finish()));

        let slice = staging.buffer.slice(..);
        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);
        pollster::block_on(rx.receive())
            .ok_or_else(|| FlowError::BufferMap("map callback dropped".to_string()))?
            .map_err(|e| FlowError::BufferMap(e.to_string()))?;

        let mut cells = vec![MacroCell::default(); region.cell_count()];
        {
            let data = slice.get_mapped_range();
            cells.as_bytes_mut().copy_from_slice(&data);
        }
        staging.buffer.unmap();
        Ok(MacroField::new(region, cells))
    }

    fn write_cell(&mut self, x: u32, y: u32, populations: [f32; 9]) -> Result<(), FlowError> {
        let region = CellRect::single(x, y);
        if !region.fits_in(self.lattice.width, self.lattice.height) {
            return Err(Self::out_of_bounds(region));
        }
        let n = self.cell_count();
        let i = (x + y * self.lattice.width) as u64;
        let generation = self.generations.current();
        for (k, value) in populations.iter().enumerate() {
            self.queue.write_buffer(
                &generation.dist_buf.buffer,
                (k as u64 * n + i) * F32_BYTES,
                value.as_bytes(),
            );
        }
        let cell = kernel::moments(&populations);
        self.queue.write_buffer(&generation.macro_buf.buffer, i * MACRO_CELL_BYTES, cell.as_bytes());
        self.queue.submit(None);
        Ok(())
    }
}
