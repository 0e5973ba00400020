use super::BufferObj;

/// A compute pipeline plus one bind group per buffer set.
///
/// Binding order inside each group: uniforms first, then storage buffers. Several storage sets
/// share one layout, which is how ping-pong passes swap their source and destination buffers.
pub struct ComputeNode {
    pub bind_groups: Vec<wgpu::BindGroup>,
    pub pipeline: wgpu::ComputePipeline,
    pub dispatch_group_count: (u32, u32, u32),
}

impl ComputeNode {
    pub fn new(
        device: &wgpu::Device, dispatch_group_count: (u32, u32, u32), uniforms: Vec<&BufferObj>,
        storage_sets: Vec<Vec<&BufferObj>>, shader_module: &wgpu::ShaderModule,
    ) -> Self {
        let storage_count = storage_sets.first().map(|set| set.len()).unwrap_or(0);
        debug_assert!(storage_sets.iter().all(|set| set.len() == storage_count));

        let mut layouts: Vec<wgpu::BindGroupLayoutEntry> = vec![];
        for i in 0..uniforms.len() {
            layouts.push(layout_entry(i as u32, wgpu::BufferBindingType::Uniform));
        }
        for i in 0..storage_count {
            layouts.push(layout_entry(
                (uniforms.len() + i) as u32,
                wgpu::BufferBindingType::Storage { read_only: false },
            ));
        }
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("compute node bind group layout"),
            entries: &layouts,
        });

        let bind_groups = storage_sets
            .iter()
            .map(|set| {
                let entries: Vec<wgpu::BindGroupEntry> = uniforms
                    .iter()
                    .chain(set.iter())
                    .enumerate()
                    .map(|(i, obj)| wgpu::BindGroupEntry {
                        binding: i as u32,
                        resource: obj.buffer.as_entire_binding(),
                    })
                    .collect();
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("compute node bind group"),
                    layout: &bind_group_layout,
                    entries: &entries,
                })
            })
            .collect();

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("compute node pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("compute node pipeline"),
            layout: Some(&pipeline_layout),
            module: shader_module,
            entry_point: "main",
            compilation_options: Default::default(),
            cache: None,
        });

        ComputeNode { bind_groups, pipeline, dispatch_group_count }
    }

    pub fn dispatch_by_set(&self, cpass: &mut wgpu::ComputePass, set_index: usize) {
        cpass.set_pipeline(&self.pipeline);
        cpass.set_bind_group(0, &self.bind_groups[set_index], &[]);
        cpass.dispatch_workgroups(
            self.dispatch_group_count.0,
            self.dispatch_group_count.1,
            self.dispatch_group_count.2,
        );
    }
}

fn layout_entry(binding: u32, ty: wgpu::BufferBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer { ty, has_dynamic_offset: false, min_binding_size: None },
        count: None,
    }
}
