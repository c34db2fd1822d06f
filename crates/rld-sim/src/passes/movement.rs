/// Create the move compute pipeline (one invocation per write-half parcel).
pub fn create_move_pipeline(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    shader_source: &str,
) -> wgpu::ComputePipeline {
    super::create_compute_pipeline(device, bind_group_layout, shader_source, "rld-move")
}

/// Dispatch move over the parcel pool.
pub fn dispatch_move(
    pass: &mut wgpu::ComputePass,
    pipeline: &wgpu::ComputePipeline,
    bind_group: &wgpu::BindGroup,
    max_air_pixels: u32,
) {
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.dispatch_workgroups(super::pool_workgroups(max_air_pixels), 1, 1);
}
