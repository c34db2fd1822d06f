/// Create the draw compute pipeline (one invocation per read-half parcel).
pub fn create_draw_pipeline(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    shader_source: &str,
) -> wgpu::ComputePipeline {
    super::create_compute_pipeline(device, bind_group_layout, shader_source, "rld-draw")
}

/// Dispatch draw over the parcel pool. The shader bounds itself against
/// the live count, which only the device knows once outline has spawned.
pub fn dispatch_draw(
    pass: &mut wgpu::ComputePass,
    pipeline: &wgpu::ComputePipeline,
    bind_group: &wgpu::BindGroup,
    max_air_pixels: u32,
) {
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.dispatch_workgroups(super::pool_workgroups(max_air_pixels), 1, 1);
}
