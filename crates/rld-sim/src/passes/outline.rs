/// Create the outline compute pipeline (one invocation per geometry pixel).
pub fn create_outline_pipeline(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    shader_source: &str,
) -> wgpu::ComputePipeline {
    super::create_compute_pipeline(device, bind_group_layout, shader_source, "rld-outline")
}

/// Dispatch outline over the geometry pool; the geo count written by
/// prospect lives on the device, so the shader bounds itself.
pub fn dispatch_outline(
    pass: &mut wgpu::ComputePass,
    pipeline: &wgpu::ComputePipeline,
    bind_group: &wgpu::BindGroup,
    max_geo_pixels: u32,
) {
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.dispatch_workgroups(super::pool_workgroups(max_geo_pixels), 1, 1);
}
