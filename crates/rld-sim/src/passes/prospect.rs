use rld_core::constants::TEXEL_WORKGROUP;

/// Create the prospect compute pipeline (one invocation per texel).
pub fn create_prospect_pipeline(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    shader_source: &str,
) -> wgpu::ComputePipeline {
    super::create_compute_pipeline(device, bind_group_layout, shader_source, "rld-prospect")
}

/// Dispatch prospect over the full pixel grid.
pub fn dispatch_prospect(
    pass: &mut wgpu::ComputePass,
    pipeline: &wgpu::ComputePipeline,
    bind_group: &wgpu::BindGroup,
    tex_size: u32,
) {
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    let groups = tex_size.div_ceil(TEXEL_WORKGROUP);
    pass.dispatch_workgroups(groups, groups, 1);
}
