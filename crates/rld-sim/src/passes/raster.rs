use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4};

use crate::buffers::{PixelPools, COLOR_FORMAT, DEPTH_FORMAT, NORMAL_FORMAT};
use crate::model::Model;

/// Must match `FoilUniforms` in foil.wgsl. The normal matrix is widened to
/// 4x4 so the uniform layout has no vec3 padding pitfalls.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct FoilUniforms {
    proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    normal_mat: [[f32; 4]; 4],
}

/// Slice rasterization: renders the model twice per slice, wireframe then
/// filled, into the coverage and normal attachments. The wire pass keeps
/// thin triangles that fill-mode rasterization skips at slice boundaries
/// from dropping out.
pub struct FoilPass {
    pipeline_fill: wgpu::RenderPipeline,
    pipeline_wire: Option<wgpu::RenderPipeline>,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl FoilPass {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("rld-foil-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../../../shaders/foil.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rld-foil-uniforms"),
            size: std::mem::size_of::<FoilUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("rld-foil-bind-group-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("rld-foil-bind-group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("rld-foil-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let make_pipeline = |polygon_mode, label| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[
                        wgpu::VertexBufferLayout {
                            array_stride: 12,
                            step_mode: wgpu::VertexStepMode::Vertex,
                            attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                        },
                        wgpu::VertexBufferLayout {
                            array_stride: 12,
                            step_mode: wgpu::VertexStepMode::Vertex,
                            attributes: &wgpu::vertex_attr_array![1 => Float32x3],
                        },
                    ],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[
                        Some(wgpu::ColorTargetState {
                            format: COLOR_FORMAT,
                            blend: None,
                            write_mask: wgpu::ColorWrites::ALL,
                        }),
                        Some(wgpu::ColorTargetState {
                            format: NORMAL_FORMAT,
                            blend: None,
                            write_mask: wgpu::ColorWrites::ALL,
                        }),
                    ],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    polygon_mode,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let pipeline_fill = make_pipeline(wgpu::PolygonMode::Fill, "rld-foil-fill");
        let pipeline_wire = if device.features().contains(wgpu::Features::POLYGON_MODE_LINE) {
            Some(make_pipeline(wgpu::PolygonMode::Line, "rld-foil-wire"))
        } else {
            log::warn!(
                "POLYGON_MODE_LINE unavailable; thin slice edges may drop out of coverage"
            );
            None
        };

        Self {
            pipeline_fill,
            pipeline_wire,
            uniform_buffer,
            bind_group,
        }
    }

    pub fn upload(&self, queue: &wgpu::Queue, proj: Mat4, model_mat: Mat4, normal_mat: Mat3) {
        let uniforms = FoilUniforms {
            proj: proj.to_cols_array_2d(),
            model: model_mat.to_cols_array_2d(),
            normal_mat: Mat4::from_mat3(normal_mat).to_cols_array_2d(),
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, pools: &PixelPools, model: &Model) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("rld-foil-pass"),
            color_attachments: &[
                Some(wgpu::RenderPassColorAttachment {
                    view: pools.front_color_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: pools.front_normal_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                }),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: pools.depth_view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_bind_group(0, &self.bind_group, &[]);
        if let Some(wire) = &self.pipeline_wire {
            pass.set_pipeline(wire);
            model.draw(&mut pass);
        }
        pass.set_pipeline(&self.pipeline_fill);
        model.draw(&mut pass);
    }
}
