use std::sync::Arc;

use bytemuck::Zeroable;
use glam::{Mat3, Mat4, Vec3};

use rld_core::constants::{
    DEFAULT_SLICE_COUNT, DEFAULT_TEX_SIZE, FORCE_FIXED_SCALE, MAX_GEO_PER_AIR, NORMAL_EPSILON,
    PARCEL_DEAD, PARCEL_IMPACT, PARCEL_LIVE, POOL_WORKGROUP, TEXEL_WORKGROUP,
};
use rld_core::error::RldError;
use rld_core::math::{fixed_to_vec3, slice_projection, slice_z};
use rld_core::types::{Constants, Mutables};

use crate::buffers::PixelPools;
use crate::model::Model;
use crate::passes::raster::FoilPass;
use crate::passes::{draw, movement, outline, prospect};

/// Setup-time configuration. The lift/drag coefficients are compiled into
/// the move shader, so changing them means building a new simulator.
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    /// Pixel grid edge N.
    pub tex_size: u32,
    /// Number of depth slices per sweep.
    pub slice_count: u32,
    /// Dimensionless scale on the cross-wind reaction components.
    pub lift_c: f32,
    /// Dimensionless scale on the along-wind reaction component.
    pub drag_c: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tex_size: DEFAULT_TEX_SIZE,
            slice_count: DEFAULT_SLICE_COUNT,
            lift_c: 1.0,
            drag_c: 1.0,
        }
    }
}

/// Per-sweep parameters, set before each sweep.
#[derive(Debug, Clone, Copy)]
pub struct SweepParams {
    /// Width and height of the windframe cross-section. Should enclose the
    /// model with some margin.
    pub windframe_width: f32,
    /// Depth of the windframe along the wind axis.
    pub windframe_depth: f32,
    /// Wind speed along -Z. Zero is allowed and produces zero forces.
    pub wind_speed: f32,
    /// Carried through to the constants block for downstream integrators;
    /// the pipeline itself does not consume it.
    pub moment_of_inertia: f32,
    /// Enables the side-view and turbulence splats. Force results are
    /// unaffected.
    pub debug: bool,
}

impl Default for SweepParams {
    fn default() -> Self {
        Self {
            windframe_width: 4.0,
            windframe_depth: 4.0,
            wind_speed: 1.0,
            moment_of_inertia: 1.0,
            debug: false,
        }
    }
}

struct SweepState {
    model: Arc<Model>,
    model_mat: Mat4,
    normal_mat: Mat3,
    params: SweepParams,
    slice_size: f32,
    dt: f32,
}

/// One lift/drag simulator: owns the device pools, the five pipeline
/// stages, and the host-side sweep bookkeeping. Several simulators can
/// coexist on one device.
pub struct Simulation {
    config: SimConfig,
    pools: PixelPools,
    foil: FoilPass,

    bind_group: wgpu::BindGroup,
    prospect_pipeline: wgpu::ComputePipeline,
    draw_pipeline: wgpu::ComputePipeline,
    outline_pipeline: wgpu::ComputePipeline,
    move_pipeline: wgpu::ComputePipeline,

    state: Option<SweepState>,
    current_slice: u32,
    swap: u32,
    mutables: Mutables,
    last_geo_count: u32,
    last_air_count: u32,

    sweep_lift: Vec3,
    sweep_drag: Vec3,
    sweep_torque: Vec3,
    slice_lifts: Vec<Vec3>,
    slice_drags: Vec<Vec3>,
    slice_torques: Vec<Vec3>,
}

impl Simulation {
    /// Build a simulator on the caller's device. Fails on nonsense
    /// configuration or devices too small for the pools.
    pub fn new(device: &wgpu::Device, config: SimConfig) -> Result<Self, RldError> {
        if config.tex_size < 16 {
            return Err(RldError::InvalidConfig(format!(
                "tex_size {} is below the 16 texel minimum",
                config.tex_size
            )));
        }
        if config.slice_count == 0 {
            return Err(RldError::InvalidConfig("slice_count must be nonzero".into()));
        }
        if !(config.lift_c.is_finite() && config.drag_c.is_finite()) {
            return Err(RldError::InvalidConfig(
                "lift_c and drag_c must be finite".into(),
            ));
        }

        let limits = device.limits();
        if limits.max_storage_buffers_per_shader_stage < 5 {
            return Err(RldError::LimitsTooSmall(format!(
                "need 5 storage buffers per stage, device allows {}",
                limits.max_storage_buffers_per_shader_stage
            )));
        }
        let flag_bytes = config.tex_size as u64 * config.tex_size as u64 * 4;
        if (limits.max_storage_buffer_binding_size as u64) < flag_bytes {
            return Err(RldError::LimitsTooSmall(format!(
                "flag grid needs {} bytes, device allows {}",
                flag_bytes, limits.max_storage_buffer_binding_size
            )));
        }

        let pools = PixelPools::new(device, config.tex_size);
        let foil = FoilPass::new(device);

        // Compose shader sources: shared constants preamble + common types
        // + stage body, so Rust and WGSL agree on every constant.
        let preamble = format!(
            "const MAX_GEO_PER_AIR: u32 = {}u;\n\
             const FORCE_FIXED_SCALE: f32 = {:.1};\n\
             const NORMAL_EPSILON: f32 = {:.6};\n\
             const PARCEL_LIVE: f32 = {:.1};\n\
             const PARCEL_IMPACT: f32 = {:.1};\n\
             const PARCEL_DEAD: f32 = {:.1};\n\
             const TEXEL_WORKGROUP: u32 = {}u;\n\
             const POOL_WORKGROUP: u32 = {}u;\n\
             const SLICE_COUNT: u32 = {}u;\n\
             const LIFT_C: f32 = {:.6};\n\
             const DRAG_C: f32 = {:.6};\n",
            MAX_GEO_PER_AIR,
            FORCE_FIXED_SCALE,
            NORMAL_EPSILON,
            PARCEL_LIVE,
            PARCEL_IMPACT,
            PARCEL_DEAD,
            TEXEL_WORKGROUP,
            POOL_WORKGROUP,
            config.slice_count,
            config.lift_c,
            config.drag_c,
        );
        let types_wgsl = include_str!("../../../shaders/common/types.wgsl");
        let prospect_wgsl = include_str!("../../../shaders/sim/prospect.wgsl");
        let draw_wgsl = include_str!("../../../shaders/sim/draw.wgsl");
        let outline_wgsl = include_str!("../../../shaders/sim/outline.wgsl");
        let move_wgsl = include_str!("../../../shaders/sim/move.wgsl");

        let prospect_source = format!("{preamble}\n{types_wgsl}\n{prospect_wgsl}");
        let draw_source = format!("{preamble}\n{types_wgsl}\n{draw_wgsl}");
        let outline_source = format!("{preamble}\n{types_wgsl}\n{outline_wgsl}");
        let move_source = format!("{preamble}\n{types_wgsl}\n{move_wgsl}");

        let bind_group_layout = Self::create_bind_group_layout(device);

        let prospect_pipeline =
            prospect::create_prospect_pipeline(device, &bind_group_layout, &prospect_source);
        let draw_pipeline = draw::create_draw_pipeline(device, &bind_group_layout, &draw_source);
        let outline_pipeline =
            outline::create_outline_pipeline(device, &bind_group_layout, &outline_source);
        let move_pipeline =
            movement::create_move_pipeline(device, &bind_group_layout, &move_source);

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("rld-sim-bind-group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: pools.constants_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: pools.mutables_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: pools.geo_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: pools.air_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: pools.map_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: pools.flag_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: wgpu::BindingResource::TextureView(pools.front_color_view()),
                },
                wgpu::BindGroupEntry {
                    binding: 7,
                    resource: wgpu::BindingResource::TextureView(pools.front_normal_view()),
                },
                wgpu::BindGroupEntry {
                    binding: 8,
                    resource: wgpu::BindingResource::TextureView(pools.side_view()),
                },
                wgpu::BindGroupEntry {
                    binding: 9,
                    resource: wgpu::BindingResource::TextureView(pools.turbulence_view()),
                },
            ],
        });

        log::info!(
            "Simulation: N={}, {} slices, liftC={}, dragC={}",
            config.tex_size,
            config.slice_count,
            config.lift_c,
            config.drag_c,
        );

        Ok(Self {
            config,
            pools,
            foil,
            bind_group,
            prospect_pipeline,
            draw_pipeline,
            outline_pipeline,
            move_pipeline,
            state: None,
            current_slice: 0,
            swap: 0,
            mutables: Mutables::zeroed(),
            last_geo_count: 0,
            last_air_count: 0,
            sweep_lift: Vec3::ZERO,
            sweep_drag: Vec3::ZERO,
            sweep_torque: Vec3::ZERO,
            slice_lifts: Vec::new(),
            slice_drags: Vec::new(),
            slice_torques: Vec::new(),
        })
    }

    fn create_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        let storage_rw = wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: None,
        };
        let sampled = wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        };
        let splat_target = wgpu::BindingType::StorageTexture {
            access: wgpu::StorageTextureAccess::WriteOnly,
            format: crate::buffers::COLOR_FORMAT,
            view_dimension: wgpu::TextureViewDimension::D2,
        };
        let entry = |binding, ty| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty,
            count: None,
        };

        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("rld-sim-bind-group-layout"),
            entries: &[
                // binding 0: constants
                entry(
                    0,
                    wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                ),
                // binding 1: mutables
                entry(1, storage_rw),
                // binding 2: geo pixels
                entry(2, storage_rw),
                // binding 3: air pixels (both ping-pong halves)
                entry(3, storage_rw),
                // binding 4: air-geo map
                entry(4, storage_rw),
                // binding 5: flag grid
                entry(5, storage_rw),
                // binding 6: front color, binding 7: front normal
                entry(6, sampled),
                entry(7, sampled),
                // binding 8: side view, binding 9: turbulence
                entry(8, splat_target),
                entry(9, splat_target),
            ],
        })
    }

    /// Set the model and sweep parameters. Call before each sweep; resets
    /// the slice cursor.
    pub fn set(
        &mut self,
        model: Arc<Model>,
        model_mat: Mat4,
        normal_mat: Mat3,
        params: SweepParams,
    ) {
        let slice_size = params.windframe_depth / self.config.slice_count as f32;
        let dt = if params.wind_speed > 0.0 {
            slice_size / params.wind_speed
        } else {
            0.0
        };
        self.state = Some(SweepState {
            model,
            model_mat,
            normal_mat,
            params,
            slice_size,
            dt,
        });
        self.current_slice = 0;
    }

    /// Run one slice. Returns `Ok(true)` when the slice just executed was
    /// the last of the sweep; the cursor then wraps so the next call
    /// starts a fresh sweep.
    pub fn step(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<bool, RldError> {
        let (model, model_mat, normal_mat, params, slice_size, dt) = {
            let s = self.state.as_ref().ok_or(RldError::NotConfigured)?;
            (
                s.model.clone(),
                s.model_mat,
                s.normal_mat,
                s.params,
                s.slice_size,
                s.dt,
            )
        };

        let first = self.current_slice == 0;
        if first {
            self.mutables = Mutables::zeroed();
            self.sweep_lift = Vec3::ZERO;
            self.sweep_drag = Vec3::ZERO;
            self.sweep_torque = Vec3::ZERO;
            self.slice_lifts.clear();
            self.slice_drags.clear();
            self.slice_torques.clear();
            // First toggle below lands on parity 0.
            self.swap = 1;
        }
        self.swap = 1 - self.swap;

        let constants = Constants {
            swap: self.swap,
            max_geo_pixels: self.pools.max_geo_pixels(),
            max_air_pixels: self.pools.max_air_pixels(),
            screen_size: self.config.tex_size,
            windframe_size: params.windframe_width,
            slice_size,
            wind_speed: params.wind_speed,
            dt,
            moment_of_inertia: params.moment_of_inertia,
            slice: self.current_slice,
            slice_z: slice_z(self.current_slice, params.windframe_depth, slice_size),
            debug: params.debug as u32,
        };

        // Fresh slice-local accumulators; the read-half parcel count from
        // the previous slice rides along untouched.
        self.mutables.geo_count = 0;
        self.mutables.air_count[self.swap as usize] = 0;
        self.mutables.lift = [0; 4];
        self.mutables.drag = [0; 4];
        self.mutables.torque = [0; 4];

        self.pools.upload_constants(queue, &constants);
        self.pools.upload_mutables(queue, &self.mutables);

        let proj = slice_projection(
            self.current_slice,
            params.windframe_width,
            params.windframe_depth,
            slice_size,
        );
        self.foil.upload(queue, proj, model_mat, normal_mat);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("rld-slice-encoder"),
        });

        if first && params.debug {
            self.pools.clear_target(&mut encoder, self.pools.side_view());
        }

        self.foil.encode(&mut encoder, &self.pools, &model);

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("rld-prospect-pass"),
                timestamp_writes: None,
            });
            prospect::dispatch_prospect(
                &mut pass,
                &self.prospect_pipeline,
                &self.bind_group,
                self.config.tex_size,
            );
        }

        self.pools.clear_flag_grid(&mut encoder);
        if params.debug {
            self.pools
                .clear_target(&mut encoder, self.pools.turbulence_view());
        }

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("rld-draw-pass"),
                timestamp_writes: None,
            });
            draw::dispatch_draw(
                &mut pass,
                &self.draw_pipeline,
                &self.bind_group,
                self.pools.max_air_pixels(),
            );
        }
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("rld-outline-pass"),
                timestamp_writes: None,
            });
            outline::dispatch_outline(
                &mut pass,
                &self.outline_pipeline,
                &self.bind_group,
                self.pools.max_geo_pixels(),
            );
        }
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("rld-move-pass"),
                timestamp_writes: None,
            });
            movement::dispatch_move(
                &mut pass,
                &self.move_pipeline,
                &self.bind_group,
                self.pools.max_air_pixels(),
            );
        }

        self.pools.copy_mutables_to_staging(&mut encoder);
        queue.submit(std::iter::once(encoder.finish()));

        self.mutables = self.pools.read_mutables(device)?;
        self.last_geo_count = self.mutables.geo_count.min(self.pools.max_geo_pixels());
        self.last_air_count = self.mutables.air_count[self.swap as usize]
            .min(self.pools.max_air_pixels());

        let lift = fixed_to_vec3(self.mutables.lift);
        let drag = fixed_to_vec3(self.mutables.drag);
        let torque = fixed_to_vec3(self.mutables.torque);
        self.sweep_lift += lift;
        self.sweep_drag += drag;
        self.sweep_torque += torque;
        self.slice_lifts.push(lift);
        self.slice_drags.push(drag);
        self.slice_torques.push(torque);

        self.current_slice += 1;
        if self.current_slice >= self.config.slice_count {
            self.current_slice = 0;
            return Ok(true);
        }
        Ok(false)
    }

    /// Run slices until the sweep completes.
    pub fn sweep(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<(), RldError> {
        while !self.step(device, queue)? {}
        Ok(())
    }

    /// Index of the slice the next `step` will execute.
    pub fn slice(&self) -> u32 {
        self.current_slice
    }

    pub fn slice_count(&self) -> u32 {
        self.config.slice_count
    }

    /// Ping-pong parity of the most recent slice.
    pub fn parity(&self) -> u32 {
        self.swap
    }

    /// Clamped (geo, air) pool occupancy of the most recent slice.
    pub fn slice_counts(&self) -> (u32, u32) {
        (self.last_geo_count, self.last_air_count)
    }

    /// Diagnostic readback of the most recent slice's parcel-geometry
    /// association map. Blocks on the device; meant for inspection and
    /// tests, not the sweep loop.
    pub fn read_associations(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<Vec<rld_core::types::AirGeoMapElement>, RldError> {
        self.pools.read_air_geo_map(device, queue)
    }

    pub fn lift(&self) -> Vec3 {
        self.sweep_lift
    }

    pub fn lifts(&self) -> &[Vec3] {
        &self.slice_lifts
    }

    pub fn drag(&self) -> Vec3 {
        self.sweep_drag
    }

    pub fn drags(&self) -> &[Vec3] {
        &self.slice_drags
    }

    pub fn torque(&self) -> Vec3 {
        self.sweep_torque
    }

    pub fn torques(&self) -> &[Vec3] {
        &self.slice_torques
    }

    pub fn front_tex(&self) -> &wgpu::TextureView {
        self.pools.front_color_view()
    }

    pub fn side_tex(&self) -> &wgpu::TextureView {
        self.pools.side_view()
    }

    pub fn turbulence_tex(&self) -> &wgpu::TextureView {
        self.pools.turbulence_view()
    }

    pub fn front_texture(&self) -> &wgpu::Texture {
        self.pools.front_texture()
    }

    pub fn tex_size(&self) -> u32 {
        self.pools.tex_size()
    }
}
