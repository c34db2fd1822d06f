use std::mem::size_of;
use std::sync::mpsc;

use rld_core::constants::{max_air_pixels, max_geo_pixels};
use rld_core::error::RldError;
use rld_core::types::{AirGeoMapElement, AirPixel, Constants, GeoPixel, Mutables};

/// Coverage attachment and debug splat format.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Normal attachment. Signed-normal range fits a float16 channel exactly;
/// 16-bit snorm targets are not portably renderable under WebGPU.
pub const NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Device memory for one simulator: the bounded entity pools, the flag
/// grid, the per-slice accumulator block, and the framebuffer textures.
///
/// Everything is allocated once at setup; the per-slice traffic is the
/// small `Constants`/`Mutables` uploads and one `Mutables` readback.
pub struct PixelPools {
    tex_size: u32,
    max_geo: u32,
    max_air: u32,

    pub constants_buffer: wgpu::Buffer,
    pub mutables_buffer: wgpu::Buffer,
    mutables_staging: wgpu::Buffer,
    pub geo_buffer: wgpu::Buffer,
    /// Ping-pong parcel array: both halves in one buffer, indexed by the
    /// parity bit in `Constants.swap`.
    pub air_buffer: wgpu::Buffer,
    pub map_buffer: wgpu::Buffer,
    /// N*N spatial index: 0 = empty, otherwise 1 + parcel index.
    pub flag_buffer: wgpu::Buffer,

    front_color: wgpu::Texture,
    front_color_view: wgpu::TextureView,
    #[allow(dead_code)]
    front_normal: wgpu::Texture,
    front_normal_view: wgpu::TextureView,
    #[allow(dead_code)]
    depth: wgpu::Texture,
    depth_view: wgpu::TextureView,
    side: wgpu::Texture,
    side_view: wgpu::TextureView,
    turbulence: wgpu::Texture,
    turbulence_view: wgpu::TextureView,
}

impl PixelPools {
    pub fn new(device: &wgpu::Device, tex_size: u32) -> Self {
        let max_geo = max_geo_pixels(tex_size);
        let max_air = max_air_pixels(tex_size);

        let geo_bytes = max_geo as u64 * size_of::<GeoPixel>() as u64;
        let air_bytes = 2 * max_air as u64 * size_of::<AirPixel>() as u64;
        let map_bytes = max_air as u64 * size_of::<AirGeoMapElement>() as u64;
        let flag_bytes = tex_size as u64 * tex_size as u64 * 4;

        log::info!(
            "PixelPools: {}x{} grid, {} geo slots, {} air slots, {} KB device memory",
            tex_size,
            tex_size,
            max_geo,
            max_air,
            (geo_bytes + air_bytes + map_bytes + flag_bytes) / 1024,
        );

        let storage = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST;

        let constants_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rld-constants"),
            size: size_of::<Constants>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mutables_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rld-mutables"),
            size: size_of::<Mutables>() as u64,
            usage: storage | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let mutables_staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rld-mutables-staging"),
            size: size_of::<Mutables>() as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let geo_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rld-geo-pixels"),
            size: geo_bytes,
            usage: storage,
            mapped_at_creation: false,
        });

        let air_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rld-air-pixels"),
            size: air_bytes,
            usage: storage,
            mapped_at_creation: false,
        });

        let map_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rld-air-geo-map"),
            size: map_bytes,
            usage: storage | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let flag_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rld-flag-grid"),
            size: flag_bytes,
            usage: storage,
            mapped_at_creation: false,
        });

        let extent = wgpu::Extent3d {
            width: tex_size,
            height: tex_size,
            depth_or_array_layers: 1,
        };

        let attachment = |label, format, usage| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: extent,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage,
                view_formats: &[],
            })
        };

        let render_sampled =
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        let debug_usage = wgpu::TextureUsages::STORAGE_BINDING
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::RENDER_ATTACHMENT;

        let front_color = attachment("rld-front-color", COLOR_FORMAT, render_sampled);
        let front_normal = attachment("rld-front-normal", NORMAL_FORMAT, render_sampled);
        let depth = attachment(
            "rld-depth",
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        let side = attachment("rld-side-view", COLOR_FORMAT, debug_usage);
        let turbulence = attachment("rld-turbulence", COLOR_FORMAT, debug_usage);

        let front_color_view = front_color.create_view(&Default::default());
        let front_normal_view = front_normal.create_view(&Default::default());
        let depth_view = depth.create_view(&Default::default());
        let side_view = side.create_view(&Default::default());
        let turbulence_view = turbulence.create_view(&Default::default());

        Self {
            tex_size,
            max_geo,
            max_air,
            constants_buffer,
            mutables_buffer,
            mutables_staging,
            geo_buffer,
            air_buffer,
            map_buffer,
            flag_buffer,
            front_color,
            front_color_view,
            front_normal,
            front_normal_view,
            depth,
            depth_view,
            side,
            side_view,
            turbulence,
            turbulence_view,
        }
    }

    pub fn tex_size(&self) -> u32 {
        self.tex_size
    }

    pub fn max_geo_pixels(&self) -> u32 {
        self.max_geo
    }

    pub fn max_air_pixels(&self) -> u32 {
        self.max_air
    }

    pub fn front_color_view(&self) -> &wgpu::TextureView {
        &self.front_color_view
    }

    pub fn front_normal_view(&self) -> &wgpu::TextureView {
        &self.front_normal_view
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }

    pub fn side_view(&self) -> &wgpu::TextureView {
        &self.side_view
    }

    pub fn turbulence_view(&self) -> &wgpu::TextureView {
        &self.turbulence_view
    }

    pub fn front_texture(&self) -> &wgpu::Texture {
        &self.front_color
    }

    pub fn side_texture(&self) -> &wgpu::Texture {
        &self.side
    }

    pub fn turbulence_texture(&self) -> &wgpu::Texture {
        &self.turbulence
    }

    pub fn upload_constants(&self, queue: &wgpu::Queue, constants: &Constants) {
        queue.write_buffer(&self.constants_buffer, 0, bytemuck::bytes_of(constants));
    }

    pub fn upload_mutables(&self, queue: &wgpu::Queue, mutables: &Mutables) {
        queue.write_buffer(&self.mutables_buffer, 0, bytemuck::bytes_of(mutables));
    }

    /// Zero the flag grid. Issued between the prospect and draw stages.
    pub fn clear_flag_grid(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.clear_buffer(&self.flag_buffer, 0, None);
    }

    /// Clear a debug texture via an empty render pass; works without the
    /// optional clear-texture feature.
    pub fn clear_target(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("rld-clear-target"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
    }

    pub fn copy_mutables_to_staging(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.copy_buffer_to_buffer(
            &self.mutables_buffer,
            0,
            &self.mutables_staging,
            0,
            size_of::<Mutables>() as u64,
        );
    }

    /// Blocking readback of the full association map. Diagnostic path:
    /// allocates its own staging buffer and stalls the queue, so it has no
    /// place in the per-slice loop.
    pub fn read_air_geo_map(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<Vec<AirGeoMapElement>, RldError> {
        let map_bytes = self.max_air as u64 * size_of::<AirGeoMapElement>() as u64;
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("rld-air-geo-map-staging"),
            size: map_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("rld-air-geo-map-readback"),
        });
        encoder.copy_buffer_to_buffer(&self.map_buffer, 0, &staging, 0, map_bytes);
        queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);

        match rx.recv() {
            Ok(Ok(())) => {
                let data = slice.get_mapped_range();
                let map: Vec<AirGeoMapElement> = bytemuck::cast_slice(&data).to_vec();
                drop(data);
                staging.unmap();
                Ok(map)
            }
            Ok(Err(e)) => Err(RldError::ReadbackFailed(e.to_string())),
            Err(_) => Err(RldError::ReadbackFailed(
                "map_async callback dropped".to_string(),
            )),
        }
    }

    /// Blocking readback of the accumulator block. This is the single
    /// point per slice where the host waits on the device.
    pub fn read_mutables(&self, device: &wgpu::Device) -> Result<Mutables, RldError> {
        let slice = self.mutables_staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);

        match rx.recv() {
            Ok(Ok(())) => {
                let data = slice.get_mapped_range();
                let mutables = *bytemuck::from_bytes::<Mutables>(&data);
                drop(data);
                self.mutables_staging.unmap();
                Ok(mutables)
            }
            Ok(Err(e)) => Err(RldError::ReadbackFailed(e.to_string())),
            Err(_) => Err(RldError::ReadbackFailed(
                "map_async callback dropped".to_string(),
            )),
        }
    }
}
