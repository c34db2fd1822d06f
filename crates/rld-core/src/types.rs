//! Plain-old-data mirrors of the GPU-side structs.
//!
//! Byte layout must match the WGSL declarations in `shaders/common/types.wgsl`
//! exactly; the size assertions in the tests below are the tripwire.

use bytemuck::{Pod, Zeroable};

/// One surface sample of the model at a raster cell of the current slice.
///
/// Written by the prospect pass, read by outline and move, discarded at
/// slice end.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GeoPixel {
    /// XY position in wind space.
    pub wind_pos: [f32; 2],
    /// Integer texel that produced this sample.
    pub tex_coord: [i32; 2],
    /// Wind-space surface normal (xyz) plus a spare flag channel (w).
    pub normal: [f32; 4],
}

/// One virtual air parcel.
///
/// `velocity.w` is a spare scalar carried through the pipeline; the stages
/// use it as a status channel (live / impacting / dead).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct AirPixel {
    /// XY position in wind space.
    pub wind_pos: [f32; 2],
    /// Most recent reaction force exchanged with geometry (XY).
    pub backforce: [f32; 2],
    /// Velocity (xyz) plus the status scalar (w).
    pub velocity: [f32; 4],
}

/// Per-parcel list of associated geometry pixel indices, capped at
/// `MAX_GEO_PER_AIR`. Valid for the current slice only.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct AirGeoMapElement {
    pub geo_count: u32,
    pub geo_indices: [u32; 3],
}

/// Uniform block uploaded once per slice. Scalar fields only, so the
/// std140 and WGSL uniform layouts coincide.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Constants {
    /// Ping-pong parity for this slice: parcels are written to half `swap`.
    pub swap: u32,
    pub max_geo_pixels: u32,
    pub max_air_pixels: u32,
    /// Grid edge N.
    pub screen_size: u32,
    /// Windframe width/height (the cross-section is square).
    pub windframe_size: f32,
    /// Depth of one slice.
    pub slice_size: f32,
    pub wind_speed: f32,
    /// Time to traverse one slice at wind speed. Zero when the wind is zero.
    pub dt: f32,
    /// Carried for downstream integrators; no consumer in the pipeline.
    pub moment_of_inertia: f32,
    /// Current slice index.
    pub slice: u32,
    /// Lower depth bound of the current slice.
    pub slice_z: f32,
    /// Nonzero enables the side-view and turbulence splats.
    pub debug: u32,
}

/// Device-resident accumulator block, atomically updated by the stages and
/// downloaded once per slice.
///
/// The force lanes are fixed-point: `i32` holding `f32 * FORCE_FIXED_SCALE`,
/// because WebGPU atomics are integer-only. Fourth lanes are padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Mutables {
    pub geo_count: u32,
    /// Live-ish parcel count per ping-pong half (may include dead holes
    /// until the next slice skips them).
    pub air_count: [u32; 2],
    pub _pad: u32,
    pub lift: [i32; 4],
    pub drag: [i32; 4],
    pub torque: [i32; 4],
}
