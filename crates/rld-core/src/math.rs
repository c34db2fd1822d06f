//! Wind-space / texel coordinate mappings and fixed-point force encoding.
//!
//! The WGSL stages implement the same mappings; keeping the CPU versions
//! here lets the tests pin the conventions down without a device.

use glam::{IVec2, Mat4, Vec2, Vec3};

use crate::constants::FORCE_FIXED_SCALE;

/// Center of a texel in wind space. Texel row 0 is the top of the
/// framebuffer, which is +Y in wind space.
pub fn texel_to_wind(texel: IVec2, tex_size: u32, windframe_size: f32) -> Vec2 {
    let n = tex_size as f32;
    Vec2::new(
        ((texel.x as f32 + 0.5) / n - 0.5) * windframe_size,
        (0.5 - (texel.y as f32 + 0.5) / n) * windframe_size,
    )
}

/// Texel containing a wind-space position. May be outside `[0, N)²` for
/// positions outside the windframe cross-section.
pub fn wind_to_texel(pos: Vec2, tex_size: u32, windframe_size: f32) -> IVec2 {
    let n = tex_size as f32;
    IVec2::new(
        ((pos.x / windframe_size + 0.5) * n).floor() as i32,
        ((0.5 - pos.y / windframe_size) * n).floor() as i32,
    )
}

/// Lower depth bound of slice `i`. Slices stack from `-depth/2` upward.
pub fn slice_z(slice: u32, windframe_depth: f32, slice_size: f32) -> f32 {
    windframe_depth * -0.5 + slice as f32 * slice_size
}

/// Orthographic projection clipping geometry to one slice's depth range.
///
/// The camera looks down -Z, so the near plane sits at the slice's upper
/// (upwind) depth bound and the far plane at its lower bound; the frontmost
/// fragment at a texel is the one facing the wind.
pub fn slice_projection(
    slice: u32,
    windframe_width: f32,
    windframe_depth: f32,
    slice_size: f32,
) -> Mat4 {
    let z_lo = slice_z(slice, windframe_depth, slice_size);
    let z_hi = z_lo + slice_size;
    let r = windframe_width * 0.5;
    Mat4::orthographic_rh(-r, r, -r, r, -z_hi, -z_lo)
}

/// Encode a force component into the fixed-point accumulator domain,
/// saturating instead of wrapping.
pub fn force_to_fixed(v: f32) -> i32 {
    let scaled = (v * FORCE_FIXED_SCALE).round();
    if scaled >= i32::MAX as f32 {
        i32::MAX
    } else if scaled <= i32::MIN as f32 {
        i32::MIN
    } else {
        scaled as i32
    }
}

/// Decode a fixed-point accumulator lane back to `f32`.
pub fn fixed_to_force(v: i32) -> f32 {
    v as f32 / FORCE_FIXED_SCALE
}

/// Decode the xyz lanes of a fixed-point accumulator.
pub fn fixed_to_vec3(lanes: [i32; 4]) -> Vec3 {
    Vec3::new(
        fixed_to_force(lanes[0]),
        fixed_to_force(lanes[1]),
        fixed_to_force(lanes[2]),
    )
}
