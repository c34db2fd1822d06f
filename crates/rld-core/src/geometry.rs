//! Procedural meshes for exercising the simulator.
//!
//! Wind flows along -Z, so chords run along Z (leading edge upwind at +Z)
//! and spans along X. All meshes are centered on the origin.

use glam::Vec3;

/// CPU-side triangle mesh: positions, per-vertex normals, and indices.
/// This is the contract the simulator's `Model` container is built from.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Flat rectangular plate in the XZ plane with normal +Y.
/// `width` runs along X, `depth` along Z.
pub fn plate(width: f32, depth: f32) -> MeshData {
    let hw = width * 0.5;
    let hd = depth * 0.5;
    MeshData {
        positions: vec![
            [-hw, 0.0, hd],
            [hw, 0.0, hd],
            [hw, 0.0, -hd],
            [-hw, 0.0, -hd],
        ],
        normals: vec![[0.0, 1.0, 0.0]; 4],
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

/// Unit square plate.
pub fn unit_plate() -> MeshData {
    plate(1.0, 1.0)
}

/// NACA 0012 thickness distribution with the closed-trailing-edge
/// quartic coefficient.
fn naca0012_half_thickness(x: f32) -> f32 {
    0.6 * (0.2969 * x.sqrt() - 0.1260 * x - 0.3516 * x * x + 0.2843 * x * x * x
        - 0.1036 * x * x * x * x)
}

fn naca0012_slope(x: f32) -> f32 {
    if x <= 0.0 {
        return 0.0;
    }
    0.6 * (0.2969 * 0.5 / x.sqrt() - 0.1260 - 2.0 * 0.3516 * x + 3.0 * 0.2843 * x * x
        - 4.0 * 0.1036 * x * x * x)
}

/// Straight NACA 0012 wing: chord along Z (leading edge at +chord/2),
/// span along X. `chord_segments` controls profile resolution; samples use
/// cosine spacing so the leading edge is well resolved.
pub fn naca0012(chord: f32, span: f32, chord_segments: u32) -> MeshData {
    let m = chord_segments.max(4) as usize;
    let hs = span * 0.5;

    let mut mesh = MeshData::default();

    // Upper then lower surface, each a quad strip between the two
    // span stations. Endpoint vertices are duplicated per surface so the
    // leading edge can carry its own upwind-facing normal.
    for side in [1.0f32, -1.0] {
        let base = mesh.positions.len() as u32;
        for k in 0..=m {
            let x = 0.5 * (1.0 - (std::f32::consts::PI * k as f32 / m as f32).cos());
            let y = side * naca0012_half_thickness(x) * chord;
            let z = (0.5 - x) * chord;

            let normal = if k == 0 {
                Vec3::Z
            } else {
                // Profile tangent in (z, y) is (-1, side * slope); the
                // outward normal points away from the chord line.
                Vec3::new(0.0, side, naca0012_slope(x)).normalize()
            };

            for station in [-hs, hs] {
                mesh.positions.push([station, y, z]);
                mesh.normals.push(normal.to_array());
            }
        }
        for k in 0..m as u32 {
            let a = base + 2 * k;
            let b = a + 1;
            let c = a + 2;
            let d = a + 3;
            mesh.indices.extend_from_slice(&[a, b, c, b, d, c]);
        }
    }

    mesh
}
