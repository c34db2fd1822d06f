use rld_core::geometry::MeshData;
use wgpu::util::DeviceExt;

/// GPU-resident mesh the simulator rasterizes slice by slice: static
/// position and normal attributes plus a triangle index buffer. Any mesh
/// expressible as `MeshData` works.
pub struct Model {
    positions: wgpu::Buffer,
    normals: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

impl Model {
    pub fn from_mesh(device: &wgpu::Device, mesh: &MeshData) -> Self {
        let positions = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("rld-model-positions"),
            contents: bytemuck::cast_slice(&mesh.positions),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let normals = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("rld-model-normals"),
            contents: bytemuck::cast_slice(&mesh.normals),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("rld-model-indices"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            positions,
            normals,
            indices,
            index_count: mesh.indices.len() as u32,
        }
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub(crate) fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.positions.slice(..));
        pass.set_vertex_buffer(1, self.normals.slice(..));
        pass.set_index_buffer(self.indices.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}
