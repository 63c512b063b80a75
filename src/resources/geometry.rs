use wgpu::util::DeviceExt;

use crate::data_structures::mesh::ValidMesh;

/// Write-once GPU copies of a mesh: one buffer per vertex attribute plus the
/// `u16` index buffer.
#[derive(Debug)]
pub struct GeometryBuffers {
    pub positions: wgpu::Buffer,
    pub colors: wgpu::Buffer,
    pub normals: wgpu::Buffer,
    pub indices: wgpu::Buffer,
    vertex_count: u32,
    index_count: u32,
}

impl GeometryBuffers {
    /// Upload a validated mesh. There is no partial update or re-upload path.
    pub fn create(device: &wgpu::Device, mesh: &ValidMesh, label: &str) -> Self {
        let data = mesh.mesh();
        let vertex_buffer = |name: &str, contents: &[f32]| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} {name} Buffer")),
                contents: bytemuck::cast_slice(contents),
                usage: wgpu::BufferUsages::VERTEX,
            })
        };
        let positions = vertex_buffer("Position", &data.positions);
        let colors = vertex_buffer("Color", &data.colors);
        let normals = vertex_buffer("Normal", &data.normals);
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Index Buffer")),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        log::info!(
            "uploaded {label}: {} vertices, {} indices",
            mesh.vertex_count(),
            mesh.index_count()
        );
        Self {
            positions,
            colors,
            normals,
            indices,
            vertex_count: mesh.vertex_count() as u32,
            index_count: mesh.index_count(),
        }
    }

    /// Vertex buffers in slot order: position, color, normal.
    pub fn vertex_buffers(&self) -> [&wgpu::Buffer; 3] {
        [&self.positions, &self.colors, &self.normals]
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}
