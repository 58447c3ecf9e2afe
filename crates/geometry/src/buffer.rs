//! Vertex buffers handed to the external renderer.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Interleaved position + normal, laid out for direct GPU upload.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct RenderVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl RenderVertex {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }
}

/// Triangle mesh snapshot for one body or mesh for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshBuffer {
    pub vertices: Vec<RenderVertex>,
    pub indices: Vec<u32>,
}

impl MeshBuffer {
    /// Zip positions and normals; the shorter slice bounds the vertex count.
    pub fn from_parts(positions: &[Vec3], normals: &[Vec3], indices: &[u32]) -> Self {
        Self {
            vertices: positions
                .iter()
                .zip(normals)
                .map(|(&p, &n)| RenderVertex::new(p, n))
                .collect(),
            indices: indices.to_vec(),
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Raw bytes of the vertex array.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_vertex_layout() {
        assert_eq!(std::mem::size_of::<RenderVertex>(), 24);
    }

    #[test]
    fn test_mesh_buffer_bytes() {
        let buffer = MeshBuffer::from_parts(&[Vec3::ZERO, Vec3::X], &[Vec3::Y, Vec3::Y], &[0, 1, 0]);
        assert_eq!(buffer.vertices.len(), 2);
        assert_eq!(buffer.triangle_count(), 1);
        assert_eq!(buffer.vertex_bytes().len(), 48);
        assert_eq!(buffer.vertices[1].position, [1.0, 0.0, 0.0]);
    }
}
