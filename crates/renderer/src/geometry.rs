//! The scene: one coloured quad.

use std::sync::Arc;

use ash::vk;
use glam::Vec3;

use vkframe_rhi::RhiResult;
use vkframe_rhi::buffer::{Buffer, BufferUsage};
use vkframe_rhi::command::CommandBuffer;
use vkframe_rhi::device::Device;
use vkframe_rhi::vertex::ColorVertex;

/// Quad corners in clip space, clockwise on screen.
pub const QUAD_VERTICES: [ColorVertex; 4] = [
    ColorVertex::new(Vec3::new(-0.5, -0.5, 0.0), Vec3::new(1.0, 0.0, 0.0)),
    ColorVertex::new(Vec3::new(0.5, -0.5, 0.0), Vec3::new(0.0, 1.0, 0.0)),
    ColorVertex::new(Vec3::new(0.5, 0.5, 0.0), Vec3::new(0.0, 0.0, 1.0)),
    ColorVertex::new(Vec3::new(-0.5, 0.5, 0.0), Vec3::new(1.0, 1.0, 1.0)),
];

/// Two triangles sharing the 0-2 diagonal.
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// Vertex and index buffers for [`QUAD_VERTICES`] and [`QUAD_INDICES`].
///
/// The index buffer is declared first so it is released first.
pub struct QuadMesh {
    index_buffer: Buffer,
    vertex_buffer: Buffer,
    index_count: u32,
}

impl QuadMesh {
    /// Uploads the quad into host-visible buffers.
    ///
    /// # Errors
    ///
    /// Returns an error if buffer creation or upload fails.
    pub fn upload(device: &Arc<Device>) -> RhiResult<Self> {
        let vertex_buffer = Buffer::new_with_data(
            device.clone(),
            BufferUsage::Vertex,
            bytemuck::cast_slice(&QUAD_VERTICES),
        )?;
        let index_buffer = Buffer::new_with_data(
            device.clone(),
            BufferUsage::Index,
            bytemuck::cast_slice(&QUAD_INDICES),
        )?;

        Ok(Self {
            index_buffer,
            vertex_buffer,
            index_count: QUAD_INDICES.len() as u32,
        })
    }

    /// Binds both buffers and issues the indexed draw.
    pub fn draw(&self, cmd: &CommandBuffer) {
        cmd.bind_vertex_buffers(0, &[self.vertex_buffer.handle()], &[0]);
        cmd.bind_index_buffer(self.index_buffer.handle(), 0, vk::IndexType::UINT16);
        cmd.draw_indexed(self.index_count, 1, 0, 0, 0);
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_reference_vertices() {
        assert!(
            QUAD_INDICES
                .iter()
                .all(|&i| (i as usize) < QUAD_VERTICES.len())
        );
    }

    #[test]
    fn test_triangles_are_clockwise() {
        // With Vulkan's y-down clip space, a positive z cross product is
        // clockwise on screen, which the pipeline treats as front-facing.
        for tri in QUAD_INDICES.chunks(3) {
            let a = QUAD_VERTICES[tri[0] as usize].position;
            let b = QUAD_VERTICES[tri[1] as usize].position;
            let c = QUAD_VERTICES[tri[2] as usize].position;
            assert!((b - a).cross(c - a).z > 0.0);
        }
    }

    #[test]
    fn test_buffer_sizes() {
        assert_eq!(bytemuck::cast_slice::<_, u8>(&QUAD_VERTICES).len(), 96);
        assert_eq!(bytemuck::cast_slice::<_, u8>(&QUAD_INDICES).len(), 12);
    }
}
