//! Frame targets: where the per-frame commands of the render loop end up.
//!
//! The render loop speaks to a [`FrameTarget`] in a fixed order: upload
//! uniforms, clear, enable depth testing, draw. [`GpuTarget`] maps these onto
//! a single wgpu render pass: clears become load operations, depth testing
//! selects the depth-tested pipeline and attaches the depth buffer, and the
//! draw records and submits the pass.
//!
//! # Key types
//!
//! - [`FrameTarget`] is the seam between the loop and the GPU
//! - [`GpuTarget<'a>`] renders into any texture view (surface or offscreen)

use std::iter;

use crate::{
    data_structures::depth::DepthBuffer,
    error::RenderError,
    pipelines::{basic::GpuProgram, uniforms::UniformStaging},
    resources::geometry::GeometryBuffers,
};

pub trait FrameTarget {
    /// Make the staged uniform values visible to the next draw.
    fn write_uniforms(&mut self, uniforms: &mut UniformStaging) -> Result<(), RenderError>;

    /// Clear colour and depth before drawing.
    fn clear(&mut self, colour: wgpu::Color, depth: f32);

    fn enable_depth_test(&mut self);

    /// Draw `index_count` indices as a triangle list.
    fn draw_indexed(&mut self, index_count: u32) -> Result<(), RenderError>;
}

/// Renders one frame of a program and its geometry into `color`.
pub struct GpuTarget<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    program: &'a GpuProgram,
    geometry: &'a GeometryBuffers,
    color: &'a wgpu::TextureView,
    depth: &'a DepthBuffer,
    clear_colour: Option<wgpu::Color>,
    clear_depth: Option<f32>,
    depth_test: bool,
}

impl<'a> GpuTarget<'a> {
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        program: &'a GpuProgram,
        geometry: &'a GeometryBuffers,
        color: &'a wgpu::TextureView,
        depth: &'a DepthBuffer,
    ) -> Self {
        Self {
            device,
            queue,
            program,
            geometry,
            color,
            depth,
            clear_colour: None,
            clear_depth: None,
            depth_test: false,
        }
    }
}

impl FrameTarget for GpuTarget<'_> {
    fn write_uniforms(&mut self, uniforms: &mut UniformStaging) -> Result<(), RenderError> {
        if uniforms.program() != self.program.program() {
            return Err(RenderError::ForeignHandle {
                name: "<uniform staging>".to_string(),
            });
        }
        self.program.upload(self.queue, uniforms);
        Ok(())
    }

    fn clear(&mut self, colour: wgpu::Color, depth: f32) {
        self.clear_colour = Some(colour);
        self.clear_depth = Some(depth);
    }

    fn enable_depth_test(&mut self) {
        self.depth_test = true;
    }

    fn draw_indexed(&mut self, index_count: u32) -> Result<(), RenderError> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let depth_stencil_attachment = self.depth_test.then(|| {
                wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: self.clear_depth.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }
            });
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.color,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: self.clear_colour.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment,
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            // empty buffers cannot be bound; the pass still clears
            if index_count > 0 && self.geometry.vertex_count() > 0 {
                render_pass.set_pipeline(self.program.pipeline(self.depth_test));
                for (group, bind_group) in self.program.bind_groups().iter().enumerate() {
                    render_pass.set_bind_group(group as u32, bind_group, &[]);
                }
                for (slot, buffer) in self.geometry.vertex_buffers().into_iter().enumerate() {
                    render_pass.set_vertex_buffer(slot as u32, buffer.slice(..));
                }
                render_pass.set_index_buffer(self.geometry.indices.slice(..), wgpu::IndexFormat::Uint16);
                render_pass.draw_indexed(0..index_count, 0, 0..1);
            }
        }
        self.queue.submit(iter::once(encoder.finish()));
        Ok(())
    }
}
