//! GPU side of a linked [`ShaderProgram`].
//!
//! Turns the reflected interface into wgpu objects: one uniform buffer per
//! block, one bind group per group index, the shader modules and two render
//! pipeline variants (with and without depth testing).

use crate::{
    data_structures::depth::DepthBuffer,
    pipelines::{
        program::{Attribute, ProgramId, ShaderProgram},
        uniforms::UniformStaging,
    },
};

#[derive(Debug)]
pub struct GpuProgram {
    program: ProgramId,
    depth_tested: wgpu::RenderPipeline,
    unordered: wgpu::RenderPipeline,
    uniform_buffers: Vec<wgpu::Buffer>,
    bind_groups: Vec<wgpu::BindGroup>,
}

impl GpuProgram {
    /// Create the GPU objects for `program`.
    ///
    /// `attributes` lists the program's vertex inputs in vertex buffer slot
    /// order; each slot carries one tightly packed attribute.
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        program: &ShaderProgram,
        attributes: &[Attribute],
    ) -> Self {
        let blocks = program.uniform_blocks();
        let group_count = blocks.iter().map(|b| b.group + 1).max().unwrap_or(0);

        let uniform_buffers: Vec<wgpu::Buffer> = blocks
            .iter()
            .map(|block| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("{} Uniform Buffer", block.name)),
                    size: block.size,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();

        let layouts: Vec<wgpu::BindGroupLayout> = (0..group_count)
            .map(|group| {
                let entries: Vec<wgpu::BindGroupLayoutEntry> = blocks
                    .iter()
                    .filter(|block| block.group == group)
                    .map(|block| wgpu::BindGroupLayoutEntry {
                        binding: block.binding,
                        visibility: block.visibility,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: wgpu::BufferSize::new(block.size),
                        },
                        count: None,
                    })
                    .collect();
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(&format!("group_{group}_layout")),
                    entries: &entries,
                })
            })
            .collect();

        let bind_groups: Vec<wgpu::BindGroup> = layouts
            .iter()
            .enumerate()
            .map(|(group, layout)| {
                let entries: Vec<wgpu::BindGroupEntry> = blocks
                    .iter()
                    .zip(&uniform_buffers)
                    .filter(|(block, _)| block.group == group as u32)
                    .map(|(block, buffer)| wgpu::BindGroupEntry {
                        binding: block.binding,
                        resource: buffer.as_entire_binding(),
                    })
                    .collect();
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("group_{group}_bind_group")),
                    layout,
                    entries: &entries,
                })
            })
            .collect();

        let layout_refs: Vec<&wgpu::BindGroupLayout> = layouts.iter().collect();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Cube Pipeline Layout"),
            bind_group_layouts: &layout_refs,
            immediate_size: 0,
        });

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Cube Vertex Shader"),
            source: wgpu::ShaderSource::Wgsl(program.vertex().source().into()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Cube Fragment Shader"),
            source: wgpu::ShaderSource::Wgsl(program.fragment().source().into()),
        });

        let vertex_attributes: Vec<[wgpu::VertexAttribute; 1]> = attributes
            .iter()
            .map(|attribute| {
                [wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: attribute.location,
                    format: attribute.format,
                }]
            })
            .collect();
        let vertex_layouts: Vec<wgpu::VertexBufferLayout> = attributes
            .iter()
            .zip(&vertex_attributes)
            .map(|(attribute, slot)| wgpu::VertexBufferLayout {
                array_stride: attribute.format.size(),
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: slot,
            })
            .collect();

        let stages = Stages {
            vertex: &vertex_module,
            vertex_entry: program.vertex().entry_point(),
            fragment: &fragment_module,
            fragment_entry: program.fragment().entry_point(),
        };
        let depth_tested = mk_render_pipeline(
            device,
            &pipeline_layout,
            &stages,
            color_format,
            Some(DepthBuffer::FORMAT),
            &vertex_layouts,
        );
        let unordered = mk_render_pipeline(
            device,
            &pipeline_layout,
            &stages,
            color_format,
            None,
            &vertex_layouts,
        );

        Self {
            program: program.id(),
            depth_tested,
            unordered,
            uniform_buffers,
            bind_groups,
        }
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn pipeline(&self, depth_test: bool) -> &wgpu::RenderPipeline {
        if depth_test {
            &self.depth_tested
        } else {
            &self.unordered
        }
    }

    pub fn bind_groups(&self) -> &[wgpu::BindGroup] {
        &self.bind_groups
    }

    /// Copy every block changed since the last upload into its uniform buffer.
    pub fn upload(&self, queue: &wgpu::Queue, uniforms: &mut UniformStaging) {
        debug_assert_eq!(uniforms.program(), self.program);
        uniforms.flush(|block, bytes| {
            queue.write_buffer(&self.uniform_buffers[block], 0, bytes);
        });
    }
}

pub(crate) struct Stages<'a> {
    pub vertex: &'a wgpu::ShaderModule,
    pub vertex_entry: &'a str,
    pub fragment: &'a wgpu::ShaderModule,
    pub fragment_entry: &'a str,
}

pub(crate) fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    stages: &Stages<'_>,
    color_format: wgpu::TextureFormat,
    depth_format: Option<wgpu::TextureFormat>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(if depth_format.is_some() {
            "Depth Tested Render Pipeline"
        } else {
            "Render Pipeline"
        }),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: stages.vertex,
            entry_point: Some(stages.vertex_entry),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: stages.fragment,
            entry_point: Some(stages.fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // no face culling, same as the WebGL default
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
    })
}
