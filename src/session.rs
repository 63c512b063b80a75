//! Scene setup, split into a CPU half and a GPU half.
//!
//! [`Scene::prepare`] does everything that can fail on bad input: mesh
//! validation, shader compilation and linking, name lookups and the one-time
//! light upload into the staging area. Only a prepared scene can be turned
//! into a [`RenderSession`], so no GPU object is created for a scene that
//! would be rejected.

use crate::{
    config::SceneConfig,
    data_structures::{animation::AnimationState, depth::DepthBuffer, mesh::{Mesh, ValidMesh}},
    error::RenderError,
    flow::{RenderLoop, StopHandle, Tick},
    pipelines::{
        CUBE_FRAGMENT_SHADER, CUBE_VERTEX_SHADER,
        basic::GpuProgram,
        light::LightingState,
        program::{Attribute, ShaderProgram},
        uniforms::UniformStaging,
    },
    render::GpuTarget,
    resources::geometry::GeometryBuffers,
    transform::{TransformPipeline, TransformUniforms},
};

/// WGSL source of the two shader stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }
}

impl Default for ShaderSources {
    fn default() -> Self {
        Self::new(CUBE_VERTEX_SHADER, CUBE_FRAGMENT_SHADER)
    }
}

/// The vertex inputs the geometry buffers feed, in slot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshAttributes {
    pub position: Attribute,
    pub color: Attribute,
    pub normal: Attribute,
}

impl MeshAttributes {
    pub const POSITION: &'static str = "position";
    pub const COLOR: &'static str = "color";
    pub const NORMAL: &'static str = "normal";

    pub fn resolve(program: &ShaderProgram) -> Result<Self, RenderError> {
        Ok(Self {
            position: program.get_attribute(Self::POSITION)?,
            color: program.get_attribute(Self::COLOR)?,
            normal: program.get_attribute(Self::NORMAL)?,
        })
    }

    pub fn in_slot_order(&self) -> [Attribute; 3] {
        [self.position, self.color, self.normal]
    }
}

/// A validated mesh and linked program with all handles resolved.
#[derive(Debug)]
pub struct Scene {
    mesh: ValidMesh,
    program: ShaderProgram,
    attributes: MeshAttributes,
    render_loop: RenderLoop,
}

impl Scene {
    /// `width` and `height` fix the projection's aspect ratio for the session.
    pub fn prepare(
        config: &SceneConfig,
        mesh: Mesh,
        shaders: &ShaderSources,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let mesh = mesh.validate()?;
        let program = ShaderProgram::compile(&shaders.vertex, &shaders.fragment)?;
        let attributes = MeshAttributes::resolve(&program)?;
        let transform_uniforms = TransformUniforms::resolve(&program)?;
        let lighting = LightingState::resolve(&program)?;

        let mut staging = UniformStaging::new(&program);
        lighting.apply(&mut staging, &config.light)?;

        let transforms = TransformPipeline::initialize(
            &config.camera.camera(),
            &config.camera.projection(width, height),
        );
        let render_loop = RenderLoop::new(
            transforms,
            transform_uniforms,
            staging,
            mesh.index_count(),
            config.clear_colour,
        );
        log::info!(
            "scene ready: {} vertices, {} indices, program {:?}",
            mesh.vertex_count(),
            mesh.index_count(),
            program.id()
        );
        Ok(Self {
            mesh,
            program,
            attributes,
            render_loop,
        })
    }

    pub fn mesh(&self) -> &ValidMesh {
        &self.mesh
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    pub fn attributes(&self) -> &MeshAttributes {
        &self.attributes
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    pub fn render_loop_mut(&mut self) -> &mut RenderLoop {
        &mut self.render_loop
    }

    /// Create the geometry buffers and GPU program.
    ///
    /// Validation errors raised by the device while creating them are
    /// returned as [`RenderError::Link`] instead of reaching wgpu's
    /// uncaptured error handler.
    pub async fn upload(
        self,
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
    ) -> Result<RenderSession, RenderError> {
        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
        let geometry = GeometryBuffers::create(device, &self.mesh, "Cube");
        let program = GpuProgram::new(
            device,
            color_format,
            &self.program,
            &self.attributes.in_slot_order(),
        );
        if let Some(error) = scope.pop().await {
            return Err(RenderError::Link {
                diagnostic: format!("device rejected the program: {error}"),
            });
        }
        Ok(RenderSession {
            geometry,
            program,
            render_loop: self.render_loop,
        })
    }
}

/// A scene living on the GPU.
#[derive(Debug)]
pub struct RenderSession {
    geometry: GeometryBuffers,
    program: GpuProgram,
    render_loop: RenderLoop,
}

impl RenderSession {
    /// Tick the render loop once, drawing into `color`.
    pub fn frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color: &wgpu::TextureView,
        depth: &DepthBuffer,
        animation: &AnimationState,
    ) -> Result<Tick, RenderError> {
        let mut target = GpuTarget::new(device, queue, &self.program, &self.geometry, color, depth);
        self.render_loop.tick(animation, &mut target)
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    pub fn stop(&self) {
        self.render_loop.stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.render_loop.stop_handle()
    }
}
