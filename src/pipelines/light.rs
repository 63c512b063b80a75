use cgmath::Vector3;

use crate::{
    error::RenderError,
    pipelines::{
        program::ShaderProgram,
        uniforms::{Uniform, UniformStaging},
    },
};

/// A single point light, fixed for the whole session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub ambient_color: Vector3<f32>,
    pub diffuse_color: Vector3<f32>,
    pub position: Vector3<f32>,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            ambient_color: Vector3::new(0.5, 0.5, 0.5),
            diffuse_color: Vector3::new(0.8, 0.8, 0.8),
            position: Vector3::new(1.0, 1.0, -1.0),
        }
    }
}

/// The three light uniforms of a program, resolved once.
#[derive(Debug, Clone)]
pub struct LightingState {
    ambient_color: Uniform<Vector3<f32>>,
    diffuse_color: Uniform<Vector3<f32>>,
    position: Uniform<Vector3<f32>>,
}

impl LightingState {
    pub const AMBIENT_COLOR: &'static str = "ambient_color";
    pub const DIFFUSE_COLOR: &'static str = "diffuse_color";
    pub const POSITION: &'static str = "light_position";

    pub fn resolve(program: &ShaderProgram) -> Result<Self, RenderError> {
        Ok(Self {
            ambient_color: program.get_uniform(Self::AMBIENT_COLOR)?,
            diffuse_color: program.get_uniform(Self::DIFFUSE_COLOR)?,
            position: program.get_uniform(Self::POSITION)?,
        })
    }

    /// Write the light once, after the program is set up and before the first draw.
    pub fn apply(&self, uniforms: &mut UniformStaging, light: &Light) -> Result<(), RenderError> {
        uniforms.set(&self.ambient_color, &light.ambient_color)?;
        uniforms.set(&self.diffuse_color, &light.diffuse_color)?;
        uniforms.set(&self.position, &light.position)?;
        log::debug!("applied light {:?}", light);
        Ok(())
    }
}
