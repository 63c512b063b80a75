//! Scene configuration.
//!
//! [`SceneConfig::default`] reproduces the reference scene: a camera three
//! units in front of the origin with a 90° field of view, a grey ambient and
//! diffuse light above and behind the cube, and half a degree of rotation per
//! frame around the (1, 1, 1) diagonal.

use cgmath::{Deg, Point3, Rad, Vector3};

use crate::{
    camera::{Camera, Projection},
    data_structures::animation::{AnimationState, RotationAxis},
    error::RenderError,
    pipelines::light::Light,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: Point3::new(0.0, 0.0, 3.0),
            target: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::unit_y(),
            fovy: Deg(90.0),
            znear: 0.5,
            zfar: 10.0,
        }
    }
}

impl CameraConfig {
    pub fn camera(&self) -> Camera {
        Camera::new(self.eye, self.target, self.up)
    }

    /// The aspect ratio is taken from the surface size once and never updated.
    pub fn projection(&self, width: u32, height: u32) -> Projection {
        Projection::new(width, height, self.fovy, self.znear, self.zfar)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationConfig {
    /// Angle added every frame, independent of frame duration.
    pub per_frame: Deg<f32>,
    /// Any non-zero vector; only its direction matters.
    pub axis: Vector3<f32>,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            per_frame: Deg(0.5),
            axis: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl RotationConfig {
    pub fn animation(&self) -> Result<AnimationState, RenderError> {
        let axis = RotationAxis::new(self.axis)?;
        Ok(AnimationState::new(Rad::from(self.per_frame), axis))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    pub camera: CameraConfig,
    pub light: Light,
    pub rotation: RotationConfig,
    pub clear_colour: wgpu::Color,
    /// Id of the `<canvas>` element used on the web.
    pub canvas_id: String,
    pub title: String,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            light: Light::default(),
            rotation: RotationConfig::default(),
            clear_colour: wgpu::Color::BLACK,
            canvas_id: "myCanvas".to_string(),
            title: "lit-cube".to_string(),
        }
    }
}

impl SceneConfig {
    pub fn with_camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    pub fn with_light(mut self, light: Light) -> Self {
        self.light = light;
        self
    }

    pub fn with_rotation(mut self, rotation: RotationConfig) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_clear_colour(mut self, clear_colour: wgpu::Color) -> Self {
        self.clear_colour = clear_colour;
        self
    }

    pub fn with_canvas_id(mut self, canvas_id: impl Into<String>) -> Self {
        self.canvas_id = canvas_id.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}
