//! Model, view, projection and normal matrices.
//!
//! [`TransformPipeline`] is created once with a fixed view and projection. Each
//! frame [`TransformPipeline::advance`] composes one more rotation step onto
//! the model matrix and re-derives the normal matrix from it. The two are
//! always committed together, so the normal matrix never lags behind the model.

use cgmath::{Matrix, Matrix3, Matrix4, Rad, SquareMatrix};

use crate::{
    camera::{Camera, Projection},
    data_structures::animation::{AnimationState, RotationAxis},
    error::RenderError,
    pipelines::{
        program::ShaderProgram,
        uniforms::{Uniform, UniformStaging},
    },
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformPipeline {
    model: Matrix4<f32>,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
    normal: Matrix3<f32>,
}

impl TransformPipeline {
    /// Compute view and projection once and start from an identity model.
    pub fn initialize(camera: &Camera, projection: &Projection) -> Self {
        Self {
            model: Matrix4::identity(),
            view: camera.calc_matrix(),
            projection: projection.calc_matrix(),
            normal: Matrix3::identity(),
        }
    }

    /// Start from an arbitrary model matrix instead of the identity.
    pub fn with_model(mut self, model: Matrix4<f32>) -> Result<Self, RenderError> {
        self.normal = normal_matrix(&model)?;
        self.model = model;
        Ok(self)
    }

    /// Rotate the model by `increment` around `axis` unless `frozen`.
    ///
    /// The rotation is post-multiplied (`model * R`), i.e. it happens in the
    /// object's local frame, and accumulates across calls. When frozen nothing
    /// is recomputed. On a singular result the previous state is kept and the
    /// error is returned.
    pub fn advance(
        &mut self,
        increment: Rad<f32>,
        axis: RotationAxis,
        frozen: bool,
    ) -> Result<(), RenderError> {
        if frozen {
            return Ok(());
        }
        let model = self.model * Matrix4::from_axis_angle(axis.unit(), increment);
        let normal = normal_matrix(&model)?;
        self.model = model;
        self.normal = normal;
        Ok(())
    }

    pub fn advance_with(&mut self, animation: &AnimationState) -> Result<(), RenderError> {
        self.advance(animation.increment(), animation.axis(), animation.is_frozen())
    }

    pub fn model(&self) -> Matrix4<f32> {
        self.model
    }

    pub fn view(&self) -> Matrix4<f32> {
        self.view
    }

    pub fn projection(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn normal_matrix(&self) -> Matrix3<f32> {
        self.normal
    }
}

/// The four matrix uniforms of a program, resolved once at setup.
#[derive(Debug, Clone)]
pub struct TransformUniforms {
    model: Uniform<Matrix4<f32>>,
    view: Uniform<Matrix4<f32>>,
    projection: Uniform<Matrix4<f32>>,
    normal: Uniform<Matrix3<f32>>,
}

impl TransformUniforms {
    pub const MODEL: &'static str = "model";
    pub const VIEW: &'static str = "view";
    pub const PROJECTION: &'static str = "projection";
    pub const NORMAL_MATRIX: &'static str = "normal_matrix";

    pub fn resolve(program: &ShaderProgram) -> Result<Self, RenderError> {
        Ok(Self {
            model: program.get_uniform(Self::MODEL)?,
            view: program.get_uniform(Self::VIEW)?,
            projection: program.get_uniform(Self::PROJECTION)?,
            normal: program.get_uniform(Self::NORMAL_MATRIX)?,
        })
    }

    /// Stage the current matrices of `transforms`.
    pub fn push(&self, uniforms: &mut UniformStaging, transforms: &TransformPipeline) -> Result<(), RenderError> {
        uniforms.set(&self.model, &transforms.model)?;
        uniforms.set(&self.view, &transforms.view)?;
        uniforms.set(&self.projection, &transforms.projection)?;
        uniforms.set(&self.normal, &transforms.normal)
    }
}

/// Inverse-transpose of the upper-left 3x3 block of `model`.
///
/// Correct for rotation, translation and non-uniform scale. A block that
/// cannot be inverted is reported instead of producing non-finite normals.
pub fn normal_matrix(model: &Matrix4<f32>) -> Result<Matrix3<f32>, RenderError> {
    let linear = Matrix3::from_cols(model.x.truncate(), model.y.truncate(), model.z.truncate());
    let determinant = linear.determinant();
    if determinant == 0.0 || !determinant.is_finite() {
        return Err(RenderError::SingularMatrix { determinant });
    }
    let inverse = linear
        .invert()
        .ok_or(RenderError::SingularMatrix { determinant })?;
    let normal = inverse.transpose();
    let cols: [[f32; 3]; 3] = normal.into();
    if cols.iter().flatten().any(|v| !v.is_finite()) {
        return Err(RenderError::SingularMatrix { determinant });
    }
    Ok(normal)
}
