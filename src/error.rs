//! Error types shared by setup and the frame loop.
//!
//! Everything that can go wrong while building the scene (mesh validation,
//! shader compilation and linking, name lookups) is fatal to initialization.
//! Only [`RenderError::SingularMatrix`] and [`RenderError::Surface`] can occur
//! once the loop is running.

use std::fmt;

use thiserror::Error;

/// The programmable stage a shader source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub(crate) fn to_naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }

    pub(crate) fn to_wgpu(self) -> wgpu::ShaderStages {
        match self {
            ShaderStage::Vertex => wgpu::ShaderStages::VERTEX,
            ShaderStage::Fragment => wgpu::ShaderStages::FRAGMENT,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Ways in which mesh data can be malformed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("{attribute} array holds {len} floats, which is not a whole number of 3-component vertices")]
    NotTriplets { attribute: &'static str, len: usize },
    #[error("parallel arrays differ in vertex count: {positions} positions, {colors} colors, {normals} normals")]
    LengthMismatch {
        positions: usize,
        colors: usize,
        normals: usize,
    },
    #[error("index {index} at position {position} is out of range for {vertices} vertices")]
    IndexOutOfRange {
        index: u16,
        position: usize,
        vertices: usize,
    },
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("invalid mesh: {0}")]
    Validation(#[from] MeshError),
    #[error("failed to compile {stage} shader: {diagnostic}")]
    Compile {
        stage: ShaderStage,
        diagnostic: String,
    },
    #[error("failed to link shader program: {diagnostic}")]
    Link { diagnostic: String },
    #[error("{kind} `{name}` is not present in the linked program")]
    NotFound { kind: &'static str, name: String },
    #[error("uniform `{name}` is declared as {found} but was requested as {expected}")]
    UniformType {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("uniform `{name}` was resolved from a different program")]
    ForeignHandle { name: String },
    #[error("model matrix is not invertible (determinant {determinant})")]
    SingularMatrix { determinant: f32 },
    #[error("rotation axis has zero length")]
    ZeroAxis,
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

impl RenderError {
    /// Whether the error stems from invalid static input and therefore has to
    /// abort initialization.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            RenderError::Validation(_)
                | RenderError::Compile { .. }
                | RenderError::Link { .. }
                | RenderError::NotFound { .. }
                | RenderError::UniformType { .. }
                | RenderError::ForeignHandle { .. }
                | RenderError::ZeroAxis
        )
    }
}
