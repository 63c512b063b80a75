//! Shader programs and the render pipeline built from them.
//!
//! - `program`: WGSL compilation, linking and name reflection (CPU only)
//! - `uniforms`: typed uniform handles and CPU-side block staging
//! - `light`: the fixed light and its uniform upload
//! - `basic`: wgpu buffers, bind groups and render pipelines for a program

pub mod basic;
pub mod light;
pub mod program;
pub mod uniforms;

/// Bundled vertex stage: transforms positions and normals, passes colour through.
pub const CUBE_VERTEX_SHADER: &str = include_str!("cube.vert.wgsl");

/// Bundled fragment stage: ambient plus diffuse lighting with a 0.1 floor.
pub const CUBE_FRAGMENT_SHADER: &str = include_str!("cube.frag.wgsl");
