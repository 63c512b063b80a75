//! Engine data structures: meshes, animation parameters and the depth buffer.
//!
//! - `mesh` holds the flat mesh representation and its validation
//! - `animation` holds the rotation increment, axis and freeze flag
//! - `depth` wraps the depth texture used for depth testing

pub mod animation;
pub mod depth;
pub mod mesh;
