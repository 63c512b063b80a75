//! lit-cube
//!
//! A single coloured cube, lit by one fixed light and rotating a little every
//! frame, rendered with wgpu natively and through WebGL in the browser.
//!
//! Setup is strictly ordered and fails early: the mesh is validated, the WGSL
//! stages are compiled and linked, attribute and uniform names are resolved
//! into typed handles, the light is written once and the camera matrices are
//! computed. Only then are GPU resources created and the frame loop started.
//!
//! High-level modules
//! - `camera`: look-at camera and perspective projection
//! - `config`: scene configuration with the defaults of the reference scene
//! - `context`: window, surface, device and queue
//! - `data_structures`: mesh data, animation state, depth buffer
//! - `error`: the error type shared by setup and the frame loop
//! - `flow`: the render loop and the winit application around it
//! - `pipelines`: shader programs, uniform staging, light and render pipelines
//! - `render`: the per-frame command seam and its wgpu implementation
//! - `resources`: GPU buffers created from mesh data
//! - `session`: CPU setup and its GPU counterpart
//! - `transform`: model, view, projection and normal matrices
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod session;
pub mod transform;

pub use config::SceneConfig;
pub use error::{MeshError, RenderError, ShaderStage};
pub use flow::{run, run_with};

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use wgpu;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Browser entry point: renders into the `myCanvas` element.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    run(SceneConfig::default()).map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
