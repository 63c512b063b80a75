#![allow(dead_code)]

use std::collections::BTreeMap;

use lit_cube::{
    RenderError, SceneConfig,
    data_structures::mesh::Mesh,
    pipelines::uniforms::UniformStaging,
    render::FrameTarget,
    session::{Scene, ShaderSources},
};

/// One command received by a [`RecordingTarget`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    /// Indices of the blocks that were dirty and got uploaded.
    WriteUniforms(Vec<usize>),
    Clear(wgpu::Color, f32),
    EnableDepthTest,
    DrawIndexed(u32),
}

/// A frame target that only remembers what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingTarget {
    pub calls: Vec<Call>,
    /// Last uploaded bytes per block.
    pub blocks: BTreeMap<usize, Vec<u8>>,
    pub fail_draw: bool,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_draw() -> Self {
        Self {
            fail_draw: true,
            ..Self::default()
        }
    }

    pub fn draws(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::DrawIndexed(_)))
            .count()
    }
}

impl FrameTarget for RecordingTarget {
    fn write_uniforms(&mut self, uniforms: &mut UniformStaging) -> Result<(), RenderError> {
        let mut written = Vec::new();
        uniforms.flush(|index, bytes| {
            written.push(index);
            self.blocks.insert(index, bytes.to_vec());
        });
        self.calls.push(Call::WriteUniforms(written));
        Ok(())
    }

    fn clear(&mut self, colour: wgpu::Color, depth: f32) {
        self.calls.push(Call::Clear(colour, depth));
    }

    fn enable_depth_test(&mut self) {
        self.calls.push(Call::EnableDepthTest);
    }

    fn draw_indexed(&mut self, index_count: u32) -> Result<(), RenderError> {
        if self.fail_draw {
            return Err(RenderError::Link {
                diagnostic: "draw rejected by test target".to_string(),
            });
        }
        self.calls.push(Call::DrawIndexed(index_count));
        Ok(())
    }
}

/// The default scene, prepared on the CPU only.
pub fn default_scene() -> Scene {
    scene_with(SceneConfig::default())
}

pub fn scene_with(config: SceneConfig) -> Scene {
    Scene::prepare(&config, Mesh::cube(), &ShaderSources::default(), 800, 600)
        .expect("the bundled scene prepares")
}

/// Read `count` floats starting at byte `offset`.
pub fn read_f32s(bytes: &[u8], offset: usize, count: usize) -> Vec<f32> {
    bytes[offset..offset + count * 4]
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

pub fn assert_close(actual: f32, expected: f32, eps: f32) {
    assert!(
        (actual - expected).abs() <= eps,
        "expected {expected}, got {actual} (tolerance {eps})"
    );
}

pub fn assert_matrix4_close(actual: cgmath::Matrix4<f32>, expected: cgmath::Matrix4<f32>, eps: f32) {
    let a: [[f32; 4]; 4] = actual.into();
    let e: [[f32; 4]; 4] = expected.into();
    for (col, (ac, ec)) in a.iter().zip(e.iter()).enumerate() {
        for (row, (av, ev)) in ac.iter().zip(ec.iter()).enumerate() {
            assert!(
                (av - ev).abs() <= eps,
                "element [{col}][{row}]: expected {ev}, got {av}\nactual: {actual:?}\nexpected: {expected:?}"
            );
        }
    }
}

pub fn assert_matrix3_close(actual: cgmath::Matrix3<f32>, expected: cgmath::Matrix3<f32>, eps: f32) {
    let a: [[f32; 3]; 3] = actual.into();
    let e: [[f32; 3]; 3] = expected.into();
    for (col, (ac, ec)) in a.iter().zip(e.iter()).enumerate() {
        for (row, (av, ev)) in ac.iter().zip(ec.iter()).enumerate() {
            assert!(
                (av - ev).abs() <= eps,
                "element [{col}][{row}]: expected {ev}, got {av}"
            );
        }
    }
}
