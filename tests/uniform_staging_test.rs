mod common;

use cgmath::{Matrix3, Matrix4, Vector3};
use common::read_f32s;
use lit_cube::{
    RenderError,
    pipelines::{
        CUBE_FRAGMENT_SHADER, CUBE_VERTEX_SHADER,
        light::{Light, LightingState},
        program::ShaderProgram,
        uniforms::UniformStaging,
    },
};

fn bundled() -> ShaderProgram {
    ShaderProgram::compile(CUBE_VERTEX_SHADER, CUBE_FRAGMENT_SHADER).unwrap()
}

#[test]
fn should_size_staging_like_the_blocks() {
    let program = bundled();
    let staging = UniformStaging::new(&program);
    assert_eq!(staging.program(), program.id());
    assert_eq!(staging.block_bytes(0).len(), 240);
    assert_eq!(staging.block_bytes(1).len(), 48);
    assert!(!staging.is_dirty(0));
    assert!(!staging.is_dirty(1));
}

#[test]
fn should_pad_mat3_columns() {
    let program = bundled();
    let mut staging = UniformStaging::new(&program);
    let normal = program.get_uniform::<Matrix3<f32>>("normal_matrix").unwrap();
    #[rustfmt::skip]
    let value = Matrix3::new(
        1.0, 2.0, 3.0,
        4.0, 5.0, 6.0,
        7.0, 8.0, 9.0,
    );
    staging.set(&normal, &value).unwrap();

    let floats = read_f32s(staging.block_bytes(0), 192, 12);
    assert_eq!(
        floats,
        vec![1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0, 0.0, 7.0, 8.0, 9.0, 0.0]
    );
}

#[test]
fn should_write_mat4_column_major() {
    let program = bundled();
    let mut staging = UniformStaging::new(&program);
    let view = program.get_uniform::<Matrix4<f32>>("view").unwrap();
    let value = Matrix4::from_translation(Vector3::new(0.0, 0.0, -3.0));
    staging.set(&view, &value).unwrap();

    let floats = read_f32s(staging.block_bytes(0), 64, 16);
    assert_eq!(&floats[12..16], &[0.0, 0.0, -3.0, 1.0]);
    assert!(staging.is_dirty(0));
    assert!(!staging.is_dirty(1));
}

#[test]
fn should_reject_handle_from_other_program() {
    let first = bundled();
    let second = bundled();
    let mut staging = UniformStaging::new(&first);
    let foreign = second.get_uniform::<Matrix4<f32>>("model").unwrap();

    match staging.set(&foreign, &Matrix4::from_scale(2.0)) {
        Err(RenderError::ForeignHandle { name }) => assert_eq!(name, "model"),
        other => panic!("expected ForeignHandle, got {other:?}"),
    }
    assert!(!staging.is_dirty(0));
}

#[test]
fn should_flush_only_dirty_blocks_once() {
    let program = bundled();
    let mut staging = UniformStaging::new(&program);
    let lighting = LightingState::resolve(&program).unwrap();
    lighting.apply(&mut staging, &Light::default()).unwrap();

    let mut flushed = Vec::new();
    staging.flush(|block, bytes| flushed.push((block, bytes.len())));
    assert_eq!(flushed, vec![(1, 48)]);

    flushed.clear();
    staging.flush(|block, bytes| flushed.push((block, bytes.len())));
    assert!(flushed.is_empty());
}

#[test]
fn should_lay_out_light_like_the_fragment_stage() {
    let program = bundled();
    let mut staging = UniformStaging::new(&program);
    let light = Light {
        ambient_color: Vector3::new(0.1, 0.2, 0.3),
        diffuse_color: Vector3::new(0.4, 0.5, 0.6),
        position: Vector3::new(1.0, 1.0, -1.0),
    };
    LightingState::resolve(&program)
        .unwrap()
        .apply(&mut staging, &light)
        .unwrap();

    let bytes = staging.block_bytes(1);
    assert_eq!(read_f32s(bytes, 0, 3), vec![0.1, 0.2, 0.3]);
    assert_eq!(read_f32s(bytes, 16, 3), vec![0.4, 0.5, 0.6]);
    assert_eq!(read_f32s(bytes, 32, 3), vec![1.0, 1.0, -1.0]);
}

#[test]
fn should_fail_lighting_without_light_uniforms() {
    let vertex = r#"
@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position, 1.0);
}
"#;
    let fragment = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0);
}
"#;
    let program = ShaderProgram::compile(vertex, fragment).unwrap();
    assert!(matches!(
        LightingState::resolve(&program),
        Err(RenderError::NotFound { kind: "uniform", .. })
    ));
}
