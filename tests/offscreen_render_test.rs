#![cfg(feature = "integration-tests")]

use std::time::Duration;

use cgmath::{Deg, Vector3};
use lit_cube::{
    SceneConfig,
    config::RotationConfig,
    data_structures::{depth::DepthBuffer, mesh::Mesh},
    flow::Tick,
    pipelines::light::Light,
    session::{Scene, ShaderSources},
};

const SIZE: u32 = 256;
const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

struct Gpu {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

async fn gpu() -> Gpu {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions::default())
        .await
        .expect("a GPU adapter is required for integration tests");
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor::default())
        .await
        .expect("failed to create device");
    Gpu { device, queue }
}

/// Render `frames` frames of the cube under `config` and read back the last one as RGBA8.
fn render(config: SceneConfig, frames: usize) -> Vec<u8> {
    render_mesh(config, Mesh::cube(), frames)
}

fn render_mesh(config: SceneConfig, mesh: Mesh, frames: usize) -> Vec<u8> {
    futures::executor::block_on(async {
        let Gpu { device, queue } = gpu().await;
        let scene = Scene::prepare(&config, mesh, &ShaderSources::default(), SIZE, SIZE)
            .expect("scene prepares");
        let mut session = scene.upload(&device, FORMAT).await.expect("device accepts the scene");
        let animation = config.rotation.animation().unwrap();

        let extent = wgpu::Extent3d {
            width: SIZE,
            height: SIZE,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Test Output Texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let depth = DepthBuffer::new(&device, [SIZE, SIZE], "test_depth_texture");

        for _ in 0..frames {
            let tick = session
                .frame(&device, &queue, &view, &depth, &animation)
                .expect("frame renders");
            assert_eq!(tick, Tick::Scheduled);
        }

        let bytes_per_row = 4 * SIZE;
        let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Offscreen Test Readback Buffer"),
            size: (bytes_per_row * SIZE) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(SIZE),
                },
            },
            extent,
        );
        queue.submit(std::iter::once(encoder.finish()));

        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        let slice = output_buffer.slice(..);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).unwrap();
        });
        device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: Some(Duration::from_secs(3)),
            })
            .unwrap();
        rx.receive().await.unwrap().unwrap();
        let pixels = slice.get_mapped_range().to_vec();
        output_buffer.unmap();
        pixels
    })
}

fn pixel(pixels: &[u8], x: u32, y: u32) -> [u8; 4] {
    let i = ((y * SIZE + x) * 4) as usize;
    [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
}

#[test]
fn should_draw_lit_cube_over_clear_colour() {
    let pixels = render(SceneConfig::default(), 1);

    for (x, y) in [(0, 0), (SIZE - 1, 0), (0, SIZE - 1), (SIZE - 1, SIZE - 1)] {
        assert_eq!(pixel(&pixels, x, y), [0, 0, 0, 255], "corner ({x}, {y})");
    }
    let centre = pixel(&pixels, SIZE / 2, SIZE / 2);
    assert!(
        centre[..3].iter().any(|&c| c > 0),
        "the cube covers the centre, got {centre:?}"
    );
}

#[test]
fn should_use_configured_clear_colour() {
    let pixels = render(SceneConfig::default().with_clear_colour(wgpu::Color::WHITE), 3);
    assert_eq!(pixel(&pixels, 0, 0), [255, 255, 255, 255]);
}

#[test]
fn should_clear_when_mesh_is_empty() {
    let red = wgpu::Color {
        r: 1.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    let pixels = render_mesh(SceneConfig::default().with_clear_colour(red), Mesh::default(), 2);
    assert_eq!(pixel(&pixels, 0, 0), [255, 0, 0, 255]);
    assert_eq!(pixel(&pixels, SIZE / 2, SIZE / 2), [255, 0, 0, 255]);
}

#[test]
fn should_light_face_with_the_interpolated_normal_as_is() {
    // a camera-facing quad whose normals are only half a unit long
    let quad = Mesh::new(
        vec![-0.5, -0.5, 0.0, 0.5, -0.5, 0.0, 0.5, 0.5, 0.0, -0.5, 0.5, 0.0],
        vec![1.0; 12],
        [0.0, 0.0, 0.5].repeat(4),
        vec![0, 1, 2, 0, 2, 3],
    );
    let light = Light {
        ambient_color: Vector3::new(0.2, 0.2, 0.2),
        diffuse_color: Vector3::new(0.8, 0.8, 0.8),
        position: Vector3::new(0.0, 0.0, 1000.0),
    };
    let config = SceneConfig::default().with_light(light).with_rotation(RotationConfig {
        per_frame: Deg(0.0),
        axis: Vector3::new(0.0, 0.0, 1.0),
    });

    let pixels = render_mesh(config, quad, 1);

    // ambient + diffuse * max(dot(n, l), 0.1) with |n| = 0.5 and l = +z
    let expected = ((0.2_f32 + 0.8 * 0.5) * 255.0).round() as i32;
    let centre = pixel(&pixels, SIZE / 2, SIZE / 2);
    for channel in &centre[..3] {
        assert!(
            (*channel as i32 - expected).abs() <= 2,
            "expected about {expected}, got {centre:?}"
        );
    }
    assert_eq!(centre[3], 255);
}
