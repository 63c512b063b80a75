//! Frame loop and application event loop.
//!
//! [`RenderLoop`] owns the per-frame state of the scene and drives one frame
//! per [`RenderLoop::tick`]. [`run`] wraps it in a winit application: every
//! `RedrawRequested` acquires a surface texture, ticks the loop and, as long
//! as the loop is still running, requests the next redraw.
//!
//! # Lifecycle
//!
//! Each tick performs, in this order:
//! 1. Read the freeze flag of the [`AnimationState`]
//! 2. Advance the model and normal matrices (skipped while frozen)
//! 3. Push model, view, projection and normal matrices to the program
//! 4. Clear colour and depth
//! 5. Enable depth testing
//! 6. Draw the indexed triangle list
//! 7. Schedule the next tick
//!
//! A tick that fails halts the loop: the error is returned once and every
//! later tick reports [`Tick::Stopped`] without touching the target.

use std::{cell::Cell, rc::Rc, sync::Arc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::{KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use crate::{
    config::SceneConfig,
    context::Context,
    data_structures::{animation::AnimationState, mesh::Mesh},
    error::RenderError,
    pipelines::uniforms::UniformStaging,
    render::FrameTarget,
    session::{RenderSession, Scene, ShaderSources},
    transform::{TransformPipeline, TransformUniforms},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// A frame was drawn and the next one should be requested.
    Scheduled,
    /// Nothing was drawn; the loop is stopped.
    Stopped,
}

/// Cancels a [`RenderLoop`]. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Rc<Cell<bool>>);

impl StopHandle {
    /// Idempotent: stopping a stopped loop does nothing.
    pub fn stop(&self) {
        if !self.0.replace(true) {
            log::info!("render loop stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.0.get()
    }
}

/// Everything that changes from frame to frame, independent of the GPU.
#[derive(Debug)]
pub struct RenderLoop {
    transforms: TransformPipeline,
    uniforms: TransformUniforms,
    staging: UniformStaging,
    index_count: u32,
    clear_colour: wgpu::Color,
    stop: StopHandle,
    frames: u64,
}

impl RenderLoop {
    /// `staging` must already hold the values set once at setup (the light).
    pub fn new(
        transforms: TransformPipeline,
        uniforms: TransformUniforms,
        staging: UniformStaging,
        index_count: u32,
        clear_colour: wgpu::Color,
    ) -> Self {
        Self {
            transforms,
            uniforms,
            staging,
            index_count,
            clear_colour,
            stop: StopHandle::default(),
            frames: 0,
        }
    }

    /// Run one frame against `target`.
    pub fn tick(
        &mut self,
        animation: &AnimationState,
        target: &mut impl FrameTarget,
    ) -> Result<Tick, RenderError> {
        if self.stop.is_stopped() {
            return Ok(Tick::Stopped);
        }
        match self.step(animation, target) {
            Ok(()) => {
                self.frames += 1;
                Ok(Tick::Scheduled)
            }
            Err(e) => {
                log::error!("halting render loop after {} frames: {e}", self.frames);
                self.stop.stop();
                Err(e)
            }
        }
    }

    fn step(&mut self, animation: &AnimationState, target: &mut impl FrameTarget) -> Result<(), RenderError> {
        self.transforms.advance_with(animation)?;
        self.uniforms.push(&mut self.staging, &self.transforms)?;
        target.write_uniforms(&mut self.staging)?;
        target.clear(self.clear_colour, 1.0);
        target.enable_depth_test();
        target.draw_indexed(self.index_count)
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    pub fn transforms(&self) -> &TransformPipeline {
        &self.transforms
    }

    pub fn staging(&self) -> &UniformStaging {
        &self.staging
    }

    /// Frames drawn so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Frame counter for periodic debug output.
#[derive(Debug)]
struct FrameStats {
    since: Instant,
    frames: u32,
}

impl FrameStats {
    const INTERVAL: Duration = Duration::from_secs(5);

    fn new() -> Self {
        Self {
            since: Instant::now(),
            frames: 0,
        }
    }

    fn record(&mut self) {
        self.frames += 1;
        let elapsed = self.since.elapsed();
        if elapsed >= Self::INTERVAL {
            log::debug!("{:.1} fps", self.frames as f64 / elapsed.as_secs_f64());
            self.since = Instant::now();
            self.frames = 0;
        }
    }
}

struct AppState {
    ctx: Context,
    session: RenderSession,
}

pub(crate) enum SessionEvent {
    #[allow(dead_code)]
    Initialized { ctx: Context, session: RenderSession },
    #[allow(dead_code)]
    Failed(anyhow::Error),
}

/// Prepare the scene on the CPU, then create the context and upload.
///
/// Mesh validation and shader linking run before any GPU object exists, so
/// a broken scene never reaches the device.
async fn initialize(
    window: Arc<Window>,
    config: SceneConfig,
    mesh: Mesh,
    shaders: ShaderSources,
) -> anyhow::Result<AppState> {
    let size = window.inner_size();
    let scene = Scene::prepare(&config, mesh, &shaders, size.width, size.height)?;
    let ctx = Context::new(window).await?;
    let session = scene.upload(&ctx.device, ctx.config.format).await?;
    Ok(AppState { ctx, session })
}

struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[allow(dead_code)]
    proxy: EventLoopProxy<SessionEvent>,
    config: SceneConfig,
    // taken by the first `resumed`
    pending: Option<(Mesh, ShaderSources)>,
    animation: AnimationState,
    state: Option<AppState>,
    stop: StopHandle,
    failure: Option<anyhow::Error>,
    stats: FrameStats,
}

impl App {
    fn new(
        event_loop: &EventLoop<SessionEvent>,
        config: SceneConfig,
        mesh: Mesh,
        shaders: ShaderSources,
        animation: AnimationState,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy: event_loop.create_proxy(),
            config,
            pending: Some((mesh, shaders)),
            animation,
            state: None,
            stop: StopHandle::default(),
            failure: None,
            stats: FrameStats::new(),
        })
    }

    fn initialized(&mut self, state: AppState) {
        self.stop = state.session.stop_handle();
        state.ctx.window.request_redraw();
        self.state = Some(state);
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("setup failed: {error:#}");
        self.failure = Some(error);
        event_loop.exit();
    }

    fn handle_key(&mut self, event: &KeyEvent) {
        if !event.state.is_pressed() || event.repeat {
            return;
        }
        match event.physical_key {
            PhysicalKey::Code(KeyCode::Space | KeyCode::KeyF) => {
                self.animation.toggle_freeze();
            }
            PhysicalKey::Code(KeyCode::Escape) => self.stop.stop(),
            _ => {}
        }
    }

    fn redraw(&mut self) {
        let Some(state) = &mut self.state else {
            return;
        };
        let frame = match state.ctx.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                state.ctx.reconfigure();
                state.ctx.window.request_redraw();
                return;
            }
            Err(e @ (wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other)) => {
                log::warn!("skipping frame: {e}");
                state.ctx.window.request_redraw();
                return;
            }
            Err(e @ wgpu::SurfaceError::OutOfMemory) => {
                log::error!("halting render loop: {}", RenderError::from(e));
                self.stop.stop();
                return;
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        match state.session.frame(
            &state.ctx.device,
            &state.ctx.queue,
            &view,
            &state.ctx.depth,
            &self.animation,
        ) {
            Ok(Tick::Scheduled) => {
                frame.present();
                self.stats.record();
                state.ctx.window.request_redraw();
            }
            Ok(Tick::Stopped) => {}
            // already logged and halted by the loop
            Err(_) => {}
        }
    }
}

impl ApplicationHandler<SessionEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some((mesh, shaders)) = self.pending.take() else {
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title(self.config.title.clone());

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;

            let canvas = wgpu::web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(&self.config.canvas_id))
                .map(|element| element.unchecked_into::<wgpu::web_sys::HtmlCanvasElement>());
            match canvas {
                Some(canvas) => window_attributes = window_attributes.with_canvas(Some(canvas)),
                None => {
                    let error = anyhow::anyhow!("no canvas element with id {:?}", self.config.canvas_id);
                    self.fail(event_loop, error);
                    return;
                }
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(event_loop, e.into());
                return;
            }
        };

        let init_future = initialize(window, self.config.clone(), mesh, shaders);

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok(state) => self.initialized(state),
                Err(e) => self.fail(event_loop, e),
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match init_future.await {
                    Ok(AppState { ctx, session }) => SessionEvent::Initialized { ctx, session },
                    Err(e) => SessionEvent::Failed(e),
                };
                if proxy.send_event(event).is_err() {
                    log::error!("event loop closed before setup finished");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: SessionEvent) {
        match event {
            SessionEvent::Initialized { ctx, session } => {
                self.initialized(AppState { ctx, session });
            }
            SessionEvent::Failed(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.stop.stop();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(state) = &mut self.state {
                    state.ctx.resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(&event),
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }
}

/// Open a window and spin the bundled cube until the window closes.
pub fn run(config: SceneConfig) -> anyhow::Result<()> {
    run_with(config, Mesh::cube(), ShaderSources::default())
}

/// Like [`run`] with a custom mesh and shader pair.
///
/// Setup errors (invalid mesh, shader compile or link failure, missing
/// uniform or attribute, no GPU context) are returned on native targets.
pub fn run_with(config: SceneConfig, mesh: Mesh, shaders: ShaderSources) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info)?;
    }

    let animation = config.rotation.animation()?;
    let event_loop: EventLoop<SessionEvent> = EventLoop::with_user_event().build()?;
    let app = App::new(&event_loop, config, mesh, shaders, animation)?;
    start(event_loop, app)
}

#[cfg(not(target_arch = "wasm32"))]
fn start(event_loop: EventLoop<SessionEvent>, mut app: App) -> anyhow::Result<()> {
    event_loop.run_app(&mut app)?;
    app.failure.map_or(Ok(()), Err)
}

/// The browser owns the event loop; setup errors surface in the console.
#[cfg(target_arch = "wasm32")]
fn start(event_loop: EventLoop<SessionEvent>, app: App) -> anyhow::Result<()> {
    use winit::platform::web::EventLoopExtWebSys;

    event_loop.spawn_app(app);
    Ok(())
}
