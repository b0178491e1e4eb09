//! Flow control and application event loop.
//!
//! A "flow" is the scene of the application: it owns its nodes, reacts to
//! window input, advances its animations and renders every frame. [`run`]
//! creates the window and the GPU [`Context`], builds the flow and then drives
//! it from winit's event loop.
//!
//! # Lifecycle Flow
//!
//! Each redraw follows this pattern:
//! 1. Measure the time elapsed since the previous redraw
//! 2. Call `on_update` with that delta
//! 3. Acquire the next swap-chain texture, skipping the frame if there is none
//! 4. Call `on_render` with the frame
//! 5. Present the frame

use std::sync::Arc;

use anyhow::Context as _;
use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    config::RendererConfig,
    context::{Context, Frame},
};

/// Trait for implementing a renderable scene.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once after construction; the context may be adjusted here
/// 2. `on_window_events()` is called for each winit window event
/// 3. `on_update()` is called every frame with the elapsed time
/// 4. `on_render()` is called every frame that has a drawable
pub trait SceneFlow {
    fn on_init(&mut self, ctx: &mut Context);

    fn on_window_events(&mut self, ctx: &Context, event: &WindowEvent);

    fn on_update(&mut self, ctx: &Context, dt: Duration);

    /// Draw into `frame`. Presentation happens after this returns.
    fn on_render(&mut self, ctx: &Context, frame: &Frame);
}

/// Builds the scene once the GPU context exists.
pub type SceneConstructor = Box<dyn FnOnce(&Context) -> anyhow::Result<Box<dyn SceneFlow>>>;

// Fields drop in order: the scene and its frame rings go before the device.
struct AppState {
    scene: Box<dyn SceneFlow>,
    ctx: Context,
    is_surface_configured: bool,
}

impl AppState {
    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.is_surface_configured = true;
        }
    }

    fn render(&mut self) {
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return;
        }
        let Some(frame) = self.ctx.next_frame() else {
            return;
        };
        self.scene.on_render(&self.ctx, &frame);
        frame.finish();
    }
}

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    settings: RendererConfig,
    constructor: Option<SceneConstructor>,
    state: Option<AppState>,
    last_time: Instant,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(settings: RendererConfig, constructor: SceneConstructor) -> anyhow::Result<Self> {
        let async_runtime =
            tokio::runtime::Runtime::new().context("starting the async runtime")?;
        Ok(Self {
            async_runtime,
            settings,
            constructor: Some(constructor),
            state: None,
            last_time: Instant::now(),
            error: None,
        })
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState> {
        let constructor = self
            .constructor
            .take()
            .context("the scene was already constructed")?;
        let window_attributes = Window::default_attributes().with_title(self.settings.title.clone());
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("creating the window")?,
        );
        let mut ctx = self
            .async_runtime
            .block_on(Context::new(window, self.settings.clone()))?;
        let mut scene = constructor(&ctx).context("building the scene")?;
        scene.on_init(&mut ctx);
        Ok(AppState {
            scene,
            ctx,
            is_surface_configured: false,
        })
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match self.init(event_loop) {
            Ok(state) => {
                let size = state.ctx.window.inner_size();
                let state = self.state.insert(state);
                state.resize(size.width, size.height);
                self.last_time = Instant::now();
            }
            Err(e) => {
                log::error!("App initialization failed: {e:#}");
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };
        state.scene.on_window_events(&state.ctx, &event);
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();
                state.scene.on_update(&state.ctx, dt);
                state.render();
            }
            _ => {}
        }
    }
}

/// Runs `constructor`'s scene with the default [`RendererConfig`].
pub fn run(constructor: SceneConstructor) -> anyhow::Result<()> {
    run_with_config(RendererConfig::default(), constructor)
}

/// Opens a window, builds the scene and drives it until the window is closed.
///
/// Setup failures are logged and returned.
pub fn run_with_config(
    settings: RendererConfig,
    constructor: SceneConstructor,
) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };
    let event_loop = EventLoop::new()?;
    let mut app = App::new(settings, constructor)?;
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
