//! The wgpu backend and the window context.
//!
//! [`Gpu`] implements [`RenderBackend`] on a wgpu device and queue. wgpu runs
//! queue completion callbacks only while the device is polled, so every `Gpu`
//! owns a [`DevicePoller`] thread; without it a render thread blocked on a full
//! frame ring would never be woken.

use std::{
    cell::Cell,
    iter,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
};

use anyhow::{Context as _, ensure};
use instant::Duration;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::Projection,
    config::RendererConfig,
    pipelines::{
        Material, NodePipeline, Pipelines, UNIFORM_FRAGMENT_BINDING, UNIFORM_GROUP,
        UNIFORM_VERTEX_BINDING, MATERIAL_GROUP, VERTEX_BUFFER_SLOT, basic::uniform_layout,
    },
    render::{CompletionHandler, DrawPass, RenderBackend},
};

/// One frame ring region: a storage buffer and the bind group exposing it to both stages.
#[derive(Debug)]
pub struct UniformRegion {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

/// Polls a device on a background thread until dropped.
#[derive(Debug)]
pub struct DevicePoller {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DevicePoller {
    pub fn spawn(device: wgpu::Device, interval: Duration) -> anyhow::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = thread::Builder::new()
            .name("trapeze-device-poller".to_string())
            .spawn({
                let stop = stop.clone();
                move || {
                    while !stop.load(Ordering::Acquire) {
                        if let Err(e) = device.poll(wgpu::PollType::Poll) {
                            log::warn!("device poll failed: {e}");
                        }
                        thread::sleep(interval);
                    }
                }
            })
            .context("spawning the device poller")?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }
}

impl Drop for DevicePoller {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::error!("device poller panicked");
        }
    }
}

/// The drawable of one frame: a swap-chain texture or an offscreen view.
///
/// The first pass encoded against a frame clears it, later passes load what
/// is already there, so several nodes can share one frame.
#[derive(Debug)]
pub struct Frame {
    surface_texture: Option<wgpu::SurfaceTexture>,
    view: wgpu::TextureView,
    cleared: Cell<bool>,
    present_requested: Cell<bool>,
}

impl Frame {
    pub fn from_surface(surface_texture: wgpu::SurfaceTexture) -> Self {
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            surface_texture: Some(surface_texture),
            view,
            cleared: Cell::new(false),
            present_requested: Cell::new(false),
        }
    }

    pub fn offscreen(view: wgpu::TextureView) -> Self {
        Self {
            surface_texture: None,
            view,
            cleared: Cell::new(false),
            present_requested: Cell::new(false),
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn is_cleared(&self) -> bool {
        self.cleared.get()
    }

    pub fn present_requested(&self) -> bool {
        self.present_requested.get()
    }

    fn load_op(&self, clear_colour: wgpu::Color) -> wgpu::LoadOp<wgpu::Color> {
        if self.cleared.replace(true) {
            wgpu::LoadOp::Load
        } else {
            wgpu::LoadOp::Clear(clear_colour)
        }
    }

    /// Presents the swap-chain texture if any pass asked for it.
    pub fn finish(self) {
        if let Some(surface_texture) = self.surface_texture
            && self.present_requested.get()
        {
            surface_texture.present();
        }
    }
}

/// Device and queue of the renderer, usable as a [`RenderBackend`].
#[derive(Debug)]
pub struct Gpu {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    uniform_layout: wgpu::BindGroupLayout,
    _poller: DevicePoller,
}

impl Gpu {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        poll_interval: Duration,
    ) -> anyhow::Result<Self> {
        let uniform_layout = uniform_layout(&device);
        let poller = DevicePoller::spawn(device.clone(), poll_interval)?;
        Ok(Self {
            device,
            queue,
            uniform_layout,
            _poller: poller,
        })
    }

    /// A device without any surface, for offscreen rendering.
    pub async fn headless(poll_interval: Duration) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable GPU adapter")?;
        let (device, queue) = request_device(&adapter).await?;
        Self::new(device, queue, poll_interval)
    }

    /// Runs `f` and turns validation and out-of-memory errors it raises into an `Err`.
    fn scoped<T>(&self, what: &str, f: impl FnOnce(&wgpu::Device) -> T) -> anyhow::Result<T> {
        let out_of_memory = self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let validation = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        let validation = futures::executor::block_on(validation.pop());
        let out_of_memory = futures::executor::block_on(out_of_memory.pop());
        match validation.or(out_of_memory) {
            Some(error) => Err(anyhow::anyhow!("{error}")).with_context(|| format!("creating {what}")),
            None => Ok(value),
        }
    }
}

impl RenderBackend for Gpu {
    type Buffer = wgpu::Buffer;
    type Region = UniformRegion;
    type Material = Material;
    type Pipeline = NodePipeline;
    type Target = Frame;

    fn create_vertex_buffer(&self, label: &str, contents: &[u8]) -> anyhow::Result<wgpu::Buffer> {
        ensure!(!contents.is_empty(), "vertex buffer {label} would be empty");
        self.scoped(label, |device| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::VERTEX,
            })
        })
    }

    fn create_uniform_region(&self, label: &str, size: u64) -> anyhow::Result<UniformRegion> {
        self.scoped(label, |device| {
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &self.uniform_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: UNIFORM_VERTEX_BINDING,
                        resource: buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: UNIFORM_FRAGMENT_BINDING,
                        resource: buffer.as_entire_binding(),
                    },
                ],
                label: Some(label),
            });
            UniformRegion { buffer, bind_group }
        })
    }

    fn write_region(&self, region: &UniformRegion, offset: u64, bytes: &[u8]) {
        self.queue.write_buffer(&region.buffer, offset, bytes);
    }

    fn submit(&self, pass: DrawPass<'_, Self>, target: &Frame, on_completed: CompletionHandler) {
        if pass.cull_mode != pass.pipeline.cull_mode {
            log::warn!(
                "pass {} wants culling {:?} but its pipeline culls {:?}",
                pass.label,
                pass.cull_mode,
                pass.pipeline.cull_mode
            );
        }
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Node Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(pass.label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.view(),
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: target.load_op(pass.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            render_pass.set_pipeline(&pass.pipeline.render_pipeline);
            render_pass.set_vertex_buffer(VERTEX_BUFFER_SLOT, pass.vertex_buffer.slice(..));
            render_pass.set_bind_group(UNIFORM_GROUP, &pass.uniforms.bind_group, &[]);
            if let Some(material) = pass.material {
                render_pass.set_bind_group(MATERIAL_GROUP, &material.bind_group, &[]);
            }
            render_pass.draw(pass.vertices, pass.instances);
        }
        if pass.present {
            target.present_requested.set(true);
        }
        self.queue.submit(iter::once(encoder.finish()));
        self.queue.on_submitted_work_done(on_completed);
    }
}

async fn request_device(adapter: &wgpu::Adapter) -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("trapeze device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            ..Default::default()
        })
        .await
        .context("requesting the GPU device")
}

/// Window, surface, GPU and pipelines of a running application.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub gpu: Gpu,
    pub config: wgpu::SurfaceConfiguration,
    pub pipelines: Pipelines,
    pub projection: Projection,
    pub settings: RendererConfig,
}

impl Context {
    pub async fn new(window: Arc<Window>, settings: RendererConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("creating the window surface")?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no GPU adapter can present to this window")?;
        log::info!("device and queue on {}", adapter.get_info().name);
        let (device, queue) = request_device(&adapter).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders output linear colour, so prefer an sRGB surface.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the surface supports no texture format")?;
        let present_mode = if surface_caps.present_modes.contains(&settings.present_mode) {
            settings.present_mode
        } else {
            surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo)
        };
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let pipelines = Pipelines::new(&device, config.format)?;
        let projection = Projection::new(
            config.width,
            config.height,
            settings.fovy,
            settings.znear,
            settings.zfar,
        );
        let gpu = Gpu::new(device, queue, settings.poll_interval)?;

        Ok(Self {
            window,
            surface,
            gpu,
            config,
            pipelines,
            projection,
            settings,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.config.width = width;
        self.config.height = height;
        self.projection.resize(width, height);
        self.surface.configure(&self.gpu.device, &self.config);
        true
    }

    /// The drawable of the next frame, or `None` when there is none this tick.
    ///
    /// Outdated and lost surfaces are reconfigured so the next call can succeed.
    pub fn next_frame(&mut self) -> Option<Frame> {
        match self.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(texture)
            | wgpu::CurrentSurfaceTexture::Suboptimal(texture) => Some(Frame::from_surface(texture)),
            wgpu::CurrentSurfaceTexture::Outdated | wgpu::CurrentSurfaceTexture::Lost => {
                self.surface.configure(&self.gpu.device, &self.config);
                None
            }
            wgpu::CurrentSurfaceTexture::Timeout
            | wgpu::CurrentSurfaceTexture::Occluded
            | wgpu::CurrentSurfaceTexture::Validation => None,
        }
    }
}
