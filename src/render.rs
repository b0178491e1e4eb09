//! The backend seam between scene nodes and the GPU API.
//!
//! A node never talks to wgpu directly. It allocates its buffers through a
//! [`RenderBackend`] and describes each draw as a [`DrawPass`], which the
//! backend encodes, submits and reports back on through a completion handler.
//! The wgpu implementation lives in [`crate::context::Gpu`]; tests use a
//! recording backend that runs on the CPU.
//!
//! # Key types
//!
//! - [`RenderBackend`] is the trait a GPU backend implements
//! - [`DrawPass`] describes one single-draw render pass
//! - [`CompletionHandler`] is invoked once the GPU has finished the submitted work
//!

use std::ops::Range;

/// Callback run by the backend when the command buffer of a draw has completed on the GPU.
///
/// It may run on any thread and must be called at most once.
pub type CompletionHandler = Box<dyn FnOnce() + Send + 'static>;

/// The colour every node pass clears its target to.
pub const BACKGROUND_COLOUR: wgpu::Color = wgpu::Color::BLACK;

/// One render pass containing a single draw call.
pub struct DrawPass<'a, B: RenderBackend + ?Sized> {
    pub label: &'a str,
    pub pipeline: &'a B::Pipeline,
    pub clear_colour: wgpu::Color,
    pub cull_mode: Option<wgpu::Face>,
    /// Bound at vertex buffer slot 0.
    pub vertex_buffer: &'a B::Buffer,
    /// Bound at one vertex-stage and one fragment-stage binding.
    pub uniforms: &'a B::Region,
    pub material: Option<&'a B::Material>,
    pub vertices: Range<u32>,
    pub instances: Range<u32>,
    /// Whether the target should be presented once the frame is finished.
    pub present: bool,
}

pub trait RenderBackend {
    /// An immutable vertex buffer.
    type Buffer;
    /// One CPU-writable, GPU-readable uniform region of a frame ring.
    type Region;
    /// Texture and sampler bound next to the uniforms.
    type Material;
    /// A compiled render pipeline.
    type Pipeline;
    /// The drawable of the current frame.
    type Target;

    fn create_vertex_buffer(&self, label: &str, contents: &[u8]) -> anyhow::Result<Self::Buffer>;

    fn create_uniform_region(&self, label: &str, size: u64) -> anyhow::Result<Self::Region>;

    /// Copies `bytes` into `region` at `offset`. The region must not be in use by the GPU.
    fn write_region(&self, region: &Self::Region, offset: u64, bytes: &[u8]);

    /// Encodes and submits `pass` against `target`.
    ///
    /// `on_completed` must be invoked once the GPU has finished the submitted
    /// command buffer, never at submission time.
    fn submit(&self, pass: DrawPass<'_, Self>, target: &Self::Target, on_completed: CompletionHandler);
}
