//! trapeze
//!
//! A minimal real-time 3D renderer. A scene is a flat list of [`Node`]s, each
//! holding one mesh, a transform and a light, drawn once per frame through a
//! GPU command pipeline. The CPU prepares frame k+1 while the GPU still consumes
//! frame k: every node owns a small ring of uniform regions guarded by a
//! counting semaphore, so in-flight memory is never overwritten.
//!
//! High-level modules
//! - `camera`: projection matrix with the wgpu clip-space correction
//! - `config`: renderer settings handed to the application loop
//! - `context`: wgpu device/queue backend, frames and the window context
//! - `data_structures`: vertices, meshes, lights, uniform blocks, geometry and nodes
//! - `flow`: the winit application loop driving a [`flow::SceneFlow`]
//! - `frame_ring`: the ring of per-draw uniform regions and its permits
//! - `pipelines`: node render pipelines, shaders and materials
//! - `render`: the backend seam the node core is written against
//! - `resources`: asset loading (textures)
//!
//! [`Node`]: data_structures::node::Node

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod frame_ring;
pub mod pipelines;
pub mod render;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use wgpu;
pub use winit;
pub use winit::event::WindowEvent;
