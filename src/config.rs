use cgmath::Deg;
use instant::Duration;

use crate::frame_ring::DEFAULT_INFLIGHT_FRAMES;

/// Settings of the window, the surface and the frame pipelining.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    pub title: String,
    /// Uniform regions per node, i.e. how many frames the CPU may run ahead.
    pub inflight_frames: usize,
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
    /// How often the device is polled so completion handlers get to run.
    pub poll_interval: Duration,
    /// Used when the surface supports it, otherwise the first supported mode.
    pub present_mode: wgpu::PresentMode,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            title: "trapeze".to_string(),
            inflight_frames: DEFAULT_INFLIGHT_FRAMES,
            fovy: Deg(85.0),
            znear: 0.01,
            zfar: 100.0,
            poll_interval: Duration::from_millis(1),
            present_mode: wgpu::PresentMode::Fifo,
        }
    }
}
