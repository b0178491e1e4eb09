use cgmath::Matrix4;

use super::light::Light;

/// The per-draw block stored in one ring region.
///
/// `[0, 64)` model-view, `[64, 128)` projection, `[128, 168)` light. Matrices
/// are column-major.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct UniformBlock {
    pub model_view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub light: Light,
}

impl UniformBlock {
    pub const SIZE: usize = std::mem::size_of::<Self>();
    pub const MODEL_VIEW_OFFSET: u64 = 0;
    pub const PROJECTION_OFFSET: u64 = 64;
    pub const LIGHT_OFFSET: u64 = 128;

    pub fn new(model_view: Matrix4<f32>, projection: Matrix4<f32>, light: Light) -> Self {
        Self {
            model_view: model_view.into(),
            projection: projection.into(),
            light,
        }
    }

    /// Reads a block back from region bytes. `None` if the slice is not 168 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        bytemuck::try_pod_read_unaligned(bytes).ok()
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

const _: () = assert!(UniformBlock::SIZE == 168);
const _: () = assert!(UniformBlock::LIGHT_OFFSET as usize + Light::SIZE == UniformBlock::SIZE);
