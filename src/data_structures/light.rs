/// Directional plus ambient light, combined with the surface material.
///
/// The field order is the byte order the shaders read: ten `f32` values,
/// 40 bytes, no padding.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Light {
    pub color: [f32; 3],
    pub ambient_intensity: f32,
    pub direction: [f32; 3],
    pub diffuse_intensity: f32,
    pub shininess: f32,
    pub specular_intensity: f32,
}

impl Light {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn to_raw(&self) -> [f32; 10] {
        bytemuck::cast(*self)
    }
}

impl Default for Light {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            ambient_intensity: 0.1,
            direction: [0.0, 0.0, 1.0],
            diffuse_intensity: 0.8,
            shininess: 10.0,
            specular_intensity: 2.0,
        }
    }
}

const _: () = assert!(Light::SIZE == 40);
