//! Vertex records and validated triangle lists.
//!
//! A vertex always has a position and may carry a color, a normal and a
//! texture coordinate. All vertices of one [`Mesh`] share the same attribute
//! set, so a mesh serializes to a flat run of `f32` with a single stride.

use anyhow::{bail, ensure};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: Option<[f32; 4]>,
    pub normal: Option<[f32; 3]>,
    pub tex_coords: Option<[f32; 2]>,
}

impl Vertex {
    pub fn new(position: [f32; 3]) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_normal(mut self, normal: [f32; 3]) -> Self {
        self.normal = Some(normal);
        self
    }

    pub fn with_tex_coords(mut self, tex_coords: [f32; 2]) -> Self {
        self.tex_coords = Some(tex_coords);
        self
    }

    pub fn attributes(&self) -> VertexAttributes {
        VertexAttributes {
            color: self.color.is_some(),
            normal: self.normal.is_some(),
            tex_coords: self.tex_coords.is_some(),
        }
    }

    /// Appends the vertex in declaration order: position, color, normal, tex coords.
    pub fn write_floats(&self, out: &mut Vec<f32>) {
        out.extend_from_slice(&self.position);
        if let Some(color) = &self.color {
            out.extend_from_slice(color);
        }
        if let Some(normal) = &self.normal {
            out.extend_from_slice(normal);
        }
        if let Some(tex_coords) = &self.tex_coords {
            out.extend_from_slice(tex_coords);
        }
    }
}

/// Which optional attributes a vertex layout carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VertexAttributes {
    pub color: bool,
    pub normal: bool,
    pub tex_coords: bool,
}

impl VertexAttributes {
    pub const POSITION_LOCATION: u32 = 0;
    pub const COLOR_LOCATION: u32 = 1;
    pub const NORMAL_LOCATION: u32 = 2;
    pub const TEX_COORDS_LOCATION: u32 = 3;

    /// Layout of the lit, vertex-colored meshes (cube, cone).
    pub const LIT: Self = Self {
        color: true,
        normal: true,
        tex_coords: false,
    };
    /// Layout of textured meshes (textured cone).
    pub const TEXTURED: Self = Self {
        color: true,
        normal: true,
        tex_coords: true,
    };

    pub fn float_count(&self) -> usize {
        3 + 4 * usize::from(self.color) + 3 * usize::from(self.normal) + 2 * usize::from(self.tex_coords)
    }

    pub fn stride(&self) -> wgpu::BufferAddress {
        (self.float_count() * std::mem::size_of::<f32>()) as wgpu::BufferAddress
    }

    /// The shader-facing attribute list, with fixed locations per attribute kind.
    pub fn vertex_attributes(&self) -> Vec<wgpu::VertexAttribute> {
        let mut attributes = Vec::with_capacity(4);
        let mut offset = 0;
        let mut push = |present: bool, location: u32, format: wgpu::VertexFormat| {
            if present {
                attributes.push(wgpu::VertexAttribute {
                    offset,
                    shader_location: location,
                    format,
                });
                offset += format.size();
            }
        };
        push(true, Self::POSITION_LOCATION, wgpu::VertexFormat::Float32x3);
        push(self.color, Self::COLOR_LOCATION, wgpu::VertexFormat::Float32x4);
        push(self.normal, Self::NORMAL_LOCATION, wgpu::VertexFormat::Float32x3);
        push(self.tex_coords, Self::TEX_COORDS_LOCATION, wgpu::VertexFormat::Float32x2);
        attributes
    }
}

/// A non-indexed triangle list with a uniform vertex layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    attributes: VertexAttributes,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>) -> anyhow::Result<Self> {
        let Some(first) = vertices.first() else {
            bail!("a mesh needs at least one triangle");
        };
        ensure!(
            vertices.len() % 3 == 0,
            "mesh vertex count {} is not a multiple of 3",
            vertices.len()
        );
        let attributes = first.attributes();
        if let Some((index, vertex)) = vertices
            .iter()
            .enumerate()
            .find(|(_, v)| v.attributes() != attributes)
        {
            bail!(
                "vertex {index} has attributes {:?}, expected {:?} like vertex 0",
                vertex.attributes(),
                attributes
            );
        }
        Ok(Self {
            vertices,
            attributes,
        })
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn attributes(&self) -> VertexAttributes {
        self.attributes
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn to_floats(&self) -> Vec<f32> {
        let mut floats = Vec::with_capacity(self.vertices.len() * self.attributes.float_count());
        for vertex in &self.vertices {
            vertex.write_floats(&mut floats);
        }
        floats
    }

    /// The vertex buffer contents.
    pub fn to_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.to_floats()).to_vec()
    }
}
