//! Render pipelines for scene nodes.
//!
//! Bind group 0 holds the node's uniform region, bound twice: binding 0 for
//! the vertex stage and binding 1 for the fragment stage. Bind group 1 holds
//! the optional material texture and sampler.

pub mod basic;

use crate::data_structures::{texture::Texture, vertex::VertexAttributes};

pub const UNIFORM_GROUP: u32 = 0;
pub const UNIFORM_VERTEX_BINDING: u32 = 0;
pub const UNIFORM_FRAGMENT_BINDING: u32 = 1;
pub const MATERIAL_GROUP: u32 = 1;
pub const VERTEX_BUFFER_SLOT: u32 = 0;

#[derive(Debug)]
pub struct NodePipeline {
    pub render_pipeline: wgpu::RenderPipeline,
    /// The face culling the pipeline was compiled with.
    pub cull_mode: Option<wgpu::Face>,
    pub attributes: VertexAttributes,
}

/// Texture and sampler bound at [`MATERIAL_GROUP`].
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(device: &wgpu::Device, name: &str, texture: &Texture) -> Self {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &basic::material_layout(device),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
            label: Some(name),
        });
        Self {
            name: name.to_string(),
            bind_group,
        }
    }
}

/// The pipelines a scene draws its nodes with.
#[derive(Debug)]
pub struct Pipelines {
    /// Vertex-colored, lit meshes.
    pub lit: NodePipeline,
    /// Textured, lit meshes.
    pub textured: NodePipeline,
}

impl Pipelines {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> anyhow::Result<Self> {
        Ok(Self {
            lit: basic::mk_node_pipeline(device, color_format, VertexAttributes::LIT)?,
            textured: basic::mk_node_pipeline(device, color_format, VertexAttributes::TEXTURED)?,
        })
    }

    /// The pipeline matching a mesh layout, if there is one.
    pub fn for_attributes(&self, attributes: VertexAttributes) -> Option<&NodePipeline> {
        [&self.lit, &self.textured]
            .into_iter()
            .find(|pipeline| pipeline.attributes == attributes)
    }
}
