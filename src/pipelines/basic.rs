use std::num::NonZeroU64;

use anyhow::{Context, bail};

use crate::{
    data_structures::{uniform::UniformBlock, vertex::VertexAttributes},
    pipelines::{NodePipeline, UNIFORM_FRAGMENT_BINDING, UNIFORM_VERTEX_BINDING},
};

/// The node uniform region, visible to the vertex stage at binding 0 and to the
/// fragment stage at binding 1. Both are read-only storage views of the same
/// 168-byte buffer.
pub fn uniform_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let entry = |binding, visibility| wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(UniformBlock::SIZE as u64),
        },
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            entry(UNIFORM_VERTEX_BINDING, wgpu::ShaderStages::VERTEX),
            entry(UNIFORM_FRAGMENT_BINDING, wgpu::ShaderStages::FRAGMENT),
        ],
        label: Some("Node uniform_bind_group_layout"),
    })
}

pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("Node texture_bind_group_layout"),
    })
}

/// Builds the pipeline for meshes with the given vertex layout.
///
/// Supported layouts are position+color+normal and
/// position+color+normal+tex coords. Shader and pipeline validation errors are
/// returned instead of reaching the device's uncaptured error handler.
pub fn mk_node_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    attributes: VertexAttributes,
) -> anyhow::Result<NodePipeline> {
    let uniform_layout = uniform_layout(device);
    let material_layout;
    let (shader, bind_group_layouts) = match attributes {
        VertexAttributes::LIT => (
            wgpu::ShaderModuleDescriptor {
                label: Some("Lit Node Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("node.wgsl").into()),
            },
            vec![Some(&uniform_layout)],
        ),
        VertexAttributes::TEXTURED => {
            material_layout = self::material_layout(device);
            (
                wgpu::ShaderModuleDescriptor {
                    label: Some("Textured Node Shader"),
                    source: wgpu::ShaderSource::Wgsl(include_str!("textured_node.wgsl").into()),
                },
                vec![Some(&uniform_layout), Some(&material_layout)],
            )
        }
        other => bail!("no node pipeline for vertex layout {other:?}"),
    };

    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Node Render Pipeline Layout"),
        bind_group_layouts: &bind_group_layouts,
        immediate_size: 0,
    });
    let vertex_attributes = attributes.vertex_attributes();
    let cull_mode = Some(wgpu::Face::Front);
    let render_pipeline = mk_render_pipeline(
        device,
        &render_pipeline_layout,
        color_format,
        Some(wgpu::BlendState::REPLACE),
        &[wgpu::VertexBufferLayout {
            array_stride: attributes.stride(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &vertex_attributes,
        }],
        shader,
        cull_mode,
    );
    if let Some(error) = futures::executor::block_on(scope.pop()) {
        return Err(anyhow::anyhow!("{error}"))
            .with_context(|| format!("building the node pipeline for {attributes:?}"));
    }
    log::debug!("node pipeline for {attributes:?} targeting {color_format:?}");

    Ok(NodePipeline {
        render_pipeline,
        cull_mode,
        attributes,
    })
}

/// Triangles are front-facing when wound clockwise on screen, so culling the
/// front face keeps the counter-clockwise triangles the geometry generators emit.
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: wgpu::ShaderModuleDescriptor,
    cull_mode: Option<wgpu::Face>,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(shader);

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Node Render Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Cw,
            cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
    })
}
