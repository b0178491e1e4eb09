//! Scene nodes: one mesh, one transform, one light, one draw per frame.

use std::fmt::Debug;

use anyhow::{Context, bail, ensure};
use cgmath::{Matrix4, Rad, Vector3};
use instant::Duration;

use crate::{
    data_structures::{
        animation::Animation, geometry::Geometry, light::Light, uniform::UniformBlock,
    },
    frame_ring::{AcquiredRegion, DEFAULT_INFLIGHT_FRAMES, FrameRing},
    render::{BACKGROUND_COLOUR, DrawPass, RenderBackend},
};

/// A drawable object with its own vertex buffer and uniform ring.
///
/// The transform fields are public and may be changed freely between frames;
/// [`Node::render`] only reads them.
pub struct Node<B: RenderBackend> {
    pub name: String,
    pub position: Vector3<f32>,
    /// Euler angles in radians, applied x, then y, then z.
    pub rotation: Vector3<f32>,
    pub scale: f32,
    pub light: Light,
    pub animation: Option<Animation>,
    geometry: Geometry,
    vertex_buffer: B::Buffer,
    vertex_count: u32,
    material: Option<B::Material>,
    ring: FrameRing<B::Region>,
    time: f32,
}

impl<B: RenderBackend> Node<B> {
    pub fn new(
        backend: &B,
        name: impl Into<String>,
        geometry: Geometry,
        material: Option<B::Material>,
    ) -> anyhow::Result<Self> {
        Self::with_inflight_frames(backend, name, geometry, material, DEFAULT_INFLIGHT_FRAMES)
    }

    /// Builds the vertex buffer and a ring of `inflight_frames` uniform regions.
    pub fn with_inflight_frames(
        backend: &B,
        name: impl Into<String>,
        geometry: Geometry,
        material: Option<B::Material>,
        inflight_frames: usize,
    ) -> anyhow::Result<Self> {
        let name = name.into();
        let mesh = geometry.mesh();
        let vertex_count = u32::try_from(mesh.vertex_count())
            .with_context(|| format!("node {name} has too many vertices"))?;
        ensure!(
            vertex_count % 3 == 0,
            "node {name} has {vertex_count} vertices, not a whole number of triangles"
        );
        if mesh.attributes().tex_coords && material.is_none() {
            bail!("node {name} has textured geometry but no material");
        }
        if !mesh.attributes().tex_coords && material.is_some() {
            log::warn!("node {name} has a material but its geometry carries no texture coordinates");
        }

        let vertex_buffer = backend
            .create_vertex_buffer(&format!("{name} Vertex Buffer"), &mesh.to_bytes())
            .with_context(|| format!("creating the vertex buffer of node {name}"))?;
        let ring = FrameRing::new(inflight_frames, UniformBlock::SIZE as u64, |index, size| {
            backend.create_uniform_region(&format!("{name} Uniform Region {index}"), size)
        })
        .with_context(|| format!("creating the uniform ring of node {name}"))?;
        log::debug!("node {name}: {vertex_count} vertices, {inflight_frames} regions in flight");

        Ok(Self {
            name,
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: 1.0,
            light: Light::default(),
            animation: None,
            geometry,
            vertex_buffer,
            vertex_count,
            material,
            ring,
            time: 0.0,
        })
    }

    /// `T(position) * Rx * Ry * Rz * S(scale)`.
    pub fn model_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from_angle_x(Rad(self.rotation.x))
            * Matrix4::from_angle_y(Rad(self.rotation.y))
            * Matrix4::from_angle_z(Rad(self.rotation.z))
            * Matrix4::from_scale(self.scale)
    }

    /// Advances the node clock and its animation, if any.
    pub fn update(&mut self, dt: Duration) {
        let dt = dt.as_secs_f32();
        self.time += dt;
        if let Some(animation) = &self.animation {
            animation.apply(&mut self.rotation, self.time, dt);
        }
    }

    /// Draws the node into `target` as one render pass.
    ///
    /// Blocks while all of the node's uniform regions are still in use by the
    /// GPU. The region used here is returned once the backend reports the
    /// submitted command buffer complete.
    pub fn render(
        &mut self,
        backend: &B,
        pipeline: &B::Pipeline,
        target: &B::Target,
        parent_model_view: Matrix4<f32>,
        projection: Matrix4<f32>,
    ) {
        let model_view = parent_model_view * self.model_matrix();
        let Some(AcquiredRegion { region, permit, .. }) = self.ring.acquire_next() else {
            log::warn!("node {} rendered after its uniform ring was closed", self.name);
            return;
        };
        FrameRing::write(backend, region, &model_view, &projection, &self.light);

        let pass = DrawPass {
            label: &self.name,
            pipeline,
            clear_colour: BACKGROUND_COLOUR,
            cull_mode: Some(wgpu::Face::Front),
            vertex_buffer: &self.vertex_buffer,
            uniforms: region,
            material: self.material.as_ref(),
            vertices: 0..self.vertex_count,
            // one instance per triangle, every instance draws the full mesh
            instances: 0..self.vertex_count / 3,
            present: true,
        };
        backend.submit(pass, target, Box::new(move || permit.release()));
    }

    pub fn set_position(&mut self, x: f32, y: f32, z: f32) {
        self.position = Vector3::new(x, y, z);
    }

    pub fn set_rotation(&mut self, x: Rad<f32>, y: Rad<f32>, z: Rad<f32>) {
        self.rotation = Vector3::new(x.0, y.0, z.0);
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn triangle_count(&self) -> u32 {
        self.vertex_count / 3
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn material(&self) -> Option<&B::Material> {
        self.material.as_ref()
    }

    pub fn ring(&self) -> &FrameRing<B::Region> {
        &self.ring
    }

    /// Seconds accumulated by [`Node::update`].
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Tears the node down, returning the regions that are still in flight.
    /// Dropping the node does the same.
    pub fn close(mut self) {
        self.ring.close();
    }
}

impl<B: RenderBackend> Debug for Node<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("position", &self.position)
            .field("rotation", &self.rotation)
            .field("scale", &self.scale)
            .field("vertex_count", &self.vertex_count)
            .field("ring", &self.ring)
            .finish()
    }
}
