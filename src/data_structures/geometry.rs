//! Procedural and static node geometry.
//!
//! Every generator emits triangles counter-clockwise as seen from outside the
//! solid, with flat per-face normals pointing outward.

use std::f32::consts::TAU;

use anyhow::{Context, ensure};
use cgmath::{InnerSpace, Vector3};

use super::vertex::{Mesh, Vertex};

pub const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
pub const GREEN: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
pub const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];
pub const TEAL: [f32; 4] = [0.1, 0.6, 0.4, 1.0];
pub const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Color of every vertex of an untextured cone.
pub const CONE_COLOR: [f32; 4] = RED;

const CONE_APEX: [f32; 3] = [0.0, 2.0, 0.0];
const CONE_BASE_CENTER: [f32; 3] = [0.0, 0.0, 0.0];
const CONE_BASE_NORMAL: [f32; 3] = [0.0, -1.0, 0.0];

/// Parameters of a generated mesh, kept so the node knows what it draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generator {
    Cone { sides: u32 },
    TexturedCone { sides: u32 },
}

impl Generator {
    pub fn generate(&self) -> anyhow::Result<Mesh> {
        match *self {
            Self::Cone { sides } => cone(sides),
            Self::TexturedCone { sides } => textured_cone(sides),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Static(Mesh),
    Parametric { generator: Generator, mesh: Mesh },
}

impl Geometry {
    pub fn cube() -> anyhow::Result<Self> {
        Ok(Self::Static(cube()?))
    }

    pub fn cone(sides: u32) -> anyhow::Result<Self> {
        Self::generated(Generator::Cone { sides })
    }

    pub fn textured_cone(sides: u32) -> anyhow::Result<Self> {
        Self::generated(Generator::TexturedCone { sides })
    }

    pub fn generated(generator: Generator) -> anyhow::Result<Self> {
        let mesh = generator.generate()?;
        Ok(Self::Parametric { generator, mesh })
    }

    pub fn mesh(&self) -> &Mesh {
        match self {
            Self::Static(mesh) => mesh,
            Self::Parametric { mesh, .. } => mesh,
        }
    }

    pub fn generator(&self) -> Option<Generator> {
        match self {
            Self::Static(_) => None,
            Self::Parametric { generator, .. } => Some(*generator),
        }
    }
}

/// A 2x2x2 cube centered on the origin: 6 faces, 12 triangles, 36 vertices.
///
/// The four corners of every face are colored red, green, blue and teal.
pub fn cube() -> anyhow::Result<Mesh> {
    #[rustfmt::skip]
    let faces: [([[f32; 3]; 4], [f32; 3]); 6] = [
        // front
        ([[-1.0, 1.0, 1.0], [-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0]], [0.0, 0.0, 1.0]),
        // left
        ([[-1.0, 1.0, -1.0], [-1.0, -1.0, -1.0], [-1.0, -1.0, 1.0], [-1.0, 1.0, 1.0]], [-1.0, 0.0, 0.0]),
        // right
        ([[1.0, 1.0, 1.0], [1.0, -1.0, 1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0]], [1.0, 0.0, 0.0]),
        // top
        ([[-1.0, 1.0, -1.0], [-1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, -1.0]], [0.0, 1.0, 0.0]),
        // bottom
        ([[-1.0, -1.0, 1.0], [-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, -1.0, 1.0]], [0.0, -1.0, 0.0]),
        // back
        ([[1.0, 1.0, -1.0], [1.0, -1.0, -1.0], [-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0]], [0.0, 0.0, -1.0]),
    ];
    let colors = [RED, GREEN, BLUE, TEAL];

    let mut vertices = Vec::with_capacity(36);
    for (corners, normal) in faces {
        let corner = |i: usize| {
            Vertex::new(corners[i])
                .with_color(colors[i])
                .with_normal(normal)
        };
        vertices.extend([corner(0), corner(1), corner(2), corner(0), corner(2), corner(3)]);
    }
    Mesh::new(vertices).context("building the cube")
}

/// A cone (pyramid for small `sides`) standing on the XZ plane with its apex at (0, 2, 0).
pub fn cone(sides: u32) -> anyhow::Result<Mesh> {
    let vertices = cone_ring(sides)?
        .into_iter()
        .flat_map(|step| {
            let side = |p: [f32; 3]| {
                Vertex::new(p)
                    .with_color(CONE_COLOR)
                    .with_normal(step.side_normal)
            };
            let base = |p: [f32; 3]| {
                Vertex::new(p)
                    .with_color(CONE_COLOR)
                    .with_normal(CONE_BASE_NORMAL)
            };
            [
                side(step.b),
                side(step.a),
                side(CONE_APEX),
                base(CONE_BASE_CENTER),
                base(step.a),
                base(step.b),
            ]
        })
        .collect();
    Mesh::new(vertices).context("building the cone")
}

/// The cone with texture coordinates wrapped once around the sides.
///
/// `s` runs from 0 to 1 around the circumference; `t` is 0 at the apex and 1
/// on the base rim. Vertices are white so the texture shows unmodulated.
pub fn textured_cone(sides: u32) -> anyhow::Result<Mesh> {
    let k = sides as f32;
    let vertices = cone_ring(sides)?
        .into_iter()
        .flat_map(|step| {
            let i = step.index as f32;
            let (s_a, s_b, s_mid) = (i / k, (i + 1.0) / k, (i + 0.5) / k);
            let side = |p: [f32; 3], uv: [f32; 2]| {
                Vertex::new(p)
                    .with_color(WHITE)
                    .with_normal(step.side_normal)
                    .with_tex_coords(uv)
            };
            let base = |p: [f32; 3], uv: [f32; 2]| {
                Vertex::new(p)
                    .with_color(WHITE)
                    .with_normal(CONE_BASE_NORMAL)
                    .with_tex_coords(uv)
            };
            [
                side(step.b, [s_b, 1.0]),
                side(step.a, [s_a, 1.0]),
                side(CONE_APEX, [s_mid, 0.0]),
                base(CONE_BASE_CENTER, [s_mid, 0.0]),
                base(step.a, [s_a, 1.0]),
                base(step.b, [s_b, 1.0]),
            ]
        })
        .collect();
    Mesh::new(vertices).context("building the textured cone")
}

struct ConeStep {
    index: u32,
    a: [f32; 3],
    b: [f32; 3],
    side_normal: [f32; 3],
}

/// Walks the base rim: A is the previous B, starting at (1, 0, 0).
fn cone_ring(sides: u32) -> anyhow::Result<Vec<ConeStep>> {
    ensure!(sides >= 3, "a cone needs at least 3 sides, got {sides}");
    let delta = TAU / sides as f32;
    let apex = Vector3::from(CONE_APEX);
    let mut a = Vector3::new(1.0, 0.0, 0.0);
    let steps = (0..sides)
        .map(|index| {
            let alpha = (index + 1) as f32 * delta;
            let b = Vector3::new(alpha.cos(), 0.0, alpha.sin());
            let side_normal = (a - b).cross(apex - b).normalize();
            let step = ConeStep {
                index,
                a: a.into(),
                b: b.into(),
                side_normal: side_normal.into(),
            };
            a = b;
            step
        })
        .collect();
    Ok(steps)
}
