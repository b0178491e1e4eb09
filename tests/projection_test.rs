use approx::assert_relative_eq;
use cgmath::{Deg, Vector4};
use trapeze::{camera::Projection, config::RendererConfig};

fn depth(projection: &Projection, z: f32) -> f32 {
    let clip = projection.calc_matrix() * Vector4::new(0.0, 0.0, z, 1.0);
    clip.z / clip.w
}

#[test]
fn should_map_the_view_frustum_to_wgpu_depth() {
    let projection = Projection::new(800, 600, Deg(85.0), 0.01, 100.0);
    assert_relative_eq!(depth(&projection, -0.01), 0.0, epsilon = 1e-5);
    assert_relative_eq!(depth(&projection, -100.0), 1.0, epsilon = 1e-5);
}

#[test]
fn should_follow_the_surface_aspect() {
    let mut projection = Projection::new(800, 600, Deg(85.0), 0.01, 100.0);
    assert_relative_eq!(projection.aspect(), 800.0 / 600.0);
    let before = projection.calc_matrix();

    projection.resize(600, 600);
    assert_relative_eq!(projection.aspect(), 1.0);
    let after = projection.calc_matrix();
    // only the horizontal scale changes
    assert!(after.x.x > before.x.x);
    assert_relative_eq!(after.y.y, before.y.y);

    // minimized windows report zero sizes
    projection.resize(0, 0);
    assert!(projection.aspect().is_finite());
}

#[test]
fn default_config_should_match_the_reference_scene() {
    let config = RendererConfig::default();
    assert_eq!(config.inflight_frames, 3);
    assert_eq!(config.fovy, Deg(85.0));
    assert_relative_eq!(config.znear, 0.01);
    assert_relative_eq!(config.zfar, 100.0);
}
