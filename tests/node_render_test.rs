mod common;

use std::{sync::Arc, thread, time::Duration};

use approx::assert_relative_eq;
use cgmath::{Deg, Matrix4, Rad, SquareMatrix, Vector3, Vector4};
use trapeze::{
    camera::{Projection, world_matrix},
    data_structures::{
        animation::Animation, geometry::Geometry, light::Light, node::Node,
        uniform::UniformBlock,
    },
    render::BACKGROUND_COLOUR,
};

use crate::common::test_utils::RecordingBackend;

const PIPELINE: &str = "lit";

fn cube_node(backend: &RecordingBackend) -> Node<RecordingBackend> {
    Node::new(backend, "cube", Geometry::cube().unwrap(), None).unwrap()
}

#[test]
fn model_matrix_should_translate_then_rotate() {
    let backend = RecordingBackend::new();
    let mut node = cube_node(&backend);
    node.position = Vector3::new(0.0, 0.0, -4.0);
    node.rotation = Vector3::new(Rad::from(Deg(25.0)).0, 0.0, 0.0);

    let model = node.model_matrix();
    let origin = model * Vector4::new(0.0, 0.0, 0.0, 1.0);
    assert_relative_eq!(origin, Vector4::new(0.0, 0.0, -4.0, 1.0), epsilon = 1e-6);

    let up = model * Vector4::new(0.0, 1.0, 0.0, 0.0);
    let angle: f32 = Rad::from(Deg(25.0)).0;
    assert_relative_eq!(
        up,
        Vector4::new(0.0, angle.cos(), angle.sin(), 0.0),
        epsilon = 1e-6
    );
}

#[test]
fn model_matrix_should_scale_last() {
    let backend = RecordingBackend::new();
    let mut node = cube_node(&backend);
    node.scale = 0.5;
    node.set_position(1.0, 2.0, 3.0);
    node.set_rotation(Rad(0.0), Rad(std::f32::consts::FRAC_PI_2), Rad(0.0));

    // x is scaled, turned onto -z, then moved
    let corner = node.model_matrix() * Vector4::new(1.0, 0.0, 0.0, 1.0);
    assert_relative_eq!(corner, Vector4::new(1.0, 2.0, 2.5, 1.0), epsilon = 1e-6);
}

#[test]
fn model_matrix_should_apply_euler_angles_in_x_y_z_order() {
    let backend = RecordingBackend::new();
    let mut node = cube_node(&backend);
    node.rotation = Vector3::new(0.3, 0.7, 1.1);
    let expected = Matrix4::from_angle_x(Rad(0.3))
        * Matrix4::from_angle_y(Rad(0.7))
        * Matrix4::from_angle_z(Rad(1.1));
    assert_relative_eq!(node.model_matrix(), expected, epsilon = 1e-6);
}

#[test]
fn new_node_should_upload_its_mesh_once() {
    let backend = RecordingBackend::new();
    let node = cube_node(&backend);
    assert_eq!(node.vertex_count(), 36);
    assert_eq!(node.triangle_count(), 12);
    assert_eq!(node.ring().inflight_count(), 3);
    assert_eq!(node.ring().region_size(), 168);

    let recording = backend.recording();
    assert_eq!(recording.vertex_buffers.len(), 1);
    assert_eq!(recording.vertex_buffers[0].1, node.geometry().mesh().to_bytes());
    assert_eq!(recording.regions.len(), 3);
}

#[test]
fn render_should_issue_one_front_culled_draw() {
    let backend = RecordingBackend::new();
    let mut node = cube_node(&backend);
    node.render(&backend, &PIPELINE, &7, Matrix4::identity(), Matrix4::identity());

    let passes = backend.passes();
    assert_eq!(passes.len(), 1);
    let pass = &passes[0];
    assert_eq!(pass.label, "cube");
    assert_eq!(pass.pipeline, PIPELINE);
    assert_eq!(pass.target, 7);
    assert_eq!(pass.clear_colour, BACKGROUND_COLOUR);
    assert_eq!(pass.cull_mode, Some(wgpu::Face::Front));
    assert_eq!(pass.vertex_buffer, 0);
    assert_eq!(pass.material, None);
    assert_eq!(pass.vertices, 0..36);
    // one instance per triangle
    assert_eq!(pass.instances, 0..12);
    assert!(pass.present);
}

#[test]
fn render_should_write_parent_times_model_into_the_region() {
    let backend = RecordingBackend::new();
    let mut node = cube_node(&backend);
    node.position = Vector3::new(1.0, 0.0, 0.0);
    node.light.shininess = 4.0;
    let parent = world_matrix(Vector3::new(0.0, 0.0, -4.0), Deg(25.0));
    let projection = Projection::new(800, 600, Deg(85.0), 0.01, 100.0).calc_matrix();

    node.render(&backend, &PIPELINE, &0, parent, projection);

    let pass = &backend.passes()[0];
    let block = UniformBlock::from_bytes(&pass.region_bytes).unwrap();
    let expected = parent * node.model_matrix();
    assert_relative_eq!(Matrix4::from(block.model_view), expected, epsilon = 1e-6);
    assert_eq!(Matrix4::from(block.projection), projection);
    assert_eq!(
        block.light,
        Light {
            shininess: 4.0,
            ..Light::default()
        }
    );
}

#[test]
fn render_should_rotate_through_regions() {
    let backend = RecordingBackend::new();
    let mut node = cube_node(&backend);
    for frame in 0..7 {
        node.render(&backend, &PIPELINE, &frame, Matrix4::identity(), Matrix4::identity());
        // the GPU keeps up
        backend.complete_all();
    }
    let regions: Vec<_> = backend.passes().iter().map(|p| p.region).collect();
    assert_eq!(regions, vec![0, 1, 2, 0, 1, 2, 0]);
}

#[test]
fn regions_should_return_only_on_completion() {
    let backend = RecordingBackend::new();
    let mut node = cube_node(&backend);
    for frame in 0..3 {
        node.render(&backend, &PIPELINE, &frame, Matrix4::identity(), Matrix4::identity());
    }
    // submitted is not completed
    assert_eq!(node.ring().in_flight(), 3);
    assert_eq!(node.ring().available_permits(), 0);
    assert_eq!(backend.pending(), 3);

    assert!(backend.complete_next());
    assert_eq!(node.ring().in_flight(), 2);
    assert_eq!(node.ring().available_permits(), 1);
}

#[test]
fn render_should_wait_for_the_gpu_when_all_regions_are_in_flight() {
    let backend = Arc::new(RecordingBackend::new());
    let mut node = cube_node(&backend);
    for frame in 0..3 {
        node.render(&backend, &PIPELINE, &frame, Matrix4::identity(), Matrix4::identity());
    }

    let gpu = {
        let backend = backend.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            assert_eq!(backend.passes().len(), 3, "a fourth draw did not wait");
            backend.complete_next()
        })
    };
    node.render(&backend, &PIPELINE, &3, Matrix4::identity(), Matrix4::identity());
    assert!(gpu.join().unwrap());

    let passes = backend.passes();
    assert_eq!(passes.len(), 4);
    assert_eq!(passes[3].region, 0);
    assert!(node.ring().in_flight() <= 3);
}

#[test]
fn dropped_completion_handlers_should_not_leak_regions() {
    let backend = RecordingBackend::new();
    let mut node = cube_node(&backend);
    for frame in 0..3 {
        node.render(&backend, &PIPELINE, &frame, Matrix4::identity(), Matrix4::identity());
    }
    assert_eq!(backend.drop_pending(), 3);
    assert_eq!(node.ring().in_flight(), 0);
    assert_eq!(node.ring().available_permits(), 3);
}

#[test]
fn closing_a_node_should_tolerate_late_completions() {
    let backend = RecordingBackend::new();
    let mut node = cube_node(&backend);
    for frame in 0..2 {
        node.render(&backend, &PIPELINE, &frame, Matrix4::identity(), Matrix4::identity());
    }
    node.close();

    // the GPU finishes after teardown
    assert_eq!(backend.pending(), 2);
    assert_eq!(backend.complete_all(), 2);
    assert_eq!(backend.passes().len(), 2);
}

#[test]
fn textured_nodes_should_bind_their_material() {
    let backend = RecordingBackend::new();
    assert!(Node::new(&backend, "bare", Geometry::textured_cone(4).unwrap(), None).is_err());

    let mut node = Node::new(
        &backend,
        "pyramid",
        Geometry::textured_cone(4).unwrap(),
        Some("pyramid.png"),
    )
    .unwrap();
    assert_eq!(node.material(), Some(&"pyramid.png"));
    node.render(&backend, &"textured", &0, Matrix4::identity(), Matrix4::identity());
    let pass = &backend.passes()[0];
    assert_eq!(pass.material, Some("pyramid.png"));
    assert_eq!(pass.vertices, 0..24);
    assert_eq!(pass.instances, 0..8);
}

#[test]
fn node_construction_should_fail_when_a_region_cannot_be_allocated() {
    let backend = RecordingBackend::failing_at(2);
    let error = Node::new(&backend, "cube", Geometry::cube().unwrap(), None).unwrap_err();
    assert!(format!("{error:#}").contains("out of memory"));
}

#[test]
fn inflight_frames_should_be_configurable() {
    let backend = RecordingBackend::new();
    let node =
        Node::with_inflight_frames(&backend, "cube", Geometry::cube().unwrap(), None, 1).unwrap();
    assert_eq!(node.ring().inflight_count(), 1);
    assert!(
        Node::with_inflight_frames(&backend, "cube", Geometry::cube().unwrap(), None, 0).is_err()
    );
}

#[test]
fn update_should_advance_animations() {
    let backend = RecordingBackend::new();
    let mut node = cube_node(&backend);
    node.update(Duration::from_millis(500));
    assert_eq!(node.rotation, Vector3::new(0.0, 0.0, 0.0));
    assert_relative_eq!(node.time(), 0.5);

    node.animation = Some(Animation::Spin {
        rates: Vector3::new(0.0, 2.0, 0.0),
    });
    node.update(Duration::from_millis(250));
    assert_relative_eq!(node.rotation.y, 0.5, epsilon = 1e-6);

    node.animation = Some(Animation::Wobble { period: 4.0 });
    // t = 1.0 s is a quarter period
    node.update(Duration::from_millis(250));
    assert_relative_eq!(node.rotation.x, 1.0, epsilon = 1e-5);
    assert_relative_eq!(node.rotation.y, 1.0, epsilon = 1e-5);
}
