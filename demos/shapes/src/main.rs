use trapeze::{
    WindowEvent,
    camera::world_matrix,
    cgmath::{Deg, Vector3},
    context::{Context, Frame, Gpu},
    data_structures::{animation::Animation, geometry::Geometry, node::Node},
    flow::{self, SceneFlow},
    pipelines::Material,
    resources::load_texture,
    winit::event::{ElementState, MouseButton},
};

// radians per pixel of mouse drag
const DRAG_SPEED: f32 = 0.01;

struct Shapes {
    nodes: Vec<Node<Gpu>>,
    dragging: bool,
    last_cursor: Option<(f64, f64)>,
}

impl Shapes {
    fn new(ctx: &Context) -> anyhow::Result<Self> {
        let gpu = &ctx.gpu;
        let inflight = ctx.settings.inflight_frames;

        let mut cube = Node::with_inflight_frames(gpu, "cube", Geometry::cube()?, None, inflight)?;
        cube.position = Vector3::new(-2.5, 0.0, 0.0);
        cube.scale = 0.6;
        cube.animation = Some(Animation::Wobble { period: 6.0 });

        let mut cone = Node::with_inflight_frames(gpu, "cone", Geometry::cone(8)?, None, inflight)?;
        cone.position = Vector3::new(0.0, -0.8, 0.0);
        cone.scale = 0.8;
        cone.animation = Some(Animation::Spin {
            rates: Vector3::new(0.0, 1.0, 0.0),
        });

        let texture = futures::executor::block_on(load_texture(
            "pyramid.png",
            &gpu.device,
            &gpu.queue,
        ))?;
        let material = Material::new(&gpu.device, "pyramid", &texture);
        let mut pyramid = Node::with_inflight_frames(
            gpu,
            "pyramid",
            Geometry::textured_cone(4)?,
            Some(material),
            inflight,
        )?;
        pyramid.position = Vector3::new(2.5, -0.8, 0.0);
        pyramid.scale = 0.8;

        Ok(Self {
            nodes: vec![cube, cone, pyramid],
            dragging: false,
            last_cursor: None,
        })
    }
}

impl SceneFlow for Shapes {
    fn on_init(&mut self, ctx: &mut Context) {
        log::info!("{} nodes, {} frames in flight", self.nodes.len(), ctx.settings.inflight_frames);
    }

    fn on_window_events(&mut self, _ctx: &Context, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.dragging = *state == ElementState::Pressed;
            }
            WindowEvent::CursorMoved { position, .. } => {
                let current = (position.x, position.y);
                if let Some((x, y)) = self.last_cursor
                    && self.dragging
                {
                    let dx = (current.0 - x) as f32 * DRAG_SPEED;
                    let dy = (current.1 - y) as f32 * DRAG_SPEED;
                    // dragging turns the pyramid
                    if let Some(pyramid) = self.nodes.last_mut() {
                        pyramid.rotation.y -= dx;
                        pyramid.rotation.x -= dy;
                    }
                }
                self.last_cursor = Some(current);
            }
            _ => {}
        }
    }

    fn on_update(&mut self, _ctx: &Context, dt: std::time::Duration) {
        self.nodes.iter_mut().for_each(|node| node.update(dt));
    }

    fn on_render(&mut self, ctx: &Context, frame: &Frame) {
        let world = world_matrix(Vector3::new(0.0, 0.0, -4.0), Deg(25.0));
        let projection = ctx.projection.calc_matrix();
        for node in &mut self.nodes {
            let Some(pipeline) = ctx.pipelines.for_attributes(node.geometry().mesh().attributes())
            else {
                continue;
            };
            node.render(&ctx.gpu, pipeline, frame, world, projection);
        }
    }
}

fn main() -> anyhow::Result<()> {
    flow::run(Box::new(|ctx| Ok(Box::new(Shapes::new(ctx)?) as Box<dyn SceneFlow>)))
}
