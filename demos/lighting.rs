//! Lighting demo: a cube on a table top lit by a movable directional light
//! and a point light attached to a rotating arm, cycling through material
//! modes. Runs against the headless backend and prints what happened.

use anyhow::Result;
use cgmath::Vector3;
use glint::prelude::*;
use log::info;

struct Lighting {
    view: View,
    scene: Node,
    gl: NullBackend,
    cache: ResourceCache,
}

impl Lighting {
    fn new() -> Lighting {
        let camera = Camera::arc_ball(
            Polar::new(2.0, 65.0, 60.0),
            Vector3::new(0.0, 0.0, 0.0),
            0.5,
            5.0,
            10.0,
            170.0,
        );
        let mut view = View::new(camera);
        view.add_light(Light::directional(
            Vector3::new(0.8, 0.8, 0.8),
            0.2,
            Polar::new(1.0, 50.0, -110.0),
        ));

        let mut shapes = ShapeCache::new();

        let mut table = Item::new(&shapes.plane());
        table.set_material(Material::diffuse().with_color(cgmath::Vector4::new(0.4, 0.3, 0.2, 1.0)));
        table.scale(4.0, 1.0, 4.0).translate(0.0, -0.5, 0.0);

        let mut cube = Item::new(&shapes.cube());
        cube.set_material(Material::plastic());

        // lamp on the end of an arm which swings around the cube
        let mut bulb = Item::new(&shapes.sphere(2));
        bulb.scale(0.1, 0.1, 0.1)
            .translate(1.2, 0.6, 0.0)
            .illuminate(2.0, 0.1, 0.5);
        let mut arm = Group::new();
        arm.add(bulb);

        let mut root = Group::new();
        root.add(table);
        root.add(cube);
        root.add(arm);

        Lighting {
            view,
            scene: root.into(),
            gl: NullBackend::new(),
            cache: ResourceCache::new("assets"),
        }
    }

    fn arm_mut(&mut self) -> &mut Node {
        match &mut self.scene {
            Node::Group(root) => root.child_mut(2),
            _ => unreachable!(),
        }
    }

    fn cube_mut(&mut self) -> &mut Node {
        match &mut self.scene {
            Node::Group(root) => root.child_mut(1),
            _ => unreachable!(),
        }
    }

    fn set_mode(&mut self, mode: &str) {
        info!("lighting mode {mode}");
        let mtl = match mode {
            "diffuse" => Material::diffuse(),
            "specular" => Material::plastic(),
            "glass" => Material::glass(),
            _ => panic!("unknown lighting mode {mode}"),
        };
        self.cube_mut().set_material(mtl);
    }

    fn paint(&mut self, width: u32, height: u32) {
        self.view.set_projection(width, height);
        let world = self.view.view_matrix();
        self.view.update_lights(world, Some(&self.scene));
        self.view.draw(world, &self.scene, &mut self.gl, &mut self.cache);
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let mut app = Lighting::new();

    for frame in 0..240 {
        match frame {
            80 => app.set_mode("specular"),
            160 => app.set_mode("glass"),
            _ => {}
        }
        // swing the lamp and nudge the key light
        app.arm_mut().rotate_y(1.5);
        if frame % 4 == 0 {
            app.view.lights[0].rotate(1.0, 0.0);
        }
        app.cube_mut().rotate_y(0.25);
        app.paint(1024, 768);
    }

    info!(
        "active lights {} after final frame",
        app.view.active_lights().len()
    );
    println!(
        "rendered 240 frames: {} draw calls, {} programs compiled, {} lights active",
        app.gl.draws.len(),
        app.gl.programs_compiled,
        app.view.active_lights().len(),
    );
    Ok(())
}
