//! Shapes demo: a procedural scene plus OBJ models switched at runtime.
//!
//! Model loading can take a while, so it runs on a background worker while
//! the frame loop keeps drawing whichever model is already resident; the
//! shared model map is behind a mutex and at most one load is in flight.
//! Rendering goes to the headless backend, so this runs anywhere and logs
//! what the pipeline asked for.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use anyhow::Result;
use cgmath::Vector3;
use glint::prelude::*;
use log::{error, info};

const CUBE_OBJ: &str = "\
g cube
v -0.5 -0.5 -0.5
v -0.5 -0.5 0.5
v -0.5 0.5 -0.5
v -0.5 0.5 0.5
v 0.5 -0.5 -0.5
v 0.5 -0.5 0.5
v 0.5 0.5 -0.5
v 0.5 0.5 0.5
f 1 2 4 3
f 5 7 8 6
f 1 5 6 2
f 3 4 8 7
f 2 6 8 4
f 1 3 7 5
";

const PYRAMID_OBJ: &str = "\
g pyramid
v -0.5 0 -0.5
v 0.5 0 -0.5
v 0.5 0 0.5
v -0.5 0 0.5
v 0 0.8 0
usemtl plastic
f 1 2 3 4
f 1 5 2
f 2 5 3
f 3 5 4
f 4 5 1
";

fn model_source(name: &str) -> &'static str {
    match name {
        "pyramid" => PYRAMID_OBJ,
        _ => CUBE_OBJ,
    }
}

/// Position a freshly loaded model for display, like any model browser
/// nudging each asset into frame.
fn place_model(name: &str, mesh: &Mesh) -> Node {
    let mut item = Item::new(mesh);
    match name {
        "pyramid" => {
            item.scale(1.2, 1.2, 1.2).translate(0.0, -0.4, 0.0);
            let mut group = Group::new();
            group.add(item);
            group.into()
        }
        _ => item.into(),
    }
}

struct Shapes {
    view: View,
    background: Node,
    models: Arc<Mutex<HashMap<String, Node>>>,
    pending: Option<JoinHandle<()>>,
    model_name: String,
    requested: String,
    gl: NullBackend,
    cache: ResourceCache,
}

impl Shapes {
    fn new() -> Shapes {
        let camera = Camera::arc_ball(
            Polar::new(2.0, 70.0, 45.0),
            Vector3::new(0.0, 0.0, 0.0),
            0.5,
            3.0,
            10.0,
            170.0,
        );
        let mut view = View::new(camera);
        view.add_light(Light::directional(
            Vector3::new(0.8, 0.8, 0.8),
            0.2,
            Polar::new(1.0, 20.0, 90.0),
        ));

        // the room is an inside-out cube around everything
        let mut shapes = ShapeCache::new();
        let mut room = Item::new(&shapes.cube().invert());
        room.set_material(Material::unshaded().with_color(cgmath::Vector4::new(0.2, 0.2, 0.3, 1.0)));
        room.scale(40.0, 40.0, 40.0);

        let mut models = HashMap::new();
        let cube = load_obj(Cursor::new(CUBE_OBJ)).expect("built-in model");
        models.insert("cube".to_string(), place_model("cube", &cube));

        Shapes {
            view,
            background: room.into(),
            models: Arc::new(Mutex::new(models)),
            pending: None,
            model_name: "cube".to_string(),
            requested: "cube".to_string(),
            gl: NullBackend::new(),
            cache: ResourceCache::new("assets"),
        }
    }

    fn set_model(&mut self, name: &str) {
        info!("set model {name}");
        self.requested = name.to_string();
    }

    /// Kick off a background load for the requested model, or adopt it once
    /// the worker has published it.
    fn poll_loader(&mut self) {
        if self.pending.as_ref().map_or(false, |w| w.is_finished()) {
            let _ = self.pending.take().unwrap().join();
        }
        if self.requested == self.model_name {
            return;
        }
        if self.models.lock().unwrap().contains_key(&self.requested) {
            self.model_name = self.requested.clone();
            return;
        }
        if self.pending.is_some() {
            return;
        }
        let name = self.requested.clone();
        let models = Arc::clone(&self.models);
        self.pending = Some(thread::spawn(move || {
            info!("load mesh {name}");
            match load_obj(Cursor::new(model_source(&name))) {
                Ok(mesh) => {
                    let node = place_model(&name, &mesh);
                    models.lock().unwrap().insert(name, node);
                }
                Err(err) => error!("error loading {name}: {err}"),
            }
        }));
    }

    fn spin(&mut self) {
        if let Some(model) = self.models.lock().unwrap().get_mut(&self.model_name) {
            model.rotate_y(1.0);
        }
    }

    fn mouse_drag(&mut self, dx: f32, dy: f32) {
        self.view.camera.rotate(dx, dy);
    }

    fn zoom(&mut self, amount: f32) {
        self.view.camera.move_by(amount);
    }

    fn paint(&mut self, width: u32, height: u32) {
        self.poll_loader();
        self.view.set_projection(width, height);
        let world = self.view.view_matrix();
        self.view.update_lights(world, None);
        if self.background.enabled() {
            // the room is always centred on the camera
            let centered = self.view.centered_view();
            self.view
                .draw(centered, &self.background, &mut self.gl, &mut self.cache);
        }
        let models = self.models.lock().unwrap();
        if let Some(model) = models.get(&self.model_name) {
            self.view.draw(world, model, &mut self.gl, &mut self.cache);
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let mut app = Shapes::new();

    for frame in 0..180 {
        if frame == 30 {
            app.set_model("pyramid");
        }
        if frame % 3 == 0 {
            app.mouse_drag(2.0, 0.5);
        }
        if frame == 90 {
            app.zoom(1.0);
        }
        app.spin();
        app.paint(800, 600);
    }
    if let Some(worker) = app.pending.take() {
        let _ = worker.join();
    }

    let models = app.models.lock().unwrap();
    info!(
        "drew {} calls over {} models, {} programs compiled, {} buffers",
        app.gl.draws.len(),
        models.len(),
        app.gl.programs_compiled,
        app.gl.buffers_created,
    );
    println!(
        "rendered 180 frames: {} draw calls, {} models resident, showing `{}`",
        app.gl.draws.len(),
        models.len(),
        app.model_name,
    );
    Ok(())
}
