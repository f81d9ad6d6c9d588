//! Cameras, lights and the per-frame view state.

use cgmath::{
    perspective, Deg, EuclideanSpace, InnerSpace, Matrix, Matrix3, Matrix4, Point3, Quaternion,
    Rotation, Rotation3, SquareMatrix, Vector2, Vector3, Vector4,
};

use crate::backend::RenderBackend;
use crate::gfx::material::{ResourceCache, MAX_LIGHTS};
use crate::math::{upper_left3, Polar};

use super::{Node, Transform};

// Default projection settings
pub const FOV: f32 = 45.0;
pub const NEAR: f32 = 0.1;
pub const FAR: f32 = 50.0;
pub const UP: Vector3<f32> = Vector3 {
    x: 0.0,
    y: 1.0,
    z: 0.0,
};

pub const ZOOM_SCALE: f32 = 1.05;
pub const ROTATE_SCALE: f32 = 1.0;
pub const STEP_SIZE: f32 = 0.05;

/// A light source. `col.w` is the ambient scaling factor. `pos.w` is the
/// quadratic attenuation for a point light, or zero to tag a directional
/// light; the shaders branch on that component, so camera-space transforms
/// must leave it untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub pos: Vector4<f32>,
    pub col: Vector4<f32>,
    pub on: bool,
    posw: f32,
}

impl Light {
    pub fn directional(color: Vector3<f32>, ambient: f32, mut direction: Polar) -> Light {
        direction.r = 1.0;
        Light {
            pos: direction.vec4(0.0),
            col: color.extend(ambient),
            on: true,
            posw: 0.0,
        }
    }

    pub fn point(
        color: Vector3<f32>,
        ambient: f32,
        position: Vector3<f32>,
        attenuation: f32,
    ) -> Light {
        Light {
            pos: position.extend(attenuation),
            col: color.extend(ambient),
            on: true,
            posw: 1.0,
        }
    }

    /// Move a directional light around the unit sphere.
    pub fn rotate(&mut self, dx: f32, dy: f32) -> &mut Self {
        if self.pos.w != 0.0 {
            panic!("rotate is only supported for directional lights");
        }
        let mut polar = Polar::from_vec3(self.pos.truncate());
        polar.phi -= dx * ROTATE_SCALE;
        polar.theta -= dy * ROTATE_SCALE;
        polar.clamp();
        self.pos = polar.vec4(0.0);
        self
    }

    /// The light transformed into camera space. Directions rotate without
    /// translating; point positions take the full transform. The w tag is
    /// carried over bit for bit.
    fn in_camera_space(&self, trans: &Matrix4<f32>) -> Light {
        let mut light = *self;
        light.pos = trans * self.pos.truncate().extend(self.posw);
        light.pos.w = self.pos.w;
        light
    }
}

/// Viewing position, either orbiting a centre point or free-moving.
#[derive(Debug, Clone, PartialEq)]
pub enum Camera {
    ArcBall(ArcBall),
    FirstPerson(FirstPerson),
}

impl Camera {
    /// Camera positioned at `center + to_eye`, orbiting and looking at
    /// `center`. Radius is clamped to `[min_r, max_r]`, inclination to
    /// `[min_theta, max_theta]` degrees.
    pub fn arc_ball(
        to_eye: Polar,
        center: Vector3<f32>,
        min_r: f32,
        max_r: f32,
        min_theta: f32,
        max_theta: f32,
    ) -> Camera {
        Camera::ArcBall(ArcBall {
            to_eye,
            center,
            min_r,
            max_r,
            min_theta,
            max_theta,
        })
    }

    /// Free camera with yaw/pitch rotation and forward/back stepping.
    pub fn first_person(pos: Vector3<f32>, dir: Vector3<f32>) -> Camera {
        Camera::FirstPerson(FirstPerson {
            pos,
            dir: dir.normalize(),
        })
    }

    pub fn eye(&self) -> Vector3<f32> {
        match self {
            Camera::ArcBall(c) => c.eye(),
            Camera::FirstPerson(c) => c.eye(),
        }
    }

    pub fn center(&self) -> Vector3<f32> {
        match self {
            Camera::ArcBall(c) => c.center(),
            Camera::FirstPerson(c) => c.center(),
        }
    }

    /// Move towards (amount > 0) or away from (amount < 0) the view target.
    pub fn move_by(&mut self, amount: f32) {
        match self {
            Camera::ArcBall(c) => c.move_by(amount),
            Camera::FirstPerson(c) => c.move_by(amount),
        }
    }

    /// Rotate from a pointer drag delta.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        match self {
            Camera::ArcBall(c) => c.rotate(dx, dy),
            Camera::FirstPerson(c) => c.rotate(dx, dy),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcBall {
    to_eye: Polar,
    center: Vector3<f32>,
    min_r: f32,
    max_r: f32,
    min_theta: f32,
    max_theta: f32,
}

impl ArcBall {
    pub fn eye(&self) -> Vector3<f32> {
        self.center + self.to_eye.vec3()
    }

    pub fn center(&self) -> Vector3<f32> {
        self.center
    }

    pub fn move_by(&mut self, amount: f32) {
        if amount < 0.0 {
            self.to_eye.r *= ZOOM_SCALE;
        } else if amount > 0.0 {
            self.to_eye.r /= ZOOM_SCALE;
        }
        self.to_eye.r = self.to_eye.r.clamp(self.min_r, self.max_r);
    }

    /// Orbit the camera: dx moves around the xz circle, dy towards the
    /// poles, clamped so the view never flips over.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.to_eye.phi -= dx * ROTATE_SCALE;
        self.to_eye.theta -= dy * ROTATE_SCALE;
        self.to_eye.theta = self.to_eye.theta.clamp(self.min_theta, self.max_theta);
        self.to_eye.clamp();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirstPerson {
    pos: Vector3<f32>,
    dir: Vector3<f32>,
}

impl FirstPerson {
    pub fn eye(&self) -> Vector3<f32> {
        self.pos
    }

    pub fn center(&self) -> Vector3<f32> {
        self.pos + self.dir
    }

    /// Step forwards if amount > 0 or backwards if amount < 0.
    pub fn move_by(&mut self, amount: f32) {
        self.pos += self.dir * (STEP_SIZE * amount);
    }

    /// dx yaws around the up axis, dy pitches around the side axis.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.rotate_axis(dx, UP);
        self.rotate_axis(dy, self.dir.cross(UP).normalize());
    }

    fn rotate_axis(&mut self, step: f32, axis: Vector3<f32>) {
        let q = Quaternion::from_axis_angle(axis, Deg(step * ROTATE_SCALE));
        self.dir = q.rotate_vector(self.dir);
    }
}

/// Per-frame view state: the camera, the static lights, the projection and
/// the camera-space light array rebuilt by [`View::update_lights`].
#[derive(Debug, Clone)]
pub struct View {
    pub camera: Camera,
    pub lights: Vec<Light>,
    pub proj: Matrix4<f32>,
    ldata: Vec<Light>,
    width: f32,
    height: f32,
}

impl View {
    pub fn new(camera: Camera) -> View {
        View {
            camera,
            lights: Vec::new(),
            proj: Matrix4::identity(),
            ldata: Vec::new(),
            width: 0.0,
            height: 0.0,
        }
    }

    /// Add a static light. The light array is capped at [`MAX_LIGHTS`] to
    /// match the shaders; exceeding it is a configuration mistake.
    pub fn add_light(&mut self, light: Light) -> &mut Self {
        if self.lights.len() >= MAX_LIGHTS {
            panic!("exceeded the maximum number of lights");
        }
        self.lights.push(light);
        self
    }

    /// Set a perspective projection for the viewport. The y axis is flipped
    /// to match the host toolkit's upside-down window coordinates.
    pub fn set_projection(&mut self, width: u32, height: u32) {
        let aspect = width as f32 / height as f32;
        self.proj = perspective(Deg(FOV), aspect, NEAR, FAR)
            * Matrix4::from_nonuniform_scale(1.0, -1.0, 1.0);
        self.width = width as f32;
        self.height = height as f32;
    }

    /// The camera's world-to-camera matrix.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(
            Point3::from_vec(self.camera.eye()),
            Point3::from_vec(self.camera.center()),
            UP,
        )
    }

    /// View centred on the camera, used to draw skyboxes which follow the
    /// eye.
    pub fn centered_view(&self) -> Matrix4<f32> {
        let pos = self.camera.eye();
        self.view_matrix() * Matrix4::from_translation(pos)
    }

    /// Rebuild the camera-space light array from the static lights and any
    /// lights attached to enabled scene items. Lights which are off are
    /// skipped.
    pub fn update_lights(&mut self, world_to_camera: Matrix4<f32>, scene: Option<&Node>) {
        self.ldata.clear();
        for i in 0..self.lights.len() {
            let light = self.lights[i];
            if light.on {
                self.ldata.push(light.in_camera_space(&world_to_camera));
            }
        }
        if let Some(scene) = scene {
            let trans = Transform::new(world_to_camera);
            let mut attached = Vec::new();
            scene.visit(&trans, &mut |item, t| {
                if let Some(light) = item.light() {
                    if light.on {
                        attached.push(light.in_camera_space(&t.matrix));
                    }
                }
            });
            self.ldata.extend(attached);
        }
    }

    /// The camera-space lights from the last [`View::update_lights`].
    pub fn active_lights(&self) -> &[Light] {
        &self.ldata
    }

    /// Draw the scene under the given world-to-camera matrix, binding the
    /// per-item uniforms as each item is visited.
    pub fn draw(
        &self,
        world_to_camera: Matrix4<f32>,
        scene: &Node,
        gl: &mut dyn RenderBackend,
        cache: &mut ResourceCache,
    ) {
        let trans = Transform::new(world_to_camera);
        scene.visit(&trans, &mut |item, t| {
            let mut mat = t.matrix;
            item.mesh()
                .draw_with(gl, cache, item.current_material(), &mut |prog, gl| {
                    let psize = item.mesh().point_size();
                    if psize > 0 {
                        // points face the camera at a constant pixel size
                        let pos = mat.w.truncate();
                        let sc = 2.0 * psize as f32 * pos.magnitude() / self.height;
                        mat = Matrix4::from_cols(
                            Vector4::new(sc, 0.0, 0.0, 0.0),
                            Vector4::new(0.0, sc, 0.0, 0.0),
                            Vector4::new(0.0, 0.0, sc, 0.0),
                            pos.extend(1.0),
                        );
                        prog.set(gl, "pointLocation", pos);
                        prog.set(gl, "pointSize", psize as f32);
                        prog.set(gl, "viewport", Vector2::new(self.width, self.height));
                    } else {
                        prog.set(gl, "texScale", item.tex_scale());
                        let normal_mat = upper_left3(&mat)
                            .invert()
                            .map(|m| m.transpose())
                            .unwrap_or_else(Matrix3::identity);
                        prog.set(gl, "normalModelToCamera", normal_mat);
                        prog.set(gl, "modelScale", t.scale);
                        prog.set(gl, "numLights", self.ldata.len() as i32);
                        for (i, light) in self.ldata.iter().enumerate() {
                            prog.set_array(gl, "lightPos", i, light.pos);
                            prog.set_array(gl, "lightCol", i, light.col);
                        }
                    }
                    prog.set(gl, "cameraToClip", self.proj);
                    prog.set(gl, "modelToCamera", mat);
                });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NullBackend;
    use crate::gfx::mesh::shapes::ShapeCache;
    use crate::gfx::scene::Item;

    const EPS: f32 = 1e-4;

    #[test]
    fn camera_space_transform_preserves_the_w_tag() {
        let trans = Matrix4::from_translation(Vector3::new(3.0, 0.0, 0.0));

        let directional = Light::directional(
            Vector3::new(1.0, 1.0, 1.0),
            0.2,
            Polar::new(5.0, 90.0, 0.0),
        );
        assert_eq!(directional.pos.w, 0.0);
        let moved = directional.in_camera_space(&trans);
        // directions do not translate, and w stays exactly zero
        assert_eq!(moved.pos.w, 0.0);
        assert!((moved.pos.x - directional.pos.x).abs() < EPS);

        let point = Light::point(Vector3::new(1.0, 1.0, 1.0), 0.2, Vector3::new(1.0, 0.0, 0.0), 0.5);
        let moved = point.in_camera_space(&trans);
        assert_eq!(moved.pos.w, 0.5);
        assert!((moved.pos.x - 4.0).abs() < EPS);
    }

    #[test]
    fn directional_light_has_unit_radius_direction() {
        let light = Light::directional(
            Vector3::new(1.0, 1.0, 1.0),
            0.2,
            Polar::new(7.0, 90.0, 0.0),
        );
        assert!((light.pos.truncate().magnitude() - 1.0).abs() < EPS);
    }

    #[test]
    #[should_panic(expected = "maximum number of lights")]
    fn light_cap_is_enforced() {
        let mut view = View::new(Camera::first_person(
            Vector3::new(0.0, 0.0, 2.0),
            Vector3::new(0.0, 0.0, -1.0),
        ));
        let light = Light::point(Vector3::new(1.0, 1.0, 1.0), 0.1, Vector3::new(0.0, 0.0, 0.0), 0.2);
        for _ in 0..=MAX_LIGHTS {
            view.add_light(light);
        }
    }

    #[test]
    fn arc_ball_clamps_radius_and_inclination() {
        let mut camera = match Camera::arc_ball(
            Polar::new(2.0, 70.0, 45.0),
            Vector3::new(0.0, 0.0, 0.0),
            0.5,
            3.0,
            10.0,
            170.0,
        ) {
            Camera::ArcBall(c) => c,
            _ => unreachable!(),
        };
        for _ in 0..100 {
            camera.move_by(-1.0);
        }
        assert_eq!(camera.to_eye.r, 3.0);
        for _ in 0..100 {
            camera.move_by(1.0);
        }
        assert_eq!(camera.to_eye.r, 0.5);

        camera.rotate(0.0, 100.0);
        assert_eq!(camera.to_eye.theta, 10.0);
        camera.rotate(0.0, -200.0);
        assert_eq!(camera.to_eye.theta, 170.0);

        // azimuth wraps modulo 360
        camera.rotate(-400.0, 0.0);
        assert!(camera.to_eye.phi >= 0.0 && camera.to_eye.phi <= 360.0);
    }

    #[test]
    fn first_person_steps_along_its_direction() {
        let mut camera = match Camera::first_person(
            Vector3::new(0.0, 0.0, 2.0),
            Vector3::new(0.0, 0.0, -2.0),
        ) {
            Camera::FirstPerson(c) => c,
            _ => unreachable!(),
        };
        // direction is normalised on construction
        assert!((camera.dir.magnitude() - 1.0).abs() < EPS);
        camera.move_by(2.0);
        assert!((camera.pos.z - (2.0 - 2.0 * STEP_SIZE)).abs() < EPS);

        camera.rotate(90.0, 0.0);
        assert!((camera.dir.x + 1.0).abs() < 1e-3);
    }

    #[test]
    fn projection_flips_the_y_axis() {
        let mut view = View::new(Camera::first_person(
            Vector3::new(0.0, 0.0, 2.0),
            Vector3::new(0.0, 0.0, -1.0),
        ));
        view.set_projection(800, 600);
        assert!(view.proj.y.y < 0.0);
    }

    #[test]
    fn update_lights_collects_enabled_scene_lights() {
        let mesh = ShapeCache::new().sphere(1);
        let mut lamp = Item::new(&mesh);
        lamp.translate(0.0, 2.0, 0.0).illuminate(1.0, 0.1, 0.5);
        let mut dark = Item::new(&mesh);
        dark.illuminate(1.0, 0.1, 0.5);
        dark.light_mut().unwrap().on = false;

        let mut group = crate::gfx::scene::Group::new();
        group.add(lamp);
        group.add(dark);
        let scene = Node::Group(group);

        let mut view = View::new(Camera::first_person(
            Vector3::new(0.0, 0.0, 2.0),
            Vector3::new(0.0, 0.0, -1.0),
        ));
        view.add_light(Light::directional(
            Vector3::new(0.8, 0.8, 0.8),
            0.2,
            Polar::new(1.0, 20.0, 90.0),
        ));
        view.update_lights(Matrix4::identity(), Some(&scene));

        // the static light plus the one lamp which is on
        assert_eq!(view.active_lights().len(), 2);
        let lamp_light = view.active_lights()[1];
        assert!((lamp_light.pos.y - 2.0).abs() < EPS);
        assert_eq!(lamp_light.pos.w, 0.5);
    }

    #[test]
    fn draw_visits_every_enabled_item() {
        let mut shapes = ShapeCache::new();
        let mut group = crate::gfx::scene::Group::new();
        group.add(Item::new(&shapes.cube()));
        group.add(Item::new(&shapes.plane()));
        let mut hidden = Item::new(&shapes.cube());
        hidden.enable(false);
        group.add(hidden);
        let scene = Node::Group(group);

        let mut view = View::new(Camera::first_person(
            Vector3::new(0.0, 0.0, 2.0),
            Vector3::new(0.0, 0.0, -1.0),
        ));
        view.set_projection(640, 480);
        let world = view.view_matrix();
        view.update_lights(world, Some(&scene));

        let mut gl = NullBackend::new();
        let mut cache = ResourceCache::new("assets");
        view.draw(world, &scene, &mut gl, &mut cache);
        assert_eq!(gl.draws.len(), 2);
    }
}
