//! Retained scene graph.
//!
//! A scene is a tree of [`Node`]s: [`Group`]s hold children and a local
//! transform, [`Item`]s wrap one mesh. Traversal passes the accumulated
//! transform down by argument; nothing is stored back on the nodes, and a
//! disabled node hides its whole subtree.
//!
//! Transforms carry the 4x4 matrix together with the cumulative scale
//! vector because translation is specified in pre-scale units: a
//! `scale(2,2,2)` followed by `translate(1,0,0)` still moves the node one
//! world unit, so chained calls compose predictably.

pub mod view;

use cgmath::{Deg, ElementWise, InnerSpace, Matrix4, SquareMatrix, Vector3, Zero};

use crate::gfx::material::Material;
use crate::gfx::mesh::Mesh;

pub use view::{ArcBall, Camera, FirstPerson, Light, View};

/// A transformation matrix combined with the cumulative scale factors
/// applied so far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub matrix: Matrix4<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Transform::identity()
    }
}

impl Transform {
    pub fn new(matrix: Matrix4<f32>) -> Self {
        Transform {
            matrix,
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn identity() -> Self {
        Transform::new(Matrix4::identity())
    }

    /// Compose a child's local transform onto this one.
    fn then(&self, local: &Transform) -> Transform {
        Transform {
            matrix: self.matrix * local.matrix,
            scale: self.scale.mul_element_wise(local.scale),
        }
    }

    fn apply_scale(&mut self, sx: f32, sy: f32, sz: f32) {
        self.matrix = self.matrix * Matrix4::from_nonuniform_scale(sx, sy, sz);
        self.scale = self.scale.mul_element_wise(Vector3::new(sx, sy, sz));
    }

    fn apply_translate(&mut self, tx: f32, ty: f32, tz: f32) {
        // divide by the cumulative scale so the caller moves in world units
        self.matrix = self.matrix
            * Matrix4::from_translation(Vector3::new(
                tx / self.scale.x,
                ty / self.scale.y,
                tz / self.scale.z,
            ));
    }

    fn apply_rotate(&mut self, degrees: f32, axis: Vector3<f32>) {
        self.matrix = self.matrix * Matrix4::from_axis_angle(axis.normalize(), Deg(degrees));
    }
}

/// A node in the scene tree.
#[derive(Clone)]
pub enum Node {
    Group(Group),
    Item(Item),
}

impl From<Group> for Node {
    fn from(g: Group) -> Node {
        Node::Group(g)
    }
}

impl From<Item> for Node {
    fn from(i: Item) -> Node {
        Node::Item(i)
    }
}

macro_rules! delegate {
    ($self:ident, $node:ident => $body:expr) => {
        match $self {
            Node::Group($node) => $body,
            Node::Item($node) => $body,
        }
    };
}

impl Node {
    /// Call the visitor for every enabled item under this node, passing the
    /// accumulated transform.
    pub fn visit(&self, parent: &Transform, visitor: &mut dyn FnMut(&Item, &Transform)) {
        delegate!(self, n => n.visit(parent, visitor))
    }

    pub fn scale(&mut self, sx: f32, sy: f32, sz: f32) -> &mut Self {
        delegate!(self, n => { n.scale(sx, sy, sz); });
        self
    }

    pub fn translate(&mut self, tx: f32, ty: f32, tz: f32) -> &mut Self {
        delegate!(self, n => { n.translate(tx, ty, tz); });
        self
    }

    pub fn rotate(&mut self, degrees: f32, axis: Vector3<f32>) -> &mut Self {
        delegate!(self, n => { n.rotate(degrees, axis); });
        self
    }

    pub fn rotate_x(&mut self, degrees: f32) -> &mut Self {
        self.rotate(degrees, Vector3::unit_x())
    }

    pub fn rotate_y(&mut self, degrees: f32) -> &mut Self {
        self.rotate(degrees, Vector3::unit_y())
    }

    pub fn rotate_z(&mut self, degrees: f32) -> &mut Self {
        self.rotate(degrees, Vector3::unit_z())
    }

    pub fn enabled(&self) -> bool {
        delegate!(self, n => n.enabled())
    }

    pub fn enable(&mut self, on: bool) -> &mut Self {
        delegate!(self, n => { n.enable(on); });
        self
    }

    pub fn set_material(&mut self, mtl: Material) -> &mut Self {
        delegate!(self, n => { n.set_material(mtl); });
        self
    }
}

/// Container node: an ordered set of children under one local transform.
#[derive(Clone)]
pub struct Group {
    transform: Transform,
    children: Vec<Node>,
    enabled: bool,
}

impl Default for Group {
    fn default() -> Self {
        Group::new()
    }
}

impl Group {
    pub fn new() -> Group {
        Group {
            transform: Transform::identity(),
            children: Vec::new(),
            enabled: true,
        }
    }

    /// Append a child node.
    pub fn add(&mut self, child: impl Into<Node>) -> &mut Self {
        self.children.push(child.into());
        self
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child_mut(&mut self, index: usize) -> &mut Node {
        &mut self.children[index]
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn visit(&self, parent: &Transform, visitor: &mut dyn FnMut(&Item, &Transform)) {
        if !self.enabled {
            return;
        }
        let trans = parent.then(&self.transform);
        for child in &self.children {
            child.visit(&trans, visitor);
        }
    }

    pub fn scale(&mut self, sx: f32, sy: f32, sz: f32) -> &mut Self {
        self.transform.apply_scale(sx, sy, sz);
        self
    }

    pub fn translate(&mut self, tx: f32, ty: f32, tz: f32) -> &mut Self {
        self.transform.apply_translate(tx, ty, tz);
        self
    }

    pub fn rotate(&mut self, degrees: f32, axis: Vector3<f32>) -> &mut Self {
        self.transform.apply_rotate(degrees, axis);
        self
    }

    pub fn rotate_x(&mut self, degrees: f32) -> &mut Self {
        self.rotate(degrees, Vector3::unit_x())
    }

    pub fn rotate_y(&mut self, degrees: f32) -> &mut Self {
        self.rotate(degrees, Vector3::unit_y())
    }

    pub fn rotate_z(&mut self, degrees: f32) -> &mut Self {
        self.rotate(degrees, Vector3::unit_z())
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self, on: bool) -> &mut Self {
        self.enabled = on;
        self
    }

    /// Update the material on every item in the subtree.
    pub fn set_material(&mut self, mtl: Material) -> &mut Self {
        for child in &mut self.children {
            child.set_material(mtl.clone());
        }
        self
    }
}

/// Leaf node: one mesh instance with its own transform, materials and an
/// optional attached point light.
///
/// The mesh geometry is shared with every other instance wrapping the same
/// mesh; the materials are this item's own, so restyling one instance never
/// leaks into the others. Cloning keeps that split.
#[derive(Clone)]
pub struct Item {
    transform: Transform,
    mesh: Mesh,
    light: Option<Light>,
    lit_materials: Option<(Material, Material)>,
    tex_scale: f32,
    enabled: bool,
}

impl Item {
    pub fn new(mesh: &Mesh) -> Item {
        Item {
            transform: Transform::identity(),
            mesh: mesh.clone(),
            light: None,
            lit_materials: None,
            tex_scale: 1.0,
            enabled: true,
        }
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn material(&self) -> Option<&Material> {
        self.mesh.material()
    }

    pub fn tex_scale(&self) -> f32 {
        self.tex_scale
    }

    /// Adjust the relative texture scaling.
    pub fn texture_scale(&mut self, scale: f32) -> &mut Self {
        self.tex_scale *= scale;
        self
    }

    /// Attach a point light whose position follows this item's accumulated
    /// transform. While the light is on the item draws with the emissive
    /// material, so the fixture itself appears to glow.
    pub fn illuminate(&mut self, intensity: f32, ambient: f32, attenuation: f32) -> &mut Self {
        let base = match self.mesh.material() {
            Some(mtl) => mtl.clone(),
            None => Material::diffuse(),
        };
        let color = base.color().truncate() * intensity;
        self.light = Some(Light::point(color, ambient, Vector3::zero(), attenuation));
        self.lit_materials = Some((base, Material::emissive()));
        self
    }

    pub fn light(&self) -> Option<&Light> {
        self.light.as_ref()
    }

    pub fn light_mut(&mut self) -> Option<&mut Light> {
        self.light.as_mut()
    }

    /// Material override in effect this frame: the emissive stand-in while
    /// an attached light is on, the saved base material otherwise.
    pub fn current_material(&self) -> Option<&Material> {
        match (&self.light, &self.lit_materials) {
            (Some(light), Some((off, on))) => Some(if light.on { on } else { off }),
            _ => None,
        }
    }

    pub fn visit(&self, parent: &Transform, visitor: &mut dyn FnMut(&Item, &Transform)) {
        if !self.enabled {
            return;
        }
        let trans = parent.then(&self.transform);
        visitor(self, &trans);
    }

    pub fn scale(&mut self, sx: f32, sy: f32, sz: f32) -> &mut Self {
        self.transform.apply_scale(sx, sy, sz);
        self
    }

    pub fn translate(&mut self, tx: f32, ty: f32, tz: f32) -> &mut Self {
        self.transform.apply_translate(tx, ty, tz);
        self
    }

    pub fn rotate(&mut self, degrees: f32, axis: Vector3<f32>) -> &mut Self {
        self.transform.apply_rotate(degrees, axis);
        self
    }

    pub fn rotate_x(&mut self, degrees: f32) -> &mut Self {
        self.rotate(degrees, Vector3::unit_x())
    }

    pub fn rotate_y(&mut self, degrees: f32) -> &mut Self {
        self.rotate(degrees, Vector3::unit_y())
    }

    pub fn rotate_z(&mut self, degrees: f32) -> &mut Self {
        self.rotate(degrees, Vector3::unit_z())
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self, on: bool) -> &mut Self {
        self.enabled = on;
        self
    }

    pub fn set_material(&mut self, mtl: Material) -> &mut Self {
        self.mesh.set_material(mtl);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::material::ShaderKind;
    use crate::gfx::mesh::shapes::ShapeCache;
    use cgmath::Vector4;

    const EPS: f32 = 1e-5;

    fn test_mesh() -> Mesh {
        ShapeCache::new().cube()
    }

    #[test]
    fn translate_after_scale_moves_in_world_units() {
        let mesh = test_mesh();
        let mut item = Item::new(&mesh);
        item.scale(2.0, 2.0, 2.0).translate(1.0, 0.0, 0.0);
        let w = item.transform().matrix.w;
        assert_eq!(Vector4::new(1.0, 0.0, 0.0, 1.0), w);
    }

    #[test]
    fn visit_accumulates_matrices_and_scales() {
        let mesh = test_mesh();
        let mut group = Group::new();
        group.scale(2.0, 2.0, 2.0);
        let mut item = Item::new(&mesh);
        item.translate(1.0, 0.0, 0.0);
        group.add(item);

        let mut seen = Vec::new();
        group.visit(&Transform::identity(), &mut |_, t| seen.push(*t));
        assert_eq!(seen.len(), 1);
        // the item's one-unit move stretches to two world units under the
        // group's scale
        assert!((seen[0].matrix.w.x - 2.0).abs() < EPS);
        assert_eq!(seen[0].scale, Vector3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn disabled_nodes_hide_their_subtree() {
        let mesh = test_mesh();
        let mut inner = Group::new();
        inner.add(Item::new(&mesh));
        inner.enable(false);
        let mut outer = Group::new();
        outer.add(inner);
        outer.add(Item::new(&mesh));

        let mut count = 0;
        outer.visit(&Transform::identity(), &mut |_, _| count += 1);
        assert_eq!(count, 1);

        let mut item = Item::new(&mesh);
        item.enable(false);
        let mut visited = false;
        item.visit(&Transform::identity(), &mut |_, _| visited = true);
        assert!(!visited);
    }

    #[test]
    fn children_visit_in_insertion_order() {
        let mesh = test_mesh();
        let mut group = Group::new();
        for i in 0..3 {
            let mut item = Item::new(&mesh);
            item.translate(i as f32, 0.0, 0.0);
            group.add(item);
        }
        let mut xs = Vec::new();
        group.visit(&Transform::identity(), &mut |_, t| xs.push(t.matrix.w.x));
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn item_clones_share_geometry_and_own_materials() {
        let mesh = test_mesh();
        let item = Item::new(&mesh);
        let mut copy = item.clone();
        copy.set_material(Material::emissive());
        assert_eq!(item.material().unwrap().kind(), ShaderKind::Diffuse);
        assert_eq!(copy.material().unwrap().kind(), ShaderKind::Emissive);
        assert_eq!(copy.mesh().vertex_count(), item.mesh().vertex_count());
    }

    #[test]
    fn group_clone_is_deep() {
        let mesh = test_mesh();
        let mut group = Group::new();
        group.add(Item::new(&mesh));
        let mut copy = group.clone();
        copy.set_material(Material::unshaded());
        let original = match &group.children()[0] {
            Node::Item(item) => item.material().unwrap().kind(),
            _ => unreachable!(),
        };
        assert_eq!(original, ShaderKind::Diffuse);
    }

    #[test]
    fn attached_light_swaps_to_emissive_while_on() {
        let mesh = test_mesh();
        let mut item = Item::new(&mesh);
        item.illuminate(2.0, 0.1, 0.5);
        assert_eq!(
            item.current_material().unwrap().kind(),
            ShaderKind::Emissive
        );
        item.light_mut().unwrap().on = false;
        assert_eq!(item.current_material().unwrap().kind(), ShaderKind::Diffuse);
    }

    #[test]
    fn rotation_composes_into_the_local_matrix() {
        let mesh = test_mesh();
        let mut item = Item::new(&mesh);
        item.rotate_y(90.0);
        // +x maps to -z under a 90 degree yaw
        let v = item.transform().matrix * Vector4::new(1.0, 0.0, 0.0, 0.0);
        assert!((v.x - 0.0).abs() < EPS);
        assert!((v.z + 1.0).abs() < EPS);
    }
}
