//! Procedural shape generation.
//!
//! Shapes are unit sized, centred on the origin and generated once per
//! parameterisation: the [`ShapeCache`] hands out clones which share the
//! built geometry but own their materials, so callers restyle instances
//! freely without touching the cached original.

use std::collections::HashMap;
use std::f32::consts::PI;

use cgmath::{InnerSpace, Vector2, Vector3};

use crate::math::Polar;

use super::{El, Mesh};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ShapeKey {
    Point(u32),
    Plane,
    Cube,
    Prism,
    Circle(u32),
    Cylinder(u32),
    Cone(u32),
    Icosahedron,
    Sphere(u32),
}

/// Cache of generated shapes keyed by shape and parameterisation.
#[derive(Default)]
pub struct ShapeCache {
    cache: HashMap<ShapeKey, Mesh>,
    generated: usize,
}

impl ShapeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of generator runs so far; cache hits do not regenerate.
    pub fn generation_count(&self) -> usize {
        self.generated
    }

    fn entry(&mut self, key: ShapeKey, generate: fn() -> Mesh) -> Mesh {
        if let Some(m) = self.cache.get(&key) {
            return m.clone();
        }
        self.generated += 1;
        let m = generate();
        self.cache.insert(key, m.clone());
        m
    }

    fn entry_n(&mut self, key: ShapeKey, n: u32, generate: fn(u32) -> Mesh) -> Mesh {
        if let Some(m) = self.cache.get(&key) {
            return m.clone();
        }
        self.generated += 1;
        let m = generate(n);
        self.cache.insert(key, m.clone());
        m
    }

    /// A zero dimensional point, emulated with a camera-facing quad drawn
    /// by the point-sprite program at the given pixel size.
    pub fn point(&mut self, point_size: u32) -> Mesh {
        assert!(point_size > 0, "point size must be > 0");
        self.entry_n(ShapeKey::Point(point_size), point_size, gen_point)
    }

    /// Flat unit square in the xz plane facing +y.
    pub fn plane(&mut self) -> Mesh {
        self.entry(ShapeKey::Plane, gen_plane)
    }

    /// Axis-aligned cube with unit sides.
    pub fn cube(&mut self) -> Mesh {
        self.entry(ShapeKey::Cube, gen_cube)
    }

    /// Triangular prism with a unit square base in the xz plane.
    pub fn prism(&mut self) -> Mesh {
        self.entry(ShapeKey::Prism, gen_prism)
    }

    /// Flat circular fan in the xz plane with the given segment count.
    pub fn circle(&mut self, segments: u32) -> Mesh {
        self.entry_n(ShapeKey::Circle(segments), segments, gen_circle)
    }

    /// Unit diameter, unit height cylinder aligned with the y axis.
    pub fn cylinder(&mut self, segments: u32) -> Mesh {
        self.entry_n(ShapeKey::Cylinder(segments), segments, gen_cylinder)
    }

    /// Unit diameter, unit height cone. Eight segments or fewer get flat
    /// per-face normals; more get smooth per-vertex ones.
    pub fn cone(&mut self, segments: u32) -> Mesh {
        self.entry_n(ShapeKey::Cone(segments), segments, gen_cone)
    }

    /// Icosahedron inscribed in a sphere of unit diameter.
    pub fn icosahedron(&mut self) -> Mesh {
        self.entry(ShapeKey::Icosahedron, gen_icosahedron)
    }

    /// Unit diameter sphere made by recursively subdividing the
    /// icosahedron; each level replaces every triangle with four.
    pub fn sphere(&mut self, recursion_level: u32) -> Mesh {
        self.entry_n(ShapeKey::Sphere(recursion_level), recursion_level, gen_sphere)
    }
}

fn gen_point(point_size: u32) -> Mesh {
    let mut m = Mesh::new();
    m.point_size = point_size;
    m.add_vertex(-0.5, -0.5, 0.0);
    m.add_vertex(-0.5, 0.5, 0.0);
    m.add_vertex(0.5, 0.5, 0.0);
    m.add_vertex(0.5, -0.5, 0.0);
    m.add_tex_coord(0.0, 0.0);
    m.add_tex_coord(0.0, 1.0);
    m.add_tex_coord(1.0, 1.0);
    m.add_tex_coord(1.0, 0.0);
    m.add_normal(0.0, 0.0, 1.0);
    m.add_face_quad(El::new(4, 1, 1), El::new(3, 2, 1), El::new(2, 3, 1), El::new(1, 4, 1));
    m.build_default();
    m
}

fn gen_plane() -> Mesh {
    let mut m = Mesh::new();
    m.add_vertex(-0.5, 0.0, -0.5);
    m.add_vertex(-0.5, 0.0, 0.5);
    m.add_vertex(0.5, 0.0, 0.5);
    m.add_vertex(0.5, 0.0, -0.5);
    m.add_tex_coord(0.0, 0.0);
    m.add_tex_coord(0.0, 1.0);
    m.add_tex_coord(1.0, 1.0);
    m.add_tex_coord(1.0, 0.0);
    m.add_normal(0.0, 1.0, 0.0);
    m.add_face_quad(El::new(1, 1, 1), El::new(2, 2, 1), El::new(3, 3, 1), El::new(4, 4, 1));
    m.build_default();
    m
}

fn gen_cube() -> Mesh {
    let mut m = Mesh::new();
    m.add_vertex(-0.5, 0.5, -0.5);
    m.add_vertex(-0.5, 0.5, 0.5);
    m.add_vertex(0.5, 0.5, 0.5);
    m.add_vertex(0.5, 0.5, -0.5);
    m.add_vertex(-0.5, -0.5, -0.5);
    m.add_vertex(-0.5, -0.5, 0.5);
    m.add_vertex(0.5, -0.5, 0.5);
    m.add_vertex(0.5, -0.5, -0.5);
    m.add_tex_coord(0.0, 0.0);
    m.add_tex_coord(0.0, 1.0);
    m.add_tex_coord(1.0, 1.0);
    m.add_tex_coord(1.0, 0.0);
    m.add_normal(0.0, 1.0, 0.0);
    m.add_normal(-1.0, 0.0, 0.0);
    m.add_normal(1.0, 0.0, 0.0);
    m.add_normal(0.0, 0.0, -1.0);
    m.add_normal(0.0, 0.0, 1.0);
    m.add_normal(0.0, -1.0, 0.0);
    m.add_face_quad(El::new(1, 1, 1), El::new(2, 2, 1), El::new(3, 3, 1), El::new(4, 4, 1));
    m.add_face_quad(El::new(1, 1, 2), El::new(5, 2, 2), El::new(6, 3, 2), El::new(2, 4, 2));
    m.add_face_quad(El::new(3, 1, 3), El::new(7, 2, 3), El::new(8, 3, 3), El::new(4, 4, 3));
    m.add_face_quad(El::new(4, 1, 4), El::new(8, 2, 4), El::new(5, 3, 4), El::new(1, 4, 4));
    m.add_face_quad(El::new(2, 1, 5), El::new(6, 2, 5), El::new(7, 3, 5), El::new(3, 4, 5));
    m.add_face_quad(El::new(6, 1, 6), El::new(5, 2, 6), El::new(8, 3, 6), El::new(7, 4, 6));
    m.build_default();
    m
}

fn gen_prism() -> Mesh {
    let mut m = Mesh::new();
    let h = 3.0f32.sqrt() / 2.0;
    m.add_vertex(-0.5, -h / 2.0, -0.5);
    m.add_vertex(-0.5, -h / 2.0, 0.5);
    m.add_vertex(0.5, -h / 2.0, 0.5);
    m.add_vertex(0.5, -h / 2.0, -0.5);
    m.add_vertex(-0.5, h / 2.0, 0.0);
    m.add_vertex(0.5, h / 2.0, 0.0);
    m.add_tex_coord(0.0, 0.0);
    m.add_tex_coord(0.0, 1.0);
    m.add_tex_coord(1.0, 1.0);
    m.add_tex_coord(1.0, 0.0);
    m.add_tex_coord(0.5, 0.0);
    m.add_normal(0.0, -1.0, 0.0);
    m.add_normal(0.0, 0.5, -h);
    m.add_normal(0.0, 0.5, h);
    m.add_normal(-1.0, 0.0, 0.0);
    m.add_normal(1.0, 0.0, 0.0);
    // base
    m.add_face_quad(El::new(2, 1, 1), El::new(1, 2, 1), El::new(4, 3, 1), El::new(3, 4, 1));
    // sides
    m.add_face_quad(El::new(1, 3, 2), El::new(5, 4, 2), El::new(6, 1, 2), El::new(4, 2, 2));
    m.add_face_quad(El::new(3, 3, 3), El::new(6, 4, 3), El::new(5, 1, 3), El::new(2, 2, 3));
    // ends
    m.add_face(El::new(2, 3, 4), El::new(5, 5, 4), El::new(1, 2, 4));
    m.add_face(El::new(4, 3, 5), El::new(6, 5, 5), El::new(3, 2, 5));
    m.build_default();
    m
}

fn circle_points(segments: u32) -> Vec<Vector2<f32>> {
    (0..segments)
        .map(|i| {
            let angle = 2.0 * PI * i as f32 / segments as f32;
            Vector2::new(angle.cos(), angle.sin())
        })
        .collect()
}

/// Build a disc fan around a centre vertex in the xz plane, then clear the
/// pending pools ready for the next batch.
fn add_disc(m: &mut Mesh, pts: &[Vector2<f32>], y: f32, y_normal: f32) {
    m.add_normal(0.0, y_normal, 0.0);
    m.add_vertex(0.0, y, 0.0);
    m.add_tex_coord(0.5, 0.5);
    let centre = El::new(1, 1, 1);
    for (ix, pt) in pts.iter().enumerate() {
        let (x, z) = (0.5 * pt.x, 0.5 * pt.y);
        m.add_vertex(x, y, z);
        m.add_tex_coord(0.5 + x, 0.5 + y_normal * z);
        // the first segment closes the fan against the last rim vertex,
        // resolved relative to the pool end at build time
        let prev = if ix == 0 { -1 } else { ix as i32 + 1 };
        let this = ix as i32 + 2;
        if y_normal < 0.0 {
            m.add_face(centre, El::new(prev, prev, 1), El::new(this, this, 1));
        } else {
            m.add_face(centre, El::new(this, this, 1), El::new(prev, prev, 1));
        }
    }
    m.build_default();
    m.clear();
}

fn gen_circle(segments: u32) -> Mesh {
    let mut m = Mesh::new();
    let pts = circle_points(segments);
    add_disc(&mut m, &pts, 0.0, 1.0);
    m
}

fn gen_cylinder(segments: u32) -> Mesh {
    let mut m = Mesh::new();
    // ends
    let pts = circle_points(segments);
    add_disc(&mut m, &pts, 0.5, 1.0);
    add_disc(&mut m, &pts, -0.5, -1.0);
    // sides
    for (i, pt) in pts.iter().enumerate() {
        let tx = 3.0 * (1.0 - i as f32 / segments as f32);
        m.add_normal(pt.x, 0.0, pt.y);
        m.add_vertex(0.5 * pt.x, -0.5, 0.5 * pt.y);
        m.add_vertex(0.5 * pt.x, 0.5, 0.5 * pt.y);
        m.add_tex_coord(tx, 1.0);
        m.add_tex_coord(tx, 0.0);
        if i > 0 {
            let i = i as i32;
            m.add_face_quad(
                El::new(2 * i - 1, 2 * i - 1, i),
                El::new(2 * i, 2 * i, i),
                El::new(2 * i + 2, 2 * i + 2, i + 1),
                El::new(2 * i + 1, 2 * i + 1, i + 1),
            );
        }
    }
    // close the cylinder
    m.add_tex_coord(0.0, 1.0);
    m.add_tex_coord(0.0, 0.0);
    m.add_face_quad(
        El::new(-2, -3, -1),
        El::new(-1, -4, -1),
        El::new(2, -2, 1),
        El::new(1, -1, 1),
    );
    m.build_default();
    m
}

fn gen_cone(segments: u32) -> Mesh {
    let mut m = Mesh::new();
    // base
    let pts = circle_points(segments);
    add_disc(&mut m, &pts, -0.5, -1.0);
    m.add_tex_coord(1.0, 1.0);
    m.add_tex_coord(0.0, 1.0);
    // top
    m.add_vertex(0.0, 0.5, 0.0);
    m.add_tex_coord(0.5, 0.0);
    // sides
    let n = 1.0 / 2.0f32.sqrt();
    let pts = circle_points(2 * segments);
    for i in 0..segments as i32 {
        let iu = i as usize;
        m.add_normal(n * pts[2 * iu + 1].x, n, n * pts[2 * iu + 1].y);
        m.add_vertex(0.5 * pts[2 * iu].x, -0.5, 0.5 * pts[2 * iu].y);
        if segments <= 8 {
            // normal for each face
            if i > 0 {
                m.add_face(El::new(i + 1, 1, i), El::new(1, 3, i), El::new(i + 2, 2, i));
            }
        } else {
            let tx = 2.0 * (1.0 - i as f32 / segments as f32);
            m.add_tex_coord(tx, 1.0);
            m.add_tex_coord(tx, 0.0);
            // normal for each vertex to make this smooth
            m.add_normal(n * pts[2 * iu].x, n, n * pts[2 * iu].y);
            if i > 0 {
                m.add_face(
                    El::new(i + 1, 2 * i + 2, 2 * i),
                    El::new(1, 2 * i + 3, 2 * i - 1),
                    El::new(i + 2, 2 * i + 4, 2 * i + 2),
                );
            }
        }
    }
    // close the surface
    if segments <= 8 {
        m.add_face(El::new(-1, 1, -1), El::new(1, 3, -1), El::new(2, 2, -1));
    } else {
        m.add_face(El::new(-1, -2, -1), El::new(1, -1, -1), El::new(2, 2, 1));
    }
    m.build_default();
    m
}

/// Add a vertex on the surface of the unit-diameter sphere, with its normal
/// and a polar texture mapping. Returns the 0-based index.
fn add_sphere_vertex(m: &mut Mesh, x: f32, y: f32, z: f32) -> i32 {
    let v = Vector3::new(x, y, z).normalize();
    let polar = Polar::from_vec3(v);
    let index = m.add_vertex(v.x / 2.0, v.y / 2.0, v.z / 2.0) as i32 - 1;
    m.add_normal(v.x, v.y, v.z);
    m.add_tex_coord(1.0 + polar.phi / 180.0, polar.theta / 180.0);
    index
}

/// The 12 vertices and 20 faces of the icosahedron, 0-based.
fn icosahedron_base(m: &mut Mesh) -> Vec<[i32; 3]> {
    let t = (1.0 + 5.0f32.sqrt()) / 2.0;
    add_sphere_vertex(m, -1.0, t, 0.0);
    add_sphere_vertex(m, 1.0, t, 0.0);
    add_sphere_vertex(m, -1.0, -t, 0.0);
    add_sphere_vertex(m, 1.0, -t, 0.0);
    add_sphere_vertex(m, 0.0, -1.0, t);
    add_sphere_vertex(m, 0.0, 1.0, t);
    add_sphere_vertex(m, 0.0, -1.0, -t);
    add_sphere_vertex(m, 0.0, 1.0, -t);
    add_sphere_vertex(m, t, 0.0, -1.0);
    add_sphere_vertex(m, t, 0.0, 1.0);
    add_sphere_vertex(m, -t, 0.0, -1.0);
    add_sphere_vertex(m, -t, 0.0, 1.0);
    vec![
        [0, 5, 11],
        [0, 1, 5],
        [0, 7, 1],
        [0, 10, 7],
        [0, 11, 10],
        [1, 9, 5],
        [5, 4, 11],
        [11, 2, 10],
        [10, 6, 7],
        [7, 8, 1],
        [3, 4, 9],
        [3, 2, 4],
        [3, 6, 2],
        [3, 8, 6],
        [3, 9, 8],
        [4, 5, 9],
        [2, 11, 4],
        [6, 10, 2],
        [8, 7, 6],
        [9, 1, 8],
    ]
}

fn add_element_triangles(m: &mut Mesh, faces: &[[i32; 3]]) {
    for face in faces {
        let (i1, i2, i3) = (face[0] + 1, face[1] + 1, face[2] + 1);
        m.add_face(El::new(i1, i1, i1), El::new(i3, i3, i3), El::new(i2, i2, i2));
    }
}

fn gen_icosahedron() -> Mesh {
    let mut m = Mesh::new();
    let faces = icosahedron_base(&mut m);
    add_element_triangles(&mut m, &faces);
    m.build_default();
    m
}

fn gen_sphere(recursion_level: u32) -> Mesh {
    let mut m = Mesh::new();
    let mut faces = icosahedron_base(&mut m);
    let mut midpoints: HashMap<(i32, i32), i32> = HashMap::new();
    for _ in 0..recursion_level {
        let mut next = Vec::with_capacity(faces.len() * 4);
        for tri in &faces {
            let a = middle_point(&mut m, &mut midpoints, tri[0], tri[1]);
            let b = middle_point(&mut m, &mut midpoints, tri[1], tri[2]);
            let c = middle_point(&mut m, &mut midpoints, tri[2], tri[0]);
            next.push([tri[0], a, c]);
            next.push([tri[1], b, a]);
            next.push([tri[2], c, b]);
            next.push([a, b, c]);
        }
        faces = next;
    }
    add_element_triangles(&mut m, &faces);
    m.build_default();
    m
}

/// New vertex midway between two existing ones, re-normalised onto the
/// sphere surface; cached per edge so shared edges subdivide once.
fn middle_point(m: &mut Mesh, cache: &mut HashMap<(i32, i32), i32>, p0: i32, p1: i32) -> i32 {
    let key = if p1 < p0 { (p1, p0) } else { (p0, p1) };
    if let Some(&index) = cache.get(&key) {
        return index;
    }
    let middle = m.vertices[p0 as usize] + m.vertices[p1 as usize];
    let index = add_sphere_vertex(m, middle.x, middle.y, middle.z);
    cache.insert(key, index);
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::material::ShaderKind;

    #[test]
    fn generators_run_once_per_parameterisation() {
        let mut shapes = ShapeCache::new();
        let a = shapes.cylinder(36);
        let b = shapes.cylinder(36);
        assert_eq!(shapes.generation_count(), 1);
        assert_eq!(a.vertex_count(), b.vertex_count());
        assert_eq!(a.index_count(), b.index_count());
        shapes.cylinder(24);
        assert_eq!(shapes.generation_count(), 2);
    }

    #[test]
    fn cube_has_a_record_per_corner_per_face() {
        let mut shapes = ShapeCache::new();
        let cube = shapes.cube();
        assert_eq!(cube.vertex_count(), 24);
        assert_eq!(cube.index_count(), 36);
        assert_eq!(cube.group_count(), 1);
    }

    #[test]
    fn plane_dedups_to_four_vertices() {
        let mut shapes = ShapeCache::new();
        let plane = shapes.plane();
        assert_eq!(plane.vertex_count(), 4);
        assert_eq!(plane.index_count(), 6);
    }

    #[test]
    fn icosahedron_shares_vertices_across_faces() {
        let mut shapes = ShapeCache::new();
        let ico = shapes.icosahedron();
        assert_eq!(ico.vertex_count(), 12);
        assert_eq!(ico.index_count(), 20 * 3);
    }

    #[test]
    fn sphere_subdivision_quadruples_faces() {
        let mut shapes = ShapeCache::new();
        let sphere = shapes.sphere(1);
        // 12 original vertices plus one midpoint per icosahedron edge
        assert_eq!(sphere.vertex_count(), 12 + 30);
        assert_eq!(sphere.index_count(), 80 * 3);
        let sphere2 = shapes.sphere(2);
        assert_eq!(sphere2.index_count(), 320 * 3);
    }

    #[test]
    fn cylinder_builds_caps_and_side_groups() {
        let mut shapes = ShapeCache::new();
        let cyl = shapes.cylinder(12);
        assert_eq!(cyl.group_count(), 3);
    }

    #[test]
    fn cone_faceting_depends_on_segment_count() {
        fn side_normals(m: &Mesh) -> usize {
            let vdata = m.vdata.lock().unwrap();
            let mut normals: Vec<[u32; 3]> = vdata
                .chunks_exact(crate::gfx::material::shaders::VERTEX_SIZE)
                .filter(|rec| rec[4] > 0.0 && rec[4] < 1.0)
                .map(|rec| [rec[3].to_bits(), rec[4].to_bits(), rec[5].to_bits()])
                .collect();
            normals.sort();
            normals.dedup();
            normals.len()
        }
        let mut shapes = ShapeCache::new();
        // flat: one normal per side face
        assert_eq!(side_normals(&shapes.cone(6)), 6);
        // smooth: two normals per segment
        assert_eq!(side_normals(&shapes.cone(12)), 24);
    }

    #[test]
    fn point_sprites_use_the_point_material() {
        let mut shapes = ShapeCache::new();
        let pt = shapes.point(4);
        assert_eq!(pt.point_size(), 4);
        assert_eq!(pt.vertex_count(), 4);
        assert_eq!(pt.material().unwrap().kind(), ShaderKind::Point);
    }
}
