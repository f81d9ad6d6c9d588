//! Indexed triangle meshes.
//!
//! A [`Mesh`] is built in two phases. First, attribute pools are filled
//! with [`Mesh::add_vertex`]/[`Mesh::add_normal`]/[`Mesh::add_tex_coord`]
//! and faces are added as index tuples ([`El`]); faces without explicit
//! normals get them synthesised, flat or smoothed depending on the current
//! smoothing window. [`Mesh::build`] then resolves every face element into
//! an interleaved vertex record, deduplicates the records into a vertex
//! buffer shared by all of the mesh's render groups, and closes a new group
//! tagged with a material.
//!
//! Built data is append-only and shared between clones; backend buffers are
//! created lazily on first draw and cached per winding. [`Mesh::invert`]
//! returns a flipped-inside-out copy for room interiors and skyboxes.

pub mod loader;
pub mod shapes;

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use cgmath::{InnerSpace, Vector2, Vector3, Zero};
use log::debug;

use crate::backend::{BufferId, BufferKind, ProgramId, RenderBackend, Winding};
use crate::gfx::material::shaders::VERTEX_SIZE;
use crate::gfx::material::{Material, Program, ResourceCache};

/// Smoothing window applied until the first `set_normal_smoothing` call:
/// effectively "share normals across all faces".
const DEFAULT_WINDOW: usize = 9999;

/// Texture-space area below which a triangle gets no tangent.
const TANGENT_EPS: f32 = 1e-6;

/// A face element: 1-based indices into the attribute pools.
///
/// Negative indices count back from the end of the pool at resolution time.
/// Zero is legal for `tex` and `tang` ("no texture coordinate / tangent")
/// and for `norm` it requests normal synthesis for the whole face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct El {
    pub vert: i32,
    pub tex: i32,
    pub norm: i32,
    pub tang: i32,
}

impl El {
    pub fn new(vert: i32, tex: i32, norm: i32) -> Self {
        El {
            vert,
            tex,
            norm,
            tang: 0,
        }
    }
}

#[derive(Debug)]
struct MeshGroup {
    mtl: Material,
    edata: Arc<Vec<u32>>,
    earray: Cell<Option<BufferId>>,
}

impl Clone for MeshGroup {
    fn clone(&self) -> Self {
        MeshGroup {
            mtl: self.mtl.clone(),
            edata: Arc::clone(&self.edata),
            earray: Cell::new(self.earray.get()),
        }
    }
}

/// Mesh of deduplicated vertices with one or more material-tagged render
/// groups. See the module docs for the build lifecycle.
#[derive(Debug)]
pub struct Mesh {
    inverted: bool,
    vdata: Arc<Mutex<Vec<f32>>>,
    groups: Vec<MeshGroup>,
    varray: [Cell<Option<BufferId>>; 2],
    point_size: u32,
    // pending data, consumed by build
    vertices: Vec<Vector3<f32>>,
    normals: Vec<Vector3<f32>>,
    texcoords: Vec<Vector2<f32>>,
    tangents: Vec<Vector3<f32>>,
    elements: Vec<El>,
    faces: usize,
    ncache: NormalCache,
}

impl Default for Mesh {
    fn default() -> Self {
        Mesh::new()
    }
}

/// Clones share the built vertex/element data and backend buffers but get
/// their own copy of each group's material. Pending (unbuilt) attributes
/// are not carried over.
impl Clone for Mesh {
    fn clone(&self) -> Self {
        Mesh {
            inverted: self.inverted,
            vdata: Arc::clone(&self.vdata),
            groups: self.groups.clone(),
            varray: [
                Cell::new(self.varray[0].get()),
                Cell::new(self.varray[1].get()),
            ],
            point_size: self.point_size,
            ..Mesh::new()
        }
    }
}

impl Mesh {
    pub fn new() -> Mesh {
        Mesh {
            inverted: false,
            vdata: Arc::new(Mutex::new(Vec::new())),
            groups: Vec::new(),
            varray: [Cell::new(None), Cell::new(None)],
            point_size: 0,
            vertices: Vec::new(),
            normals: Vec::new(),
            texcoords: Vec::new(),
            tangents: Vec::new(),
            elements: Vec::new(),
            faces: 0,
            ncache: NormalCache::new(DEFAULT_WINDOW),
        }
    }

    /// Wipe the pending attribute pools. Does not touch groups which are
    /// already built; call after [`Mesh::build`] to start a separate batch
    /// of geometry sharing the same output buffers.
    pub fn clear(&mut self) -> &mut Self {
        self.vertices.clear();
        self.normals.clear();
        self.texcoords.clear();
        self.tangents.clear();
        self.elements.clear();
        self.faces = 0;
        self.ncache = NormalCache::new(DEFAULT_WINDOW);
        self
    }

    /// Append a vertex position, returning its 1-based index.
    pub fn add_vertex(&mut self, x: f32, y: f32, z: f32) -> usize {
        self.vertices.push(Vector3::new(x, y, z));
        self.vertices.len()
    }

    /// Append a vertex normal, returning its 1-based index.
    pub fn add_normal(&mut self, nx: f32, ny: f32, nz: f32) -> usize {
        self.normals.push(Vector3::new(nx, ny, nz));
        self.normals.len()
    }

    /// Append texture coordinates, returning the 1-based index.
    pub fn add_tex_coord(&mut self, tx: f32, ty: f32) -> usize {
        self.texcoords.push(Vector2::new(tx, ty));
        self.texcoords.len()
    }

    /// Append a tangent, returning its 1-based index.
    pub fn add_tangent(&mut self, tx: f32, ty: f32, tz: f32) -> usize {
        self.tangents.push(Vector3::new(tx, ty, tz));
        self.tangents.len()
    }

    /// Add a triangular face.
    pub fn add_face(&mut self, a: El, b: El, c: El) -> usize {
        self.add_face_slice(&[a, b, c])
    }

    /// Add a quad face. It is decomposed into the triangles (a,b,c) and
    /// (c,d,a) but contributes a single synthesised normal.
    pub fn add_face_quad(&mut self, a: El, b: El, c: El, d: El) -> usize {
        self.add_face_slice(&[a, b, c, d])
    }

    fn add_face_slice(&mut self, el: &[El]) -> usize {
        let expanded: Vec<El> = if el.len() == 3 {
            vec![el[0], el[1], el[2]]
        } else {
            vec![el[0], el[1], el[2], el[2], el[3], el[0]]
        };
        if el.iter().any(|e| e.norm == 0) {
            let vtx: Vec<Vector3<f32>> = el.iter().map(|e| self.vertex(e.vert)).collect();
            let normal = if el.len() == 3 {
                (vtx[1] - vtx[0]).cross(vtx[2] - vtx[0])
            } else {
                // Newell's method over the quad edges
                let mut n = Vector3::zero();
                for (i, v) in vtx.iter().enumerate() {
                    let v1 = vtx[(i + 1) % 4];
                    n += Vector3::new(
                        (v.y - v1.y) * (v.z + v1.z),
                        (v.z - v1.z) * (v.x + v1.x),
                        (v.x - v1.x) * (v.y + v1.y),
                    );
                }
                n
            };
            self.ncache
                .add(normal.normalize(), self.faces, self.elements.len(), &expanded);
        }
        self.elements.extend_from_slice(&expanded);
        self.faces += 1;
        self.elements.len()
    }

    /// Switch flat/smooth normal synthesis. Flushes the running per-vertex
    /// accumulation first, so faces on either side of the call never share
    /// a smoothing group.
    pub fn set_normal_smoothing(&mut self, on: bool) {
        self.set_smoothing_window(if on { DEFAULT_WINDOW } else { 0 });
    }

    /// Numeric variant: normals are averaged over runs of at most `faces`
    /// consecutive faces per vertex. Zero means flat shading.
    pub fn set_smoothing_window(&mut self, faces: usize) {
        self.resolve_normals();
        self.ncache = NormalCache::new(faces);
    }

    /// Process the pending data and append it to the shared vertex buffer,
    /// closing a new render group with the given material. Can be called
    /// repeatedly to add per-material groups to one mesh.
    pub fn build(&mut self, mtl: Material) {
        self.resolve_normals();
        self.ncache = NormalCache::new(DEFAULT_WINDOW);
        self.compute_tangents();
        let mut seen: HashMap<El, u32> = HashMap::new();
        let mut edata = Vec::with_capacity(self.elements.len());
        {
            let mut vdata = self.vdata.lock().unwrap();
            for i in 0..self.elements.len() {
                let el = self.elements[i];
                let index = match seen.get(&el) {
                    Some(&index) => index,
                    None => {
                        let index = (vdata.len() / VERTEX_SIZE) as u32;
                        let rec = self.vertex_record(el);
                        vdata.extend_from_slice(&rec);
                        seen.insert(el, index);
                        index
                    }
                };
                edata.push(index);
            }
        }
        debug!(
            "mesh group {}: {} vertices, {} elements",
            self.groups.len(),
            self.vertex_count(),
            edata.len()
        );
        self.groups.push(MeshGroup {
            mtl,
            edata: Arc::new(edata),
            earray: Cell::new(None),
        });
        self.elements.clear();
        self.faces = 0;
    }

    /// Build with the default material: point material for point sprites,
    /// plain diffuse otherwise.
    pub fn build_default(&mut self) {
        let mtl = if self.point_size > 0 {
            Material::point()
        } else {
            Material::diffuse()
        };
        self.build(mtl);
    }

    /// Flush the pending normal accumulation: every accumulator becomes one
    /// concrete normal (the normalised running mean) referenced by all of
    /// its element slots. Equal resolved values share one pool entry so the
    /// build-time dedup can merge records that only differ in where their
    /// normal was synthesised.
    fn resolve_normals(&mut self) {
        let cache = std::mem::replace(&mut self.ncache, NormalCache::new(DEFAULT_WINDOW));
        let mut norm_of: HashMap<usize, i32> = HashMap::new();
        let mut by_value: HashMap<[u32; 3], i32> = HashMap::new();
        for (&slot, &acc) in &cache.elem_accum {
            let index = match norm_of.get(&acc) {
                Some(&index) => index,
                None => {
                    let mut mean = cache.accums[acc].mean;
                    if mean.magnitude2() > 0.0 {
                        mean = mean.normalize();
                    }
                    let key = [mean.x.to_bits(), mean.y.to_bits(), mean.z.to_bits()];
                    let index = match by_value.get(&key) {
                        Some(&index) => index,
                        None => {
                            let index = self.add_normal(mean.x, mean.y, mean.z) as i32;
                            by_value.insert(key, index);
                            index
                        }
                    };
                    norm_of.insert(acc, index);
                    index
                }
            };
            self.elements[slot].norm = index;
        }
    }

    /// Synthesise per-triangle tangents from the texture-coordinate
    /// differentials. Triangles which are degenerate in texture space keep
    /// tangent index 0. Equal tangents share one pool entry, so the two
    /// halves of a flat quad still dedup to four records.
    fn compute_tangents(&mut self) {
        let mut by_value: HashMap<[u32; 3], i32> = HashMap::new();
        for t in 0..self.elements.len() / 3 {
            let (a, b, c) = (
                self.elements[3 * t],
                self.elements[3 * t + 1],
                self.elements[3 * t + 2],
            );
            if a.tang != 0 || a.tex == 0 || b.tex == 0 || c.tex == 0 {
                continue;
            }
            let (p0, p1, p2) = (self.vertex(a.vert), self.vertex(b.vert), self.vertex(c.vert));
            let (uv0, uv1, uv2) = (
                self.texcoord(a.tex),
                self.texcoord(b.tex),
                self.texcoord(c.tex),
            );
            let (d1, d2) = (p1 - p0, p2 - p0);
            let (duv1, duv2) = (uv1 - uv0, uv2 - uv0);
            let det = duv1.x * duv2.y - duv1.y * duv2.x;
            if det.abs() < TANGENT_EPS {
                continue;
            }
            let tangent = (d1 * duv2.y - d2 * duv1.y) / det;
            if tangent.magnitude2() < TANGENT_EPS {
                continue;
            }
            let tangent = tangent.normalize();
            let key = [tangent.x.to_bits(), tangent.y.to_bits(), tangent.z.to_bits()];
            let index = match by_value.get(&key) {
                Some(&index) => index,
                None => {
                    let index = self.add_tangent(tangent.x, tangent.y, tangent.z) as i32;
                    by_value.insert(key, index);
                    index
                }
            };
            for k in 0..3 {
                self.elements[3 * t + k].tang = index;
            }
        }
    }

    fn vertex_record(&self, el: El) -> [f32; VERTEX_SIZE] {
        let mut rec = [0.0; VERTEX_SIZE];
        let v = self.vertex(el.vert);
        let n = self.normal(el.norm);
        let t = self.texcoord(el.tex);
        let tg = self.tangent(el.tang);
        rec[..3].copy_from_slice(&[v.x, v.y, v.z]);
        rec[3..6].copy_from_slice(&[n.x, n.y, n.z]);
        rec[6..8].copy_from_slice(&[t.x, t.y]);
        rec[8..].copy_from_slice(&[tg.x, tg.y, tg.z]);
        rec
    }

    fn vertex(&self, n: i32) -> Vector3<f32> {
        resolve(&self.vertices, n).unwrap_or_else(|| panic!("face references missing vertex {n}"))
    }

    fn normal(&self, n: i32) -> Vector3<f32> {
        resolve(&self.normals, n).unwrap_or_else(|| panic!("face references missing normal {n}"))
    }

    fn texcoord(&self, n: i32) -> Vector2<f32> {
        if n == 0 {
            return Vector2::zero();
        }
        resolve(&self.texcoords, n)
            .unwrap_or_else(|| panic!("face references missing tex coord {n}"))
    }

    fn tangent(&self, n: i32) -> Vector3<f32> {
        if n == 0 {
            return Vector3::zero();
        }
        resolve(&self.tangents, n).unwrap_or_else(|| panic!("face references missing tangent {n}"))
    }

    /// Front-face winding for the current orientation.
    pub fn winding(&self) -> Winding {
        if self.inverted {
            Winding::Ccw
        } else {
            Winding::Cw
        }
    }

    /// Point sprite size in pixels, or zero for a regular mesh.
    pub fn point_size(&self) -> u32 {
        self.point_size
    }

    /// Unique vertex records in the shared buffer.
    pub fn vertex_count(&self) -> usize {
        self.vdata.lock().unwrap().len() / VERTEX_SIZE
    }

    /// Total indices over all render groups.
    pub fn index_count(&self) -> usize {
        self.groups.iter().map(|g| g.edata.len()).sum()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// The material of the first render group.
    pub fn material(&self) -> Option<&Material> {
        self.groups.first().map(|g| &g.mtl)
    }

    /// Replace the material on every render group.
    pub fn set_material(&mut self, mtl: Material) -> &mut Self {
        for grp in &mut self.groups {
            grp.mtl = mtl.clone();
        }
        self
    }

    /// Draw every group. Backend buffers are created on first use and
    /// cached. The callback is invoked to bind per-draw uniforms whenever
    /// the active program changes between groups.
    pub fn draw(
        &self,
        gl: &mut dyn RenderBackend,
        cache: &mut ResourceCache,
        set_uniforms: &mut dyn FnMut(&Program, &mut dyn RenderBackend),
    ) {
        self.draw_with(gl, cache, None, set_uniforms);
    }

    /// Draw with every group's material replaced by `override_mtl`, used
    /// when an attached light swaps an item to its emissive look.
    pub fn draw_with(
        &self,
        gl: &mut dyn RenderBackend,
        cache: &mut ResourceCache,
        override_mtl: Option<&Material>,
        set_uniforms: &mut dyn FnMut(&Program, &mut dyn RenderBackend),
    ) {
        let side = self.inverted as usize;
        if self.varray[side].get().is_none() {
            let vdata = self.vdata.lock().unwrap();
            let buf = gl.create_buffer(BufferKind::Vertex, bytemuck::cast_slice(&vdata));
            self.varray[side].set(Some(buf));
        }
        let vbuf = self.varray[side].get().unwrap();
        let mut last: Option<ProgramId> = None;
        for grp in &self.groups {
            if grp.earray.get().is_none() {
                let buf = gl.create_buffer(BufferKind::Element, bytemuck::cast_slice(&grp.edata));
                grp.earray.set(Some(buf));
            }
            let mtl = override_mtl.unwrap_or(&grp.mtl);
            let prog = mtl.enable(gl, cache);
            if last != Some(prog.id) {
                set_uniforms(&prog, gl);
                last = Some(prog.id);
            }
            gl.draw_indexed(vbuf, grp.earray.get().unwrap(), grp.edata.len(), self.winding());
            mtl.disable(gl);
        }
    }

    /// A copy of the mesh turned inside out: reversed winding and negated
    /// normals. Shares no mutable state with the original; inverting twice
    /// restores the original orientation and normal signs.
    pub fn invert(&self) -> Mesh {
        let mut vdata = self.vdata.lock().unwrap().clone();
        for rec in vdata.chunks_exact_mut(VERTEX_SIZE) {
            rec[3] = -rec[3];
            rec[4] = -rec[4];
            rec[5] = -rec[5];
        }
        Mesh {
            inverted: !self.inverted,
            vdata: Arc::new(Mutex::new(vdata)),
            groups: self.groups.clone(),
            varray: [
                Cell::new(self.varray[0].get()),
                Cell::new(self.varray[1].get()),
            ],
            point_size: self.point_size,
            ..Mesh::new()
        }
    }
}

fn resolve<T: Copy>(pool: &[T], n: i32) -> Option<T> {
    if n > 0 {
        pool.get((n - 1) as usize).copied()
    } else if n < 0 {
        let i = pool.len() as i32 + n;
        if i >= 0 {
            pool.get(i as usize).copied()
        } else {
            None
        }
    } else {
        None
    }
}

/// Incremental mean of the face normals pushed so far. The mean is updated
/// per push rather than summed and divided at the end so results match
/// across build orders of the same face list.
#[derive(Debug)]
struct RunningMean {
    start: usize,
    count: f32,
    mean: Vector3<f32>,
}

impl RunningMean {
    fn push(&mut self, val: Vector3<f32>) {
        self.count += 1.0;
        self.mean += (val - self.mean) * (1.0 / self.count);
    }
}

/// Pending normal synthesis state. Each vertex id points at its current
/// accumulator; a vertex seen again outside the smoothing window starts a
/// fresh accumulator so earlier faces keep their own flat normals.
#[derive(Debug)]
struct NormalCache {
    accums: Vec<RunningMean>,
    vert_accum: HashMap<i32, usize>,
    elem_accum: BTreeMap<usize, usize>,
    window: usize,
}

impl NormalCache {
    fn new(window: usize) -> Self {
        NormalCache {
            accums: Vec::new(),
            vert_accum: HashMap::new(),
            elem_accum: BTreeMap::new(),
            window,
        }
    }

    fn add(&mut self, normal: Vector3<f32>, face: usize, base: usize, elements: &[El]) {
        for (i, el) in elements.iter().enumerate() {
            let acc = match self.vert_accum.get(&el.vert) {
                Some(&acc) if face - self.accums[acc].start <= self.window => acc,
                _ => {
                    self.accums.push(RunningMean {
                        start: face,
                        count: 0.0,
                        mean: Vector3::zero(),
                    });
                    let acc = self.accums.len() - 1;
                    self.vert_accum.insert(el.vert, acc);
                    acc
                }
            };
            self.accums[acc].push(normal);
            self.elem_accum.insert(base + i, acc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NullBackend;

    const EPS: f32 = 1e-5;

    fn records(m: &Mesh) -> Vec<[f32; VERTEX_SIZE]> {
        let vdata = m.vdata.lock().unwrap();
        vdata
            .chunks_exact(VERTEX_SIZE)
            .map(|c| {
                let mut rec = [0.0; VERTEX_SIZE];
                rec.copy_from_slice(c);
                rec
            })
            .collect()
    }

    fn group_indices(m: &Mesh, grp: usize) -> Vec<u32> {
        m.groups[grp].edata.to_vec()
    }

    fn unit_square(m: &mut Mesh) {
        m.add_vertex(0.0, 0.0, 0.0);
        m.add_vertex(1.0, 0.0, 0.0);
        m.add_vertex(1.0, 1.0, 0.0);
        m.add_vertex(0.0, 1.0, 0.0);
        m.add_normal(0.0, 0.0, 1.0);
    }

    #[test]
    fn quad_splits_into_two_triangles_preserving_winding() {
        let mut m = Mesh::new();
        unit_square(&mut m);
        m.add_face_quad(El::new(1, 0, 1), El::new(2, 0, 1), El::new(3, 0, 1), El::new(4, 0, 1));
        m.build(Material::diffuse());
        assert_eq!(m.vertex_count(), 4);
        assert_eq!(group_indices(&m, 0), vec![0, 1, 2, 2, 3, 0]);
    }

    #[test]
    fn quad_without_normals_contributes_one_newell_normal() {
        let mut m = Mesh::new();
        unit_square(&mut m);
        m.add_face_quad(El::new(1, 0, 0), El::new(2, 0, 0), El::new(3, 0, 0), El::new(4, 0, 0));
        m.build(Material::diffuse());
        let recs = records(&m);
        assert_eq!(recs.len(), 4);
        for rec in &recs {
            assert!((rec[3] - 0.0).abs() < EPS);
            assert!((rec[4] - 0.0).abs() < EPS);
            assert!((rec[5] - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn dedup_is_order_independent() {
        let faces = [
            [El::new(1, 0, 1), El::new(2, 0, 1), El::new(3, 0, 1)],
            [El::new(3, 0, 1), El::new(4, 0, 1), El::new(1, 0, 1)],
        ];
        let mut sets = Vec::new();
        for order in [[0, 1], [1, 0]] {
            let mut m = Mesh::new();
            unit_square(&mut m);
            for f in order {
                let [a, b, c] = faces[f];
                m.add_face(a, b, c);
            }
            m.build(Material::diffuse());
            assert_eq!(m.vertex_count(), 4);
            let mut set = records(&m);
            set.sort_by(|a, b| a.partial_cmp(b).unwrap());
            sets.push(set);
        }
        assert_eq!(sets[0], sets[1]);
    }

    #[test]
    fn smooth_shading_averages_face_normals() {
        // two triangles sharing the edge (0,0,0)-(1,0,0); face normals +y and -z
        let mut m = Mesh::new();
        m.add_vertex(0.0, 0.0, 0.0);
        m.add_vertex(1.0, 0.0, 0.0);
        m.add_vertex(0.0, 0.0, -1.0);
        m.add_vertex(0.0, 1.0, 0.0);
        m.add_face(El::new(1, 0, 0), El::new(2, 0, 0), El::new(3, 0, 0));
        m.add_face(El::new(2, 0, 0), El::new(1, 0, 0), El::new(4, 0, 0));
        m.build(Material::diffuse());
        // shared vertices got the normalised mean of (0,1,0) and (0,0,-1)
        let want = 1.0 / 2.0f32.sqrt();
        let recs = records(&m);
        let shared: Vec<_> = recs
            .iter()
            .filter(|r| (r[0] - 0.0).abs() < EPS && r[1] == 0.0 && r[2] == 0.0)
            .collect();
        assert_eq!(shared.len(), 1);
        assert!((shared[0][4] - want).abs() < EPS);
        assert!((shared[0][5] + want).abs() < EPS);
    }

    #[test]
    fn flat_shading_keeps_per_face_normals() {
        let mut m = Mesh::new();
        m.set_normal_smoothing(false);
        m.add_vertex(0.0, 0.0, 0.0);
        m.add_vertex(1.0, 0.0, 0.0);
        m.add_vertex(0.0, 0.0, -1.0);
        m.add_vertex(0.0, 1.0, 0.0);
        m.add_face(El::new(1, 0, 0), El::new(2, 0, 0), El::new(3, 0, 0));
        m.add_face(El::new(2, 0, 0), El::new(1, 0, 0), El::new(4, 0, 0));
        m.build(Material::diffuse());
        // shared positions are duplicated because their normals differ
        assert_eq!(m.vertex_count(), 6);
        let recs = records(&m);
        let at_origin: Vec<_> = recs
            .iter()
            .filter(|r| r[0] == 0.0 && r[1] == 0.0 && r[2] == 0.0)
            .collect();
        assert_eq!(at_origin.len(), 2);
        let normals: Vec<[f32; 3]> = at_origin.iter().map(|r| [r[3], r[4], r[5]]).collect();
        assert!(normals.contains(&[0.0, 1.0, 0.0]));
        assert!(normals.contains(&[0.0, 0.0, -1.0]));
    }

    #[test]
    fn negative_indices_resolve_from_pool_end() {
        let mut m = Mesh::new();
        m.add_vertex(0.0, 0.0, 0.0);
        m.add_vertex(1.0, 0.0, 0.0);
        m.add_vertex(0.0, 1.0, 0.0);
        m.add_normal(0.0, 0.0, 1.0);
        m.add_face(El::new(-3, 0, -1), El::new(-2, 0, -1), El::new(-1, 0, -1));
        m.build(Material::diffuse());
        let recs = records(&m);
        assert_eq!(recs.len(), 3);
        assert_eq!([recs[2][0], recs[2][1], recs[2][2]], [0.0, 1.0, 0.0]);
    }

    #[test]
    #[should_panic(expected = "missing vertex")]
    fn zero_vertex_index_is_fatal() {
        let mut m = Mesh::new();
        m.add_face(El::new(0, 0, 0), El::new(0, 0, 0), El::new(0, 0, 0));
    }

    #[test]
    fn tangents_follow_texture_u_direction() {
        let mut m = Mesh::new();
        m.add_vertex(0.0, 0.0, 0.0);
        m.add_vertex(1.0, 0.0, 0.0);
        m.add_vertex(0.0, 1.0, 0.0);
        m.add_tex_coord(0.0, 0.0);
        m.add_tex_coord(1.0, 0.0);
        m.add_tex_coord(0.0, 1.0);
        m.add_normal(0.0, 0.0, 1.0);
        m.add_face(El::new(1, 1, 1), El::new(2, 2, 1), El::new(3, 3, 1));
        m.build(Material::diffuse());
        let recs = records(&m);
        for rec in &recs {
            assert_eq!([rec[8], rec[9], rec[10]], [1.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn degenerate_texture_triangle_gets_no_tangent() {
        let mut m = Mesh::new();
        m.add_vertex(0.0, 0.0, 0.0);
        m.add_vertex(1.0, 0.0, 0.0);
        m.add_vertex(0.0, 1.0, 0.0);
        m.add_tex_coord(0.5, 0.5);
        m.add_normal(0.0, 0.0, 1.0);
        m.add_face(El::new(1, 1, 1), El::new(2, 1, 1), El::new(3, 1, 1));
        m.build(Material::diffuse());
        let recs = records(&m);
        for rec in &recs {
            assert_eq!([rec[8], rec[9], rec[10]], [0.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn build_then_clear_appends_to_shared_buffers() {
        let mut m = Mesh::new();
        unit_square(&mut m);
        m.add_face(El::new(1, 0, 1), El::new(2, 0, 1), El::new(3, 0, 1));
        m.build(Material::diffuse());
        let first = m.vertex_count();
        m.clear();
        m.add_vertex(5.0, 0.0, 0.0);
        m.add_vertex(6.0, 0.0, 0.0);
        m.add_vertex(5.0, 1.0, 0.0);
        m.add_normal(0.0, 0.0, 1.0);
        m.add_face(El::new(1, 0, 1), El::new(2, 0, 1), El::new(3, 0, 1));
        m.build(Material::plastic());
        assert_eq!(m.group_count(), 2);
        assert_eq!(m.vertex_count(), first + 3);
        // the second group indexes past the first group's vertices
        assert!(group_indices(&m, 1).iter().all(|&i| i >= first as u32));
    }

    #[test]
    fn invert_twice_restores_winding_and_normals() {
        let mut m = Mesh::new();
        unit_square(&mut m);
        m.add_face_quad(El::new(1, 0, 1), El::new(2, 0, 1), El::new(3, 0, 1), El::new(4, 0, 1));
        m.build(Material::diffuse());
        assert_eq!(m.winding(), Winding::Cw);

        let inv = m.invert();
        assert_eq!(inv.winding(), Winding::Ccw);
        for rec in records(&inv) {
            assert_eq!([rec[3], rec[4], rec[5]], [0.0, 0.0, -1.0]);
        }

        let back = inv.invert();
        assert_eq!(back.winding(), Winding::Cw);
        assert_eq!(records(&back), records(&m));
    }

    #[test]
    fn draw_creates_buffers_once_and_batches_program_switches() {
        let mut m = Mesh::new();
        unit_square(&mut m);
        m.add_face(El::new(1, 0, 1), El::new(2, 0, 1), El::new(3, 0, 1));
        m.build(Material::diffuse());
        m.clear();
        m.add_vertex(0.0, 0.0, 1.0);
        m.add_vertex(1.0, 0.0, 1.0);
        m.add_vertex(0.0, 1.0, 1.0);
        m.add_normal(0.0, 0.0, 1.0);
        m.add_face(El::new(1, 0, 1), El::new(2, 0, 1), El::new(3, 0, 1));
        m.build(Material::diffuse());

        let mut gl = NullBackend::new();
        let mut cache = ResourceCache::new("assets");
        let mut uniform_calls = 0;
        m.draw(&mut gl, &mut cache, &mut |_, _| uniform_calls += 1);
        m.draw(&mut gl, &mut cache, &mut |_, _| uniform_calls += 1);

        // one vertex buffer and one element buffer per group, created once
        assert_eq!(gl.buffers_created, 3);
        assert_eq!(gl.programs_compiled, 1);
        // both groups share one program so uniforms bind once per draw call
        assert_eq!(uniform_calls, 2);
        assert_eq!(gl.draws.len(), 4);
    }

    #[test]
    fn clones_share_geometry_but_not_materials() {
        let mut m = Mesh::new();
        unit_square(&mut m);
        m.add_face(El::new(1, 0, 1), El::new(2, 0, 1), El::new(3, 0, 1));
        m.build(Material::diffuse());
        let mut copy = m.clone();
        copy.set_material(Material::emissive());
        assert_eq!(m.material().unwrap().kind(), crate::gfx::material::ShaderKind::Diffuse);
        assert_eq!(
            copy.material().unwrap().kind(),
            crate::gfx::material::ShaderKind::Emissive
        );
        assert_eq!(copy.vertex_count(), m.vertex_count());
    }

    #[test]
    fn meshes_move_between_threads() {
        fn check<T: Send>() {}
        check::<Mesh>();
    }
}
