//! Wavefront OBJ/MTL loading.
//!
//! Records are processed one line at a time. Vertex data (`v`/`vt`/`vn`)
//! goes straight into the mesh's attribute pools; faces are bucketed per
//! active material name and flushed into [`Mesh::build`] calls at each
//! group boundary (`g`) and at end of input, so all faces of a group which
//! share a material land in one render group regardless of how `usemtl`
//! records interleave. Malformed records abort the whole load with the
//! offending line; unrecognised record types are logged and skipped.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use cgmath::{InnerSpace, Vector3};
use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::gfx::material::{Material, TextureSlot};
use crate::img::Convert;

use super::{El, Mesh, DEFAULT_WINDOW};

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Turn `map_bump` entries into normal-map texture slots. Disable when
    /// the backend has no use for tangent-space mapping.
    pub bump_maps: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions { bump_maps: true }
    }
}

/// Load a mesh and its materials from a .obj file. Relative `mtllib` and
/// texture paths resolve against the file's directory.
pub fn load_obj_file(path: impl AsRef<Path>) -> Result<Mesh> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    info!("load mesh from {}", path.display());
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    load_obj_from(BufReader::new(file), base, &LoadOptions::default())
}

/// Load a mesh from OBJ text with default options, resolving referenced
/// files against the current directory.
pub fn load_obj(r: impl BufRead) -> Result<Mesh> {
    load_obj_from(r, Path::new("."), &LoadOptions::default())
}

pub fn load_obj_from(r: impl BufRead, base: &Path, opts: &LoadOptions) -> Result<Mesh> {
    let mut obj = ObjParser {
        mesh: Mesh::new(),
        buckets: Vec::new(),
        group: String::new(),
        mtl_name: String::new(),
        window: DEFAULT_WINDOW,
        materials: HashMap::new(),
        base,
        opts,
    };
    for (i, line) in r.lines().enumerate() {
        let n = i + 1;
        let line = line.map_err(|e| Error::parse(n, "", format!("read failed: {e}")))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields[0] {
            "v" => {
                let v = parse_vec3(&fields[1..], n, line)?;
                obj.mesh.add_vertex(v.x, v.y, v.z);
            }
            "vt" => {
                let v = parse_floats::<2>(&fields[1..], n, line)?;
                // image space runs top down
                obj.mesh.add_tex_coord(v[0], -v[1]);
            }
            "vn" => {
                let v = parse_vec3(&fields[1..], n, line)?;
                obj.mesh.add_normal(v.x, v.y, v.z);
            }
            "f" => obj.parse_face(&fields[1..], n, line)?,
            "g" => {
                if fields.len() > 1 {
                    obj.flush()?;
                    obj.group = fields[1].to_string();
                }
            }
            "s" => {
                let arg = field(&fields, 1, n, line)?;
                obj.window = match arg {
                    "off" | "0" => 0,
                    "on" => DEFAULT_WINDOW,
                    _ => arg
                        .parse()
                        .map_err(|_| Error::parse(n, line, "bad smoothing group"))?,
                };
            }
            "mtllib" => {
                let name = field(&fields, 1, n, line)?;
                for mtl in load_mtl_file(&base.join(name))? {
                    obj.materials.insert(mtl.name.clone(), mtl);
                }
            }
            "usemtl" => {
                obj.mtl_name = field(&fields, 1, n, line)?.to_string();
            }
            _ => warn!("load obj: skip {line}"),
        }
    }
    obj.flush()?;
    Ok(obj.mesh)
}

struct ObjParser<'a> {
    mesh: Mesh,
    /// Per-material face buckets in first-use order; each face carries the
    /// smoothing window active when it was read.
    buckets: Vec<(String, Vec<(usize, Vec<El>)>)>,
    group: String,
    mtl_name: String,
    window: usize,
    materials: HashMap<String, MtlData>,
    base: &'a Path,
    opts: &'a LoadOptions,
}

impl ObjParser<'_> {
    fn parse_face(&mut self, fields: &[&str], n: usize, line: &str) -> Result<()> {
        if fields.len() != 3 && fields.len() != 4 {
            return Err(Error::parse(
                n,
                line,
                format!("face with {} vertices not supported", fields.len()),
            ));
        }
        let mut face = Vec::with_capacity(fields.len());
        for fld in fields {
            let mut el = [0i32; 3];
            let parts: Vec<&str> = fld.split('/').collect();
            if parts.len() > 3 {
                return Err(Error::parse(n, line, "too many components in face element"));
            }
            for (i, part) in parts.iter().enumerate() {
                if !part.is_empty() {
                    el[i] = part
                        .parse()
                        .map_err(|_| Error::parse(n, line, format!("bad index `{part}`")))?;
                }
            }
            face.push(El::new(el[0], el[1], el[2]));
        }
        let slot = match self.buckets.iter().position(|(name, _)| *name == self.mtl_name) {
            Some(slot) => slot,
            None => {
                self.buckets.push((self.mtl_name.clone(), Vec::new()));
                self.buckets.len() - 1
            }
        };
        self.buckets[slot].1.push((self.window, face));
        Ok(())
    }

    /// Build one render group per material bucket accumulated since the
    /// last group boundary.
    fn flush(&mut self) -> Result<()> {
        let buckets = std::mem::take(&mut self.buckets);
        for (name, faces) in buckets {
            debug!(
                "group `{}` material `{}`: {} faces",
                self.group,
                name,
                faces.len()
            );
            let mut window = None;
            for (win, face) in faces {
                if window != Some(win) {
                    self.mesh.set_smoothing_window(win);
                    window = Some(win);
                }
                match face.len() {
                    3 => self.mesh.add_face(face[0], face[1], face[2]),
                    _ => self.mesh.add_face_quad(face[0], face[1], face[2], face[3]),
                };
            }
            let mtl = self.resolve_material(&name)?;
            self.mesh.build(mtl);
        }
        Ok(())
    }

    fn resolve_material(&self, name: &str) -> Result<Material> {
        if name.is_empty() {
            return Ok(Material::diffuse());
        }
        if let Some(data) = self.materials.get(name) {
            return Ok(data.to_material(self.opts.bump_maps, self.base));
        }
        Material::by_name(name)
    }
}

/// One parsed `newmtl` record.
#[derive(Debug, Clone, PartialEq)]
pub struct MtlData {
    pub name: String,
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
    pub shininess: f32,
    pub alpha: f32,
    pub model: i32,
    pub diffuse_map: Option<PathBuf>,
    pub specular_map: Option<PathBuf>,
    pub bump_map: Option<PathBuf>,
}

impl MtlData {
    fn new(name: &str) -> Self {
        MtlData {
            name: name.to_string(),
            ambient: Vector3::new(0.0, 0.0, 0.0),
            diffuse: Vector3::new(1.0, 1.0, 1.0),
            specular: Vector3::new(0.5, 0.5, 0.5),
            shininess: 128.0,
            alpha: 1.0,
            model: 2,
            diffuse_map: None,
            specular_map: None,
            bump_map: None,
        }
    }

    /// Turn the record into a material value. Illumination models 0 and 1
    /// map to plain diffuse (0 additionally kills the ambient term), 2 and
    /// up to Blinn-Phong. The ambient scale is the ratio of the ambient and
    /// diffuse magnitudes.
    pub fn to_material(&self, bump_maps: bool, base: &Path) -> Material {
        let color = self.diffuse.extend(self.alpha);
        let amb_scale =
            self.ambient.extend(1.0).magnitude() / self.diffuse.extend(1.0).magnitude();
        let diffuse_slot = self
            .diffuse_map
            .as_ref()
            .map(|p| TextureSlot::file(base.join(p), Convert::SrgbToLinear));
        match self.model {
            0 | 1 => {
                let mtl = match diffuse_slot {
                    Some(slot) => Material::diffuse_with(slot),
                    None => Material::diffuse(),
                };
                let amb = if self.model == 0 { 0.0 } else { amb_scale };
                mtl.with_color(color).with_ambient(amb)
            }
            _ => {
                let mut slots = vec![diffuse_slot];
                let mut specular = self.specular;
                if let Some(p) = &self.specular_map {
                    put_slot(&mut slots, 1, TextureSlot::file(base.join(p), Convert::None));
                    specular = Vector3::new(1.0, 1.0, 1.0);
                }
                if bump_maps {
                    if let Some(p) = &self.bump_map {
                        put_slot(
                            &mut slots,
                            2,
                            TextureSlot::file(base.join(p), Convert::BumpToNormal),
                        );
                    }
                }
                Material::reflective(specular.extend(self.alpha), self.shininess, slots)
                    .with_color(color)
                    .with_ambient(amb_scale)
            }
        }
    }
}

fn put_slot(slots: &mut Vec<Option<TextureSlot>>, pos: usize, slot: TextureSlot) {
    while slots.len() <= pos {
        slots.push(None);
    }
    slots[pos] = Some(slot);
}

/// Parse a .mtl file into named material records.
pub fn load_mtl_file(path: &Path) -> Result<Vec<MtlData>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    info!("load materials from {}", path.display());
    load_mtl(BufReader::new(file))
}

pub fn load_mtl(r: impl BufRead) -> Result<Vec<MtlData>> {
    let mut out: Vec<MtlData> = Vec::new();
    for (i, line) in r.lines().enumerate() {
        let n = i + 1;
        let line = line.map_err(|e| Error::parse(n, "", format!("read failed: {e}")))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields[0] == "newmtl" {
            out.push(MtlData::new(field(&fields, 1, n, line)?));
            continue;
        }
        let m = out
            .last_mut()
            .ok_or_else(|| Error::parse(n, line, "directive before newmtl"))?;
        match fields[0] {
            "Ka" => m.ambient = parse_vec3(&fields[1..4.min(fields.len())], n, line)?,
            "Kd" => m.diffuse = parse_vec3(&fields[1..4.min(fields.len())], n, line)?,
            "Ks" => m.specular = parse_vec3(&fields[1..4.min(fields.len())], n, line)?,
            // doubled since lighting uses the half-angle form
            "Ns" => m.shininess = parse_float(field(&fields, 1, n, line)?, n, line)? * 2.0,
            "Tr" => m.alpha = 1.0 - parse_float(field(&fields, 1, n, line)?, n, line)?,
            "d" => m.alpha = parse_float(field(&fields, 1, n, line)?, n, line)?,
            "illum" => {
                m.model = field(&fields, 1, n, line)?
                    .parse()
                    .map_err(|_| Error::parse(n, line, "bad illumination model"))?
            }
            "map_Kd" => m.diffuse_map = Some(PathBuf::from(field(&fields, 1, n, line)?)),
            "map_Ks" => m.specular_map = Some(PathBuf::from(field(&fields, 1, n, line)?)),
            "map_bump" | "bump" => m.bump_map = Some(PathBuf::from(field(&fields, 1, n, line)?)),
            "Ke" | "Ni" | "Tf" | "map_Ka" | "map_Ns" | "map_d" => {}
            _ => warn!("load mtl: skip {line}"),
        }
    }
    Ok(out)
}

fn field<'a>(fields: &[&'a str], i: usize, n: usize, line: &str) -> Result<&'a str> {
    fields
        .get(i)
        .copied()
        .ok_or_else(|| Error::parse(n, line, "missing argument"))
}

fn parse_float(s: &str, n: usize, line: &str) -> Result<f32> {
    s.parse()
        .map_err(|_| Error::parse(n, line, format!("bad number `{s}`")))
}

fn parse_floats<const N: usize>(fields: &[&str], n: usize, line: &str) -> Result<[f32; N]> {
    if fields.len() < N {
        return Err(Error::parse(n, line, format!("expected {N} components")));
    }
    let mut out = [0.0; N];
    for i in 0..N {
        out[i] = parse_float(fields[i], n, line)?;
    }
    Ok(out)
}

fn parse_vec3(fields: &[&str], n: usize, line: &str) -> Result<Vector3<f32>> {
    let v = parse_floats::<3>(fields, n, line)?;
    Ok(Vector3::new(v[0], v[1], v[2]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::material::ShaderKind;
    use std::io::Cursor;

    fn load(text: &str) -> Result<Mesh> {
        load_obj(Cursor::new(text.to_string()))
    }

    #[test]
    fn minimal_square_round_trip() {
        let m = load(
            "g main\n\
             v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n\
             vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\n\
             f 1/1 2/2 3/3 4/4\n",
        )
        .unwrap();
        assert_eq!(m.group_count(), 1);
        assert_eq!(m.index_count(), 6);
        assert!(m.vertex_count() <= 4);
        assert_eq!(m.material().unwrap().kind(), ShaderKind::Diffuse);
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let m = load(
            "# a comment\n\n\
             v 0 0 0\nv 1 0 0\nv 0 1 0\n\
             # another\n\
             f 1 2 3\n",
        )
        .unwrap();
        assert_eq!(m.index_count(), 3);
    }

    #[test]
    fn negative_face_indices_count_from_pool_end() {
        let m = load(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\n\
             f -3 -2 -1\n",
        )
        .unwrap();
        assert_eq!(m.vertex_count(), 3);
        assert_eq!(m.index_count(), 3);
    }

    #[test]
    fn malformed_number_reports_the_line() {
        let err = load("v 0 0 0\nv 1 zero 0\n").unwrap_err();
        match err {
            Error::Parse { line, text, .. } => {
                assert_eq!(line, 2);
                assert!(text.contains("zero"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unsupported_face_arity_is_an_error() {
        let err = load(
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nv 2 2 0\n\
             f 1 2 3 4 5\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Parse { line: 6, .. }));
    }

    #[test]
    fn unknown_records_are_skipped() {
        let m = load(
            "vp 0.5\n\
             o whatever\n\
             v 0 0 0\nv 1 0 0\nv 0 1 0\n\
             f 1 2 3\n",
        )
        .unwrap();
        assert_eq!(m.index_count(), 3);
    }

    #[test]
    fn faces_bucket_per_material_across_a_group() {
        // two materials interleaved: all faces of each material flush into
        // one render group, in first-use order
        let m = load(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\n\
             usemtl plastic\n\
             f 1 2 3\n\
             usemtl unshaded\n\
             f 2 4 3\n\
             usemtl plastic\n\
             f 1 3 4\n",
        )
        .unwrap();
        assert_eq!(m.group_count(), 2);
        assert_eq!(m.material().unwrap().kind(), ShaderKind::BlinnPhong);
        assert_eq!(m.groups[0].edata.len(), 6);
        assert_eq!(m.groups[1].edata.len(), 3);
    }

    #[test]
    fn group_boundary_flushes_buckets() {
        let m = load(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\n\
             g first\n\
             f 1 2 3\n\
             g second\n\
             f 1 2 3\n",
        )
        .unwrap();
        assert_eq!(m.group_count(), 2);
    }

    #[test]
    fn unknown_material_name_aborts() {
        let err = load(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\n\
             usemtl chartreuse\n\
             f 1 2 3\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownMaterial(_)));
    }

    #[test]
    fn smoothing_off_gives_flat_normals() {
        let tent = |s: &str| {
            load(&format!(
                "v 0 0 0\nv 1 0 0\nv 0 0 -1\nv 0 1 0\n\
                 s {s}\n\
                 f 1 2 3\nf 2 1 4\n"
            ))
            .unwrap()
        };
        // flat: shared positions duplicate because normals differ
        assert_eq!(tent("off").vertex_count(), 6);
        // smooth: shared vertices merge with an averaged normal
        assert_eq!(tent("on").vertex_count(), 4);
    }

    #[test]
    fn texture_v_axis_is_flipped() {
        let m = load(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\n\
             vt 0 1\nvt 1 1\nvt 0 0\n\
             vn 0 0 1\n\
             f 1/1/1 2/2/1 3/3/1\n",
        )
        .unwrap();
        let vdata = m.vdata.lock().unwrap();
        // first record's texcoord is (0, -1)
        assert_eq!(vdata[6], 0.0);
        assert_eq!(vdata[7], -1.0);
    }

    #[test]
    fn mtl_records_parse_with_defaults() {
        let mtls = load_mtl(Cursor::new(
            "# comment\n\
             newmtl shiny\n\
             Ka 0 0 0\n\
             Kd 0.5 0.5 0.5\n\
             Ks 1 1 1\n\
             Ns 100\n\
             d 0.9\n\
             illum 2\n\
             map_Kd tex.png\n\
             newmtl matte\n\
             illum 1\n\
             unknown_directive 42\n",
        ))
        .unwrap();
        assert_eq!(mtls.len(), 2);
        let shiny = &mtls[0];
        assert_eq!(shiny.name, "shiny");
        assert_eq!(shiny.shininess, 200.0); // doubled
        assert_eq!(shiny.alpha, 0.9);
        assert_eq!(shiny.diffuse_map, Some(PathBuf::from("tex.png")));
        // defaults survive for the second record
        assert_eq!(mtls[1].alpha, 1.0);
        assert_eq!(mtls[1].model, 1);
    }

    #[test]
    fn mtl_directive_before_newmtl_is_an_error() {
        let err = load_mtl(Cursor::new("Kd 1 1 1\n")).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }));
    }

    #[test]
    fn illumination_model_selects_the_shader_kind() {
        let mut data = MtlData::new("m");
        data.model = 1;
        assert_eq!(
            data.to_material(true, Path::new(".")).kind(),
            ShaderKind::Diffuse
        );
        data.model = 2;
        assert_eq!(
            data.to_material(true, Path::new(".")).kind(),
            ShaderKind::BlinnPhong
        );
        data.diffuse_map = Some(PathBuf::from("d.png"));
        assert_eq!(
            data.to_material(true, Path::new(".")).kind(),
            ShaderKind::BlinnPhongTex
        );
        data.bump_map = Some(PathBuf::from("b.png"));
        assert_eq!(
            data.to_material(true, Path::new(".")).kind(),
            ShaderKind::BlinnPhongTexNorm
        );
        // bump maps disabled: back to the plain textured kind
        assert_eq!(
            data.to_material(false, Path::new(".")).kind(),
            ShaderKind::BlinnPhongTex
        );
    }

    #[test]
    fn ambient_scale_is_the_magnitude_ratio() {
        let mut data = MtlData::new("m");
        data.model = 1;
        data.ambient = Vector3::new(0.0, 0.0, 0.0);
        data.diffuse = Vector3::new(1.0, 1.0, 1.0);
        let mtl = data.to_material(true, Path::new("."));
        assert_eq!(mtl.ambient(), 0.5); // |(0,0,0,1)| / |(1,1,1,1)|
        // model 0 kills the ambient term entirely
        data.model = 0;
        assert_eq!(data.to_material(true, Path::new(".")).ambient(), 0.0);
    }
}
