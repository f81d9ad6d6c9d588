//! Material system.
//!
//! A [`Material`] is a lightweight value: a shader kind, a colour, an
//! ambient scale, specular settings and a list of texture slots. The heavy
//! state lives in the [`ResourceCache`]: one compiled program per shader
//! kind and one uploaded texture per logical identity (built-in kind or
//! file path), created lazily on first use and kept for the life of the
//! rendering context. Cloning a material shares programs and textures and
//! copies only the scalar fields.

pub mod shaders;
pub mod textures;

use std::collections::HashMap;
use std::path::PathBuf;

use cgmath::{Vector3, Vector4};
use log::{debug, error};

use crate::backend::{ProgramId, RenderBackend, UniformValue};
use crate::error::{Error, Result};
use crate::img::Convert;

pub use textures::{Texture, TextureKind};

pub use shaders::MAX_LIGHTS;

pub const WHITE: Vector4<f32> = Vector4 {
    x: 1.0,
    y: 1.0,
    z: 1.0,
    w: 1.0,
};

/// Closed set of shader programs: base lighting model crossed with the
/// texture mode, plus the procedural and point-sprite programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    Point,
    Unshaded,
    Diffuse,
    BlinnPhong,
    UnshadedTex,
    DiffuseTex,
    BlinnPhongTex,
    BlinnPhongTexNorm,
    UnshadedCube,
    DiffuseCube,
    BlinnPhongCube,
    BlinnPhongCubeNorm,
    Wood,
    Rough,
    Emissive,
    Marble,
}

impl ShaderKind {
    fn is_reflective(self) -> bool {
        use ShaderKind::*;
        matches!(
            self,
            BlinnPhong
                | BlinnPhongTex
                | BlinnPhongTexNorm
                | BlinnPhongCube
                | BlinnPhongCubeNorm
                | Wood
                | Rough
                | Marble
        )
    }
}

/// A compiled shader program plus the uniform set declared for its kind.
/// Setting an undeclared uniform is a programming mistake and panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Program {
    pub id: ProgramId,
    kind: ShaderKind,
}

impl Program {
    pub fn set(&self, gl: &mut dyn RenderBackend, name: &str, value: impl Into<UniformValue>) {
        if !self.declares(name) {
            panic!("uniform {name} not declared for {:?}", self.kind);
        }
        gl.set_uniform(self.id, name, value.into());
    }

    /// Set an element of a uniform array, `name[index]`.
    pub fn set_array(
        &self,
        gl: &mut dyn RenderBackend,
        name: &str,
        index: usize,
        value: impl Into<UniformValue>,
    ) {
        self.set(gl, &format!("{name}[{index}]"), value);
    }

    fn declares(&self, name: &str) -> bool {
        match name {
            "modelToCamera" | "cameraToClip" | "objectColor" | "ambientScale" | "specularColor"
            | "shininess" | "numTex" => true,
            "viewport" | "pointLocation" | "pointSize" => self.kind == ShaderKind::Point,
            "normalModelToCamera" | "modelScale" | "texScale" | "numLights" => {
                self.kind != ShaderKind::Point
            }
            _ => {
                if let Some(n) = name.strip_prefix("tex").and_then(|s| s.parse::<usize>().ok()) {
                    return n < shaders::sampler_count(self.kind);
                }
                if let Some(i) = array_index(name, "lightPos").or_else(|| array_index(name, "lightCol"))
                {
                    return self.kind != ShaderKind::Point && i < MAX_LIGHTS;
                }
                false
            }
        }
    }
}

fn array_index(name: &str, array: &str) -> Option<usize> {
    name.strip_prefix(array)?
        .strip_prefix('[')?
        .strip_suffix(']')?
        .parse()
        .ok()
}

/// One texture binding on a material: a built-in kind or an image file with
/// a decode conversion. Resolution to a backend texture happens at draw
/// time through the cache, so materials can be built off the render thread.
#[derive(Debug, Clone, PartialEq)]
pub enum TextureSlot {
    Builtin(TextureKind),
    File { path: PathBuf, convert: Convert },
}

impl TextureSlot {
    pub fn file(path: impl Into<PathBuf>, convert: Convert) -> Self {
        TextureSlot::File {
            path: path.into(),
            convert,
        }
    }

    fn target(&self) -> crate::backend::TextureTarget {
        match self {
            TextureSlot::Builtin(kind) => kind.target(),
            TextureSlot::File { .. } => crate::backend::TextureTarget::Tex2d,
        }
    }
}

/// A drawable surface description. See the module docs for the value/cache
/// split.
#[derive(Debug, Clone)]
pub struct Material {
    kind: ShaderKind,
    color: Vector4<f32>,
    ambient: f32,
    specular: Vector3<f32>,
    shininess: f32,
    slots: Vec<Option<TextureSlot>>,
}

impl Material {
    fn base(kind: ShaderKind, slots: Vec<Option<TextureSlot>>) -> Self {
        Material {
            kind,
            color: WHITE,
            ambient: 1.0,
            specular: Vector3::new(0.5, 0.5, 0.5),
            shininess: 128.0,
            slots,
        }
    }

    /// Flat colour, no lighting.
    pub fn unshaded() -> Self {
        Material::base(ShaderKind::Unshaded, vec![])
    }

    pub fn unshaded_with(slot: TextureSlot) -> Self {
        let kind = match slot.target() {
            crate::backend::TextureTarget::Tex2d => ShaderKind::UnshadedTex,
            crate::backend::TextureTarget::Cube => ShaderKind::UnshadedCube,
            other => panic!("unsupported texture target {other:?} for unshaded material"),
        };
        Material::base(kind, vec![Some(slot)])
    }

    /// Material used when drawing point sprites.
    pub fn point() -> Self {
        Material::base(ShaderKind::Point, vec![])
    }

    /// Self-lit material which looks like it glows.
    pub fn emissive() -> Self {
        Material::base(ShaderKind::Emissive, vec![]).with_color(Vector4::new(0.9, 0.9, 0.9, 1.0))
    }

    /// Cubemap-textured unshaded material for room/sky interiors.
    pub fn skybox() -> Self {
        Material::unshaded_with(TextureSlot::Builtin(TextureKind::Skybox))
    }

    /// Lambertian colour, no specular term.
    pub fn diffuse() -> Self {
        Material::base(ShaderKind::Diffuse, vec![])
    }

    pub fn diffuse_with(slot: TextureSlot) -> Self {
        let kind = match slot.target() {
            crate::backend::TextureTarget::Tex2d => ShaderKind::DiffuseTex,
            crate::backend::TextureTarget::Cube => ShaderKind::DiffuseCube,
            other => panic!("unsupported texture target {other:?} for diffuse material"),
        };
        Material::base(kind, vec![Some(slot)])
    }

    /// Coloured material with Blinn-Phong specular highlights. Slot order is
    /// fixed: 0 diffuse map, 1 specular map, 2 normal map; empty slots keep
    /// their position so sampler N always has the same role.
    pub fn reflective(
        specular: Vector4<f32>,
        shininess: f32,
        slots: Vec<Option<TextureSlot>>,
    ) -> Self {
        let first = slots.iter().flatten().next().map(TextureSlot::target);
        let kind = match first {
            None => ShaderKind::BlinnPhong,
            Some(crate::backend::TextureTarget::Tex2d) => {
                if slots.len() > 2 {
                    ShaderKind::BlinnPhongTexNorm
                } else {
                    ShaderKind::BlinnPhongTex
                }
            }
            Some(crate::backend::TextureTarget::Cube) => {
                if slots.len() > 2 {
                    ShaderKind::BlinnPhongCubeNorm
                } else {
                    ShaderKind::BlinnPhongCube
                }
            }
            Some(other) => panic!("unsupported texture target {other:?} for reflective material"),
        };
        let mut m = Material::base(kind, slots);
        m.specular = specular.truncate();
        m.shininess = shininess;
        m
    }

    /// Shiny plastic like material.
    pub fn plastic() -> Self {
        Material::reflective(Vector4::new(0.8, 0.8, 0.8, 1.0), 128.0, vec![])
    }

    /// Reflective with transparency.
    pub fn glass() -> Self {
        Material::reflective(Vector4::new(0.7, 0.7, 0.7, 1.0), 64.0, vec![])
            .with_color(Vector4::new(1.0, 1.0, 1.0, 0.4))
    }

    /// Earth cubemap with a specular ocean mask.
    pub fn earth() -> Self {
        Material::reflective(
            Vector4::new(0.5, 0.5, 0.5, 1.0),
            32.0,
            vec![
                Some(TextureSlot::Builtin(TextureKind::Earth)),
                Some(TextureSlot::Builtin(TextureKind::EarthSpec)),
            ],
        )
    }

    /// Textured metallic material.
    pub fn metallic() -> Self {
        Material::reflective(
            WHITE,
            16.0,
            vec![
                Some(TextureSlot::Builtin(TextureKind::Metallic)),
                Some(TextureSlot::Builtin(TextureKind::MetallicSpec)),
            ],
        )
        .with_ambient(0.3)
    }

    /// 3d textured wood material.
    pub fn wood() -> Self {
        let mut m = Material::base(
            ShaderKind::Wood,
            vec![
                Some(TextureSlot::Builtin(TextureKind::Wood)),
                Some(TextureSlot::Builtin(TextureKind::Turbulence)),
            ],
        );
        m.specular = Vector3::new(0.5, 0.5, 0.5);
        m.shininess = 10.0;
        m
    }

    /// Randomly perturbed rough surface.
    pub fn rough() -> Self {
        let mut m = Material::base(
            ShaderKind::Rough,
            vec![Some(TextureSlot::Builtin(TextureKind::Turbulence))],
        );
        m.ambient = 0.3;
        m.specular = Vector3::new(0.5, 0.5, 0.5);
        m.shininess = 32.0;
        m
    }

    /// Banded marble surface.
    pub fn marble() -> Self {
        let mut m = Material::base(
            ShaderKind::Marble,
            vec![Some(TextureSlot::Builtin(TextureKind::Turbulence))],
        );
        m.specular = Vector3::new(0.8, 0.8, 0.8);
        m.shininess = 200.0;
        m
    }

    /// Look up one of the built-in materials by name, as used by `usemtl`
    /// records which reference no mtl file entry.
    pub fn by_name(name: &str) -> Result<Material> {
        Ok(match name {
            "point" => Material::point(),
            "diffuse" => Material::diffuse(),
            "earth" => Material::earth(),
            "emissive" => Material::emissive(),
            "glass" => Material::glass(),
            "marble" => Material::marble(),
            "metallic" => Material::metallic(),
            "plastic" => Material::plastic(),
            "rough" => Material::rough(),
            "skybox" => Material::skybox(),
            "unshaded" => Material::unshaded(),
            "wood" => Material::wood(),
            _ => return Err(Error::UnknownMaterial(name.to_string())),
        })
    }

    pub fn kind(&self) -> ShaderKind {
        self.kind
    }

    pub fn color(&self) -> Vector4<f32> {
        self.color
    }

    pub fn with_color(mut self, color: Vector4<f32>) -> Self {
        self.color = color;
        self
    }

    pub fn set_color(&mut self, color: Vector4<f32>) {
        self.color = color;
    }

    pub fn ambient(&self) -> f32 {
        self.ambient
    }

    pub fn with_ambient(mut self, scale: f32) -> Self {
        self.ambient = scale;
        self
    }

    pub fn set_ambient(&mut self, scale: f32) {
        self.ambient = scale;
    }

    /// Activate the material: bind its program, colour/ambient uniforms and
    /// texture slots. Returns the program so the caller can set the
    /// remaining per-draw uniforms.
    pub fn enable(&self, gl: &mut dyn RenderBackend, cache: &mut ResourceCache) -> Program {
        let prog = cache.program(self.kind, gl);
        gl.use_program(prog.id);
        prog.set(gl, "objectColor", self.color);
        prog.set(gl, "ambientScale", self.ambient);
        let mut ntex: i32 = 0;
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(slot) = slot {
                if let Some(tex) = cache.texture(slot, gl) {
                    gl.bind_texture(i, tex.target, tex.id);
                    prog.set(gl, &format!("tex{i}"), i as i32);
                    ntex += 1;
                }
            }
        }
        prog.set(gl, "numTex", ntex);
        if self.kind.is_reflective() {
            prog.set(gl, "specularColor", self.specular);
            prog.set(gl, "shininess", self.shininess);
        }
        prog
    }

    pub fn disable(&self, _gl: &mut dyn RenderBackend) {}
}

/// Owned program and texture cache, one per rendering context.
///
/// Programs compile once per shader kind; textures upload once per logical
/// identity. A compile failure or a broken built-in asset panics since
/// there is no runtime recovery path. A broken user texture file is logged
/// once and its slot left unbound so the rest of the scene still draws.
pub struct ResourceCache {
    asset_dir: PathBuf,
    programs: HashMap<ShaderKind, Program>,
    builtins: HashMap<TextureKind, Texture>,
    files: HashMap<PathBuf, Option<Texture>>,
}

impl ResourceCache {
    pub fn new(asset_dir: impl Into<PathBuf>) -> Self {
        ResourceCache {
            asset_dir: asset_dir.into(),
            programs: HashMap::new(),
            builtins: HashMap::new(),
            files: HashMap::new(),
        }
    }

    pub fn program(&mut self, kind: ShaderKind, gl: &mut dyn RenderBackend) -> Program {
        if let Some(prog) = self.programs.get(&kind) {
            return *prog;
        }
        let fragment = shaders::fragment_source(kind);
        let id = gl
            .compile(
                shaders::vertex_source(kind),
                &fragment,
                shaders::vertex_layout(kind),
                shaders::VERTEX_SIZE,
            )
            .unwrap_or_else(|log| panic!("error compiling shader {kind:?}: {log}"));
        debug!("compiled shader program {kind:?}");
        let prog = Program { id, kind };
        self.programs.insert(kind, prog);
        prog
    }

    pub fn builtin(&mut self, kind: TextureKind, gl: &mut dyn RenderBackend) -> Texture {
        if let Some(tex) = self.builtins.get(&kind) {
            return *tex;
        }
        let tex = kind
            .load(&self.asset_dir, gl)
            .unwrap_or_else(|err| panic!("error loading texture {kind:?}: {err}"));
        self.builtins.insert(kind, tex);
        tex
    }

    fn texture(&mut self, slot: &TextureSlot, gl: &mut dyn RenderBackend) -> Option<Texture> {
        match slot {
            TextureSlot::Builtin(kind) => Some(self.builtin(*kind, gl)),
            TextureSlot::File { path, convert } => {
                if let Some(entry) = self.files.get(path) {
                    return *entry;
                }
                let entry = match textures::from_file(path, *convert, false, gl) {
                    Ok(tex) => Some(tex),
                    Err(err) => {
                        error!("texture load failed, drawing without it: {err}");
                        None
                    }
                };
                self.files.insert(path.clone(), entry);
                entry
            }
        }
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NullBackend;

    #[test]
    fn programs_compile_once_per_kind() {
        let mut gl = NullBackend::new();
        let mut cache = ResourceCache::new("assets");
        let a = cache.program(ShaderKind::Diffuse, &mut gl);
        let b = cache.program(ShaderKind::Diffuse, &mut gl);
        let c = cache.program(ShaderKind::BlinnPhong, &mut gl);
        assert_eq!(a, b);
        assert_ne!(a.id, c.id);
        assert_eq!(gl.programs_compiled, 2);
        assert_eq!(cache.program_count(), 2);
    }

    #[test]
    fn clones_share_textures_but_not_scalars() {
        let base = Material::wood();
        let mut copy = base.clone();
        copy.set_color(Vector4::new(1.0, 0.0, 0.0, 1.0));
        copy.set_ambient(0.1);
        assert_eq!(base.color(), WHITE);
        assert_eq!(base.ambient(), 1.0);
        assert_eq!(base.slots, copy.slots);
    }

    #[test]
    fn enable_sets_reflective_uniforms_only_for_reflective_kinds() {
        let mut gl = NullBackend::new();
        let mut cache = ResourceCache::new("assets");
        Material::diffuse().enable(&mut gl, &mut cache);
        let after_diffuse = gl.uniforms_set;
        Material::plastic().enable(&mut gl, &mut cache);
        // plastic additionally sets specularColor and shininess
        assert_eq!(gl.uniforms_set, after_diffuse * 2 + 2);
    }

    #[test]
    #[should_panic(expected = "not declared")]
    fn setting_undeclared_uniform_panics() {
        let mut gl = NullBackend::new();
        let mut cache = ResourceCache::new("assets");
        let prog = cache.program(ShaderKind::Diffuse, &mut gl);
        prog.set(&mut gl, "pointSize", 4.0);
    }

    #[test]
    fn unknown_material_name_is_an_error() {
        assert!(Material::by_name("chrome").is_err());
        assert!(Material::by_name("wood").is_ok());
    }
}
