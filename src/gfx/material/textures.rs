//! Texture values and the built-in texture set.
//!
//! Built-in textures are decoded from the asset directory configured on the
//! [`ResourceCache`](super::ResourceCache); a missing or undecodable
//! built-in is an asset-authoring mistake and panics at the cache layer.

use std::path::{Path, PathBuf};

use crate::backend::{RenderBackend, TextureId, TextureImage, TextureTarget};
use crate::error::Result;
use crate::img::{self, Convert, Pixels};

/// Built-in textures used by the named materials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Wood,
    /// 64x64x64 noise volume packed into a 64x4096 2d image.
    Turbulence,
    Earth,
    EarthSpec,
    Skybox,
    Metallic,
    MetallicSpec,
}

/// A texture uploaded to the backend. Cheap to copy; the id is owned by the
/// resource cache for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Texture {
    pub id: TextureId,
    pub target: TextureTarget,
}

impl TextureKind {
    pub fn target(self) -> TextureTarget {
        match self {
            TextureKind::Turbulence => TextureTarget::Tex3d,
            TextureKind::Earth | TextureKind::EarthSpec | TextureKind::Skybox => {
                TextureTarget::Cube
            }
            _ => TextureTarget::Tex2d,
        }
    }

    pub(crate) fn load(self, dir: &Path, gl: &mut dyn RenderBackend) -> Result<Texture> {
        match self {
            TextureKind::Wood => flat(dir.join("wood.png"), TextureTarget::Tex2d, false, gl),
            TextureKind::Turbulence => {
                flat(dir.join("turbulence3.png"), TextureTarget::Tex3d, true, gl)
            }
            TextureKind::Metallic => flat(dir.join("metallic.png"), TextureTarget::Tex2d, false, gl),
            TextureKind::MetallicSpec => {
                flat(dir.join("metallic_spec.png"), TextureTarget::Tex2d, false, gl)
            }
            TextureKind::Earth => cubemap(dir, "earth", gl),
            TextureKind::EarthSpec => cubemap(dir, "earth_spec", gl),
            TextureKind::Skybox => cubemap(dir, "skybox", gl),
        }
    }
}

pub(crate) fn image_of(pix: &Pixels) -> TextureImage<'_> {
    TextureImage {
        pixels: &pix.data,
        width: pix.width,
        height: pix.height,
    }
}

/// Upload a texture decoded from a single image file.
pub fn from_file(
    path: &Path,
    convert: Convert,
    clamp: bool,
    gl: &mut dyn RenderBackend,
) -> Result<Texture> {
    let pix = img::decode_file(path, convert)?;
    Ok(Texture {
        id: gl.create_texture(TextureTarget::Tex2d, clamp, &[image_of(&pix)]),
        target: TextureTarget::Tex2d,
    })
}

fn flat(
    path: PathBuf,
    target: TextureTarget,
    clamp: bool,
    gl: &mut dyn RenderBackend,
) -> Result<Texture> {
    let pix = img::decode_file(&path, Convert::None)?;
    Ok(Texture {
        id: gl.create_texture(target, clamp, &[image_of(&pix)]),
        target,
    })
}

const CUBE_SIDES: [&str; 6] = ["posx", "negx", "posy", "negy", "posz", "negz"];

fn cubemap(dir: &Path, base: &str, gl: &mut dyn RenderBackend) -> Result<Texture> {
    let mut faces = Vec::with_capacity(6);
    for side in CUBE_SIDES {
        faces.push(img::decode_file(
            &dir.join(format!("{base}_{side}.png")),
            Convert::None,
        )?);
    }
    let images: Vec<TextureImage<'_>> = faces.iter().map(image_of).collect();
    Ok(Texture {
        id: gl.create_texture(TextureTarget::Cube, true, &images),
        target: TextureTarget::Cube,
    })
}
