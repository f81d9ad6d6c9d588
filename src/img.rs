//! Image-decode collaborator.
//!
//! The material layer treats this as an opaque function: bytes in, packed
//! RGBA pixels out, with an optional conversion applied. Decoding itself is
//! delegated to the `image` crate.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Conversion applied to the decoded pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convert {
    None,
    /// Undo the sRGB gamma so the shaders light in linear space.
    SrgbToLinear,
    /// Derive a tangent-space normal map from a height/bump map by blurring
    /// and running a Sobel filter over the intensity.
    BumpToNormal,
}

/// Decoded image: packed RGBA, row major.
#[derive(Debug, Clone)]
pub struct Pixels {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

pub fn decode_file(path: &Path, convert: Convert) -> Result<Pixels> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    decode(&bytes, convert).map_err(|reason| Error::Image {
        path: path.to_path_buf(),
        reason,
    })
}

/// Decode image bytes and apply the conversion. The error is the decoder
/// message; callers attach the path.
pub fn decode(bytes: &[u8], convert: Convert) -> std::result::Result<Pixels, String> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| e.to_string())?
        .to_rgba8();
    let (width, height) = (decoded.width(), decoded.height());
    let mut data = decoded.into_raw();
    match convert {
        Convert::None => {}
        Convert::SrgbToLinear => srgb_to_linear(&mut data),
        Convert::BumpToNormal => data = bump_to_normal(&data, width, height),
    }
    Ok(Pixels {
        data,
        width,
        height,
    })
}

const GAMMA: f32 = 2.2;

fn srgb_to_linear(data: &mut [u8]) {
    let mut table = [0u8; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        *entry = (255.0 * (i as f32 / 255.0).powf(GAMMA)).round() as u8;
    }
    for px in data.chunks_exact_mut(4) {
        px[0] = table[px[0] as usize];
        px[1] = table[px[1] as usize];
        px[2] = table[px[2] as usize];
    }
}

const SOBEL_STRENGTH: f32 = 1.25;

/// Bump map to normal map: box-blur the intensity then encode the Sobel
/// gradient as an rgb normal, 0.5 biased.
fn bump_to_normal(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let (w, h) = (width as i32, height as i32);
    let at = |gray: &[f32], x: i32, y: i32| -> f32 {
        let x = x.clamp(0, w - 1);
        let y = y.clamp(0, h - 1);
        gray[(y * w + x) as usize]
    };

    let mut gray: Vec<f32> = data
        .chunks_exact(4)
        .map(|px| (px[0] as f32 + px[1] as f32 + px[2] as f32) / (3.0 * 255.0))
        .collect();

    let mut blurred = vec![0.0f32; gray.len()];
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0.0;
            for dy in -1..=1 {
                for dx in -1..=1 {
                    sum += at(&gray, x + dx, y + dy);
                }
            }
            blurred[(y * w + x) as usize] = sum / 9.0;
        }
    }
    gray = blurred;

    let mut out = vec![0u8; data.len()];
    for y in 0..h {
        for x in 0..w {
            let (t, b) = (at(&gray, x, y - 1), at(&gray, x, y + 1));
            let (l, r) = (at(&gray, x - 1, y), at(&gray, x + 1, y));
            let (tl, tr) = (at(&gray, x - 1, y - 1), at(&gray, x + 1, y - 1));
            let (bl, br) = (at(&gray, x - 1, y + 1), at(&gray, x + 1, y + 1));
            let dx = (tl + 2.0 * l + bl) - (tr + 2.0 * r + br);
            let dy = (bl + 2.0 * b + br) - (tl + 2.0 * t + tr);
            let dz = 1.0 / SOBEL_STRENGTH;
            let norm = 1.0 / (dx * dx + dy * dy + dz * dz).sqrt();
            let o = ((y * w + x) * 4) as usize;
            out[o] = (255.0 * (0.5 + 0.5 * dx * norm)) as u8;
            out[o + 1] = (255.0 * (0.5 + 0.5 * dy * norm)) as u8;
            out[o + 2] = (255.0 * (0.5 + 0.5 * dz * norm)) as u8;
            out[o + 3] = 0xff;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_table_darkens_midtones() {
        let mut px = vec![128, 128, 128, 255];
        srgb_to_linear(&mut px);
        assert!(px[0] < 128);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn flat_bump_gives_straight_up_normal() {
        let data = vec![128u8; 4 * 4 * 4];
        let out = bump_to_normal(&data, 4, 4);
        // r and g centred, b saturated towards +z
        assert_eq!(out[0], 127);
        assert_eq!(out[1], 127);
        assert!(out[2] > 200);
    }
}
