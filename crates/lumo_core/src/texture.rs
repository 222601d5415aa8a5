//! Texture loading and caching for materials.
//!
//! Textures are decoded once into linear float RGB and shared between
//! materials through [`TextureCache`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lumo_math::Vec3;

use crate::SceneResult;

/// A loaded texture with pixel data.
#[derive(Clone, Debug)]
pub struct Texture {
    /// Texture width in pixels
    pub width: u32,

    /// Texture height in pixels
    pub height: u32,

    /// Pixel data, row-major, first row at the top of the image
    pub pixels: Vec<Vec3>,

    /// Source file path, for debugging
    pub path: String,
}

impl Texture {
    /// Create a new texture from pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<Vec3>, path: impl Into<String>) -> Self {
        debug_assert_eq!(pixels.len(), (width * height) as usize);
        Self {
            width,
            height,
            pixels,
            path: path.into(),
        }
    }

    /// Create a solid color texture (1x1).
    pub fn solid_color(color: Vec3) -> Self {
        Self::new(1, 1, vec![color], "<solid>")
    }

    /// Nearest-pixel lookup. Coordinates outside `[0, 1)` wrap around.
    pub fn pixel(&self, u: f32, v: f32) -> Vec3 {
        lookup_nearest(&self.pixels, self.width, self.height, u, v)
    }

    /// Get total size in bytes (approximate).
    pub fn size_bytes(&self) -> usize {
        self.pixels.len() * std::mem::size_of::<Vec3>()
    }
}

/// Shared nearest lookup for textures and environment maps.
pub(crate) fn lookup_nearest(pixels: &[Vec3], width: u32, height: u32, u: f32, v: f32) -> Vec3 {
    if width == 0 || height == 0 {
        return Vec3::ZERO;
    }
    let (w, h) = (width as i64, height as i64);
    let x = ((w as f32 * u).floor() as i64).rem_euclid(w);
    let y = ((h as f32 * v).floor() as i64).rem_euclid(h);
    pixels
        .get((y * w + x) as usize)
        .copied()
        .unwrap_or(Vec3::ZERO)
}

/// Cache for loaded textures.
///
/// Textures are loaded on-demand and cached for reuse.
pub struct TextureCache {
    /// Cached textures by resolved file path
    textures: HashMap<PathBuf, Arc<Texture>>,

    /// Base directory for resolving relative paths
    base_dir: Option<PathBuf>,
}

impl TextureCache {
    /// Create a new empty texture cache.
    pub fn new() -> Self {
        Self {
            textures: HashMap::new(),
            base_dir: None,
        }
    }

    /// Create a texture cache with a base directory for relative paths.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            textures: HashMap::new(),
            base_dir: Some(base_dir.into()),
        }
    }

    /// Load a texture from file, using cache if available.
    pub fn load(&mut self, path: &str) -> SceneResult<Arc<Texture>> {
        let full_path = self.resolve_path(path);

        if let Some(texture) = self.textures.get(&full_path) {
            return Ok(texture.clone());
        }

        let texture = Arc::new(load_texture_file(&full_path)?);
        self.textures.insert(full_path, texture.clone());

        log::debug!(
            "Loaded texture: {} ({}x{}, {:.1} KB)",
            path,
            texture.width,
            texture.height,
            texture.size_bytes() as f32 / 1024.0
        );

        Ok(texture)
    }

    /// Get the number of cached textures.
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Resolve a path relative to the base directory.
    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);

        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(base) = &self.base_dir {
            base.join(path)
        } else {
            path.to_path_buf()
        }
    }
}

impl Default for TextureCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Load a texture from a file path.
///
/// 8-bit channels are divided by 255 without any sRGB decoding.
fn load_texture_file(path: &Path) -> SceneResult<Texture> {
    let rgb = image::open(path)?.to_rgb8();
    let (width, height) = rgb.dimensions();

    let pixels = rgb
        .pixels()
        .map(|p| {
            Vec3::new(
                p[0] as f32 / 255.0,
                p[1] as f32 / 255.0,
                p[2] as f32 / 255.0,
            )
        })
        .collect();

    Ok(Texture::new(
        width,
        height,
        pixels,
        path.to_string_lossy().to_string(),
    ))
}
