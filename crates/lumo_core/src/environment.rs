//! Environment (HDRI) map surrounding the scene.

use std::f32::consts::PI;
use std::path::Path;

use lumo_math::{Vec2, Vec3};

use crate::texture::lookup_nearest;
use crate::SceneResult;

/// Latitude-longitude environment map in linear float RGB.
#[derive(Clone, Debug)]
pub struct Environment {
    pub width: u32,
    pub height: u32,
    /// Row-major, first row at the zenith
    pub pixels: Vec<Vec3>,
}

impl Environment {
    pub fn new(width: u32, height: u32, pixels: Vec<Vec3>) -> Self {
        debug_assert_eq!(pixels.len(), (width * height) as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Constant background color in every direction.
    pub fn uniform(color: Vec3) -> Self {
        Self::new(1, 1, vec![color])
    }

    /// Load an environment map from any format `image` can decode.
    ///
    /// Radiance `.hdr` files keep their full range; LDR formats are
    /// normalized to `[0, 1]`.
    pub fn load(path: impl AsRef<Path>) -> SceneResult<Self> {
        let path = path.as_ref();
        let rgb = image::open(path)?.to_rgb32f();
        let (width, height) = rgb.dimensions();
        let pixels = rgb
            .pixels()
            .map(|p| Vec3::new(p[0], p[1], p[2]))
            .collect();

        log::info!("Environment: {} ({}x{})", path.display(), width, height);
        Ok(Self::new(width, height, pixels))
    }

    /// Nearest-pixel lookup by `(u, v)`, wrapping outside `[0, 1)`.
    pub fn pixel(&self, u: f32, v: f32) -> Vec3 {
        lookup_nearest(&self.pixels, self.width, self.height, u, v)
    }

    /// Radiance arriving from direction `dir` (need not be normalized).
    pub fn lookup(&self, dir: Vec3) -> Vec3 {
        let uv = direction_to_uv(dir);
        self.pixel(uv.x, uv.y)
    }
}

/// Map a direction onto the latitude-longitude parameterization.
///
/// `v = theta / pi` with theta measured from +Y; `u` is the azimuth around
/// Y, shifted by a quarter turn so that +Z faces the middle of the map. A
/// direction with no horizontal component gets azimuth 0.
pub fn direction_to_uv(dir: Vec3) -> Vec2 {
    let dir = dir.normalize_or_zero();
    let theta = dir.y.clamp(-1.0, 1.0).acos();

    let horizontal = (dir.x * dir.x + dir.z * dir.z).sqrt();
    let mut phi = if horizontal > 0.0 {
        (dir.x / horizontal).clamp(-1.0, 1.0).acos()
    } else {
        0.0
    };
    if dir.z < 0.0 {
        phi = 2.0 * PI - phi;
    }

    Vec2::new(phi / (2.0 * PI) + 0.25, theta / PI)
}
