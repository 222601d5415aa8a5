//! Surface materials.

use std::sync::Arc;

use lumo_math::{Vec2, Vec3};

use crate::Texture;

/// Surface description read by the path tracer.
///
/// A color channel that is exactly zero switches the matching transport
/// term off entirely.
#[derive(Clone, Debug)]
pub struct Material {
    pub name: String,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
    pub emissive: Vec3,
    /// Mirror reflection weight
    pub reflective: Vec3,
    /// Refraction weight
    pub transparent: Vec3,
    /// Index of refraction
    pub ior: f32,
    /// Replaces `diffuse` when present
    pub texture: Option<Arc<Texture>>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            diffuse: Vec3::ZERO,
            specular: Vec3::ZERO,
            shininess: 80.0,
            emissive: Vec3::ZERO,
            reflective: Vec3::ZERO,
            transparent: Vec3::ZERO,
            ior: 1.0,
            texture: None,
        }
    }
}

impl Material {
    /// Plain diffuse material.
    pub fn diffuse(color: Vec3) -> Self {
        Self {
            diffuse: color,
            ..Default::default()
        }
    }

    /// Light source that only emits.
    pub fn emissive(color: Vec3) -> Self {
        Self {
            emissive: color,
            ..Default::default()
        }
    }

    /// Perfect mirror.
    pub fn mirror(color: Vec3) -> Self {
        Self {
            reflective: color,
            ..Default::default()
        }
    }

    /// Clear dielectric.
    pub fn glass(color: Vec3, ior: f32) -> Self {
        Self {
            transparent: color,
            ior,
            ..Default::default()
        }
    }

    pub fn has_texture(&self) -> bool {
        self.texture.is_some()
    }

    /// Diffuse color at a surface point. The texture wins when both it and
    /// a UV are available.
    pub fn diffuse_at(&self, uv: Option<Vec2>) -> Vec3 {
        match (&self.texture, uv) {
            (Some(texture), Some(uv)) => texture.pixel(uv.x, uv.y),
            _ => self.diffuse,
        }
    }
}
