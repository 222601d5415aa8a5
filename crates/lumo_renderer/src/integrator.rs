//! Recursive path tracing integrator.
//!
//! At every hit up to three secondary rays are traced: a mirror reflection,
//! a refraction (or total internal reflection) and one cosine-weighted
//! diffuse bounce. Their estimates are blended with the material colors
//! and the emissive term is added on top, scaled by [`EMISSIVE_SCALE`].
//! The blend is not energy conserving; scenes are authored against it.

use lumo_core::Environment;
use lumo_math::{reflect, refract, Ray, Vec3};

use crate::bvh::Bvh;
use crate::sampler::{cosine_hemisphere, Sampler};

/// Emissive colors are authored in `[0, 1]` and scaled up by this factor.
pub const EMISSIVE_SCALE: f32 = 100.0;

/// Distance secondary rays are pushed off the surface they leave.
pub const RAY_EPSILON: f32 = 0.001;

/// Sampler dimensions consumed per bounce.
pub const DIMENSIONS_PER_BOUNCE: usize = 2;

/// Path tracer over a BVH and an environment map.
#[derive(Clone, Copy)]
pub struct Integrator<'a> {
    bvh: &'a Bvh,
    environment: &'a Environment,
    max_depth: u32,
}

impl<'a> Integrator<'a> {
    /// Hits deeper than `max_depth` return their emission only.
    pub fn new(bvh: &'a Bvh, environment: &'a Environment, max_depth: u32) -> Self {
        Self {
            bvh,
            environment,
            max_depth,
        }
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// First sampler dimension that no bounce ever reads.
    pub fn bounce_dimensions(&self) -> usize {
        DIMENSIONS_PER_BOUNCE * (self.max_depth as usize + 1)
    }

    /// Radiance arriving along `ray` at bounce `depth`.
    ///
    /// `ray.direction` must be normalized. Back faces are only hit when
    /// `back_face` is set, which is the case for rays travelling inside a
    /// dielectric.
    pub fn radiance<S: Sampler>(&self, ray: &Ray, depth: u32, back_face: bool, sampler: &mut S) -> Vec3 {
        let Some(hit) = self.bvh.intersect(ray, back_face) else {
            return self.environment.lookup(ray.direction);
        };
        let material = hit.material;
        let emission = material.emissive * EMISSIVE_SCALE;

        if depth > self.max_depth {
            return emission;
        }

        let dir = ray.direction;

        let mut reflected = Vec3::ZERO;
        if material.reflective != Vec3::ZERO {
            let r = reflect(dir, hit.normal);
            let next = Ray::offset(hit.position, r, r, RAY_EPSILON);
            reflected = self.radiance(&next, depth + 1, false, sampler);
        }

        let mut transmitted = Vec3::ZERO;
        if material.transparent != Vec3::ZERO {
            let mut ior = material.ior;
            let mut normal = hit.normal;
            let f0 = ((ior - 1.0) / (ior + 1.0)).powi(2);

            if dir.dot(normal) >= 0.0 {
                // Leaving the medium
                normal = -normal;
            } else {
                ior = 1.0 / ior;
            }

            let ddn = dir.dot(normal);
            transmitted = match refract(dir, normal, ior) {
                Some(t) => {
                    let next = Ray::offset(hit.position, t, t, RAY_EPSILON);
                    let fresnel = f0 + (1.0 - f0) * (1.0 + ddn).powi(5);
                    self.radiance(&next, depth + 1, true, sampler) * (1.0 - fresnel)
                }
                None => {
                    // Total internal reflection
                    let r = reflect(dir, hit.normal);
                    let next = Ray::offset(hit.position, r, r, RAY_EPSILON);
                    self.radiance(&next, depth + 1, false, sampler)
                }
            };
        }

        // A dark texel still draws its bounce so the sampler call order
        // depends only on the material
        let albedo = material.diffuse_at(hit.uv);
        let mut diffuse = Vec3::ZERO;
        if material.diffuse != Vec3::ZERO {
            let dimension = DIMENSIONS_PER_BOUNCE * depth as usize;
            let s = sampler.sample_2d(dimension);
            let d = cosine_hemisphere(hit.normal, s.x, s.y);
            let next = Ray::offset(hit.position, hit.normal, d, RAY_EPSILON);
            diffuse = self.radiance(&next, depth + 1, false, sampler);
        }

        albedo
            * diffuse
            * (1.0 - material.reflective.max_element())
            * (1.0 - material.transparent.max_element())
            + material.reflective * reflected
            + material.transparent * transmitted
            + emission
    }
}
