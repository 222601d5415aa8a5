//! Lumo math - vectors, rays, boxes and the intersection primitives
//! shared by the BVH and the path tracer.

// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod camera;
mod interval;
mod ray;
mod triangle;

pub use aabb::Aabb;
pub use camera::{Camera, Viewport};
pub use interval::Interval;
pub use ray::{reflect, refract, Ray};
pub use triangle::{Triangle, TriangleHit};
