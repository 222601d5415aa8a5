use crate::Vec3;

/// A ray in 3D space with origin and direction.
///
/// The direction is not required to be normalized; hit distances are
/// measured in multiples of its length.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// A ray starting slightly away from `point` along `along`.
    ///
    /// Secondary rays are built this way so they do not re-hit the surface
    /// they leave.
    pub fn offset(point: Vec3, along: Vec3, direction: Vec3, epsilon: f32) -> Self {
        Self::new(point + along * epsilon, direction)
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Mirror `v` about the normal `n`.
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - n * (2.0 * n.dot(v))
}

/// Refract `v` through a surface with normal `n` and relative index `eta`.
///
/// Returns `None` on total internal reflection.
#[inline]
pub fn refract(v: Vec3, n: Vec3, eta: f32) -> Option<Vec3> {
    let ndv = n.dot(v);
    let k = 1.0 - eta * eta * (1.0 - ndv * ndv);
    if k < 0.0 {
        return None;
    }
    Some(v * eta - n * (eta * ndv + k.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_creation() {
        let origin = Vec3::new(1.0, 2.0, 3.0);
        let direction = Vec3::new(0.0, 1.0, 0.0);
        let ray = Ray::new(origin, direction);

        assert_eq!(ray.origin, origin);
        assert_eq!(ray.direction, direction);
    }

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);

        assert_eq!(ray.at(0.0), Vec3::ZERO);
        assert_eq!(ray.at(1.0), Vec3::X);
        assert_eq!(ray.at(2.0), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(ray.at(-1.0), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_ray_offset() {
        let ray = Ray::offset(Vec3::ZERO, Vec3::Y, Vec3::X, 0.001);
        assert_eq!(ray.origin, Vec3::new(0.0, 0.001, 0.0));
        assert_eq!(ray.direction, Vec3::X);
    }

    #[test]
    fn test_reflect() {
        let v = Vec3::new(1.0, -1.0, 0.0);
        let r = reflect(v, Vec3::Y);
        assert!((r - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_refract_straight_through() {
        let v = Vec3::new(0.0, -1.0, 0.0);
        let t = refract(v, Vec3::Y, 1.0 / 1.5).unwrap();
        assert!((t - v).length() < 1e-6);
    }

    #[test]
    fn test_refract_total_internal_reflection() {
        // Grazing ray leaving a dense medium
        let v = Vec3::new(0.9, -0.1, 0.0).normalize();
        assert!(refract(v, Vec3::Y, 1.5).is_none());
    }
}
