//! Triangle geometry and the ray-triangle test.
//!
//! The test uses the edge cross-product formulation from Ericson's
//! *Real-Time Collision Detection*, extended with optional back-face
//! admission.

use crate::{Aabb, Ray, Vec3};

/// Three vertex positions.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

/// Result of a successful ray-triangle test.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TriangleHit {
    /// Ray parameter of the hit, in multiples of the ray direction.
    pub t: f32,
    /// World-space hit position `a*u + b*v + c*w`.
    pub position: Vec3,
    /// Barycentric weights `(u, v, w)` for vertices `(a, b, c)`.
    pub barycentric: Vec3,
    /// Unnormalized geometric normal `(b - a) x (c - a)`.
    pub normal: Vec3,
}

impl Triangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    /// Padded bounding box of the three vertices.
    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_points(self.a.min(self.b).min(self.c), self.a.max(self.b).max(self.c))
    }

    /// Vertex average.
    pub fn centroid(&self) -> Vec3 {
        (self.a + self.b + self.c) / 3.0
    }

    /// Interpolate per-vertex attributes with barycentric weights.
    #[inline]
    pub fn interpolate<T>(values: [T; 3], barycentric: Vec3) -> T
    where
        T: std::ops::Mul<f32, Output = T> + std::ops::Add<Output = T> + Copy,
    {
        values[0] * barycentric.x + values[1] * barycentric.y + values[2] * barycentric.z
    }

    /// Intersect a ray with the triangle.
    ///
    /// Front faces are those whose normal points against the ray. With
    /// `back_face` set, back faces are admitted too; the reported normal and
    /// barycentrics are then expressed for the original vertex order.
    ///
    /// No lower bound on `t` is applied beyond `t >= 0`; callers offset
    /// secondary ray origins instead.
    pub fn intersect(&self, ray: &Ray, back_face: bool) -> Option<TriangleHit> {
        let mut ab = self.b - self.a;
        let mut ac = self.c - self.a;
        let qp = -ray.direction;

        let mut n = ab.cross(ac);
        let mut dt = qp.dot(n);
        let mut back = false;
        if back_face && dt <= 0.0 {
            std::mem::swap(&mut ab, &mut ac);
            n = -n;
            dt = qp.dot(n);
            back = true;
        }
        if dt <= 0.0 {
            return None;
        }

        let ap = ray.origin - self.a;
        let t = ap.dot(n);
        if t < 0.0 {
            return None;
        }

        let e = qp.cross(ap);
        let v = ac.dot(e);
        if v < 0.0 || v > dt {
            return None;
        }
        let w = -ab.dot(e);
        if w < 0.0 || v + w > dt {
            return None;
        }

        let ood = 1.0 / dt;
        let t = t * ood;
        let (mut v, mut w) = (v * ood, w * ood);
        let u = 1.0 - v - w;

        if back {
            n = -n;
            std::mem::swap(&mut v, &mut w);
        }

        Some(TriangleHit {
            t,
            position: self.a * u + self.b * v + self.c * w,
            barycentric: Vec3::new(u, v, w),
            normal: n,
        })
    }
}
