use crate::{Interval, Ray, Vec3};

/// Axis-Aligned Bounding Box for spatial acceleration structures (BVH).
///
/// An AABB is defined by three intervals (one per axis) that bound a 3D volume.
/// [`Aabb::EMPTY`] uses `+inf/-inf` sentinels and is the identity of
/// [`Aabb::surrounding`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// Create a new AABB from three intervals.
    pub fn new(x: Interval, y: Interval, z: Interval) -> Self {
        Self { x, y, z }
    }

    /// Create an AABB from two corner points.
    ///
    /// Axes thinner than a small delta are padded so that flat triangles
    /// still produce a box with volume.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        let x = Interval::new(a.x.min(b.x), a.x.max(b.x));
        let y = Interval::new(a.y.min(b.y), a.y.max(b.y));
        let z = Interval::new(a.z.min(b.z), a.z.max(b.z));

        let mut aabb = Self { x, y, z };
        aabb.pad_to_minimums();
        aabb
    }

    /// Smallest box enclosing every point of the iterator (padded like
    /// [`Aabb::from_points`]). Returns [`Aabb::EMPTY`] for no points.
    pub fn from_iter_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        let mut any = false;
        for p in points {
            min = min.min(p);
            max = max.max(p);
            any = true;
        }
        if !any {
            return Self::EMPTY;
        }
        Self::from_points(min, max)
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&box0.x, &box1.x),
            y: Interval::surrounding(&box0.y, &box1.y),
            z: Interval::surrounding(&box0.z, &box1.z),
        }
    }

    /// Get the interval for a specific axis (0=X, 1=Y, 2=Z).
    pub fn axis_interval(&self, n: usize) -> Interval {
        match n {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    /// True if any axis is empty.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty() || self.z.is_empty()
    }

    /// Surface area of the box, zero for an empty box.
    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let (dx, dy, dz) = (self.x.size(), self.y.size(), self.z.size());
        2.0 * (dx * dy + dy * dz + dz * dx)
    }

    /// Returns true if the point lies inside or on the box.
    pub fn contains(&self, p: Vec3) -> bool {
        self.x.contains(p.x) && self.y.contains(p.y) && self.z.contains(p.z)
    }

    /// Slab test against the ray `origin + t * direction` for `t >= 0`.
    ///
    /// Returns the entry distance, which is 0 when the origin is inside.
    /// Near-zero direction components are treated as parallel to the slab.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        if self.is_empty() {
            return None;
        }

        let mut t = Interval::FORWARD;

        for axis in 0..3 {
            let slab = self.axis_interval(axis);
            let o = ray.origin[axis];
            let d = ray.direction[axis];

            if d.abs() < f32::EPSILON {
                if !slab.contains(o) {
                    return None;
                }
            } else {
                let ood = 1.0 / d;
                let t1 = (slab.min - o) * ood;
                let t2 = (slab.max - o) * ood;
                t = t.intersect(&Interval::new(t1.min(t2), t1.max(t2)));
                if t.is_empty() {
                    return None;
                }
            }
        }

        Some(t.min)
    }

    /// Pad intervals to avoid zero-width AABBs (degenerate cases).
    fn pad_to_minimums(&mut self) {
        let delta = 0.0001;
        if self.x.size() < delta {
            self.x = self.x.expand(delta);
        }
        if self.y.size() < delta {
            self.y = self.y.expand(delta);
        }
        if self.z.size() < delta {
            self.z = self.z.expand(delta);
        }
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        Vec3::new(
            (self.x.min + self.x.max) * 0.5,
            (self.y.min + self.y.max) * 0.5,
            (self.z.min + self.z.max) * 0.5,
        )
    }

    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };
}
