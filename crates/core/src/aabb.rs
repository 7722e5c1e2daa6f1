use std::cmp::Ordering;
use std::ops::Add;

use crate::Vec3;

/// Axis-aligned bounding box stored as center + half-extents.
///
/// `half_size` components are never negative. Boxes have a total order
/// (lexicographic over center then half-size, `f64::total_cmp` per
/// component) so block colliders can be deduplicated in a `BTreeSet`.
#[derive(Debug, Clone, Copy)]
pub struct AABB {
    center: Vec3,
    half_size: Vec3,
}

impl AABB {
    pub fn new(center: Vec3, half_size: Vec3) -> Self {
        debug_assert!(
            half_size.x >= 0.0 && half_size.y >= 0.0 && half_size.z >= 0.0,
            "AABB half_size must be non-negative: {half_size:?}"
        );
        Self { center, half_size }
    }

    /// Box spanning `min..max` on every axis.
    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self::new((min + max) * 0.5, (max - min) * 0.5)
    }

    /// The full unit cube `(0,0,0)..(1,1,1)`, the collision shape of an
    /// ordinary solid block.
    pub fn unit_cube() -> Self {
        Self::new(Vec3::new(0.5, 0.5, 0.5), Vec3::new(0.5, 0.5, 0.5))
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn half_size(&self) -> Vec3 {
        self.half_size
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.half_size
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.half_size
    }

    /// Closest point to `pos` inside (or on the surface of) the box.
    pub fn closest_point(&self, pos: Vec3) -> Vec3 {
        let min = self.min();
        let max = self.max();
        Vec3::new(
            pos.x.clamp(min.x, max.x),
            pos.y.clamp(min.y, max.y),
            pos.z.clamp(min.z, max.z),
        )
    }

    pub fn volume(&self) -> f64 {
        self.half_size.x * 2.0 * self.half_size.y * 2.0 * self.half_size.z * 2.0
    }

    /// Whether the two boxes overlap. Strict: boxes that merely share a
    /// boundary do not collide.
    pub fn collide(&self, other: &AABB) -> bool {
        (self.center.x - other.center.x).abs() < self.half_size.x + other.half_size.x
            && (self.center.y - other.center.y).abs() < self.half_size.y + other.half_size.y
            && (self.center.z - other.center.z).abs() < self.half_size.z + other.half_size.z
    }

    /// Slab test: does the half-line `origin + t * direction` (t >= 0) pass
    /// through the box?
    pub fn intersect(&self, origin: Vec3, direction: Vec3) -> bool {
        let min = self.min();
        let max = self.max();
        let mut t_enter = f64::NEG_INFINITY;
        let mut t_exit = f64::INFINITY;

        for i in 0..3 {
            if direction[i] == 0.0 {
                // Parallel to this slab: either always inside it or never.
                if origin[i] < min[i] || origin[i] > max[i] {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / direction[i];
            let mut t0 = (min[i] - origin[i]) * inv;
            let mut t1 = (max[i] - origin[i]) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_enter = t_enter.max(t0);
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return false;
            }
        }

        t_exit >= 0.0
    }

    /// Grow (or shrink, for negative `d`) by `d` on every face.
    #[must_use]
    pub fn inflate(mut self, d: f64) -> Self {
        self.half_size += Vec3::new(d, d, d);
        self
    }

    #[must_use]
    pub fn translate(mut self, t: Vec3) -> Self {
        self.center += t;
        self
    }

    fn key(&self) -> [f64; 6] {
        [
            self.center.x,
            self.center.y,
            self.center.z,
            self.half_size.x,
            self.half_size.y,
            self.half_size.z,
        ]
    }
}

impl Add<Vec3> for AABB {
    type Output = AABB;
    fn add(mut self, offset: Vec3) -> AABB {
        self.center += offset;
        self
    }
}

impl PartialEq for AABB {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AABB {}

impl PartialOrd for AABB {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AABB {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key()
            .iter()
            .zip(other.key().iter())
            .map(|(a, b)| a.total_cmp(b))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}
