use glam::{Quat, Vec3};

/// Axis-aligned box.
///
/// Overlap tests are inclusive on every axis: boxes meeting exactly at a
/// face count as overlapping, so resting contacts survive the broad phase
/// and the narrow phase gets to classify them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Zero-size box at a point.
    pub const fn point(p: Vec3) -> Self {
        Self { min: p, max: p }
    }

    /// Smallest box containing all points, or `None` for an empty set.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut aabb = Self::point(first);
        for p in iter {
            aabb.min = aabb.min.min(p);
            aabb.max = aabb.max.max(p);
        }
        Some(aabb)
    }

    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    #[inline]
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn expanded(&self, margin: f32) -> Aabb {
        Aabb {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Bounds of this box under a rigid pose. Conservative by construction:
    /// the result contains the rotated box, so nothing inside it is ever
    /// culled.
    pub fn transformed(&self, rotation: Quat, translation: Vec3) -> Aabb {
        let corners = self.corners();
        let mut aabb = Aabb::point(rotation * corners[0] + translation);
        for &corner in &corners[1..] {
            let p = rotation * corner + translation;
            aabb.min = aabb.min.min(p);
            aabb.max = aabb.max.max(p);
        }
        aabb
    }

    /// Slab test. Returns the entry distance along the ray, `None` on a
    /// miss. `inv_dir` is the componentwise reciprocal of the direction;
    /// infinite components from zero direction axes behave correctly.
    #[inline]
    pub fn ray_entry(&self, origin: Vec3, inv_dir: Vec3) -> Option<f32> {
        let t1 = (self.min - origin) * inv_dir;
        let t2 = (self.max - origin) * inv_dir;
        let near = t1.min(t2).max_element().max(0.0);
        let far = t1.max(t2).min_element();
        (near <= far).then_some(near)
    }
}
