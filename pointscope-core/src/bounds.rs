//! Axis aligned bounding boxes in world coordinates

use crate::point::{Point3d, Vector3d};
use serde::{Deserialize, Serialize};

/// Axis aligned box with double precision corners.
///
/// The default box is empty (`min > max`), and extending an empty box by a
/// point yields a degenerate box containing exactly that point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Box3d {
    pub min: Point3d,
    pub max: Point3d,
}

impl Box3d {
    /// Create an empty box
    pub fn empty() -> Self {
        Self {
            min: Point3d::new(f64::MAX, f64::MAX, f64::MAX),
            max: Point3d::new(f64::MIN, f64::MIN, f64::MIN),
        }
    }

    /// Create a box from explicit corners
    pub fn new(min: Point3d, max: Point3d) -> Self {
        Self { min, max }
    }

    /// Smallest box enclosing all given points
    pub fn from_points<'a, I>(points: I) -> Self
    where
        I: IntoIterator<Item = &'a Point3d>,
    {
        let mut bbox = Self::empty();
        for p in points {
            bbox.extend_by(p);
        }
        bbox
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow the box to include `p`
    pub fn extend_by(&mut self, p: &Point3d) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Grow the box to include another box
    pub fn extend_by_box(&mut self, other: &Box3d) {
        if other.is_empty() {
            return;
        }
        self.extend_by(&other.min);
        self.extend_by(&other.max);
    }

    /// Grow the box by `margin` on every side
    pub fn padded(&self, margin: f64) -> Self {
        if self.is_empty() {
            return *self;
        }
        let m = Vector3d::new(margin, margin, margin);
        Self::new(self.min - m, self.max + m)
    }

    pub fn center(&self) -> Point3d {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> Vector3d {
        if self.is_empty() {
            return Vector3d::zeros();
        }
        self.max - self.min
    }

    /// Length of the box diagonal, zero for an empty box
    pub fn diagonal(&self) -> f64 {
        self.size().norm()
    }

    /// Largest absolute coordinate over both corners
    pub fn max_abs_coordinate(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.min.coords.amax().max(self.max.coords.amax())
    }

    /// Non-strict containment with a tolerance on every face
    pub fn contains(&self, p: &Point3d, tolerance: f64) -> bool {
        p.x >= self.min.x - tolerance
            && p.x <= self.max.x + tolerance
            && p.y >= self.min.y - tolerance
            && p.y <= self.max.y + tolerance
            && p.z >= self.min.z - tolerance
            && p.z <= self.max.z + tolerance
    }

    /// The eight corners, ordered by the bit pattern (x, y, z) of the index
    pub fn corners(&self) -> [Point3d; 8] {
        let (a, b) = (self.min, self.max);
        [
            Point3d::new(a.x, a.y, a.z),
            Point3d::new(b.x, a.y, a.z),
            Point3d::new(a.x, b.y, a.z),
            Point3d::new(b.x, b.y, a.z),
            Point3d::new(a.x, a.y, b.z),
            Point3d::new(b.x, a.y, b.z),
            Point3d::new(a.x, b.y, b.z),
            Point3d::new(b.x, b.y, b.z),
        ]
    }

    /// Child octant `index` obtained by splitting at the centre
    pub fn octant(&self, index: usize) -> Self {
        let c = self.center();
        let pick = |bit: usize, lo: f64, mid: f64, hi: f64| {
            if index & bit == 0 {
                (lo, mid)
            } else {
                (mid, hi)
            }
        };
        let (x0, x1) = pick(1, self.min.x, c.x, self.max.x);
        let (y0, y1) = pick(2, self.min.y, c.y, self.max.y);
        let (z0, z1) = pick(4, self.min.z, c.z, self.max.z);
        Self::new(Point3d::new(x0, y0, z0), Point3d::new(x1, y1, z1))
    }
}

impl Default for Box3d {
    fn default() -> Self {
        Self::empty()
    }
}
