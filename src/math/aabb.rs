use super::Point3;

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3,
    /// Maximum corner of the bounding box.
    pub max: Point3,
}

impl Aabb {
    /// An empty box that absorbs any point added to it.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Creates the smallest box containing all `points`.
    #[must_use]
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.add_point(p);
        }
        aabb
    }

    /// Returns `true` if no point was ever added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grows the box to contain `p`.
    pub fn add_point(&mut self, p: &Point3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Grows the box to contain `other`.
    pub fn merge(&mut self, other: &Aabb) {
        if other.is_empty() {
            return;
        }
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    /// Returns a copy enlarged by `gap` on every side.
    #[must_use]
    pub fn enlarged(&self, gap: f64) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self {
            min: Point3::new(self.min.x - gap, self.min.y - gap, self.min.z - gap),
            max: Point3::new(self.max.x + gap, self.max.y + gap, self.max.z + gap),
        }
    }

    /// Returns `true` if the two boxes share at least one point.
    #[must_use]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Returns `true` if `p` lies inside or on the box.
    #[must_use]
    pub fn contains(&self, p: &Point3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Length of the box diagonal, zero for an empty box.
    #[must_use]
    pub fn diagonal(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            (self.max - self.min).norm()
        }
    }

    /// Returns the eight corners of the box.
    #[must_use]
    pub fn corners(&self) -> [Point3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Point3::new(a.x, a.y, a.z),
            Point3::new(b.x, a.y, a.z),
            Point3::new(a.x, b.y, a.z),
            Point3::new(b.x, b.y, a.z),
            Point3::new(a.x, a.y, b.z),
            Point3::new(b.x, a.y, b.z),
            Point3::new(a.x, b.y, b.z),
            Point3::new(b.x, b.y, b.z),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn touching_boxes_overlap() {
        let a = Aabb::from_points(&[p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)]);
        let b = Aabb::from_points(&[p(1.0, 0.0, 0.0), p(2.0, 1.0, 1.0)]);
        assert!(a.overlaps(&b));
    }

    #[test]
    fn separated_boxes_need_gap() {
        let a = Aabb::from_points(&[p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)]);
        let b = Aabb::from_points(&[p(1.5, 0.0, 0.0), p(2.0, 1.0, 1.0)]);
        assert!(!a.overlaps(&b));
        assert!(a.enlarged(0.3).overlaps(&b.enlarged(0.3)));
    }

    #[test]
    fn empty_box_never_overlaps() {
        let a = Aabb::empty();
        let b = Aabb::from_points(&[p(0.0, 0.0, 0.0)]);
        assert!(a.is_empty());
        assert!(!a.overlaps(&b));
        assert!(a.diagonal().abs() < f64::EPSILON);
    }
}
