use crate::error::Result;
use crate::math::{Aabb, Point3, Vector3};

use super::{Curve, CurveDomain};

/// An infinite line defined by an origin point and a direction vector.
///
/// The parametric form is: `P(t) = origin + t * direction`, with a unit
/// direction so that `t` measures arc length.
#[derive(Debug, Clone)]
pub struct Line {
    origin: Point3,
    direction: Vector3,
}

impl Line {
    /// Creates a new line from an origin and direction.
    ///
    /// # Errors
    ///
    /// Returns an error if the direction vector is zero-length.
    pub fn new(origin: Point3, direction: Vector3) -> Result<Self> {
        let len = direction.norm();
        if len < crate::math::TOLERANCE {
            return Err(crate::error::GeometryError::ZeroVector.into());
        }
        Ok(Self {
            origin,
            direction: direction / len,
        })
    }

    /// Creates the line through `a` and `b`, parameterized so that
    /// `t = 0` is `a` and `t = |b - a|` is `b`.
    ///
    /// # Errors
    ///
    /// Returns an error if the points coincide.
    pub fn through(a: Point3, b: Point3) -> Result<Self> {
        Self::new(a, b - a)
    }

    /// Returns the origin point of the line.
    #[must_use]
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Returns the unit direction vector of the line.
    #[must_use]
    pub fn direction(&self) -> &Vector3 {
        &self.direction
    }

    /// Distance from `point` to the infinite line.
    #[must_use]
    pub fn distance_to(&self, point: &Point3) -> f64 {
        let d = point - self.origin;
        (d - self.direction * d.dot(&self.direction)).norm()
    }
}

impl Curve for Line {
    fn evaluate(&self, t: f64) -> Result<Point3> {
        Ok(self.origin + self.direction * t)
    }

    fn tangent(&self, _t: f64) -> Result<Vector3> {
        Ok(self.direction)
    }

    fn domain(&self) -> CurveDomain {
        CurveDomain::new(f64::NEG_INFINITY, f64::INFINITY)
    }

    fn is_closed(&self) -> bool {
        false
    }

    fn project(&self, point: &Point3) -> Result<f64> {
        Ok((point - self.origin).dot(&self.direction))
    }

    fn bounding_box(&self, t0: f64, t1: f64) -> Aabb {
        let a = self.origin + self.direction * t0;
        let b = self.origin + self.direction * t1;
        Aabb::from_points(&[a, b])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::TOLERANCE;

    #[test]
    fn through_measures_arc_length() {
        let l = Line::through(Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 3.0, 0.0)).unwrap();
        let p = l.evaluate(3.0).unwrap();
        assert!((p - Point3::new(1.0, 3.0, 0.0)).norm() < TOLERANCE);
    }

    #[test]
    fn project_onto_line() {
        let l = Line::new(Point3::origin(), Vector3::x()).unwrap();
        let t = l.project(&Point3::new(2.5, 1.0, -4.0)).unwrap();
        assert!((t - 2.5).abs() < TOLERANCE);
        assert!((l.distance_to(&Point3::new(2.5, 3.0, 4.0)) - 5.0).abs() < TOLERANCE);
    }

    #[test]
    fn zero_direction_fails() {
        assert!(Line::new(Point3::origin(), Vector3::zeros()).is_err());
    }
}
