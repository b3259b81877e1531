mod circle;
mod line;

pub use circle::Circle;
pub use line::Line;

use crate::error::Result;
use crate::math::{Aabb, Point3, Vector3};

/// Parameter domain for a curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveDomain {
    /// Start of the parameter range.
    pub t_min: f64,
    /// End of the parameter range.
    pub t_max: f64,
}

impl CurveDomain {
    /// Creates a new curve domain.
    #[must_use]
    pub fn new(t_min: f64, t_max: f64) -> Self {
        Self { t_min, t_max }
    }
}

/// Trait for parametric curves in 3D space.
pub trait Curve {
    /// Evaluates the curve at parameter `t`, returning the 3D point.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is out of range or evaluation fails.
    fn evaluate(&self, t: f64) -> Result<Point3>;

    /// Computes the unit tangent vector at parameter `t`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is out of range or the tangent is degenerate.
    fn tangent(&self, t: f64) -> Result<Vector3>;

    /// Returns the parameter domain of the curve.
    fn domain(&self) -> CurveDomain;

    /// Returns whether the curve is closed.
    fn is_closed(&self) -> bool;

    /// Returns the period of a periodic curve.
    fn period(&self) -> Option<f64> {
        None
    }

    /// Returns the parameter of the curve point closest to `point`.
    ///
    /// Periodic curves answer inside their base domain.
    ///
    /// # Errors
    ///
    /// Returns an error if the projection is undefined or does not converge.
    fn project(&self, point: &Point3) -> Result<f64>;

    /// Bounding box of the curve restricted to `[t0, t1]`.
    fn bounding_box(&self, t0: f64, t1: f64) -> Aabb;
}

/// Parameter of the point closest to `point` within `[t0, t1]`.
///
/// Periodic curves are unwrapped into the window starting at `t0`, and a
/// projection falling outside the range snaps to the nearer end.
///
/// # Errors
///
/// Returns an error if the curve cannot be evaluated or projected.
pub fn project_in_range<C: Curve + ?Sized>(
    curve: &C,
    point: &Point3,
    t0: f64,
    t1: f64,
) -> Result<f64> {
    let mut t = curve.project(point)?;
    if let Some(period) = curve.period() {
        t = crate::math::wrap_parameter(t, t0, period);
        if t > t1 {
            let d_end = (curve.evaluate(t1)? - point).norm();
            let d_start = (curve.evaluate(t0)? - point).norm();
            t = if d_end <= d_start { t1 } else { t0 };
        }
        return Ok(t);
    }
    Ok(t.clamp(t0, t1))
}
