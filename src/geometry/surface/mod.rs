mod plane;
mod sphere;

pub use plane::Plane;
pub use sphere::Sphere;

use crate::error::Result;
use crate::math::{Point3, Vector3};

/// Parameter domain for a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceDomain {
    /// Start of the U parameter range.
    pub u_min: f64,
    /// End of the U parameter range.
    pub u_max: f64,
    /// Start of the V parameter range.
    pub v_min: f64,
    /// End of the V parameter range.
    pub v_max: f64,
}

impl SurfaceDomain {
    /// Creates a new surface domain.
    #[must_use]
    pub fn new(u_min: f64, u_max: f64, v_min: f64, v_max: f64) -> Self {
        Self {
            u_min,
            u_max,
            v_min,
            v_max,
        }
    }
}

/// Trait for parametric surfaces in 3D space.
pub trait Surface {
    /// Evaluates the surface at parameters `(u, v)`, returning the 3D point.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are out of range or evaluation fails.
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3>;

    /// Computes the unit surface normal at parameters `(u, v)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are out of range or the normal is degenerate.
    fn normal(&self, u: f64, v: f64) -> Result<Vector3>;

    /// Returns the first partial derivatives `(dP/du, dP/dv)`.
    ///
    /// Their cross product points along [`Surface::normal`].
    ///
    /// # Errors
    ///
    /// Returns an error if evaluation fails.
    fn partials(&self, u: f64, v: f64) -> Result<(Vector3, Vector3)>;

    /// Returns the parameter domain of the surface.
    fn domain(&self) -> SurfaceDomain;

    /// Returns the `(u, v)` parameters of the surface point closest to `point`.
    ///
    /// Periodic parameters are answered inside the base domain.
    ///
    /// # Errors
    ///
    /// Returns an error if the projection is undefined.
    fn project(&self, point: &Point3) -> Result<(f64, f64)>;

    /// Signed distance from `point` to the surface, positive on the normal side.
    fn signed_distance(&self, point: &Point3) -> f64;

    /// Period of the `u` parameter, if the surface closes on itself in `u`.
    fn u_period(&self) -> Option<f64> {
        None
    }

    /// Approximate length in model units of one unit of parameter space.
    fn metric_scale(&self) -> f64 {
        1.0
    }
}
