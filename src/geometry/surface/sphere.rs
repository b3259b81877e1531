use std::f64::consts::{FRAC_PI_2, TAU};

use crate::error::{GeometryError, Result};
use crate::math::{Point3, Vector3, TOLERANCE};

use super::{Surface, SurfaceDomain};

/// A spherical surface in 3D space.
///
/// Defined by a center, radius, axis (north pole direction), and a
/// reference direction for the equator at u=0.
///
/// `P(u, v) = center + r * cos(v) * cos(u) * ref_dir + r * cos(v) * sin(u) * binormal + r * sin(v) * axis`
/// where `binormal = axis x ref_dir`.
///
/// Parameters: `u` = longitude `[0, 2*pi)`, `v` = latitude `[-pi/2, pi/2]`.
/// The outward normal is `(P - center) / radius`.
#[derive(Debug, Clone)]
pub struct Sphere {
    center: Point3,
    radius: f64,
    axis: Vector3,
    ref_dir: Vector3,
}

impl Sphere {
    /// Creates a new sphere.
    ///
    /// # Arguments
    ///
    /// * `center` - Center of the sphere
    /// * `radius` - Radius (must be positive)
    /// * `axis` - North pole direction (will be normalized)
    /// * `ref_dir` - Equatorial reference direction for u=0 (must be perpendicular to axis)
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is non-positive, axis is zero-length,
    /// or the reference direction is not perpendicular to the axis.
    pub fn new(
        center: Point3,
        radius: f64,
        axis: Vector3,
        ref_dir: Vector3,
    ) -> Result<Self> {
        if radius < TOLERANCE {
            return Err(
                GeometryError::Degenerate("sphere radius must be positive".into()).into(),
            );
        }

        let axis_len = axis.norm();
        if axis_len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let axis = axis / axis_len;

        let ref_len = ref_dir.norm();
        if ref_len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let ref_dir = ref_dir / ref_len;

        if axis.dot(&ref_dir).abs() > TOLERANCE {
            return Err(GeometryError::Degenerate(
                "reference direction must be perpendicular to axis".into(),
            )
            .into());
        }

        Ok(Self {
            center,
            radius,
            axis,
            ref_dir,
        })
    }

    /// Returns the center of the sphere.
    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    /// Returns the radius.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Returns the axis direction (north pole, unit vector).
    #[must_use]
    pub fn axis(&self) -> &Vector3 {
        &self.axis
    }

    /// Returns the reference direction (u=0 on equator).
    #[must_use]
    pub fn ref_dir(&self) -> &Vector3 {
        &self.ref_dir
    }

    /// Computes the binormal direction (`axis x ref_dir`).
    #[must_use]
    pub fn binormal(&self) -> Vector3 {
        self.axis.cross(&self.ref_dir)
    }

    /// Returns `true` if both spheres hold the same point set.
    #[must_use]
    pub fn coincides_with(&self, other: &Sphere, tol: f64) -> bool {
        (self.center - other.center).norm() <= tol && (self.radius - other.radius).abs() <= tol
    }
}

impl Surface for Sphere {
    fn evaluate(&self, u: f64, v: f64) -> Result<Point3> {
        let binormal = self.binormal();
        let cv = v.cos();
        let sv = v.sin();
        let cu = u.cos();
        let su = u.sin();
        Ok(self.center
            + self.ref_dir * (self.radius * cv * cu)
            + binormal * (self.radius * cv * su)
            + self.axis * (self.radius * sv))
    }

    fn normal(&self, u: f64, v: f64) -> Result<Vector3> {
        let binormal = self.binormal();
        let cv = v.cos();
        let sv = v.sin();
        let cu = u.cos();
        let su = u.sin();
        let n = self.ref_dir * (cv * cu) + binormal * (cv * su) + self.axis * sv;
        let len = n.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        Ok(n / len)
    }

    fn partials(&self, u: f64, v: f64) -> Result<(Vector3, Vector3)> {
        let binormal = self.binormal();
        let (su, cu) = u.sin_cos();
        let (sv, cv) = v.sin_cos();
        let du = (self.ref_dir * -su + binormal * cu) * (self.radius * cv);
        let dv = (self.ref_dir * (-sv * cu) + binormal * (-sv * su) + self.axis * cv)
            * self.radius;
        Ok((du, dv))
    }

    fn domain(&self) -> SurfaceDomain {
        SurfaceDomain::new(0.0, TAU, -FRAC_PI_2, FRAC_PI_2)
    }

    fn project(&self, point: &Point3) -> Result<(f64, f64)> {
        let dp = point - self.center;
        let len = dp.norm();
        if len < TOLERANCE {
            return Err(GeometryError::Degenerate(
                "cannot project the sphere center".into(),
            )
            .into());
        }
        let dp = dp / len;
        let v = dp.dot(&self.axis).clamp(-1.0, 1.0).asin();
        let x = dp.dot(&self.ref_dir);
        let y = dp.dot(&self.binormal());
        // The longitude is arbitrary on the poles; report zero there.
        let u = if x.hypot(y) < TOLERANCE {
            0.0
        } else {
            y.atan2(x).rem_euclid(TAU)
        };
        Ok((u, v))
    }

    fn signed_distance(&self, point: &Point3) -> f64 {
        (point - self.center).norm() - self.radius
    }

    fn u_period(&self) -> Option<f64> {
        Some(TAU)
    }

    fn metric_scale(&self) -> f64 {
        self.radius
    }
}
