use crate::error::Result;
use crate::geometry::curve::{Circle, Line};
use crate::geometry::surface::{Plane, Sphere, Surface};
use crate::math::{any_perpendicular, Point3, TOLERANCE};
use crate::topology::{EdgeCurve, FaceSurface};

/// Result of intersecting two untrimmed surfaces.
#[derive(Debug, Clone)]
pub enum SurfaceIntersection {
    /// The surfaces do not meet.
    Empty,
    /// The surfaces hold the same point set.
    Coincident,
    /// The surfaces touch at a single point.
    Tangent(Point3),
    /// The surfaces cross along a curve.
    Curve(EdgeCurve),
}

/// Intersects two surfaces analytically.
///
/// # Errors
///
/// Returns an error if the intersection curve cannot be constructed.
pub fn intersect_surfaces(
    a: &FaceSurface,
    b: &FaceSurface,
    tol: f64,
) -> Result<SurfaceIntersection> {
    match (a, b) {
        (FaceSurface::Plane(p), FaceSurface::Plane(q)) => plane_plane(p, q, tol),
        (FaceSurface::Plane(p), FaceSurface::Sphere(s))
        | (FaceSurface::Sphere(s), FaceSurface::Plane(p)) => plane_sphere(p, s, tol),
        (FaceSurface::Sphere(s), FaceSurface::Sphere(t)) => sphere_sphere(s, t, tol),
    }
}

fn plane_plane(a: &Plane, b: &Plane, tol: f64) -> Result<SurfaceIntersection> {
    let n1 = a.plane_normal();
    let n2 = b.plane_normal();
    let dir = n1.cross(n2);
    if dir.norm() < TOLERANCE.max(tol * 1e-3) {
        return Ok(if a.coincides_with(b, tol) {
            SurfaceIntersection::Coincident
        } else {
            SurfaceIntersection::Empty
        });
    }
    let h1 = n1.dot(&a.origin().coords);
    let h2 = n2.dot(&b.origin().coords);
    let k = n1.dot(n2);
    let denom = 1.0 - k * k;
    let c1 = (h1 - h2 * k) / denom;
    let c2 = (h2 - h1 * k) / denom;
    let origin = Point3::from(n1 * c1 + n2 * c2);
    Ok(SurfaceIntersection::Curve(EdgeCurve::Line(Line::new(origin, dir)?)))
}

fn plane_sphere(plane: &Plane, sphere: &Sphere, tol: f64) -> Result<SurfaceIntersection> {
    let n = plane.plane_normal();
    let dist = plane.signed_distance(sphere.center());
    let r = sphere.radius();
    if dist.abs() > r + tol {
        return Ok(SurfaceIntersection::Empty);
    }
    let center = sphere.center() - n * dist;
    let radius_sq = r * r - dist * dist;
    if radius_sq <= tol * tol || dist.abs() >= r - tol {
        return Ok(SurfaceIntersection::Tangent(center));
    }
    let circle = Circle::new(center, radius_sq.sqrt(), *n, any_perpendicular(n))?;
    Ok(SurfaceIntersection::Curve(EdgeCurve::Circle(circle)))
}

fn sphere_sphere(a: &Sphere, b: &Sphere, tol: f64) -> Result<SurfaceIntersection> {
    let offset = b.center() - a.center();
    let d = offset.norm();
    let (r1, r2) = (a.radius(), b.radius());
    if d <= tol {
        return Ok(if (r1 - r2).abs() <= tol {
            SurfaceIntersection::Coincident
        } else {
            SurfaceIntersection::Empty
        });
    }
    if d > r1 + r2 + tol || d < (r1 - r2).abs() - tol {
        return Ok(SurfaceIntersection::Empty);
    }
    let axis = offset / d;
    let along = (d * d + r1 * r1 - r2 * r2) / (2.0 * d);
    let center = a.center() + axis * along;
    let h_sq = r1 * r1 - along * along;
    if h_sq <= tol * tol {
        return Ok(SurfaceIntersection::Tangent(center));
    }
    let circle = Circle::new(center, h_sq.sqrt(), axis, any_perpendicular(&axis))?;
    Ok(SurfaceIntersection::Curve(EdgeCurve::Circle(circle)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::curve::Curve;
    use crate::math::Vector3;

    fn plane(origin: Point3, normal: Vector3) -> FaceSurface {
        FaceSurface::Plane(Plane::from_normal(origin, normal).unwrap())
    }

    fn sphere(center: Point3, r: f64) -> FaceSurface {
        FaceSurface::Sphere(Sphere::new(center, r, Vector3::z(), Vector3::x()).unwrap())
    }

    #[test]
    fn perpendicular_planes_meet_in_a_line() {
        let a = plane(Point3::new(0.0, 0.0, 1.0), Vector3::z());
        let b = plane(Point3::new(2.0, 0.0, 0.0), Vector3::x());
        let SurfaceIntersection::Curve(EdgeCurve::Line(l)) = intersect_surfaces(&a, &b, 1e-7).unwrap()
        else {
            panic!("expected a line");
        };
        for t in [-3.0, 0.0, 5.0] {
            let p = l.evaluate(t).unwrap();
            assert!((p.x - 2.0).abs() < 1e-12 && (p.z - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn parallel_planes() {
        let a = plane(Point3::origin(), Vector3::z());
        let b = plane(Point3::new(0.0, 0.0, 1.0), Vector3::z());
        let c = plane(Point3::new(3.0, 1.0, 0.0), -Vector3::z());
        assert!(matches!(intersect_surfaces(&a, &b, 1e-7).unwrap(), SurfaceIntersection::Empty));
        assert!(matches!(
            intersect_surfaces(&a, &c, 1e-7).unwrap(),
            SurfaceIntersection::Coincident
        ));
    }

    #[test]
    fn plane_cuts_sphere_in_a_circle() {
        let p = plane(Point3::new(0.0, 0.0, 0.6), Vector3::z());
        let s = sphere(Point3::origin(), 1.0);
        let SurfaceIntersection::Curve(EdgeCurve::Circle(c)) = intersect_surfaces(&s, &p, 1e-7).unwrap()
        else {
            panic!("expected a circle");
        };
        assert!((c.radius() - 0.8).abs() < 1e-12);
        assert!((c.center().z - 0.6).abs() < 1e-12);
    }

    #[test]
    fn plane_touches_sphere() {
        let p = plane(Point3::new(0.0, 0.0, 1.0), Vector3::z());
        let s = sphere(Point3::origin(), 1.0);
        let SurfaceIntersection::Tangent(t) = intersect_surfaces(&p, &s, 1e-7).unwrap() else {
            panic!("expected tangency");
        };
        assert!((t - Point3::new(0.0, 0.0, 1.0)).norm() < 1e-12);
    }

    #[test]
    fn overlapping_spheres_meet_in_a_circle() {
        let a = sphere(Point3::origin(), 1.0);
        let b = sphere(Point3::new(1.5, 0.0, 0.0), 1.0);
        let SurfaceIntersection::Curve(EdgeCurve::Circle(c)) = intersect_surfaces(&a, &b, 1e-7).unwrap()
        else {
            panic!("expected a circle");
        };
        assert!((c.center().x - 0.75).abs() < 1e-12);
        assert!((c.radius() - (1.0_f64 - 0.5625).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn identical_and_distant_spheres() {
        let a = sphere(Point3::origin(), 1.0);
        let b = sphere(Point3::origin(), 1.0);
        let c = sphere(Point3::new(5.0, 0.0, 0.0), 1.0);
        assert!(matches!(
            intersect_surfaces(&a, &b, 1e-7).unwrap(),
            SurfaceIntersection::Coincident
        ));
        assert!(matches!(intersect_surfaces(&a, &c, 1e-7).unwrap(), SurfaceIntersection::Empty));
    }
}
