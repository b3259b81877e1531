use crate::error::Result;
use crate::geometry::curve::{project_in_range, Circle, Curve, Line};
use crate::geometry::surface::{Plane, Sphere, Surface};
use crate::math::{Point3, TOLERANCE};
use crate::topology::{EdgeCurve, EdgeId, FaceId, FaceSurface, TopologyStore};

use super::intersect::{circle_plane_points, solve_trigonometric};

/// Number of samples used to decide whether a curve lies on a surface.
const OVERLAP_SAMPLES: usize = 9;

/// Result of a curve-surface intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurveSurfaceHit {
    /// The curve crosses or touches the surface at a single point.
    Point {
        /// 3D intersection point.
        point: Point3,
        /// Parameter on the curve.
        t: f64,
        /// `(u, v)` parameters on the surface.
        uv: (f64, f64),
    },
    /// The curve lies on the surface over the given range.
    Overlap {
        /// Range on the curve.
        t: (f64, f64),
    },
}

/// Computes intersections between an edge and the surface of a face.
///
/// Trimming by the face boundary is left to the caller.
pub struct CurveSurfaceIntersect {
    edge: EdgeId,
    face: FaceId,
    tolerance: Option<f64>,
}

impl CurveSurfaceIntersect {
    /// Creates a new intersection query.
    #[must_use]
    pub fn new(edge: EdgeId, face: FaceId) -> Self {
        Self {
            edge,
            face,
            tolerance: None,
        }
    }

    /// Overrides the tolerance, which defaults to the sum of the entity tolerances.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Executes the query.
    ///
    /// # Errors
    ///
    /// Returns an error if an entity is missing or evaluation fails.
    pub fn execute(&self, store: &TopologyStore) -> Result<Vec<CurveSurfaceHit>> {
        let edge = store.edge(self.edge)?;
        let face = store.face(self.face)?;
        let tol = self.tolerance.unwrap_or(edge.tolerance + face.tolerance);
        intersect_curve_surface(&edge.curve, edge.range(), &face.surface, tol)
    }
}

/// Intersects a trimmed curve with an untrimmed surface.
///
/// # Errors
///
/// Returns an error if evaluation or projection fails.
pub fn intersect_curve_surface(
    curve: &EdgeCurve,
    range: (f64, f64),
    surface: &FaceSurface,
    tol: f64,
) -> Result<Vec<CurveSurfaceHit>> {
    if matches!(curve, EdgeCurve::Degenerate(_)) {
        return Ok(Vec::new());
    }
    if lies_on_surface(curve, range, surface, tol)? {
        return Ok(vec![CurveSurfaceHit::Overlap { t: range }]);
    }

    let candidates = match (curve, surface) {
        (EdgeCurve::Line(l), FaceSurface::Plane(p)) => line_plane(l, p),
        (EdgeCurve::Line(l), FaceSurface::Sphere(s)) => line_sphere(l, s, tol),
        (EdgeCurve::Circle(c), FaceSurface::Plane(p)) => {
            circle_plane_points(c, p.origin(), p.plane_normal(), tol)
        }
        (EdgeCurve::Circle(c), FaceSurface::Sphere(s)) => circle_sphere(c, s, tol),
        (EdgeCurve::Degenerate(_), _) => Vec::new(),
    };

    let mut hits: Vec<CurveSurfaceHit> = Vec::new();
    for candidate in candidates {
        let t = project_in_range(curve, &candidate, range.0, range.1)?;
        let point = curve.evaluate(t)?;
        if surface.signed_distance(&point).abs() > tol {
            continue;
        }
        let duplicate = hits.iter().any(|h| match h {
            CurveSurfaceHit::Point { point: q, .. } => (q - point).norm() <= tol,
            CurveSurfaceHit::Overlap { .. } => false,
        });
        if !duplicate {
            hits.push(CurveSurfaceHit::Point {
                point,
                t,
                uv: surface.project(&point)?,
            });
        }
    }
    Ok(hits)
}

fn lies_on_surface(
    curve: &EdgeCurve,
    (t0, t1): (f64, f64),
    surface: &FaceSurface,
    tol: f64,
) -> Result<bool> {
    #[allow(clippy::cast_precision_loss)]
    let step = (t1 - t0) / (OVERLAP_SAMPLES - 1) as f64;
    for i in 0..OVERLAP_SAMPLES {
        #[allow(clippy::cast_precision_loss)]
        let p = curve.evaluate(t0 + step * i as f64)?;
        if surface.signed_distance(&p).abs() > tol {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Line-Plane intersection: solve `(O + t*D - P0) . N = 0`.
fn line_plane(line: &Line, plane: &Plane) -> Vec<Point3> {
    let normal = plane.plane_normal();
    let denom = line.direction().dot(normal);
    if denom.abs() < TOLERANCE {
        return Vec::new();
    }
    let t = (plane.origin() - line.origin()).dot(normal) / denom;
    vec![line.origin() + line.direction() * t]
}

/// Line-Sphere intersection: `|O + t*D - C|^2 = r^2` with a unit `D`.
fn line_sphere(line: &Line, sphere: &Sphere, tol: f64) -> Vec<Point3> {
    let d = line.direction();
    let oc = line.origin() - sphere.center();
    let foot_t = -oc.dot(d);
    let foot = line.origin() + d * foot_t;
    let h = (foot - sphere.center()).norm();
    let r = sphere.radius();
    if h > r + tol {
        Vec::new()
    } else if h >= r - tol {
        vec![foot]
    } else {
        let s = (r * r - h * h).sqrt();
        vec![foot + d * s, foot - d * s]
    }
}

/// Circle-Sphere intersection: `|P(t) - C|^2 - R^2 = 0` expands to
/// `A + B cos(t) + C sin(t) = 0`.
fn circle_sphere(circle: &Circle, sphere: &Sphere, tol: f64) -> Vec<Point3> {
    let d = circle.center() - sphere.center();
    let r = circle.radius();
    let big_r = sphere.radius();
    let e1 = circle.ref_dir();
    let e2 = circle.binormal();
    let a = d.norm_squared() + r * r - big_r * big_r;
    let b = 2.0 * r * d.dot(e1);
    let c = 2.0 * r * d.dot(&e2);
    solve_trigonometric(a, b, c, 2.0 * big_r * tol)
        .into_iter()
        .map(|t| circle.center() + (e1 * t.cos() + e2 * t.sin()) * r)
        .collect()
}
