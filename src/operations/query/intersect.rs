use crate::error::Result;
use crate::geometry::curve::{project_in_range, Circle, Curve, Line};
use crate::math::{Point3, Vector3, TOLERANCE};
use crate::topology::{EdgeCurve, EdgeId, TopologyStore};

/// Result of a curve-curve intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurveCurveHit {
    /// The curves cross or touch at a single point.
    Point {
        /// The intersection point.
        point: Point3,
        /// Parameter on the first curve.
        t1: f64,
        /// Parameter on the second curve.
        t2: f64,
    },
    /// The curves run together over a parameter range.
    Overlap {
        /// Range on the first curve.
        t1: (f64, f64),
        /// Range on the second curve, increasing.
        t2: (f64, f64),
    },
}

/// Computes intersections between two edges.
pub struct CurveCurveIntersect {
    edge_a: EdgeId,
    edge_b: EdgeId,
    tolerance: Option<f64>,
}

impl CurveCurveIntersect {
    /// Creates a new `CurveCurveIntersect` query.
    #[must_use]
    pub fn new(edge_a: EdgeId, edge_b: EdgeId) -> Self {
        Self {
            edge_a,
            edge_b,
            tolerance: None,
        }
    }

    /// Overrides the tolerance, which defaults to the sum of the edge tolerances.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Executes the query, returning all intersection points and overlaps.
    ///
    /// # Errors
    ///
    /// Returns an error if an edge is missing or a curve cannot be evaluated.
    pub fn execute(&self, store: &TopologyStore) -> Result<Vec<CurveCurveHit>> {
        let a = store.edge(self.edge_a)?;
        let b = store.edge(self.edge_b)?;
        let tol = self.tolerance.unwrap_or(a.tolerance + b.tolerance);
        intersect_curves(&a.curve, a.range(), &b.curve, b.range(), tol)
    }
}

/// Intersects two trimmed curves.
///
/// Overlapping stretches are reported as ranges; isolated crossings closer
/// than `tol` to each other collapse into one point.
///
/// # Errors
///
/// Returns an error if a curve cannot be evaluated.
pub fn intersect_curves(
    c1: &EdgeCurve,
    r1: (f64, f64),
    c2: &EdgeCurve,
    r2: (f64, f64),
    tol: f64,
) -> Result<Vec<CurveCurveHit>> {
    if matches!(c1, EdgeCurve::Degenerate(_)) || matches!(c2, EdgeCurve::Degenerate(_)) {
        return Ok(Vec::new());
    }

    let mut hits = Vec::new();
    if carriers_coincide(c1, c2, tol) {
        hits.extend(overlap_ranges(c1, r1, c2, r2, tol)?);
    }

    for candidate in candidate_points(c1, c2, tol) {
        let t1 = project_in_range(c1, &candidate, r1.0, r1.1)?;
        let t2 = project_in_range(c2, &candidate, r2.0, r2.1)?;
        let q1 = c1.evaluate(t1)?;
        let q2 = c2.evaluate(t2)?;
        if (q1 - q2).norm() > tol {
            continue;
        }
        let inside_overlap = hits.iter().any(|h| match h {
            CurveCurveHit::Overlap { t1: (a, b), .. } => t1 >= *a - TOLERANCE && t1 <= *b + TOLERANCE,
            CurveCurveHit::Point { .. } => false,
        });
        let duplicate = hits.iter().any(|h| match h {
            CurveCurveHit::Point { point, .. } => (point - q1).norm() <= tol,
            CurveCurveHit::Overlap { .. } => false,
        });
        if !inside_overlap && !duplicate {
            hits.push(CurveCurveHit::Point {
                point: Point3::from((q1.coords + q2.coords) * 0.5),
                t1,
                t2,
            });
        }
    }
    Ok(hits)
}

/// Returns `true` if the two curves share their whole carrier.
fn carriers_coincide(c1: &EdgeCurve, c2: &EdgeCurve, tol: f64) -> bool {
    match (c1, c2) {
        (EdgeCurve::Line(a), EdgeCurve::Line(b)) => {
            a.direction().cross(b.direction()).norm() < TOLERANCE.max(tol * 1e-3)
                && a.distance_to(b.origin()) <= tol
        }
        (EdgeCurve::Circle(a), EdgeCurve::Circle(b)) => a.coincides_with(b, tol),
        _ => false,
    }
}

/// Splits `r1` at every projection of the ends of `r2` and keeps the
/// pieces whose middle lies on the second trimmed curve.
fn overlap_ranges(
    c1: &EdgeCurve,
    r1: (f64, f64),
    c2: &EdgeCurve,
    r2: (f64, f64),
    tol: f64,
) -> Result<Vec<CurveCurveHit>> {
    let mut cuts = vec![r1.0, r1.1];
    for t in [r2.0, r2.1] {
        let p = c2.evaluate(t)?;
        let s = project_in_range(c1, &p, r1.0, r1.1)?;
        if (c1.evaluate(s)? - p).norm() <= tol {
            cuts.push(s);
        }
    }
    cuts.sort_by(f64::total_cmp);
    cuts.dedup_by(|a, b| (*a - *b).abs() <= TOLERANCE);

    let mut inside: Vec<(f64, f64)> = Vec::new();
    for pair in cuts.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let mid = c1.evaluate(0.5 * (a + b))?;
        let s = project_in_range(c2, &mid, r2.0, r2.1)?;
        if (c2.evaluate(s)? - mid).norm() > tol {
            continue;
        }
        match inside.last_mut() {
            Some(last) if (last.1 - a).abs() <= TOLERANCE => last.1 = b,
            _ => inside.push((a, b)),
        }
    }

    let mut hits = Vec::new();
    // Cuts outside every shared stretch may still be contacts where the
    // trimmed curves only touch end to end.
    for &t in &cuts {
        if inside.iter().any(|(a, b)| t >= *a - TOLERANCE && t <= *b + TOLERANCE) {
            continue;
        }
        let p = c1.evaluate(t)?;
        let s = project_in_range(c2, &p, r2.0, r2.1)?;
        if (c2.evaluate(s)? - p).norm() <= tol {
            hits.push(CurveCurveHit::Point { point: p, t1: t, t2: s });
        }
    }
    for (a, b) in inside {
        let pa = c1.evaluate(a)?;
        let pb = c1.evaluate(b)?;
        let pm = c1.evaluate(0.5 * (a + b))?;
        let sm = project_in_range(c2, &pm, r2.0, r2.1)?;
        let sa = near_representative(c2, project_in_range(c2, &pa, r2.0, r2.1)?, sm, r2);
        let sb = near_representative(c2, project_in_range(c2, &pb, r2.0, r2.1)?, sm, r2);
        if (pa - pb).norm() <= tol && (pm - pa).norm() <= tol {
            hits.push(CurveCurveHit::Point {
                point: pa,
                t1: a,
                t2: sa,
            });
        } else {
            hits.push(CurveCurveHit::Overlap {
                t1: (a, b),
                t2: (sa.min(sb), sa.max(sb)),
            });
        }
    }
    Ok(hits)
}

/// For periodic curves, picks the representation of `t` inside `range`
/// closest to `reference`.
fn near_representative(curve: &EdgeCurve, t: f64, reference: f64, range: (f64, f64)) -> f64 {
    let Some(period) = curve.period() else {
        return t;
    };
    let mut best = t;
    for candidate in [t - period, t + period] {
        if candidate >= range.0 - TOLERANCE
            && candidate <= range.1 + TOLERANCE
            && (candidate - reference).abs() < (best - reference).abs()
        {
            best = candidate;
        }
    }
    best
}

/// Points where the untrimmed carriers may meet. Callers validate them
/// against both trimmed curves.
fn candidate_points(c1: &EdgeCurve, c2: &EdgeCurve, tol: f64) -> Vec<Point3> {
    match (c1, c2) {
        (EdgeCurve::Line(a), EdgeCurve::Line(b)) => line_line(a, b).into_iter().collect(),
        (EdgeCurve::Line(l), EdgeCurve::Circle(c)) | (EdgeCurve::Circle(c), EdgeCurve::Line(l)) => {
            line_circle(l, c, tol)
        }
        (EdgeCurve::Circle(a), EdgeCurve::Circle(b)) => circle_circle(a, b, tol),
        _ => Vec::new(),
    }
}

/// Midpoint of the closest approach of two non-parallel lines.
fn line_line(a: &Line, b: &Line) -> Option<Point3> {
    let (d1, d2) = (a.direction(), b.direction());
    let w = a.origin() - b.origin();
    let dd = d1.dot(d2);
    let denom = 1.0 - dd * dd;
    if denom < TOLERANCE {
        return None;
    }
    let s = (dd * d2.dot(&w) - d1.dot(&w)) / denom;
    let t = (d2.dot(&w) - dd * d1.dot(&w)) / denom;
    let p = a.origin() + d1 * s;
    let q = b.origin() + d2 * t;
    Some(Point3::from((p.coords + q.coords) * 0.5))
}

fn line_circle(line: &Line, circle: &Circle, tol: f64) -> Vec<Point3> {
    let n = circle.normal();
    let d = line.direction();
    let c = circle.center();
    let dn = d.dot(n);
    if dn.abs() > TOLERANCE {
        let t = (c - line.origin()).dot(n) / dn;
        return vec![line.origin() + d * t];
    }
    if (line.origin() - c).dot(n).abs() > tol {
        return Vec::new();
    }
    // Line lies in the circle plane.
    let foot = line.origin() + d * (c - line.origin()).dot(d);
    let h = (foot - c).norm();
    let r = circle.radius();
    if h > r + tol {
        Vec::new()
    } else if (h - r).abs() <= tol {
        vec![foot]
    } else {
        let s = (r * r - h * h).sqrt();
        vec![foot + d * s, foot - d * s]
    }
}

fn circle_circle(a: &Circle, b: &Circle, tol: f64) -> Vec<Point3> {
    let n = a.normal();
    let coplanar =
        n.cross(b.normal()).norm() < TOLERANCE.max(tol * 1e-3) && (b.center() - a.center()).dot(n).abs() <= tol;
    if !coplanar {
        return circle_plane_points(b, a.center(), n, tol);
    }
    let offset = b.center() - a.center();
    let d = offset.norm();
    let (r1, r2) = (a.radius(), b.radius());
    if d < TOLERANCE || d > r1 + r2 + tol || d < (r1 - r2).abs() - tol {
        return Vec::new();
    }
    let ex = offset / d;
    let ey = n.cross(&ex);
    let along = (d * d + r1 * r1 - r2 * r2) / (2.0 * d);
    let h_sq = r1 * r1 - along * along;
    let base = a.center() + ex * along;
    if h_sq <= tol * tol {
        vec![base]
    } else {
        let h = h_sq.sqrt();
        vec![base + ey * h, base - ey * h]
    }
}

/// Points of `circle` lying on the plane through `origin` with unit `normal`.
pub(crate) fn circle_plane_points(
    circle: &Circle,
    origin: &Point3,
    normal: &Vector3,
    tol: f64,
) -> Vec<Point3> {
    let e1 = circle.ref_dir();
    let e2 = circle.binormal();
    let r = circle.radius();
    let a = (circle.center() - origin).dot(normal);
    let b = r * e1.dot(normal);
    let c = r * e2.dot(normal);
    solve_trigonometric(a, b, c, tol)
        .into_iter()
        .map(|t| circle.center() + (e1 * t.cos() + e2 * t.sin()) * r)
        .collect()
}

/// Solves `a + b cos(t) + c sin(t) = 0` for `t`, accepting near misses
/// whose residual is within `slack`.
pub(crate) fn solve_trigonometric(a: f64, b: f64, c: f64, slack: f64) -> Vec<f64> {
    let amplitude = b.hypot(c);
    if amplitude < TOLERANCE {
        return Vec::new();
    }
    let ratio = -a / amplitude;
    if ratio.abs() > 1.0 + slack / amplitude {
        return Vec::new();
    }
    let phase = c.atan2(b);
    let half = ratio.clamp(-1.0, 1.0).acos();
    if half * amplitude <= slack {
        vec![phase]
    } else {
        vec![phase + half, phase - half]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, TAU};

    fn line(a: Point3, b: Point3) -> (EdgeCurve, (f64, f64)) {
        let l = Line::through(a, b).unwrap();
        (EdgeCurve::Line(l), (0.0, (b - a).norm()))
    }

    fn xy_circle(cx: f64, cy: f64, r: f64) -> EdgeCurve {
        EdgeCurve::Circle(
            Circle::new(Point3::new(cx, cy, 0.0), r, Vector3::z(), Vector3::x()).unwrap(),
        )
    }

    #[test]
    fn crossing_segments() {
        let (a, ra) = line(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0));
        let (b, rb) = line(Point3::new(1.0, -1.0, 0.0), Point3::new(1.0, 1.0, 0.0));
        let hits = intersect_curves(&a, ra, &b, rb, 1e-7).unwrap();
        assert_eq!(hits.len(), 1);
        let CurveCurveHit::Point { point, t1, t2 } = hits[0] else {
            panic!("expected a point hit");
        };
        assert!((point - Point3::new(1.0, 0.0, 0.0)).norm() < 1e-9);
        assert!((t1 - 1.0).abs() < 1e-9);
        assert!((t2 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn skew_segments_miss() {
        let (a, ra) = line(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0));
        let (b, rb) = line(Point3::new(1.0, -1.0, 0.5), Point3::new(1.0, 1.0, 0.5));
        assert!(intersect_curves(&a, ra, &b, rb, 1e-7).unwrap().is_empty());
    }

    #[test]
    fn collinear_segments_overlap() {
        let (a, ra) = line(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0));
        let (b, rb) = line(Point3::new(3.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0));
        let hits = intersect_curves(&a, ra, &b, rb, 1e-7).unwrap();
        assert_eq!(hits.len(), 1);
        let CurveCurveHit::Overlap { t1, t2 } = hits[0] else {
            panic!("expected an overlap");
        };
        assert!((t1.0 - 1.0).abs() < 1e-9 && (t1.1 - 2.0).abs() < 1e-9);
        assert!((t2.0 - 1.0).abs() < 1e-9 && (t2.1 - 2.0).abs() < 1e-9);
    }

    #[test]
    fn collinear_segments_touching_at_end() {
        let (a, ra) = line(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0));
        let (b, rb) = line(Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0));
        let hits = intersect_curves(&a, ra, &b, rb, 1e-7).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(matches!(hits[0], CurveCurveHit::Point { .. }));
    }

    #[test]
    fn line_through_circle() {
        let (l, rl) = line(Point3::new(-2.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0));
        let c = xy_circle(0.0, 0.0, 1.0);
        let hits = intersect_curves(&l, rl, &c, (0.0, TAU), 1e-7).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn line_tangent_to_circle() {
        let (l, rl) = line(Point3::new(-2.0, 1.0, 0.0), Point3::new(2.0, 1.0, 0.0));
        let c = xy_circle(0.0, 0.0, 1.0);
        let hits = intersect_curves(&l, rl, &c, (0.0, TAU), 1e-7).unwrap();
        assert_eq!(hits.len(), 1);
        let CurveCurveHit::Point { t2, .. } = hits[0] else {
            panic!("expected a point hit");
        };
        assert!((t2 - FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn coplanar_circles_cross_twice() {
        let a = xy_circle(0.0, 0.0, 1.0);
        let b = xy_circle(1.0, 0.0, 1.0);
        let hits = intersect_curves(&a, (0.0, TAU), &b, (0.0, TAU), 1e-7).unwrap();
        assert_eq!(hits.len(), 2);
        for h in hits {
            let CurveCurveHit::Point { point, .. } = h else {
                panic!("expected point hits");
            };
            assert!((point.x - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn identical_arcs_overlap_partially() {
        let a = xy_circle(0.0, 0.0, 1.0);
        let b = xy_circle(0.0, 0.0, 1.0);
        let hits = intersect_curves(&a, (0.0, 2.0), &b, (1.0, 3.0), 1e-7).unwrap();
        assert_eq!(hits.len(), 1);
        let CurveCurveHit::Overlap { t1, t2 } = hits[0] else {
            panic!("expected an overlap");
        };
        assert!((t1.0 - 1.0).abs() < 1e-9 && (t1.1 - 2.0).abs() < 1e-9);
        assert!((t2.0 - 1.0).abs() < 1e-9 && (t2.1 - 2.0).abs() < 1e-9);
    }

    #[test]
    fn trigonometric_solver_finds_both_roots() {
        let roots = solve_trigonometric(0.0, 1.0, 0.0, 1e-12);
        assert_eq!(roots.len(), 2);
        for t in roots {
            assert!(t.cos().abs() < 1e-12);
        }
    }
}
