use super::Point2;

/// Location of a point relative to a set of closed 2D loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonLocation {
    Inside,
    Outside,
    Boundary,
}

/// Computes the signed area of a closed polygon (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise.
#[must_use]
pub fn signed_area(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// Distance from `p` to the segment `[a, b]`.
#[must_use]
pub fn point_segment_distance(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < f64::EPSILON {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Distance from `p` to the boundary of a closed loop.
#[must_use]
pub fn loop_distance(p: &Point2, points: &[Point2]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| point_segment_distance(p, &points[i], &points[(i + 1) % n]))
        .fold(f64::INFINITY, f64::min)
}

/// Even-odd crossing test of `p` against a single closed loop.
#[must_use]
pub fn loop_contains(p: &Point2, points: &[Point2]) -> bool {
    let n = points.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (a, b) = (&points[i], &points[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Classifies `p` against a face described by closed loops.
///
/// Loops are combined with the even-odd rule, so holes need no special
/// orientation. Points closer than `tol` to any loop are on the boundary.
#[must_use]
pub fn locate_in_loops(p: &Point2, loops: &[Vec<Point2>], tol: f64) -> PolygonLocation {
    if loops.iter().any(|l| loop_distance(p, l) <= tol) {
        return PolygonLocation::Boundary;
    }
    let crossings = loops.iter().filter(|l| loop_contains(p, l)).count();
    if crossings % 2 == 1 {
        PolygonLocation::Inside
    } else {
        PolygonLocation::Outside
    }
}

/// Finds a point well inside the region bounded by `loops`.
///
/// Casts horizontal scan lines at several heights and returns the span
/// midpoint furthest from every loop. A scan line through a vertex can
/// yield a midpoint on the boundary; its clearance is zero and it loses.
/// Returns `None` for a region with no interior.
#[must_use]
pub fn interior_point(loops: &[Vec<Point2>]) -> Option<Point2> {
    let (mut v_min, mut v_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in loops.iter().flatten() {
        v_min = v_min.min(p.y);
        v_max = v_max.max(p.y);
    }
    if v_max <= v_min {
        return None;
    }

    let mut best: Option<(f64, Point2)> = None;
    for fraction in [0.5, 0.382, 0.618, 0.25, 0.75, 0.127, 0.873] {
        let v = v_min + (v_max - v_min) * fraction;
        let mut xs = Vec::new();
        for l in loops {
            let n = l.len();
            for i in 0..n {
                let (a, b) = (&l[i], &l[(i + 1) % n]);
                if (a.y > v) != (b.y > v) {
                    xs.push(a.x + (v - a.y) * (b.x - a.x) / (b.y - a.y));
                }
            }
        }
        xs.sort_by(f64::total_cmp);
        for span in xs.chunks_exact(2) {
            let candidate = Point2::new(0.5 * (span[0] + span[1]), v);
            let clearance = loops
                .iter()
                .map(|l| loop_distance(&candidate, l))
                .fold(f64::INFINITY, f64::min);
            if best.as_ref().map_or(true, |(c, _)| clearance > *c) {
                best = Some((clearance, candidate));
            }
        }
    }
    best.filter(|(c, _)| *c > 0.0).map(|(_, p)| p)
}
