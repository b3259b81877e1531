use std::f64::consts::TAU;

use crate::error::{Result, TopologyError};
use crate::geometry::curve::Curve;
use crate::geometry::surface::Surface;
use crate::math::polygon_2d::{locate_in_loops, PolygonLocation};
use crate::math::{Point2, Point3};
use crate::topology::{EdgeCurve, FaceId, FaceSurface, OrientedEdge, Pcurve, TopologyStore};

/// Polyline samples used for a full turn of a circular edge.
const SAMPLES_PER_TURN: f64 = 96.0;

/// Below this `cos(v)` a sphere sample is treated as a pole.
const POLE_EPSILON: f64 = 1e-9;

/// Number of pcurve samples needed for `curve` over `[t0, t1]`.
#[must_use]
pub fn sample_count(curve: &EdgeCurve, t0: f64, t1: f64) -> usize {
    match curve {
        EdgeCurve::Line(_) => 2,
        EdgeCurve::Circle(_) | EdgeCurve::Degenerate(_) => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let n = ((t1 - t0).abs() / TAU * SAMPLES_PER_TURN).ceil() as usize;
            n.max(8) + 1
        }
    }
}

/// Builds a pcurve for `curve` over `[t0, t1]` by projecting samples onto
/// `surface`.
///
/// The periodic `u` parameter is unwrapped outward from the middle sample
/// so that the polyline is continuous. Samples on a pole have no longitude
/// and borrow it from their neighbour.
///
/// # Errors
///
/// Returns an error for degenerate curves or if projection fails.
pub fn project_pcurve(
    surface: &FaceSurface,
    curve: &EdgeCurve,
    t0: f64,
    t1: f64,
) -> Result<Pcurve> {
    if matches!(curve, EdgeCurve::Degenerate(_)) {
        return Err(TopologyError::InvalidTopology(
            "degenerate edge needs an explicit pcurve".into(),
        )
        .into());
    }
    let n = sample_count(curve, t0, t1);
    #[allow(clippy::cast_precision_loss)]
    let step = (t1 - t0) / (n - 1) as f64;
    let mut samples = Vec::with_capacity(n);
    for i in 0..n {
        #[allow(clippy::cast_precision_loss)]
        let t = if i + 1 == n { t1 } else { t0 + step * i as f64 };
        let (u, v) = surface.project(&curve.evaluate(t)?)?;
        samples.push((t, Point2::new(u, v)));
    }
    if let Some(period) = surface.u_period() {
        unwrap_longitudes(&mut samples, period);
    }
    Ok(Pcurve::new(samples))
}

fn unwrap_longitudes(samples: &mut [(f64, Point2)], period: f64) {
    let at_pole = |uv: &Point2| uv.y.cos() < POLE_EPSILON;
    let mid = samples.len() / 2;
    let Some(reference) = (0..samples.len())
        .filter(|&i| !at_pole(&samples[i].1))
        .min_by_key(|&i| i.abs_diff(mid))
    else {
        return;
    };
    let adjust = |u: f64, previous: f64| -> f64 {
        let mut u = u;
        while u - previous > 0.5 * period {
            u -= period;
        }
        while previous - u > 0.5 * period {
            u += period;
        }
        u
    };
    for i in reference + 1..samples.len() {
        let previous = samples[i - 1].1.x;
        let uv = samples[i].1;
        samples[i].1.x = if at_pole(&uv) { previous } else { adjust(uv.x, previous) };
    }
    for i in (0..reference).rev() {
        let previous = samples[i + 1].1.x;
        let uv = samples[i].1;
        samples[i].1.x = if at_pole(&uv) { previous } else { adjust(uv.x, previous) };
    }
}

/// Returns the pcurve of an oriented edge on a face, projecting one if the
/// wire does not store it.
///
/// # Errors
///
/// Returns an error if the edge is missing or cannot be projected.
pub fn oriented_edge_pcurve(
    store: &TopologyStore,
    surface: &FaceSurface,
    oriented: &OrientedEdge,
) -> Result<Pcurve> {
    if let Some(pcurve) = &oriented.pcurve {
        return Ok(pcurve.clone());
    }
    let edge = store.edge(oriented.edge)?;
    project_pcurve(surface, &edge.curve, edge.t_start, edge.t_end)
}

/// Collects the boundary loops of a face as closed polylines in `(u, v)`.
///
/// The outer loop comes first. Consecutive duplicate points are dropped.
///
/// # Errors
///
/// Returns an error if a wire or edge is missing.
pub fn face_uv_loops(store: &TopologyStore, face_id: FaceId) -> Result<Vec<Vec<Point2>>> {
    let face = store.face(face_id)?;
    let mut loops = Vec::new();
    for wire_id in face.wires() {
        let wire = store.wire(wire_id)?;
        let mut points: Vec<Point2> = Vec::new();
        for oe in &wire.edges {
            let pcurve = oriented_edge_pcurve(store, &face.surface, oe)?;
            for p in pcurve.points(oe.forward) {
                if points.last().is_none_or(|q| (q - p).norm() > 1e-12) {
                    points.push(p);
                }
            }
        }
        if points.len() > 1 && (points[0] - points[points.len() - 1]).norm() <= 1e-12 {
            points.pop();
        }
        loops.push(points);
    }
    Ok(loops)
}

/// Locates a `(u, v)` point against face loops, trying the periodic images
/// of `u` on surfaces closed in `u`.
#[must_use]
pub fn locate_uv(
    surface: &FaceSurface,
    loops: &[Vec<Point2>],
    uv: Point2,
    tol_uv: f64,
) -> PolygonLocation {
    let shifts: &[f64] = match surface.u_period() {
        Some(_) => &[0.0, TAU, -TAU],
        None => &[0.0],
    };
    let mut result = PolygonLocation::Outside;
    for shift in shifts {
        match locate_in_loops(&Point2::new(uv.x + shift, uv.y), loops, tol_uv) {
            PolygonLocation::Inside => return PolygonLocation::Inside,
            PolygonLocation::Boundary => result = PolygonLocation::Boundary,
            PolygonLocation::Outside => {}
        }
    }
    result
}

/// Classifies a 3D point against a trimmed face.
///
/// The point is first tested against the surface; points further than the
/// tolerance from it are outside. The rest are located in parameter space.
pub struct PointInFace {
    face: FaceId,
    point: Point3,
    tolerance: Option<f64>,
}

impl PointInFace {
    /// Creates a new `PointInFace` query.
    #[must_use]
    pub fn new(face: FaceId, point: Point3) -> Self {
        Self {
            face,
            point,
            tolerance: None,
        }
    }

    /// Overrides the tolerance, which defaults to the face tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Executes the query.
    ///
    /// # Errors
    ///
    /// Returns an error if the face is missing or its boundary cannot be
    /// mapped to parameter space.
    pub fn execute(&self, store: &TopologyStore) -> Result<PolygonLocation> {
        let face = store.face(self.face)?;
        let tol = self.tolerance.unwrap_or(face.tolerance);
        if face.surface.signed_distance(&self.point).abs() > tol {
            return Ok(PolygonLocation::Outside);
        }
        let (u, v) = face.surface.project(&self.point)?;
        let loops = face_uv_loops(store, self.face)?;
        let tol_uv = tol / face.surface.metric_scale();
        Ok(locate_uv(&face.surface, &loops, Point2::new(u, v), tol_uv))
    }
}
