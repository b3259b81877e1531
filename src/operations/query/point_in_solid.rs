use crate::error::Result;
use crate::geometry::surface::Surface;
use crate::math::polygon_2d::PolygonLocation;
use crate::math::{Point2, Point3, Vector3};
use crate::topology::{FaceId, FaceSurface, ShapeId, ShapeKind, TopologyStore};

use super::point_in_face::{face_uv_loops, locate_uv};

/// Slanted ray directions, tried in order until one avoids every edge and
/// tangency.
const RAY_DIRECTIONS: [[f64; 3]; 7] = [
    [0.2345, 0.4567, 0.8591],
    [-0.6321, 0.3127, 0.7093],
    [0.8123, -0.5217, 0.2609],
    [-0.1933, -0.8811, 0.4317],
    [0.4411, 0.7713, -0.4587],
    [-0.7129, -0.2213, -0.6655],
    [0.3301, -0.3791, -0.8646],
];

/// Location of a point relative to a solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointLocation {
    /// Strictly inside the material.
    In,
    /// Strictly outside the material.
    Out,
    /// Within tolerance of the boundary.
    On,
}

struct BoundaryFace {
    surface: FaceSurface,
    loops: Vec<Vec<Point2>>,
}

impl BoundaryFace {
    fn locate(&self, point: &Point3, tol: f64) -> PolygonLocation {
        let Ok((u, v)) = self.surface.project(point) else {
            return PolygonLocation::Outside;
        };
        let tol_uv = tol / self.surface.metric_scale();
        locate_uv(&self.surface, &self.loops, Point2::new(u, v), tol_uv)
    }
}

enum RayOutcome {
    Crossings(usize),
    Degenerate,
}

/// Classifies points against a closed set of faces by ray parity.
///
/// Face boundaries are mapped to parameter space once, so one classifier
/// can answer many queries against the same solid.
pub struct PointClassifier {
    boundary: Vec<BoundaryFace>,
}

impl PointClassifier {
    /// Prepares a classifier for the given faces.
    ///
    /// # Errors
    ///
    /// Returns an error if a face or its boundary cannot be read.
    pub fn new(store: &TopologyStore, faces: impl IntoIterator<Item = FaceId>) -> Result<Self> {
        let mut boundary = Vec::new();
        for face_id in faces {
            let face = store.face(face_id)?;
            boundary.push(BoundaryFace {
                surface: face.surface.clone(),
                loops: face_uv_loops(store, face_id)?,
            });
        }
        Ok(Self { boundary })
    }

    /// Prepares a classifier for every face below `shape`.
    ///
    /// # Errors
    ///
    /// Returns an error if the shape cannot be explored.
    pub fn for_shape(store: &TopologyStore, shape: ShapeId) -> Result<Self> {
        let faces = store
            .explore(shape, ShapeKind::Face)?
            .into_iter()
            .filter_map(|s| match s {
                ShapeId::Face(f) => Some(f),
                _ => None,
            });
        Self::new(store, faces)
    }

    /// Returns `true` if `point` lies within `tol` of one of the faces.
    #[must_use]
    pub fn on_boundary(&self, point: &Point3, tol: f64) -> bool {
        self.boundary.iter().any(|face| {
            face.surface.signed_distance(point).abs() <= tol
                && face.locate(point, tol) != PolygonLocation::Outside
        })
    }

    /// Classifies `point` against the solid bounded by the faces.
    #[must_use]
    pub fn classify(&self, point: &Point3, tol: f64) -> PointLocation {
        if self.on_boundary(point, tol) {
            return PointLocation::On;
        }
        for dir in RAY_DIRECTIONS {
            let dir = Vector3::new(dir[0], dir[1], dir[2]).normalize();
            if let RayOutcome::Crossings(n) = self.cast(point, &dir, tol, false) {
                return parity(n);
            }
        }
        // Every ray grazed something; count boundary hits once each.
        let dir = Vector3::new(RAY_DIRECTIONS[0][0], RAY_DIRECTIONS[0][1], RAY_DIRECTIONS[0][2])
            .normalize();
        match self.cast(point, &dir, tol, true) {
            RayOutcome::Crossings(n) => parity(n),
            RayOutcome::Degenerate => PointLocation::Out,
        }
    }

    fn cast(&self, origin: &Point3, dir: &Vector3, tol: f64, lenient: bool) -> RayOutcome {
        let mut hits: Vec<Point3> = Vec::new();
        for face in &self.boundary {
            let candidates = match ray_surface(origin, dir, &face.surface, tol) {
                Some(c) => c,
                None if lenient => continue,
                None => return RayOutcome::Degenerate,
            };
            for hit in candidates {
                match face.locate(&hit, tol) {
                    PolygonLocation::Inside => hits.push(hit),
                    PolygonLocation::Boundary if lenient => {
                        if !hits.iter().any(|h| (h - hit).norm() <= tol) {
                            hits.push(hit);
                        }
                    }
                    PolygonLocation::Boundary => return RayOutcome::Degenerate,
                    PolygonLocation::Outside => {}
                }
            }
        }
        RayOutcome::Crossings(hits.len())
    }
}

fn parity(crossings: usize) -> PointLocation {
    if crossings % 2 == 1 {
        PointLocation::In
    } else {
        PointLocation::Out
    }
}

/// Transversal hits of the ray `origin + s * dir`, `s > tol`, with an
/// untrimmed surface. `None` means the ray grazes the surface.
fn ray_surface(origin: &Point3, dir: &Vector3, surface: &FaceSurface, tol: f64) -> Option<Vec<Point3>> {
    match surface {
        FaceSurface::Plane(plane) => {
            let n = plane.plane_normal();
            let denom = dir.dot(n);
            let dist = plane.signed_distance(origin);
            if denom.abs() < 1e-12 {
                return if dist.abs() <= tol { None } else { Some(Vec::new()) };
            }
            let s = -dist / denom;
            Some(if s > tol { vec![origin + dir * s] } else { Vec::new() })
        }
        FaceSurface::Sphere(sphere) => {
            let oc = origin - sphere.center();
            let b = dir.dot(&oc);
            let foot = origin - dir * b;
            let h = (foot - sphere.center()).norm();
            let r = sphere.radius();
            if h > r + tol {
                return Some(Vec::new());
            }
            if h >= r - tol {
                // Tangent ray; it only matters when the contact is ahead.
                return if -b > tol { None } else { Some(Vec::new()) };
            }
            let half = (r * r - h * h).sqrt();
            Some(
                [-b - half, -b + half]
                    .into_iter()
                    .filter(|&s| s > tol)
                    .map(|s| origin + dir * s)
                    .collect(),
            )
        }
    }
}

/// Classifies a point against a solid.
pub struct PointInSolid {
    shape: ShapeId,
    point: Point3,
    tolerance: f64,
}

impl PointInSolid {
    /// Creates a new `PointInSolid` query with the default tolerance.
    #[must_use]
    pub fn new(shape: impl Into<ShapeId>, point: Point3) -> Self {
        Self {
            shape: shape.into(),
            point,
            tolerance: crate::math::CONFUSION,
        }
    }

    /// Sets the boundary tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Executes the query.
    ///
    /// # Errors
    ///
    /// Returns an error if the solid cannot be explored.
    pub fn execute(&self, store: &TopologyStore) -> Result<PointLocation> {
        let classifier = PointClassifier::for_shape(store, self.shape)?;
        Ok(classifier.classify(&self.point, self.tolerance))
    }
}
