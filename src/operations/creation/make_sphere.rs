use std::f64::consts::{FRAC_PI_2, PI, TAU};

use crate::error::{OperationError, Result};
use crate::geometry::curve::Circle;
use crate::geometry::surface::Sphere;
use crate::math::{Point2, Point3, Vector3, TOLERANCE};
use crate::topology::{
    EdgeCurve, EdgeData, FaceData, FaceSurface, OrientedEdge, OrientedFace, Pcurve, ShellData,
    SolidData, SolidId, TopologyStore, VertexData, WireData,
};

/// Creates a sphere solid from center and radius.
///
/// The sphere is a single face on a true spherical surface. Its boundary
/// in parameter space is the rectangle `[0, 2pi] x [-pi/2, pi/2]`: a seam
/// edge along the meridian `u = 0` used twice, and one degenerate edge at
/// each pole.
pub struct MakeSphere {
    center: Point3,
    radius: f64,
    axis: Vector3,
    ref_dir: Vector3,
}

impl MakeSphere {
    /// Creates a new `MakeSphere` operation with its poles on the z axis.
    #[must_use]
    pub fn new(center: Point3, radius: f64) -> Self {
        Self {
            center,
            radius,
            axis: Vector3::z(),
            ref_dir: Vector3::x(),
        }
    }

    /// Sets the pole axis and the direction of the seam meridian.
    #[must_use]
    pub fn with_frame(mut self, axis: Vector3, ref_dir: Vector3) -> Self {
        self.axis = axis;
        self.ref_dir = ref_dir;
        self
    }

    /// Executes the operation, creating the sphere in the topology store.
    ///
    /// # Errors
    ///
    /// Returns an error if the radius is near zero or the frame is degenerate.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<SolidId> {
        if self.radius < TOLERANCE {
            return Err(
                OperationError::InvalidInput("sphere radius must be positive".into()).into(),
            );
        }
        let sphere = Sphere::new(self.center, self.radius, self.axis, self.ref_dir)?;
        let axis = *sphere.axis();
        let ref_dir = *sphere.ref_dir();
        let r = self.radius;

        let south_point = self.center - axis * r;
        let north_point = self.center + axis * r;
        let south = store.add_vertex(VertexData::new(south_point));
        let north = store.add_vertex(VertexData::new(north_point));

        // Meridian u = 0 parameterized by latitude + 2pi, running south to north.
        let meridian = Circle::new(self.center, r, ref_dir.cross(&axis), ref_dir)?;
        let seam = store.add_edge(EdgeData::new(
            south,
            north,
            EdgeCurve::Circle(meridian),
            1.5 * PI,
            2.5 * PI,
        ));
        let south_pole = store.add_edge(EdgeData::new(
            south,
            south,
            EdgeCurve::Degenerate(south_point),
            0.0,
            TAU,
        ));
        let north_pole = store.add_edge(EdgeData::new(
            north,
            north,
            EdgeCurve::Degenerate(north_point),
            0.0,
            TAU,
        ));

        let latitude = |t: f64| t - TAU;
        let edges = vec![
            OrientedEdge::with_pcurve(
                south_pole,
                true,
                Pcurve::segment(0.0, Point2::new(0.0, -FRAC_PI_2), TAU, Point2::new(TAU, -FRAC_PI_2)),
            ),
            OrientedEdge::with_pcurve(
                seam,
                true,
                Pcurve::segment(
                    1.5 * PI,
                    Point2::new(TAU, latitude(1.5 * PI)),
                    2.5 * PI,
                    Point2::new(TAU, latitude(2.5 * PI)),
                ),
            ),
            OrientedEdge::with_pcurve(
                north_pole,
                false,
                Pcurve::segment(0.0, Point2::new(0.0, FRAC_PI_2), TAU, Point2::new(TAU, FRAC_PI_2)),
            ),
            OrientedEdge::with_pcurve(
                seam,
                false,
                Pcurve::segment(
                    1.5 * PI,
                    Point2::new(0.0, latitude(1.5 * PI)),
                    2.5 * PI,
                    Point2::new(0.0, latitude(2.5 * PI)),
                ),
            ),
        ];
        let wire = store.add_wire(WireData {
            edges,
            is_closed: true,
        });
        let face = store.add_face(FaceData::new(
            FaceSurface::Sphere(sphere),
            wire,
            Vec::new(),
            true,
        ));
        let shell = store.add_shell(ShellData {
            faces: vec![OrientedFace::new(face, true)],
            is_closed: true,
        });
        Ok(store.add_solid(SolidData {
            outer_shell: shell,
            inner_shells: Vec::new(),
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::curve::Curve;
    use crate::operations::query::{face_uv_loops, BoundingBox};
    use crate::topology::{ShapeId, ShapeKind};

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn sphere_has_one_face_and_a_seam() {
        let mut store = TopologyStore::new();
        let solid = MakeSphere::new(p(0.0, 0.0, 0.0), 3.0)
            .execute(&mut store)
            .unwrap();
        let id = ShapeId::Solid(solid);
        assert_eq!(store.explore(id, ShapeKind::Face).unwrap().len(), 1);
        assert_eq!(store.explore(id, ShapeKind::Edge).unwrap().len(), 3);
        assert_eq!(store.explore(id, ShapeKind::Vertex).unwrap().len(), 2);
        let shell = store.solid(solid).unwrap().outer_shell;
        assert!(store.shell(shell).unwrap().is_closed);
    }

    #[test]
    fn seam_runs_from_south_to_north() {
        let mut store = TopologyStore::new();
        let solid = MakeSphere::new(p(1.0, 2.0, 3.0), 2.0)
            .execute(&mut store)
            .unwrap();
        let seam = store
            .explore(ShapeId::Solid(solid), ShapeKind::Edge)
            .unwrap()
            .into_iter()
            .find_map(|id| match id {
                ShapeId::Edge(e) if !store.edge(e).unwrap().is_degenerate() => Some(e),
                _ => None,
            })
            .unwrap();
        let edge = store.edge(seam).unwrap();
        let start = edge.curve.evaluate(edge.t_start).unwrap();
        let mid = edge.curve.evaluate(0.5 * (edge.t_start + edge.t_end)).unwrap();
        let end = edge.curve.evaluate(edge.t_end).unwrap();
        assert!((start - p(1.0, 2.0, 1.0)).norm() < 1e-12);
        assert!((mid - p(3.0, 2.0, 3.0)).norm() < 1e-12);
        assert!((end - p(1.0, 2.0, 5.0)).norm() < 1e-12);
    }

    #[test]
    fn parameter_boundary_is_the_full_rectangle() {
        let mut store = TopologyStore::new();
        let solid = MakeSphere::new(p(0.0, 0.0, 0.0), 1.0)
            .execute(&mut store)
            .unwrap();
        let ShapeId::Face(face) = store
            .explore(ShapeId::Solid(solid), ShapeKind::Face)
            .unwrap()[0]
        else {
            unreachable!()
        };
        let loops = face_uv_loops(&store, face).unwrap();
        assert_eq!(loops.len(), 1);
        let area = crate::math::polygon_2d::signed_area(&loops[0]);
        assert!((area - TAU * PI).abs() < 1e-9);
    }

    #[test]
    fn sphere_bounding_box() {
        let mut store = TopologyStore::new();
        let solid = MakeSphere::new(p(0.0, 0.0, 0.0), 3.0)
            .execute(&mut store)
            .unwrap();
        let aabb = BoundingBox::new(solid).execute(&store).unwrap();
        // Sampled on a 16 x 16 grid and padded by the sagitta of one step.
        let pad = 3.0 * (1.0 - (TAU / 16.0).cos()) + 1e-6;
        for (lo, hi) in [(aabb.min.x, aabb.max.x), (aabb.min.y, aabb.max.y), (aabb.min.z, aabb.max.z)] {
            assert!(lo <= -3.0 && lo >= -3.0 - pad, "min {lo}");
            assert!(hi >= 3.0 && hi <= 3.0 + pad, "max {hi}");
        }
    }

    #[test]
    fn tilted_frame() {
        let mut store = TopologyStore::new();
        let solid = MakeSphere::new(p(0.0, 0.0, 0.0), 1.0)
            .with_frame(Vector3::x(), Vector3::y())
            .execute(&mut store)
            .unwrap();
        let points: Vec<Point3> = store
            .explore(ShapeId::Solid(solid), ShapeKind::Vertex)
            .unwrap()
            .into_iter()
            .filter_map(|id| match id {
                ShapeId::Vertex(v) => Some(store.vertex(v).unwrap().point),
                _ => None,
            })
            .collect();
        assert!(points.iter().any(|q| (q - p(1.0, 0.0, 0.0)).norm() < 1e-12));
        assert!(points.iter().any(|q| (q - p(-1.0, 0.0, 0.0)).norm() < 1e-12));
    }

    #[test]
    fn zero_radius_fails() {
        let mut store = TopologyStore::new();
        let result = MakeSphere::new(p(0.0, 0.0, 0.0), 0.0).execute(&mut store);
        assert!(result.is_err());
    }
}
