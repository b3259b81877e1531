use crate::error::Result;
use crate::geometry::surface::Surface;
use crate::math::polygon_2d::PolygonLocation;
use crate::math::{Aabb, Point2};
use crate::topology::{FaceId, FaceSurface, ShapeId, ShapeKind, TopologyStore};

use super::point_in_face::{face_uv_loops, locate_uv};

/// Grid resolution used to sample curved faces.
const FACE_GRID: usize = 16;

/// Computes the axis-aligned bounding box of any shape.
///
/// Vertex and edge tolerances are included. Curved faces are sampled on a
/// parameter grid and padded by the worst-case sagitta between samples.
pub struct BoundingBox {
    shape: ShapeId,
}

impl BoundingBox {
    /// Creates a new `BoundingBox` query.
    #[must_use]
    pub fn new(shape: impl Into<ShapeId>) -> Self {
        Self {
            shape: shape.into(),
        }
    }

    /// Executes the query, returning the AABB.
    ///
    /// # Errors
    ///
    /// Returns an error if the shape or one of its sub-shapes is missing.
    pub fn execute(&self, store: &TopologyStore) -> Result<Aabb> {
        let mut aabb = Aabb::empty();
        for id in store.explore(self.shape, ShapeKind::Vertex)? {
            if let ShapeId::Vertex(v) = id {
                let vertex = store.vertex(v)?;
                aabb.merge(&Aabb::from_points(&[vertex.point]).enlarged(vertex.tolerance));
            }
        }
        for id in store.explore(self.shape, ShapeKind::Edge)? {
            if let ShapeId::Edge(e) = id {
                let edge = store.edge(e)?;
                aabb.merge(&edge.bounding_box().enlarged(edge.tolerance));
            }
        }
        for id in store.explore(self.shape, ShapeKind::Face)? {
            if let ShapeId::Face(f) = id {
                aabb.merge(&face_bounding_box(store, f)?);
            }
        }
        Ok(aabb)
    }
}

/// Bounding box of a trimmed face.
///
/// # Errors
///
/// Returns an error if the face boundary cannot be read.
pub fn face_bounding_box(store: &TopologyStore, face_id: FaceId) -> Result<Aabb> {
    let face = store.face(face_id)?;
    let mut aabb = Aabb::empty();
    for wire_id in face.wires() {
        for oe in &store.wire(wire_id)?.edges {
            aabb.merge(&store.edge(oe.edge)?.bounding_box());
        }
    }
    if let FaceSurface::Sphere(sphere) = &face.surface {
        let loops = face_uv_loops(store, face_id)?;
        let (mut lo, mut hi) = (
            Point2::new(f64::INFINITY, f64::INFINITY),
            Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        );
        for p in loops.iter().flatten() {
            lo = lo.inf(p);
            hi = hi.sup(p);
        }
        if lo.x <= hi.x && lo.y <= hi.y {
            #[allow(clippy::cast_precision_loss)]
            let n = FACE_GRID as f64;
            let du = (hi.x - lo.x) / n;
            let dv = (hi.y - lo.y) / n;
            for i in 0..=FACE_GRID {
                for j in 0..=FACE_GRID {
                    #[allow(clippy::cast_precision_loss)]
                    let uv = Point2::new(lo.x + du * i as f64, lo.y + dv * j as f64);
                    if locate_uv(&face.surface, &loops, uv, 0.0) != PolygonLocation::Outside {
                        aabb.add_point(&face.surface.evaluate(uv.x, uv.y)?);
                    }
                }
            }
            let step = du.max(dv);
            let sagitta = sphere.radius() * (1.0 - step.cos()).max(0.0);
            aabb = aabb.enlarged(sagitta);
        }
    }
    Ok(aabb.enlarged(face.tolerance))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::operations::creation::{MakeBox, MakeSphere};

    #[test]
    fn box_bounds() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(Point3::new(1.0, 2.0, 3.0), Point3::new(2.0, 4.0, 6.0))
            .execute(&mut store)
            .unwrap();
        let bb = BoundingBox::new(solid).execute(&store).unwrap();
        assert!((bb.min - Point3::new(1.0, 2.0, 3.0)).norm() < 1e-6);
        assert!((bb.max - Point3::new(2.0, 4.0, 6.0)).norm() < 1e-6);
    }

    #[test]
    fn sphere_bounds_cover_the_ball() {
        let mut store = TopologyStore::new();
        let solid = MakeSphere::new(Point3::origin(), 2.0).execute(&mut store).unwrap();
        let bb = BoundingBox::new(solid).execute(&store).unwrap();
        for corner in [-2.0, 2.0] {
            assert!(bb.contains(&Point3::new(corner, 0.0, 0.0)));
            assert!(bb.contains(&Point3::new(0.0, corner, 0.0)));
            assert!(bb.contains(&Point3::new(0.0, 0.0, corner)));
        }
        assert!(bb.max.x < 2.2 && bb.min.y > -2.2);
    }
}
