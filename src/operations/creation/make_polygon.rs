use std::collections::HashMap;

use crate::error::{OperationError, Result};
use crate::geometry::curve::Line;
use crate::geometry::surface::{Plane, Surface};
use crate::math::{Point2, Point3, Vector3, CONFUSION, TOLERANCE};
use crate::topology::{
    EdgeCurve, EdgeData, EdgeId, FaceData, FaceId, FaceSurface, OrientedEdge, Pcurve,
    TopologyStore, VertexData, VertexId, WireData,
};

/// Creates a planar face bounded by a closed polygon.
///
/// The face normal follows the right-hand rule over the point order.
pub struct MakePolygon {
    points: Vec<Point3>,
}

impl MakePolygon {
    /// Creates a new `MakePolygon` operation.
    #[must_use]
    pub fn new(points: Vec<Point3>) -> Self {
        Self { points }
    }

    /// Executes the operation, creating the face in the topology store.
    ///
    /// # Errors
    ///
    /// Returns an error if there are fewer than three points, the points are
    /// collinear, or they do not lie in one plane.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<FaceId> {
        if self.points.len() < 3 {
            return Err(
                OperationError::InvalidInput("polygon needs at least 3 points".into()).into(),
            );
        }
        let vertices: Vec<VertexId> = self
            .points
            .iter()
            .map(|p| store.add_vertex(VertexData::new(*p)))
            .collect();
        let mut edges = HashMap::new();
        build_planar_face(store, &vertices, &mut edges)
    }
}

/// Newell normal of a closed polygon, unnormalized.
fn newell_normal(points: &[Point3]) -> Vector3 {
    let mut n = Vector3::zeros();
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        n.x += (a.y - b.y) * (a.z + b.z);
        n.y += (a.z - b.z) * (a.x + b.x);
        n.z += (a.x - b.x) * (a.y + b.y);
    }
    n
}

/// Builds a planar face over existing vertices, reusing edges already
/// present in `edges` for the same vertex pair.
///
/// Every wire edge gets a straight pcurve in the plane's parameter space.
pub(crate) fn build_planar_face(
    store: &mut TopologyStore,
    vertices: &[VertexId],
    edges: &mut HashMap<(VertexId, VertexId), EdgeId>,
) -> Result<FaceId> {
    let points: Vec<Point3> = vertices
        .iter()
        .map(|&v| store.vertex(v).map(|d| d.point))
        .collect::<std::result::Result<_, _>>()?;
    let normal = newell_normal(&points);
    if normal.norm() < TOLERANCE {
        return Err(OperationError::InvalidInput("polygon points are collinear".into()).into());
    }
    let u_dir = points[1] - points[0];
    let v_dir = normal.normalize().cross(&u_dir);
    let plane = Plane::new(points[0], u_dir, v_dir)?;
    if points.iter().any(|p| plane.signed_distance(p).abs() > CONFUSION) {
        return Err(OperationError::InvalidInput("polygon is not planar".into()).into());
    }
    let uvs: Vec<Point2> = points
        .iter()
        .map(|p| plane.project(p).map(|(u, v)| Point2::new(u, v)))
        .collect::<Result<_>>()?;

    let n = vertices.len();
    let mut wire_edges = Vec::with_capacity(n);
    for i in 0..n {
        let j = (i + 1) % n;
        let (a, b) = (vertices[i], vertices[j]);
        let (edge, forward) = if let Some(&e) = edges.get(&(a, b)) {
            (e, true)
        } else if let Some(&e) = edges.get(&(b, a)) {
            (e, false)
        } else {
            let line = Line::through(points[i], points[j])?;
            let length = (points[j] - points[i]).norm();
            let e = store.add_edge(EdgeData::new(a, b, EdgeCurve::Line(line), 0.0, length));
            edges.insert((a, b), e);
            (e, true)
        };
        let length = store.edge(edge)?.t_end;
        let (uv_start, uv_end) = if forward {
            (uvs[i], uvs[j])
        } else {
            (uvs[j], uvs[i])
        };
        wire_edges.push(OrientedEdge::with_pcurve(
            edge,
            forward,
            Pcurve::segment(0.0, uv_start, length, uv_end),
        ));
    }
    let wire = store.add_wire(WireData {
        edges: wire_edges,
        is_closed: true,
    });
    Ok(store.add_face(FaceData::new(FaceSurface::Plane(plane), wire, Vec::new(), true)))
}
