use std::collections::HashMap;

use crate::error::{OperationError, Result};
use crate::math::{Point3, TOLERANCE};
use crate::topology::{
    OrientedFace, ShellData, SolidData, SolidId, TopologyStore, VertexData, VertexId,
};

use super::make_polygon::build_planar_face;

/// Corner indices of each box face, counter-clockwise seen from outside.
///
/// Corner `i + 2j + 4k` sits at `(x_i, y_j, z_k)` where index 0 is the min
/// coordinate and 1 the max. The first two corners of every face run along
/// the plane's u axis.
const FACES: [[usize; 4]; 6] = [
    [0, 2, 3, 1], // bottom: u = +y, v = +x
    [4, 5, 7, 6], // top: u = +x, v = +y
    [0, 1, 5, 4], // front: u = +x, v = +z
    [2, 6, 7, 3], // back: u = +z, v = +x
    [0, 4, 6, 2], // left: u = +z, v = +y
    [1, 3, 7, 5], // right: u = +y, v = +z
];

/// Creates an axis-aligned box solid from two corner points.
///
/// The box has 8 vertices, 12 shared line edges and 6 planar faces whose
/// normals point outward.
pub struct MakeBox {
    min_corner: Point3,
    max_corner: Point3,
}

impl MakeBox {
    /// Creates a new `MakeBox` operation.
    #[must_use]
    pub fn new(min_corner: Point3, max_corner: Point3) -> Self {
        Self {
            min_corner,
            max_corner,
        }
    }

    /// Executes the operation, creating the box in the topology store.
    ///
    /// # Errors
    ///
    /// Returns an error if the box has zero or negative extent along any axis.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<SolidId> {
        let (lo, hi) = (self.min_corner, self.max_corner);
        if (0..3).any(|i| hi[i] - lo[i] <= TOLERANCE) {
            return Err(OperationError::InvalidInput(format!(
                "box corners {lo} and {hi} do not span a volume"
            ))
            .into());
        }

        let corners: Vec<VertexId> = (0..8)
            .map(|i| {
                let pick = |bit: usize, axis: usize| if i & bit == 0 { lo[axis] } else { hi[axis] };
                store.add_vertex(VertexData::new(Point3::new(pick(1, 0), pick(2, 1), pick(4, 2))))
            })
            .collect();

        let mut edges = HashMap::new();
        let mut faces = Vec::with_capacity(FACES.len());
        for face in FACES {
            let vertices = face.map(|i| corners[i]);
            let id = build_planar_face(store, &vertices, &mut edges)?;
            faces.push(OrientedFace::new(id, true));
        }

        let shell = store.add_shell(ShellData {
            faces,
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
    use crate::geometry::surface::Surface;
    use crate::math::Vector3;
    use crate::topology::{ShapeId, ShapeKind};

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn box_topology_counts() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 2.0, 3.0))
            .execute(&mut store)
            .unwrap();
        let id = ShapeId::Solid(solid);
        assert_eq!(store.explore(id, ShapeKind::Vertex).unwrap().len(), 8);
        assert_eq!(store.explore(id, ShapeKind::Edge).unwrap().len(), 12);
        assert_eq!(store.explore(id, ShapeKind::Face).unwrap().len(), 6);
    }

    #[test]
    fn face_normals_point_outward() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(-1.0, -1.0, -1.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let mut seen: Vec<Vector3> = Vec::new();
        for id in store.explore(ShapeId::Solid(solid), ShapeKind::Face).unwrap() {
            let ShapeId::Face(f) = id else { continue };
            let face = store.face(f).unwrap();
            let n = face.surface.normal(0.5, 0.5).unwrap();
            let on_face = face.surface.evaluate(0.5, 0.5).unwrap();
            assert!(n.dot(&on_face.coords) > 0.0);
            seen.push(n);
        }
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn every_edge_has_two_uses_with_opposite_senses() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let shell = store.solid(solid).unwrap().outer_shell;
        let mut uses: HashMap<_, Vec<bool>> = HashMap::new();
        for of in &store.shell(shell).unwrap().faces {
            let wire = store.face(of.face).unwrap().outer_wire;
            for oe in &store.wire(wire).unwrap().edges {
                assert!(oe.pcurve.is_some());
                uses.entry(oe.edge).or_default().push(oe.forward);
            }
        }
        assert_eq!(uses.len(), 12);
        for senses in uses.values() {
            assert_eq!(senses.len(), 2);
            assert_ne!(senses[0], senses[1]);
        }
    }

    #[test]
    fn flat_box_is_rejected() {
        let mut store = TopologyStore::new();
        let result = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 0.0)).execute(&mut store);
        assert!(result.is_err());
    }
}
