use crate::math::Point3;
use crate::topology::{EdgeCurve, ShapeKind, VertexId};

/// Kind of a pair of sub-shapes, named by the lower dimension first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InterferenceKind {
    VertexVertex,
    VertexEdge,
    EdgeEdge,
    VertexFace,
    EdgeFace,
    FaceFace,
}

impl InterferenceKind {
    /// Detection phases in the order they run.
    pub const PHASES: [Self; 6] = [
        Self::VertexVertex,
        Self::VertexEdge,
        Self::EdgeEdge,
        Self::VertexFace,
        Self::EdgeFace,
        Self::FaceFace,
    ];

    /// The sub-shape kinds of a pair, lower dimension first.
    #[must_use]
    pub fn kinds(self) -> (ShapeKind, ShapeKind) {
        match self {
            Self::VertexVertex => (ShapeKind::Vertex, ShapeKind::Vertex),
            Self::VertexEdge => (ShapeKind::Vertex, ShapeKind::Edge),
            Self::EdgeEdge => (ShapeKind::Edge, ShapeKind::Edge),
            Self::VertexFace => (ShapeKind::Vertex, ShapeKind::Face),
            Self::EdgeFace => (ShapeKind::Edge, ShapeKind::Face),
            Self::FaceFace => (ShapeKind::Face, ShapeKind::Face),
        }
    }

    /// The pair kind for two sub-shape kinds in either order.
    #[must_use]
    pub fn of(a: ShapeKind, b: ShapeKind) -> Option<Self> {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        match (lo, hi) {
            (ShapeKind::Vertex, ShapeKind::Vertex) => Some(Self::VertexVertex),
            (ShapeKind::Vertex, ShapeKind::Edge) => Some(Self::VertexEdge),
            (ShapeKind::Edge, ShapeKind::Edge) => Some(Self::EdgeEdge),
            (ShapeKind::Vertex, ShapeKind::Face) => Some(Self::VertexFace),
            (ShapeKind::Edge, ShapeKind::Face) => Some(Self::EdgeFace),
            (ShapeKind::Face, ShapeKind::Face) => Some(Self::FaceFace),
            _ => None,
        }
    }
}

/// Geometric content of an interference.
///
/// Parameters refer to the curve of an edge; vertices and faces use zero.
#[derive(Debug, Clone)]
pub enum Contact {
    /// The sub-shapes meet at one point.
    Point {
        /// The contact point.
        point: Point3,
        /// Parameter on the first sub-shape.
        param_a: f64,
        /// Parameter on the second sub-shape.
        param_b: f64,
    },
    /// The sub-shapes coincide over a parameter range.
    Range {
        /// Range on the first sub-shape.
        range_a: (f64, f64),
        /// Range on the second sub-shape.
        range_b: (f64, f64),
    },
    /// Two faces cross along untrimmed section curves.
    Curves(Vec<EdgeCurve>),
    /// Two faces touch at a single point.
    Tangent {
        /// The contact point.
        point: Point3,
    },
    /// Two faces lie on the same surface.
    Coincident,
}

/// A recorded geometric coincidence between two indexed sub-shapes.
///
/// Interferences are only ever appended; processing marks them consumed.
#[derive(Debug, Clone)]
pub struct Interference {
    /// Kind of the pair.
    pub kind: InterferenceKind,
    /// Index of the lower-dimension sub-shape.
    pub index_a: usize,
    /// Index of the other sub-shape.
    pub index_b: usize,
    /// What was found.
    pub contact: Contact,
    /// Tolerance the contact was computed with.
    pub tolerance: f64,
    /// Vertex attached to a point contact once one is assigned.
    pub vertex: Option<VertexId>,
    /// Set once the pave filler has used the record.
    pub consumed: bool,
}

impl Interference {
    /// Creates an unprocessed interference.
    #[must_use]
    pub fn new(
        kind: InterferenceKind,
        index_a: usize,
        index_b: usize,
        contact: Contact,
        tolerance: f64,
    ) -> Self {
        Self {
            kind,
            index_a,
            index_b,
            contact,
            tolerance,
            vertex: None,
            consumed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_lookup_is_order_independent() {
        assert_eq!(
            InterferenceKind::of(ShapeKind::Face, ShapeKind::Edge),
            Some(InterferenceKind::EdgeFace)
        );
        assert_eq!(
            InterferenceKind::of(ShapeKind::Edge, ShapeKind::Vertex),
            Some(InterferenceKind::VertexEdge)
        );
        assert_eq!(InterferenceKind::of(ShapeKind::Solid, ShapeKind::Face), None);
    }

    #[test]
    fn phases_follow_dimension_order() {
        let phases = InterferenceKind::PHASES;
        assert_eq!(phases[0], InterferenceKind::VertexVertex);
        assert_eq!(phases[2], InterferenceKind::EdgeEdge);
        assert_eq!(phases[5], InterferenceKind::FaceFace);
    }
}
