use crate::error::Result;
use crate::geometry::curve::Curve;
use crate::math::Point3;
use crate::topology::{EdgeCurve, EdgeId, FaceId, VertexId};

/// A split point on an edge: a curve parameter bound to a vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pave {
    /// Vertex located at the parameter.
    pub vertex: VertexId,
    /// Curve parameter.
    pub param: f64,
}

impl Pave {
    /// Creates a pave.
    #[must_use]
    pub fn new(vertex: VertexId, param: f64) -> Self {
        Self { vertex, param }
    }
}

/// The part of an edge between two consecutive paves.
#[derive(Debug, Clone)]
pub struct PaveBlock {
    /// Edge the block lies on: an operand edge or a section edge.
    pub edge: EdgeId,
    /// Pave at the lower parameter.
    pub pave1: Pave,
    /// Pave at the higher parameter.
    pub pave2: Pave,
    /// Edge built for the block by the splitter.
    pub split_edge: Option<EdgeId>,
    /// Whether the split edge runs in the direction of `edge`.
    pub same_sense: bool,
}

impl PaveBlock {
    /// Creates a block between two paves that has not been split yet.
    #[must_use]
    pub fn new(edge: EdgeId, pave1: Pave, pave2: Pave) -> Self {
        Self {
            edge,
            pave1,
            pave2,
            split_edge: None,
            same_sense: true,
        }
    }

    /// Parameter range of the block.
    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        (self.pave1.param, self.pave2.param)
    }

    /// Middle parameter of the block.
    #[must_use]
    pub fn mid_param(&self) -> f64 {
        0.5 * (self.pave1.param + self.pave2.param)
    }

    /// The two end vertices as an unordered pair.
    #[must_use]
    pub fn vertex_pair(&self) -> (VertexId, VertexId) {
        let (a, b) = (self.pave1.vertex, self.pave2.vertex);
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Point at the middle of the block on `curve`.
    ///
    /// # Errors
    ///
    /// Returns an error if the curve cannot be evaluated.
    pub fn mid_point(&self, curve: &EdgeCurve) -> Result<Point3> {
        curve.evaluate(self.mid_param())
    }
}

/// Pave blocks of different edges that coincide within tolerance, plus the
/// faces they lie on. All of them are built as one shared edge.
#[derive(Debug, Clone, Default)]
pub struct CommonBlock {
    /// Indices of the member blocks; the first one defines the edge.
    pub blocks: Vec<usize>,
    /// Faces whose interior contains the common block.
    pub faces: Vec<FaceId>,
}

/// Arc length of `curve` over `[t0, t1]`.
#[must_use]
pub fn curve_length(curve: &EdgeCurve, t0: f64, t1: f64) -> f64 {
    match curve {
        EdgeCurve::Line(_) => (t1 - t0).abs(),
        EdgeCurve::Circle(c) => c.radius() * (t1 - t0).abs(),
        EdgeCurve::Degenerate(_) => 0.0,
    }
}
