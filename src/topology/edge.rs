use crate::error::{GeometryError, Result};
use crate::geometry::curve::{Circle, Curve, CurveDomain, Line};
use crate::math::{Aabb, Point3, Vector3, CONFUSION};

use super::vertex::VertexId;

slotmap::new_key_type! {
    /// Unique identifier for an edge in the topology store.
    pub struct EdgeId;
}

/// The geometric curve associated with an edge.
#[derive(Debug, Clone)]
pub enum EdgeCurve {
    /// A line segment.
    Line(Line),
    /// A circle or circular arc.
    Circle(Circle),
    /// A curve collapsed to a single point, such as the pole of a sphere.
    Degenerate(Point3),
}

impl Curve for EdgeCurve {
    fn evaluate(&self, t: f64) -> Result<Point3> {
        match self {
            Self::Line(l) => l.evaluate(t),
            Self::Circle(c) => c.evaluate(t),
            Self::Degenerate(p) => Ok(*p),
        }
    }

    fn tangent(&self, t: f64) -> Result<Vector3> {
        match self {
            Self::Line(l) => l.tangent(t),
            Self::Circle(c) => c.tangent(t),
            Self::Degenerate(_) => Err(GeometryError::ZeroVector.into()),
        }
    }

    fn domain(&self) -> CurveDomain {
        match self {
            Self::Line(l) => l.domain(),
            Self::Circle(c) => c.domain(),
            Self::Degenerate(_) => CurveDomain::new(0.0, std::f64::consts::TAU),
        }
    }

    fn is_closed(&self) -> bool {
        match self {
            Self::Line(_) => false,
            Self::Circle(_) | Self::Degenerate(_) => true,
        }
    }

    fn period(&self) -> Option<f64> {
        match self {
            Self::Circle(c) => c.period(),
            Self::Line(_) | Self::Degenerate(_) => None,
        }
    }

    fn project(&self, point: &Point3) -> Result<f64> {
        match self {
            Self::Line(l) => l.project(point),
            Self::Circle(c) => c.project(point),
            Self::Degenerate(_) => Ok(0.0),
        }
    }

    fn bounding_box(&self, t0: f64, t1: f64) -> Aabb {
        match self {
            Self::Line(l) => l.bounding_box(t0, t1),
            Self::Circle(c) => c.bounding_box(t0, t1),
            Self::Degenerate(p) => Aabb::from_points(&[*p]),
        }
    }
}

/// Data associated with a topological edge.
///
/// An edge connects two vertices and carries a geometric curve
/// that defines the shape of the edge between them. The parameter range
/// always increases from `t_start` to `t_end`; traversal direction is a
/// property of the wire using the edge.
#[derive(Debug, Clone)]
pub struct EdgeData {
    /// Start vertex of the edge.
    pub start: VertexId,
    /// End vertex of the edge.
    pub end: VertexId,
    /// The geometric curve defining this edge's shape.
    pub curve: EdgeCurve,
    /// Parameter on the curve corresponding to the start vertex.
    pub t_start: f64,
    /// Parameter on the curve corresponding to the end vertex.
    pub t_end: f64,
    /// Radius of the tube around the curve that the edge occupies.
    pub tolerance: f64,
}

impl EdgeData {
    /// Creates an edge with the default tolerance.
    #[must_use]
    pub fn new(start: VertexId, end: VertexId, curve: EdgeCurve, t_start: f64, t_end: f64) -> Self {
        Self {
            start,
            end,
            curve,
            t_start,
            t_end,
            tolerance: CONFUSION,
        }
    }

    /// Returns the edge with a different tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Returns `true` for edges whose curve collapsed to a point.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        matches!(self.curve, EdgeCurve::Degenerate(_))
    }

    /// Returns the `(t_start, t_end)` parameter range.
    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        (self.t_start, self.t_end)
    }

    /// Evaluates the edge curve at `t`.
    ///
    /// # Errors
    ///
    /// Returns an error if the curve cannot be evaluated.
    pub fn point_at(&self, t: f64) -> Result<Point3> {
        self.curve.evaluate(t)
    }

    /// Bounding box of the trimmed curve.
    #[must_use]
    pub fn bounding_box(&self) -> Aabb {
        self.curve.bounding_box(self.t_start, self.t_end)
    }
}
