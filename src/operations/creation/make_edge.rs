use std::f64::consts::TAU;

use crate::error::{OperationError, Result};
use crate::geometry::curve::{Circle, Curve, Line};
use crate::math::{wrap_parameter, Point3, Vector3, TOLERANCE};
use crate::topology::{EdgeCurve, EdgeData, EdgeId, TopologyStore, VertexData};

/// Creates a straight edge between two points.
pub struct MakeEdge {
    start: Point3,
    end: Point3,
}

impl MakeEdge {
    /// Creates a new `MakeEdge` operation.
    #[must_use]
    pub fn new(start: Point3, end: Point3) -> Self {
        Self { start, end }
    }

    /// Executes the operation, creating the edge and its two vertices.
    ///
    /// The edge is parameterized by arc length from `start`.
    ///
    /// # Errors
    ///
    /// Returns an error if the points coincide.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<EdgeId> {
        let length = (self.end - self.start).norm();
        if length < TOLERANCE {
            return Err(OperationError::InvalidInput("edge end points coincide".into()).into());
        }
        let line = Line::through(self.start, self.end)?;
        let start = store.add_vertex(VertexData::new(self.start));
        let end = store.add_vertex(VertexData::new(self.end));
        Ok(store.add_edge(EdgeData::new(start, end, EdgeCurve::Line(line), 0.0, length)))
    }
}

/// Creates a circular edge: a full circle or an arc.
pub struct MakeCircleEdge {
    center: Point3,
    radius: f64,
    normal: Vector3,
    ref_dir: Vector3,
    range: (f64, f64),
}

impl MakeCircleEdge {
    /// Creates a new `MakeCircleEdge` operation for the full circle.
    #[must_use]
    pub fn new(center: Point3, radius: f64, normal: Vector3, ref_dir: Vector3) -> Self {
        Self {
            center,
            radius,
            normal,
            ref_dir,
            range: (0.0, TAU),
        }
    }

    /// Trims the circle to the arc `[t0, t1]`, counter-clockwise about the
    /// normal from `t0`.
    #[must_use]
    pub fn with_range(mut self, t0: f64, t1: f64) -> Self {
        self.range = (t0, t1);
        self
    }

    /// Executes the operation, creating the edge and its vertices.
    ///
    /// A full circle gets a single vertex used at both ends. The stored
    /// range starts inside `[0, 2pi)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the circle is degenerate or the range is empty
    /// or longer than one turn.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<EdgeId> {
        let (t0, t1) = self.range;
        let sweep = t1 - t0;
        if sweep <= TOLERANCE || sweep > TAU + TOLERANCE {
            return Err(OperationError::InvalidInput(format!(
                "arc range [{t0}, {t1}] must cover (0, 2pi]"
            ))
            .into());
        }
        let circle = Circle::new(self.center, self.radius, self.normal, self.ref_dir)?;
        let t_start = wrap_parameter(t0, 0.0, TAU);
        let full = (sweep - TAU).abs() <= TOLERANCE;
        let t_end = if full { t_start + TAU } else { t_start + sweep };

        let start = store.add_vertex(VertexData::new(circle.evaluate(t_start)?));
        let end = if full {
            start
        } else {
            store.add_vertex(VertexData::new(circle.evaluate(t_end)?))
        };
        Ok(store.add_edge(EdgeData::new(
            start,
            end,
            EdgeCurve::Circle(circle),
            t_start,
            t_end,
        )))
    }
}
