use tracing::{info, instrument};

use crate::error::{BooleanError, Result};
use crate::math::TOLERANCE;
use crate::topology::{OrientedFace, Shape, ShapeId, ShapeKind, TopologyStore};

use super::assemble::{assemble, KeptPieces};
use super::classify::classify_pieces;
use super::context::{IntersectionContext, Operand, OperandGroup};
use super::history::History;
use super::options::BooleanOptions;
use super::pave_filler::PaveFiller;
use super::report::Report;
use super::select::{section_edges, select_pieces, BooleanOp, KeepDecision};
use super::split_edge::split_edges;
use super::split_face::split_faces;
use super::validate::validate_result;

/// Outcome of a boolean operation.
#[derive(Debug, Clone)]
pub struct BooleanOutput {
    /// The result shape; `None` when the result is empty.
    pub shape: Option<Shape>,
    /// Fate of the operand sub-shapes.
    pub history: History,
    /// Recoverable problems met on the way.
    pub report: Report,
}

/// A boolean operation between a list of objects and a list of tools.
///
/// Objects and tools form two groups; the operation combines the material
/// of the objects with the material of the tools:
///
/// ```text
/// Union      objects | tools
/// Intersect  objects & tools
/// Subtract   objects - tools
/// Section    the edges where objects and tools meet
/// ```
///
/// Operands are never modified. Every new entity is inserted into the
/// store; unchanged entities are shared with the operands.
pub struct BooleanOperation {
    op: BooleanOp,
    arguments: Vec<Shape>,
    tools: Vec<Shape>,
    options: BooleanOptions,
}

impl BooleanOperation {
    /// Creates an operation without operands and with default options.
    #[must_use]
    pub fn new(op: BooleanOp) -> Self {
        Self {
            op,
            arguments: Vec::new(),
            tools: Vec::new(),
            options: BooleanOptions::default(),
        }
    }

    /// Sets the objects.
    #[must_use]
    pub fn with_arguments(mut self, arguments: Vec<Shape>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Sets the tools.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<Shape>) -> Self {
        self.tools = tools;
        self
    }

    /// Sets the options.
    #[must_use]
    pub fn with_options(mut self, options: BooleanOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs the operation.
    ///
    /// The pipeline is: interference detection and pave filling, edge
    /// splitting, face splitting, classification and selection of the
    /// pieces, assembly, a validity pass and history. Section skips the
    /// face stages and assembles the shared edges into wires.
    ///
    /// # Errors
    ///
    /// Returns a [`BooleanError`] for invalid input, detected before the
    /// store is touched, or on cancellation. Other errors mean the store
    /// is inconsistent.
    #[instrument(skip_all, fields(op = ?self.op, arguments = self.arguments.len(), tools = self.tools.len()))]
    pub fn execute(&self, store: &mut TopologyStore) -> Result<BooleanOutput> {
        self.check_inputs(store)?;
        let options = &self.options;
        let operands: Vec<Operand> = self
            .arguments
            .iter()
            .map(|s| Operand {
                shape: s.id,
                group: OperandGroup::Object,
            })
            .chain(self.tools.iter().map(|s| Operand {
                shape: s.id,
                group: OperandGroup::Tool,
            }))
            .collect();

        let mut report = Report::new();
        let mut ctx = IntersectionContext::new(store, operands, options.fuzzy_value)?;
        PaveFiller::new(options).perform(store, &mut ctx, &mut report)?;
        split_edges(store, &mut ctx)?;
        options.progress.check()?;

        let mut kept = KeptPieces::default();
        let mut splits = Vec::new();
        if self.op == BooleanOp::Section {
            kept.edges = section_edges(&ctx);
        } else {
            splits = split_faces(store, &ctx, options, &mut report)?;
            let pieces = classify_pieces(store, &ctx, &splits, options)?;
            let decisions = select_pieces(&ctx, &pieces, self.op);
            for (piece, decision) in pieces.iter().zip(decisions) {
                let flip = match decision {
                    KeepDecision::Discard => continue,
                    KeepDecision::Keep => false,
                    KeepDecision::KeepFlipped => true,
                };
                match piece.shape {
                    ShapeId::Face(face) => kept.faces.push(OrientedFace::new(face, piece.forward != flip)),
                    ShapeId::Edge(edge) if !kept.edges.contains(&edge) => kept.edges.push(edge),
                    _ => {}
                }
            }
        }
        options.progress.check()?;

        let shape = assemble(store, &kept, options, &mut report)?;
        let require_closed = self.op != BooleanOp::Section && self.solids_only(store)?;
        validate_result(store, shape, require_closed, options, &mut report)?;
        let history = History::build(store, &ctx, &splits, shape)?;
        info!(
            faces = kept.faces.len(),
            edges = kept.edges.len(),
            warnings = report.warnings().len(),
            empty = shape.is_none(),
            "boolean operation done"
        );
        Ok(BooleanOutput {
            shape,
            history,
            report,
        })
    }

    /// Whether every operand is three-dimensional, so the result must be
    /// bounded by closed shells.
    fn solids_only(&self, store: &TopologyStore) -> Result<bool> {
        for shape in self.arguments.iter().chain(&self.tools) {
            if store.dimension(shape.id)? != Some(3) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Rejects operands the operation cannot work on.
    fn check_inputs(&self, store: &TopologyStore) -> Result<()> {
        self.options.validate()?;
        if self.arguments.is_empty() || self.tools.is_empty() {
            return Err(BooleanError::EmptyArguments.into());
        }
        let mut object_dim = 0;
        let mut tool_dim = 0;
        for (index, shape) in self.arguments.iter().chain(&self.tools).enumerate() {
            let dim = check_shape(store, index, shape.id)?;
            if index < self.arguments.len() {
                object_dim = object_dim.max(dim);
            } else {
                tool_dim = tool_dim.max(dim);
            }
        }
        let compatible = match self.op {
            BooleanOp::Union => object_dim == tool_dim,
            BooleanOp::Subtract => object_dim <= tool_dim,
            BooleanOp::Intersect | BooleanOp::Section => true,
        };
        if !compatible {
            return Err(BooleanError::IncompatibleDimensions {
                object: object_dim,
                tool: tool_dim,
            }
            .into());
        }
        Ok(())
    }
}

/// Checks one operand and returns its dimension.
fn check_shape(store: &TopologyStore, index: usize, id: ShapeId) -> Result<u8> {
    if !store.contains(id) {
        return Err(BooleanError::NullShape(index).into());
    }
    // Exploring fails on any dangling reference below the operand.
    store
        .explore(id, ShapeKind::Vertex)
        .map_err(|_| BooleanError::NullShape(index))?;

    let degenerate = |reason: &str| -> crate::error::GeoboolError {
        BooleanError::DegenerateShape {
            index,
            reason: reason.into(),
        }
        .into()
    };
    let Some(dim) = store.dimension(id)? else {
        return Err(degenerate("compound without members"));
    };
    if dim >= 2 && store.explore(id, ShapeKind::Face)?.is_empty() {
        return Err(degenerate("no faces"));
    }

    let invalid = |value: f64| !value.is_finite() || value < 0.0;
    for sub in store.explore(id, ShapeKind::Vertex)? {
        if let ShapeId::Vertex(v) = sub {
            let tolerance = store.vertex(v)?.tolerance;
            if invalid(tolerance) {
                return Err(BooleanError::InvalidTolerance { index, value: tolerance }.into());
            }
        }
    }
    for sub in store.explore(id, ShapeKind::Edge)? {
        if let ShapeId::Edge(e) = sub {
            let edge = store.edge(e)?;
            if invalid(edge.tolerance) {
                return Err(BooleanError::InvalidTolerance {
                    index,
                    value: edge.tolerance,
                }
                .into());
            }
            if !edge.is_degenerate() && (edge.t_end - edge.t_start).abs() <= TOLERANCE {
                return Err(degenerate("zero-length edge"));
            }
        }
    }
    for sub in store.explore(id, ShapeKind::Face)? {
        if let ShapeId::Face(f) = sub {
            let tolerance = store.face(f)?.tolerance;
            if invalid(tolerance) {
                return Err(BooleanError::InvalidTolerance { index, value: tolerance }.into());
            }
        }
    }
    Ok(dim)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::GeoboolError;
    use crate::math::Point3;
    use crate::operations::creation::{MakeBox, MakeEdge, MakeSphere};
    use crate::operations::query::Volume;
    use crate::topology::VertexData;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn run(store: &mut TopologyStore, op: BooleanOp, a: Shape, b: Shape) -> BooleanOutput {
        BooleanOperation::new(op)
            .with_arguments(vec![a])
            .with_tools(vec![b])
            .execute(store)
            .unwrap()
    }

    fn volume(store: &TopologyStore, output: &BooleanOutput) -> f64 {
        Volume::new(output.shape.unwrap().id).execute(store).unwrap()
    }

    #[test]
    fn overlapping_boxes() {
        let mut store = TopologyStore::new();
        let a: Shape = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap()
            .into();
        let b: Shape = MakeBox::new(p(0.5, 0.5, 0.5), p(1.5, 1.5, 1.5))
            .execute(&mut store)
            .unwrap()
            .into();
        let union = run(&mut store, BooleanOp::Union, a, b);
        assert!(union.report.is_clean(), "{:?}", union.report.warnings());
        assert!((volume(&store, &union) - 1.875).abs() < 1e-9);

        let common = run(&mut store, BooleanOp::Intersect, a, b);
        assert!(common.report.is_clean(), "{:?}", common.report.warnings());
        assert!((volume(&store, &common) - 0.125).abs() < 1e-9);

        let cut = run(&mut store, BooleanOp::Subtract, a, b);
        assert!(cut.report.is_clean(), "{:?}", cut.report.warnings());
        assert!((volume(&store, &cut) - 0.875).abs() < 1e-9);
    }

    #[test]
    fn section_of_overlapping_boxes_is_a_closed_wire() {
        let mut store = TopologyStore::new();
        let a: Shape = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap()
            .into();
        let b: Shape = MakeBox::new(p(0.5, 0.5, 0.5), p(1.5, 1.5, 1.5))
            .execute(&mut store)
            .unwrap()
            .into();
        let section = run(&mut store, BooleanOp::Section, a, b);
        let shape = section.shape.unwrap();
        let ShapeId::Wire(wire) = shape.id else {
            panic!("expected a wire, got {shape:?}");
        };
        let wire = store.wire(wire).unwrap();
        assert_eq!(wire.edges.len(), 6);
        assert!(wire.is_closed);
    }

    #[test]
    fn history_tracks_split_faces() {
        let mut store = TopologyStore::new();
        let a = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let b = MakeBox::new(p(0.5, 0.5, 0.5), p(1.5, 1.5, 1.5))
            .execute(&mut store)
            .unwrap();
        let faces = store.explore(a.into(), ShapeKind::Face).unwrap();
        let out = run(&mut store, BooleanOp::Intersect, a.into(), b.into());
        let modified = faces
            .iter()
            .filter(|&&f| out.history.modified(f).len() == 1)
            .count();
        let deleted = faces.iter().filter(|&&f| out.history.is_deleted(f)).count();
        assert_eq!(modified, 3);
        assert_eq!(deleted, 3);
    }

    #[test]
    fn disjoint_intersection_is_empty() {
        let mut store = TopologyStore::new();
        let a: Shape = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap()
            .into();
        let b: Shape = MakeSphere::new(p(5.0, 0.0, 0.0), 1.0)
            .execute(&mut store)
            .unwrap()
            .into();
        let out = run(&mut store, BooleanOp::Intersect, a, b);
        assert!(out.shape.is_none());
        for face in store.explore(a.id, ShapeKind::Face).unwrap() {
            assert!(out.history.is_deleted(face));
        }
    }

    #[test]
    fn empty_arguments_are_rejected() {
        let mut store = TopologyStore::new();
        let a: Shape = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap()
            .into();
        let err = BooleanOperation::new(BooleanOp::Union)
            .with_arguments(vec![a])
            .execute(&mut store)
            .unwrap_err();
        assert!(matches!(err, GeoboolError::Boolean(BooleanError::EmptyArguments)));
    }

    #[test]
    fn union_of_solid_and_edge_is_rejected() {
        let mut store = TopologyStore::new();
        let a: Shape = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap()
            .into();
        let e: Shape = MakeEdge::new(p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0))
            .execute(&mut store)
            .unwrap()
            .into();
        let err = BooleanOperation::new(BooleanOp::Union)
            .with_arguments(vec![a])
            .with_tools(vec![e])
            .execute(&mut store)
            .unwrap_err();
        assert!(matches!(
            err,
            GeoboolError::Boolean(BooleanError::IncompatibleDimensions { object: 3, tool: 1 })
        ));
    }

    #[test]
    fn missing_and_badly_toleranced_shapes_are_rejected() {
        let mut other = TopologyStore::new();
        let mut ghost = other.add_vertex(VertexData::new(p(0.0, 0.0, 0.0)));
        for _ in 0..100 {
            ghost = other.add_vertex(VertexData::new(p(0.0, 0.0, 0.0)));
        }
        let ghost: Shape = ghost.into();
        let mut store = TopologyStore::new();
        let a: Shape = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap()
            .into();
        let err = BooleanOperation::new(BooleanOp::Intersect)
            .with_arguments(vec![a])
            .with_tools(vec![ghost])
            .execute(&mut store)
            .unwrap_err();
        assert!(matches!(err, GeoboolError::Boolean(BooleanError::NullShape(1))));

        let bad: Shape = store
            .add_vertex(VertexData::with_tolerance(p(0.0, 0.0, 0.0), -1.0))
            .into();
        let err = BooleanOperation::new(BooleanOp::Intersect)
            .with_arguments(vec![a])
            .with_tools(vec![bad])
            .execute(&mut store)
            .unwrap_err();
        assert!(matches!(
            err,
            GeoboolError::Boolean(BooleanError::InvalidTolerance { index: 1, .. })
        ));
    }
}
