use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::geometry::curve::Curve;
use crate::geometry::surface::Surface;
use crate::math::polygon_2d::interior_point;
use crate::math::{Point2, Point3, Vector2, Vector3, TOLERANCE};
use crate::operations::query::{face_uv_loops, PointClassifier, PointLocation};
use crate::topology::{EdgeId, FaceId, ShapeId, ShapeKind, TopologyStore};

use super::context::IntersectionContext;
use super::options::BooleanOptions;
use super::split_face::FaceSplit;

/// Orientation of a piece lying on an operand boundary, compared with that
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sense {
    /// Both sides have the material on the same side.
    Same,
    /// The material lies on opposite sides.
    Opposite,
}

/// State of a piece relative to one operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceState {
    /// Inside the operand material.
    In,
    /// Outside the operand material.
    Out,
    /// On the operand boundary.
    On(Sense),
}

/// A face or edge of the split operands, with its state against every
/// operand.
#[derive(Debug, Clone)]
pub struct Piece {
    /// The split face or edge.
    pub shape: ShapeId,
    /// The operand face or free edge it was cut from.
    pub origin: ShapeId,
    /// Orientation inherited from the operand shell.
    pub forward: bool,
    /// Ranks of the operands the origin belongs to, ascending.
    pub operands: Vec<usize>,
    /// State against each operand, indexed by rank.
    pub states: Vec<PieceState>,
}

/// Point classifier of one operand and the largest tolerance of its faces.
struct OperandTarget {
    classifier: Option<PointClassifier>,
    tolerance: f64,
}

/// A point inside a piece and the outward normal there.
struct Sample {
    point: Point3,
    normal: Option<Vector3>,
}

/// Collects the face pieces and the pieces of free operand edges, then
/// classifies every piece against every operand.
///
/// A piece is `On(Same)` against its own operands. Against another operand,
/// a piece bounded by exactly the same edges as one of the operand's pieces
/// on a coincident surface is `On`, with the sense given by the normals.
/// Anything else is classified through an interior point; a point on the
/// boundary is resolved by probing both sides along the normal.
///
/// # Errors
///
/// Returns an error on cancellation or if the store is inconsistent.
#[instrument(skip_all, fields(faces = splits.len()))]
pub fn classify_pieces(
    store: &TopologyStore,
    ctx: &IntersectionContext,
    splits: &[FaceSplit],
    options: &BooleanOptions,
) -> Result<Vec<Piece>> {
    let ranks = ctx.operands().len();
    let mut pieces = Vec::new();
    for split in splits {
        let operands = operands_of(ctx, split.face.into());
        for &face in &split.pieces {
            pieces.push(Piece {
                shape: face.into(),
                origin: split.face.into(),
                forward: split.forward,
                operands: operands.clone(),
                states: vec![PieceState::Out; ranks],
            });
        }
    }
    for edge in free_edges(store, ctx)? {
        let operands = operands_of(ctx, edge.into());
        for &b in ctx.blocks_of(edge) {
            if let Some(split) = ctx.block(b).split_edge {
                pieces.push(Piece {
                    shape: split.into(),
                    origin: edge.into(),
                    forward: true,
                    operands: operands.clone(),
                    states: vec![PieceState::Out; ranks],
                });
            }
        }
    }

    let mut targets = Vec::with_capacity(ranks);
    for operand in ctx.operands() {
        let classifier = if store.dimension(operand.shape)? == Some(3) {
            Some(PointClassifier::for_shape(store, operand.shape)?)
        } else {
            None
        };
        targets.push(OperandTarget {
            classifier,
            tolerance: operand_tolerance(store, operand.shape)?,
        });
    }
    let domains = same_domain_index(store, &pieces)?;

    let classify = |piece: &Piece| -> Result<Vec<PieceState>> {
        options.progress.check()?;
        piece_states(store, piece, &pieces, &domains, &targets, options.fuzzy_value)
    };
    let states: Vec<Vec<PieceState>> = if options.run_parallel {
        pieces.par_iter().map(classify).collect::<Result<_>>()?
    } else {
        pieces.iter().map(classify).collect::<Result<_>>()?
    };
    for (piece, states) in pieces.iter_mut().zip(states) {
        piece.states = states;
    }
    debug!(pieces = pieces.len(), "pieces classified");
    Ok(pieces)
}

fn operands_of(ctx: &IntersectionContext, id: ShapeId) -> Vec<usize> {
    ctx.index_of(id)
        .map(|i| {
            let mut ranks = ctx.shape(i).operands.clone();
            ranks.sort_unstable();
            ranks
        })
        .unwrap_or_default()
}

/// Operand edges that bound no operand face.
fn free_edges(store: &TopologyStore, ctx: &IntersectionContext) -> Result<Vec<EdgeId>> {
    let mut bounded = HashSet::new();
    for face in ctx.faces() {
        bounded.extend(store.explore(face.into(), ShapeKind::Edge)?);
    }
    Ok(ctx
        .edges()
        .into_iter()
        .filter(|&e| !bounded.contains(&ShapeId::Edge(e)))
        .collect())
}

/// Pieces keyed by their sorted boundary edges.
fn same_domain_index(
    store: &TopologyStore,
    pieces: &[Piece],
) -> Result<HashMap<Vec<EdgeId>, Vec<usize>>> {
    let mut index: HashMap<Vec<EdgeId>, Vec<usize>> = HashMap::new();
    for (i, piece) in pieces.iter().enumerate() {
        index.entry(edge_key(store, piece.shape)?).or_default().push(i);
    }
    Ok(index)
}

fn edge_key(store: &TopologyStore, shape: ShapeId) -> Result<Vec<EdgeId>> {
    let mut edges: Vec<EdgeId> = store
        .explore(shape, ShapeKind::Edge)?
        .into_iter()
        .filter_map(|s| match s {
            ShapeId::Edge(e) => Some(e),
            _ => None,
        })
        .collect();
    edges.sort_unstable();
    edges.dedup();
    Ok(edges)
}

fn piece_states(
    store: &TopologyStore,
    piece: &Piece,
    pieces: &[Piece],
    domains: &HashMap<Vec<EdgeId>, Vec<usize>>,
    operands: &[OperandTarget],
    fuzzy: f64,
) -> Result<Vec<PieceState>> {
    let sample = sample(store, piece)?;
    let partners = domains
        .get(&edge_key(store, piece.shape)?)
        .map_or(&[][..], Vec::as_slice);
    let own = piece_tolerance(store, piece.shape)?;

    let mut states = Vec::with_capacity(operands.len());
    for (rank, operand) in operands.iter().enumerate() {
        if piece.operands.contains(&rank) {
            states.push(PieceState::On(Sense::Same));
            continue;
        }
        // The same reach the detector used to decide whether the two touch.
        let tol = (own + operand.tolerance + fuzzy).max(TOLERANCE);
        if let Some(state) = same_domain_state(store, piece, &sample, pieces, partners, rank, tol)? {
            states.push(state);
            continue;
        }
        states.push(match &operand.classifier {
            Some(classifier) => classify_sample(classifier, &sample, tol),
            None => PieceState::Out,
        });
    }
    Ok(states)
}

fn piece_tolerance(store: &TopologyStore, shape: ShapeId) -> Result<f64> {
    Ok(match shape {
        ShapeId::Face(f) => store.face(f)?.tolerance,
        ShapeId::Edge(e) => store.edge(e)?.tolerance,
        _ => 0.0,
    })
}

fn operand_tolerance(store: &TopologyStore, shape: ShapeId) -> Result<f64> {
    let mut tolerance: f64 = 0.0;
    for sub in store.explore(shape, ShapeKind::Face)? {
        if let ShapeId::Face(f) = sub {
            tolerance = tolerance.max(store.face(f)?.tolerance);
        }
    }
    Ok(tolerance)
}

/// Interior point of a piece and, for faces, the outward normal there.
fn sample(store: &TopologyStore, piece: &Piece) -> Result<Sample> {
    match piece.shape {
        ShapeId::Face(face) => {
            let data = store.face(face)?;
            let loops = face_uv_loops(store, face)?;
            let uv = interior_point(&loops)
                .or_else(|| loops.first().and_then(|l| centroid(l)))
                .unwrap_or_else(Point2::origin);
            let point = data.surface.evaluate(uv.x, uv.y)?;
            let normal = outward_normal(store, face, piece.forward, &point)?;
            Ok(Sample {
                point,
                normal: Some(normal),
            })
        }
        ShapeId::Edge(edge) => {
            let data = store.edge(edge)?;
            let point = data.curve.evaluate(0.5 * (data.t_start + data.t_end))?;
            Ok(Sample {
                point,
                normal: None,
            })
        }
        _ => Ok(Sample {
            point: Point3::origin(),
            normal: None,
        }),
    }
}

fn centroid(points: &[Point2]) -> Option<Point2> {
    if points.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f64;
    Some(Point2::from(
        points.iter().map(|p| p.coords).sum::<Vector2>() / n,
    ))
}

/// Normal of `face` at the projection of `point`, pointing away from the
/// material of a shell using the face with orientation `forward`.
fn outward_normal(store: &TopologyStore, face: FaceId, forward: bool, point: &Point3) -> Result<Vector3> {
    let data = store.face(face)?;
    let (u, v) = data.surface.project(point)?;
    let normal = data.surface.normal(u, v)?;
    Ok(if data.same_sense == forward {
        normal
    } else {
        -normal
    })
}

/// `On` state against operand `rank` when the piece shares its boundary
/// and surface with one of that operand's pieces.
fn same_domain_state(
    store: &TopologyStore,
    piece: &Piece,
    sample: &Sample,
    pieces: &[Piece],
    partners: &[usize],
    rank: usize,
    tol: f64,
) -> Result<Option<PieceState>> {
    for &i in partners {
        let other = &pieces[i];
        if other.shape == piece.shape || !other.operands.contains(&rank) {
            continue;
        }
        match (piece.shape, other.shape) {
            (ShapeId::Face(a), ShapeId::Face(b)) => {
                let (fa, fb) = (store.face(a)?, store.face(b)?);
                if !fa.surface.coincides_with(&fb.surface, tol) {
                    continue;
                }
                let Some(normal) = sample.normal else {
                    continue;
                };
                let other_normal = outward_normal(store, b, other.forward, &sample.point)?;
                let sense = if normal.dot(&other_normal) > 0.0 {
                    Sense::Same
                } else {
                    Sense::Opposite
                };
                return Ok(Some(PieceState::On(sense)));
            }
            (ShapeId::Edge(_), ShapeId::Edge(_)) => return Ok(Some(PieceState::On(Sense::Same))),
            _ => {}
        }
    }
    Ok(None)
}

/// Classifies a sample against a solid, resolving boundary hits by probing
/// a short distance to either side of the piece.
fn classify_sample(classifier: &PointClassifier, sample: &Sample, tol: f64) -> PieceState {
    match classifier.classify(&sample.point, tol) {
        PointLocation::In => PieceState::In,
        PointLocation::Out => PieceState::Out,
        PointLocation::On => {
            let Some(normal) = sample.normal else {
                return PieceState::On(Sense::Same);
            };
            let delta = 2.0 * tol;
            let outside = classifier.classify(&(sample.point + normal * delta), tol);
            let inside = classifier.classify(&(sample.point - normal * delta), tol);
            match (outside, inside) {
                (PointLocation::Out, PointLocation::In) => PieceState::On(Sense::Same),
                (PointLocation::In, PointLocation::Out) => PieceState::On(Sense::Opposite),
                (PointLocation::In, PointLocation::In) => PieceState::In,
                _ => PieceState::Out,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::operations::boolean::context::{Operand, OperandGroup};
    use crate::operations::boolean::pave_filler::PaveFiller;
    use crate::operations::boolean::report::Report;
    use crate::operations::boolean::split_edge::split_edges;
    use crate::operations::boolean::split_face::split_faces;
    use crate::operations::creation::{MakeBox, MakeSphere};

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn classify(store: &mut TopologyStore, a: ShapeId, b: ShapeId) -> Vec<Piece> {
        let mut ctx = IntersectionContext::new(
            store,
            vec![
                Operand {
                    shape: a,
                    group: OperandGroup::Object,
                },
                Operand {
                    shape: b,
                    group: OperandGroup::Tool,
                },
            ],
            0.0,
        )
        .unwrap();
        let options = BooleanOptions::default();
        let mut report = Report::new();
        PaveFiller::new(&options)
            .perform(store, &mut ctx, &mut report)
            .unwrap();
        split_edges(store, &mut ctx).unwrap();
        let splits = split_faces(store, &ctx, &options, &mut report).unwrap();
        classify_pieces(store, &ctx, &splits, &options).unwrap()
    }

    fn count(pieces: &[Piece], rank: usize, of: usize, state: PieceState) -> usize {
        pieces
            .iter()
            .filter(|p| p.operands == vec![rank] && p.states[of] == state)
            .count()
    }

    #[test]
    fn overlapping_boxes() {
        let mut store = TopologyStore::new();
        let a = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let b = MakeBox::new(p(0.5, 0.5, 0.5), p(1.5, 1.5, 1.5))
            .execute(&mut store)
            .unwrap();
        let pieces = classify(&mut store, a.into(), b.into());
        assert_eq!(pieces.len(), 18);
        assert_eq!(count(&pieces, 0, 1, PieceState::In), 3);
        assert_eq!(count(&pieces, 0, 1, PieceState::Out), 6);
        assert_eq!(count(&pieces, 1, 0, PieceState::In), 3);
        assert!(pieces
            .iter()
            .all(|p| p.states[p.operands[0]] == PieceState::On(Sense::Same)));
    }

    #[test]
    fn shared_face_is_on_with_opposite_sense() {
        let mut store = TopologyStore::new();
        let a = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let b = MakeBox::new(p(1.0, 0.0, 0.0), p(2.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let pieces = classify(&mut store, a.into(), b.into());
        assert_eq!(pieces.len(), 12);
        assert_eq!(count(&pieces, 0, 1, PieceState::On(Sense::Opposite)), 1);
        assert_eq!(count(&pieces, 1, 0, PieceState::On(Sense::Opposite)), 1);
        assert_eq!(count(&pieces, 0, 1, PieceState::Out), 5);
    }

    #[test]
    fn stacked_boxes_share_a_face_with_the_same_sense() {
        let mut store = TopologyStore::new();
        let a = MakeBox::new(p(0.0, 0.0, 0.0), p(2.0, 2.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let b = MakeBox::new(p(0.0, 0.0, 0.0), p(2.0, 2.0, 2.0))
            .execute(&mut store)
            .unwrap();
        let pieces = classify(&mut store, a.into(), b.into());
        // Every face of the lower box lies on the taller one except its top.
        assert_eq!(count(&pieces, 0, 1, PieceState::In), 1);
        assert_eq!(count(&pieces, 0, 1, PieceState::On(Sense::Same)), 5);
        assert_eq!(count(&pieces, 0, 1, PieceState::Out), 0);
    }

    #[test]
    fn disjoint_sphere_is_out() {
        let mut store = TopologyStore::new();
        let a = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let b = MakeSphere::new(p(5.0, 0.0, 0.0), 1.0)
            .execute(&mut store)
            .unwrap();
        let pieces = classify(&mut store, a.into(), b.into());
        assert_eq!(pieces.len(), 7);
        assert!(pieces.iter().all(|p| p.states[1 - p.operands[0]] == PieceState::Out));
    }
}
