use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::geometry::curve::{project_in_range, Curve};
use crate::geometry::surface::Surface;
use crate::math::polygon_2d::PolygonLocation;
use crate::math::{Point2, Point3};
use crate::operations::query::{
    face_uv_loops, intersect_curve_surface, intersect_curves, intersect_surfaces, locate_uv,
    CurveCurveHit, CurveSurfaceHit, SurfaceIntersection,
};
use crate::topology::{EdgeData, TopologyStore};

use super::context::IntersectionContext;
use super::interference::{Contact, Interference, InterferenceKind};
use super::iterator::candidate_pairs;
use super::options::{BooleanOptions, Glue};
use super::report::{Report, Warning};

/// Signature shared by every pairwise detector.
type DetectFn = fn(&TopologyStore, &IntersectionContext, usize, usize, Glue) -> Result<Vec<Contact>>;

/// Detector for each interference kind.
fn dispatch(kind: InterferenceKind) -> DetectFn {
    match kind {
        InterferenceKind::VertexVertex => vertex_vertex,
        InterferenceKind::VertexEdge => vertex_edge,
        InterferenceKind::EdgeEdge => edge_edge,
        InterferenceKind::VertexFace => vertex_face,
        InterferenceKind::EdgeFace => edge_face,
        InterferenceKind::FaceFace => face_face,
    }
}

/// Whether pairs of this kind are evaluated under the given glue mode.
#[must_use]
pub fn phase_enabled(kind: InterferenceKind, glue: Glue) -> bool {
    match kind {
        InterferenceKind::EdgeFace | InterferenceKind::FaceFace => glue.checks_faces(),
        _ => true,
    }
}

enum PairOutcome {
    Contacts(Vec<Contact>),
    Unresolved(String),
}

/// Runs one detection phase and records its interferences in `ctx`.
///
/// Pairs are evaluated independently, in parallel when the options allow
/// it, and merged in pair order so the result does not depend on
/// scheduling. A pair whose geometry cannot be evaluated becomes an
/// unresolved-interference warning. Cancellation is checked before every
/// pair.
///
/// # Errors
///
/// Returns [`crate::error::BooleanError::Cancelled`] if the progress token
/// fires.
pub fn detect_phase(
    store: &TopologyStore,
    ctx: &mut IntersectionContext,
    kind: InterferenceKind,
    options: &BooleanOptions,
    report: &mut Report,
) -> Result<usize> {
    if !phase_enabled(kind, options.glue) {
        return Ok(0);
    }
    let pairs = candidate_pairs(store, ctx, kind, options.self_interference);
    let detect = dispatch(kind);
    let shared: &IntersectionContext = ctx;
    let evaluate = |&(a, b): &(usize, usize)| -> Result<(usize, usize, PairOutcome)> {
        options.progress.check()?;
        let outcome = match detect(store, shared, a, b, options.glue) {
            Ok(contacts) => PairOutcome::Contacts(contacts),
            Err(err) => PairOutcome::Unresolved(err.to_string()),
        };
        Ok((a, b, outcome))
    };
    let outcomes: Vec<(usize, usize, PairOutcome)> = if options.run_parallel {
        pairs.par_iter().map(evaluate).collect::<Result<_>>()?
    } else {
        pairs.iter().map(evaluate).collect::<Result<_>>()?
    };

    let mut found = 0;
    for (a, b, outcome) in outcomes {
        match outcome {
            PairOutcome::Contacts(contacts) => {
                let tolerance = pair_tolerance(ctx, a, b);
                for contact in contacts {
                    ctx.push_interference(Interference::new(kind, a, b, contact, tolerance));
                    found += 1;
                }
            }
            PairOutcome::Unresolved(reason) => report.push(Warning::UnresolvedInterference {
                kind,
                a: ctx.shape(a).id,
                b: ctx.shape(b).id,
                reason,
            }),
        }
    }
    debug!(?kind, pairs = pairs.len(), found, "detection phase done");
    Ok(found)
}

fn pair_tolerance(ctx: &IntersectionContext, a: usize, b: usize) -> f64 {
    ctx.shape(a).tolerance + ctx.shape(b).tolerance + ctx.fuzzy()
}

/// Whether `point` lies within reach of either end vertex of `edge`.
fn near_edge_end(store: &TopologyStore, edge: &EdgeData, point: &Point3, tol: f64) -> Result<bool> {
    for v in [edge.start, edge.end] {
        let vertex = store.vertex(v)?;
        if (vertex.point - point).norm() <= vertex.tolerance + tol {
            return Ok(true);
        }
    }
    Ok(false)
}

fn vertex_vertex(
    store: &TopologyStore,
    ctx: &IntersectionContext,
    a: usize,
    b: usize,
    _glue: Glue,
) -> Result<Vec<Contact>> {
    let pa = store.vertex(ctx.vertex_id(a)?)?.point;
    let pb = store.vertex(ctx.vertex_id(b)?)?.point;
    if (pa - pb).norm() > pair_tolerance(ctx, a, b) {
        return Ok(Vec::new());
    }
    Ok(vec![Contact::Point {
        point: Point3::from((pa.coords + pb.coords) * 0.5),
        param_a: 0.0,
        param_b: 0.0,
    }])
}

/// A vertex touching the interior of an edge. Contacts near the edge ends
/// belong to the vertex-vertex phase.
fn vertex_edge(
    store: &TopologyStore,
    ctx: &IntersectionContext,
    a: usize,
    b: usize,
    _glue: Glue,
) -> Result<Vec<Contact>> {
    let v = ctx.vertex_id(a)?;
    let edge = store.edge(ctx.edge_id(b)?)?;
    if edge.start == v || edge.end == v {
        return Ok(Vec::new());
    }
    let point = store.vertex(v)?.point;
    let tol = pair_tolerance(ctx, a, b);
    let t = project_in_range(&edge.curve, &point, edge.t_start, edge.t_end)?;
    if (edge.curve.evaluate(t)? - point).norm() > tol {
        return Ok(Vec::new());
    }
    if near_edge_end(store, edge, &point, tol)? {
        return Ok(Vec::new());
    }
    Ok(vec![Contact::Point {
        point,
        param_a: 0.0,
        param_b: t,
    }])
}

/// Crossings strictly inside both edges, and collinear overlaps.
fn edge_edge(
    store: &TopologyStore,
    ctx: &IntersectionContext,
    a: usize,
    b: usize,
    glue: Glue,
) -> Result<Vec<Contact>> {
    let ea = store.edge(ctx.edge_id(a)?)?;
    let eb = store.edge(ctx.edge_id(b)?)?;
    let tol = pair_tolerance(ctx, a, b);
    let mut contacts = Vec::new();
    for hit in intersect_curves(&ea.curve, ea.range(), &eb.curve, eb.range(), tol)? {
        match hit {
            CurveCurveHit::Point { point, t1, t2 } => {
                if glue == Glue::Full
                    || near_edge_end(store, ea, &point, tol)?
                    || near_edge_end(store, eb, &point, tol)?
                {
                    continue;
                }
                contacts.push(Contact::Point {
                    point,
                    param_a: t1,
                    param_b: t2,
                });
            }
            CurveCurveHit::Overlap { t1, t2 } => contacts.push(Contact::Range {
                range_a: t1,
                range_b: t2,
            }),
        }
    }
    Ok(contacts)
}

/// A vertex lying on the interior of a face.
fn vertex_face(
    store: &TopologyStore,
    ctx: &IntersectionContext,
    a: usize,
    b: usize,
    _glue: Glue,
) -> Result<Vec<Contact>> {
    let point = store.vertex(ctx.vertex_id(a)?)?.point;
    let face_id = ctx.face_id(b)?;
    let face = store.face(face_id)?;
    let tol = pair_tolerance(ctx, a, b);
    if face.surface.signed_distance(&point).abs() > tol {
        return Ok(Vec::new());
    }
    let (u, v) = face.surface.project(&point)?;
    let loops = face_uv_loops(store, face_id)?;
    let tol_uv = tol / face.surface.metric_scale();
    if locate_uv(&face.surface, &loops, Point2::new(u, v), tol_uv) != PolygonLocation::Inside {
        return Ok(Vec::new());
    }
    Ok(vec![Contact::Point {
        point,
        param_a: 0.0,
        param_b: 0.0,
    }])
}

/// Edge crossings of a face interior, and stretches of the edge lying on
/// the face surface.
fn edge_face(
    store: &TopologyStore,
    ctx: &IntersectionContext,
    a: usize,
    b: usize,
    glue: Glue,
) -> Result<Vec<Contact>> {
    let edge = store.edge(ctx.edge_id(a)?)?;
    let face_id = ctx.face_id(b)?;
    let face = store.face(face_id)?;
    let tol = pair_tolerance(ctx, a, b);
    let hits = intersect_curve_surface(&edge.curve, edge.range(), &face.surface, tol)?;
    if hits.is_empty() {
        return Ok(Vec::new());
    }
    let loops = face_uv_loops(store, face_id)?;
    let tol_uv = tol / face.surface.metric_scale();
    let mut contacts = Vec::new();
    for hit in hits {
        match hit {
            CurveSurfaceHit::Point { point, t, uv } => {
                if !glue.computes_crossings() || near_edge_end(store, edge, &point, tol)? {
                    continue;
                }
                let uv = Point2::new(uv.0, uv.1);
                if locate_uv(&face.surface, &loops, uv, tol_uv) == PolygonLocation::Inside {
                    contacts.push(Contact::Point {
                        point,
                        param_a: t,
                        param_b: 0.0,
                    });
                }
            }
            CurveSurfaceHit::Overlap { t } => contacts.push(Contact::Range {
                range_a: t,
                range_b: (0.0, 0.0),
            }),
        }
    }
    Ok(contacts)
}

fn face_face(
    store: &TopologyStore,
    ctx: &IntersectionContext,
    a: usize,
    b: usize,
    glue: Glue,
) -> Result<Vec<Contact>> {
    let fa = store.face(ctx.face_id(a)?)?;
    let fb = store.face(ctx.face_id(b)?)?;
    let tol = pair_tolerance(ctx, a, b);
    let contact = match intersect_surfaces(&fa.surface, &fb.surface, tol)? {
        SurfaceIntersection::Empty => None,
        SurfaceIntersection::Coincident => Some(Contact::Coincident),
        SurfaceIntersection::Tangent(point) => Some(Contact::Tangent { point }),
        SurfaceIntersection::Curve(curve) => {
            glue.computes_crossings().then(|| Contact::Curves(vec![curve]))
        }
    };
    Ok(contact.into_iter().collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::operations::boolean::context::{Operand, OperandGroup};
    use crate::operations::creation::{MakeBox, MakeEdge, MakeSphere};
    use crate::topology::Shape;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn context(store: &TopologyStore, a: Shape, b: Shape) -> IntersectionContext {
        IntersectionContext::new(
            store,
            vec![
                Operand {
                    shape: a.id,
                    group: OperandGroup::Object,
                },
                Operand {
                    shape: b.id,
                    group: OperandGroup::Tool,
                },
            ],
            0.0,
        )
        .unwrap()
    }

    fn run(store: &TopologyStore, ctx: &mut IntersectionContext, kind: InterferenceKind) -> usize {
        let mut report = Report::default();
        detect_phase(store, ctx, kind, &BooleanOptions::default(), &mut report).unwrap()
    }

    #[test]
    fn crossing_edges_meet_once() {
        let mut store = TopologyStore::new();
        let a = MakeEdge::new(p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0))
            .execute(&mut store)
            .unwrap();
        let b = MakeEdge::new(p(1.0, -1.0, 0.0), p(1.0, 1.0, 0.0))
            .execute(&mut store)
            .unwrap();
        let mut ctx = context(&store, a.into(), b.into());
        assert_eq!(run(&store, &mut ctx, InterferenceKind::EdgeEdge), 1);
        let Contact::Point { point, .. } = ctx.interferences()[0].contact else {
            panic!("expected a point contact");
        };
        assert!((point - p(1.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn edges_touching_at_an_end_are_left_to_the_vertex_phases() {
        let mut store = TopologyStore::new();
        let a = MakeEdge::new(p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0))
            .execute(&mut store)
            .unwrap();
        let b = MakeEdge::new(p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0))
            .execute(&mut store)
            .unwrap();
        let mut ctx = context(&store, a.into(), b.into());
        assert_eq!(run(&store, &mut ctx, InterferenceKind::EdgeEdge), 0);
        assert_eq!(run(&store, &mut ctx, InterferenceKind::VertexEdge), 1);
    }

    #[test]
    fn coplanar_box_faces_are_coincident() {
        let mut store = TopologyStore::new();
        let a = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let b = MakeBox::new(p(1.0, 0.0, 0.0), p(2.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let mut ctx = context(&store, a.into(), b.into());
        assert_eq!(run(&store, &mut ctx, InterferenceKind::VertexVertex), 4);
        run(&store, &mut ctx, InterferenceKind::FaceFace);
        let coincident = ctx
            .interferences()
            .iter()
            .filter(|i| matches!(i.contact, Contact::Coincident))
            .count();
        // The shared face plus the four side planes touching along an edge.
        assert_eq!(coincident, 5);
    }

    #[test]
    fn sphere_seam_pierces_the_other_sphere() {
        let mut store = TopologyStore::new();
        let a = MakeSphere::new(p(0.0, 0.0, 0.0), 1.0)
            .execute(&mut store)
            .unwrap();
        let b = MakeSphere::new(p(1.5, 0.0, 0.0), 1.0)
            .execute(&mut store)
            .unwrap();
        let mut ctx = context(&store, a.into(), b.into());
        assert_eq!(run(&store, &mut ctx, InterferenceKind::EdgeFace), 2);
        assert_eq!(run(&store, &mut ctx, InterferenceKind::FaceFace), 1);
    }

    #[test]
    fn full_glue_skips_face_phases() {
        assert!(!phase_enabled(InterferenceKind::FaceFace, Glue::Full));
        assert!(!phase_enabled(InterferenceKind::EdgeFace, Glue::Full));
        assert!(phase_enabled(InterferenceKind::EdgeFace, Glue::Shift));
        assert!(phase_enabled(InterferenceKind::EdgeEdge, Glue::Full));
    }

    #[test]
    fn cancelled_phase_fails() {
        let mut store = TopologyStore::new();
        let a = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let b = MakeBox::new(p(0.5, 0.5, 0.5), p(2.0, 2.0, 2.0))
            .execute(&mut store)
            .unwrap();
        let mut ctx = context(&store, a.into(), b.into());
        let options = BooleanOptions::default();
        options.progress.cancel();
        let mut report = Report::default();
        let result = detect_phase(&store, &mut ctx, InterferenceKind::FaceFace, &options, &mut report);
        assert!(matches!(
            result,
            Err(crate::error::GeoboolError::Boolean(
                crate::error::BooleanError::Cancelled
            ))
        ));
    }
}
