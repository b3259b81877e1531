use std::f64::consts::TAU;

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::error::{OperationError, Result};
use crate::geometry::curve::Curve;
use crate::geometry::surface::Surface;
use crate::math::polygon_2d::{locate_in_loops, loop_contains, signed_area, PolygonLocation};
use crate::math::{Point2, Vector2, TOLERANCE};
use crate::operations::query::{face_uv_loops, oriented_edge_pcurve, project_pcurve};
use crate::topology::{
    EdgeCurve, EdgeData, EdgeId, FaceData, FaceId, FaceSurface, OrientedEdge, Pcurve,
    TopologyStore, VertexId, WireData,
};

use super::context::IntersectionContext;
use super::options::BooleanOptions;
use super::pave::PaveBlock;
use super::report::{Report, Warning};

/// Smallest distance in parameter space at which two loop nodes differ.
const BASE_UV_TOLERANCE: f64 = 1e-6;

/// Attempts with a widened node tolerance before falling back.
const MAX_SPLIT_RETRIES: i32 = 3;

/// Growth of the node tolerance between attempts.
const RETRY_TOLERANCE_FACTOR: f64 = 10.0;

/// Loops with less area than this in parameter space are discarded.
const MIN_LOOP_AREA: f64 = 1e-14;

/// The faces an operand face was rebuilt into.
#[derive(Debug, Clone)]
pub struct FaceSplit {
    /// The operand face.
    pub face: FaceId,
    /// Orientation of the operand face in its shell.
    pub forward: bool,
    /// Faces replacing it; the face itself when nothing touched it.
    pub pieces: Vec<FaceId>,
}

/// One side of an edge as seen from the face being split.
#[derive(Debug, Clone)]
struct HalfEdge {
    edge: EdgeId,
    forward: bool,
    pcurve: Pcurve,
    points: Vec<Point2>,
    start: VertexId,
    end: VertexId,
    internal: bool,
}

impl HalfEdge {
    fn new(edge: EdgeId, data: &EdgeData, forward: bool, pcurve: Pcurve, internal: bool) -> Self {
        let points = pcurve.points(forward);
        let (start, end) = if forward {
            (data.start, data.end)
        } else {
            (data.end, data.start)
        };
        Self {
            edge,
            forward,
            pcurve,
            points,
            start,
            end,
            internal,
        }
    }

    fn first_direction(&self) -> Vector2 {
        direction(self.points.iter())
    }

    fn last_direction(&self) -> Vector2 {
        -direction(self.points.iter().rev())
    }
}

/// Direction of the first non-degenerate segment of a point run.
fn direction<'a>(mut points: impl Iterator<Item = &'a Point2>) -> Vector2 {
    let Some(first) = points.next() else {
        return Vector2::zeros();
    };
    for p in points {
        let d = p - first;
        if d.norm() > 1e-12 {
            return d;
        }
    }
    Vector2::zeros()
}

/// A face of the split: an outer loop and its holes, as half-edge indices.
#[derive(Debug, Clone)]
struct Region {
    outer: Vec<usize>,
    holes: Vec<Vec<usize>>,
}

#[derive(Debug)]
enum FacePlan {
    Unchanged,
    Rebuilt {
        half_edges: Vec<HalfEdge>,
        regions: Vec<Region>,
    },
    Kept,
}

/// Rebuilds every operand face from its split edges and the section and
/// in-face edges lying on it.
///
/// Faces are planned independently, in parallel when allowed, then written
/// to the store in face order. A face whose loops cannot be traced is
/// retried with a wider node tolerance, then rebuilt from its boundary
/// only, and finally kept as it was; each fallback is reported.
///
/// # Errors
///
/// Returns an error on cancellation or if the store is inconsistent.
#[instrument(skip_all)]
pub fn split_faces(
    store: &mut TopologyStore,
    ctx: &IntersectionContext,
    options: &BooleanOptions,
    report: &mut Report,
) -> Result<Vec<FaceSplit>> {
    let faces = ctx.faces();
    let plans: Vec<(FacePlan, Option<String>)> = {
        let shared: &TopologyStore = store;
        let plan = |&face: &FaceId| -> Result<(FacePlan, Option<String>)> {
            options.progress.check()?;
            plan_face(shared, ctx, face)
        };
        if options.run_parallel {
            faces.par_iter().map(plan).collect::<Result<_>>()?
        } else {
            faces.iter().map(plan).collect::<Result<_>>()?
        }
    };

    let mut splits = Vec::with_capacity(faces.len());
    for (face, (plan, problem)) in faces.into_iter().zip(plans) {
        if let Some(reason) = problem {
            report.push(Warning::FaceNotSplit { face, reason });
        }
        let forward = ctx
            .index_of(face.into())
            .is_none_or(|i| ctx.shape(i).face_forward);
        let pieces = match plan {
            FacePlan::Unchanged | FacePlan::Kept => vec![face],
            FacePlan::Rebuilt {
                half_edges,
                regions,
            } => build_pieces(store, face, &half_edges, &regions)?,
        };
        splits.push(FaceSplit {
            face,
            forward,
            pieces,
        });
    }
    debug!(
        faces = splits.len(),
        pieces = splits.iter().map(|s| s.pieces.len()).sum::<usize>(),
        "faces split"
    );
    Ok(splits)
}

fn build_pieces(
    store: &mut TopologyStore,
    face: FaceId,
    half_edges: &[HalfEdge],
    regions: &[Region],
) -> Result<Vec<FaceId>> {
    let original = store.face(face)?.clone();
    let wire_of = |ring: &[usize]| WireData {
        edges: ring
            .iter()
            .map(|&h| {
                let he = &half_edges[h];
                OrientedEdge::with_pcurve(he.edge, he.forward, he.pcurve.clone())
            })
            .collect(),
        is_closed: true,
    };
    let mut pieces = Vec::with_capacity(regions.len());
    for region in regions {
        let outer = store.add_wire(wire_of(&region.outer));
        let inner = region
            .holes
            .iter()
            .map(|hole| store.add_wire(wire_of(hole)))
            .collect();
        let mut data = FaceData::new(original.surface.clone(), outer, inner, original.same_sense);
        data.tolerance = original.tolerance;
        pieces.push(store.add_face(data));
    }
    Ok(pieces)
}

fn plan_face(
    store: &TopologyStore,
    ctx: &IntersectionContext,
    face: FaceId,
) -> Result<(FacePlan, Option<String>)> {
    let data = store.face(face)?;
    let surface = &data.surface;
    let (boundary, changed) = boundary_half_edges(store, ctx, face)?;
    let internal_blocks = internal_blocks(ctx, face, &boundary);
    if !changed && internal_blocks.is_empty() {
        return Ok((FacePlan::Unchanged, None));
    }

    let mut reason = String::new();
    match internal_half_edges(store, ctx, face, surface, &internal_blocks) {
        Ok(internal) => {
            let mut all = boundary.clone();
            all.extend(internal);
            for attempt in 0..=MAX_SPLIT_RETRIES {
                let factor = RETRY_TOLERANCE_FACTOR.powi(attempt);
                match trace_regions(store, surface, &all, factor, ctx.fuzzy()) {
                    Ok(regions) => {
                        return Ok((
                            FacePlan::Rebuilt {
                                half_edges: all,
                                regions,
                            },
                            None,
                        ))
                    }
                    Err(err) => reason = err.to_string(),
                }
            }
        }
        Err(err) => reason = err.to_string(),
    }

    if changed {
        let factor = RETRY_TOLERANCE_FACTOR.powi(MAX_SPLIT_RETRIES);
        if let Ok(regions) = trace_regions(store, surface, &boundary, factor, ctx.fuzzy()) {
            return Ok((
                FacePlan::Rebuilt {
                    half_edges: boundary,
                    regions,
                },
                Some(format!("rebuilt from its boundary only: {reason}")),
            ));
        }
    }
    Ok((FacePlan::Kept, Some(reason)))
}

/// Blocks on the face interior whose edges are not already on its boundary.
fn internal_blocks(ctx: &IntersectionContext, face: FaceId, boundary: &[HalfEdge]) -> Vec<usize> {
    let mut found: Vec<usize> = Vec::new();
    let mut seen: Vec<EdgeId> = boundary.iter().map(|h| h.edge).collect();
    for source in [&ctx.in_face_blocks, &ctx.section_blocks] {
        for &b in source.get(&face).into_iter().flatten() {
            let Some(edge) = ctx.block(b).split_edge else {
                continue;
            };
            if !seen.contains(&edge) {
                seen.push(edge);
                found.push(b);
            }
        }
    }
    found
}

/// Walks the face wires and replaces each edge use with its split pieces in
/// traversal order.
fn boundary_half_edges(
    store: &TopologyStore,
    ctx: &IntersectionContext,
    face: FaceId,
) -> Result<(Vec<HalfEdge>, bool)> {
    let data = store.face(face)?;
    let surface = &data.surface;
    let mut half_edges = Vec::new();
    let mut changed = false;
    for wire in data.wires() {
        for oe in &store.wire(wire)?.edges {
            let edge = store.edge(oe.edge)?;
            let pcurve = oriented_edge_pcurve(store, surface, oe)?;
            let mut blocks: Vec<&PaveBlock> = ctx.blocks_of(oe.edge).iter().map(|&b| ctx.block(b)).collect();
            if blocks.is_empty() {
                half_edges.push(HalfEdge::new(oe.edge, edge, oe.forward, pcurve, false));
                continue;
            }
            if !oe.forward {
                blocks.reverse();
            }
            for block in blocks {
                let split = block.split_edge.unwrap_or(oe.edge);
                let split_data = store.edge(split)?;
                let forward = oe.forward == block.same_sense;
                let pc = if split == oe.edge {
                    pcurve.clone()
                } else {
                    changed = true;
                    block_pcurve(surface, edge, &pcurve, block, split_data)?
                };
                half_edges.push(HalfEdge::new(split, split_data, forward, pc, false));
            }
        }
    }
    Ok((half_edges, changed))
}

/// Pcurve of the split edge carrying `block`, in that edge's parameters.
///
/// Straight pieces cut from the same curve reuse the original pcurve;
/// anything else is projected and shifted by whole periods onto the
/// original.
fn block_pcurve(
    surface: &FaceSurface,
    edge: &EdgeData,
    pcurve: &Pcurve,
    block: &PaveBlock,
    split: &EdgeData,
) -> Result<Pcurve> {
    let (t1, t2) = block.range();
    let restricted = pcurve
        .restricted(t1, t2)
        .ok_or_else(|| OperationError::Failed("edge has an empty pcurve".into()))?;
    let mid = block.mid_param();
    let same_param = block.same_sense
        && (split.t_start - t1).abs() <= TOLERANCE
        && (split.t_end - t2).abs() <= TOLERANCE
        && (split.curve.evaluate(mid)? - edge.curve.evaluate(mid)?).norm() <= TOLERANCE;
    if same_param && !matches!(split.curve, EdgeCurve::Circle(_)) {
        return Ok(restricted);
    }
    let projected = project_pcurve(surface, &split.curve, split.t_start, split.t_end)?;
    let Some(period) = surface.u_period() else {
        return Ok(projected);
    };
    let target = restricted.evaluate(mid).unwrap_or_else(Point2::origin);
    let split_mid = 0.5 * (split.t_start + split.t_end);
    let here = projected.evaluate(split_mid).unwrap_or_else(Point2::origin);
    Ok(shift_u(&projected, ((target.x - here.x) / period).round() * period))
}

fn shift_u(pcurve: &Pcurve, shift: f64) -> Pcurve {
    if shift == 0.0 {
        return pcurve.clone();
    }
    Pcurve::new(
        pcurve
            .samples()
            .iter()
            .map(|(t, uv)| (*t, Point2::new(uv.x + shift, uv.y)))
            .collect(),
    )
}

/// Both sides of every internal edge, projected onto the face.
fn internal_half_edges(
    store: &TopologyStore,
    ctx: &IntersectionContext,
    face: FaceId,
    surface: &FaceSurface,
    blocks: &[usize],
) -> Result<Vec<HalfEdge>> {
    if blocks.is_empty() {
        return Ok(Vec::new());
    }
    let loops = face_uv_loops(store, face)?;
    let mut half_edges = Vec::with_capacity(2 * blocks.len());
    for &b in blocks {
        let Some(edge_id) = ctx.block(b).split_edge else {
            continue;
        };
        let edge = store.edge(edge_id)?;
        let mut pcurve = project_pcurve(surface, &edge.curve, edge.t_start, edge.t_end)?;
        if let Some(period) = surface.u_period() {
            let mid = pcurve
                .evaluate(0.5 * (edge.t_start + edge.t_end))
                .unwrap_or_else(Point2::origin);
            let shift = [0.0, period, -period].into_iter().find(|s| {
                locate_in_loops(&Point2::new(mid.x + s, mid.y), &loops, BASE_UV_TOLERANCE)
                    != PolygonLocation::Outside
            });
            pcurve = shift_u(&pcurve, shift.unwrap_or(0.0));
        }
        half_edges.push(HalfEdge::new(edge_id, edge, true, pcurve.clone(), true));
        half_edges.push(HalfEdge::new(edge_id, edge, false, pcurve, true));
    }
    Ok(half_edges)
}

/// A loop graph node: one vertex at one place in parameter space.
struct Node {
    vertex: VertexId,
    uv: Point2,
}

fn node_index(nodes: &mut Vec<Node>, vertex: VertexId, uv: Point2, tol: f64) -> usize {
    if let Some(i) = nodes
        .iter()
        .position(|n| n.vertex == vertex && (n.uv - uv).norm() <= tol)
    {
        return i;
    }
    nodes.push(Node { vertex, uv });
    nodes.len() - 1
}

/// Clockwise turn from the reversed incoming direction to `out`, in
/// `[0, 2pi)`.
fn clockwise_turn(back: &Vector2, out: &Vector2) -> f64 {
    let ccw = (back.x * out.y - back.y * out.x).atan2(back.dot(out));
    (-ccw).rem_euclid(TAU)
}

fn failed(reason: &str) -> crate::error::GeoboolError {
    OperationError::Failed(reason.into()).into()
}

/// Traces closed loops through the half-edges and groups them into regions.
fn trace_regions(
    store: &TopologyStore,
    surface: &FaceSurface,
    half_edges: &[HalfEdge],
    factor: f64,
    fuzzy: f64,
) -> Result<Vec<Region>> {
    let scale = surface.metric_scale();
    let mut nodes: Vec<Node> = Vec::new();
    let mut from = Vec::with_capacity(half_edges.len());
    let mut to = Vec::with_capacity(half_edges.len());
    for he in half_edges {
        let (Some(first), Some(last)) = (he.points.first(), he.points.last()) else {
            return Err(failed("half-edge without pcurve points"));
        };
        let tol_start = uv_tolerance(store, he.start, scale, fuzzy)? * factor;
        let tol_end = uv_tolerance(store, he.end, scale, fuzzy)? * factor;
        from.push(node_index(&mut nodes, he.start, *first, tol_start));
        to.push(node_index(&mut nodes, he.end, *last, tol_end));
    }

    let active = prune_dangling(half_edges, &from, &to, nodes.len());
    for (h, he) in half_edges.iter().enumerate() {
        if he.internal && !active[h] {
            let node = &nodes[from[h]];
            let other = &nodes[to[h]];
            let unmatched = nodes.iter().enumerate().any(|(i, n)| {
                (n.vertex == node.vertex && i != from[h]) || (n.vertex == other.vertex && i != to[h])
            });
            if unmatched {
                return Err(failed("section edge end does not meet its vertex"));
            }
        }
    }

    let rings = trace_rings(half_edges, &from, &to, &active)?;
    let mut outers: Vec<(Vec<usize>, Vec<Point2>, f64)> = Vec::new();
    let mut holes: Vec<(Vec<usize>, Vec<Point2>)> = Vec::new();
    for ring in rings {
        let points = ring_points(half_edges, &ring);
        let area = signed_area(&points);
        if area > MIN_LOOP_AREA {
            outers.push((ring, points, area));
        } else if area < -MIN_LOOP_AREA {
            holes.push((ring, points));
        }
    }
    if outers.is_empty() {
        return Err(failed("no counter-clockwise loop"));
    }

    let mut regions: Vec<Region> = outers
        .iter()
        .map(|(ring, _, _)| Region {
            outer: ring.clone(),
            holes: Vec::new(),
        })
        .collect();
    for (ring, points) in holes {
        let sample = left_sample(&points).ok_or_else(|| failed("degenerate hole"))?;
        let owner = outers
            .iter()
            .enumerate()
            .filter(|(_, (_, outer, _))| loop_contains(&sample, outer))
            .min_by(|a, b| a.1 .2.total_cmp(&b.1 .2))
            .map(|(i, _)| i)
            .ok_or_else(|| failed("hole lies outside every loop"))?;
        regions[owner].holes.push(ring);
    }
    Ok(regions)
}

fn uv_tolerance(store: &TopologyStore, vertex: VertexId, scale: f64, fuzzy: f64) -> Result<f64> {
    let tol = store.vertex(vertex)?.tolerance + fuzzy;
    Ok(BASE_UV_TOLERANCE.max(tol / scale))
}

/// Removes internal edges with a free end until none is left.
fn prune_dangling(half_edges: &[HalfEdge], from: &[usize], to: &[usize], nodes: usize) -> Vec<bool> {
    let mut active = vec![true; half_edges.len()];
    loop {
        let mut degree = vec![0usize; nodes];
        for (h, he) in half_edges.iter().enumerate() {
            // Internal edges come in pairs; count the forward side only.
            if active[h] && (!he.internal || he.forward) {
                degree[from[h]] += 1;
                degree[to[h]] += 1;
            }
        }
        let mut removed = false;
        for (h, he) in half_edges.iter().enumerate() {
            if active[h] && he.internal && (degree[from[h]] <= 1 || degree[to[h]] <= 1) {
                active[h] = false;
                removed = true;
            }
        }
        if !removed {
            return active;
        }
    }
}

/// Follows half-edges, always taking the sharpest left turn, until every
/// active half-edge belongs to a closed ring.
fn trace_rings(
    half_edges: &[HalfEdge],
    from: &[usize],
    to: &[usize],
    active: &[bool],
) -> Result<Vec<Vec<usize>>> {
    let count = active.iter().filter(|a| **a).count();
    let mut used = vec![false; half_edges.len()];
    let mut rings = Vec::new();
    for start in 0..half_edges.len() {
        if !active[start] || used[start] {
            continue;
        }
        let mut ring = vec![start];
        used[start] = true;
        let mut current = start;
        loop {
            let back = -half_edges[current].last_direction();
            let node = to[current];
            let next = (0..half_edges.len())
                .filter(|&h| active[h] && from[h] == node)
                .map(|h| {
                    let twin = half_edges[h].edge == half_edges[current].edge
                        && half_edges[h].forward != half_edges[current].forward;
                    let turn = if twin {
                        TAU
                    } else {
                        clockwise_turn(&back, &half_edges[h].first_direction())
                    };
                    (h, turn)
                })
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(h, _)| h)
                .ok_or_else(|| failed("loop ends at a free vertex"))?;
            if next == start {
                break;
            }
            if used[next] || ring.len() > count {
                return Err(failed("loop tracing revisited an edge"));
            }
            used[next] = true;
            ring.push(next);
            current = next;
        }
        rings.push(ring);
    }
    Ok(rings)
}

fn ring_points(half_edges: &[HalfEdge], ring: &[usize]) -> Vec<Point2> {
    let mut points: Vec<Point2> = Vec::new();
    for &h in ring {
        for p in &half_edges[h].points {
            if points.last().is_none_or(|q| (q - p).norm() > 1e-12) {
                points.push(*p);
            }
        }
    }
    if points.len() > 1 && (points[0] - points[points.len() - 1]).norm() <= 1e-12 {
        points.pop();
    }
    points
}

/// A point just left of the longest segment of a ring.
fn left_sample(points: &[Point2]) -> Option<Point2> {
    let n = points.len();
    let (a, b) = (0..n)
        .map(|i| (points[i], points[(i + 1) % n]))
        .max_by(|x, y| (x.1 - x.0).norm().total_cmp(&(y.1 - y.0).norm()))?;
    let d = b - a;
    let len = d.norm();
    if len <= 1e-12 {
        return None;
    }
    let left = Vector2::new(-d.y, d.x) / len;
    Some(Point2::from((a.coords + b.coords) * 0.5) + left * (1e-4 * len).max(1e-9))
}
