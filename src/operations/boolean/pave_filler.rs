use std::collections::HashMap;

use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::geometry::curve::{project_in_range, Curve};
use crate::geometry::surface::Surface;
use crate::math::polygon_2d::PolygonLocation;
use crate::math::{Point2, Point3, TOLERANCE};
use crate::operations::query::{face_uv_loops, locate_uv};
use crate::topology::{EdgeData, EdgeId, TopologyStore, VertexData, VertexId};

use super::context::IntersectionContext;
use super::detector::detect_phase;
use super::interference::{Contact, InterferenceKind};
use super::options::BooleanOptions;
use super::pave::{curve_length, CommonBlock, Pave, PaveBlock};
use super::report::{Report, Warning};
use super::section::build_section_edges;

/// Runs the intersection phases and turns their results into pave blocks.
///
/// After `perform`, every operand edge is covered by pave blocks between
/// resolved vertices, overlapping blocks are grouped into common blocks,
/// and face-face section curves exist as new edges.
pub struct PaveFiller<'a> {
    options: &'a BooleanOptions,
}

impl<'a> PaveFiller<'a> {
    /// Creates a filler driven by `options`.
    #[must_use]
    pub fn new(options: &'a BooleanOptions) -> Self {
        Self { options }
    }

    /// Runs every phase in dimension order.
    ///
    /// # Errors
    ///
    /// Returns an error on cancellation or if the store is inconsistent.
    #[instrument(skip_all, fields(shapes = ctx.len()))]
    pub fn perform(
        &self,
        store: &mut TopologyStore,
        ctx: &mut IntersectionContext,
        report: &mut Report,
    ) -> Result<()> {
        for kind in InterferenceKind::PHASES {
            detect_phase(store, ctx, kind, self.options, report)?;
            match kind {
                InterferenceKind::VertexVertex => process_vertex_vertex(ctx)?,
                InterferenceKind::VertexEdge => process_vertex_edge(ctx)?,
                InterferenceKind::EdgeEdge => process_edge_edge(store, ctx)?,
                InterferenceKind::VertexFace => process_vertex_face(ctx)?,
                InterferenceKind::EdgeFace => process_edge_face(store, ctx)?,
                InterferenceKind::FaceFace => process_face_face(ctx)?,
            }
        }
        self.options.progress.check()?;

        cluster_paves(store, ctx)?;
        resolve_vertex_images(store, ctx)?;
        build_pave_blocks(store, ctx, report)?;
        find_common_blocks(store, ctx)?;
        find_in_face_blocks(store, ctx)?;
        self.options.progress.check()?;

        let sections = build_section_edges(store, ctx, self.options)?;
        info!(
            interferences = ctx.interferences().len(),
            blocks = ctx.blocks.len(),
            common_blocks = ctx.common_blocks.len(),
            sections,
            "pave filler done"
        );
        Ok(())
    }
}

fn process_vertex_vertex(ctx: &mut IntersectionContext) -> Result<()> {
    for pos in ctx.interferences_of_kind(InterferenceKind::VertexVertex) {
        let (a, b) = {
            let i = &ctx.interferences()[pos];
            (ctx.vertex_id(i.index_a)?, ctx.vertex_id(i.index_b)?)
        };
        ctx.union_vertices(a, b);
        ctx.consume_interference(pos, None);
    }
    Ok(())
}

fn process_vertex_edge(ctx: &mut IntersectionContext) -> Result<()> {
    for pos in ctx.interferences_of_kind(InterferenceKind::VertexEdge) {
        let interference = ctx.interferences()[pos].clone();
        let Contact::Point { param_b, .. } = interference.contact else {
            continue;
        };
        let v = ctx.vertex_id(interference.index_a)?;
        let e = ctx.edge_id(interference.index_b)?;
        ctx.extra_paves.entry(e).or_default().push(Pave::new(v, param_b));
        ctx.consume_interference(pos, Some(v));
    }
    Ok(())
}

/// Picks the end vertex of `edges` closest to `point` within reach, if any.
fn nearest_end_vertex(
    store: &TopologyStore,
    edges: [&EdgeData; 2],
    point: &Point3,
    tol: f64,
) -> Result<Option<VertexId>> {
    let mut best: Option<(f64, VertexId)> = None;
    for v in edges.iter().flat_map(|e| [e.start, e.end]) {
        let vertex = store.vertex(v)?;
        let d = (vertex.point - point).norm();
        if d <= vertex.tolerance + tol && best.is_none_or(|(bd, _)| d < bd) {
            best = Some((d, v));
        }
    }
    Ok(best.map(|(_, v)| v))
}

fn process_edge_edge(store: &mut TopologyStore, ctx: &mut IntersectionContext) -> Result<()> {
    for pos in ctx.interferences_of_kind(InterferenceKind::EdgeEdge) {
        let interference = ctx.interferences()[pos].clone();
        let ea = ctx.edge_id(interference.index_a)?;
        let eb = ctx.edge_id(interference.index_b)?;
        let edge_a = store.edge(ea)?.clone();
        let edge_b = store.edge(eb)?.clone();
        match interference.contact {
            Contact::Point {
                point,
                param_a,
                param_b,
            } => {
                let gap = (edge_a.curve.evaluate(param_a)? - point)
                    .norm()
                    .max((edge_b.curve.evaluate(param_b)? - point).norm());
                let tolerance = edge_a.tolerance.max(edge_b.tolerance).max(gap);
                let v = store.add_vertex(VertexData::with_tolerance(point, tolerance));
                ctx.extra_paves.entry(ea).or_default().push(Pave::new(v, param_a));
                ctx.extra_paves.entry(eb).or_default().push(Pave::new(v, param_b));
                ctx.consume_interference(pos, Some(v));
            }
            Contact::Range { range_a, range_b } => {
                for ta in [range_a.0, range_a.1] {
                    let point = edge_a.curve.evaluate(ta)?;
                    let tb = project_in_range(&edge_b.curve, &point, range_b.0, range_b.1)?;
                    let v = match nearest_end_vertex(
                        store,
                        [&edge_a, &edge_b],
                        &point,
                        interference.tolerance,
                    )? {
                        Some(v) => v,
                        None => store.add_vertex(VertexData::with_tolerance(
                            point,
                            edge_a.tolerance.max(edge_b.tolerance),
                        )),
                    };
                    ctx.extra_paves.entry(ea).or_default().push(Pave::new(v, ta));
                    ctx.extra_paves.entry(eb).or_default().push(Pave::new(v, tb));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn process_vertex_face(ctx: &mut IntersectionContext) -> Result<()> {
    for pos in ctx.interferences_of_kind(InterferenceKind::VertexFace) {
        let (v, f) = {
            let i = &ctx.interferences()[pos];
            (ctx.vertex_id(i.index_a)?, ctx.face_id(i.index_b)?)
        };
        ctx.face_vertices.entry(f).or_default().push(v);
        ctx.consume_interference(pos, Some(v));
    }
    Ok(())
}

fn process_edge_face(store: &mut TopologyStore, ctx: &mut IntersectionContext) -> Result<()> {
    for pos in ctx.interferences_of_kind(InterferenceKind::EdgeFace) {
        let interference = ctx.interferences()[pos].clone();
        let Contact::Point { point, param_a, .. } = interference.contact else {
            continue;
        };
        let e = ctx.edge_id(interference.index_a)?;
        let f = ctx.face_id(interference.index_b)?;
        let edge = store.edge(e)?;
        let gap = (edge.curve.evaluate(param_a)? - point).norm();
        let tolerance = edge.tolerance.max(store.face(f)?.tolerance).max(gap);
        let v = store.add_vertex(VertexData::with_tolerance(point, tolerance));
        ctx.extra_paves.entry(e).or_default().push(Pave::new(v, param_a));
        ctx.face_vertices.entry(f).or_default().push(v);
        ctx.consume_interference(pos, Some(v));
    }
    Ok(())
}

fn process_face_face(ctx: &mut IntersectionContext) -> Result<()> {
    for pos in ctx.interferences_of_kind(InterferenceKind::FaceFace) {
        let interference = ctx.interferences()[pos].clone();
        let fa = ctx.face_id(interference.index_a)?;
        let fb = ctx.face_id(interference.index_b)?;
        match interference.contact {
            Contact::Coincident => {
                ctx.coincident_faces.push((fa, fb));
                ctx.consume_interference(pos, None);
            }
            Contact::Tangent { point } => {
                debug!(?fa, ?fb, %point, "faces touch at a single point");
                ctx.consume_interference(pos, None);
            }
            _ => {}
        }
    }
    Ok(())
}

/// Merges vertices that land within reach of each other on the same edge.
///
/// Linkage is transitive: a chain of close paves collapses into one group
/// even when its ends are further apart than any single tolerance.
fn cluster_paves(store: &TopologyStore, ctx: &mut IntersectionContext) -> Result<()> {
    let mut edges: Vec<EdgeId> = ctx.extra_paves.keys().copied().collect();
    edges.sort_unstable();
    for e in edges {
        let edge = store.edge(e)?;
        let mut vertices = vec![edge.start, edge.end];
        vertices.extend(ctx.extra_paves[&e].iter().map(|p| p.vertex));
        vertices.sort_unstable();
        vertices.dedup();
        let data: Vec<(VertexId, Point3, f64)> = vertices
            .iter()
            .map(|&v| store.vertex(v).map(|d| (v, d.point, d.tolerance)))
            .collect::<std::result::Result<_, _>>()?;
        for i in 0..data.len() {
            for j in i + 1..data.len() {
                let (vi, pi, ti) = data[i];
                let (vj, pj, tj) = data[j];
                if (pi - pj).norm() <= ti + tj + ctx.fuzzy() {
                    ctx.union_vertices(vi, vj);
                }
            }
        }
    }
    Ok(())
}

/// Chooses the vertex standing for each merged group.
///
/// The member with the largest tolerance is used when its tolerance sphere
/// covers every other member; otherwise a new vertex at the centroid gets a
/// tolerance large enough to cover them.
fn resolve_vertex_images(store: &mut TopologyStore, ctx: &mut IntersectionContext) -> Result<()> {
    let mut groups: Vec<(VertexId, Vec<VertexId>)> = ctx.vertex_groups().into_iter().collect();
    groups.sort_unstable_by_key(|(root, _)| *root);
    for (root, members) in groups {
        let data: Vec<(VertexId, Point3, f64)> = members
            .iter()
            .map(|&v| store.vertex(v).map(|d| (v, d.point, d.tolerance)))
            .collect::<std::result::Result<_, _>>()?;
        let Some(&(rep, rep_point, rep_tol)) = data
            .iter()
            .reduce(|best, item| if item.2 > best.2 { item } else { best })
        else {
            continue;
        };
        let covered = data
            .iter()
            .all(|(_, p, t)| (p - rep_point).norm() + t <= rep_tol + TOLERANCE);
        let image = if covered {
            rep
        } else {
            #[allow(clippy::cast_precision_loss)]
            let centroid = Point3::from(
                data.iter().fold(nalgebra::Vector3::zeros(), |acc, (_, p, _)| acc + p.coords)
                    / data.len() as f64,
            );
            let tolerance = data
                .iter()
                .map(|(_, p, t)| (p - centroid).norm() + t)
                .fold(0.0, f64::max);
            debug!(members = data.len(), tolerance, "merged vertices need a new image");
            store.add_vertex(VertexData::with_tolerance(centroid, tolerance))
        };
        ctx.set_vertex_image(root, image);
    }
    Ok(())
}

/// Drops paves that repeat the vertex of their predecessor within reach.
///
/// Edge ends keep their own parameter so split edges always finish exactly
/// where the original did.
fn merge_paves(
    store: &TopologyStore,
    edge: &EdgeData,
    paves: Vec<Pave>,
    fuzzy: f64,
) -> Result<Vec<Pave>> {
    let last_index = paves.len().saturating_sub(1);
    let mut merged: Vec<Pave> = Vec::with_capacity(paves.len());
    for (i, pave) in paves.into_iter().enumerate() {
        let Some(last) = merged.last_mut() else {
            merged.push(pave);
            continue;
        };
        let reach = 2.0 * store.vertex(pave.vertex)?.tolerance + fuzzy;
        let repeats = last.vertex == pave.vertex
            && curve_length(&edge.curve, last.param, pave.param) <= reach;
        if !repeats {
            merged.push(pave);
        } else if i == last_index {
            if merged.len() == 1 {
                merged.push(pave);
            } else if let Some(last) = merged.last_mut() {
                last.param = pave.param;
            }
        }
    }
    Ok(merged)
}

fn build_pave_blocks(
    store: &TopologyStore,
    ctx: &mut IntersectionContext,
    report: &mut Report,
) -> Result<()> {
    for e in ctx.edges() {
        let edge = store.edge(e)?;
        let start = Pave::new(ctx.vertex_image(edge.start), edge.t_start);
        let end = Pave::new(ctx.vertex_image(edge.end), edge.t_end);
        if edge.is_degenerate() {
            ctx.add_block(PaveBlock::new(e, start, end));
            continue;
        }
        let mut paves = vec![start];
        if let Some(extra) = ctx.extra_paves.get(&e) {
            paves.extend(extra.iter().map(|p| {
                Pave::new(
                    ctx.vertex_image(p.vertex),
                    p.param.clamp(edge.t_start, edge.t_end),
                )
            }));
        }
        paves.push(end);
        // Stable, so the edge ends stay first and last on equal parameters.
        paves.sort_by(|a, b| a.param.total_cmp(&b.param));

        let merged = merge_paves(store, edge, paves, ctx.fuzzy())?;
        for pair in merged.windows(2) {
            let span = pair[1].param - pair[0].param;
            let reach = 2.0 * store.vertex(pair[0].vertex)?.tolerance + ctx.fuzzy();
            let collapsed = pair[0].vertex == pair[1].vertex
                && curve_length(&edge.curve, pair[0].param, pair[1].param) <= reach;
            if span <= TOLERANCE || collapsed {
                report.push(Warning::DegeneratePaveBlock { edge: e, span });
                continue;
            }
            ctx.add_block(PaveBlock::new(e, pair[0], pair[1]));
        }
    }
    Ok(())
}

fn find_root(parent: &mut HashMap<usize, usize>, x: usize) -> usize {
    let mut root = x;
    while let Some(&p) = parent.get(&root) {
        if p == root {
            break;
        }
        root = p;
    }
    parent.insert(x, root);
    root
}

/// Groups blocks of different edges that run over the same stretch.
fn find_common_blocks(store: &TopologyStore, ctx: &mut IntersectionContext) -> Result<()> {
    let mut parent: HashMap<usize, usize> = HashMap::new();
    for pos in ctx.interferences_of_kind(InterferenceKind::EdgeEdge) {
        let interference = &ctx.interferences()[pos];
        let Contact::Range { range_a, .. } = interference.contact else {
            continue;
        };
        let tol = interference.tolerance;
        let ea = ctx.edge_id(interference.index_a)?;
        let eb = ctx.edge_id(interference.index_b)?;
        let curve_a = &store.edge(ea)?.curve;
        let curve_b = &store.edge(eb)?.curve;
        for &ba in ctx.blocks_of(ea) {
            let block = ctx.block(ba);
            let mid = block.mid_param();
            if mid < range_a.0 || mid > range_a.1 {
                continue;
            }
            let m = block.mid_point(curve_a)?;
            for &bb in ctx.blocks_of(eb) {
                let other = ctx.block(bb);
                if other.vertex_pair() != block.vertex_pair() {
                    continue;
                }
                let (t0, t1) = other.range();
                let t = project_in_range(curve_b, &m, t0, t1)?;
                if (curve_b.evaluate(t)? - m).norm() <= tol {
                    let (ra, rb) = (find_root(&mut parent, ba), find_root(&mut parent, bb));
                    if ra != rb {
                        parent.insert(ra.max(rb), ra.min(rb));
                    }
                }
            }
        }
    }

    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    let members: Vec<usize> = parent.keys().copied().collect();
    for b in members {
        let root = find_root(&mut parent, b);
        groups.entry(root).or_default().push(b);
    }
    let mut groups: Vec<Vec<usize>> = groups.into_values().filter(|g| g.len() > 1).collect();
    for group in &mut groups {
        group.sort_unstable();
    }
    groups.sort_unstable_by_key(|g| g[0]);
    for blocks in groups {
        let index = ctx.common_blocks.len();
        for &b in &blocks {
            ctx.block_common.insert(b, index);
        }
        ctx.common_blocks.push(CommonBlock {
            blocks,
            faces: Vec::new(),
        });
    }
    Ok(())
}

/// Records blocks lying inside a face of another operand.
fn find_in_face_blocks(store: &TopologyStore, ctx: &mut IntersectionContext) -> Result<()> {
    for pos in ctx.interferences_of_kind(InterferenceKind::EdgeFace) {
        let interference = ctx.interferences()[pos].clone();
        let Contact::Range { range_a, .. } = interference.contact else {
            continue;
        };
        let e = ctx.edge_id(interference.index_a)?;
        let f = ctx.face_id(interference.index_b)?;
        let curve = &store.edge(e)?.curve;
        let face = store.face(f)?;
        let loops = face_uv_loops(store, f)?;
        let tol_uv = interference.tolerance / face.surface.metric_scale();
        for b in ctx.blocks_of(e).to_vec() {
            let block = ctx.block(b);
            let mid = block.mid_param();
            if mid < range_a.0 || mid > range_a.1 {
                continue;
            }
            let (u, v) = face.surface.project(&block.mid_point(curve)?)?;
            if locate_uv(&face.surface, &loops, Point2::new(u, v), tol_uv)
                != PolygonLocation::Inside
            {
                continue;
            }
            let in_face = ctx.in_face_blocks.entry(f).or_default();
            if !in_face.contains(&b) {
                in_face.push(b);
            }
            if let Some(&c) = ctx.block_common.get(&b) {
                let faces = &mut ctx.common_blocks[c].faces;
                if !faces.contains(&f) {
                    faces.push(f);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::operations::boolean::context::{Operand, OperandGroup};
    use crate::operations::creation::{MakeBox, MakeEdge, MakeSphere};
    use crate::topology::{ShapeId, ShapeKind};

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn fill(store: &mut TopologyStore, a: ShapeId, b: ShapeId) -> (IntersectionContext, Report) {
        fill_fuzzy(store, a, b, 0.0)
    }

    fn fill_fuzzy(
        store: &mut TopologyStore,
        a: ShapeId,
        b: ShapeId,
        fuzzy: f64,
    ) -> (IntersectionContext, Report) {
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
            fuzzy,
        )
        .unwrap();
        let options = BooleanOptions::default().with_fuzzy_value(fuzzy);
        let mut report = Report::new();
        PaveFiller::new(&options)
            .perform(store, &mut ctx, &mut report)
            .unwrap();
        (ctx, report)
    }

    fn section_edges(ctx: &IntersectionContext) -> Vec<usize> {
        let mut blocks: Vec<usize> = ctx.section_blocks.values().flatten().copied().collect();
        blocks.sort_unstable();
        blocks.dedup();
        blocks
    }

    #[test]
    fn growing_fuzzy_value_never_loses_interferences() {
        let mut counts = Vec::new();
        for fuzzy in [0.0, 1e-5, 1e-3, 1e-2] {
            let mut store = TopologyStore::new();
            let a = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
                .execute(&mut store)
                .unwrap();
            let b = MakeBox::new(p(1.0 + 1e-4, 0.5, 0.5), p(2.0, 1.5, 1.5))
                .execute(&mut store)
                .unwrap();
            let (ctx, _) = fill_fuzzy(&mut store, a.into(), b.into(), fuzzy);
            counts.push(ctx.interferences().len());
        }
        assert_eq!(counts[0], 0, "{counts:?}");
        assert!(counts[3] > 0, "{counts:?}");
        assert!(counts.windows(2).all(|w| w[0] <= w[1]), "{counts:?}");
    }

    #[test]
    fn crossing_edges_split_each_other() {
        let mut store = TopologyStore::new();
        let a = MakeEdge::new(p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0))
            .execute(&mut store)
            .unwrap();
        let b = MakeEdge::new(p(1.0, -1.0, 0.0), p(1.0, 1.0, 0.0))
            .execute(&mut store)
            .unwrap();
        let (ctx, report) = fill(&mut store, a.into(), b.into());
        assert!(report.is_clean());
        assert_eq!(ctx.blocks_of(a).len(), 2);
        assert_eq!(ctx.blocks_of(b).len(), 2);
        let shared = ctx.block(ctx.blocks_of(a)[0]).pave2.vertex;
        assert_eq!(ctx.block(ctx.blocks_of(b)[0]).pave2.vertex, shared);
    }

    #[test]
    fn face_sharing_boxes_merge_vertices_and_edges() {
        let mut store = TopologyStore::new();
        let a = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let b = MakeBox::new(p(1.0, 0.0, 0.0), p(2.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let (ctx, _) = fill(&mut store, a.into(), b.into());
        assert_eq!(ctx.common_blocks.len(), 4);
        assert_eq!(ctx.vertex_groups().len(), 4);
        assert!(section_edges(&ctx).is_empty());
        for cb in &ctx.common_blocks {
            assert_eq!(cb.blocks.len(), 2);
        }
    }

    #[test]
    fn overlapping_boxes_produce_six_section_edges() {
        let mut store = TopologyStore::new();
        let a = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let b = MakeBox::new(p(0.5, 0.5, 0.5), p(1.5, 1.5, 1.5))
            .execute(&mut store)
            .unwrap();
        let (ctx, report) = fill(&mut store, a.into(), b.into());
        assert!(report.is_clean());
        let sections = section_edges(&ctx);
        assert_eq!(sections.len(), 6);
        for b in sections {
            let edge = store.edge(ctx.block(b).split_edge.unwrap()).unwrap();
            assert!((edge.t_end - edge.t_start - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn intersecting_spheres_share_a_split_circle() {
        let mut store = TopologyStore::new();
        let a = MakeSphere::new(p(0.0, 0.0, 0.0), 1.0)
            .execute(&mut store)
            .unwrap();
        let b = MakeSphere::new(p(1.5, 0.0, 0.0), 1.0)
            .execute(&mut store)
            .unwrap();
        let (ctx, report) = fill(&mut store, a.into(), b.into());
        assert!(report.is_clean());
        assert_eq!(section_edges(&ctx).len(), 2);
        let seam = store
            .explore(ShapeId::Solid(a), ShapeKind::Edge)
            .unwrap()
            .into_iter()
            .find_map(|id| match id {
                ShapeId::Edge(e) if !store.edge(e).unwrap().is_degenerate() => Some(e),
                _ => None,
            })
            .unwrap();
        assert_eq!(ctx.blocks_of(seam).len(), 3);
    }

    #[test]
    fn nearby_vertices_merge_into_a_covering_image() {
        let mut store = TopologyStore::new();
        let a = store.add_vertex(VertexData::with_tolerance(p(0.0, 0.0, 0.0), 1e-3));
        let b = store.add_vertex(VertexData::with_tolerance(p(1.5e-3, 0.0, 0.0), 1e-3));
        let mut ctx = IntersectionContext::default();
        ctx.union_vertices(a, b);
        resolve_vertex_images(&mut store, &mut ctx).unwrap();
        let image = ctx.vertex_image(a);
        assert_eq!(ctx.vertex_image(b), image);
        assert!(image != a && image != b);
        let data = store.vertex(image).unwrap();
        assert!((data.point.x - 0.75e-3).abs() < 1e-12);
        assert!(data.tolerance >= 1.75e-3 - 1e-12);
    }
}
