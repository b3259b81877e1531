use std::collections::HashMap;
use std::f64::consts::TAU;

use tracing::debug;

use crate::error::Result;
use crate::geometry::curve::{project_in_range, Curve};
use crate::geometry::surface::Surface;
use crate::math::polygon_2d::PolygonLocation;
use crate::math::{wrap_parameter, Point2, Point3, TOLERANCE};
use crate::operations::query::{face_bounding_box, face_uv_loops, intersect_curves, locate_uv, CurveCurveHit};
use crate::topology::{EdgeCurve, EdgeData, FaceId, FaceSurface, TopologyStore, VertexData, VertexId};

use super::context::IntersectionContext;
use super::interference::{Contact, InterferenceKind};
use super::options::BooleanOptions;
use super::pave::{Pave, PaveBlock};

/// A face-face intersection curve waiting to be cut into edges.
struct SectionCurve {
    faces: (FaceId, FaceId),
    curve: EdgeCurve,
    tolerance: f64,
    edge_tolerance: f64,
    paves: Vec<Pave>,
}

/// Boundary of one face in parameter space, read once.
struct FaceLocator {
    surface: FaceSurface,
    loops: Vec<Vec<Point2>>,
}

impl FaceLocator {
    fn new(store: &TopologyStore, face: FaceId) -> Result<Self> {
        Ok(Self {
            surface: store.face(face)?.surface.clone(),
            loops: face_uv_loops(store, face)?,
        })
    }

    fn locate(&self, point: &Point3, tol: f64) -> PolygonLocation {
        if self.surface.signed_distance(point).abs() > tol {
            return PolygonLocation::Outside;
        }
        let Ok((u, v)) = self.surface.project(point) else {
            return PolygonLocation::Outside;
        };
        locate_uv(
            &self.surface,
            &self.loops,
            Point2::new(u, v),
            tol / self.surface.metric_scale(),
        )
    }
}

fn locator<'a>(
    locators: &'a mut HashMap<FaceId, FaceLocator>,
    store: &TopologyStore,
    face: FaceId,
) -> Result<&'a FaceLocator> {
    if !locators.contains_key(&face) {
        locators.insert(face, FaceLocator::new(store, face)?);
    }
    Ok(&locators[&face])
}

/// Vertices that may bound a section curve on `face`: vertices found on its
/// interior, the paves of its boundary edges, and the ends of blocks lying
/// inside it.
fn face_candidates(store: &TopologyStore, ctx: &IntersectionContext, face: FaceId) -> Result<Vec<VertexId>> {
    let mut found: Vec<VertexId> = ctx
        .face_vertices
        .get(&face)
        .into_iter()
        .flatten()
        .map(|&v| ctx.vertex_image(v))
        .collect();
    for wire in store.face(face)?.wires() {
        for oe in &store.wire(wire)?.edges {
            for &b in ctx.blocks_of(oe.edge) {
                let block = ctx.block(b);
                found.extend([block.pave1.vertex, block.pave2.vertex]);
            }
        }
    }
    for &b in ctx.in_face_blocks.get(&face).into_iter().flatten() {
        let block = ctx.block(b);
        found.extend([block.pave1.vertex, block.pave2.vertex]);
    }
    found.sort_unstable();
    found.dedup();
    Ok(found)
}

/// Parameter window of a section curve worth searching on `face`.
fn search_range(store: &TopologyStore, curve: &EdgeCurve, face: FaceId) -> Result<(f64, f64)> {
    if curve.period().is_some() {
        return Ok((0.0, TAU));
    }
    let bbox = face_bounding_box(store, face)?;
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for i in 0..8 {
        let corner = Point3::new(
            if i & 1 == 0 { bbox.min.x } else { bbox.max.x },
            if i & 2 == 0 { bbox.min.y } else { bbox.max.y },
            if i & 4 == 0 { bbox.min.z } else { bbox.max.z },
        );
        let t = curve.project(&corner)?;
        lo = lo.min(t);
        hi = hi.max(t);
    }
    Ok((lo, hi))
}

/// Turns the face-face curves of the filler into section edges.
///
/// Each curve is cut at the vertices lying on it and inside both faces.
/// A stretch whose middle is inside both faces becomes a new edge unless an
/// existing block already runs between the same vertices there. Closed
/// curves that meet no vertex are seeded with one.
///
/// # Errors
///
/// Returns an error on cancellation or if the store is inconsistent.
pub fn build_section_edges(
    store: &mut TopologyStore,
    ctx: &mut IntersectionContext,
    options: &BooleanOptions,
) -> Result<usize> {
    let mut curves: Vec<SectionCurve> = Vec::new();
    for pos in ctx.interferences_of_kind(InterferenceKind::FaceFace) {
        let interference = &ctx.interferences()[pos];
        let Contact::Curves(found) = &interference.contact else {
            continue;
        };
        let faces = (
            ctx.face_id(interference.index_a)?,
            ctx.face_id(interference.index_b)?,
        );
        let edge_tolerance = store
            .face(faces.0)?
            .tolerance
            .max(store.face(faces.1)?.tolerance);
        for curve in found {
            curves.push(SectionCurve {
                faces,
                curve: curve.clone(),
                tolerance: interference.tolerance,
                edge_tolerance,
                paves: Vec::new(),
            });
        }
    }
    if curves.is_empty() {
        return Ok(0);
    }

    let mut locators: HashMap<FaceId, FaceLocator> = HashMap::new();
    for section in &mut curves {
        options.progress.check()?;
        let (fa, fb) = section.faces;
        let mut candidates = face_candidates(store, ctx, fa)?;
        candidates.extend(face_candidates(store, ctx, fb)?);
        candidates.sort_unstable();
        candidates.dedup();
        for v in candidates {
            let vertex = store.vertex(v)?;
            let reach = vertex.tolerance + section.tolerance;
            let t = section.curve.project(&vertex.point)?;
            if (section.curve.evaluate(t)? - vertex.point).norm() > reach {
                continue;
            }
            let point = vertex.point;
            if locator(&mut locators, store, fa)?.locate(&point, reach) == PolygonLocation::Outside
                || locator(&mut locators, store, fb)?.locate(&point, reach) == PolygonLocation::Outside
            {
                continue;
            }
            section.paves.push(Pave::new(v, t));
        }
    }

    add_crossings(store, &mut curves, &mut locators)?;

    let mut created = 0;
    for section in &mut curves {
        options.progress.check()?;
        created += cut_section(store, ctx, section, &mut locators)?;
    }
    debug!(curves = curves.len(), created, "section edges built");
    Ok(created)
}

/// Adds paves where two section curves on a shared face cross each other.
fn add_crossings(
    store: &mut TopologyStore,
    curves: &mut [SectionCurve],
    locators: &mut HashMap<FaceId, FaceLocator>,
) -> Result<()> {
    for i in 0..curves.len() {
        for j in i + 1..curves.len() {
            let (fi, fj) = (curves[i].faces, curves[j].faces);
            let shared = [fi.0, fi.1]
                .into_iter()
                .find(|f| *f == fj.0 || *f == fj.1);
            let Some(face) = shared else {
                continue;
            };
            let ri = search_range(store, &curves[i].curve, face)?;
            let rj = search_range(store, &curves[j].curve, face)?;
            let tol = curves[i].tolerance.max(curves[j].tolerance);
            let hits = intersect_curves(&curves[i].curve, ri, &curves[j].curve, rj, tol)?;
            for hit in hits {
                let CurveCurveHit::Point { point, t1, t2 } = hit else {
                    continue;
                };
                let mut inside = true;
                for f in [fi.0, fi.1, fj.0, fj.1] {
                    if locator(locators, store, f)?.locate(&point, tol) == PolygonLocation::Outside {
                        inside = false;
                        break;
                    }
                }
                if !inside {
                    continue;
                }
                let mut existing = None;
                for pave in curves[i].paves.iter().chain(&curves[j].paves) {
                    let vertex = store.vertex(pave.vertex)?;
                    if (vertex.point - point).norm() <= vertex.tolerance + tol {
                        existing = Some(pave.vertex);
                        break;
                    }
                }
                let v = match existing {
                    Some(v) => v,
                    None => store.add_vertex(VertexData::with_tolerance(point, tol)),
                };
                for (k, t) in [(i, t1), (j, t2)] {
                    let t = match curves[k].curve.period() {
                        Some(period) => wrap_parameter(t, 0.0, period),
                        None => t,
                    };
                    if !curves[k].paves.iter().any(|p| p.vertex == v) {
                        curves[k].paves.push(Pave::new(v, t));
                    }
                }
            }
        }
    }
    Ok(())
}

/// Whether a block between the same vertices already passes through `mid`.
fn is_covered(
    store: &TopologyStore,
    ctx: &IntersectionContext,
    faces: (FaceId, FaceId),
    pair: (VertexId, VertexId),
    mid: &Point3,
    tol: f64,
) -> Result<bool> {
    let mut blocks: Vec<usize> = Vec::new();
    for face in [faces.0, faces.1] {
        for wire in store.face(face)?.wires() {
            for oe in &store.wire(wire)?.edges {
                blocks.extend_from_slice(ctx.blocks_of(oe.edge));
            }
        }
        for source in [&ctx.in_face_blocks, &ctx.section_blocks] {
            blocks.extend(source.get(&face).into_iter().flatten().copied());
        }
    }
    for b in blocks {
        let block = ctx.block(b);
        if block.vertex_pair() != pair {
            continue;
        }
        let curve = &store.edge(block.edge)?.curve;
        let (t0, t1) = block.range();
        let t = project_in_range(curve, mid, t0, t1)?;
        if (curve.evaluate(t)? - mid).norm() <= tol {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Splits one section curve at its paves and creates the edges inside both
/// faces.
fn cut_section(
    store: &mut TopologyStore,
    ctx: &mut IntersectionContext,
    section: &mut SectionCurve,
    locators: &mut HashMap<FaceId, FaceLocator>,
) -> Result<usize> {
    let (fa, fb) = section.faces;
    let closed = section.curve.period().is_some();
    section.paves.sort_by(|a, b| a.param.total_cmp(&b.param));
    section.paves.dedup_by(|b, a| a.vertex == b.vertex);
    if closed && section.paves.len() > 1 {
        let (first, last) = (section.paves[0], section.paves[section.paves.len() - 1]);
        if first.vertex == last.vertex {
            section.paves.pop();
        }
    }
    if closed && section.paves.is_empty() {
        let seed = section.curve.evaluate(0.0)?;
        let outside = locator(locators, store, fa)?.locate(&seed, section.tolerance)
            == PolygonLocation::Outside
            || locator(locators, store, fb)?.locate(&seed, section.tolerance)
                == PolygonLocation::Outside;
        if outside {
            return Ok(0);
        }
        let v = store.add_vertex(VertexData::with_tolerance(seed, section.edge_tolerance));
        section.paves.push(Pave::new(v, 0.0));
    }

    let mut spans: Vec<(Pave, Pave)> = section
        .paves
        .windows(2)
        .map(|w| (w[0], w[1]))
        .collect();
    if closed {
        if let (Some(&first), Some(&last)) = (section.paves.first(), section.paves.last()) {
            spans.push((last, Pave::new(first.vertex, first.param + TAU)));
        }
    }

    let mut created = 0;
    for (p1, p2) in spans {
        if p2.param - p1.param <= TOLERANCE {
            continue;
        }
        let mid = section.curve.evaluate(0.5 * (p1.param + p2.param))?;
        let la = locator(locators, store, fa)?.locate(&mid, section.tolerance);
        let lb = locator(locators, store, fb)?.locate(&mid, section.tolerance);
        if la == PolygonLocation::Outside
            || lb == PolygonLocation::Outside
            || (la == PolygonLocation::Boundary && lb == PolygonLocation::Boundary)
        {
            continue;
        }
        let pair = if p1.vertex <= p2.vertex {
            (p1.vertex, p2.vertex)
        } else {
            (p2.vertex, p1.vertex)
        };
        if is_covered(store, ctx, section.faces, pair, &mid, section.tolerance)? {
            continue;
        }
        let edge = store.add_edge(
            EdgeData::new(p1.vertex, p2.vertex, section.curve.clone(), p1.param, p2.param)
                .with_tolerance(section.edge_tolerance),
        );
        let mut block = PaveBlock::new(edge, p1, p2);
        block.split_edge = Some(edge);
        let index = ctx.add_block(block);
        for face in [fa, fb] {
            ctx.section_blocks.entry(face).or_default().push(index);
        }
        created += 1;
    }
    Ok(created)
}
