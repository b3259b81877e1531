use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::error::Result;
use crate::geometry::surface::Surface;
use crate::math::polygon_2d::interior_point;
use crate::operations::creation::MakeCompound;
use crate::operations::query::{face_uv_loops, shell_signed_volume, PointClassifier, PointLocation};
use crate::tessellation::TessellationParams;
use crate::topology::{
    EdgeId, FaceId, OrientedEdge, OrientedFace, Shape, ShellData, ShellId, SolidData, SolidId,
    TopologyStore, VertexId, WireData, WireId,
};

use super::options::BooleanOptions;
use super::report::{Report, Warning};

/// Kept pieces to be stitched into the result.
#[derive(Debug, Clone, Default)]
pub struct KeptPieces {
    /// Faces with the orientation they take in the result.
    pub faces: Vec<OrientedFace>,
    /// Edges of the edge-dimensional part of the result.
    pub edges: Vec<EdgeId>,
}

/// Builds the result shape from the kept pieces.
///
/// Faces are grouped into shells through edges used by exactly two face
/// sides; a shell is closed when all of its edges are. Closed shells with
/// positive volume become solids; negative ones become voids of the
/// smallest solid containing them, or are flipped when no solid does.
/// Edges are chained into wires. A single member is returned as it is,
/// several as a compound, none as `None`.
///
/// # Errors
///
/// Returns an error if the store is inconsistent or a shell volume cannot
/// be computed.
#[instrument(skip_all, fields(faces = kept.faces.len(), edges = kept.edges.len()))]
pub fn assemble(
    store: &mut TopologyStore,
    kept: &KeptPieces,
    options: &BooleanOptions,
    report: &mut Report,
) -> Result<Option<Shape>> {
    let mut members: Vec<Shape> = Vec::new();
    let (closed, open) = build_shells(store, &kept.faces)?;
    for solid in build_solids(store, &closed, options, report)? {
        members.push(solid.into());
    }
    members.extend(open.into_iter().map(Shape::from));
    members.extend(chain_wires(store, &kept.edges)?.into_iter().map(Shape::from));
    debug!(members = members.len(), "result assembled");

    Ok(match members.len() {
        0 => None,
        1 => Some(members[0]),
        _ => Some(MakeCompound::new(members).execute(store)?.into()),
    })
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

/// Non-degenerate edges of a face, once per use.
fn face_edges(store: &TopologyStore, face: FaceId) -> Result<Vec<EdgeId>> {
    let mut edges = Vec::new();
    for wire in store.face(face)?.wires() {
        for oe in &store.wire(wire)?.edges {
            if !store.edge(oe.edge)?.is_degenerate() {
                edges.push(oe.edge);
            }
        }
    }
    Ok(edges)
}

/// Groups faces into connected shells; returns closed and open shells.
fn build_shells(store: &mut TopologyStore, faces: &[OrientedFace]) -> Result<(Vec<ShellId>, Vec<ShellId>)> {
    let mut edges_of = Vec::with_capacity(faces.len());
    let mut uses: HashMap<EdgeId, Vec<usize>> = HashMap::new();
    for (i, of) in faces.iter().enumerate() {
        let edges = face_edges(store, of.face)?;
        for &e in &edges {
            uses.entry(e).or_default().push(i);
        }
        edges_of.push(edges);
    }

    let mut parent: Vec<usize> = (0..faces.len()).collect();
    for users in uses.values() {
        if let [a, b] = users.as_slice() {
            let (ra, rb) = (find(&mut parent, *a), find(&mut parent, *b));
            parent[ra.max(rb)] = ra.min(rb);
        }
    }

    let mut components: Vec<(usize, Vec<usize>)> = Vec::new();
    for i in 0..faces.len() {
        let root = find(&mut parent, i);
        match components.iter_mut().find(|(r, _)| *r == root) {
            Some((_, members)) => members.push(i),
            None => components.push((root, vec![i])),
        }
    }

    let (mut closed, mut open) = (Vec::new(), Vec::new());
    for (_, members) in components {
        let is_closed = members
            .iter()
            .all(|&i| edges_of[i].iter().all(|e| uses.get(e).is_some_and(|u| u.len() == 2)));
        let shell = store.add_shell(ShellData {
            faces: members.iter().map(|&i| faces[i]).collect(),
            is_closed,
        });
        if is_closed {
            closed.push(shell);
        } else {
            open.push(shell);
        }
    }
    Ok((closed, open))
}

/// Turns closed shells into solids, placing inward-facing shells as voids.
fn build_solids(
    store: &mut TopologyStore,
    shells: &[ShellId],
    options: &BooleanOptions,
    report: &mut Report,
) -> Result<Vec<SolidId>> {
    let params = TessellationParams::default();
    let mut outer: Vec<(ShellId, f64, Vec<ShellId>)> = Vec::new();
    let mut inner = Vec::new();
    for &shell in shells {
        let volume = shell_signed_volume(store, shell, &params)?;
        if volume >= 0.0 {
            outer.push((shell, volume, Vec::new()));
        } else {
            inner.push(shell);
        }
    }

    for shell in inner {
        let host = containing_solid(store, shell, &outer)?;
        match host {
            Some(i) => outer[i].2.push(shell),
            None if options.check_inverted => {
                let data = store.shell(shell)?;
                let flipped = ShellData {
                    faces: data
                        .faces
                        .iter()
                        .map(|of| OrientedFace::new(of.face, !of.forward))
                        .collect(),
                    is_closed: true,
                };
                report.push(Warning::InvertedSolid { shell });
                let flipped = store.add_shell(flipped);
                let volume = shell_signed_volume(store, flipped, &params)?;
                outer.push((flipped, volume, Vec::new()));
            }
            None => outer.push((shell, 0.0, Vec::new())),
        }
    }

    Ok(outer
        .into_iter()
        .map(|(outer_shell, _, inner_shells)| {
            store.add_solid(SolidData {
                outer_shell,
                inner_shells,
            })
        })
        .collect())
}

/// Index of the smallest positive shell strictly containing `shell`.
fn containing_solid(
    store: &TopologyStore,
    shell: ShellId,
    candidates: &[(ShellId, f64, Vec<ShellId>)],
) -> Result<Option<usize>> {
    let Some(first) = store.shell(shell)?.faces.first() else {
        return Ok(None);
    };
    let face = store.face(first.face)?;
    let Some(uv) = interior_point(&face_uv_loops(store, first.face)?) else {
        return Ok(None);
    };
    let sample = face.surface.evaluate(uv.x, uv.y)?;
    let tol = 10.0 * face.tolerance;

    let mut best: Option<(usize, f64)> = None;
    for (i, (candidate, volume, _)) in candidates.iter().enumerate() {
        let faces = store.shell(*candidate)?.faces.iter().map(|of| of.face);
        let classifier = PointClassifier::new(store, faces.collect::<Vec<_>>())?;
        if classifier.classify(&sample, tol) == PointLocation::In
            && best.is_none_or(|(_, v)| *volume < v)
        {
            best = Some((i, *volume));
        }
    }
    Ok(best.map(|(i, _)| i))
}

/// Chains edges into wires through shared vertices, starting at free ends
/// when there are any.
fn chain_wires(store: &mut TopologyStore, edges: &[EdgeId]) -> Result<Vec<WireId>> {
    let mut ends: Vec<(EdgeId, VertexId, VertexId)> = Vec::with_capacity(edges.len());
    for &e in edges {
        let data = store.edge(e)?;
        ends.push((e, data.start, data.end));
    }
    let mut used = vec![false; ends.len()];
    let degree = |v: VertexId, used: &[bool]| {
        ends.iter()
            .zip(used)
            .filter(|((_, s, t), u)| !**u && (*s == v || *t == v))
            .count()
    };

    let mut wires = Vec::new();
    while let Some(first) = used.iter().position(|u| !u) {
        let start = (0..ends.len())
            .filter(|&i| !used[i])
            .find_map(|i| {
                let (_, s, t) = ends[i];
                if degree(s, &used) == 1 {
                    Some((i, true))
                } else if degree(t, &used) == 1 {
                    Some((i, false))
                } else {
                    None
                }
            })
            .unwrap_or((first, true));

        let mut chain = vec![OrientedEdge::new(ends[start.0].0, start.1)];
        used[start.0] = true;
        let origin = if start.1 { ends[start.0].1 } else { ends[start.0].2 };
        let mut tip = if start.1 { ends[start.0].2 } else { ends[start.0].1 };
        while tip != origin {
            let Some((i, forward)) = (0..ends.len()).filter(|&i| !used[i]).find_map(|i| {
                let (_, s, t) = ends[i];
                if s == tip {
                    Some((i, true))
                } else if t == tip {
                    Some((i, false))
                } else {
                    None
                }
            }) else {
                break;
            };
            used[i] = true;
            chain.push(OrientedEdge::new(ends[i].0, forward));
            tip = if forward { ends[i].2 } else { ends[i].1 };
        }
        wires.push(store.add_wire(WireData {
            edges: chain,
            is_closed: tip == origin,
        }));
    }
    Ok(wires)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::operations::creation::{MakeBox, MakeEdge};
    use crate::operations::query::Volume;
    use crate::topology::{ShapeId, ShapeKind};

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn box_faces(store: &mut TopologyStore, min: Point3, max: Point3) -> Vec<OrientedFace> {
        let solid = MakeBox::new(min, max).execute(store).unwrap();
        let shell = store.solid(solid).unwrap().outer_shell;
        store.shell(shell).unwrap().faces.clone()
    }

    #[test]
    fn closed_faces_make_a_solid() {
        let mut store = TopologyStore::new();
        let faces = box_faces(&mut store, p(0.0, 0.0, 0.0), p(1.0, 2.0, 3.0));
        let kept = KeptPieces {
            faces,
            edges: Vec::new(),
        };
        let mut report = Report::new();
        let shape = assemble(&mut store, &kept, &BooleanOptions::default(), &mut report)
            .unwrap()
            .unwrap();
        assert_eq!(shape.kind(), ShapeKind::Solid);
        assert!(report.is_clean());
        let volume = Volume::new(shape.id).execute(&store).unwrap();
        assert!((volume - 6.0).abs() < 1e-9);
    }

    #[test]
    fn inverted_shell_is_flipped() {
        let mut store = TopologyStore::new();
        let faces = box_faces(&mut store, p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .into_iter()
            .map(|of| OrientedFace::new(of.face, !of.forward))
            .collect();
        let kept = KeptPieces {
            faces,
            edges: Vec::new(),
        };
        let mut report = Report::new();
        let shape = assemble(&mut store, &kept, &BooleanOptions::default(), &mut report)
            .unwrap()
            .unwrap();
        assert!(matches!(report.warnings(), [Warning::InvertedSolid { .. }]));
        let volume = Volume::new(shape.id).execute(&store).unwrap();
        assert!((volume - 1.0).abs() < 1e-9);
    }

    #[test]
    fn inner_shell_becomes_a_void() {
        let mut store = TopologyStore::new();
        let mut faces = box_faces(&mut store, p(0.0, 0.0, 0.0), p(3.0, 3.0, 3.0));
        faces.extend(
            box_faces(&mut store, p(1.0, 1.0, 1.0), p(2.0, 2.0, 2.0))
                .into_iter()
                .map(|of| OrientedFace::new(of.face, !of.forward)),
        );
        let kept = KeptPieces {
            faces,
            edges: Vec::new(),
        };
        let mut report = Report::new();
        let shape = assemble(&mut store, &kept, &BooleanOptions::default(), &mut report)
            .unwrap()
            .unwrap();
        let ShapeId::Solid(solid) = shape.id else {
            panic!("expected a solid, got {shape:?}");
        };
        assert_eq!(store.solid(solid).unwrap().inner_shells.len(), 1);
        let volume = Volume::new(shape.id).execute(&store).unwrap();
        assert!((volume - 26.0).abs() < 1e-9);
    }

    #[test]
    fn separate_boxes_make_a_compound() {
        let mut store = TopologyStore::new();
        let mut faces = box_faces(&mut store, p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0));
        faces.extend(box_faces(&mut store, p(2.0, 0.0, 0.0), p(3.0, 1.0, 1.0)));
        let kept = KeptPieces {
            faces,
            edges: Vec::new(),
        };
        let shape = assemble(&mut store, &kept, &BooleanOptions::default(), &mut Report::new())
            .unwrap()
            .unwrap();
        assert_eq!(shape.kind(), ShapeKind::Compound);
        assert_eq!(store.explore(shape.id, ShapeKind::Solid).unwrap().len(), 2);
    }

    #[test]
    fn missing_face_leaves_an_open_shell() {
        let mut store = TopologyStore::new();
        let mut faces = box_faces(&mut store, p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0));
        faces.pop();
        let kept = KeptPieces {
            faces,
            edges: Vec::new(),
        };
        let shape = assemble(&mut store, &kept, &BooleanOptions::default(), &mut Report::new())
            .unwrap()
            .unwrap();
        let ShapeId::Shell(shell) = shape.id else {
            panic!("expected a shell, got {shape:?}");
        };
        assert!(!store.shell(shell).unwrap().is_closed);
    }

    #[test]
    fn edges_chain_into_one_wire() {
        let mut store = TopologyStore::new();
        let a = MakeEdge::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0))
            .execute(&mut store)
            .unwrap();
        let end = store.edge(a).unwrap().end;
        let far = store.add_vertex(crate::topology::VertexData::new(p(1.0, 1.0, 0.0)));
        let b = store.add_edge(crate::topology::EdgeData::new(
            far,
            end,
            store.edge(a).unwrap().curve.clone(),
            0.0,
            1.0,
        ));
        let kept = KeptPieces {
            faces: Vec::new(),
            edges: vec![b, a],
        };
        let shape = assemble(&mut store, &kept, &BooleanOptions::default(), &mut Report::new())
            .unwrap()
            .unwrap();
        let ShapeId::Wire(wire) = shape.id else {
            panic!("expected a wire, got {shape:?}");
        };
        let wire = store.wire(wire).unwrap();
        assert_eq!(wire.edges.len(), 2);
        assert!(!wire.is_closed);
        // Both free ends qualify; the scan meets `b` first.
        assert!(wire.edges[0].edge == b && wire.edges[0].forward);
        assert!(wire.edges[1].edge == a && !wire.edges[1].forward);
    }

    #[test]
    fn nothing_kept_is_no_result() {
        let mut store = TopologyStore::new();
        let shape = assemble(
            &mut store,
            &KeptPieces::default(),
            &BooleanOptions::default(),
            &mut Report::new(),
        )
        .unwrap();
        assert!(shape.is_none());
    }
}
