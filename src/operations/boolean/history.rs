use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::topology::{EdgeId, Shape, ShapeId, ShapeKind, TopologyStore};

use super::context::IntersectionContext;
use super::interference::InterferenceKind;
use super::split_face::FaceSplit;

/// Where the vertices, edges and faces of the operands went.
///
/// `modified` lists the result shapes an operand shape was replaced by,
/// `generated` the result shapes created on it by intersection (section
/// edges on faces, intersection vertices on edges and faces), and
/// `is_deleted` tells whether nothing of it survived.
#[derive(Debug, Clone, Default)]
pub struct History {
    modified: HashMap<ShapeId, Vec<ShapeId>>,
    generated: HashMap<ShapeId, Vec<ShapeId>>,
    deleted: HashSet<ShapeId>,
}

impl History {
    /// Result shapes that replace `shape`; empty if it was kept as is or
    /// deleted.
    #[must_use]
    pub fn modified(&self, shape: impl Into<ShapeId>) -> &[ShapeId] {
        self.modified.get(&shape.into()).map_or(&[], Vec::as_slice)
    }

    /// Result shapes created on `shape` by intersection.
    #[must_use]
    pub fn generated(&self, shape: impl Into<ShapeId>) -> &[ShapeId] {
        self.generated.get(&shape.into()).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if neither `shape` nor any replacement of it is in
    /// the result.
    #[must_use]
    pub fn is_deleted(&self, shape: impl Into<ShapeId>) -> bool {
        self.deleted.contains(&shape.into())
    }

    /// Records the fate of every operand vertex, edge and face.
    pub(crate) fn build(
        store: &TopologyStore,
        ctx: &IntersectionContext,
        splits: &[FaceSplit],
        result: Option<Shape>,
    ) -> Result<Self> {
        let mut present = HashSet::new();
        if let Some(shape) = result {
            for kind in [ShapeKind::Vertex, ShapeKind::Edge, ShapeKind::Face] {
                present.extend(store.explore(shape.id, kind)?);
            }
        }
        let mut history = Self::default();

        for i in ctx.indices_of_kind(ShapeKind::Vertex) {
            let v = ctx.vertex_id(i)?;
            let image = ctx.vertex_image(v);
            history.record(v.into(), vec![image.into()], &present);
        }
        for e in ctx.edges() {
            let mut pieces: Vec<ShapeId> = Vec::new();
            for &b in ctx.blocks_of(e) {
                if let Some(split) = ctx.block(b).split_edge {
                    let split = ShapeId::from(split);
                    if !pieces.contains(&split) {
                        pieces.push(split);
                    }
                }
            }
            if pieces.is_empty() {
                pieces.push(e.into());
            }
            history.record(e.into(), pieces, &present);
        }
        for split in splits {
            let pieces = split.pieces.iter().map(|&f| ShapeId::from(f)).collect();
            history.record(split.face.into(), pieces, &present);
        }
        for face in ctx.faces() {
            if !splits.iter().any(|s| s.face == face) {
                history.record(face.into(), vec![face.into()], &present);
            }
        }

        for (&face, blocks) in &ctx.section_blocks {
            let edges: Vec<EdgeId> = blocks.iter().filter_map(|&b| ctx.block(b).split_edge).collect();
            for e in edges {
                history.add_generated(face.into(), e.into(), &present);
            }
        }
        for interference in ctx.interferences() {
            if !matches!(
                interference.kind,
                InterferenceKind::EdgeEdge | InterferenceKind::EdgeFace
            ) {
                continue;
            }
            let Some(v) = interference.vertex else {
                continue;
            };
            let image = ShapeId::from(ctx.vertex_image(v));
            for index in [interference.index_a, interference.index_b] {
                history.add_generated(ctx.shape(index).id, image, &present);
            }
        }
        Ok(history)
    }

    fn record(&mut self, shape: ShapeId, pieces: Vec<ShapeId>, present: &HashSet<ShapeId>) {
        let survivors: Vec<ShapeId> = pieces.into_iter().filter(|p| present.contains(p)).collect();
        if survivors.is_empty() {
            self.deleted.insert(shape);
        } else if survivors != [shape] {
            self.modified.insert(shape, survivors);
        }
    }

    fn add_generated(&mut self, shape: ShapeId, created: ShapeId, present: &HashSet<ShapeId>) {
        if !present.contains(&created) {
            return;
        }
        let list = self.generated.entry(shape).or_default();
        if !list.contains(&created) {
            list.push(created);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn record_distinguishes_kept_modified_and_deleted() {
        let mut edges: SlotMap<EdgeId, ()> = SlotMap::with_key();
        let (a, b, c, d) = (
            edges.insert(()),
            edges.insert(()),
            edges.insert(()),
            edges.insert(()),
        );
        let present: HashSet<ShapeId> = [a, c].into_iter().map(ShapeId::from).collect();
        let mut history = History::default();
        history.record(a.into(), vec![a.into()], &present);
        history.record(b.into(), vec![c.into(), d.into()], &present);
        history.record(d.into(), vec![d.into()], &present);
        assert!(history.modified(a).is_empty());
        assert!(!history.is_deleted(a));
        assert_eq!(history.modified(b), &[ShapeId::from(c)]);
        assert!(history.is_deleted(d));
    }

    #[test]
    fn generated_ignores_absent_shapes() {
        let mut edges: SlotMap<EdgeId, ()> = SlotMap::with_key();
        let (a, b, c) = (edges.insert(()), edges.insert(()), edges.insert(()));
        let present: HashSet<ShapeId> = [ShapeId::from(b)].into_iter().collect();
        let mut history = History::default();
        history.add_generated(a.into(), b.into(), &present);
        history.add_generated(a.into(), b.into(), &present);
        history.add_generated(a.into(), c.into(), &present);
        assert_eq!(history.generated(a), &[ShapeId::from(b)]);
    }
}
