use crate::topology::{ShapeId, TopologyStore};

use super::context::IntersectionContext;
use super::interference::InterferenceKind;

/// Lists the index pairs worth intersecting in one detection phase.
///
/// A pair qualifies when its bounding boxes overlap and the sub-shapes
/// come from disjoint sets of operands. With `self_interference`, pairs
/// from the same operand are included as long as they share no vertex.
/// Degenerate edges never take part.
#[must_use]
pub fn candidate_pairs(
    store: &TopologyStore,
    ctx: &IntersectionContext,
    kind: InterferenceKind,
    self_interference: bool,
) -> Vec<(usize, usize)> {
    let (kind_a, kind_b) = kind.kinds();
    let usable = |i: &usize| match ctx.shape(*i).id {
        ShapeId::Edge(e) => store.edge(e).is_ok_and(|d| !d.is_degenerate()),
        _ => true,
    };
    let side_a: Vec<usize> = ctx.indices_of_kind(kind_a).into_iter().filter(usable).collect();
    let side_b: Vec<usize> = if kind_a == kind_b {
        side_a.clone()
    } else {
        ctx.indices_of_kind(kind_b).into_iter().filter(usable).collect()
    };

    let mut pairs = Vec::new();
    for &a in &side_a {
        let entry_a = ctx.shape(a);
        for &b in &side_b {
            if kind_a == kind_b && b <= a {
                continue;
            }
            let entry_b = ctx.shape(b);
            if !entry_a.bbox.overlaps(&entry_b.bbox) {
                continue;
            }
            let disjoint = entry_a
                .operands
                .iter()
                .all(|r| !entry_b.operands.contains(r));
            if disjoint {
                pairs.push((a, b));
            } else if self_interference && ctx.vertex_indices(a).is_disjoint(&ctx.vertex_indices(b)) {
                pairs.push((a, b));
            }
        }
    }
    pairs
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::operations::boolean::context::{Operand, OperandGroup};
    use crate::operations::creation::MakeBox;

    fn context(store: &mut TopologyStore, offset: f64) -> IntersectionContext {
        let a = MakeBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
            .execute(store)
            .unwrap();
        let b = MakeBox::new(
            Point3::new(offset, offset, offset),
            Point3::new(offset + 1.0, offset + 1.0, offset + 1.0),
        )
        .execute(store)
        .unwrap();
        IntersectionContext::new(
            store,
            vec![
                Operand {
                    shape: a.into(),
                    group: OperandGroup::Object,
                },
                Operand {
                    shape: b.into(),
                    group: OperandGroup::Tool,
                },
            ],
            0.0,
        )
        .unwrap()
    }

    #[test]
    fn disjoint_boxes_have_no_candidates() {
        let mut store = TopologyStore::new();
        let ctx = context(&mut store, 5.0);
        for kind in InterferenceKind::PHASES {
            assert!(candidate_pairs(&store, &ctx, kind, false).is_empty());
        }
    }

    #[test]
    fn overlapping_boxes_pair_across_operands_only() {
        let mut store = TopologyStore::new();
        let ctx = context(&mut store, 0.5);
        let pairs = candidate_pairs(&store, &ctx, InterferenceKind::FaceFace, false);
        assert!(!pairs.is_empty());
        for (a, b) in pairs {
            assert_ne!(ctx.shape(a).operands, ctx.shape(b).operands);
        }
    }

    #[test]
    fn self_interference_skips_adjacent_faces() {
        let mut store = TopologyStore::new();
        let ctx = context(&mut store, 5.0);
        let pairs = candidate_pairs(&store, &ctx, InterferenceKind::FaceFace, true);
        // Opposite faces of one box share no vertex but their boxes do not
        // overlap either; adjacent faces share vertices.
        assert!(pairs.is_empty());
    }
}
