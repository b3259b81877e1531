use std::collections::BTreeSet;

use crate::topology::{EdgeId, ShapeId};

use super::classify::{Piece, PieceState, Sense};
use super::context::{IntersectionContext, OperandGroup};

/// The type of boolean operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanOp {
    /// Material of the objects or the tools.
    Union,
    /// Material common to the objects and the tools.
    Intersect,
    /// Material of the objects outside the tools.
    Subtract,
    /// The curves and coincident edges where objects and tools meet.
    Section,
}

/// Decision about whether to keep a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepDecision {
    Keep,
    KeepFlipped,
    Discard,
}

/// Determines whether a piece should be kept based on its state relative
/// to one operand of the other group.
///
/// | Piece from | vs other group | Union   | Subtract(A-B) | Intersect |
/// |------------|---------------|---------|---------------|-----------|
/// | objects    | Out           | keep    | keep          | discard   |
/// | objects    | In            | discard | discard       | keep      |
/// | objects    | On, same      | keep    | discard       | keep      |
/// | objects    | On, opposite  | discard | keep          | discard   |
/// | tools      | Out           | keep    | discard       | discard   |
/// | tools      | In            | discard | keep (flip)   | keep      |
/// | tools      | On            | discard | discard       | discard   |
///
/// Boundary pieces shared by both groups are taken from the objects only.
#[allow(clippy::match_same_arms)]
#[must_use]
pub fn should_keep_piece(group: OperandGroup, state: PieceState, op: BooleanOp) -> KeepDecision {
    use OperandGroup::{Object, Tool};
    match (group, state, op) {
        (_, _, BooleanOp::Section) => KeepDecision::Discard,

        (Object, PieceState::Out, BooleanOp::Union) => KeepDecision::Keep,
        (Object, PieceState::Out, BooleanOp::Subtract) => KeepDecision::Keep,
        (Object, PieceState::Out, BooleanOp::Intersect) => KeepDecision::Discard,

        (Object, PieceState::In, BooleanOp::Union) => KeepDecision::Discard,
        (Object, PieceState::In, BooleanOp::Subtract) => KeepDecision::Discard,
        (Object, PieceState::In, BooleanOp::Intersect) => KeepDecision::Keep,

        (Object, PieceState::On(Sense::Same), BooleanOp::Union) => KeepDecision::Keep,
        (Object, PieceState::On(Sense::Same), BooleanOp::Subtract) => KeepDecision::Discard,
        (Object, PieceState::On(Sense::Same), BooleanOp::Intersect) => KeepDecision::Keep,

        (Object, PieceState::On(Sense::Opposite), BooleanOp::Union) => KeepDecision::Discard,
        (Object, PieceState::On(Sense::Opposite), BooleanOp::Subtract) => KeepDecision::Keep,
        (Object, PieceState::On(Sense::Opposite), BooleanOp::Intersect) => KeepDecision::Discard,

        (Tool, PieceState::Out, BooleanOp::Union) => KeepDecision::Keep,
        (Tool, PieceState::Out, BooleanOp::Subtract) => KeepDecision::Discard,
        (Tool, PieceState::Out, BooleanOp::Intersect) => KeepDecision::Discard,

        (Tool, PieceState::In, BooleanOp::Union) => KeepDecision::Discard,
        (Tool, PieceState::In, BooleanOp::Subtract) => KeepDecision::KeepFlipped,
        (Tool, PieceState::In, BooleanOp::Intersect) => KeepDecision::Keep,

        (Tool, PieceState::On(_), _) => KeepDecision::Discard,
    }
}

/// Whether the other-group verdicts must all keep the piece, or one is
/// enough. Union and the object side of a subtraction need every operand
/// of the other group to agree; the rest need one.
fn needs_all(group: OperandGroup, op: BooleanOp) -> bool {
    matches!(
        (group, op),
        (_, BooleanOp::Union) | (OperandGroup::Object, BooleanOp::Subtract)
    )
}

/// Whether a piece is hidden by another operand of its own group: it lies
/// inside that operand, or on its boundary facing away, or on it with the
/// same sense when that operand ranks lower and supplies the copy.
fn hidden_by_own_group(state: PieceState, own_rank: usize, other_rank: usize) -> bool {
    match state {
        PieceState::In | PieceState::On(Sense::Opposite) => true,
        PieceState::On(Sense::Same) => other_rank < own_rank,
        PieceState::Out => false,
    }
}

/// Decides every piece of a solid-building operation.
#[must_use]
pub fn select_pieces(ctx: &IntersectionContext, pieces: &[Piece], op: BooleanOp) -> Vec<KeepDecision> {
    let operands = ctx.operands();
    pieces
        .iter()
        .map(|piece| {
            let Some(&own_rank) = piece.operands.first() else {
                return KeepDecision::Discard;
            };
            let group = operands[own_rank].group;
            let all = needs_all(group, op);
            let mut kept: Option<KeepDecision> = None;
            for (rank, operand) in operands.iter().enumerate() {
                if rank == own_rank {
                    continue;
                }
                let state = piece.states[rank];
                if operand.group == group {
                    if hidden_by_own_group(state, own_rank, rank) {
                        return KeepDecision::Discard;
                    }
                    continue;
                }
                match should_keep_piece(group, state, op) {
                    KeepDecision::Discard if all => return KeepDecision::Discard,
                    KeepDecision::Discard => {}
                    decision => {
                        kept.get_or_insert(decision);
                    }
                }
            }
            kept.unwrap_or(KeepDecision::Discard)
        })
        .collect()
}

/// Split edges where objects and tools meet: section edges, edges shared
/// between the groups and edges lying inside faces of the other group.
#[must_use]
pub fn section_edges(ctx: &IntersectionContext) -> Vec<EdgeId> {
    let operands = ctx.operands();
    let groups_of = |edge: EdgeId| -> BTreeSet<bool> {
        ctx.index_of(ShapeId::Edge(edge))
            .map(|i| {
                ctx.shape(i)
                    .operands
                    .iter()
                    .map(|&r| operands[r].group == OperandGroup::Object)
                    .collect()
            })
            .unwrap_or_default()
    };

    let mut edges = BTreeSet::new();
    for blocks in ctx.section_blocks.values() {
        edges.extend(blocks.iter().filter_map(|&b| ctx.block(b).split_edge));
    }
    for blocks in ctx.in_face_blocks.values() {
        edges.extend(blocks.iter().filter_map(|&b| ctx.block(b).split_edge));
    }
    for common in &ctx.common_blocks {
        let mut groups = BTreeSet::new();
        for &b in &common.blocks {
            groups.extend(groups_of(ctx.block(b).edge));
        }
        if groups.len() > 1 {
            edges.extend(common.blocks.first().and_then(|&b| ctx.block(b).split_edge));
        }
    }
    edges.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use OperandGroup::{Object, Tool};

    #[test]
    fn union_keeps_outside_pieces() {
        assert_eq!(
            should_keep_piece(Object, PieceState::Out, BooleanOp::Union),
            KeepDecision::Keep
        );
        assert_eq!(
            should_keep_piece(Tool, PieceState::Out, BooleanOp::Union),
            KeepDecision::Keep
        );
        assert_eq!(
            should_keep_piece(Tool, PieceState::In, BooleanOp::Union),
            KeepDecision::Discard
        );
    }

    #[test]
    fn shared_boundary_is_kept_once() {
        for op in [BooleanOp::Union, BooleanOp::Intersect] {
            assert_eq!(
                should_keep_piece(Object, PieceState::On(Sense::Same), op),
                KeepDecision::Keep
            );
            assert_eq!(
                should_keep_piece(Tool, PieceState::On(Sense::Same), op),
                KeepDecision::Discard
            );
        }
    }

    #[test]
    fn subtract_flips_tool_pieces_inside_objects() {
        assert_eq!(
            should_keep_piece(Tool, PieceState::In, BooleanOp::Subtract),
            KeepDecision::KeepFlipped
        );
        assert_eq!(
            should_keep_piece(Object, PieceState::On(Sense::Opposite), BooleanOp::Subtract),
            KeepDecision::Keep
        );
        assert_eq!(
            should_keep_piece(Object, PieceState::On(Sense::Same), BooleanOp::Subtract),
            KeepDecision::Discard
        );
    }

    #[test]
    fn own_group_rules() {
        assert!(hidden_by_own_group(PieceState::In, 1, 0));
        assert!(hidden_by_own_group(PieceState::On(Sense::Same), 1, 0));
        assert!(!hidden_by_own_group(PieceState::On(Sense::Same), 0, 1));
        assert!(!hidden_by_own_group(PieceState::Out, 1, 0));
    }

    #[test]
    fn quantifiers() {
        assert!(needs_all(Tool, BooleanOp::Union));
        assert!(needs_all(Object, BooleanOp::Subtract));
        assert!(!needs_all(Tool, BooleanOp::Subtract));
        assert!(!needs_all(Object, BooleanOp::Intersect));
    }
}
