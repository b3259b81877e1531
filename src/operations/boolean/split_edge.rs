use tracing::debug;

use crate::error::Result;
use crate::geometry::curve::Curve;
use crate::math::TOLERANCE;
use crate::topology::{EdgeData, EdgeId, TopologyStore};

use super::context::IntersectionContext;
use super::pave::PaveBlock;

/// Whether `block` is its whole edge, unchanged.
fn is_whole_edge(block: &PaveBlock, edge: &EdgeData) -> bool {
    block.pave1.vertex == edge.start
        && block.pave2.vertex == edge.end
        && (block.pave1.param - edge.t_start).abs() <= TOLERANCE
        && (block.pave2.param - edge.t_end).abs() <= TOLERANCE
}

/// Creates the edge carrying one block: the original edge when the block
/// covers it unchanged, otherwise a new edge on the same curve.
fn edge_for_block(
    store: &mut TopologyStore,
    block: &PaveBlock,
    single: bool,
    tolerance: f64,
) -> Result<EdgeId> {
    let edge = store.edge(block.edge)?;
    if single && is_whole_edge(block, edge) && edge.tolerance >= tolerance {
        return Ok(block.edge);
    }
    let data = EdgeData::new(
        block.pave1.vertex,
        block.pave2.vertex,
        edge.curve.clone(),
        block.pave1.param,
        block.pave2.param,
    )
    .with_tolerance(tolerance);
    Ok(store.add_edge(data))
}

/// Gives every pave block an edge of its own.
///
/// Blocks of a common block share one edge; each member records whether
/// it runs the same way as that edge. An operand edge left with a single
/// unchanged block keeps its identity.
///
/// # Errors
///
/// Returns an error if the store is inconsistent.
pub fn split_edges(store: &mut TopologyStore, ctx: &mut IntersectionContext) -> Result<usize> {
    let mut created = 0;
    for c in 0..ctx.common_blocks.len() {
        let members = ctx.common_blocks[c].blocks.clone();
        let Some(&leader) = members.first() else {
            continue;
        };
        let mut tolerance = 0.0_f64;
        for &b in &members {
            tolerance = tolerance.max(store.edge(ctx.block(b).edge)?.tolerance);
        }
        let leader_block = ctx.block(leader).clone();
        let single = ctx.blocks_of(leader_block.edge).len() == 1;
        let split = edge_for_block(store, &leader_block, single, tolerance)?;
        if split != leader_block.edge {
            created += 1;
        }
        let split_data = store.edge(split)?;
        let reference = split_data
            .curve
            .tangent(0.5 * (split_data.t_start + split_data.t_end))?;
        for &b in &members {
            let block = ctx.block(b);
            let curve = &store.edge(block.edge)?.curve;
            let mid = block.mid_param();
            let same_sense = curve.tangent(mid)?.dot(&reference) > 0.0;
            let block = &mut ctx.blocks[b];
            block.split_edge = Some(split);
            block.same_sense = same_sense;
        }
    }

    for e in ctx.edges() {
        let blocks = ctx.blocks_of(e).to_vec();
        let single = blocks.len() == 1;
        let tolerance = store.edge(e)?.tolerance;
        for b in blocks {
            if ctx.blocks[b].split_edge.is_some() {
                continue;
            }
            let block = ctx.blocks[b].clone();
            let split = edge_for_block(store, &block, single, tolerance)?;
            if split != e {
                created += 1;
            }
            ctx.blocks[b].split_edge = Some(split);
        }
    }
    debug!(created, "split edges built");
    Ok(created)
}
