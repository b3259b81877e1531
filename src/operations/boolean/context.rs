use std::collections::{HashMap, HashSet};

use crate::error::{OperationError, Result};
use crate::math::Aabb;
use crate::operations::query::face_bounding_box;
use crate::topology::{EdgeId, FaceId, ShapeId, ShapeKind, TopologyStore, VertexId};

use super::interference::{Interference, InterferenceKind};
use super::pave::{CommonBlock, Pave, PaveBlock};

/// Side of the operation an operand belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandGroup {
    /// Arguments the operation is applied to.
    Object,
    /// Arguments applied to the objects.
    Tool,
}

/// One argument of a boolean operation.
#[derive(Debug, Clone, Copy)]
pub struct Operand {
    /// The argument shape.
    pub shape: ShapeId,
    /// Its side of the operation.
    pub group: OperandGroup,
}

/// An entry of the shape index.
#[derive(Debug, Clone)]
pub struct IndexedShape {
    /// The indexed entity.
    pub id: ShapeId,
    /// Ranks of the operands containing it, ascending.
    pub operands: Vec<usize>,
    /// Bounding box enlarged by the tolerance and the fuzzy value.
    pub bbox: Aabb,
    /// Own tolerance of vertices, edges and faces; zero otherwise.
    pub tolerance: f64,
    /// Indices of the direct sub-shapes.
    pub sub_shapes: Vec<usize>,
    /// For faces: orientation inside the first shell that uses it.
    pub face_forward: bool,
}

impl IndexedShape {
    /// Kind of the indexed entity.
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        self.id.kind()
    }
}

/// Intersection data of one boolean operation.
///
/// Owns the shape index, the interference list, the vertex merge table and
/// every pave block. It is created per operation and passed explicitly to
/// each phase.
#[derive(Debug, Default)]
pub struct IntersectionContext {
    operands: Vec<Operand>,
    shapes: Vec<IndexedShape>,
    index: HashMap<ShapeId, usize>,
    fuzzy: f64,
    interferences: Vec<Interference>,
    vertex_parent: HashMap<VertexId, VertexId>,
    vertex_images: HashMap<VertexId, VertexId>,
    pub(crate) extra_paves: HashMap<EdgeId, Vec<Pave>>,
    pub(crate) face_vertices: HashMap<FaceId, Vec<VertexId>>,
    pub(crate) blocks: Vec<PaveBlock>,
    pub(crate) edge_blocks: HashMap<EdgeId, Vec<usize>>,
    pub(crate) common_blocks: Vec<CommonBlock>,
    pub(crate) block_common: HashMap<usize, usize>,
    pub(crate) in_face_blocks: HashMap<FaceId, Vec<usize>>,
    pub(crate) section_blocks: HashMap<FaceId, Vec<usize>>,
    pub(crate) coincident_faces: Vec<(FaceId, FaceId)>,
}

impl IntersectionContext {
    /// Indexes every sub-shape of the operands.
    ///
    /// # Errors
    ///
    /// Returns an error if an operand refers to a missing entity.
    pub fn new(store: &TopologyStore, operands: Vec<Operand>, fuzzy: f64) -> Result<Self> {
        let mut ctx = Self {
            fuzzy,
            ..Self::default()
        };
        for (rank, operand) in operands.iter().enumerate() {
            let mut visited = HashSet::new();
            ctx.visit(store, operand.shape, rank, true, &mut visited)?;
        }
        ctx.operands = operands;
        Ok(ctx)
    }

    fn visit(
        &mut self,
        store: &TopologyStore,
        id: ShapeId,
        rank: usize,
        forward: bool,
        visited: &mut HashSet<ShapeId>,
    ) -> Result<usize> {
        let first_in_operand = visited.insert(id);
        if let Some(&i) = self.index.get(&id) {
            if first_in_operand {
                if !self.shapes[i].operands.contains(&rank) {
                    self.shapes[i].operands.push(rank);
                }
                for sub in self.shapes[i].sub_shapes.clone() {
                    let sub_id = self.shapes[sub].id;
                    self.visit(store, sub_id, rank, true, visited)?;
                }
            }
            return Ok(i);
        }

        let children: Vec<(ShapeId, bool)> = match id {
            ShapeId::Shell(s) => store
                .shell(s)?
                .faces
                .iter()
                .map(|of| (ShapeId::Face(of.face), of.forward))
                .collect(),
            _ => store
                .sub_shapes(id)?
                .into_iter()
                .map(|c| (c, true))
                .collect(),
        };
        let mut sub_shapes = Vec::with_capacity(children.len());
        for (child, child_forward) in children {
            sub_shapes.push(self.visit(store, child, rank, child_forward, visited)?);
        }

        let (bbox, tolerance) = match id {
            ShapeId::Vertex(v) => {
                let vertex = store.vertex(v)?;
                (
                    Aabb::from_points(&[vertex.point]).enlarged(vertex.tolerance + self.fuzzy),
                    vertex.tolerance,
                )
            }
            ShapeId::Edge(e) => {
                let edge = store.edge(e)?;
                (
                    edge.bounding_box().enlarged(edge.tolerance + self.fuzzy),
                    edge.tolerance,
                )
            }
            ShapeId::Face(f) => {
                let face = store.face(f)?;
                (
                    face_bounding_box(store, f)?.enlarged(face.tolerance + self.fuzzy),
                    face.tolerance,
                )
            }
            _ => {
                let mut bbox = Aabb::empty();
                for &sub in &sub_shapes {
                    bbox.merge(&self.shapes[sub].bbox);
                }
                (bbox, 0.0)
            }
        };

        let i = self.shapes.len();
        self.shapes.push(IndexedShape {
            id,
            operands: vec![rank],
            bbox,
            tolerance,
            sub_shapes,
            face_forward: forward,
        });
        self.index.insert(id, i);
        Ok(i)
    }

    /// The operands in rank order.
    #[must_use]
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// The fuzzy value of the operation.
    #[must_use]
    pub fn fuzzy(&self) -> f64 {
        self.fuzzy
    }

    /// Number of indexed shapes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Returns `true` if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// The entry at `index`.
    #[must_use]
    pub fn shape(&self, index: usize) -> &IndexedShape {
        &self.shapes[index]
    }

    /// The vertex stored at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is not a vertex.
    pub fn vertex_id(&self, index: usize) -> Result<VertexId> {
        match self.shapes[index].id {
            ShapeId::Vertex(v) => Ok(v),
            other => Err(unexpected(other, ShapeKind::Vertex)),
        }
    }

    /// The edge stored at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is not an edge.
    pub fn edge_id(&self, index: usize) -> Result<EdgeId> {
        match self.shapes[index].id {
            ShapeId::Edge(e) => Ok(e),
            other => Err(unexpected(other, ShapeKind::Edge)),
        }
    }

    /// The face stored at `index`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is not a face.
    pub fn face_id(&self, index: usize) -> Result<FaceId> {
        match self.shapes[index].id {
            ShapeId::Face(f) => Ok(f),
            other => Err(unexpected(other, ShapeKind::Face)),
        }
    }

    /// Every operand edge, in index order.
    #[must_use]
    pub fn edges(&self) -> Vec<EdgeId> {
        self.shapes
            .iter()
            .filter_map(|s| match s.id {
                ShapeId::Edge(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    /// Every operand face, in index order.
    #[must_use]
    pub fn faces(&self) -> Vec<FaceId> {
        self.shapes
            .iter()
            .filter_map(|s| match s.id {
                ShapeId::Face(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    /// Index of an operand sub-shape.
    #[must_use]
    pub fn index_of(&self, id: ShapeId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Indices of every entry of the given kind, ascending.
    #[must_use]
    pub fn indices_of_kind(&self, kind: ShapeKind) -> Vec<usize> {
        (0..self.shapes.len())
            .filter(|&i| self.shapes[i].kind() == kind)
            .collect()
    }

    /// Lowest-ranked operand containing the entity, if it is indexed.
    #[must_use]
    pub fn first_operand_of(&self, id: ShapeId) -> Option<usize> {
        self.index_of(id)
            .and_then(|i| self.shapes[i].operands.iter().min().copied())
    }

    /// Whether `id` is part of operand `rank`.
    #[must_use]
    pub fn belongs_to(&self, id: ShapeId, rank: usize) -> bool {
        self.index_of(id)
            .is_some_and(|i| self.shapes[i].operands.contains(&rank))
    }

    /// Vertex indices below entry `index`, including itself for a vertex.
    #[must_use]
    pub fn vertex_indices(&self, index: usize) -> HashSet<usize> {
        let mut found = HashSet::new();
        let mut stack = vec![index];
        while let Some(i) = stack.pop() {
            if self.shapes[i].kind() == ShapeKind::Vertex {
                found.insert(i);
            } else {
                stack.extend(self.shapes[i].sub_shapes.iter().copied());
            }
        }
        found
    }

    // --- Interferences ---

    /// Appends an interference and returns its position.
    pub fn push_interference(&mut self, interference: Interference) -> usize {
        self.interferences.push(interference);
        self.interferences.len() - 1
    }

    /// Every interference recorded so far.
    #[must_use]
    pub fn interferences(&self) -> &[Interference] {
        &self.interferences
    }

    /// Positions of the interferences of one kind.
    #[must_use]
    pub fn interferences_of_kind(&self, kind: InterferenceKind) -> Vec<usize> {
        (0..self.interferences.len())
            .filter(|&i| self.interferences[i].kind == kind)
            .collect()
    }

    /// Binds a vertex to a point interference and marks it consumed.
    pub fn consume_interference(&mut self, position: usize, vertex: Option<VertexId>) {
        let interference = &mut self.interferences[position];
        if vertex.is_some() {
            interference.vertex = vertex;
        }
        interference.consumed = true;
    }

    // --- Vertex merging ---

    /// Representative of the merge group of `v`.
    #[must_use]
    pub fn find_vertex(&self, v: VertexId) -> VertexId {
        let mut root = v;
        while let Some(&parent) = self.vertex_parent.get(&root) {
            if parent == root {
                break;
            }
            root = parent;
        }
        root
    }

    /// Puts two vertices into the same merge group.
    pub fn union_vertices(&mut self, a: VertexId, b: VertexId) {
        let (ra, rb) = (self.find_vertex(a), self.find_vertex(b));
        if ra != rb {
            let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.vertex_parent.insert(child, root);
        }
    }

    /// Members of every merge group with more than one vertex, keyed by the
    /// group representative.
    #[must_use]
    pub fn vertex_groups(&self) -> HashMap<VertexId, Vec<VertexId>> {
        let mut groups: HashMap<VertexId, Vec<VertexId>> = HashMap::new();
        for &v in self.vertex_parent.keys() {
            groups.entry(self.find_vertex(v)).or_default().push(v);
        }
        for (root, members) in &mut groups {
            if !members.contains(root) {
                members.push(*root);
            }
            members.sort_unstable();
        }
        groups
    }

    /// Sets the vertex that replaces a merge group in the result.
    pub fn set_vertex_image(&mut self, root: VertexId, image: VertexId) {
        self.vertex_images.insert(root, image);
    }

    /// The vertex that stands for `v` in the result.
    #[must_use]
    pub fn vertex_image(&self, v: VertexId) -> VertexId {
        let root = self.find_vertex(v);
        self.vertex_images.get(&root).copied().unwrap_or(root)
    }

    // --- Pave blocks ---

    /// Stores a block and returns its index.
    pub fn add_block(&mut self, block: PaveBlock) -> usize {
        let i = self.blocks.len();
        self.edge_blocks.entry(block.edge).or_default().push(i);
        self.blocks.push(block);
        i
    }

    /// The block at `index`.
    #[must_use]
    pub fn block(&self, index: usize) -> &PaveBlock {
        &self.blocks[index]
    }

    /// Blocks of an edge in increasing parameter order.
    #[must_use]
    pub fn blocks_of(&self, edge: EdgeId) -> &[usize] {
        self.edge_blocks.get(&edge).map_or(&[], Vec::as_slice)
    }

    /// The common block containing `block`, if any.
    #[must_use]
    pub fn common_block_of(&self, block: usize) -> Option<&CommonBlock> {
        self.block_common
            .get(&block)
            .map(|&c| &self.common_blocks[c])
    }

    /// Whether two faces were found to lie on the same surface.
    #[must_use]
    pub fn faces_coincide(&self, a: FaceId, b: FaceId) -> bool {
        self.coincident_faces
            .iter()
            .any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
    }
}

fn unexpected(found: ShapeId, wanted: ShapeKind) -> crate::error::GeoboolError {
    OperationError::Failed(format!("expected a {wanted:?}, found {found:?}")).into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::operations::creation::MakeBox;

    fn boxes(store: &mut TopologyStore) -> (ShapeId, ShapeId) {
        let a = MakeBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
            .execute(store)
            .unwrap();
        let b = MakeBox::new(Point3::new(0.5, 0.5, 0.5), Point3::new(2.0, 2.0, 2.0))
            .execute(store)
            .unwrap();
        (a.into(), b.into())
    }

    #[test]
    fn indexes_each_sub_shape_once() {
        let mut store = TopologyStore::new();
        let (a, b) = boxes(&mut store);
        let ctx = IntersectionContext::new(
            &store,
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
        assert_eq!(ctx.indices_of_kind(ShapeKind::Vertex).len(), 16);
        assert_eq!(ctx.indices_of_kind(ShapeKind::Edge).len(), 24);
        assert_eq!(ctx.indices_of_kind(ShapeKind::Face).len(), 12);
        let face = ctx.indices_of_kind(ShapeKind::Face)[0];
        assert_eq!(ctx.shape(face).operands, vec![0]);
        assert_eq!(ctx.vertex_indices(face).len(), 4);
    }

    #[test]
    fn shared_operand_records_both_ranks() {
        let mut store = TopologyStore::new();
        let (a, _) = boxes(&mut store);
        let ctx = IntersectionContext::new(
            &store,
            vec![
                Operand {
                    shape: a,
                    group: OperandGroup::Object,
                },
                Operand {
                    shape: a,
                    group: OperandGroup::Tool,
                },
            ],
            0.0,
        )
        .unwrap();
        for i in ctx.indices_of_kind(ShapeKind::Edge) {
            assert_eq!(ctx.shape(i).operands, vec![0, 1]);
        }
    }

    #[test]
    fn vertex_merge_groups() {
        let mut store = TopologyStore::new();
        let v: Vec<VertexId> = (0..4)
            .map(|i| {
                store.add_vertex(crate::topology::VertexData::new(Point3::new(
                    f64::from(i),
                    0.0,
                    0.0,
                )))
            })
            .collect();
        let mut ctx = IntersectionContext::default();
        ctx.union_vertices(v[0], v[1]);
        ctx.union_vertices(v[2], v[1]);
        assert_eq!(ctx.find_vertex(v[2]), ctx.find_vertex(v[0]));
        assert_ne!(ctx.find_vertex(v[3]), ctx.find_vertex(v[0]));
        let groups = ctx.vertex_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.values().next().unwrap().len(), 3);
        let root = ctx.find_vertex(v[0]);
        ctx.set_vertex_image(root, v[3]);
        assert_eq!(ctx.vertex_image(v[1]), v[3]);
    }
}
