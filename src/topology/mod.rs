pub mod compound;
pub mod edge;
pub mod face;
pub mod pcurve;
pub mod shape;
pub mod shell;
pub mod solid;
pub mod vertex;
pub mod wire;

pub use compound::{CompoundData, CompoundId};
pub use edge::{EdgeCurve, EdgeData, EdgeId};
pub use face::{FaceData, FaceId, FaceSurface};
pub use pcurve::Pcurve;
pub use shape::{Orientation, Shape, ShapeId, ShapeKind};
pub use shell::{OrientedFace, ShellData, ShellId};
pub use solid::{SolidData, SolidId};
pub use vertex::{VertexData, VertexId};
pub use wire::{OrientedEdge, WireData, WireId};

use std::collections::HashSet;

use crate::error::TopologyError;
use slotmap::SlotMap;

/// Central arena that owns all topological entities.
///
/// Entities reference each other via typed IDs (generational indices),
/// avoiding self-referential structures. The store is append-only: an
/// entity never changes after insertion, so any number of shapes can
/// share it safely.
#[derive(Debug, Default)]
pub struct TopologyStore {
    vertices: SlotMap<VertexId, VertexData>,
    edges: SlotMap<EdgeId, EdgeData>,
    wires: SlotMap<WireId, WireData>,
    faces: SlotMap<FaceId, FaceData>,
    shells: SlotMap<ShellId, ShellData>,
    solids: SlotMap<SolidId, SolidData>,
    compounds: SlotMap<CompoundId, CompoundData>,
}

impl TopologyStore {
    /// Creates a new, empty topology store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Vertex operations ---

    /// Inserts a vertex and returns its ID.
    pub fn add_vertex(&mut self, data: VertexData) -> VertexId {
        self.vertices.insert(data)
    }

    /// Returns a reference to the vertex data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn vertex(&self, id: VertexId) -> Result<&VertexData, TopologyError> {
        self.vertices
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("vertex".into()))
    }

    // --- Edge operations ---

    /// Inserts a edge and returns its ID.
    pub fn add_edge(&mut self, data: EdgeData) -> EdgeId {
        self.edges.insert(data)
    }

    /// Returns a reference to the edge data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn edge(&self, id: EdgeId) -> Result<&EdgeData, TopologyError> {
        self.edges
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("edge".into()))
    }

    // --- Wire operations ---

    /// Inserts a wire and returns its ID.
    pub fn add_wire(&mut self, data: WireData) -> WireId {
        self.wires.insert(data)
    }

    /// Returns a reference to the wire data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn wire(&self, id: WireId) -> Result<&WireData, TopologyError> {
        self.wires
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("wire".into()))
    }

    // --- Face operations ---

    /// Inserts a face and returns its ID.
    pub fn add_face(&mut self, data: FaceData) -> FaceId {
        self.faces.insert(data)
    }

    /// Returns a reference to the face data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn face(&self, id: FaceId) -> Result<&FaceData, TopologyError> {
        self.faces
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("face".into()))
    }

    // --- Shell operations ---

    /// Inserts a shell and returns its ID.
    pub fn add_shell(&mut self, data: ShellData) -> ShellId {
        self.shells.insert(data)
    }

    /// Returns a reference to the shell data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn shell(&self, id: ShellId) -> Result<&ShellData, TopologyError> {
        self.shells
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("shell".into()))
    }

    // --- Solid operations ---

    /// Inserts a solid and returns its ID.
    pub fn add_solid(&mut self, data: SolidData) -> SolidId {
        self.solids.insert(data)
    }

    /// Returns a reference to the solid data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn solid(&self, id: SolidId) -> Result<&SolidData, TopologyError> {
        self.solids
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("solid".into()))
    }

    // --- Compound operations ---

    /// Inserts a compound and returns its ID.
    pub fn add_compound(&mut self, data: CompoundData) -> CompoundId {
        self.compounds.insert(data)
    }

    /// Returns a reference to the compound data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn compound(&self, id: CompoundId) -> Result<&CompoundData, TopologyError> {
        self.compounds
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("compound".into()))
    }

    // --- Shape queries ---

    /// Returns `true` if the referenced entity exists.
    #[must_use]
    pub fn contains(&self, id: ShapeId) -> bool {
        match id {
            ShapeId::Vertex(v) => self.vertices.contains_key(v),
            ShapeId::Edge(e) => self.edges.contains_key(e),
            ShapeId::Wire(w) => self.wires.contains_key(w),
            ShapeId::Face(f) => self.faces.contains_key(f),
            ShapeId::Shell(s) => self.shells.contains_key(s),
            ShapeId::Solid(s) => self.solids.contains_key(s),
            ShapeId::Compound(c) => self.compounds.contains_key(c),
        }
    }

    /// Returns the direct sub-shapes of `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` or one of its references is missing.
    pub fn sub_shapes(&self, id: ShapeId) -> Result<Vec<ShapeId>, TopologyError> {
        Ok(match id {
            ShapeId::Vertex(_) => Vec::new(),
            ShapeId::Edge(e) => {
                let edge = self.edge(e)?;
                if edge.start == edge.end {
                    vec![ShapeId::Vertex(edge.start)]
                } else {
                    vec![ShapeId::Vertex(edge.start), ShapeId::Vertex(edge.end)]
                }
            }
            ShapeId::Wire(w) => self
                .wire(w)?
                .edges
                .iter()
                .map(|oe| ShapeId::Edge(oe.edge))
                .collect(),
            ShapeId::Face(f) => self.face(f)?.wires().map(ShapeId::Wire).collect(),
            ShapeId::Shell(s) => self
                .shell(s)?
                .faces
                .iter()
                .map(|of| ShapeId::Face(of.face))
                .collect(),
            ShapeId::Solid(s) => {
                let solid = self.solid(s)?;
                std::iter::once(solid.outer_shell)
                    .chain(solid.inner_shells.iter().copied())
                    .map(ShapeId::Shell)
                    .collect()
            }
            ShapeId::Compound(c) => self.compound(c)?.members.iter().map(|m| m.id).collect(),
        })
    }

    /// Collects the distinct sub-shapes of `root` with the given kind, in
    /// depth-first order. `root` itself is included if it has that kind.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced entity is missing.
    pub fn explore(&self, root: ShapeId, kind: ShapeKind) -> Result<Vec<ShapeId>, TopologyError> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            if id.kind() == kind {
                found.push(id);
                continue;
            }
            if id.kind() < kind {
                continue;
            }
            let mut children = self.sub_shapes(id)?;
            children.reverse();
            stack.extend(children);
        }
        Ok(found)
    }

    /// Topological dimension of a shape; the maximum over members for
    /// compounds, `None` for an empty compound.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced entity is missing.
    pub fn dimension(&self, id: ShapeId) -> Result<Option<u8>, TopologyError> {
        if let Some(dim) = id.kind().dimension() {
            return Ok(Some(dim));
        }
        let mut best = None;
        for child in self.sub_shapes(id)? {
            best = best.max(self.dimension(child)?);
        }
        Ok(best)
    }
}
