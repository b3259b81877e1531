use super::compound::CompoundId;
use super::edge::EdgeId;
use super::face::FaceId;
use super::shell::ShellId;
use super::solid::SolidId;
use super::vertex::VertexId;
use super::wire::WireId;

/// The kind of a topological entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShapeKind {
    Vertex,
    Edge,
    Wire,
    Face,
    Shell,
    Solid,
    Compound,
}

impl ShapeKind {
    /// Topological dimension of the kind. Compounds have none of their own.
    #[must_use]
    pub fn dimension(self) -> Option<u8> {
        match self {
            Self::Vertex => Some(0),
            Self::Edge | Self::Wire => Some(1),
            Self::Face | Self::Shell => Some(2),
            Self::Solid => Some(3),
            Self::Compound => None,
        }
    }
}

/// Typed reference to any entity of the topology store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeId {
    Vertex(VertexId),
    Edge(EdgeId),
    Wire(WireId),
    Face(FaceId),
    Shell(ShellId),
    Solid(SolidId),
    Compound(CompoundId),
}

impl ShapeId {
    /// Returns the kind of the referenced entity.
    #[must_use]
    pub fn kind(self) -> ShapeKind {
        match self {
            Self::Vertex(_) => ShapeKind::Vertex,
            Self::Edge(_) => ShapeKind::Edge,
            Self::Wire(_) => ShapeKind::Wire,
            Self::Face(_) => ShapeKind::Face,
            Self::Shell(_) => ShapeKind::Shell,
            Self::Solid(_) => ShapeKind::Solid,
            Self::Compound(_) => ShapeKind::Compound,
        }
    }
}

macro_rules! impl_from_id {
    ($($id:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$id> for ShapeId {
                fn from(id: $id) -> Self {
                    Self::$variant(id)
                }
            }

            impl From<$id> for Shape {
                fn from(id: $id) -> Self {
                    Shape::new(ShapeId::$variant(id))
                }
            }
        )*
    };
}

impl_from_id!(
    VertexId => Vertex,
    EdgeId => Edge,
    WireId => Wire,
    FaceId => Face,
    ShellId => Shell,
    SolidId => Solid,
    CompoundId => Compound,
);

/// Orientation of a shape reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    #[default]
    Forward,
    Reversed,
}

impl Orientation {
    /// Returns the opposite orientation.
    #[must_use]
    pub fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Reversed,
            Self::Reversed => Self::Forward,
        }
    }
}

/// A handle to a shape in the topology store.
///
/// Handles are cheap to copy; the referenced entities are shared, never
/// duplicated, so unchanged parts of operands can appear in results as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    /// The referenced entity.
    pub id: ShapeId,
    /// Orientation of this use of the entity.
    pub orientation: Orientation,
}

impl Shape {
    /// Creates a forward handle to `id`.
    #[must_use]
    pub fn new(id: ShapeId) -> Self {
        Self {
            id,
            orientation: Orientation::Forward,
        }
    }

    /// Returns the same shape with flipped orientation.
    #[must_use]
    pub fn reversed(self) -> Self {
        Self {
            id: self.id,
            orientation: self.orientation.reversed(),
        }
    }

    /// Returns the kind of the referenced entity.
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        self.id.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn kind_and_dimension() {
        let mut faces: SlotMap<FaceId, ()> = SlotMap::with_key();
        let f = faces.insert(());
        let shape = Shape::from(f);
        assert_eq!(shape.kind(), ShapeKind::Face);
        assert_eq!(shape.kind().dimension(), Some(2));
        assert_eq!(ShapeKind::Compound.dimension(), None);
    }

    #[test]
    fn reversing_twice_is_identity() {
        let mut solids: SlotMap<SolidId, ()> = SlotMap::with_key();
        let s = Shape::from(solids.insert(()));
        assert_eq!(s.reversed().orientation, Orientation::Reversed);
        assert_eq!(s.reversed().reversed(), s);
    }
}
