use super::face::FaceId;

slotmap::new_key_type! {
    /// Unique identifier for a shell in the topology store.
    pub struct ShellId;
}

/// A face used by a shell, possibly with flipped orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrientedFace {
    /// The face identifier.
    pub face: FaceId,
    /// If `false`, the face material side is reversed within this shell.
    pub forward: bool,
}

impl OrientedFace {
    /// Creates a new oriented face.
    #[must_use]
    pub fn new(face: FaceId, forward: bool) -> Self {
        Self { face, forward }
    }
}

/// Data associated with a topological shell.
///
/// A shell is a connected set of faces forming a surface boundary.
/// It may be open or closed.
#[derive(Debug, Clone)]
pub struct ShellData {
    /// The faces that make up this shell.
    pub faces: Vec<OrientedFace>,
    /// Whether this shell is closed (watertight).
    pub is_closed: bool,
}
