use super::edge::EdgeId;
use super::pcurve::Pcurve;

slotmap::new_key_type! {
    /// Unique identifier for a wire in the topology store.
    pub struct WireId;
}

/// An edge with orientation information within a wire.
#[derive(Debug, Clone)]
pub struct OrientedEdge {
    /// The edge identifier.
    pub edge: EdgeId,
    /// If `true`, the edge is traversed in its natural direction (start → end).
    /// If `false`, the edge is traversed in reverse (end → start).
    pub forward: bool,
    /// Image of the edge in the parameter space of the face bounded by
    /// this wire. `None` means it is recovered by projecting the edge
    /// onto the surface.
    pub pcurve: Option<Pcurve>,
}

impl OrientedEdge {
    /// Creates a new oriented edge without a stored pcurve.
    #[must_use]
    pub fn new(edge: EdgeId, forward: bool) -> Self {
        Self {
            edge,
            forward,
            pcurve: None,
        }
    }

    /// Creates an oriented edge carrying its pcurve on the owning face.
    #[must_use]
    pub fn with_pcurve(edge: EdgeId, forward: bool, pcurve: Pcurve) -> Self {
        Self {
            edge,
            forward,
            pcurve: Some(pcurve),
        }
    }
}

/// Data associated with a topological wire.
///
/// A wire is an ordered sequence of oriented edges forming a connected path.
/// It may be open or closed.
#[derive(Debug, Clone)]
pub struct WireData {
    /// The ordered sequence of oriented edges.
    pub edges: Vec<OrientedEdge>,
    /// Whether this wire forms a closed loop.
    pub is_closed: bool,
}
