use crate::error::{Result, TopologyError};
use crate::topology::{CompoundData, CompoundId, Shape, TopologyStore};

/// Groups existing shapes into a compound.
pub struct MakeCompound {
    members: Vec<Shape>,
}

impl MakeCompound {
    /// Creates a new `MakeCompound` operation.
    #[must_use]
    pub fn new(members: Vec<Shape>) -> Self {
        Self { members }
    }

    /// Executes the operation, creating the compound in the topology store.
    ///
    /// # Errors
    ///
    /// Returns an error if a member is not in the store.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<CompoundId> {
        if let Some(missing) = self.members.iter().find(|m| !store.contains(m.id)) {
            return Err(TopologyError::EntityNotFound(format!("{:?}", missing.kind())).into());
        }
        Ok(store.add_compound(CompoundData {
            members: self.members.clone(),
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::operations::creation::{MakeBox, MakeEdge};
    use crate::topology::{ShapeId, ShapeKind};

    #[test]
    fn mixed_dimension_compound() {
        let mut store = TopologyStore::new();
        let b = MakeBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let e = MakeEdge::new(Point3::new(3.0, 0.0, 0.0), Point3::new(4.0, 0.0, 0.0))
            .execute(&mut store)
            .unwrap();
        let c = MakeCompound::new(vec![b.into(), e.into()])
            .execute(&mut store)
            .unwrap();
        let root = ShapeId::Compound(c);
        assert_eq!(store.dimension(root).unwrap(), Some(3));
        assert_eq!(store.explore(root, ShapeKind::Edge).unwrap().len(), 13);
    }
}
