use crate::error::Result;
use crate::topology::{Shape, TopologyStore};

use super::engine::{BooleanOperation, BooleanOutput};
use super::options::BooleanOptions;
use super::select::BooleanOp;

/// Computes the edges where two shapes meet.
///
/// The result is a wire, or a compound of wires, made of the intersection
/// curves between the faces and the edges the shapes share.
pub struct Section {
    object: Shape,
    tool: Shape,
    options: BooleanOptions,
}

impl Section {
    /// Creates a new `Section` operation with default options.
    #[must_use]
    pub fn new(object: impl Into<Shape>, tool: impl Into<Shape>) -> Self {
        Self {
            object: object.into(),
            tool: tool.into(),
            options: BooleanOptions::default(),
        }
    }

    /// Sets the options.
    #[must_use]
    pub fn with_options(mut self, options: BooleanOptions) -> Self {
        self.options = options;
        self
    }

    /// Executes the section.
    ///
    /// # Errors
    ///
    /// Returns an error if the operands are invalid.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<BooleanOutput> {
        BooleanOperation::new(BooleanOp::Section)
            .with_arguments(vec![self.object])
            .with_tools(vec![self.tool])
            .with_options(self.options.clone())
            .execute(store)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::operations::creation::{MakeBox, MakeSphere};

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn disjoint_shapes_have_no_section() {
        let mut store = TopologyStore::new();
        let a = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let b = MakeSphere::new(p(5.0, 5.0, 5.0), 1.0)
            .execute(&mut store)
            .unwrap();
        let out = Section::new(a, b).execute(&mut store).unwrap();
        assert!(out.shape.is_none());
    }
}
