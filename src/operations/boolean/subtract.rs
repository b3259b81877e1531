use crate::error::Result;
use crate::topology::{Shape, TopologyStore};

use super::engine::{BooleanOperation, BooleanOutput};
use super::options::BooleanOptions;
use super::select::BooleanOp;

/// Removes the material of a tool from an object.
pub struct Subtract {
    object: Shape,
    tool: Shape,
    options: BooleanOptions,
}

impl Subtract {
    /// Creates a new `Subtract` operation computing `object - tool`.
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

    /// Executes the subtraction.
    ///
    /// # Errors
    ///
    /// Returns an error if the operands are invalid or the object has a
    /// higher dimension than the tool.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<BooleanOutput> {
        BooleanOperation::new(BooleanOp::Subtract)
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
    use crate::operations::creation::MakeBox;
    use crate::operations::query::Volume;
    use crate::topology::ShapeKind;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn inner_box_leaves_a_void() {
        let mut store = TopologyStore::new();
        let outer = MakeBox::new(p(0.0, 0.0, 0.0), p(3.0, 3.0, 3.0))
            .execute(&mut store)
            .unwrap();
        let inner = MakeBox::new(p(1.0, 1.0, 1.0), p(2.0, 2.0, 2.0))
            .execute(&mut store)
            .unwrap();
        let out = Subtract::new(outer, inner).execute(&mut store).unwrap();
        let shape = out.shape.unwrap();
        assert_eq!(shape.kind(), ShapeKind::Solid);
        let volume = Volume::new(shape.id).execute(&store).unwrap();
        assert!((volume - 26.0).abs() < 1e-9);
    }
}
