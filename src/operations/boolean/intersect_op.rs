use crate::error::Result;
use crate::topology::{Shape, TopologyStore};

use super::engine::{BooleanOperation, BooleanOutput};
use super::options::BooleanOptions;
use super::select::BooleanOp;

/// Computes the material common to two shapes.
pub struct Intersect {
    object: Shape,
    tool: Shape,
    options: BooleanOptions,
}

impl Intersect {
    /// Creates a new `Intersect` operation with default options.
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

    /// Executes the intersection. An empty result is `Ok` with no shape.
    ///
    /// # Errors
    ///
    /// Returns an error if the operands are invalid.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<BooleanOutput> {
        BooleanOperation::new(BooleanOp::Intersect)
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

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn nested_box_is_the_common_part() {
        let mut store = TopologyStore::new();
        let outer = MakeBox::new(p(0.0, 0.0, 0.0), p(3.0, 3.0, 3.0))
            .execute(&mut store)
            .unwrap();
        let inner = MakeBox::new(p(1.0, 1.0, 1.0), p(2.0, 2.0, 2.0))
            .execute(&mut store)
            .unwrap();
        let out = Intersect::new(outer, inner).execute(&mut store).unwrap();
        let volume = Volume::new(out.shape.unwrap().id).execute(&store).unwrap();
        assert!((volume - 1.0).abs() < 1e-9);
        assert!(out.report.is_clean());
    }
}
