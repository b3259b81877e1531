use crate::error::Result;
use crate::topology::{Shape, TopologyStore};

use super::engine::{BooleanOperation, BooleanOutput};
use super::options::BooleanOptions;
use super::select::BooleanOp;

/// Fuses two shapes of the same dimension.
pub struct Union {
    object: Shape,
    tool: Shape,
    options: BooleanOptions,
}

impl Union {
    /// Creates a new `Union` operation with default options.
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

    /// Executes the union, inserting the result into the topology store.
    ///
    /// # Errors
    ///
    /// Returns an error if the operands are invalid or of different
    /// dimensions.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<BooleanOutput> {
        BooleanOperation::new(BooleanOp::Union)
            .with_arguments(vec![self.object])
            .with_tools(vec![self.tool])
            .with_options(self.options.clone())
            .execute(store)
    }
}
