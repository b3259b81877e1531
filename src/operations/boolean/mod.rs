//! Boolean operations on boundary representations.
//!
//! All operations share one pipeline: the operands are intersected
//! (interference detection and pave filling), their edges and faces are
//! split at the intersections, every piece is classified against the
//! other operands and the pieces an operation keeps are assembled into
//! the result.

mod assemble;
mod classify;
mod context;
mod detector;
mod engine;
mod history;
mod interference;
mod intersect_op;
mod iterator;
mod options;
mod pave;
mod pave_filler;
mod report;
mod section;
mod section_op;
mod select;
mod split_edge;
mod split_face;
mod subtract;
mod union;
mod validate;

pub use context::{IntersectionContext, Operand, OperandGroup};
pub use engine::{BooleanOperation, BooleanOutput};
pub use history::History;
pub use interference::{Contact, Interference, InterferenceKind};
pub use intersect_op::Intersect;
pub use options::{BooleanOptions, Glue, ProgressToken};
pub use pave::{Pave, PaveBlock};
pub use report::{Report, Warning};
pub use section_op::Section;
pub use select::BooleanOp;
pub use subtract::Subtract;
pub use union::Union;
