use tracing::warn;

use crate::operations::query::ValidityIssue;
use crate::topology::{EdgeId, FaceId, ShapeId, ShellId};

use super::interference::InterferenceKind;

/// A recoverable problem met during a boolean operation.
///
/// Warnings never stop the operation; the result is returned together with
/// them and the caller decides whether it is acceptable.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// Two sub-shapes could not be intersected numerically.
    UnresolvedInterference {
        /// Kind of the pair.
        kind: InterferenceKind,
        /// First sub-shape.
        a: ShapeId,
        /// Second sub-shape.
        b: ShapeId,
        /// Why the intersection failed.
        reason: String,
    },
    /// A face could not be rebuilt from its split edges and was kept whole
    /// or rebuilt from its boundary only.
    FaceNotSplit {
        /// The operand face.
        face: FaceId,
        /// Why splitting failed.
        reason: String,
    },
    /// A pave block shorter than the numeric epsilon was dropped.
    DegeneratePaveBlock {
        /// The operand edge.
        edge: EdgeId,
        /// Parameter span of the dropped block.
        span: f64,
    },
    /// The final validity pass found a problem in the result.
    InvalidResult(ValidityIssue),
    /// A closed shell enclosed negative volume and was not contained in any
    /// solid; it was flipped.
    InvertedSolid {
        /// The flipped shell.
        shell: ShellId,
    },
}

/// Warnings collected during one boolean operation.
#[derive(Debug, Clone, Default)]
pub struct Report {
    warnings: Vec<Warning>,
}

impl Report {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning and logs it.
    pub fn push(&mut self, warning: Warning) {
        warn!(?warning, "boolean operation warning");
        self.warnings.push(warning);
    }

    /// Appends every warning of `other`, which was logged already.
    pub fn extend(&mut self, other: Report) {
        self.warnings.extend(other.warnings);
    }

    /// All warnings in the order they were recorded.
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Returns `true` when nothing was recorded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Returns `true` when the validity pass flagged the result.
    #[must_use]
    pub fn has_invalid_result(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, Warning::InvalidResult(_)))
    }

    /// Number of unresolved interference pairs.
    #[must_use]
    pub fn unresolved_count(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, Warning::UnresolvedInterference { .. }))
            .count()
    }
}
