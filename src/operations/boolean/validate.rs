use tracing::instrument;

use crate::error::Result;
use crate::operations::query::IsValid;
use crate::topology::{Shape, TopologyStore};

use super::options::BooleanOptions;
use super::report::{Report, Warning};

/// Checks the assembled result and reports every problem as a warning.
///
/// With `require_closed`, used when every operand is a solid, shells that
/// are not closed are problems too. The result is returned to the caller
/// either way.
///
/// # Errors
///
/// Returns an error if the checks cannot evaluate the geometry.
#[instrument(skip_all)]
pub fn validate_result(
    store: &TopologyStore,
    shape: Option<Shape>,
    require_closed: bool,
    options: &BooleanOptions,
    report: &mut Report,
) -> Result<()> {
    let Some(shape) = shape else {
        return Ok(());
    };
    let issues = IsValid::new(shape.id)
        .with_orientation_check(options.check_inverted)
        .with_closed_shells(require_closed)
        .execute(store)?;
    for issue in issues {
        report.push(Warning::InvalidResult(issue));
    }
    Ok(())
}
