use thiserror::Error;

/// Top-level error type for the Geobool kernel.
#[derive(Debug, Error)]
pub enum GeoboolError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    Boolean(#[from] BooleanError),

    #[error(transparent)]
    Tessellation(#[from] TessellationError),
}

/// Errors related to geometric computations.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("parameter {parameter} = {value} is out of range [{min}, {max}]")]
    ParameterOutOfRange {
        parameter: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,

    #[error("numeric evaluation did not converge: {0}")]
    NotConverged(String),
}

/// Errors related to topological operations.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("wire is not closed")]
    WireNotClosed,

    #[error("invalid topology: {0}")]
    InvalidTopology(String),
}

/// Errors related to CAD operations.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("operation failed: {0}")]
    Failed(String),
}

/// Fatal errors of a boolean operation.
///
/// Input errors are detected before any shape is inserted into the store.
/// Recoverable problems are not errors; they are collected as warnings in
/// the operation report.
#[derive(Debug, Error)]
pub enum BooleanError {
    #[error("boolean operation needs at least one object and one tool")]
    EmptyArguments,

    #[error("argument {0} refers to a shape that does not exist")]
    NullShape(usize),

    #[error("argument {index} is degenerate: {reason}")]
    DegenerateShape { index: usize, reason: String },

    #[error("invalid tolerance {value} on argument {index}")]
    InvalidTolerance { index: usize, value: f64 },

    #[error("fuzzy value must be finite and non-negative, got {0}")]
    InvalidFuzzyValue(f64),

    #[error("operation is not defined for argument dimensions {object} and {tool}")]
    IncompatibleDimensions { object: u8, tool: u8 },

    #[error("boolean operation was cancelled")]
    Cancelled,
}

/// Errors related to tessellation.
#[derive(Debug, Error)]
pub enum TessellationError {
    #[error("invalid tessellation parameters: {0}")]
    InvalidParameters(String),

    #[error("tessellation failed: {0}")]
    Failed(String),
}

/// Convenience type alias for results using [`GeoboolError`].
pub type Result<T> = std::result::Result<T, GeoboolError>;
