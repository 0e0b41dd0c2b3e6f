//! Import errors
//!
//! Every failure aborts the whole import; there is no partial-result
//! recovery. Shape-refinement non-convergence is deliberately *not* here
//! (it is a logged diagnostic, see the refinement engine).

use thiserror::Error;

use confluence_ir::Location;

/// Import result type.
pub type Result<T> = std::result::Result<T, ImportError>;

/// Reasons an import can fail.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Structural violation in the input graph: ambiguous backedges,
    /// invalid backedge endpoints, a data dependency on the pseudo source
    /// node besides as sole input.
    #[error("malformed graph: {0}")]
    MalformedGraph(String),

    /// Internal invariant break: a consumer was processed before its
    /// producer.
    #[error("ordering violation: {0}")]
    OrderingViolation(String),

    /// An attribute kind recognized but not convertible to IR.
    #[error("unsupported attribute: {0}")]
    UnsupportedAttribute(String),

    /// A construct recognized but intentionally not handled.
    #[error("unimplemented: {0}")]
    Unimplemented(String),

    /// A referenced function is absent from the library.
    #[error("undefined function '{0}'")]
    UndefinedFunction(String),

    /// A caller-declared input or output name is absent from the graph.
    #[error("undefined input or output '{0}'")]
    UndefinedInputOutput(String),

    /// An output specifier's index exceeds the node's output count.
    #[error("invalid port {port} for node '{node}' with {num_outputs} outputs")]
    InvalidPort {
        node: String,
        port: usize,
        num_outputs: usize,
    },

    /// A node-local shape inference failure, annotated with the node's
    /// resolved location.
    #[error("shape inference failed at {location}: {message}")]
    ShapeInference { location: Location, message: String },

    /// Contradictory or unparseable caller configuration.
    #[error("invalid import configuration: {0}")]
    InvalidConfig(String),
}
