//! Computation graph data model
//!
//! The mutable, possibly-cyclic graph that the importer consumes: an arena
//! of nodes connected by data and control edges, plus the collaborator
//! tables that travel with a graph (function library, debug info, version
//! metadata).
//!
//! The graph is owned by one importer for the duration of one import and is
//! mutated in place (placeholder substitution, pruning, backedge removal on
//! a working copy). Node identities are stable integer ids that are never
//! reused within a graph.

mod attr;
mod debug;
mod graph;
mod library;
mod node;
mod tensor;
mod types;

pub use attr::{AttrValue, FunctionRef};
pub use debug::{DebugInfo, FileLineCol};
pub use graph::{Edge, EdgePort, Graph, VersionInfo};
pub use library::{ArgDef, FunctionDef, FunctionLibrary, FunctionSignature};
pub use node::{Node, NodeId, NodeInit, NodeKind, ops};
pub use tensor::{TensorData, TensorValue};
pub use types::{ElementType, TensorShape, UNKNOWN_DIM};
