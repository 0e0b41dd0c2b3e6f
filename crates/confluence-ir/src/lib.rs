//! Confluence IR
//!
//! The static intermediate representation the importer produces: a module
//! of functions, each wrapping a single region of single-assignment
//! operations. Ordinary operations are wrapped in islands that expose a
//! trailing control-token result; the executor control-flow operations
//! (switch, merge, the loop family) participate in control sequencing
//! directly.
//!
//! Operations live in a per-region arena keyed by stable [`OpId`]; program
//! order is a separate vector, so inserting at the region front never
//! invalidates value references.

mod attr;
mod function;
mod location;
mod mangle;
mod ops;
mod print;
mod types;

pub use attr::Attribute;
pub use function::{Function, FunctionType, Module};
pub use location::Location;
pub use mangle::{mangle_attr_name, mangle_element_type, mangle_shape};
pub use ops::{OpId, Operation, Region, Value, exec, INNER_OP_PREFIX};
pub use print::print_module;
pub use types::Type;
