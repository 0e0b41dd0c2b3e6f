//! String mangling for type and shape identifiers
//!
//! Type and shape attributes survive into the IR as opaque strings with a
//! stable, reversible spelling.

use confluence_graph::{ElementType, TensorShape};

/// Stable string form of an element type identifier.
pub fn mangle_element_type(elem: ElementType) -> String {
    format!("dtype${}", elem)
}

/// Stable string form of a shape identifier.
pub fn mangle_shape(shape: &TensorShape) -> String {
    format!("shape${}", shape)
}

/// Namespaces a function-definition attribute name so it cannot collide
/// with attributes the importer itself attaches.
pub fn mangle_attr_name(name: &str) -> String {
    format!("flow.{}", name)
}
