//! IR attributes

use std::fmt;

use indexmap::IndexMap;

use confluence_graph::{TensorData, TensorValue};

/// An attribute value attached to an operation, function, or module.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    I64(i64),
    F32(f32),
    Bool(bool),
    Str(String),
    /// Dense tensor constant.
    Elements(TensorValue),
    Array(Vec<Attribute>),
    Dict(IndexMap<String, Attribute>),
    /// Reference to a function symbol in the module.
    SymbolRef(String),
    /// Presence-only marker.
    Unit,
}

impl Attribute {
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Attribute::SymbolRef(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attribute::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Attribute::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::I64(v) => write!(f, "{}", v),
            Attribute::F32(v) => write!(f, "{:e}", v),
            Attribute::Bool(v) => write!(f, "{}", v),
            Attribute::Str(s) => write!(f, "{:?}", s),
            Attribute::Elements(t) => {
                write!(f, "dense<{} x {}>", t.len(), t.dtype)?;
                if let TensorData::F32(v) = &t.data {
                    if v.len() == 1 {
                        write!(f, "({:e})", v[0])?;
                    }
                }
                Ok(())
            }
            Attribute::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Attribute::Dict(entries) => {
                write!(f, "{{")?;
                for (i, (name, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", name, value)?;
                }
                write!(f, "}}")
            }
            Attribute::SymbolRef(s) => write!(f, "@{}", s),
            Attribute::Unit => write!(f, "unit"),
        }
    }
}
