//! Node attribute values
//!
//! The typed attribute records attached to graph nodes. Lists are
//! heterogeneous at the representation level; producers emit homogeneous
//! lists and the importer rejects what it cannot convert.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::tensor::TensorValue;
use crate::types::{ElementType, TensorShape};

/// A reference to a library function, with call-time attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionRef {
    pub name: String,
    pub attrs: IndexMap<String, AttrValue>,
}

impl FunctionRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: IndexMap::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: AttrValue) -> Self {
        self.attrs.insert(name.into(), value);
        self
    }
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    I64(i64),
    F32(f32),
    Bool(bool),
    Str(String),
    /// Element type identifier.
    Type(ElementType),
    /// Shape identifier.
    Shape(TensorShape),
    /// Dense tensor constant.
    Tensor(TensorValue),
    /// Homogeneous list of the scalar kinds above.
    List(Vec<AttrValue>),
    /// Reference to a library function.
    Func(FunctionRef),
    /// Named placeholder for an attribute bound later (inside function
    /// bodies). Not convertible to IR.
    Placeholder(String),
    /// Attribute present but with no value set.
    Unset,
}

impl AttrValue {
    /// Integer payload, if this is an i64 attribute.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Element type payload, if this is a type attribute.
    pub fn as_type(&self) -> Option<ElementType> {
        match self {
            AttrValue::Type(t) => Some(*t),
            _ => None,
        }
    }

    /// Shape payload, if this is a shape attribute.
    pub fn as_shape(&self) -> Option<&TensorShape> {
        match self {
            AttrValue::Shape(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_tensor(&self) -> Option<&TensorValue> {
        match self {
            AttrValue::Tensor(t) => Some(t),
            _ => None,
        }
    }
}
