//! Element types and tensor shapes
//!
//! Shapes distinguish "unranked" (nothing known) from a ranked dimension
//! vector where individual dimensions may still be unknown. Dimensions are
//! signed; any negative value is the unknown-dimension sentinel.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel for a dimension whose size is not known.
pub const UNKNOWN_DIM: i64 = -1;

/// Scalar element type of a tensor value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    F16,
    F32,
    F64,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Bool,
    Str,
    Resource,
    Variant,
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementType::F16 => "f16",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
            ElementType::I8 => "i8",
            ElementType::I16 => "i16",
            ElementType::I32 => "i32",
            ElementType::I64 => "i64",
            ElementType::U8 => "u8",
            ElementType::U16 => "u16",
            ElementType::U32 => "u32",
            ElementType::U64 => "u64",
            ElementType::Bool => "bool",
            ElementType::Str => "str",
            ElementType::Resource => "resource",
            ElementType::Variant => "variant",
        };
        write!(f, "{}", name)
    }
}

/// Shape of a tensor: unranked, or a vector of signed dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorShape {
    dims: Option<Vec<i64>>,
}

impl TensorShape {
    /// Shape with unknown rank.
    pub fn unranked() -> Self {
        Self { dims: None }
    }

    /// Ranked shape from a dimension vector. Negative entries mean unknown.
    pub fn ranked(dims: Vec<i64>) -> Self {
        Self { dims: Some(dims) }
    }

    /// Rank-0 shape.
    pub fn scalar() -> Self {
        Self::ranked(Vec::new())
    }

    pub fn is_ranked(&self) -> bool {
        self.dims.is_some()
    }

    /// Rank, if known.
    pub fn rank(&self) -> Option<usize> {
        self.dims.as_ref().map(|d| d.len())
    }

    /// Dimension vector, if ranked.
    pub fn dims(&self) -> Option<&[i64]> {
        self.dims.as_deref()
    }

    /// Whether every dimension is known.
    pub fn is_fully_known(&self) -> bool {
        match &self.dims {
            Some(dims) => dims.iter().all(|&d| d >= 0),
            None => false,
        }
    }

    /// Shape-refinement equality: unknown ranks match each other, and an
    /// unknown dimension matches anything. Only two known, unequal
    /// dimensions (or differing ranks) make shapes differ.
    pub fn same_inferred(&self, other: &TensorShape) -> bool {
        match (&self.dims, &other.dims) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|(&x, &y)| x < 0 || y < 0 || x == y)
            }
            _ => false,
        }
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dims {
            None => write!(f, "*"),
            Some(dims) => {
                let parts: Vec<String> = dims
                    .iter()
                    .map(|&d| {
                        if d < 0 {
                            "?".to_string()
                        } else {
                            d.to_string()
                        }
                    })
                    .collect();
                write!(f, "[{}]", parts.join("x"))
            }
        }
    }
}
