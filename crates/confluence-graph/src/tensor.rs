//! Dense tensor constants
//!
//! Carried by constant-valued attributes. The payload is kept as typed
//! vectors rather than raw bytes so tests and the IR printer can read it
//! without an endianness dance.

use serde::{Deserialize, Serialize};

use crate::types::ElementType;

/// A dense constant: element type, dimensions, and the flattened payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorValue {
    pub dtype: ElementType,
    pub dims: Vec<i64>,
    pub data: TensorData,
}

/// Flattened tensor payload, one variant per storage class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TensorData {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

impl TensorValue {
    /// Scalar f32 constant.
    pub fn scalar_f32(value: f32) -> Self {
        Self {
            dtype: ElementType::F32,
            dims: Vec::new(),
            data: TensorData::F32(vec![value]),
        }
    }

    /// Scalar i64 constant.
    pub fn scalar_i64(value: i64) -> Self {
        Self {
            dtype: ElementType::I64,
            dims: Vec::new(),
            data: TensorData::I64(vec![value]),
        }
    }

    /// f32 tensor with the given dimensions; `values` is the flattened
    /// payload in row-major order.
    pub fn f32(dims: Vec<i64>, values: Vec<f32>) -> Self {
        Self {
            dtype: ElementType::F32,
            dims,
            data: TensorData::F32(values),
        }
    }

    /// Number of stored elements.
    pub fn len(&self) -> usize {
        match &self.data {
            TensorData::F32(v) => v.len(),
            TensorData::F64(v) => v.len(),
            TensorData::I32(v) => v.len(),
            TensorData::I64(v) => v.len(),
            TensorData::Bool(v) => v.len(),
            TensorData::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
