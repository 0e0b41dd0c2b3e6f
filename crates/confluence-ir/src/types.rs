//! IR value types

use std::fmt;

use confluence_graph::{ElementType, TensorShape};

/// Type of an IR value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// A tensor with element type and (possibly unranked) shape.
    Tensor {
        elem: ElementType,
        shape: TensorShape,
    },
    /// Control token produced by every island and executor operation;
    /// carries ordering only.
    Control,
    /// The opaque token pairing a loop source with its sink.
    Token,
}

impl Type {
    pub fn tensor(elem: ElementType, shape: TensorShape) -> Self {
        Type::Tensor { elem, shape }
    }

    /// Unranked tensor of the given element type.
    pub fn unranked(elem: ElementType) -> Self {
        Type::Tensor {
            elem,
            shape: TensorShape::unranked(),
        }
    }

    pub fn is_control(&self) -> bool {
        matches!(self, Type::Control)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Tensor { elem, shape } => {
                write!(f, "tensor<")?;
                if let Some(dims) = shape.dims() {
                    for d in dims {
                        if *d < 0 {
                            write!(f, "?x")?;
                        } else {
                            write!(f, "{}x", d)?;
                        }
                    }
                } else {
                    write!(f, "*x")?;
                }
                write!(f, "{}>", elem)
            }
            Type::Control => write!(f, "!exec.control"),
            Type::Token => write!(f, "!exec.token"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_ranked() {
        let t = Type::tensor(ElementType::F32, TensorShape::ranked(vec![2, -1]));
        assert_eq!(t.to_string(), "tensor<2x?xf32>");
    }

    #[test]
    fn test_display_unranked_and_scalar() {
        assert_eq!(
            Type::unranked(ElementType::I64).to_string(),
            "tensor<*xi64>"
        );
        let scalar = Type::tensor(ElementType::Bool, TensorShape::scalar());
        assert_eq!(scalar.to_string(), "tensor<bool>");
        assert_eq!(Type::Control.to_string(), "!exec.control");
    }
}
