//! Local shape inference rules
//!
//! A closed registry keyed by operation name. Returning `None` means the
//! operation has no registered rule; the oracle then falls back to the
//! `_output_shapes` annotation path or unranked outputs. Rule errors are
//! node-local inference failures and abort the import.

use confluence_graph::{AttrValue, ElementType, Node, TensorShape, ops};

use crate::shapes::InferredType;

type RuleResult = Result<Option<Vec<InferredType>>, String>;

/// Element type of a node's outputs: explicit `dtype`, the conventional
/// `T` attribute, the first data input, then f32.
pub fn node_dtype(node: &Node, inputs: &[Option<InferredType>]) -> ElementType {
    if let Some(t) = node.attr("dtype").and_then(AttrValue::as_type) {
        return t;
    }
    if let Some(t) = node.attr("T").and_then(AttrValue::as_type) {
        return t;
    }
    inputs
        .iter()
        .flatten()
        .next()
        .map(|t| t.dtype)
        .unwrap_or(ElementType::F32)
}

/// Runs the registered rule for `node`, if one exists.
pub fn infer(node: &Node, inputs: &[Option<InferredType>]) -> RuleResult {
    let dtype = node_dtype(node, inputs);
    let out = |shape: TensorShape| InferredType::new(dtype, shape);

    match node.op.as_str() {
        ops::SOURCE | ops::CONTROL_TRIGGER | ops::RETVAL => Ok(Some(Vec::new())),

        ops::PLACEHOLDER | ops::LEGACY_FED_INPUT | ops::ARG => {
            let shape = node
                .attr("shape")
                .and_then(AttrValue::as_shape)
                .cloned()
                .unwrap_or_else(TensorShape::unranked);
            Ok(Some(vec![out(shape)]))
        }

        "Const" => match node.attr("value").and_then(AttrValue::as_tensor) {
            Some(tensor) => Ok(Some(vec![InferredType::new(
                tensor.dtype,
                TensorShape::ranked(tensor.dims.clone()),
            )])),
            None => Ok(Some(vec![out(TensorShape::unranked())])),
        },

        "Identity" | "StopGradient" | ops::ENTER | ops::EXIT | ops::NEXT_ITERATION => {
            Ok(Some(vec![out(input_shape(inputs, 0))]))
        }

        ops::LOOP_COND => Ok(Some(vec![InferredType::new(
            ElementType::Bool,
            input_shape(inputs, 0),
        )])),

        ops::SWITCH | ops::SWITCH_N => {
            let shape = input_shape(inputs, 0);
            Ok(Some(
                (0..node.num_outputs).map(|_| out(shape.clone())).collect(),
            ))
        }

        ops::MERGE => {
            let mut outputs = vec![out(merge_shapes(inputs))];
            for _ in 1..node.num_outputs {
                outputs.push(InferredType::new(ElementType::I32, TensorShape::scalar()));
            }
            Ok(Some(outputs))
        }

        "Add" | "AddV2" | "Sub" | "Mul" | "Div" | "RealDiv" | "Maximum" | "Minimum" | "Pow"
        | "SquaredDifference" => {
            let shape = broadcast(&input_shape(inputs, 0), &input_shape(inputs, 1))?;
            Ok(Some(vec![out(shape)]))
        }

        "AddN" => {
            let mut present = inputs.iter().flatten();
            let mut shape = present
                .next()
                .map(|t| t.shape.clone())
                .unwrap_or_else(TensorShape::unranked);
            for input in present {
                shape = broadcast(&shape, &input.shape)?;
            }
            Ok(Some(vec![out(shape)]))
        }

        "Relu" | "Relu6" | "Tanh" | "Sigmoid" | "Neg" | "Abs" | "Exp" | "Log" | "Sqrt"
        | "Rsqrt" | "Square" | "BiasAdd" => Ok(Some(vec![out(input_shape(inputs, 0))])),

        "Cast" => {
            let dtype = node
                .attr("DstT")
                .and_then(AttrValue::as_type)
                .unwrap_or(dtype);
            Ok(Some(vec![InferredType::new(dtype, input_shape(inputs, 0))]))
        }

        "MatMul" => Ok(Some(vec![out(matmul_shape(node, inputs)?)])),

        "Shape" => {
            let dtype = node
                .attr("out_type")
                .and_then(AttrValue::as_type)
                .unwrap_or(ElementType::I32);
            let dim = match input_shape(inputs, 0).rank() {
                Some(rank) => rank as i64,
                None => -1,
            };
            Ok(Some(vec![InferredType::new(
                dtype,
                TensorShape::ranked(vec![dim]),
            )]))
        }

        _ => Ok(None),
    }
}

fn input_shape(inputs: &[Option<InferredType>], idx: usize) -> TensorShape {
    inputs
        .get(idx)
        .and_then(Option::as_ref)
        .map(|t| t.shape.clone())
        .unwrap_or_else(TensorShape::unranked)
}

/// Element-wise broadcast of two shapes; a known, unequal, non-1 dimension
/// pair is a local inference error.
fn broadcast(a: &TensorShape, b: &TensorShape) -> Result<TensorShape, String> {
    let (Some(da), Some(db)) = (a.dims(), b.dims()) else {
        return Ok(TensorShape::unranked());
    };
    let rank = da.len().max(db.len());
    let mut dims = vec![0i64; rank];
    for i in 0..rank {
        let x = if i < rank - da.len() { 1 } else { da[i - (rank - da.len())] };
        let y = if i < rank - db.len() { 1 } else { db[i - (rank - db.len())] };
        dims[i] = if x == 1 {
            y
        } else if y == 1 {
            x
        } else if x < 0 || y < 0 {
            -1
        } else if x == y {
            x
        } else {
            return Err(format!("incompatible broadcast dimensions {} and {}", x, y));
        };
    }
    Ok(TensorShape::ranked(dims))
}

/// Conservative join used by merge: agreeing ranks keep per-dimension
/// agreement, anything else degrades to unknown.
fn merge_shapes(inputs: &[Option<InferredType>]) -> TensorShape {
    let mut acc: Option<TensorShape> = None;
    for input in inputs.iter().flatten() {
        acc = Some(match acc {
            None => input.shape.clone(),
            Some(current) => join(&current, &input.shape),
        });
    }
    acc.unwrap_or_else(TensorShape::unranked)
}

fn join(a: &TensorShape, b: &TensorShape) -> TensorShape {
    match (a.dims(), b.dims()) {
        (Some(da), Some(db)) if da.len() == db.len() => TensorShape::ranked(
            da.iter()
                .zip(db.iter())
                .map(|(&x, &y)| if x == y && x >= 0 { x } else { -1 })
                .collect(),
        ),
        _ => TensorShape::unranked(),
    }
}

fn matmul_shape(node: &Node, inputs: &[Option<InferredType>]) -> Result<TensorShape, String> {
    let transpose = |attr: &str| {
        matches!(
            node.attr(attr),
            Some(AttrValue::Bool(true))
        )
    };
    let t_a = transpose("transpose_a");
    let t_b = transpose("transpose_b");

    let side = |shape: &TensorShape, outer: usize, inner: usize| -> Result<(i64, i64), String> {
        match shape.dims() {
            None => Ok((-1, -1)),
            Some(dims) if dims.len() == 2 => Ok((dims[outer], dims[inner])),
            Some(dims) => Err(format!("matmul operand must be rank 2, got rank {}", dims.len())),
        }
    };

    let a = input_shape(inputs, 0);
    let b = input_shape(inputs, 1);
    let (m, ka) = side(&a, usize::from(t_a), usize::from(!t_a))?;
    let (kb, n) = side(&b, usize::from(t_b), usize::from(!t_b))?;
    if ka >= 0 && kb >= 0 && ka != kb {
        return Err(format!("matmul inner dimensions disagree: {} vs {}", ka, kb));
    }
    Ok(TensorShape::ranked(vec![m, n]))
}
