//! Entry point resolution
//!
//! Resolves the caller-declared input and output bindings against the
//! final node set, produces the function signature, and rewrites the
//! region so arguments flow in through function arguments and results flow
//! out through the fetch terminator.

use std::collections::HashMap;

use confluence_graph::{AttrValue, Graph, NodeId, NodeKind};
use confluence_ir::{FunctionType, Location, OpId, Operation, Region, Type, Value, exec};

use crate::config::ImportConfig;
use crate::error::{ImportError, Result};
use crate::shapes::ShapeOracle;

/// A node output participating in the signature: `(node, output index)`.
pub(crate) type OutputRef = (NodeId, usize);

/// Resolves the entry function's arguments, results, and signature for a
/// plain (non-function-body) graph import.
///
/// Inputs come from the declared bindings, in declaration order. Outputs
/// come from the declared specifiers; with none declared, any `_Retval`
/// nodes present in the graph become the implicit output set.
pub(crate) fn resolve_main(
    graph: &Graph,
    oracle: &ShapeOracle,
    config: &ImportConfig,
) -> Result<(Vec<OutputRef>, Vec<OutputRef>, FunctionType)> {
    let mut args = Vec::new();
    let mut input_types = Vec::new();
    for (name, binding) in &config.inputs {
        let id = graph
            .find_node(name)
            .ok_or_else(|| ImportError::UndefinedInputOutput(name.clone()))?;
        args.push((id, 0));
        input_types.push(Type::tensor(binding.dtype, binding.shape.clone()));
    }

    let mut rets = Vec::new();
    if config.outputs.is_empty() {
        for (_, id) in indexed_nodes(graph, NodeKind::Retval) {
            rets.push((id, 0));
        }
    } else {
        for spec in &config.outputs {
            let id = graph
                .find_node(&spec.node)
                .ok_or_else(|| ImportError::UndefinedInputOutput(spec.to_string()))?;
            let node = graph.node(id);
            if spec.port >= node.num_outputs {
                return Err(ImportError::InvalidPort {
                    node: spec.node.clone(),
                    port: spec.port,
                    num_outputs: node.num_outputs,
                });
            }
            rets.push((id, spec.port));
        }
    }

    let result_types = result_types(graph, oracle, &rets)?;
    Ok((
        args,
        rets,
        FunctionType {
            inputs: input_types,
            results: result_types,
        },
    ))
}

/// Argument and result nodes of a function-body graph: its `_Arg` and
/// `_Retval` nodes, in `index`-attribute order.
pub(crate) fn function_args_and_rets(graph: &Graph) -> (Vec<OutputRef>, Vec<OutputRef>) {
    let args = indexed_nodes(graph, NodeKind::Arg)
        .into_iter()
        .map(|(_, id)| (id, 0))
        .collect();
    let rets = indexed_nodes(graph, NodeKind::Retval)
        .into_iter()
        .map(|(_, id)| (id, 0))
        .collect();
    (args, rets)
}

/// Signature of a function body: argument types from the oracle at each
/// `_Arg` node, result types from the value feeding each `_Retval` node.
pub(crate) fn infer_function_type(
    graph: &Graph,
    oracle: &ShapeOracle,
    args: &[OutputRef],
    rets: &[OutputRef],
) -> Result<FunctionType> {
    let inputs = args
        .iter()
        .map(|&(id, idx)| oracle.output_type(id, idx).to_ir_type())
        .collect();
    let results = result_types(graph, oracle, rets)?;
    Ok(FunctionType { inputs, results })
}

fn result_types(graph: &Graph, oracle: &ShapeOracle, rets: &[OutputRef]) -> Result<Vec<Type>> {
    rets.iter()
        .map(|&(id, port)| {
            let node = graph.node(id);
            let inferred = if node.kind() == NodeKind::Retval {
                oracle.input_type(graph, id, 0).ok_or_else(|| {
                    ImportError::MalformedGraph(format!(
                        "return node '{}' has no data operand",
                        node.name
                    ))
                })?
            } else {
                oracle.output_type(id, port)
            };
            Ok(inferred.to_ir_type())
        })
        .collect()
}

/// Nodes of one kind ordered by their `index` attribute (name-tiebroken,
/// since the attribute is absent in hand-built graphs).
fn indexed_nodes(graph: &Graph, kind: NodeKind) -> Vec<(i64, NodeId)> {
    let mut nodes: Vec<(i64, NodeId)> = graph
        .nodes()
        .filter(|n| n.kind() == kind)
        .map(|n| {
            let index = n
                .attr("index")
                .and_then(AttrValue::as_i64)
                .unwrap_or_default();
            (index, n.id)
        })
        .collect();
    nodes.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| graph.node(a.1).name.cmp(&graph.node(b.1).name))
    });
    nodes
}

/// Rewrites the finished region so the resolved arguments and results bind
/// to the function signature, then emits the fetch terminator.
///
/// An `_Arg` node's island is erased and its value uses become the
/// function argument; a substituted placeholder input keeps its island but
/// the inner operation is retagged with an `.input` suffix and consumes
/// the argument. A `_Retval` destination contributes the single value
/// feeding it; anything else contributes the specified result port.
/// Control-only returns append after data returns.
pub(crate) fn bind_args_and_rets(
    region: &mut Region,
    graph: &Graph,
    node_values: &HashMap<NodeId, OpId>,
    args: &[OutputRef],
    rets: &[OutputRef],
    control_rets: &[NodeId],
) -> Result<()> {
    for (i, &(arg_id, _)) in args.iter().enumerate() {
        let op_id = lookup(graph, node_values, arg_id)?;
        if graph.node(arg_id).kind() == NodeKind::Arg {
            region.replace_uses(Value::result(op_id, 0), Value::Arg(i));
            region.erase(op_id);
        } else {
            let island = region.op_mut(op_id);
            let inner = island
                .inner
                .as_mut()
                .expect("input nodes are island-wrapped");
            inner.name.push_str(".input");
            inner.operands.push(Value::Arg(i));
        }
    }

    let mut fetched: Vec<Value> = Vec::with_capacity(rets.len() + control_rets.len());
    for &(ret_id, port) in rets {
        let op_id = lookup(graph, node_values, ret_id)?;
        if graph.node(ret_id).kind() == NodeKind::Retval {
            let inner = region
                .op(op_id)
                .inner
                .as_ref()
                .expect("return nodes are island-wrapped");
            if inner.operands.len() != 1 {
                return Err(ImportError::Unimplemented(format!(
                    "return node '{}' with multiple inputs",
                    graph.node(ret_id).name
                )));
            }
            fetched.push(inner.operands[0]);
            region.erase(op_id);
        } else {
            fetched.push(Value::result(op_id, port));
        }
    }
    for &ctl_id in control_rets {
        let op_id = lookup(graph, node_values, ctl_id)?;
        let index = region.op(op_id).control_result_index();
        fetched.push(Value::result(op_id, index));
    }

    let mut fetch = Operation::new(exec::FETCH, Location::Unknown);
    fetch.operands = fetched;
    region.append(fetch);
    Ok(())
}

fn lookup(graph: &Graph, node_values: &HashMap<NodeId, OpId>, id: NodeId) -> Result<OpId> {
    node_values.get(&id).copied().ok_or_else(|| {
        ImportError::OrderingViolation(format!(
            "node '{}' has no registered operation",
            graph.node(id).name
        ))
    })
}
