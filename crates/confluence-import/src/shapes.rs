//! Shape refinement
//!
//! Assigns every node an inferred output type per output, then iterates
//! graph-wide re-inference to a fixpoint. The iteration cap is a
//! heuristic: refusing to converge is not an error, it just leaves
//! conservative shapes behind (and a warning in the log).
//!
//! The first walk may mutate the graph (declared inputs are substituted
//! with placeholder nodes, unused nodes are pruned), which invalidates the
//! derived ordering; the caller's ordering vector is re-derived here
//! whenever that happens.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use confluence_graph::{
    AttrValue, DebugInfo, ElementType, Graph, Node, NodeId, NodeInit, TensorShape, ops,
};
use confluence_ir::Type;

use crate::config::ImportConfig;
use crate::error::{ImportError, Result};
use crate::location;
use crate::order;
use crate::rules;

/// Extra full re-inference rounds attempted after the initial pass.
const MAX_EXTRA_ROUNDS: usize = 2;

/// Inferred type of one node output.
#[derive(Debug, Clone, PartialEq)]
pub struct InferredType {
    pub dtype: ElementType,
    pub shape: TensorShape,
}

impl InferredType {
    pub fn new(dtype: ElementType, shape: TensorShape) -> Self {
        Self { dtype, shape }
    }

    /// Refinement equality: element types identical, shapes equal under
    /// the unknown-dimension-compatible rule.
    fn same(&self, other: &InferredType) -> bool {
        self.dtype == other.dtype && self.shape.same_inferred(&other.shape)
    }

    pub fn to_ir_type(&self) -> Type {
        Type::tensor(self.dtype, self.shape.clone())
    }
}

/// Per-node inferred output types; the type oracle consulted by node
/// conversion and signature building.
#[derive(Debug, Default)]
pub struct ShapeOracle {
    types: HashMap<NodeId, Vec<InferredType>>,
}

impl ShapeOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs local inference for a node and records the result.
    pub fn add_node(&mut self, graph: &Graph, id: NodeId) -> std::result::Result<(), String> {
        let types = self.infer(graph, id)?;
        self.types.insert(id, types);
        Ok(())
    }

    /// Re-runs local inference; reports whether any output changed under
    /// refinement equality.
    pub fn update_node(&mut self, graph: &Graph, id: NodeId) -> std::result::Result<bool, String> {
        let fresh = self.infer(graph, id)?;
        let changed = match self.types.get(&id) {
            Some(existing) => {
                existing.len() != fresh.len()
                    || existing.iter().zip(fresh.iter()).any(|(a, b)| !a.same(b))
            }
            None => true,
        };
        self.types.insert(id, fresh);
        Ok(changed)
    }

    /// Inferred type of one output.
    ///
    /// # Panics
    ///
    /// Panics when the node was never added; ordering guarantees every
    /// producer is added before it is queried.
    pub fn output_type(&self, id: NodeId, idx: usize) -> InferredType {
        let outputs = self.types.get(&id).expect("node not in shape oracle");
        outputs
            .get(idx)
            .cloned()
            .unwrap_or_else(|| InferredType::new(ElementType::F32, TensorShape::unranked()))
    }

    /// Type flowing into input `idx` of a node, resolved through its data
    /// edge.
    pub fn input_type(&self, graph: &Graph, id: NodeId, idx: usize) -> Option<InferredType> {
        graph.in_edges(id).iter().find_map(|edge| {
            if edge.dst_input() == Some(idx) {
                Some(self.output_type(edge.src, edge.src_output().expect("data edge")))
            } else {
                None
            }
        })
    }

    fn gather_inputs(&self, graph: &Graph, id: NodeId) -> Vec<Option<InferredType>> {
        let mut inputs: Vec<Option<InferredType>> = Vec::new();
        for edge in graph.in_edges(id) {
            let (Some(src_output), Some(dst_input)) = (edge.src_output(), edge.dst_input()) else {
                continue;
            };
            if inputs.len() <= dst_input {
                inputs.resize(dst_input + 1, None);
            }
            if self.types.contains_key(&edge.src) {
                inputs[dst_input] = Some(self.output_type(edge.src, src_output));
            }
        }
        inputs
    }

    fn infer(&self, graph: &Graph, id: NodeId) -> std::result::Result<Vec<InferredType>, String> {
        let node = graph.node(id);
        let inputs = self.gather_inputs(graph, id);

        if let Some(types) = rules::infer(node, &inputs)? {
            return Ok(types);
        }

        // No rule for this operation: honor an explicit output-shape
        // annotation when present, otherwise leave every output unranked.
        let dtype = rules::node_dtype(node, &inputs);
        let annotated = annotated_shapes(node);
        let types = (0..node.num_outputs)
            .map(|o| {
                let shape = annotated
                    .as_ref()
                    .and_then(|shapes| shapes.get(o).cloned())
                    .unwrap_or_else(TensorShape::unranked);
                InferredType::new(dtype, shape)
            })
            .collect();
        Ok(types)
    }
}

/// Shapes declared by a best-effort `_output_shapes` annotation.
fn annotated_shapes(node: &Node) -> Option<Vec<TensorShape>> {
    match node.attr("_output_shapes") {
        Some(AttrValue::List(items)) => Some(
            items
                .iter()
                .map(|item| {
                    item.as_shape()
                        .cloned()
                        .unwrap_or_else(TensorShape::unranked)
                })
                .collect(),
        ),
        _ => None,
    }
}

/// Runs the whole refinement phase over the working graph: input binding
/// substitution, the initial inference pass, optional pruning, and the
/// capped fixpoint iteration.
pub fn run_refinement(
    graph: &mut Graph,
    ordered: &mut Vec<NodeId>,
    oracle: &mut ShapeOracle,
    config: &ImportConfig,
    debug_info: &DebugInfo,
) -> Result<()> {
    let mut mutated = false;

    for idx in 0..ordered.len() {
        let id = ordered[idx];
        let mut current = id;

        let node = graph.node(id);
        if let Some(binding) = config.inputs.get(&node.name) {
            if node.is_input_kind() {
                let node = graph.node_mut(id);
                node.attrs
                    .insert("dtype".to_string(), AttrValue::Type(binding.dtype));
                node.attrs
                    .insert("shape".to_string(), AttrValue::Shape(binding.shape.clone()));
            } else {
                if node.num_outputs != 1 {
                    return Err(ImportError::InvalidConfig(format!(
                        "input '{}' binds a node with {} outputs; only single-output nodes can \
                         be substituted",
                        node.name, node.num_outputs
                    )));
                }
                current = substitute_placeholder(graph, id, binding.dtype, &binding.shape);
                mutated = true;
            }
        }

        oracle
            .add_node(graph, current)
            .map_err(|message| shape_error(graph, debug_info, current, message))?;
    }

    if config.prune_unused_nodes {
        mutated |= prune_unreachable(graph, config)?;
    }

    if mutated {
        *ordered = order::reverse_post_order(graph);
        // Substituted or pruned ids may have left stale oracle entries;
        // they are unreachable through the new ordering.
        for &id in ordered.iter() {
            if oracle.types.get(&id).is_none() {
                oracle
                    .add_node(graph, id)
                    .map_err(|message| shape_error(graph, debug_info, id, message))?;
            }
        }
    }

    debug!("inferring graph shapes to fixpoint");
    let mut changed = true;
    let mut rounds = 0usize;
    while changed && rounds != MAX_EXTRA_ROUNDS {
        changed = false;
        for &id in ordered.iter() {
            let node_changed = oracle
                .update_node(graph, id)
                .map_err(|message| shape_error(graph, debug_info, id, message))?;
            changed |= node_changed;
        }
        rounds += 1;
    }
    if changed {
        warn!(
            rounds = MAX_EXTRA_ROUNDS,
            "graph shapes did not converge to a fixpoint; shapes may be conservative"
        );
    } else {
        debug!(rounds, "graph shapes reached a fixpoint");
    }

    Ok(())
}

/// Replaces a bound input node with a synthetic single-output placeholder
/// carrying the declared type and shape. The new node takes over the
/// name and all out-edges of the old one.
fn substitute_placeholder(
    graph: &mut Graph,
    id: NodeId,
    dtype: ElementType,
    shape: &TensorShape,
) -> NodeId {
    let name = graph.node(id).name.clone();
    let replacement = graph.add_node(
        NodeInit::new(name, ops::PLACEHOLDER, 1)
            .with_attr("dtype", AttrValue::Type(dtype))
            .with_attr("shape", AttrValue::Shape(shape.clone())),
    );
    graph.redirect_out_edges(id, replacement);
    graph.remove_node(id);
    replacement
}

/// Drops nodes unreachable (by data or control edges) from the declared
/// input/output set. Returns whether anything was removed.
fn prune_unreachable(graph: &mut Graph, config: &ImportConfig) -> Result<bool> {
    let mut roots: Vec<NodeId> = Vec::new();
    for name in config.inputs.keys() {
        roots.push(resolve_name(graph, name)?);
    }
    for spec in &config.outputs {
        roots.push(resolve_name(graph, &spec.node)?);
    }
    if roots.is_empty() {
        debug!("no inputs or outputs declared; skipping prune");
        return Ok(false);
    }

    let mut keep: HashSet<NodeId> = HashSet::new();
    let mut stack = roots;
    while let Some(id) = stack.pop() {
        if !keep.insert(id) {
            continue;
        }
        for edge in graph.in_edges(id) {
            stack.push(edge.src);
        }
    }
    keep.insert(graph.source_id());

    let doomed: Vec<NodeId> = graph.node_ids().filter(|id| !keep.contains(id)).collect();
    let pruned = !doomed.is_empty();
    for id in doomed {
        graph.remove_node(id);
    }
    if pruned {
        debug!("pruned unused nodes from the graph");
    }
    Ok(pruned)
}

fn resolve_name(graph: &Graph, name: &str) -> Result<NodeId> {
    graph
        .find_node(name)
        .ok_or_else(|| ImportError::UndefinedInputOutput(name.to_string()))
}

fn shape_error(
    graph: &Graph,
    debug_info: &DebugInfo,
    id: NodeId,
    message: String,
) -> ImportError {
    ImportError::ShapeInference {
        location: location::resolve(debug_info, graph.node(id)),
        message,
    }
}
