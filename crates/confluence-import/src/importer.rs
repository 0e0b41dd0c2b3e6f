//! Per-graph import driver
//!
//! One [`Importer`] owns the working copy of one graph and walks it once:
//! backedge removal, ordering, and shape refinement populate the oracle,
//! then every node becomes exactly one IR construct in topological order,
//! and the stripped backedges are spliced back into the finished region.
//!
//! Recursive function imports create nested `Importer`s that borrow the
//! same session (module + memoization table).

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use confluence_graph::{AttrValue, DebugInfo, Edge, FunctionLibrary, Graph, Node, NodeId, NodeKind, ops};
use confluence_ir::{
    Attribute, Function, FunctionType, INNER_OP_PREFIX, Location, OpId, Operation, Region, Type,
    Value, exec,
};

use crate::attrs;
use crate::backedge::{self, BackedgeRecord, RemovedBackedges};
use crate::config::ImportConfig;
use crate::entry;
use crate::error::{ImportError, Result};
use crate::functions;
use crate::location;
use crate::order;
use crate::session::ImportSession;
use crate::shapes::{self, ShapeOracle};

/// Converts one graph into one IR function.
pub(crate) struct Importer<'a> {
    session: &'a mut ImportSession,
    library: &'a FunctionLibrary,
    debug_info: &'a DebugInfo,
    config: ImportConfig,
    /// Working copy; mutated by refinement, never by conversion.
    pub(crate) graph: Graph,
    pub(crate) ordered: Vec<NodeId>,
    pub(crate) oracle: ShapeOracle,
    backedges: RemovedBackedges,
    /// node id -> the operation registered for it.
    node_values: HashMap<NodeId, OpId>,
    /// loop sink -> its paired source, for backedge reconnection.
    sink_to_source: HashMap<OpId, OpId>,
    region: Region,
}

impl<'a> Importer<'a> {
    pub(crate) fn new(
        session: &'a mut ImportSession,
        library: &'a FunctionLibrary,
        debug_info: &'a DebugInfo,
        config: ImportConfig,
        graph: Graph,
    ) -> Self {
        Self {
            session,
            library,
            debug_info,
            config,
            graph,
            ordered: Vec::new(),
            oracle: ShapeOracle::new(),
            backedges: RemovedBackedges::default(),
            node_values: HashMap::new(),
            sink_to_source: HashMap::new(),
            region: Region::new(),
        }
    }

    /// Prepares the working graph: strips backedges, derives the node
    /// order, and runs shape refinement.
    pub(crate) fn prepare(&mut self) -> Result<()> {
        self.backedges = backedge::remove_backedges(&mut self.graph)?;
        self.ordered = order::reverse_post_order(&self.graph);
        shapes::run_refinement(
            &mut self.graph,
            &mut self.ordered,
            &mut self.oracle,
            &self.config,
            self.debug_info,
        )?;
        Ok(())
    }

    /// Converts the prepared graph into a function: one IR construct per
    /// node, backedges restored, arguments bound, and the fetch terminator
    /// emitted.
    pub(crate) fn convert(
        mut self,
        symbol: &str,
        ty: FunctionType,
        args: Vec<(NodeId, usize)>,
        rets: Vec<(NodeId, usize)>,
        control_rets: Vec<NodeId>,
        attrs: IndexMap<String, Attribute>,
    ) -> Result<Function> {
        debug!(function = symbol, nodes = self.ordered.len(), "converting graph");

        let ordered = self.ordered.clone();
        for id in ordered {
            self.convert_node(id)?;
        }
        self.add_backedges()?;
        entry::bind_args_and_rets(
            &mut self.region,
            &self.graph,
            &self.node_values,
            &args,
            &rets,
            &control_rets,
        )?;

        let mut function = Function::new(symbol, ty);
        function.attrs = attrs;
        function.body = self.region;
        Ok(function)
    }

    /// Converts one node into its IR construct and registers the mapping.
    fn convert_node(&mut self, id: NodeId) -> Result<()> {
        let node = self.graph.node(id).clone();
        if node.kind() == NodeKind::Source {
            // The pseudo source node is never imported.
            return Ok(());
        }

        // A node whose type names a library function calls it: import the
        // callee and use its IR symbol as the operation name.
        let mut op_type = node.op.clone();
        if self.library.find(&op_type).is_some() {
            op_type =
                functions::import_function(self.session, self.library, self.debug_info, &op_type)?;
        }
        let mut op_name = format!("{}{}", INNER_OP_PREFIX, op_type);

        // Output types from the oracle, skipping an output stripped as a
        // backedge source.
        let mut result_types = Vec::new();
        for output in 0..node.num_outputs {
            if self.backedges.source_output.get(&id) == Some(&output) {
                continue;
            }
            result_types.push(self.oracle.output_type(id, output).to_ir_type());
        }

        let (operands, control_operands) = self.gather_operands(&node)?;
        let mut attrs = self.convert_node_attributes(&node)?;

        // The statefulness variants collapse to one op with a marker.
        if node.is_if() {
            op_name = format!("{}{}", INNER_OP_PREFIX, ops::IF);
            attrs.insert(
                "is_stateless".to_string(),
                Attribute::Bool(node.op == ops::STATELESS_IF),
            );
        }
        if node.is_while() {
            op_name = format!("{}{}", INNER_OP_PREFIX, ops::WHILE);
            attrs.insert(
                "is_stateless".to_string(),
                Attribute::Bool(node.op == ops::STATELESS_WHILE),
            );
        }

        let loc = location::resolve(self.debug_info, &node);
        let op_id = self.create_operation(
            &node,
            op_name,
            loc,
            operands,
            control_operands,
            result_types,
            attrs,
        )?;
        self.node_values.insert(id, op_id);
        Ok(())
    }

    /// Gathers and orders a node's operands. Raw edge iteration order is
    /// not guaranteed, so edges are stable-sorted: data edges first by
    /// destination input index, control edges after.
    fn gather_operands(&self, node: &Node) -> Result<(Vec<Value>, Vec<Value>)> {
        let mut in_edges: Vec<Edge> = self.graph.in_edges(node.id).to_vec();
        in_edges.sort_by(|a, b| match (a.is_control(), b.is_control()) {
            (false, true) => std::cmp::Ordering::Less,
            (true, false) => std::cmp::Ordering::Greater,
            _ => a.dst_input().cmp(&b.dst_input()),
        });

        let mut operands = Vec::new();
        let mut control_operands = Vec::new();
        for edge in &in_edges {
            let src = self.graph.node(edge.src);
            if src.kind() == NodeKind::Source {
                if in_edges.len() != 1 {
                    return Err(ImportError::MalformedGraph(format!(
                        "node '{}' has other inputs besides the source node",
                        node.name
                    )));
                }
                continue;
            }
            // Arguments are treated as available before any internal node
            // runs, so a control edge from one is redundant and dropped.
            if src.kind() == NodeKind::Arg && edge.is_control() {
                continue;
            }

            let op_id = *self.node_values.get(&edge.src).ok_or_else(|| {
                ImportError::OrderingViolation(format!(
                    "node '{}' consumed before its producer '{}' was converted",
                    node.name, src.name
                ))
            })?;
            if edge.is_control() {
                let producer = self.region.op(op_id);
                control_operands.push(Value::result(op_id, producer.control_result_index()));
            } else {
                operands.push(Value::result(
                    op_id,
                    edge.src_output().expect("data edge carries an output index"),
                ));
            }
        }
        Ok((operands, control_operands))
    }

    /// Converts the node's attributes: non-function attributes in map
    /// order, then function-valued ones in lexicographic name order (the
    /// underlying map order is unspecified), then the standardized `name`
    /// and `device` attributes.
    fn convert_node_attributes(&mut self, node: &Node) -> Result<IndexMap<String, Attribute>> {
        let mut attrs = IndexMap::new();
        let mut funcs: Vec<(&String, &confluence_graph::FunctionRef)> = Vec::new();
        for (name, value) in &node.attrs {
            match value {
                AttrValue::Func(f) => funcs.push((name, f)),
                other => {
                    let converted = attrs::convert_attribute(
                        self.session,
                        self.library,
                        self.debug_info,
                        other,
                    )?;
                    attrs.insert(name.clone(), converted);
                }
            }
        }
        funcs.sort_by(|a, b| a.0.cmp(b.0));
        for (name, func) in funcs {
            attrs::convert_function_attribute(
                self.session,
                self.library,
                self.debug_info,
                name,
                func,
                &mut attrs,
            )?;
        }

        attrs.insert("name".to_string(), Attribute::Str(node.name.clone()));
        attrs.insert("device".to_string(), Attribute::Str(node.device.clone()));
        Ok(attrs)
    }

    /// Builds the IR construct for a node: an executor operation for the
    /// control-flow kinds, a source/sink pair for loop updates, an island
    /// for everything else.
    #[allow(clippy::too_many_arguments)]
    fn create_operation(
        &mut self,
        node: &Node,
        op_name: String,
        loc: Location,
        operands: Vec<Value>,
        control_operands: Vec<Value>,
        result_types: Vec<Type>,
        attrs: IndexMap<String, Attribute>,
    ) -> Result<OpId> {
        let exec_name = match node.kind() {
            NodeKind::Switch => Some(exec::SWITCH),
            NodeKind::SwitchN => Some(exec::SWITCH_N),
            NodeKind::Merge => Some(exec::MERGE),
            NodeKind::LoopCondition => Some(exec::LOOP_COND),
            NodeKind::Enter => Some(exec::ENTER),
            NodeKind::Exit => Some(exec::EXIT),
            NodeKind::ControlTrigger => Some(exec::CONTROL_TRIGGER),
            _ => None,
        };
        if let Some(name) = exec_name {
            let mut op = Operation::new(name, loc);
            op.operands = operands;
            op.operands.extend(control_operands);
            op.result_types = result_types;
            op.result_types.push(Type::Control);
            op.attrs = attrs;
            return Ok(self.region.append(op));
        }

        if node.kind() == NodeKind::LoopUpdate {
            // The loop update splits into a paired source and sink linked
            // by a token. The source goes to the very start of the region
            // so the merge it will feed can already reference it.
            let mut source = Operation::new(exec::NEXT_ITERATION_SOURCE, loc.clone());
            source.result_types = vec![Type::Token];
            source.attrs = attrs.clone();
            let source_id = self.region.prepend(source);

            let mut sink = Operation::new(exec::NEXT_ITERATION_SINK, loc);
            sink.operands = vec![Value::result(source_id, 0)];
            sink.operands.extend(operands);
            sink.operands.extend(control_operands);
            sink.result_types = vec![Type::Control];
            sink.attrs = attrs;
            let sink_id = self.region.append(sink);

            self.sink_to_source.insert(sink_id, source_id);
            return Ok(sink_id);
        }

        // Ordinary operation: wrapped in an island. The island consumes the
        // control operands directly and mirrors the inner results plus one
        // trailing control token.
        let mut inner = Operation::new(op_name, loc.clone());
        inner.operands = operands;
        inner.result_types = result_types.clone();
        inner.attrs = attrs;

        let mut island = Operation::new(exec::ISLAND, loc);
        island.operands = control_operands;
        island.result_types = result_types;
        island.result_types.push(Type::Control);
        island.inner = Some(Box::new(inner));
        Ok(self.region.append(island))
    }

    /// Splices every recorded backedge back in: the paired source's token
    /// result lands in the destination merge's operand list at the
    /// original input position. Operand splicing leaves the destination's
    /// identity (and so every use of its results) untouched.
    fn add_backedges(&mut self) -> Result<()> {
        let mut records: Vec<BackedgeRecord> = self.backedges.by_dst.values().copied().collect();
        records.sort_by_key(|r| r.dst);

        for record in records {
            if self.graph.node(record.src).kind() != NodeKind::LoopUpdate
                || self.graph.node(record.dst).kind() != NodeKind::Merge
            {
                return Err(ImportError::MalformedGraph(format!(
                    "invalid backedge from '{}' to '{}': must connect a loop update to a merge",
                    self.graph.node(record.src).name,
                    self.graph.node(record.dst).name
                )));
            }

            let sink = *self.node_values.get(&record.src).ok_or_else(|| {
                ImportError::OrderingViolation(format!(
                    "backedge source '{}' was never converted",
                    self.graph.node(record.src).name
                ))
            })?;
            let source = *self
                .sink_to_source
                .get(&sink)
                .expect("loop sink is always paired with a source");
            let dst = *self.node_values.get(&record.dst).ok_or_else(|| {
                ImportError::OrderingViolation(format!(
                    "backedge destination '{}' was never converted",
                    self.graph.node(record.dst).name
                ))
            })?;

            let op = self.region.op_mut(dst);
            let position = record.dst_input.min(op.operands.len());
            op.operands.insert(position, Value::result(source, 0));
        }
        Ok(())
    }
}

/// Rewrites `LegacyFedInput` nodes named in the input bindings into
/// placeholders carrying the declared type and shape. A legacy node with a
/// non-primary output in use cannot be replaced by a single-output
/// placeholder.
pub(crate) fn upgrade_legacy_inputs(graph: &mut Graph, config: &ImportConfig) -> Result<()> {
    let legacy: Vec<NodeId> = graph
        .nodes()
        .filter(|n| n.op == ops::LEGACY_FED_INPUT && config.inputs.contains_key(&n.name))
        .map(|n| n.id)
        .collect();

    for id in legacy {
        let in_use = graph
            .out_edges(id)
            .iter()
            .any(|e| e.src_output().is_some_and(|o| o > 0));
        if in_use {
            return Err(ImportError::InvalidConfig(format!(
                "legacy input node '{}' has a non-primary output in use and cannot be upgraded",
                graph.node(id).name
            )));
        }

        let incoming: Vec<Edge> = graph.in_edges(id).to_vec();
        for edge in incoming {
            graph.remove_edge(&edge);
        }

        let binding = &config.inputs[&graph.node(id).name];
        let dtype = binding.dtype;
        let shape = binding.shape.clone();
        let node = graph.node_mut(id);
        node.op = ops::PLACEHOLDER.to_string();
        node.attrs.clear();
        node.attrs.insert("dtype".to_string(), AttrValue::Type(dtype));
        node.attrs.insert("shape".to_string(), AttrValue::Shape(shape));
        node.num_outputs = 1;
        debug!(node = %node.name, "upgraded legacy input to placeholder");
    }
    Ok(())
}
