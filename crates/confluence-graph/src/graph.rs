//! The graph arena
//!
//! Nodes live in an id-indexed arena; removal vacates the slot without
//! shifting ids, so node identities stay resolvable for the whole import.
//! Edges are mirrored into per-node in/out adjacency lists.
//!
//! A cyclic graph is representable directly (an edge may point at any live
//! node); cycle handling is the importer's job, not the graph's.

use std::fmt;

use crate::attr::AttrValue;
use crate::node::{Node, NodeId, NodeInit, ops};

/// Version and producer metadata copied onto the IR module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionInfo {
    pub producer: i32,
    pub min_consumer: i32,
    pub bad_consumers: Vec<i32>,
}

/// What an edge carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgePort {
    /// A value flowing from output `src_output` into input `dst_input`.
    Data { src_output: usize, dst_input: usize },
    /// A pure ordering constraint.
    Control,
}

/// A directed edge between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub src: NodeId,
    pub dst: NodeId,
    pub port: EdgePort,
}

impl Edge {
    pub fn is_control(&self) -> bool {
        matches!(self.port, EdgePort::Control)
    }

    /// Source output index for a data edge.
    pub fn src_output(&self) -> Option<usize> {
        match self.port {
            EdgePort::Data { src_output, .. } => Some(src_output),
            EdgePort::Control => None,
        }
    }

    /// Destination input index for a data edge.
    pub fn dst_input(&self) -> Option<usize> {
        match self.port {
            EdgePort::Data { dst_input, .. } => Some(dst_input),
            EdgePort::Control => None,
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            EdgePort::Data {
                src_output,
                dst_input,
            } => write!(f, "{}:{} -> {}:{}", self.src, src_output, self.dst, dst_input),
            EdgePort::Control => write!(f, "{} ->ctl {}", self.src, self.dst),
        }
    }
}

/// Directed multigraph of nodes, with a pseudo source node at id 0.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Option<Node>>,
    in_edges: Vec<Vec<Edge>>,
    out_edges: Vec<Vec<Edge>>,
    versions: VersionInfo,
}

impl Graph {
    /// Empty graph containing only the pseudo source node.
    pub fn new(versions: VersionInfo) -> Self {
        let mut graph = Self {
            nodes: Vec::new(),
            in_edges: Vec::new(),
            out_edges: Vec::new(),
            versions,
        };
        graph.add_node(NodeInit::new("_SOURCE", ops::SOURCE, 0));
        graph
    }

    /// The pseudo source node's id.
    pub fn source_id(&self) -> NodeId {
        NodeId(0)
    }

    pub fn versions(&self) -> &VersionInfo {
        &self.versions
    }

    /// Upper bound over all ids ever assigned; suitable for sizing
    /// id-indexed side tables.
    pub fn node_bound(&self) -> usize {
        self.nodes.len()
    }

    /// Adds a node, assigning the next id.
    pub fn add_node(&mut self, init: NodeInit) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node {
            id,
            name: init.name,
            op: init.op,
            attrs: init.attrs,
            device: init.device,
            num_outputs: init.num_outputs,
            original_node_names: init.original_node_names,
        }));
        self.in_edges.push(Vec::new());
        self.out_edges.push(Vec::new());
        id
    }

    /// Removes a node and every edge touching it. The id becomes stale and
    /// is never reused.
    pub fn remove_node(&mut self, id: NodeId) {
        let incoming = std::mem::take(&mut self.in_edges[id.0]);
        for edge in incoming {
            self.out_edges[edge.src.0].retain(|e| e != &edge);
        }
        let outgoing = std::mem::take(&mut self.out_edges[id.0]);
        for edge in outgoing {
            self.in_edges[edge.dst.0].retain(|e| e != &edge);
        }
        self.nodes[id.0] = None;
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).is_some_and(|slot| slot.is_some())
    }

    /// The node for a live id.
    ///
    /// # Panics
    ///
    /// Panics on a stale or out-of-range id; callers hold ids they obtained
    /// from this graph.
    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes[id.0]
            .as_ref()
            .expect("stale node id")
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.0]
            .as_mut()
            .expect("stale node id")
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(|slot| slot.as_ref())
    }

    /// Live nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter_map(|slot| slot.as_ref())
    }

    /// Live node ids in id order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes().map(|n| n.id)
    }

    /// Finds a live node by name.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes().find(|n| n.name == name).map(|n| n.id)
    }

    pub fn add_data_edge(
        &mut self,
        src: NodeId,
        src_output: usize,
        dst: NodeId,
        dst_input: usize,
    ) {
        self.push_edge(Edge {
            src,
            dst,
            port: EdgePort::Data {
                src_output,
                dst_input,
            },
        });
    }

    pub fn add_control_edge(&mut self, src: NodeId, dst: NodeId) {
        self.push_edge(Edge {
            src,
            dst,
            port: EdgePort::Control,
        });
    }

    fn push_edge(&mut self, edge: Edge) {
        debug_assert!(self.contains(edge.src) && self.contains(edge.dst));
        self.out_edges[edge.src.0].push(edge);
        self.in_edges[edge.dst.0].push(edge);
    }

    /// Removes one edge; returns whether it was present.
    pub fn remove_edge(&mut self, edge: &Edge) -> bool {
        let before = self.out_edges[edge.src.0].len();
        self.out_edges[edge.src.0].retain(|e| e != edge);
        self.in_edges[edge.dst.0].retain(|e| e != edge);
        self.out_edges[edge.src.0].len() != before
    }

    /// Redirects every out-edge of `from` to originate at `to` instead.
    /// Data edges are re-pointed at `to`'s output 0 (the replacement node
    /// is single-output by construction); control edges stay control.
    pub fn redirect_out_edges(&mut self, from: NodeId, to: NodeId) {
        let outgoing = std::mem::take(&mut self.out_edges[from.0]);
        for edge in outgoing {
            self.in_edges[edge.dst.0].retain(|e| e != &edge);
            match edge.port {
                EdgePort::Data { dst_input, .. } => {
                    self.add_data_edge(to, 0, edge.dst, dst_input)
                }
                EdgePort::Control => self.add_control_edge(to, edge.dst),
            }
        }
    }

    /// Incoming edges of a node, in insertion order. Insertion order is an
    /// artifact of construction, not a guarantee; consumers that care must
    /// sort.
    pub fn in_edges(&self, id: NodeId) -> &[Edge] {
        &self.in_edges[id.0]
    }

    /// Outgoing edges of a node, in insertion order.
    pub fn out_edges(&self, id: NodeId) -> &[Edge] {
        &self.out_edges[id.0]
    }

    /// Convenience: attribute of a live node.
    pub fn node_attr(&self, id: NodeId, name: &str) -> Option<&AttrValue> {
        self.node(id).attr(name)
    }
}
