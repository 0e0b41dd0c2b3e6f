//! Backedge removal
//!
//! Loop constructs make the input graph genuinely cyclic: the loop-carried
//! update node feeds the loop's merge node. Those edges are stripped from
//! the working copy so ordering and shape refinement see a DAG, and are
//! recorded for reinsertion into the finished IR.

use std::collections::HashMap;

use tracing::debug;

use confluence_graph::{Edge, Graph, NodeId, NodeKind};

use crate::error::{ImportError, Result};

/// One removed cycle-forming edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackedgeRecord {
    pub src: NodeId,
    pub src_output: usize,
    pub dst: NodeId,
    pub dst_input: usize,
}

/// The stripped backedges, indexed the two ways the importer needs them.
#[derive(Debug, Default)]
pub struct RemovedBackedges {
    /// Per source node, the single output index implicated as a backedge.
    pub source_output: HashMap<NodeId, usize>,
    /// Per destination node, the backedge it receives.
    pub by_dst: HashMap<NodeId, BackedgeRecord>,
}

impl RemovedBackedges {
    pub fn is_empty(&self) -> bool {
        self.by_dst.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_dst.len()
    }
}

/// Strips every loop-carried edge (loop-update source feeding a merge
/// destination) from `graph`, leaving it acyclic.
pub fn remove_backedges(graph: &mut Graph) -> Result<RemovedBackedges> {
    let mut candidates: Vec<Edge> = Vec::new();
    for node in graph.nodes() {
        if node.kind() != NodeKind::LoopUpdate {
            continue;
        }
        for edge in graph.out_edges(node.id) {
            if edge.is_control() {
                continue;
            }
            if graph.node(edge.dst).kind() == NodeKind::Merge {
                candidates.push(*edge);
            }
        }
    }

    let mut removed = RemovedBackedges::default();
    for edge in candidates {
        let record = BackedgeRecord {
            src: edge.src,
            src_output: edge.src_output().expect("backedge candidates are data edges"),
            dst: edge.dst,
            dst_input: edge.dst_input().expect("backedge candidates are data edges"),
        };

        match removed.source_output.get(&record.src) {
            Some(&output) if output != record.src_output => {
                return Err(ImportError::MalformedGraph(format!(
                    "node '{}' has more than one output implicated as a backedge source",
                    graph.node(record.src).name
                )));
            }
            _ => {
                removed.source_output.insert(record.src, record.src_output);
            }
        }

        if removed.by_dst.insert(record.dst, record).is_some() {
            return Err(ImportError::MalformedGraph(format!(
                "merge node '{}' receives more than one backedge",
                graph.node(record.dst).name
            )));
        }

        graph.remove_edge(&edge);
    }

    debug!(count = removed.len(), "removed backedges");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use confluence_graph::{NodeInit, VersionInfo, ops};

    #[test]
    fn test_acyclic_graph_untouched() {
        let mut g = Graph::new(VersionInfo::default());
        let a = g.add_node(NodeInit::new("a", "Const", 1));
        let b = g.add_node(NodeInit::new("b", "Identity", 1));
        g.add_data_edge(a, 0, b, 0);

        let removed = remove_backedges(&mut g).unwrap();
        assert!(removed.is_empty());
        assert_eq!(g.in_edges(b).len(), 1);
    }

    #[test]
    fn test_loop_edge_removed_and_recorded() {
        let mut g = Graph::new(VersionInfo::default());
        let merge = g.add_node(NodeInit::new("merge", ops::MERGE, 2));
        let next = g.add_node(NodeInit::new("next", ops::NEXT_ITERATION, 1));
        g.add_data_edge(merge, 0, next, 0);
        g.add_data_edge(next, 0, merge, 1);

        let removed = remove_backedges(&mut g).unwrap();
        assert_eq!(removed.len(), 1);
        let record = removed.by_dst[&merge];
        assert_eq!(record.src, next);
        assert_eq!(record.dst_input, 1);
        // Only the cycle-forming edge is gone.
        assert_eq!(g.in_edges(merge).len(), 0);
        assert_eq!(g.in_edges(next).len(), 1);
    }

    #[test]
    fn test_two_backedges_into_one_merge_rejected() {
        let mut g = Graph::new(VersionInfo::default());
        let merge = g.add_node(NodeInit::new("merge", ops::MERGE, 2));
        let n1 = g.add_node(NodeInit::new("n1", ops::NEXT_ITERATION, 1));
        let n2 = g.add_node(NodeInit::new("n2", ops::NEXT_ITERATION, 1));
        g.add_data_edge(n1, 0, merge, 0);
        g.add_data_edge(n2, 0, merge, 1);

        let err = remove_backedges(&mut g).unwrap_err();
        assert!(matches!(err, ImportError::MalformedGraph(_)));
    }

    #[test]
    fn test_ambiguous_source_output_rejected() {
        let mut g = Graph::new(VersionInfo::default());
        let m1 = g.add_node(NodeInit::new("m1", ops::MERGE, 2));
        let m2 = g.add_node(NodeInit::new("m2", ops::MERGE, 2));
        let next = g.add_node(NodeInit::new("next", ops::NEXT_ITERATION, 2));
        g.add_data_edge(next, 0, m1, 0);
        g.add_data_edge(next, 1, m2, 0);

        let err = remove_backedges(&mut g).unwrap_err();
        assert!(matches!(err, ImportError::MalformedGraph(_)));
    }
}
