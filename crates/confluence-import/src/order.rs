//! Deterministic node ordering
//!
//! Reverse post-order over the acyclic working graph, with node name as the
//! total-order tie-break among otherwise-unordered siblings. The result is
//! reproducible regardless of node storage or edge insertion order, which
//! downstream operand reconstruction depends on.
//!
//! The order is invalidated by any structural mutation and must be
//! re-derived after one.

use std::collections::HashSet;

use confluence_graph::{Graph, NodeId};

/// Reverse post-order traversal from all graph roots (the pseudo source
/// node and any node without incoming edges).
pub fn reverse_post_order(graph: &Graph) -> Vec<NodeId> {
    let mut roots: Vec<NodeId> = graph
        .node_ids()
        .filter(|&id| graph.in_edges(id).is_empty())
        .collect();
    roots.sort_by(|&a, &b| graph.node(a).name.cmp(&graph.node(b).name));

    let mut postorder = Vec::new();
    let mut visited: HashSet<NodeId> = HashSet::new();

    // Iterative DFS; the second stack entry is the expanded-children flag.
    let mut stack: Vec<(NodeId, bool)> = Vec::new();
    for root in roots.into_iter().rev() {
        stack.push((root, false));
    }

    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            postorder.push(id);
            continue;
        }
        if !visited.insert(id) {
            continue;
        }
        stack.push((id, true));

        let mut successors: Vec<NodeId> = graph
            .out_edges(id)
            .iter()
            .map(|e| e.dst)
            .filter(|dst| !visited.contains(dst))
            .collect();
        successors.sort_by(|&a, &b| graph.node(a).name.cmp(&graph.node(b).name));
        successors.dedup();
        for succ in successors.into_iter().rev() {
            stack.push((succ, false));
        }
    }

    postorder.reverse();
    postorder
}

#[cfg(test)]
mod tests {
    use super::*;
    use confluence_graph::{NodeInit, VersionInfo};

    #[test]
    fn test_rpo_is_topological() {
        let mut g = Graph::new(VersionInfo::default());
        let a = g.add_node(NodeInit::new("a", "Const", 1));
        let b = g.add_node(NodeInit::new("b", "Identity", 1));
        let c = g.add_node(NodeInit::new("c", "Identity", 1));
        g.add_data_edge(a, 0, b, 0);
        g.add_data_edge(b, 0, c, 0);

        let order = reverse_post_order(&g);
        let pos = |id: NodeId| order.iter().position(|&x| x == id).unwrap();
        assert!(pos(a) < pos(b));
        assert!(pos(b) < pos(c));
    }

    #[test]
    fn test_rpo_is_deterministic_under_insertion_order() {
        // Same structure, nodes inserted in different orders: sibling
        // ordering must come from names, not storage.
        let build = |names: &[&str]| {
            let mut g = Graph::new(VersionInfo::default());
            let ids: Vec<NodeId> = names
                .iter()
                .map(|n| g.add_node(NodeInit::new(*n, "Const", 1)))
                .collect();
            let sink = g.add_node(NodeInit::new("sink", "AddN", 1));
            for (i, id) in ids.iter().enumerate() {
                g.add_data_edge(*id, 0, sink, i);
            }
            reverse_post_order(&g)
                .into_iter()
                .map(|id| g.node(id).name.clone())
                .collect::<Vec<_>>()
        };

        let forward = build(&["p", "q", "r"]);
        let shuffled = build(&["r", "p", "q"]);
        assert_eq!(forward, shuffled);
    }
}
