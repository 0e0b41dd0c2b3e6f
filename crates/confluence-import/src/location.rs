//! Location resolution
//!
//! Maps a node's recorded provenance to a structured location. Total: the
//! worst case is an uninformative name-only location, never a failure.
//!
//! Loop-update nodes are special: source/sink pairing depends on a unique,
//! stable identity, so their location is keyed on the node's own name and
//! ignores debug ancestry.

use confluence_graph::{DebugInfo, FileLineCol, Node, NodeKind};
use confluence_ir::Location;

/// Resolves the location of one node.
pub fn resolve(debug_info: &DebugInfo, node: &Node) -> Location {
    if node.kind() == NodeKind::LoopUpdate {
        return call_site_for(debug_info, &node.name);
    }

    if node.original_node_names.is_empty() {
        // No recorded ancestry: use the node's own name, through the
        // debug-info table when it has an entry.
        if debug_info.trace_for(&node.name).is_some() {
            call_site_for(debug_info, &node.name)
        } else {
            Location::name(&node.name)
        }
    } else {
        // The node was produced by a prior transformation from several
        // originals: fuse their call-site chains.
        let sites = node
            .original_node_names
            .iter()
            .map(|name| call_site_for(debug_info, name))
            .collect();
        Location::Fused(sites)
    }
}

/// Builds the call-site chain recorded for `name`, or a bare name location
/// when the debug-info table has nothing.
fn call_site_for(debug_info: &DebugInfo, name: &str) -> Location {
    let trace = match debug_info.trace_for(name) {
        Some(trace) if !trace.is_empty() => trace,
        _ => return Location::name(name),
    };

    let positions: Vec<Location> = trace.iter().map(position).collect();
    let node_loc = Location::name_at(name, positions[0].clone());
    if positions.len() == 1 {
        return node_loc;
    }

    // Chain the outer frames innermost-first under the name location.
    let mut caller = positions[positions.len() - 1].clone();
    for frame in positions[1..positions.len() - 1].iter().rev() {
        caller = Location::call_site(frame.clone(), caller);
    }
    Location::call_site(node_loc, caller)
}

fn position(p: &FileLineCol) -> Location {
    Location::file_line_col(p.file.clone(), p.line, p.col)
}

#[cfg(test)]
mod tests {
    use super::*;
    use confluence_graph::{NodeId, ops};
    use indexmap::IndexMap;

    fn node(name: &str, op: &str, originals: Vec<String>) -> Node {
        Node {
            id: NodeId(1),
            name: name.to_string(),
            op: op.to_string(),
            attrs: IndexMap::new(),
            device: String::new(),
            num_outputs: 1,
            original_node_names: originals,
        }
    }

    fn debug_with(name: &str, frames: &[(&str, u32, u32)]) -> DebugInfo {
        let mut info = DebugInfo::new();
        info.insert_trace(
            name,
            frames
                .iter()
                .map(|(f, l, c)| FileLineCol {
                    file: f.to_string(),
                    line: *l,
                    col: *c,
                })
                .collect(),
        );
        info
    }

    #[test]
    fn test_name_fallback_without_debug_info() {
        let loc = resolve(&DebugInfo::new(), &node("add", "Add", Vec::new()));
        assert_eq!(loc, Location::name("add"));
    }

    #[test]
    fn test_trace_becomes_call_site_chain() {
        let info = debug_with("add", &[("model.py", 10, 2), ("train.py", 30, 4)]);
        let loc = resolve(&info, &node("add", "Add", Vec::new()));
        assert_eq!(
            loc,
            Location::call_site(
                Location::name_at("add", Location::file_line_col("model.py", 10, 2)),
                Location::file_line_col("train.py", 30, 4),
            )
        );
    }

    #[test]
    fn test_original_names_fuse() {
        let info = debug_with("orig_a", &[("a.py", 1, 1)]);
        let loc = resolve(
            &info,
            &node(
                "fused",
                "Add",
                vec!["orig_a".to_string(), "orig_b".to_string()],
            ),
        );
        match loc {
            Location::Fused(parts) => {
                assert_eq!(parts.len(), 2);
                assert_eq!(parts[1], Location::name("orig_b"));
            }
            other => panic!("expected fused location, got {}", other),
        }
    }

    #[test]
    fn test_loop_update_uses_own_name_only() {
        let info = debug_with("orig", &[("a.py", 1, 1)]);
        let loc = resolve(
            &info,
            &node("next", ops::NEXT_ITERATION, vec!["orig".to_string()]),
        );
        assert_eq!(loc, Location::name("next"));
    }
}
