//! Explore injector (spec.md §4.7): give every traceId without a real
//! root, and every broken node, a synthetic upward anchor.

use chain_core::chain::{EdgeLabel, NodeKind};

use crate::graph::Graph;

pub const EXPLORE_ROOT_PREFIX: &str = "EXPLORE_ROOT_";

/// Inject `EXPLORE_ROOT_<traceId>` anchors for every traceId in
/// `trace_ids` lacking a real root, then wire every broken node to its
/// traceId's root (real or newly injected) with a "broken" edge.
///
/// Resolves spec.md's Open Question #1: a broken node with no recorded
/// traceId attaches to the lexicographically smallest traceId that
/// needed an explore root, rather than to an unspecified "first" in
/// iteration order.
pub fn inject(graph: &mut Graph, trace_ids: &[String]) {
    let mut without_root: Vec<String> = trace_ids
        .iter()
        .filter(|t| !graph.trace_id_to_root_node.contains_key(t.as_str()))
        .cloned()
        .collect();
    without_root.sort();

    if without_root.is_empty() && graph.broken_node_ids().is_empty() {
        return;
    }

    for trace_id in &without_root {
        let explore_id = format!("{EXPLORE_ROOT_PREFIX}{trace_id}");
        {
            let node = graph.get_or_create(&explore_id);
            node.node_kind = NodeKind::Explore;
            node.is_root = true;
            node.trace_id = Some(trace_id.clone());
        }
        graph.trace_id_to_root_node.insert(trace_id.clone(), explore_id);
    }

    let fallback_trace_id = without_root
        .first()
        .cloned()
        .or_else(|| graph.trace_id_to_root_node.keys().min().cloned());

    let broken_ids: Vec<String> = graph.broken_node_ids().into_iter().map(String::from).collect();
    for broken_id in broken_ids {
        let trace_id = graph
            .broken_node_to_trace_id
            .get(&broken_id)
            .cloned()
            .or_else(|| fallback_trace_id.clone());
        let Some(trace_id) = trace_id else { continue };
        let Some(root_id) = graph.trace_id_to_root_node.get(&trace_id).cloned() else {
            continue;
        };
        let _ = graph.add_edge(&root_id, &broken_id, EdgeLabel::Broken);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s2_broken_chain_gets_explore_root() {
        let mut graph = Graph::new();
        graph.get_or_create("P2").is_broken = true;
        graph.broken_node_to_trace_id.insert("P2".to_string(), "T".to_string());

        inject(&mut graph, &["T".to_string()]);

        assert!(graph.contains("EXPLORE_ROOT_T"));
        assert!(graph.node("EXPLORE_ROOT_T").unwrap().is_root);
        assert!(graph.has_edge("EXPLORE_ROOT_T", "P2"));
        assert_eq!(graph.trace_id_to_root_node.get("T"), Some(&"EXPLORE_ROOT_T".to_string()));
    }

    #[test]
    fn noop_when_all_traces_rooted_and_nothing_broken() {
        let mut graph = Graph::new();
        graph.get_or_create("P1").is_root = true;
        graph.trace_id_to_root_node.insert("T".to_string(), "P1".to_string());

        inject(&mut graph, &["T".to_string()]);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn b3_exactly_one_explore_root_for_one_broken_node() {
        let mut graph = Graph::new();
        for i in 0..401 {
            graph.get_or_create(&format!("n{i}"));
        }
        graph.node_mut("n0").unwrap().is_broken = true;
        graph.broken_node_to_trace_id.insert("n0".to_string(), "T".to_string());

        inject(&mut graph, &["T".to_string()]);

        let explore_count = graph.node_ids().filter(|id| id.starts_with(EXPLORE_ROOT_PREFIX)).count();
        assert_eq!(explore_count, 1);
        let broken_edges = graph.edges().iter().filter(|e| e.label == EdgeLabel::Broken).count();
        assert_eq!(broken_edges, 1);
    }

    #[test]
    fn unrecorded_trace_id_falls_back_to_lexicographic_smallest() {
        let mut graph = Graph::new();
        graph.get_or_create("orphan").is_broken = true;
        // no entry in broken_node_to_trace_id

        inject(&mut graph, &["Tb".to_string(), "Ta".to_string()]);

        assert!(graph.has_edge("EXPLORE_ROOT_Ta", "orphan"));
    }
}
