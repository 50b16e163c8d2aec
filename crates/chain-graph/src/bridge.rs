//! Bridger (spec.md §4.8): link the externally supplied network
//! storyline graph to each host's endpoint provenance root.

use std::collections::{HashMap, HashSet};

use chain_core::chain::{EdgeLabel, NodeKind};
use serde::{Deserialize, Serialize};

use crate::graph::Graph;

/// A node from the externally supplied network-side storyline graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkNode {
    pub node_id: String,
    pub node_type: String,
    pub ip: Option<String>,
}

/// An edge from the externally supplied network-side storyline graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkEdge {
    pub source: String,
    pub target: String,
}

/// Seed the network storyline's nodes into `graph` as story nodes (so
/// the final conversion can project them alongside chain nodes), then
/// link every `victim` story node to its host's endpoint root.
pub fn bridge(
    graph: &mut Graph,
    network_nodes: &[NetworkNode],
    network_edges: &[NetworkEdge],
    host_to_trace_id: &HashMap<String, String>,
) {
    for node in network_nodes {
        let g = graph.get_or_create(&node.node_id);
        g.is_story = true;
        g.story_type = Some(node.node_type.clone());
        g.ip = node.ip.clone();
    }
    for edge in network_edges {
        let _ = graph.add_network_edge(&edge.source, &edge.target, EdgeLabel::Connected);
    }

    let source_set: HashSet<&str> = network_edges.iter().map(|e| e.source.as_str()).collect();

    for victim in network_nodes.iter().filter(|n| n.node_type == "victim") {
        let Some(ip) = &victim.ip else { continue };
        let Some(trace_id) = host_to_trace_id.get(ip) else { continue };
        let Some(root_id) = graph.trace_id_to_root_node.get(trace_id).cloned() else { continue };

        if source_set.contains(victim.node_id.as_str()) {
            let bridge_id = format!("VIRTUAL_BRIDGE_{}", victim.node_id);
            {
                let spacer = graph.get_or_create(&bridge_id);
                spacer.node_kind = NodeKind::Virtual;
                spacer.is_virtual = true;
            }
            let _ = graph.add_edge(&victim.node_id, &bridge_id, EdgeLabel::Bridge);
            let _ = graph.add_edge(&bridge_id, &root_id, EdgeLabel::Bridge);
        } else {
            let _ = graph.add_edge(&victim.node_id, &root_id, EdgeLabel::Bridge);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_endpoint_graph() -> Graph {
        let mut graph = Graph::new();
        graph.get_or_create("P1").is_root = true;
        graph.trace_id_to_root_node.insert("T1".to_string(), "P1".to_string());
        graph
    }

    #[test]
    fn s6_victim_in_source_set_gets_bridge_spacer() {
        let mut graph = setup_endpoint_graph();
        let nodes = vec![
            NetworkNode { node_id: "attacker".to_string(), node_type: "attacker".to_string(), ip: None },
            NetworkNode { node_id: "victim".to_string(), node_type: "victim".to_string(), ip: Some("10.0.0.1".to_string()) },
            NetworkNode { node_id: "server".to_string(), node_type: "server".to_string(), ip: None },
        ];
        let edges = vec![
            NetworkEdge { source: "attacker".to_string(), target: "victim".to_string() },
            NetworkEdge { source: "victim".to_string(), target: "server".to_string() },
        ];
        let mut host_to_trace = HashMap::new();
        host_to_trace.insert("10.0.0.1".to_string(), "T1".to_string());

        bridge(&mut graph, &nodes, &edges, &host_to_trace);

        assert!(graph.has_edge("attacker", "victim"));
        assert!(graph.has_edge("victim", "server"));
        assert!(graph.has_edge("victim", "VIRTUAL_BRIDGE_victim"));
        assert!(graph.has_edge("VIRTUAL_BRIDGE_victim", "P1"));
    }

    #[test]
    fn victim_not_in_source_set_gets_direct_edge() {
        let mut graph = setup_endpoint_graph();
        let nodes = vec![NetworkNode {
            node_id: "victim".to_string(),
            node_type: "victim".to_string(),
            ip: Some("10.0.0.1".to_string()),
        }];
        let mut host_to_trace = HashMap::new();
        host_to_trace.insert("10.0.0.1".to_string(), "T1".to_string());

        bridge(&mut graph, &nodes, &[], &host_to_trace);

        assert!(graph.has_edge("victim", "P1"));
        assert!(!graph.contains("VIRTUAL_BRIDGE_victim"));
    }

    #[test]
    fn reverse_pair_network_edges_both_survive() {
        // Two hosts connecting to each other — a legitimate bidirectional
        // network edge that `Graph::add_edge`'s I3 reverse-edge rejection
        // would otherwise silently drop one direction of.
        let mut graph = Graph::new();
        let nodes = vec![
            NetworkNode { node_id: "hostA".to_string(), node_type: "host".to_string(), ip: None },
            NetworkNode { node_id: "hostB".to_string(), node_type: "host".to_string(), ip: None },
        ];
        let edges = vec![
            NetworkEdge { source: "hostA".to_string(), target: "hostB".to_string() },
            NetworkEdge { source: "hostB".to_string(), target: "hostA".to_string() },
        ];

        bridge(&mut graph, &nodes, &edges, &HashMap::new());

        assert!(graph.has_edge("hostA", "hostB"));
        assert!(graph.has_edge("hostB", "hostA"));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn victim_with_unmapped_ip_is_skipped() {
        let mut graph = setup_endpoint_graph();
        let nodes = vec![NetworkNode {
            node_id: "victim".to_string(),
            node_type: "victim".to_string(),
            ip: Some("10.0.0.99".to_string()),
        }];
        bridge(&mut graph, &nodes, &[], &HashMap::new());
        assert_eq!(graph.out_degree("victim"), 0);
    }
}
