//! Entity filter (spec.md §4.5): retype nodes whose retained evidence is
//! exclusively a single non-process category.

use chain_core::chain::NodeKind;
use chain_core::types::LogType;

use crate::graph::Graph;

/// Retype every node in `graph` whose alarms/logs all agree on one of
/// the recognized category rules. Nodes that mix categories, or whose
/// evidence doesn't match any rule, remain `NodeKind::Process`.
pub fn apply(graph: &mut Graph) {
    let ids: Vec<String> = graph.node_ids().map(|s| s.to_string()).collect();
    for id in ids {
        if let Some(kind) = classify(graph, &id) {
            graph.node_mut(&id).unwrap().node_kind = kind;
        }
    }
}

fn classify(graph: &Graph, id: &str) -> Option<NodeKind> {
    let node = graph.node(id)?;
    if node.is_alarm || node.is_virtual {
        return None;
    }

    let mut kind: Option<NodeKind> = None;
    for log in &node.logs {
        let this_kind = rule_for(&log.log_type, &log.op_type)?;
        match kind {
            None => kind = Some(this_kind),
            Some(k) if k == this_kind => {}
            Some(_) => return None,
        }
    }
    kind
}

fn rule_for(log_type: &LogType, op_type: &str) -> Option<NodeKind> {
    match (log_type, op_type) {
        (LogType::File, "create" | "write" | "delete") => Some(NodeKind::FileEntity),
        (LogType::Network, "connect") => Some(NodeKind::NetworkEntity),
        (LogType::Domain, "connect") => Some(NodeKind::DomainEntity),
        (LogType::Registry, "setValue") => Some(NodeKind::RegistryEntity),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_core::types::{EventPayload, RawLog};

    fn log(guid: &str, log_type: LogType, op_type: &str) -> RawLog {
        RawLog {
            event_id: format!("L-{guid}"),
            trace_id: "T1".to_string(),
            host_address: "10.0.0.1".to_string(),
            process_guid: Some(guid.to_string()),
            parent_process_guid: None,
            start_time: "2026-01-01T00:00:00Z".to_string(),
            log_type,
            op_type: op_type.to_string(),
            event_type: "file".to_string(),
            payload: EventPayload::default(),
        }
    }

    #[test]
    fn file_write_retypes_to_file_entity() {
        let mut graph = Graph::new();
        graph.get_or_create("F1");
        graph.add_log("F1", log("F1", LogType::File, "write"));
        apply(&mut graph);
        assert_eq!(graph.node("F1").unwrap().node_kind, NodeKind::FileEntity);
    }

    #[test]
    fn mixed_categories_remain_process() {
        let mut graph = Graph::new();
        graph.get_or_create("M1");
        graph.add_log("M1", log("M1", LogType::File, "write"));
        graph.add_log("M1", log("M1", LogType::Network, "connect"));
        apply(&mut graph);
        assert_eq!(graph.node("M1").unwrap().node_kind, NodeKind::Process);
    }

    #[test]
    fn alarm_nodes_are_never_retyped() {
        let mut graph = Graph::new();
        graph.get_or_create("A1").is_alarm = true;
        graph.add_log("A1", log("A1", LogType::File, "write"));
        apply(&mut graph);
        assert_eq!(graph.node("A1").unwrap().node_kind, NodeKind::Process);
    }
}
