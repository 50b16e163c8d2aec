//! Converter: project the internal [`Graph`] into the wire
//! [`IncidentProcessChain`] shape (spec.md §6, §9).

use std::cmp::Ordering;

use chain_core::chain::{
    AlarmNodeInfo, ChainNodeInfo, EntityPayload, IncidentEdge, IncidentNode, IncidentProcessChain,
    ProcessEntity, StoryNodeInfo,
};
use chain_core::chain::NodeKind;
use chain_core::types::{EventPayload, Severity};

use crate::graph::{Graph, GraphNode};

pub fn to_incident_process_chain(
    graph: &Graph,
    trace_ids: &[String],
    host_addresses: &[String],
) -> IncidentProcessChain {
    let nodes: Vec<IncidentNode> = graph
        .node_ids()
        .map(|id| to_incident_node(graph, id))
        .collect();

    let edges: Vec<IncidentEdge> = graph
        .edges()
        .iter()
        .map(|e| IncidentEdge {
            source: e.source.clone(),
            target: e.target.clone(),
            val: e.label,
        })
        .collect();

    let threat_severity = nodes
        .iter()
        .map(|n| n.node_threat_severity)
        .max()
        .unwrap_or_default();

    IncidentProcessChain {
        trace_ids: trace_ids.to_vec(),
        host_addresses: host_addresses.to_vec(),
        threat_severity,
        nodes,
        edges,
    }
}

fn to_incident_node(graph: &Graph, id: &str) -> IncidentNode {
    let node = graph.node(id).expect("node_ids() only yields existing nodes");
    let children_count = graph.out_degree(id);

    if node.is_story {
        return IncidentNode {
            node_id: id.to_string(),
            log_type: node.story_type.clone().unwrap_or_else(|| "story".to_string()),
            op_type: String::new(),
            node_threat_severity: Severity::Unknown,
            is_chain_node: false,
            chain_node: None,
            story_node: Some(StoryNodeInfo {
                story_type: node.story_type.clone().unwrap_or_default(),
                ip: node.ip.clone(),
            }),
            children_count,
        };
    }

    let highest_severity = node
        .alarms
        .iter()
        .map(|a| a.threat_severity)
        .max()
        .unwrap_or(Severity::Unknown);

    let latest = latest_evidence(node);

    let process_entity = matches!(node.node_kind, NodeKind::Process).then(|| ProcessEntity {
        process_name: latest.and_then(|e| e.payload.process_name.clone()),
        process_path: latest.and_then(|e| e.payload.process_path.clone()),
        command_line: latest.and_then(|e| e.payload.command_line.clone()),
    });

    let entity = is_entity_kind(node.node_kind).then(|| EntityPayload {
        file_name: latest.and_then(|e| e.payload.file_name.clone()),
        file_path: latest.and_then(|e| e.payload.file_path.clone()),
        file_md5: latest.and_then(|e| e.payload.file_md5.clone()),
        domain_name: latest.and_then(|e| e.payload.domain_name.clone()),
        dest_ip: latest.and_then(|e| e.payload.dest_ip.clone()),
        dest_port: latest.and_then(|e| e.payload.dest_port),
        target_object: latest.and_then(|e| e.payload.target_object.clone()),
        reg_value: latest.and_then(|e| e.payload.reg_value.clone()),
    });

    let alarm_node_info = node.is_alarm.then(|| AlarmNodeInfo {
        alarm_count: node.alarms.len(),
        highest_severity,
        alarm_names: node.alarms.iter().filter_map(|a| a.alarm_name.clone()).collect(),
        alarm_sources: dedup_sorted(node.alarms.iter().map(|a| a.alarm_source.clone())),
    });

    IncidentNode {
        node_id: id.to_string(),
        log_type: node.node_kind.as_str().to_string(),
        op_type: latest.map(|e| e.op_type.to_string()).unwrap_or_default(),
        node_threat_severity: highest_severity,
        is_chain_node: true,
        chain_node: Some(ChainNodeInfo {
            is_root: node.is_root,
            is_broken: node.is_broken,
            is_alarm: node.is_alarm,
            alarm_node_info,
            process_entity,
            entity,
            is_extension_node: None,
            extension_depth: None,
        }),
        story_node: None,
        children_count,
    }
}

fn is_entity_kind(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::FileEntity | NodeKind::DomainEntity | NodeKind::NetworkEntity | NodeKind::RegistryEntity
    )
}

fn dedup_sorted(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut v: Vec<String> = values.collect();
    v.sort();
    v.dedup();
    v
}

#[derive(Clone, Copy)]
struct Evidence<'a> {
    start_time: &'a str,
    is_virtual: bool,
    op_type: &'a str,
    payload: &'a EventPayload,
}

/// The node's most recent evidence, preferring real logs over virtual
/// ones on a timestamp tie (spec.md §9).
fn latest_evidence(node: &GraphNode) -> Option<Evidence<'_>> {
    let alarm_ev = node.alarms.iter().map(|a| Evidence {
        start_time: a.start_time.as_str(),
        is_virtual: false,
        op_type: a.op_type.as_str(),
        payload: &a.payload,
    });
    let log_ev = node.logs.iter().map(|l| Evidence {
        start_time: l.start_time.as_str(),
        is_virtual: l.is_virtual(),
        op_type: l.op_type.as_str(),
        payload: &l.payload,
    });

    alarm_ev.chain(log_ev).max_by(|a, b| {
        match a.start_time.cmp(b.start_time) {
            Ordering::Equal => (!a.is_virtual).cmp(&(!b.is_virtual)),
            other => other,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_core::types::{LogType, RawLog};

    #[test]
    fn latest_evidence_prefers_real_log_on_timestamp_tie() {
        let mut graph = Graph::new();
        graph.get_or_create("P1");
        let t = "2026-01-01T00:00:00Z";
        graph.add_log(
            "P1",
            RawLog {
                event_id: "VIRTUAL_LOG_P1".to_string(),
                trace_id: "T".to_string(),
                host_address: "10.0.0.1".to_string(),
                process_guid: Some("P1".to_string()),
                parent_process_guid: None,
                start_time: t.to_string(),
                log_type: LogType::Process,
                op_type: "virtual-create".to_string(),
                event_type: "process".to_string(),
                payload: EventPayload::default(),
            },
        );
        graph.add_log(
            "P1",
            RawLog {
                event_id: "real-1".to_string(),
                trace_id: "T".to_string(),
                host_address: "10.0.0.1".to_string(),
                process_guid: Some("P1".to_string()),
                parent_process_guid: None,
                start_time: t.to_string(),
                log_type: LogType::Process,
                op_type: "create".to_string(),
                event_type: "process".to_string(),
                payload: EventPayload::default(),
            },
        );
        let node = graph.node("P1").unwrap();
        let ev = latest_evidence(node).unwrap();
        assert_eq!(ev.op_type, "create");
    }

    #[test]
    fn story_nodes_convert_without_chain_node_info() {
        let mut graph = Graph::new();
        let n = graph.get_or_create("victim");
        n.is_story = true;
        n.story_type = Some("victim".to_string());
        n.ip = Some("10.0.0.1".to_string());

        let incident = to_incident_node(&graph, "victim");
        assert!(!incident.is_chain_node);
        assert!(incident.chain_node.is_none());
        assert_eq!(incident.story_node.unwrap().ip.as_deref(), Some("10.0.0.1"));
    }
}
