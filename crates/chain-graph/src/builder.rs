//! Graph builder (spec.md §4.2): alarm nodes, log merging with virtual
//! parent synthesis, and alarm-driven edges. Phases run in order and
//! never remove anything — later phases only add.

use chain_core::chain::EdgeLabel;
use chain_core::types::{LogType, RawAlarm, RawLog};

use crate::graph::Graph;

/// spec.md §3: an edge into a file-delete target carries the empty-string
/// label instead of "connected" (Open Question #3).
fn is_file_delete(log_type: &LogType, op_type: &str) -> bool {
    *log_type == LogType::File && op_type == "delete"
}

fn edge_label_for_log(log: &RawLog) -> EdgeLabel {
    if is_file_delete(&log.log_type, &log.op_type) {
        EdgeLabel::None
    } else {
        EdgeLabel::Connected
    }
}

fn edge_label_for_alarm(alert: &RawAlarm) -> EdgeLabel {
    if is_file_delete(&alert.log_type, &alert.op_type) {
        EdgeLabel::None
    } else {
        EdgeLabel::Connected
    }
}

/// Prefix for a self-parent's synthesized virtual root ancestor.
pub const VIRTUAL_ROOT_PARENT_PREFIX: &str = "VIRTUAL_ROOT_PARENT_";

/// `VIRTUAL_ROOT_PARENT_<hex8(md5(origParent + "_ROOT_PARENT"))>` — the
/// self-parent synthetic ancestor ID scheme (spec.md §4.2).
pub fn synthetic_root_parent_id(orig_parent: &str) -> String {
    let digest = md5::compute(format!("{orig_parent}_ROOT_PARENT"));
    let hex = format!("{digest:x}");
    format!("{VIRTUAL_ROOT_PARENT_PREFIX}{}", &hex[..8])
}

pub struct GraphBuilder;

impl GraphBuilder {
    /// Run phases A–C and return the resulting graph. Phase D (analysis)
    /// is a separate stage (`analyzer::analyze`), run by the engine.
    pub fn build(alerts: &[RawAlarm], logs: &[RawLog]) -> Graph {
        let mut graph = Graph::new();
        Self::phase_a_alarm_nodes(&mut graph, alerts);
        Self::phase_b_log_merging(&mut graph, logs);
        Self::phase_c_alarm_edges(&mut graph, alerts);
        graph
    }

    fn phase_a_alarm_nodes(graph: &mut Graph, alerts: &[RawAlarm]) {
        for alert in alerts {
            let Some(guid) = alert.process_guid.clone() else {
                continue;
            };
            {
                let node = graph.get_or_create(&guid);
                node.is_virtual = false;
                if node.trace_id.is_none() {
                    node.trace_id = Some(alert.trace_id.clone());
                }
                if node.host_address.is_none() {
                    node.host_address = Some(alert.host_address.clone());
                }
                if node.parent_process_guid.is_none() {
                    node.parent_process_guid = alert.parent_process_guid.clone();
                }
            }
            graph.add_alarm(&guid, alert.clone());
        }
    }

    fn phase_b_log_merging(graph: &mut Graph, logs: &[RawLog]) {
        for log in logs {
            let Some(guid) = log.process_guid.clone() else {
                continue;
            };

            {
                let child = graph.get_or_create(&guid);
                child.is_virtual = false;
                if child.trace_id.is_none() {
                    child.trace_id = Some(log.trace_id.clone());
                }
                if child.host_address.is_none() {
                    child.host_address = Some(log.host_address.clone());
                }
            }
            graph.add_log(&guid, log.clone());

            let Some(parent_guid) = log.parent_process_guid.clone() else {
                continue;
            };

            let parent_id = if guid == parent_guid {
                let synthetic = synthetic_root_parent_id(&parent_guid);
                if let Some(child) = graph.node_mut(&guid) {
                    child.parent_process_guid = Some(synthetic.clone());
                }
                synthetic
            } else {
                if let Some(child) = graph.node_mut(&guid) {
                    if child.parent_process_guid.is_none() {
                        child.parent_process_guid = Some(parent_guid.clone());
                    }
                }
                parent_guid
            };

            if !graph.contains(&parent_id) {
                let virtual_log = RawLog::synthesize_virtual_parent(log, &parent_id);
                {
                    let parent_node = graph.get_or_create(&parent_id);
                    parent_node.is_virtual = true;
                    parent_node.trace_id = Some(log.trace_id.clone());
                    parent_node.host_address = Some(log.host_address.clone());
                }
                graph.add_log(&parent_id, virtual_log);
            }

            let _ = graph.add_edge(&parent_id, &guid, edge_label_for_log(log));
        }
    }

    fn phase_c_alarm_edges(graph: &mut Graph, alerts: &[RawAlarm]) {
        for alert in alerts {
            let (Some(guid), Some(parent_guid)) =
                (alert.process_guid.as_ref(), alert.parent_process_guid.as_ref())
            else {
                continue;
            };
            if guid == parent_guid {
                continue;
            }
            if graph.contains(guid) && graph.contains(parent_guid) {
                let _ = graph.add_edge(parent_guid, guid, edge_label_for_alarm(alert));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_core::types::{EventPayload, LogType, Severity};

    fn alarm(event_id: &str, guid: &str, parent: Option<&str>) -> RawAlarm {
        RawAlarm {
            event_id: event_id.to_string(),
            trace_id: "T1".to_string(),
            host_address: "10.0.0.1".to_string(),
            process_guid: Some(guid.to_string()),
            parent_process_guid: parent.map(|s| s.to_string()),
            threat_severity: Severity::High,
            alarm_source: "EDR".to_string(),
            start_time: "2026-01-01T00:00:02Z".to_string(),
            end_time: None,
            log_type: LogType::Process,
            op_type: "create".to_string(),
            alarm_name: None,
            payload: EventPayload::default(),
            other_fields: serde_json::Value::Null,
        }
    }

    fn log(event_id: &str, guid: &str, parent: Option<&str>, trace_id: &str, t: &str) -> RawLog {
        RawLog {
            event_id: event_id.to_string(),
            trace_id: trace_id.to_string(),
            host_address: "10.0.0.1".to_string(),
            process_guid: Some(guid.to_string()),
            parent_process_guid: parent.map(|s| s.to_string()),
            start_time: t.to_string(),
            log_type: LogType::Process,
            op_type: "create".to_string(),
            event_type: "process".to_string(),
            payload: EventPayload::default(),
        }
    }

    #[test]
    fn s1_single_linear_chain() {
        let alerts = vec![alarm("A1", "P2", Some("P1"))];
        let logs = vec![
            log("L1", "P1", None, "P1", "2026-01-01T00:00:01Z"),
            log("L2", "P2", Some("P1"), "P1", "2026-01-01T00:00:02Z"),
            log("L3", "P3", Some("P2"), "P1", "2026-01-01T00:00:03Z"),
        ];
        let graph = GraphBuilder::build(&alerts, &logs);
        assert_eq!(graph.node_count(), 3);
        assert!(graph.has_edge("P1", "P2"));
        assert!(graph.has_edge("P2", "P3"));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn virtual_parent_staged_then_merged_with_real_node() {
        // P1 arrives only as the parent of P2's log; it is staged virtual
        // until its own real log appears later in the same batch.
        let logs = vec![
            log("L1", "P2", Some("P1"), "T1", "2026-01-01T00:00:01Z"),
            log("L2", "P1", None, "T1", "2026-01-01T00:00:00Z"),
        ];
        let graph = GraphBuilder::build(&[], &logs);
        assert!(!graph.node("P1").unwrap().is_virtual);
        // the staged synthetic log plus the real log that merged into it
        assert_eq!(graph.node("P1").unwrap().log_count(), 2);
    }

    #[test]
    fn s3_self_parent_root_synthesizes_virtual_ancestor() {
        let logs = vec![log("L1", "P1", Some("P1"), "P1", "2026-01-01T00:00:00Z")];
        let graph = GraphBuilder::build(&[], &logs);
        let synthetic = synthetic_root_parent_id("P1");
        assert!(synthetic.starts_with(VIRTUAL_ROOT_PARENT_PREFIX));
        assert!(graph.has_edge(&synthetic, "P1"));
        assert_eq!(graph.node("P1").unwrap().parent_process_guid.as_deref(), Some(synthetic.as_str()));
    }

    #[test]
    fn file_delete_target_edge_carries_empty_label() {
        let mut delete_log = log("L2", "P2", Some("P1"), "P1", "2026-01-01T00:00:02Z");
        delete_log.log_type = LogType::File;
        delete_log.op_type = "delete".to_string();
        let logs = vec![log("L1", "P1", None, "P1", "2026-01-01T00:00:01Z"), delete_log];

        let graph = GraphBuilder::build(&[], &logs);
        let edge = graph.edges().iter().find(|e| e.source == "P1" && e.target == "P2").unwrap();
        assert_eq!(edge.label, EdgeLabel::None);
    }

    #[test]
    fn s4_cycle_rejection_keeps_graph_acyclic() {
        let logs = vec![
            log("L1", "P1", None, "T1", "2026-01-01T00:00:00Z"),
            log("L2", "P2", Some("P1"), "T1", "2026-01-01T00:00:01Z"),
        ];
        let alerts = vec![alarm("A1", "P1", Some("P2"))];
        let graph = GraphBuilder::build(&alerts, &logs);
        assert!(graph.has_edge("P1", "P2"));
        assert!(!graph.has_edge("P2", "P1"));
        assert_eq!(graph.edge_count(), 1);
    }
}
