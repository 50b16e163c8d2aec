//! Structured companions to a built chain: counts and flags for the
//! non-fatal conditions spec.md §7 says must degrade in place rather
//! than propagate. Lets callers/tests assert on them without parsing
//! log lines.

use serde::{Deserialize, Serialize};

use crate::analyzer::CycleReport;
use crate::graph::Graph;

/// Snapshot of graph shape at the point diagnostics were taken.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub root_count: usize,
    pub broken_count: usize,
    pub alarm_count: usize,
}

impl GraphStats {
    pub fn of(graph: &Graph) -> Self {
        Self {
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            root_count: graph.root_node_ids().len(),
            broken_count: graph.broken_node_ids().len(),
            alarm_count: graph.alarm_node_ids().len(),
        }
    }
}

/// Accumulated non-fatal events from one `build()` run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDiagnostics {
    pub stats: GraphStats,
    /// Count of degraded `queryAlarms`/`queryLogs` sub-requests.
    pub query_failures: usize,
    /// Node IDs that hit `MAX_LOGS_PER_NODE` and had logs dropped.
    pub log_cap_exceeded_nodes: Vec<String>,
    /// Node IDs GraphAnalyzer's cycle pass still flagged — should stay
    /// empty given I3 forbids the back-edge insert in the first place.
    pub cycle_nodes: Vec<String>,
    /// Set when Pruner couldn't satisfy the cap without dropping a
    /// must-keep node and fell back to returning the graph unpruned.
    pub prune_failed: bool,
    /// Set when at least one requested traceId never got a root (real
    /// or EXPLORE-injected) — should stay false once ExploreInjector runs.
    pub no_root_found: bool,
    pub computation_ms: u64,
}

impl BuildDiagnostics {
    pub fn collect(graph: &Graph, cycles: &CycleReport, query_failures: usize, prune_failed: bool) -> Self {
        let log_cap_exceeded_nodes: Vec<String> = graph
            .node_ids()
            .filter(|id| graph.node(id).is_some_and(|n| n.log_capped()))
            .map(String::from)
            .collect();
        let mut cycle_nodes: Vec<String> = cycles.nodes_in_cycle.iter().cloned().collect();
        cycle_nodes.sort();

        Self {
            stats: GraphStats::of(graph),
            query_failures,
            log_cap_exceeded_nodes,
            cycle_nodes,
            prune_failed,
            no_root_found: false,
            computation_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_reflect_empty_graph() {
        let graph = Graph::new();
        let stats = GraphStats::of(&graph);
        assert_eq!(stats.node_count, 0);
        assert_eq!(stats.alarm_count, 0);
    }

    #[test]
    fn diagnostics_collect_log_capped_nodes() {
        use chain_core::types::{EventPayload, LogType, RawLog};

        let mut graph = Graph::new();
        graph.get_or_create("P1");
        for i in 0..1001 {
            graph.add_log(
                "P1",
                RawLog {
                    event_id: format!("L{i}"),
                    trace_id: "T".to_string(),
                    host_address: "10.0.0.1".to_string(),
                    process_guid: Some("P1".to_string()),
                    parent_process_guid: None,
                    start_time: "2026-01-01T00:00:00Z".to_string(),
                    log_type: LogType::Process,
                    op_type: "create".to_string(),
                    event_type: "process".to_string(),
                    payload: EventPayload::default(),
                },
            );
        }
        let cycles = CycleReport::default();
        let diagnostics = BuildDiagnostics::collect(&graph, &cycles, 0, false);
        assert_eq!(diagnostics.log_cap_exceeded_nodes, vec!["P1".to_string()]);
    }
}
