//! Orchestration: the full pipeline from §2's data-flow diagram, wired
//! end to end. No exception propagates out of [`IncidentChainEngine::build`]
//! — every stage degrades in place per spec.md §7.

use std::collections::HashMap;
use std::time::Instant;

use chain_core::chain::IncidentProcessChain;
use chain_core::config::ChainConfig;
use chain_core::types::{IpMappingRelation, RawAlarm, RawLog};
use chain_query::QueryClient;

use crate::bridge::{self, NetworkEdge, NetworkNode};
use crate::builder::GraphBuilder;
use crate::diagnostics::BuildDiagnostics;
use crate::graph::Graph;
use crate::{analyzer, convert, elector, entity_filter, explore, extractor, pruner};

/// The externally supplied network storyline graph to bridge against
/// (spec.md §4.8). `None` skips bridging entirely.
pub struct NetworkBridgeInput {
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<NetworkEdge>,
}

pub struct IncidentChainEngine<'a> {
    client: &'a QueryClient,
    config: &'a ChainConfig,
}

impl<'a> IncidentChainEngine<'a> {
    pub fn new(client: &'a QueryClient, config: &'a ChainConfig) -> Self {
        Self { client, config }
    }

    /// Run the full pipeline: election, build, analysis, extraction,
    /// entity filtering, pruning, EXPLORE injection, and (optionally)
    /// bridging — producing the final wire chain alongside a summary of
    /// every non-fatal condition hit along the way.
    ///
    /// `start_log_event_ids` supplies, per host, the log event IDs that
    /// mark start nodes when that host has no alerts at all (spec.md §3's
    /// "no-alarm start-log" mode; also requires `mapping`'s `traceId` hint
    /// for that host).
    pub async fn build(
        &self,
        mapping: &IpMappingRelation,
        start_log_event_ids: &HashMap<String, Vec<String>>,
        network: Option<&NetworkBridgeInput>,
    ) -> (IncidentProcessChain, BuildDiagnostics) {
        let started = Instant::now();
        let failures_before = self.client.failure_count();

        let ips = mapping.ips();
        if ips.is_empty() {
            return (IncidentProcessChain::default(), BuildDiagnostics::default());
        }

        let alarms_per_ip = self.client.batch_alarms(&ips).await;

        let mut selected_alarms: Vec<RawAlarm> = Vec::new();
        let mut host_to_trace_id: HashMap<String, String> = HashMap::new();
        let mut trace_ids: Vec<String> = Vec::new();

        for (ip, alarms) in ips.iter().zip(alarms_per_ip) {
            let selected = elector::elect(&alarms, mapping.associated_event_id(ip), mapping.has_association(ip));
            if !selected.is_empty() {
                let trace_id = selected[0].trace_id.clone();
                host_to_trace_id.insert(ip.clone(), trace_id.clone());
                if !trace_ids.contains(&trace_id) {
                    trace_ids.push(trace_id);
                }
                selected_alarms.extend(selected);
            } else if start_log_event_ids.contains_key(ip) {
                if let Some(trace_id) = mapping.trace_id_hint(ip) {
                    let trace_id = trace_id.to_string();
                    host_to_trace_id.insert(ip.clone(), trace_id.clone());
                    if !trace_ids.contains(&trace_id) {
                        trace_ids.push(trace_id);
                    }
                }
            }
        }

        if trace_ids.is_empty() {
            let diagnostics = BuildDiagnostics {
                query_failures: self.client.failure_count() - failures_before,
                computation_ms: started.elapsed().as_millis() as u64,
                ..Default::default()
            };
            return (IncidentProcessChain::default(), diagnostics);
        }

        let logs_by_host = self.client.batch_logs(&host_to_trace_id).await;
        let all_logs: Vec<RawLog> = logs_by_host.into_values().flatten().collect();

        let mut graph = GraphBuilder::build(&selected_alarms, &all_logs);
        let cycles = analyzer::analyze(&mut graph);

        let mut start_nodes: Vec<String> =
            selected_alarms.iter().filter_map(|a| a.process_guid.clone()).collect();
        for (ip, event_ids) in start_log_event_ids {
            if host_to_trace_id.contains_key(ip) {
                start_nodes.extend(
                    all_logs
                        .iter()
                        .filter(|l| &l.host_address == ip && event_ids.contains(&l.event_id))
                        .filter_map(|l| l.process_guid.clone()),
                );
            }
        }

        let keep = extractor::extract(&graph, &start_nodes, self.config.max_traversal_depth);
        let mut graph = graph.subgraph(&keep);

        entity_filter::apply(&mut graph);

        let associated = mapping.all_associated_event_ids();
        let (mut graph, prune_failed) = pruner::prune_reporting(&graph, &associated, self.config.max_node_count);

        explore::inject(&mut graph, &trace_ids);
        let no_root_found = trace_ids.iter().any(|t| !graph.trace_id_to_root_node.contains_key(t));

        if let Some(network) = network {
            bridge::bridge(&mut graph, &network.nodes, &network.edges, &host_to_trace_id);
        }

        let query_failures = self.client.failure_count() - failures_before;
        let mut diagnostics = BuildDiagnostics::collect(&graph, &cycles, query_failures, prune_failed);
        diagnostics.no_root_found = no_root_found;
        diagnostics.computation_ms = started.elapsed().as_millis() as u64;

        (convert::to_incident_process_chain(&graph, &trace_ids, &ips), diagnostics)
    }

    /// Run only election, build, and analysis — stopping short of
    /// extraction/pruning/injection/bridging — and report shape and
    /// cycle counts. For sanity-checking a mapping before paying for the
    /// full pipeline (spec.md A.6's `validate` entry point).
    pub async fn validate(
        &self,
        mapping: &IpMappingRelation,
        start_log_event_ids: &HashMap<String, Vec<String>>,
    ) -> BuildDiagnostics {
        let failures_before = self.client.failure_count();
        let ips = mapping.ips();
        if ips.is_empty() {
            return BuildDiagnostics::default();
        }

        let alarms_per_ip = self.client.batch_alarms(&ips).await;

        let mut selected_alarms: Vec<RawAlarm> = Vec::new();
        let mut host_to_trace_id: HashMap<String, String> = HashMap::new();

        for (ip, alarms) in ips.iter().zip(alarms_per_ip) {
            let selected = elector::elect(&alarms, mapping.associated_event_id(ip), mapping.has_association(ip));
            if !selected.is_empty() {
                host_to_trace_id.insert(ip.clone(), selected[0].trace_id.clone());
                selected_alarms.extend(selected);
            } else if start_log_event_ids.contains_key(ip) {
                if let Some(trace_id) = mapping.trace_id_hint(ip) {
                    host_to_trace_id.insert(ip.clone(), trace_id.to_string());
                }
            }
        }

        if host_to_trace_id.is_empty() {
            return BuildDiagnostics {
                query_failures: self.client.failure_count() - failures_before,
                ..Default::default()
            };
        }

        let logs_by_host = self.client.batch_logs(&host_to_trace_id).await;
        let all_logs: Vec<RawLog> = logs_by_host.into_values().flatten().collect();

        let mut graph = GraphBuilder::build(&selected_alarms, &all_logs);
        let cycles = analyzer::analyze(&mut graph);

        let query_failures = self.client.failure_count() - failures_before;
        BuildDiagnostics::collect(&graph, &cycles, query_failures, false)
    }

    /// Run the pipeline up to (but not including) conversion, for
    /// callers that want the internal [`Graph`] — e.g. to bridge against
    /// a network graph assembled after the fact.
    pub async fn build_graph(
        &self,
        mapping: &IpMappingRelation,
        start_log_event_ids: &HashMap<String, Vec<String>>,
    ) -> Option<(Graph, Vec<String>, HashMap<String, String>)> {
        let ips = mapping.ips();
        if ips.is_empty() {
            return None;
        }

        let alarms_per_ip = self.client.batch_alarms(&ips).await;

        let mut selected_alarms: Vec<RawAlarm> = Vec::new();
        let mut host_to_trace_id: HashMap<String, String> = HashMap::new();
        let mut trace_ids: Vec<String> = Vec::new();

        for (ip, alarms) in ips.iter().zip(alarms_per_ip) {
            let selected = elector::elect(&alarms, mapping.associated_event_id(ip), mapping.has_association(ip));
            if !selected.is_empty() {
                let trace_id = selected[0].trace_id.clone();
                host_to_trace_id.insert(ip.clone(), trace_id.clone());
                if !trace_ids.contains(&trace_id) {
                    trace_ids.push(trace_id);
                }
                selected_alarms.extend(selected);
            } else if start_log_event_ids.contains_key(ip) {
                if let Some(trace_id) = mapping.trace_id_hint(ip) {
                    let trace_id = trace_id.to_string();
                    host_to_trace_id.insert(ip.clone(), trace_id.clone());
                    if !trace_ids.contains(&trace_id) {
                        trace_ids.push(trace_id);
                    }
                }
            }
        }

        if trace_ids.is_empty() {
            return None;
        }

        let logs_by_host = self.client.batch_logs(&host_to_trace_id).await;
        let all_logs: Vec<RawLog> = logs_by_host.into_values().flatten().collect();

        let mut graph = GraphBuilder::build(&selected_alarms, &all_logs);
        analyzer::analyze(&mut graph);

        let start_nodes: Vec<String> =
            selected_alarms.iter().filter_map(|a| a.process_guid.clone()).collect();
        let keep = extractor::extract(&graph, &start_nodes, self.config.max_traversal_depth);
        let mut graph = graph.subgraph(&keep);
        entity_filter::apply(&mut graph);

        let associated = mapping.all_associated_event_ids();
        let mut graph = pruner::prune(&graph, &associated, self.config.max_node_count);
        explore::inject(&mut graph, &trace_ids);

        Some((graph, trace_ids, host_to_trace_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_core::types::{EventPayload, LogType, Severity};
    use chain_query::MockStore;
    use std::collections::HashMap;

    fn alarm(event_id: &str, guid: &str, parent: Option<&str>, trace_id: &str, severity: Severity) -> RawAlarm {
        RawAlarm {
            event_id: event_id.to_string(),
            trace_id: trace_id.to_string(),
            host_address: "10.0.0.1".to_string(),
            process_guid: Some(guid.to_string()),
            parent_process_guid: parent.map(|s| s.to_string()),
            threat_severity: severity,
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

    #[tokio::test]
    async fn end_to_end_single_linear_chain() {
        let store = MockStore::new()
            .with_alarms("10.0.0.1", vec![alarm("A1", "P2", Some("P1"), "P1", Severity::High)])
            .with_logs(
                "P1",
                "10.0.0.1",
                vec![
                    log("L1", "P1", None, "P1", "2026-01-01T00:00:01Z"),
                    log("L2", "P2", Some("P1"), "P1", "2026-01-01T00:00:02Z"),
                    log("L3", "P3", Some("P2"), "P1", "2026-01-01T00:00:03Z"),
                ],
            );
        let client = QueryClient::mock(store);
        let config = ChainConfig::default();
        let engine = IncidentChainEngine::new(&client, &config);

        let mut mapping = IpMappingRelation::default();
        mapping.has_network_association.insert("10.0.0.1".to_string(), false);

        let (chain, diagnostics) = engine.build(&mapping, &HashMap::new(), None).await;
        assert_eq!(chain.nodes.len(), 3);
        assert_eq!(chain.edges.len(), 2);
        assert_eq!(chain.trace_ids, vec!["P1".to_string()]);
        assert_eq!(diagnostics.stats.node_count, 3);
        assert_eq!(diagnostics.query_failures, 0);
        assert!(!diagnostics.no_root_found);
    }

    #[tokio::test]
    async fn empty_input_yields_empty_chain() {
        let client = QueryClient::mock(MockStore::new());
        let config = ChainConfig::default();
        let engine = IncidentChainEngine::new(&client, &config);
        let (chain, diagnostics) = engine.build(&IpMappingRelation::default(), &HashMap::new(), None).await;
        assert!(chain.is_empty());
        assert_eq!(diagnostics.stats.node_count, 0);
    }
}
