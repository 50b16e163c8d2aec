//! Pruner (spec.md §4.6): shrink the graph to at most `MAX_NODE_COUNT`
//! nodes, preserving all must-keep nodes and their root-reaching paths.

use std::collections::HashSet;

use chain_core::types::{LogType, Severity};

use crate::error::{GraphError, Result};
use crate::graph::Graph;

pub const MAX_NODE_COUNT: usize = 400;

/// Prune `graph` if it exceeds `max_node_count`. On failure, the
/// original graph is returned unpruned (spec.md §7 PruneFailure policy)
/// rather than left partially mutated.
pub fn prune(graph: &Graph, associated_event_ids: &HashSet<String>, max_node_count: usize) -> Graph {
    prune_reporting(graph, associated_event_ids, max_node_count).0
}

/// Same as [`prune`] but also reports whether the fallback path (prune
/// attempted and failed) was taken, for `BuildDiagnostics`.
pub fn prune_reporting(
    graph: &Graph,
    associated_event_ids: &HashSet<String>,
    max_node_count: usize,
) -> (Graph, bool) {
    if graph.node_count() <= max_node_count {
        return (graph.clone(), false);
    }
    match try_prune(graph, associated_event_ids, max_node_count) {
        Ok(pruned) => (pruned, false),
        Err(e) => {
            tracing::warn!(error = %e, "pruning failed, retaining un-pruned graph");
            (graph.clone(), true)
        }
    }
}

fn try_prune(graph: &Graph, associated_event_ids: &HashSet<String>, max_node_count: usize) -> Result<Graph> {
    if max_node_count == 0 {
        return Err(GraphError::PruneFailure("max_node_count must be nonzero".to_string()));
    }

    let must_keep = compute_must_keep(graph, associated_event_ids);
    let mut cascade: HashSet<String> = HashSet::new();
    for node_id in &must_keep {
        walk_to_root(graph, node_id, &mut cascade);
    }

    let mut keep: HashSet<String> = must_keep.clone();
    keep.extend(cascade.iter().cloned());

    if keep.len() > max_node_count {
        let mut cascade_only: Vec<&String> = cascade.iter().filter(|id| !must_keep.contains(*id)).collect();
        cascade_only.sort_by(|a, b| {
            score(graph, a, associated_event_ids)
                .partial_cmp(&score(graph, b, associated_event_ids))
                .unwrap()
                .then_with(|| a.cmp(b))
        });
        let excess = keep.len() - max_node_count;
        for id in cascade_only.into_iter().take(excess) {
            keep.remove(id);
        }
    } else {
        let mut remaining: Vec<&str> = graph.node_ids().filter(|id| !keep.contains(*id)).collect();
        remaining.sort_by(|a, b| {
            score(graph, b, associated_event_ids)
                .partial_cmp(&score(graph, a, associated_event_ids))
                .unwrap()
                .then_with(|| a.cmp(b))
        });
        for id in remaining {
            if keep.len() >= max_node_count {
                break;
            }
            keep.insert(id.to_string());
        }
    }

    Ok(graph.subgraph(&keep))
}

fn compute_must_keep(graph: &Graph, associated_event_ids: &HashSet<String>) -> HashSet<String> {
    let mut keep = HashSet::new();
    for id in graph.node_ids() {
        let node = graph.node(id).unwrap();
        if node.is_root {
            keep.insert(id.to_string());
            continue;
        }
        if node.is_alarm {
            let highest = node
                .alarms
                .iter()
                .map(|a| a.threat_severity)
                .max()
                .unwrap_or(Severity::Unknown);
            if highest >= Severity::Medium {
                keep.insert(id.to_string());
                continue;
            }
        }
        if node.alarms.iter().any(|a| associated_event_ids.contains(&a.event_id)) {
            keep.insert(id.to_string());
        }
    }
    keep
}

/// Walk from `start` to its root following the (at most one, per I3)
/// parent edge, adding every visited node to `cascade`.
fn walk_to_root(graph: &Graph, start: &str, cascade: &mut HashSet<String>) {
    let mut current = start.to_string();
    let mut steps = 0;
    loop {
        cascade.insert(current.clone());
        let is_root = graph.node(&current).map(|n| n.is_root).unwrap_or(true);
        if is_root {
            break;
        }
        let preds = graph.predecessors(&current);
        let Some(&next) = preds.first() else { break };
        current = next.to_string();
        steps += 1;
        if steps > graph.node_count() {
            break;
        }
    }
}

/// Pruner score (spec.md §4.6): higher survives.
fn score(graph: &Graph, id: &str, associated_event_ids: &HashSet<String>) -> f64 {
    let Some(node) = graph.node(id) else { return 0.0 };
    let mut s = 0.0;

    if node.alarms.iter().any(|a| associated_event_ids.contains(&a.event_id)) {
        s += 1000.0;
    }
    for alarm in &node.alarms {
        s += alarm.threat_severity.election_weight();
    }
    if node.is_root {
        s += 80.0;
    }
    let degree = graph.in_degree(id) + graph.out_degree(id);
    s += (2.0 * degree as f64).min(30.0);
    if !node.logs.is_empty() {
        s += 10.0;
    }
    if node.logs.iter().any(|l| l.log_type == LogType::Process) {
        s += 5.0;
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_core::types::EventPayload;

    fn host_chain(n: usize) -> Graph {
        let mut graph = Graph::new();
        graph.get_or_create("root").is_root = true;
        graph.trace_id_to_root_node.insert("T".to_string(), "root".to_string());
        let mut prev = "root".to_string();
        for i in 0..n {
            let id = format!("n{i}");
            graph.get_or_create(&id);
            graph.add_edge(&prev, &id, chain_core::chain::EdgeLabel::Connected).unwrap();
            prev = id;
        }
        graph
    }

    fn add_alarm(graph: &mut Graph, id: &str, severity: Severity, event_id: &str) {
        graph.add_alarm(
            id,
            chain_core::types::RawAlarm {
                event_id: event_id.to_string(),
                trace_id: "T".to_string(),
                host_address: "10.0.0.1".to_string(),
                process_guid: Some(id.to_string()),
                parent_process_guid: None,
                threat_severity: severity,
                alarm_source: "EDR".to_string(),
                start_time: "2026-01-01T00:00:00Z".to_string(),
                end_time: None,
                log_type: LogType::Process,
                op_type: "create".to_string(),
                alarm_name: None,
                payload: EventPayload::default(),
                other_fields: serde_json::Value::Null,
            },
        );
    }

    #[test]
    fn below_cap_returns_graph_unchanged() {
        let graph = host_chain(5);
        let pruned = prune(&graph, &HashSet::new(), MAX_NODE_COUNT);
        assert_eq!(pruned.node_count(), graph.node_count());
    }

    #[test]
    fn s5_pruning_keeps_must_keep_and_caps_output() {
        let mut graph = host_chain(500);
        for i in 0..5 {
            add_alarm(&mut graph, &format!("n{i}"), Severity::High, &format!("high-{i}"));
        }
        for i in 5..10 {
            add_alarm(&mut graph, &format!("n{i}"), Severity::Low, &format!("low-{i}"));
        }
        let mut associated = HashSet::new();
        associated.insert("high-0".to_string());
        associated.insert("high-1".to_string());
        associated.insert("high-2".to_string());

        let pruned = prune(&graph, &associated, MAX_NODE_COUNT);
        assert_eq!(pruned.node_count(), MAX_NODE_COUNT);
        assert!(pruned.contains("root"));
        for i in 0..5 {
            assert!(pruned.contains(&format!("n{i}")), "HIGH alarm node n{i} must survive");
        }
    }

    #[test]
    fn must_keep_set_is_never_dropped_even_over_budget() {
        let mut graph = host_chain(10);
        for i in 0..10 {
            add_alarm(&mut graph, &format!("n{i}"), Severity::High, &format!("h{i}"));
        }
        let pruned = prune(&graph, &HashSet::new(), 3);
        // 10 HIGH alarm nodes + root are all must-keep; budget of 3 can't evict any.
        assert!(pruned.node_count() > 3);
    }
}
