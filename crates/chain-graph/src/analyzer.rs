//! Graph analyzer (spec.md §4.3): root/broken classification and
//! three-color cycle detection. Runs as build phase D.

use std::collections::HashSet;

use crate::builder::VIRTUAL_ROOT_PARENT_PREFIX;
use crate::graph::Graph;

/// A cycle report produced purely for diagnostics — I3 already forbids a
/// back-edge from ever being inserted, so this can only fire if some
/// other code path bypassed `Graph::add_edge`.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub nodes_in_cycle: HashSet<String>,
}

/// Run root/broken classification, then a cycle-detection pass.
pub fn analyze(graph: &mut Graph) -> CycleReport {
    classify_roots_and_broken(graph);
    detect_cycles(graph)
}

fn classify_roots_and_broken(graph: &mut Graph) {
    let ids: Vec<String> = graph.node_ids().map(|s| s.to_string()).collect();

    for id in &ids {
        let node = graph.node(id).unwrap();
        let trace_id = node.trace_id.clone();
        let is_self_root = trace_id.as_deref() == Some(id.as_str());
        if is_self_root {
            if let Some(t) = trace_id {
                graph.trace_id_to_root_node.entry(t).or_insert_with(|| id.clone());
                graph.node_mut(id).unwrap().is_root = true;
            }
        }
    }

    for id in &ids {
        if !id.starts_with(VIRTUAL_ROOT_PARENT_PREFIX) {
            continue;
        }
        if graph.in_degree(id) != 0 {
            continue;
        }
        let trace_id = graph.node(id).unwrap().trace_id.clone();
        let Some(t) = trace_id else { continue };

        if let Some(prev_root) = graph.trace_id_to_root_node.get(&t).cloned() {
            if prev_root != *id {
                if let Some(prev) = graph.node_mut(&prev_root) {
                    prev.is_root = false;
                }
            }
        }
        graph.trace_id_to_root_node.insert(t, id.clone());
        graph.node_mut(id).unwrap().is_root = true;
    }

    for id in &ids {
        let node = graph.node(id).unwrap();
        if node.is_root {
            continue;
        }
        if graph.in_degree(id) != 0 {
            continue;
        }
        let parent = node.parent_process_guid.clone();
        let trace_id = node.trace_id.clone();

        match parent {
            None => mark_fallback_root(graph, id, trace_id),
            Some(p) if p.starts_with("VIRTUAL_") => mark_fallback_root(graph, id, trace_id),
            Some(p) => {
                if !graph.contains(&p) {
                    if let Some(t) = trace_id {
                        graph.broken_node_to_trace_id.insert(id.clone(), t);
                    }
                    graph.node_mut(id).unwrap().is_broken = true;
                } else {
                    mark_fallback_root(graph, id, trace_id);
                }
            }
        }
    }
}

fn mark_fallback_root(graph: &mut Graph, id: &str, trace_id: Option<String>) {
    graph.node_mut(id).unwrap().is_root = true;
    if let Some(t) = trace_id {
        graph.trace_id_to_root_node.entry(t).or_insert_with(|| id.to_string());
    }
}

#[derive(PartialEq, Eq, Clone, Copy)]
enum Color {
    White,
    Gray,
    Black,
}

/// Three-color DFS. Any gray-target encounter marks both endpoints as
/// in-cycle for the report; I3 means this should never actually fire in
/// a graph built exclusively through `Graph::add_edge`.
fn detect_cycles(graph: &Graph) -> CycleReport {
    use std::collections::HashMap;

    let mut color: HashMap<&str, Color> = graph.node_ids().map(|id| (id, Color::White)).collect();
    let mut report = CycleReport::default();

    for start in graph.node_ids() {
        if color[start] != Color::White {
            continue;
        }
        let mut stack: Vec<(&str, usize)> = vec![(start, 0)];
        color.insert(start, Color::Gray);

        while let Some((node, next_idx)) = stack.pop() {
            let succs = graph.successors(node);
            if next_idx >= succs.len() {
                color.insert(node, Color::Black);
                continue;
            }
            stack.push((node, next_idx + 1));
            let child = succs[next_idx];
            match color.get(child).copied().unwrap_or(Color::White) {
                Color::White => {
                    color.insert(child, Color::Gray);
                    stack.push((child, 0));
                }
                Color::Gray => {
                    report.nodes_in_cycle.insert(node.to_string());
                    report.nodes_in_cycle.insert(child.to_string());
                }
                Color::Black => {}
            }
        }
    }

    report
}
