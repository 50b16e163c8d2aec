//! Subgraph extractor (spec.md §4.4): for every start node, walk upward
//! to its root then take the full descendant subtree of everything on
//! that path, unioning across all starts.

use std::collections::{HashSet, VecDeque};

use crate::graph::Graph;

/// Compute the set of node IDs reachable by the full-tree traversal
/// described in spec.md §4.4, bounded by `max_depth` in both directions
/// (spec.md §5 `MAX_TRAVERSE_DEPTH`).
pub fn extract(graph: &Graph, start_nodes: &[String], max_depth: usize) -> HashSet<String> {
    let mut keep = HashSet::new();
    for start in start_nodes {
        if !graph.contains(start) {
            continue;
        }
        let upward = upward_path(graph, start, max_depth);
        for node in &upward {
            downward_subtree(graph, node, max_depth, &mut keep);
        }
    }
    keep
}

/// BFS upward toward ancestry until a root is reached or predecessors
/// are exhausted. When a node has multiple predecessors, the
/// lexicographically smallest is followed (spec.md's Open Question #1
/// analogue for extraction: deterministic tie-break over an otherwise
/// unordered predecessor set).
fn upward_path(graph: &Graph, start: &str, max_depth: usize) -> Vec<String> {
    let mut path = vec![start.to_string()];
    let mut visited: HashSet<String> = [start.to_string()].into_iter().collect();
    let mut current = start.to_string();

    while path.len() < max_depth {
        if graph.node(&current).map(|n| n.is_root).unwrap_or(false) {
            break;
        }
        let mut preds: Vec<&str> = graph.predecessors(&current);
        preds.sort_unstable();
        let Some(&next) = preds.first() else { break };
        if visited.contains(next) {
            break;
        }
        visited.insert(next.to_string());
        path.push(next.to_string());
        current = next.to_string();
    }
    path
}

/// BFS downward from `start`, collecting the full descendant subtree
/// into `keep` (which also receives `start` itself).
fn downward_subtree(graph: &Graph, start: &str, max_depth: usize, keep: &mut HashSet<String>) {
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();
    queue.push_back((start.to_string(), 0));
    keep.insert(start.to_string());

    while let Some((node, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        for succ in graph.successors(&node) {
            if keep.insert(succ.to_string()) {
                queue.push_back((succ.to_string(), depth + 1));
            }
        }
    }
}
