//! In-memory provenance graph: add-only through the build phases,
//! shrink-only once pruning/extraction begin (spec.md §3 "Lifecycle").
//!
//! Nodes are keyed by `nodeId` directly rather than by a dense integer
//! index — unlike a graph fetched whole from a store, ours grows
//! incrementally across phases A–C plus EXPLORE/bridge injection, and a
//! dense index would need renumbering on every insert.

use std::collections::{HashMap, HashSet};

use chain_core::chain::{EdgeLabel, NodeKind};
use chain_core::types::{RawAlarm, RawLog};

use crate::error::{GraphError, Result};

/// Non-alarm nodes accept at most this many logs; alarm nodes are
/// unbounded (spec.md §4.9).
pub const MAX_LOGS_PER_NODE: usize = 1000;

#[derive(Debug, Clone)]
pub struct GraphNode {
    pub node_id: String,
    pub parent_process_guid: Option<String>,
    pub trace_id: Option<String>,
    pub host_address: Option<String>,
    pub alarms: Vec<RawAlarm>,
    pub logs: Vec<RawLog>,
    pub is_root: bool,
    pub is_broken: bool,
    pub is_alarm: bool,
    pub is_virtual: bool,
    pub node_kind: NodeKind,
    /// Set for nodes seeded from the externally supplied network
    /// storyline graph rather than built from alerts/logs (spec.md §4.8,
    /// §9's `{ChainNode, StoryNode}` polymorphism).
    pub is_story: bool,
    pub story_type: Option<String>,
    pub ip: Option<String>,
    log_cap_warned: bool,
}

impl GraphNode {
    fn new(node_id: &str) -> Self {
        Self {
            node_id: node_id.to_string(),
            parent_process_guid: None,
            trace_id: None,
            host_address: None,
            alarms: Vec::new(),
            logs: Vec::new(),
            is_root: false,
            is_broken: false,
            is_alarm: false,
            is_virtual: false,
            node_kind: NodeKind::Process,
            is_story: false,
            story_type: None,
            ip: None,
            log_cap_warned: false,
        }
    }

    pub fn log_count(&self) -> usize {
        self.logs.len()
    }

    /// Whether this node already hit `MAX_LOGS_PER_NODE` and had logs
    /// dropped (spec.md §4.9's LogCapExceeded diagnostic).
    pub fn log_capped(&self) -> bool {
        self.log_cap_warned
    }
}

#[derive(Debug, Clone)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub label: EdgeLabel,
}

/// The directed provenance graph. `nodes`/`edges` grow in insertion
/// order; both orders are preserved explicitly since `HashMap` iteration
/// isn't, and determinism (spec.md P7) depends on it.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: HashMap<String, GraphNode>,
    node_order: Vec<String>,
    edges: Vec<GraphEdge>,
    edge_set: HashSet<(String, String)>,
    successors: HashMap<String, Vec<usize>>,
    predecessors: HashMap<String, Vec<usize>>,
    pub trace_id_to_root_node: HashMap<String, String>,
    pub broken_node_to_trace_id: HashMap<String, String>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the node at `id`, creating it with defaults if absent.
    pub fn get_or_create(&mut self, id: &str) -> &mut GraphNode {
        if !self.nodes.contains_key(id) {
            self.nodes.insert(id.to_string(), GraphNode::new(id));
            self.node_order.push(id.to_string());
        }
        self.nodes.get_mut(id).unwrap()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.nodes.get_mut(id)
    }

    /// Nodes in the order they were first created.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.node_order.iter().map(|s| s.as_str())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        self.edge_set.contains(&(source.to_string(), target.to_string()))
    }

    /// Attach an alert to `node_id`, unconditionally (alarm nodes are
    /// unbounded) and mark the node as an alarm node.
    pub fn add_alarm(&mut self, node_id: &str, alarm: RawAlarm) {
        let node = self.get_or_create(node_id);
        node.is_alarm = true;
        node.alarms.push(alarm);
    }

    /// Attach a log to `node_id`, respecting the per-node cap unless the
    /// node already carries an alarm. Returns `false` if the log was
    /// dropped for exceeding the cap.
    pub fn add_log(&mut self, node_id: &str, log: RawLog) -> bool {
        let node = self.get_or_create(node_id);
        if !node.is_alarm && node.logs.len() >= MAX_LOGS_PER_NODE {
            if !node.log_cap_warned {
                node.log_cap_warned = true;
                tracing::warn!(node_id, cap = MAX_LOGS_PER_NODE, "log cap exceeded, dropping extra logs");
            }
            return false;
        }
        node.logs.push(log);
        true
    }

    /// Add edge `source -> target`, honoring I1–I3. A duplicate insert of
    /// the same pair is a silent no-op (edges are unique per pair); an
    /// attempt to introduce a reverse edge or a self-loop is rejected and
    /// logged, never panics.
    pub fn add_edge(&mut self, source: &str, target: &str, label: EdgeLabel) -> Result<()> {
        if source == target {
            tracing::warn!(source, "rejected self-loop edge");
            return Err(GraphError::SelfLoop(source.to_string(), target.to_string()));
        }
        if !self.contains(source) {
            return Err(GraphError::NodeNotFound(source.to_string()));
        }
        if !self.contains(target) {
            return Err(GraphError::NodeNotFound(target.to_string()));
        }
        let key = (source.to_string(), target.to_string());
        if self.edge_set.contains(&key) {
            return Ok(());
        }
        if self.edge_set.contains(&(target.to_string(), source.to_string())) {
            tracing::warn!(source, target, "rejected edge: would introduce a cycle");
            return Err(GraphError::CycleRejected(source.to_string(), target.to_string()));
        }

        let idx = self.edges.len();
        self.edges.push(GraphEdge {
            source: source.to_string(),
            target: target.to_string(),
            label,
        });
        self.edge_set.insert(key);
        self.successors.entry(source.to_string()).or_default().push(idx);
        self.predecessors.entry(target.to_string()).or_default().push(idx);
        Ok(())
    }

    /// Add an externally supplied network-storyline edge verbatim,
    /// skipping I2/I3 (self-loop and reverse-edge rejection). Those
    /// invariants exist to keep process *provenance* acyclic; spec.md's
    /// S6 requires network edges to pass through untouched, including a
    /// legitimate bidirectional pair (e.g. two hosts connecting to each
    /// other) that `add_edge` would otherwise silently drop. A duplicate
    /// insert of the same `(source, target)` pair is still a no-op.
    pub fn add_network_edge(&mut self, source: &str, target: &str, label: EdgeLabel) -> Result<()> {
        if !self.contains(source) {
            return Err(GraphError::NodeNotFound(source.to_string()));
        }
        if !self.contains(target) {
            return Err(GraphError::NodeNotFound(target.to_string()));
        }
        let key = (source.to_string(), target.to_string());
        if self.edge_set.contains(&key) {
            return Ok(());
        }

        let idx = self.edges.len();
        self.edges.push(GraphEdge {
            source: source.to_string(),
            target: target.to_string(),
            label,
        });
        self.edge_set.insert(key);
        self.successors.entry(source.to_string()).or_default().push(idx);
        self.predecessors.entry(target.to_string()).or_default().push(idx);
        Ok(())
    }

    /// Outgoing neighbor node IDs, in edge-insertion order.
    pub fn successors(&self, id: &str) -> Vec<&str> {
        self.successors
            .get(id)
            .map(|idxs| idxs.iter().map(|&i| self.edges[i].target.as_str()).collect())
            .unwrap_or_default()
    }

    /// Incoming neighbor node IDs, in edge-insertion order.
    pub fn predecessors(&self, id: &str) -> Vec<&str> {
        self.predecessors
            .get(id)
            .map(|idxs| idxs.iter().map(|&i| self.edges[i].source.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn in_degree(&self, id: &str) -> usize {
        self.predecessors.get(id).map(|v| v.len()).unwrap_or(0)
    }

    pub fn out_degree(&self, id: &str) -> usize {
        self.successors.get(id).map(|v| v.len()).unwrap_or(0)
    }

    pub fn root_node_ids(&self) -> Vec<&str> {
        self.node_order
            .iter()
            .filter(|id| self.nodes[id.as_str()].is_root)
            .map(|s| s.as_str())
            .collect()
    }

    pub fn broken_node_ids(&self) -> Vec<&str> {
        self.node_order
            .iter()
            .filter(|id| self.nodes[id.as_str()].is_broken)
            .map(|s| s.as_str())
            .collect()
    }

    pub fn alarm_node_ids(&self) -> Vec<&str> {
        self.node_order
            .iter()
            .filter(|id| self.nodes[id.as_str()].is_alarm)
            .map(|s| s.as_str())
            .collect()
    }

    /// Build a new graph retaining only `keep` and edges whose endpoints
    /// are both retained, preserving insertion order. Root/broken maps
    /// are intersected with `keep` (spec.md §4.4, §4.6).
    pub fn subgraph(&self, keep: &HashSet<String>) -> Graph {
        let mut out = Graph::new();
        for id in &self.node_order {
            if !keep.contains(id) {
                continue;
            }
            let src = &self.nodes[id];
            let node = out.get_or_create(id);
            node.parent_process_guid = src.parent_process_guid.clone();
            node.trace_id = src.trace_id.clone();
            node.host_address = src.host_address.clone();
            node.alarms = src.alarms.clone();
            node.logs = src.logs.clone();
            node.is_root = src.is_root;
            node.is_broken = src.is_broken;
            node.is_alarm = src.is_alarm;
            node.is_virtual = src.is_virtual;
            node.node_kind = src.node_kind;
            node.is_story = src.is_story;
            node.story_type = src.story_type.clone();
            node.ip = src.ip.clone();
        }
        for edge in &self.edges {
            if keep.contains(&edge.source) && keep.contains(&edge.target) {
                let _ = out.add_edge(&edge.source, &edge.target, edge.label);
            }
        }
        out.trace_id_to_root_node = self
            .trace_id_to_root_node
            .iter()
            .filter(|(_, v)| keep.contains(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out.broken_node_to_trace_id = self
            .broken_node_to_trace_id
            .iter()
            .filter(|(k, _)| keep.contains(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out
    }
}
