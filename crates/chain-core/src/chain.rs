//! Wire types: the `IncidentProcessChain` shape returned to callers.
//!
//! Field names are the normative wire surface (spec.md §6) and use
//! `camelCase` to match the external query-service convention the rest of
//! this platform already speaks.

use serde::{Deserialize, Serialize};

use crate::types::Severity;

/// Edge label. English canonical strings stand in for the source's
/// Chinese literals ("连接"/"断链"/"桥接") — this is an idiomatic rewrite,
/// not a translation layer, so the wire values are renamed outright
/// rather than carried as bilingual constants.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeLabel {
    #[default]
    Connected,
    Broken,
    Bridge,
    /// File-delete targets: the one case with no label at all.
    #[serde(rename = "")]
    None,
}

impl EdgeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeLabel::Connected => "connected",
            EdgeLabel::Broken => "broken",
            EdgeLabel::Bridge => "bridge",
            EdgeLabel::None => "",
        }
    }
}

/// A directed provenance edge in the output chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentEdge {
    pub source: String,
    pub target: String,
    pub val: EdgeLabel,
}

/// The node kind, mirroring `GraphNode.nodeType` post-classification
/// (spec.md §3, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Process,
    FileEntity,
    DomainEntity,
    NetworkEntity,
    RegistryEntity,
    Explore,
    Virtual,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Process => "process",
            NodeKind::FileEntity => "file_entity",
            NodeKind::DomainEntity => "domain_entity",
            NodeKind::NetworkEntity => "network_entity",
            NodeKind::RegistryEntity => "registry_entity",
            NodeKind::Explore => "explore",
            NodeKind::Virtual => "virtual",
        }
    }
}

/// Summary of the alert(s) attached to an alarm node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmNodeInfo {
    pub alarm_count: usize,
    pub highest_severity: Severity,
    pub alarm_names: Vec<String>,
    pub alarm_sources: Vec<String>,
}

/// Per-category entity payload projected onto a retyped node (spec.md
/// §9: "nullable-per-field record" is an explicitly sanctioned
/// implementation of the sum type).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityPayload {
    pub file_name: Option<String>,
    pub file_path: Option<String>,
    pub file_md5: Option<String>,
    pub domain_name: Option<String>,
    pub dest_ip: Option<String>,
    pub dest_port: Option<u16>,
    pub target_object: Option<String>,
    pub reg_value: Option<String>,
}

/// Process-entity projection: the process-specific fields of a chain
/// node's most recent evidence (spec.md §9's "latest log wins, real over
/// virtual" rule).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessEntity {
    pub process_name: Option<String>,
    pub process_path: Option<String>,
    pub command_line: Option<String>,
}

/// Populated when `isChainNode = true`: the endpoint-provenance half of
/// the `{ChainNode, StoryNode}` polymorphism (spec.md §9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainNodeInfo {
    pub is_root: bool,
    pub is_broken: bool,
    pub is_alarm: bool,
    pub alarm_node_info: Option<AlarmNodeInfo>,
    pub process_entity: Option<ProcessEntity>,
    pub entity: Option<EntityPayload>,
    pub is_extension_node: Option<bool>,
    pub extension_depth: Option<u32>,
}

/// Populated when `isChainNode = false`: a passthrough projection of a
/// network-storyline node (spec.md §4.8).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryNodeInfo {
    pub story_type: String,
    pub ip: Option<String>,
}

/// A node in the produced incident process chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentNode {
    pub node_id: String,
    pub log_type: String,
    pub op_type: String,
    pub node_threat_severity: Severity,
    pub is_chain_node: bool,
    pub chain_node: Option<ChainNodeInfo>,
    pub story_node: Option<StoryNodeInfo>,
    pub children_count: usize,
}

/// The fully built, pruned, EXPLORE-augmented, and bridged output graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentProcessChain {
    pub trace_ids: Vec<String>,
    pub host_addresses: Vec<String>,
    pub threat_severity: Severity,
    pub nodes: Vec<IncidentNode>,
    pub edges: Vec<IncidentEdge>,
}

impl IncidentProcessChain {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_label_serializes_to_wire_strings() {
        assert_eq!(
            serde_json::to_string(&EdgeLabel::Connected).unwrap(),
            "\"connected\""
        );
        assert_eq!(serde_json::to_string(&EdgeLabel::None).unwrap(), "\"\"");
    }

    #[test]
    fn empty_chain_has_no_nodes_or_edges() {
        let chain = IncidentProcessChain::default();
        assert!(chain.is_empty());
    }

    #[test]
    fn node_kind_wire_values_match_spec() {
        assert_eq!(NodeKind::FileEntity.as_str(), "file_entity");
        assert_eq!(NodeKind::Explore.as_str(), "explore");
    }
}
