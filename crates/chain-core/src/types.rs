//! Core domain types shared by the query, graph, and CLI crates.
//!
//! These mirror spec.md §3's data model: `RawAlarm`/`RawLog` are the
//! immutable records fetched from the search backend; `IpMappingRelation`
//! is the per-invocation input describing which hosts to investigate and
//! how they were pre-correlated with network-side alerts.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Sentinel prefix marking a synthesized log entry (as opposed to one
/// actually fetched from the log index).
pub const VIRTUAL_LOG_PREFIX: &str = "VIRTUAL_LOG_";

/// Threat severity, accepting both English tokens and their Chinese
/// equivalents. Unknown tokens map to `Unknown`. Ordered low to high so
/// `Ord`/`max` give the expected "most severe wins" behavior.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    #[default]
    Unknown,
    Low,
    Medium,
    High,
}

impl Severity {
    /// Weight used by `AlarmElector`'s group scoring (spec.md §4.1).
    pub fn election_weight(self) -> f64 {
        match self {
            Severity::High => 100.0,
            Severity::Medium => 50.0,
            Severity::Low => 20.0,
            Severity::Unknown => 0.0,
        }
    }
}

impl From<String> for Severity {
    fn from(s: String) -> Self {
        match s.trim() {
            "HIGH" | "high" | "高" => Severity::High,
            "MEDIUM" | "medium" | "中" => Severity::Medium,
            "LOW" | "low" | "低" => Severity::Low,
            _ => Severity::Unknown,
        }
    }
}

impl From<Severity> for String {
    fn from(s: Severity) -> Self {
        match s {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Unknown => "UNKNOWN",
        }
        .to_string()
    }
}

/// The log/alert category. `Other` preserves any value outside the known
/// set instead of discarding it (spec.md §3: "logType ∈ {process,file,
/// network,domain,registry,…}").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogType {
    Process,
    File,
    Network,
    Domain,
    Registry,
    Other(String),
}

impl LogType {
    pub fn as_str(&self) -> &str {
        match self {
            LogType::Process => "process",
            LogType::File => "file",
            LogType::Network => "network",
            LogType::Domain => "domain",
            LogType::Registry => "registry",
            LogType::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for LogType {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "process" => LogType::Process,
            "file" => LogType::File,
            "network" => LogType::Network,
            "domain" => LogType::Domain,
            "registry" => LogType::Registry,
            _ => LogType::Other(s),
        }
    }
}

impl From<LogType> for String {
    fn from(lt: LogType) -> String {
        lt.as_str().to_string()
    }
}

/// Type-specific payload fields recognized in §6's alert/log projections.
/// A nullable-per-field record rather than one variant per log type — the
/// same allowance spec.md §9 grants the entity payload on `IncidentNode`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub process_name: Option<String>,
    pub process_path: Option<String>,
    pub command_line: Option<String>,
    pub parent_process_name: Option<String>,
    pub parent_process_path: Option<String>,
    pub file_name: Option<String>,
    pub file_path: Option<String>,
    pub file_size: Option<u64>,
    pub target_filename: Option<String>,
    pub file_md5: Option<String>,
    pub file_type: Option<String>,
    pub source_ip: Option<String>,
    pub source_port: Option<u16>,
    pub dest_ip: Option<String>,
    pub dest_port: Option<u16>,
    pub domain_name: Option<String>,
    pub request_domain: Option<String>,
    pub query_results: Option<String>,
    pub target_object: Option<String>,
    pub reg_value: Option<String>,
}

/// An immutable EDR alert, as fetched from the alarm index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAlarm {
    pub event_id: String,
    pub trace_id: String,
    pub host_address: String,
    pub process_guid: Option<String>,
    pub parent_process_guid: Option<String>,
    pub threat_severity: Severity,
    pub alarm_source: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub log_type: LogType,
    pub op_type: String,
    pub alarm_name: Option<String>,
    #[serde(default)]
    pub payload: EventPayload,
    /// Free-form bag holding `dvcAction`, `alarmDescription`, `alarmSource`,
    /// `alarmResults` and anything else the backend returns.
    #[serde(default)]
    pub other_fields: serde_json::Value,
}

/// An immutable raw telemetry record, as fetched from the log index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    pub event_id: String,
    pub trace_id: String,
    pub host_address: String,
    pub process_guid: Option<String>,
    pub parent_process_guid: Option<String>,
    pub start_time: String,
    pub log_type: LogType,
    pub op_type: String,
    pub event_type: String,
    #[serde(default)]
    pub payload: EventPayload,
}

impl RawLog {
    /// A log is virtual iff its `eventId` begins with `VIRTUAL_LOG_`.
    pub fn is_virtual(&self) -> bool {
        self.event_id.starts_with(VIRTUAL_LOG_PREFIX)
    }

    /// Synthesize a virtual log for a staged parent node, derived from a
    /// child log's `parent*` fields (spec.md §4.2 Phase B).
    pub fn synthesize_virtual_parent(child: &RawLog, parent_id: &str) -> RawLog {
        RawLog {
            event_id: format!("{VIRTUAL_LOG_PREFIX}{parent_id}"),
            trace_id: child.trace_id.clone(),
            host_address: child.host_address.clone(),
            process_guid: Some(parent_id.to_string()),
            parent_process_guid: None,
            start_time: child.start_time.clone(),
            log_type: LogType::Process,
            op_type: "create".to_string(),
            event_type: "process".to_string(),
            payload: EventPayload {
                process_name: child.payload.parent_process_name.clone(),
                process_path: child.payload.parent_process_path.clone(),
                ..Default::default()
            },
        }
    }
}

/// Per-invocation input describing which hosts to investigate and how they
/// were pre-correlated with network-side alerts (spec.md §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpMappingRelation {
    #[serde(default)]
    pub has_network_association: HashMap<String, bool>,
    #[serde(default)]
    pub associated_alert_event_id: HashMap<String, String>,
    #[serde(default)]
    pub log_id: HashMap<String, String>,
    #[serde(default)]
    pub trace_id: HashMap<String, String>,
}

impl IpMappingRelation {
    /// All host IPs referenced by any of the four maps, sorted for
    /// deterministic batch ordering.
    pub fn ips(&self) -> Vec<String> {
        let mut set: HashSet<&String> = HashSet::new();
        set.extend(self.has_network_association.keys());
        set.extend(self.associated_alert_event_id.keys());
        set.extend(self.log_id.keys());
        set.extend(self.trace_id.keys());
        let mut ips: Vec<String> = set.into_iter().cloned().collect();
        ips.sort();
        ips
    }

    pub fn has_association(&self, ip: &str) -> bool {
        self.has_network_association.get(ip).copied().unwrap_or(false)
    }

    pub fn associated_event_id(&self, ip: &str) -> Option<&str> {
        self.associated_alert_event_id.get(ip).map(|s| s.as_str())
    }

    pub fn log_id(&self, ip: &str) -> Option<&str> {
        self.log_id.get(ip).map(|s| s.as_str())
    }

    pub fn trace_id_hint(&self, ip: &str) -> Option<&str> {
        self.trace_id.get(ip).map(|s| s.as_str())
    }

    /// All associated alert event IDs across every host — used by the
    /// pruner's must-keep set (spec.md §4.6).
    pub fn all_associated_event_ids(&self) -> HashSet<String> {
        self.associated_alert_event_id.values().cloned().collect()
    }
}
