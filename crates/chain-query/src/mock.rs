//! In-memory fixture backend. Used by tests and by callers that already
//! have alerts/logs in hand (e.g. replaying a captured incident) and want
//! to skip the network entirely.

use std::collections::HashMap;

use chain_core::types::{LogType, RawAlarm, RawLog};

#[derive(Debug, Clone, Default)]
pub struct MockStore {
    alarms_by_host: HashMap<String, Vec<RawAlarm>>,
    logs_by_trace_host: HashMap<(String, String), Vec<RawLog>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alarms(mut self, host_ip: &str, alarms: Vec<RawAlarm>) -> Self {
        self.alarms_by_host
            .entry(host_ip.to_string())
            .or_default()
            .extend(alarms);
        self
    }

    pub fn with_logs(mut self, trace_id: &str, host_ip: &str, logs: Vec<RawLog>) -> Self {
        self.logs_by_trace_host
            .entry((trace_id.to_string(), host_ip.to_string()))
            .or_default()
            .extend(logs);
        self
    }

    pub fn query_alarms(&self, host_ip: &str) -> Vec<RawAlarm> {
        self.alarms_by_host.get(host_ip).cloned().unwrap_or_default()
    }

    pub fn query_logs(
        &self,
        trace_id: &str,
        host_ip: &str,
        time_window: Option<(&str, &str)>,
        log_types: Option<&[LogType]>,
    ) -> Vec<RawLog> {
        let all = self
            .logs_by_trace_host
            .get(&(trace_id.to_string(), host_ip.to_string()))
            .cloned()
            .unwrap_or_default();
        all.into_iter()
            .filter(|l| match time_window {
                Some((lo, hi)) => l.start_time.as_str() >= lo && l.start_time.as_str() <= hi,
                None => true,
            })
            .filter(|l| match log_types {
                Some(types) => types.contains(&l.log_type),
                None => true,
            })
            .collect()
    }
}
