//! The `QueryClient`: single point of access to the external alert/log
//! search backend, with a mock backend for fixture-driven callers.
//!
//! Concurrency model (spec.md §5): batch calls fan out one request per
//! sub-filter and reassemble results index-aligned with the input. A
//! failing sub-request never fails the batch — it contributes an empty
//! result for that slot.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chain_core::types::{LogType, RawAlarm, RawLog};
use chrono::Duration as ChronoDuration;

use crate::error::{QueryError, Result};
use crate::mock::MockStore;
use crate::http;

/// Connection parameters for the HTTP backend.
#[derive(Debug, Clone)]
pub struct QueryServiceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for QueryServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 30,
        }
    }
}

enum Backend {
    Http { client: reqwest::Client, base_url: String },
    Mock(Arc<MockStore>),
}

/// Thread-safe query client. Clone is cheap (inner `Arc`/reqwest pool).
#[derive(Clone)]
pub struct QueryClient {
    backend: Arc<Backend>,
    failures: Arc<AtomicUsize>,
}

impl QueryClient {
    /// Build an HTTP-backed client against the external search backend.
    pub fn http(config: &QueryServiceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(QueryError::Http)?;
        Ok(Self {
            backend: Arc::new(Backend::Http {
                client,
                base_url: config.base_url.clone(),
            }),
            failures: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Build a fixture-backed client for tests and offline replays.
    pub fn mock(store: MockStore) -> Self {
        Self {
            backend: Arc::new(Backend::Mock(Arc::new(store))),
            failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Count of degraded (logged-and-empty) sub-requests since this
    /// client was built — surfaced in `BuildDiagnostics` (spec.md §7's
    /// QueryFailure).
    pub fn failure_count(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    async fn try_query_alarms(&self, host_ip: &str) -> Result<Vec<RawAlarm>> {
        match self.backend.as_ref() {
            Backend::Http { client, base_url } => http::query_alarms(client, base_url, host_ip).await,
            Backend::Mock(store) => Ok(store.query_alarms(host_ip)),
        }
    }

    async fn try_query_logs(
        &self,
        trace_id: &str,
        host_ip: &str,
        time_window: Option<(&str, &str)>,
        log_types: Option<&[LogType]>,
    ) -> Result<Vec<RawLog>> {
        match self.backend.as_ref() {
            Backend::Http { client, base_url } => {
                http::query_logs(client, base_url, trace_id, host_ip, time_window, log_types).await
            }
            Backend::Mock(store) => Ok(store.query_logs(trace_id, host_ip, time_window, log_types)),
        }
    }

    /// `queryAlarms(hostIp) → alert[]` (spec.md §6). Degrades to an empty
    /// list rather than propagating the error, per §7's QueryFailure policy.
    pub async fn query_alarms(&self, host_ip: &str) -> Vec<RawAlarm> {
        match self.try_query_alarms(host_ip).await {
            Ok(alarms) => alarms,
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(host_ip, error = %e, "queryAlarms sub-request failed, treating as empty");
                Vec::new()
            }
        }
    }

    /// `queryLogs(traceId, hostIp, [startTimeLo, startTimeHi], logTypes[]) → log[]`.
    pub async fn query_logs(
        &self,
        trace_id: &str,
        host_ip: &str,
        time_window: Option<(&str, &str)>,
        log_types: Option<&[LogType]>,
    ) -> Vec<RawLog> {
        match self.try_query_logs(trace_id, host_ip, time_window, log_types).await {
            Ok(logs) => logs,
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(trace_id, host_ip, error = %e, "queryLogs sub-request failed, treating as empty");
                Vec::new()
            }
        }
    }

    /// Issue one sub-request per IP in a single multiplexed call; results
    /// are reassembled so `ips[i]` maps to `response[i]` (spec.md §5).
    pub async fn batch_alarms(&self, ips: &[String]) -> Vec<Vec<RawAlarm>> {
        let futures = ips.iter().map(|ip| self.query_alarms(ip));
        futures::future::join_all(futures).await
    }

    /// `batchLogs(hostToTraceId)`: one sub-request per `(hostIp, traceId)`
    /// pair, keyed by host in the returned map. Host iteration is sorted
    /// so repeated calls with the same input fan out in the same order.
    pub async fn batch_logs(
        &self,
        host_to_trace_id: &HashMap<String, String>,
    ) -> HashMap<String, Vec<RawLog>> {
        self.batch_logs_windowed(host_to_trace_id, None).await
    }

    /// `batchLogs(hostToTraceId, hostToStartTime)`: identical to
    /// [`Self::batch_logs`] but additionally restricts each sub-request to
    /// `[startTime - 10m, startTime + 10m]`.
    pub async fn batch_logs_windowed(
        &self,
        host_to_trace_id: &HashMap<String, String>,
        host_to_start_time: Option<&HashMap<String, String>>,
    ) -> HashMap<String, Vec<RawLog>> {
        let mut hosts: Vec<&String> = host_to_trace_id.keys().collect();
        hosts.sort();

        let futures = hosts.iter().map(|host| {
            let trace_id = host_to_trace_id.get(host.as_str()).unwrap().clone();
            let host = (*host).clone();
            let window = host_to_start_time
                .and_then(|m| m.get(&host))
                .and_then(|t| ten_minute_window(t));
            async move {
                let window_ref = window.as_ref().map(|(lo, hi)| (lo.as_str(), hi.as_str()));
                self.query_logs(&trace_id, &host, window_ref, None).await
            }
        });
        let results = futures::future::join_all(futures).await;

        hosts.into_iter().cloned().zip(results).collect()
    }
}

/// Widen a single timestamp into a `[t-10m, t+10m]` window. Returns
/// `None` (no restriction) if the timestamp can't be parsed as RFC 3339 —
/// degrading to an unrestricted query rather than failing the batch.
fn ten_minute_window(start_time: &str) -> Option<(String, String)> {
    let parsed = chrono::DateTime::parse_from_rfc3339(start_time).ok()?;
    let delta = ChronoDuration::minutes(10);
    Some(((parsed - delta).to_rfc3339(), (parsed + delta).to_rfc3339()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_core::types::EventPayload;

    fn sample_alarm(event_id: &str, host: &str) -> RawAlarm {
        RawAlarm {
            event_id: event_id.to_string(),
            trace_id: "T1".to_string(),
            host_address: host.to_string(),
            process_guid: Some("P1".to_string()),
            parent_process_guid: None,
            threat_severity: chain_core::types::Severity::High,
            alarm_source: "EDR".to_string(),
            start_time: "2026-01-01T00:00:00Z".to_string(),
            end_time: None,
            log_type: LogType::Process,
            op_type: "create".to_string(),
            alarm_name: None,
            payload: EventPayload::default(),
            other_fields: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn batch_alarms_is_index_aligned() {
        let store = MockStore::new()
            .with_alarms("10.0.0.1", vec![sample_alarm("a1", "10.0.0.1")])
            .with_alarms("10.0.0.2", vec![]);
        let client = QueryClient::mock(store);
        let ips = vec!["10.0.0.1".to_string(), "10.0.0.2".to_string(), "10.0.0.3".to_string()];
        let results = client.batch_alarms(&ips).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].len(), 1);
        assert_eq!(results[1].len(), 0);
        assert_eq!(results[2].len(), 0);
    }

    #[tokio::test]
    async fn batch_logs_keys_by_host() {
        let store = MockStore::new().with_logs(
            "T1",
            "10.0.0.1",
            vec![],
        );
        let client = QueryClient::mock(store);
        let mut host_to_trace = HashMap::new();
        host_to_trace.insert("10.0.0.1".to_string(), "T1".to_string());
        let results = client.batch_logs(&host_to_trace).await;
        assert!(results.contains_key("10.0.0.1"));
    }

    #[test]
    fn ten_minute_window_widens_symmetrically() {
        let (lo, hi) = ten_minute_window("2026-01-01T00:10:00Z").unwrap();
        assert!(lo < hi);
        assert!(lo.starts_with("2026-01-01T00:00:00"));
        assert!(hi.starts_with("2026-01-01T00:20:00"));
    }

    #[test]
    fn ten_minute_window_none_for_unparseable_timestamp() {
        assert!(ten_minute_window("not-a-time").is_none());
    }
}
