//! Alarm election (spec.md §4.1): pick the traceId that best represents
//! the suspected incident on a host, then return all its alerts.

use std::collections::HashMap;

use chain_core::types::RawAlarm;

/// `elect(alerts, associatedEventId?, hasAssociation) -> selectedAlerts`.
pub fn elect(
    alerts: &[RawAlarm],
    associated_event_id: Option<&str>,
    has_association: bool,
) -> Vec<RawAlarm> {
    if alerts.is_empty() {
        return Vec::new();
    }

    let chosen_trace_id = if has_association {
        associated_event_id
            .and_then(|event_id| alerts.iter().find(|a| a.event_id == event_id))
            .map(|a| a.trace_id.clone())
    } else {
        None
    };

    let chosen_trace_id = match chosen_trace_id {
        Some(t) => Some(t),
        None => elect_by_score(alerts),
    };

    match chosen_trace_id {
        Some(t) => alerts.iter().filter(|a| a.trace_id == t).cloned().collect(),
        None => Vec::new(),
    }
}

/// Group by traceId, score each group by alert count weighted by
/// severity, and break ties by earliest `startTime`.
fn elect_by_score(alerts: &[RawAlarm]) -> Option<String> {
    let mut groups: HashMap<&str, Vec<&RawAlarm>> = HashMap::new();
    for alarm in alerts {
        if alarm.trace_id.is_empty() {
            continue;
        }
        groups.entry(alarm.trace_id.as_str()).or_default().push(alarm);
    }
    if groups.is_empty() {
        return None;
    }

    // Stable insertion order for tie-breaking reproducibility: first
    // occurrence order of each traceId in the input.
    let mut order: Vec<&str> = Vec::new();
    for alarm in alerts {
        if !alarm.trace_id.is_empty() && !order.contains(&alarm.trace_id.as_str()) {
            order.push(alarm.trace_id.as_str());
        }
    }

    let mut best: Option<(&str, f64, String)> = None;
    for trace_id in order {
        let group = &groups[trace_id];
        let score: f64 = group.iter().map(|a| a.threat_severity.election_weight()).sum();
        let earliest = group
            .iter()
            .map(|a| a.start_time.clone())
            .min()
            .unwrap_or_default();
        let better = match &best {
            None => true,
            Some((_, best_score, best_earliest)) => {
                score > *best_score || (score == *best_score && earliest < *best_earliest)
            }
        };
        if better {
            best = Some((trace_id, score, earliest));
        }
    }
    best.map(|(t, _, _)| t.to_string())
}
