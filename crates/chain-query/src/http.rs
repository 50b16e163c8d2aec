//! HTTP adaptor for the external alert/log search backend (spec.md §6:
//! "out of scope... treated as a query interface returning alert/log
//! records"). The wire shape here is our own convention, not a contract
//! from any specific vendor.

use chain_core::types::{LogType, RawAlarm, RawLog};

use crate::error::Result;

pub async fn query_alarms(
    client: &reqwest::Client,
    base_url: &str,
    host_ip: &str,
) -> Result<Vec<RawAlarm>> {
    let url = format!("{base_url}/v1/alarms");
    let resp = client
        .get(url)
        .query(&[("hostAddress", host_ip), ("alarmSource", "EDR")])
        .send()
        .await?
        .error_for_status()?;
    Ok(resp.json::<Vec<RawAlarm>>().await?)
}

#[derive(serde::Serialize)]
struct LogQueryBody<'a> {
    trace_id: &'a str,
    host_address: &'a str,
    start_time_lo: Option<&'a str>,
    start_time_hi: Option<&'a str>,
    log_types: Option<&'a [LogType]>,
}

pub async fn query_logs(
    client: &reqwest::Client,
    base_url: &str,
    trace_id: &str,
    host_ip: &str,
    time_window: Option<(&str, &str)>,
    log_types: Option<&[LogType]>,
) -> Result<Vec<RawLog>> {
    let url = format!("{base_url}/v1/logs/query");
    let body = LogQueryBody {
        trace_id,
        host_address: host_ip,
        start_time_lo: time_window.map(|(lo, _)| lo),
        start_time_hi: time_window.map(|(_, hi)| hi),
        log_types,
    };
    let resp = client
        .post(url)
        .json(&body)
        .send()
        .await?
        .error_for_status()?;
    Ok(resp.json::<Vec<RawLog>>().await?)
}
