// ABOUTME: Concurrent multi-server sync race
// ABOUTME: Probes every configured server in parallel and keeps the lowest-latency reply

use crate::error::Error;
use crate::sync::probe::{probe, ProbeStatus, ServerResult};
use crate::Result;
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinSet;

/// Outcome of a winning sync race, produced at most once per attempt
#[derive(Debug, Clone)]
pub struct SyncResult {
    /// Server whose reply won the race
    pub best_server: String,
    /// Reference time at the reply's arrival: reported timestamp plus half
    /// the round trip (one-way delay approximation), Unix seconds
    pub corrected_timestamp: f64,
    /// Round-trip latency of the winning exchange
    pub latency: Duration,
    /// Signed offset between the reference clock and the local clock
    pub offset: f64,
    /// Local Unix time the offset was measured against
    pub local_time_at_sync: f64,
}

/// Race all configured servers and keep the most trustworthy reply.
///
/// One probe task is launched per server; the whole collection is bounded by
/// `overall_deadline` independently of any single probe's `per_server_timeout`,
/// so a hung socket cannot stall the race. The `Ok` reply with the lowest
/// measured latency wins; latency ties break toward earlier input order.
///
/// Fails with [`Error::AllServersFailed`] when no server produces a usable
/// reply, carrying the per-server statuses for diagnostics.
pub async fn race(
    servers: &[String],
    per_server_timeout: Duration,
    overall_deadline: Duration,
) -> Result<SyncResult> {
    let mut probes = JoinSet::new();
    for (index, server) in servers.iter().enumerate() {
        let server = server.clone();
        probes.spawn(async move { (index, probe(&server, per_server_timeout).await) });
    }

    let mut finished: Vec<(usize, ServerResult)> = Vec::with_capacity(servers.len());
    let deadline = tokio::time::sleep(overall_deadline);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            joined = probes.join_next() => match joined {
                Some(Ok(entry)) => finished.push(entry),
                Some(Err(err)) => log::warn!("probe task failed: {}", err),
                None => break,
            },
            _ = &mut deadline => {
                log::debug!(
                    "race deadline reached with {} of {} probes finished",
                    finished.len(),
                    servers.len()
                );
                probes.abort_all();
                break;
            }
        }
    }

    // Restore input order so ties resolve deterministically.
    finished.sort_by_key(|(index, _)| *index);
    let results: Vec<ServerResult> = finished.into_iter().map(|(_, result)| result).collect();

    match select_best(&results) {
        Some(best) => {
            // Fields are always present on an Ok result; fall through to the
            // failure path if one is somehow missing.
            if let (Some(timestamp), Some(latency), Some(received_at)) =
                (best.timestamp, best.latency, best.received_at)
            {
                let corrected_timestamp = timestamp + latency.as_secs_f64() / 2.0;
                let offset = corrected_timestamp - received_at;
                log::info!(
                    "sync race won by {} (rtt {:.1}ms, offset {:+.3}s)",
                    best.server,
                    latency.as_secs_f64() * 1000.0,
                    offset
                );
                return Ok(SyncResult {
                    best_server: best.server.clone(),
                    corrected_timestamp,
                    latency,
                    offset,
                    local_time_at_sync: received_at,
                });
            }
            Err(Error::AllServersFailed {
                statuses: statuses_for(servers, &results),
            })
        }
        None => {
            let statuses = statuses_for(servers, &results);
            log::warn!("sync race failed: {:?}", statuses);
            Err(Error::AllServersFailed { statuses })
        }
    }
}

/// Select the `Ok` result with the lowest latency.
///
/// Ties keep the first result encountered, so callers that pass results in
/// input order get a deterministic winner.
pub fn select_best(results: &[ServerResult]) -> Option<&ServerResult> {
    let mut best: Option<&ServerResult> = None;
    for result in results {
        if !result.status.is_ok() {
            continue;
        }
        let latency = match result.latency {
            Some(latency) => latency,
            None => continue,
        };
        match best.and_then(|b| b.latency) {
            Some(best_latency) if latency >= best_latency => {}
            _ => best = Some(result),
        }
    }
    best
}

/// Final status per server; probes that never finished count as timeouts.
fn statuses_for(servers: &[String], results: &[ServerResult]) -> HashMap<String, ProbeStatus> {
    let mut statuses: HashMap<String, ProbeStatus> = servers
        .iter()
        .map(|server| (server.clone(), ProbeStatus::Timeout))
        .collect();
    for result in results {
        statuses.insert(result.server.clone(), result.status);
    }
    statuses
}
