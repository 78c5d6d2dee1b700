// ABOUTME: Single-server SNTP probe
// ABOUTME: One UDP request/reply exchange with latency measurement and outcome classification

use crate::protocol::packet;
use crate::sync::clock::unix_now_secs;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::net::{lookup_host, UdpSocket};

/// Outcome classification for one server probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    /// Reply received and decoded
    Ok,
    /// No reply arrived within the probe timeout
    Timeout,
    /// The server name could not be resolved
    Unresolvable,
    /// Socket failure or malformed reply
    Error,
}

impl ProbeStatus {
    /// Short status string for logs and diagnostics
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStatus::Ok => "ok",
            ProbeStatus::Timeout => "timeout",
            ProbeStatus::Unresolvable => "unresolvable",
            ProbeStatus::Error => "error",
        }
    }

    /// Whether the probe produced a usable timestamp
    pub fn is_ok(&self) -> bool {
        matches!(self, ProbeStatus::Ok)
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of probing one server, immutable once produced
#[derive(Debug, Clone)]
pub struct ServerResult {
    /// The server address as configured
    pub server: String,
    /// Decoded server timestamp (Unix seconds), present on success
    pub timestamp: Option<f64>,
    /// Measured round-trip duration, present on success
    pub latency: Option<Duration>,
    /// Local Unix time when the reply arrived, present on success
    pub received_at: Option<f64>,
    /// Outcome classification
    pub status: ProbeStatus,
}

impl ServerResult {
    /// Build a successful result
    pub fn ok(server: impl Into<String>, timestamp: f64, latency: Duration, received_at: f64) -> Self {
        Self {
            server: server.into(),
            timestamp: Some(timestamp),
            latency: Some(latency),
            received_at: Some(received_at),
            status: ProbeStatus::Ok,
        }
    }

    /// Build a failed result carrying only the status
    pub fn failed(server: impl Into<String>, status: ProbeStatus) -> Self {
        Self {
            server: server.into(),
            timestamp: None,
            latency: None,
            received_at: None,
            status,
        }
    }
}

/// Perform one request/reply exchange against a single server.
///
/// Resolves the address (appending the default NTP port when none is given),
/// sends the fixed request on a transient UDP socket, and waits up to
/// `timeout` for a single reply datagram. Round-trip latency is measured
/// around the send/receive pair.
///
/// Every failure mode is encoded in the returned [`ServerResult`]; this
/// function never propagates an error past its own boundary.
pub async fn probe(server: &str, timeout: Duration) -> ServerResult {
    let target = if server.contains(':') {
        server.to_string()
    } else {
        format!("{}:{}", server, packet::NTP_PORT)
    };

    let addr = match lookup_host(&target).await {
        Ok(mut addrs) => match addrs.next() {
            Some(addr) => addr,
            None => {
                log::debug!("probe {}: no addresses resolved", server);
                return ServerResult::failed(server, ProbeStatus::Unresolvable);
            }
        },
        Err(err) => {
            log::debug!("probe {}: resolution failed: {}", server, err);
            return ServerResult::failed(server, ProbeStatus::Unresolvable);
        }
    };

    let socket = match UdpSocket::bind("0.0.0.0:0").await {
        Ok(socket) => socket,
        Err(err) => {
            log::debug!("probe {}: socket bind failed: {}", server, err);
            return ServerResult::failed(server, ProbeStatus::Error);
        }
    };
    if let Err(err) = socket.connect(addr).await {
        log::debug!("probe {}: connect to {} failed: {}", server, addr, err);
        return ServerResult::failed(server, ProbeStatus::Error);
    }

    let request = packet::encode_request();
    let started = Instant::now();
    if let Err(err) = socket.send(&request).await {
        log::debug!("probe {}: send failed: {}", server, err);
        return ServerResult::failed(server, ProbeStatus::Error);
    }

    let mut reply = [0u8; 256];
    let len = match tokio::time::timeout(timeout, socket.recv(&mut reply)).await {
        Err(_) => {
            log::debug!("probe {}: no reply within {:?}", server, timeout);
            return ServerResult::failed(server, ProbeStatus::Timeout);
        }
        Ok(Err(err)) => {
            log::debug!("probe {}: receive failed: {}", server, err);
            return ServerResult::failed(server, ProbeStatus::Error);
        }
        Ok(Ok(len)) => len,
    };
    let latency = started.elapsed();
    let received_at = unix_now_secs();

    match packet::decode_reply(&reply[..len]) {
        Ok(timestamp) => {
            log::debug!(
                "probe {}: timestamp {:.6} rtt {:.1}ms",
                server,
                timestamp,
                latency.as_secs_f64() * 1000.0
            );
            ServerResult::ok(server, timestamp, latency, received_at)
        }
        Err(err) => {
            log::debug!("probe {}: {}", server, err);
            ServerResult::failed(server, ProbeStatus::Error)
        }
    }
}
