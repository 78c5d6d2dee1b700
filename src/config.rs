// ABOUTME: Time synchronization configuration
// ABOUTME: Server list and timing knobs consumed from the settings layer

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Synchronization configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// NTP servers to race, in priority order (used for latency tie-breaks)
    pub servers: Vec<String>,
    /// Timeout for a single server probe in milliseconds
    pub per_server_timeout_ms: u64,
    /// Hard deadline for a whole race in milliseconds
    pub overall_deadline_ms: u64,
    /// Seconds between automatic re-syncs
    pub sync_interval_secs: u64,
    /// Whether synchronization runs at all
    pub enabled: bool,
}

impl SyncConfig {
    /// Create a configuration with the default server list
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server list
    pub fn servers(mut self, servers: Vec<String>) -> Self {
        self.servers = servers;
        self
    }

    /// Set the per-server probe timeout in milliseconds
    pub fn per_server_timeout_ms(mut self, ms: u64) -> Self {
        self.per_server_timeout_ms = ms;
        self
    }

    /// Set the whole-race deadline in milliseconds
    pub fn overall_deadline_ms(mut self, ms: u64) -> Self {
        self.overall_deadline_ms = ms;
        self
    }

    /// Set the automatic re-sync cadence in seconds
    pub fn sync_interval_secs(mut self, secs: u64) -> Self {
        self.sync_interval_secs = secs;
        self
    }

    /// Enable or disable synchronization
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Per-server probe timeout as a [`Duration`]
    pub fn per_server_timeout(&self) -> Duration {
        Duration::from_millis(self.per_server_timeout_ms.max(1))
    }

    /// Whole-race deadline as a [`Duration`]
    pub fn overall_deadline(&self) -> Duration {
        Duration::from_millis(self.overall_deadline_ms.max(1))
    }

    /// Automatic re-sync cadence as a [`Duration`]
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            servers: vec![
                "pool.ntp.org".to_string(),
                "time.google.com".to_string(),
                "time.cloudflare.com".to_string(),
                "time.windows.com".to_string(),
            ],
            per_server_timeout_ms: 5_000,
            overall_deadline_ms: 8_000,
            sync_interval_secs: 900,
            enabled: true,
        }
    }
}
