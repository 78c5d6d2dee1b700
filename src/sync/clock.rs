// ABOUTME: Offset-corrected wall clock shared across tasks
// ABOUTME: Stores the last successful sync offset and serves corrected Unix time

use crate::sync::racer::SyncResult;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Raw local wall clock as Unix seconds.
pub(crate) fn unix_now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Snapshot of the correction state, replaced wholesale by each sync
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockState {
    /// Signed offset between the reference clock and the local clock
    pub offset_secs: f64,
    /// Local Unix time of the last successful sync, if any
    pub last_sync_unix: Option<f64>,
}

/// Offset-corrected clock handle.
///
/// Cheap to clone; all clones share the same state. The tick loop reads it on
/// every tick while the sync task occasionally replaces the whole
/// [`ClockState`], so reads and writes never hold the lock across any await
/// point. Before the first successful sync, corrected time equals the raw
/// local clock.
#[derive(Debug)]
pub struct SyncedClock {
    state: Arc<RwLock<ClockState>>,
}

impl SyncedClock {
    /// Create an uncorrected clock (offset 0, never synced)
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(ClockState::default())),
        }
    }

    /// Current corrected time: raw local clock plus the stored offset.
    ///
    /// The offset is treated as constant between syncs; drift is addressed
    /// only by periodic re-sync, not by rate extrapolation.
    pub fn now_secs(&self) -> f64 {
        unix_now_secs() + self.state.read().offset_secs
    }

    /// Store the offset from a winning sync race, replacing any prior value
    /// (last sync wins, no blending).
    pub fn apply_sync(&self, result: &SyncResult) {
        let state = ClockState {
            offset_secs: result.offset,
            last_sync_unix: Some(result.local_time_at_sync),
        };
        *self.state.write() = state;
        log::info!(
            "clock offset set to {:+.3}s from {}",
            result.offset,
            result.best_server
        );
    }

    /// The currently applied offset in seconds (0 before the first sync)
    pub fn offset_secs(&self) -> f64 {
        self.state.read().offset_secs
    }

    /// Local Unix time of the last successful sync, if any
    pub fn last_sync_unix(&self) -> Option<f64> {
        self.state.read().last_sync_unix
    }

    /// Whether at least one sync has succeeded
    pub fn is_synced(&self) -> bool {
        self.state.read().last_sync_unix.is_some()
    }

    /// Copy of the full correction state
    pub fn snapshot(&self) -> ClockState {
        *self.state.read()
    }
}

impl Default for SyncedClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SyncedClock {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}
