// ABOUTME: Main library entry point for chronotick
// ABOUTME: Exports the SNTP sync engine, corrected clock, and timer engine API

//! # chronotick
//!
//! Drift-corrected stopwatch/countdown engine backed by a minimal racing SNTP client.
//!
//! chronotick queries several NTP servers concurrently, keeps the lowest-latency
//! reply, derives a clock offset, and drives a stopwatch/countdown tick loop from
//! the corrected clock so elapsed/remaining time stays accurate across pauses,
//! resumes, and long-running sessions even when the local clock drifts.
//!
//! ## Example: a corrected countdown
//!
//! ```no_run
//! use chronotick::{spawn_sync_service, spawn_timer_engine, SyncConfig, SyncedClock, TimerMode};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let clock = SyncedClock::new();
//!
//!     let (sync_tx, _sync_rx) = mpsc::unbounded_channel();
//!     let (_sync_task, _sync_shutdown, _resync) =
//!         spawn_sync_service(SyncConfig::default(), clock.clone(), sync_tx);
//!
//!     let (timer_tx, mut timer_rx) = mpsc::unbounded_channel();
//!     let (engine, _timer_task, _timer_shutdown) = spawn_timer_engine(clock, timer_tx, 100);
//!
//!     engine.start(TimerMode::Countdown, 300.0).unwrap();
//!     while let Some(event) = timer_rx.recv().await {
//!         println!("{:?}", event);
//!     }
//! }
//! ```

#![warn(missing_docs)]

/// Synchronization configuration consumed from the settings layer
pub mod config;
/// SNTP wire protocol codec
pub mod protocol;
/// Time synchronization: server probes, racing, and the corrected clock
pub mod sync;
/// Stopwatch/countdown state machine and tick loop
pub mod timer;

pub use config::SyncConfig;
pub use sync::clock::SyncedClock;
pub use sync::probe::{ProbeStatus, ServerResult};
pub use sync::racer::SyncResult;
pub use sync::service::{spawn_sync_service, ResyncHandle, SyncEvent, SyncService};
pub use timer::engine::{spawn_timer_engine, TimerEngine, TimerEvent};
pub use timer::session::{TimerMode, TimerState};

/// Result type for chronotick operations
pub type Result<T> = std::result::Result<T, error::Error>;

/// Error types for chronotick
pub mod error {
    use crate::sync::probe::ProbeStatus;
    use crate::timer::session::TimerState;
    use std::collections::HashMap;
    use thiserror::Error;

    /// Error types for chronotick operations
    #[derive(Error, Debug)]
    pub enum Error {
        /// A server reply could not be decoded
        #[error("malformed NTP reply: {0}")]
        MalformedReply(String),

        /// No server in a sync race produced a usable reply
        #[error("time sync failed: no server produced a usable reply")]
        AllServersFailed {
            /// Final status of each queried server, for diagnostics
            statuses: HashMap<String, ProbeStatus>,
        },

        /// A countdown was started with a non-positive duration
        #[error("countdown duration must be greater than zero")]
        InvalidDuration,

        /// A timer event was sent in a state that does not accept it
        #[error("cannot {event} while timer is {state}")]
        InvalidStateTransition {
            /// State the timer was in when the event arrived
            state: TimerState,
            /// The rejected event
            event: &'static str,
        },
    }
}
