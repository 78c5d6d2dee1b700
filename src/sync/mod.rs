// ABOUTME: Time synchronization subsystem
// ABOUTME: Server probing, racing, the corrected clock, and the periodic sync task

/// Offset-corrected wall clock shared across tasks
pub mod clock;
/// Single-server request/reply probe
pub mod probe;
/// Concurrent multi-server sync race
pub mod racer;
/// Periodic and on-demand sync driver
pub mod service;

pub use clock::SyncedClock;
pub use probe::{probe, ProbeStatus, ServerResult};
pub use racer::{race, SyncResult};
pub use service::{spawn_sync_service, SyncEvent, SyncService};
