// ABOUTME: Stopwatch/countdown subsystem
// ABOUTME: Session state machine and the tick loop that drives it

/// Tick loop and event publishing
pub mod engine;
/// Session state machine and display formatting
pub mod session;

pub use engine::{spawn_timer_engine, TimerEngine, TimerEvent};
pub use session::{format_hms, TimerMode, TimerSession, TimerState};
