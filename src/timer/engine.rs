// ABOUTME: Tick loop driving timer sessions from the corrected clock
// ABOUTME: Emits formatted updates and expiry events to the presentation layer

use crate::error::Error;
use crate::sync::clock::SyncedClock;
use crate::timer::session::{TimerMode, TimerSession, TimerState};
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};

/// Default tick interval in milliseconds
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Updates published to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// One display update per tick while running
    Tick {
        /// Elapsed (stopwatch) or remaining (countdown) time as `HH:MM:SS`
        formatted: String,
        /// Progress percent, 0-100
        progress: u8,
    },
    /// A countdown reached zero; fired once, after the final 100% tick
    Expired,
}

/// Stopwatch/countdown engine.
///
/// Cheap to clone; all clones control the same session. Callers drive the
/// state machine through [`start`](Self::start), [`pause`](Self::pause),
/// [`resume`](Self::resume), and [`stop`](Self::stop); the tick loop owns the
/// session and is the only emitter of [`TimerEvent`]s, so updates reach the
/// presentation layer in non-decreasing time order.
#[derive(Debug)]
pub struct TimerEngine {
    session: Arc<Mutex<Option<TimerSession>>>,
    clock: SyncedClock,
    events: mpsc::UnboundedSender<TimerEvent>,
    tick_interval: Duration,
}

impl TimerEngine {
    /// Create an engine ticking every `tick_interval_ms` milliseconds
    pub fn new(
        clock: SyncedClock,
        events: mpsc::UnboundedSender<TimerEvent>,
        tick_interval_ms: u64,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(None)),
            clock,
            events,
            tick_interval: Duration::from_millis(tick_interval_ms.max(1)),
        }
    }

    /// Current state (Stopped when no session exists)
    pub fn state(&self) -> TimerState {
        self.session
            .lock()
            .as_ref()
            .map(|session| session.state())
            .unwrap_or(TimerState::Stopped)
    }

    /// Start a session. Valid only while stopped; countdowns require a
    /// positive duration.
    pub fn start(&self, mode: TimerMode, duration_secs: f64) -> Result<()> {
        let mut guard = self.session.lock();
        if let Some(session) = guard.as_ref() {
            return Err(Error::InvalidStateTransition {
                state: session.state(),
                event: "start",
            });
        }
        let session = TimerSession::start(mode, duration_secs, self.clock.now_secs())?;
        log::info!(
            "timer started: {:?} {}",
            mode,
            if duration_secs > 0.0 {
                format!("({}s)", duration_secs)
            } else {
                "(unbounded)".to_string()
            }
        );
        *guard = Some(session);
        Ok(())
    }

    /// Pause the running session
    pub fn pause(&self) -> Result<()> {
        let mut guard = self.session.lock();
        match guard.as_mut() {
            Some(session) => session.pause_at(self.clock.now_secs()),
            None => Err(Error::InvalidStateTransition {
                state: TimerState::Stopped,
                event: "pause",
            }),
        }
    }

    /// Resume the paused session
    pub fn resume(&self) -> Result<()> {
        let mut guard = self.session.lock();
        match guard.as_mut() {
            Some(session) => session.resume_at(self.clock.now_secs()),
            None => Err(Error::InvalidStateTransition {
                state: TimerState::Stopped,
                event: "resume",
            }),
        }
    }

    /// Discard the session. Valid from Running or Paused.
    pub fn stop(&self) -> Result<()> {
        let mut guard = self.session.lock();
        match guard.take() {
            Some(_) => {
                log::info!("timer stopped");
                Ok(())
            }
            None => Err(Error::InvalidStateTransition {
                state: TimerState::Stopped,
                event: "stop",
            }),
        }
    }

    /// Run the tick loop until shutdown.
    ///
    /// Emits exactly one update per physical tick using current corrected
    /// time; missed ticks are skipped, never batched.
    ///
    /// This should be spawned as a separate task.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        log::info!(
            "timer engine started: {}ms ticks",
            self.tick_interval.as_millis()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.emit_tick();
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        log::info!("timer engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Compute and publish one update; no-op unless a session is running.
    fn emit_tick(&self) {
        let now = self.clock.now_secs();
        let mut guard = self.session.lock();

        let session = match guard.as_ref() {
            Some(session) if session.state() == TimerState::Running => session,
            _ => return,
        };

        if session.is_expired_at(now) {
            // Final update pins the display at zero and exactly 100%.
            let (formatted, progress) = session.display_at(now);
            let _ = self.events.send(TimerEvent::Tick { formatted, progress });
            let _ = self.events.send(TimerEvent::Expired);
            log::info!("countdown expired");
            *guard = None;
            return;
        }

        let (formatted, progress) = session.display_at(now);
        let _ = self.events.send(TimerEvent::Tick { formatted, progress });
    }
}

impl Clone for TimerEngine {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            clock: self.clock.clone(),
            events: self.events.clone(),
            tick_interval: self.tick_interval,
        }
    }
}

/// Spawn a timer engine task.
///
/// Returns a control handle, the join handle, and the shutdown sender.
pub fn spawn_timer_engine(
    clock: SyncedClock,
    events: mpsc::UnboundedSender<TimerEvent>,
    tick_interval_ms: u64,
) -> (TimerEngine, tokio::task::JoinHandle<()>, watch::Sender<bool>) {
    let engine = TimerEngine::new(clock, events, tick_interval_ms);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let tick_engine = engine.clone();
    let handle = tokio::spawn(async move {
        tick_engine.run(shutdown_rx).await;
    });

    (engine, handle, shutdown_tx)
}
