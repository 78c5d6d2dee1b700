// ABOUTME: Periodic and on-demand time synchronization task
// ABOUTME: Runs sync races, applies winning offsets to the clock, publishes SyncEvent

use crate::config::SyncConfig;
use crate::error::Error;
use crate::sync::clock::SyncedClock;
use crate::sync::probe::ProbeStatus;
use crate::sync::racer::race;
use std::collections::HashMap;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};

/// Synchronization results published to the presentation layer
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A race produced a usable offset, now applied to the clock
    Completed {
        /// Server whose reply won the race
        server: String,
        /// Round-trip latency of the winning exchange in seconds
        latency_secs: f64,
        /// Offset applied to the clock in seconds
        offset_secs: f64,
        /// Local Unix time the offset was measured against
        local_timestamp: f64,
        /// Corrected reference time at the measurement instant
        reference_timestamp: f64,
    },
    /// No server produced a usable reply; the prior offset is retained
    Failed {
        /// Final status of each queried server
        reasons: HashMap<String, ProbeStatus>,
    },
}

/// Handle for requesting an immediate re-sync.
///
/// A request that arrives while a race is already in flight cancels that race
/// and starts a fresh one.
#[derive(Debug, Clone)]
pub struct ResyncHandle {
    tx: mpsc::UnboundedSender<()>,
}

impl ResyncHandle {
    /// Ask the sync service to run a race now
    pub fn request(&self) {
        let _ = self.tx.send(());
    }
}

/// Periodic/on-demand driver of sync races.
///
/// Owns the configuration and the resync channel; interacts with the rest of
/// the system only through the shared [`SyncedClock`] and the outbound event
/// channel.
pub struct SyncService {
    config: SyncConfig,
    clock: SyncedClock,
    events: mpsc::UnboundedSender<SyncEvent>,
    resync_rx: mpsc::UnboundedReceiver<()>,
}

impl SyncService {
    /// Create a sync service and the handle used to request immediate syncs
    pub fn new(
        config: SyncConfig,
        clock: SyncedClock,
        events: mpsc::UnboundedSender<SyncEvent>,
    ) -> (Self, ResyncHandle) {
        let (resync_tx, resync_rx) = mpsc::unbounded_channel();
        let service = Self {
            config,
            clock,
            events,
            resync_rx,
        };
        (service, ResyncHandle { tx: resync_tx })
    }

    /// Run the sync loop until shutdown.
    ///
    /// The first interval tick fires immediately, so an enabled service syncs
    /// once at startup and then every `sync_interval_secs`. Resync requests
    /// trigger an extra attempt; while disabled, both are ignored.
    ///
    /// This should be spawned as a separate task.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.sync_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        if !self.config.enabled {
            log::info!("time sync disabled by configuration");
        } else {
            log::info!(
                "sync service started: {} servers, every {}s",
                self.config.servers.len(),
                self.config.sync_interval_secs
            );
        }

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.config.enabled && self.sync_once(&mut shutdown).await {
                        break;
                    }
                }
                Some(()) = self.resync_rx.recv() => {
                    if self.config.enabled {
                        if self.sync_once(&mut shutdown).await {
                            break;
                        }
                    } else {
                        log::debug!("resync requested while sync is disabled");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        log::info!("sync service shutting down");
    }

    /// Run one race, restarting if a resync request lands mid-flight.
    ///
    /// Returns true when shutdown was observed, so the caller can stop.
    async fn sync_once(&mut self, shutdown: &mut watch::Receiver<bool>) -> bool {
        loop {
            let race_fut = race(
                &self.config.servers,
                self.config.per_server_timeout(),
                self.config.overall_deadline(),
            );
            tokio::pin!(race_fut);

            let restart = loop {
                tokio::select! {
                    result = &mut race_fut => {
                        match result {
                            Ok(sync) => {
                                self.clock.apply_sync(&sync);
                                let _ = self.events.send(SyncEvent::Completed {
                                    server: sync.best_server,
                                    latency_secs: sync.latency.as_secs_f64(),
                                    offset_secs: sync.offset,
                                    local_timestamp: sync.local_time_at_sync,
                                    reference_timestamp: sync.corrected_timestamp,
                                });
                            }
                            Err(Error::AllServersFailed { statuses }) => {
                                // Prior offset is retained; redundancy failed, not the clock.
                                let _ = self.events.send(SyncEvent::Failed { reasons: statuses });
                            }
                            Err(err) => log::warn!("sync race failed unexpectedly: {}", err),
                        }
                        break false;
                    }
                    Some(()) = self.resync_rx.recv() => {
                        log::debug!("resync requested mid-race, restarting race");
                        break true;
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            return true;
                        }
                    }
                }
            };

            if !restart {
                return false;
            }
        }
    }
}

/// Spawn a sync service task.
///
/// Returns the join handle, the shutdown sender, and the resync handle.
pub fn spawn_sync_service(
    config: SyncConfig,
    clock: SyncedClock,
    events: mpsc::UnboundedSender<SyncEvent>,
) -> (tokio::task::JoinHandle<()>, watch::Sender<bool>, ResyncHandle) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (service, resync) = SyncService::new(config, clock, events);

    let handle = tokio::spawn(async move {
        service.run(shutdown_rx).await;
    });

    (handle, shutdown_tx, resync)
}
