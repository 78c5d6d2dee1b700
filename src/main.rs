// ABOUTME: Chronotick demo binary
// ABOUTME: Runs an NTP-corrected countdown or stopwatch in the terminal

use chronotick::{
    spawn_sync_service, spawn_timer_engine, SyncConfig, SyncEvent, SyncedClock, TimerEvent,
    TimerMode,
};
use clap::Parser;
use std::io::Write;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "chronotick")]
#[command(author, version, about = "Drift-corrected countdown/stopwatch", long_about = None)]
struct Args {
    /// Countdown duration in seconds (0 runs a stopwatch)
    #[arg(short, long, default_value = "0")]
    duration: f64,

    /// NTP servers to race (comma separated; defaults to public pool servers)
    #[arg(short, long, value_delimiter = ',')]
    servers: Vec<String>,

    /// Per-server probe timeout in milliseconds
    #[arg(long, default_value = "5000")]
    probe_timeout_ms: u64,

    /// Whole-race deadline in milliseconds
    #[arg(long, default_value = "8000")]
    race_deadline_ms: u64,

    /// Seconds between automatic re-syncs
    #[arg(long, default_value = "900")]
    sync_interval: u64,

    /// Disable NTP correction entirely
    #[arg(long)]
    no_sync: bool,

    /// Tick interval in milliseconds
    #[arg(long, default_value = "100")]
    tick_ms: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Initialize tracing based on verbosity flag
    fn init_tracing(&self) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let filter = if self.verbose {
            "chronotick=debug"
        } else {
            "chronotick=info"
        };

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| filter.into()),
            )
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    /// Build SyncConfig from these args
    fn build_config(&self) -> SyncConfig {
        let mut config = SyncConfig::new()
            .per_server_timeout_ms(self.probe_timeout_ms)
            .overall_deadline_ms(self.race_deadline_ms)
            .sync_interval_secs(self.sync_interval)
            .enabled(!self.no_sync);
        if !self.servers.is_empty() {
            config = config.servers(self.servers.clone());
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    args.init_tracing();

    tracing::info!("Chronotick v{}", env!("CARGO_PKG_VERSION"));

    let clock = SyncedClock::new();

    let (sync_tx, mut sync_rx) = mpsc::unbounded_channel();
    let (sync_handle, sync_shutdown, _resync) =
        spawn_sync_service(args.build_config(), clock.clone(), sync_tx);

    let (timer_tx, mut timer_rx) = mpsc::unbounded_channel();
    let (engine, timer_handle, timer_shutdown) =
        spawn_timer_engine(clock.clone(), timer_tx, args.tick_ms);

    let mode = if args.duration > 0.0 {
        TimerMode::Countdown
    } else {
        TimerMode::Stopwatch
    };
    engine.start(mode, args.duration)?;

    tracing::info!("Press Ctrl+C to stop");

    loop {
        tokio::select! {
            event = timer_rx.recv() => match event {
                Some(TimerEvent::Tick { formatted, progress }) => {
                    print!("\r{formatted}  {progress:>3}%");
                    let _ = std::io::stdout().flush();
                }
                Some(TimerEvent::Expired) => {
                    println!();
                    tracing::info!("Countdown finished");
                    break;
                }
                None => break,
            },
            event = sync_rx.recv() => if let Some(event) = event {
                match event {
                    SyncEvent::Completed { server, latency_secs, offset_secs, .. } => {
                        tracing::info!(
                            "Synchronized with {} (offset {:+.3}s, rtt {:.0}ms)",
                            server,
                            offset_secs,
                            latency_secs * 1000.0
                        );
                    }
                    SyncEvent::Failed { reasons } => {
                        tracing::warn!("Time sync failed: {:?}", reasons);
                    }
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                tracing::info!("Received shutdown signal");
                break;
            }
        }
    }

    let _ = sync_shutdown.send(true);
    let _ = timer_shutdown.send(true);
    let _ = sync_handle.await;
    let _ = timer_handle.await;

    Ok(())
}
