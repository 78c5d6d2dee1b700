// ABOUTME: Timer engine behavior tests over the public event channel
// ABOUTME: Covers countdown expiry, pause/resume, and offset independence

use chronotick::{spawn_timer_engine, SyncedClock, TimerEvent, TimerMode, TimerState};
use std::time::Duration;
use tokio::sync::mpsc;

async fn next_event(
    rx: &mut mpsc::UnboundedReceiver<TimerEvent>,
    within: Duration,
) -> Option<TimerEvent> {
    tokio::time::timeout(within, rx.recv()).await.ok().flatten()
}

#[tokio::test]
async fn test_countdown_expires_with_final_full_progress_tick() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (engine, handle, shutdown) = spawn_timer_engine(SyncedClock::new(), tx, 50);

    engine.start(TimerMode::Countdown, 0.3).unwrap();

    let mut last_tick = None;
    let mut expired = false;
    while let Some(event) = next_event(&mut rx, Duration::from_secs(3)).await {
        match event {
            TimerEvent::Tick { formatted, progress } => last_tick = Some((formatted, progress)),
            TimerEvent::Expired => {
                expired = true;
                break;
            }
        }
    }

    assert!(expired, "countdown never expired");
    let (formatted, progress) = last_tick.expect("no tick before expiry");
    assert_eq!(formatted, "00:00:00");
    assert_eq!(progress, 100);
    assert_eq!(engine.state(), TimerState::Stopped);

    let _ = shutdown.send(true);
    let _ = handle.await;
}

#[tokio::test]
async fn test_paused_timer_emits_nothing_until_resumed() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (engine, handle, shutdown) = spawn_timer_engine(SyncedClock::new(), tx, 50);

    engine.start(TimerMode::Countdown, 60.0).unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;
    engine.pause().unwrap();
    assert_eq!(engine.state(), TimerState::Paused);

    // Drain anything emitted before the pause landed.
    tokio::time::sleep(Duration::from_millis(80)).await;
    while rx.try_recv().is_ok() {}

    let quiet = next_event(&mut rx, Duration::from_millis(250)).await;
    assert!(quiet.is_none(), "paused engine emitted {:?}", quiet);

    engine.resume().unwrap();
    let event = next_event(&mut rx, Duration::from_secs(1)).await;
    assert!(
        matches!(event, Some(TimerEvent::Tick { .. })),
        "no tick after resume"
    );

    let _ = shutdown.send(true);
    let _ = handle.await;
}

#[tokio::test]
async fn test_second_pause_is_rejected_without_side_effects() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let (engine, handle, shutdown) = spawn_timer_engine(SyncedClock::new(), tx, 50);

    engine.start(TimerMode::Stopwatch, 0.0).unwrap();
    engine.pause().unwrap();
    assert!(engine.pause().is_err());
    assert_eq!(engine.state(), TimerState::Paused);

    engine.resume().unwrap();
    assert_eq!(engine.state(), TimerState::Running);
    engine.stop().unwrap();
    assert_eq!(engine.state(), TimerState::Stopped);

    let _ = shutdown.send(true);
    let _ = handle.await;
}

#[tokio::test]
async fn test_clock_offset_does_not_distort_elapsed_display() {
    // A clock running 2s ahead must not make a fresh stopwatch show 2s.
    let clock = SyncedClock::new();
    let sync = chronotick::SyncResult {
        best_server: "test".to_string(),
        corrected_timestamp: 0.0,
        latency: Duration::from_millis(10),
        offset: 2.0,
        local_time_at_sync: 0.0,
    };
    clock.apply_sync(&sync);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (engine, handle, shutdown) = spawn_timer_engine(clock, tx, 50);

    engine.start(TimerMode::Stopwatch, 0.0).unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;

    let mut last_formatted = None;
    while let Ok(event) = rx.try_recv() {
        if let TimerEvent::Tick { formatted, .. } = event {
            last_formatted = Some(formatted);
        }
    }
    assert_eq!(last_formatted.as_deref(), Some("00:00:00"));

    let _ = shutdown.send(true);
    let _ = handle.await;
}
