// ABOUTME: End-to-end sync tests against local UDP responders
// ABOUTME: Covers probe classification, race selection, and offset application

use chronotick::error::Error;
use chronotick::protocol::packet;
use chronotick::sync::{probe, race};
use chronotick::{spawn_sync_service, ProbeStatus, SyncConfig, SyncEvent, SyncedClock};
use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs_f64()
}

/// Spawn a local SNTP responder whose clock runs `offset_secs` ahead of the
/// local clock, replying after `delay`.
async fn spawn_responder(offset_secs: f64, delay: Duration) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = [0u8; 64];
        loop {
            let (_, peer) = match socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(_) => break,
            };
            tokio::time::sleep(delay).await;

            let ntp_secs = unix_now() + offset_secs + packet::NTP_UNIX_EPOCH_DELTA;
            let seconds = ntp_secs.trunc() as u32;
            let fraction = (ntp_secs.fract() * (1u64 << 32) as f64) as u32;

            let mut reply = [0u8; packet::PACKET_SIZE];
            reply[0] = 0x1C; // leap 0, version 3, mode 4 (server)
            reply[40..44].copy_from_slice(&seconds.to_be_bytes());
            reply[44..48].copy_from_slice(&fraction.to_be_bytes());
            let _ = socket.send_to(&reply, peer).await;
        }
    });

    addr
}

/// Bind a UDP socket that swallows requests without ever replying.
async fn spawn_silent_server() -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = [0u8; 64];
        while socket.recv_from(&mut buf).await.is_ok() {}
    });

    addr
}

#[tokio::test]
async fn test_probe_decodes_local_responder() {
    let addr = spawn_responder(0.0, Duration::ZERO).await;

    let result = probe(&addr.to_string(), Duration::from_secs(1)).await;
    assert_eq!(result.status, ProbeStatus::Ok);

    let timestamp = result.timestamp.unwrap();
    assert!((timestamp - unix_now()).abs() < 1.0);
    assert!(result.latency.unwrap() < Duration::from_secs(1));
    assert!(result.received_at.is_some());
}

#[tokio::test]
async fn test_probe_times_out_on_silent_server() {
    let addr = spawn_silent_server().await;

    let result = probe(&addr.to_string(), Duration::from_millis(200)).await;
    assert_eq!(result.status, ProbeStatus::Timeout);
    assert!(result.timestamp.is_none());
    assert!(result.latency.is_none());
}

#[tokio::test]
async fn test_probe_classifies_unresolvable_host() {
    let result = probe("no-such-host.invalid", Duration::from_secs(1)).await;
    assert_eq!(result.status, ProbeStatus::Unresolvable);
}

#[tokio::test]
async fn test_race_prefers_faster_server() {
    let slow = spawn_responder(0.0, Duration::from_millis(150)).await;
    let fast = spawn_responder(0.0, Duration::ZERO).await;

    let servers = vec![slow.to_string(), fast.to_string()];
    let result = race(&servers, Duration::from_secs(1), Duration::from_secs(2))
        .await
        .unwrap();

    assert_eq!(result.best_server, fast.to_string());
    assert!(result.latency < Duration::from_millis(150));
}

#[tokio::test]
async fn test_race_fails_when_no_server_answers() {
    let silent = spawn_silent_server().await;
    let servers = vec![silent.to_string(), "no-such-host.invalid".to_string()];

    let result = race(&servers, Duration::from_millis(200), Duration::from_millis(500)).await;
    match result {
        Err(Error::AllServersFailed { statuses }) => {
            assert_eq!(statuses.len(), 2);
            assert_eq!(statuses[&silent.to_string()], ProbeStatus::Timeout);
            assert_eq!(
                statuses["no-such-host.invalid"],
                ProbeStatus::Unresolvable
            );
        }
        other => panic!("expected AllServersFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_race_deadline_caps_hung_probes() {
    let silent = spawn_silent_server().await;
    let servers = vec![silent.to_string()];

    let started = std::time::Instant::now();
    // Probe timeout far beyond the race deadline; the deadline must win.
    let result = race(&servers, Duration::from_secs(30), Duration::from_millis(300)).await;
    assert!(result.is_err());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_offset_applies_to_clock_but_not_elapsed_time() {
    let good = spawn_responder(2.0, Duration::ZERO).await;
    let silent = spawn_silent_server().await;

    let servers = vec![good.to_string(), silent.to_string()];
    let result = race(&servers, Duration::from_millis(500), Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(result.best_server, good.to_string());
    assert!(
        (result.offset - 2.0).abs() < 0.5,
        "offset {} not near +2.0s",
        result.offset
    );

    let clock = SyncedClock::new();
    clock.apply_sync(&result);
    assert!((clock.now_secs() - unix_now() - 2.0).abs() < 0.5);

    // Elapsed time is a difference of corrected timestamps, so the constant
    // offset cancels out.
    let begin = clock.now_secs();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let elapsed = clock.now_secs() - begin;
    assert!(elapsed >= 0.1 && elapsed < 1.0, "elapsed {}", elapsed);
}

#[tokio::test]
async fn test_sync_service_publishes_completed_event() {
    let good = spawn_responder(1.0, Duration::ZERO).await;
    let config = SyncConfig::new()
        .servers(vec![good.to_string()])
        .per_server_timeout_ms(500)
        .overall_deadline_ms(1_000)
        .sync_interval_secs(3_600);

    let clock = SyncedClock::new();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let (handle, shutdown, _resync) = spawn_sync_service(config, clock.clone(), tx);

    // The first interval tick fires immediately.
    let event = tokio::time::timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("no sync event before timeout")
        .expect("event channel closed");

    match event {
        SyncEvent::Completed { server, offset_secs, .. } => {
            assert_eq!(server, good.to_string());
            assert!((offset_secs - 1.0).abs() < 0.5);
        }
        other => panic!("expected Completed, got {:?}", other),
    }
    assert!(clock.is_synced());

    let _ = shutdown.send(true);
    let _ = handle.await;
}

#[tokio::test]
async fn test_sync_service_failure_retains_prior_offset() {
    let silent = spawn_silent_server().await;
    let config = SyncConfig::new()
        .servers(vec![silent.to_string()])
        .per_server_timeout_ms(150)
        .overall_deadline_ms(300)
        .sync_interval_secs(3_600);

    let clock = SyncedClock::new();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let (handle, shutdown, _resync) = spawn_sync_service(config, clock.clone(), tx);

    let event = tokio::time::timeout(Duration::from_secs(3), rx.recv())
        .await
        .expect("no sync event before timeout")
        .expect("event channel closed");

    assert!(matches!(event, SyncEvent::Failed { .. }));
    assert!(!clock.is_synced());
    assert_eq!(clock.offset_secs(), 0.0);

    let _ = shutdown.send(true);
    let _ = handle.await;
}

#[tokio::test]
async fn test_disabled_sync_service_stays_quiet() {
    let config = SyncConfig::new()
        .servers(vec!["127.0.0.1:1".to_string()])
        .enabled(false);

    let clock = SyncedClock::new();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let (handle, shutdown, resync) = spawn_sync_service(config, clock.clone(), tx);

    resync.request();
    let quiet = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
    assert!(quiet.is_err(), "disabled service produced an event");
    assert!(!clock.is_synced());

    let _ = shutdown.send(true);
    let _ = handle.await;
}
