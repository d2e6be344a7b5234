//! Fleet actor -> broadcaster pipeline without the HTTP layer
//!
//! These tests verify that:
//! - Ticks publish the whole fleet to every observer
//! - Successful commands publish exactly one envelope each
//! - Failed commands publish nothing
//! - Every frame decodes back to the envelope that was published

use std::time::Duration;

use agentwatch::{
    AgentStatus,
    actors::fleet::FleetHandle,
    broadcast::{Broadcaster, Observer},
    config::SimulationConfig,
    events::{Decoded, Envelope, EventKind, FleetEvent},
    simulator::{MIN_RESPONSE_TIME_MS, Simulator},
    store::FleetStore,
};
use assert_matches::assert_matches;
use chrono::Utc;

fn spawn(broadcaster: &Broadcaster, config: &SimulationConfig) -> FleetHandle {
    FleetHandle::spawn(
        FleetStore::seeded(Utc::now()).unwrap(),
        Simulator::seeded(config, 77),
        broadcaster.clone(),
        None,
    )
}

async fn next(observer: &mut Observer) -> Envelope {
    let frame = tokio::time::timeout(Duration::from_secs(1), observer.frames.recv())
        .await
        .expect("frame within timeout")
        .expect("channel open");
    match Envelope::decode(&frame).unwrap() {
        Decoded::Event(envelope) => envelope,
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_every_observer_sees_ticks_in_order() {
    let broadcaster = Broadcaster::default();
    let mut first = broadcaster.register().await;
    let mut second = broadcaster.register().await;
    let fleet = spawn(&broadcaster, &SimulationConfig::default());

    for observer in [&mut first, &mut second] {
        assert_eq!(next(observer).await.kind(), EventKind::Connected);
    }

    fleet.tick_now().await.unwrap();
    fleet.set_agent_status("1", "error").await.unwrap();
    fleet.tick_now().await.unwrap();

    for observer in [&mut first, &mut second] {
        let kinds = [
            next(observer).await.kind(),
            next(observer).await.kind(),
            next(observer).await.kind(),
        ];
        assert_eq!(
            kinds,
            [
                EventKind::MetricsUpdated,
                EventKind::AgentStatusChanged,
                EventKind::MetricsUpdated
            ]
        );
    }

    fleet.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_metrics_payload_matches_store() {
    let broadcaster = Broadcaster::default();
    let mut observer = broadcaster.register().await;
    next(&mut observer).await;

    let config = SimulationConfig {
        tick_interval_ms: 0,
        error_jitter_probability: 1.0,
        latency_jitter_probability: 1.0,
    };
    let fleet = spawn(&broadcaster, &config);

    for _ in 0..25 {
        fleet.tick_now().await.unwrap();
    }

    let mut last = None;
    for _ in 0..25 {
        last = Some(next(&mut observer).await);
    }

    let agents = fleet.agents().await.unwrap();
    assert_matches!(
        last.unwrap().event,
        FleetEvent::MetricsUpdated(published) if published == agents
    );

    for agent in agents {
        assert!((0.0..=1.0).contains(&agent.error_rate));
        assert!(agent.response_time >= MIN_RESPONSE_TIME_MS);
    }

    fleet.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_commands_are_silent() {
    let broadcaster = Broadcaster::default();
    let mut observer = broadcaster.register().await;
    next(&mut observer).await;
    let fleet = spawn(&broadcaster, &SimulationConfig::default());

    assert!(fleet.set_agent_status("1", "ACTIVE").await.is_err());
    assert!(fleet.set_agent_status("nope", "active").await.is_err());
    assert!(fleet.acknowledge_alert("nope").await.is_err());
    assert!(fleet.set_policy_enabled("1", "p99", true).await.is_err());

    // Followed by one success so we know the queue is drained up to here
    fleet.acknowledge_alert("a3").await.unwrap();
    assert_eq!(next(&mut observer).await.kind(), EventKind::AlertAcknowledged);
    assert!(observer.frames.try_recv().is_err());

    let agent = fleet.agent("1").await.unwrap();
    assert_eq!(agent.status, AgentStatus::Active);

    fleet.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_ticker_stops_on_shutdown() {
    let broadcaster = Broadcaster::default();
    let mut observer = broadcaster.register().await;
    next(&mut observer).await;

    let fleet = FleetHandle::spawn(
        FleetStore::seeded(Utc::now()).unwrap(),
        Simulator::seeded(&SimulationConfig::default(), 1),
        broadcaster.clone(),
        Some(Duration::from_secs(5)),
    );

    tokio::time::sleep(Duration::from_millis(10_100)).await;
    assert_eq!(next(&mut observer).await.kind(), EventKind::MetricsUpdated);
    assert_eq!(next(&mut observer).await.kind(), EventKind::MetricsUpdated);

    fleet.shutdown().await.unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(observer.frames.try_recv().is_err());
}
