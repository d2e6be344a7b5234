//! Concurrency tests for the fleet actor and broadcaster
//!
//! These tests verify that:
//! - Many clones of the handle can issue commands at once
//! - Registration racing with publishing never yields torn frames
//! - Slow observers lose envelopes without affecting others

use agentwatch::{
    actors::fleet::FleetHandle,
    broadcast::Broadcaster,
    config::SimulationConfig,
    events::{Decoded, Envelope, EventKind},
    simulator::Simulator,
    store::FleetStore,
};
use chrono::Utc;
use tokio::task::JoinSet;

fn spawn_fleet(broadcaster: &Broadcaster) -> FleetHandle {
    FleetHandle::spawn(
        FleetStore::seeded(Utc::now()).unwrap(),
        Simulator::seeded(&SimulationConfig::default(), 9),
        broadcaster.clone(),
        None,
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_commands_are_serialized() {
    let broadcaster = Broadcaster::default();
    let fleet = spawn_fleet(&broadcaster);

    let mut tasks = JoinSet::new();
    for i in 0..50 {
        let fleet = fleet.clone();
        tasks.spawn(async move {
            match i % 3 {
                0 => {
                    fleet.tick_now().await.unwrap();
                }
                1 => {
                    fleet.acknowledge_alert("a2").await.unwrap();
                }
                _ => {
                    let status = if i % 2 == 0 { "active" } else { "warning" };
                    fleet.set_agent_status("4", status).await.unwrap();
                }
            }
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap();
    }

    let alert = fleet.alert("a2").await.unwrap();
    assert!(alert.acknowledged);
    let overview = fleet.overview().await.unwrap();
    assert_eq!(overview.total_agents, 5);
    assert_eq!(overview.unacknowledged_alerts, 2);

    fleet.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_registration_during_publish_sees_whole_frames() {
    let broadcaster = Broadcaster::new(1024);
    let fleet = spawn_fleet(&broadcaster);

    let publisher = {
        let fleet = fleet.clone();
        tokio::spawn(async move {
            for _ in 0..100 {
                fleet.tick_now().await.unwrap();
            }
        })
    };

    let mut observers = Vec::new();
    for _ in 0..20 {
        observers.push(broadcaster.register().await);
        tokio::task::yield_now().await;
    }
    publisher.await.unwrap();

    for mut observer in observers {
        let greeting = observer.frames.recv().await.unwrap();
        assert!(matches!(
            Envelope::decode(&greeting),
            Ok(Decoded::Event(e)) if e.kind() == EventKind::Connected
        ));

        while let Ok(frame) = observer.frames.try_recv() {
            assert!(matches!(
                Envelope::decode(&frame),
                Ok(Decoded::Event(e)) if e.kind() == EventKind::MetricsUpdated
            ));
        }
    }

    fleet.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_slow_observer_only_hurts_itself() {
    let broadcaster = Broadcaster::new(4);
    let fleet = spawn_fleet(&broadcaster);

    let mut slow = broadcaster.register().await;
    let mut fast = broadcaster.register().await;
    let mut received = 0;

    for _ in 0..10 {
        fleet.tick_now().await.unwrap();
        // Fast observer keeps its queue empty
        while fast.frames.try_recv().is_ok() {
            received += 1;
        }
    }

    // Greeting plus every tick
    assert_eq!(received, 11);

    // The slow one kept the greeting and the first three ticks
    let mut kept = 0;
    while slow.frames.try_recv().is_ok() {
        kept += 1;
    }
    assert_eq!(kept, 4);

    fleet.shutdown().await.unwrap();
}
