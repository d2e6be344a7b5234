//! End-to-end tests over a real WebSocket
//!
//! A hub is bound on a random port and followed by the viewer stack:
//! ApiClient for the snapshot, ConnectionManager with the tungstenite
//! connector for the push channel, FleetView as subscriber.

use std::{sync::Arc, time::Duration};

use agentwatch::{
    AgentStatus,
    events::{AlertAck, Envelope, EventKind, FleetEvent},
    viewer::{
        ApiClient, ConnectionManager, ConnectionState, FleetView, SharedFleetView, WsConnector,
        state::{subscribe_all, track_connection},
    },
};
use chrono::Utc;
use pretty_assertions::assert_eq;
use tokio::{sync::mpsc, time::timeout};

use crate::helpers::*;

const WAIT: Duration = Duration::from_secs(5);

struct Observer {
    manager: ConnectionManager,
    view: SharedFleetView,
    envelopes: mpsc::UnboundedReceiver<Envelope>,
}

impl Observer {
    async fn next(&mut self) -> Envelope {
        timeout(WAIT, self.envelopes.recv())
            .await
            .expect("envelope within timeout")
            .expect("bus alive")
    }
}

async fn follow(hub: &TestHub) -> Observer {
    let client = ApiClient::new(&hub.base_url(), WAIT).unwrap();
    let agents = client.agents().await.unwrap();
    let alerts = client.alerts().await.unwrap();
    let view = FleetView::new(agents, alerts).shared();

    let manager = ConnectionManager::spawn(
        WsConnector::new(&hub.base_url()),
        Duration::from_millis(200),
    );
    subscribe_all(&view, manager.bus());

    let (tx, envelopes) = mpsc::unbounded_channel();
    for kind in EventKind::ALL {
        let tx = tx.clone();
        manager.subscribe(kind, move |envelope| {
            let _ = tx.send(envelope.clone());
        });
    }

    manager.connect().unwrap();

    Observer {
        manager,
        view,
        envelopes,
    }
}

#[tokio::test]
async fn test_greeting_then_status_change_updates_view() {
    let hub = spawn_hub().await;
    let mut observer = follow(&hub).await;

    let greeting = observer.next().await;
    assert_eq!(greeting.kind(), EventKind::Connected);
    assert!(observer.view.lock().is_connected());
    assert_eq!(observer.manager.state(), ConnectionState::Open);

    let client = ApiClient::new(&hub.base_url(), WAIT).unwrap();
    client.set_agent_status("3", "inactive").await.unwrap();

    let change = observer.next().await;
    assert_eq!(change.kind(), EventKind::AgentStatusChanged);
    assert_eq!(
        observer.view.lock().agent("3").unwrap().status,
        AgentStatus::Inactive
    );
}

#[tokio::test]
async fn test_published_envelope_arrives_intact() {
    let hub = spawn_hub().await;
    let mut observer = follow(&hub).await;
    observer.next().await;

    let sent = Envelope::new(FleetEvent::AlertAcknowledged(AlertAck {
        alert_id: "a4".to_string(),
        timestamp: Utc::now(),
    }));
    let report = hub.broadcaster.publish_envelope(&sent).await;
    assert_eq!(report.delivered, 1);

    let received = observer.next().await;
    assert_eq!(received, sent);
}

#[tokio::test]
async fn test_ticks_and_acknowledgements_reach_view() {
    let hub = spawn_hub().await;
    let mut observer = follow(&hub).await;
    observer.next().await;

    hub.fleet.tick_now().await.unwrap();
    assert_eq!(observer.next().await.kind(), EventKind::MetricsUpdated);
    assert_eq!(
        observer.view.lock().agents(),
        hub.fleet.agents().await.unwrap().as_slice()
    );

    let client = ApiClient::new(&hub.base_url(), WAIT).unwrap();
    client.acknowledge_alert("a1").await.unwrap();
    assert_eq!(observer.next().await.kind(), EventKind::AlertAcknowledged);

    let overview = client.overview().await.unwrap();
    assert_eq!(
        observer.view.lock().summary().unacknowledged_alerts,
        overview.unacknowledged_alerts
    );
}

#[tokio::test]
async fn test_disconnect_unregisters_observer() {
    let hub = spawn_hub().await;
    let mut observer = follow(&hub).await;
    observer.next().await;

    let client = ApiClient::new(&hub.base_url(), WAIT).unwrap();
    assert_eq!(client.health().await.unwrap().observers, 1);

    observer.manager.disconnect().unwrap();

    // The hub notices the close asynchronously
    let mut observers = 1;
    for _ in 0..50 {
        observers = hub.broadcaster.observer_count().await;
        if observers == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(observers, 0);
    assert_eq!(observer.manager.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_reconnect_reloads_alerts_missed_while_down() {
    let hub = spawn_hub().await;
    let mut observer = follow(&hub).await;
    observer.next().await;

    observer.manager.disconnect().unwrap();
    observer
        .manager
        .watch_state()
        .wait_for(|state| *state == ConnectionState::Disconnected)
        .await
        .unwrap();

    // Published while nobody is listening
    let client = ApiClient::new(&hub.base_url(), WAIT).unwrap();
    client.acknowledge_alert("a1").await.unwrap();
    assert!(!observer.view.lock().alert("a1").unwrap().acknowledged);

    let tracker = track_connection(
        Arc::clone(&observer.view),
        client.clone(),
        observer.manager.watch_state(),
    );
    observer.manager.connect().unwrap();

    timeout(WAIT, async {
        loop {
            let acknowledged = observer.view.lock().alert("a1").unwrap().acknowledged;
            if acknowledged {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("view catches up after reconnect");

    let view = observer.view.lock().clone();
    assert!(view.is_connected());
    assert!(view.alert("a1").unwrap().acknowledged_at.is_some());
    assert_eq!(
        view.summary().unacknowledged_alerts,
        client.overview().await.unwrap().unacknowledged_alerts
    );

    tracker.abort();
}
