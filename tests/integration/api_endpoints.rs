//! Integration tests for API endpoints
//!
//! These tests verify that:
//! - All REST endpoints return correct responses
//! - Unknown ids map to 404 and bad input to 400
//! - Error bodies use the `{"error": ...}` shape
//! - Mutations show up in later reads and in the overview

use agentwatch::{Agent, AgentStatus, Alert, store::FleetOverview};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::helpers::*;

#[tokio::test]
async fn test_health_check() {
    let hub = spawn_hub().await;

    let response = reqwest::get(hub.url("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["observers"], 0);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_list_and_get_agents() {
    let hub = spawn_hub().await;

    let agents: Vec<Agent> = reqwest::get(hub.url("/api/agents"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(agents.len(), 5);

    let response = reqwest::get(hub.url("/api/agents/2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let agent: Agent = response.json().await.unwrap();
    assert_eq!(agent, agents[1]);
}

#[tokio::test]
async fn test_agent_wire_shape() {
    let hub = spawn_hub().await;

    let agent: Value = reqwest::get(hub.url("/api/agents/1"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    for key in [
        "id",
        "name",
        "type",
        "status",
        "lastActivity",
        "requestsToday",
        "errorRate",
        "responseTime",
        "owner",
        "environment",
        "policies",
        "metrics",
    ] {
        assert!(agent.get(key).is_some(), "missing key {key}");
    }
    assert!(agent["metrics"].get("costToday").is_some());
}

#[tokio::test]
async fn test_unknown_agent_is_404() {
    let hub = spawn_hub().await;

    let response = reqwest::get(hub.url("/api/agents/999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("999"));
}

#[tokio::test]
async fn test_set_status() {
    let hub = spawn_hub().await;
    let client = reqwest::Client::new();

    let response = client
        .put(hub.url("/api/agents/3/status"))
        .json(&json!({ "status": "inactive" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let agent: Agent = response.json().await.unwrap();
    assert_eq!(agent.status, AgentStatus::Inactive);

    let fetched = hub.fleet.agent("3").await.unwrap();
    assert_eq!(fetched.status, AgentStatus::Inactive);
}

#[tokio::test]
async fn test_set_status_rejects_bad_input() {
    let hub = spawn_hub().await;
    let client = reqwest::Client::new();

    let invalid = client
        .put(hub.url("/api/agents/3/status"))
        .json(&json!({ "status": "sleeping" }))
        .send()
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    let body: Value = invalid.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("sleeping"));

    let missing = client
        .put(hub.url("/api/agents/3/status"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let garbage = client
        .put(hub.url("/api/agents/3/status"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(garbage.status(), StatusCode::BAD_REQUEST);

    // Unknown agent wins over an invalid status
    let unknown = client
        .put(hub.url("/api/agents/999/status"))
        .json(&json!({ "status": "sleeping" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    let agent = hub.fleet.agent("3").await.unwrap();
    assert_eq!(agent.status, AgentStatus::Warning);
}

#[tokio::test]
async fn test_unknown_agent_outranks_malformed_body() {
    let hub = spawn_hub().await;
    let client = reqwest::Client::new();

    for body in [json!({}), json!({ "status": 5 })] {
        let response = client
            .put(hub.url("/api/agents/999/status"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "body {body}");
    }

    let response = client
        .post(hub.url("/api/agents/999/policies"))
        .json(&json!({ "name": "Quota", "type": "vibes" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .put(hub.url("/api/agents/999/policies/p1"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Known agent, same malformed bodies
    let response = client
        .put(hub.url("/api/agents/1/status"))
        .json(&json!({ "status": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_alerts_and_acknowledge() {
    let hub = spawn_hub().await;
    let client = reqwest::Client::new();

    let alerts: Vec<Alert> = reqwest::get(hub.url("/api/alerts"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(alerts.len(), 6);

    let alert: Alert = reqwest::get(hub.url("/api/alerts/a1"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!alert.acknowledged);

    for _ in 0..2 {
        let response = client
            .put(hub.url("/api/alerts/a1/acknowledge"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["acknowledged"], true);
        assert!(body["acknowledgedAt"].is_string());
    }

    let missing = client
        .put(hub.url("/api/alerts/nope/acknowledge"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let missing = reqwest::get(hub.url("/api/alerts/nope")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_overview_tracks_mutations() {
    let hub = spawn_hub().await;
    let client = reqwest::Client::new();

    let before: FleetOverview = reqwest::get(hub.url("/api/metrics/overview"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(before.total_agents, 5);
    assert_eq!(before.unacknowledged_alerts, 3);

    client
        .put(hub.url("/api/alerts/a4/acknowledge"))
        .send()
        .await
        .unwrap();
    client
        .put(hub.url("/api/agents/5/status"))
        .json(&json!({ "status": "active" }))
        .send()
        .await
        .unwrap();

    let after: Value = reqwest::get(hub.url("/api/metrics/overview"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(after["unacknowledgedAlerts"], 2);
    assert_eq!(after["activeAgents"], before.active_agents + 1);
    assert_eq!(after["totalRequests"], before.total_requests);
}

#[tokio::test]
async fn test_policy_create_and_toggle() {
    let hub = spawn_hub().await;
    let client = reqwest::Client::new();

    let response = client
        .post(hub.url("/api/agents/1/policies"))
        .json(&json!({
            "name": "Escalation Window",
            "type": "access_control",
            "configuration": { "hours": "09-17" }
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let agent: Agent = response.json().await.unwrap();
    let created = agent.policies.last().unwrap();
    assert_eq!(created.id, "p12");
    assert!(created.enabled);
    assert_eq!(created.configuration["hours"], "09-17");

    let response = client
        .put(hub.url("/api/agents/1/policies/p12"))
        .json(&json!({ "enabled": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let agent: Agent = response.json().await.unwrap();
    assert!(!agent.policy("p12").unwrap().enabled);

    let blank = client
        .post(hub.url("/api/agents/1/policies"))
        .json(&json!({ "name": "  ", "type": "rate_limit" }))
        .send()
        .await
        .unwrap();
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

    let bad_type = client
        .post(hub.url("/api/agents/1/policies"))
        .json(&json!({ "name": "Quota", "type": "vibes" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_type.status(), StatusCode::BAD_REQUEST);

    let wrong_agent = client
        .put(hub.url("/api/agents/2/policies/p12"))
        .json(&json!({ "enabled": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_agent.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_preflight_allowed() {
    let hub = spawn_hub().await;

    let response = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, hub.url("/api/agents"))
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "PUT")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}
