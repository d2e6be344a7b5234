//! REST client for the hub API
//!
//! Mirrors every HTTP operation the hub exposes. Non-2xx responses are turned
//! into a [`RequestError`] carrying the status and the hub's `error` message,
//! wrapped in `anyhow::Error` so callers can `downcast_ref` when they care.

use std::{fmt, time::Duration};

use anyhow::{Context, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    Agent, Alert, NewPolicy,
    api::types::{HealthResponse, PolicyToggleRequest, StatusUpdateRequest},
    store::FleetOverview,
};

/// The hub answered with a non-success status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestError {
    pub status: StatusCode,
    pub message: String,
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hub returned {}: {}", self.status, self.message)
    }
}

impl std::error::Error for RequestError {}

#[derive(serde::Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.context("Request to hub failed")?;
        let status = response.status();
        debug!(url = %response.url(), %status, "hub response");

        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            return Err(RequestError { status, message }.into());
        }

        response
            .json::<T>()
            .await
            .context("Failed to decode hub response")
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.send(self.http_client.get(self.url("/api/health"))).await
    }

    pub async fn agents(&self) -> Result<Vec<Agent>> {
        self.send(self.http_client.get(self.url("/api/agents"))).await
    }

    pub async fn agent(&self, id: &str) -> Result<Agent> {
        self.send(self.http_client.get(self.url(&format!("/api/agents/{id}"))))
            .await
    }

    pub async fn set_agent_status(&self, id: &str, status: &str) -> Result<Agent> {
        let body = StatusUpdateRequest {
            status: status.to_string(),
        };
        self.send(
            self.http_client
                .put(self.url(&format!("/api/agents/{id}/status")))
                .json(&body),
        )
        .await
    }

    pub async fn alerts(&self) -> Result<Vec<Alert>> {
        self.send(self.http_client.get(self.url("/api/alerts"))).await
    }

    pub async fn alert(&self, id: &str) -> Result<Alert> {
        self.send(self.http_client.get(self.url(&format!("/api/alerts/{id}"))))
            .await
    }

    pub async fn acknowledge_alert(&self, id: &str) -> Result<Alert> {
        self.send(
            self.http_client
                .put(self.url(&format!("/api/alerts/{id}/acknowledge"))),
        )
        .await
    }

    pub async fn overview(&self) -> Result<FleetOverview> {
        self.send(self.http_client.get(self.url("/api/metrics/overview")))
            .await
    }

    pub async fn create_policy(&self, agent_id: &str, policy: &NewPolicy) -> Result<Agent> {
        self.send(
            self.http_client
                .post(self.url(&format!("/api/agents/{agent_id}/policies")))
                .json(policy),
        )
        .await
    }

    pub async fn set_policy_enabled(
        &self,
        agent_id: &str,
        policy_id: &str,
        enabled: bool,
    ) -> Result<Agent> {
        self.send(
            self.http_client
                .put(self.url(&format!("/api/agents/{agent_id}/policies/{policy_id}")))
                .json(&PolicyToggleRequest { enabled }),
        )
        .await
    }
}
