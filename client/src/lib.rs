// Pulseboard Client Library
// Typed wrapper over the dashboard HTTP API, plus a live event
// subscriber with polling fallback and a reconciling view state.

pub mod sse;
pub mod view;

pub use sse::{EventSubscriber, SubscriberConfig, SubscriberHandle};
pub use view::ViewState;

use pulseboard_core::model::{
    Deployment, Insight, LogEntry, MetricSnapshot, ServiceHealth, Settings, SettingsPatch,
    UptimePoint,
};
use pulseboard_core::model::LogLevel;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server rejected request: {0}")]
    Rejected(String),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Response envelope for the deployment trigger endpoint
#[derive(Debug, Deserialize)]
pub struct DeployResponse {
    pub success: bool,
    pub deployment: Deployment,
    pub message: String,
}

/// Log entry submitted through the injection endpoint; the server
/// assigns the id and, when absent, the timestamp
#[derive(Clone, Debug, Serialize)]
pub struct NewLog {
    #[serde(rename = "type")]
    pub level: LogLevel,
    pub message: String,
    pub service: String,
}

/// Thin typed client for the dashboard API. Cheap to clone; all clones
/// share the underlying connection pool.
#[derive(Clone)]
pub struct DashboardClient {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: String,
}

impl DashboardClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn fetch_metrics(&self) -> ClientResult<MetricSnapshot> {
        let response = self
            .http
            .get(self.url("/api/metrics"))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// Logs, newest first. `kind` filters by level ("error", "warn", ...);
    /// anything else means all levels.
    pub async fn fetch_logs(
        &self,
        kind: Option<&str>,
        limit: Option<usize>,
    ) -> ClientResult<Vec<LogEntry>> {
        let mut request = self.http.get(self.url("/api/logs"));
        if let Some(kind) = kind {
            request = request.query(&[("type", kind)]);
        }
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit.to_string())]);
        }
        let response = request.send().await?.error_for_status()?;
        Ok(response.json().await?)
    }

    /// Inject log entries (server-to-server path). Each entry is stored
    /// and broadcast to stream subscribers.
    pub async fn push_logs(&self, entries: &[NewLog]) -> ClientResult<()> {
        self.http
            .post(self.url("/api/logs/new"))
            .json(entries)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Inject a metric snapshot (server-to-server path)
    pub async fn push_metrics(
        &self,
        cpu: i64,
        memory: i64,
        latency: i64,
        cost: f64,
    ) -> ClientResult<MetricSnapshot> {
        let body = serde_json::json!({
            "cpu": cpu,
            "memory": memory,
            "latency": latency,
            "cost": cost,
        });
        let response = self
            .http
            .post(self.url("/api/metrics/new"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        #[derive(Deserialize)]
        struct Envelope {
            metrics: MetricSnapshot,
        }
        let envelope: Envelope = response.json().await?;
        Ok(envelope.metrics)
    }

    pub async fn health(&self) -> ClientResult<serde_json::Value> {
        let response = self
            .http
            .get(self.url("/health"))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    pub async fn fetch_deployments(&self) -> ClientResult<Vec<Deployment>> {
        let response = self
            .http
            .get(self.url("/api/deployments"))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// Trigger a deployment and return the pending record. Stage progress
    /// arrives through the event subscriber, not this call.
    pub async fn trigger_deploy(&self, branch: Option<&str>) -> ClientResult<DeployResponse> {
        let body = match branch {
            Some(branch) => serde_json::json!({ "branch": branch }),
            None => serde_json::json!({}),
        };
        let response = self
            .http
            .post(self.url("/api/deploy"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let parsed: DeployResponse = response.json().await?;
        if !parsed.success {
            return Err(ClientError::Rejected(parsed.message));
        }
        Ok(parsed)
    }

    pub async fn fetch_insights(&self) -> ClientResult<Insight> {
        let response = self
            .http
            .get(self.url("/api/insights"))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    pub async fn fetch_services(&self) -> ClientResult<Vec<ServiceHealth>> {
        let response = self
            .http
            .get(self.url("/api/services"))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    pub async fn fetch_uptime(&self, service_id: &str) -> ClientResult<Vec<UptimePoint>> {
        let response = self
            .http
            .get(self.url(&format!("/api/services/{service_id}/uptime")))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    pub async fn fetch_settings(&self) -> ClientResult<Settings> {
        let response = self
            .http
            .get(self.url("/api/settings"))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// Partial update; returns the merged settings record
    pub async fn update_settings(&self, patch: &SettingsPatch) -> ClientResult<Settings> {
        let response = self
            .http
            .patch(self.url("/api/settings"))
            .json(patch)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}
