// State source
//
// Infallible read facade over the backing store. Each read applies the
// fallback policy: a broken or empty store is answered with synthetic
// data, never an error, so the dashboard always has something to render.
// The trade-off: callers cannot distinguish "no data yet" from
// "backend down".

use crate::entropy::Entropy;
use crate::model::{
    Deployment, DeployStatus, Insight, LogEntry, LogFilter, MetricSnapshot, ServiceHealth,
    Settings, SettingsPatch, UptimePoint,
};
use crate::store::{Store, StoreResult};
use crate::synth;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fallback policy for single-value reads: substitute a synthetic value
/// when the store errors or holds nothing.
pub fn or_synthetic<T>(what: &str, found: StoreResult<Option<T>>, synth: impl FnOnce() -> T) -> T {
    match found {
        Ok(Some(value)) => value,
        Ok(None) => {
            debug!(target: "source", what, "Store empty; serving synthetic data");
            synth()
        }
        Err(e) => {
            debug!(target: "source", what, error = %e, "Store unavailable; serving synthetic data");
            synth()
        }
    }
}

/// Fallback policy for list reads: an empty list also falls back, matching
/// the demo-friendly behavior of the read endpoints.
pub fn or_synthetic_list<T>(
    what: &str,
    found: StoreResult<Vec<T>>,
    synth: impl FnOnce() -> Vec<T>,
) -> Vec<T> {
    match found {
        Ok(values) if !values.is_empty() => values,
        Ok(_) => {
            debug!(target: "source", what, "Store empty; serving synthetic data");
            synth()
        }
        Err(e) => {
            debug!(target: "source", what, error = %e, "Store unavailable; serving synthetic data");
            synth()
        }
    }
}

pub struct StateSource {
    store: Arc<dyn Store>,
    entropy: Arc<Entropy>,
}

impl StateSource {
    pub fn new(store: Arc<dyn Store>, entropy: Arc<Entropy>) -> Self {
        Self { store, entropy }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn entropy(&self) -> &Arc<Entropy> {
        &self.entropy
    }

    /// Latest metric snapshot; synthetic when the store has none
    pub async fn latest_metrics(&self) -> MetricSnapshot {
        or_synthetic("metrics", self.store.latest_metrics().await, || {
            synth::metrics(&self.entropy)
        })
    }

    /// Recent logs, newest first. Only a store *error* falls back to the
    /// fixed-shape mock list; an empty store legitimately returns no logs.
    pub async fn recent_logs(&self, filter: LogFilter, limit: usize) -> Vec<LogEntry> {
        match self.store.recent_logs(filter, limit).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(target: "source", error = %e, "Store unavailable; serving synthetic logs");
                let mut mock: Vec<LogEntry> = synth::log_entries()
                    .into_iter()
                    .filter(|entry| filter.matches(entry))
                    .collect();
                mock.truncate(limit);
                mock
            }
        }
    }

    pub async fn recent_deployments(&self, limit: usize) -> Vec<Deployment> {
        or_synthetic_list(
            "deployments",
            self.store.recent_deployments(limit).await,
            synth::deployments,
        )
    }

    pub async fn services(&self) -> Vec<ServiceHealth> {
        or_synthetic_list("services", self.store.services().await, synth::services)
    }

    pub async fn service_uptime(&self, service_id: &str, limit: usize) -> Vec<UptimePoint> {
        or_synthetic_list(
            "uptime",
            self.store.service_uptime(service_id, limit).await,
            || synth::uptime(&self.entropy, service_id),
        )
    }

    pub async fn daily_insight(&self) -> Insight {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        or_synthetic("insight", self.store.insight_for(&today).await, synth::insight)
    }

    pub async fn settings(&self, user_id: &str) -> Settings {
        or_synthetic("settings", self.store.settings(user_id).await, synth::settings)
    }

    // Writes below are best-effort: a store failure is logged and never
    // affects the in-memory broadcast outcome.

    pub async fn record_metrics(&self, snapshot: &MetricSnapshot) {
        if let Err(e) = self.store.put_metrics(snapshot).await {
            warn!(target: "source", error = %e, "Failed to persist metrics");
        }
    }

    pub async fn record_log(&self, entry: &LogEntry) {
        if let Err(e) = self.store.append_log(entry).await {
            warn!(target: "source", error = %e, "Failed to persist log entry");
        }
    }

    pub async fn open_deployment(&self, deployment: &Deployment) {
        if let Err(e) = self.store.create_deployment(deployment).await {
            warn!(
                target: "source",
                deployment = %deployment.id,
                error = %e,
                "Failed to persist deployment"
            );
        }
    }

    pub async fn close_deployment(
        &self,
        id: &str,
        status: DeployStatus,
        summary: &str,
    ) -> Option<Deployment> {
        match self.store.finish_deployment(id, status, summary).await {
            Ok(deployment) => Some(deployment),
            Err(e) => {
                warn!(
                    target: "source",
                    deployment = %id,
                    error = %e,
                    "Failed to persist deployment outcome"
                );
                None
            }
        }
    }

    /// Merge a partial update over the current settings and persist.
    /// Returns the merged record even when persistence fails.
    pub async fn store_settings(&self, user_id: &str, patch: &SettingsPatch) -> Settings {
        let mut settings = self.settings(user_id).await;
        if let Some(slack_alerts) = patch.slack_alerts {
            settings.slack_alerts = slack_alerts;
        }
        if let Some(auto_rebuild) = patch.auto_rebuild {
            settings.auto_rebuild = auto_rebuild;
        }
        if let Err(e) = self.store.put_settings(&settings).await {
            warn!(target: "source", error = %e, "Failed to persist settings");
        }
        settings
    }
}
