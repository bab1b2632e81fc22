//! Persistent store (RocksDB).
//!
//! Key layout, all values JSON:
//! - `metrics/latest`                      -> MetricSnapshot
//! - `log/{rev_ts}/{id}`                   -> LogEntry (rev_ts orders newest first)
//! - `deployment/id/{id}`                  -> Deployment
//! - `deployment/ts/{rev_ts}/{id}`         -> id (time index)
//! - `service/{id}`                        -> ServiceHealth
//! - `uptime/{service_id}/{rev_ts}`        -> UptimePoint
//! - `insight/{date}`                      -> Insight
//! - `settings/{user_id}`                  -> Settings

use super::{Store, StoreError, StoreResult};
use crate::model::{
    Deployment, DeployStatus, Insight, LogEntry, LogFilter, MetricSnapshot, ServiceHealth,
    Settings, UptimePoint,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{Options, DB};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use tracing::info;

pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path).map_err(|e| StoreError::Unavailable(e.to_string()))?;

        info!(target: "store", "RocksDB store opened");
        Ok(Self { db })
    }

    fn put_json<V: Serialize>(&self, key: &str, value: &V) -> StoreResult<()> {
        let serialized = serde_json::to_vec(value)?;
        self.db
            .put(key.as_bytes(), serialized)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn get_json<V: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<V>> {
        match self.db.get(key.as_bytes()) {
            Ok(Some(data)) => Ok(Some(serde_json::from_slice(&data)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }

    /// Collect up to `limit` JSON values under `prefix`, in key order.
    /// Keys embed a reversed timestamp, so key order is newest first.
    fn scan_prefix<V: DeserializeOwned>(&self, prefix: &str, limit: usize) -> StoreResult<Vec<V>> {
        let mut values = Vec::new();
        for item in self.db.prefix_iterator(prefix.as_bytes()) {
            let (key, value) = item.map_err(|e| StoreError::Backend(e.to_string()))?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            values.push(serde_json::from_slice(&value)?);
            if values.len() >= limit {
                break;
            }
        }
        Ok(values)
    }

    // Zero-padded reversed millisecond timestamp; ascending key order
    // yields newest-first iteration.
    fn rev_ts(ts: DateTime<Utc>) -> String {
        let millis = u64::try_from(ts.timestamp_millis()).unwrap_or(0);
        format!("{:020}", u64::MAX - millis)
    }
}

#[async_trait]
impl Store for RocksStore {
    async fn latest_metrics(&self) -> StoreResult<Option<MetricSnapshot>> {
        self.get_json("metrics/latest")
    }

    async fn put_metrics(&self, snapshot: &MetricSnapshot) -> StoreResult<()> {
        self.put_json("metrics/latest", snapshot)
    }

    async fn recent_logs(&self, filter: LogFilter, limit: usize) -> StoreResult<Vec<LogEntry>> {
        // Over-scan when filtering so a noisy level still fills the page
        let scan_limit = match filter {
            LogFilter::All => limit,
            LogFilter::Level(_) => limit.saturating_mul(8),
        };
        let entries: Vec<LogEntry> = self.scan_prefix("log/", scan_limit)?;
        let mut matched: Vec<LogEntry> = entries
            .into_iter()
            .filter(|entry| filter.matches(entry))
            .collect();
        matched.truncate(limit);
        Ok(matched)
    }

    async fn append_log(&self, entry: &LogEntry) -> StoreResult<()> {
        let key = format!("log/{}/{}", Self::rev_ts(entry.timestamp), entry.id);
        self.put_json(&key, entry)
    }

    async fn recent_deployments(&self, limit: usize) -> StoreResult<Vec<Deployment>> {
        let ids: Vec<String> = self.scan_prefix("deployment/ts/", limit)?;
        let mut deployments = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(deployment) = self.get_json(&format!("deployment/id/{id}"))? {
                deployments.push(deployment);
            }
        }
        Ok(deployments)
    }

    async fn create_deployment(&self, deployment: &Deployment) -> StoreResult<()> {
        self.put_json(&format!("deployment/id/{}", deployment.id), deployment)?;
        let index_key = format!(
            "deployment/ts/{}/{}",
            Self::rev_ts(deployment.created_at),
            deployment.id
        );
        self.put_json(&index_key, &deployment.id)
    }

    async fn finish_deployment(
        &self,
        id: &str,
        status: DeployStatus,
        summary: &str,
    ) -> StoreResult<Deployment> {
        let key = format!("deployment/id/{id}");
        let mut deployment: Deployment = self
            .get_json(&key)?
            .ok_or_else(|| StoreError::DeploymentNotFound(id.to_string()))?;

        if deployment.status.is_terminal() {
            return Err(StoreError::AlreadyFinished(id.to_string()));
        }

        deployment.status = status;
        deployment.summary = summary.to_string();
        self.put_json(&key, &deployment)?;
        Ok(deployment)
    }

    async fn services(&self) -> StoreResult<Vec<ServiceHealth>> {
        let mut services: Vec<ServiceHealth> = self.scan_prefix("service/", usize::MAX)?;
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    async fn put_service(&self, service: &ServiceHealth) -> StoreResult<()> {
        self.put_json(&format!("service/{}", service.id), service)
    }

    async fn service_uptime(
        &self,
        service_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<UptimePoint>> {
        self.scan_prefix(&format!("uptime/{service_id}/"), limit)
    }

    async fn append_uptime(&self, point: &UptimePoint) -> StoreResult<()> {
        let key = format!(
            "uptime/{}/{}",
            point.service_id,
            Self::rev_ts(point.timestamp)
        );
        self.put_json(&key, point)
    }

    async fn insight_for(&self, date: &str) -> StoreResult<Option<Insight>> {
        self.get_json(&format!("insight/{date}"))
    }

    async fn put_insight(&self, insight: &Insight) -> StoreResult<()> {
        self.put_json(&format!("insight/{}", insight.date), insight)
    }

    async fn settings(&self, user_id: &str) -> StoreResult<Option<Settings>> {
        self.get_json(&format!("settings/{user_id}"))
    }

    async fn put_settings(&self, settings: &Settings) -> StoreResult<()> {
        self.put_json(&format!("settings/{}", settings.user_id), settings)
    }
}
