//! In-memory store.
//!
//! Backed by DashMap and RwLock; suitable for development, demos and
//! tests. Logs are bounded so a long-running demo process does not grow
//! without limit.

use super::{Store, StoreError, StoreResult};
use crate::model::{
    Deployment, DeployStatus, Insight, LogEntry, LogFilter, MetricSnapshot, ServiceHealth,
    Settings, UptimePoint,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

// Retention cap for the in-memory log list
const MAX_LOGS: usize = 1000;

pub struct MemoryStore {
    metrics: RwLock<Option<MetricSnapshot>>,
    logs: RwLock<Vec<LogEntry>>,
    deployments: RwLock<Vec<Deployment>>,
    services: RwLock<Vec<ServiceHealth>>,
    // service_id -> samples, newest last
    uptime: DashMap<String, Vec<UptimePoint>>,
    // date -> insight
    insights: DashMap<String, Insight>,
    // user_id -> settings
    settings: DashMap<String, Settings>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            metrics: RwLock::new(None),
            logs: RwLock::new(Vec::new()),
            deployments: RwLock::new(Vec::new()),
            services: RwLock::new(Vec::new()),
            uptime: DashMap::new(),
            insights: DashMap::new(),
            settings: DashMap::new(),
        })
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn latest_metrics(&self) -> StoreResult<Option<MetricSnapshot>> {
        Ok(self.metrics.read().await.clone())
    }

    async fn put_metrics(&self, snapshot: &MetricSnapshot) -> StoreResult<()> {
        *self.metrics.write().await = Some(snapshot.clone());
        Ok(())
    }

    async fn recent_logs(&self, filter: LogFilter, limit: usize) -> StoreResult<Vec<LogEntry>> {
        let logs = self.logs.read().await;
        let mut matched: Vec<LogEntry> = logs
            .iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matched.truncate(limit);
        Ok(matched)
    }

    async fn append_log(&self, entry: &LogEntry) -> StoreResult<()> {
        let mut logs = self.logs.write().await;
        logs.push(entry.clone());
        if logs.len() > MAX_LOGS {
            let excess = logs.len() - MAX_LOGS;
            logs.drain(..excess);
        }
        Ok(())
    }

    async fn recent_deployments(&self, limit: usize) -> StoreResult<Vec<Deployment>> {
        let deployments = self.deployments.read().await;
        let mut sorted: Vec<Deployment> = deployments.clone();
        sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sorted.truncate(limit);
        Ok(sorted)
    }

    async fn create_deployment(&self, deployment: &Deployment) -> StoreResult<()> {
        self.deployments.write().await.push(deployment.clone());
        Ok(())
    }

    async fn finish_deployment(
        &self,
        id: &str,
        status: DeployStatus,
        summary: &str,
    ) -> StoreResult<Deployment> {
        let mut deployments = self.deployments.write().await;
        let deployment = deployments
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| StoreError::DeploymentNotFound(id.to_string()))?;

        if deployment.status.is_terminal() {
            return Err(StoreError::AlreadyFinished(id.to_string()));
        }

        deployment.status = status;
        deployment.summary = summary.to_string();
        Ok(deployment.clone())
    }

    async fn services(&self) -> StoreResult<Vec<ServiceHealth>> {
        let mut services = self.services.read().await.clone();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    async fn put_service(&self, service: &ServiceHealth) -> StoreResult<()> {
        let mut services = self.services.write().await;
        match services.iter_mut().find(|s| s.id == service.id) {
            Some(existing) => *existing = service.clone(),
            None => services.push(service.clone()),
        }
        Ok(())
    }

    async fn service_uptime(
        &self,
        service_id: &str,
        limit: usize,
    ) -> StoreResult<Vec<UptimePoint>> {
        let mut points = self
            .uptime
            .get(service_id)
            .map(|entry| entry.clone())
            .unwrap_or_default();
        points.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        points.truncate(limit);
        Ok(points)
    }

    async fn append_uptime(&self, point: &UptimePoint) -> StoreResult<()> {
        self.uptime
            .entry(point.service_id.clone())
            .or_default()
            .push(point.clone());
        Ok(())
    }

    async fn insight_for(&self, date: &str) -> StoreResult<Option<Insight>> {
        Ok(self.insights.get(date).map(|entry| entry.clone()))
    }

    async fn put_insight(&self, insight: &Insight) -> StoreResult<()> {
        self.insights.insert(insight.date.clone(), insight.clone());
        Ok(())
    }

    async fn settings(&self, user_id: &str) -> StoreResult<Option<Settings>> {
        Ok(self.settings.get(user_id).map(|entry| entry.clone()))
    }

    async fn put_settings(&self, settings: &Settings) -> StoreResult<()> {
        self.settings
            .insert(settings.user_id.clone(), settings.clone());
        Ok(())
    }
}
