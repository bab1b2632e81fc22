//! Backing store interface and implementations.
//!
//! The store reports failure explicitly through `StoreError`; it never
//! substitutes synthetic data itself. The fallback-to-synthetic decision
//! lives one level up, in [`crate::source::StateSource`], as a named
//! policy.

mod memory;
mod rocks;

pub use memory::MemoryStore;
pub use rocks::RocksStore;

use crate::model::{
    Deployment, DeployStatus, Insight, LogEntry, LogFilter, MetricSnapshot, ServiceHealth,
    Settings, UptimePoint,
};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("deployment {0} not found")]
    DeploymentNotFound(String),

    #[error("deployment {0} already reached a terminal state")]
    AlreadyFinished(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Storage seam for dashboard state.
///
/// Reads return `Ok(None)` / empty lists for "no data yet" and `Err` for a
/// broken backend; callers decide what to do with either. Writes are plain
/// `Result`s; best-effort semantics are the caller's policy, not the
/// store's.
#[async_trait]
pub trait Store: Send + Sync {
    /// Single most-recent metric snapshot
    async fn latest_metrics(&self) -> StoreResult<Option<MetricSnapshot>>;

    /// Replace the latest snapshot (no history in the live path)
    async fn put_metrics(&self, snapshot: &MetricSnapshot) -> StoreResult<()>;

    /// Log entries, newest first, filtered and capped
    async fn recent_logs(&self, filter: LogFilter, limit: usize) -> StoreResult<Vec<LogEntry>>;

    async fn append_log(&self, entry: &LogEntry) -> StoreResult<()>;

    /// Deployments, newest first, capped
    async fn recent_deployments(&self, limit: usize) -> StoreResult<Vec<Deployment>>;

    async fn create_deployment(&self, deployment: &Deployment) -> StoreResult<()>;

    /// Apply the single terminal transition. Fails with `AlreadyFinished`
    /// if the deployment left `Pending` before, preserving the total order
    /// `pending -> {success | failed}`.
    async fn finish_deployment(
        &self,
        id: &str,
        status: DeployStatus,
        summary: &str,
    ) -> StoreResult<Deployment>;

    async fn services(&self) -> StoreResult<Vec<ServiceHealth>>;

    async fn put_service(&self, service: &ServiceHealth) -> StoreResult<()>;

    /// Uptime samples for one service, newest first
    async fn service_uptime(&self, service_id: &str, limit: usize)
        -> StoreResult<Vec<UptimePoint>>;

    async fn append_uptime(&self, point: &UptimePoint) -> StoreResult<()>;

    /// Insight record for the given calendar date (`YYYY-MM-DD`)
    async fn insight_for(&self, date: &str) -> StoreResult<Option<Insight>>;

    async fn put_insight(&self, insight: &Insight) -> StoreResult<()>;

    async fn settings(&self, user_id: &str) -> StoreResult<Option<Settings>>;

    async fn put_settings(&self, settings: &Settings) -> StoreResult<()>;
}
