// Reconciling view state
//
// Holds what a dashboard renders: the latest metric snapshot, a bounded
// log window and the deployment list. Push events and poll results feed
// the same `apply` path, and every update is idempotent by record id,
// so overlapping sources never duplicate rows.

use pulseboard_core::model::{DashboardEvent, Deployment, DeployStage, LogEntry, MetricSnapshot};
use std::collections::{HashMap, HashSet, VecDeque};

/// Most log rows a dashboard keeps; older entries age out
pub const LOG_WINDOW: usize = 100;

#[derive(Default)]
pub struct ViewState {
    metrics: Option<MetricSnapshot>,
    /// Newest first
    logs: VecDeque<LogEntry>,
    log_ids: HashSet<String>,
    /// Newest first, unique by id
    deployments: Vec<Deployment>,
    /// Stage of each deployment still in flight
    active_stages: HashMap<String, DeployStage>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> Option<&MetricSnapshot> {
        self.metrics.as_ref()
    }

    pub fn logs(&self) -> impl Iterator<Item = &LogEntry> {
        self.logs.iter()
    }

    pub fn log_count(&self) -> usize {
        self.logs.len()
    }

    pub fn deployments(&self) -> &[Deployment] {
        &self.deployments
    }

    pub fn active_stage(&self, deployment_id: &str) -> Option<DeployStage> {
        self.active_stages.get(deployment_id).copied()
    }

    /// Fold one event into the view
    pub fn apply(&mut self, event: &DashboardEvent) {
        match event {
            DashboardEvent::MetricsUpdate(snapshot) => {
                self.metrics = Some(snapshot.clone());
            }
            DashboardEvent::LogNew(entry) => {
                self.insert_log(entry);
            }
            DashboardEvent::LogsUpdate(entries) => {
                self.merge_logs(entries);
            }
            DashboardEvent::DeploymentStarted(deployment) => {
                self.upsert_deployment(deployment);
            }
            DashboardEvent::DeploymentProgress(progress) => {
                self.active_stages.insert(progress.id.clone(), progress.stage);
            }
            DashboardEvent::DeploymentComplete(outcome) => {
                self.active_stages.remove(&outcome.id);
                if let Some(existing) = self.deployments.iter_mut().find(|d| d.id == outcome.id) {
                    existing.status = outcome.status;
                    existing.summary = outcome.message.clone();
                }
                // Completion for an unknown id carries no full record;
                // the next deployments poll will supply it
            }
        }
    }

    /// Merge a newest-first poll page without disturbing display order.
    /// Entries already in the window anchor a cursor; an unseen entry
    /// slots in right after the last anchor, so an entry older than the
    /// window lands at the back, never at the head.
    pub fn merge_logs(&mut self, entries: &[LogEntry]) {
        let mut cursor = 0;
        for entry in entries {
            if let Some(found) = self.logs.iter().position(|l| l.id == entry.id) {
                cursor = found + 1;
            } else {
                let at = cursor.min(self.logs.len());
                self.log_ids.insert(entry.id.clone());
                self.logs.insert(at, entry.clone());
                cursor = at + 1;
            }
        }
        self.trim_logs();
    }

    /// Merge a newest-first deployments poll page, same cursor rule as
    /// `merge_logs`: known records update in place, unknown ones keep
    /// the page's relative order.
    pub fn merge_deployments(&mut self, deployments: &[Deployment]) {
        let mut cursor = 0;
        for deployment in deployments {
            if let Some(found) = self.deployments.iter().position(|d| d.id == deployment.id) {
                self.deployments[found] = deployment.clone();
                cursor = found + 1;
            } else {
                let at = cursor.min(self.deployments.len());
                self.deployments.insert(at, deployment.clone());
                cursor = at + 1;
            }
        }
    }

    // Live events only: a pushed entry is by definition the newest.
    fn insert_log(&mut self, entry: &LogEntry) {
        if !self.log_ids.insert(entry.id.clone()) {
            return;
        }
        self.logs.push_front(entry.clone());
        self.trim_logs();
    }

    fn trim_logs(&mut self) {
        while self.logs.len() > LOG_WINDOW {
            if let Some(evicted) = self.logs.pop_back() {
                self.log_ids.remove(&evicted.id);
            }
        }
    }

    fn upsert_deployment(&mut self, deployment: &Deployment) {
        match self.deployments.iter_mut().find(|d| d.id == deployment.id) {
            Some(existing) => *existing = deployment.clone(),
            None => self.deployments.insert(0, deployment.clone()),
        }
    }
}
