// Dashboard data model
//
// Semantic entities shared by the hub, store, server and client. All
// timestamps are UTC and serialize as RFC 3339.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest resource metrics. Immutable once produced; superseded by the
/// next refresh tick. No history is retained in the live-update path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub id: String,
    /// CPU utilisation, percent
    pub cpu: i64,
    /// Memory utilisation, percent
    pub memory: i64,
    /// Request latency, milliseconds
    pub latency: i64,
    /// Running cost, USD
    pub cost: f64,
    pub timestamp: DateTime<Utc>,
}

/// Severity of a log entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Alert,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Alert => "alert",
        }
    }
}

/// Append-only log entry. Display order is timestamp-descending; the live
/// channel delivers entries in emission order, which can diverge from
/// timestamp order under concurrent producers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub level: LogLevel,
    pub message: String,
    pub service: String,
    pub timestamp: DateTime<Utc>,
}

/// Log list filter parsed from the `type` query parameter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFilter {
    All,
    Level(LogLevel),
}

impl LogFilter {
    /// `"all"`, an unknown value, or an absent parameter mean no filtering.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("info") => LogFilter::Level(LogLevel::Info),
            Some("warn") => LogFilter::Level(LogLevel::Warn),
            Some("error") => LogFilter::Level(LogLevel::Error),
            Some("alert") => LogFilter::Level(LogLevel::Alert),
            _ => LogFilter::All,
        }
    }

    pub fn matches(&self, entry: &LogEntry) -> bool {
        match self {
            LogFilter::All => true,
            LogFilter::Level(level) => entry.level == *level,
        }
    }
}

/// Deployment status. Transitions form a total order:
/// `Pending -> {Success | Failed}`, never backwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployStatus {
    Pending,
    Success,
    Failed,
}

impl DeployStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeployStatus::Pending)
    }
}

/// A deployment record. Created in `Pending` state; the summary text is
/// overwritten exactly once at the terminal transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,
    pub branch: String,
    pub commit: String,
    pub status: DeployStatus,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

/// Ordered phases of a deployment run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployStage {
    Building,
    Testing,
    Deploying,
}

impl DeployStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployStage::Building => "building",
            DeployStage::Testing => "testing",
            DeployStage::Deploying => "deploying",
        }
    }
}

/// Point-in-time stage broadcast; never persisted
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageProgress {
    pub id: String,
    pub stage: DeployStage,
    pub message: String,
}

/// Terminal broadcast for a deployment run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeployOutcome {
    pub id: String,
    pub status: DeployStatus,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Up,
    Down,
    Degraded,
}

/// Read-mostly service health reference data
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub id: String,
    pub name: String,
    pub status: ServiceStatus,
    pub cost_hr: f64,
    pub uptime_percent: f64,
}

/// Hourly uptime sample for one service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UptimePoint {
    pub id: String,
    pub service_id: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Daily system health summary with operational tips
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub id: String,
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    pub grade: String,
    pub tips: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Per-user dashboard settings. Single record; no real multi-tenancy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub id: String,
    pub user_id: String,
    pub slack_alerts: bool,
    pub auto_rebuild: bool,
}

/// Partial settings update accepted by the PATCH endpoint
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SettingsPatch {
    pub slack_alerts: Option<bool>,
    pub auto_rebuild: Option<bool>,
}

/// Event fanned out to dashboard subscribers.
///
/// The wire names (`metrics:update`, `log:new`, ...) are the SSE event
/// names; payloads are the serialized inner values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum DashboardEvent {
    #[serde(rename = "metrics:update")]
    MetricsUpdate(MetricSnapshot),
    #[serde(rename = "log:new")]
    LogNew(LogEntry),
    #[serde(rename = "logs:update")]
    LogsUpdate(Vec<LogEntry>),
    #[serde(rename = "deployment:started")]
    DeploymentStarted(Deployment),
    #[serde(rename = "deployment:progress")]
    DeploymentProgress(StageProgress),
    #[serde(rename = "deployment:complete")]
    DeploymentComplete(DeployOutcome),
}

impl DashboardEvent {
    pub fn wire_name(&self) -> &'static str {
        match self {
            DashboardEvent::MetricsUpdate(_) => "metrics:update",
            DashboardEvent::LogNew(_) => "log:new",
            DashboardEvent::LogsUpdate(_) => "logs:update",
            DashboardEvent::DeploymentStarted(_) => "deployment:started",
            DashboardEvent::DeploymentProgress(_) => "deployment:progress",
            DashboardEvent::DeploymentComplete(_) => "deployment:complete",
        }
    }

    /// Serialize just the payload, as sent in the SSE `data:` field
    pub fn payload_json(&self) -> serde_json::Result<String> {
        match self {
            DashboardEvent::MetricsUpdate(m) => serde_json::to_string(m),
            DashboardEvent::LogNew(l) => serde_json::to_string(l),
            DashboardEvent::LogsUpdate(ls) => serde_json::to_string(ls),
            DashboardEvent::DeploymentStarted(d) => serde_json::to_string(d),
            DashboardEvent::DeploymentProgress(p) => serde_json::to_string(p),
            DashboardEvent::DeploymentComplete(o) => serde_json::to_string(o),
        }
    }

    /// Rebuild an event from its wire name and payload. Unknown names are
    /// skipped, not errors, so new server event types never break clients.
    pub fn from_wire(name: &str, data: &str) -> serde_json::Result<Option<Self>> {
        let event = match name {
            "metrics:update" => DashboardEvent::MetricsUpdate(serde_json::from_str(data)?),
            "log:new" => DashboardEvent::LogNew(serde_json::from_str(data)?),
            "logs:update" => DashboardEvent::LogsUpdate(serde_json::from_str(data)?),
            "deployment:started" => DashboardEvent::DeploymentStarted(serde_json::from_str(data)?),
            "deployment:progress" => {
                DashboardEvent::DeploymentProgress(serde_json::from_str(data)?)
            }
            "deployment:complete" => {
                DashboardEvent::DeploymentComplete(serde_json::from_str(data)?)
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}
