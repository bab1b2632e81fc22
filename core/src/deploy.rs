// Deployment lifecycle driver
//
// Walks a deployment through the fixed stage sequence with simulated
// durations, publishing progress on the dashboard channel and emitting
// log entries through the same path as the refresher. Concurrent runs
// are independent; within one run the stage events are strictly ordered
// by sequential awaits, and the completion event always comes last.
// There are no retries and no cancellation.

use crate::entropy::Entropy;
use crate::hub::{EventHub, DASHBOARD_CHANNEL};
use crate::model::{
    DashboardEvent, Deployment, DeployOutcome, DeployStage, DeployStatus, LogEntry, LogLevel,
    StageProgress,
};
use crate::source::StateSource;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const STAGES: [(DeployStage, &str); 3] = [
    (DeployStage::Building, "Building application..."),
    (DeployStage::Testing, "Running tests..."),
    (DeployStage::Deploying, "Deploying to production..."),
];

const SUCCESS_SUMMARY: &str = "Deployment completed successfully";
const FAILURE_SUMMARY: &str = "Deployment failed - check logs";
const LOG_SERVICE: &str = "deployment-service";

#[derive(Clone, Debug)]
pub struct DeployConfig {
    pub default_branch: String,
    /// Probability of a run ending in `Success`. Canonical contract: 0.8.
    pub success_ratio: f64,
    /// Simulated duration of building, testing and deploying
    pub stage_durations: [Duration; 3],
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            default_branch: "main".to_string(),
            success_ratio: 0.8,
            stage_durations: [
                Duration::from_secs(2),
                Duration::from_secs(3),
                Duration::from_secs(2),
            ],
        }
    }
}

impl DeployConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_branch: std::env::var("PULSE_DEPLOY_BRANCH")
                .unwrap_or(defaults.default_branch),
            success_ratio: std::env::var("PULSE_DEPLOY_SUCCESS_RATIO")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.success_ratio),
            stage_durations: defaults.stage_durations,
        }
    }
}

pub struct DeployDriver {
    hub: Arc<EventHub>,
    source: Arc<StateSource>,
    entropy: Arc<Entropy>,
    config: DeployConfig,
}

impl DeployDriver {
    pub fn new(
        hub: Arc<EventHub>,
        source: Arc<StateSource>,
        entropy: Arc<Entropy>,
        config: DeployConfig,
    ) -> Self {
        Self {
            hub,
            source,
            entropy,
            config,
        }
    }

    /// Create a `Pending` deployment, announce it, and spawn the staged
    /// run. Returns immediately with the pending record; completion
    /// arrives on the event channel.
    pub async fn trigger(&self, branch: Option<String>) -> Deployment {
        let branch = branch
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| self.config.default_branch.clone());

        let deployment = Deployment {
            id: self.entropy.token(7),
            commit: self.entropy.token(7),
            summary: format!("Deployment triggered from {branch} branch"),
            branch,
            status: DeployStatus::Pending,
            created_at: Utc::now(),
        };

        info!(
            target: "deploy",
            deployment = %deployment.id,
            branch = %deployment.branch,
            "Deployment triggered"
        );

        self.source.open_deployment(&deployment).await;
        self.hub.publish(
            DASHBOARD_CHANNEL,
            DashboardEvent::DeploymentStarted(deployment.clone()),
        );

        let hub = Arc::clone(&self.hub);
        let source = Arc::clone(&self.source);
        let entropy = Arc::clone(&self.entropy);
        let config = self.config.clone();
        let id = deployment.id.clone();
        tokio::spawn(async move {
            run_stages(hub, source, entropy, config, id).await;
        });

        deployment
    }
}

async fn run_stages(
    hub: Arc<EventHub>,
    source: Arc<StateSource>,
    entropy: Arc<Entropy>,
    config: DeployConfig,
    id: String,
) {
    for ((stage, message), duration) in STAGES.iter().zip(config.stage_durations) {
        // Non-blocking sleep: other deployments, refresher ticks and
        // subscriber churn keep running underneath.
        tokio::time::sleep(duration).await;

        hub.publish(
            DASHBOARD_CHANNEL,
            DashboardEvent::DeploymentProgress(StageProgress {
                id: id.clone(),
                stage: *stage,
                message: (*message).to_string(),
            }),
        );

        emit_log(&hub, &source, &entropy, LogLevel::Info, message).await;
    }

    let success = entropy.chance(config.success_ratio);
    let (status, summary) = if success {
        (DeployStatus::Success, SUCCESS_SUMMARY)
    } else {
        (DeployStatus::Failed, FAILURE_SUMMARY)
    };

    info!(
        target: "deploy",
        deployment = %id,
        status = if success { "success" } else { "failed" },
        "Deployment finished"
    );

    source.close_deployment(&id, status, summary).await;
    hub.publish(
        DASHBOARD_CHANNEL,
        DashboardEvent::DeploymentComplete(DeployOutcome {
            id: id.clone(),
            status,
            message: summary.to_string(),
        }),
    );

    let level = if success { LogLevel::Info } else { LogLevel::Error };
    emit_log(&hub, &source, &entropy, level, summary).await;
}

// Same publication path as the refresher's synthesized logs: persist
// best-effort, then fan out.
async fn emit_log(
    hub: &EventHub,
    source: &StateSource,
    entropy: &Entropy,
    level: LogLevel,
    message: &str,
) {
    let entry = LogEntry {
        id: entropy.token(7),
        level,
        message: message.to_string(),
        service: LOG_SERVICE.to_string(),
        timestamp: Utc::now(),
    };
    source.record_log(&entry).await;
    hub.publish(DASHBOARD_CHANNEL, DashboardEvent::LogNew(entry));
}
