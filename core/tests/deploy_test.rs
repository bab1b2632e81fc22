//! Deployment lifecycle tests: linear status transitions, strict stage
//! ordering, forced outcomes via the seeded entropy ratio, and
//! independent concurrent runs.

use pulseboard_core::deploy::{DeployConfig, DeployDriver};
use pulseboard_core::entropy::Entropy;
use pulseboard_core::hub::{EventHub, DASHBOARD_CHANNEL};
use pulseboard_core::model::{DashboardEvent, DeployStage, DeployStatus};
use pulseboard_core::source::StateSource;
use pulseboard_core::store::{MemoryStore, Store};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

fn fast_config(success_ratio: f64) -> DeployConfig {
    DeployConfig {
        default_branch: "main".to_string(),
        success_ratio,
        stage_durations: [
            Duration::from_millis(5),
            Duration::from_millis(5),
            Duration::from_millis(5),
        ],
    }
}

fn build(
    store: Arc<dyn Store>,
    config: DeployConfig,
) -> (Arc<EventHub>, Arc<StateSource>, DeployDriver) {
    let entropy = Arc::new(Entropy::seeded(23));
    let hub = Arc::new(EventHub::new(256));
    let source = Arc::new(StateSource::new(store, Arc::clone(&entropy)));
    let driver = DeployDriver::new(Arc::clone(&hub), Arc::clone(&source), entropy, config);
    (hub, source, driver)
}

/// Drain events for one deployment id until its completion event arrives
async fn collect_run(
    sub: &mut pulseboard_core::hub::Subscription,
    id: &str,
) -> (Vec<DeployStage>, DeployStatus) {
    let mut stages = Vec::new();
    loop {
        let event = timeout(Duration::from_secs(2), sub.recv())
            .await
            .expect("deployment run timed out")
            .expect("hub closed mid-run");
        match event {
            DashboardEvent::DeploymentProgress(p) if p.id == id => stages.push(p.stage),
            DashboardEvent::DeploymentComplete(o) if o.id == id => return (stages, o.status),
            _ => {}
        }
    }
}

#[tokio::test]
async fn trigger_returns_pending_with_generated_tokens() {
    let (_hub, _source, driver) = build(MemoryStore::new(), fast_config(1.0));

    let deployment = driver.trigger(Some("release/v2".to_string())).await;
    assert_eq!(deployment.branch, "release/v2");
    assert_eq!(deployment.status, DeployStatus::Pending);
    assert_eq!(deployment.id.len(), 7);
    assert!(deployment
        .id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    assert_eq!(deployment.commit.len(), 7);
    assert!(deployment.summary.contains("release/v2"));
}

#[tokio::test]
async fn missing_branch_uses_configured_default() {
    let (_hub, _source, driver) = build(MemoryStore::new(), fast_config(1.0));
    let deployment = driver.trigger(None).await;
    assert_eq!(deployment.branch, "main");

    let deployment = driver.trigger(Some(String::new())).await;
    assert_eq!(deployment.branch, "main");
}

#[tokio::test]
async fn stages_run_in_order_then_exactly_one_completion() {
    let (hub, _source, driver) = build(MemoryStore::new(), fast_config(1.0));
    let mut sub = hub.subscribe(DASHBOARD_CHANNEL);

    let deployment = driver.trigger(None).await;
    let (stages, status) = collect_run(&mut sub, &deployment.id).await;

    assert_eq!(
        stages,
        vec![
            DeployStage::Building,
            DeployStage::Testing,
            DeployStage::Deploying
        ],
        "no stage skipped, repeated or reordered"
    );
    assert_eq!(status, DeployStatus::Success);

    // Nothing further for this id after completion
    tokio::time::sleep(Duration::from_millis(30)).await;
    while let Some(event) = sub.try_recv() {
        match event {
            DashboardEvent::DeploymentProgress(p) => assert_ne!(p.id, deployment.id),
            DashboardEvent::DeploymentComplete(o) => assert_ne!(o.id, deployment.id),
            _ => {}
        }
    }
}

#[tokio::test]
async fn ratio_zero_forces_failure_and_error_log() {
    let store = MemoryStore::new();
    let (hub, _source, driver) = build(Arc::clone(&store) as Arc<dyn Store>, fast_config(0.0));
    let mut sub = hub.subscribe(DASHBOARD_CHANNEL);

    let deployment = driver.trigger(None).await;
    let (_stages, status) = collect_run(&mut sub, &deployment.id).await;
    assert_eq!(status, DeployStatus::Failed);

    // Terminal state persisted once, with the failure summary
    let recent = store.recent_deployments(20).await.unwrap();
    let record = recent.iter().find(|d| d.id == deployment.id).unwrap();
    assert_eq!(record.status, DeployStatus::Failed);
    assert!(record.summary.contains("failed"));

    // Final log entry is error-level, through the shared log path
    let logs = store
        .recent_logs(
            pulseboard_core::model::LogFilter::Level(pulseboard_core::model::LogLevel::Error),
            100,
        )
        .await
        .unwrap();
    assert!(!logs.is_empty());
    assert!(logs.iter().any(|l| l.service == "deployment-service"));
}

#[tokio::test]
async fn status_transitions_exactly_once() {
    let store = MemoryStore::new();
    let (hub, _source, driver) = build(Arc::clone(&store) as Arc<dyn Store>, fast_config(1.0));
    let mut sub = hub.subscribe(DASHBOARD_CHANNEL);

    let deployment = driver.trigger(None).await;

    // Pending immediately after creation
    let recent = store.recent_deployments(20).await.unwrap();
    assert_eq!(recent[0].status, DeployStatus::Pending);

    let (_stages, status) = collect_run(&mut sub, &deployment.id).await;
    assert_eq!(status, DeployStatus::Success);

    let recent = store.recent_deployments(20).await.unwrap();
    assert_eq!(recent[0].status, DeployStatus::Success);

    // The store refuses any further transition
    let again = store
        .finish_deployment(&deployment.id, DeployStatus::Failed, "late")
        .await;
    assert!(again.is_err());
}

#[tokio::test]
async fn concurrent_runs_interleave_but_stay_individually_ordered() {
    let (hub, _source, driver) = build(MemoryStore::new(), fast_config(1.0));
    let mut sub = hub.subscribe(DASHBOARD_CHANNEL);

    let first = driver.trigger(Some("feature/a".to_string())).await;
    let second = driver.trigger(Some("feature/b".to_string())).await;
    assert_ne!(first.id, second.id);

    // Collect both streams from the shared channel
    let mut stages_first = Vec::new();
    let mut stages_second = Vec::new();
    let mut done = 0;
    while done < 2 {
        let event = timeout(Duration::from_secs(2), sub.recv())
            .await
            .expect("runs timed out")
            .expect("hub closed");
        match event {
            DashboardEvent::DeploymentProgress(p) => {
                if p.id == first.id {
                    stages_first.push(p.stage);
                } else if p.id == second.id {
                    stages_second.push(p.stage);
                }
            }
            DashboardEvent::DeploymentComplete(_) => done += 1,
            _ => {}
        }
    }

    let expected = vec![
        DeployStage::Building,
        DeployStage::Testing,
        DeployStage::Deploying,
    ];
    assert_eq!(stages_first, expected);
    assert_eq!(stages_second, expected);
}
