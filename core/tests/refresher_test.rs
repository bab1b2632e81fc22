//! Refresher tests: periodic metric broadcasts, probabilistic log
//! synthesis, and the serialized-tick policy.

use async_trait::async_trait;
use pulseboard_core::config::CoreConfig;
use pulseboard_core::entropy::Entropy;
use pulseboard_core::hub::{EventHub, DASHBOARD_CHANNEL};
use pulseboard_core::model::{
    DashboardEvent, Deployment, DeployStatus, Insight, LogEntry, LogFilter, MetricSnapshot,
    ServiceHealth, Settings, UptimePoint,
};
use pulseboard_core::refresher::Refresher;
use pulseboard_core::source::StateSource;
use pulseboard_core::store::{MemoryStore, Store, StoreResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn test_config(interval_ms: u64, log_chance: f64) -> CoreConfig {
    CoreConfig {
        refresh_interval: Duration::from_millis(interval_ms),
        log_chance,
        ..CoreConfig::default()
    }
}

fn build(
    store: Arc<dyn Store>,
    config: &CoreConfig,
) -> (Arc<EventHub>, Arc<StateSource>, Refresher) {
    let entropy = Arc::new(Entropy::seeded(17));
    let hub = Arc::new(EventHub::new(config.channel_capacity));
    let source = Arc::new(StateSource::new(store, Arc::clone(&entropy)));
    let refresher = Refresher::new(Arc::clone(&hub), Arc::clone(&source), entropy, config);
    (hub, source, refresher)
}

#[tokio::test]
async fn every_tick_publishes_metrics() {
    let config = test_config(20, 0.0);
    let (hub, _source, refresher) = build(MemoryStore::new(), &config);

    let mut sub = hub.subscribe(DASHBOARD_CHANNEL);
    let handle = refresher.start();

    sleep(Duration::from_millis(110)).await;
    handle.stop().await;

    let mut metric_events = 0;
    while let Some(event) = sub.try_recv() {
        match event {
            DashboardEvent::MetricsUpdate(snapshot) => {
                assert!((58..=88).contains(&snapshot.cpu));
                metric_events += 1;
            }
            other => panic!("unexpected event with log_chance 0: {other:?}"),
        }
    }
    assert!(metric_events >= 3, "expected several ticks, got {metric_events}");
}

#[tokio::test]
async fn log_chance_one_appends_and_broadcasts_a_log_every_tick() {
    let config = test_config(20, 1.0);
    let store = MemoryStore::new();
    let (hub, _source, refresher) = build(Arc::clone(&store) as Arc<dyn Store>, &config);

    let mut sub = hub.subscribe(DASHBOARD_CHANNEL);
    let handle = refresher.start();

    sleep(Duration::from_millis(110)).await;
    handle.stop().await;

    let mut metric_events = 0;
    let mut log_events = 0;
    while let Some(event) = sub.try_recv() {
        match event {
            DashboardEvent::MetricsUpdate(_) => metric_events += 1,
            DashboardEvent::LogNew(_) => log_events += 1,
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert!(metric_events >= 3);
    assert_eq!(metric_events, log_events, "one synthesized log per tick");

    // Best-effort persistence really happened
    let stored = store.recent_logs(LogFilter::All, 100).await.unwrap();
    assert_eq!(stored.len(), log_events);
}

/// Store whose metric reads take much longer than the tick interval
struct SlowStore {
    delay: Duration,
}

#[async_trait]
impl Store for SlowStore {
    async fn latest_metrics(&self) -> StoreResult<Option<MetricSnapshot>> {
        sleep(self.delay).await;
        Ok(None)
    }
    async fn put_metrics(&self, _: &MetricSnapshot) -> StoreResult<()> {
        Ok(())
    }
    async fn recent_logs(&self, _: LogFilter, _: usize) -> StoreResult<Vec<LogEntry>> {
        Ok(Vec::new())
    }
    async fn append_log(&self, _: &LogEntry) -> StoreResult<()> {
        Ok(())
    }
    async fn recent_deployments(&self, _: usize) -> StoreResult<Vec<Deployment>> {
        Ok(Vec::new())
    }
    async fn create_deployment(&self, _: &Deployment) -> StoreResult<()> {
        Ok(())
    }
    async fn finish_deployment(
        &self,
        id: &str,
        _: DeployStatus,
        _: &str,
    ) -> StoreResult<Deployment> {
        Err(pulseboard_core::store::StoreError::DeploymentNotFound(
            id.to_string(),
        ))
    }
    async fn services(&self) -> StoreResult<Vec<ServiceHealth>> {
        Ok(Vec::new())
    }
    async fn put_service(&self, _: &ServiceHealth) -> StoreResult<()> {
        Ok(())
    }
    async fn service_uptime(&self, _: &str, _: usize) -> StoreResult<Vec<UptimePoint>> {
        Ok(Vec::new())
    }
    async fn append_uptime(&self, _: &UptimePoint) -> StoreResult<()> {
        Ok(())
    }
    async fn insight_for(&self, _: &str) -> StoreResult<Option<Insight>> {
        Ok(None)
    }
    async fn put_insight(&self, _: &Insight) -> StoreResult<()> {
        Ok(())
    }
    async fn settings(&self, _: &str) -> StoreResult<Option<Settings>> {
        Ok(None)
    }
    async fn put_settings(&self, _: &Settings) -> StoreResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn slow_ticks_are_serialized_not_overlapped() {
    // Tick work (50ms) far exceeds the interval (10ms). With serialized
    // ticks the publish rate is bounded by the work duration, not the
    // interval: ~5 events in 300ms. Overlapping ticks would produce ~30.
    let config = test_config(10, 0.0);
    let store: Arc<dyn Store> = Arc::new(SlowStore {
        delay: Duration::from_millis(50),
    });
    let (hub, _source, refresher) = build(store, &config);

    let mut sub = hub.subscribe(DASHBOARD_CHANNEL);
    let handle = refresher.start();

    sleep(Duration::from_millis(300)).await;
    handle.stop().await;

    let mut events = 0;
    while sub.try_recv().is_some() {
        events += 1;
    }
    assert!(events >= 2, "refresher made no progress: {events}");
    assert!(
        events <= 10,
        "ticks overlapped: {events} events in 300ms at 50ms work each"
    );
}

#[tokio::test]
async fn stop_halts_the_loop() {
    let config = test_config(20, 0.0);
    let (hub, _source, refresher) = build(MemoryStore::new(), &config);

    let mut sub = hub.subscribe(DASHBOARD_CHANNEL);
    let handle = refresher.start();
    sleep(Duration::from_millis(50)).await;
    handle.stop().await;

    while sub.try_recv().is_some() {}
    sleep(Duration::from_millis(60)).await;
    assert!(sub.try_recv().is_none(), "events kept arriving after stop");
}
