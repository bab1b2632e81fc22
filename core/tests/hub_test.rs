//! Event hub tests: fan-out, FIFO per subscriber, silent discard with no
//! subscribers, detach-on-drop, shutdown semantics.

use chrono::Utc;
use pulseboard_core::hub::{EventHub, DASHBOARD_CHANNEL};
use pulseboard_core::model::{DashboardEvent, LogEntry, LogLevel, MetricSnapshot};
use tokio::time::{sleep, Duration};

fn metrics_event(id: &str) -> DashboardEvent {
    DashboardEvent::MetricsUpdate(MetricSnapshot {
        id: id.to_string(),
        cpu: 68,
        memory: 83,
        latency: 45,
        cost: 91.4,
        timestamp: Utc::now(),
    })
}

fn log_event(id: &str) -> DashboardEvent {
    DashboardEvent::LogNew(LogEntry {
        id: id.to_string(),
        level: LogLevel::Info,
        message: "Request processed successfully".to_string(),
        service: "api-gateway".to_string(),
        timestamp: Utc::now(),
    })
}

#[tokio::test]
async fn publish_without_subscribers_discards_silently() {
    let hub = EventHub::new(16);

    let delivered = hub.publish(DASHBOARD_CHANNEL, metrics_event("m1"));
    assert_eq!(delivered, 0);

    let stats = hub.stats(DASHBOARD_CHANNEL).expect("stats recorded");
    assert_eq!(stats.published, 1);
    assert_eq!(stats.discarded, 1);
}

#[tokio::test]
async fn publish_fans_out_to_all_subscribers() {
    let hub = EventHub::new(16);

    let mut sub1 = hub.subscribe(DASHBOARD_CHANNEL);
    let mut sub2 = hub.subscribe(DASHBOARD_CHANNEL);
    let mut sub3 = hub.subscribe(DASHBOARD_CHANNEL);

    let delivered = hub.publish(DASHBOARD_CHANNEL, log_event("l1"));
    assert_eq!(delivered, 3);

    for sub in [&mut sub1, &mut sub2, &mut sub3] {
        match sub.try_recv() {
            Some(DashboardEvent::LogNew(entry)) => assert_eq!(entry.id, "l1"),
            other => panic!("expected log event, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn delivery_is_fifo_per_subscriber() {
    let hub = EventHub::new(64);
    let mut sub = hub.subscribe(DASHBOARD_CHANNEL);

    for i in 0..10 {
        hub.publish(DASHBOARD_CHANNEL, log_event(&format!("l{i}")));
    }

    for i in 0..10 {
        match sub.recv().await {
            Some(DashboardEvent::LogNew(entry)) => assert_eq!(entry.id, format!("l{i}")),
            other => panic!("expected log event, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn channels_are_isolated() {
    let hub = EventHub::new(16);

    let mut dashboard = hub.subscribe(DASHBOARD_CHANNEL);
    let mut other = hub.subscribe("ops");

    hub.publish(DASHBOARD_CHANNEL, metrics_event("m1"));

    assert!(dashboard.try_recv().is_some());
    assert!(other.try_recv().is_none());
}

#[tokio::test]
async fn dropping_subscription_detaches() {
    let hub = EventHub::new(16);

    let sub1 = hub.subscribe(DASHBOARD_CHANNEL);
    let sub2 = hub.subscribe(DASHBOARD_CHANNEL);
    assert_eq!(hub.subscriber_count(DASHBOARD_CHANNEL), 2);

    drop(sub1);
    sleep(Duration::from_millis(10)).await;
    assert_eq!(hub.subscriber_count(DASHBOARD_CHANNEL), 1);

    drop(sub2);
    sleep(Duration::from_millis(10)).await;
    assert_eq!(hub.subscriber_count(DASHBOARD_CHANNEL), 0);
}

#[tokio::test]
async fn absent_subscriber_misses_events() {
    let hub = EventHub::new(16);

    hub.publish(DASHBOARD_CHANNEL, metrics_event("before"));

    // A subscriber attached after the publish never sees it: no replay.
    let mut sub = hub.subscribe(DASHBOARD_CHANNEL);
    assert!(sub.try_recv().is_none());

    hub.publish(DASHBOARD_CHANNEL, metrics_event("after"));
    match sub.try_recv() {
        Some(DashboardEvent::MetricsUpdate(snapshot)) => assert_eq!(snapshot.id, "after"),
        other => panic!("expected metrics event, got {other:?}"),
    }
}

#[tokio::test]
async fn shutdown_ends_subscriptions() {
    let hub = EventHub::new(16);
    let mut sub = hub.subscribe(DASHBOARD_CHANNEL);

    hub.shutdown();

    assert!(sub.recv().await.is_none());
}
