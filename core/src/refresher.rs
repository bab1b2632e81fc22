// Timer-driven refresher
//
// A single repeating task: every tick it publishes the latest metric
// snapshot to the dashboard channel, and with a fixed probability
// synthesizes one log entry, persists it best-effort, and fans it out.
//
// Tick policy: ticks are serialized. All tick work runs inline in this
// one task with MissedTickBehavior::Delay, so a tick whose work exceeds
// the interval delays the next tick instead of overlapping it.

use crate::config::CoreConfig;
use crate::entropy::Entropy;
use crate::hub::{EventHub, DASHBOARD_CHANNEL};
use crate::model::DashboardEvent;
use crate::source::StateSource;
use crate::synth;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

pub struct Refresher {
    hub: Arc<EventHub>,
    source: Arc<StateSource>,
    entropy: Arc<Entropy>,
    interval: Duration,
    log_chance: f64,
}

impl Refresher {
    pub fn new(
        hub: Arc<EventHub>,
        source: Arc<StateSource>,
        entropy: Arc<Entropy>,
        config: &CoreConfig,
    ) -> Self {
        Self {
            hub,
            source,
            entropy,
            interval: config.refresh_interval,
            log_chance: config.log_chance,
        }
    }

    /// Spawn the refresh loop. Runs until `RefresherHandle::stop` or
    /// process exit.
    pub fn start(self) -> RefresherHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        info!(
            target: "refresher",
            interval_ms = self.interval.as_millis() as u64,
            "Refresher started"
        );

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval fires immediately; consume that so the first
            // broadcast lands one full period after startup
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => self.run_tick().await,
                }
            }
            info!(target: "refresher", "Refresher stopped");
        });

        RefresherHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run_tick(&self) {
        let snapshot = self.source.latest_metrics().await;
        self.hub
            .publish(DASHBOARD_CHANNEL, DashboardEvent::MetricsUpdate(snapshot));

        if self.entropy.chance(self.log_chance) {
            let entry = synth::log_entry(&self.entropy);
            debug!(
                target: "refresher",
                level = entry.level.as_str(),
                service = %entry.service,
                "Synthesized log entry"
            );
            self.source.record_log(&entry).await;
            self.hub
                .publish(DASHBOARD_CHANNEL, DashboardEvent::LogNew(entry));
        }
    }
}

pub struct RefresherHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefresherHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}
