// Event hub implementation
//
// One hub per process, constructed at startup and handed by Arc to every
// publisher and subscriber. Each named channel is a tokio broadcast ring:
// publish is fire-and-forget, delivery to a single subscriber is FIFO per
// channel, and a lagged or absent subscriber simply misses events. There
// are no per-subscriber queues and no replay.

use crate::model::DashboardEvent;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// The single broadcast group every dashboard client joins
pub const DASHBOARD_CHANNEL: &str = "dashboard";

/// Per-channel counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HubStats {
    pub published: u64,
    /// Publishes that found zero subscribers
    pub discarded: u64,
    pub subscribers: usize,
}

pub struct EventHub {
    // Channel name -> broadcast sender
    channels: DashMap<String, broadcast::Sender<DashboardEvent>>,
    stats: DashMap<String, HubStats>,
    capacity: usize,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            stats: DashMap::new(),
            capacity,
        }
    }

    pub fn start(&self) {
        info!(target: "hub", "Event hub started");
    }

    /// Drop every channel sender; outstanding subscriptions see end-of-stream.
    pub fn shutdown(&self) {
        info!(target: "hub", "Event hub shutting down");
        self.channels.clear();
    }

    /// Publish an event to every subscriber currently attached to `channel`.
    ///
    /// Never blocks and never reports individual delivery outcomes; the
    /// return value is the number of live receivers at send time. Publishing
    /// to a channel with no subscribers silently discards the event.
    pub fn publish(&self, channel: &str, event: DashboardEvent) -> usize {
        debug!(
            target: "hub",
            channel = %channel,
            event = %event.wire_name(),
            "Publishing event"
        );

        let sender = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone();

        match sender.send(event) {
            Ok(receivers) => {
                self.update_stats(channel, |stats| {
                    stats.published += 1;
                    stats.subscribers = receivers;
                });
                receivers
            }
            Err(_) => {
                self.update_stats(channel, |stats| {
                    stats.published += 1;
                    stats.discarded += 1;
                    stats.subscribers = 0;
                });
                0
            }
        }
    }

    /// Attach a new subscriber to `channel`. Dropping the returned handle
    /// detaches it; nothing else is held per subscriber.
    pub fn subscribe(&self, channel: &str) -> Subscription {
        let rx = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        info!(target: "hub", channel = %channel, "Subscriber attached");
        Subscription {
            channel: channel.to_string(),
            rx,
        }
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    pub fn stats(&self, channel: &str) -> Option<HubStats> {
        self.stats.get(channel).map(|s| s.clone())
    }

    fn update_stats<F>(&self, channel: &str, f: F)
    where
        F: FnOnce(&mut HubStats),
    {
        let mut entry = self
            .stats
            .entry(channel.to_string())
            .or_insert_with(HubStats::default);
        f(entry.value_mut());
    }
}

/// Subscriber handle. Membership in the channel is the only state held;
/// dropping the handle is the unsubscribe.
pub struct Subscription {
    channel: String,
    rx: broadcast::Receiver<DashboardEvent>,
}

impl Subscription {
    /// Receive the next event. Returns `None` once the hub shuts down.
    /// A lag (ring overwritten faster than this subscriber reads) is logged
    /// and skipped: the missed events are simply gone, per the no-replay
    /// contract.
    pub async fn recv(&mut self) -> Option<DashboardEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(
                        target: "hub",
                        channel = %self.channel,
                        missed,
                        "Subscriber lagged; events dropped"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<DashboardEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Raw receiver, for wrapping in a `BroadcastStream`
    pub fn into_receiver(self) -> broadcast::Receiver<DashboardEvent> {
        self.rx
    }
}
