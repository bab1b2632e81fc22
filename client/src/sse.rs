// Event subscriber
//
// Consumes the server's SSE stream and hands decoded events to the
// application over an mpsc channel. When the stream cannot be opened
// the subscriber degrades to polling the REST endpoints, synthesizing
// `metrics:update` and `logs:update` events, and keeps retrying the
// stream in the background.

use crate::DashboardClient;
use futures_util::StreamExt;
use pulseboard_core::model::DashboardEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

const EVENT_BUFFER: usize = 64;

#[derive(Clone, Debug)]
pub struct SubscriberConfig {
    /// REST polling cadence while the stream is down
    pub poll_interval: Duration,
    /// How long to stay in polling mode before retrying the stream
    pub retry_interval: Duration,
    /// Log page size requested while polling
    pub poll_log_limit: usize,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            retry_interval: Duration::from_secs(15),
            poll_log_limit: 100,
        }
    }
}

pub struct EventSubscriber {
    client: DashboardClient,
    config: SubscriberConfig,
}

/// Running subscriber: an event receiver plus the background task.
/// Dropping the receiver stops the task at its next send.
pub struct SubscriberHandle {
    pub events: mpsc::Receiver<DashboardEvent>,
    task: JoinHandle<()>,
}

impl SubscriberHandle {
    pub async fn recv(&mut self) -> Option<DashboardEvent> {
        self.events.recv().await
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

impl EventSubscriber {
    pub fn new(client: DashboardClient, config: SubscriberConfig) -> Self {
        Self { client, config }
    }

    pub fn start(self) -> SubscriberHandle {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let task = tokio::spawn(self.run(tx));
        SubscriberHandle { events: rx, task }
    }

    async fn run(self, tx: mpsc::Sender<DashboardEvent>) {
        loop {
            match self.pump_stream(&tx).await {
                Ok(()) => {
                    if tx.is_closed() {
                        return;
                    }
                    info!(target: "client", "Event stream closed by server; reconnecting");
                }
                Err(e) => {
                    warn!(target: "client", error = %e, "Event stream unavailable; polling");
                }
            }

            // Polling fallback until the next connect attempt
            let deadline = Instant::now() + self.config.retry_interval;
            while Instant::now() < deadline {
                if tx.is_closed() {
                    return;
                }
                self.poll_once(&tx).await;
                sleep(self.config.poll_interval).await;
            }
        }
    }

    /// Read the SSE stream until it ends or errors, forwarding every
    /// decodable event
    async fn pump_stream(
        &self,
        tx: &mpsc::Sender<DashboardEvent>,
    ) -> Result<(), crate::ClientError> {
        let response = self
            .client
            .http
            .get(format!("{}/api/events/stream", self.client.base_url))
            .send()
            .await?
            .error_for_status()?;
        info!(target: "client", "Event stream connected");

        let mut parser = FrameParser::default();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for (name, data) in parser.push(&String::from_utf8_lossy(&chunk)) {
                match DashboardEvent::from_wire(&name, &data) {
                    Ok(Some(event)) => {
                        if tx.send(event).await.is_err() {
                            return Ok(());
                        }
                    }
                    Ok(None) => debug!(target: "client", event = %name, "Ignoring unknown event"),
                    Err(e) => {
                        warn!(target: "client", event = %name, error = %e, "Bad event payload")
                    }
                }
            }
        }
        Ok(())
    }

    /// One polling round: current metrics plus the recent log page,
    /// synthesized as stream events
    async fn poll_once(&self, tx: &mpsc::Sender<DashboardEvent>) {
        match self.client.fetch_metrics().await {
            Ok(snapshot) => {
                let _ = tx.send(DashboardEvent::MetricsUpdate(snapshot)).await;
            }
            Err(e) => debug!(target: "client", error = %e, "Metrics poll failed"),
        }
        match self
            .client
            .fetch_logs(None, Some(self.config.poll_log_limit))
            .await
        {
            Ok(entries) => {
                let _ = tx.send(DashboardEvent::LogsUpdate(entries)).await;
            }
            Err(e) => debug!(target: "client", error = %e, "Logs poll failed"),
        }
    }
}

/// Incremental parser for SSE frames. Chunks may split frames, lines,
/// even UTF-8 sequences already handled upstream; frames end at a blank
/// line. Comment lines (keep-alives) and unknown fields are dropped.
#[derive(Default)]
struct FrameParser {
    buffer: String,
    event: Option<String>,
    data: Vec<String>,
}

impl FrameParser {
    /// Feed a chunk, returning every (event, data) pair it completed
    fn push(&mut self, chunk: &str) -> Vec<(String, String)> {
        self.buffer.push_str(chunk);
        let mut frames = Vec::new();

        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(name) = self.event.take() {
                    if !self.data.is_empty() {
                        frames.push((name, self.data.join("\n")));
                    }
                }
                self.data.clear();
            } else if let Some(value) = line.strip_prefix("event:") {
                self.event = Some(value.trim_start_matches(' ').to_string());
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data.push(value.trim_start_matches(' ').to_string());
            }
            // ":" comments and other fields ("id:", "retry:") fall through
        }

        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_complete_frame() {
        let mut parser = FrameParser::default();
        let frames = parser.push("event: log:new\ndata: {\"x\":1}\n\n");
        assert_eq!(frames, vec![("log:new".to_string(), "{\"x\":1}".to_string())]);
    }

    #[test]
    fn reassembles_frames_split_across_chunks() {
        let mut parser = FrameParser::default();
        assert!(parser.push("event: metrics:upd").is_empty());
        assert!(parser.push("ate\ndata: {}").is_empty());
        let frames = parser.push("\n\n");
        assert_eq!(frames, vec![("metrics:update".to_string(), "{}".to_string())]);
    }

    #[test]
    fn handles_multiple_frames_in_one_chunk() {
        let mut parser = FrameParser::default();
        let frames = parser.push("event: a\ndata: 1\n\nevent: b\ndata: 2\n\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].0, "a");
        assert_eq!(frames[1].1, "2");
    }

    #[test]
    fn skips_keepalive_comments() {
        let mut parser = FrameParser::default();
        assert!(parser.push(": keep-alive\n\n").is_empty());
        let frames = parser.push(": ping\nevent: a\ndata: 1\n\n");
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn joins_multiline_data() {
        let mut parser = FrameParser::default();
        let frames = parser.push("event: a\ndata: line1\ndata: line2\n\n");
        assert_eq!(frames[0].1, "line1\nline2");
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let mut parser = FrameParser::default();
        let frames = parser.push("event: a\r\ndata: 1\r\n\r\n");
        assert_eq!(frames, vec![("a".to_string(), "1".to_string())]);
    }
}
