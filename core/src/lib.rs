// Pulseboard Core Library
// DevOps dashboard backend runtime: event hub, state source, refresher
// and deployment driver.

pub mod config;
pub mod deploy;
pub mod entropy;
pub mod hub;
pub mod model;
pub mod refresher;
pub mod source;
pub mod store;
pub mod synth;

// Export core types
pub use config::CoreConfig;
pub use deploy::{DeployConfig, DeployDriver};
pub use entropy::Entropy;
pub use hub::{EventHub, HubStats, Subscription, DASHBOARD_CHANNEL};
pub use model::{
    DashboardEvent, Deployment, DeployOutcome, DeployStage, DeployStatus, Insight, LogEntry,
    LogFilter, LogLevel, MetricSnapshot, ServiceHealth, ServiceStatus, Settings, SettingsPatch,
    StageProgress, UptimePoint,
};
pub use refresher::{Refresher, RefresherHandle};
pub use source::StateSource;
pub use store::{MemoryStore, RocksStore, Store, StoreError};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("event hub error: {0}")]
    HubError(String),

    #[error("store error: {0}")]
    StoreError(#[from] store::StoreError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;

use std::sync::Arc;

/// Core runtime: one hub, one state source, one deployment driver and
/// one refresher per process, wired together and handed out by Arc.
pub struct Pulseboard {
    pub hub: Arc<EventHub>,
    pub source: Arc<StateSource>,
    pub deployer: Arc<DeployDriver>,
    config: CoreConfig,
    entropy: Arc<Entropy>,
    refresher: Option<RefresherHandle>,
}

impl Pulseboard {
    pub fn new(config: CoreConfig, store: Arc<dyn Store>) -> Self {
        Self::with_entropy(config, store, Arc::new(Entropy::new()))
    }

    /// Construct with an injected entropy source, for deterministic tests
    pub fn with_entropy(config: CoreConfig, store: Arc<dyn Store>, entropy: Arc<Entropy>) -> Self {
        let hub = Arc::new(EventHub::new(config.channel_capacity));
        let source = Arc::new(StateSource::new(store, Arc::clone(&entropy)));
        let deployer = Arc::new(DeployDriver::new(
            Arc::clone(&hub),
            Arc::clone(&source),
            Arc::clone(&entropy),
            config.deploy.clone(),
        ));

        Self {
            hub,
            source,
            deployer,
            config,
            entropy,
            refresher: None,
        }
    }

    /// Start the hub and the background refresher
    pub fn start(&mut self) {
        tracing::info!(target: "core", "Starting Pulseboard...");

        self.hub.start();
        let refresher = Refresher::new(
            Arc::clone(&self.hub),
            Arc::clone(&self.source),
            Arc::clone(&self.entropy),
            &self.config,
        );
        self.refresher = Some(refresher.start());

        tracing::info!(target: "core", "Pulseboard started");
    }

    pub async fn shutdown(&mut self) {
        tracing::info!(target: "core", "Shutting down Pulseboard...");

        if let Some(refresher) = self.refresher.take() {
            refresher.stop().await;
        }
        self.hub.shutdown();

        tracing::info!(target: "core", "Pulseboard shut down");
    }
}
