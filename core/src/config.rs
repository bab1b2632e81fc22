// Runtime configuration
//
// Defaults first, env vars on top. All knobs use the PULSE_ prefix.

use crate::deploy::DeployConfig;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct CoreConfig {
    /// Refresher tick interval
    pub refresh_interval: Duration,
    /// Probability of synthesizing a log entry on a refresher tick
    pub log_chance: f64,
    /// Broadcast ring capacity per hub channel
    pub channel_capacity: usize,
    pub deploy: DeployConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(5),
            log_chance: 0.3,
            channel_capacity: 256,
            deploy: DeployConfig::default(),
        }
    }
}

impl CoreConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            refresh_interval: std::env::var("PULSE_REFRESH_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.refresh_interval),
            log_chance: std::env::var("PULSE_LOG_CHANCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.log_chance),
            channel_capacity: std::env::var("PULSE_CHANNEL_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.channel_capacity),
            deploy: DeployConfig::from_env(),
        }
    }
}
