// Server configuration

use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// RocksDB data directory; unset means the in-memory store
    pub data_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            data_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("PULSE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PULSE_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            data_dir: std::env::var("PULSE_DATA_DIR").ok().map(PathBuf::from),
        }
    }
}
