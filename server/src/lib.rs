// Pulseboard Server Library
// HTTP API and SSE event stream over the core runtime.

pub mod api;
pub mod config;

pub use api::{router, ApiServer, AppState};
pub use config::ServerConfig;
