use std::net::SocketAddr;
use std::path::PathBuf;

use broadcast::OfferBus;
use metrics::MetricsHandle;

#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Address the HTTP/WebSocket listener binds to.
    pub bind_address: SocketAddr,
    /// Directory holding the pre-built front-end.
    pub static_dir: PathBuf,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: ([0, 0, 0, 0], 3000).into(),
            static_dir: PathBuf::from("public"),
        }
    }
}

/// Shared state behind every handler.
pub struct AppState {
    pub bus: OfferBus,
    pub metrics: MetricsHandle,
    pub config: WebConfig,
}
