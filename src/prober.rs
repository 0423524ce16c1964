//! One-shot backend reachability check.

use serde::Serialize;
use tracing::{debug, warn};

use crate::backend::ChatBackend;

/// Reachability of the backend as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No probe has completed yet.
    #[default]
    Unknown,
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    /// Text for the status indicator.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Unknown => "Checking...",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Disconnected => "Disconnected",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Hit the health endpoint exactly once. Never retries and never errors:
/// every failure maps to [`ConnectionStatus::Disconnected`].
pub async fn probe<B: ChatBackend>(backend: &B) -> ConnectionStatus {
    match backend.health().await {
        Ok(()) => {
            debug!("health probe succeeded");
            ConnectionStatus::Connected
        }
        Err(e) => {
            warn!(error = %e, network = e.is_network(), "health probe failed");
            ConnectionStatus::Disconnected
        }
    }
}
