//! Crate-level error type.

use thiserror::Error;

/// Errors produced by the backend client, configuration loading and the
/// dashboard server.
///
/// The chat dispatcher never propagates these to its caller; it converts them
/// into error-flagged assistant messages instead. See [`crate::session`].
#[derive(Debug, Error)]
pub enum AssistantError {
    /// The request never reached the server (DNS, refused connection, reset).
    #[error("connection failed to {url}: {detail}")]
    Connect { url: String, detail: String },

    /// The server replied with a non-2xx status code.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// The body could not be read or lacked the expected answer field.
    #[error("malformed response: {detail}")]
    Malformed { detail: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl AssistantError {
    /// True when the failure happened below HTTP, i.e. no response arrived.
    pub fn is_network(&self) -> bool {
        matches!(self, AssistantError::Connect { .. })
    }

    /// The HTTP status carried by an [`AssistantError::Http`], if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            AssistantError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
