//! Layered configuration: built-in defaults, then an optional TOML file, then
//! the `TEXTBOOK_API_URL` environment variable.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::AssistantError;

/// Environment variable that overrides the backend base URL.
pub const API_URL_ENV: &str = "TEXTBOOK_API_URL";

/// Backend base URL used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Session cookie set by the external auth service.
pub const DEFAULT_SESSION_COOKIE: &str = "ai-textbook.session_token";

/// Top-level configuration for the chat client and the dashboard server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Base URL of the question-answering backend (no trailing slash).
    pub api_url: String,
    /// TCP connect timeout. Unset means the transport default.
    pub connect_timeout_secs: Option<u64>,
    /// Whole-request timeout. Unset means the transport default.
    pub request_timeout_secs: Option<u64>,
    pub guard: GuardConfig,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            connect_timeout_secs: None,
            request_timeout_secs: None,
            guard: GuardConfig::default(),
        }
    }
}

/// Route tables and cookie name consumed by [`crate::guard::RouteGuard`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub cookie_name: String,
    /// Path prefixes that need a session.
    pub protected_routes: Vec<String>,
    /// Path prefixes only meant for signed-out visitors.
    pub auth_routes: Vec<String>,
    pub login_path: String,
    /// Where signed-in visitors are sent when they open an auth route.
    pub home_path: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
            protected_routes: vec!["/dashboard".into(), "/chat".into(), "/history".into()],
            auth_routes: vec!["/login".into(), "/signup".into()],
            login_path: "/login".to_string(),
            home_path: "/dashboard".to_string(),
        }
    }
}

impl AssistantConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, AssistantError> {
        let mut cfg: AssistantConfig = toml::from_str(s)?;
        cfg.normalize()?;
        Ok(cfg)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AssistantError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Resolve the effective configuration: defaults, then `path` if given,
    /// then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, AssistantError> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_env_override(std::env::var(API_URL_ENV).ok());
        cfg.normalize()?;
        Ok(cfg)
    }

    /// Apply an `API_URL_ENV` value. Empty values are ignored.
    pub fn apply_env_override(&mut self, value: Option<String>) {
        if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
    }

    /// Replace the base URL (e.g. from `--api-url`) and re-validate.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Result<Self, AssistantError> {
        self.api_url = url.into();
        self.normalize()?;
        Ok(self)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    fn normalize(&mut self) -> Result<(), AssistantError> {
        let trimmed = self.api_url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(AssistantError::Config(format!(
                "api_url must be an http(s) URL, got {:?}",
                self.api_url
            )));
        }
        self.api_url = trimmed.to_string();
        if self.guard.cookie_name.trim().is_empty() {
            return Err(AssistantError::Config("guard.cookie_name is empty".into()));
        }
        Ok(())
    }
}
