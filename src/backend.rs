//! HTTP client for the question-answering backend.
//!
//! Two endpoints are consumed:
//! - `GET {base}/health`: any 2xx means the backend is reachable
//! - `POST {base}/chat`: `{ query, selected_text }` in, `{ response, source_documents }` out
//!
//! [`ChatBackend`] is the seam the session talks to, so tests and alternative
//! transports can stand in for [`HttpBackend`].

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AssistantConfig;
use crate::error::AssistantError;
use crate::message::SourceCitation;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Body of `POST /chat`. Both fields carry the raw user input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub query: String,
    pub selected_text: Option<String>,
}

/// Body returned by `POST /chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default, alias = "answer")]
    pub response: Option<String>,
    #[serde(default)]
    pub source_documents: Vec<SourceCitation>,
}

/// A successful, well-formed answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub answer: String,
    pub sources: Vec<SourceCitation>,
}

impl ChatResponse {
    /// Decode a raw body. A missing answer field is reported as
    /// [`AssistantError::Malformed`].
    pub fn parse(bytes: &[u8]) -> Result<ChatReply, AssistantError> {
        let parsed: ChatResponse =
            serde_json::from_slice(bytes).map_err(|e| AssistantError::Malformed {
                detail: e.to_string(),
            })?;
        let answer = parsed.response.ok_or_else(|| AssistantError::Malformed {
            detail: "missing field `response`".into(),
        })?;
        Ok(ChatReply {
            answer,
            sources: parsed.source_documents,
        })
    }
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// Transport used by [`crate::session::ChatSession`] and [`crate::prober`].
pub trait ChatBackend: Send + Sync {
    /// Probe the health endpoint once.
    fn health(&self) -> impl Future<Output = Result<(), AssistantError>> + Send;

    /// Send one chat query.
    fn chat(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<ChatReply, AssistantError>> + Send;
}

// ---------------------------------------------------------------------------
// HTTP implementation (reqwest)
// ---------------------------------------------------------------------------

pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Build a client for `config.api_url`, honouring the optional timeouts.
    pub fn new(config: &AssistantConfig) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = config.connect_timeout() {
            builder = builder.connect_timeout(t);
        }
        if let Some(t) = config.request_timeout() {
            builder = builder.timeout(t);
        }
        // Builder failure only happens when the TLS backend cannot initialise;
        // fall back to the default client instead of panicking.
        let client = builder.build().unwrap_or_default();
        Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl ChatBackend for HttpBackend {
    async fn health(&self) -> Result<(), AssistantError> {
        let url = self.endpoint("/health");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AssistantError::Connect {
                url: url.clone(),
                detail: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(AssistantError::Http {
                status: resp.status().as_u16(),
                url,
            });
        }
        Ok(())
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, AssistantError> {
        let url = self.endpoint("/chat");
        debug!(
            url = %url,
            query_len = request.query.len(),
            has_selection = request.selected_text.is_some(),
            "dispatching chat query"
        );
        let resp = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| AssistantError::Connect {
                url: url.clone(),
                detail: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(AssistantError::Http {
                status: resp.status().as_u16(),
                url,
            });
        }

        let bytes = resp.bytes().await.map_err(|e| AssistantError::Malformed {
            detail: e.to_string(),
        })?;
        ChatResponse::parse(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_null_selection() {
        let req = ChatRequest { query: "what is a tensor?".into(), selected_text: None };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"query":"what is a tensor?","selected_text":null}"#);
    }

    #[test]
    fn test_request_serializes_selection() {
        let req = ChatRequest {
            query: "".into(),
            selected_text: Some("gradient descent".into()),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""selected_text":"gradient descent""#));
    }

    #[test]
    fn test_parse_full_response() {
        let body = br#"{"response":"An answer","source_documents":[{"title":"Ch 1","url":"/docs/ch1","excerpt":"..."}]}"#;
        let reply = ChatResponse::parse(body).expect("parse");
        assert_eq!(reply.answer, "An answer");
        assert_eq!(reply.sources.len(), 1);
        assert_eq!(reply.sources[0].title, "Ch 1");
    }

    #[test]
    fn test_parse_without_sources() {
        let reply = ChatResponse::parse(br#"{"response":"ok"}"#).expect("parse");
        assert!(reply.sources.is_empty());
    }

    #[test]
    fn test_parse_answer_alias() {
        let reply = ChatResponse::parse(br#"{"answer":"aliased"}"#).expect("parse");
        assert_eq!(reply.answer, "aliased");
    }

    #[test]
    fn test_parse_missing_answer_is_malformed() {
        let err = ChatResponse::parse(br#"{"source_documents":[]}"#).unwrap_err();
        assert!(matches!(err, AssistantError::Malformed { .. }));
    }

    #[test]
    fn test_parse_non_json_is_malformed() {
        let err = ChatResponse::parse(b"<html>oops</html>").unwrap_err();
        assert!(matches!(err, AssistantError::Malformed { .. }));
    }

    #[test]
    fn test_http_backend_strips_trailing_slash() {
        let cfg = AssistantConfig { api_url: "http://localhost:8000/".into(), ..Default::default() };
        let backend = HttpBackend::new(&cfg);
        assert_eq!(backend.base_url(), "http://localhost:8000");
        assert_eq!(backend.endpoint("/chat"), "http://localhost:8000/chat");
    }
}
