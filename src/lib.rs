//! Client library for the AI textbook question-answering backend.
//!
//! The pieces, leaves first:
//! - [`backend`]: HTTP transport for `/health` and `/chat`
//! - [`prober`]: one-shot connection status
//! - [`selection`]: scoped text-selection capture
//! - [`render`]: markdown-ish reply rendering
//! - [`session`]: transcript ownership and single-flight dispatch
//! - [`guard`] and [`web`]: cookie-presence route guard and the dashboard server

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod guard;
pub mod message;
pub mod prober;
pub mod render;
pub mod repl;
pub mod selection;
pub mod session;
pub mod web;

pub use backend::{ChatBackend, ChatReply, ChatRequest, HttpBackend};
pub use config::AssistantConfig;
pub use error::AssistantError;
pub use guard::{GuardDecision, RouteGuard};
pub use message::{Message, Role, SourceCitation, Transcript};
pub use prober::ConnectionStatus;
pub use render::{render_message, RenderedMessage};
pub use selection::{DocumentEvent, DocumentEvents, PendingSelection, SelectionCapture};
pub use session::{ChatContext, ChatSession, DispatchOutcome, SkipReason};
