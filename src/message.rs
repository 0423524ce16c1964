//! Chat messages and the per-session transcript.
//!
//! ## Design
//! - `Message` is immutable after construction; fields are read through accessors
//! - `Transcript` only appends. `clear` discards everything at once
//! - Timestamps are stamped by the transcript and clamped so display order is
//!   also creation order, even if the wall clock steps backwards

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the unix epoch, or 0 if the clock is before 1970.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A textbook passage the backend cited for an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCitation {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    id: String,
    role: Role,
    text: String,
    created_at_ms: u64,
    is_error: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sources: Vec<SourceCitation>,
    /// Raw selection that accompanied a user query.
    #[serde(skip_serializing_if = "Option::is_none")]
    selected_text: Option<String>,
}

impl Message {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }

    pub fn sources(&self) -> &[SourceCitation] {
        &self.sources
    }

    pub fn selected_text(&self) -> Option<&str> {
        self.selected_text.as_deref()
    }
}

/// Content for a message that has not been appended yet. The transcript
/// assigns the id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub role: Role,
    pub text: String,
    pub is_error: bool,
    pub sources: Vec<SourceCitation>,
    pub selected_text: Option<String>,
}

impl NewMessage {
    pub fn user(text: impl Into<String>, selected_text: Option<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            is_error: false,
            sources: Vec::new(),
            selected_text,
        }
    }

    pub fn assistant(text: impl Into<String>, sources: Vec<SourceCitation>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            is_error: false,
            sources,
            selected_text: None,
        }
    }

    pub fn assistant_error(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            is_error: true,
            sources: Vec::new(),
            selected_text: None,
        }
    }
}

/// Ordered, append-only list of messages for one chat view.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    last_ms: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return a reference to the stored copy.
    pub fn push(&mut self, new: NewMessage) -> &Message {
        let created_at_ms = now_ms().max(self.last_ms);
        self.last_ms = created_at_ms;
        self.messages.push(Message {
            id: uuid::Uuid::new_v4().to_string(),
            role: new.role,
            text: new.text,
            created_at_ms,
            is_error: new.is_error,
            sources: new.sources,
            selected_text: new.selected_text,
        });
        &self.messages[self.messages.len() - 1]
    }

    /// Discard every message.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}
