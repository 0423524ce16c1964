//! Chat session: transcript ownership and query dispatch.
//!
//! ## Dispatch lifecycle
//! 1. `begin` (under the state lock): reject empty or concurrent sends, echo
//!    the user message, raise the pending flag, clear the input
//! 2. the backend call runs with no lock held
//! 3. `finish` (under the state lock): append exactly one assistant message,
//!    then clear the pending flag, the input and the pending selection
//!
//! ## Guarantees
//! - Exactly one assistant message per accepted dispatch
//! - At most one dispatch in flight, enforced by a plain boolean
//! - Backend errors never escape `send`; they become error-flagged messages
//! - Dropping a `send` future mid-flight releases the pending flag
//!
//! A reply that arrives after `clear` was called belongs to a discarded
//! transcript and is dropped (see [`DispatchOutcome::Discarded`]).

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::{ChatBackend, ChatReply, ChatRequest};
use crate::error::AssistantError;
use crate::message::{Message, NewMessage, Transcript};
use crate::prober::{self, ConnectionStatus};
use crate::selection::PendingSelection;

/// Starter prompts offered on an empty transcript.
pub const SUGGESTIONS: &[&str] = &[
    "What is deep learning?",
    "Explain neural networks",
    "How does backpropagation work?",
];

/// Selections longer than this are shortened in the echoed user message.
pub const SELECTION_PREVIEW_CHARS: usize = 120;

pub const UNREACHABLE_TEXT: &str =
    "Unable to connect to the server. Please ensure the backend is running.";

/// Reply recorded when a dispatch is abandoned before the backend answers.
pub const CANCELLED_TEXT: &str = "The request was cancelled before the server answered.";

/// Welcome line for the empty chat view.
pub fn greeting(display_name: Option<&str>) -> String {
    let first = display_name
        .and_then(|n| n.split_whitespace().next())
        .unwrap_or("there");
    format!("Hello, {first}!")
}

/// User-facing text for a dispatch. The request itself carries the raw
/// query and selection separately.
pub fn compose_user_text(query: &str, selection: Option<&str>) -> String {
    match selection {
        Some(sel) => {
            let preview = truncate_chars(sel, SELECTION_PREVIEW_CHARS);
            format!("(Selected text: \"{preview}\") {}", query.trim())
                .trim_end()
                .to_string()
        }
        None => query.trim().to_string(),
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

/// Text shown in place of an answer when the dispatch failed.
pub fn error_text(err: &AssistantError) -> String {
    match err {
        AssistantError::Connect { .. } => UNREACHABLE_TEXT.to_string(),
        AssistantError::Http { status, .. } => format!("The server returned status {status}."),
        AssistantError::Malformed { .. } => {
            "The server returned a response without a readable answer.".to_string()
        }
        other => format!("Error: {other}"),
    }
}

/// Everything a session needs, passed in at construction.
pub struct ChatContext<B> {
    pub backend: Arc<B>,
    pub selection: PendingSelection,
}

impl<B> ChatContext<B> {
    pub fn new(backend: Arc<B>, selection: PendingSelection) -> Self {
        Self { backend, selection }
    }
}

/// Why a `send` did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Blank query and no selection.
    Empty,
    /// A previous dispatch has not resolved yet.
    Busy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Skipped(SkipReason),
    /// One assistant message was appended; `is_error` mirrors its flag.
    Replied { message: Message },
    /// The transcript was cleared while the request was in flight.
    Discarded,
}

#[derive(Debug, Default)]
struct SessionState {
    transcript: Transcript,
    input: String,
    pending: bool,
    epoch: u64,
    status: ConnectionStatus,
}

fn lock_state(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Ticket handed from `begin` to `finish`.
///
/// If the `send` future is dropped mid-flight the ticket is dropped unsettled,
/// and it then releases the pending flag itself. While the transcript is still
/// the one the query was echoed into, it also closes the exchange with an
/// error-flagged reply.
#[derive(Debug)]
struct PendingDispatch {
    request: ChatRequest,
    epoch: u64,
    state: Arc<Mutex<SessionState>>,
    selection: PendingSelection,
    settled: bool,
}

impl Drop for PendingDispatch {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = lock_state(&self.state);
        state.pending = false;
        state.input.clear();
        self.selection.clear();
        if self.epoch == state.epoch {
            state.transcript.push(NewMessage::assistant_error(CANCELLED_TEXT));
        }
        warn!(epoch = self.epoch, "chat dispatch cancelled before a reply arrived");
    }
}

pub struct ChatSession<B> {
    backend: Arc<B>,
    selection: PendingSelection,
    state: Arc<Mutex<SessionState>>,
}

impl<B> Clone for ChatSession<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            selection: self.selection.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<B: ChatBackend> ChatSession<B> {
    pub fn new(ctx: ChatContext<B>) -> Self {
        Self {
            backend: ctx.backend,
            selection: ctx.selection,
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        lock_state(&self.state)
    }

    /// Run the health probe once and record the result. Later calls return
    /// the stored status without probing again.
    pub async fn mount(&self) -> ConnectionStatus {
        let current = self.lock().status;
        if current != ConnectionStatus::Unknown {
            return current;
        }
        let status = prober::probe(self.backend.as_ref()).await;
        self.lock().status = status;
        info!(status = %status, "chat view mounted");
        status
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.lock().status
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.lock().input = text.into();
    }

    pub fn input(&self) -> String {
        self.lock().input.clone()
    }

    /// Copy starter prompt `index` into the input. False if out of range.
    pub fn apply_suggestion(&self, index: usize) -> bool {
        match SUGGESTIONS.get(index) {
            Some(s) => {
                self.set_input(*s);
                true
            }
            None => false,
        }
    }

    pub fn selection(&self) -> &PendingSelection {
        &self.selection
    }

    pub fn is_pending(&self) -> bool {
        self.lock().pending
    }

    /// Snapshot of the transcript in display order.
    pub fn messages(&self) -> Vec<Message> {
        self.lock().transcript.messages().to_vec()
    }

    pub fn len(&self) -> usize {
        self.lock().transcript.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().transcript.is_empty()
    }

    /// Discard the transcript and the pending selection.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.transcript.clear();
        state.epoch = state.epoch.wrapping_add(1);
        self.selection.clear();
        debug!(epoch = state.epoch, "transcript cleared");
    }

    /// Send the current input (plus any pending selection) to the backend.
    pub async fn send(&self) -> DispatchOutcome {
        let ticket = match self.begin() {
            Ok(ticket) => ticket,
            Err(reason) => return DispatchOutcome::Skipped(reason),
        };
        let result = self.backend.chat(&ticket.request).await;
        self.finish(ticket, result)
    }

    fn begin(&self) -> Result<PendingDispatch, SkipReason> {
        let mut state = self.lock();
        if state.pending {
            return Err(SkipReason::Busy);
        }
        let selection = self.selection.get();
        if state.input.trim().is_empty() && selection.is_none() {
            return Err(SkipReason::Empty);
        }

        let query = std::mem::take(&mut state.input);
        let text = compose_user_text(&query, selection.as_deref());
        state.transcript.push(NewMessage::user(text, selection.clone()));
        state.pending = true;

        Ok(PendingDispatch {
            request: ChatRequest {
                query,
                selected_text: selection,
            },
            epoch: state.epoch,
            state: Arc::clone(&self.state),
            selection: self.selection.clone(),
            settled: false,
        })
    }

    fn finish(
        &self,
        mut ticket: PendingDispatch,
        result: Result<ChatReply, AssistantError>,
    ) -> DispatchOutcome {
        ticket.settled = true;
        let mut state = self.lock();
        state.pending = false;
        state.input.clear();
        self.selection.clear();

        if ticket.epoch != state.epoch {
            debug!(
                sent_epoch = ticket.epoch,
                epoch = state.epoch,
                "dropping reply for a cleared transcript"
            );
            return DispatchOutcome::Discarded;
        }

        let new = match result {
            Ok(reply) => NewMessage::assistant(reply.answer, reply.sources),
            Err(e) => {
                warn!(error = %e, network = e.is_network(), status = ?e.status(), "chat dispatch failed");
                NewMessage::assistant_error(error_text(&e))
            }
        };
        let message = state.transcript.push(new).clone();
        DispatchOutcome::Replied { message }
    }
}

impl<B: ChatBackend + 'static> ChatSession<B> {
    /// Run [`mount`](Self::mount) on its own task. Sending is never held up
    /// by a slow health check.
    pub fn spawn_mount(&self) -> JoinHandle<ConnectionStatus> {
        let session = self.clone();
        tokio::spawn(async move { session.mount().await })
    }
}
