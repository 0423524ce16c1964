//! Text selection capture.
//!
//! ## Design
//! - `DocumentEvents` is the document-level event source. Listeners are held
//!   only while their [`Subscription`] guard is alive; dropping the guard
//!   removes the listener, so a torn-down view cannot keep capturing
//! - `PendingSelection` is the shared slot the session reads at send time
//! - `SelectionCapture` wires the two together
//!
//! An empty selection event leaves the stored value untouched. Only
//! [`PendingSelection::clear`], clear-chat, or a completed dispatch reset it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::trace;

/// Pointer or keyboard release, carrying the selection as it stands afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    PointerUp { selection: String },
    KeyUp { selection: String },
}

impl DocumentEvent {
    pub fn selection(&self) -> &str {
        match self {
            DocumentEvent::PointerUp { selection } | DocumentEvent::KeyUp { selection } => {
                selection
            }
        }
    }
}

type Listener = Arc<dyn Fn(&DocumentEvent) + Send + Sync>;
type ListenerTable = Mutex<Vec<(u64, Listener)>>;

fn lock_table(table: &ListenerTable) -> MutexGuard<'_, Vec<(u64, Listener)>> {
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Event source that fans document events out to subscribed listeners.
#[derive(Default)]
pub struct DocumentEvents {
    listeners: Arc<ListenerTable>,
    next_id: AtomicU64,
}

impl DocumentEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` until the returned guard is dropped.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&DocumentEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock_table(&self.listeners).push((id, Arc::new(listener)));
        Subscription {
            id,
            table: Arc::downgrade(&self.listeners),
        }
    }

    /// Deliver `event` to every current listener.
    pub fn emit(&self, event: DocumentEvent) {
        // Snapshot so listeners run without the table lock held.
        let snapshot: Vec<Listener> = lock_table(&self.listeners)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in snapshot {
            listener(&event);
        }
    }

    pub fn listener_count(&self) -> usize {
        lock_table(&self.listeners).len()
    }
}

/// Guard returned by [`DocumentEvents::subscribe`]. Removes its listener on drop.
pub struct Subscription {
    id: u64,
    table: Weak<ListenerTable>,
}

impl Subscription {
    /// Remove the listener now.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            lock_table(&table).retain(|(id, _)| *id != self.id);
        }
    }
}

/// Most recently captured selection, shared by the capture and the session.
#[derive(Debug, Clone, Default)]
pub struct PendingSelection(Arc<Mutex<Option<String>>>);

impl PendingSelection {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<String>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set(&self, text: impl Into<String>) {
        *self.slot() = Some(text.into());
    }

    pub fn get(&self) -> Option<String> {
        self.slot().clone()
    }

    pub fn is_present(&self) -> bool {
        self.slot().is_some()
    }

    /// Explicit dismissal.
    pub fn clear(&self) {
        *self.slot() = None;
    }
}

/// Listens for pointer/key release events and records non-empty selections.
pub struct SelectionCapture {
    pending: PendingSelection,
    _subscription: Subscription,
}

impl SelectionCapture {
    pub fn attach(events: &DocumentEvents, pending: PendingSelection) -> Self {
        let slot = pending.clone();
        let subscription = events.subscribe(move |event| {
            let trimmed = event.selection().trim();
            if trimmed.is_empty() {
                return;
            }
            trace!(len = trimmed.len(), "captured text selection");
            slot.set(trimmed);
        });
        Self {
            pending,
            _subscription: subscription,
        }
    }

    pub fn pending(&self) -> &PendingSelection {
        &self.pending
    }

    /// Stop listening. The captured value stays in the shared slot.
    pub fn detach(self) {}
}
