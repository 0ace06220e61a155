//! Last-write-wins publication of report results.
//!
//! When a user changes filters faster than reports load, several requests
//! are in flight at once. Only the newest may publish; an older result that
//! arrives late is dropped, and a failed newest request keeps the last good
//! result on screen.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::ReportError;

/// Handle of one in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// What happened to a completed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publication {
    /// The result is now the current value.
    Published,
    /// The newest request failed; the previous value was kept.
    Failed,
    /// A newer request was issued; the result was discarded.
    Superseded,
}

#[derive(Debug)]
struct SlotState<T> {
    value: Option<Arc<T>>,
    value_ticket: Option<Ticket>,
    failure: Option<String>,
}

/// A single published value guarded by request tickets.
#[derive(Debug)]
pub struct ReportSlot<T> {
    next: AtomicU64,
    state: Mutex<SlotState<T>>,
}

impl<T> Default for ReportSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ReportSlot<T> {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
            state: Mutex::new(SlotState {
                value: None,
                value_ticket: None,
                failure: None,
            }),
        }
    }

    /// Start a request. Every later call supersedes this ticket.
    pub fn begin(&self) -> Ticket {
        Ticket(self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `ticket` is still the newest issued request.
    pub fn is_latest(&self, ticket: Ticket) -> bool {
        self.next.load(Ordering::SeqCst) == ticket.0
    }

    /// Offer the outcome of the request behind `ticket`.
    pub fn complete(&self, ticket: Ticket, result: Result<T, ReportError>) -> Publication {
        let mut state = self.lock();
        // Checked under the lock so two completions cannot interleave.
        if !self.is_latest(ticket) {
            tracing::warn!(ticket = ticket.0, "discarding superseded report result");
            return Publication::Superseded;
        }
        match result {
            Ok(value) => {
                state.value = Some(Arc::new(value));
                state.value_ticket = Some(ticket);
                state.failure = None;
                Publication::Published
            }
            Err(e) => {
                tracing::warn!(ticket = ticket.0, error = %e, "report request failed; keeping previous result");
                state.failure = Some(e.to_string());
                Publication::Failed
            }
        }
    }

    /// The last successfully published value.
    pub fn current(&self) -> Option<Arc<T>> {
        self.lock().value.clone()
    }

    /// Ticket of the request that produced [`current`](Self::current).
    pub fn current_ticket(&self) -> Option<Ticket> {
        self.lock().value_ticket
    }

    /// Failure notice of the newest request, cleared by the next success.
    pub fn failure(&self) -> Option<String> {
        self.lock().failure.clone()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
