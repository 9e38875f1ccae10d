//! Thread-safe FIFO of pending events.
//!
//! Any thread may push; the application's dispatch loop is the single
//! consumer. Events are stored as `Arc<Event>` so a producer may keep its own
//! reference and observe the handled flag after dispatch.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::event::{Event, EventKind, WindowId};

/// An unbounded multi-producer event queue.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Mutex<VecDeque<Arc<Event>>>,
}

static_assertions::assert_impl_all!(EventQueue: Send, Sync);

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&self, event: Event) {
        self.push_shared(Arc::new(event));
    }

    /// Append an event that is already shared.
    pub fn push_shared(&self, event: Arc<Event>) {
        tracing::trace!(target: "haze_core::queue", %event, "event queued");
        self.events.lock().push_back(event);
    }

    /// Build an event in place and append it, returning the shared handle.
    pub fn emplace(&self, kind: EventKind, window: impl Into<Option<WindowId>>) -> Arc<Event> {
        let event = Arc::new(Event::new(kind, window));
        self.push_shared(event.clone());
        event
    }

    /// Remove and return the oldest event, or `None` if the queue is empty.
    pub fn poll(&self) -> Option<Arc<Event>> {
        self.events.lock().pop_front()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Drop every pending event.
    pub fn clear(&self) {
        let dropped = {
            let mut events = self.events.lock();
            std::mem::take(&mut *events)
        };
        if !dropped.is_empty() {
            tracing::debug!(target: "haze_core::queue", count = dropped.len(), "pending events discarded");
        }
    }
}
