//! Cart domain events.

use std::sync::{Arc, Mutex};

use tracing::info;

use crate::cart::CartItem;

/// Something that happened to a cart.
#[derive(Debug, Clone, PartialEq)]
pub enum CartEvent {
    /// A line was added or merged.
    Added(CartItem),
    /// A line was updated.
    Updated(CartItem),
    /// A line was removed.
    Removed(CartItem),
    /// The current instance was written to the database.
    Stored { identifier: String, instance: String },
    /// A stored snapshot was merged back into the session.
    Restored { identifier: String, instance: String },
}

impl CartEvent {
    /// Event name, e.g. `"cart.added"`.
    pub fn name(&self) -> &'static str {
        match self {
            CartEvent::Added(_) => "cart.added",
            CartEvent::Updated(_) => "cart.updated",
            CartEvent::Removed(_) => "cart.removed",
            CartEvent::Stored { .. } => "cart.stored",
            CartEvent::Restored { .. } => "cart.restored",
        }
    }

    /// The affected line, for item events.
    pub fn item(&self) -> Option<&CartItem> {
        match self {
            CartEvent::Added(item) | CartEvent::Updated(item) | CartEvent::Removed(item) => {
                Some(item)
            }
            CartEvent::Stored { .. } | CartEvent::Restored { .. } => None,
        }
    }
}

/// Receives cart events. Fire-and-forget.
pub trait EventDispatcher {
    /// Handle one event.
    fn dispatch(&self, event: &CartEvent);
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDispatcher;

impl EventDispatcher for NullDispatcher {
    fn dispatch(&self, _event: &CartEvent) {}
}

/// Logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDispatcher;

impl EventDispatcher for TracingDispatcher {
    fn dispatch(&self, event: &CartEvent) {
        match event.item() {
            Some(item) => info!(
                event = event.name(),
                row_id = %item.row_id,
                qty = item.qty,
                "cart event"
            ),
            None => info!(event = event.name(), "cart event"),
        }
    }
}

/// Keeps every event in memory.
///
/// Clones share the same log, so a test can hand one clone to the cart and
/// inspect the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingDispatcher {
    events: Arc<Mutex<Vec<CartEvent>>>,
}

impl RecordingDispatcher {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far.
    pub fn events(&self) -> Vec<CartEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Names of the events received so far.
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(CartEvent::name).collect()
    }

    /// Forget recorded events.
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl EventDispatcher for RecordingDispatcher {
    fn dispatch(&self, event: &CartEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
