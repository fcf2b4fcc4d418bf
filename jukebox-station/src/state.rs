//! Shared station state
//!
//! Holds the station event bus. Components publish `StationEvent`s here and
//! SSE clients subscribe to them. Audio never flows through this bus.

use jukebox_common::StationEvent;
use tokio::sync::broadcast;
use tracing::trace;

/// Events buffered per SSE subscriber before it starts lagging
const EVENT_CAPACITY: usize = 100;

/// Shared state accessible by all components
pub struct SharedState {
    /// Event broadcaster for SSE events
    event_tx: broadcast::Sender<StationEvent>,
}

impl SharedState {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { event_tx }
    }

    /// Broadcast an event to all SSE listeners
    pub fn broadcast_event(&self, event: StationEvent) {
        trace!("Publishing {}", event.event_type());
        // No receivers is OK
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to event stream for SSE
    pub fn subscribe_events(&self) -> broadcast::Receiver<StationEvent> {
        self.event_tx.subscribe()
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
