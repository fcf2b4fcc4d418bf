//! Broadcast hub - listener registry and chunk fan-out
//!
//! Every listener owns a bounded channel. `broadcast` snapshots the listener
//! set, releases the lock, and `try_send`s the chunk into each channel, so a
//! slow listener only ever fills its own buffer.
//!
//! Backpressure policy: a listener whose buffer is full is disconnected
//! (removed from the set; its stream ends once the pending chunks drain).
//! Chunks are never silently dropped for a listener that stays connected.
//!
//! Ordering: each channel is FIFO and the player is the only producer, so
//! every listener sees chunks in production order.

use crate::error::Error;
use crate::state::SharedState;
use bytes::Bytes;
use futures::stream::Stream;
use jukebox_common::StationEvent;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identity of one connected listener
pub type ListenerId = Uuid;

/// Fan-out registry for live stream listeners
///
/// Cheap to clone; clones share the same listener set.
#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    listeners: Mutex<HashMap<ListenerId, mpsc::Sender<Bytes>>>,
    /// Pending chunks allowed per listener
    buffer_chunks: usize,
    state: Arc<SharedState>,
}

impl HubInner {
    fn listeners(&self) -> MutexGuard<'_, HashMap<ListenerId, mpsc::Sender<Bytes>>> {
        // Map stays consistent even if a holder panicked
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn remove(&self, id: ListenerId) -> bool {
        let (removed, count) = {
            let mut listeners = self.listeners();
            let removed = listeners.remove(&id).is_some();
            (removed, listeners.len())
        };

        if removed {
            debug!("Listener {} removed, {} remaining", id, count);
            self.state
                .broadcast_event(StationEvent::listener_count_changed(count));
        }
        removed
    }
}

impl BroadcastHub {
    /// Create a hub allowing `buffer_chunks` pending chunks per listener
    pub fn new(buffer_chunks: usize, state: Arc<SharedState>) -> Self {
        info!("Broadcast hub initialized, {} chunks per listener", buffer_chunks);
        Self {
            inner: Arc::new(HubInner {
                listeners: Mutex::new(HashMap::new()),
                buffer_chunks: buffer_chunks.max(1),
                state,
            }),
        }
    }

    /// Add a new listener
    ///
    /// The returned sink yields every chunk broadcast from now on. Dropping
    /// it removes the listener.
    pub fn register(&self) -> ListenerSink {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.inner.buffer_chunks);

        let count = {
            let mut listeners = self.inner.listeners();
            listeners.insert(id, tx);
            listeners.len()
        };

        info!("Listener {} connected, total listeners: {}", id, count);
        self.inner
            .state
            .broadcast_event(StationEvent::listener_count_changed(count));

        ListenerSink {
            id,
            rx,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Remove a listener
    ///
    /// Idempotent: returns false if the listener was not registered.
    pub fn unregister(&self, id: ListenerId) -> bool {
        self.inner.remove(id)
    }

    /// Deliver `chunk` to every listener registered at the time of the call
    ///
    /// Never blocks. Listeners that are gone or whose buffer is full are
    /// removed; delivery to the others is unaffected. Returns how many
    /// listeners accepted the chunk.
    pub fn broadcast(&self, chunk: Bytes) -> usize {
        let targets: Vec<(ListenerId, mpsc::Sender<Bytes>)> = self
            .inner
            .listeners()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut delivered = 0;
        let mut failed = Vec::new();

        for (id, tx) in targets {
            match tx.try_send(chunk.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    let failure = Error::SinkWriteFailure(format!(
                        "listener {} has {} chunks pending",
                        id, self.inner.buffer_chunks
                    ));
                    warn!("{}, disconnecting", failure);
                    failed.push(id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Listener {} closed before delivery", id);
                    failed.push(id);
                }
            }
        }

        for id in failed {
            self.inner.remove(id);
        }

        delivered
    }

    /// Disconnect every listener
    ///
    /// Their streams end once pending chunks drain. Used on shutdown so
    /// open live streams do not hold the server up.
    pub fn disconnect_all(&self) -> usize {
        let dropped = std::mem::take(&mut *self.inner.listeners()).len();
        if dropped > 0 {
            info!("Disconnected {} listeners", dropped);
            self.inner
                .state
                .broadcast_event(StationEvent::listener_count_changed(0));
        }
        dropped
    }

    /// Current number of connected listeners
    pub fn listener_count(&self) -> usize {
        self.inner.listeners().len()
    }
}

/// Receiving end of one listener's stream
///
/// Implements `Stream<Item = Bytes>`; the stream ends when the hub
/// disconnects the listener. Dropping the sink unregisters it, which covers
/// clients that vanish without a clean close.
pub struct ListenerSink {
    id: ListenerId,
    rx: mpsc::Receiver<Bytes>,
    hub: Weak<HubInner>,
}

impl ListenerSink {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Next chunk, or None once disconnected
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.rx.recv().await
    }
}

impl Stream for ListenerSink {
    type Item = Bytes;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for ListenerSink {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.id);
        }
    }
}
