//! Player task - streams the head of the queue into the broadcast hub
//!
//! Track-advance loop:
//! 1. Wait until the controller reports an entry to play (Playing, queue non-empty)
//! 2. Open it and read it chunk by chunk, paced at the configured bitrate
//! 3. Hand each chunk to the hub, but only while the entry is still current
//! 4. At end of file remove the entry and continue with the next one
//!
//! Any controller change (pause, skip, enqueue) interrupts the wait for the
//! next chunk so it is re-checked immediately. An interrupted track is
//! dropped; when it becomes current again it restarts from byte 0, even if
//! the pause and the following play both landed between two chunks.
//!
//! A track that cannot be opened or read is skipped.

use crate::broadcast::BroadcastHub;
use crate::playback::controller::{PlaybackController, Playout};
use crate::state::SharedState;
use crate::store::TrackStore;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use jukebox_common::config::StreamConfig;
use jukebox_common::StationEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

/// How streaming one entry ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackOutcome {
    /// Read to end of file
    Completed,
    /// Could not be opened or read
    Failed,
    /// No longer current (paused or skipped)
    Interrupted,
    /// Change channel closed
    Shutdown,
}

/// The single producer feeding the broadcast hub
pub struct Player {
    controller: Arc<PlaybackController>,
    hub: BroadcastHub,
    store: TrackStore,
    state: Arc<SharedState>,
    chunk_size: usize,
    chunk_interval: Option<Duration>,
}

impl Player {
    pub fn new(
        controller: Arc<PlaybackController>,
        hub: BroadcastHub,
        store: TrackStore,
        state: Arc<SharedState>,
        stream: &StreamConfig,
    ) -> Self {
        Self {
            controller,
            hub,
            store,
            state,
            chunk_size: stream.chunk_size.max(1),
            chunk_interval: stream.chunk_interval(),
        }
    }

    /// Run the player on the current runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Track-advance loop; runs until the task is aborted
    pub async fn run(self) {
        info!(
            "Player started (chunk size {} bytes, pacing {:?})",
            self.chunk_size, self.chunk_interval
        );
        let mut changes = self.controller.subscribe();

        loop {
            // Anything changing after this point wakes the wait below
            changes.borrow_and_update();

            let Some(entry) = self.controller.current() else {
                if changes.changed().await.is_err() {
                    break;
                }
                continue;
            };

            match self.stream_entry(&entry, &mut changes).await {
                TrackOutcome::Completed => {
                    info!("Finished streaming {}", entry.track);
                    self.controller.finish(entry.entry_id, true);
                }
                TrackOutcome::Failed => {
                    self.controller.finish(entry.entry_id, false);
                }
                TrackOutcome::Interrupted => {
                    debug!("Streaming of {} interrupted", entry.track);
                }
                TrackOutcome::Shutdown => break,
            }
        }

        info!("Player stopped");
    }

    async fn stream_entry(
        &self,
        entry: &Playout,
        changes: &mut watch::Receiver<u64>,
    ) -> TrackOutcome {
        let file = match self.store.open(&entry.track).await {
            Ok(file) => file,
            Err(e) => {
                warn!("Skipping {}: {}", entry.track, e);
                return TrackOutcome::Failed;
            }
        };

        info!("Streaming {} from the beginning", entry.track);
        self.state
            .broadcast_event(StationEvent::track_started(entry.track.clone()));

        let mut chunks = ReaderStream::with_capacity(file, self.chunk_size);
        let mut pacer = self.chunk_interval.map(|period| {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        let mut sent: u64 = 0;
        let mut ticked = false;

        loop {
            let next = next_chunk(&mut pacer, &mut ticked, &mut chunks);

            tokio::select! {
                biased;

                changed = changes.changed() => {
                    if changed.is_err() {
                        return TrackOutcome::Shutdown;
                    }
                    if self.controller.with_current(entry, || ()).is_none() {
                        return TrackOutcome::Interrupted;
                    }
                }

                chunk = next => match chunk {
                    None => {
                        debug!("{}: {} chunks sent", entry.track, sent);
                        return TrackOutcome::Completed;
                    }
                    Some(Ok(bytes)) => {
                        let hub = &self.hub;
                        if self
                            .controller
                            .with_current(entry, || hub.broadcast(bytes))
                            .is_none()
                        {
                            return TrackOutcome::Interrupted;
                        }
                        sent += 1;
                    }
                    Some(Err(e)) => {
                        warn!("Read error on {} after {} chunks: {}", entry.track, sent, e);
                        return TrackOutcome::Failed;
                    }
                },
            }
        }
    }
}

/// Wait for the pacing tick, then read the next chunk
///
/// `ticked` records a tick that has already been taken, so if this future
/// is dropped while reading, the next call reads without waiting again.
async fn next_chunk<S>(
    pacer: &mut Option<Interval>,
    ticked: &mut bool,
    chunks: &mut S,
) -> Option<std::io::Result<Bytes>>
where
    S: Stream<Item = std::io::Result<Bytes>> + Unpin,
{
    if !*ticked {
        if let Some(ticker) = pacer.as_mut() {
            ticker.tick().await;
        }
        *ticked = true;
    }
    let chunk = chunks.next().await;
    *ticked = false;
    chunk
}
