//! Playback controller - playback mode and track queue
//!
//! Owns the only copy of the station's mode and queue. Every change bumps a
//! generation counter on a watch channel so the player notices it between
//! chunks.
//!
//! The head of the queue is the track that is playing (or will play once the
//! mode is Playing). It leaves the queue only when the player finishes it,
//! fails to open it, or it is skipped.

use crate::error::Result;
use crate::store::TrackStore;
use crate::state::SharedState;
use futures::stream::Stream;
use jukebox_common::{PlaybackMode, StationEvent};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, info};

/// One queued track request
#[derive(Debug, Clone, PartialEq, Eq)]
struct QueueEntry {
    /// Unique per enqueue, so a re-queued track is a distinct entry
    entry_id: u64,
    track: String,
}

/// The entry the player should stream, tied to one run of Playing
///
/// Every Paused → Playing transition starts a new run, so a `Playout`
/// taken before a pause stays stale even if playback resumes before the
/// player looks again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playout {
    pub entry_id: u64,
    pub track: String,
    pub play_epoch: u64,
}

/// Result of an enqueue request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnqueueOutcome {
    /// 0-based position in the queue (0 = head)
    pub position: usize,
    /// Whether this enqueue switched an empty, paused station to Playing
    pub auto_started: bool,
}

/// Point-in-time view of the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerSnapshot {
    pub mode: PlaybackMode,
    pub queue: Vec<String>,
    pub now_playing: Option<String>,
}

struct ControllerState {
    mode: PlaybackMode,
    queue: VecDeque<QueueEntry>,
    next_entry_id: u64,
    /// Bumped on every Paused → Playing transition
    play_epoch: u64,
}

impl ControllerState {
    fn track_names(&self) -> Vec<String> {
        self.queue.iter().map(|e| e.track.clone()).collect()
    }

    fn set_playing(&mut self) {
        self.mode = PlaybackMode::Playing;
        self.play_epoch += 1;
    }

    fn playout(&self) -> Option<Playout> {
        match self.mode {
            PlaybackMode::Playing => self.queue.front().map(|e| Playout {
                entry_id: e.entry_id,
                track: e.track.clone(),
                play_epoch: self.play_epoch,
            }),
            PlaybackMode::Paused => None,
        }
    }
}

/// Playback controller
///
/// Shared as `Arc<PlaybackController>` between the request gateway and the
/// player task.
pub struct PlaybackController {
    inner: Mutex<ControllerState>,
    changes: watch::Sender<u64>,
    store: TrackStore,
    state: Arc<SharedState>,
}

impl PlaybackController {
    /// Create a controller in the initial state: Paused, empty queue
    pub fn new(store: TrackStore, state: Arc<SharedState>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            inner: Mutex::new(ControllerState {
                mode: PlaybackMode::Paused,
                queue: VecDeque::new(),
                next_entry_id: 1,
                play_epoch: 0,
            }),
            changes,
            store,
            state,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn notify(&self) {
        self.changes.send_modify(|generation| *generation += 1);
    }

    /// Switch to Playing
    ///
    /// Returns false (and does nothing) if already Playing.
    pub fn play(&self) -> bool {
        self.set_mode(PlaybackMode::Playing)
    }

    /// Switch to Paused
    ///
    /// The player stops pushing chunks before its next chunk. The position
    /// within the current track is not kept; the next `play` restarts it.
    pub fn pause(&self) -> bool {
        self.set_mode(PlaybackMode::Paused)
    }

    fn set_mode(&self, new_mode: PlaybackMode) -> bool {
        let old_mode = {
            let mut inner = self.lock();
            if inner.mode == new_mode {
                return false;
            }
            let old_mode = inner.mode;
            match new_mode {
                PlaybackMode::Playing => inner.set_playing(),
                PlaybackMode::Paused => inner.mode = PlaybackMode::Paused,
            }
            old_mode
        };

        info!("Playback mode: {} → {}", old_mode, new_mode);
        self.notify();
        self.state
            .broadcast_event(StationEvent::playback_state_changed(old_mode, new_mode));
        true
    }

    /// Append a track request to the back of the queue
    ///
    /// An empty, paused station starts playing on its first request. Later
    /// requests never change the mode.
    pub fn enqueue(&self, track: &str) -> Result<EnqueueOutcome> {
        let track = TrackStore::sanitize(track)?;

        let (outcome, queue) = {
            let mut inner = self.lock();
            let auto_started = inner.queue.is_empty() && inner.mode == PlaybackMode::Paused;
            if auto_started {
                inner.set_playing();
            }

            let entry_id = inner.next_entry_id;
            inner.next_entry_id += 1;
            inner.queue.push_back(QueueEntry {
                entry_id,
                track: track.clone(),
            });

            let outcome = EnqueueOutcome {
                position: inner.queue.len() - 1,
                auto_started,
            };
            (outcome, inner.track_names())
        };

        info!("Enqueued {} at position {}", track, outcome.position);
        self.notify();
        if outcome.auto_started {
            info!("First request on a paused station, starting playback");
            self.state.broadcast_event(StationEvent::playback_state_changed(
                PlaybackMode::Paused,
                PlaybackMode::Playing,
            ));
        }
        self.state.broadcast_event(StationEvent::queue_changed(queue));

        Ok(outcome)
    }

    /// Drop the head of the queue
    ///
    /// If it is streaming, the player abandons it. Mode is unchanged.
    pub fn skip(&self) -> Option<String> {
        let (entry, queue) = {
            let mut inner = self.lock();
            let entry = inner.queue.pop_front()?;
            (entry, inner.track_names())
        };

        info!("Skipped {}", entry.track);
        self.notify();
        self.state
            .broadcast_event(StationEvent::track_completed(entry.track.clone(), false));
        self.state.broadcast_event(StationEvent::queue_changed(queue));
        Some(entry.track)
    }

    /// Lazily list tracks present in the track store
    pub async fn list_available_tracks(&self) -> Result<impl Stream<Item = String> + Send + 'static> {
        self.store.list_tracks().await
    }

    pub fn mode(&self) -> PlaybackMode {
        self.lock().mode
    }

    /// Queued track identifiers, head first
    pub fn queue(&self) -> Vec<String> {
        self.lock().track_names()
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        let inner = self.lock();
        let now_playing = match inner.mode {
            PlaybackMode::Playing => inner.queue.front().map(|e| e.track.clone()),
            PlaybackMode::Paused => None,
        };
        ControllerSnapshot {
            mode: inner.mode,
            queue: inner.track_names(),
            now_playing,
        }
    }

    /// Subscribe to change notifications
    ///
    /// The value is a generation counter; only the fact that it changed
    /// matters.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Entry the player should be streaming right now
    ///
    /// None while paused or when the queue is empty.
    pub fn current(&self) -> Option<Playout> {
        self.lock().playout()
    }

    /// Run `f` only if `playout` is still what should be playing
    ///
    /// Same entry at the head and no pause since it was taken. The
    /// controller lock is held while `f` runs, so a `pause` or `skip` that
    /// has returned is guaranteed to be observed. `f` must not block.
    pub fn with_current<R>(&self, playout: &Playout, f: impl FnOnce() -> R) -> Option<R> {
        let inner = self.lock();
        if inner.playout().as_ref() == Some(playout) {
            Some(f())
        } else {
            None
        }
    }

    /// Remove a finished entry from the head of the queue
    ///
    /// No-op if the entry is no longer at the head (it was skipped while
    /// streaming). Returns whether the entry was removed.
    pub fn finish(&self, entry_id: u64, completed: bool) -> bool {
        let (entry, queue) = {
            let mut inner = self.lock();
            if inner.queue.front().map(|e| e.entry_id) != Some(entry_id) {
                debug!("Entry {} already left the queue", entry_id);
                return false;
            }
            let entry = inner.queue.pop_front();
            (entry, inner.track_names())
        };

        let Some(entry) = entry else {
            return false;
        };

        debug!("Finished {} (completed: {})", entry.track, completed);
        self.notify();
        self.state
            .broadcast_event(StationEvent::track_completed(entry.track, completed));
        self.state.broadcast_event(StationEvent::queue_changed(queue));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use futures::StreamExt;

    fn controller() -> PlaybackController {
        PlaybackController::new(TrackStore::new("/nonexistent"), Arc::new(SharedState::new()))
    }

    #[test]
    fn test_initial_state() {
        let c = controller();
        assert_eq!(c.mode(), PlaybackMode::Paused);
        assert!(c.queue().is_empty());
        assert!(c.current().is_none());
    }

    #[test]
    fn test_first_enqueue_auto_starts() {
        let c = controller();

        let first = c.enqueue("a.mp3").unwrap();
        assert!(first.auto_started);
        assert_eq!(first.position, 0);
        assert_eq!(c.mode(), PlaybackMode::Playing);
        assert_eq!(c.queue(), vec!["a.mp3"]);

        let second = c.enqueue("b.mp3").unwrap();
        assert!(!second.auto_started);
        assert_eq!(second.position, 1);
        assert_eq!(c.mode(), PlaybackMode::Playing);
        assert_eq!(c.queue(), vec!["a.mp3", "b.mp3"]);
    }

    #[test]
    fn test_enqueue_on_paused_nonempty_queue_stays_paused() {
        let c = controller();
        c.enqueue("a.mp3").unwrap();
        c.pause();

        let outcome = c.enqueue("b.mp3").unwrap();
        assert!(!outcome.auto_started);
        assert_eq!(c.mode(), PlaybackMode::Paused);
    }

    #[test]
    fn test_enqueue_while_playing_with_empty_queue_keeps_mode() {
        let c = controller();
        c.play();

        let outcome = c.enqueue("a.mp3").unwrap();
        assert!(!outcome.auto_started);
        assert_eq!(c.mode(), PlaybackMode::Playing);
    }

    #[test]
    fn test_enqueue_rejects_invalid_identifier() {
        let c = controller();
        assert!(matches!(c.enqueue(".."), Err(Error::InvalidTrack(_))));
        assert!(c.queue().is_empty());
        assert_eq!(c.mode(), PlaybackMode::Paused);
    }

    #[test]
    fn test_pause_then_play_keeps_queue() {
        let c = controller();
        c.enqueue("a.mp3").unwrap();
        c.enqueue("b.mp3").unwrap();

        assert!(c.pause());
        assert!(c.play());
        assert_eq!(c.queue(), vec!["a.mp3", "b.mp3"]);
    }

    #[test]
    fn test_play_and_pause_are_idempotent() {
        let c = controller();
        assert!(!c.pause());
        assert!(c.play());
        assert!(!c.play());
        assert!(c.pause());
        assert!(!c.pause());
    }

    #[test]
    fn test_current_only_while_playing() {
        let c = controller();
        c.enqueue("a.mp3").unwrap();
        assert_eq!(c.current().unwrap().track, "a.mp3");

        c.pause();
        assert!(c.current().is_none());
        assert_eq!(c.snapshot().now_playing, None);
    }

    #[test]
    fn test_finish_pops_only_matching_head() {
        let c = controller();
        c.enqueue("a.mp3").unwrap();
        c.enqueue("b.mp3").unwrap();
        let head = c.current().unwrap();

        assert!(!c.finish(head.entry_id + 100, true));
        assert!(c.finish(head.entry_id, true));
        assert!(!c.finish(head.entry_id, true));
        assert_eq!(c.queue(), vec!["b.mp3"]);
    }

    #[test]
    fn test_same_track_queued_twice_is_two_entries() {
        let c = controller();
        c.enqueue("a.mp3").unwrap();
        c.enqueue("a.mp3").unwrap();
        let first = c.current().unwrap();

        assert!(c.finish(first.entry_id, true));
        let second = c.current().unwrap();
        assert_eq!(second.track, "a.mp3");
        assert_ne!(second.entry_id, first.entry_id);
    }

    #[test]
    fn test_skip() {
        let c = controller();
        assert_eq!(c.skip(), None);

        c.enqueue("a.mp3").unwrap();
        c.enqueue("b.mp3").unwrap();
        assert_eq!(c.skip().as_deref(), Some("a.mp3"));
        assert_eq!(c.queue(), vec!["b.mp3"]);
        assert_eq!(c.mode(), PlaybackMode::Playing);
    }

    #[test]
    fn test_with_current_guards_on_mode_and_head() {
        let c = controller();
        c.enqueue("a.mp3").unwrap();
        let head = c.current().unwrap();

        assert_eq!(c.with_current(&head, || 7), Some(7));
        c.pause();
        assert_eq!(c.with_current(&head, || 7), None);
        c.play();
        let resumed = c.current().unwrap();
        c.skip();
        assert_eq!(c.with_current(&resumed, || 7), None);
    }

    #[test]
    fn test_pause_and_play_back_to_back_start_a_new_run() {
        let c = controller();
        c.enqueue("a.mp3").unwrap();
        let before = c.current().unwrap();

        c.pause();
        c.play();

        let after = c.current().unwrap();
        assert_eq!(after.entry_id, before.entry_id);
        assert_ne!(after.play_epoch, before.play_epoch);
        assert_eq!(c.with_current(&before, || ()), None);
        assert_eq!(c.with_current(&after, || ()), Some(()));
    }

    #[test]
    fn test_changes_are_signalled() {
        let c = controller();
        let mut rx = c.subscribe();
        rx.borrow_and_update();

        c.enqueue("a.mp3").unwrap();
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        // No-op transitions do not signal
        c.play();
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_events_for_auto_start() {
        let state = Arc::new(SharedState::new());
        let c = PlaybackController::new(TrackStore::new("/nonexistent"), Arc::clone(&state));
        let mut events = state.subscribe_events();

        c.enqueue("a.mp3").unwrap();

        match events.recv().await.unwrap() {
            StationEvent::PlaybackStateChanged { old_mode, new_mode, .. } => {
                assert_eq!(old_mode, PlaybackMode::Paused);
                assert_eq!(new_mode, PlaybackMode::Playing);
            }
            other => panic!("Unexpected event: {:?}", other),
        }
        match events.recv().await.unwrap() {
            StationEvent::QueueChanged { queue, .. } => assert_eq!(queue, vec!["a.mp3"]),
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_available_tracks_delegates_to_store() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp3"), b"").unwrap();
        std::fs::write(dir.path().join("readme.md"), b"").unwrap();
        let c = PlaybackController::new(TrackStore::new(dir.path()), Arc::new(SharedState::new()));

        let tracks: Vec<String> = c.list_available_tracks().await.unwrap().collect().await;
        assert_eq!(tracks, vec!["a.mp3"]);
    }

    #[tokio::test]
    async fn test_list_available_tracks_unavailable() {
        let c = controller();
        assert!(matches!(
            c.list_available_tracks().await,
            Err(Error::StoreUnavailable(_))
        ));
    }
}
