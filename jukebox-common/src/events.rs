//! Event types for the station event system
//!
//! Events are published on the station's event bus and serialized for SSE
//! transmission. Audio chunks never travel through this bus; they go through
//! the broadcast hub.

use serde::{Deserialize, Serialize};

/// Playback mode enumeration
///
/// Initial mode of a freshly started station is `Paused`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    Playing,
    #[default]
    Paused,
}

impl std::fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackMode::Playing => write!(f, "playing"),
            PlaybackMode::Paused => write!(f, "paused"),
        }
    }
}

/// Station event types
///
/// Serialized with an internal `type` tag so SSE clients can dispatch on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StationEvent {
    /// Playback mode changed (Playing ↔ Paused)
    PlaybackStateChanged {
        /// Mode before change
        old_mode: PlaybackMode,
        /// Mode after change
        new_mode: PlaybackMode,
        /// When mode changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Track started streaming (from byte 0)
    TrackStarted {
        /// Track identifier
        track: String,
        /// When streaming started
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Track left the head of the queue
    ///
    /// `completed` is false when the track was skipped, either on request
    /// or because it could not be opened.
    TrackCompleted {
        /// Track identifier
        track: String,
        /// Whether the track streamed to the end
        completed: bool,
        /// When the track left the queue
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Queue contents changed
    QueueChanged {
        /// Queue contents after the change, head first
        queue: Vec<String>,
        /// When queue changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A listener connected or disconnected
    ListenerCountChanged {
        /// Listeners registered after the change
        count: usize,
        /// When the count changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl StationEvent {
    /// Event name used for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            StationEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            StationEvent::TrackStarted { .. } => "TrackStarted",
            StationEvent::TrackCompleted { .. } => "TrackCompleted",
            StationEvent::QueueChanged { .. } => "QueueChanged",
            StationEvent::ListenerCountChanged { .. } => "ListenerCountChanged",
        }
    }

    pub fn playback_state_changed(old_mode: PlaybackMode, new_mode: PlaybackMode) -> Self {
        StationEvent::PlaybackStateChanged {
            old_mode,
            new_mode,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn track_started(track: impl Into<String>) -> Self {
        StationEvent::TrackStarted {
            track: track.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn track_completed(track: impl Into<String>, completed: bool) -> Self {
        StationEvent::TrackCompleted {
            track: track.into(),
            completed,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn queue_changed(queue: Vec<String>) -> Self {
        StationEvent::QueueChanged {
            queue,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn listener_count_changed(count: usize) -> Self {
        StationEvent::ListenerCountChanged {
            count,
            timestamp: chrono::Utc::now(),
        }
    }
}
