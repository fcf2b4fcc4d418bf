//! # Jukebox Station Library (jukebox-station)
//!
//! Single-station audio broadcast service.
//!
//! **Purpose:** Queue track requests, play them in order, stream the playing
//! track to any number of listeners, and serve individual tracks for download.
//!
//! **Architecture:** control commands → `PlaybackController` (mode + queue)
//! → `Player` task reads the head track → `BroadcastHub` → one bounded
//! channel per listener → HTTP body. Downloads go straight from the
//! `TrackStore` to the requester.

pub mod api;
pub mod broadcast;
pub mod error;
pub mod playback;
pub mod state;
pub mod store;

pub use error::{Error, Result};
pub use state::SharedState;

use jukebox_common::config::StreamConfig;
use std::path::PathBuf;
use std::sync::Arc;

/// Wire a station together
///
/// Returns the gateway state and the player; the caller decides where the
/// player runs (usually `Player::spawn`).
pub fn build_station(tracks_dir: impl Into<PathBuf>, stream: &StreamConfig) -> (api::AppState, playback::Player) {
    let state = Arc::new(SharedState::new());
    let store = store::TrackStore::new(tracks_dir);
    let controller = Arc::new(playback::PlaybackController::new(
        store.clone(),
        Arc::clone(&state),
    ));
    let hub = broadcast::BroadcastHub::new(stream.listener_buffer_chunks, Arc::clone(&state));

    let player = playback::Player::new(
        Arc::clone(&controller),
        hub.clone(),
        store.clone(),
        Arc::clone(&state),
        stream,
    );

    let app_state = api::AppState {
        controller,
        hub,
        store,
        state,
    };

    (app_state, player)
}
