//! HTTP request gateway
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET | `/` | live stream (registers a listener) |
//! | GET | `/download/*track` | full file download |
//! | POST | `/api/play`, `/api/pause`, `/api/skip` | playback control |
//! | POST | `/api/schedule` | enqueue a track |
//! | GET | `/api/list` | tracks in the store |
//! | GET | `/api/status` | mode, queue, listeners |
//! | GET | `/api/events` | SSE station events |
//! | GET | `/health` | health check |
//!
//! Handlers only call controller and hub operations; they never touch
//! their state directly.

pub mod handlers;
pub mod sse;
pub mod stream;

use crate::broadcast::BroadcastHub;
use crate::playback::PlaybackController;
use crate::state::SharedState;
use crate::store::TrackStore;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<PlaybackController>,
    pub hub: BroadcastHub,
    pub store: TrackStore,
    pub state: Arc<SharedState>,
}

/// Create the gateway router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Live stream and downloads
        .route("/", get(stream::listen))
        .route("/download/*track", get(stream::download))

        // Health check
        .route("/health", get(handlers::health))

        // Control surface
        .nest("/api", Router::new()
            .route("/play", post(handlers::play))
            .route("/pause", post(handlers::pause))
            .route("/skip", post(handlers::skip))
            .route("/schedule", post(handlers::schedule))
            .route("/list", get(handlers::list))
            .route("/status", get(handlers::status))
            .route("/events", get(sse::event_stream))
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
