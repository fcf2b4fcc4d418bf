//! Control surface handlers
//!
//! play / pause / schedule / list, plus skip, status and health.

use crate::api::AppState;
use crate::error::Result;
use axum::{extract::State, Json};
use jukebox_common::PlaybackMode;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

#[derive(Debug, Serialize)]
pub struct ModeResponse {
    mode: PlaybackMode,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    /// Track identifier (file name in the track store)
    file: String,
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    position: usize,
    mode: PlaybackMode,
}

#[derive(Debug, Serialize)]
pub struct SkipResponse {
    skipped: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    files: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    mode: PlaybackMode,
    now_playing: Option<String>,
    queue: Vec<String>,
    listeners: usize,
}

impl StatusResponse {
    pub(crate) fn from_app(app: &AppState) -> Self {
        let snapshot = app.controller.snapshot();
        Self {
            mode: snapshot.mode,
            now_playing: snapshot.now_playing,
            queue: snapshot.queue,
            listeners: app.hub.listener_count(),
        }
    }
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "jukebox-station".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Playback Control
// ============================================================================

/// POST /api/play
pub async fn play(State(app): State<AppState>) -> Json<ModeResponse> {
    info!("Play requested");
    app.controller.play();
    Json(ModeResponse {
        mode: app.controller.mode(),
    })
}

/// POST /api/pause
pub async fn pause(State(app): State<AppState>) -> Json<ModeResponse> {
    info!("Pause requested");
    app.controller.pause();
    Json(ModeResponse {
        mode: app.controller.mode(),
    })
}

/// POST /api/schedule - Enqueue a track
///
/// Body: `{"file": "<track id>"}`. An invalid identifier is 400.
pub async fn schedule(
    State(app): State<AppState>,
    Json(req): Json<ScheduleRequest>,
) -> Result<Json<ScheduleResponse>> {
    info!("Schedule requested: {}", req.file);
    let outcome = app.controller.enqueue(&req.file)?;
    if !app.store.exists(&req.file).await {
        warn!("{} is not in the track store; it will be skipped if still missing", req.file);
    }
    Ok(Json(ScheduleResponse {
        position: outcome.position,
        mode: app.controller.mode(),
    }))
}

/// POST /api/skip - Drop the head of the queue
pub async fn skip(State(app): State<AppState>) -> Json<SkipResponse> {
    info!("Skip requested");
    Json(SkipResponse {
        skipped: app.controller.skip(),
    })
}

// ============================================================================
// Catalog and Status
// ============================================================================

/// GET /api/list - Tracks present in the store, sorted
pub async fn list(State(app): State<AppState>) -> Result<Json<ListResponse>> {
    use futures::StreamExt;

    let tracks = app.controller.list_available_tracks().await.map_err(|e| {
        error!("Failed to list tracks: {}", e);
        e
    })?;
    let mut files: Vec<String> = tracks.collect().await;
    files.sort();
    Ok(Json(ListResponse { files }))
}

/// GET /api/status
pub async fn status(State(app): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse::from_app(&app))
}
