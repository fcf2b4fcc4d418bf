//! Shared helpers for jukebox-station integration tests
//!
//! Builds a station over a temporary track directory and provides request
//! and body-reading shortcuts for `tower::ServiceExt::oneshot` tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::Router;
use http::Request;
use http_body_util::BodyExt;
use jukebox_common::config::StreamConfig;
use jukebox_station::api::{create_router, AppState};
use jukebox_station::build_station;
use serde_json::Value;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// A station over a temporary track directory
pub struct TestStation {
    /// Keeps the track directory alive
    pub dir: TempDir,
    pub app: AppState,
    pub router: Router,
    /// Player task, if started
    pub player: Option<JoinHandle<()>>,
}

impl Drop for TestStation {
    fn drop(&mut self) {
        if let Some(player) = self.player.take() {
            player.abort();
        }
    }
}

/// Stream settings without pacing, so tests run at full speed
pub fn unpaced() -> StreamConfig {
    StreamConfig {
        chunk_size: 256,
        bitrate_kbps: 0,
        listener_buffer_chunks: 4096,
    }
}

fn write_tracks(files: &[(&str, Vec<u8>)]) -> TempDir {
    let dir = tempfile::tempdir().expect("Should create track directory");
    for (name, content) in files {
        std::fs::write(dir.path().join(name), content).expect("Should write track");
    }
    dir
}

/// Station whose player task is running
pub fn station(files: &[(&str, Vec<u8>)]) -> TestStation {
    station_with(files, |_| {})
}

/// Station whose player task starts after `setup` has run against it
pub fn station_with(files: &[(&str, Vec<u8>)], setup: impl FnOnce(&AppState)) -> TestStation {
    let dir = write_tracks(files);
    let (app, player) = build_station(dir.path(), &unpaced());
    setup(&app);
    let router = create_router(app.clone());
    TestStation {
        dir,
        app,
        router,
        player: Some(player.spawn()),
    }
}

/// Station without a player, so the queue only changes on request
pub fn idle_station(files: &[(&str, Vec<u8>)]) -> TestStation {
    let dir = write_tracks(files);
    let (app, _player) = build_station(dir.path(), &unpaced());
    let router = create_router(app.clone());
    TestStation {
        dir,
        app,
        router,
        player: None,
    }
}

/// Deterministic track content
pub fn track_bytes(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

/// Test helper: Create request without body
pub fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: Create request with JSON body
pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Read at least `len` bytes from an unbounded body
pub async fn read_at_least(body: &mut Body, len: usize) -> Vec<u8> {
    let mut out = Vec::new();
    while out.len() < len {
        let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
            .await
            .expect("Should receive a frame in time")
            .expect("Body should not end")
            .expect("Frame should not be an error");
        if let Ok(data) = frame.into_data() {
            out.extend_from_slice(&data);
        }
    }
    out
}

/// Read an unbounded body until its text contains `needle`
pub async fn read_until(body: &mut Body, needle: &str) -> String {
    let mut out = Vec::new();
    loop {
        let text = String::from_utf8_lossy(&out).into_owned();
        if text.contains(needle) {
            return text;
        }
        let more = read_at_least(body, 1).await;
        out.extend_from_slice(&more);
    }
}
