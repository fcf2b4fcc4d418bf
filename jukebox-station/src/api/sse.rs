//! Server-Sent Events (SSE) for station events
//!
//! A new client first gets a `StationStatus` event with the current mode,
//! queue and listener count, then every `StationEvent` as it happens.
//! Lagging subscribers skip the events they missed.

use crate::api::handlers::StatusResponse;
use crate::api::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// GET /api/events - SSE event stream
pub async fn event_stream(
    State(app): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE client connected");

    // Subscribe before taking the snapshot so nothing falls in between
    let mut rx = app.state.subscribe_events();
    let status = StatusResponse::from_app(&app);

    let stream = async_stream::stream! {
        match Event::default().event("StationStatus").json_data(&status) {
            Ok(event) => yield Ok::<_, Infallible>(event),
            Err(e) => warn!("Failed to serialize station status: {}", e),
        }

        loop {
            match rx.recv().await {
                Ok(event) => match Event::default().event(event.event_type()).json_data(&event) {
                    Ok(sse_event) => yield Ok::<_, Infallible>(sse_event),
                    Err(e) => warn!("Failed to serialize event: {}", e),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!("SSE client lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => {
                    info!("Event bus closed, ending SSE stream");
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
