//! Live stream and download endpoints
//!
//! Both answer with `audio/mpeg` and an unbounded chunked body. The live
//! stream body is the listener's sink; when hyper drops the body (client
//! gone, write error) the sink's Drop unregisters it. The download body owns
//! the open file, so a cancelled download releases it.

use crate::api::AppState;
use crate::error::{Error, Result};
use crate::store::TrackStore;
use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use std::convert::Infallible;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

const AUDIO_MIME: &str = "audio/mpeg";

/// GET / - Join the live stream
pub async fn listen(State(app): State<AppState>) -> Response {
    let sink = app.hub.register();
    debug!("Streaming to listener {}", sink.id());

    let body = Body::from_stream(sink.map(Ok::<_, Infallible>));
    (
        [
            (header::CONTENT_TYPE, AUDIO_MIME),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}

/// GET /download/*track - Full file download
///
/// Path separators in the identifier are stripped. Missing → 404,
/// open failure → 500.
pub async fn download(
    State(app): State<AppState>,
    Path(track): Path<String>,
) -> Result<Response> {
    let name = TrackStore::sanitize(&track).map_err(|_| Error::TrackNotFound(track.clone()))?;
    info!("Download requested: {}", name);

    let file = app.store.open(&name).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    Ok(([(header::CONTENT_TYPE, AUDIO_MIME)], body).into_response())
}
