//! Track store - filesystem directory of audio files
//!
//! Tracks are addressed by a flat identifier (the file name). Identifiers
//! coming from requests are sanitized before they touch the filesystem.

use crate::error::{Error, Result};
use futures::stream::{Stream, StreamExt};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs::File;
use tokio_stream::wrappers::ReadDirStream;
use tracing::{debug, warn};

/// Suffix a directory entry must carry to be listed as a track
const TRACK_SUFFIX: &str = "mp3";

/// Filesystem-backed catalog of playable tracks
#[derive(Debug, Clone)]
pub struct TrackStore {
    root: PathBuf,
}

impl TrackStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Reduce a requested identifier to a plain file name
    ///
    /// Path separators are stripped. Identifiers that end up empty or name
    /// the directory itself (`.`) or its parent (`..`) are rejected.
    pub fn sanitize(id: &str) -> Result<String> {
        let name: String = id.chars().filter(|c| *c != '/' && *c != '\\').collect();
        match name.as_str() {
            "" | "." | ".." => Err(Error::InvalidTrack(id.to_string())),
            _ => Ok(name),
        }
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        Ok(self.root.join(Self::sanitize(id)?))
    }

    /// Whether `id` names a regular file in the store
    pub async fn exists(&self, id: &str) -> bool {
        let Ok(path) = self.path_for(id) else {
            return false;
        };
        matches!(tokio::fs::metadata(&path).await, Ok(meta) if meta.is_file())
    }

    /// Open a track for reading
    ///
    /// A missing entry (or an invalid identifier) is `TrackNotFound`; any
    /// other failure is `StoreUnavailable`.
    pub async fn open(&self, id: &str) -> Result<File> {
        let path = self
            .path_for(id)
            .map_err(|_| Error::TrackNotFound(id.to_string()))?;

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(Error::TrackNotFound(id.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::TrackNotFound(id.to_string()))
            }
            Err(e) => return Err(Error::StoreUnavailable(format!("{}: {}", path.display(), e))),
        }

        debug!("Opening track {}", path.display());
        File::open(&path)
            .await
            .map_err(|e| Error::StoreUnavailable(format!("{}: {}", path.display(), e)))
    }

    /// Lazily list track identifiers present in the store
    ///
    /// Only opening the directory can fail; entries that cannot be read
    /// while iterating are logged and skipped.
    pub async fn list_tracks(&self) -> Result<impl Stream<Item = String> + Send + 'static> {
        let dir = tokio::fs::read_dir(&self.root).await.map_err(|e| {
            Error::StoreUnavailable(format!("{}: {}", self.root.display(), e))
        })?;

        let names = ReadDirStream::new(dir).filter_map(|entry| {
            let name = match entry {
                Ok(entry) => entry
                    .file_name()
                    .into_string()
                    .ok()
                    .filter(|name| name.ends_with(TRACK_SUFFIX)),
                Err(e) => {
                    warn!("Skipping unreadable directory entry: {}", e);
                    None
                }
            };
            futures::future::ready(name)
        });

        Ok(names)
    }
}
