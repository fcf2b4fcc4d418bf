//! # Jukebox Common Library
//!
//! Shared code for the jukebox station and its tooling:
//! - Error type used across crates
//! - Configuration loading (CLI → environment → TOML → compiled default)
//! - Station event types (StationEvent enum) and PlaybackMode

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{PlaybackMode, StationEvent};
