//! Playback controller and the player task that feeds the broadcast hub

pub mod controller;
pub mod player;

pub use controller::{ControllerSnapshot, EnqueueOutcome, PlaybackController, Playout};
pub use player::Player;
