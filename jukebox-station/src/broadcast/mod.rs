//! Live stream fan-out

pub mod hub;

pub use hub::{BroadcastHub, ListenerId, ListenerSink};
