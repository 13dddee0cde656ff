//! # Mirai Library Common
//!
//! Shared code for the Mirai Library services:
//! - Error type and `Result` alias
//! - Bootstrap configuration (TOML + CLI/env priority)
//! - Logging initialisation
//! - Playback session types and the `EventBus` used by the player service

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
pub use events::{EventBus, PlaybackState, PlayerEvent, SessionSnapshot, TrackView};
