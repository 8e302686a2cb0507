//! Streaming session management
//!
//! This module provides the `SessionController` abstraction that manages:
//! - Microphone capture lifecycle
//! - The frame pump (capture -> PCM encode -> transport)
//! - Result event wiring into the display state
//! - Session statistics and the video feed flag

mod config;
mod controller;
mod stats;

pub use config::SessionConfig;
pub use controller::SessionController;
pub use stats::SessionStats;
