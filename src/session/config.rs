use crate::config::Config;
use serde::{Deserialize, Serialize};

/// Configuration for a streaming session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// WebSocket URL of the analysis service
    pub server_url: String,

    /// URL of the server-composited camera feed
    pub video_url: String,

    /// Capture sample rate (the analysis service expects 16kHz)
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono)
    pub channels: u16,

    /// Samples per captured frame
    pub frame_samples: usize,

    /// Frames kept while the connection is down (drop-oldest)
    pub max_pending_frames: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            server_url: "ws://localhost:5000/stream".to_string(),
            video_url: "http://localhost:5000/video".to_string(),
            sample_rate: 16000, // 16kHz
            channels: 1,        // Mono
            frame_samples: 4096,
            max_pending_frames: 5,
        }
    }
}

impl SessionConfig {
    /// Build a session config from the loaded application config
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            server_url: cfg.connection.server_url.clone(),
            video_url: cfg.connection.video_url.clone(),
            sample_rate: cfg.audio.sample_rate,
            channels: cfg.audio.channels,
            frame_samples: cfg.audio.frame_samples,
            max_pending_frames: cfg.connection.max_pending_frames,
            ..Self::default()
        }
    }
}
