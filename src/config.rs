use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub connection: ConnectionConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ConnectionConfig {
    /// WebSocket URL of the analysis service
    pub server_url: String,
    /// URL of the server-composited camera feed
    pub video_url: String,
    /// Consecutive failed connection attempts before giving up
    pub reconnect_attempts: u32,
    /// Delay between attempts in milliseconds
    pub reconnect_delay_ms: u64,
    /// Frames buffered while the connection is down (drop-oldest)
    pub max_pending_frames: usize,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub frame_samples: usize,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "emocam-client".to_string(),
            },
            connection: ConnectionConfig {
                server_url: "ws://localhost:5000/stream".to_string(),
                video_url: "http://localhost:5000/video".to_string(),
                reconnect_attempts: 5,
                reconnect_delay_ms: 1000,
                max_pending_frames: 5,
            },
            audio: AudioConfig {
                sample_rate: 16000,
                channels: 1,
                frame_samples: 4096,
            },
        }
    }
}
