use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics about a streaming session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Whether the session is currently active
    pub active: bool,

    /// When the session started, if it is running
    pub started_at: Option<DateTime<Utc>>,

    /// Session duration in seconds (0 when not running)
    pub duration_secs: f64,

    /// Frames pushed through the transport so far
    pub frames_sent: usize,
}
