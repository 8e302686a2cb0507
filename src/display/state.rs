use serde::Serialize;
use std::sync::{Arc, Mutex};

/// Placeholder shown for a classification with no result yet
pub const UNAVAILABLE: &str = "n/a";

/// The single coherent state the presentation layer reads.
///
/// Transcript and classification fields are owned by the reconciler; the
/// session flags are owned by the session controller. No inbound event
/// ever touches the flags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayState {
    /// Latest transcript; partial results carry the provisional marker
    pub transcript: String,
    /// Top-ranked emotion label
    pub emotion: String,
    /// Sentiment label
    pub sentiment: String,
    /// Top-ranked tone label
    pub tone: String,
    /// Whether a capture session is running
    pub session_active: bool,
    /// Whether the server-side camera feed should be shown
    pub video_active: bool,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            transcript: String::new(),
            emotion: UNAVAILABLE.to_string(),
            sentiment: UNAVAILABLE.to_string(),
            tone: UNAVAILABLE.to_string(),
            session_active: false,
            video_active: false,
        }
    }
}

/// Handle shared between the reconciler, the session controller, and the
/// presentation layer
pub type SharedDisplayState = Arc<Mutex<DisplayState>>;
