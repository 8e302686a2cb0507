use serde::{Deserialize, Serialize};

/// Outbound event carrying one PCM frame
pub const EVENT_AUDIO_STREAM: &str = "audio_stream";
/// Inbound final transcript
pub const EVENT_TRANSCRIPTION: &str = "transcription";
/// Inbound provisional transcript
pub const EVENT_PARTIAL: &str = "partial";
/// Inbound ranked emotion/sentiment/tone bundle
pub const EVENT_TONE_ANALYSIS: &str = "tone_analysis";
/// Inbound non-fatal server error
pub const EVENT_ERROR: &str = "error";

/// Envelope framing every message on the socket, both directions
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    pub data: serde_json::Value,
}

/// Payload of the outbound `audio_stream` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioStreamMessage {
    /// Base64-encoded 16-bit LE PCM bytes
    pub chunk: String,
    /// Frame sequence number since the transport was created
    pub sequence: u32,
    /// RFC3339 capture timestamp
    pub timestamp: String,
}

/// Payload of the inbound `transcription` and `partial` events
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptPayload {
    pub text: String,
}

/// One ranked classification result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLabel {
    pub label: String,
    pub score: f32,
}

/// Payload of the inbound `tone_analysis` event
///
/// Every sub-field is optional on the wire; absent lists and a null
/// sentiment reconcile to "n/a" rather than failing the parse.
#[derive(Debug, Clone, Deserialize)]
pub struct ToneAnalysisPayload {
    #[serde(default)]
    pub emotion: Vec<ScoredLabel>,
    #[serde(default)]
    pub sentiment: Option<ScoredLabel>,
    #[serde(default)]
    pub tone: Vec<ScoredLabel>,
}
