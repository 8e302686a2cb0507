pub mod manager;
pub mod messages;
pub mod transport;

pub use manager::{ConnectionManager, ConnectionState, ReconnectPolicy};
pub use messages::{
    AudioStreamMessage, Envelope, ScoredLabel, ToneAnalysisPayload, TranscriptPayload,
};
pub use transport::FrameTransport;
